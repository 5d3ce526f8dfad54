use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use const_format::formatcp;
use indoc::indoc;
use log::warn;

use crate::backuping::VolumeSelection;
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::core::GenericResult;
use crate::restoring::Replacement;
use crate::transfer::{DEFAULT_ARCHIVE_NAME, parse_archive_name};

use super::Action;

pub struct Parser {
    matches: Option<ArgMatches>,
}

pub struct GlobalOptions {
    pub log_level: log::Level,
    pub config_path: PathBuf,
}

impl Parser {
    pub fn new() -> Parser {
        Parser {matches: None}
    }

    pub fn parse_global(&mut self) -> GenericResult<GlobalOptions> {
        let matches = new_parser().get_matches();
        self.parse_global_matches(matches)
    }

    fn parse_global_matches(&mut self, matches: ArgMatches) -> GenericResult<GlobalOptions> {
        let log_level = match matches.get_count("verbose") {
            0 => if matches.get_flag("quiet") {
                log::Level::Warn
            } else {
                log::Level::Info
            },
            1 => log::Level::Debug,
            2 => log::Level::Trace,
            _ => return Err!("Invalid verbosity level"),
        };

        let config_path = matches.get_one::<String>("config")
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .unwrap_or_else(Config::default_path);

        self.matches.replace(matches);

        Ok(GlobalOptions {log_level, config_path})
    }

    pub fn parse(self) -> GenericResult<Action> {
        let matches = self.matches.ok_or("Global options must be parsed first")?;
        let (command, matches) = matches.subcommand().ok_or("No command specified")?;

        Ok(match command {
            "backup" => {
                let volumes: Vec<String> = matches.get_many::<String>("volume")
                    .map(|volumes| volumes.cloned().collect())
                    .unwrap_or_default();

                let volumes = if matches.get_flag("all-volumes") {
                    if !volumes.is_empty() {
                        warn!("--volume options are ignored since --all-volumes is specified.");
                    }
                    VolumeSelection::All
                } else {
                    VolumeSelection::Explicit(volumes)
                };

                Action::Backup {
                    volumes,
                    docker_root: get_string(matches, "docker-root"),
                    endpoint: get_string(matches, "endpoint"),
                    name: get_string(matches, "name").unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_owned()),
                    max_days: matches.get_one::<u32>("max-days").copied(),
                }
            },

            "restore" => Action::Restore {
                url: get_string(matches, "URL").ok_or("URL is not specified")?,
                docker_root: get_string(matches, "docker-root"),
                replacements: matches.get_many::<Replacement>("replace")
                    .map(|replacements| replacements.cloned().collect())
                    .unwrap_or_default(),
                force: matches.get_flag("force"),
            },

            "config" => Action::Configure,
            "show-config" => Action::ShowConfig,

            _ => return Err!("Unknown command: {}", command),
        })
    }
}

fn get_string(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn new_parser() -> Command {
    new_command("dvm", "Docker volume migration via transfer.sh")
        .version(env!("CARGO_PKG_VERSION"))

        .subcommand_required(true)
        .arg_required_else_help(true)
        .disable_help_subcommand(true)
        .help_expected(true)

        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("PATH")
            .global(true)
            .help(formatcp!("Configuration file path [default: {}]", DEFAULT_CONFIG_PATH)))

        .arg(Arg::new("quiet")
            .short('q').long("quiet")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Show only warning and error messages"))

        .arg(Arg::new("verbose")
            .long("verbose")
            .action(ArgAction::Count)
            .conflicts_with("quiet")
            .global(true)
            .help("Set verbosity level"))

        .subcommand(new_command(
            "backup", "Archive Docker volumes and upload them to the endpoint")
            .arg(Arg::new("volume")
                .short('v').long("volume")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Docker volume name (may be specified multiple times)"))
            .arg(Arg::new("all-volumes")
                .short('a').long("all-volumes")
                .action(ArgAction::SetTrue)
                .help("Back up all Docker volumes (as listed by `docker volume ls`)"))
            .arg(docker_root_arg())
            .arg(Arg::new("endpoint")
                .short('e').long("endpoint")
                .value_name("URL")
                .help("transfer.sh-compatible endpoint (overrides the configuration)"))
            .arg(Arg::new("name")
                .short('n').long("name")
                .visible_short_alias('o').visible_alias("output")
                .value_name("NAME")
                .value_parser(parse_archive_name)
                .help(formatcp!("Archive file name on the endpoint [default: {}]", DEFAULT_ARCHIVE_NAME)))
            .arg(Arg::new("max-days")
                .long("max-days")
                .value_name("DAYS")
                .value_parser(value_parser!(u32).range(1..))
                .help("Delete the archive from the endpoint after the specified number of days")))

        .subcommand(new_command(
            "restore", "Download an archive and restore the volumes from it")
            .arg(Arg::new("URL")
                .help("Download URL printed by the backup command")
                .required(true))
            .arg(docker_root_arg())
            .arg(Arg::new("replace")
                .short('r').long("replace")
                .value_name("OLD=NEW")
                .action(ArgAction::Append)
                .value_parser(value_parser!(Replacement))
                .help("Replace OLD with NEW in restored volume names (may be specified multiple times)"))
            .arg(Arg::new("force")
                .short('f').long("force")
                .action(ArgAction::SetTrue)
                .help("Overwrite existing volume directories of renamed volumes without asking")))

        .subcommand(new_command("config", "Interactively configure Docker root and endpoint"))
        .subcommand(new_command("show-config", "Show the current configuration"))
}

fn docker_root_arg() -> Arg {
    Arg::new("docker-root")
        .long("docker-root")
        .visible_alias("dr")
        .value_name("PATH")
        .help("Docker root directory containing volumes/ (overrides the configuration)")
}

fn new_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        // Default template contains `{bin} {version}` for some reason
        .help_template(indoc!("
            {before-help}{about}

            {usage-heading}
                {usage}

            {all-args}{after-help}\
        "))
        .about(about)
}
