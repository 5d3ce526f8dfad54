#[macro_use] mod core;

mod archive;
mod backuping;
mod cli;
mod config;
mod docker;
mod http_client;
mod logging;
mod restoring;
mod transfer;
mod util;

#[cfg(test)] mod tests;

use std::io::{self, Write};
use std::process;

use log::error;
use nix::unistd::{self, Uid};

use crate::backuping::BackupOptions;
use crate::cli::{Action, GlobalOptions, Parser};
use crate::config::Config;
use crate::core::{EmptyResult, GenericResult};
use crate::http_client::{HttpClient, parse_url};
use crate::restoring::RestoreOptions;
use crate::transfer::Transfer;
use crate::util::prompt::Prompter;
use crate::util::sys::ensure_root;

fn main() {
    let mut parser = Parser::new();

    let global = parser.parse_global().unwrap_or_else(|e| {
        let _ = writeln!(io::stderr(), "Command line arguments parsing error: {}.", e);
        process::exit(2);
    });

    if let Err(err) = logging::init(global.log_level) {
        let _ = writeln!(io::stderr(), "Failed to initialize the logging: {}.", err);
        process::exit(1);
    }

    let result = parser.parse().and_then(|action| {
        run(action, &global, unistd::geteuid(), HttpClient::new, &mut io::stdout())
    });

    let exit_code = match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{}.", err);
            1
        },
    };

    process::exit(exit_code);
}

/// Nothing is written to `stdout` unless the action succeeds.
fn run<W: Write>(
    action: Action, global: &GlobalOptions, euid: Uid, new_client: fn() -> GenericResult<HttpClient>,
    stdout: &mut W,
) -> EmptyResult {
    match action {
        Action::Backup {volumes, docker_root, endpoint, name, max_days} => {
            ensure_root(euid, "backup")?;

            let mut config = Config::load(&global.config_path);
            if let Some(docker_root) = docker_root {
                config.set_docker_root(&docker_root)?;
            }
            if let Some(endpoint) = endpoint {
                config.set_endpoint(&endpoint)?;
            }

            let transfer = Transfer::new(new_client()?);
            let url = backuping::backup(&config, &BackupOptions {volumes, name, max_days}, &transfer)?;

            writeln!(stdout, "{}", url)?;
            stdout.flush()?;
        },

        Action::Restore {url, docker_root, replacements, force} => {
            ensure_root(euid, "restore")?;

            let mut config = Config::load(&global.config_path);
            if let Some(docker_root) = docker_root {
                config.set_docker_root(&docker_root)?;
            }

            let options = RestoreOptions {url: parse_url(&url)?, replacements, force};
            let transfer = Transfer::new(new_client()?);

            restoring::restore(&config, &options, &transfer, &mut Prompter::terminal())?;
        },

        Action::Configure => {
            let config = Config::load(&global.config_path);
            cli::configure(&config, &mut Prompter::terminal())?;
        },

        Action::ShowConfig => {
            let config = Config::load(&global.config_path);
            cli::show_config(&config, stdout)?;
        },
    }

    Ok(())
}
