use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use reqwest::Url;
use serde_derive::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::{EmptyResult, GenericResult};
use crate::http_client::parse_url;
use crate::util::sys::{validate_path, validate_local_path};

pub const DEFAULT_CONFIG_PATH: &str = "~/.dvm/config.toml";
pub const DEFAULT_DOCKER_ROOT: &str = "/var/lib/docker";
pub const DEFAULT_ENDPOINT: &str = "https://transfer.sh";

const CONFIG_HEADER: &str = "# dvm configuration\n";

/// Effective configuration: the file values (or defaults) with command line overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub path: PathBuf,
    pub docker_root: PathBuf,
    pub endpoint: Url,
}

#[derive(Deserialize, Serialize, Default)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Deserialize, Serialize, Validate, Default)]
struct Settings {
    #[validate(custom(function = "validate_docker_root"))]
    docker_root: Option<String>,
    #[validate(custom(function = "validate_endpoint"))]
    endpoint: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref())
    }

    pub fn new(path: &Path) -> Config {
        Config {
            path: path.to_owned(),
            docker_root: PathBuf::from(DEFAULT_DOCKER_ROOT),
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("Invalid default endpoint"),
        }
    }

    /// Never fails: a missing or broken configuration file yields the defaults.
    pub fn load(path: &Path) -> Config {
        let mut config = Config::new(path);

        let mut settings = match read_settings(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("{:?} doesn't exist. Using the default configuration.", path);
                return config;
            },
            Err(err) => {
                warn!("Unable to read configuration file {:?}: {}. Using the default configuration.",
                      path, err);
                return config;
            },
        };

        settings.docker_root = settings.docker_root.filter(|value| !value.is_empty());
        settings.endpoint = settings.endpoint.filter(|value| !value.is_empty());

        if let Err(errors) = settings.validate() {
            for (field, errors) in errors.field_errors() {
                for error in errors {
                    warn!("Ignoring invalid {} in {:?}: {}.", field, path, error);
                }

                match &*field {
                    "docker_root" => settings.docker_root = None,
                    "endpoint" => settings.endpoint = None,
                    _ => {},
                }
            }
        }

        if let Some(docker_root) = settings.docker_root.as_deref() {
            if let Ok(docker_root) = validate_path(docker_root) {
                config.docker_root = docker_root;
            }
        }

        if let Some(endpoint) = settings.endpoint.as_deref() {
            if let Ok(endpoint) = parse_url(endpoint) {
                config.endpoint = endpoint;
            }
        }

        config
    }

    pub fn save(path: &Path, docker_root: &str, endpoint: &str) -> EmptyResult {
        let settings = Settings {
            docker_root: Some(docker_root.to_owned()),
            endpoint: Some(endpoint.to_owned()),
        };
        settings.validate()?;

        let contents = toml::to_string(&ConfigFile {settings}).map_err(|e| format!(
            "Unable to serialize the configuration: {}", e))?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| format!(
                "Unable to create {:?}: {}", parent, e))?;
        }

        fs::write(path, CONFIG_HEADER.to_owned() + &contents).map_err(|e| format!(
            "Unable to write {:?}: {}", path, e))?;

        Ok(())
    }

    pub fn set_docker_root(&mut self, docker_root: &str) -> EmptyResult {
        self.docker_root = validate_local_path(docker_root).map_err(|e| format!(
            "Invalid Docker root: {}", e))?;
        Ok(())
    }

    pub fn set_endpoint(&mut self, endpoint: &str) -> EmptyResult {
        self.endpoint = parse_url(endpoint).map_err(|e| format!(
            "Invalid endpoint: {}", e))?;
        Ok(())
    }

    pub fn volumes_dir(&self) -> PathBuf {
        self.docker_root.join("volumes")
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

fn read_settings(path: &Path) -> GenericResult<Option<Settings>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let file: ConfigFile = toml::from_str(&contents)?;
    Ok(Some(file.settings))
}

fn validate_docker_root(docker_root: &str) -> Result<(), ValidationError> {
    validate_path(docker_root).map(|_| ()).map_err(|e| {
        ValidationError::new("docker_root").with_message(Cow::Owned(e.to_string()))
    })
}

fn validate_endpoint(endpoint: &str) -> Result<(), ValidationError> {
    parse_url(endpoint).map(|_| ()).map_err(|e| {
        ValidationError::new("endpoint").with_message(Cow::Owned(e.to_string()))
    })
}
