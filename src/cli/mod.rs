mod config;
mod parser;

use crate::backuping::VolumeSelection;
use crate::restoring::Replacement;

pub use config::{configure, show_config};
pub use parser::{Parser, GlobalOptions};

#[derive(Debug, PartialEq)]
pub enum Action {
    Backup {
        volumes: VolumeSelection,
        docker_root: Option<String>,
        endpoint: Option<String>,
        name: String,
        max_days: Option<u32>,
    },

    Restore {
        url: String,
        docker_root: Option<String>,
        replacements: Vec<Replacement>,
        force: bool,
    },

    Configure,
    ShowConfig,
}
