use itertools::Itertools;
use log::info;

use crate::archive;
use crate::config::Config;
use crate::core::GenericResult;
use crate::docker::{self, validate_volume_name};
use crate::transfer::{DEFAULT_ARCHIVE_NAME, Transfer};

#[derive(Debug, PartialEq)]
pub enum VolumeSelection {
    Explicit(Vec<String>),
    All,
}

pub struct BackupOptions {
    pub volumes: VolumeSelection,
    pub name: String,
    pub max_days: Option<u32>,
}

/// Archives the volumes, uploads the archive and returns its download URL.
pub fn backup(config: &Config, options: &BackupOptions, transfer: &Transfer) -> GenericResult<String> {
    let volumes = resolve_volumes(&options.volumes, docker::list_volumes)?;
    let volumes_dir = config.volumes_dir();

    info!("Backing up {} volumes from {:?} to {}...", volumes.len(), volumes_dir, config.endpoint);

    let temp_dir = tempfile::Builder::new().prefix("dvm-backup-").tempdir().map_err(|e| format!(
        "Unable to create a temporary directory: {}", e))?;
    let archive_path = temp_dir.path().join(DEFAULT_ARCHIVE_NAME);

    archive::create(&volumes_dir, &volumes, &archive_path)?;
    let url = transfer.upload(&archive_path, &config.endpoint, &options.name, options.max_days)?;

    info!("Done. Use the following URL to restore the volumes on the target host:");
    Ok(url)
}

pub fn resolve_volumes<L>(selection: &VolumeSelection, list_volumes: L) -> GenericResult<Vec<String>>
    where L: FnOnce() -> GenericResult<Vec<String>>
{
    let volumes: Vec<String> = match selection {
        VolumeSelection::Explicit(volumes) => {
            if volumes.is_empty() {
                return Err!("No volumes specified. Use --volume or --all-volumes");
            }
            volumes.iter().unique().cloned().collect()
        },

        VolumeSelection::All => {
            let volumes = list_volumes()?;
            if volumes.is_empty() {
                return Err!("No Docker volumes found");
            }
            volumes
        },
    };

    for volume in &volumes {
        validate_volume_name(volume)?;
    }

    Ok(volumes)
}
