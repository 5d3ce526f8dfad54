mod rename;

use std::io::{BufRead, Write};

use log::info;

use crate::archive;
use crate::config::Config;
use crate::core::EmptyResult;
use crate::http_client::Url;
use crate::transfer::Transfer;
use crate::util::prompt::Prompter;

pub use self::rename::Replacement;

pub struct RestoreOptions {
    pub url: Url,
    pub replacements: Vec<Replacement>,
    pub force: bool,
}

/// Downloads the archive and extracts it into the Docker volumes directory.
pub fn restore<R, W>(
    config: &Config, options: &RestoreOptions, transfer: &Transfer, prompter: &mut Prompter<R, W>,
) -> EmptyResult
    where R: BufRead, W: Write
{
    let volumes_dir = config.volumes_dir();
    if !volumes_dir.is_dir() {
        return Err!("Volumes directory doesn't exist: {:?}", volumes_dir);
    }

    let mut archive = tempfile::Builder::new().prefix("dvm-restore-").suffix(".tar").tempfile()
        .map_err(|e| format!("Unable to create a temporary file: {}", e))?;
    transfer.download(&options.url, archive.as_file_mut())?;

    if options.replacements.is_empty() {
        archive::extract(archive.path(), &volumes_dir)?;
    } else {
        // Staging inside the volumes directory makes the final moves same-filesystem renames
        let staging_dir = tempfile::Builder::new().prefix(".dvm-restore-").tempdir_in(&volumes_dir)
            .map_err(|e| format!("Unable to create a staging directory in {:?}: {}", volumes_dir, e))?;

        archive::extract(archive.path(), staging_dir.path())?;
        rename::move_volumes(staging_dir.path(), &volumes_dir, &options.replacements, options.force, prompter)?;
    }

    info!("The volumes have been restored to {:?}.", volumes_dir);
    info!("Restart Docker and start the containers with the restored volume names.");

    Ok(())
}
