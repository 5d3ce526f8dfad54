//! Volume archives are plain `tar` streams produced and unpacked by the system `tar` with ACLs,
//! extended attributes and numeric owners preserved.

use std::fs;
use std::path::Path;
use std::process::Command;

use humansize::{format_size, BINARY};
use log::{debug, info};

use crate::core::EmptyResult;
use crate::util::process::run_command;

const TAR: &str = "tar";
const PRESERVE_FLAGS: [&str; 3] = ["--xattrs", "--acls", "--numeric-owner"];

pub fn create(volumes_dir: &Path, volumes: &[String], archive_path: &Path) -> EmptyResult {
    check_volumes_dir(volumes_dir)?;

    if volumes.is_empty() {
        return Err!("No volumes to archive");
    }

    let missing: Vec<&str> = volumes.iter()
        .filter(|volume| !volumes_dir.join(volume).is_dir())
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return Err!("The following volume directories are missing in {:?}: {}",
                    volumes_dir, missing.join(", "));
    }

    info!("Archiving {}...", volumes.join(", "));
    run_command(create_command(volumes_dir, volumes, archive_path)).map_err(|e| format!(
        "Failed to archive the volumes: {}", e))?;

    if let Ok(metadata) = fs::metadata(archive_path) {
        debug!("Archive size: {}.", format_size(metadata.len(), BINARY));
    }

    Ok(())
}

pub fn extract(archive_path: &Path, target_dir: &Path) -> EmptyResult {
    check_volumes_dir(target_dir)?;

    info!("Extracting the archive into {:?}...", target_dir);
    run_command(extract_command(archive_path, target_dir)).map_err(|e| format!(
        "Failed to extract the archive: {}", e))?;

    Ok(())
}

fn check_volumes_dir(path: &Path) -> EmptyResult {
    if !path.is_dir() {
        return Err!("Volumes directory doesn't exist: {:?}", path);
    }
    Ok(())
}

fn create_command(volumes_dir: &Path, volumes: &[String], archive_path: &Path) -> Command {
    let mut command = Command::new(TAR);
    command.args(PRESERVE_FLAGS)
        .arg("-C").arg(volumes_dir)
        .arg("-cpf").arg(archive_path)
        // Volume names are validated to never start with a dash
        .args(volumes);
    command
}

fn extract_command(archive_path: &Path, target_dir: &Path) -> Command {
    let mut command = Command::new(TAR);
    command.args(PRESERVE_FLAGS)
        .arg("-C").arg(target_dir)
        .arg("-xpf").arg(archive_path);
    command
}
