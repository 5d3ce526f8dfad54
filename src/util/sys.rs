use std::path::{Path, PathBuf, Component};

use nix::unistd::Uid;

use crate::core::{EmptyResult, GenericResult};

pub fn ensure_root(euid: Uid, action: &str) -> EmptyResult {
    if !euid.is_root() {
        return Err!(
            "Permission denied: {} must be run as root (sudo dvm {} ...) to preserve volume ownership",
            action, action);
    }
    Ok(())
}

pub fn validate_path(path: &str) -> GenericResult<PathBuf> {
    let mut normalized_path = PathBuf::new();
    let mut path_components = Path::new(path).components();

    if path_components.next() != Some(Component::RootDir) {
        return Err!("Paths must be absolute: {:?}", path);
    }
    normalized_path.push(Component::RootDir.as_os_str());

    for component in path_components {
        match component {
            Component::Normal(component) => normalized_path.push(component),
            Component::CurDir => {},
            _ => return Err!("Invalid path: {:?}", path),
        }
    }

    Ok(normalized_path)
}

pub fn validate_local_path(path: &str) -> GenericResult<PathBuf> {
    validate_path(&shellexpand::tilde(path))
}
