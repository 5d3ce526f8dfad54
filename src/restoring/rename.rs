use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use log::{error, info, warn};

use crate::core::{EmptyResult, GenericError, GenericResult};
use crate::docker::validate_volume_name;
use crate::logging::GlobalContext;
use crate::util::prompt::Prompter;

/// `OLD=NEW` substring replacement for restored volume names.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl FromStr for Replacement {
    type Err = GenericError;

    fn from_str(spec: &str) -> GenericResult<Replacement> {
        let (from, to) = spec.split_once('=').ok_or_else(|| format!(
            "Invalid replacement {:?}: expected OLD=NEW", spec))?;

        if from.is_empty() {
            return Err!("Invalid replacement {:?}: the old part must not be empty", spec);
        }

        Ok(Replacement {
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }
}

pub fn rename_volume(name: &str, replacements: &[Replacement]) -> String {
    replacements.iter().fold(name.to_owned(), |name, replacement| {
        name.replace(&replacement.from, &replacement.to)
    })
}

/// Moves the volumes extracted into `staging_dir` to `volumes_dir` under their new names.
///
/// Existing volumes are replaced if `force` is set, otherwise the user is asked whether to replace
/// them. Replaced volumes are moved into the staging directory, so they are deleted along with it.
pub fn move_volumes<R, W>(
    staging_dir: &Path, volumes_dir: &Path, replacements: &[Replacement], force: bool,
    prompter: &mut Prompter<R, W>,
) -> EmptyResult
    where R: BufRead, W: Write
{
    let mut plan: Vec<(String, String)> = Vec::new();
    let mut new_names: HashMap<String, String> = HashMap::new();

    for entry in fs::read_dir(staging_dir).map_err(|e| format!(
        "Unable to read {:?}: {}", staging_dir, e))?
    {
        let entry = entry?;
        let path = entry.path();

        let name = entry.file_name().into_string().map_err(|name| format!(
            "Got an invalid volume name from the archive: {:?}", name.to_string_lossy()))?;

        if !fs::symlink_metadata(&path)?.is_dir() {
            warn!("Skipping {:?}: it's not a volume directory.", name);
            continue;
        }

        let new_name = rename_volume(&name, replacements);
        validate_volume_name(&new_name).map_err(|e| format!(
            "Unable to rename {:?} volume: {}", name, e))?;

        if let Some(other) = new_names.insert(new_name.clone(), name.clone()) {
            return Err!("Both {:?} and {:?} volumes are renamed to {:?}", other, name, new_name);
        }

        plan.push((name, new_name));
    }

    plan.sort();

    for (name, new_name) in plan {
        let _context = GlobalContext::new(&name);

        let src = staging_dir.join(&name);
        let dst = volumes_dir.join(&new_name);

        let mut replaced = None;

        if fs::symlink_metadata(&dst).is_ok() {
            if force {
                info!("Replacing the existing {:?} volume directory.", dst);
            } else {
                warn!("{:?} volume directory already exists.", dst);
                if !prompter.confirm(&format!("Overwrite {:?}?", dst), false)? {
                    info!("Skipping the volume.");
                    continue;
                }
            }

            replaced = Some(staging_dir.join(format!(".replaced.{}", new_name)));
        }

        move_volume(&src, &dst, replaced.as_deref())?;
        info!("Restored as {:?}.", new_name);
    }

    Ok(())
}

// The existing `dst` is moved to `replaced` first and is moved back if `src` can't take its place
fn move_volume(src: &Path, dst: &Path, replaced: Option<&Path>) -> EmptyResult {
    if let Some(replaced) = replaced {
        fs::rename(dst, replaced).map_err(|e| format!(
            "Unable to move away {:?}: {}", dst, e))?;
    }

    if let Err(err) = fs::rename(src, dst) {
        if let Some(replaced) = replaced {
            if let Err(e) = fs::rename(replaced, dst) {
                error!("Unable to move {:?} back to {:?}: {}.", replaced, dst, e);
            }
        }
        return Err!("Unable to move {:?} to {:?}: {}", src, dst, err);
    }

    Ok(())
}
