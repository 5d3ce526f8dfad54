use std::process::Command;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::core::{EmptyResult, GenericResult};
use crate::util::process::get_command_output;

pub fn list_volumes() -> GenericResult<Vec<String>> {
    let mut command = Command::new("docker");
    command.args(["volume", "ls", "--format", "{{.Name}}"]);

    let output = get_command_output(command).map_err(|e| format!(
        "Unable to list Docker volumes: {}", e))?;

    let volumes = parse_volume_list(&output);
    for volume in &volumes {
        validate_volume_name(volume)?;
    }
    debug!("Found {} Docker volumes.", volumes.len());

    Ok(volumes)
}

fn parse_volume_list(output: &str) -> Vec<String> {
    output.lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn validate_volume_name(name: &str) -> EmptyResult {
    lazy_static! {
        static ref VOLUME_NAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").unwrap();
    }

    if !VOLUME_NAME_RE.is_match(name) {
        return Err!("Invalid volume name: {:?}", name);
    }

    Ok(())
}
