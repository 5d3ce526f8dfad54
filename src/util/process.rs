use std::io;
use std::os::fd::AsFd;
use std::process::{Command, Output, Stdio};

use itertools::Itertools;
use log::debug;

use crate::core::{EmptyResult, GenericResult};

pub fn format_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy())
        .join(" ")
}

/// Runs the command with its stdout redirected to our stderr: stdout carries only command results.
pub fn run_command(mut command: Command) -> EmptyResult {
    let command_string = format_command(&command);
    debug!("Running `{}`...", command_string);

    let stderr = io::stderr().as_fd().try_clone_to_owned().map_err(|e| format!(
        "Unable to duplicate stderr descriptor: {}", e))?;

    let status = command.stdin(Stdio::null()).stdout(Stdio::from(stderr)).status().map_err(|e| format!(
        "Unable to execute `{}`: {}", command_string, e))?;

    if !status.success() {
        return Err!("`{}` has failed: {}", command_string, status);
    }

    Ok(())
}

pub fn get_command_output(mut command: Command) -> GenericResult<String> {
    let command_string = format_command(&command);
    debug!("Running `{}`...", command_string);

    let Output {status, stdout, stderr} = command.stdin(Stdio::null()).output().map_err(|e| format!(
        "Unable to execute `{}`: {}", command_string, e))?;

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        let error = stderr.trim();

        return if error.is_empty() {
            Err!("`{}` has failed: {}", command_string, status)
        } else {
            Err!("`{}` has failed: {}", command_string, error)
        };
    }

    Ok(String::from_utf8(stdout).map_err(|_| format!(
        "`{}` returned an invalid UTF-8 output", command_string))?)
}
