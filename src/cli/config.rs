use std::io::{BufRead, Write};

use log::{info, warn};

use crate::config::Config;
use crate::core::{EmptyResult, GenericResult};
use crate::http_client::parse_url;
use crate::util::prompt::Prompter;
use crate::util::sys::validate_local_path;

/// Asks for the new settings (the current ones are offered as defaults) and saves them.
pub fn configure<R, W>(config: &Config, prompter: &mut Prompter<R, W>) -> EmptyResult
    where R: BufRead, W: Write
{
    let docker_root = ask_valid(prompter, "Docker root", &config.docker_root.to_string_lossy(), |value| {
        let path = validate_local_path(value)?;
        Ok(path.to_str().ok_or_else(|| format!("Invalid path: {:?}", path))?.to_owned())
    })?;

    let endpoint = ask_valid(prompter, "Endpoint", config.endpoint.as_str(), |value| {
        Ok(parse_url(value)?.to_string())
    })?;

    Config::save(&config.path, &docker_root, &endpoint)?;

    info!("The configuration has been saved to {:?}:", config.path);
    info!("* Docker root: {}", docker_root);
    info!("* Endpoint: {}", endpoint);

    Ok(())
}

fn ask_valid<R, W, V>(prompter: &mut Prompter<R, W>, question: &str, default: &str, validate: V) -> GenericResult<String>
    where R: BufRead, W: Write, V: Fn(&str) -> GenericResult<String>
{
    loop {
        let answer = prompter.ask(question, default)?;

        match validate(&answer) {
            Ok(value) => return Ok(value),
            Err(err) if answer == default => return Err(err),
            Err(err) => warn!("Invalid {}: {}.", question.to_lowercase(), err),
        }
    }
}

pub fn show_config<W: Write>(config: &Config, output: &mut W) -> EmptyResult {
    let status = if config.exists() {
        ""
    } else {
        " (doesn't exist, using defaults)"
    };

    writeln!(output, "Configuration file: {}{}", config.path.display(), status)?;
    writeln!(output, "Docker root: {}", config.docker_root.display())?;
    writeln!(output, "Endpoint: {}", config.endpoint)?;
    output.flush()?;

    Ok(())
}
