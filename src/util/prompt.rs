use std::io::{self, BufRead, Stderr, StdinLock, Write};

use crate::core::GenericResult;

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

pub type TerminalPrompter = Prompter<StdinLock<'static>, Stderr>;

impl TerminalPrompter {
    // Questions go to stderr: stdout is reserved for command results
    pub fn terminal() -> TerminalPrompter {
        Prompter::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Prompter<R, W> {
        Prompter {input, output}
    }

    /// Returns `default` on an empty answer or end of input.
    pub fn ask(&mut self, question: &str, default: &str) -> GenericResult<String> {
        write!(self.output, "{} [{}]: ", question, default)?;
        self.output.flush()?;

        Ok(match self.read_answer()? {
            Some(answer) => answer,
            None => default.to_owned(),
        })
    }

    pub fn confirm(&mut self, question: &str, default: bool) -> GenericResult<bool> {
        let choices = if default {"Y/n"} else {"y/N"};

        loop {
            write!(self.output, "{} [{}]: ", question, choices)?;
            self.output.flush()?;

            let answer = match self.read_answer()? {
                Some(answer) => answer.to_lowercase(),
                None => return Ok(default),
            };

            match answer.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer yes or no.")?,
            }
        }
    }

    fn read_answer(&mut self) -> GenericResult<Option<String>> {
        let mut line = String::new();

        if self.input.read_line(&mut line).map_err(|e| format!(
            "Unable to read the answer: {}", e))? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }

        let answer = line.trim();
        Ok(if answer.is_empty() {
            None
        } else {
            Some(answer.to_owned())
        })
    }
}
