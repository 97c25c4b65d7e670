//! Line-based interactive prompts.

use std::io::{self, BufRead};

use regex::{Regex, RegexBuilder};

use super::renderer::{Renderer, WriteArgs};
use crate::error::{Error, Result};

const RETRY_MESSAGE: &str = "Sorry, your reply was not understood. Please try again";

/// One accepted shape for a reply.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Regular expression source, anchored to the whole line unless it
    /// already is.
    Text(String),
    /// A compiled expression, used as is.
    Pattern(Regex),
}

impl From<&str> for Validator {
    fn from(pattern: &str) -> Self {
        Self::Text(pattern.to_string())
    }
}

impl From<String> for Validator {
    fn from(pattern: String) -> Self {
        Self::Text(pattern)
    }
}

impl From<Regex> for Validator {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

/// Arguments of [`Renderer::read`].
#[derive(Debug, Clone, Default)]
pub struct ReadArgs {
    pub message: String,
    /// Accept any reply when empty.
    pub valids: Vec<Validator>,
    pub case_sensitive: bool,
}

impl ReadArgs {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn valid(mut self, validator: impl Into<Validator>) -> Self {
        self.valids.push(validator.into());
        self
    }

    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The prompt as shown: ends with `:` (or `?`) and a space.
    pub fn prompt(&self) -> String {
        let mut prompt = self.message.clone();
        if !prompt.trim_end().ends_with([':', '?']) {
            prompt.push(':');
        }
        if !prompt.ends_with(char::is_whitespace) {
            prompt.push(' ');
        }
        prompt
    }

    fn compile(&self) -> Result<Vec<Regex>> {
        self.valids
            .iter()
            .map(|valid| match valid {
                Validator::Pattern(pattern) => Ok(pattern.clone()),
                Validator::Text(source) => {
                    let prefix = if source.starts_with('^') { "" } else { "^" };
                    let suffix = if source.ends_with('$') { "" } else { "$" };
                    RegexBuilder::new(&format!("{prefix}{source}{suffix}"))
                        .case_insensitive(!self.case_sensitive)
                        .build()
                        .map_err(|err| Error::Config(format!("Invalid reply pattern \"{source}\": {err}")))
                }
            })
            .collect()
    }
}

impl Renderer {
    /// Prompts on the renderer's output and reads replies from stdin until
    /// one is accepted.
    pub fn read(&mut self, args: &ReadArgs) -> Result<String> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        self.read_from(&mut input, args)
    }

    /// Same as [`read`](Self::read) with an explicit input source.
    pub fn read_from<R: BufRead>(&mut self, input: &mut R, args: &ReadArgs) -> Result<String> {
        let patterns = args.compile()?;
        let prompt = args.prompt();

        loop {
            self.print_raw(&prompt)?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a valid reply was given",
                )));
            }
            let reply = line.trim_end_matches(['\n', '\r']);

            if patterns.is_empty() || patterns.iter().any(|re| re.is_match(reply)) {
                return Ok(reply.to_string());
            }

            self.write(WriteArgs::warn(RETRY_MESSAGE))?;
        }
    }
}
