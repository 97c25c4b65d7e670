//! Command-line parsing against the registered options.
//!
//! Tokenizing is delegated to clap's builder API: one `Arg` per declared
//! option plus a catch-all positional. Values come back as raw strings and
//! are coerced here, per kind.

use std::ffi::OsString;
use std::sync::LazyLock;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use regex::Regex;

use super::definition::{Kind, OptionDefinition, OptionValue};
use super::registry::{HELP_OPTION, OptionRegistry};
use crate::error::{Error, Result};

const POSITIONAL: &str = "scriptkit::args";

// unwrap is safe: patterns are compile-time constants
#[allow(clippy::unwrap_used)]
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());

#[allow(clippy::unwrap_used)]
static FLOAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-+]?\d*(\.\d+)?$").unwrap());

/// Switches for [`OptionRegistry::parse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Drop unknown options instead of failing.
    pub ignore_unknown: bool,
    /// Do not print the help listing and stop when `--help` is given.
    pub ignore_help: bool,
}

impl ParseOptions {
    #[must_use]
    pub const fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    #[must_use]
    pub const fn ignore_help(mut self, ignore: bool) -> Self {
        self.ignore_help = ignore;
        self
    }
}

impl OptionRegistry {
    /// Parses the process arguments, program name excluded.
    ///
    /// An argument that is not valid UTF-8 is a configuration error.
    pub fn parse_env(&mut self, options: ParseOptions) -> Result<()> {
        match utf8_args(std::env::args_os().skip(1)) {
            Ok(raw) => self.parse(raw, options),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Parses `raw` (program name excluded) against the declared options.
    ///
    /// In order: values are coerced by kind, `--help` prints the listing and
    /// ends with [`Error::Exit`] (status 0), then required options are
    /// checked and action callbacks run, both in registration order.
    /// Failures are printed through the registry's renderer and returned.
    pub fn parse<I, T>(&mut self, raw: I, options: ParseOptions) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut tokens: Vec<String> = raw.into_iter().map(Into::into).collect();
        self.cmdline.clone_from(&tokens);
        self.args.clear();
        for definition in &mut self.options {
            definition.value = None;
        }

        let matches = loop {
            match self.command().try_get_matches_from(&tokens) {
                Ok(matches) => break matches,
                Err(err) if err.kind() == ErrorKind::UnknownArgument => {
                    let given = invalid_arg(&err).unwrap_or_default();
                    let values = self.value_tokens(&tokens);
                    if options.ignore_unknown && strip_unknown(&mut tokens, &values, &given) {
                        continue;
                    }
                    let err = Error::Config(format!("Unknown option \"{given}\"."));
                    return Err(self.fail(err));
                }
                Err(err) => {
                    let err = self.backend_error(&err);
                    return Err(self.fail(err));
                }
            }
        };

        if let Err(err) = self.assign(&matches) {
            return Err(self.fail(err));
        }

        self.args = matches
            .get_many::<String>(POSITIONAL)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        if self.provided(HELP_OPTION) && !options.ignore_help {
            self.print_help()?;
            return Err(Error::Exit { code: 0 });
        }

        let mut missing = None;
        for definition in &mut self.options {
            if definition.required && definition.value.is_none() {
                missing = Some(definition.name.clone());
                break;
            }
            if definition.kind == Kind::Action && definition.value == Some(OptionValue::Bool(true)) {
                if let Some(action) = definition.action.as_mut() {
                    action();
                }
            }
        }

        if let Some(name) = missing {
            let err = Error::Config(format!("Required option \"{name}\" not specified."));
            return Err(self.fail(err));
        }

        Ok(())
    }

    fn command(&self) -> Command {
        let program = self.info.name.clone().unwrap_or_else(|| "script".to_string());
        let command = Command::new(program)
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .args_override_self(true);

        let command = self.options.iter().fold(command, |command, definition| {
            let arg = Arg::new(definition.name.clone())
                .short(definition.short_char())
                .long(definition.long_name().to_string());
            let arg = if definition.kind.takes_argument() {
                arg.action(ArgAction::Set)
                    .num_args(1)
                    .allow_hyphen_values(true)
            } else {
                arg.action(ArgAction::SetTrue)
            };
            command.arg(arg)
        });

        command.arg(
            Arg::new(POSITIONAL)
                .action(ArgAction::Append)
                .num_args(0..),
        )
    }

    /// Stores coerced values, visiting options in command-line order so the
    /// first bad token is the one reported.
    fn assign(&mut self, matches: &ArgMatches) -> Result<()> {
        let mut given: Vec<(usize, usize)> = self
            .options
            .iter()
            .enumerate()
            .filter(|(_, definition)| {
                matches.value_source(&definition.name) == Some(ValueSource::CommandLine)
            })
            .map(|(index, definition)| {
                (matches.index_of(&definition.name).unwrap_or(usize::MAX), index)
            })
            .collect();
        given.sort_unstable();

        for (_, index) in given {
            let definition = &self.options[index];
            let value = if definition.kind.takes_argument() {
                let raw = matches
                    .get_one::<String>(&definition.name)
                    .map_or("", String::as_str);
                coerce(definition, raw)?
            } else {
                OptionValue::Bool(true)
            };
            self.options[index].value = Some(value);
        }

        Ok(())
    }

    /// Translates a clap failure into a configuration error naming the
    /// offending option by its long form.
    fn backend_error(&self, err: &clap::Error) -> Error {
        let given = invalid_arg(err).unwrap_or_default();
        let option = self.resolve(&given).unwrap_or(given);

        match err.kind() {
            ErrorKind::InvalidValue | ErrorKind::TooFewValues | ErrorKind::NoEquals => {
                Error::Config(format!("Option \"{option}\" requires an argument."))
            }
            ErrorKind::TooManyValues => {
                Error::Config(format!("Option \"{option}\" does not take an argument."))
            }
            kind => Error::Config(format!("Unexpected error: {kind:?}.")),
        }
    }

    /// Long form of the option mentioned in a clap argument description such
    /// as `-c, --count <count>`.
    /// Marks the tokens that a preceding option consumes as its argument.
    fn value_tokens(&self, tokens: &[String]) -> Vec<bool> {
        let mut values = vec![false; tokens.len()];
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            if token == "--" {
                break;
            }
            let takes_next = if token.starts_with("--") {
                !token.contains('=')
                    && self
                        .index_of_long(token)
                        .is_some_and(|option| self.options[option].kind.takes_argument())
            } else if token.len() > 1 && token.starts_with('-') {
                self.short_cluster_takes_next(token)
            } else {
                false
            };
            if takes_next && index + 1 < tokens.len() {
                values[index + 1] = true;
                index += 1;
            }
            index += 1;
        }
        values
    }

    /// Whether a short cluster ends with an option still waiting for its
    /// argument, as in `-vn value` (but not `-nvalue`).
    fn short_cluster_takes_next(&self, token: &str) -> bool {
        let flags: Vec<char> = token.chars().skip(1).collect();
        for (position, flag) in flags.iter().enumerate() {
            let Some(option) = self.index_of_short(&format!("-{flag}")) else {
                continue;
            };
            if self.options[option].kind.takes_argument() {
                return position + 1 == flags.len();
            }
        }
        false
    }

    fn resolve(&self, described: &str) -> Option<String> {
        described
            .split(|c: char| c.is_whitespace() || c == ',' || c == '=')
            .filter(|part| part.starts_with('-'))
            .find_map(|part| self.index_of_long(part).or_else(|| self.index_of_short(part)))
            .map(|index| self.options[index].long.clone())
    }
}

/// Converts a raw argument according to the option's kind.
fn coerce(definition: &OptionDefinition, raw: &str) -> Result<OptionValue> {
    let option = &definition.long;

    match definition.kind {
        Kind::String => Ok(OptionValue::String(raw.to_string())),
        Kind::Int => {
            let trimmed = raw.trim();
            INTEGER
                .is_match(trimmed)
                .then(|| trimmed.parse::<i64>().ok())
                .flatten()
                .map(OptionValue::Int)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "Argument of option \"{option}\" must be an integer."
                    ))
                })
        }
        Kind::Float => {
            let trimmed = raw.trim();
            let shaped = !trimmed.is_empty() && trimmed != "." && FLOAT.is_match(trimmed);
            shaped
                .then(|| trimmed.parse::<f64>().ok())
                .flatten()
                .map(OptionValue::Float)
                .ok_or_else(|| {
                    Error::Validation(format!("Argument of option \"{option}\" must be a float."))
                })
        }
        Kind::Choice => {
            if definition.patterns.iter().any(|pattern| pattern.is_match(raw)) {
                Ok(OptionValue::String(raw.to_string()))
            } else {
                Err(Error::Validation(format!(
                    "Invalid argument (invalid choice) for option \"{option}\"."
                )))
            }
        }
        Kind::List => Ok(OptionValue::List(split_list(raw))),
        Kind::Bool | Kind::Action => Ok(OptionValue::Bool(true)),
    }
}

fn utf8_args<I: IntoIterator<Item = OsString>>(raw: I) -> Result<Vec<String>> {
    raw.into_iter()
        .map(|arg| {
            arg.into_string().map_err(|arg| {
                Error::Config(format!("Argument {arg:?} is not valid UTF-8."))
            })
        })
        .collect()
}

/// Splits on commas, dropping trailing empty items.
fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = raw.split(',').map(str::to_string).collect();
    while items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    items
}

fn invalid_arg(err: &clap::Error) -> Option<String> {
    match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => Some(arg.clone()),
        _ => None,
    }
}

/// Removes an unknown option from the tokens before the `--` separator,
/// leaving alone the tokens `values` marks as option arguments.
/// Returns `false` when it cannot be found.
fn strip_unknown(tokens: &mut Vec<String>, values: &[bool], given: &str) -> bool {
    let end = tokens
        .iter()
        .position(|token| token == "--")
        .unwrap_or(tokens.len());
    let is_option = |index: usize| !values.get(index).copied().unwrap_or(false);

    if given.starts_with("--") {
        let with_value = format!("{given}=");
        let Some(index) = tokens[..end].iter().enumerate().position(|(index, token)| {
            is_option(index) && (token == given || token.starts_with(&with_value))
        }) else {
            return false;
        };
        tokens.remove(index);
        return true;
    }

    let Some(flag) = given.strip_prefix('-').and_then(|rest| rest.chars().next()) else {
        return false;
    };
    let Some(index) = tokens[..end].iter().enumerate().position(|(index, token)| {
        is_option(index)
            && token.len() > 1
            && token.starts_with('-')
            && !token.starts_with("--")
            && token[1..].contains(flag)
    }) else {
        return false;
    };

    let remaining = token_without(&tokens[index], flag);
    if remaining == "-" {
        tokens.remove(index);
    } else {
        tokens[index] = remaining;
    }
    true
}

fn token_without(token: &str, flag: char) -> String {
    let mut removed = false;
    token
        .chars()
        .enumerate()
        .filter(|&(position, c)| {
            if position > 0 && c == flag && !removed {
                removed = true;
                return false;
            }
            true
        })
        .map(|(_, c)| c)
        .collect()
}
