//! Error taxonomy shared by the option parser and the console renderer.
//!
//! Nothing in the library terminates the process. Conditions that end a
//! script (bad declarations, bad input, malformed markup, help requests,
//! `fatal` messages) are reported through a renderer first and then returned
//! as an [`Error`]; the binary maps them to an exit status with
//! [`Error::exit_code`].

use std::io;

/// Errors produced by the option registry and the renderer.
#[derive(Debug)]
pub enum Error {
    /// Invalid option declaration, unknown option, missing argument or
    /// missing required option.
    Config(String),
    /// A provided argument failed its kind's coercion rule.
    Validation(String),
    /// Malformed inline markup.
    Format {
        /// The markup that failed to parse.
        markup: String,
        /// What the markup parser complained about.
        reason: String,
    },
    /// The caller asked for the script to stop with the given status.
    Exit { code: i32 },
    /// Reading from or writing to the terminal failed.
    Io(io::Error),
}

impl Error {
    /// Returns the process exit status this error should end the script with.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) => exitcode::USAGE,
            Self::Format { .. } => 1,
            Self::Exit { code } => *code,
            Self::Io(_) => exitcode::IOERR,
        }
    }

    /// Returns `true` when this is a plain termination request with status 0.
    pub const fn is_success_exit(&self) -> bool {
        matches!(self, Self::Exit { code: 0 })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) | Self::Validation(message) => write!(f, "{message}"),
            Self::Format { markup, reason } => {
                write!(f, "Invalid message tagging in '{markup}': {reason}")
            }
            Self::Exit { code } => write!(f, "Exit requested with status {code}"),
            Self::Io(err) => write!(f, "Terminal I/O failed: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
