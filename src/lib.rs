//! # scriptkit - Building blocks for command-line scripts
//!
//! `scriptkit` gives small CLI scripts two things: declarative, typed
//! command-line options, and a terminal renderer for progress and status
//! messages styled with a tiny inline markup.
//!
//! ## Features
//!
//! - **Typed options**: bool, string, int, float, choice, list and action
//!   options, validated while parsing
//! - **Help listing**: generated from the declarations, sorted by priority
//! - **Markup**: `<text style="bold red">...</text>` spans rendered to ANSI,
//!   with nested spans restoring their parent's style
//! - **Semantic messages**: begin/info/warn/error/debug lines and right-aligned
//!   `[ OK ]` style status tokens
//!
//! ## Quick Start
//!
//! ```no_run
//! use scriptkit::options::{Kind, OptionDefinition, OptionRegistry, ParseOptions, ParserInfo};
//! use scriptkit::ui::{Renderer, Status, WriteArgs};
//!
//! fn run() -> scriptkit::Result<()> {
//!     let mut options = OptionRegistry::new(ParserInfo::new("backup").version("1.0.0"));
//!     options.register(
//!         OptionDefinition::new("target", "t", "target")
//!             .required(true)
//!             .help("Where to copy to."),
//!     )?;
//!     options.parse_env(ParseOptions::default())?;
//!
//!     let mut console = Renderer::new();
//!     console.write(WriteArgs::begin(format!("Copying to {}", options.string("target")?)))?;
//!     console.status(Status::Ok, WriteArgs::default())
//! }
//!
//! fn main() {
//!     if let Err(err) = run() {
//!         std::process::exit(err.exit_code());
//!     }
//! }
//! ```
//!
//! Failures are printed where they happen and come back as
//! [`Error`]; only the caller's `main` ends the process.

/// Error type shared by every module.
pub mod error;

/// Option declarations, parsing and help listing.
pub mod options;

/// Global output configuration (quiet mode, colors).
pub mod output;

/// Terminal UI components (markup renderer, messages, prompts).
pub mod ui;

pub use error::{Error, Result};
