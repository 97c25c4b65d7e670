//! Declarative command-line options.
//!
//! Declare options on an [`OptionRegistry`], parse the argument vector, then
//! read typed values back:
//!
//! ```no_run
//! use scriptkit::options::{Kind, OptionDefinition, OptionRegistry, ParseOptions, ParserInfo};
//!
//! # fn main() -> scriptkit::Result<()> {
//! let mut registry = OptionRegistry::new(ParserInfo::new("deploy").version("1.0.0"));
//! registry.register(OptionDefinition::new("count", "c", "count").kind(Kind::Int))?;
//! registry.parse_env(ParseOptions::default())?;
//! let count = registry.int("count")?;
//! # Ok(())
//! # }
//! ```

mod definition;
mod help;
mod parse;
mod registry;

pub use definition::{ActionCallback, Kind, OptionDefinition, OptionValue};
pub use parse::ParseOptions;
pub use registry::{HelpMessages, OptionRegistry, ParserInfo};
