//! The option registry: declarations, identity indexes and value queries.

use std::collections::{BTreeMap, HashMap};

use super::definition::{Kind, OptionDefinition, OptionValue};
use crate::error::{Error, Result};
use crate::ui::markup;
use crate::ui::{Renderer, WriteArgs};

pub(crate) const HELP_OPTION: &str = "help";

/// Free-form messages placed around the help listing.
#[derive(Debug, Clone, Default)]
pub struct HelpMessages {
    /// Printed before the usage line.
    pub pre_usage: Option<String>,
    /// Printed before the option list.
    pub pre_options: Option<String>,
    /// Printed after the option list.
    pub post_options: Option<String>,
}

/// Describes the program owning a registry, for the help listing.
#[derive(Debug, Clone, Default)]
pub struct ParserInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Replaces the synthesized `Usage: <program> [OPTIONS]` line.
    pub usage: Option<String>,
    pub messages: HelpMessages,
}

impl ParserInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    #[must_use]
    pub fn pre_usage(mut self, message: impl Into<String>) -> Self {
        self.messages.pre_usage = Some(message.into());
        self
    }

    #[must_use]
    pub fn pre_options(mut self, message: impl Into<String>) -> Self {
        self.messages.pre_options = Some(message.into());
        self
    }

    #[must_use]
    pub fn post_options(mut self, message: impl Into<String>) -> Self {
        self.messages.post_options = Some(message.into());
        self
    }
}

/// Declared options, in registration order, plus what the last parse found.
///
/// Configuration and parse failures are printed through the registry's own
/// [`Renderer`] before they are returned.
pub struct OptionRegistry {
    pub(crate) info: ParserInfo,
    pub(crate) renderer: Renderer,
    pub(crate) options: Vec<OptionDefinition>,
    by_name: HashMap<String, usize>,
    by_short: HashMap<String, usize>,
    by_long: HashMap<String, usize>,
    pub(crate) args: Vec<String>,
    pub(crate) cmdline: Vec<String>,
}

impl OptionRegistry {
    /// A registry reporting through a stdout renderer.
    pub fn new(info: ParserInfo) -> Self {
        Self::with_renderer(info, Renderer::new())
    }

    /// A registry reporting through `renderer`. The `help` flag is declared
    /// right away.
    pub fn with_renderer(info: ParserInfo, renderer: Renderer) -> Self {
        let mut registry = Self {
            info,
            renderer,
            options: Vec::new(),
            by_name: HashMap::new(),
            by_short: HashMap::new(),
            by_long: HashMap::new(),
            args: Vec::new(),
            cmdline: Vec::new(),
        };

        let help = OptionDefinition::new(HELP_OPTION, "-h", "--help")
            .kind(Kind::Bool)
            .default_value(false)
            .help("Show this message.")
            .priority(1000);
        registry.insert(help);
        registry
    }

    pub const fn info(&self) -> &ParserInfo {
        &self.info
    }

    pub const fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub const fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> Renderer {
        self.renderer
    }

    /// Declares an option.
    ///
    /// The declaration is normalized first (dashes, default value, choice
    /// patterns), then checked for name and form collisions.
    pub fn register(&mut self, definition: OptionDefinition) -> Result<()> {
        let definition = match definition.normalize() {
            Ok(definition) => definition,
            Err(err) => return Err(self.fail(err)),
        };

        let collision = if self.by_name.contains_key(&definition.name) {
            Some(format!(
                "An option with name \"{}\" already exists.",
                definition.name
            ))
        } else if self.by_short.contains_key(&definition.short) {
            Some(format!(
                "An option with short or long form \"{}\" already exists.",
                definition.short
            ))
        } else if self.by_long.contains_key(&definition.long) {
            Some(format!(
                "An option with short or long form \"{}\" already exists.",
                definition.long
            ))
        } else {
            None
        };

        if let Some(message) = collision {
            return Err(self.fail(Error::Config(message)));
        }

        self.insert(definition);
        Ok(())
    }

    /// Declares several options, stopping at the first failure.
    pub fn register_all<I>(&mut self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = OptionDefinition>,
    {
        definitions
            .into_iter()
            .try_for_each(|definition| self.register(definition))
    }

    fn insert(&mut self, definition: OptionDefinition) {
        let index = self.options.len();
        self.by_name.insert(definition.name.clone(), index);
        self.by_short.insert(definition.short.clone(), index);
        self.by_long.insert(definition.long.clone(), index);
        self.options.push(definition);
    }

    /// Prints `err` as an error message and hands it back.
    ///
    /// When the report itself cannot be written, that failure is returned
    /// instead.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        let message = markup::escape(&err.to_string());
        match self.renderer.error(WriteArgs::error(message).dots(false)) {
            Ok(()) => err,
            Err(report) => report,
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Whether the last parse found the option on the command line.
    pub fn provided(&self, name: &str) -> bool {
        self.definition(name)
            .is_some_and(|definition| definition.value.is_some())
    }

    pub fn definition(&self, name: &str) -> Option<&OptionDefinition> {
        self.by_name.get(name).map(|&index| &self.options[index])
    }

    /// Declared options in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &OptionDefinition> {
        self.options.iter()
    }

    pub(crate) fn index_of_long(&self, long: &str) -> Option<usize> {
        self.by_long.get(long).copied()
    }

    pub(crate) fn index_of_short(&self, short: &str) -> Option<usize> {
        self.by_short.get(short).copied()
    }

    /// The value given on the command line, else the declared default.
    ///
    /// Unknown names are an error; they are not printed.
    pub fn get(&self, name: &str) -> Result<OptionValue> {
        self.lookup(name, None)
    }

    /// The value given on the command line, else `default` when set, else the
    /// declared default.
    pub fn lookup(&self, name: &str, default: Option<OptionValue>) -> Result<OptionValue> {
        let definition = self.definition(name).ok_or_else(|| unknown(name))?;
        Ok(definition
            .value
            .clone()
            .or(default)
            .unwrap_or_else(|| definition.declared_default()))
    }

    /// Values of the named options; every option when `names` is empty.
    /// Unknown names are skipped.
    pub fn values(&self, names: &[&str]) -> BTreeMap<String, OptionValue> {
        let selected: Vec<&str> = if names.is_empty() {
            self.options.iter().map(|definition| definition.name.as_str()).collect()
        } else {
            names.to_vec()
        };

        selected
            .into_iter()
            .filter_map(|name| Some((name.to_string(), self.get(name).ok()?)))
            .collect()
    }

    /// Every option value together with the positional arguments.
    pub fn fetch(&self) -> (BTreeMap<String, OptionValue>, &[String]) {
        (self.values(&[]), &self.args)
    }

    /// Positional arguments left by the last parse.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The raw tokens handed to the last parse.
    pub fn cmdline(&self) -> &[String] {
        &self.cmdline
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        self.get(name)?
            .as_bool()
            .ok_or_else(|| mismatch(name, Kind::Bool))
    }

    pub fn string(&self, name: &str) -> Result<String> {
        match self.get(name)? {
            OptionValue::String(value) => Ok(value),
            _ => Err(mismatch(name, Kind::String)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        self.get(name)?
            .as_int()
            .ok_or_else(|| mismatch(name, Kind::Int))
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        self.get(name)?
            .as_float()
            .ok_or_else(|| mismatch(name, Kind::Float))
    }

    pub fn list(&self, name: &str) -> Result<Vec<String>> {
        match self.get(name)? {
            OptionValue::List(values) => Ok(values),
            _ => Err(mismatch(name, Kind::List)),
        }
    }
}

impl std::fmt::Debug for OptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionRegistry")
            .field("info", &self.info)
            .field("options", &self.options)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

fn unknown(name: &str) -> Error {
    Error::Config(format!("Option \"{name}\" does not exist."))
}

fn mismatch(name: &str, kind: Kind) -> Error {
    Error::Config(format!("Option \"{name}\" does not hold a {kind} value."))
}
