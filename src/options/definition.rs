//! Option kinds, values and declarations.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

// unwrap is safe: patterns are compile-time constants
#[allow(clippy::unwrap_used)]
static SHORT_FORM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-[0-9A-Za-z]$").unwrap());

#[allow(clippy::unwrap_used)]
static LONG_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--[0-9A-Za-z][0-9A-Za-z-]*$").unwrap());

/// The type tag governing how an option's argument is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kind {
    /// Flag without argument.
    Bool,
    /// Free-form string argument.
    #[default]
    String,
    /// Decimal integer argument.
    Int,
    /// Decimal float argument.
    Float,
    /// String argument that must match one of a list of patterns.
    Choice,
    /// Comma separated list of strings.
    List,
    /// Flag without argument that runs a callback when given.
    Action,
}

impl Kind {
    /// Every recognized kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Bool,
        Self::String,
        Self::Int,
        Self::Float,
        Self::Choice,
        Self::List,
        Self::Action,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Choice => "choice",
            Self::List => "list",
            Self::Action => "action",
        }
    }

    /// Returns `true` when the option consumes an argument on the command line.
    pub const fn takes_argument(self) -> bool {
        !matches!(self, Self::Bool | Self::Action)
    }

    /// The value an option of this kind holds when neither the caller nor the
    /// command line supplied one.
    pub fn zero_value(self) -> OptionValue {
        match self {
            Self::Bool | Self::Action => OptionValue::Bool(false),
            Self::String | Self::Choice => OptionValue::String(String::new()),
            Self::Int => OptionValue::Int(0),
            Self::Float => OptionValue::Float(0.0),
            Self::List => OptionValue::List(Vec::new()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(|kind| kind.name()).collect();
                Error::Config(format!(
                    "Invalid option type {s}. Valid types are the following:\n\t{}.",
                    valid.join(", ")
                ))
            })
    }
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl OptionValue {
    /// Returns `true` when this value has the Rust type options of `kind` hold.
    pub const fn matches_kind(&self, kind: Kind) -> bool {
        matches!(
            (self, kind),
            (Self::Bool(_), Kind::Bool | Kind::Action)
                | (Self::Int(_), Kind::Int)
                | (Self::Float(_), Kind::Float)
                | (Self::String(_), Kind::String | Kind::Choice)
                | (Self::List(_), Kind::List)
        )
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(",")),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Callback run by [`Kind::Action`] options when they appear on the command line.
pub type ActionCallback = Box<dyn FnMut()>;

/// Declaration of one command-line option.
///
/// Built with chained setters and handed to
/// [`OptionRegistry::register`](crate::options::OptionRegistry::register),
/// which normalizes and validates it.
///
/// ```
/// use scriptkit::options::{Kind, OptionDefinition};
///
/// let count = OptionDefinition::new("count", "c", "count")
///     .kind(Kind::Int)
///     .default_value(3)
///     .meta("N")
///     .help("How many times to repeat.");
/// assert_eq!(count.name(), "count");
/// ```
pub struct OptionDefinition {
    pub(crate) name: String,
    pub(crate) short: String,
    pub(crate) long: String,
    pub(crate) kind: Kind,
    pub(crate) default: Option<OptionValue>,
    pub(crate) required: bool,
    pub(crate) choices: Vec<String>,
    pub(crate) patterns: Vec<Regex>,
    pub(crate) action: Option<ActionCallback>,
    pub(crate) help: String,
    pub(crate) meta: Option<String>,
    pub(crate) priority: i64,
    pub(crate) value: Option<OptionValue>,
}

impl OptionDefinition {
    /// Starts a declaration. Dashes on `short` and `long` are optional.
    pub fn new(name: impl Into<String>, short: impl Into<String>, long: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: short.into(),
            long: long.into(),
            kind: Kind::default(),
            default: None,
            required: false,
            choices: Vec::new(),
            patterns: Vec::new(),
            action: None,
            help: String::new(),
            meta: None,
            priority: 0,
            value: None,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Patterns accepted by a [`Kind::Choice`] option. Each entry is a regular
    /// expression searched anywhere in the argument.
    #[must_use]
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn action(mut self, callback: impl FnMut() + 'static) -> Self {
        self.action = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Placeholder shown for the argument in the help listing.
    #[must_use]
    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Help listing order; lower values are listed first.
    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Same as [`priority`](Self::priority) for textual input; anything that
    /// is not an integer becomes 0.
    #[must_use]
    pub fn priority_str(mut self, priority: &str) -> Self {
        self.priority = priority.trim().parse().unwrap_or(0);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub const fn option_kind(&self) -> Kind {
        self.kind
    }

    pub const fn is_required(&self) -> bool {
        self.required
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub fn meta_variable(&self) -> Option<&str> {
        self.meta.as_deref()
    }

    pub const fn display_priority(&self) -> i64 {
        self.priority
    }

    /// The value given on the command line, if any.
    pub const fn provided_value(&self) -> Option<&OptionValue> {
        self.value.as_ref()
    }

    /// The declared default, or the kind's zero value.
    pub fn declared_default(&self) -> OptionValue {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.zero_value())
    }

    /// Brings a fresh declaration into canonical form and checks it.
    ///
    /// Uniqueness against other options is the registry's business.
    pub(crate) fn normalize(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(Error::Config("Every option requires a name.".to_string()));
        }

        match self.kind {
            Kind::Bool => {
                self.default = Some(OptionValue::Bool(self.default == Some(OptionValue::Bool(true))));
            }
            Kind::Action => {
                self.required = false;
                self.default = Some(OptionValue::Bool(false));
            }
            kind => {
                if !self.default.as_ref().is_some_and(|value| value.matches_kind(kind)) {
                    self.default = Some(kind.zero_value());
                }
            }
        }

        if !self.short.starts_with('-') {
            self.short.insert(0, '-');
        }
        while !self.long.starts_with("--") {
            self.long.insert(0, '-');
        }

        if !SHORT_FORM.is_match(&self.short) {
            return Err(Error::Config(format!(
                "Invalid short form \"{}\".",
                self.short
            )));
        }
        if !LONG_FORM.is_match(&self.long) {
            return Err(Error::Config(format!("Invalid long form \"{}\".", self.long)));
        }

        if self.kind == Kind::Choice {
            if self.choices.is_empty() {
                return Err(Error::Config(format!(
                    "Option \"{}\" of type choice requires a valid choices list (every element should be a regular expression).",
                    self.name
                )));
            }
            self.patterns = self
                .choices
                .iter()
                .map(|choice| {
                    Regex::new(choice).map_err(|err| {
                        Error::Config(format!(
                            "Invalid choice \"{choice}\" for option \"{}\": {err}",
                            self.name
                        ))
                    })
                })
                .collect::<Result<_>>()?;
        }

        if self.kind == Kind::Action && self.action.is_none() {
            return Err(Error::Config(format!(
                "Option \"{}\" of type action requires a action block.",
                self.name
            )));
        }

        Ok(self)
    }

    /// The single character of the short form.
    pub(crate) fn short_char(&self) -> char {
        self.short.chars().nth(1).unwrap_or('-')
    }

    /// The long form without its leading dashes.
    pub(crate) fn long_name(&self) -> &str {
        self.long.strip_prefix("--").unwrap_or(&self.long)
    }
}

impl fmt::Debug for OptionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDefinition")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("long", &self.long)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("choices", &self.choices)
            .field("action", &self.action.as_ref().map(|_| "<callback>"))
            .field("help", &self.help)
            .field("meta", &self.meta)
            .field("priority", &self.priority)
            .field("value", &self.value)
            .finish()
    }
}
