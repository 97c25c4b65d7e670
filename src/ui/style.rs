//! Inline styling for plain listings printed outside the markup renderer.
//!
//! Provides color helpers using owo-colors; every helper returns the bare
//! text when colors are disabled.

use owo_colors::OwoColorize;
use std::fmt::Display;

use crate::output;

/// Styles for different semantic elements.
pub struct Style;

impl Style {
    /// Style for section headers (e.g., "Options", "Arguments")
    pub fn header<T: Display>(text: T) -> String {
        if output::is_no_color() {
            return text.to_string();
        }
        format!("{}", text.bold())
    }

    /// Style for option names
    pub fn label<T: Display>(text: T) -> String {
        if output::is_no_color() {
            return text.to_string();
        }
        format!("{}", text.dimmed())
    }

    /// Style for option values
    pub fn value<T: Display>(text: T) -> String {
        if output::is_no_color() {
            return text.to_string();
        }
        format!("{}", text.cyan())
    }

    /// Style for notes such as "(default)"
    pub fn hint<T: Display>(text: T) -> String {
        if output::is_no_color() {
            return text.to_string();
        }
        format!("{}", text.dimmed().italic())
    }
}
