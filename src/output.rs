//! Global output configuration.
//!
//! Scripts decide once, at startup, whether the terminal should be quiet and
//! whether colors are allowed. Renderers built with
//! [`RendererConfig::default`](crate::ui::RendererConfig) pick these settings
//! up; renderers built with an explicit config ignore them.
//!
//! - Quiet mode suppresses `info` and `debug` messages
//! - Colors can be disabled via flag or `NO_COLOR` environment variable

use std::sync::OnceLock;

/// Global output configuration.
static OUTPUT_CONFIG: OnceLock<OutputConfig> = OnceLock::new();

/// Output configuration settings.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Disable colored output.
    pub no_color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            // Check NO_COLOR environment variable (https://no-color.org/)
            no_color: std::env::var_os("NO_COLOR").is_some(),
        }
    }
}

/// Initialize the global output configuration.
///
/// This should be called once at startup with the parsed flags.
/// If called multiple times, subsequent calls are ignored.
pub fn init(config: OutputConfig) {
    let _ = OUTPUT_CONFIG.set(config);
}

/// Get the current output configuration.
pub fn config() -> &'static OutputConfig {
    OUTPUT_CONFIG.get_or_init(OutputConfig::default)
}

/// Check if colors are disabled.
pub fn is_no_color() -> bool {
    config().no_color
}
