//! Semantic, markup-styled terminal messages.

use std::cell::OnceCell;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use console::{Term, measure_text_width};

use super::markup::{self, StyleTable};
use crate::error::{Error, Result};
use crate::output;

const UP: &str = "\x1b[A";
const COLUMN_ZERO: &str = "\x1b[0G";
const TASK_INDENT: isize = 3;

/// Settings a renderer is created with.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Emit ANSI styles for markup.
    pub color: bool,
    /// Drop `info` and `debug` messages.
    pub quiet: bool,
    /// String repeated once per indentation level.
    pub indent_unit: String,
    /// Fixed terminal width; queried from the terminal when `None`.
    pub tty_width: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let output = output::config();
        Self {
            color: !output.no_color,
            quiet: output.quiet,
            indent_unit: " ".to_string(),
            tty_width: None,
        }
    }
}

/// What a message means; decides its default style and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Plain,
    Begin,
    Warn,
    Error,
    Debug,
    Info,
    /// Right-aligned status token closing a `Begin` line.
    End,
    Right,
}

impl MessageKind {
    /// Default style for kinds that get a glyph prefix.
    pub const fn default_color(self) -> Option<&'static str> {
        match self {
            Self::Begin => Some("bold green"),
            Self::Warn => Some("bold yellow"),
            Self::Error => Some("bold red"),
            Self::Debug => Some("magenta"),
            Self::Info => Some("bold cyan"),
            Self::Plain | Self::End | Self::Right => None,
        }
    }

    pub const fn is_right_aligned(self) -> bool {
        matches!(self, Self::End | Self::Right)
    }
}

/// Outcome symbols shown at the end of a task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Ok,
    Pass,
    Fail,
    Warn,
}

impl Status {
    /// Unknown symbols fall back to `ok`.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim().to_ascii_lowercase().as_str() {
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "warn" => Self::Warn,
            _ => Self::Ok,
        }
    }

    /// Markup of the bracketed token.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Ok => r#"<text style="bold blue">[ <text style="bold green">OK</text> ]</text> "#,
            Self::Pass => r#"<text style="bold blue">[<text style="bold cyan">PASS</text>]</text> "#,
            Self::Fail => r#"<text style="bold blue">[<text style="bold red">FAIL</text>]</text> "#,
            Self::Warn => {
                r#"<text style="bold blue">[<text style="bold yellow">WARN</text>]</text> "#
            }
        }
    }
}

/// Arguments of [`Renderer::write`].
///
/// Constructors set the message together with its kind; the chained setters
/// cover the remaining knobs.
#[derive(Debug, Clone, Default)]
pub struct WriteArgs {
    pub message: String,
    pub kind: MessageKind,
    /// Style override for the glyph or the whole line.
    pub color: Option<String>,
    /// Style the whole line instead of prefixing a styled `*`.
    pub full_color: bool,
    /// Append `...`; plain messages default to `true`, every other kind to `false`.
    pub dots: Option<bool>,
    /// Indentation level override.
    pub indent: Option<usize>,
    /// Print the message without markup parsing.
    pub plain: bool,
    /// Defaults to `true`.
    pub newline: Option<bool>,
    pub exit_after: bool,
    /// Stop the script after printing; exit status defaults to 1.
    pub fatal: Option<bool>,
    pub code: Option<i32>,
    /// Move the cursor one line up first.
    pub up: Option<bool>,
}

impl WriteArgs {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Plain, message)
    }

    pub fn with_kind(kind: MessageKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn begin(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Begin, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Error, message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Info, message)
    }

    pub fn end(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::End, message)
    }

    pub fn right(message: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::Right, message)
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub const fn full_color(mut self, full_color: bool) -> Self {
        self.full_color = full_color;
        self
    }

    #[must_use]
    pub const fn dots(mut self, dots: bool) -> Self {
        self.dots = Some(dots);
        self
    }

    #[must_use]
    pub const fn indent(mut self, level: usize) -> Self {
        self.indent = Some(level);
        self
    }

    #[must_use]
    pub const fn plain(mut self, plain: bool) -> Self {
        self.plain = plain;
        self
    }

    #[must_use]
    pub const fn newline(mut self, newline: bool) -> Self {
        self.newline = Some(newline);
        self
    }

    #[must_use]
    pub const fn exit_after(mut self, exit_after: bool) -> Self {
        self.exit_after = exit_after;
        self
    }

    #[must_use]
    pub const fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = Some(fatal);
        self
    }

    #[must_use]
    pub const fn code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub const fn up(mut self, up: bool) -> Self {
        self.up = Some(up);
        self
    }

    fn appends_dots(&self) -> bool {
        match self.kind {
            MessageKind::Plain => self.dots.unwrap_or(true),
            MessageKind::End | MessageKind::Right => self.dots.unwrap_or(false),
            _ => false,
        }
    }

    /// Exit status requested by this message, if any.
    fn requested_exit(&self) -> Option<i32> {
        let fatal = self.fatal.unwrap_or(false);
        if !(self.exit_after || fatal) {
            return None;
        }
        Some(self.code.unwrap_or(if fatal { 1 } else { 0 }))
    }
}

impl From<&str> for WriteArgs {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for WriteArgs {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Arguments of [`Renderer::task`].
#[derive(Debug, Clone)]
pub struct TaskArgs {
    pub message: String,
    /// Print the `begin` line and indent the block.
    pub show_message: bool,
    /// Print the status line when the block is done.
    pub show_result: bool,
}

impl TaskArgs {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            show_message: true,
            show_result: true,
        }
    }

    #[must_use]
    pub const fn show_message(mut self, show: bool) -> Self {
        self.show_message = show;
        self
    }

    #[must_use]
    pub const fn show_result(mut self, show: bool) -> Self {
        self.show_result = show;
        self
    }
}

/// What a task block reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub status: Status,
    /// A non-`ok` status stops the script.
    pub fatal: bool,
}

impl From<Status> for TaskOutcome {
    fn from(status: Status) -> Self {
        Self {
            status,
            fatal: true,
        }
    }
}

/// Renders semantic messages with inline markup to a terminal.
///
/// Every renderer owns its style table and indentation state, so several can
/// coexist without affecting each other.
pub struct Renderer {
    out: Box<dyn Write>,
    styles: StyleTable,
    config: RendererConfig,
    indent_level: usize,
    tty_width: OnceCell<usize>,
    show_commands: bool,
    show_outputs: bool,
    skip_commands: bool,
}

impl Renderer {
    /// A renderer writing to stdout with the global output settings.
    pub fn new() -> Self {
        Self::with_writer(RendererConfig::default(), Box::new(io::stdout()))
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    pub fn with_writer(config: RendererConfig, out: Box<dyn Write>) -> Self {
        Self {
            out,
            styles: StyleTable::for_color(config.color),
            config,
            indent_level: 0,
            tty_width: OnceCell::new(),
            show_commands: false,
            show_outputs: false,
            skip_commands: false,
        }
    }

    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub const fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Sets the indentation level, relative to the current one unless
    /// `absolute`. Never goes below 0.
    pub fn set_indent(&mut self, level: isize, absolute: bool) {
        let base = if absolute { 0 } else { self.indent_level as isize };
        self.indent_level = (base + level).max(0) as usize;
    }

    pub const fn reset_indent(&mut self) {
        self.indent_level = 0;
    }

    /// Runs `block` at a different indentation level and restores the
    /// previous level afterwards, whether the block succeeds, fails or
    /// panics.
    pub fn with_indent<T, F>(&mut self, level: isize, absolute: bool, block: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved = self.indent_level;
        self.set_indent(level, absolute);
        let result = panic::catch_unwind(AssertUnwindSafe(|| block(&mut *self)));
        self.indent_level = saved;
        result.unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    /// Prefixes `message` with the indentation for `level` (current level when `None`).
    pub fn indent(&self, message: &str, level: Option<usize>) -> String {
        let level = level.unwrap_or(self.indent_level);
        format!("{}{message}", self.config.indent_unit.repeat(level))
    }

    pub const fn show_commands(&self) -> bool {
        self.show_commands
    }

    pub const fn set_show_commands(&mut self, show: bool) {
        self.show_commands = show;
    }

    pub const fn show_outputs(&self) -> bool {
        self.show_outputs
    }

    pub const fn set_show_outputs(&mut self, show: bool) {
        self.show_outputs = show;
    }

    pub const fn skip_commands(&self) -> bool {
        self.skip_commands
    }

    pub const fn set_skip_commands(&mut self, skip: bool) {
        self.skip_commands = skip;
    }

    /// Terminal width, queried once and cached.
    pub fn tty_width(&self) -> usize {
        *self.tty_width.get_or_init(|| {
            self.config
                .tty_width
                .unwrap_or_else(|| usize::from(Term::stdout().size().1))
        })
    }

    /// Converts markup into styled text.
    ///
    /// Malformed markup is reported on the renderer's output and returned as
    /// [`Error::Format`].
    pub fn render_markup(&mut self, text: &str) -> Result<String> {
        match markup::render(text, &self.styles) {
            Ok(rendered) => Ok(rendered),
            Err(err) => {
                write!(
                    self.out,
                    "[ERROR] Invalid message tagging, check XML syntax (or color requested) of the following message:\n\n\t{text}\n\n\tThe errors was: {err}\n\n"
                )?;
                self.out.flush()?;
                Err(Error::Format {
                    markup: text.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Composes a message exactly as [`write`](Self::write) prints it, minus
    /// cursor movement.
    pub fn compose(&mut self, args: &WriteArgs) -> Result<String> {
        let level = args.indent.or(Some(self.indent_level));

        let mut message = if let Some(default_color) = args.kind.default_color() {
            let color = args.color.as_deref().unwrap_or(default_color);
            if args.full_color {
                self.indent(&format!("<text style=\"{color}\">{}</text>", args.message), level)
            } else {
                format!(
                    " <text style=\"{color}\">*</text> {}",
                    self.indent(&args.message, level)
                )
            }
        } else {
            let dots = if args.appends_dots() { "..." } else { "" };
            self.indent(&format!("{}{dots}", args.message), level)
        };

        if !args.plain {
            message = self.render_markup(&message)?;
        }

        if args.newline.unwrap_or(true) {
            message.push('\n');
        }

        Ok(message)
    }

    /// Prints a message.
    ///
    /// Returns [`Error::Exit`] after printing when the message asked the
    /// script to stop.
    pub fn write(&mut self, args: WriteArgs) -> Result<()> {
        let suppressed =
            self.config.quiet && matches!(args.kind, MessageKind::Info | MessageKind::Debug);

        if !suppressed {
            let message = self.compose(&args)?;

            if args.kind.is_right_aligned() {
                let visible = measure_text_width(message.trim_end_matches('\n'));
                let padding = self.tty_width().saturating_sub(visible);
                if args.up.unwrap_or(false) {
                    self.out.write_all(UP.as_bytes())?;
                }
                self.out.write_all(COLUMN_ZERO.as_bytes())?;
                if padding > 0 {
                    write!(self.out, "\x1b[{padding}C")?;
                }
            }

            self.out.write_all(message.as_bytes())?;
            self.out.flush()?;
        }

        match args.requested_exit() {
            Some(code) => Err(Error::Exit { code }),
            None => Ok(()),
        }
    }

    /// Writes `text` verbatim.
    pub fn print_raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    pub fn warn(&mut self, args: impl Into<WriteArgs>) -> Result<()> {
        let mut args = args.into();
        args.kind = MessageKind::Warn;
        self.write(args)
    }

    pub fn error(&mut self, args: impl Into<WriteArgs>) -> Result<()> {
        let mut args = args.into();
        args.kind = MessageKind::Error;
        self.write(args)
    }

    /// Prints an error and stops the script, with status 1 unless the
    /// arguments carry another code.
    pub fn fatal(&mut self, args: impl Into<WriteArgs>) -> Result<()> {
        let mut args = args.into();
        args.kind = MessageKind::Error;
        args.exit_after = true;
        args.code = Some(args.code.unwrap_or(1));
        self.write(args)
    }

    /// Prints a bracketed status token right-aligned on the previous line.
    ///
    /// A `fail` status is fatal unless the arguments say otherwise.
    pub fn status(&mut self, status: Status, args: WriteArgs) -> Result<()> {
        let args = WriteArgs {
            message: status.token().to_string(),
            kind: MessageKind::End,
            dots: Some(false),
            up: Some(args.up.unwrap_or(true)),
            fatal: Some(args.fatal.unwrap_or(status == Status::Fail)),
            ..args
        };
        self.write(args)
    }

    /// Runs `block` as a task: a `begin` line, the block's own output
    /// indented below it, then the block's status on the `begin` line.
    ///
    /// A non-`ok` fatal outcome ends with [`Error::Exit`] with status 1.
    pub fn task<F>(&mut self, args: TaskArgs, block: F) -> Result<Status>
    where
        F: FnOnce(&mut Self) -> Result<TaskOutcome>,
    {
        let saved = self.indent_level;

        if args.show_message {
            self.write(WriteArgs::begin(&args.message))?;
            self.set_indent(TASK_INDENT, false);
        }

        let outcome = match block(self) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.indent_level = saved;
                return Err(err);
            }
        };

        let reported = if args.show_result {
            self.status(outcome.status, WriteArgs::default().fatal(false))
        } else {
            Ok(())
        };
        self.indent_level = saved;
        reported?;

        if outcome.status != Status::Ok && outcome.fatal {
            return Err(Error::Exit { code: 1 });
        }
        Ok(outcome.status)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("indent_level", &self.indent_level)
            .field("show_commands", &self.show_commands)
            .field("show_outputs", &self.show_outputs)
            .field("skip_commands", &self.skip_commands)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn config(color: bool) -> RendererConfig {
        RendererConfig {
            color,
            quiet: false,
            indent_unit: " ".to_string(),
            tty_width: Some(40),
        }
    }

    fn renderer(color: bool) -> (Renderer, Capture) {
        let capture = Capture::default();
        let renderer = Renderer::with_writer(config(color), Box::new(capture.clone()));
        (renderer, capture)
    }

    #[test]
    fn test_set_indent_relative_and_absolute() {
        let (mut r, _) = renderer(false);
        r.set_indent(2, false);
        r.set_indent(3, false);
        assert_eq!(r.indent_level(), 5);
        r.set_indent(1, true);
        assert_eq!(r.indent_level(), 1);
        r.set_indent(-4, false);
        assert_eq!(r.indent_level(), 0);
        r.set_indent(6, true);
        r.reset_indent();
        assert_eq!(r.indent_level(), 0);
    }

    #[test]
    fn test_with_indent_restores_after_error() {
        let (mut r, _) = renderer(false);
        r.set_indent(2, true);
        let result: Result<()> = r.with_indent(3, false, |r| {
            assert_eq!(r.indent_level(), 5);
            Err(Error::Config("boom".into()))
        });
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(r.indent_level(), 2);
    }

    #[test]
    fn test_with_indent_restores_after_panic() {
        let (mut r, _) = renderer(false);
        r.set_indent(1, true);
        let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<()> = r.with_indent(4, true, |_| panic!("block failed"));
        }));
        assert!(unwound.is_err());
        assert_eq!(r.indent_level(), 1);
    }

    #[test]
    fn test_plain_message_gets_dots_and_indent() {
        let (mut r, out) = renderer(false);
        r.set_indent(2, true);
        r.write(WriteArgs::new("Working")).unwrap();
        assert_eq!(out.text(), "  Working...\n");
    }

    #[test]
    fn test_plain_flag_skips_markup() {
        let (mut r, out) = renderer(true);
        r.write(WriteArgs::new("<b>raw").plain(true).dots(false).newline(false))
            .unwrap();
        assert_eq!(out.text(), "<b>raw");
    }

    #[test]
    fn test_begin_prefixes_styled_glyph() {
        let (mut r, out) = renderer(true);
        r.write(WriteArgs::begin("Copying")).unwrap();
        assert_eq!(out.text(), " \x1b[1m\x1b[32m*\x1b[0m Copying\n");
    }

    #[test]
    fn test_full_color_wraps_whole_line() {
        let (mut r, out) = renderer(true);
        r.write(WriteArgs::warn("Careful").full_color(true).color("red"))
            .unwrap();
        assert_eq!(out.text(), "\x1b[31mCareful\x1b[0m\n");
    }

    #[test]
    fn test_status_is_right_aligned_on_previous_line() {
        let (mut r, out) = renderer(false);
        r.status(Status::Ok, WriteArgs::default()).unwrap();
        // "[ OK ] " is 7 columns wide on a 40 column terminal
        assert_eq!(out.text(), "\x1b[A\x1b[0G\x1b[33C[ OK ] \n");
    }

    #[test]
    fn test_status_padding_ignores_escape_sequences() {
        let (mut r, out) = renderer(true);
        r.status(Status::Pass, WriteArgs::default().up(false)).unwrap();
        assert!(out.text().starts_with("\x1b[0G\x1b[33C"));
    }

    #[test]
    fn test_fail_status_is_fatal_by_default() {
        let (mut r, _) = renderer(false);
        let err = r.status(Status::Fail, WriteArgs::default()).unwrap_err();
        assert!(matches!(err, Error::Exit { code: 1 }));

        let (mut r, _) = renderer(false);
        assert!(r.status(Status::Fail, WriteArgs::default().fatal(false)).is_ok());
    }

    #[test]
    fn test_exit_after_uses_code() {
        let (mut r, out) = renderer(false);
        let err = r.write(WriteArgs::new("bye").exit_after(true)).unwrap_err();
        assert!(matches!(err, Error::Exit { code: 0 }));
        assert_eq!(out.text(), "bye...\n");

        let err = r.write(WriteArgs::new("bye").fatal(true)).unwrap_err();
        assert!(matches!(err, Error::Exit { code: 1 }));
    }

    #[test]
    fn test_fatal_defaults_to_status_one() {
        let (mut r, out) = renderer(false);
        let err = r.fatal("Broken").unwrap_err();
        assert!(matches!(err, Error::Exit { code: 1 }));
        assert_eq!(out.text(), " * Broken\n");

        let err = r.fatal(WriteArgs::new("Broken").code(4)).unwrap_err();
        assert!(matches!(err, Error::Exit { code: 4 }));
    }

    #[test]
    fn test_quiet_suppresses_info_and_debug() {
        let capture = Capture::default();
        let mut r = Renderer::with_writer(
            RendererConfig {
                quiet: true,
                ..config(false)
            },
            Box::new(capture.clone()),
        );
        r.write(WriteArgs::info("hidden")).unwrap();
        r.write(WriteArgs::debug("hidden")).unwrap();
        r.warn("shown").unwrap();
        assert_eq!(capture.text(), " * shown\n");
    }

    #[test]
    fn test_malformed_markup_is_reported() {
        let (mut r, out) = renderer(true);
        let err = r.write(WriteArgs::new("<text>oops")).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(out.text().contains("[ERROR] Invalid message tagging"));
        assert!(out.text().contains("<text>oops"));
    }

    #[test]
    fn test_task_reports_status_and_restores_indent() {
        let (mut r, out) = renderer(false);
        let status = r
            .task(TaskArgs::new("Building"), |r| {
                assert_eq!(r.indent_level(), 3);
                r.write(WriteArgs::new("step").dots(false))?;
                Ok(Status::Pass.into())
            })
            .unwrap();
        assert_eq!(status, Status::Pass);
        assert_eq!(r.indent_level(), 0);
        let text = out.text();
        assert!(text.starts_with(" * Building\n   step\n"));
        assert!(text.ends_with("[PASS] \n"));
    }

    #[test]
    fn test_task_failure_is_fatal_when_requested() {
        let (mut r, _) = renderer(false);
        let err = r
            .task(TaskArgs::new("Deploying"), |_| Ok(Status::Fail.into()))
            .unwrap_err();
        assert!(matches!(err, Error::Exit { code: 1 }));

        let status = r
            .task(TaskArgs::new("Deploying"), |_| {
                Ok(TaskOutcome {
                    status: Status::Warn,
                    fatal: false,
                })
            })
            .unwrap();
        assert_eq!(status, Status::Warn);
    }

    #[test]
    fn test_status_from_symbol() {
        assert_eq!(Status::from_symbol("fail"), Status::Fail);
        assert_eq!(Status::from_symbol("PASS"), Status::Pass);
        assert_eq!(Status::from_symbol("whatever"), Status::Ok);
    }

    #[test]
    fn test_script_flags() {
        let (mut r, _) = renderer(false);
        r.set_show_commands(true);
        r.set_skip_commands(true);
        assert!(r.show_commands());
        assert!(!r.show_outputs());
        assert!(r.skip_commands());
    }
}
