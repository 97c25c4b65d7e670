use std::path::Path;

use super::registry::OptionRegistry;
use crate::error::Result;

/// Columns between the widest option column and the help text.
const HELP_GAP: usize = 5;

impl OptionRegistry {
    /// Formats the help listing.
    ///
    /// Options are sorted by ascending priority, ties keeping registration
    /// order. Nothing is printed.
    pub fn help_text(&self) -> String {
        let mut text = String::new();

        if let Some(name) = &self.info.name {
            text.push_str(name);
            if let Some(version) = self.info.version.as_deref().filter(|v| !v.is_empty()) {
                text.push(' ');
                text.push_str(version);
            }
            if let Some(description) = &self.info.description {
                text.push_str(" - ");
                text.push_str(description);
            }
            text.push('\n');
        }

        let messages = &self.info.messages;
        if let Some(pre_usage) = &messages.pre_usage {
            text.push_str(pre_usage);
            text.push('\n');
        }
        match &self.info.usage {
            Some(usage) => text.push_str(usage),
            None => text.push_str(&format!("Usage: {} [OPTIONS]", self.invoked_name())),
        }
        text.push('\n');

        if let Some(pre_options) = &messages.pre_options {
            text.push_str(pre_options);
            text.push('\n');
        }
        text.push_str("\nValid options are:\n");

        let mut sorted: Vec<_> = self.options.iter().collect();
        sorted.sort_by_key(|definition| definition.priority);

        let rows: Vec<(String, &str)> = sorted
            .into_iter()
            .map(|definition| {
                let mut row = format!("{}, {}", definition.short, definition.long);
                if definition.kind.takes_argument() {
                    row.push('=');
                    row.push_str(definition.meta.as_deref().unwrap_or("ARG"));
                }
                (row, definition.help.as_str())
            })
            .collect();

        let width = rows
            .iter()
            .map(|(row, _)| row.chars().count())
            .max()
            .unwrap_or(0);

        for (row, help) in rows {
            let padding = HELP_GAP + width - row.chars().count();
            text.push_str(&format!("\t{row}{}{help}\n", " ".repeat(padding)));
        }

        if let Some(post_options) = &messages.post_options {
            text.push_str(post_options);
            text.push('\n');
        }

        text
    }

    /// Writes the help listing to the registry's renderer.
    pub fn print_help(&mut self) -> Result<()> {
        let text = self.help_text();
        self.renderer.print_raw(&text)
    }

    /// Name the program was started as.
    fn invoked_name(&self) -> String {
        std::env::args_os()
            .next()
            .and_then(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .or_else(|| self.info.name.clone())
            .unwrap_or_else(|| "script".to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::options::{Kind, OptionDefinition, OptionRegistry, ParserInfo};
    use crate::ui::{Renderer, RendererConfig};
    use std::io;

    fn registry(info: ParserInfo) -> OptionRegistry {
        let renderer = Renderer::with_writer(
            RendererConfig {
                color: false,
                quiet: false,
                indent_unit: " ".to_string(),
                tty_width: Some(80),
            },
            Box::new(io::sink()),
        );
        OptionRegistry::with_renderer(info, renderer)
    }

    #[test]
    fn test_help_header_and_messages() {
        let reg = registry(
            ParserInfo::new("deploy")
                .version("1.2.0")
                .description("Ships things.")
                .usage("Usage: deploy [OPTIONS] TARGET")
                .pre_usage("Before usage.")
                .pre_options("Before options.")
                .post_options("After options."),
        );
        let text = reg.help_text();
        assert!(text.starts_with(
            "deploy 1.2.0 - Ships things.\nBefore usage.\nUsage: deploy [OPTIONS] TARGET\nBefore options.\n\nValid options are:\n"
        ));
        assert!(text.ends_with("After options.\n"));
    }

    #[test]
    fn test_help_synthesizes_usage() {
        let reg = registry(ParserInfo::default());
        let text = reg.help_text();
        assert!(text.starts_with("Usage: "));
        assert!(text.contains(" [OPTIONS]\n"));
    }

    #[test]
    fn test_help_rows_sorted_and_aligned() {
        let mut reg = registry(ParserInfo::new("demo"));
        reg.register_all([
            OptionDefinition::new("count", "c", "count")
                .kind(Kind::Int)
                .meta("N")
                .priority(2)
                .help("How many."),
            OptionDefinition::new("verbose", "v", "verbose")
                .kind(Kind::Bool)
                .priority(1)
                .help("Talk more."),
            OptionDefinition::new("name", "n", "name")
                .priority(2)
                .help("Who."),
        ])
        .unwrap();

        let text = reg.help_text();
        let rows: Vec<&str> = text.lines().filter(|line| line.starts_with('\t')).collect();
        // widest row is "-n, --name=ARG" (14 columns)
        let expected = [
            format!("\t-v, --verbose{}Talk more.", " ".repeat(6)),
            format!("\t-c, --count=N{}How many.", " ".repeat(6)),
            format!("\t-n, --name=ARG{}Who.", " ".repeat(5)),
            format!("\t-h, --help{}Show this message.", " ".repeat(9)),
        ];
        assert_eq!(rows, expected);
    }
}
