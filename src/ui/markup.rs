//! Inline markup to ANSI rendering.
//!
//! Messages may carry `<text style="bold red">...</text>` spans. Spans nest;
//! when a span closes, the style of the enclosing span is emitted again so
//! nested text reverts to its parent's look instead of the terminal default.
//!
//! ```
//! use scriptkit::ui::markup::{self, StyleTable};
//!
//! let out = markup::render("a <text style=\"bold\">b</text>", &StyleTable::ansi()).unwrap();
//! assert_eq!(out, "a \x1b[1mb\x1b[0m");
//! ```

use std::collections::HashMap;
use std::fmt;

/// SGR sequences for every style name the markup understands.
pub const ANSI_STYLES: &[(&str, &str)] = &[
    ("default", "\x1b[0m"),
    ("bold", "\x1b[1m"),
    ("underline", "\x1b[4m"),
    ("blink", "\x1b[5m"),
    ("reverse", "\x1b[7m"),
    ("concealed", "\x1b[8m"),
    ("black", "\x1b[30m"),
    ("red", "\x1b[31m"),
    ("green", "\x1b[32m"),
    ("yellow", "\x1b[33m"),
    ("blue", "\x1b[34m"),
    ("magenta", "\x1b[35m"),
    ("cyan", "\x1b[36m"),
    ("white", "\x1b[37m"),
    ("bg_black", "\x1b[40m"),
    ("bg_red", "\x1b[41m"),
    ("bg_green", "\x1b[42m"),
    ("bg_yellow", "\x1b[43m"),
    ("bg_blue", "\x1b[44m"),
    ("bg_magenta", "\x1b[45m"),
    ("bg_cyan", "\x1b[46m"),
    ("bg_white", "\x1b[47m"),
];

/// Style name to escape sequence lookup, owned by each renderer.
#[derive(Debug, Clone)]
pub struct StyleTable {
    codes: HashMap<&'static str, &'static str>,
}

impl StyleTable {
    /// The full ANSI table.
    pub fn ansi() -> Self {
        Self {
            codes: ANSI_STYLES.iter().copied().collect(),
        }
    }

    /// A table that knows no styles: markup is still checked but renders as
    /// bare text.
    pub fn plain() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    pub fn for_color(color: bool) -> Self {
        if color { Self::ansi() } else { Self::plain() }
    }

    /// Escape sequence for `name`, or `""` for names the table does not know.
    pub fn code(&self, name: &str) -> &'static str {
        self.codes.get(name).copied().unwrap_or_default()
    }
}

/// Why a piece of markup could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupError {
    pub message: String,
    pub offset: usize,
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.offset)
    }
}

impl std::error::Error for MarkupError {}

/// A parsed markup node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Style names requested by a `text` element, `None` for anything else.
    fn styles(&self) -> Option<Vec<&str>> {
        if self.name != "text" {
            return None;
        }
        self.attribute("style")
            .map(|style| style.split_whitespace().collect())
    }
}

const ROOT_OPEN: &str = "<text>";
const ROOT_CLOSE: &str = "</text>";

/// Parses a markup document: exactly one root element, optionally surrounded
/// by whitespace.
pub fn parse(source: &str) -> Result<Element, MarkupError> {
    let mut parser = Parser { source, pos: 0 };
    parser.skip_whitespace();
    if !parser.rest().starts_with('<') {
        return Err(parser.error("document must start with an element"));
    }
    let root = parser.element()?;
    parser.skip_whitespace();
    if parser.pos < source.len() {
        return Err(parser.error("unexpected content after the root element"));
    }
    Ok(root)
}

/// Renders a markup fragment with `table`.
///
/// The fragment gets an implicit unstyled `text` root, so it may mix bare
/// text with any number of spans. Error offsets point into `source`.
pub fn render(source: &str, table: &StyleTable) -> Result<String, MarkupError> {
    let document = format!("{ROOT_OPEN}{source}{ROOT_CLOSE}");
    let root = parse(&document).map_err(|err| MarkupError {
        offset: err.offset.saturating_sub(ROOT_OPEN.len()).min(source.len()),
        ..err
    })?;
    Ok(render_element(&root, table))
}

/// Renders an already parsed tree.
pub fn render_element(root: &Element, table: &StyleTable) -> String {
    let mut out = String::new();
    let mut stack = Vec::new();
    walk(root, table, &mut stack, &mut out);
    out
}

fn walk<'a>(element: &'a Element, table: &StyleTable, stack: &mut Vec<Vec<&'a str>>, out: &mut String) {
    let styles = element.styles();

    if let Some(styles) = styles.clone() {
        for style in &styles {
            out.push_str(table.code(style));
        }
        stack.push(styles);
    }

    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) if inner.name == "text" => walk(inner, table, stack, out),
            Node::Element(_) => {}
        }
    }

    if styles.is_some() {
        stack.pop();
        match stack.last() {
            Some(previous) => {
                for style in previous {
                    out.push_str(table.code(style));
                }
            }
            None => out.push_str(table.code("default")),
        }
    }
}

/// Escapes text so it can be embedded in markup verbatim.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
    }

    fn expect(&mut self, token: &str) -> Result<(), MarkupError> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    fn name(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(rest.len());
        if len == 0 || !rest.starts_with(|c: char| c.is_alphabetic() || c == '_') {
            return Err(self.error("expected a tag or attribute name"));
        }
        let name = rest[..len].to_string();
        self.pos += len;
        Ok(name)
    }

    fn element(&mut self) -> Result<Element, MarkupError> {
        self.expect("<")?;
        let name = self.name()?;
        let mut attributes: Vec<(String, String)> = Vec::new();

        loop {
            let before = self.pos;
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(Element {
                    name,
                    attributes,
                    children: Vec::new(),
                });
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            if self.pos == before {
                return Err(self.error(format!("malformed start tag '{name}'")));
            }
            let key = self.name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.attribute_value()?;
            if attributes.iter().any(|(existing, _)| *existing == key) {
                return Err(self.error(format!("duplicate attribute '{key}'")));
            }
            attributes.push((key, value));
        }

        let children = self.children(&name)?;
        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    fn attribute_value(&mut self) -> Result<String, MarkupError> {
        let quote = match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => return Err(self.error("attribute value must be quoted")),
        };
        self.pos += 1;
        let rest = self.rest();
        let Some(end) = rest.find(quote) else {
            return Err(self.error("unterminated attribute value"));
        };
        let raw = &rest[..end];
        if raw.contains('<') {
            return Err(self.error("'<' is not allowed in attribute values"));
        }
        let value = decode_entities(raw).map_err(|message| self.error(message))?;
        self.pos += end + 1;
        Ok(value)
    }

    fn children(&mut self, name: &str) -> Result<Vec<Node>, MarkupError> {
        let mut children = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(format!("unclosed tag '{name}'")));
            }
            if rest.starts_with("</") {
                self.pos += 2;
                let closing = self.name()?;
                self.skip_whitespace();
                self.expect(">")?;
                if closing != name {
                    return Err(self.error(format!(
                        "mismatched closing tag '{closing}', expected '{name}'"
                    )));
                }
                return Ok(children);
            }
            if rest.starts_with("<!--") {
                let Some(end) = rest.find("-->") else {
                    return Err(self.error("unterminated comment"));
                };
                self.pos += end + 3;
                continue;
            }
            if rest.starts_with('<') {
                children.push(Node::Element(self.element()?));
                continue;
            }
            let end = rest.find('<').unwrap_or(rest.len());
            let text = decode_entities(&rest[..end]).map_err(|message| self.error(message))?;
            self.pos += end;
            children.push(Node::Text(text));
        }
    }
}

fn decode_entities(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find(';') else {
            return Err("unterminated entity reference".to_string());
        };
        let entity = &after[..end];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => numeric_entity(entity).ok_or_else(|| format!("unknown entity '&{entity};'"))?,
        };
        out.push(decoded);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ansi(source: &str) -> String {
        render(source, &StyleTable::ansi()).unwrap()
    }

    #[test]
    fn test_style_table_has_every_reserved_name() {
        let table = StyleTable::ansi();
        assert_eq!(ANSI_STYLES.len(), 22);
        assert_eq!(table.code("default"), "\x1b[0m");
        assert_eq!(table.code("concealed"), "\x1b[8m");
        assert_eq!(table.code("bg_white"), "\x1b[47m");
        assert_eq!(table.code("sparkly"), "");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(ansi("hello"), "hello");
        assert_eq!(ansi("<text>hello</text>"), "hello");
    }

    #[test]
    fn test_styled_span_restores_default() {
        assert_eq!(
            ansi(r#"<text style="bold red">x</text>y"#),
            "\x1b[1m\x1b[31mx\x1b[0my"
        );
    }

    #[test]
    fn test_fragment_with_several_spans() {
        assert_eq!(
            ansi(r#"<text style="red">a</text> and <text style="green">b</text>"#),
            "\x1b[31ma\x1b[0m and \x1b[32mb\x1b[0m"
        );
    }

    #[test]
    fn test_parse_requires_a_single_root() {
        assert!(parse("<text>a</text>").is_ok());
        assert!(parse("<text>a</text>trailing").is_err());
        assert!(parse("plain").is_err());
    }

    #[test]
    fn test_nested_span_restores_parent_style() {
        assert_eq!(
            ansi(r#"<text style="bold"><text style="red">a</text>b</text>"#),
            "\x1b[1m\x1b[31ma\x1b[1mb\x1b[0m"
        );
    }

    #[test]
    fn test_sibling_spans_keep_parent_on_stack() {
        assert_eq!(
            ansi(r#"<text style="blue"><text style="red">a</text><text style="green">b</text>c</text>"#),
            "\x1b[34m\x1b[31ma\x1b[34m\x1b[32mb\x1b[34mc\x1b[0m"
        );
    }

    #[test]
    fn test_unknown_style_emits_nothing() {
        assert_eq!(
            ansi(r#"<text><text style="sparkly">x</text></text>"#),
            "x\x1b[0m"
        );
    }

    #[test]
    fn test_plain_table_strips_styles() {
        let out = render(
            r#"<text style="bold"><text style="red">a</text>b</text>"#,
            &StyleTable::plain(),
        )
        .unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_other_elements_are_skipped() {
        assert_eq!(ansi("<text>a<b>hidden</b>c</text>"), "ac");
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(ansi("<text>&lt;ok&gt; &amp; &#65;&#x42;</text>"), "<ok> & AB");
    }

    #[test]
    fn test_self_closing_and_single_quotes() {
        assert_eq!(ansi("<text>a<text style='bold'/>b</text>"), "a\x1b[1m\x1b[0mb");
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(ansi("<text>a<!-- note -->b</text>"), "ab");
    }

    #[test]
    fn test_malformed_markup_is_rejected() {
        let table = StyleTable::ansi();
        assert!(render("<text>unclosed", &table).is_err());
        assert!(render("<text>a</txet>", &table).is_err());
        assert!(render("<text style=bold>a</text>", &table).is_err());
        assert!(render("<text>a & b</text>", &table).is_err());
        assert!(render("<text>&bogus;</text>", &table).is_err());
        assert!(render("a</text>b", &table).is_err());
    }

    #[test]
    fn test_error_reports_reason() {
        let err = render("<text>a</other>", &StyleTable::ansi()).unwrap_err();
        assert!(err.message.contains("mismatched closing tag 'other'"));
    }

    #[test]
    fn test_error_offset_points_into_fragment() {
        // text runs are reported from their first byte
        let err = render("ab & c", &StyleTable::ansi()).unwrap_err();
        assert_eq!(err.offset, 0);

        let err = render("<text style=bold>a</text>", &StyleTable::ansi()).unwrap_err();
        assert_eq!(err.offset, 12);
    }

    #[test]
    fn test_escape_round_trips_through_parser() {
        let text = "a <b> & c";
        let out = ansi(&format!("<text>{}</text>", escape(text)));
        assert_eq!(out, text);
    }
}
