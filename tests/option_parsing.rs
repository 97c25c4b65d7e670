#![allow(clippy::unwrap_used)]
//! Option registry contract tests.
//!
//! These tests drive the public registry API the way a script does:
//! declare, parse an argument vector, read values back. Errors are
//! captured from the registry's renderer instead of ending the process.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use scriptkit::Error;
use scriptkit::options::{
    Kind, OptionDefinition, OptionRegistry, OptionValue, ParseOptions, ParserInfo,
};
use scriptkit::ui::{Renderer, RendererConfig};

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

fn registry() -> (OptionRegistry, Capture) {
    let capture = Capture::default();
    let renderer = Renderer::with_writer(
        RendererConfig {
            color: false,
            quiet: false,
            indent_unit: " ".to_string(),
            tty_width: Some(80),
        },
        Box::new(capture.clone()),
    );
    let registry = OptionRegistry::with_renderer(
        ParserInfo::new("contract").version("2.0").description("Contract tests."),
        renderer,
    );
    (registry, capture)
}

#[test]
fn test_identities_are_unique() {
    let (mut reg, out) = registry();
    reg.register(OptionDefinition::new("output", "o", "output")).unwrap();

    for duplicate in [
        OptionDefinition::new("output", "x", "x-output"),
        OptionDefinition::new("other", "o", "other"),
        OptionDefinition::new("other", "p", "output"),
    ] {
        let err = reg.register(duplicate).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    // every rejection was reported
    assert_eq!(out.text().matches("already exists").count(), 3);
}

#[test]
fn test_int_and_float_round_trip() {
    let (mut reg, _) = registry();
    reg.register_all([
        OptionDefinition::new("int", "i", "int").kind(Kind::Int),
        OptionDefinition::new("float", "f", "float").kind(Kind::Float),
    ])
    .unwrap();

    reg.parse(["-i", "-5", "-f", ".5"], ParseOptions::default())
        .unwrap();
    assert_eq!(reg.get("int").unwrap(), OptionValue::Int(-5));
    assert_eq!(reg.get("float").unwrap(), OptionValue::Float(0.5));

    let err = reg.parse(["-i", "abc"], ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = reg.parse(["-f", "."], ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn test_list_and_choice() {
    let (mut reg, out) = registry();
    reg.register_all([
        OptionDefinition::new("list", "l", "list").kind(Kind::List),
        OptionDefinition::new("answer", "a", "answer")
            .kind(Kind::Choice)
            .choices(["yes", "no"]),
    ])
    .unwrap();

    reg.parse(["--list", "a,b,c", "--answer", "no"], ParseOptions::default())
        .unwrap();
    assert_eq!(
        reg.get("list").unwrap(),
        OptionValue::List(vec!["a".into(), "b".into(), "c".into()])
    );
    assert_eq!(reg.string("answer").unwrap(), "no");

    let err = reg
        .parse(["--answer", "maybe"], ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(out.text().contains("Invalid argument (invalid choice) for option \"--answer\"."));
}

#[test]
fn test_help_wins_over_missing_required() {
    let (mut reg, out) = registry();
    reg.register(
        OptionDefinition::new("target", "t", "target")
            .required(true)
            .meta("DIR")
            .help("Where to go."),
    )
    .unwrap();

    let err = reg.parse(["--help"], ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Exit { code: 0 }));
    assert_eq!(err.exit_code(), 0);

    let text = out.text();
    assert!(text.starts_with("contract 2.0 - Contract tests.\n"));
    assert!(text.contains("\t-t, --target=DIR"));
    assert!(!text.contains("Required option"));
}

#[test]
fn test_required_option_enforced() {
    let (mut reg, out) = registry();
    reg.register_all([
        OptionDefinition::new("target", "t", "target").required(true),
        OptionDefinition::new("level", "l", "level").kind(Kind::Int),
    ])
    .unwrap();

    let err = reg.parse(["--level", "3"], ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(out.text().contains("Required option \"target\" not specified."));

    reg.parse(["--target", "/tmp"], ParseOptions::default()).unwrap();
    assert_eq!(reg.string("target").unwrap(), "/tmp");
}

#[test]
fn test_action_callback_runs_exactly_once() {
    let (mut reg, _) = registry();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);

    reg.register(
        OptionDefinition::new("ping", "p", "ping")
            .kind(Kind::Action)
            .required(true)
            .action(move || seen.set(seen.get() + 1)),
    )
    .unwrap();
    assert!(!reg.definition("ping").unwrap().is_required());

    reg.parse(["--ping", "-p"], ParseOptions::default()).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unrecognized_kind_name() {
    let err = "timestamp".parse::<Kind>().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_fetch_returns_values_and_args() {
    let (mut reg, _) = registry();
    reg.register(OptionDefinition::new("mode", "m", "mode").default_value("safe"))
        .unwrap();
    reg.parse(["one", "--", "-m"], ParseOptions::default()).unwrap();

    let (values, args) = reg.fetch();
    assert_eq!(values["mode"], OptionValue::String("safe".into()));
    assert_eq!(values["help"], OptionValue::Bool(false));
    assert_eq!(args, ["one", "-m"]);
    assert_eq!(reg.cmdline(), ["one", "--", "-m"]);
    assert_eq!(
        reg.lookup("mode", Some("fast".into())).unwrap(),
        OptionValue::String("fast".into())
    );
}
