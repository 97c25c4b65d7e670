use std::process;

use anyhow::Result;
use serde_json::json;

use scriptkit::options::{Kind, OptionDefinition, OptionRegistry, ParseOptions, ParserInfo};
use scriptkit::output::{self, OutputConfig};
use scriptkit::ui::markup;
use scriptkit::ui::{
    ReadArgs, Renderer, RendererConfig, Status, Style, TaskArgs, TaskOutcome, WriteArgs,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    if let Err(err) = run() {
        let code = match err.downcast_ref::<scriptkit::Error>() {
            Some(err) => err.exit_code(),
            None => {
                eprintln!("Error: {err:#}");
                1
            }
        };
        process::exit(code);
    }
}

fn declare() -> Result<OptionRegistry> {
    let env = OutputConfig::default();
    let renderer = Renderer::with_config(RendererConfig {
        color: !env.no_color,
        quiet: false,
        indent_unit: " ".to_string(),
        tty_width: None,
    });

    let info = ParserInfo::new("scriptkit")
        .version(VERSION)
        .description("Declarative options and styled terminal output for scripts.")
        .post_options("Positional arguments are listed after the tasks.");
    let mut options = OptionRegistry::with_renderer(info, renderer);

    options.register_all([
        OptionDefinition::new("name", "n", "name")
            .default_value("world")
            .meta("NAME")
            .help("Who to greet."),
        OptionDefinition::new("count", "c", "count")
            .kind(Kind::Int)
            .default_value(1)
            .meta("N")
            .help("How many greetings to print."),
        OptionDefinition::new("ratio", "r", "ratio")
            .kind(Kind::Float)
            .default_value(1.0)
            .meta("X")
            .help("A float, shown back in the summary."),
        OptionDefinition::new("mode", "m", "mode")
            .kind(Kind::Choice)
            .choices(["^fast$", "^safe$"])
            .default_value("safe")
            .meta("fast|safe")
            .help("Greeting mode."),
        OptionDefinition::new("tags", "t", "tags")
            .kind(Kind::List)
            .meta("A,B")
            .help("Comma separated tags."),
        OptionDefinition::new("ask", "a", "ask")
            .kind(Kind::Bool)
            .help("Ask for confirmation before greeting."),
        OptionDefinition::new("fail", "f", "fail")
            .kind(Kind::Bool)
            .help("Make the greeting task fail."),
        OptionDefinition::new("json", "j", "json")
            .kind(Kind::Bool)
            .priority(10)
            .help("Print parsed values as JSON and stop."),
        OptionDefinition::new("quiet", "q", "quiet")
            .kind(Kind::Bool)
            .priority(10)
            .help("Hide info and debug messages."),
        OptionDefinition::new("no-color", "C", "no-color")
            .kind(Kind::Bool)
            .priority(10)
            .help("Disable colored output."),
        OptionDefinition::new("command-echo", "z", "command-echo")
            .kind(Kind::Bool)
            .priority(20)
            .help("Show commands before running them."),
        OptionDefinition::new("command-show", "V", "command-show")
            .kind(Kind::Bool)
            .priority(20)
            .help("Show the output of commands."),
        OptionDefinition::new("command-skip", "Z", "command-skip")
            .kind(Kind::Bool)
            .priority(20)
            .help("Print commands instead of running them."),
        OptionDefinition::new("version", "v", "version")
            .kind(Kind::Action)
            .priority(999)
            .action(|| println!("scriptkit {VERSION}"))
            .help("Show the version and exit."),
    ])?;

    Ok(options)
}

fn run() -> Result<()> {
    let mut options = declare()?;
    options.parse_env(ParseOptions::default())?;

    if options.provided("version") {
        return Ok(());
    }

    output::init(OutputConfig {
        quiet: options.flag("quiet")?,
        no_color: options.flag("no-color")? || OutputConfig::default().no_color,
    });

    if options.flag("json")? {
        let (values, args) = options.fetch();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "options": values, "args": args }))?
        );
        return Ok(());
    }

    let mut console = Renderer::new();
    console.set_show_commands(options.flag("command-echo")?);
    console.set_show_outputs(options.flag("command-show")?);
    console.set_skip_commands(options.flag("command-skip")?);

    console.task(TaskArgs::new("Reading options"), |console| {
        for (name, value) in options.values(&[]) {
            let marker = if options.provided(&name) {
                String::new()
            } else {
                format!(" {}", Style::hint("(default)"))
            };
            let line = format!("{} = {}{marker}", Style::label(&name), Style::value(&value));
            console.write(WriteArgs::info(markup::escape(&line)))?;
        }
        Ok(Status::Ok.into())
    })?;

    if options.flag("ask")? {
        let reply = console.read(&ReadArgs::new("Continue? [yes/no]").valid("y(es)?").valid("no?"))?;
        if reply.to_ascii_lowercase().starts_with('n') {
            console.fatal("Stopped on request")?;
        }
    }

    let name = markup::escape(&options.string("name")?);
    let count = options.int("count")?;
    let fast = options.string("mode")? == "fast";
    let fail = options.flag("fail")?;

    console.task(TaskArgs::new(format!("Greeting {name}")), |console| {
        for round in 1..=count.max(0) {
            console.write(
                WriteArgs::new(format!("Hello, <text style=\"bold\">{name}</text> ({round})"))
                    .dots(false),
            )?;
        }
        for tag in options.list("tags")? {
            console.write(WriteArgs::info(format!("tagged {}", markup::escape(&tag))))?;
        }

        if fail {
            console.warn("Failing on request")?;
            return Ok(TaskOutcome {
                status: Status::Fail,
                fatal: true,
            });
        }
        let status = if fast { Status::Pass } else { Status::Ok };
        Ok(status.into())
    })?;

    let args = options.args();
    if !args.is_empty() {
        println!("{}", Style::header("Arguments"));
        for arg in args {
            println!("  {}", Style::value(arg));
        }
    }

    Ok(())
}
