// kuhul: run, inspect and interactively drive K'UHUL programs

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kuhul::interpreter::handlers::LIBRARY_HANDLERS;
use kuhul::memory::value::{Dict, Value};
use kuhul::parser::ParseError;
use kuhul::{fingerprint, parse, tokenize, Interpreter, InterpreterConfig, RuntimeError};

#[derive(Parser)]
#[command(author, version, about = "K'UHUL interpreter", long_about = None)]
struct Cli {
    /// Program file to load and run
    file: Option<PathBuf>,

    /// Evaluate a source snippet instead of a file
    #[arg(short, long, value_name = "SRC")]
    eval: Option<String>,

    /// Print the token stream and exit
    #[arg(long)]
    tokenize: bool,

    /// Print the parsed program and exit
    #[arg(long)]
    parse: bool,

    /// Pretty-print results as JSON
    #[arg(long)]
    json: bool,

    /// Start an interactive session (after loading FILE, if given)
    #[arg(long)]
    repl: bool,

    /// Maximum nested dispatch depth (overrides KUHUL_MAX_CALL_DEPTH)
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let source = match (&cli.eval, &cli.file) {
        (Some(src), _) => Some(src.clone()),
        (None, Some(path)) => Some(read_source(path)?),
        (None, None) => None,
    };

    if cli.tokenize {
        let source = source.context("--tokenize needs a FILE or --eval")?;
        for token in tokenize(&source) {
            println!(
                "{}:{}\t{}\t{}",
                token.location.line, token.location.column, token.kind, token.literal
            );
        }
        return Ok(());
    }

    if cli.parse {
        let source = source.context("--parse needs a FILE or --eval")?;
        let (program, errors) = parse(&source);
        if !errors.is_empty() {
            report_parse_errors(&errors);
            std::process::exit(1);
        }
        let value = program.to_value().context("failed to serialize program")?;
        print_value(&value, true);
        return Ok(());
    }

    let mut config = InterpreterConfig::from_env();
    if let Some(depth) = cli.max_depth {
        config = config.with_max_call_depth(depth);
    }
    let mut interp = Interpreter::with_config(config);

    match (&cli.eval, source) {
        (Some(_), Some(source)) => {
            let value = exit_on_parse_error(interp.eval(&source))?;
            print_value(&value, cli.json);
        }
        (None, Some(source)) => {
            exit_on_parse_error(interp.load(&source))?;
            if !cli.repl {
                let snapshot = interp.run()?;
                print_value(&snapshot, cli.json);
            }
        }
        (_, None) => {}
    }

    if cli.repl || (cli.file.is_none() && cli.eval.is_none()) {
        repl(&mut interp, cli.json)?;
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn report_parse_errors(errors: &[ParseError]) {
    for error in errors {
        eprintln!("Parse error: {}", error);
    }
}

/// Parse failures exit non-zero after listing every error; other runtime
/// errors propagate.
fn exit_on_parse_error<T>(result: Result<T, RuntimeError>) -> Result<T> {
    match result {
        Err(RuntimeError::Parse(errors)) => {
            report_parse_errors(&errors.0);
            std::process::exit(1);
        }
        other => Ok(other?),
    }
}

fn print_value(value: &Value, pretty: bool) {
    if pretty {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", value),
        }
    } else {
        println!("{}", value);
    }
}

const REPL_HELP: &str = "\
Commands:
  help                      show this message
  exit | quit               leave the session
  state                     print the runtime state snapshot
  load <file>               load a program file
  run                       run the loaded program
  dispatch <name> [json]    dispatch a handler with an optional JSON body
  fp <text>                 fingerprint a JSON value (or plain text)
  <source>                  evaluate K'UHUL source";

fn repl(interp: &mut Interpreter, json: bool) -> Result<()> {
    println!("K'UHUL {} (type 'help' for commands)", kuhul::VERSION);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("kuhul> ");
        stdout.flush().context("failed to flush stdout")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "exit" | "quit" => break,
            "help" => {
                println!("{}", REPL_HELP);
                println!("Library handlers: {}", LIBRARY_HANDLERS.join(", "));
            }
            "state" => print_value(&interp.state().snapshot(), json),
            "load" => match read_source(Path::new(rest)) {
                Ok(source) => report(interp.load(&source).map(|()| Value::from("loaded")), json),
                Err(err) => eprintln!("Error: {:#}", err),
            },
            "run" => report(interp.run(), json),
            "dispatch" => {
                let (name, body) = rest.split_once(' ').unwrap_or((rest, ""));
                match parse_body(body) {
                    Ok(body) => report(interp.dispatch(name, body), json),
                    Err(err) => eprintln!("Error: {:#}", err),
                }
            }
            "fp" => {
                let value = serde_json::from_str::<Value>(rest).unwrap_or_else(|_| Value::from(rest));
                println!("{}", fingerprint(&value));
            }
            _ => report(interp.eval(line), json),
        }
    }
    Ok(())
}

fn parse_body(text: &str) -> Result<Dict> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Dict::new());
    }
    match serde_json::from_str::<Value>(text).context("body is not valid JSON")? {
        Value::Dict(map) => Ok(map),
        other => anyhow::bail!("body must be a JSON object, got {}", other.type_name()),
    }
}

fn report(result: Result<Value, RuntimeError>, json: bool) {
    match result {
        Ok(value) => print_value(&value, json),
        Err(err) => eprintln!("Error: {}", err),
    }
}
