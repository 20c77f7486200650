mod config;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use interpreter::{ErrorAction, ExecutionError, FragmentError, MarkdownWriter, RunSummary};
use tfd::SourceDocument;

use config::Config;
use output::{Destination, Input};

const SUBCOMMANDS: &[&str] = &["run", "help"];

/// Options that take a separate value, so their value is not mistaken for
/// the first positional argument.
const VALUE_OPTIONS: &[&str] = &["--config", "-o", "--output", "--on-error"];

#[derive(Parser)]
#[command(name = "tfd", version, about = "Executable document runner")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log more (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./tfd.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run executable documents
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Documents to run, '-' for stdin
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file or directory, '-' for stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Overwrite existing output files
    #[arg(short, long)]
    force: bool,

    /// Parse only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parse tree
    #[arg(long)]
    tree: bool,

    /// What to do when a code block fails: halt, skip-section or continue
    #[arg(long, value_name = "ACTION")]
    on_error: Option<ErrorAction>,
}

fn main() {
    let args = with_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    let code = match cli.command {
        Command::Run(run_args) => match do_run(run_args, cli.config.as_deref(), cli.no_color) {
            Ok(code) => code,
            Err(error) => {
                eprintln!("error: {:#}", error);
                1
            }
        },
    };
    process::exit(code);
}

/// `tfd doc.tfd` works like `tfd run doc.tfd`.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut rest = args.iter().skip(1);
    let mut first_positional = None;
    while let Some(arg) = rest.next() {
        if VALUE_OPTIONS.contains(&arg.as_str()) {
            rest.next();
        } else if arg == "-" || !arg.starts_with('-') {
            first_positional = Some(arg.as_str());
            break;
        }
    }

    if let Some(first) = first_positional
        && !SUBCOMMANDS.contains(&first)
    {
        args.insert(1, "run".to_string());
    }
    args
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn do_run(args: RunArgs, config_path: Option<&Path>, no_color: bool) -> anyhow::Result<i32> {
    let config = Config::load(config_path)?;
    let on_error = args.on_error.unwrap_or(config.on_error);
    let force = args.force || config.force;
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        config.color.choice()
    };

    let inputs: Vec<Input> = args.inputs.iter().map(|arg| Input::parse(arg)).collect();
    let parse_only = args.check || args.tree;
    let plan = if parse_only {
        inputs
            .into_iter()
            .map(|input| (input, Destination::Stdout))
            .collect()
    } else {
        output::plan(&inputs, args.output.as_deref(), force)?
    };

    let mut files = SimpleFiles::new();
    let reporter = Reporter {
        writer: StandardStream::stderr(color_choice),
        config: term::Config::default(),
    };
    let mut code = 0;

    for (input, destination) in plan {
        let text = input
            .read()
            .with_context(|| format!("cannot read '{}'", input))?;
        let file_id = files.add(input.to_string(), text.clone());
        let source = SourceDocument::new(input.document_name(), text).with_file_id(file_id);

        if parse_only {
            match tfd::parse(&source) {
                Ok(document) if args.tree => println!("{:#?}", document),
                Ok(_) => eprintln!("ok: {} parsed successfully", input),
                Err(error) => {
                    reporter.emit(&files, &error.to_diagnostic());
                    code = 1;
                }
            }
            continue;
        }

        let (result, errors) = run_document(&source, &destination, on_error)?;
        for error in &errors {
            reporter.emit(&files, &error.to_diagnostic());
        }
        match result {
            Ok(summary) => {
                log::info!(
                    "{}: {} units ({} code), {} sections",
                    input,
                    summary.units,
                    summary.code_units,
                    summary.sections
                );
                if summary.errors > 0 {
                    code = 1;
                }
            }
            // Halting fragment errors were already reported with the rest.
            Err(error) if error.is_fragment() => code = 1,
            Err(error) => {
                reporter.emit(&files, &error.to_diagnostic());
                code = 1;
            }
        }
    }
    Ok(code)
}

type RunOutcome = (Result<RunSummary, ExecutionError>, Vec<FragmentError>);

/// Run one document into `destination`. The sink is flushed on every path.
fn run_document(
    source: &SourceDocument,
    destination: &Destination,
    on_error: ErrorAction,
) -> anyhow::Result<RunOutcome> {
    let sink: Box<dyn Write> = match destination {
        Destination::Stdout => Box::new(io::stdout().lock()),
        Destination::File(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create '{}'", path.display()))?,
        )),
    };

    let mut writer = MarkdownWriter::new(sink).with_error_action(on_error);
    let result = interpreter::execute_source(source, &mut writer);
    let flushed = writer.flush();
    let errors = writer.errors().to_vec();

    match (result, flushed) {
        (Ok(_), Err(error)) => Ok((Err(error.into()), errors)),
        (result, _) => Ok((result, errors)),
    }
}

struct Reporter {
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn emit(&self, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, files, diagnostic);
    }
}
