use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
#[cfg(feature = "hotpath")]
use hotpath::{Format, GuardBuilder};

use verticat::logger::{log_error, set_log_file, set_log_prefix};
use verticat::{Concatenation, NativeReader, Operation, Outcome, ScanOptions, TailStrategy};

const STDIN_NAME: &str = "-";

#[derive(Parser)]
#[command(
    name = "verticat",
    version,
    about = "count/head/tail Vertica native binary files",
    disable_help_flag = true,
    disable_version_flag = true,
    arg_required_else_help = true,
    group(
        ArgGroup::new("operation")
            .required(true)
            .args(["count", "head", "tail", "cat", "print_header"])
    )
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Files to process; `-` or no file reads standard input.
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Count rows.
    #[arg(short = 'c', long)]
    count: bool,

    /// Take the first N rows.
    #[arg(short = 'h', long, value_name = "N")]
    head: Option<u64>,

    /// Take the last N rows.
    #[arg(short = 't', long, value_name = "N")]
    tail: Option<u64>,

    /// Copy every row.
    #[arg(long)]
    cat: bool,

    /// List column widths, -1 for variable width.
    #[arg(short = 'p', long)]
    print_header: bool,

    /// Print the header as JSON.
    #[arg(long, requires = "print_header")]
    json: bool,

    /// Write rows to FILE instead of standard output.
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Overwrite an existing output file.
    #[arg(short = 'f', long, requires = "output")]
    force: bool,

    /// Emit rows only, without the signature and column definitions.
    #[arg(long)]
    no_metadata: bool,

    /// Output column order as 1-based original column numbers.
    #[arg(short = 'r', long, value_name = "COLUMNS", value_delimiter = ',')]
    reorder: Vec<u32>,

    /// How the last rows are located.
    #[arg(long, value_enum, default_value_t = TailMode::TwoPass)]
    tail_strategy: TailMode,

    /// Also append warnings and errors to this file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print help.
    #[arg(short = 'H', long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TailMode {
    TwoPass,
    Buffered,
}

impl From<TailMode> for TailStrategy {
    fn from(mode: TailMode) -> Self {
        match mode {
            TailMode::TwoPass => Self::TwoPass,
            TailMode::Buffered => Self::Buffered,
        }
    }
}

/// Bad command line or unusable output file; no input was read.
struct UsageError(String);

impl Cli {
    fn operation(&self) -> Operation {
        if let Some(rows) = self.head {
            Operation::Head(rows)
        } else if let Some(rows) = self.tail {
            Operation::Tail(rows)
        } else if self.cat {
            Operation::Cat
        } else if self.print_header {
            Operation::PrintHeader
        } else {
            Operation::Count
        }
    }

    fn options(&self) -> ScanOptions {
        ScanOptions::new()
            .with_metadata(!self.no_metadata)
            .with_column_order(self.reorder.iter().copied())
            .with_tail_strategy(self.tail_strategy.into())
    }

    fn input_names(&self) -> Vec<PathBuf> {
        if self.inputs.is_empty() {
            vec![PathBuf::from(STDIN_NAME)]
        } else {
            self.inputs.clone()
        }
    }
}

fn main() -> ExitCode {
    #[cfg(feature = "hotpath")]
    let _hotpath = GuardBuilder::new("verticat")
        .format(Format::Table)
        .limit(20)
        .build();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };

    if let Some(path) = &cli.log_file
        && let Err(err) = set_log_file(path)
    {
        eprintln!("cannot open log file {}: {err}", path.display());
        return ExitCode::from(2);
    }

    let inputs = cli.input_names();
    if let Err(UsageError(message)) = check_usage(&cli, &inputs) {
        log_error(&message);
        return ExitCode::from(2);
    }

    let sink = match open_output(cli.output.as_deref(), cli.force) {
        Ok(sink) => sink,
        Err(UsageError(message)) => {
            log_error(&message);
            return ExitCode::from(2);
        }
    };

    let failures = run(&cli, &inputs, sink);
    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN_NAME
}

fn check_usage(cli: &Cli, inputs: &[PathBuf]) -> Result<(), UsageError> {
    let stdin_inputs = inputs.iter().filter(|p| is_stdin(p)).count();
    if stdin_inputs > 1 {
        return Err(UsageError("standard input can only be read once".into()));
    }
    if stdin_inputs == 1 && cli.tail.is_some() && cli.tail_strategy == TailMode::TwoPass {
        let message = "tail of standard input needs --tail-strategy buffered";
        return Err(UsageError(message.into()));
    }
    Ok(())
}

fn open_output(path: Option<&Path>, force: bool) -> Result<Box<dyn Write>, UsageError> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    let mut open = OpenOptions::new();
    open.write(true);
    if force {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    match open.open(path) {
        Ok(file) => Ok(Box::new(BufWriter::new(file))),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(UsageError(format!(
            "output file {} exists; overwrite with --force",
            path.display()
        ))),
        Err(err) => Err(UsageError(format!(
            "cannot create output file {}: {err}",
            path.display()
        ))),
    }
}

/// Processes every input in order and returns the number that failed.
fn run(cli: &Cli, inputs: &[PathBuf], sink: Box<dyn Write>) -> usize {
    let operation = cli.operation();
    let mut output = Concatenation::new(sink, cli.options());
    let mut failures = 0;

    for input in inputs {
        let name = input.display().to_string();
        let _prefix = set_log_prefix(name.clone());
        match process(cli, operation, input, &mut output) {
            Ok(Outcome::Count(rows)) => println!("{rows} {name}"),
            Ok(_) => {}
            Err(err) => {
                log_error(&err.to_string());
                failures += 1;
            }
        }
    }

    if let Err(err) = output.finish() {
        log_error(&err.to_string());
        failures += 1;
    }
    failures
}

fn process<W: Write>(
    cli: &Cli,
    operation: Operation,
    input: &Path,
    output: &mut Concatenation<W>,
) -> verticat::Result<Outcome> {
    if cli.json {
        return print_header_json(cli, input, output.sink_mut());
    }
    if is_stdin(input) {
        output.push_forward(io::stdin().lock(), operation)
    } else {
        output.push(BufReader::new(File::open(input)?), operation)
    }
}

fn print_header_json<W: Write>(
    cli: &Cli,
    input: &Path,
    sink: &mut W,
) -> verticat::Result<Outcome> {
    if is_stdin(input) {
        NativeReader::with_options(io::stdin().lock(), cli.options()).print_header_json(sink)?;
    } else {
        let file = BufReader::new(File::open(input)?);
        NativeReader::with_options(file, cli.options()).print_header_json(sink)?;
    }
    Ok(Outcome::Written { rows: 0 })
}
