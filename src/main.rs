//! Purpose: `cursorwindow` CLI entry point and command helpers.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit one JSON value per line on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All cell access goes through `api::Window` typed accessors.
use std::error::Error as StdError;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod window_info_json;

use cursorwindow::api::{
    Cell, Cursor, CursorResult, DEFAULT_WINDOW_SIZE_BYTES, Error, ErrorKind, Window,
    WindowOptions, fill_window, row_json, to_exit_code,
};
use cursorwindow::json::parse::rows_from_jsonl;
use window_info_json::window_info_json;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `cursorwindow --help` for usage."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "cursorwindow",
    version,
    about = "Load typed rows into a cursor window and read them back page by page",
    long_about = None,
    after_help = r#"EXAMPLES
  $ printf '[1, "a"]\n[2.5, null]\n' > rows.jsonl
  $ cursorwindow page rows.jsonl --page-size 1
  $ cursorwindow info rows.jsonl --name results

Rows are JSONL: each line is an array of cells (null, number, string,
or {"blob": [bytes]}). Set RUST_LOG=debug to trace window activity."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Page through rows with a cursor, refilling one window per page.
    Page(PageArgs),
    /// Load every row into one window and report its metadata.
    Info(InfoArgs),
    /// Print the program name and version as JSON.
    Version,
}

#[derive(Args)]
struct WindowArgs {
    #[arg(long, help = "Window name (default: <unnamed>)")]
    name: Option<String>,
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_SIZE_BYTES,
        allow_negative_numbers = true,
        help = "Window byte budget"
    )]
    window_size: i64,
}

impl WindowArgs {
    fn open(&self) -> Result<Window, Error> {
        Window::with_options(self.name.as_deref(), WindowOptions::new(self.window_size))
            .map_err(|err| err.with_hint("--window-size must be zero or greater."))
    }
}

#[derive(Args)]
struct PageArgs {
    #[arg(help = "JSONL rows file, or - for stdin", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[command(flatten)]
    window: WindowArgs,
    #[arg(long, default_value_t = 64, help = "Rows held by the window at once")]
    page_size: usize,
    #[arg(long, default_value_t = 0, help = "Global position of the first row to print")]
    start: usize,
    #[arg(long, help = "Maximum number of rows to print")]
    count: Option<usize>,
}

#[derive(Args)]
struct InfoArgs {
    #[arg(help = "JSONL rows file, or - for stdin", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

fn page_command(args: PageArgs) -> Result<RunOutcome, Error> {
    if args.page_size == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--page-size must be at least 1"));
    }
    let (rows, num_columns) = load_rows(&args.input)?;
    let mut window = args.window.open()?;
    let mut cursor = Cursor::at(args.start);
    let limit = args.count.unwrap_or(usize::MAX);
    let mut emitted = 0;

    while emitted < limit {
        let needs_fill = match cursor.next(&window)? {
            CursorResult::Row(row) => {
                emit_json(row_json(row)?);
                emitted += 1;
                false
            }
            CursorResult::BeforeWindow | CursorResult::PastWindow => true,
        };
        if !needs_fill {
            continue;
        }

        let position = cursor.position();
        if position >= rows.len() {
            break;
        }
        let page_start = position - position % args.page_size;
        let page_end = rows.len().min(page_start + args.page_size);
        fill_window(
            &mut window,
            page_start,
            num_columns,
            rows[page_start..page_end].iter().cloned(),
        )?;
        tracing::debug!(window = %window, page_start, page_end, "loaded page");
    }

    window.close();
    Ok(RunOutcome::ok())
}

fn info_command(args: InfoArgs) -> Result<RunOutcome, Error> {
    let (rows, num_columns) = load_rows(&args.input)?;
    let mut window = args.window.open()?;
    let info = {
        let mut guard = window.acquire()?;
        fill_window(&mut guard, 0, num_columns, rows)?;
        window_info_json(&guard)?
    };
    window.close();
    emit_json(info);
    Ok(RunOutcome::ok())
}

fn version_command() -> Result<RunOutcome, Error> {
    let info = VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    };
    let value = serde_json::to_value(&info).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode version")
            .with_source(err)
    })?;
    emit_json(value);
    Ok(RunOutcome::ok())
}

/// Reads JSONL rows; the first row decides the column count.
fn load_rows(input: &Path) -> Result<(Vec<Vec<Cell>>, usize), Error> {
    let text = read_input(input)?;
    let rows = rows_from_jsonl(&text)?;
    let num_columns = rows.first().map_or(0, Vec::len);
    tracing::debug!(rows = rows.len(), num_columns, "loaded input rows");
    Ok((rows, num_columns))
}

fn read_input(input: &Path) -> Result<String, Error> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read stdin")
                .with_source(err)
        })?;
        return Ok(text);
    }
    std::fs::read_to_string(input).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read {}", input.display()))
            .with_hint("Check that the input path exists and is readable.")
            .with_source(err)
    })
}

fn clap_error_summary(err: &clap::Error) -> String {
    let text = err.to_string();
    let first = text.lines().next().unwrap_or("invalid arguments");
    first.trim_start_matches("error: ").trim().to_string()
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(row) = err.row() {
        lines.push(format!("row: {row}"));
    }
    if let Some(column) = err.column() {
        lines.push(format!("column: {column}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}
