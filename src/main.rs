//! Purpose: `tabfile` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: One-shot commands emit JSON on stdout; `dump` renders a table on a TTY.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All table access goes through `api::TableClient`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod json_style;
mod shell;

use json_style::{JsonLayout, render_json};
use tabfile::api::{
    Appended, Error, ErrorKind, ResolvedHeader, TableClient, TableRows, to_exit_code,
};
use tabfile::notice::{Notice, arity_notice, notice_json};
use tabfile::table_paths::default_table_dir;

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
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
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
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `tabfile --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let table_dir = cli.dir.unwrap_or_else(default_table_dir);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, table_dir, color_mode)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "tabfile",
    version,
    about = "Named CSV tables backed by plain files",
    long_about = None,
    before_help = r#"Every `<name>.csv` file in the table directory is a table; its first record is the schema.

Mental model:
  - `create` writes a new table with a header
  - `append` adds one row, trimming values beyond the schema
  - `dump` prints every row, `column` prints distinct values
"#,
    after_help = r#"EXAMPLES
  $ tabfile create people name age
  $ tabfile append people ann 31
  $ tabfile column people name
  $ tabfile shell                     # interactive session

  $ tabfile <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Directory holding table files (default: current directory)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize JSON output and diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run an interactive table session",
        long_about = r#"Read commands from stdin, one per line, against a single selected table.

Commands: create_table <name> <col>..., select_table <name>, input <value>...,
view_table_head, output_table, view_column <column>, list_tables, help, exit."#
    )]
    Shell,
    #[command(
        arg_required_else_help = true,
        about = "Create a table with a header",
        after_help = r#"EXAMPLES
  $ tabfile create people name age
  $ tabfile create people name age    # second call creates people(1).csv"#
    )]
    Create {
        #[arg(help = "Table name; `.csv` is appended when missing")]
        name: String,
        #[arg(required = true, num_args = 1.., help = "Column names")]
        columns: Vec<String>,
    },
    #[command(about = "List tables found in the table directory")]
    List,
    #[command(arg_required_else_help = true, about = "Show a table's live header")]
    Head {
        #[arg(help = "Table name")]
        table: String,
    },
    #[command(
        arg_required_else_help = true,
        about = "Append one row to a table",
        long_about = r#"Append one row. Values beyond the schema width are dropped with a notice;
short rows are written as-is."#
    )]
    Append {
        #[arg(help = "Table name")]
        table: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true, help = "Row values")]
        values: Vec<String>,
    },
    #[command(arg_required_else_help = true, about = "Print every row, header first")]
    Dump {
        #[arg(help = "Table name")]
        table: String,
        #[arg(long, help = "Emit one JSON array per row even on a terminal")]
        jsonl: bool,
    },
    #[command(arg_required_else_help = true, about = "Print the distinct values of a column")]
    Column {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Column name")]
        column: String,
    },
    #[command(about = "Print version info as JSON")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ tabfile completion bash > ~/.local/share/bash-completion/completions/tabfile"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn open_client(table_dir: &Path) -> Result<TableClient, Error> {
    TableClient::open(table_dir)
}

fn ensure_table_dir(dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(dir).with_source(err))
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and permissions."),
        ErrorKind::StorageMissing => {
            err.with_hint("The table file was removed after startup. Recreate it or pick another.")
        }
        ErrorKind::DecodeFailure => {
            err.with_hint("Re-save the file as UTF-8, UTF-16, or GBK text.")
        }
        _ => err,
    }
}

fn header_json(table: &str, header: &ResolvedHeader) -> Value {
    json!({
        "table": table,
        "columns": header.columns,
        "encoding": header.encoding.label(),
    })
}

fn appended_json(appended: &Appended) -> Value {
    json!({
        "table": appended.table,
        "row": appended.row,
        "truncated": appended.warning.is_some(),
    })
}

fn emit_appended(appended: &Appended, color_mode: ColorMode) {
    if let Some(warning) = &appended.warning {
        let notice = arity_notice(warning, "append", notice_time_now().unwrap_or_default());
        emit_notice(&notice, color_mode);
    }
    emit_json(appended_json(appended), color_mode);
}

fn emit_dump(rows: TableRows, jsonl: bool, color_mode: ColorMode) -> Result<(), Error> {
    let is_tty = io::stdout().is_terminal();
    if jsonl || !is_tty {
        let use_color = color_mode.use_color(is_tty);
        for row in rows {
            let row = row?;
            println!("{}", render_json(&json!(row), JsonLayout::Compact, use_color));
        }
        return Ok(());
    }
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    let Some((header, body)) = rows.split_first() else {
        return Ok(());
    };
    let headers = header.iter().map(String::as_str).collect::<Vec<_>>();
    emit_table(&headers, body);
    Ok(())
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("tabfile {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "tabfile",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            color_mode,
        );
    }
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).fold(headers.len(), usize::max);
    if columns == 0 {
        return String::new();
    }
    let mut widths = vec![0; columns];
    let header_cells = (0..columns)
        .map(|idx| sanitize_table_cell(headers.get(idx).copied().unwrap_or("")))
        .collect::<Vec<_>>();
    let body_cells = rows
        .iter()
        .map(|row| row.iter().map(|cell| sanitize_table_cell(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    for cells in std::iter::once(&header_cells).chain(&body_cells) {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header_cells)
        .chain(&body_cells)
        .map(|cells| format_table_line(cells, &widths).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_table_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let layout = if is_tty || use_color {
        JsonLayout::Pretty
    } else {
        JsonLayout::Compact
    };
    println!("{}", render_json(&value, layout, use_color));
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (table: {})", notice.message, notice.table);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::TableNotFound => "table not found".to_string(),
        ErrorKind::ColumnNotFound => "column not found".to_string(),
        ErrorKind::NoSelection => "no table selected".to_string(),
        ErrorKind::StorageMissing => "table file is missing".to_string(),
        ErrorKind::DecodeFailure => "could not decode table".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::NameSpaceExhausted => "no free table name".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
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
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if !err.attempts().is_empty() {
        let attempts = err
            .attempts()
            .iter()
            .map(|attempt| json!({ "encoding": attempt.encoding, "detail": attempt.detail }))
            .collect::<Vec<_>>();
        inner.insert("attempts".to_string(), Value::Array(attempts));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(table) = err.table() {
        lines.push(format!(
            "{} {table}",
            colorize_label("table:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(column) = err.column() {
        lines.push(format!(
            "{} {column}",
            colorize_label("column:", use_color, AnsiColor::Yellow)
        ));
    }
    for attempt in err.attempts() {
        lines.push(format!(
            "{} {}: {}",
            colorize_label("tried:", use_color, AnsiColor::Yellow),
            attempt.encoding,
            attempt.detail
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
