//! Purpose: Line-oriented interactive session over one `TableClient`.
//! Exports: `run_shell`, `ShellOptions`.
//! Role: Thin dispatcher; splits each line on whitespace and calls the client.
//! Invariants: A failed command prints an error and the loop continues.
//! Invariants: Results go to `out`, errors and notices to `err`; EOF or `exit` ends the loop.

use std::io::{self, BufRead, Write};

use super::{AnsiColor, colorize_label, error_text};
use tabfile::api::{Error, ErrorKind, TableClient};

const HELP: &str = "\
Commands:
  create_table <name> <column>...   create a table (suffixed when the name is taken)
  select_table <name>               select a table and show its header
  input <value>...                  append a row to the selected table
  view_table_head                   show the selected table's header
  output_table                      print every row of the selected table
  view_column <column>              print the distinct values of a column
  list_tables                       list known tables
  help                              show this message
  exit                              leave the shell";

#[derive(Copy, Clone, Debug)]
pub(crate) struct ShellOptions {
    pub prompt: bool,
    pub use_color: bool,
}

pub(crate) fn run_shell<R: BufRead, W: Write, E: Write>(
    client: &mut TableClient,
    input: R,
    out: &mut W,
    err: &mut E,
    options: ShellOptions,
) -> io::Result<()> {
    writeln!(out, "tabfile shell. Type `help` for commands, `exit` to leave.")?;
    let mut lines = input.lines();
    loop {
        if options.prompt {
            write!(out, "Enter command: ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let words = line.split_whitespace().collect::<Vec<_>>();
        let Some((&cmd, args)) = words.split_first() else {
            continue;
        };
        match cmd {
            "exit" | "quit" => break,
            "help" => writeln!(out, "{HELP}")?,
            _ => {
                if let Err(error) = execute(client, cmd, args, out, err, options) {
                    writeln!(err, "{}", error_text(&error, options.use_color))?;
                }
            }
        }
    }
    Ok(())
}

fn execute<W: Write, E: Write>(
    client: &mut TableClient,
    cmd: &str,
    args: &[&str],
    out: &mut W,
    err: &mut E,
    options: ShellOptions,
) -> Result<(), Error> {
    match cmd {
        "create_table" => {
            let (name, columns) = args
                .split_first()
                .ok_or_else(|| usage("create_table <name> <column>..."))?;
            let columns = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>();
            let created = client.create_table(name, &columns)?;
            if created != normalized(name) {
                say(out, format_args!("Table '{}' already exists.", normalized(name)))?;
            }
            say(out, format_args!("Table created with name: {created}"))
        }
        "select_table" => {
            let [name] = args else {
                return Err(usage("select_table <name>"));
            };
            let header = client.select_table(name)?;
            let selected = client.selected().unwrap_or_default();
            say(out, format_args!("Table '{selected}' is selected."))?;
            say(out, format_args!("Table columns: {}", json_list(&header.columns)))
        }
        "input" => {
            if args.is_empty() {
                return Err(usage("input <value>..."));
            }
            let row = args.iter().map(|v| v.to_string()).collect::<Vec<_>>();
            let appended = client.append_row(row)?;
            if let Some(warning) = &appended.warning {
                let label = colorize_label("notice:", options.use_color, AnsiColor::Yellow);
                writeln!(
                    err,
                    "{label} more data provided than columns in the table; {} value(s) ignored",
                    warning.dropped.len()
                )
                .map_err(shell_io)?;
            }
            say(out, format_args!("Input successful: {}", json_list(&appended.row)))
        }
        "view_table_head" => {
            let header = client.peek_header()?;
            say(out, format_args!("Table columns: {}", json_list(&header.columns)))
        }
        "output_table" => {
            let rows = client.dump_table()?;
            say(out, format_args!("Table path: {}", rows.path().display()))?;
            for row in rows {
                say(out, format_args!("{}", json_list(&row?)))?;
            }
            Ok(())
        }
        "view_column" => {
            let [column] = args else {
                return Err(usage("view_column <column>"));
            };
            let mut values = client.project_column(column)?.into_iter().collect::<Vec<_>>();
            values.sort();
            say(out, format_args!("Unique elements in column '{column}':"))?;
            say(out, format_args!("{}", values.join(" ")))
        }
        "list_tables" => {
            for (table, columns) in client.list_tables() {
                say(out, format_args!("{table}: {}", json_list(&columns)))?;
            }
            Ok(())
        }
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unknown command `{other}`"))
            .with_hint("Type `help` for the list of commands.")),
    }
}

fn normalized(name: &str) -> String {
    tabfile::table_paths::normalize_table_name(name).unwrap_or_else(|_| name.to_string())
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn say<W: Write>(out: &mut W, args: std::fmt::Arguments<'_>) -> Result<(), Error> {
    writeln!(out, "{args}").map_err(shell_io)
}

fn shell_io(err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write shell output")
        .with_source(err)
}

fn usage(form: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("missing or extra arguments")
        .with_hint(format!("Usage: {form}"))
}
