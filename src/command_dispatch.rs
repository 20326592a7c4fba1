//! Purpose: Hold top-level CLI command dispatch for `tabfile`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: One-shot commands open a fresh client; selection never outlives the command.
//! Invariants: Helpers in `main.rs` own output formatting.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    table_dir: PathBuf,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tabfile", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Shell => {
            ensure_table_dir(&table_dir)?;
            let mut client = open_client(&table_dir)?;
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            let use_color = color_mode.use_color(io::stderr().is_terminal());
            shell::run_shell(
                &mut client,
                stdin.lock(),
                &mut io::stdout(),
                &mut io::stderr(),
                shell::ShellOptions {
                    prompt: interactive,
                    use_color,
                },
            )
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("shell i/o failed")
                    .with_source(err)
            })?;
            Ok(RunOutcome::ok())
        }
        Command::Create { name, columns } => {
            ensure_table_dir(&table_dir)?;
            let mut client = open_client(&table_dir)?;
            let created = client.create_table(&name, &columns)?;
            let path = client.table_dir().join(&created);
            emit_json(
                json!({
                    "created": {
                        "table": created,
                        "requested": name,
                        "columns": columns,
                        "path": path.display().to_string(),
                    }
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let client = open_client(&table_dir)?;
            let tables = client
                .list_tables()
                .into_iter()
                .map(|(table, columns)| json!({ "table": table, "columns": columns }))
                .collect::<Vec<_>>();
            emit_json(json!({ "tables": tables }), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Head { table } => {
            let mut client = open_client(&table_dir)?;
            client.select_table(&table)?;
            let header = client.peek_header()?;
            let selected = client.selected().unwrap_or_default();
            emit_json(header_json(selected, &header), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Append { table, values } => {
            let mut client = open_client(&table_dir)?;
            client.select_table(&table)?;
            let appended = client.append_row(values)?;
            emit_appended(&appended, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Dump { table, jsonl } => {
            let mut client = open_client(&table_dir)?;
            client.select_table(&table)?;
            let rows = client.dump_table()?;
            emit_dump(rows, jsonl, color_mode)?;
            Ok(RunOutcome::ok())
        }
        Command::Column { table, column } => {
            let mut client = open_client(&table_dir)?;
            client.select_table(&table)?;
            let mut values = client
                .project_column(&column)?
                .into_iter()
                .collect::<Vec<_>>();
            values.sort();
            let selected = client.selected().unwrap_or_default();
            emit_json(
                json!({
                    "table": selected,
                    "column": column,
                    "values": values,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
    }
}
