use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::cli::commands::CommandEntry;
use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{render_table, section as output_section};
use crate::currency::format_currency;
use crate::ledger::{EditOutcome, RecomputeReport, RemainderRule, SplitMethod};
use crate::sheet::{CellValue, SheetStore, Table};

const BREAKDOWN_HEADER: &str = "Breakdown";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "new",
            "Start a sheet with the given participants",
            "new <path> <participant> [participant...]",
            cmd_new,
        ),
        CommandEntry::new("open", "Load a sheet from a CSV file", "open <path>", cmd_open),
        CommandEntry::new("show", "Print the sheet grid", "show", cmd_show),
        CommandEntry::new(
            "add",
            "Append an expense row and recalculate",
            "add <description> <payer> <amount> [method]",
            cmd_add,
        ),
        CommandEntry::new(
            "set",
            "Edit one cell; allocations may fill a remainder",
            "set <row> <column|participant|field> <value>",
            cmd_set,
        ),
        CommandEntry::new(
            "method",
            "Change the split method of a row",
            "method <row> <equally|variably|fixed>",
            cmd_method,
        ),
        CommandEntry::new(
            "recalc",
            "Recompute breakdowns and the summary row",
            "recalc [YYYY-MM-DD]",
            cmd_recalc,
        ),
        CommandEntry::new(
            "report",
            "Show per-participant balances",
            "report [--json]",
            cmd_report,
        ),
        CommandEntry::new("save", "Write the sheet to disk", "save [path]", cmd_save),
    ]
}

fn cmd_new(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (path, names) = match args.split_first() {
        Some((path, names)) if !names.is_empty() => (PathBuf::from(*path), names),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: new <path> <participant> [participant...]".into(),
            ))
        }
    };
    if path.exists() {
        return Err(CommandError::InvalidArguments(format!(
            "`{}` already exists; use `open` to load it",
            path.display()
        )));
    }
    confirm_discard(context)?;

    let layout = context.config.engine.layout;
    let mut table = Table::new();
    for (col, label) in layout.fixed_headers() {
        table.set(layout.header_row, col, CellValue::text(label));
    }
    let mut col = layout.first_participant_col;
    for name in names {
        table.set(layout.header_row, col, CellValue::text(*name));
        col += 1;
    }
    table.set(layout.header_row, col, CellValue::text(BREAKDOWN_HEADER));

    context.table = Some(table);
    context.sheet_path = Some(path.clone());
    context.modified = true;
    context.last_report = None;
    io::print_success(format!(
        "New sheet `{}` with {} participant(s). Use `save` to write it.",
        path.display(),
        names.len()
    ));
    Ok(())
}

fn cmd_open(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = match args {
        [path] => PathBuf::from(*path),
        _ => return Err(CommandError::InvalidArguments("usage: open <path>".into())),
    };
    confirm_discard(context)?;

    let table = context.store.load(&path)?;
    let rows = table.row_count();
    context.table = Some(table);
    context.modified = false;
    context.last_report = None;
    remember_path(context, &path)?;
    io::print_success(format!("Opened `{}` ({} row(s)).", path.display(), rows));
    Ok(())
}

fn cmd_show(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let table = context.table()?;
    let width = table.width();
    let mut headers: Vec<String> = vec!["#".into()];
    headers.extend((0..width).map(column_letter));
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    let rows: Vec<Vec<String>> = table
        .rows()
        .enumerate()
        .map(|(index, cells)| {
            std::iter::once((index + 1).to_string())
                .chain(cells.iter().map(|cell| cell.display().replace('\n', " / ")))
                .collect()
        })
        .collect();

    io::print_info(render_table(&header_refs, &rows));
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (description, payer, amount, method) = match args {
        [description, payer, amount] => (*description, *payer, *amount, SplitMethod::Equal),
        [description, payer, amount, method] => {
            (*description, *payer, *amount, parse_method(method)?)
        }
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: add <description> <payer> <amount> [method]".into(),
            ))
        }
    };

    let engine = context.engine();
    let reference = context.today();
    let layout = engine.settings().layout;
    let table = context.table_mut()?;
    let snapshot = engine.snapshot(table)?;
    let row = snapshot.summary_row();
    let displaced = snapshot.displaced_row(table);

    for col in 0..=snapshot.breakdown_col {
        table.clear(row, col);
    }
    table.set(row, layout.description_col, CellValue::text(description));
    table.set(row, layout.payer_col, CellValue::text(payer));
    table.set(row, layout.amount_col, CellValue::detect(amount));
    table.set(row, layout.method_col, CellValue::text(method.label()));

    let report = engine.recalculate(table, reference)?;
    info!("expense `{}` added on row {}", description, row + 1);
    if let Some(row) = displaced {
        warn!("row {} had no positive amount and was replaced", row + 1);
        io::print_warning(format!(
            "Row {} had no positive amount and was replaced by the new expense.",
            row + 1
        ));
    }
    io::print_success(format!(
        "Added `{}` on row {} ({}).",
        description,
        row + 1,
        method
    ));
    io::print_hint(allocation_hint(method));
    finish_edit(context, report);
    Ok(())
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (row, column, value) = match args {
        [row, column, rest @ ..] => (parse_row(row)?, *column, rest.join(" ")),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: set <row> <column|participant|field> <value>".into(),
            ))
        }
    };

    let engine = context.engine();
    let reference = context.today();
    let table = context.table_mut()?;
    let col = resolve_column(table, &engine.settings().layout, column)?;
    check_extent(table, row, col)?;
    table.set(row, col, CellValue::detect(&value));

    let outcome = engine.handle_edit(table, row, col, reference);
    context.modified = true;
    match outcome? {
        EditOutcome::MethodChanged => {
            let method = SplitMethod::from_label(&value);
            io::print_success(format!("Row {} now splits {}.", row + 1, method));
            io::print_hint(allocation_hint(method));
        }
        EditOutcome::Recalculated { fill, report } => {
            if let Some(fill) = fill {
                let rule = match fill.rule {
                    RemainderRule::SingleEmptySlot => "only empty cell",
                    RemainderRule::TwoParticipants => "two participants",
                };
                io::print_info(format!(
                    "Filled {} with {} ({}).",
                    fill.participant,
                    fill.cell.display(),
                    rule
                ));
            }
            finish_edit(context, report);
        }
        EditOutcome::Ignored => {
            io::print_warning("Computed cell edited; it is rewritten on the next `recalc`.");
        }
    }
    Ok(())
}

fn cmd_method(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (row, method) = match args {
        [row, label] => (parse_row(row)?, parse_method(label)?),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: method <row> <equally|variably|fixed>".into(),
            ))
        }
    };

    let engine = context.engine();
    let reference = context.today();
    let layout = engine.settings().layout;
    if !layout.is_data_row(row) {
        return Err(CommandError::InvalidArguments(format!(
            "row {} is not an expense row",
            row + 1
        )));
    }
    let table = context.table_mut()?;
    check_extent(table, row, layout.method_col)?;
    table.set(row, layout.method_col, CellValue::text(method.label()));
    let outcome = engine.handle_edit(table, row, layout.method_col, reference);
    context.modified = true;
    outcome?;

    io::print_success(format!("Row {} now splits {}.", row + 1, method));
    io::print_hint(allocation_hint(method));
    Ok(())
}

fn cmd_recalc(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let reference = match args {
        [] => context.today(),
        [date] => NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            CommandError::InvalidArguments(format!("`{}` is not a YYYY-MM-DD date", date))
        })?,
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: recalc [YYYY-MM-DD]".into(),
            ))
        }
    };

    let engine = context.engine();
    let table = context.table_mut()?;
    let report = engine.recalculate(table, reference)?;
    io::print_success(format!(
        "Recalculated {} expense row(s).",
        report.valid_rows()
    ));
    finish_edit(context, report);
    Ok(())
}

fn cmd_report(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let json = match args {
        [] => false,
        [flag] if flag.eq_ignore_ascii_case("--json") => true,
        _ => return Err(CommandError::InvalidArguments("usage: report [--json]".into())),
    };

    let engine = context.engine();
    let snapshot = engine.snapshot(context.table()?)?;
    let report = engine.compute(&snapshot, context.today());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(context, &report);
    }
    context.last_report = Some(report);
    Ok(())
}

fn cmd_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = match args {
        [] => context.sheet_path.clone().ok_or_else(|| {
            CommandError::InvalidArguments("usage: save <path> (no file associated)".into())
        })?,
        [path] => PathBuf::from(*path),
        _ => return Err(CommandError::InvalidArguments("usage: save [path]".into())),
    };

    context.store.save(context.table()?, &path)?;
    context.modified = false;
    remember_path(context, &path)?;
    io::print_success(format!("Saved `{}`.", path.display()));
    Ok(())
}

fn finish_edit(context: &mut ShellContext, report: RecomputeReport) {
    context.modified = true;
    if let Some(row) = report.displaced_row {
        io::print_warning(format!(
            "Row {} had no positive amount and was replaced by the summary row.",
            row + 1
        ));
    }
    if report.summary.is_empty() {
        io::print_info("Everyone is settled up.");
    } else {
        io::print_info(report.summary.replace('\n', "; "));
    }
    context.last_report = Some(report);
}

fn print_report(context: &ShellContext, report: &RecomputeReport) {
    let format = &context.config.engine.currency;
    output_section("Balances");
    let rows: Vec<Vec<String>> = report
        .balances
        .iter()
        .map(|balance| {
            vec![
                balance.name.clone(),
                format_currency(balance.paid, format),
                format_currency(balance.owed, format),
                format_currency(balance.balance, format),
            ]
        })
        .collect();
    io::print_info(render_table(&["Participant", "Paid", "Share", "Balance"], &rows));
    io::print_info(format!(
        "{} across {} expense(s). {}",
        report.total_label,
        report.valid_rows(),
        report.due_label
    ));
    if report.summary.is_empty() {
        io::print_info("Everyone is settled up.");
    } else {
        io::print_info(report.summary.replace('\n', "; "));
    }
}

fn confirm_discard(context: &ShellContext) -> CommandResult {
    if context.mode == CliMode::Interactive && context.modified {
        let discard = io::confirm_action("Discard unsaved changes to the current sheet?", false)?;
        if !discard {
            return Err(CommandError::InvalidArguments(
                "cancelled; save the current sheet first".into(),
            ));
        }
    }
    Ok(())
}

fn remember_path(context: &mut ShellContext, path: &Path) -> CommandResult {
    context.sheet_path = Some(path.to_path_buf());
    context.config.last_opened_sheet = Some(path.display().to_string());
    context.persist_config()
}

fn parse_method(label: &str) -> Result<SplitMethod, CommandError> {
    SplitMethod::parse_label(label).ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "unknown split method `{}` (expected equally, variably or fixed)",
            label
        ))
    })
}

/// Converts a 1-based sheet row into a table index.
fn parse_row(arg: &str) -> Result<usize, CommandError> {
    arg.parse::<usize>()
        .ok()
        .filter(|row| *row >= 1)
        .map(|row| row - 1)
        .ok_or_else(|| CommandError::InvalidArguments(format!("`{}` is not a row number", arg)))
}

/// Edits may extend the sheet by at most one row or column.
fn check_extent(table: &Table, row: usize, col: usize) -> CommandResult {
    if row > table.row_count() {
        return Err(CommandError::InvalidArguments(format!(
            "row {} is past the end of the sheet ({} row(s))",
            row + 1,
            table.row_count()
        )));
    }
    if col > table.width() {
        return Err(CommandError::InvalidArguments(format!(
            "column {} is past the end of the sheet (last column {})",
            column_letter(col),
            column_letter(table.width().saturating_sub(1))
        )));
    }
    Ok(())
}

/// Accepts a column letter, a participant header, or one of the fixed field names.
fn resolve_column(
    table: &Table,
    layout: &crate::sheet::SheetLayout,
    column: &str,
) -> Result<usize, CommandError> {
    let wanted = column.trim();
    let field = match wanted.to_lowercase().replace(['_', ' '], "").as_str() {
        "description" => Some(layout.description_col),
        "payer" | "paidby" => Some(layout.payer_col),
        "amount" => Some(layout.amount_col),
        "method" | "split" => Some(layout.method_col),
        _ => None,
    };
    if let Some(col) = field {
        return Ok(col);
    }

    let header = table.row(layout.header_row);
    if let Some(col) = header
        .iter()
        .position(|cell| cell.display().trim().eq_ignore_ascii_case(wanted))
    {
        return Ok(col);
    }

    column_index(wanted).ok_or_else(|| {
        CommandError::InvalidArguments(format!("unknown column `{}`", column))
    })
}

fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    let mut index = 0usize;
    for ch in letters.chars() {
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

fn allocation_hint(method: SplitMethod) -> &'static str {
    match method {
        SplitMethod::Equal => "Mark each sharing participant with `set <row> <name> x`.",
        SplitMethod::Percentage => "Enter each share as a percentage, e.g. `set <row> <name> 40%`.",
        SplitMethod::Fixed => "Enter each share as an amount, e.g. `set <row> <name> 25`.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::core::process_script;
    use tempfile::TempDir;

    fn script(temp: &TempDir, lines: &[&str]) -> ShellContext {
        let sheet = temp.path().join("house.csv");
        let mut commands = vec![format!("new {} Alice Bob", sheet.display())];
        commands.extend(lines.iter().map(|line| line.to_string()));
        let refs: Vec<&str> = commands.iter().map(String::as_str).collect();
        process_script(temp.path(), &refs).unwrap()
    }

    #[test]
    fn column_letters_round_trip_past_z() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_index("aa"), Some(26));
        assert_eq!(column_index("G"), Some(6));
        assert_eq!(column_index("1"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZ"), None);
    }

    #[test]
    fn out_of_range_cells_are_rejected() {
        let temp = TempDir::new().unwrap();
        let app = script(
            &temp,
            &[
                "add Rent Alice 100",
                "set 2 ZZZZZZZZZZZZZZZ x",
                "set 99999999999 A x",
                "set 2 ZZ x",
                "method 99999999999 fixed",
            ],
        );
        assert!(app.running);
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.width(), 7);
        assert_eq!(table.text(1, 3), "Equally");
    }

    #[test]
    fn edit_one_past_the_end_is_allowed() {
        let temp = TempDir::new().unwrap();
        let app = script(&temp, &["add Rent Alice 100", "set 4 A Note"]);
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(3, 0), "Note");
    }

    #[test]
    fn failed_recalc_still_marks_sheet_modified() {
        let temp = TempDir::new().unwrap();
        let app = script(&temp, &["save", r#"set 1 Alice """#]);
        assert!(app.modified);
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(0, 4), "");
        assert!(app.last_report.is_none());
    }

    #[test]
    fn comma_decimal_settings_flow_through_commands() {
        let temp = TempDir::new().unwrap();
        let app = script(
            &temp,
            &[
                "config set decimal_separator ,",
                "config set grouping_separator .",
                "add Dinner Alice 75 fixed",
                "set 2 Alice 25",
            ],
        );
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(1, 5), "$50,00");
        assert_eq!(table.text(1, 6), "Bob Pays: $50,00");
        assert_eq!(table.text(2, 2), "$75,00");
        let report = app.last_report.as_ref().unwrap();
        assert_eq!(report.summary, "Bob owes $50,00");
        assert_eq!(report.total_label, "$75,00");
        assert_eq!(report.balance("Bob").unwrap().owed, 50.0);
    }

    #[test]
    fn summary_over_skipped_row_is_reported() {
        let temp = TempDir::new().unwrap();
        let sheet = temp.path().join("flat.csv");
        std::fs::write(
            &sheet,
            "Description,Paid By,Amount,Split,Alice,Bob,Breakdown\n\
             Rent,Alice,100,Equally,TRUE,TRUE,\n\
             Coffee,Bob,,Fixed,3,,\n",
        )
        .unwrap();
        let open = format!("open {}", sheet.display());
        let app = process_script(temp.path(), &[open.as_str(), "recalc"]).unwrap();
        let report = app.last_report.as_ref().unwrap();
        assert_eq!(report.displaced_row, Some(2));
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(2, 1), "Summary");
    }

    #[test]
    fn add_over_skipped_row_keeps_new_expense() {
        let temp = TempDir::new().unwrap();
        let sheet = temp.path().join("flat.csv");
        std::fs::write(
            &sheet,
            "Description,Paid By,Amount,Split,Alice,Bob,Breakdown\n\
             Rent,Alice,100,Equally,TRUE,TRUE,\n\
             Coffee,Bob,,Fixed,3,,\n",
        )
        .unwrap();
        let open = format!("open {}", sheet.display());
        let app = process_script(temp.path(), &[open.as_str(), "add Taxi Bob 30"]).unwrap();
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(2, 0), "Taxi");
        assert_eq!(table.get(2, 4), &CellValue::Empty);
        assert_eq!(table.text(3, 1), "Summary");
    }

    #[test]
    fn new_sheet_writes_header() {
        let temp = TempDir::new().unwrap();
        let app = script(&temp, &[]);
        let table = app.table.as_ref().unwrap();
        let header: Vec<String> = table.row(0).iter().map(CellValue::display).collect();
        assert_eq!(
            header,
            vec!["Description", "Paid By", "Amount", "Split", "Alice", "Bob", "Breakdown"]
        );
    }

    #[test]
    fn equal_split_through_commands() {
        let temp = TempDir::new().unwrap();
        let app = script(
            &temp,
            &["add Rent Alice 100", "set 2 Alice x", "set 2 Bob x"],
        );
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(1, 6), "Bob Pays: $50.00");
        assert_eq!(table.text(2, 1), "Summary");
        assert_eq!(table.text(2, 6), "Bob owes $50.00");
        assert!(app.modified);
    }

    #[test]
    fn fixed_allocation_fills_other_participant() {
        let temp = TempDir::new().unwrap();
        let app = script(&temp, &["add Dinner Alice 100 fixed", "set 2 Alice 50"]);
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(1, 5), "$50.00");
        assert_eq!(table.text(1, 6), "Bob Pays: $50.00");
        let report = app.last_report.as_ref().unwrap();
        assert_eq!(report.summary, "Bob owes $50.00");
    }

    #[test]
    fn second_expense_replaces_summary_row() {
        let temp = TempDir::new().unwrap();
        let app = script(
            &temp,
            &[
                "add Rent Alice 100",
                "set 2 Bob x",
                "add Groceries Bob 40 variably",
                "set 3 Alice 25%",
            ],
        );
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(2, 0), "Groceries");
        assert_eq!(table.text(2, 4), "25%");
        assert_eq!(table.text(2, 5), "75%");
        assert_eq!(table.text(3, 1), "Summary");
    }

    #[test]
    fn method_command_rejects_unknown_labels() {
        let temp = TempDir::new().unwrap();
        let app = script(&temp, &["add Rent Alice 100", "method 2 sometimes"]);
        let table = app.table.as_ref().unwrap();
        assert_eq!(table.text(1, 3), "Equally");
    }

    #[test]
    fn save_then_open_restores_sheet() {
        let temp = TempDir::new().unwrap();
        let sheet = temp.path().join("house.csv");
        let app = script(&temp, &["add Rent Alice 100", "set 2 Bob x", "save"]);
        assert!(!app.modified);
        assert!(sheet.exists());

        let open = format!("open {}", sheet.display());
        let reopened = process_script(temp.path(), &[open.as_str()]).unwrap();
        let table = reopened.table.as_ref().unwrap();
        assert_eq!(table.text(1, 6), "Bob Pays: $100.00");
        assert_eq!(
            reopened.config.last_opened_sheet.as_deref(),
            Some(sheet.display().to_string().as_str())
        );
    }

    #[test]
    fn commands_without_sheet_report_error() {
        let temp = TempDir::new().unwrap();
        let app = process_script(temp.path(), &["recalc", "show", "set 2 A x"]).unwrap();
        assert!(app.table.is_none());
        assert!(app.running);
    }
}
