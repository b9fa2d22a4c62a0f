use serde::Serialize;
use tracing::warn;

use super::split::{Allocation, SplitMethod};
use crate::currency::{parse_currency_in, CurrencyFormat};
use crate::errors::LedgerError;
use crate::sheet::{SheetLayout, Table};

const SENTINEL_HEADERS: [&str; 3] = ["breakdown", "summary", "total"];
const SUMMARY_MARKER: &str = "summary";
const DUE_MARKER: &str = "due:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantColumn {
    pub name: String,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowClass {
    Valid,
    Stale,
    Skipped,
}

/// A data row that takes part in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRow {
    pub row: usize,
    pub description: String,
    pub payer: String,
    pub amount: f64,
    pub method: SplitMethod,
    pub allocations: Vec<Allocation>,
}

/// Everything one recompute pass reads from the table.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub participants: Vec<ParticipantColumn>,
    pub breakdown_col: usize,
    pub rows: Vec<(usize, RowClass)>,
    pub expenses: Vec<ExpenseRow>,
    first_data_row: usize,
}

impl LedgerSnapshot {
    pub fn capture(
        table: &Table,
        layout: &SheetLayout,
        format: &CurrencyFormat,
    ) -> Result<Self, LedgerError> {
        let participants = participant_columns(table, layout)?;
        let breakdown_col = layout.first_participant_col + participants.len();

        let mut rows = Vec::new();
        let mut expenses = Vec::new();
        if let Some(last) = table.last_populated_row() {
            for row in layout.first_data_row..=last {
                let class = classify_row(table, layout, format, row);
                if class == RowClass::Valid {
                    expenses.push(read_expense(table, layout, format, &participants, row));
                }
                rows.push((row, class));
            }
        }

        Ok(Self {
            participants,
            breakdown_col,
            rows,
            expenses,
            first_data_row: layout.first_data_row,
        })
    }

    pub fn participant_names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name.as_str())
    }

    /// Row directly below the last valid expense, or the first data row.
    pub fn summary_row(&self) -> usize {
        self.expenses
            .last()
            .map(|expense| expense.row + 1)
            .unwrap_or(self.first_data_row)
    }

    /// The summary row when it currently holds a skipped row with content,
    /// which the next write-back replaces.
    pub fn displaced_row(&self, table: &Table) -> Option<usize> {
        let summary_row = self.summary_row();
        let skipped = self
            .rows
            .iter()
            .any(|&(row, class)| row == summary_row && class == RowClass::Skipped);
        let has_content =
            (0..self.breakdown_col).any(|col| !table.get(summary_row, col).is_empty());
        (skipped && has_content).then_some(summary_row)
    }
}

/// Reads the participant block of the header row up to the first sentinel column.
pub fn participant_columns(
    table: &Table,
    layout: &SheetLayout,
) -> Result<Vec<ParticipantColumn>, LedgerError> {
    let mut participants: Vec<ParticipantColumn> = Vec::new();
    let mut column = layout.first_participant_col;
    loop {
        let header = table.text(layout.header_row, column);
        let name = header.trim();
        if name.is_empty() || is_sentinel_header(name) {
            break;
        }
        if participants.iter().any(|p| p.name == name) {
            warn!("participant `{}` is declared more than once", name);
        }
        participants.push(ParticipantColumn {
            name: name.to_string(),
            column,
        });
        column += 1;
    }

    if participants.is_empty() {
        return Err(LedgerError::NoParticipants);
    }
    Ok(participants)
}

fn is_sentinel_header(name: &str) -> bool {
    SENTINEL_HEADERS
        .iter()
        .any(|sentinel| name.eq_ignore_ascii_case(sentinel))
}

/// True for text left behind by a previously written summary row.
pub fn is_stale_marker(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    text == SUMMARY_MARKER || text.starts_with(DUE_MARKER)
}

pub fn classify_row(
    table: &Table,
    layout: &SheetLayout,
    format: &CurrencyFormat,
    row: usize,
) -> RowClass {
    let description = table.text(row, layout.description_col);
    let payer = table.text(row, layout.payer_col);
    if is_stale_marker(&description) || is_stale_marker(&payer) {
        return RowClass::Stale;
    }
    let amount = parse_currency_in(table.get(row, layout.amount_col), format);
    if amount.is_finite() && amount > 0.0 {
        RowClass::Valid
    } else {
        RowClass::Skipped
    }
}

fn read_expense(
    table: &Table,
    layout: &SheetLayout,
    format: &CurrencyFormat,
    participants: &[ParticipantColumn],
    row: usize,
) -> ExpenseRow {
    ExpenseRow {
        row,
        description: table.text(row, layout.description_col).trim().to_string(),
        payer: table.text(row, layout.payer_col).trim().to_string(),
        amount: parse_currency_in(table.get(row, layout.amount_col), format),
        method: SplitMethod::from_label(&table.text(row, layout.method_col)),
        allocations: participants
            .iter()
            .map(|p| Allocation::new(p.name.clone(), table.get(row, p.column).clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::CellValue;

    fn sheet(rows: Vec<Vec<&str>>) -> Table {
        Table::from_strings(rows)
    }

    fn capture(table: &Table) -> LedgerSnapshot {
        LedgerSnapshot::capture(table, &SheetLayout::default(), &CurrencyFormat::default())
            .unwrap()
    }

    #[test]
    fn participants_stop_at_breakdown_sentinel() {
        let table = sheet(vec![vec![
            "Description",
            "Paid By",
            "Amount",
            "Split",
            "Alice",
            "Bob",
            "Breakdown",
            "Extra",
        ]]);
        let participants = participant_columns(&table, &SheetLayout::default()).unwrap();
        let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(participants[1].column, 5);
    }

    #[test]
    fn participants_stop_at_blank_or_total_header() {
        let layout = SheetLayout::default();
        let blank = sheet(vec![vec!["D", "P", "A", "S", "Alice", "", "Bob"]]);
        assert_eq!(participant_columns(&blank, &layout).unwrap().len(), 1);
        let total = sheet(vec![vec!["D", "P", "A", "S", "Alice", "Bob", "TOTAL"]]);
        assert_eq!(participant_columns(&total, &layout).unwrap().len(), 2);
    }

    #[test]
    fn empty_participant_block_is_an_error() {
        let table = sheet(vec![vec!["D", "P", "A", "S", "Summary"]]);
        assert!(matches!(
            participant_columns(&table, &SheetLayout::default()),
            Err(LedgerError::NoParticipants)
        ));
    }

    #[test]
    fn rows_are_classified() {
        let table = sheet(vec![
            vec!["D", "P", "A", "S", "Alice", "Bob"],
            vec!["Rent", "Alice", "2000", "Equally", "TRUE", "TRUE"],
            vec!["", "", "", "", "", ""],
            vec!["", "Bob", "$12.50", "", "TRUE"],
            vec!["Coffee", "Bob", "abc"],
            vec!["Due: Jan 01, 2025", "Summary", "$2,012.50"],
            vec!["Refund", "Alice", "-20"],
        ]);
        let snapshot = capture(&table);
        assert_eq!(
            snapshot.rows,
            vec![
                (1, RowClass::Valid),
                (2, RowClass::Skipped),
                (3, RowClass::Valid),
                (4, RowClass::Skipped),
                (5, RowClass::Stale),
                (6, RowClass::Skipped),
            ]
        );
        assert_eq!(snapshot.expenses.len(), 2);
        assert_eq!(snapshot.expenses[1].amount, 12.5);
        assert_eq!(snapshot.summary_row(), 4);
        assert_eq!(snapshot.displaced_row(&table), Some(4));
        assert_eq!(snapshot.breakdown_col, 6);
    }

    #[test]
    fn summary_marker_excludes_row_regardless_of_amount() {
        let table = sheet(vec![
            vec!["D", "P", "A", "S", "Alice"],
            vec!["Groceries", "summary", "40"],
        ]);
        let layout = SheetLayout::default();
        let format = CurrencyFormat::default();
        assert_eq!(classify_row(&table, &layout, &format, 1), RowClass::Stale);
    }

    #[test]
    fn no_valid_rows_puts_summary_below_header() {
        let table = sheet(vec![vec!["D", "P", "A", "S", "Alice"]]);
        let snapshot = capture(&table);
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.summary_row(), 1);
    }

    #[test]
    fn expense_row_reads_allocations_in_column_order() {
        let table = sheet(vec![
            vec!["D", "P", "A", "S", "Alice", "Bob"],
            vec!["Dinner", "Bob", "75", "Fixed", "$25", ""],
        ]);
        let snapshot = capture(&table);
        let expense = &snapshot.expenses[0];
        assert_eq!(expense.method, SplitMethod::Fixed);
        assert_eq!(expense.allocations[0].input, CellValue::Text("$25".into()));
        assert_eq!(expense.allocations[1].input, CellValue::Empty);
    }

    #[test]
    fn amounts_are_read_with_the_sheet_separators() {
        let table = sheet(vec![
            vec!["D", "P", "A", "S", "Alice", "Bob"],
            vec!["Hotel", "Alice", "€1.234,50", "Equally", "TRUE", "TRUE"],
        ]);
        let euro = CurrencyFormat {
            symbol: "€".into(),
            decimal_separator: ',',
            grouping_separator: '.',
            precision: 2,
        };
        let snapshot = LedgerSnapshot::capture(&table, &SheetLayout::default(), &euro).unwrap();
        assert_eq!(snapshot.expenses[0].amount, 1234.5);
    }
}
