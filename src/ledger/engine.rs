//! The recompute pass and the write-back of its results into the sheet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::accumulator::{LedgerAccumulator, ParticipantTotals};
use super::classify::{LedgerSnapshot, RowClass};
use super::remainder::{apply_fill, RemainderFill, RemainderResolver};
use super::split::split_in;
use super::summary::{DueSchedule, SummaryFormatter};
use crate::currency::CurrencyFormat;
use crate::errors::LedgerError;
use crate::sheet::{CellValue, SheetLayout, Table};

pub const SUMMARY_LABEL: &str = "Summary";

/// Settings that shape one recompute pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub layout: SheetLayout,
    pub currency: CurrencyFormat,
    pub breakdown_separator: String,
    pub summary_separator: String,
    pub due: DueSchedule,
    pub clear_stale_summaries: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            currency: CurrencyFormat::default(),
            breakdown_separator: ", ".into(),
            summary_separator: ", ".into(),
            due: DueSchedule::default(),
            clear_stale_summaries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowReport {
    pub row: usize,
    pub class: RowClass,
    pub breakdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    pub name: String,
    pub paid: f64,
    pub owed: f64,
    pub balance: f64,
}

impl From<&ParticipantTotals> for BalanceReport {
    fn from(totals: &ParticipantTotals) -> Self {
        Self {
            name: totals.name.clone(),
            paid: totals.paid,
            owed: totals.owed,
            balance: totals.balance(),
        }
    }
}

/// Outcome of one recompute pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeReport {
    pub rows: Vec<RowReport>,
    pub balances: Vec<BalanceReport>,
    pub expense_total: f64,
    pub total_label: String,
    pub summary: String,
    pub due_label: String,
    pub summary_row: usize,
    pub breakdown_col: usize,
    /// A skipped row with content that the summary row was written over.
    pub displaced_row: Option<usize>,
}

impl RecomputeReport {
    pub fn row(&self, row: usize) -> Option<&RowReport> {
        self.rows.iter().find(|report| report.row == row)
    }

    pub fn balance(&self, name: &str) -> Option<&BalanceReport> {
        self.balances.iter().find(|balance| balance.name == name)
    }

    pub fn valid_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.class == RowClass::Valid)
            .count()
    }
}

/// What an edit notification led to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The split selector changed; only the input widgets need reconfiguring.
    MethodChanged,
    Recalculated {
        fill: Option<RemainderFill>,
        report: RecomputeReport,
    },
    Ignored,
}

pub struct RecalcEngine {
    settings: EngineSettings,
}

impl RecalcEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn snapshot(&self, table: &Table) -> Result<LedgerSnapshot, LedgerError> {
        LedgerSnapshot::capture(table, &self.settings.layout, &self.settings.currency)
    }

    /// Runs the calculation over a snapshot without touching the table.
    pub fn compute(&self, snapshot: &LedgerSnapshot, reference: NaiveDate) -> RecomputeReport {
        let settings = &self.settings;
        let mut ledger = LedgerAccumulator::new(snapshot.participant_names());
        let mut expenses = snapshot.expenses.iter().peekable();
        let mut rows = Vec::with_capacity(snapshot.rows.len());

        for &(row, class) in &snapshot.rows {
            let mut breakdown = String::new();
            if class == RowClass::Valid {
                if let Some(expense) = expenses.next_if(|expense| expense.row == row) {
                    let outcome = split_in(
                        expense.method,
                        expense.amount,
                        &expense.payer,
                        &expense.allocations,
                        &settings.currency,
                    );
                    breakdown =
                        outcome.breakdown(&settings.currency, &settings.breakdown_separator);
                    ledger.fold(&outcome);
                    debug!(
                        "row {}: {} {} split, {} share(s)",
                        row,
                        expense.amount,
                        expense.method,
                        outcome.shares.len()
                    );
                }
            }
            rows.push(RowReport {
                row,
                class,
                breakdown,
            });
        }

        let formatter = SummaryFormatter::new(&settings.currency, &settings.summary_separator);
        let summary = formatter.balance_summary(ledger.totals());
        let total_label = formatter.total(ledger.expense_total());
        RecomputeReport {
            rows,
            balances: ledger.totals().iter().map(BalanceReport::from).collect(),
            expense_total: ledger.expense_total(),
            total_label,
            summary,
            due_label: settings.due.label(reference),
            summary_row: snapshot.summary_row(),
            breakdown_col: snapshot.breakdown_col,
            displaced_row: None,
        }
    }

    /// Full recompute over the current table followed by the write-back.
    ///
    /// Nothing is written when the snapshot cannot be taken.
    pub fn recalculate(
        &self,
        table: &mut Table,
        reference: NaiveDate,
    ) -> Result<RecomputeReport, LedgerError> {
        let snapshot = self.snapshot(table)?;
        let mut report = self.compute(&snapshot, reference);
        report.displaced_row = snapshot.displaced_row(table);
        if let Some(row) = report.displaced_row {
            warn!(
                "row {} has no positive amount and is overwritten by the summary",
                row
            );
        }
        self.write_back(table, &snapshot, &report);
        info!(
            "recalculated {} expense row(s), total {}",
            report.valid_rows(),
            report.total_label
        );
        Ok(report)
    }

    /// Reacts to a single changed cell the way the sheet's edit hook does.
    pub fn handle_edit(
        &self,
        table: &mut Table,
        row: usize,
        col: usize,
        reference: NaiveDate,
    ) -> Result<EditOutcome, LedgerError> {
        let layout = &self.settings.layout;
        if row < layout.header_row {
            return Ok(EditOutcome::Ignored);
        }
        if layout.is_data_row(row) && col == layout.method_col {
            return Ok(EditOutcome::MethodChanged);
        }

        let snapshot = self.snapshot(table)?;
        if col >= snapshot.breakdown_col && row != layout.header_row {
            return Ok(EditOutcome::Ignored);
        }

        let mut fill = None;
        let is_allocation = snapshot.participants.iter().any(|p| p.column == col);
        if is_allocation && layout.is_data_row(row) {
            let resolver = RemainderResolver::new(layout, &self.settings.currency);
            fill = resolver.resolve(table, &snapshot.participants, row, col);
            if let Some(fill) = &fill {
                debug!(
                    "filling remainder {} for {} on row {}",
                    fill.value, fill.participant, fill.row
                );
                apply_fill(table, fill);
            }
        }

        let report = self.recalculate(table, reference)?;
        Ok(EditOutcome::Recalculated { fill, report })
    }

    fn write_back(&self, table: &mut Table, snapshot: &LedgerSnapshot, report: &RecomputeReport) {
        let layout = &self.settings.layout;
        let breakdown_col = snapshot.breakdown_col;

        for row in &report.rows {
            match row.class {
                RowClass::Valid => {
                    table.set(row.row, breakdown_col, CellValue::text(row.breakdown.clone()))
                }
                RowClass::Skipped => table.clear(row.row, breakdown_col),
                RowClass::Stale => {
                    if self.settings.clear_stale_summaries && row.row != report.summary_row {
                        clear_row(table, row.row, breakdown_col);
                    }
                }
            }
        }

        let summary_row = report.summary_row;
        clear_row(table, summary_row, breakdown_col);
        table.set(
            summary_row,
            layout.description_col,
            CellValue::text(report.due_label.clone()),
        );
        table.set(summary_row, layout.payer_col, CellValue::text(SUMMARY_LABEL));
        table.set(
            summary_row,
            layout.amount_col,
            CellValue::text(report.total_label.clone()),
        );
        table.set(
            summary_row,
            breakdown_col,
            CellValue::text(report.summary.clone()),
        );
    }
}

impl Default for RecalcEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

fn clear_row(table: &mut Table, row: usize, last_col: usize) {
    for col in 0..=last_col {
        table.clear(row, col);
    }
}
