//! Auto-fill of the one allocation cell that can be derived from the others.

use serde::Serialize;
use tracing::debug;

use super::classify::ParticipantColumn;
use super::split::SplitMethod;
use crate::currency::{format_currency, format_percent, parse_currency_in, CurrencyFormat};
use crate::sheet::{CellValue, SheetLayout, Table};

const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemainderRule {
    /// Exactly one other cell was empty.
    SingleEmptySlot,
    /// The sheet has two participants; the other cell is overwritten.
    TwoParticipants,
}

/// A remainder the resolver decided to write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemainderFill {
    pub row: usize,
    pub column: usize,
    pub participant: String,
    pub value: f64,
    pub rule: RemainderRule,
    #[serde(skip)]
    pub cell: CellValue,
}

pub struct RemainderResolver<'a> {
    layout: &'a SheetLayout,
    format: &'a CurrencyFormat,
}

impl<'a> RemainderResolver<'a> {
    pub fn new(layout: &'a SheetLayout, format: &'a CurrencyFormat) -> Self {
        Self { layout, format }
    }

    /// Decides which cell, if any, receives the remainder after `edited_col` changed.
    ///
    /// Returns `None` for equal splits, edits outside the participant block, and
    /// ambiguous rows (several empty cells among more than two participants).
    pub fn resolve(
        &self,
        table: &Table,
        participants: &[ParticipantColumn],
        row: usize,
        edited_col: usize,
    ) -> Option<RemainderFill> {
        if !self.layout.is_data_row(row) {
            return None;
        }
        let edited = participants.iter().position(|p| p.column == edited_col)?;
        let method = SplitMethod::from_label(&table.text(row, self.layout.method_col));
        let amount = parse_currency_in(table.get(row, self.layout.amount_col), self.format);
        let target = method.target_total(amount)?;

        let edited_value = method.parse_allocation(table.get(row, edited_col), self.format);
        let mut filled_sum = 0.0;
        let mut empty = Vec::new();
        for (index, participant) in participants.iter().enumerate() {
            if index == edited {
                continue;
            }
            let value = method.parse_allocation(table.get(row, participant.column), self.format);
            if value > 0.0 {
                filled_sum += value;
            } else {
                empty.push(index);
            }
        }

        if let [slot] = empty.as_slice() {
            if let Some(value) = non_negative(target - edited_value - filled_sum) {
                return Some(self.fill(
                    method,
                    row,
                    &participants[*slot],
                    value,
                    RemainderRule::SingleEmptySlot,
                ));
            }
        }

        if participants.len() == 2 {
            let other = &participants[1 - edited];
            if let Some(value) = non_negative(target - edited_value) {
                return Some(self.fill(
                    method,
                    row,
                    other,
                    value,
                    RemainderRule::TwoParticipants,
                ));
            }
        }

        debug!(
            "row {} has {} empty allocation(s); remainder not filled",
            row,
            empty.len()
        );
        None
    }

    fn fill(
        &self,
        method: SplitMethod,
        row: usize,
        participant: &ParticipantColumn,
        value: f64,
        rule: RemainderRule,
    ) -> RemainderFill {
        let cell = match method {
            SplitMethod::Percentage => CellValue::Text(format_percent(value)),
            _ => CellValue::Text(format_currency(value, self.format)),
        };
        RemainderFill {
            row,
            column: participant.column,
            participant: participant.name.clone(),
            value,
            rule,
            cell,
        }
    }
}

fn non_negative(value: f64) -> Option<f64> {
    if value >= 0.0 {
        Some(value)
    } else if value > -TOLERANCE {
        Some(0.0)
    } else {
        None
    }
}

/// Writes a resolved remainder into the table.
pub fn apply_fill(table: &mut Table, fill: &RemainderFill) {
    table.set(fill.row, fill.column, fill.cell.clone());
}
