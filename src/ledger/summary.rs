use chrono::{
    format::{Item, StrftimeItems},
    Datelike, Months, NaiveDate,
};
use serde::{Deserialize, Serialize};

use super::accumulator::ParticipantTotals;
use crate::currency::{format_currency, CurrencyFormat};

/// Balances smaller than half a cent are treated as settled.
const SETTLED_EPSILON: f64 = 0.005;
const DEFAULT_DATE_FORMAT: &str = "%b %d, %Y";

/// When the group's balances fall due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DueSchedule {
    pub day_of_month: u32,
    pub date_format: String,
}

impl Default for DueSchedule {
    fn default() -> Self {
        Self {
            day_of_month: 1,
            date_format: DEFAULT_DATE_FORMAT.into(),
        }
    }
}

impl DueSchedule {
    /// Next occurrence of the due day strictly after `reference`.
    pub fn next_due_date(&self, reference: NaiveDate) -> NaiveDate {
        let day = self.day_of_month.clamp(1, 31);
        let this_month = clamp_day(reference.year(), reference.month(), day);
        if this_month > reference {
            return this_month;
        }
        let next = first_of_month(reference)
            .checked_add_months(Months::new(1))
            .unwrap_or(reference);
        clamp_day(next.year(), next.month(), day)
    }

    pub fn label(&self, reference: NaiveDate) -> String {
        let due = self.next_due_date(reference);
        let format = if is_valid_date_format(&self.date_format) {
            self.date_format.as_str()
        } else {
            DEFAULT_DATE_FORMAT
        };
        format!("Due: {}", due.format(format))
    }
}

pub fn is_valid_date_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn clamp_day(year: i32, month: u32, day: u32) -> NaiveDate {
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or(NaiveDate::MIN)
}

pub struct SummaryFormatter<'a> {
    format: &'a CurrencyFormat,
    separator: &'a str,
}

impl<'a> SummaryFormatter<'a> {
    pub fn new(format: &'a CurrencyFormat, separator: &'a str) -> Self {
        Self { format, separator }
    }

    /// `"Name owes $X.XX"` for each participant in the red, in declaration order.
    pub fn fragments(&self, totals: &[ParticipantTotals]) -> Vec<String> {
        totals
            .iter()
            .filter(|totals| totals.balance() < -SETTLED_EPSILON)
            .map(|totals| {
                format!(
                    "{} owes {}",
                    totals.name,
                    format_currency(totals.balance().abs(), self.format)
                )
            })
            .collect()
    }

    pub fn balance_summary(&self, totals: &[ParticipantTotals]) -> String {
        self.fragments(totals).join(self.separator)
    }

    pub fn total(&self, expense_total: f64) -> String {
        format_currency(expense_total, self.format)
    }
}
