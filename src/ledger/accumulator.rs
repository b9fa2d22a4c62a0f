use std::collections::HashMap;

use serde::Serialize;

use super::split::SplitOutcome;

/// Running totals for one participant within a single pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantTotals {
    pub name: String,
    pub paid: f64,
    pub owed: f64,
}

impl ParticipantTotals {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            paid: 0.0,
            owed: 0.0,
        }
    }

    /// Positive when the group owes this participant.
    pub fn balance(&self) -> f64 {
        self.paid - self.owed
    }
}

/// Folds split outcomes into per-participant totals.
///
/// A fresh accumulator is built for every recompute pass; nothing carries over.
#[derive(Debug, Clone, Default)]
pub struct LedgerAccumulator {
    totals: Vec<ParticipantTotals>,
    index: HashMap<String, usize>,
    expense_total: f64,
    rows_folded: usize,
}

impl LedgerAccumulator {
    pub fn new<'a>(participants: impl IntoIterator<Item = &'a str>) -> Self {
        let mut accumulator = Self::default();
        for name in participants {
            if accumulator.index.contains_key(name) {
                continue;
            }
            accumulator
                .index
                .insert(name.to_string(), accumulator.totals.len());
            accumulator.totals.push(ParticipantTotals::new(name));
        }
        accumulator
    }

    pub fn fold(&mut self, outcome: &SplitOutcome) {
        self.expense_total += outcome.amount;
        self.rows_folded += 1;
        if let Some(&payer) = self.index.get(outcome.payer.as_str()) {
            self.totals[payer].paid += outcome.amount;
        }
        for share in &outcome.shares {
            if let Some(&slot) = self.index.get(share.participant.as_str()) {
                self.totals[slot].owed += share.owed;
            }
        }
    }

    pub fn totals(&self) -> &[ParticipantTotals] {
        &self.totals
    }

    pub fn get(&self, name: &str) -> Option<&ParticipantTotals> {
        self.index.get(name).map(|&slot| &self.totals[slot])
    }

    pub fn expense_total(&self) -> f64 {
        self.expense_total
    }

    pub fn rows_folded(&self) -> usize {
        self.rows_folded
    }
}
