use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::currency::{format_currency, is_checked, parse_currency_in, parse_percentage, CurrencyFormat};
use crate::sheet::CellValue;

/// How a single expense is divided among participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SplitMethod {
    #[default]
    Equal,
    Percentage,
    Fixed,
}

static METHOD_ALIASES: Lazy<HashMap<&'static str, SplitMethod>> = Lazy::new(|| {
    HashMap::from([
        ("equally", SplitMethod::Equal),
        ("equal", SplitMethod::Equal),
        ("even", SplitMethod::Equal),
        ("variably", SplitMethod::Percentage),
        ("variable", SplitMethod::Percentage),
        ("percentage", SplitMethod::Percentage),
        ("percent", SplitMethod::Percentage),
        ("%", SplitMethod::Percentage),
        ("fixed", SplitMethod::Fixed),
        ("fixed amount", SplitMethod::Fixed),
        ("amount", SplitMethod::Fixed),
    ])
});

impl SplitMethod {
    /// Resolves a selector label. Unknown or blank labels fall back to `Equal`.
    pub fn from_label(label: &str) -> Self {
        let key = label.trim().to_lowercase();
        METHOD_ALIASES.get(key.as_str()).copied().unwrap_or_default()
    }

    /// Strict lookup used by the CLI, where a typo should be reported.
    pub fn parse_label(label: &str) -> Option<Self> {
        METHOD_ALIASES.get(label.trim().to_lowercase().as_str()).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            SplitMethod::Equal => "Equally",
            SplitMethod::Percentage => "Variably",
            SplitMethod::Fixed => "Fixed",
        }
    }

    /// Value that allocations are expected to add up to, if the method has one.
    pub fn target_total(&self, amount: f64) -> Option<f64> {
        match self {
            SplitMethod::Equal => None,
            SplitMethod::Percentage => Some(100.0),
            SplitMethod::Fixed => Some(amount),
        }
    }

    /// Parser applied to allocation cells under this method.
    pub fn parse_allocation(&self, value: &CellValue, format: &CurrencyFormat) -> f64 {
        match self {
            SplitMethod::Equal => {
                if is_checked(value) {
                    1.0
                } else {
                    0.0
                }
            }
            SplitMethod::Percentage => parse_percentage(value),
            SplitMethod::Fixed => parse_currency_in(value, format),
        }
    }

    pub fn calculator(&self) -> &'static dyn SplitCalculator {
        match self {
            SplitMethod::Equal => &EqualSplit,
            SplitMethod::Percentage => &PercentageSplit,
            SplitMethod::Fixed => &FixedSplit,
        }
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One participant's raw allocation input on an expense row.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub participant: String,
    pub input: CellValue,
}

impl Allocation {
    pub fn new(participant: impl Into<String>, input: CellValue) -> Self {
        Self {
            participant: participant.into(),
            input,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub participant: String,
    pub owed: f64,
}

/// Result of splitting one expense row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SplitOutcome {
    pub payer: String,
    pub amount: f64,
    pub shares: Vec<Share>,
}

impl SplitOutcome {
    fn new(payer: &str, amount: f64) -> Self {
        Self {
            payer: payer.trim().to_string(),
            amount,
            shares: Vec::new(),
        }
    }

    fn push(&mut self, participant: &str, owed: f64) {
        if owed > 0.0 {
            self.shares.push(Share {
                participant: participant.to_string(),
                owed,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn owed_by(&self, participant: &str) -> f64 {
        self.shares
            .iter()
            .filter(|share| share.participant == participant)
            .map(|share| share.owed)
            .sum()
    }

    pub fn total_owed(&self) -> f64 {
        self.shares.iter().map(|share| share.owed).sum()
    }

    /// `"Name Pays: $X.XX"` for every share not held by the payer.
    pub fn fragments(&self, format: &CurrencyFormat) -> Vec<String> {
        self.shares
            .iter()
            .filter(|share| share.participant != self.payer)
            .map(|share| {
                format!(
                    "{} Pays: {}",
                    share.participant,
                    format_currency(share.owed, format)
                )
            })
            .collect()
    }

    pub fn breakdown(&self, format: &CurrencyFormat, separator: &str) -> String {
        self.fragments(format).join(separator)
    }
}

/// A split algorithm over one expense row.
pub trait SplitCalculator: Sync {
    fn split(
        &self,
        amount: f64,
        payer: &str,
        allocations: &[Allocation],
        format: &CurrencyFormat,
    ) -> SplitOutcome;
}

pub struct EqualSplit;

impl SplitCalculator for EqualSplit {
    fn split(
        &self,
        amount: f64,
        payer: &str,
        allocations: &[Allocation],
        _format: &CurrencyFormat,
    ) -> SplitOutcome {
        let mut outcome = SplitOutcome::new(payer, amount);
        let selected: Vec<&Allocation> = allocations
            .iter()
            .filter(|allocation| is_checked(&allocation.input))
            .collect();
        if selected.is_empty() {
            return outcome;
        }
        // The leftover fraction of a cent is not redistributed.
        let share = amount / selected.len() as f64;
        for allocation in selected {
            outcome.push(&allocation.participant, share);
        }
        outcome
    }
}

pub struct PercentageSplit;

impl SplitCalculator for PercentageSplit {
    fn split(
        &self,
        amount: f64,
        payer: &str,
        allocations: &[Allocation],
        _format: &CurrencyFormat,
    ) -> SplitOutcome {
        let mut outcome = SplitOutcome::new(payer, amount);
        let percents: Vec<f64> = allocations
            .iter()
            .map(|allocation| parse_percentage(&allocation.input))
            .collect();

        if percents.iter().all(|pct| *pct == 0.0) {
            // Checkbox state left over from an equal split.
            let checked: Vec<&Allocation> = allocations
                .iter()
                .filter(|allocation| allocation.input == CellValue::Bool(true))
                .collect();
            if !checked.is_empty() {
                let share = amount / checked.len() as f64;
                for allocation in checked {
                    outcome.push(&allocation.participant, share);
                }
            }
            return outcome;
        }

        for (allocation, pct) in allocations.iter().zip(percents) {
            if pct > 0.0 {
                outcome.push(&allocation.participant, amount * (pct / 100.0));
            }
        }
        outcome
    }
}

pub struct FixedSplit;

impl SplitCalculator for FixedSplit {
    fn split(
        &self,
        amount: f64,
        payer: &str,
        allocations: &[Allocation],
        format: &CurrencyFormat,
    ) -> SplitOutcome {
        let mut outcome = SplitOutcome::new(payer, amount);
        for allocation in allocations {
            outcome.push(
                &allocation.participant,
                parse_currency_in(&allocation.input, format),
            );
        }
        outcome
    }
}

pub fn split(
    method: SplitMethod,
    amount: f64,
    payer: &str,
    allocations: &[Allocation],
) -> SplitOutcome {
    split_in(method, amount, payer, allocations, &CurrencyFormat::default())
}

/// Like [`split`], reading fixed amounts with `format`'s separators.
pub fn split_in(
    method: SplitMethod,
    amount: f64,
    payer: &str,
    allocations: &[Allocation],
    format: &CurrencyFormat,
) -> SplitOutcome {
    method.calculator().split(amount, payer, allocations, format)
}
