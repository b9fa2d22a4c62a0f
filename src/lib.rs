#![doc(test(attr(deny(warnings))))]

//! Split Ledger reconciles a shared-expense sheet: it splits every expense row
//! among the participants, fills derivable allocations, and writes per-row
//! breakdowns plus a "who owes whom" summary back into the sheet.

pub mod cli;
pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod sheet;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup debug log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!("Split Ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
