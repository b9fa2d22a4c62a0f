//! Split calculation engine: classification, splitting, remainder fill and balances.

pub mod accumulator;
pub mod classify;
pub mod engine;
pub mod remainder;
pub mod split;
pub mod summary;

pub use accumulator::{LedgerAccumulator, ParticipantTotals};
pub use classify::{
    classify_row, is_stale_marker, participant_columns, ExpenseRow, LedgerSnapshot,
    ParticipantColumn, RowClass,
};
pub use engine::{
    BalanceReport, EditOutcome, EngineSettings, RecalcEngine, RecomputeReport, RowReport,
    SUMMARY_LABEL,
};
pub use remainder::{apply_fill, RemainderFill, RemainderResolver, RemainderRule};
pub use split::{
    split, split_in, Allocation, EqualSplit, FixedSplit, PercentageSplit, Share,
    SplitCalculator, SplitMethod, SplitOutcome,
};
pub use summary::{DueSchedule, SummaryFormatter};
