//! In-memory model of the expense sheet and the stores that load and save it.

pub mod csv_store;
pub mod layout;
pub mod table;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

pub use csv_store::CsvSheetStore;
pub use layout::SheetLayout;
pub use table::Table;

/// A single cell as read from the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// Interprets raw user input the way a sheet cell would.
    pub fn detect(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => CellValue::Number(number),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Text as it would be displayed in the sheet.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => number.to_string(),
            CellValue::Bool(true) => "TRUE".into(),
            CellValue::Bool(false) => "FALSE".into(),
        }
    }
}

/// Abstraction over the persistence of a sheet snapshot.
pub trait SheetStore {
    fn load(&self, path: &Path) -> Result<Table, LedgerError>;
    fn save(&self, table: &Table, path: &Path) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_recognises_cell_kinds() {
        assert_eq!(CellValue::detect(""), CellValue::Empty);
        assert_eq!(CellValue::detect("  "), CellValue::Empty);
        assert_eq!(CellValue::detect("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::detect("false"), CellValue::Bool(false));
        assert_eq!(CellValue::detect("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::detect("50%"), CellValue::Text("50%".into()));
        assert_eq!(
            CellValue::detect("$1,234.56"),
            CellValue::Text("$1,234.56".into())
        );
    }

    #[test]
    fn display_round_trips_booleans_and_numbers() {
        assert_eq!(CellValue::Bool(true).display(), "TRUE");
        assert_eq!(CellValue::Number(75.0).display(), "75");
        assert_eq!(CellValue::Number(0.25).display(), "0.25");
        assert_eq!(CellValue::Empty.display(), "");
    }
}
