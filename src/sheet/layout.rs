use serde::{Deserialize, Serialize};

/// Fixed column and row offsets of the expense sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    pub header_row: usize,
    pub first_data_row: usize,
    pub description_col: usize,
    pub payer_col: usize,
    pub amount_col: usize,
    pub method_col: usize,
    pub first_participant_col: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 0,
            first_data_row: 1,
            description_col: 0,
            payer_col: 1,
            amount_col: 2,
            method_col: 3,
            first_participant_col: 4,
        }
    }
}

impl SheetLayout {
    /// Default header labels for the fixed columns, in column order.
    pub fn fixed_headers(&self) -> Vec<(usize, &'static str)> {
        let mut headers = vec![
            (self.description_col, "Description"),
            (self.payer_col, "Paid By"),
            (self.amount_col, "Amount"),
            (self.method_col, "Split"),
        ];
        headers.sort_by_key(|(col, _)| *col);
        headers
    }

    pub fn is_data_row(&self, row: usize) -> bool {
        row >= self.first_data_row
    }
}
