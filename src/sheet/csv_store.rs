use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use super::{CellValue, SheetStore, Table};
use crate::errors::LedgerError;

const TMP_SUFFIX: &str = "tmp";

/// Stores a sheet as a headerless CSV file, one record per sheet row.
#[derive(Debug, Clone, Copy)]
pub struct CsvSheetStore {
    pub delimiter: u8,
}

impl Default for CsvSheetStore {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvSheetStore {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<Table, LedgerError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(CellValue::detect).collect());
        }
        Ok(Table::from_rows(rows))
    }

    pub fn write<W: Write>(&self, table: &Table, writer: W) -> Result<(), LedgerError> {
        let width = table.width();
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(writer);
        let last = table.last_populated_row().map(|row| row + 1).unwrap_or(0);
        for cells in table.rows().take(last) {
            let record: Vec<String> = (0..width)
                .map(|col| cells.get(col).map(CellValue::display).unwrap_or_default())
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl SheetStore for CsvSheetStore {
    fn load(&self, path: &Path) -> Result<Table, LedgerError> {
        let file = File::open(path)?;
        let table = self.read(file)?;
        debug!(
            "loaded {} row(s) from {}",
            table.row_count(),
            path.display()
        );
        Ok(table)
    }

    fn save(&self, table: &Table, path: &Path) -> Result<(), LedgerError> {
        let tmp = tmp_path(path);
        {
            let file = File::create(&tmp)?;
            self.write(table, file)?;
        }
        fs::rename(&tmp, path)?;
        debug!("saved sheet to {}", path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_ragged_rows_and_detects_kinds() {
        let data = "Description,Paid By,Amount,Split,Alice,Bob\nRent,Alice,2000,Equally,TRUE\n";
        let table = CsvSheetStore::default().read(data.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 2), &CellValue::Number(2000.0));
        assert_eq!(table.get(1, 4), &CellValue::Bool(true));
        assert_eq!(table.get(1, 5), &CellValue::Empty);
    }

    #[test]
    fn write_pads_rows_and_drops_trailing_blank_rows() {
        let mut table = Table::from_strings(vec![vec!["a", "b", "c"], vec!["d"]]);
        table.set(4, 0, CellValue::Empty);
        let mut out = Vec::new();
        CsvSheetStore::default().write(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b,c\nd,,\n");
    }

    #[test]
    fn tmp_path_keeps_existing_extension() {
        assert_eq!(
            tmp_path(Path::new("/x/sheet.csv")),
            PathBuf::from("/x/sheet.csv.tmp")
        );
    }
}
