//! Workbook reader (xlsx, xlsm, xls, ods)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::cells::{Cell, COLUMNS};
use crate::error::{ImportError, ImportResult};
use crate::{collect_rows, ImportReport, SheetReader};

/// Reads one worksheet through calamine
#[derive(Debug, Clone, Default)]
pub struct XlsxReader {
    /// Worksheet name; the first sheet when unset
    pub sheet: Option<String>,
    pub header_rows: usize,
}

impl XlsxReader {
    pub fn new(sheet: Option<String>, header_rows: usize) -> Self {
        Self { sheet, header_rows }
    }

    fn read_blocking(&self, path: &Path) -> ImportResult<ImportReport> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let name = match &self.sheet {
            Some(wanted) => sheet_names
                .iter()
                .find(|n| *n == wanted)
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound { name: wanted.clone() })?,
            None => sheet_names.first().cloned().ok_or_else(|| ImportError::SheetNotFound {
                name: "<first sheet>".to_string(),
            })?,
        };

        let range = workbook.worksheet_range(&name)?;
        log::debug!("Reading sheet '{}' of {} ({:?})", name, path.display(), range.get_size());
        Ok(collect_rows(sheet_rows(&range), self.header_rows))
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

/// Rows as cells, padded to the fixed column count.
///
/// Ranges start at the first used cell, so leading blank rows and columns are
/// restored to keep the column order and row numbering of the sheet.
fn sheet_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = (0..first_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells: Vec<Cell> = (0..first_col).map(|_| Cell::Empty).collect();
        cells.extend(row.iter().map(to_cell));
        if cells.len() < COLUMNS.len() && cells.iter().any(|c| !c.is_empty()) {
            cells.resize(COLUMNS.len(), Cell::Empty);
        }
        rows.push(cells);
    }
    rows
}

#[async_trait]
impl SheetReader for XlsxReader {
    async fn read(&self, path: PathBuf) -> ImportResult<ImportReport> {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.read_blocking(&path))
            .await
            .map_err(|e| ImportError::Task { message: e.to_string() })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::decode_row;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn test_cell_conversion() {
        assert_eq!(to_cell(&Data::Empty), Cell::Empty);
        assert_eq!(to_cell(&Data::String("  ".to_string())), Cell::Empty);
        assert_eq!(to_cell(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(to_cell(&Data::Float(1.5)), Cell::Number(1.5));
        assert_eq!(to_cell(&Data::String("Charge".to_string())), Cell::Text("Charge".to_string()));
    }

    fn date_time(serial: f64) -> Data {
        Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, false))
    }

    /// Sheet starting at B2: blank first row, header on row 2, data from row 3
    fn offset_sheet() -> Range<Data> {
        let mut range: Range<Data> = Range::new((1, 1), (3, 5));
        for (col, title) in ["date", "category", "item", "label", "amount"].iter().enumerate() {
            range.set_value((1, col as u32 + 1), Data::String(title.to_string()));
        }
        range.set_value((2, 1), date_time(45366.0));
        range.set_value((2, 2), Data::String("Charge".to_string()));
        range.set_value((2, 3), Data::String("Groceries".to_string()));
        range.set_value((2, 4), Data::String("Market".to_string()));
        range.set_value((2, 5), Data::Float(12.5));
        range.set_value((3, 1), date_time(45367.0));
        range.set_value((3, 2), Data::String("Charge".to_string()));
        range.set_value((3, 5), Data::String("twelve".to_string()));
        range
    }

    #[test]
    fn test_sheet_rows_restore_offset() {
        let rows = sheet_rows(&offset_sheet());
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_empty());
        for row in &rows[1..] {
            assert_eq!(row.len(), COLUMNS.len());
            assert_eq!(row[0], Cell::Empty);
        }
        assert_eq!(rows[2][1], Cell::Number(45366.0));
    }

    #[test]
    fn test_offset_sheet_decodes_in_column_order() {
        let report = collect_rows(sheet_rows(&offset_sheet()), 2);
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.records.len(), 1);

        let record = &report.records[0];
        assert_eq!(record.external_id, None);
        assert_eq!(record.date, Some(45366.0));
        assert_eq!(record.category.as_deref(), Some("Charge"));
        assert_eq!(record.item.as_deref(), Some("Groceries"));
        assert_eq!(record.label.as_deref(), Some("Market"));
        assert_eq!(record.amount, Some(12.5));

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 4);
        assert!(report.errors[0].reason.contains("amount"));
    }

    #[test]
    fn test_date_cell_decodes_as_serial() {
        let row: Vec<Cell> = [
            Data::String("I1".to_string()),
            date_time(45000.5),
            Data::String("Investissement".to_string()),
            Data::Empty,
            Data::Empty,
            Data::Int(100),
        ]
        .iter()
        .map(to_cell)
        .collect();

        let record = decode_row(3, &row).unwrap().unwrap();
        assert_eq!(record.date, Some(45000.5));
        assert_eq!(record.external_id.as_deref(), Some("I1"));
        assert_eq!(record.amount, Some(100.0));
    }

    #[tokio::test]
    async fn test_missing_workbook_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = XlsxReader::new(None, 1);
        assert!(reader.read(dir.path().join("missing.xlsx")).await.is_err());
    }
}
