//! Decoding of one sheet row into a transaction record

use fintrack_core::date::parse_date;
use fintrack_core::models::normalize_external_id;
use fintrack_core::TransactionRecord;

use crate::error::RowError;

/// Fixed column order of an import sheet
pub const COLUMNS: [&str; 6] = ["external_id", "date", "category", "item", "label", "amount"];

/// Reader-independent cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell, or empty when blank
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }
}

/// Parse an amount typed as text; accepts a comma decimal separator and
/// spaces as thousands separators
fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn date_cell(row: usize, cell: &Cell) -> Result<Option<f64>, RowError> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if n.is_finite() => Ok(Some(*n)),
        Cell::Number(n) => Err(RowError::new(row, format!("invalid date: {}", n))),
        Cell::Text(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| RowError::new(row, format!("invalid date: {:?}", s))),
    }
}

fn amount_cell(row: usize, cell: &Cell) -> Result<Option<f64>, RowError> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if n.is_finite() => Ok(Some(*n)),
        Cell::Number(n) => Err(RowError::new(row, format!("invalid amount: {}", n))),
        Cell::Text(s) => parse_amount(s)
            .map(Some)
            .ok_or_else(|| RowError::new(row, format!("invalid amount: {:?}", s))),
    }
}

/// Decode a row; `Ok(None)` for a blank row
pub fn decode_row(row: usize, cells: &[Cell]) -> Result<Option<TransactionRecord>, RowError> {
    if cells.iter().all(Cell::is_empty) {
        return Ok(None);
    }

    let used = cells.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
    if cells.len() < COLUMNS.len() || used > COLUMNS.len() {
        return Err(RowError::new(
            row,
            format!("expected {} columns, found {}", COLUMNS.len(), cells.len().max(used)),
        ));
    }

    Ok(Some(TransactionRecord {
        external_id: normalize_external_id(cells[0].as_text()),
        date: date_cell(row, &cells[1])?,
        category: cells[2].as_text(),
        item: cells[3].as_text(),
        label: cells[4].as_text(),
        amount: amount_cell(row, &cells[5])?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<Cell> {
        values.iter().map(|v| Cell::text(*v)).collect()
    }

    #[test]
    fn test_decode_text_row() {
        let record = decode_row(2, &row(&["I1", "15/03/2024", "Investissement", "ETF", "Buy", "1 250,50"]))
            .unwrap()
            .unwrap();
        assert_eq!(record.external_id.as_deref(), Some("I1"));
        assert_eq!(record.date, parse_date("2024-03-15"));
        assert_eq!(record.category.as_deref(), Some("Investissement"));
        assert_eq!(record.amount, Some(1250.5));
    }

    #[test]
    fn test_numeric_cells() {
        let cells = vec![
            Cell::Empty,
            Cell::Number(45366.0),
            Cell::text("Charge"),
            Cell::Number(42.0),
            Cell::Empty,
            Cell::Number(12.5),
        ];
        let record = decode_row(2, &cells).unwrap().unwrap();
        assert_eq!(record.external_id, None);
        assert_eq!(record.date, Some(45366.0));
        assert_eq!(record.item.as_deref(), Some("42"));
        assert_eq!(record.label, None);
        assert_eq!(record.amount, Some(12.5));
    }

    #[test]
    fn test_blank_row_skipped() {
        assert_eq!(decode_row(3, &row(&["", " ", "", "", "", ""])).unwrap(), None);
        assert_eq!(decode_row(3, &[]).unwrap(), None);
    }

    #[test]
    fn test_bad_amount_is_row_error() {
        let err = decode_row(7, &row(&["", "2024-01-01", "Charge", "", "", "abc"])).unwrap_err();
        assert_eq!(err.row, 7);
        assert!(err.reason.contains("amount"));
    }

    #[test]
    fn test_bad_date_is_row_error() {
        let err = decode_row(4, &row(&["", "yesterday", "Charge", "", "", "1"])).unwrap_err();
        assert!(err.reason.contains("date"));
    }

    #[test]
    fn test_column_count() {
        let err = decode_row(5, &row(&["", "2024-01-01", "Charge"])).unwrap_err();
        assert!(err.reason.contains("expected 6 columns"));

        let err = decode_row(5, &row(&["", "2024-01-01", "Charge", "", "", "1", "extra"])).unwrap_err();
        assert!(err.reason.contains("found 7"));

        // trailing empty cells are tolerated
        assert!(decode_row(5, &row(&["", "2024-01-01", "Charge", "", "", "1", ""])).unwrap().is_some());
    }
}
