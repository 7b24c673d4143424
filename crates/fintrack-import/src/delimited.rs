//! CSV reader

use std::path::PathBuf;

use async_trait::async_trait;
use csv::ReaderBuilder;

use crate::cells::Cell;
use crate::error::{ImportError, ImportResult, RowError};
use crate::{collect_rows, ImportReport, SheetReader};

/// Reads delimited text with the fixed column order and no header handling
/// beyond skipping `header_rows` lines
#[derive(Debug, Clone)]
pub struct CsvReader {
    pub delimiter: u8,
    pub header_rows: usize,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            header_rows: 1,
        }
    }
}

impl CsvReader {
    pub fn new(delimiter: u8, header_rows: usize) -> Self {
        Self { delimiter, header_rows }
    }

    /// Parse CSV content already in memory
    pub fn read_bytes(&self, bytes: &[u8]) -> ImportResult<ImportReport> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        // indexed by file line so blank lines the csv reader drops keep their numbers
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        let mut broken = Vec::new();
        for rec in rdr.records() {
            match rec {
                Ok(record) => {
                    let line = record.position().map_or(rows.len() + 1, |p| p.line() as usize);
                    rows.resize(line.saturating_sub(1).max(rows.len()), Vec::new());
                    rows.push(record.iter().map(Cell::text).collect());
                }
                Err(e) if e.is_io_error() => return Err(ImportError::Csv(e)),
                Err(e) => {
                    let line = e.position().map_or(rows.len() + 1, |p| p.line() as usize);
                    rows.resize(line.max(rows.len()), Vec::new());
                    if line > self.header_rows {
                        broken.push(RowError::new(line, e.to_string()));
                    }
                }
            }
        }

        let mut report = collect_rows(rows, self.header_rows);
        report.errors.extend(broken);
        report.errors.sort_by_key(|e| e.row);
        Ok(report)
    }
}

#[async_trait]
impl SheetReader for CsvReader {
    async fn read(&self, path: PathBuf) -> ImportResult<ImportReport> {
        let bytes = tokio::fs::read(&path).await?;
        log::debug!("Reading {} bytes of CSV from {}", bytes.len(), path.display());
        self.read_bytes(&bytes)
    }
}
