//! Spreadsheet import
//!
//! Reads workbooks and CSV files laid out as
//! `external_id, date, category, item, label, amount` into transaction
//! records. Import is best-effort: rows that cannot be decoded are reported
//! and skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fintrack_config::ImportConfig;
use fintrack_core::TransactionRecord;
use serde::{Deserialize, Serialize};

pub mod cells;
pub mod delimited;
pub mod error;
pub mod xlsx;

pub use cells::{decode_row, Cell, COLUMNS};
pub use delimited::CsvReader;
pub use error::{ImportError, ImportResult, RowError};
pub use xlsx::XlsxReader;

/// Records decoded from one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub records: Vec<TransactionRecord>,
    pub errors: Vec<RowError>,
    /// Rows seen, header rows included
    pub rows_read: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode rows after skipping `header_rows`; row numbers are 1-based
pub(crate) fn collect_rows(rows: Vec<Vec<Cell>>, header_rows: usize) -> ImportReport {
    let mut report = ImportReport {
        rows_read: rows.len(),
        ..Default::default()
    };
    for (index, cells) in rows.iter().enumerate().skip(header_rows) {
        match decode_row(index + 1, cells) {
            Ok(Some(record)) => report.records.push(record),
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping {}", e);
                report.errors.push(e);
            }
        }
    }
    report
}

/// Reader reference type
pub type SheetReaderRef = Arc<dyn SheetReader>;

/// Trait for import sources
#[async_trait]
pub trait SheetReader: Send + Sync {
    /// Read a file and decode its rows
    async fn read(&self, path: PathBuf) -> ImportResult<ImportReport>;
}

/// Pick a reader from the file extension
pub fn reader_for(path: &Path, config: &ImportConfig) -> ImportResult<SheetReaderRef> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(Arc::new(XlsxReader::new(config.sheet.clone(), config.header_rows))),
        "csv" | "txt" => {
            let delimiter = u8::try_from(config.csv_delimiter).map_err(|_| ImportError::UnsupportedFormat {
                extension: format!("csv with non-ASCII delimiter {:?}", config.csv_delimiter),
            })?;
            Ok(Arc::new(CsvReader::new(delimiter, config.header_rows)))
        }
        _ => Err(ImportError::UnsupportedFormat { extension }),
    }
}

/// Read a file with the reader its extension calls for
pub async fn read_file(path: impl AsRef<Path>, config: &ImportConfig) -> ImportResult<ImportReport> {
    let path = path.as_ref();
    let reader = reader_for(path, config)?;
    let report = reader.read(path.to_path_buf()).await?;
    log::info!(
        "Read {} records from {} ({} rows skipped with errors)",
        report.records.len(),
        path.display(),
        report.errors.len()
    );
    Ok(report)
}
