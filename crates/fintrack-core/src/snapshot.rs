//! On-disk snapshot of the ledger store

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::LedgerData;

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: String,
    data: LedgerData,
}

/// Write the store as JSON.
///
/// The file is written next to its destination and renamed into place, so a
/// failed save never leaves a truncated snapshot behind.
pub fn save(path: &Path, data: &LedgerData) -> CoreResult<()> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now().to_rfc3339(),
        data: data.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;

    log::debug!(
        "Saved snapshot with {} transactions to {}",
        data.transactions.len(),
        path.display()
    );
    Ok(())
}

/// Read a snapshot written by [`save`]
pub fn load(path: &Path) -> CoreResult<LedgerData> {
    let bytes = std::fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(CoreError::Snapshot {
            message: format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            ),
        });
    }

    let mut data = snapshot.data;
    // never hand out an identifier already in use
    let max_id = data.transactions.iter().map(|t| t.id).max().unwrap_or(0);
    data.next_id = data.next_id.max(max_id + 1);

    log::debug!(
        "Loaded snapshot saved at {} ({} transactions)",
        snapshot.saved_at,
        data.transactions.len()
    );
    Ok(data)
}
