//! Live net worth
//!
//! Follows the ledger's revision channel and recomputes with the same
//! breakdown the batch queries use.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{CoreError, CoreResult};
use crate::net_worth::NetWorthBreakdown;
use crate::Ledger;

/// Net worth of a target date that stays current while the ledger changes
pub struct NetWorthWatch {
    ledger: Arc<Ledger>,
    changes: watch::Receiver<u64>,
    target: Option<f64>,
}

impl NetWorthWatch {
    pub(crate) fn new(ledger: Arc<Ledger>) -> Self {
        let changes = ledger.subscribe();
        Self {
            ledger,
            changes,
            target: None,
        }
    }

    /// Pin the date; `None` follows the latest dated transaction
    pub fn set_target(&mut self, date: Option<f64>) {
        self.target = date;
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    fn resolve_target(&self) -> f64 {
        self.target
            .or_else(|| self.ledger.summary().period_end)
            .unwrap_or(0.0)
    }

    /// Breakdown for the target date as of the current revision
    pub fn current(&mut self) -> NetWorthBreakdown {
        let _revision = *self.changes.borrow_and_update();
        self.ledger.net_worth_breakdown(self.resolve_target())
    }

    /// Wait for the next ledger change and return the recomputed breakdown
    pub async fn changed(&mut self) -> CoreResult<NetWorthBreakdown> {
        self.changes.changed().await.map_err(|_| CoreError::Internal {
            message: "ledger dropped while watching net worth".to_string(),
        })?;
        Ok(self.current())
    }
}
