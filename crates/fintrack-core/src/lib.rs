//! Core ledger derivation: variations, running balances, investment and
//! credit positions, profitability and net worth.

pub mod balance;
pub mod category;
pub mod date;
pub mod error;
pub mod live;
pub mod models;
pub mod net_worth;
pub mod positions;
pub mod profitability;
pub mod query;
pub mod reports;
pub mod snapshot;
pub mod time;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

pub use category::{classify, Category};
pub use error::{CoreError, CoreResult, ErrorSeverity};
pub use live::NetWorthWatch;
pub use models::{
    Credit, Investment, PositionKind, PositionStatus, Transaction, TransactionId, TransactionRecord,
};
pub use net_worth::NetWorthBreakdown;
pub use positions::{PositionTotals, UpsertOutcome};
pub use profitability::Profitability;
pub use query::{TransactionFilter, TransactionPage};
pub use reports::{CategoryBreakdown, LedgerSummary, MonthlySummary, NetWorthPoint, NetWorthReport};
pub use time::{TimeContext, TimeFilter, TimeWindow};

/// In-memory ledger store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerData {
    pub transactions: Vec<Transaction>,
    pub investments: BTreeMap<String, Investment>,
    pub credits: BTreeMap<String, Credit>,
    /// Identifier for the next inserted transaction
    pub next_id: TransactionId,
}

impl Default for LedgerData {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            investments: BTreeMap::new(),
            credits: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl LedgerData {
    /// Member transactions of a group, by exact identifier
    fn members(&self, external_id: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.external_id.as_deref() == Some(external_id))
            .collect()
    }

    fn apply_totals(&mut self, totals: Vec<PositionTotals>, summary: &mut ImportSummary) {
        for total in totals {
            match total {
                PositionTotals::Investment(t) => match positions::upsert_investment(&mut self.investments, t) {
                    UpsertOutcome::Inserted => summary.investments_inserted += 1,
                    UpsertOutcome::Updated => summary.investments_updated += 1,
                },
                PositionTotals::Credit(t) => match positions::upsert_credit(&mut self.credits, t) {
                    UpsertOutcome::Inserted => summary.credits_inserted += 1,
                    UpsertOutcome::Updated => summary.credits_updated += 1,
                },
            }
        }
    }

    /// Zero the derived totals of positions left without member transactions
    fn clear_emptied(&mut self, totals: &[PositionTotals]) {
        let present: HashSet<&str> = totals.iter().map(PositionTotals::external_id).collect();
        for investment in self.investments.values_mut() {
            if !present.contains(investment.external_id.as_str()) {
                investment.transaction_ids.clear();
                investment.invested = 0.0;
                investment.earned = 0.0;
            }
        }
        for credit in self.credits.values_mut() {
            if !present.contains(credit.external_id.as_str()) {
                credit.transaction_ids.clear();
                credit.total_amount = 0.0;
                credit.reimbursed = 0.0;
                credit.remaining = 0.0;
            }
        }
    }
}

/// What an import or deletion changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub removed: usize,
    pub balances_changed: usize,
    pub investments_inserted: usize,
    pub investments_updated: usize,
    pub credits_inserted: usize,
    pub credits_updated: usize,
}

/// Main ledger structure.
///
/// Readers take a shared lock and always see a fully recomputed transaction
/// set. Mutations are serialized and bump a revision that live net worth
/// watchers follow.
pub struct Ledger {
    data: RwLock<LedgerData>,
    writer: Mutex<()>,
    revision: watch::Sender<u64>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::from_data(LedgerData::default())
    }

    /// Wrap existing store contents
    pub fn from_data(data: LedgerData) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            data: RwLock::new(data),
            writer: Mutex::new(()),
            revision,
        }
    }

    /// Load a snapshot, or start empty when the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            let data = snapshot::load(path)?;
            log::info!("Ledger loaded from {} ({} transactions)", path.display(), data.transactions.len());
            Ok(Self::from_data(data))
        } else {
            log::warn!("Snapshot not found: {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Persist the current store
    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let data = self.read().clone();
        snapshot::save(path.as_ref(), &data)
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Current store revision
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribe to store changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ==================== Mutations ====================

    /// Insert records, recompute every balance, then refresh positions.
    ///
    /// Positions are aggregated from one snapshot taken after the balance pass,
    /// one task per identifier group; upserts start once all groups are done.
    pub async fn import(&self, records: Vec<TransactionRecord>) -> CoreResult<ImportSummary> {
        let _guard = self.writer.lock().await;
        let mut summary = ImportSummary::default();

        let snapshot = {
            let mut data = self.write();
            for record in records {
                let id = data.next_id;
                data.next_id += 1;
                data.transactions.push(Transaction::from_record(id, record));
                summary.inserted += 1;
            }
            summary.balances_changed = balance::apply_running_balances(&mut data.transactions);
            data.transactions.clone()
        };

        let totals = positions::aggregate_concurrently(snapshot).await?;
        self.write().apply_totals(totals, &mut summary);
        self.bump_revision();

        log::info!(
            "Imported {} transactions ({} investments new, {} updated; {} credits new, {} updated)",
            summary.inserted,
            summary.investments_inserted,
            summary.investments_updated,
            summary.credits_inserted,
            summary.credits_updated
        );
        Ok(summary)
    }

    /// Delete transactions by identifier.
    ///
    /// Positions stay in the store; groups that still have members get their
    /// totals refreshed.
    pub async fn delete_transactions(&self, ids: &[TransactionId]) -> CoreResult<ImportSummary> {
        let _guard = self.writer.lock().await;
        let wanted: HashSet<TransactionId> = ids.iter().copied().collect();
        let mut summary = ImportSummary::default();

        let snapshot = {
            let mut data = self.write();
            if let Some(missing) = wanted.iter().find(|id| !data.transactions.iter().any(|t| t.id == **id)) {
                return Err(CoreError::TransactionNotFound { id: *missing });
            }
            let before = data.transactions.len();
            data.transactions.retain(|t| !wanted.contains(&t.id));
            summary.removed = before - data.transactions.len();
            summary.balances_changed = balance::apply_running_balances(&mut data.transactions);
            data.transactions.clone()
        };

        let totals = positions::aggregate_concurrently(snapshot).await?;
        {
            let mut data = self.write();
            data.clear_emptied(&totals);
            data.apply_totals(totals, &mut summary);
        }
        self.bump_revision();

        log::info!("Deleted {} transactions", summary.removed);
        Ok(summary)
    }

    /// Remove every transaction and position
    pub async fn wipe(&self) {
        let _guard = self.writer.lock().await;
        {
            let mut data = self.write();
            let next_id = data.next_id;
            *data = LedgerData {
                next_id,
                ..LedgerData::default()
            };
        }
        self.bump_revision();
        log::warn!("Ledger wiped");
    }

    /// Close an investment and compute its profitability
    pub async fn validate_investment(&self, external_id: &str) -> CoreResult<Investment> {
        let _guard = self.writer.lock().await;
        let investment = {
            let mut data = self.write();
            let mut investment = data
                .investments
                .get(external_id)
                .cloned()
                .ok_or_else(|| CoreError::PositionNotFound {
                    external_id: external_id.to_string(),
                })?;
            let result = profitability::apply_validation(&mut investment, &data.members(external_id));
            log::info!(
                "Validated {}: invested {:.2}, earned {:.2}, {:.2}% ({:.2}% annualized over {:.1} days)",
                external_id,
                result.invested,
                result.earned,
                result.profitability,
                result.annual_profitability,
                result.holding_days
            );
            data.investments.insert(external_id.to_string(), investment.clone());
            investment
        };
        self.bump_revision();
        Ok(investment)
    }

    /// Reopen a closed investment
    pub async fn invalidate_investment(&self, external_id: &str) -> CoreResult<Investment> {
        let _guard = self.writer.lock().await;
        let investment = {
            let mut data = self.write();
            let mut investment = data
                .investments
                .get(external_id)
                .cloned()
                .ok_or_else(|| CoreError::PositionNotFound {
                    external_id: external_id.to_string(),
                })?;
            profitability::apply_invalidation(&mut investment, &data.members(external_id));
            data.investments.insert(external_id.to_string(), investment.clone());
            investment
        };
        self.bump_revision();
        log::info!("Invalidated {}", external_id);
        Ok(investment)
    }

    /// Record the user-entered terms of a credit
    pub async fn set_credit_terms(
        &self,
        external_id: &str,
        monthly_payment: Option<f64>,
        interest_rate: Option<f64>,
    ) -> CoreResult<Credit> {
        for (field, value) in [("monthly_payment", monthly_payment), ("interest_rate", interest_rate)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(CoreError::InvalidValue {
                        field: field.to_string(),
                        reason: format!("expected a non-negative number, got {}", v),
                    });
                }
            }
        }

        let _guard = self.writer.lock().await;
        let credit = {
            let mut data = self.write();
            let credit = data
                .credits
                .get_mut(external_id)
                .ok_or_else(|| CoreError::PositionNotFound {
                    external_id: external_id.to_string(),
                })?;
            credit.monthly_payment = monthly_payment;
            credit.interest_rate = interest_rate;
            credit.clone()
        };
        self.bump_revision();
        Ok(credit)
    }

    // ==================== Queries ====================

    /// All transactions in chronological order
    pub fn transactions(&self) -> Vec<Transaction> {
        let data = self.read();
        balance::chronological(&data.transactions).into_iter().cloned().collect()
    }

    pub fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.read().transactions.iter().find(|t| t.id == id).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.read().transactions.len()
    }

    /// Filtered page of transactions, newest first
    pub fn transaction_page(&self, filter: &TransactionFilter, page: usize, per_page: usize) -> TransactionPage {
        query::paginate(&self.read().transactions, filter, page, per_page)
    }

    pub fn investments(&self) -> Vec<Investment> {
        self.read().investments.values().cloned().collect()
    }

    pub fn investment(&self, external_id: &str) -> Option<Investment> {
        self.read().investments.get(external_id).cloned()
    }

    pub fn credits(&self) -> Vec<Credit> {
        self.read().credits.values().cloned().collect()
    }

    pub fn credit(&self, external_id: &str) -> Option<Credit> {
        self.read().credits.get(external_id).cloned()
    }

    /// Profitability an investment would get if validated now
    pub fn preview_profitability(&self, external_id: &str) -> CoreResult<Profitability> {
        let data = self.read();
        if !data.investments.contains_key(external_id) {
            return Err(CoreError::PositionNotFound {
                external_id: external_id.to_string(),
            });
        }
        Ok(profitability::compute(&data.members(external_id)))
    }

    pub fn summary(&self) -> LedgerSummary {
        let data = self.read();
        let ordered = balance::chronological(&data.transactions);
        LedgerSummary {
            total_transactions: data.transactions.len(),
            total_investments: data.investments.len(),
            open_investments: data.investments.values().filter(|i| !i.is_closed()).count(),
            total_credits: data.credits.len(),
            current_balance: ordered.last().map(|t| t.balance).unwrap_or(0.0),
            period_start: ordered.iter().find_map(|t| t.date),
            period_end: ordered.iter().rev().find_map(|t| t.date),
        }
    }

    // ==================== Net worth ====================

    /// Net worth and its components as of `date`
    pub fn net_worth_breakdown(&self, date: f64) -> NetWorthBreakdown {
        let data = self.read();
        net_worth::breakdown(&data.transactions, &data.investments, date)
    }

    /// Net worth as of `date`
    pub fn net_worth_at(&self, date: f64) -> f64 {
        self.net_worth_breakdown(date).total
    }

    /// Net worth sampled at each date, all from one consistent read
    pub fn net_worth_series(&self, dates: &[f64]) -> Vec<NetWorthPoint> {
        let data = self.read();
        reports::net_worth_series(&data.transactions, &data.investments, dates)
            .into_iter()
            .map(|b| NetWorthPoint {
                date: b.date,
                net_worth: b.total,
            })
            .collect()
    }

    /// Net worth at the end of every month spanned by the ledger
    pub fn net_worth_report(&self) -> NetWorthReport {
        let summary = self.summary();
        let dates = match (summary.period_start, summary.period_end) {
            (Some(first), Some(last)) => date::month_ends(first, last),
            _ => Vec::new(),
        };
        NetWorthReport::from_points(self.net_worth_series(&dates))
    }

    /// Live net worth that follows every store change
    pub fn watch_net_worth(self: &Arc<Self>) -> NetWorthWatch {
        NetWorthWatch::new(Arc::clone(self))
    }

    // ==================== Reports ====================

    pub fn category_breakdown(&self, context: &TimeContext) -> Vec<CategoryBreakdown> {
        reports::category_breakdown(&self.read().transactions, context)
    }

    pub fn expense_items(&self, context: &TimeContext) -> Vec<CategoryBreakdown> {
        reports::expense_items(&self.read().transactions, context)
    }

    pub fn monthly_summaries(&self, year: i32) -> Vec<MonthlySummary> {
        reports::monthly_summaries(&self.read().transactions, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: f64, category: &str, amount: f64, ext: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            external_id: ext.map(String::from),
            date: Some(date),
            category: Some(category.to_string()),
            item: None,
            label: None,
            amount: Some(amount),
        }
    }

    fn scenario() -> Vec<TransactionRecord> {
        vec![
            record(1.0, "Revenus", 1000.0, None),
            record(2.0, "Charge", 200.0, None),
            record(3.0, "Investissement", 300.0, Some("I1")),
            record(10.0, "Gain investissement", 400.0, Some("I1")),
        ]
    }

    #[tokio::test]
    async fn test_import_scenario() {
        let ledger = Ledger::new();
        let summary = ledger.import(scenario()).await.unwrap();
        assert_eq!(summary.inserted, 4);
        assert_eq!(summary.investments_inserted, 1);

        let txns = ledger.transactions();
        let variations: Vec<f64> = txns.iter().map(|t| t.variation).collect();
        let balances: Vec<f64> = txns.iter().map(|t| t.balance).collect();
        assert_eq!(variations, vec![1000.0, -200.0, -300.0, 400.0]);
        assert_eq!(balances, vec![1000.0, 800.0, 500.0, 900.0]);

        let inv = ledger.investment("I1").unwrap();
        assert_eq!(inv.invested, 300.0);
        assert_eq!(inv.earned, 400.0);
        assert_eq!(inv.date_begin, 3.0);
        assert!(!inv.is_closed());
    }

    #[tokio::test]
    async fn test_validate_scenario() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();

        assert_eq!(ledger.net_worth_at(10.0), 900.0);
        assert_eq!(ledger.net_worth_at(5.0), 800.0);

        let preview = ledger.preview_profitability("I1").unwrap();
        assert_eq!(preview.holding_days, 7.0);
        assert!(!ledger.investment("I1").unwrap().is_closed());

        let inv = ledger.validate_investment("I1").await.unwrap();
        assert_eq!(inv.date_end, Some(10.0));
        assert!((inv.profitability - 33.333333).abs() < 1e-4);
        let expected = ((400.0_f64 / 300.0).powf(365.0 / 7.0) - 1.0) * 100.0;
        assert_eq!(inv.annual_profitability, expected);

        assert_eq!(ledger.net_worth_at(10.0), 900.0);

        let inv = ledger.invalidate_investment("I1").await.unwrap();
        assert_eq!(inv.date_end, None);
        assert_eq!(inv.profitability, 0.0);
        assert_eq!(inv.invested, 300.0);
    }

    #[tokio::test]
    async fn test_unknown_position_is_not_found() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();
        let revision = ledger.revision();

        let err = ledger.validate_investment("I404").await.unwrap_err();
        assert!(matches!(err, CoreError::PositionNotFound { .. }));
        let err = ledger.invalidate_investment("I404").await.unwrap_err();
        assert!(matches!(err, CoreError::PositionNotFound { .. }));
        let err = ledger.set_credit_terms("C404", Some(1.0), None).await.unwrap_err();
        assert!(matches!(err, CoreError::PositionNotFound { .. }));
        assert_eq!(ledger.revision(), revision);
    }

    #[tokio::test]
    async fn test_reimport_keeps_close_state_and_credit_terms() {
        let ledger = Ledger::new();
        ledger
            .import(vec![
                record(1.0, "Investissement", 100.0, Some("I1")),
                record(2.0, "Gain investissement", 120.0, Some("I1")),
                record(1.0, "Revenus", 5000.0, Some("C1")),
            ])
            .await
            .unwrap();
        ledger.validate_investment("I1").await.unwrap();
        ledger.set_credit_terms("C1", Some(250.0), Some(2.5)).await.unwrap();

        let summary = ledger
            .import(vec![
                record(3.0, "Charge", 250.0, Some("C1")),
                record(4.0, "Gain investissement", 5.0, Some("I1")),
            ])
            .await
            .unwrap();
        assert_eq!(summary.investments_updated, 1);
        assert_eq!(summary.credits_updated, 1);

        let inv = ledger.investment("I1").unwrap();
        assert!(inv.is_closed());
        assert_eq!(inv.earned, 125.0);
        assert_eq!(inv.transaction_ids.len(), 3);

        let credit = ledger.credit("C1").unwrap();
        assert_eq!(credit.remaining, 4750.0);
        assert_eq!(credit.monthly_payment, Some(250.0));
        assert_eq!(credit.interest_rate, Some(2.5));
    }

    #[tokio::test]
    async fn test_credit_terms_validation() {
        let ledger = Ledger::new();
        ledger.import(vec![record(1.0, "Revenus", 10.0, Some("C1"))]).await.unwrap();
        let err = ledger.set_credit_terms("C1", Some(-1.0), None).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_delete_recomputes_balances_and_keeps_positions() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();

        let summary = ledger.delete_transactions(&[2, 3]).await.unwrap();
        assert_eq!(summary.removed, 2);

        let balances: Vec<f64> = ledger.transactions().iter().map(|t| t.balance).collect();
        assert_eq!(balances, vec![1000.0, 1400.0]);

        let inv = ledger.investment("I1").unwrap();
        assert_eq!(inv.invested, 0.0);
        assert_eq!(inv.earned, 400.0);

        ledger.delete_transactions(&[4]).await.unwrap();
        let inv = ledger.investment("I1").unwrap();
        assert_eq!(inv.earned, 0.0);
        assert!(inv.transaction_ids.is_empty());

        let err = ledger.delete_transactions(&[99]).await.unwrap_err();
        assert!(matches!(err, CoreError::TransactionNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn test_wipe_clears_positions_but_not_ids() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();
        ledger.wipe().await;
        assert_eq!(ledger.transaction_count(), 0);
        assert!(ledger.investments().is_empty());

        ledger.import(vec![record(1.0, "Revenus", 1.0, None)]).await.unwrap();
        assert_eq!(ledger.transactions()[0].id, 5);
    }

    #[tokio::test]
    async fn test_series_matches_point_queries() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();
        let dates = [0.0, 1.0, 2.5, 5.0, 10.0, 20.0];
        let series = ledger.net_worth_series(&dates);
        for point in series {
            assert_eq!(point.net_worth, ledger.net_worth_at(point.date));
        }
    }

    #[tokio::test]
    async fn test_summary() {
        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();
        let summary = ledger.summary();
        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.open_investments, 1);
        assert_eq!(summary.current_balance, 900.0);
        assert_eq!(summary.period_start, Some(1.0));
        assert_eq!(summary.period_end, Some(10.0));
    }

    #[tokio::test]
    async fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let ledger = Ledger::new();
        ledger.import(scenario()).await.unwrap();
        ledger.validate_investment("I1").await.unwrap();
        ledger.save(&path).unwrap();

        let reopened = Ledger::open(&path).unwrap();
        assert_eq!(reopened.transactions(), ledger.transactions());
        assert!(reopened.investment("I1").unwrap().is_closed());

        let empty = Ledger::open(dir.path().join("missing.json")).unwrap();
        assert_eq!(empty.transaction_count(), 0);
    }
}
