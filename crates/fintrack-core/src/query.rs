//! Filtering for transaction tables

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::chronological;
use crate::models::Transaction;
use crate::time::{TimeContext, TimeFilter, TimeWindow};

/// Criteria for listing transactions; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub time: Option<TimeContext>,
    /// Exact category label
    pub category: Option<String>,
    /// Exact item
    pub item: Option<String>,
    /// Exact external identifier
    pub external_id: Option<String>,
    /// Case-insensitive search in label and item
    pub search: Option<String>,
}

impl TransactionFilter {
    /// Predicate with the time window resolved once against the current day
    pub fn matcher(&self) -> impl Fn(&Transaction) -> bool + '_ {
        self.matcher_at(Utc::now().date_naive())
    }

    /// Predicate with the time window resolved against `today`
    pub fn matcher_at(&self, today: NaiveDate) -> impl Fn(&Transaction) -> bool + '_ {
        let window = self.time.as_ref().map(|t| t.window_at(today));
        move |txn: &Transaction| self.matches_within(txn, window.as_ref())
    }

    fn matches_within(&self, txn: &Transaction, window: Option<&TimeWindow>) -> bool {
        if let Some(window) = window {
            if !txn.filter_by_time(window) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if txn.category.label() != category {
                return false;
            }
        }
        if let Some(ref item) = self.item {
            if &txn.item != item {
                return false;
            }
        }
        if let Some(ref external_id) = self.external_id {
            if txn.external_id.as_deref() != Some(external_id.as_str()) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !txn.label.to_lowercase().contains(&needle) && !txn.item.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// One page of a filtered listing, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Filter and paginate, most recent transaction first
pub fn paginate(transactions: &[Transaction], filter: &TransactionFilter, page: usize, per_page: usize) -> TransactionPage {
    let matches = filter.matcher();
    let mut matching: Vec<&Transaction> = chronological(transactions)
        .into_iter()
        .filter(|&t| matches(t))
        .collect();
    matching.reverse();

    let per_page = per_page.max(1);
    let total_count = matching.len();
    let transactions = matching
        .into_iter()
        .skip(page.saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();

    TransactionPage {
        transactions,
        total_count,
        page,
        per_page,
    }
}
