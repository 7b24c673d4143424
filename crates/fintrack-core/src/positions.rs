//! Position aggregator
//!
//! Partitions tagged transactions by external identifier and derives
//! investment or credit totals for each group. Totals are always recomputed
//! from the member transactions; upserts keep whatever a pass does not derive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::category::Category;
use crate::error::{CoreError, CoreResult};
use crate::models::{Credit, Investment, PositionKind, Transaction, TransactionId};

/// Totals derived for an investment group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTotals {
    pub external_id: String,
    pub date_begin: f64,
    pub transaction_ids: Vec<TransactionId>,
    pub invested: f64,
    pub earned: f64,
}

/// Totals derived for a credit group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTotals {
    pub external_id: String,
    pub date_begin: f64,
    pub transaction_ids: Vec<TransactionId>,
    pub total_amount: f64,
    pub reimbursed: f64,
    pub remaining: f64,
}

/// Result of aggregating one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionTotals {
    Investment(InvestmentTotals),
    Credit(CreditTotals),
}

impl PositionTotals {
    pub fn external_id(&self) -> &str {
        match self {
            PositionTotals::Investment(t) => &t.external_id,
            PositionTotals::Credit(t) => &t.external_id,
        }
    }
}

/// Whether an upsert created a position or refreshed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Group transactions by non-blank external identifier
pub fn group_by_identifier(transactions: &[Transaction]) -> BTreeMap<String, Vec<&Transaction>> {
    let mut groups: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for txn in transactions {
        if let Some(id) = txn.external_id.as_deref() {
            if !id.trim().is_empty() {
                groups.entry(id.to_string()).or_default().push(txn);
            }
        }
    }
    groups
}

fn earliest_date<'a>(members: impl IntoIterator<Item = &'a Transaction>) -> f64 {
    members
        .into_iter()
        .map(Transaction::serial)
        .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d))))
        .unwrap_or(0.0)
}

/// Sum of "Investissement" and "Gain investissement" amounts
pub fn invested_and_earned<'a>(members: impl IntoIterator<Item = &'a Transaction>) -> (f64, f64) {
    members
        .into_iter()
        .fold((0.0, 0.0), |(invested, earned), t| match t.category {
            Category::Investissement => (invested + t.amount, earned),
            Category::GainInvestissement => (invested, earned + t.amount),
            _ => (invested, earned),
        })
}

/// Investment totals; members outside the two investment categories are listed but not summed
pub fn investment_totals(external_id: &str, members: &[&Transaction]) -> InvestmentTotals {
    let (invested, earned) = invested_and_earned(members.iter().copied());
    InvestmentTotals {
        external_id: external_id.to_string(),
        date_begin: earliest_date(members.iter().copied()),
        transaction_ids: members.iter().map(|t| t.id).collect(),
        invested,
        earned,
    }
}

/// Credit totals, classified by the sign of variation rather than category
pub fn credit_totals(external_id: &str, members: &[&Transaction]) -> CreditTotals {
    let mut total_amount = 0.0;
    let mut reimbursed = 0.0;
    for txn in members {
        if txn.variation > 0.0 {
            total_amount += txn.amount;
        } else if txn.variation < 0.0 {
            reimbursed += txn.amount.abs();
        }
    }

    CreditTotals {
        external_id: external_id.to_string(),
        date_begin: earliest_date(members.iter().copied()),
        transaction_ids: members.iter().map(|t| t.id).collect(),
        total_amount,
        reimbursed,
        remaining: total_amount - reimbursed,
    }
}

/// Aggregate one group according to its identifier's marker
pub fn aggregate_group(external_id: &str, members: &[&Transaction]) -> Option<PositionTotals> {
    match PositionKind::of(external_id)? {
        PositionKind::Investment => Some(PositionTotals::Investment(investment_totals(external_id, members))),
        PositionKind::Credit => Some(PositionTotals::Credit(credit_totals(external_id, members))),
    }
}

/// Aggregate every group of a snapshot sequentially
pub fn aggregate_all(transactions: &[Transaction]) -> Vec<PositionTotals> {
    group_by_identifier(transactions)
        .iter()
        .filter_map(|(id, members)| aggregate_group(id, members))
        .collect()
}

/// Aggregate every group of a snapshot, one task per group.
///
/// All tasks read the same snapshot, taken before any upsert; the call returns
/// only after every task has finished. Output is ordered by identifier.
pub async fn aggregate_concurrently(snapshot: Vec<Transaction>) -> CoreResult<Vec<PositionTotals>> {
    let mut groups: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
    for txn in snapshot {
        if let Some(id) = txn.external_id.clone() {
            if PositionKind::of(&id).is_some() {
                groups.entry(id).or_default().push(txn);
            }
        }
    }

    let mut tasks = JoinSet::new();
    for (external_id, members) in groups {
        tasks.spawn(async move {
            let refs: Vec<&Transaction> = members.iter().collect();
            aggregate_group(&external_id, &refs)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let totals = joined.map_err(|e| CoreError::Internal {
            message: format!("position aggregation task failed: {}", e),
        })?;
        results.extend(totals);
    }
    results.sort_by(|a, b| a.external_id().cmp(b.external_id()));
    Ok(results)
}

/// Insert or refresh an investment, keeping its close state and profitability
pub fn upsert_investment(store: &mut BTreeMap<String, Investment>, totals: InvestmentTotals) -> UpsertOutcome {
    match store.get_mut(&totals.external_id) {
        Some(existing) => {
            existing.date_begin = totals.date_begin;
            existing.transaction_ids = totals.transaction_ids;
            existing.invested = totals.invested;
            existing.earned = totals.earned;
            UpsertOutcome::Updated
        }
        None => {
            let mut investment = Investment::new(totals.external_id.clone());
            investment.date_begin = totals.date_begin;
            investment.transaction_ids = totals.transaction_ids;
            investment.invested = totals.invested;
            investment.earned = totals.earned;
            store.insert(totals.external_id, investment);
            UpsertOutcome::Inserted
        }
    }
}

/// Insert or refresh a credit, keeping the user-entered payment terms
pub fn upsert_credit(store: &mut BTreeMap<String, Credit>, totals: CreditTotals) -> UpsertOutcome {
    let outcome = if store.contains_key(&totals.external_id) {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    };

    let credit = store
        .entry(totals.external_id.clone())
        .or_insert_with(|| Credit::new(totals.external_id.clone()));
    credit.date_begin = totals.date_begin;
    credit.transaction_ids = totals.transaction_ids;
    credit.total_amount = totals.total_amount;
    credit.reimbursed = totals.reimbursed;
    credit.remaining = totals.remaining;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionRecord;

    fn txn(id: TransactionId, date: f64, category: &str, amount: f64, ext: Option<&str>) -> Transaction {
        Transaction::from_record(
            id,
            TransactionRecord {
                external_id: ext.map(String::from),
                date: Some(date),
                category: Some(category.to_string()),
                amount: Some(amount),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_grouping_skips_untagged() {
        let txns = vec![
            txn(1, 1.0, "Revenus", 10.0, None),
            txn(2, 2.0, "Investissement", 5.0, Some("I1")),
            txn(3, 3.0, "Charge", 5.0, Some("X9")),
            txn(4, 4.0, "Gain investissement", 6.0, Some("I1")),
        ];
        let groups = group_by_identifier(&txns);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["I1"].len(), 2);

        // X9 carries no marker
        let totals = aggregate_all(&txns);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].external_id(), "I1");
    }

    #[test]
    fn test_investment_totals() {
        let txns = vec![
            txn(1, 5.0, "Investissement", 300.0, Some("I1")),
            txn(2, 3.0, "Investissement", 200.0, Some("I1")),
            txn(3, 9.0, "Gain investissement", 600.0, Some("I1")),
            txn(4, 1.0, "Frais", 12.0, Some("I1")),
        ];
        let refs: Vec<&Transaction> = txns.iter().collect();
        let totals = investment_totals("I1", &refs);
        assert_eq!(totals.invested, 500.0);
        assert_eq!(totals.earned, 600.0);
        assert_eq!(totals.date_begin, 1.0);
        // neutral members are listed but not summed
        assert_eq!(totals.transaction_ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_credit_totals_by_variation_sign() {
        let txns = vec![
            txn(1, 1.0, "Revenus", 5000.0, Some("C1")),
            txn(2, 2.0, "Charge", 400.0, Some("C1")),
            txn(3, 3.0, "Charge", 400.0, Some("C1")),
            txn(4, 4.0, "Note", 99.0, Some("C1")),
        ];
        let refs: Vec<&Transaction> = txns.iter().collect();
        let totals = credit_totals("C1", &refs);
        assert_eq!(totals.total_amount, 5000.0);
        assert_eq!(totals.reimbursed, 800.0);
        assert_eq!(totals.remaining, 4200.0);
        assert_eq!(totals.transaction_ids.len(), 4);
    }

    #[test]
    fn test_lowercase_markers() {
        let txns = vec![
            txn(1, 1.0, "Investissement", 10.0, Some("i-etf")),
            txn(2, 1.0, "Revenus", 10.0, Some("c-car")),
        ];
        let totals = aggregate_all(&txns);
        assert!(matches!(totals[0], PositionTotals::Credit(_)));
        assert!(matches!(totals[1], PositionTotals::Investment(_)));
    }

    #[test]
    fn test_upsert_investment_preserves_close_state() {
        let mut store = BTreeMap::new();
        let totals = InvestmentTotals {
            external_id: "I1".to_string(),
            date_begin: 3.0,
            transaction_ids: vec![1],
            invested: 100.0,
            earned: 0.0,
        };
        assert_eq!(upsert_investment(&mut store, totals.clone()), UpsertOutcome::Inserted);

        let inv = store.get_mut("I1").unwrap();
        inv.date_end = Some(10.0);
        inv.profitability = 12.5;

        let refreshed = InvestmentTotals {
            transaction_ids: vec![1, 2],
            earned: 150.0,
            ..totals
        };
        assert_eq!(upsert_investment(&mut store, refreshed), UpsertOutcome::Updated);
        let inv = &store["I1"];
        assert_eq!(inv.earned, 150.0);
        assert_eq!(inv.date_end, Some(10.0));
        assert_eq!(inv.profitability, 12.5);
        assert_eq!(inv.transaction_ids, vec![1, 2]);
    }

    #[test]
    fn test_upsert_credit_preserves_terms() {
        let mut store = BTreeMap::new();
        let totals = CreditTotals {
            external_id: "C1".to_string(),
            date_begin: 1.0,
            transaction_ids: vec![1],
            total_amount: 1000.0,
            reimbursed: 0.0,
            remaining: 1000.0,
        };
        upsert_credit(&mut store, totals.clone());
        store.get_mut("C1").unwrap().monthly_payment = Some(120.0);
        store.get_mut("C1").unwrap().interest_rate = Some(3.2);

        let refreshed = CreditTotals {
            reimbursed: 240.0,
            remaining: 760.0,
            ..totals
        };
        assert_eq!(upsert_credit(&mut store, refreshed), UpsertOutcome::Updated);
        let credit = &store["C1"];
        assert_eq!(credit.remaining, 760.0);
        assert_eq!(credit.monthly_payment, Some(120.0));
        assert_eq!(credit.interest_rate, Some(3.2));
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let txns: Vec<Transaction> = (0..30)
            .map(|i| {
                let ext = match i % 4 {
                    0 => Some("I-a"),
                    1 => Some("C-b"),
                    2 => Some("I-c"),
                    _ => None,
                };
                let category = if i % 3 == 0 { "Investissement" } else { "Gain investissement" };
                txn(i, i as f64, category, (i + 1) as f64, ext)
            })
            .collect();

        let sequential = aggregate_all(&txns);
        let concurrent = aggregate_concurrently(txns).await.unwrap();
        assert_eq!(sequential, concurrent);
    }
}
