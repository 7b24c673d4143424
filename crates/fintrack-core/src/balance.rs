//! Running balance calculator
//!
//! Always a full recompute: the scan reads only dates and variations, never a
//! previously stored balance, so re-running it converges regardless of what a
//! failed earlier pass left behind.

use std::collections::HashMap;

use crate::models::{Transaction, TransactionId};

/// Chronological order: date ascending, ties by identifier (insertion order)
pub fn chronological(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| t.id);
    // stable: equal dates keep identifier order
    ordered.sort_by(|a, b| a.serial().total_cmp(&b.serial()));
    ordered
}

/// Prefix sums of variation, in chronological order
pub fn running_balances(transactions: &[Transaction]) -> Vec<(TransactionId, f64)> {
    let mut balance = 0.0;
    chronological(transactions)
        .into_iter()
        .map(|t| {
            if t.variation.is_finite() {
                balance += t.variation;
            }
            (t.id, balance)
        })
        .collect()
}

/// Recompute and write every balance in place.
///
/// Returns the number of transactions whose balance changed.
pub fn apply_running_balances(transactions: &mut [Transaction]) -> usize {
    let balances: HashMap<TransactionId, f64> = running_balances(transactions).into_iter().collect();

    let mut changed = 0;
    for txn in transactions.iter_mut() {
        if let Some(balance) = balances.get(&txn.id) {
            if txn.balance.to_bits() != balance.to_bits() {
                changed += 1;
            }
            txn.balance = *balance;
        }
    }
    changed
}
