//! Net worth as of a date
//!
//! ```text
//! net_worth(D) = Σ Revenus(date <= D) - Σ Charge(date <= D)
//!              + Σ profit of each identifier group (date <= D)
//!                  where profit = Σ Gain investissement - Σ Investissement
//!                  counted iff the group's investment is closed or profit > 0
//! ```
//!
//! Open positions showing a paper loss are left out entirely; closed ones
//! always count. Both the one-shot and the live entry points of the ledger go
//! through [`breakdown`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::models::{Investment, Transaction};

/// Components of a net worth figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthBreakdown {
    pub date: f64,
    /// Σ "Revenus"
    pub income: f64,
    /// Σ "Charge"
    pub expenses: f64,
    /// Σ profit of the counted groups
    pub investment_profit: f64,
    pub total: f64,
    /// Groups whose profit was counted (`None` for untagged transactions)
    pub included_groups: Vec<Option<String>>,
    /// Open groups left out for showing a loss
    pub excluded_groups: Vec<Option<String>>,
}

#[derive(Default)]
struct GroupSums {
    invested: f64,
    earned: f64,
}

/// Compute the net worth and its components as of `date`
pub fn breakdown(transactions: &[Transaction], investments: &BTreeMap<String, Investment>, date: f64) -> NetWorthBreakdown {
    let mut income = 0.0;
    let mut expenses = 0.0;
    let mut groups: HashMap<Option<&str>, GroupSums> = HashMap::new();

    for txn in transactions.iter().filter(|t| t.serial() <= date) {
        match txn.category {
            Category::Revenus => income += txn.amount,
            Category::Charge => expenses += txn.amount,
            Category::Investissement => groups.entry(txn.external_id.as_deref()).or_default().invested += txn.amount,
            Category::GainInvestissement => groups.entry(txn.external_id.as_deref()).or_default().earned += txn.amount,
            Category::Other(_) => {}
        }
    }

    let mut ordered: Vec<(Option<&str>, GroupSums)> = groups.into_iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let mut investment_profit = 0.0;
    let mut included_groups = Vec::new();
    let mut excluded_groups = Vec::new();
    for (external_id, sums) in ordered {
        let profit = sums.earned - sums.invested;
        let closed = external_id
            .and_then(|id| investments.get(id))
            .is_some_and(Investment::is_closed);

        if closed || profit > 0.0 {
            investment_profit += profit;
            included_groups.push(external_id.map(String::from));
        } else {
            excluded_groups.push(external_id.map(String::from));
        }
    }

    NetWorthBreakdown {
        date,
        income,
        expenses,
        investment_profit,
        total: income - expenses + investment_profit,
        included_groups,
        excluded_groups,
    }
}
