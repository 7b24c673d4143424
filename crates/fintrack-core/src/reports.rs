//! Report structures for charts and tables

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::date::to_day;
use crate::models::{Investment, Transaction};
use crate::net_worth::{breakdown, NetWorthBreakdown};
use crate::time::{TimeContext, TimeFilter};

/// Net worth sampled at one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    pub date: f64,
    pub net_worth: f64,
}

/// Net worth history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetWorthReport {
    pub points: Vec<NetWorthPoint>,
    pub start_net_worth: f64,
    pub end_net_worth: f64,
    pub change: f64,
    /// Change relative to the first point, in percent
    pub change_percentage: f64,
}

impl NetWorthReport {
    pub fn from_points(points: Vec<NetWorthPoint>) -> Self {
        let start_net_worth = points.first().map(|p| p.net_worth).unwrap_or(0.0);
        let end_net_worth = points.last().map(|p| p.net_worth).unwrap_or(0.0);
        let change = end_net_worth - start_net_worth;
        let change_percentage = if start_net_worth != 0.0 {
            change / start_net_worth.abs() * 100.0
        } else {
            0.0
        };

        Self {
            points,
            start_net_worth,
            end_net_worth,
            change,
            change_percentage,
        }
    }
}

/// Sample net worth at each date with the same formula as the live value
pub fn net_worth_series(
    transactions: &[Transaction],
    investments: &BTreeMap<String, Investment>,
    dates: &[f64],
) -> Vec<NetWorthBreakdown> {
    dates
        .iter()
        .map(|date| breakdown(transactions, investments, *date))
        .collect()
}

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: f64,
    pub count: usize,
    /// Share of the grand total of amounts, in percent
    pub percentage: f64,
}

/// Amount totals per category within a time window, largest first
pub fn category_breakdown(transactions: &[Transaction], context: &TimeContext) -> Vec<CategoryBreakdown> {
    let window = context.window();
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for txn in transactions.iter().filter(|t| t.filter_by_time(&window)) {
        let entry = totals.entry(txn.category.label().to_string()).or_default();
        entry.0 += txn.amount;
        entry.1 += 1;
    }

    let grand_total: f64 = totals.values().map(|(total, _)| total.abs()).sum();
    let mut entries: Vec<CategoryBreakdown> = totals
        .into_iter()
        .map(|(category, (total, count))| CategoryBreakdown {
            percentage: if grand_total > 0.0 { total.abs() / grand_total * 100.0 } else { 0.0 },
            category,
            total,
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.total.abs().total_cmp(&a.total.abs()));
    entries
}

/// Expense totals per item within a time window, largest first
pub fn expense_items(transactions: &[Transaction], context: &TimeContext) -> Vec<CategoryBreakdown> {
    let charges: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.category == Category::Charge)
        .map(|t| {
            let mut by_item = t.clone();
            by_item.category = Category::Other(t.item.clone());
            by_item
        })
        .collect();
    category_breakdown(&charges, context)
}

/// Income and expenses for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// "YYYY-MM"
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    pub net_income: f64,
    pub transaction_count: usize,
}

/// Per-month income and expenses for a year
pub fn monthly_summaries(transactions: &[Transaction], year: i32) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<u32, MonthlySummary> = BTreeMap::new();
    for txn in transactions {
        let Some(day) = txn.date.and_then(to_day) else {
            continue;
        };
        if day.year() != year {
            continue;
        }
        let summary = months.entry(day.month()).or_insert_with(|| MonthlySummary {
            month: format!("{:04}-{:02}", year, day.month()),
            income: 0.0,
            expenses: 0.0,
            net_income: 0.0,
            transaction_count: 0,
        });
        match txn.category {
            Category::Revenus => summary.income += txn.amount,
            Category::Charge => summary.expenses += txn.amount,
            _ => {}
        }
        summary.net_income = summary.income - summary.expenses;
        summary.transaction_count += 1;
    }
    months.into_values().collect()
}

/// Ledger summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_transactions: usize,
    pub total_investments: usize,
    pub open_investments: usize,
    pub total_credits: usize,
    /// Balance of the chronologically last transaction
    pub current_balance: f64,
    pub period_start: Option<f64>,
    pub period_end: Option<f64>,
}
