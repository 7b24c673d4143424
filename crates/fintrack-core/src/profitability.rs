//! Profitability of a closing investment
//!
//! Computed from the position's live member transactions at validation time,
//! never from stored totals.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::models::{Investment, Transaction};
use crate::positions::invested_and_earned;

/// Minimum holding period, in days
pub const MIN_HOLDING_DAYS: f64 = 1.0;

/// Everything validation derives for one investment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub invested: f64,
    pub earned: f64,
    /// Amount-weighted mean date of the invested set
    pub avg_invest_date: f64,
    /// Amount-weighted mean date of the earned set
    pub avg_earn_date: f64,
    pub holding_days: f64,
    /// Percentage
    pub profitability: f64,
    /// Compound annual growth, percentage
    pub annual_profitability: f64,
    pub date_begin: f64,
    pub date_end: f64,
}

/// Replace NaN and infinities by 0 before anything is stored
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Amount-weighted mean date; 0 when the total is 0
pub fn weighted_average_date<'a>(members: impl IntoIterator<Item = &'a Transaction>, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    let weighted: f64 = members.into_iter().map(|t| t.serial() * t.amount).sum();
    finite_or_zero(weighted / total)
}

/// Simple return in percent
pub fn simple_return(invested: f64, earned: f64) -> f64 {
    if invested == 0.0 {
        return 0.0;
    }
    finite_or_zero((earned - invested) / invested * 100.0)
}

/// Annualized return in percent: `((earned / invested)^(365 / days) - 1) * 100`
pub fn annualized_return(invested: f64, earned: f64, holding_days: f64) -> f64 {
    if invested == 0.0 || holding_days <= 0.0 {
        return 0.0;
    }
    let ratio = earned / invested;
    // fractional power of a negative base is undefined
    if !ratio.is_finite() || ratio < 0.0 {
        return 0.0;
    }
    finite_or_zero((ratio.powf(365.0 / holding_days) - 1.0) * 100.0)
}

/// Compute profitability from an investment's member transactions
pub fn compute(members: &[&Transaction]) -> Profitability {
    let (invested, earned) = invested_and_earned(members.iter().copied());

    let invest_set = members.iter().copied().filter(|t| t.category == Category::Investissement);
    let earn_set = members.iter().copied().filter(|t| t.category == Category::GainInvestissement);

    let avg_invest_date = weighted_average_date(invest_set, invested);
    let avg_earn_date = weighted_average_date(earn_set, earned);
    let holding_days = (avg_earn_date - avg_invest_date).max(MIN_HOLDING_DAYS);

    let dates = members.iter().map(|t| t.serial());
    let date_begin = dates.clone().fold(f64::INFINITY, f64::min);
    let date_end = dates.fold(f64::NEG_INFINITY, f64::max);

    Profitability {
        invested,
        earned,
        avg_invest_date,
        avg_earn_date,
        holding_days,
        profitability: simple_return(invested, earned),
        annual_profitability: annualized_return(invested, earned, holding_days),
        date_begin: finite_or_zero(date_begin),
        date_end: finite_or_zero(date_end),
    }
}

/// Close an investment: Open -> Closed.
///
/// A position with no member transactions left keeps its start date and is
/// closed on that same date.
pub fn apply_validation(investment: &mut Investment, members: &[&Transaction]) -> Profitability {
    let mut result = compute(members);
    if members.is_empty() {
        result.date_begin = investment.date_begin;
        result.date_end = investment.date_begin;
    }
    investment.invested = result.invested;
    investment.earned = result.earned;
    investment.date_begin = result.date_begin;
    investment.date_end = Some(result.date_end);
    investment.profitability = result.profitability;
    investment.annual_profitability = result.annual_profitability;
    investment.transaction_ids = members.iter().map(|t| t.id).collect();
    result
}

/// Reopen an investment: Closed -> Open.
///
/// Totals and start date are re-derived from the current members; the close
/// date and both profitability figures are cleared.
pub fn apply_invalidation(investment: &mut Investment, members: &[&Transaction]) {
    let (invested, earned) = invested_and_earned(members.iter().copied());
    investment.invested = invested;
    investment.earned = earned;
    if !members.is_empty() {
        investment.date_begin = members
            .iter()
            .map(|t| t.serial())
            .fold(f64::INFINITY, f64::min);
    }
    investment.transaction_ids = members.iter().map(|t| t.id).collect();
    investment.date_end = None;
    investment.profitability = 0.0;
    investment.annual_profitability = 0.0;
}
