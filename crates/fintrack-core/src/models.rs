//! Ledger records: transactions and the positions derived from them

use serde::{Deserialize, Serialize};

use crate::category::{classify, Category};

/// Identifier assigned to a transaction on insert, increasing with insertion order
pub type TransactionId = u64;

/// One imported row before it enters the ledger.
///
/// Every field may be missing; numeric gaps count as 0.0 downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub external_id: Option<String>,
    pub date: Option<f64>,
    pub category: Option<String>,
    pub item: Option<String>,
    pub label: Option<String>,
    pub amount: Option<f64>,
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Serial day number
    pub date: Option<f64>,
    pub category: Category,
    /// Sub-classification, e.g. asset class
    pub item: String,
    pub label: String,
    /// Magnitude as entered
    pub amount: f64,
    /// Signed contribution to the balance, fixed at import
    pub variation: f64,
    /// Running total in chronological order
    pub balance: f64,
    /// Correlates transactions into a position
    pub external_id: Option<String>,
}

impl Transaction {
    /// Build a ledger entry from an imported record
    pub fn from_record(id: TransactionId, record: TransactionRecord) -> Self {
        let category = Category::from_optional(record.category.as_deref());
        let amount = record.amount.filter(|a| a.is_finite()).unwrap_or(0.0);
        let variation = classify(&category, amount);

        Self {
            id,
            date: record.date.filter(|d| d.is_finite()),
            category,
            item: record.item.unwrap_or_default(),
            label: record.label.unwrap_or_default(),
            amount,
            variation,
            balance: 0.0,
            external_id: normalize_external_id(record.external_id),
        }
    }

    /// Date used for arithmetic and ordering
    pub fn serial(&self) -> f64 {
        self.date.unwrap_or(0.0)
    }

    /// Kind of position this transaction feeds, if any
    pub fn position_kind(&self) -> Option<PositionKind> {
        self.external_id.as_deref().and_then(PositionKind::of)
    }
}

/// Blank identifiers take part in no grouping
pub fn normalize_external_id(external_id: Option<String>) -> Option<String> {
    external_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Position family, from the identifier's leading character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Investment,
    Credit,
}

impl PositionKind {
    pub const INVESTMENT_MARKER: char = 'I';
    pub const CREDIT_MARKER: char = 'C';

    /// Case-insensitive first-character check
    pub fn of(external_id: &str) -> Option<Self> {
        match external_id.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some(Self::INVESTMENT_MARKER) => Some(PositionKind::Investment),
            Some(Self::CREDIT_MARKER) => Some(PositionKind::Credit),
            _ => None,
        }
    }
}

impl std::fmt::Display for PositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionKind::Investment => write!(f, "investment"),
            PositionKind::Credit => write!(f, "credit"),
        }
    }
}

/// Open or closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Investment position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub external_id: String,
    /// Earliest member date
    pub date_begin: f64,
    /// Set only by validation; `None` while open
    pub date_end: Option<f64>,
    pub transaction_ids: Vec<TransactionId>,
    /// Sum of "Investissement" amounts
    pub invested: f64,
    /// Sum of "Gain investissement" amounts
    pub earned: f64,
    /// Percentage, meaningful once closed
    pub profitability: f64,
    /// Annualized percentage, meaningful once closed
    pub annual_profitability: f64,
}

impl Investment {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            date_begin: 0.0,
            date_end: None,
            transaction_ids: Vec::new(),
            invested: 0.0,
            earned: 0.0,
            profitability: 0.0,
            annual_profitability: 0.0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.date_end.is_some()
    }

    pub fn status(&self) -> PositionStatus {
        if self.is_closed() {
            PositionStatus::Closed
        } else {
            PositionStatus::Open
        }
    }

    /// Earned minus invested
    pub fn profit(&self) -> f64 {
        self.earned - self.invested
    }
}

/// Credit position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub external_id: String,
    pub date_begin: f64,
    pub transaction_ids: Vec<TransactionId>,
    /// Sum of inflows (borrowed)
    pub total_amount: f64,
    /// Sum of outflows (repaid)
    pub reimbursed: f64,
    pub remaining: f64,
    /// User-entered; survives re-import
    pub monthly_payment: Option<f64>,
    /// User-entered, in percent; survives re-import
    pub interest_rate: Option<f64>,
}

impl Credit {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            date_begin: 0.0,
            transaction_ids: Vec::new(),
            total_amount: 0.0,
            reimbursed: 0.0,
            remaining: 0.0,
            monthly_payment: None,
            interest_rate: None,
        }
    }

    /// Share of the borrowed amount already repaid, in percent
    pub fn progress(&self) -> f64 {
        if self.total_amount > 0.0 {
            self.reimbursed / self.total_amount * 100.0
        } else {
            0.0
        }
    }

    /// Whole monthly payments left at the recorded rate, if one is set
    pub fn months_remaining(&self) -> Option<u32> {
        let payment = self.monthly_payment.filter(|p| *p > 0.0)?;
        if self.remaining <= 0.0 {
            return Some(0);
        }
        Some((self.remaining / payment).ceil() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: Option<&str>, category: &str, amount: Option<f64>) -> TransactionRecord {
        TransactionRecord {
            external_id: external_id.map(String::from),
            date: Some(45000.0),
            category: Some(category.to_string()),
            item: None,
            label: Some("test".to_string()),
            amount,
        }
    }

    #[test]
    fn test_from_record_derives_variation() {
        let txn = Transaction::from_record(1, record(None, "Charge", Some(25.0)));
        assert_eq!(txn.variation, -25.0);
        assert_eq!(txn.balance, 0.0);
        assert_eq!(txn.item, "");
    }

    #[test]
    fn test_missing_amount_is_zero() {
        let txn = Transaction::from_record(1, record(None, "Revenus", None));
        assert_eq!(txn.amount, 0.0);
        assert_eq!(txn.variation, 0.0);

        let txn = Transaction::from_record(2, record(None, "Revenus", Some(f64::NAN)));
        assert_eq!(txn.amount, 0.0);
    }

    #[test]
    fn test_blank_external_id_is_dropped() {
        let txn = Transaction::from_record(1, record(Some("   "), "Charge", Some(1.0)));
        assert_eq!(txn.external_id, None);
        assert_eq!(txn.position_kind(), None);

        let txn = Transaction::from_record(2, record(Some(" I7 "), "Charge", Some(1.0)));
        assert_eq!(txn.external_id.as_deref(), Some("I7"));
    }

    #[test]
    fn test_position_kind_marker() {
        assert_eq!(PositionKind::of("I1"), Some(PositionKind::Investment));
        assert_eq!(PositionKind::of("immo"), Some(PositionKind::Investment));
        assert_eq!(PositionKind::of("C-car"), Some(PositionKind::Credit));
        assert_eq!(PositionKind::of("crypto"), Some(PositionKind::Credit));
        assert_eq!(PositionKind::of("X1"), None);
        assert_eq!(PositionKind::of(""), None);
    }

    #[test]
    fn test_investment_status() {
        let mut inv = Investment::new("I1");
        assert_eq!(inv.status(), PositionStatus::Open);
        inv.date_end = Some(45000.0);
        assert_eq!(inv.status(), PositionStatus::Closed);
    }

    #[test]
    fn test_credit_progress() {
        let mut credit = Credit::new("C1");
        assert_eq!(credit.progress(), 0.0);
        assert_eq!(credit.months_remaining(), None);

        credit.total_amount = 1000.0;
        credit.reimbursed = 250.0;
        credit.remaining = 750.0;
        credit.monthly_payment = Some(100.0);
        assert_eq!(credit.progress(), 25.0);
        assert_eq!(credit.months_remaining(), Some(8));
    }
}
