//! Transaction categories and the variation rule

use serde::{Deserialize, Serialize};

/// Category labels recognised by the ledger, converted at the input boundary.
///
/// Anything else is kept verbatim in `Other` so it can still be displayed and
/// filtered on; it never contributes to balances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label")]
pub enum Category {
    /// "Revenus": income
    Revenus,
    /// "Charge": expense
    Charge,
    /// "Investissement": capital put into a position
    Investissement,
    /// "Gain investissement": capital returned from a position
    GainInvestissement,
    /// Any other label, including blank
    Other(String),
}

impl Category {
    pub const REVENUS: &'static str = "Revenus";
    pub const CHARGE: &'static str = "Charge";
    pub const INVESTISSEMENT: &'static str = "Investissement";
    pub const GAIN_INVESTISSEMENT: &'static str = "Gain investissement";

    /// Exact, case-sensitive match against the recognised labels
    pub fn from_label(label: &str) -> Self {
        match label {
            Self::REVENUS => Category::Revenus,
            Self::CHARGE => Category::Charge,
            Self::INVESTISSEMENT => Category::Investissement,
            Self::GAIN_INVESTISSEMENT => Category::GainInvestissement,
            other => Category::Other(other.to_string()),
        }
    }

    /// Category from an optional cell value
    pub fn from_optional(label: Option<&str>) -> Self {
        Self::from_label(label.unwrap_or_default())
    }

    pub fn label(&self) -> &str {
        match self {
            Category::Revenus => Self::REVENUS,
            Category::Charge => Self::CHARGE,
            Category::Investissement => Self::INVESTISSEMENT,
            Category::GainInvestissement => Self::GAIN_INVESTISSEMENT,
            Category::Other(label) => label,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other(String::new())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Signed cash-flow contribution of a transaction
pub fn classify(category: &Category, amount: f64) -> f64 {
    match category {
        Category::Revenus | Category::GainInvestissement => amount,
        Category::Investissement | Category::Charge => -amount,
        Category::Other(_) => 0.0,
    }
}
