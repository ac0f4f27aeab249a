use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;

/// Aggregate valuation across all of a user's holdings.
///
/// Derived and never persisted: recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Σ market value, summed nominally across quote currencies
    pub total_value: f64,

    /// Σ aggregate daily change
    pub daily_change: f64,

    /// daily_change / total_value × 100, or 0 when the portfolio is empty
    pub daily_change_percentage: f64,

    /// Number of holdings, valued or not
    pub total_assets: usize,

    /// The user's display currency preference
    pub currency: CurrencyCode,

    /// True when holdings were quoted in more than one currency. No conversion
    /// is applied, so the totals above mix units.
    pub mixed_currencies: bool,
}
