use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::currency::CurrencyCode;
use crate::errors::CoreError;

/// The category of a tracked instrument. Closed set: unknown categories are
/// rejected when parsed from user input or storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldingCategory {
    Equity,
    Etf,
    Crypto,
    Commodity,
    Fund,
}

impl HoldingCategory {
    pub const ALL: [HoldingCategory; 5] = [
        HoldingCategory::Equity,
        HoldingCategory::Etf,
        HoldingCategory::Crypto,
        HoldingCategory::Commodity,
        HoldingCategory::Fund,
    ];
}

impl fmt::Display for HoldingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldingCategory::Equity => write!(f, "Equity"),
            HoldingCategory::Etf => write!(f, "ETF"),
            HoldingCategory::Crypto => write!(f, "Crypto"),
            HoldingCategory::Commodity => write!(f, "Commodity"),
            HoldingCategory::Fund => write!(f, "Fund"),
        }
    }
}

impl FromStr for HoldingCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" => Ok(HoldingCategory::Equity),
            "etf" => Ok(HoldingCategory::Etf),
            "crypto" | "cryptocurrency" => Ok(HoldingCategory::Crypto),
            "commodity" => Ok(HoldingCategory::Commodity),
            "fund" => Ok(HoldingCategory::Fund),
            other => Err(CoreError::ValidationError(format!(
                "Unknown holding category: {other}"
            ))),
        }
    }
}

/// Fields derived from a quote on the latest valuation pass.
///
/// Never authoritative: recomputed from (quantity, cost, quote) every time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub current_price: f64,
    pub market_value: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percentage: f64,
    /// Aggregate swing for the whole position, not per unit.
    pub daily_change: f64,
    /// Per-unit ratio against the previous close.
    pub daily_change_percentage: f64,
}

/// A user's aggregate position in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Ticker symbol, uppercased (e.g. "AAPL", "BTC")
    pub symbol: String,

    /// Display name (e.g. "Apple Inc.")
    pub name: String,

    pub category: HoldingCategory,

    /// Quote currency of the last valuation, if any
    pub currency: Option<CurrencyCode>,

    /// Sum of position quantities; treated as 0 when unset
    pub total_quantity: Option<f64>,

    /// Sum of position costs including fees; treated as 0 when unset
    pub total_cost: Option<f64>,

    pub valuation: Option<Valuation>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(
        user_id: Uuid,
        symbol: impl Into<String>,
        name: impl Into<String>,
        category: HoldingCategory,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.into().trim().to_uppercase(),
            name: name.into(),
            category,
            currency: None,
            total_quantity: None,
            total_cost: None,
            valuation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style helper to set quantity and cost in one go.
    pub fn with_totals(mut self, quantity: f64, cost: f64) -> Self {
        self.total_quantity = Some(quantity);
        self.total_cost = Some(cost);
        self
    }

    pub fn quantity(&self) -> f64 {
        self.total_quantity.unwrap_or(0.0)
    }

    pub fn cost(&self) -> f64 {
        self.total_cost.unwrap_or(0.0)
    }

    pub fn market_value(&self) -> f64 {
        self.valuation.map_or(0.0, |v| v.market_value)
    }

    pub fn daily_change(&self) -> f64 {
        self.valuation.map_or(0.0, |v| v.daily_change)
    }
}
