use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchase lot contributing to a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub holding_id: Uuid,
    pub user_id: Uuid,

    /// Price paid per unit
    pub purchase_price: f64,

    /// Units bought (always positive)
    pub quantity: f64,

    pub purchase_date: DateTime<Utc>,

    /// Broker fees for this lot, added to the cost basis
    pub fees: f64,

    /// Optional free-text notes
    pub notes: Option<String>,
}

impl Position {
    pub fn new(
        holding_id: Uuid,
        user_id: Uuid,
        purchase_price: f64,
        quantity: f64,
        purchase_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            holding_id,
            user_id,
            purchase_price,
            quantity,
            purchase_date,
            fees: 0.0,
            notes: None,
        }
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// What this lot cost in total: price × quantity + fees.
    pub fn cost(&self) -> f64 {
        self.purchase_price * self.quantity + self.fees
    }
}
