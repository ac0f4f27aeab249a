use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily close (date → price), used for technical analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}
