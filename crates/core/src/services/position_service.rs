use chrono::Utc;

use crate::errors::CoreError;
use crate::models::holding::{Holding, Valuation};
use crate::models::position::Position;
use crate::services::valuation_service::percentage;

/// Validates purchase lots and folds them into a holding's totals.
///
/// Pure business logic — no I/O. Easy to test.
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Validate a position before it is stored.
    ///
    /// Rules:
    /// - Quantity must be finite and positive
    /// - Purchase price and fees must be finite and non-negative
    /// - The lot must belong to the given holding and its owner
    pub fn validate(&self, holding: &Holding, position: &Position) -> Result<(), CoreError> {
        if position.holding_id != holding.id {
            return Err(CoreError::ValidationError(format!(
                "Position {} belongs to holding {}, not {}",
                position.id, position.holding_id, holding.id
            )));
        }
        if position.user_id != holding.user_id {
            return Err(CoreError::ValidationError(
                "Position owner does not match holding owner".into(),
            ));
        }
        if !position.quantity.is_finite() || position.quantity <= 0.0 {
            return Err(CoreError::ValidationError(
                "Position quantity must be positive".into(),
            ));
        }
        if !position.purchase_price.is_finite() || position.purchase_price < 0.0 {
            return Err(CoreError::ValidationError(
                "Purchase price must be a non-negative number".into(),
            ));
        }
        if !position.fees.is_finite() || position.fees < 0.0 {
            return Err(CoreError::ValidationError(
                "Purchase fees must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// Sum lots into (total quantity, total cost including fees).
    pub fn totals(&self, positions: &[Position]) -> (f64, f64) {
        positions.iter().fold((0.0, 0.0), |(quantity, cost), p| {
            (quantity + p.quantity, cost + p.cost())
        })
    }

    /// Return the holding with quantity and cost recomputed from its lots.
    ///
    /// Only lots that belong to the holding are counted. A stored valuation is
    /// rescaled to the new totals at its last known price, so the summary stays
    /// consistent until the next refresh. Without a previous quantity there is
    /// no per-unit basis and the valuation is cleared.
    #[must_use]
    pub fn aggregate(&self, holding: &Holding, positions: &[Position]) -> Holding {
        let own: Vec<Position> = positions
            .iter()
            .filter(|p| p.holding_id == holding.id)
            .cloned()
            .collect();
        let (quantity, cost) = self.totals(&own);

        let mut updated = holding.clone();
        updated.valuation = holding
            .valuation
            .and_then(|v| Self::rescale(v, holding.quantity(), quantity, cost));
        updated.total_quantity = Some(quantity);
        updated.total_cost = Some(cost);
        updated.updated_at = Utc::now();
        updated
    }

    fn rescale(old: Valuation, old_quantity: f64, quantity: f64, cost: f64) -> Option<Valuation> {
        if old_quantity <= 0.0 {
            return None;
        }
        let market_value = old.current_price * quantity;
        let total_gain_loss = market_value - cost;
        let per_unit_change = old.daily_change / old_quantity;

        Some(Valuation {
            current_price: old.current_price,
            market_value,
            total_gain_loss,
            total_gain_loss_percentage: percentage(total_gain_loss, cost),
            daily_change: per_unit_change * quantity,
            daily_change_percentage: old.daily_change_percentage,
        })
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}
