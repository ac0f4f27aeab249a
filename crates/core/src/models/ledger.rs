use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::alert::Alert;
use super::currency::CurrencyCode;
use super::holding::Holding;
use super::position::Position;
use super::settings::Preferences;
use crate::errors::CoreError;

/// Everything the store adapters keep, for all users.
///
/// One table per entity, every row scoped by its owning user. This is what
/// the vault serializes and encrypts as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub holdings: Vec<Holding>,
    pub positions: Vec<Position>,
    pub alerts: Vec<Alert>,
    pub preferences: HashMap<Uuid, Preferences>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings_for(&self, user_id: Uuid) -> Vec<Holding> {
        self.holdings
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn alerts_for(&self, user_id: Uuid) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn positions_for(&self, holding_id: Uuid) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.holding_id == holding_id)
            .cloned()
            .collect();
        positions.sort_by_key(|p| p.purchase_date);
        positions
    }

    pub fn currency_for(&self, user_id: Uuid) -> CurrencyCode {
        self.preferences
            .get(&user_id)
            .map(|p| p.currency.clone())
            .unwrap_or_default()
    }

    pub fn set_currency(&mut self, user_id: Uuid, currency: CurrencyCode) {
        self.preferences.entry(user_id).or_default().currency = currency;
    }

    pub fn preferences_for(&self, user_id: Uuid) -> Preferences {
        self.preferences.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn set_preferences(&mut self, user_id: Uuid, preferences: Preferences) {
        self.preferences.insert(user_id, preferences);
    }

    /// Replace holdings by id, appending any that are not stored yet.
    pub fn upsert_holdings(&mut self, holdings: &[Holding]) {
        for holding in holdings {
            match self.holdings.iter_mut().find(|h| h.id == holding.id) {
                Some(existing) => *existing = holding.clone(),
                None => self.holdings.push(holding.clone()),
            }
        }
    }

    /// Replace alerts by id, appending any that are not stored yet.
    pub fn upsert_alerts(&mut self, alerts: &[Alert]) {
        for alert in alerts {
            match self.alerts.iter_mut().find(|a| a.id == alert.id) {
                Some(existing) => *existing = alert.clone(),
                None => self.alerts.push(alert.clone()),
            }
        }
    }

    pub fn insert_position(&mut self, position: Position) -> Result<(), CoreError> {
        if !self.holdings.iter().any(|h| h.id == position.holding_id) {
            return Err(CoreError::HoldingNotFound(position.holding_id.to_string()));
        }
        self.positions.push(position);
        Ok(())
    }

    /// Replace a stored position by id, returning the previous version.
    pub fn update_position(&mut self, position: Position) -> Result<Position, CoreError> {
        let existing = self
            .positions
            .iter_mut()
            .find(|p| p.id == position.id)
            .ok_or_else(|| CoreError::PositionNotFound(position.id.to_string()))?;
        if existing.holding_id != position.holding_id {
            return Err(CoreError::ValidationError(
                "A position cannot move to another holding".into(),
            ));
        }
        Ok(std::mem::replace(existing, position))
    }

    /// Remove a holding together with its positions and alerts.
    pub fn delete_holding(&mut self, holding_id: Uuid) -> Result<Holding, CoreError> {
        let idx = self
            .holdings
            .iter()
            .position(|h| h.id == holding_id)
            .ok_or_else(|| CoreError::HoldingNotFound(holding_id.to_string()))?;
        let removed = self.holdings.remove(idx);
        self.positions.retain(|p| p.holding_id != holding_id);
        self.alerts.retain(|a| a.holding_id != Some(holding_id));
        Ok(removed)
    }

    pub fn delete_position(&mut self, position_id: Uuid) -> Result<Position, CoreError> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;
        Ok(self.positions.remove(idx))
    }

    pub fn delete_alert(&mut self, alert_id: Uuid) -> Result<Alert, CoreError> {
        let idx = self
            .alerts
            .iter()
            .position(|a| a.id == alert_id)
            .ok_or_else(|| CoreError::AlertNotFound(alert_id.to_string()))?;
        Ok(self.alerts.remove(idx))
    }
}
