use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::traits::PortfolioStore;
use crate::errors::CoreError;
use crate::models::alert::Alert;
use crate::models::currency::CurrencyCode;
use crate::models::holding::Holding;
use crate::models::ledger::Ledger;
use crate::models::position::Position;
use crate::models::settings::Preferences;

/// Volatile store backed by a mutex-guarded `Ledger`.
///
/// Useful for tests, demos and as a read-through cache in front of a
/// remote backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> Result<Ledger, CoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, CoreError> {
        self.ledger
            .lock()
            .map_err(|_| CoreError::Storage("memory store lock poisoned".into()))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PortfolioStore for MemoryStore {
    async fn list_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, CoreError> {
        Ok(self.lock()?.holdings_for(user_id))
    }

    async fn list_alerts(&self, user_id: Uuid) -> Result<Vec<Alert>, CoreError> {
        Ok(self.lock()?.alerts_for(user_id))
    }

    async fn save_portfolio(&self, holdings: &[Holding]) -> Result<(), CoreError> {
        self.lock()?.upsert_holdings(holdings);
        Ok(())
    }

    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), CoreError> {
        self.lock()?.upsert_alerts(alerts);
        Ok(())
    }

    async fn get_currency_preference(&self, user_id: Uuid) -> Result<CurrencyCode, CoreError> {
        Ok(self.lock()?.currency_for(user_id))
    }

    async fn set_currency_preference(
        &self,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<(), CoreError> {
        self.lock()?.set_currency(user_id, currency);
        Ok(())
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Preferences, CoreError> {
        Ok(self.lock()?.preferences_for(user_id))
    }

    async fn set_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> Result<(), CoreError> {
        self.lock()?.set_preferences(user_id, preferences.clone());
        Ok(())
    }

    async fn insert_holding(&self, holding: &Holding) -> Result<(), CoreError> {
        self.lock()?.upsert_holdings(std::slice::from_ref(holding));
        Ok(())
    }

    async fn delete_holding(&self, holding_id: Uuid) -> Result<(), CoreError> {
        self.lock()?.delete_holding(holding_id).map(|_| ())
    }

    async fn list_positions(&self, holding_id: Uuid) -> Result<Vec<Position>, CoreError> {
        Ok(self.lock()?.positions_for(holding_id))
    }

    async fn insert_position(&self, position: &Position) -> Result<(), CoreError> {
        self.lock()?.insert_position(position.clone())
    }

    async fn update_position(&self, position: &Position) -> Result<(), CoreError> {
        self.lock()?.update_position(position.clone()).map(|_| ())
    }

    async fn delete_position(&self, position_id: Uuid) -> Result<Position, CoreError> {
        self.lock()?.delete_position(position_id)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), CoreError> {
        self.lock()?.upsert_alerts(std::slice::from_ref(alert));
        Ok(())
    }

    async fn delete_alert(&self, alert_id: Uuid) -> Result<(), CoreError> {
        self.lock()?.delete_alert(alert_id).map(|_| ())
    }
}
