use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::alert::Alert;
use crate::models::currency::CurrencyCode;
use crate::models::holding::Holding;
use crate::models::position::Position;
use crate::models::settings::Preferences;

/// Storage collaborator consumed by the dashboard.
///
/// Rows are scoped by their owning user. Any call may fail; the dashboard
/// treats a failure as fatal for the current cycle and does not retry.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PortfolioStore: Send + Sync {
    async fn list_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, CoreError>;

    async fn list_alerts(&self, user_id: Uuid) -> Result<Vec<Alert>, CoreError>;

    /// Persist revalued holdings (matched by id).
    async fn save_portfolio(&self, holdings: &[Holding]) -> Result<(), CoreError>;

    /// Persist evaluated alerts (matched by id).
    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), CoreError>;

    async fn get_currency_preference(&self, user_id: Uuid) -> Result<CurrencyCode, CoreError>;

    async fn set_currency_preference(
        &self,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<(), CoreError>;

    /// Full preferences of a user; defaults when none were saved.
    async fn get_preferences(&self, user_id: Uuid) -> Result<Preferences, CoreError>;

    async fn set_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> Result<(), CoreError>;

    async fn insert_holding(&self, holding: &Holding) -> Result<(), CoreError>;

    /// Delete a holding and cascade to its positions and alerts.
    async fn delete_holding(&self, holding_id: Uuid) -> Result<(), CoreError>;

    /// Positions of one holding, oldest purchase first.
    async fn list_positions(&self, holding_id: Uuid) -> Result<Vec<Position>, CoreError>;

    async fn insert_position(&self, position: &Position) -> Result<(), CoreError>;

    /// Replace a stored position (matched by id) within its holding.
    async fn update_position(&self, position: &Position) -> Result<(), CoreError>;

    async fn delete_position(&self, position_id: Uuid) -> Result<Position, CoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), CoreError>;

    async fn delete_alert(&self, alert_id: Uuid) -> Result<(), CoreError>;
}
