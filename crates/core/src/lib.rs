pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use errors::CoreError;
use models::{
    alert::{Alert, AlertCondition, NotificationChannel},
    analysis::ChartAnalysis,
    currency::CurrencyCode,
    holding::{Holding, HoldingCategory},
    position::Position,
    settings::{Preferences, Settings},
    summary::PortfolioSummary,
    symbol::SymbolMatch,
};
use providers::registry::QuoteProviderRegistry;
use services::{
    alert_service::AlertService, analysis_service::AnalysisService,
    market_data_service::MarketDataService, position_service::PositionService,
    valuation_service::ValuationService,
};
use storage::traits::PortfolioStore;

/// Everything the presentation layer needs after one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub refreshed_at: DateTime<Utc>,
    pub summary: PortfolioSummary,

    /// Revalued holdings, in storage order
    pub holdings: Vec<Holding>,

    /// All alerts after evaluation
    pub alerts: Vec<Alert>,

    /// Alerts that fired in this cycle; the caller delivers the notifications
    pub newly_triggered: Vec<Alert>,

    /// Symbols no provider could price in this cycle
    pub unpriced_symbols: Vec<String>,
}

/// Main entry point for the Folio Watch core library.
///
/// Wires one user's storage and market data to the valuation and alert
/// engines. The store and the quote providers are injected, so any backend
/// (or a test fake) can sit behind them.
#[must_use]
pub struct Dashboard {
    user_id: Uuid,
    store: Arc<dyn PortfolioStore>,
    market_data: MarketDataService,
    valuation_service: ValuationService,
    alert_service: AlertService,
    position_service: PositionService,
    analysis_service: AnalysisService,
    settings: Settings,
    /// Result of the last successful refresh, kept when a later one fails.
    last_report: Option<RefreshReport>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("user_id", &self.user_id)
            .field("providers", &self.market_data.provider_names())
            .field("last_refresh", &self.last_report.as_ref().map(|r| r.refreshed_at))
            .finish()
    }
}

impl Dashboard {
    /// Create a dashboard with the default quote providers for `settings`.
    pub fn new(user_id: Uuid, store: Arc<dyn PortfolioStore>, settings: Settings) -> Self {
        let registry = QuoteProviderRegistry::new_with_defaults(&settings.api_keys);
        Self::with_registry(user_id, store, registry, settings)
    }

    /// Create a dashboard with an explicit provider registry.
    pub fn with_registry(
        user_id: Uuid,
        store: Arc<dyn PortfolioStore>,
        registry: QuoteProviderRegistry,
        settings: Settings,
    ) -> Self {
        Self {
            user_id,
            store,
            market_data: MarketDataService::new(registry),
            valuation_service: ValuationService::new(),
            alert_service: AlertService::new(),
            position_service: PositionService::new(),
            analysis_service: AnalysisService::new(),
            settings,
            last_report: None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The last successful refresh, if any. Stale after a failed cycle.
    #[must_use]
    pub fn last_report(&self) -> Option<&RefreshReport> {
        self.last_report.as_ref()
    }

    // ── Refresh Cycle ───────────────────────────────────────────────

    /// Run one valuation cycle at the current time.
    pub async fn refresh(&mut self) -> Result<RefreshReport, CoreError> {
        self.refresh_at(Utc::now()).await
    }

    /// Run one valuation cycle, stamping newly triggered alerts with `now`.
    ///
    /// 1. Load holdings, alerts and the currency preference.
    /// 2. Fetch ONE quote snapshot for every symbol involved.
    /// 3. Revalue holdings and evaluate alerts against that snapshot.
    /// 4. Persist holdings, then alerts.
    ///
    /// Any failure aborts the cycle; nothing is written after the failing
    /// step and `last_report()` keeps the previous result.
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<RefreshReport, CoreError> {
        let holdings = self.store.list_holdings(self.user_id).await?;
        let alerts = self.store.list_alerts(self.user_id).await?;
        let currency = self.store.get_currency_preference(self.user_id).await?;

        let symbols: BTreeSet<String> = holdings
            .iter()
            .map(|h| h.symbol.clone())
            .chain(alerts.iter().filter(|a| a.is_pending()).map(|a| a.symbol.clone()))
            .collect();
        let symbols: Vec<String> = symbols.into_iter().collect();

        let quotes = self.market_data.fetch_quotes(&symbols).await?;

        let revalued = self.valuation_service.revalue(&holdings, &quotes);
        let evaluation = self.alert_service.evaluate(&alerts, &quotes, now);
        let summary = self.valuation_service.summarize(&revalued, &currency);

        self.store.save_portfolio(&revalued).await?;
        self.store.save_alerts(&evaluation.updated).await?;

        let unpriced_symbols: Vec<String> = symbols
            .into_iter()
            .filter(|s| !quotes.contains_key(s))
            .collect();

        tracing::info!(
            "Refreshed {} holdings ({} {:.2}), {} alerts triggered, {} symbols unpriced",
            revalued.len(),
            summary.currency,
            summary.total_value,
            evaluation.newly_triggered.len(),
            unpriced_symbols.len()
        );

        let report = RefreshReport {
            refreshed_at: now,
            summary,
            holdings: revalued,
            alerts: evaluation.updated,
            newly_triggered: evaluation.newly_triggered,
            unpriced_symbols,
        };
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Summary of the stored holdings without fetching new quotes.
    pub async fn summary(&self) -> Result<PortfolioSummary, CoreError> {
        let holdings = self.store.list_holdings(self.user_id).await?;
        let currency = self.store.get_currency_preference(self.user_id).await?;
        Ok(self.valuation_service.summarize(&holdings, &currency))
    }

    pub async fn set_display_currency(&self, currency: &str) -> Result<(), CoreError> {
        let code = CurrencyCode::new(currency)?;
        self.store.set_currency_preference(self.user_id, code).await
    }

    // ── Preferences ─────────────────────────────────────────────────

    pub async fn preferences(&self) -> Result<Preferences, CoreError> {
        self.store.get_preferences(self.user_id).await
    }

    /// Replace the user's preferences, display currency included.
    pub async fn set_preferences(&self, preferences: &Preferences) -> Result<(), CoreError> {
        if preferences.language.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Preferred language must not be empty".into(),
            ));
        }
        self.store.set_preferences(self.user_id, preferences).await
    }

    // ── Holdings & Positions ────────────────────────────────────────

    pub async fn holdings(&self) -> Result<Vec<Holding>, CoreError> {
        self.store.list_holdings(self.user_id).await
    }

    /// Start tracking a new instrument with no positions yet.
    pub async fn add_holding(
        &self,
        symbol: &str,
        name: &str,
        category: HoldingCategory,
    ) -> Result<Holding, CoreError> {
        if symbol.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Holding symbol must not be empty".into(),
            ));
        }
        let holding = Holding::new(self.user_id, symbol, name, category).with_totals(0.0, 0.0);
        self.store.insert_holding(&holding).await?;
        Ok(holding)
    }

    /// Rename or recategorize a holding. Symbol, lots and valuation are kept.
    pub async fn update_holding(
        &self,
        holding_id: Uuid,
        name: &str,
        category: HoldingCategory,
    ) -> Result<Holding, CoreError> {
        let mut holding = self.owned_holding(holding_id).await?;
        holding.name = name.trim().to_string();
        holding.category = category;
        holding.updated_at = Utc::now();
        self.store.save_portfolio(std::slice::from_ref(&holding)).await?;
        Ok(holding)
    }

    /// Delete a holding; its positions and alerts go with it.
    pub async fn delete_holding(&self, holding_id: Uuid) -> Result<(), CoreError> {
        self.owned_holding(holding_id).await?;
        self.store.delete_holding(holding_id).await
    }

    pub async fn positions(&self, holding_id: Uuid) -> Result<Vec<Position>, CoreError> {
        self.owned_holding(holding_id).await?;
        self.store.list_positions(holding_id).await
    }

    /// Record a purchase lot and refresh the holding's quantity and cost.
    pub async fn record_position(
        &self,
        holding_id: Uuid,
        purchase_price: f64,
        quantity: f64,
        purchase_date: DateTime<Utc>,
        fees: f64,
        notes: Option<String>,
    ) -> Result<Position, CoreError> {
        let holding = self.owned_holding(holding_id).await?;
        let mut position =
            Position::new(holding_id, self.user_id, purchase_price, quantity, purchase_date)
                .with_fees(fees);
        position.notes = notes;

        self.position_service.validate(&holding, &position)?;
        self.store.insert_position(&position).await?;
        self.reaggregate(&holding).await?;
        Ok(position)
    }

    /// Correct a recorded lot and refresh the holding's quantity and cost.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_position(
        &self,
        holding_id: Uuid,
        position_id: Uuid,
        purchase_price: f64,
        quantity: f64,
        purchase_date: DateTime<Utc>,
        fees: f64,
        notes: Option<String>,
    ) -> Result<Position, CoreError> {
        let holding = self.owned_holding(holding_id).await?;
        let mut position = self
            .store
            .list_positions(holding_id)
            .await?
            .into_iter()
            .find(|p| p.id == position_id)
            .ok_or_else(|| CoreError::PositionNotFound(position_id.to_string()))?;
        position.purchase_price = purchase_price;
        position.quantity = quantity;
        position.purchase_date = purchase_date;
        position.fees = fees;
        position.notes = notes;

        self.position_service.validate(&holding, &position)?;
        self.store.update_position(&position).await?;
        self.reaggregate(&holding).await?;
        Ok(position)
    }

    /// Remove a purchase lot and refresh the holding's quantity and cost.
    pub async fn remove_position(&self, holding_id: Uuid, position_id: Uuid) -> Result<(), CoreError> {
        let holding = self.owned_holding(holding_id).await?;
        let positions = self.store.list_positions(holding_id).await?;
        if !positions.iter().any(|p| p.id == position_id) {
            return Err(CoreError::PositionNotFound(position_id.to_string()));
        }
        self.store.delete_position(position_id).await?;
        self.reaggregate(&holding).await
    }

    // ── Alerts ──────────────────────────────────────────────────────

    pub async fn alerts(&self) -> Result<Vec<Alert>, CoreError> {
        self.store.list_alerts(self.user_id).await
    }

    /// Alerts still waiting for their threshold.
    pub async fn active_alerts(&self) -> Result<Vec<Alert>, CoreError> {
        let alerts = self.alerts().await?;
        Ok(self.alert_service.active(&alerts).into_iter().cloned().collect())
    }

    /// Triggered alerts the user has not dismissed yet.
    pub async fn pending_notifications(&self) -> Result<Vec<Alert>, CoreError> {
        let alerts = self.alerts().await?;
        Ok(self
            .alert_service
            .pending_notifications(&alerts)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn create_alert(
        &self,
        symbol: &str,
        condition: AlertCondition,
        price: f64,
        channel: NotificationChannel,
    ) -> Result<Alert, CoreError> {
        let alert = self
            .alert_service
            .create(self.user_id, symbol, condition, price, channel)?;
        self.store.insert_alert(&alert).await?;
        Ok(alert)
    }

    /// Create an alert tied to one of the user's holdings.
    pub async fn create_alert_for_holding(
        &self,
        holding_id: Uuid,
        condition: AlertCondition,
        price: f64,
        channel: NotificationChannel,
    ) -> Result<Alert, CoreError> {
        let holding = self.owned_holding(holding_id).await?;
        let alert = self
            .alert_service
            .create(self.user_id, &holding.symbol, condition, price, channel)?
            .for_holding(holding_id);
        self.store.insert_alert(&alert).await?;
        Ok(alert)
    }

    /// Change condition, threshold or channel of an alert that has not fired.
    pub async fn update_alert(
        &self,
        alert_id: Uuid,
        condition: AlertCondition,
        price: f64,
        channel: NotificationChannel,
    ) -> Result<Alert, CoreError> {
        let alert = self.owned_alert(alert_id).await?;
        let updated = self.alert_service.update(&alert, condition, price, channel)?;
        self.store.save_alerts(std::slice::from_ref(&updated)).await?;
        Ok(updated)
    }

    /// Mark a triggered alert's notification as seen.
    pub async fn dismiss_alert(&self, alert_id: Uuid) -> Result<Alert, CoreError> {
        let alert = self.owned_alert(alert_id).await?;
        let dismissed = self.alert_service.dismiss(&alert);
        self.store.save_alerts(std::slice::from_ref(&dismissed)).await?;
        Ok(dismissed)
    }

    /// Re-arm a triggered alert.
    pub async fn reset_alert(&self, alert_id: Uuid) -> Result<Alert, CoreError> {
        let alert = self.owned_alert(alert_id).await?;
        let reset = self.alert_service.reset(&alert);
        self.store.save_alerts(std::slice::from_ref(&reset)).await?;
        Ok(reset)
    }

    pub async fn delete_alert(&self, alert_id: Uuid) -> Result<(), CoreError> {
        self.owned_alert(alert_id).await?;
        self.store.delete_alert(alert_id).await
    }

    // ── Analysis ────────────────────────────────────────────────────

    /// Technical analysis (RSI, MACD, Bollinger) from recent daily closes.
    pub async fn analyze(&self, symbol: &str) -> Result<ChartAnalysis, CoreError> {
        let history = self
            .market_data
            .get_time_series(symbol, self.settings.history_size)
            .await?;
        self.analysis_service.analyze(symbol, &history)
    }

    // ── Market Data ─────────────────────────────────────────────────

    /// Look up instruments by ticker or name, e.g. before `add_holding`.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        self.market_data.search_symbols(query).await
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.market_data.provider_names()
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn owned_holding(&self, holding_id: Uuid) -> Result<Holding, CoreError> {
        self.store
            .list_holdings(self.user_id)
            .await?
            .into_iter()
            .find(|h| h.id == holding_id)
            .ok_or_else(|| CoreError::HoldingNotFound(holding_id.to_string()))
    }

    async fn owned_alert(&self, alert_id: Uuid) -> Result<Alert, CoreError> {
        self.store
            .list_alerts(self.user_id)
            .await?
            .into_iter()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| CoreError::AlertNotFound(alert_id.to_string()))
    }

    async fn reaggregate(&self, holding: &Holding) -> Result<(), CoreError> {
        let positions = self.store.list_positions(holding.id).await?;
        let updated = self.position_service.aggregate(holding, &positions);
        self.store.save_portfolio(std::slice::from_ref(&updated)).await
    }
}
