// ═══════════════════════════════════════════════════════════════════
// Integration Tests — Dashboard refresh cycle, holdings, alerts
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use folio_watch_core::errors::CoreError;
use folio_watch_core::models::alert::{Alert, AlertCondition, NotificationChannel};
use folio_watch_core::models::analysis::Sentiment;
use folio_watch_core::models::currency::CurrencyCode;
use folio_watch_core::models::holding::{Holding, HoldingCategory};
use folio_watch_core::models::position::Position;
use folio_watch_core::models::price::PricePoint;
use folio_watch_core::models::quote::{Quote, QuoteMap};
use folio_watch_core::models::settings::{Preferences, Settings, Theme};
use folio_watch_core::models::symbol::SymbolMatch;
use folio_watch_core::providers::registry::QuoteProviderRegistry;
use folio_watch_core::providers::traits::QuoteProvider;
use folio_watch_core::storage::memory::MemoryStore;
use folio_watch_core::storage::traits::PortfolioStore;
use folio_watch_core::Dashboard;

// ═══════════════════════════════════════════════════════════════════
// Test Doubles
// ═══════════════════════════════════════════════════════════════════

/// Quote provider whose prices can be moved between refreshes.
#[derive(Clone, Default)]
struct MockMarket {
    quotes: Arc<Mutex<QuoteMap>>,
    listings: Arc<Mutex<Vec<SymbolMatch>>>,
    offline: Arc<AtomicBool>,
}

impl MockMarket {
    fn set(&self, symbol: &str, price: f64, previous_close: f64) {
        let quote = Quote::new(symbol, price, previous_close, CurrencyCode::usd());
        self.quotes.lock().unwrap().insert(quote.symbol.clone(), quote);
    }

    fn list(&self, symbol: &str, name: &str) {
        let listing = SymbolMatch::new(symbol, name, "NASDAQ", "Common Stock")
            .with_currency(CurrencyCode::usd());
        self.listings.lock().unwrap().push(listing);
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteProvider for MockMarket {
    fn name(&self) -> &str {
        "MockMarket"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection refused".into()));
        }
        let quotes = self.quotes.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| quotes.get(s).cloned().map(|q| (s.clone(), q)))
            .collect())
    }

    async fn get_time_series(
        &self,
        _symbol: &str,
        outputsize: usize,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        Ok((0..outputsize)
            .map(|i| PricePoint {
                date: start + Duration::days(i as i64),
                price: 100.0 + i as f64,
            })
            .collect())
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection refused".into()));
        }
        let needle = query.to_lowercase();
        Ok(self
            .listings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.symbol.to_lowercase().contains(&needle) || m.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

/// MemoryStore that can be told to fail its writes.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_alert_saves: AtomicBool,
    fail_portfolio_saves: AtomicBool,
}

impl FlakyStore {
    fn refuse(&self, flag: &AtomicBool) -> Result<(), CoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(CoreError::Storage("disk full".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PortfolioStore for FlakyStore {
    async fn list_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, CoreError> {
        self.inner.list_holdings(user_id).await
    }

    async fn list_alerts(&self, user_id: Uuid) -> Result<Vec<Alert>, CoreError> {
        self.inner.list_alerts(user_id).await
    }

    async fn save_portfolio(&self, holdings: &[Holding]) -> Result<(), CoreError> {
        self.refuse(&self.fail_portfolio_saves)?;
        self.inner.save_portfolio(holdings).await
    }

    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), CoreError> {
        self.refuse(&self.fail_alert_saves)?;
        self.inner.save_alerts(alerts).await
    }

    async fn get_currency_preference(&self, user_id: Uuid) -> Result<CurrencyCode, CoreError> {
        self.inner.get_currency_preference(user_id).await
    }

    async fn set_currency_preference(
        &self,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<(), CoreError> {
        self.inner.set_currency_preference(user_id, currency).await
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Preferences, CoreError> {
        self.inner.get_preferences(user_id).await
    }

    async fn set_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> Result<(), CoreError> {
        self.inner.set_preferences(user_id, preferences).await
    }

    async fn insert_holding(&self, holding: &Holding) -> Result<(), CoreError> {
        self.inner.insert_holding(holding).await
    }

    async fn delete_holding(&self, holding_id: Uuid) -> Result<(), CoreError> {
        self.inner.delete_holding(holding_id).await
    }

    async fn list_positions(&self, holding_id: Uuid) -> Result<Vec<Position>, CoreError> {
        self.inner.list_positions(holding_id).await
    }

    async fn insert_position(&self, position: &Position) -> Result<(), CoreError> {
        self.inner.insert_position(position).await
    }

    async fn update_position(&self, position: &Position) -> Result<(), CoreError> {
        self.refuse(&self.fail_portfolio_saves)?;
        self.inner.update_position(position).await
    }

    async fn delete_position(&self, position_id: Uuid) -> Result<Position, CoreError> {
        self.inner.delete_position(position_id).await
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), CoreError> {
        self.inner.insert_alert(alert).await
    }

    async fn delete_alert(&self, alert_id: Uuid) -> Result<(), CoreError> {
        self.inner.delete_alert(alert_id).await
    }
}

/// Route library logs to the test output (`RUST_LOG=folio_watch_core=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dashboard_with(store: Arc<dyn PortfolioStore>, market: &MockMarket) -> Dashboard {
    init_tracing();
    let mut registry = QuoteProviderRegistry::new();
    registry.register(Box::new(market.clone()));
    Dashboard::with_registry(Uuid::new_v4(), store, registry, Settings::default())
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn purchase_date() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 5, 9, 0, 0).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Holdings & positions
// ═══════════════════════════════════════════════════════════════════

mod holdings {
    use super::*;

    #[tokio::test]
    async fn recording_positions_updates_totals() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        let btc = dash.add_holding("btc", "Bitcoin", HoldingCategory::Crypto).await.unwrap();
        assert_eq!(btc.symbol, "BTC");
        assert_eq!(btc.total_quantity, Some(0.0));

        dash.record_position(btc.id, 5000.0, 1.5, purchase_date(), 0.0, None)
            .await
            .unwrap();
        let second = dash
            .record_position(btc.id, 4000.0, 0.5, purchase_date(), 25.0, Some("dip".into()))
            .await
            .unwrap();
        assert_eq!(second.notes.as_deref(), Some("dip"));

        let stored = dash.holdings().await.unwrap();
        assert!(approx(stored[0].quantity(), 2.0));
        assert!(approx(stored[0].cost(), 7500.0 + 2000.0 + 25.0));
        assert_eq!(dash.positions(btc.id).await.unwrap().len(), 2);

        dash.remove_position(btc.id, second.id).await.unwrap();
        let stored = dash.holdings().await.unwrap();
        assert!(approx(stored[0].quantity(), 1.5));
        assert!(approx(stored[0].cost(), 7500.0));
    }

    #[tokio::test]
    async fn invalid_position_is_not_stored() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("AAPL", "Apple", HoldingCategory::Equity).await.unwrap();

        let result = dash.record_position(h.id, 100.0, 0.0, purchase_date(), 0.0, None).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(dash.positions(h.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_holding_is_not_found() {
        let store: Arc<dyn PortfolioStore> = Arc::new(MemoryStore::new());
        let market = MockMarket::default();
        let alice = dashboard_with(store.clone(), &market);
        let bob = dashboard_with(store, &market);

        let h = alice.add_holding("AAPL", "Apple", HoldingCategory::Equity).await.unwrap();
        assert!(matches!(
            bob.record_position(h.id, 1.0, 1.0, purchase_date(), 0.0, None).await,
            Err(CoreError::HoldingNotFound(_))
        ));
        assert!(matches!(bob.delete_holding(h.id).await, Err(CoreError::HoldingNotFound(_))));
        assert_eq!(alice.holdings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removing_unknown_position_fails() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("AAPL", "Apple", HoldingCategory::Equity).await.unwrap();
        assert!(matches!(
            dash.remove_position(h.id, Uuid::new_v4()).await,
            Err(CoreError::PositionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_symbol_is_rejected() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        assert!(matches!(
            dash.add_holding("  ", "Nothing", HoldingCategory::Fund).await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn deleting_holding_removes_its_alerts() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("ETH", "Ether", HoldingCategory::Crypto).await.unwrap();
        let linked = dash
            .create_alert_for_holding(h.id, AlertCondition::Below, 1000.0, NotificationChannel::Email)
            .await
            .unwrap();
        assert_eq!(linked.symbol, "ETH");
        assert_eq!(linked.holding_id, Some(h.id));
        dash.create_alert("BTC", AlertCondition::Above, 1.0, NotificationChannel::InApp)
            .await
            .unwrap();

        dash.delete_holding(h.id).await.unwrap();
        let alerts = dash.alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].symbol, "BTC");
    }

    #[tokio::test]
    async fn updating_holding_keeps_symbol_and_lots() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("VWRL", "Vanguard", HoldingCategory::Equity).await.unwrap();
        dash.record_position(h.id, 100.0, 3.0, purchase_date(), 0.0, None)
            .await
            .unwrap();

        let updated = dash
            .update_holding(h.id, " Vanguard FTSE All-World ", HoldingCategory::Etf)
            .await
            .unwrap();
        assert_eq!(updated.name, "Vanguard FTSE All-World");
        assert_eq!(updated.category, HoldingCategory::Etf);

        let stored = dash.holdings().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].symbol, "VWRL");
        assert_eq!(stored[0].category, HoldingCategory::Etf);
        assert!(approx(stored[0].quantity(), 3.0));
        assert!(matches!(
            dash.update_holding(Uuid::new_v4(), "x", HoldingCategory::Fund).await,
            Err(CoreError::HoldingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn updating_position_reaggregates() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("BTC", "Bitcoin", HoldingCategory::Crypto).await.unwrap();
        let lot = dash
            .record_position(h.id, 5000.0, 1.0, purchase_date(), 0.0, None)
            .await
            .unwrap();

        let fixed = dash
            .update_position(h.id, lot.id, 4500.0, 2.0, purchase_date(), 10.0, Some("typo".into()))
            .await
            .unwrap();
        assert_eq!(fixed.id, lot.id);

        let positions = dash.positions(h.id).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].notes.as_deref(), Some("typo"));
        let stored = dash.holdings().await.unwrap();
        assert!(approx(stored[0].quantity(), 2.0));
        assert!(approx(stored[0].cost(), 9010.0));
    }

    #[tokio::test]
    async fn invalid_position_update_is_rejected() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let h = dash.add_holding("BTC", "Bitcoin", HoldingCategory::Crypto).await.unwrap();
        let lot = dash
            .record_position(h.id, 5000.0, 1.0, purchase_date(), 0.0, None)
            .await
            .unwrap();

        let result = dash
            .update_position(h.id, lot.id, 5000.0, -1.0, purchase_date(), 0.0, None)
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert_eq!(dash.positions(h.id).await.unwrap()[0], lot);

        let other = dash.add_holding("ETH", "Ether", HoldingCategory::Crypto).await.unwrap();
        assert!(matches!(
            dash.update_position(other.id, lot.id, 1.0, 1.0, purchase_date(), 0.0, None)
                .await,
            Err(CoreError::PositionNotFound(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Refresh cycle
// ═══════════════════════════════════════════════════════════════════

mod refresh {
    use super::*;

    async fn seeded(store: Arc<dyn PortfolioStore>, market: &MockMarket) -> Dashboard {
        let dash = dashboard_with(store, market);
        let btc = dash.add_holding("BTC", "Bitcoin", HoldingCategory::Crypto).await.unwrap();
        dash.record_position(btc.id, 5000.0, 2.0, purchase_date(), 0.0, None)
            .await
            .unwrap();
        dash.create_alert("AAPL", AlertCondition::Below, 150.0, NotificationChannel::InApp)
            .await
            .unwrap();
        dash
    }

    #[tokio::test]
    async fn values_portfolio_and_fires_alerts_from_one_snapshot() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        market.set("AAPL", 149.0, 152.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;
        assert!(dash.last_report().is_none());

        let now = Utc.with_ymd_and_hms(2025, 3, 14, 16, 0, 0).unwrap();
        let report = dash.refresh_at(now).await.unwrap();

        assert!(approx(report.summary.total_value, 12_000.0));
        assert!(approx(report.summary.daily_change, 400.0));
        assert_eq!(report.summary.total_assets, 1);
        assert_eq!(report.summary.currency, CurrencyCode::eur());
        assert!(report.unpriced_symbols.is_empty());

        assert_eq!(report.newly_triggered.len(), 1);
        assert_eq!(report.newly_triggered[0].triggered_at, Some(now));
        assert_eq!(dash.last_report(), Some(&report));

        // persisted
        let stored = dash.holdings().await.unwrap();
        assert!(approx(stored[0].market_value(), 12_000.0));
        assert_eq!(dash.pending_notifications().await.unwrap().len(), 1);
        assert!(dash.active_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_refresh_does_not_refire() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        market.set("AAPL", 149.0, 152.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;

        dash.refresh().await.unwrap();
        market.set("AAPL", 140.0, 149.0);
        let second = dash.refresh().await.unwrap();
        assert!(second.newly_triggered.is_empty());
    }

    #[tokio::test]
    async fn unpriced_symbols_are_reported() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;

        let report = dash.refresh().await.unwrap();
        assert_eq!(report.unpriced_symbols, vec!["AAPL".to_string()]);
        assert!(report.newly_triggered.is_empty());
    }

    #[tokio::test]
    async fn uses_stored_currency_preference() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;
        dash.set_display_currency("usd").await.unwrap();

        let report = dash.refresh().await.unwrap();
        assert_eq!(report.summary.currency, CurrencyCode::usd());
        assert!(dash.set_display_currency("dollars").await.is_err());
    }

    #[tokio::test]
    async fn quote_failure_keeps_previous_report() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;

        let first = dash.refresh().await.unwrap();
        market.go_offline();
        let result = dash.refresh().await;

        assert!(matches!(result, Err(CoreError::Network(_))));
        assert_eq!(dash.last_report(), Some(&first));
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_cycle() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        market.set("AAPL", 149.0, 152.0);
        let store = Arc::new(FlakyStore::default());
        let mut dash = seeded(store.clone(), &market).await;

        store.fail_alert_saves.store(true, Ordering::SeqCst);
        let result = dash.refresh().await;
        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(dash.last_report().is_none());
        assert_eq!(dash.active_alerts().await.unwrap().len(), 1);

        // a retry after recovery fires the alert exactly once
        store.fail_alert_saves.store(false, Ordering::SeqCst);
        let report = dash.refresh().await.unwrap();
        assert_eq!(report.newly_triggered.len(), 1);
    }

    #[tokio::test]
    async fn portfolio_save_failure_skips_alert_save() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        market.set("AAPL", 149.0, 152.0);
        let store = Arc::new(FlakyStore::default());
        let mut dash = seeded(store.clone(), &market).await;

        store.fail_portfolio_saves.store(true, Ordering::SeqCst);
        assert!(dash.refresh().await.is_err());
        assert!(dash.pending_notifications().await.unwrap().is_empty());
        assert!(dash.holdings().await.unwrap()[0].valuation.is_none());
    }

    #[tokio::test]
    async fn summary_reads_stored_valuation() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;

        assert_eq!(dash.summary().await.unwrap().total_value, 0.0);
        dash.refresh().await.unwrap();
        assert!(approx(dash.summary().await.unwrap().total_value, 12_000.0));

        // position changes between refreshes are reflected at the last price
        let btc = dash.holdings().await.unwrap().remove(0);
        let lot = dash
            .record_position(btc.id, 5000.0, 1.0, purchase_date(), 0.0, None)
            .await
            .unwrap();
        let summary = dash.summary().await.unwrap();
        assert!(approx(summary.total_value, 18_000.0));
        assert!(approx(summary.daily_change, 600.0));

        dash.remove_position(btc.id, lot.id).await.unwrap();
        assert!(approx(dash.summary().await.unwrap().total_value, 12_000.0));
    }

    #[tokio::test]
    async fn recording_a_position_revalues_at_last_price() {
        let market = MockMarket::default();
        market.set("BTC", 6000.0, 5800.0);
        let mut dash = seeded(Arc::new(MemoryStore::new()), &market).await;
        dash.refresh().await.unwrap();

        let btc = dash.holdings().await.unwrap().remove(0);
        dash.record_position(btc.id, 5000.0, 8.0, purchase_date(), 0.0, None)
            .await
            .unwrap();

        let stored = dash.holdings().await.unwrap().remove(0);
        let v = stored.valuation.expect("valuation kept");
        assert!(approx(stored.quantity(), 10.0));
        assert!(approx(stored.cost(), 50_000.0));
        assert!(approx(v.market_value, 60_000.0));
        assert!(approx(v.total_gain_loss, 10_000.0));
        assert!(approx(dash.summary().await.unwrap().total_value, 6000.0 * 10.0));
    }

    #[tokio::test]
    async fn empty_portfolio_refreshes_without_quotes() {
        let market = MockMarket::default();
        market.go_offline();
        let mut dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        let report = dash.refresh().await.unwrap();
        assert_eq!(report.summary.total_assets, 0);
        assert_eq!(report.summary.total_value, 0.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Alerts
// ═══════════════════════════════════════════════════════════════════

mod alerts {
    use super::*;

    #[tokio::test]
    async fn dismiss_and_reset() {
        let market = MockMarket::default();
        market.set("BTC", 80_000.0, 79_000.0);
        let mut dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let alert = dash
            .create_alert("BTC", AlertCondition::Above, 75_000.0, NotificationChannel::Telegram)
            .await
            .unwrap();

        dash.refresh().await.unwrap();
        assert_eq!(dash.pending_notifications().await.unwrap().len(), 1);

        let dismissed = dash.dismiss_alert(alert.id).await.unwrap();
        assert!(dismissed.triggered);
        assert!(dismissed.notification_sent);
        assert!(dash.pending_notifications().await.unwrap().is_empty());

        dash.reset_alert(alert.id).await.unwrap();
        assert_eq!(dash.active_alerts().await.unwrap().len(), 1);
        let report = dash.refresh().await.unwrap();
        assert_eq!(report.newly_triggered.len(), 1);
    }

    #[tokio::test]
    async fn invalid_alert_is_rejected() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let result = dash
            .create_alert("BTC", AlertCondition::Above, -5.0, NotificationChannel::InApp)
            .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(dash.alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_alert_ids() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let id = Uuid::new_v4();
        assert!(matches!(dash.dismiss_alert(id).await, Err(CoreError::AlertNotFound(_))));
        assert!(matches!(dash.reset_alert(id).await, Err(CoreError::AlertNotFound(_))));
        assert!(matches!(dash.delete_alert(id).await, Err(CoreError::AlertNotFound(_))));
    }

    #[tokio::test]
    async fn delete_alert() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let alert = dash
            .create_alert("BTC", AlertCondition::Below, 10.0, NotificationChannel::InApp)
            .await
            .unwrap();
        dash.delete_alert(alert.id).await.unwrap();
        assert!(dash.alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_alert_can_be_edited() {
        let market = MockMarket::default();
        market.set("BTC", 80_000.0, 79_000.0);
        let mut dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let alert = dash
            .create_alert("BTC", AlertCondition::Above, 90_000.0, NotificationChannel::InApp)
            .await
            .unwrap();

        let edited = dash
            .update_alert(alert.id, AlertCondition::Above, 75_000.0, NotificationChannel::Telegram)
            .await
            .unwrap();
        assert_eq!(edited.id, alert.id);
        assert_eq!(edited.symbol, "BTC");
        assert_eq!(edited.channel, NotificationChannel::Telegram);
        assert_eq!(dash.alerts().await.unwrap(), vec![edited.clone()]);

        // the new threshold is what the next refresh evaluates
        let report = dash.refresh().await.unwrap();
        assert_eq!(report.newly_triggered.len(), 1);
        assert_eq!(report.newly_triggered[0].price, 75_000.0);
    }

    #[tokio::test]
    async fn triggered_or_invalid_edits_are_rejected() {
        let market = MockMarket::default();
        market.set("BTC", 80_000.0, 79_000.0);
        let mut dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let alert = dash
            .create_alert("BTC", AlertCondition::Above, 90_000.0, NotificationChannel::InApp)
            .await
            .unwrap();

        assert!(matches!(
            dash.update_alert(alert.id, AlertCondition::Below, 0.0, NotificationChannel::InApp)
                .await,
            Err(CoreError::ValidationError(_))
        ));
        assert_eq!(dash.alerts().await.unwrap()[0].price, 90_000.0);

        dash.update_alert(alert.id, AlertCondition::Above, 70_000.0, NotificationChannel::InApp)
            .await
            .unwrap();
        dash.refresh().await.unwrap();
        assert!(matches!(
            dash.update_alert(alert.id, AlertCondition::Above, 85_000.0, NotificationChannel::InApp)
                .await,
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            dash.update_alert(Uuid::new_v4(), AlertCondition::Above, 1.0, NotificationChannel::InApp)
                .await,
            Err(CoreError::AlertNotFound(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Analysis & configuration
// ═══════════════════════════════════════════════════════════════════

mod analysis {
    use super::*;

    #[tokio::test]
    async fn analyze_uses_configured_history_size() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        let result = dash.analyze("msft").await.unwrap();
        assert_eq!(result.symbol, "MSFT");
        assert_eq!(result.sample_size, dash.settings().history_size);
        assert_eq!(result.sentiment, Sentiment::Bullish);
    }

    #[tokio::test]
    async fn short_history_is_insufficient() {
        let market = MockMarket::default();
        let mut registry = QuoteProviderRegistry::new();
        registry.register(Box::new(market));
        let settings = Settings {
            history_size: 20,
            ..Settings::default()
        };
        let dash = Dashboard::with_registry(
            Uuid::new_v4(),
            Arc::new(MemoryStore::new()),
            registry,
            settings,
        );

        assert!(matches!(
            dash.analyze("MSFT").await,
            Err(CoreError::InsufficientData { got: 20, .. })
        ));
    }

    #[test]
    fn provider_names_and_debug() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        assert_eq!(dash.provider_names(), vec!["MockMarket".to_string()]);
        assert!(format!("{dash:?}").contains("MockMarket"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Preferences
// ═══════════════════════════════════════════════════════════════════

mod preferences {
    use super::*;

    #[tokio::test]
    async fn defaults_until_saved() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        assert_eq!(dash.preferences().await.unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn saved_preferences_round_trip_and_drive_the_summary() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        let mut prefs = dash.preferences().await.unwrap();
        prefs.language = "en".into();
        prefs.theme = Theme::Light;
        prefs.notifications.telegram = true;
        prefs.currency = CurrencyCode::usd();
        dash.set_preferences(&prefs).await.unwrap();

        assert_eq!(dash.preferences().await.unwrap(), prefs);
        assert_eq!(dash.summary().await.unwrap().currency, CurrencyCode::usd());

        // the currency shortcut only touches the currency
        dash.set_display_currency("chf").await.unwrap();
        let stored = dash.preferences().await.unwrap();
        assert_eq!(stored.currency.as_str(), "CHF");
        assert_eq!(stored.theme, Theme::Light);
        assert_eq!(stored.language, "en");
    }

    #[tokio::test]
    async fn blank_language_is_rejected() {
        let market = MockMarket::default();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);
        let prefs = Preferences {
            language: "  ".into(),
            ..Preferences::default()
        };
        assert!(matches!(
            dash.set_preferences(&prefs).await,
            Err(CoreError::ValidationError(_))
        ));
        assert_eq!(dash.preferences().await.unwrap(), Preferences::default());
    }

    #[tokio::test]
    async fn preferences_are_per_user() {
        let store: Arc<dyn PortfolioStore> = Arc::new(MemoryStore::new());
        let market = MockMarket::default();
        let alice = dashboard_with(store.clone(), &market);
        let bob = dashboard_with(store, &market);

        let prefs = Preferences {
            theme: Theme::Light,
            ..Preferences::default()
        };
        alice.set_preferences(&prefs).await.unwrap();
        assert_eq!(bob.preferences().await.unwrap().theme, Theme::Dark);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Symbol search
// ═══════════════════════════════════════════════════════════════════

mod search {
    use super::*;

    #[tokio::test]
    async fn finds_by_symbol_or_name() {
        let market = MockMarket::default();
        market.list("AAPL", "Apple Inc");
        market.list("MSFT", "Microsoft Corporation");
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        let by_name = dash.search_symbols("apple").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].symbol, "AAPL");
        assert_eq!(by_name[0].currency, Some(CurrencyCode::usd()));

        let by_symbol = dash.search_symbols("msf").await.unwrap();
        assert_eq!(by_symbol[0].name, "Microsoft Corporation");
        assert!(dash.search_symbols("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_query_finds_nothing_even_offline() {
        let market = MockMarket::default();
        market.list("AAPL", "Apple Inc");
        market.go_offline();
        let dash = dashboard_with(Arc::new(MemoryStore::new()), &market);

        assert!(dash.search_symbols("   ").await.unwrap().is_empty());
        assert!(matches!(
            dash.search_symbols("apple").await,
            Err(CoreError::Network(_))
        ));
    }
}
