use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::alert::{Alert, AlertCondition, NotificationChannel};
use crate::models::quote::QuoteMap;

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvaluation {
    /// Every input alert, in input order, with transitions applied.
    pub updated: Vec<Alert>,

    /// Exactly the alerts that moved from pending to triggered in this pass.
    pub newly_triggered: Vec<Alert>,
}

/// Alert evaluation engine.
///
/// Decides which alerts crossed their threshold and flags them. It never
/// delivers notifications; the caller does that from `newly_triggered`.
pub struct AlertService;

impl AlertService {
    pub fn new() -> Self {
        Self
    }

    /// Build a new pending alert, rejecting thresholds that can never make sense.
    pub fn create(
        &self,
        user_id: Uuid,
        symbol: &str,
        condition: AlertCondition,
        price: f64,
        channel: NotificationChannel,
    ) -> Result<Alert, CoreError> {
        if symbol.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Alert symbol must not be empty".into(),
            ));
        }
        check_price(price)?;
        Ok(Alert::new(user_id, symbol, condition, price).with_channel(channel))
    }

    /// Change the threshold and channel of a pending alert.
    ///
    /// Triggered alerts must be reset first.
    pub fn update(
        &self,
        alert: &Alert,
        condition: AlertCondition,
        price: f64,
        channel: NotificationChannel,
    ) -> Result<Alert, CoreError> {
        if !alert.is_pending() {
            return Err(CoreError::ValidationError(format!(
                "Alert {} has already triggered; reset it before editing",
                alert.id
            )));
        }
        check_price(price)?;

        let mut updated = alert.clone();
        updated.condition = condition;
        updated.price = price;
        updated.channel = channel;
        Ok(updated)
    }

    /// Evaluate every pending alert against one quote snapshot.
    ///
    /// Already-triggered alerts and alerts without a quote pass through
    /// unchanged, which makes the pass idempotent.
    pub fn evaluate(&self, alerts: &[Alert], quotes: &QuoteMap, now: DateTime<Utc>) -> AlertEvaluation {
        let mut updated = Vec::with_capacity(alerts.len());
        let mut newly_triggered = Vec::new();

        for alert in alerts {
            if alert.triggered {
                updated.push(alert.clone());
                continue;
            }

            let Some(quote) = quotes.get(&alert.symbol) else {
                updated.push(alert.clone());
                continue;
            };

            if alert.condition.is_met(quote.price, alert.price) {
                let mut fired = alert.clone();
                fired.triggered = true;
                fired.triggered_at = Some(now);
                tracing::info!(
                    "Alert {} triggered: {} {} {} (quote {})",
                    fired.id,
                    fired.symbol,
                    fired.condition,
                    fired.price,
                    quote.price
                );
                newly_triggered.push(fired.clone());
                updated.push(fired);
            } else {
                updated.push(alert.clone());
            }
        }

        AlertEvaluation {
            updated,
            newly_triggered,
        }
    }

    /// Mark the notification as seen. Nothing else changes.
    #[must_use]
    pub fn dismiss(&self, alert: &Alert) -> Alert {
        let mut dismissed = alert.clone();
        dismissed.notification_sent = true;
        dismissed
    }

    /// Re-arm a triggered alert so it is evaluated again.
    #[must_use]
    pub fn reset(&self, alert: &Alert) -> Alert {
        let mut reset = alert.clone();
        reset.triggered = false;
        reset.triggered_at = None;
        reset.notification_sent = false;
        reset
    }

    /// Alerts still waiting for their threshold.
    pub fn active<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| a.is_pending()).collect()
    }

    /// Triggered alerts the user has not dismissed yet.
    pub fn pending_notifications<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| a.awaits_notification()).collect()
    }
}

fn check_price(price: f64) -> Result<(), CoreError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Alert price must be a positive number, got {price}"
        )));
    }
    Ok(())
}

impl Default for AlertService {
    fn default() -> Self {
        Self::new()
    }
}
