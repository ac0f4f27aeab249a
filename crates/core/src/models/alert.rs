use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::CoreError;

/// Which side of the threshold fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    /// Strict comparison: a price equal to the threshold never matches.
    pub fn is_met(&self, price: f64, threshold: f64) -> bool {
        match self {
            AlertCondition::Above => price > threshold,
            AlertCondition::Below => price < threshold,
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCondition::Above => write!(f, "above"),
            AlertCondition::Below => write!(f, "below"),
        }
    }
}

impl FromStr for AlertCondition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(CoreError::ValidationError(format!(
                "Unknown alert condition: {other}"
            ))),
        }
    }
}

/// Where the presentation layer should deliver a triggered alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NotificationChannel {
    #[default]
    #[serde(rename = "in-app")]
    InApp,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "telegram")]
    Telegram,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::InApp => write!(f, "in-app"),
            NotificationChannel::Email => write!(f, "email"),
            NotificationChannel::Telegram => write!(f, "telegram"),
        }
    }
}

impl FromStr for NotificationChannel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-app" | "in_app" | "inapp" => Ok(NotificationChannel::InApp),
            "email" => Ok(NotificationChannel::Email),
            "telegram" => Ok(NotificationChannel::Telegram),
            other => Err(CoreError::ValidationError(format!(
                "Unknown notification channel: {other}"
            ))),
        }
    }
}

/// A standing above/below price watch on a symbol.
///
/// Two states: pending (`triggered == false`) and triggered. The transition
/// is one-way; only an explicit reset re-arms the alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Holding this alert was created from, if any
    pub holding_id: Option<Uuid>,

    /// Ticker symbol, uppercased
    pub symbol: String,

    pub condition: AlertCondition,

    /// Threshold price
    pub price: f64,

    pub created_at: DateTime<Utc>,

    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,

    /// Whether the user has seen/dismissed the notification
    pub notification_sent: bool,

    pub channel: NotificationChannel,
}

impl Alert {
    pub fn new(
        user_id: Uuid,
        symbol: impl Into<String>,
        condition: AlertCondition,
        price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            holding_id: None,
            symbol: symbol.into().trim().to_uppercase(),
            condition,
            price,
            created_at: Utc::now(),
            triggered: false,
            triggered_at: None,
            notification_sent: false,
            channel: NotificationChannel::default(),
        }
    }

    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn for_holding(mut self, holding_id: Uuid) -> Self {
        self.holding_id = Some(holding_id);
        self
    }

    pub fn is_pending(&self) -> bool {
        !self.triggered
    }

    /// Triggered but not yet seen by the user.
    pub fn awaits_notification(&self) -> bool {
        self.triggered && !self.notification_sent
    }
}
