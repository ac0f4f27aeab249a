use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::currency::CurrencyCode;

/// Runtime configuration for a dashboard instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// API keys for providers that require them.
    /// Keys: provider name (e.g., "twelve_data").
    pub api_keys: HashMap<String, String>,

    /// Daily closes requested for technical analysis.
    pub history_size: usize,
}

impl Settings {
    pub fn with_api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.api_keys.insert(provider.into(), key.into());
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            history_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Which notification channels the user has enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub in_app: bool,
    pub email: bool,
    pub telegram: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            in_app: true,
            email: false,
            telegram: false,
        }
    }
}

/// Per-user preferences kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub currency: CurrencyCode,
    pub language: String,
    pub theme: Theme,
    pub notifications: NotificationPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::eur(),
            language: "de".to_string(),
            theme: Theme::default(),
            notifications: NotificationPreferences::default(),
        }
    }
}
