use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;

/// One instrument returned by a provider's symbol search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    /// Ticker symbol as the provider quotes it, uppercased
    pub symbol: String,

    /// Display name, e.g. "Apple Inc"
    pub name: String,

    pub exchange: String,

    /// Provider's instrument type, e.g. "Common Stock", "EQUITY", "ETF"
    pub instrument_type: String,

    /// Listing currency, when the provider reports one
    pub currency: Option<CurrencyCode>,
}

impl SymbolMatch {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        exchange: impl Into<String>,
        instrument_type: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            name: name.into(),
            exchange: exchange.into(),
            instrument_type: instrument_type.into(),
            currency: None,
        }
    }

    #[must_use]
    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = Some(currency);
        self
    }
}
