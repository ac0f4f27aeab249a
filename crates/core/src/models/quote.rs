use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::currency::CurrencyCode;

/// A point-in-time market snapshot for one symbol.
///
/// Providers only hand out quotes whose numeric fields parsed cleanly and are
/// finite; the engines rely on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol, uppercased
    pub symbol: String,

    /// Current close
    pub price: f64,

    pub previous_close: f64,

    pub currency: CurrencyCode,
}

impl Quote {
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        previous_close: f64,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            price,
            previous_close,
            currency,
        }
    }
}

/// One quote snapshot, keyed by uppercased symbol.
pub type QuoteMap = HashMap<String, Quote>;

/// Build a `QuoteMap` from a list of quotes. Later duplicates win.
pub fn quote_map(quotes: impl IntoIterator<Item = Quote>) -> QuoteMap {
    quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect()
}
