use std::collections::BTreeSet;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::quote::{Quote, QuoteMap};
use crate::models::symbol::SymbolMatch;
use crate::providers::registry::QuoteProviderRegistry;

/// Fetches quote snapshots from the registered providers with fallback.
///
/// Strategy:
/// - The first provider is asked for every symbol.
/// - Each following provider is asked only for the symbols still missing.
/// - A provider that fails is logged and skipped; the fetch fails only when
///   no provider succeeded at all.
///
/// Every quote returned is validated (finite, non-negative) before it can
/// reach the engines.
pub struct MarketDataService {
    registry: QuoteProviderRegistry,
}

impl MarketDataService {
    pub fn new(registry: QuoteProviderRegistry) -> Self {
        Self { registry }
    }

    /// Names of the configured providers in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Fetch one consistent snapshot for all `symbols`.
    ///
    /// Symbols are uppercased and de-duplicated. Symbols no provider could
    /// price are simply absent from the result.
    pub async fn fetch_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Result<QuoteMap, CoreError> {
        let wanted: BTreeSet<String> = symbols
            .iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut snapshot = QuoteMap::new();
        if wanted.is_empty() {
            return Ok(snapshot);
        }
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let mut succeeded = false;
        let mut last_error = None;

        for provider in self.registry.providers() {
            let missing: Vec<String> = wanted
                .iter()
                .filter(|s| !snapshot.contains_key(*s))
                .cloned()
                .collect();
            if missing.is_empty() {
                break;
            }

            match provider.fetch_quotes(&missing).await {
                Ok(quotes) => {
                    succeeded = true;
                    for (symbol, quote) in quotes {
                        let symbol = symbol.to_uppercase();
                        if !wanted.contains(&symbol) {
                            continue;
                        }
                        if !Self::is_valid(&quote) {
                            tracing::warn!(
                                "{} returned an invalid quote for {symbol}, dropping it",
                                provider.name()
                            );
                            continue;
                        }
                        snapshot.entry(symbol).or_insert(quote);
                    }
                }
                Err(e) => {
                    tracing::warn!("Quote provider {} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        if !succeeded {
            return Err(last_error.unwrap_or(CoreError::NoProvider));
        }

        let unpriced = wanted.len() - snapshot.len();
        if unpriced > 0 {
            tracing::debug!("{unpriced} of {} symbols have no quote", wanted.len());
        }
        Ok(snapshot)
    }

    /// Daily closes for one symbol from the first provider that has them.
    pub async fn get_time_series(
        &self,
        symbol: &str,
        outputsize: usize,
    ) -> Result<Vec<PricePoint>, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let symbol = symbol.trim().to_uppercase();
        let mut last_error = None;
        for provider in self.registry.providers() {
            match provider.get_time_series(&symbol, outputsize).await {
                Ok(points) if !points.is_empty() => return Ok(points),
                Ok(_) => tracing::debug!("{} has no history for {symbol}", provider.name()),
                Err(e) => {
                    tracing::warn!("Time series from {} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    /// Symbol search against the first provider that finds anything.
    ///
    /// A blank query finds nothing without asking any provider.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }

        let mut last_error = None;
        for provider in self.registry.providers() {
            match provider.search_symbols(query).await {
                Ok(matches) if !matches.is_empty() => return Ok(matches),
                Ok(_) => tracing::debug!("{} found nothing for '{query}'", provider.name()),
                Err(e) => {
                    tracing::warn!("Symbol search on {} failed: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    fn is_valid(quote: &Quote) -> bool {
        quote.price.is_finite()
            && quote.previous_close.is_finite()
            && quote.price >= 0.0
            && quote.previous_close >= 0.0
    }
}
