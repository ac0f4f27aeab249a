use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::quote::QuoteMap;
use crate::models::symbol::SymbolMatch;

/// Trait abstraction for market-data sources.
///
/// Each quote API (Twelve Data, Yahoo Finance) implements this trait, and the
/// dashboard only ever sees the trait object, so tests can plug in fakes.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the latest quote for each symbol in one snapshot.
    ///
    /// Unknown or unsupported symbols are omitted from the map, not reported
    /// as errors. A symbol whose numeric fields do not parse cleanly is
    /// omitted too. `Err` means the provider as a whole failed.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, CoreError>;

    /// Daily closes for a symbol, oldest first, at most `outputsize` points.
    async fn get_time_series(
        &self,
        symbol: &str,
        outputsize: usize,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Instruments whose symbol or name matches `query`, best match first.
    ///
    /// Providers without a search endpoint find nothing.
    async fn search_symbols(&self, _query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        Ok(Vec::new())
    }
}
