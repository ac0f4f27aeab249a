use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use time::OffsetDateTime;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::currency::CurrencyCode;
use crate::models::price::PricePoint;
use crate::models::quote::{Quote, QuoteMap};
use crate::models::symbol::SymbolMatch;

const PROVIDER: &str = "Yahoo Finance";

/// Calendar days of history fetched to find the last two trading closes.
const QUOTE_LOOKBACK_DAYS: i64 = 10;

/// Yahoo Finance API provider, used as a keyless fallback.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
/// - **Quotes**: built from the last two daily closes of the quote history,
///   so `previous_close` is the prior trading day. The currency comes from the
///   chart metadata; a symbol without a usable currency is left unpriced.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    fn to_offset_datetime(at: DateTime<Utc>) -> Result<OffsetDateTime, CoreError> {
        OffsetDateTime::from_unix_timestamp(at.timestamp()).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid timestamp {at}: {e}"),
        })
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// Quote from the last two closes, in the listing currency.
    ///
    /// Minor-unit listings are converted to their major currency. `None`
    /// with fewer than two closes or without a valid currency code.
    pub fn quote_from_history(
        symbol: &str,
        currency: Option<&str>,
        closes: &[PricePoint],
    ) -> Option<Quote> {
        let [.., previous, last] = closes else {
            return None;
        };
        let (code, divisor) = match currency.map(str::trim) {
            Some(raw) => match minor_unit(raw) {
                Some((major, divisor)) => (major, divisor),
                None => (raw, 1.0),
            },
            None => {
                tracing::debug!("{PROVIDER}: no currency reported for {symbol}");
                return None;
            }
        };
        let currency = match CurrencyCode::new(code) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("{PROVIDER}: dropping {symbol}: {e}");
                return None;
            }
        };
        Some(Quote::new(
            symbol,
            last.price / divisor,
            previous.price / divisor,
            currency,
        ))
    }

    /// Daily closes between `days` ago and now, oldest first, with the
    /// listing currency from the chart metadata.
    async fn history(
        &self,
        symbol: &str,
        days: i64,
    ) -> Result<(Option<String>, Vec<PricePoint>), CoreError> {
        let now = Utc::now();
        let start = Self::to_offset_datetime(now - Duration::days(days))?;
        let end = Self::to_offset_datetime(now)?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter(|q| q.close.is_finite() && q.close >= 0.0)
            .filter_map(|q| {
                Some(PricePoint {
                    date: Self::timestamp_to_naive_date(q.timestamp)?,
                    price: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);

        let currency = resp.metadata().ok().and_then(|meta| meta.currency);
        Ok((currency, points))
    }
}

/// Yahoo quotes some exchanges in minor units (pence, cents, agorot).
fn minor_unit(code: &str) -> Option<(&'static str, f64)> {
    match code {
        "GBp" | "GBX" => Some(("GBP", 100.0)),
        "ZAc" => Some(("ZAR", 100.0)),
        "ILA" => Some(("ILS", 100.0)),
        _ => None,
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, CoreError> {
        let mut quotes = QuoteMap::new();
        let mut last_error = None;
        let mut failures = 0;

        for symbol in symbols {
            match self.history(symbol, QUOTE_LOOKBACK_DAYS).await {
                Ok((currency, points)) => {
                    match Self::quote_from_history(symbol, currency.as_deref(), &points) {
                        Some(quote) => {
                            quotes.insert(quote.symbol.clone(), quote);
                        }
                        None => tracing::debug!("{PROVIDER}: cannot quote {symbol}"),
                    }
                }
                Err(e) => {
                    tracing::debug!("{PROVIDER}: {e}");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        // Per-symbol failures are omissions; only a total wipe-out is an error.
        match last_error {
            Some(e) if failures == symbols.len() => Err(e),
            _ => Ok(quotes),
        }
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        outputsize: usize,
    ) -> Result<Vec<PricePoint>, CoreError> {
        // Roughly 7 calendar days per 5 trading days, plus holiday slack.
        let days = (outputsize as i64 * 7) / 5 + 10;
        let (_, mut points) = self.history(symbol, days).await?;
        if points.len() > outputsize {
            points.drain(..points.len() - outputsize);
        }
        Ok(points)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let result = self
            .connector
            .search_ticker_opt(query)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Symbol search for '{query}' failed: {e}"),
            })?;

        Ok(result
            .quotes
            .into_iter()
            .map(|item| {
                let name = item
                    .long_name
                    .or(item.short_name)
                    .unwrap_or_else(|| item.symbol.clone());
                SymbolMatch::new(item.symbol, name, item.exchange, item.quote_type)
            })
            .collect())
    }
}
