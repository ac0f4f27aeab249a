use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::currency::CurrencyCode;
use crate::models::price::PricePoint;
use crate::models::quote::{Quote, QuoteMap};
use crate::models::symbol::SymbolMatch;

const BASE_URL: &str = "https://api.twelvedata.com";
const PROVIDER: &str = "Twelve Data";

/// Twelve Data API provider for equities, ETFs, funds, crypto and commodities.
///
/// - **Requires**: API key (set via settings as "twelve_data").
/// - **Batching**: one `/quote` call prices a comma-separated symbol list.
/// - **Format**: every numeric field arrives as a string and is parsed here;
///   a symbol whose close or previous close does not parse is dropped.
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    /// Turn a `/quote` response body into a quote map.
    ///
    /// A single-symbol request returns the quote object itself; a batch
    /// returns an object keyed by symbol. Per-symbol error objects and
    /// malformed numbers are skipped. Only account-level failures
    /// (bad key, rate limit, server error) are reported as `Err`.
    pub fn parse_quote_batch(symbols: &[String], body: &Value) -> Result<QuoteMap, CoreError> {
        if let Some(err) = account_error(body) {
            return Err(err);
        }

        let mut quotes = QuoteMap::new();
        for symbol in symbols {
            let entry = if symbols.len() == 1 {
                Some(body)
            } else {
                body.get(symbol.as_str())
            };

            match entry.and_then(|raw| parse_quote(symbol, raw)) {
                Some(quote) => {
                    quotes.insert(quote.symbol.clone(), quote);
                }
                None => tracing::debug!("{PROVIDER}: dropping {symbol}, no usable quote"),
            }
        }
        Ok(quotes)
    }

    /// Turn a `/time_series` response body into closes sorted oldest first.
    pub fn parse_time_series(symbol: &str, body: &Value) -> Result<Vec<PricePoint>, CoreError> {
        if let Some(err) = account_error(body) {
            return Err(err);
        }

        let resp: TimeSeriesResponse =
            serde_json::from_value(body.clone()).map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {symbol}: {e}"),
            })?;

        let mut points: Vec<PricePoint> = resp
            .values
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| {
                let date = NaiveDate::parse_from_str(v.datetime.get(..10)?, "%Y-%m-%d").ok()?;
                let price = parse_number(&v.close)?;
                Some(PricePoint { date, price })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    /// Turn a `/symbol_search` response body into matches, in API order.
    ///
    /// Rows without a symbol are skipped; an unparseable currency is dropped
    /// from the match rather than dropping the match.
    pub fn parse_symbol_search(body: &Value) -> Result<Vec<SymbolMatch>, CoreError> {
        if let Some(err) = account_error(body) {
            return Err(err);
        }

        let resp: SymbolSearchResponse =
            serde_json::from_value(body.clone()).map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse symbol search: {e}"),
            })?;

        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                let symbol = row.symbol.filter(|s| !s.trim().is_empty())?;
                let currency = row.currency.as_deref().and_then(|c| CurrencyCode::new(c).ok());
                let found = SymbolMatch::new(
                    symbol,
                    row.instrument_name.unwrap_or_default(),
                    row.exchange.unwrap_or_default(),
                    row.instrument_type.unwrap_or_default(),
                );
                Some(match currency {
                    Some(c) => found.with_currency(c),
                    None => found,
                })
            })
            .collect())
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, CoreError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/{path}"))
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("HTTP {} from /{path}", resp.status()),
            });
        }

        resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to decode /{path} response: {e}"),
        })
    }
}

// ── Twelve Data API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RawQuote {
    symbol: Option<String>,
    currency: Option<String>,
    close: Option<String>,
    previous_close: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    values: Option<Vec<TimeSeriesValue>>,
}

#[derive(Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    close: String,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    data: Option<Vec<SymbolSearchRow>>,
}

#[derive(Deserialize)]
struct SymbolSearchRow {
    symbol: Option<String>,
    instrument_name: Option<String>,
    exchange: Option<String>,
    instrument_type: Option<String>,
    currency: Option<String>,
}

/// Error envelope at the top level of a response that concerns the whole
/// request rather than one symbol.
fn account_error(body: &Value) -> Option<CoreError> {
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let code = body.get("code").and_then(Value::as_u64).unwrap_or(0);
    // 400/404 mean "unknown symbol" for single-symbol requests
    if code == 400 || code == 404 {
        return None;
    }
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("code {code}: {message}"),
    })
}

fn parse_quote(requested: &str, raw: &Value) -> Option<Quote> {
    let raw: RawQuote = serde_json::from_value(raw.clone()).ok()?;
    if raw.status.as_deref() == Some("error") {
        return None;
    }

    let price = parse_number(raw.close.as_deref()?)?;
    let previous_close = parse_number(raw.previous_close.as_deref()?)?;
    let currency = CurrencyCode::new(raw.currency.as_deref()?).ok()?;
    let symbol = raw.symbol.unwrap_or_else(|| requested.to_string());

    // Key by what was asked for so lookups by the holding's symbol succeed.
    if !symbol.eq_ignore_ascii_case(requested) {
        tracing::debug!("{PROVIDER}: {requested} answered as {symbol}");
    }
    Some(Quote::new(requested, price, previous_close, currency))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteMap, CoreError> {
        if symbols.is_empty() {
            return Ok(QuoteMap::new());
        }
        let joined = symbols.join(",");
        let body = self.get_json("quote", &[("symbol", joined.as_str())]).await?;
        Self::parse_quote_batch(symbols, &body)
    }

    async fn get_time_series(
        &self,
        symbol: &str,
        outputsize: usize,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let size = outputsize.to_string();
        let body = self
            .get_json(
                "time_series",
                &[
                    ("symbol", symbol),
                    ("interval", "1day"),
                    ("outputsize", size.as_str()),
                ],
            )
            .await?;
        Self::parse_time_series(symbol, &body)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.get_json("symbol_search", &[("symbol", query)]).await?;
        Self::parse_symbol_search(&body)
    }
}
