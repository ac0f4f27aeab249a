use std::collections::BTreeSet;

use crate::models::currency::CurrencyCode;
use crate::models::holding::{Holding, Valuation};
use crate::models::quote::{Quote, QuoteMap};
use crate::models::summary::PortfolioSummary;

/// Portfolio valuation engine.
///
/// Pure business logic — no I/O, no API calls. Inputs are borrowed and never
/// mutated; every call returns fresh values, so re-running on the same inputs
/// is always safe.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Recompute the derived fields of every holding that has a quote.
    ///
    /// Holdings without a quote (unsupported or delisted symbols) come back
    /// unchanged. Output order matches input order.
    pub fn revalue(&self, holdings: &[Holding], quotes: &QuoteMap) -> Vec<Holding> {
        holdings
            .iter()
            .map(|holding| match quotes.get(&holding.symbol) {
                Some(quote) => Self::apply_quote(holding, quote),
                None => {
                    tracing::debug!("No quote for {}, keeping last valuation", holding.symbol);
                    holding.clone()
                }
            })
            .collect()
    }

    /// Aggregate holdings into a portfolio summary in the user's display currency.
    ///
    /// Values are summed nominally: holdings quoted in different currencies are
    /// NOT converted. `mixed_currencies` tells the caller when that happened.
    pub fn summarize(&self, holdings: &[Holding], display_currency: &CurrencyCode) -> PortfolioSummary {
        let total_value: f64 = holdings.iter().map(Holding::market_value).sum();
        let daily_change: f64 = holdings.iter().map(Holding::daily_change).sum();
        let daily_change_percentage = percentage(daily_change, total_value);

        let currencies: BTreeSet<&CurrencyCode> = holdings
            .iter()
            .filter(|h| h.valuation.is_some())
            .filter_map(|h| h.currency.as_ref())
            .collect();
        let mixed_currencies = currencies.len() > 1;
        if mixed_currencies {
            tracing::warn!(
                "Portfolio total mixes {} quote currencies without conversion",
                currencies.len()
            );
        }

        PortfolioSummary {
            total_value,
            daily_change,
            daily_change_percentage,
            total_assets: holdings.len(),
            currency: display_currency.clone(),
            mixed_currencies,
        }
    }

    fn apply_quote(holding: &Holding, quote: &Quote) -> Holding {
        let quantity = holding.quantity();
        let cost = holding.cost();
        let current_price = quote.price;

        let market_value = current_price * quantity;
        let total_gain_loss = market_value - cost;
        let per_unit_change = current_price - quote.previous_close;

        let mut revalued = holding.clone();
        revalued.currency = Some(quote.currency.clone());
        revalued.valuation = Some(Valuation {
            current_price,
            market_value,
            total_gain_loss,
            total_gain_loss_percentage: percentage(total_gain_loss, cost),
            daily_change: per_unit_change * quantity,
            daily_change_percentage: percentage(per_unit_change, quote.previous_close),
        });
        revalued
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

/// `part / whole × 100`, or 0 when `whole` is not positive.
///
/// Prices, costs and portfolio totals are never negative, so a non-positive
/// denominator only happens for empty or zero-cost inputs.
pub(crate) fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole) * 100.0
    } else {
        0.0
    }
}
