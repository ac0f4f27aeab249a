use crate::errors::CoreError;
use crate::models::analysis::{BollingerSnapshot, ChartAnalysis, MacdSnapshot, Sentiment};
use crate::models::price::PricePoint;

use super::indicators;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD_DEV: f64 = 2.0;

/// Closes needed before every indicator has at least one reading.
pub const MIN_CLOSES: usize = MACD_SLOW + MACD_SIGNAL;

/// Computes a technical read (RSI, MACD, Bollinger) from a closing-price series.
pub struct AnalysisService;

impl AnalysisService {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a symbol from its daily closes (any order; sorted by date here).
    pub fn analyze(&self, symbol: &str, history: &[PricePoint]) -> Result<ChartAnalysis, CoreError> {
        let mut points = history.to_vec();
        points.sort_by_key(|p| p.date);
        let closes: Vec<f64> = points
            .iter()
            .map(|p| p.price)
            .filter(|p| p.is_finite())
            .collect();

        if closes.len() < MIN_CLOSES {
            return Err(CoreError::InsufficientData {
                symbol: symbol.to_uppercase(),
                needed: MIN_CLOSES,
                got: closes.len(),
            });
        }

        let rsi = indicators::rsi(&closes, RSI_PERIOD);
        let macd = indicators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let bands = indicators::bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);

        // MIN_CLOSES guarantees every series is non-empty
        let latest = |series: &[f64]| series.last().copied().unwrap_or(0.0);

        let rsi = latest(&rsi);
        let macd = MacdSnapshot {
            value: latest(&macd.macd_line),
            signal: latest(&macd.signal_line),
            histogram: latest(&macd.histogram),
        };
        let bollinger_bands = BollingerSnapshot {
            upper: latest(&bands.upper),
            middle: latest(&bands.middle),
            lower: latest(&bands.lower),
        };

        Ok(ChartAnalysis {
            symbol: symbol.to_uppercase(),
            rsi,
            sentiment: Self::sentiment(rsi, macd.histogram),
            macd,
            bollinger_bands,
            sample_size: closes.len(),
        })
    }

    /// Overbought RSI or a strongly positive histogram reads bullish;
    /// the mirror image reads bearish.
    pub fn sentiment(rsi: f64, histogram: f64) -> Sentiment {
        if rsi > 70.0 || histogram > 0.5 {
            Sentiment::Bullish
        } else if rsi < 30.0 || histogram < -0.5 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

impl Default for AnalysisService {
    fn default() -> Self {
        Self::new()
    }
}
