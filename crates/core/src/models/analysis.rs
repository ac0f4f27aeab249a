use serde::{Deserialize, Serialize};

/// Overall read of the indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "Bullish"),
            Sentiment::Neutral => write!(f, "Neutral"),
            Sentiment::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Latest Bollinger band reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerSnapshot {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerSnapshot {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Technical analysis of one symbol, computed from its closing prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartAnalysis {
    pub symbol: String,
    pub rsi: f64,
    pub macd: MacdSnapshot,
    pub bollinger_bands: BollingerSnapshot,
    pub sentiment: Sentiment,
    /// Number of closes the indicators were computed from
    pub sample_size: usize,
}
