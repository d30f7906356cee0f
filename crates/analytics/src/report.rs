use chrono::NaiveDate;
use core_types::Deviation;
use serde::Serialize;

/// Pairwise Pearson correlations, indexed by ticker in panel order.
///
/// A cell is `None` when the pair overlaps on fewer than two dates or either
/// series is constant over the overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Looks up the cell for a pair of tickers.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        self.values[i][j]
    }

    pub fn size(&self) -> usize {
        self.tickers.len()
    }
}

/// Trailing returns of one ticker, one cell per horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsRow {
    pub ticker: String,
    /// The most recent date the ticker has a close on. `None` if it has none.
    pub as_of: Option<NaiveDate>,
    /// The close on `as_of`.
    pub last_price: Option<f64>,
    pub returns: Vec<Option<f64>>,
}

/// Percentage returns per ticker per horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsTable {
    pub horizons: Vec<usize>,
    pub rows: Vec<ReturnsRow>,
}

impl ReturnsTable {
    pub fn get(&self, ticker: &str, horizon: usize) -> Option<f64> {
        let col = self.horizons.iter().position(|h| *h == horizon)?;
        self.rows
            .iter()
            .find(|r| r.ticker == ticker)
            .and_then(|r| r.returns[col])
    }
}

/// A derived series on the panel's date axis, labelled by its window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingLine {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

impl RollingLine {
    /// Number of points that have a value.
    pub fn defined(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Everything one render of the dashboard needs for the selected ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<Option<f64>>,
    /// One line per configured window, in configuration order. Empty when
    /// moving averages are switched off.
    pub moving_averages: Vec<RollingLine>,
    pub volatility: Option<RollingLine>,
    pub deviation: Deviation,
    pub correlation: CorrelationMatrix,
    pub returns: ReturnsTable,
}
