use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// The closing prices of one ticker, in strictly increasing date order.
///
/// Gaps (missing trading days) are allowed and are never filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, checking that dates strictly increase and that every
    /// price is finite and positive.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, CoreError> {
        let ticker = ticker.into();

        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(CoreError::InvalidInput(
                ticker,
                format!(
                    "dates must be strictly increasing ({} is followed by {})",
                    pair[0].date, pair[1].date
                ),
            ));
        }

        if let Some(bad) = points
            .iter()
            .find(|p| !p.price.is_finite() || p.price <= 0.0)
        {
            return Err(CoreError::InvalidInput(
                ticker,
                format!("price on {} must be positive, got {}", bad.date, bad.price),
            ));
        }

        Ok(Self { ticker, points })
    }

    /// Sorts and de-duplicates raw observations before validating them.
    /// When two observations share a date, the later one wins.
    pub fn from_unsorted(
        ticker: impl Into<String>,
        points: impl IntoIterator<Item = PricePoint>,
    ) -> Result<Self, CoreError> {
        let by_date: BTreeMap<NaiveDate, f64> =
            points.into_iter().map(|p| (p.date, p.price)).collect();
        Self::new(
            ticker,
            by_date
                .into_iter()
                .map(|(date, price)| PricePoint { date, price })
                .collect(),
        )
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The prices alone, as a fully-present column.
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| Some(p.price)).collect()
    }
}

/// A set of price series aligned on one shared date axis.
///
/// The axis is the outer join of every series' dates. A ticker with no close
/// on a given date holds `None` there, never zero. Every column has exactly
/// the length of the date axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PricePanel {
    /// Outer-joins the given series on their dates. Tickers keep the order
    /// they were supplied in; supplying the same ticker twice is an error.
    pub fn from_series(series: Vec<PriceSeries>) -> Result<Self, CoreError> {
        let mut seen = BTreeSet::new();
        for s in &series {
            if !seen.insert(s.ticker()) {
                return Err(CoreError::InvalidInput(
                    "panel".to_string(),
                    format!("ticker {} supplied more than once", s.ticker()),
                ));
            }
        }

        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points().iter().map(|p| p.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tickers = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());

        for s in series {
            // Both sides are sorted, so a single forward walk aligns them.
            let mut column = Vec::with_capacity(dates.len());
            let mut points = s.points().iter().peekable();
            for date in &dates {
                match points.peek() {
                    Some(p) if p.date == *date => {
                        column.push(Some(p.price));
                        points.next();
                    }
                    _ => column.push(None),
                }
            }

            let missing = column.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                tracing::debug!(ticker = %s.ticker(), missing, "Aligned series has gaps.");
            }

            tickers.push(s.ticker);
            columns.push(column);
        }

        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Number of dates on the shared axis.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when the panel has no tickers or no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }

    /// The aligned column for one ticker.
    pub fn column(&self, ticker: &str) -> Result<&[Option<f64>], CoreError> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| CoreError::UnknownTicker(ticker.to_string()))
    }

    /// Iterates over `(ticker, column)` pairs in panel order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.tickers
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

/// Identifies one market-data request: the ticker set and the date range.
///
/// Tickers are trimmed, upper-cased and held as a set, so the same request
/// spelled in a different order yields an equal key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelKey {
    tickers: BTreeSet<String>,
    start: NaiveDate,
    end: NaiveDate,
}

impl PanelKey {
    pub fn new<I, S>(tickers: I, start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tickers: BTreeSet<String> = tickers
            .into_iter()
            .map(|t| t.as_ref().trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        if tickers.is_empty() {
            return Err(CoreError::InvalidInput(
                "tickers".to_string(),
                "at least one ticker is required".to_string(),
            ));
        }
        if start >= end {
            return Err(CoreError::InvalidInput(
                "date range".to_string(),
                format!("start {start} must be before end {end}"),
            ));
        }

        Ok(Self {
            tickers,
            start,
            end,
        })
    }

    /// Tickers in sorted order.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(String::as_str)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The same ticker set over a different date range.
    pub fn with_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        Self::new(self.tickers(), start, end)
    }
}
