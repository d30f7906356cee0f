use crate::error::ApiError;
use crate::MarketDataClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PricePoint, PriceSeries};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One row of a long-format close file: `date,ticker,close`.
#[derive(Debug, Deserialize)]
struct CloseRecord {
    date: NaiveDate,
    ticker: String,
    /// Empty cells are tolerated and become gaps.
    close: Option<f64>,
}

/// A `MarketDataClient` that serves closes from a CSV file, for offline
/// runs and reproducible demos.
///
/// The whole file is read once on construction; requests then filter it.
#[derive(Debug, Clone)]
pub struct CsvSource {
    file_path: PathBuf,
    closes: HashMap<String, Vec<PricePoint>>,
}

impl CsvSource {
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let file_path = file_path.as_ref().to_path_buf();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&file_path)?;

        let mut closes: HashMap<String, Vec<PricePoint>> = HashMap::new();
        let mut blanks = 0usize;
        for result in reader.deserialize() {
            let record: CloseRecord = result?;
            match record.close {
                Some(close) => closes
                    .entry(record.ticker.to_uppercase())
                    .or_default()
                    .push(PricePoint::new(record.date, close)),
                None => blanks += 1,
            }
        }

        if blanks > 0 {
            tracing::warn!(path = %file_path.display(), blanks, "Skipped rows without a close.");
        }
        tracing::info!(path = %file_path.display(), tickers = closes.len(), "Loaded price file.");

        Ok(Self { file_path, closes })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Tickers present in the file, sorted.
    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.closes.keys().map(String::as_str).collect();
        tickers.sort_unstable();
        tickers
    }
}

#[async_trait]
impl MarketDataClient for CsvSource {
    async fn fetch_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ApiError> {
        let unavailable = |reason: &str| ApiError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.to_string(),
        };

        let points = self
            .closes
            .get(&ticker.to_uppercase())
            .ok_or_else(|| unavailable("ticker not present in price file"))?;

        let in_range: Vec<PricePoint> = points
            .iter()
            .filter(|p| p.date >= start && p.date < end)
            .copied()
            .collect();

        if in_range.is_empty() {
            return Err(unavailable("no closes in the requested range"));
        }

        Ok(PriceSeries::from_unsorted(ticker, in_range)?)
    }
}
