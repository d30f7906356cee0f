use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PanelKey, PricePanel, PriceSeries};
use futures::future::join_all;

mod csv_source;
pub mod error;
pub mod responses;
mod yahoo;

// --- Public API ---
pub use csv_source::CsvSource;
pub use yahoo::{YahooClient, parse_chart};

/// The abstract interface for a source of historical daily closes.
///
/// The dashboard only ever talks to this trait, so the live Yahoo client, the
/// offline CSV source and test doubles are interchangeable.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetches the closes of one ticker for dates in `[start, end)`.
    async fn fetch_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ApiError>;

    /// Fetches every ticker of the request concurrently and aligns them into
    /// one panel. Any ticker failing fails the whole request.
    async fn fetch_panel(&self, key: &PanelKey) -> Result<PricePanel, ApiError> {
        let fetches = key
            .tickers()
            .map(|ticker| self.fetch_closes(ticker, key.start(), key.end()));

        let series = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PricePanel::from_series(series)?)
    }
}
