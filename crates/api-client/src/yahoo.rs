use crate::error::ApiError;
use crate::responses::ChartResponse;
use crate::MarketDataClient;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use configuration::DataConfig;
use core_types::{PricePoint, PriceSeries};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

/// A `MarketDataClient` backed by the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    adjusted: bool,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        // The chart endpoint rejects requests without a browser-like agent.
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            adjusted: true,
        })
    }

    pub fn from_config(data: &DataConfig) -> Result<Self, ApiError> {
        Ok(Self::new(
            data.yahoo_base_url.clone(),
            Duration::from_secs(data.request_timeout_secs),
        )?
        .with_adjusted(data.adjusted_close))
    }

    /// Chooses between adjusted and raw closes.
    pub fn with_adjusted(mut self, adjusted: bool) -> Self {
        self.adjusted = adjusted;
        self
    }
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn fetch_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ApiError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();

        tracing::debug!(ticker, %start, %end, "Requesting daily chart.");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div|split".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Unknown symbols come back as a 404 that still carries a chart error body.
        match parse_chart(ticker, &text, self.adjusted) {
            Ok(series) => Ok(series),
            Err(ApiError::Deserialization(_)) if !status.is_success() => {
                Err(ApiError::DataUnavailable {
                    ticker: ticker.to_string(),
                    reason: format!("HTTP {status}"),
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Turns a chart response body into a daily close series.
///
/// Bars without a close are dropped and become gaps. Each bar is dated in
/// the exchange's local time so a US session never lands on the next day.
pub fn parse_chart(ticker: &str, body: &str, adjusted: bool) -> Result<PriceSeries, ApiError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(ApiError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: format!("{}: {}", error.code, error.description),
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ApiError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: "empty chart result".to_string(),
        })?;

    let adjclose = result
        .indicators
        .adjclose
        .first()
        .map(|a| &a.adjclose)
        .filter(|a| adjusted && a.len() == result.timestamp.len());
    let closes = match adjclose {
        Some(closes) => closes,
        None => result
            .indicators
            .quote
            .first()
            .map(|q| &q.close)
            .ok_or_else(|| ApiError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "response has no quote block".to_string(),
            })?,
    };

    let offset = result.meta.gmtoffset;
    let mut dropped = 0usize;
    let mut points = Vec::with_capacity(result.timestamp.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let date = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive());
        match (date, close) {
            (Some(date), Some(price)) => points.push(PricePoint::new(date, *price)),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(ticker, dropped, "Dropped chart bars without a close.");
    }
    if points.is_empty() {
        return Err(ApiError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: "no closes in the requested range".to_string(),
        });
    }

    tracing::info!(ticker, symbol = %result.meta.symbol, closes = points.len(), "Fetched daily closes.");
    Ok(PriceSeries::from_unsorted(ticker, points)?)
}
