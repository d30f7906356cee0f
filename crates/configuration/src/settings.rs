use crate::error::ConfigError;
use chrono::NaiveDate;
use core_types::Deviation;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; omitted values fall back to
/// the dashboard defaults (four large-cap tech tickers, 2020 through 2024).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub analytics: AnalyticsConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Where daily closes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The Yahoo Finance chart API.
    #[default]
    Yahoo,
    /// A local `date,ticker,close` CSV file.
    Csv,
}

/// Contains the request parameters for the market-data fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// The ticker universe (e.g. "AAPL").
    pub tickers: Vec<String>,
    /// First date of the requested range (inclusive).
    pub start_date: NaiveDate,
    /// Last date of the requested range (exclusive, as the chart API treats it).
    pub end_date: NaiveDate,
    pub source: DataSource,
    /// Required when `source = "csv"`.
    pub csv_path: Option<PathBuf>,
    pub yahoo_base_url: String,
    /// Use split/dividend adjusted closes when the source provides them.
    pub adjusted_close: bool,
    pub request_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            tickers: ["AAPL", "MSFT", "AMZN", "GOOG"]
                .into_iter()
                .map(String::from)
                .collect(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            source: DataSource::Yahoo,
            csv_path: None,
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            adjusted_close: true,
            request_timeout_secs: 30,
        }
    }
}

/// Contains the window parameters of the rolling statistics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Moving-average windows, in trading days.
    pub ma_windows: Vec<usize>,
    /// Rolling volatility window, in trading days.
    pub volatility_window: usize,
    /// Horizons of the trailing returns table, in trading days.
    pub return_horizons: Vec<usize>,
    pub deviation: Deviation,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![20, 50],
            volatility_window: 30,
            return_horizons: vec![7, 30, 252],
            deviation: Deviation::Sample,
        }
    }
}

/// Initial state of the dashboard toggles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// How many of the most recent dates the price table shows.
    pub rows: usize,
    pub show_ma: bool,
    pub show_volatility: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            show_ma: true,
            show_volatility: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks the invariants the rest of the application relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let data = &self.data;

        if data.tickers.is_empty() {
            return Err(ConfigError::ValidationError(
                "data.tickers must name at least one ticker".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for ticker in &data.tickers {
            let normalised = ticker.trim().to_uppercase();
            if normalised.is_empty() {
                return Err(ConfigError::ValidationError(
                    "data.tickers contains an empty ticker".to_string(),
                ));
            }
            if !seen.insert(normalised) {
                return Err(ConfigError::ValidationError(format!(
                    "data.tickers lists {ticker} more than once"
                )));
            }
        }

        if data.start_date >= data.end_date {
            return Err(ConfigError::ValidationError(format!(
                "data.start_date ({}) must be before data.end_date ({})",
                data.start_date, data.end_date
            )));
        }
        if data.source == DataSource::Csv && data.csv_path.is_none() {
            return Err(ConfigError::ValidationError(
                "data.csv_path is required when data.source = \"csv\"".to_string(),
            ));
        }
        if data.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "data.request_timeout_secs must be positive".to_string(),
            ));
        }

        let analytics = &self.analytics;
        if analytics.ma_windows.contains(&0) {
            return Err(ConfigError::ValidationError(
                "analytics.ma_windows must all be positive".to_string(),
            ));
        }
        if analytics.volatility_window <= analytics.deviation.ddof() {
            return Err(ConfigError::ValidationError(format!(
                "analytics.volatility_window must exceed {} for {:?} deviation",
                analytics.deviation.ddof(),
                analytics.deviation
            )));
        }
        if analytics.return_horizons.contains(&0) {
            return Err(ConfigError::ValidationError(
                "analytics.return_horizons must all be positive".to_string(),
            ));
        }

        if self.display.rows == 0 {
            return Err(ConfigError::ValidationError(
                "display.rows must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config = Config::default();
        config.data.end_date = config.data.start_date;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_zero_windows() {
        let mut config = Config::default();
        config.analytics.ma_windows = vec![20, 0];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analytics.volatility_window = 1;
        assert!(config.validate().is_err());
        config.analytics.deviation = Deviation::Population;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.analytics.return_horizons = vec![0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_tickers_case_insensitively() {
        let mut config = Config::default();
        config.data.tickers = vec!["AAPL".to_string(), "aapl".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn csv_source_needs_a_path() {
        let mut config = Config::default();
        config.data.source = DataSource::Csv;
        assert!(config.validate().is_err());
        config.data.csv_path = Some(PathBuf::from("closes.csv"));
        assert!(config.validate().is_ok());
    }
}
