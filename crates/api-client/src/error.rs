use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    /// The source has no usable closes for the ticker: an unknown symbol,
    /// an empty range, or an upstream error response.
    #[error("No data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Failed to read price file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid data format from source: {0}")]
    InvalidData(#[from] CoreError),
}
