use analytics::AnalyticsError;
use api_client::error::ApiError;
use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Market data error: {0}")]
    Api(#[from] ApiError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
