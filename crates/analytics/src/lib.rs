//! # Tickerboard Analytics Engine
//!
//! This crate derives the rolling statistics a price dashboard displays:
//! trailing moving averages, rolling volatility, pairwise correlation, and
//! trailing percentage returns.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `AnalyticsEngine` holds no state between calls. It takes
//!   an immutable `PricePanel` (or one of its columns) and returns freshly allocated results.
//! - **Missing is not an error:** a point without enough history is `None`. Only structurally
//!   invalid calls (empty input, zero or oversized windows) return an `AnalyticsError`.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: moving average, rolling deviation, correlation, percent change.
//! - `CorrelationMatrix`, `ReturnsTable`, `TickerAnalysis`: the result types.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalysisParams, AnalyticsEngine};
pub use error::AnalyticsError;
pub use report::{CorrelationMatrix, ReturnsRow, ReturnsTable, RollingLine, TickerAnalysis};
