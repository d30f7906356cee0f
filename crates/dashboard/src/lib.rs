//! # Tickerboard Dashboard
//!
//! The presentation layer: it owns the cache around the one market-data
//! fetch, holds the widget state, and calls the analytics engine
//! synchronously for every render.

pub mod cache;
pub mod error;
pub mod render;
pub mod session;

pub use cache::PanelCache;
pub use error::DashboardError;
pub use session::{Command, DashboardState, HELP, Transition};

use analytics::{AnalysisParams, AnalyticsEngine, CorrelationMatrix, ReturnsTable, TickerAnalysis};
use api_client::MarketDataClient;
use configuration::Config;
use core_types::{PanelKey, PricePanel};

/// Ties the cache, the engine and the configured windows together.
pub struct Dashboard<C> {
    cache: PanelCache<C>,
    engine: AnalyticsEngine,
    universe: Vec<String>,
    ma_windows: Vec<usize>,
    volatility_window: usize,
    return_horizons: Vec<usize>,
}

impl<C: MarketDataClient> Dashboard<C> {
    pub fn new(client: C, config: &Config) -> Self {
        Self {
            cache: PanelCache::new(client),
            engine: AnalyticsEngine::with_deviation(config.analytics.deviation),
            universe: config
                .data
                .tickers
                .iter()
                .map(|t| t.trim().to_uppercase())
                .collect(),
            ma_windows: config.analytics.ma_windows.clone(),
            volatility_window: config.analytics.volatility_window,
            return_horizons: config.analytics.return_horizons.clone(),
        }
    }

    /// The state the dashboard opens with: the first ticker and the
    /// configured toggles and date range.
    pub fn initial_state(&self, config: &Config) -> DashboardState {
        DashboardState {
            ticker: self.universe.first().cloned().unwrap_or_default(),
            show_ma: config.display.show_ma,
            show_volatility: config.display.show_volatility,
            start: config.data.start_date,
            end: config.data.end_date,
            rows: config.display.rows,
        }
    }

    /// Tickers the dashboard fetches, upper-cased, in configuration order.
    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn cache(&self) -> &PanelCache<C> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PanelCache<C> {
        &mut self.cache
    }

    /// The panel for the state's date range, from cache when possible.
    pub async fn panel(
        &mut self,
        state: &DashboardState,
    ) -> Result<std::sync::Arc<PricePanel>, DashboardError> {
        let key = PanelKey::new(&self.universe, state.start, state.end)?;
        Ok(self.cache.get_or_fetch(&key).await?)
    }

    /// Engine parameters for one render. Windows longer than the fetched
    /// history cannot be drawn and are left out rather than failing the frame.
    pub fn params(&self, state: &DashboardState, history: usize) -> AnalysisParams {
        let fits = |window: usize| {
            let ok = window <= history;
            if !ok {
                tracing::warn!(window, history, "Window exceeds the fetched history; skipping it.");
            }
            ok
        };

        AnalysisParams {
            ma_windows: if state.show_ma {
                self.ma_windows.iter().copied().filter(|w| fits(*w)).collect()
            } else {
                Vec::new()
            },
            volatility_window: Some(self.volatility_window)
                .filter(|_| state.show_volatility)
                .filter(|w| fits(*w)),
            return_horizons: self.return_horizons.clone(),
        }
    }

    /// One analytical pass for the current state.
    pub async fn analyse(
        &mut self,
        state: &DashboardState,
    ) -> Result<TickerAnalysis, DashboardError> {
        let panel = self.panel(state).await?;
        let params = self.params(state, panel.len());
        Ok(self.engine.analyse(&panel, &state.ticker, &params)?)
    }

    /// Pairwise correlation of every ticker over the state's date range.
    pub async fn correlation(
        &mut self,
        state: &DashboardState,
    ) -> Result<CorrelationMatrix, DashboardError> {
        let panel = self.panel(state).await?;
        Ok(self.engine.correlation_matrix(&panel)?)
    }

    /// Trailing returns of every ticker at the configured horizons.
    pub async fn returns(&mut self, state: &DashboardState) -> Result<ReturnsTable, DashboardError> {
        let panel = self.panel(state).await?;
        Ok(self.engine.returns_summary(&panel, &self.return_horizons)?)
    }

    /// Renders one frame for the current state.
    pub async fn render(&mut self, state: &DashboardState) -> Result<String, DashboardError> {
        let analysis = self.analyse(state).await?;
        Ok(render::dashboard(&analysis, state.rows))
    }
}
