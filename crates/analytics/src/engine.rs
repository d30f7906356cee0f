use crate::error::AnalyticsError;
use crate::report::{CorrelationMatrix, ReturnsRow, ReturnsTable, RollingLine, TickerAnalysis};
use crate::stats::{pearson, present_sum, std_dev};
use core_types::{Deviation, PricePanel};

/// The parameters of one analytical pass over a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisParams {
    /// Moving-average windows. Leave empty to skip the moving averages.
    pub ma_windows: Vec<usize>,
    /// Rolling volatility window, or `None` to skip volatility.
    pub volatility_window: Option<usize>,
    /// Horizons of the trailing returns table.
    pub return_horizons: Vec<usize>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            ma_windows: vec![20, 50],
            volatility_window: None,
            return_horizons: vec![7, 30, 252],
        }
    }
}

/// A stateless calculator for rolling statistics over aligned price columns.
///
/// Every method is pure. A column is a slice of `Option<f64>` on a panel's
/// date axis; outputs have the same length as their input and use `None` for
/// points that lack the history to be defined.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticsEngine {
    deviation: Deviation,
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose volatility uses the given estimator.
    pub fn with_deviation(deviation: Deviation) -> Self {
        Self { deviation }
    }

    pub fn deviation(&self) -> Deviation {
        self.deviation
    }

    /// Trailing simple moving average.
    ///
    /// `out[i]` is the mean of `series[i - window + 1 ..= i]` when all of those
    /// values are present, and `None` otherwise.
    pub fn moving_average(
        &self,
        series: &[Option<f64>],
        window: usize,
    ) -> Result<Vec<Option<f64>>, AnalyticsError> {
        check_window(series.len(), window, "window")?;

        let out = rolling(series, window, |w| {
            present_sum(w).map(|sum| sum / window as f64)
        });

        tracing::debug!(window, defined = out.iter().flatten().count(), "Computed moving average.");
        Ok(out)
    }

    /// Trailing rolling standard deviation ("volatility").
    ///
    /// Uses the engine's `Deviation`. A sample deviation over a window of one
    /// has no degrees of freedom, so that call is rejected.
    pub fn rolling_std_dev(
        &self,
        series: &[Option<f64>],
        window: usize,
    ) -> Result<Vec<Option<f64>>, AnalyticsError> {
        check_window(series.len(), window, "window")?;

        let ddof = self.deviation.ddof();
        if window <= ddof {
            return Err(AnalyticsError::InvalidInput(format!(
                "{:?} deviation needs a window of at least {}, got {}",
                self.deviation,
                ddof + 1,
                window
            )));
        }

        let out = rolling(series, window, |w| std_dev(w, ddof));

        tracing::debug!(
            window,
            deviation = ?self.deviation,
            defined = out.iter().flatten().count(),
            "Computed rolling deviation."
        );
        Ok(out)
    }

    /// Percentage change against the value `horizon` positions earlier.
    ///
    /// `out[i] = (s[i] - s[i - h]) / s[i - h] * 100`, or `None` when `i - h`
    /// falls before the start, either value is missing, or `s[i - h]` is zero.
    pub fn percent_change(
        &self,
        series: &[Option<f64>],
        horizon: usize,
    ) -> Result<Vec<Option<f64>>, AnalyticsError> {
        check_window(series.len(), horizon, "horizon")?;

        Ok((0..series.len())
            .map(|i| {
                let prev = i.checked_sub(horizon)?;
                change_pct(series[prev]?, series[i]?)
            })
            .collect())
    }

    /// Pearson correlation of every ticker pair in the panel.
    ///
    /// Each pair uses only the dates where both tickers have a close. A pair
    /// that cannot be correlated is a `None` cell, never a failed matrix.
    pub fn correlation_matrix(
        &self,
        panel: &PricePanel,
    ) -> Result<CorrelationMatrix, AnalyticsError> {
        if panel.is_empty() {
            return Err(AnalyticsError::InvalidInput(
                "cannot correlate an empty panel".to_string(),
            ));
        }

        let columns: Vec<&[Option<f64>]> = panel.columns().map(|(_, c)| c).collect();
        let n = columns.len();
        let mut values = vec![vec![None; n]; n];

        for i in 0..n {
            for j in i..n {
                let r = pearson(columns[i], columns[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        let degenerate = values.iter().flatten().filter(|v| v.is_none()).count();
        if degenerate > 0 {
            tracing::warn!(degenerate, "Some correlation cells are undefined.");
        }

        Ok(CorrelationMatrix {
            tickers: panel.tickers().to_vec(),
            values,
        })
    }

    /// Trailing percentage returns of every ticker over each horizon.
    ///
    /// Each ticker is measured from its most recent close, so a series whose
    /// history ends early is still summarised. A horizon reaching back past
    /// the start of the axis gives a `None` cell.
    pub fn returns_summary(
        &self,
        panel: &PricePanel,
        horizons: &[usize],
    ) -> Result<ReturnsTable, AnalyticsError> {
        if panel.is_empty() {
            return Err(AnalyticsError::InvalidInput(
                "cannot summarise an empty panel".to_string(),
            ));
        }
        if horizons.contains(&0) {
            return Err(AnalyticsError::InvalidInput(
                "return horizons must be positive".to_string(),
            ));
        }

        let rows = panel
            .columns()
            .map(|(ticker, column)| {
                let last = column.iter().rposition(Option::is_some);
                let last_price = last.and_then(|i| column[i]);
                let returns = horizons
                    .iter()
                    .map(|&h| {
                        let i = last?;
                        let prev = i.checked_sub(h)?;
                        change_pct(column[prev]?, column[i]?)
                    })
                    .collect();

                ReturnsRow {
                    ticker: ticker.to_string(),
                    as_of: last.map(|i| panel.dates()[i]),
                    last_price,
                    returns,
                }
            })
            .collect();

        Ok(ReturnsTable {
            horizons: horizons.to_vec(),
            rows,
        })
    }

    /// Runs one complete analytical pass for the selected ticker.
    pub fn analyse(
        &self,
        panel: &PricePanel,
        ticker: &str,
        params: &AnalysisParams,
    ) -> Result<TickerAnalysis, AnalyticsError> {
        let prices = panel.column(ticker)?;

        let moving_averages = params
            .ma_windows
            .iter()
            .map(|&window| {
                Ok(RollingLine {
                    window,
                    values: self.moving_average(prices, window)?,
                })
            })
            .collect::<Result<Vec<_>, AnalyticsError>>()?;

        let volatility = params
            .volatility_window
            .map(|window| {
                Ok::<_, AnalyticsError>(RollingLine {
                    window,
                    values: self.rolling_std_dev(prices, window)?,
                })
            })
            .transpose()?;

        let correlation = self.correlation_matrix(panel)?;
        let returns = self.returns_summary(panel, &params.return_horizons)?;

        tracing::info!(
            ticker,
            dates = panel.len(),
            lines = moving_averages.len(),
            volatility = volatility.is_some(),
            "Analysis pass complete."
        );

        Ok(TickerAnalysis {
            ticker: ticker.to_string(),
            dates: panel.dates().to_vec(),
            prices: prices.to_vec(),
            moving_averages,
            volatility,
            deviation: self.deviation,
            correlation,
            returns,
        })
    }
}

/// Rejects calls for which every output point would be undefined.
fn check_window(len: usize, window: usize, what: &str) -> Result<(), AnalyticsError> {
    if len == 0 {
        return Err(AnalyticsError::InvalidInput("series is empty".to_string()));
    }
    if window == 0 {
        return Err(AnalyticsError::InvalidInput(format!(
            "{what} must be positive"
        )));
    }
    if window > len {
        return Err(AnalyticsError::InvalidInput(format!(
            "{what} {window} exceeds the {len} available observations"
        )));
    }
    Ok(())
}

/// Applies `f` to each trailing window, tail-aligned. The first `window - 1`
/// positions have no full window and are `None`.
fn rolling<F>(series: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[Option<f64>]) -> Option<f64>,
{
    let mut out = vec![None; window - 1];
    out.extend(series.windows(window).map(f));
    out
}

fn change_pct(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        return None;
    }
    Some((to - from) / from * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use core_types::{PricePoint, PriceSeries};
    use proptest::prelude::*;

    fn present(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    fn panel(columns: Vec<(&str, Vec<f64>)>) -> PricePanel {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = columns
            .into_iter()
            .map(|(ticker, prices)| {
                let points = prices
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PricePoint::new(start + chrono::Days::new(i as u64), *p))
                    .collect();
                PriceSeries::new(ticker, points).unwrap()
            })
            .collect();
        PricePanel::from_series(series).unwrap()
    }

    #[test]
    fn moving_average_matches_trailing_convention() {
        let engine = AnalyticsEngine::new();
        let out = engine
            .moving_average(&present(&[10.0, 12.0, 11.0, 13.0, 14.0, 16.0]), 3)
            .unwrap();

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 11.0);
        assert_relative_eq!(out[3].unwrap(), 12.0);
        assert_relative_eq!(out[4].unwrap(), 12.666_666_666_666_666, epsilon = 1e-12);
        assert_relative_eq!(out[5].unwrap(), 14.333_333_333_333_334, epsilon = 1e-12);
    }

    #[test]
    fn moving_average_is_undefined_across_gaps() {
        let engine = AnalyticsEngine::new();
        let series = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        let out = engine.moving_average(&series, 2).unwrap();
        assert_eq!(out, vec![None, Some(1.5), None, None, Some(4.5), Some(5.5)]);
    }

    #[test]
    fn invalid_calls_fail_loudly() {
        let engine = AnalyticsEngine::new();
        assert!(matches!(
            engine.moving_average(&[], 3),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.moving_average(&present(&[1.0, 2.0]), 0),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.rolling_std_dev(&present(&[1.0, 2.0]), 3),
            Err(AnalyticsError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.percent_change(&present(&[1.0, 2.0]), 0),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn sample_deviation_rejects_single_observation_window() {
        let series = present(&[1.0, 2.0, 3.0]);
        assert!(AnalyticsEngine::new().rolling_std_dev(&series, 1).is_err());
        let population = AnalyticsEngine::with_deviation(Deviation::Population)
            .rolling_std_dev(&series, 1)
            .unwrap();
        assert_eq!(population, vec![Some(0.0); 3]);
    }

    #[test]
    fn rolling_std_dev_uses_sample_by_default() {
        let engine = AnalyticsEngine::new();
        let out = engine
            .rolling_std_dev(&present(&[10.0, 12.0, 11.0, 13.0]), 3)
            .unwrap();
        assert_eq!(out[..2], [None, None]);
        assert_relative_eq!(out[2].unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[3].unwrap(), 1.0, epsilon = 1e-12);

        let population = AnalyticsEngine::with_deviation(Deviation::Population)
            .rolling_std_dev(&present(&[10.0, 12.0, 11.0, 13.0]), 3)
            .unwrap();
        assert_relative_eq!(population[2].unwrap(), (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn percent_change_handles_range_and_gaps() {
        let engine = AnalyticsEngine::new();
        let series = vec![Some(100.0), Some(110.0), None, Some(121.0)];
        let out = engine.percent_change(&series, 1).unwrap();
        assert_eq!(out[0], None);
        assert_relative_eq!(out[1].unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);

        let two = engine.percent_change(&series, 2).unwrap();
        assert_relative_eq!(two[3].unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn percent_change_skips_zero_denominator() {
        let out = AnalyticsEngine::new()
            .percent_change(&[Some(0.0), Some(5.0)], 1)
            .unwrap();
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let prices = vec![10.0, 12.0, 11.0, 13.0, 14.0, 16.0];
        let panel = panel(vec![("AAPL", prices.clone()), ("MSFT", prices)]);
        let corr = AnalyticsEngine::new().correlation_matrix(&panel).unwrap();

        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(corr.values[i][j].unwrap(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn degenerate_pairs_do_not_fail_the_matrix() {
        let panel = panel(vec![
            ("AAPL", vec![1.0, 2.0, 3.0, 4.0]),
            ("FLAT", vec![5.0, 5.0, 5.0, 5.0]),
            ("MSFT", vec![4.0, 3.0, 2.0, 1.0]),
        ]);
        let corr = AnalyticsEngine::new().correlation_matrix(&panel).unwrap();

        assert_eq!(corr.get("AAPL", "FLAT"), None);
        assert_eq!(corr.get("FLAT", "FLAT"), None);
        assert_relative_eq!(corr.get("AAPL", "MSFT").unwrap(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(corr.get("AAPL", "AAPL").unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn halted_ticker_has_no_correlation_and_zero_volatility() {
        let panel = panel(vec![
            ("AAPL", vec![187.1, 188.4, 186.9, 189.2, 190.0]),
            ("HALT", vec![101.37, 101.37, 101.37, 101.37, 101.37]),
        ]);
        let engine = AnalyticsEngine::new();
        let corr = engine.correlation_matrix(&panel).unwrap();

        assert_eq!(corr.get("AAPL", "HALT"), None);
        assert_eq!(corr.get("HALT", "AAPL"), None);
        assert_eq!(corr.get("HALT", "HALT"), None);

        let vol = engine
            .rolling_std_dev(panel.column("HALT").unwrap(), 3)
            .unwrap();
        assert_eq!(vol, vec![None, None, Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn correlation_rejects_empty_panel() {
        let empty = PricePanel::from_series(vec![]).unwrap();
        assert!(AnalyticsEngine::new().correlation_matrix(&empty).is_err());
    }

    #[test]
    fn returns_summary_reads_from_latest_close() {
        let panel = panel(vec![
            ("AAPL", vec![100.0, 105.0, 110.0, 120.0]),
            ("MSFT", vec![50.0, 55.0]),
        ]);
        let table = AnalyticsEngine::new()
            .returns_summary(&panel, &[1, 3, 10])
            .unwrap();

        assert_relative_eq!(table.get("AAPL", 1).unwrap(), 100.0 / 11.0, epsilon = 1e-9);
        assert_relative_eq!(table.get("AAPL", 3).unwrap(), 20.0, epsilon = 1e-9);
        assert_eq!(table.get("AAPL", 10), None);
        // MSFT's history ends on day 2; its 1-day return is measured there.
        assert_relative_eq!(table.get("MSFT", 1).unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(table.rows[1].last_price, Some(55.0));
        assert!(AnalyticsEngine::new().returns_summary(&panel, &[0]).is_err());
    }

    #[test]
    fn analyse_collects_every_line() {
        let panel = panel(vec![
            ("AAPL", vec![10.0, 12.0, 11.0, 13.0, 14.0, 16.0]),
            ("GOOG", vec![20.0, 21.0, 23.0, 22.0, 25.0, 24.0]),
        ]);
        let params = AnalysisParams {
            ma_windows: vec![2, 3],
            volatility_window: Some(3),
            return_horizons: vec![1, 5],
        };
        let analysis = AnalyticsEngine::new()
            .analyse(&panel, "AAPL", &params)
            .unwrap();

        assert_eq!(analysis.prices.len(), 6);
        assert_eq!(analysis.moving_averages.len(), 2);
        assert_eq!(analysis.moving_averages[1].defined(), 4);
        assert_eq!(analysis.volatility.as_ref().map(RollingLine::defined), Some(4));
        assert_eq!(analysis.correlation.size(), 2);
        assert_eq!(analysis.returns.rows.len(), 2);
    }

    #[test]
    fn analyse_rejects_unknown_ticker() {
        let panel = panel(vec![("AAPL", vec![1.0, 2.0])]);
        let err = AnalyticsEngine::new()
            .analyse(&panel, "TSLA", &AnalysisParams::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Core(_)));
    }

    fn series_and_window() -> impl Strategy<Value = (Vec<f64>, usize)> {
        prop::collection::vec(1.0f64..1_000.0, 1..60).prop_flat_map(|xs| {
            let len = xs.len();
            (Just(xs), 1..=len)
        })
    }

    proptest! {
        #[test]
        fn moving_average_defines_tail_positions((xs, w) in series_and_window()) {
            let out = AnalyticsEngine::new().moving_average(&present(&xs), w).unwrap();
            prop_assert_eq!(out.len(), xs.len());
            prop_assert_eq!(out.iter().flatten().count(), xs.len() - w + 1);
            prop_assert!(out[w - 1..].iter().all(Option::is_some));
        }

        #[test]
        fn moving_average_of_one_is_identity(xs in prop::collection::vec(1.0f64..1_000.0, 1..60)) {
            let series = present(&xs);
            prop_assert_eq!(AnalyticsEngine::new().moving_average(&series, 1).unwrap(), series);
        }

        #[test]
        fn rolling_std_dev_is_never_negative((xs, w) in series_and_window()) {
            prop_assume!(w >= 2);
            let out = AnalyticsEngine::new().rolling_std_dev(&present(&xs), w).unwrap();
            prop_assert!(out.iter().flatten().all(|v| *v >= 0.0));
        }

        #[test]
        fn percent_change_round_trips((xs, h) in series_and_window()) {
            let out = AnalyticsEngine::new().percent_change(&present(&xs), h).unwrap();
            for i in h..xs.len() {
                let pc = out[i].unwrap();
                let rebuilt = xs[i - h] * (1.0 + pc / 100.0);
                prop_assert!((rebuilt - xs[i]).abs() <= 1e-9 * xs[i].abs().max(1.0));
            }
        }

        #[test]
        fn correlation_is_symmetric(
            a in prop::collection::vec(1.0f64..1_000.0, 3..30),
            b in prop::collection::vec(1.0f64..1_000.0, 3..30),
        ) {
            let panel = panel(vec![("A", a), ("B", b)]);
            let corr = AnalyticsEngine::new().correlation_matrix(&panel).unwrap();
            prop_assert_eq!(corr.values[0][1], corr.values[1][0]);
            for i in 0..2 {
                if let Some(r) = corr.values[i][i] {
                    prop_assert!((r - 1.0).abs() < 1e-12);
                }
            }
        }
    }
}
