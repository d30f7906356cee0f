//! Terminal rendering of an analysis pass.

use analytics::{CorrelationMatrix, ReturnsTable, RollingLine, TickerAnalysis};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};

/// Placeholder for a point without a value.
pub const MISSING: &str = "—";

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn number(value: Option<f64>) -> Cell {
    let text = value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.2}"));
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn percent(value: Option<f64>) -> Cell {
    match value {
        Some(v) => {
            let color = if v >= 0.0 { Color::Green } else { Color::Red };
            Cell::new(format!("{v:+.2}%"))
                .fg(color)
                .set_alignment(CellAlignment::Right)
        }
        None => Cell::new(MISSING).set_alignment(CellAlignment::Right),
    }
}

/// Closes of the selected ticker over the last `rows` dates, with one
/// column per moving average.
pub fn price_table(analysis: &TickerAnalysis, rows: usize) -> Table {
    let mut table = table();

    let mut header = vec![Cell::new("Date"), Cell::new(format!("{} Price", analysis.ticker))];
    header.extend(
        analysis
            .moving_averages
            .iter()
            .map(|line| Cell::new(format!("{}-Day MA", line.window))),
    );
    table.set_header(header);

    let start = analysis.dates.len().saturating_sub(rows);
    for i in start..analysis.dates.len() {
        let mut row = vec![
            Cell::new(analysis.dates[i].to_string()),
            number(analysis.prices[i]),
        ];
        row.extend(analysis.moving_averages.iter().map(|line| number(line.values[i])));
        table.add_row(row);
    }

    table
}

/// Rolling volatility of the selected ticker over the last `rows` dates.
pub fn volatility_table(analysis: &TickerAnalysis, line: &RollingLine, rows: usize) -> Table {
    let mut table = table();
    table.set_header(vec![
        Cell::new("Date"),
        Cell::new(format!("{}-Day Std Dev", line.window)),
    ]);

    let start = analysis.dates.len().saturating_sub(rows);
    for i in start..analysis.dates.len() {
        table.add_row(vec![
            Cell::new(analysis.dates[i].to_string()),
            number(line.values[i]),
        ]);
    }
    table
}

/// Colour of a correlation cell: warm for positive, cool for negative.
pub fn heat_color(r: f64) -> Color {
    match r {
        r if r >= 0.75 => Color::Red,
        r if r >= 0.25 => Color::DarkYellow,
        r if r > -0.25 => Color::Grey,
        r if r > -0.75 => Color::Cyan,
        _ => Color::Blue,
    }
}

/// The correlation matrix as an annotated heatmap.
pub fn correlation_table(matrix: &CorrelationMatrix) -> Table {
    let mut table = table();

    let mut header = vec![Cell::new("")];
    header.extend(matrix.tickers.iter().map(Cell::new));
    table.set_header(header);

    for (ticker, row) in matrix.tickers.iter().zip(&matrix.values) {
        let mut cells = vec![Cell::new(ticker)];
        cells.extend(row.iter().map(|value| match value {
            Some(r) => Cell::new(format!("{r:.2}"))
                .fg(heat_color(*r))
                .set_alignment(CellAlignment::Right),
            None => Cell::new(MISSING).set_alignment(CellAlignment::Right),
        }));
        table.add_row(cells);
    }

    table
}

/// Trailing returns of every ticker.
pub fn returns_table(returns: &ReturnsTable) -> Table {
    let mut table = table();

    let mut header = vec![Cell::new("Ticker"), Cell::new("As of"), Cell::new("Last")];
    header.extend(returns.horizons.iter().map(|h| Cell::new(format!("{h}-Day"))));
    table.set_header(header);

    for row in &returns.rows {
        let as_of = row
            .as_of
            .map_or_else(|| MISSING.to_string(), |d| d.to_string());
        let mut cells = vec![Cell::new(&row.ticker), Cell::new(as_of), number(row.last_price)];
        cells.extend(row.returns.iter().map(|r| percent(*r)));
        table.add_row(cells);
    }

    table
}

/// Renders every section of one dashboard frame.
pub fn dashboard(analysis: &TickerAnalysis, rows: usize) -> String {
    let mut out = String::new();

    let (first, last) = match (analysis.dates.first(), analysis.dates.last()) {
        (Some(first), Some(last)) => (first.to_string(), last.to_string()),
        _ => (MISSING.to_string(), MISSING.to_string()),
    };
    out.push_str(&format!("Stocks Dashboard ({first} to {last})\n\n"));

    out.push_str(&format!("{} Price History\n", analysis.ticker));
    out.push_str(&price_table(analysis, rows).to_string());
    out.push_str("\n\n");

    out.push_str("Correlation Heatmap\n");
    out.push_str(&correlation_table(&analysis.correlation).to_string());
    out.push_str("\n\n");

    if let Some(line) = &analysis.volatility {
        out.push_str(&format!(
            "{} - Rolling {}-Day Volatility\n",
            analysis.ticker, line.window
        ));
        out.push_str(&volatility_table(analysis, line, rows).to_string());
        out.push_str("\n\n");
    }

    out.push_str("Trailing Returns\n");
    out.push_str(&returns_table(&analysis.returns).to_string());
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::{AnalysisParams, AnalyticsEngine};
    use chrono::NaiveDate;
    use core_types::{PricePanel, PricePoint, PriceSeries};

    fn series(ticker: &str, prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint::new(start + chrono::Days::new(i as u64), *p))
            .collect();
        PriceSeries::new(ticker, points).unwrap()
    }

    fn analysis(volatility: Option<usize>) -> TickerAnalysis {
        let panel = PricePanel::from_series(vec![
            series("AAPL", &[10.0, 12.0, 11.0, 13.0, 14.0, 16.0]),
            series("MSFT", &[30.0, 29.0, 31.0, 33.0, 32.0, 35.0]),
        ])
        .unwrap();
        let params = AnalysisParams {
            ma_windows: vec![3],
            volatility_window: volatility,
            return_horizons: vec![1, 10],
        };
        AnalyticsEngine::new().analyse(&panel, "AAPL", &params).unwrap()
    }

    #[test]
    fn price_table_shows_only_tail_rows() {
        let rendered = price_table(&analysis(None), 4).to_string();
        assert!(rendered.contains("3-Day MA"));
        assert!(rendered.contains("2024-01-06"));
        assert!(rendered.contains("14.33"));
        assert!(!rendered.contains("2024-01-02"));
    }

    #[test]
    fn price_table_marks_undefined_points() {
        let rendered = price_table(&analysis(None), 10).to_string();
        assert!(rendered.contains(MISSING));
    }

    #[test]
    fn dashboard_includes_volatility_only_when_requested() {
        assert!(!dashboard(&analysis(None), 5).contains("Volatility"));
        let with_vol = dashboard(&analysis(Some(3)), 5);
        assert!(with_vol.contains("AAPL - Rolling 3-Day Volatility"));
        assert!(with_vol.contains("Correlation Heatmap"));
    }

    #[test]
    fn returns_table_formats_signed_percentages() {
        let rendered = returns_table(&analysis(None).returns).to_string();
        assert!(rendered.contains("+14.29%"));
        assert!(rendered.contains("MSFT"));
        assert!(rendered.contains("10-Day"));
    }

    #[test]
    fn heat_colors_are_ordered() {
        assert_eq!(heat_color(1.0), Color::Red);
        assert_eq!(heat_color(0.0), Color::Grey);
        assert_eq!(heat_color(-1.0), Color::Blue);
    }
}
