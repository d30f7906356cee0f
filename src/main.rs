use analytics::{CorrelationMatrix, ReturnsTable};
use anyhow::Context;
use api_client::error::ApiError;
use api_client::{CsvSource, MarketDataClient, YahooClient};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use configuration::{Config, DataConfig, DataSource};
use core_types::{PanelKey, PricePanel, PriceSeries};
use dashboard::{Command, Dashboard, DashboardState, HELP, Transition, render};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// The main entry point for the Tickerboard stock dashboard.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Overrides such as TICKERBOARD__DATA__SOURCE may live in a .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = cli.load_config()?;

    // Held until exit so buffered file logs are flushed.
    let _guard = configuration::init_tracing(&config.logging)?;
    tracing::debug!(path = %cli.config.display(), "Configuration loaded.");
    tracing::info!(
        tickers = ?config.data.tickers,
        source = ?config.data.source,
        "Tickerboard starting."
    );

    let client = ProgressClient::new(build_client(&config.data)?);
    let mut dashboard = Dashboard::new(client, &config);
    let mut state = dashboard.initial_state(&config);

    match cli.command {
        Commands::Show(args) => {
            args.range.apply(&mut state, dashboard.universe())?;
            if let Some(ticker) = args.ticker {
                state.apply(Command::Select(ticker.to_uppercase()), dashboard.universe())?;
            }
            if args.no_ma {
                state.show_ma = false;
            }
            if args.volatility {
                state.show_volatility = true;
            }
            if let Some(rows) = args.rows {
                state.rows = rows;
            }

            if args.json {
                let analysis = dashboard.analyse(&state).await?;
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{}", dashboard.render(&state).await?);
            }
        }
        Commands::Correlation(args) => {
            args.range.apply(&mut state, dashboard.universe())?;
            let matrix = dashboard.correlation(&state).await?;
            print_correlation(&matrix, args.json)?;
        }
        Commands::Returns(args) => {
            args.range.apply(&mut state, dashboard.universe())?;
            let table = dashboard.returns(&state).await?;
            print_returns(&table, args.json)?;
        }
        Commands::Interactive(args) => {
            args.apply(&mut state, dashboard.universe())?;
            interactive(&mut dashboard, state).await?;
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A terminal dashboard of historical stock prices and their statistics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Where to read daily closes from, overriding the configuration.
    #[arg(long, global = true, value_enum)]
    source: Option<DataSource>,

    /// A `date,ticker,close` CSV file. Implies `--source csv`.
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Comma-separated tickers, overriding the configured universe.
    #[arg(long, global = true, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the full dashboard for one ticker.
    Show(ShowArgs),
    /// Print the correlation heatmap of the ticker universe.
    Correlation(ReportArgs),
    /// Print the trailing returns of every ticker.
    Returns(ReturnsArgs),
    /// Run the dashboard as an interactive prompt.
    Interactive(RangeArgs),
}

#[derive(Args)]
struct RangeArgs {
    /// First date of the range (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of the range, exclusive (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn apply(&self, state: &mut DashboardState, universe: &[String]) -> anyhow::Result<()> {
        if self.from.is_none() && self.to.is_none() {
            return Ok(());
        }
        let start = self.from.unwrap_or(state.start);
        let end = self.to.unwrap_or(state.end);
        state.apply(Command::Range(start, end), universe)?;
        Ok(())
    }
}

#[derive(Args)]
struct ShowArgs {
    /// The ticker to chart. Defaults to the first configured ticker.
    #[arg(long)]
    ticker: Option<String>,

    /// Hide the moving-average columns.
    #[arg(long)]
    no_ma: bool,

    /// Include the rolling volatility table.
    #[arg(long)]
    volatility: bool,

    /// Number of recent dates in the price table.
    #[arg(long)]
    rows: Option<usize>,

    /// Print the analysis as JSON instead of tables.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    range: RangeArgs,
}

#[derive(Args)]
struct ReturnsArgs {
    /// Comma-separated horizons in trading days, e.g. "7,30,252".
    #[arg(long, value_delimiter = ',')]
    horizons: Option<Vec<usize>>,

    #[arg(long)]
    json: bool,

    #[command(flatten)]
    range: RangeArgs,
}

impl Cli {
    /// Reads the file and environment layers, applies the flags on top, then
    /// validates the combined result once.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = configuration::load_unvalidated_from(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Layers command-line flags over the loaded configuration.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(source) = self.source {
            config.data.source = source;
        }
        if let Some(path) = &self.csv {
            config.data.csv_path = Some(path.clone());
            if self.source.is_none() {
                config.data.source = DataSource::Csv;
            }
        }
        if let Some(tickers) = &self.tickers {
            config.data.tickers = tickers.clone();
        }
        if let Commands::Returns(ReturnsArgs {
            horizons: Some(horizons),
            ..
        }) = &self.command
        {
            config.analytics.return_horizons = horizons.clone();
        }
    }
}

// ==============================================================================
// Data Sources
// ==============================================================================

fn build_client(data: &DataConfig) -> anyhow::Result<Box<dyn MarketDataClient>> {
    Ok(match data.source {
        DataSource::Yahoo => Box::new(YahooClient::from_config(data)?),
        DataSource::Csv => {
            let path = data
                .csv_path
                .as_ref()
                .context("`data.csv_path` is required for the csv source")?;
            Box::new(CsvSource::new(path).with_context(|| format!("Failed to read {}", path.display()))?)
        }
    })
}

/// Shows a progress bar while a panel's tickers are fetched.
struct ProgressClient {
    inner: Box<dyn MarketDataClient>,
}

impl ProgressClient {
    fn new(inner: Box<dyn MarketDataClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl MarketDataClient for ProgressClient {
    async fn fetch_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ApiError> {
        self.inner.fetch_closes(ticker, start, end).await
    }

    async fn fetch_panel(&self, key: &PanelKey) -> Result<PricePanel, ApiError> {
        let progress_bar = ProgressBar::new(key.tickers().count() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress_bar.set_style(style.progress_chars("#>-"));
        }

        let fetches = key.tickers().map(|ticker| {
            let pb = progress_bar.clone();
            async move {
                let result = self.inner.fetch_closes(ticker, key.start(), key.end()).await;
                pb.inc(1);
                pb.set_message(format!("{ticker} done"));
                result
            }
        });

        let series = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>();

        match &series {
            Ok(_) => progress_bar.finish_and_clear(),
            Err(_) => progress_bar.abandon_with_message("fetch failed"),
        }

        Ok(PricePanel::from_series(series?)?)
    }
}

// ==============================================================================
// Output
// ==============================================================================

fn print_correlation(matrix: &CorrelationMatrix, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(matrix)?);
    } else {
        println!("Correlation Heatmap\n{}", render::correlation_table(matrix));
    }
    Ok(())
}

fn print_returns(table: &ReturnsTable, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
    } else {
        println!("Trailing Returns\n{}", render::returns_table(table));
    }
    Ok(())
}

/// Reads commands from stdin and re-renders after each one. The panel is
/// fetched once per date range; toggles and ticker changes reuse it.
async fn interactive<C: MarketDataClient>(
    dashboard: &mut Dashboard<C>,
    mut state: DashboardState,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    draw(dashboard, &state).await;
    println!("{HELP}");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match state.apply(command, dashboard.universe()) {
            Ok(Transition::Render) => draw(dashboard, &state).await,
            Ok(Transition::Refetch) => {
                dashboard.cache_mut().invalidate();
                draw(dashboard, &state).await;
            }
            Ok(Transition::ShowHelp) => println!("{HELP}"),
            Ok(Transition::Quit) => break,
            Err(e) => eprintln!("{e}"),
        }
    }

    tracing::info!("Interactive session ended.");
    Ok(())
}

async fn draw<C: MarketDataClient>(dashboard: &mut Dashboard<C>, state: &DashboardState) {
    match dashboard.render(state).await {
        Ok(frame) => println!("{frame}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render the dashboard.");
            eprintln!("Error: {e}");
        }
    }
}
