use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
pub use settings::{AnalyticsConfig, Config, DataConfig, DataSource, DisplayConfig, LoggingConfig};
pub use telemetry::init_tracing;

/// Environment variables with this prefix override file values, using `__`
/// between path segments (e.g. `TICKERBOARD__DATA__SOURCE=csv`).
pub const ENV_PREFIX: &str = "TICKERBOARD";

/// Loads the application configuration from the `config.toml` file.
///
/// The file is optional; anything it leaves out takes its default. Values
/// from the environment are layered on top, then the result is validated.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Like [`load_config`], reading the given file instead of `config.toml`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = load_unvalidated_from(path)?;
    config.validate()?;
    Ok(config)
}

/// Reads the file and environment layers without validating the result.
///
/// For callers that layer further overrides (e.g. command-line flags) on
/// top; they must call [`Config::validate`] once those are applied.
pub fn load_unvalidated_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("data.tickers")
                .with_list_parse_key("analytics.ma_windows")
                .with_list_parse_key("analytics.return_horizons"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    Ok(builder.try_deserialize::<Config>()?)
}
