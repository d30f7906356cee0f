use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "tickerboard.log";

/// Installs the global tracing subscriber.
///
/// Logs go to stderr so they never interleave with rendered tables on stdout.
/// When `logging.directory` is set they are also written to a daily rolling
/// file; the returned guard flushes that file and must be held until exit.
pub fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| {
            ConfigError::Telemetry(format!("invalid log level '{}': {e}", logging.level))
        })?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let guard = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| ConfigError::Telemetry(e.to_string()))?;
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|e| ConfigError::Telemetry(e.to_string()))?;
            None
        }
    };

    tracing::debug!(level = %logging.level, file = logging.directory.is_some(), "Tracing initialised.");
    Ok(guard)
}
