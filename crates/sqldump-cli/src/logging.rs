//! Logging setup for the sqldump binary
//!
//! Diagnostics go to stderr so stdout can carry the dump. `RUST_LOG` takes
//! precedence over the verbosity flags.

use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub default_filter: String,
    /// Include file and line in each event
    pub include_location: bool,
    /// Log span open/close (for timing streamed queries)
    pub enable_spans: bool,
    pub ansi: bool,
}

impl LoggingConfig {
    /// Configuration for `-v` repeated `verbosity` times
    pub fn for_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            default_filter: format!("warn,sqldump={}", level),
            include_location: verbosity > 1,
            enable_spans: verbosity > 1,
            ansi: std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Install the global subscriber
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)?,
    };

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(span_events)
        .with_ansi(config.ansi)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).try_init()?;

    tracing::debug!(filter = %config.default_filter, "logging initialized");
    Ok(())
}
