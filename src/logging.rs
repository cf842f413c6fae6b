use crate::error::{ExtractifyError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human-readable output
    Human,
    /// One JSON object per event
    Json,
    /// Single-line plain text
    Plain,
}

/// Default filter directive for a verbosity level.
pub fn default_directive(verbose: u8, quiet: bool) -> String {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    format!("extractify_server={level},tower_http={level}")
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over
/// the verbosity flags.
pub fn init(format: LogFormat, verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Human => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().compact().with_ansi(false))
            .try_init(),
    };

    result.map_err(|e| ExtractifyError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })
}
