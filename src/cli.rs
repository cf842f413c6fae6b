use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::extractor::Delimiter;
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "extractify-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve the extractify CSV tool over HTTP")]
#[command(
    long_about = "Accepts CSV uploads, runs each file through the extractify command-line tool \
                  and returns the tables it prints as JSON."
)]
#[command(after_help = "EXAMPLES:\n  \
    extractify-server\n  \
    extractify-server --bind 127.0.0.1:9000 --extractor /opt/extractify/bin/extractify\n  \
    extractify-server --config extractify.toml --static-dir frontend/dist\n  \
    extractify-server --generate-config --config extractify.toml")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "EXTRACTIFY_BIND")]
    pub bind: Option<String>,

    /// Directory where uploads are staged
    #[arg(long, env = "EXTRACTIFY_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Path to the extractify binary
    #[arg(long, env = "EXTRACTIFY_BIN")]
    pub extractor: Option<PathBuf>,

    /// Extractor timeout in seconds
    #[arg(long, help = "Seconds before a running extractor is killed")]
    pub timeout: Option<u64>,

    /// Field delimiter of the extractor's report
    #[arg(long, value_enum)]
    pub delimiter: Option<Delimiter>,

    /// Front-end build directory to serve
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Maximum request body size in MB
    #[arg(long, help = "Maximum upload request size (in MB)")]
    pub max_upload_mb: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Validate configuration and print it without starting the server
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let max_upload_bytes = self.max_upload_mb.map(|size| size * 1024 * 1024);

        CliOverrides::new()
            .with_bind(self.bind.clone())
            .with_static_dir(self.static_dir.clone())
            .with_max_upload_bytes(max_upload_bytes)
            .with_upload_dir(self.upload_dir.clone())
            .with_extractor(self.extractor.clone())
            .with_timeout(self.timeout)
            .with_delimiter(self.delimiter)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
