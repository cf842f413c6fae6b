pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod shutdown;
pub mod upload;

// Public API re-exports
pub use cli::Cli;
pub use config::{CliOverrides, Config, ExtractorConfig, ServerConfig, UploadConfig};
pub use error::{ExtractifyError, Result, UserFriendlyError};
pub use logging::LogFormat;

// Core functionality re-exports
pub use extractor::{
    parse_report, parse_table, CombineDirective, Delimiter, ExtractionRequest, Extractor, Report,
    Table,
};
pub use pipeline::{BatchProcessor, FileOutcome, HeaderOutcome, ProcessOptions, UploadedFile};
pub use server::{build_router, AppState};
pub use shutdown::GracefulShutdown;
pub use upload::{StagedUpload, UploadStore};

use axum::Router;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Main library interface: a configured server ready to bind.
pub struct ExtractifyServer {
    config: Config,
    processor: BatchProcessor,
    shutdown: GracefulShutdown,
}

impl ExtractifyServer {
    /// Create a server from a validated configuration.
    ///
    /// Creates the upload directory if it is missing.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let processor = BatchProcessor::from_config(&config);
        processor.store().ensure_directory()?;

        if binary_missing(processor.extractor().binary()) {
            warn!(
                binary = %processor.extractor().binary().display(),
                "Extractor binary not found; extraction requests will fail until it is installed"
            );
        }

        Ok(Self {
            config,
            processor,
            shutdown: GracefulShutdown::new(),
        })
    }

    /// Create a server from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(config)
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(self.processor.clone()), &self.config.server)
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.bind_address()?;
        let listener = TcpListener::bind(addr).await?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            addr = %listener.local_addr()?,
            upload_dir = %self.config.upload.directory.display(),
            extractor = %self.config.extractor.binary.display(),
            "Extractify server listening"
        );

        server::serve(listener, self.router(), self.shutdown.clone()).await?;

        info!("Server stopped");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_handle(&self) -> &GracefulShutdown {
        &self.shutdown
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }
}

/// A bare command name is resolved through `PATH` at launch, so only
/// paths with a directory part are checked up front.
fn binary_missing(binary: &Path) -> bool {
    binary.components().count() > 1 && !binary.exists()
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
