use crate::error::{ExtractifyError, Result};
use crate::extractor::Delimiter;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub binary: PathBuf,
    /// Arguments placed between the binary and the uploaded file path.
    pub launcher_args: Vec<String>,
    pub timeout_secs: u64,
    pub delimiter: Delimiter,
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            static_dir: None,
            max_upload_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads"),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("./extractify"),
            launcher_args: Vec::new(),
            timeout_secs: 60,
            delimiter: Delimiter::Tab,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExtractifyError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ExtractifyError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ExtractifyError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["extractify.toml", ".extractify.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref bind) = cli_args.bind {
            self.server.bind = bind.clone();
        }

        if let Some(ref static_dir) = cli_args.static_dir {
            self.server.static_dir = Some(static_dir.clone());
        }

        if let Some(max_upload_bytes) = cli_args.max_upload_bytes {
            self.server.max_upload_bytes = max_upload_bytes;
        }

        if let Some(ref upload_dir) = cli_args.upload_dir {
            self.upload.directory = upload_dir.clone();
        }

        if let Some(ref binary) = cli_args.extractor {
            self.extractor.binary = binary.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.extractor.timeout_secs = timeout;
        }

        if let Some(delimiter) = cli_args.delimiter {
            self.extractor.delimiter = delimiter;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ExtractifyError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ExtractifyError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if self.server.max_upload_bytes == 0 {
            return Err(ExtractifyError::Config {
                message: "Maximum upload size must be greater than 0".to_string(),
            });
        }

        if self.extractor.timeout_secs == 0 {
            return Err(ExtractifyError::Config {
                message: "Extractor timeout must be greater than 0".to_string(),
            });
        }

        if self.extractor.binary.as_os_str().is_empty() {
            return Err(ExtractifyError::Config {
                message: "Extractor binary path must not be empty".to_string(),
            });
        }

        if let Some(parent) = self.upload.directory.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ExtractifyError::Config {
                    message: format!("Parent directory does not exist: {}", parent.display()),
                });
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| ExtractifyError::Config {
                message: format!("Invalid bind address {:?}: {}", self.server.bind, e),
            })
    }


    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<u64>,
    pub upload_dir: Option<PathBuf>,
    pub extractor: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub delimiter: Option<Delimiter>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind(mut self, bind: Option<String>) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_static_dir(mut self, static_dir: Option<PathBuf>) -> Self {
        self.static_dir = static_dir;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: Option<u64>) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_upload_dir(mut self, upload_dir: Option<PathBuf>) -> Self {
        self.upload_dir = upload_dir;
        self
    }

    pub fn with_extractor(mut self, extractor: Option<PathBuf>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<Delimiter>) -> Self {
        self.delimiter = delimiter;
        self
    }
}
