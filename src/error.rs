use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractifyError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch extractor {}: {source}", binary.display())]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extractor exited with {status}: {stderr}")]
    ExtractionFailed { status: ExitStatus, stderr: String },

    #[error("Extractor timed out after {:.1} seconds", limit.as_secs_f64())]
    Timeout { limit: Duration },

    #[error("Extractor produced unreadable output: {message}")]
    InvalidOutput { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExtractifyError {
    fn user_message(&self) -> String {
        match self {
            // The client shows the tool's own diagnostics, untouched.
            ExtractifyError::ExtractionFailed { status, stderr } => {
                if stderr.trim().is_empty() {
                    format!("Extractor exited with {} and no error output", status)
                } else {
                    stderr.clone()
                }
            }
            ExtractifyError::Launch { binary, source } => {
                format!("Could not run extractor {}: {}", binary.display(), source)
            }
            ExtractifyError::Io(e) => e.to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExtractifyError::Launch { .. } => Some(
                "Check that extractor.binary points to an executable file, or pass --extractor <path>.".to_string()
            ),
            ExtractifyError::Timeout { .. } => Some(
                "The extractor took longer than allowed. Increase extractor.timeout_secs or --timeout.".to_string()
            ),
            ExtractifyError::Config { .. } => Some(
                "Check your configuration file syntax, or run with --generate-config for a sample.".to_string()
            ),
            ExtractifyError::Io(_) => Some(
                "Ensure the upload directory exists and is writable.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ExtractifyError {
    fn from(error: toml::de::Error) -> Self {
        ExtractifyError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn exit_status(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }

    #[cfg(unix)]
    #[test]
    fn test_extraction_failure_reports_stderr_verbatim() {
        let error = ExtractifyError::ExtractionFailed {
            status: exit_status(1),
            stderr: "bad column".to_string(),
        };
        assert_eq!(error.user_message(), "bad column");
    }

    #[cfg(unix)]
    #[test]
    fn test_extraction_failure_without_stderr() {
        let error = ExtractifyError::ExtractionFailed {
            status: exit_status(3),
            stderr: "  \n".to_string(),
        };
        let message = error.user_message();
        assert!(message.contains("no error output"), "{}", message);
    }

    #[test]
    fn test_timeout_is_distinct() {
        let error = ExtractifyError::Timeout {
            limit: Duration::from_secs(5),
        };
        assert_eq!(error.to_string(), "Extractor timed out after 5.0 seconds");
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let error = ExtractifyError::from(toml_error);
        assert!(matches!(error, ExtractifyError::Config { .. }));
    }
}
