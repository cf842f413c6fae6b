use crate::config::ExtractorConfig;
use crate::error::{ExtractifyError, Result};
use crate::extractor::report::{parse_report, Delimiter, Report};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Marks combine-directive arguments on the extractor's command line.
pub const COMBINE_SENTINEL: char = '*';

/// Pivot instruction forwarded to the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineDirective {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub file_path: &'a Path,
    pub columns: &'a [String],
    pub combine: Option<&'a CombineDirective>,
}

impl<'a> ExtractionRequest<'a> {
    pub fn new(file_path: &'a Path, columns: &'a [String]) -> Self {
        Self {
            file_path,
            columns,
            combine: None,
        }
    }

    pub fn with_combine(mut self, combine: Option<&'a CombineDirective>) -> Self {
        self.combine = combine;
        self
    }

    /// Plain columns the extractor will misread as combine arguments.
    pub fn ambiguous_columns(&self) -> impl Iterator<Item = &'a String> {
        self.columns
            .iter()
            .filter(|column| column.starts_with(COMBINE_SENTINEL))
    }
}

/// Runs the external extraction tool, one child process per file.
#[derive(Debug, Clone)]
pub struct Extractor {
    binary: PathBuf,
    launcher_args: Vec<String>,
    timeout: Duration,
    delimiter: Delimiter,
}

impl Extractor {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
            launcher_args: Vec::new(),
            timeout: Duration::from_secs(60),
            delimiter: Delimiter::Tab,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.binary.clone())
            .with_launcher_args(config.launcher_args.clone())
            .with_timeout(config.timeout())
            .with_delimiter(config.delimiter)
    }

    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments after the program name:
    /// `[launcher_args..., file, col..., *key, *value...]`.
    pub fn build_args(&self, request: &ExtractionRequest<'_>) -> Vec<OsString> {
        let combine_len = request.combine.map_or(0, |c| c.values.len() + 1);
        let mut args = Vec::with_capacity(
            self.launcher_args.len() + 1 + request.columns.len() + combine_len,
        );

        args.extend(self.launcher_args.iter().map(OsString::from));
        args.push(request.file_path.as_os_str().to_os_string());
        args.extend(request.columns.iter().map(OsString::from));

        if let Some(combine) = request.combine {
            args.push(sentinel(&combine.key));
            args.extend(combine.values.iter().map(|value| sentinel(value)));
        }

        args
    }

    /// Run the extractor and return its standard output.
    pub async fn run(&self, request: &ExtractionRequest<'_>) -> Result<String> {
        for column in request.ambiguous_columns() {
            warn!(
                column = %column,
                "column name starts with '{}' and will be read as a combine argument",
                COMBINE_SENTINEL
            );
        }

        let args = self.build_args(request);
        debug!(
            binary = %self.binary.display(),
            file = %request.file_path.display(),
            arg_count = args.len(),
            "Launching extractor"
        );

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|source| ExtractifyError::Launch {
                binary: self.binary.clone(),
                source,
            })?,
            Err(_) => {
                warn!(
                    file = %request.file_path.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Extractor timed out, killing it"
                );
                return Err(ExtractifyError::Timeout {
                    limit: self.timeout,
                });
            }
        };

        debug!(
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            "Extractor finished"
        );

        if !output.status.success() {
            return Err(ExtractifyError::ExtractionFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ExtractifyError::InvalidOutput {
            message: e.to_string(),
        })
    }

    /// Run the extractor and decode its report.
    pub async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Report> {
        let stdout = self.run(request).await?;
        let report = parse_report(&stdout, self.delimiter);

        if report.normal.is_empty() && !stdout.trim().is_empty() {
            warn!(
                file = %request.file_path.display(),
                "Extractor output did not contain a table"
            );
        }

        Ok(report)
    }
}

fn sentinel(value: &str) -> OsString {
    format!("{}{}", COMBINE_SENTINEL, value).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn columns(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// An extractor that runs `script` through `/bin/sh`.
    #[cfg(unix)]
    fn script_extractor(dir: &TempDir, script: &str) -> Extractor {
        let script_path = dir.path().join("extractor.sh");
        std::fs::write(&script_path, script).unwrap();

        Extractor::new("/bin/sh")
            .with_launcher_args(vec![script_path.to_string_lossy().into_owned()])
            .with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn test_build_args_without_combine() {
        let extractor = Extractor::new("extractify");
        let cols = columns(&["Name", "Total"]);
        let request = ExtractionRequest::new(Path::new("uploads/x_data.csv"), &cols);

        let args = extractor.build_args(&request);
        assert_eq!(args, vec!["uploads/x_data.csv", "Name", "Total"]);
    }

    #[test]
    fn test_build_args_with_combine() {
        let extractor = Extractor::new("extractify");
        let cols = columns(&["Name", "Total"]);
        let combine = CombineDirective {
            key: "Name".to_string(),
            values: columns(&["Total", "Tax"]),
        };
        let request =
            ExtractionRequest::new(Path::new("f.csv"), &cols).with_combine(Some(&combine));

        let args = extractor.build_args(&request);
        assert_eq!(args, vec!["f.csv", "Name", "Total", "*Name", "*Total", "*Tax"]);
    }

    #[test]
    fn test_build_args_with_launcher() {
        let extractor =
            Extractor::new("/bin/sh").with_launcher_args(vec!["extractify.sh".to_string()]);
        let cols = columns(&["A"]);
        let request = ExtractionRequest::new(Path::new("f.csv"), &cols);

        assert_eq!(extractor.build_args(&request), vec!["extractify.sh", "f.csv", "A"]);
    }

    #[test]
    fn test_ambiguous_columns() {
        let cols = columns(&["A", "*B"]);
        let request = ExtractionRequest::new(Path::new("f.csv"), &cols);

        let ambiguous: Vec<&String> = request.ambiguous_columns().collect();
        assert_eq!(ambiguous, vec!["*B"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_parses_stdout() {
        let dir = TempDir::new().unwrap();
        let extractor = script_extractor(&dir, "printf 'A\\tB\\n---\\n1\\t2\\nRow count: 1\\n'\n");
        let cols = columns(&["A", "B"]);

        let report = extractor
            .extract(&ExtractionRequest::new(Path::new("f.csv"), &cols))
            .await
            .unwrap();

        assert_eq!(report.normal.headers, columns(&["A", "B"]));
        assert_eq!(report.normal.rows, vec![columns(&["1", "2"])]);
        assert!(report.combined.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extractor_receives_arguments() {
        let dir = TempDir::new().unwrap();
        let extractor = script_extractor(&dir, "printf '%s\\n' \"$@\"\n");
        let cols = columns(&["Name"]);
        let combine = CombineDirective {
            key: "Name".to_string(),
            values: columns(&["Total"]),
        };
        let request =
            ExtractionRequest::new(Path::new("f.csv"), &cols).with_combine(Some(&combine));

        let stdout = extractor.run(&request).await.unwrap();
        assert_eq!(stdout, "f.csv\nName\n*Name\n*Total\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let extractor = script_extractor(&dir, "printf 'bad column' >&2\nexit 2\n");
        let cols = columns(&["A"]);

        let error = extractor
            .extract(&ExtractionRequest::new(Path::new("f.csv"), &cols))
            .await
            .unwrap_err();

        match error {
            ExtractifyError::ExtractionFailed { status, stderr } => {
                assert_eq!(status.code(), Some(2));
                assert_eq!(stderr, "bad column");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let extractor = Extractor::new("/nonexistent/extractify-binary");
        let cols = columns(&["A"]);

        let error = extractor
            .run(&ExtractionRequest::new(Path::new("f.csv"), &cols))
            .await
            .unwrap_err();

        assert!(matches!(error, ExtractifyError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_extractor_times_out() {
        let dir = TempDir::new().unwrap();
        let extractor = script_extractor(&dir, "exec sleep 5\n")
            .with_timeout(Duration::from_millis(200));
        let cols = columns(&["A"]);

        let started = Instant::now();
        let error = extractor
            .run(&ExtractionRequest::new(Path::new("f.csv"), &cols))
            .await
            .unwrap_err();

        assert!(matches!(error, ExtractifyError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
