//! Per-request batch processing: stage each upload, run the extractor on it,
//! decode the report, and remove the staged file.
//!
//! Files are handled one after another in input order. A failure is recorded
//! against its own file and never stops the rest of the batch.

use crate::config::Config;
use crate::error::{ExtractifyError, Result, UserFriendlyError};
use crate::extractor::{CombineDirective, ExtractionRequest, Extractor, Report, Table};
use crate::upload::{read_csv_headers, StagedUpload, UploadStore};
use axum::body::Bytes;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{info, info_span, warn, Instrument};

/// One file part of an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied name, used only to label the result.
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new<S: Into<String>, B: Into<Bytes>>(filename: S, content: B) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub columns: Vec<String>,
    pub combine: Option<CombineDirective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Extracted {
        filename: String,
        normal: Table,
        combined: Table,
    },
    Failed {
        filename: String,
        error: String,
    },
}

impl FileOutcome {
    fn from_result(filename: &str, result: Result<Report>) -> Self {
        match result {
            Ok(report) => FileOutcome::Extracted {
                filename: filename.to_string(),
                normal: report.normal,
                combined: report.combined,
            },
            Err(e) => FileOutcome::Failed {
                filename: filename.to_string(),
                error: e.user_message(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderOutcome {
    Headers { filename: String, headers: Vec<String> },
    Failed { filename: String, error: String },
}

impl HeaderOutcome {
    fn from_result(filename: &str, result: Result<Vec<String>>) -> Self {
        match result {
            Ok(headers) => HeaderOutcome::Headers {
                filename: filename.to_string(),
                headers,
            },
            Err(e) => HeaderOutcome::Failed {
                filename: filename.to_string(),
                error: e.user_message(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HeaderOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn new<I>(errors: I, started: Instant) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut summary = Self {
            succeeded: 0,
            failed: 0,
            elapsed: started.elapsed(),
        };
        for is_error in errors {
            if is_error {
                summary.failed += 1;
            } else {
                summary.succeeded += 1;
            }
        }
        summary
    }

    fn log(&self, operation: &str) {
        info!(
            operation,
            succeeded = self.succeeded,
            failed = self.failed,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Batch finished"
        );
    }
}

#[derive(Debug, Clone)]
pub struct BatchProcessor {
    store: UploadStore,
    extractor: Extractor,
}

impl BatchProcessor {
    pub fn new(store: UploadStore, extractor: Extractor) -> Self {
        Self { store, extractor }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            UploadStore::new(config.upload.directory.clone()),
            Extractor::from_config(&config.extractor),
        )
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Run every file through the extractor. Results follow input order.
    pub async fn process_files(
        &self,
        files: &[UploadedFile],
        options: &ProcessOptions,
    ) -> Vec<FileOutcome> {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            let span = info_span!("process_file", filename = %file.filename);
            let result = self.process_file(file, options).instrument(span).await;

            if let Err(ref e) = result {
                warn!(filename = %file.filename, error = %e, "File extraction failed");
            }
            outcomes.push(FileOutcome::from_result(&file.filename, result));
        }

        BatchSummary::new(outcomes.iter().map(FileOutcome::is_error), started).log("process-csv");
        outcomes
    }

    async fn process_file(&self, file: &UploadedFile, options: &ProcessOptions) -> Result<Report> {
        let staged = self.stage(file).await?;

        let request = ExtractionRequest::new(staged.path(), &options.columns)
            .with_combine(options.combine.as_ref());

        self.extractor.extract(&request).await
    }

    /// Read the CSV header row of every file. Results follow input order.
    pub async fn extract_headers(&self, files: &[UploadedFile]) -> Vec<HeaderOutcome> {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            let store = self.store.clone();
            let upload = file.clone();
            let result = task::spawn_blocking(move || {
                let staged = store.stage(&upload.filename, &upload.content)?;
                read_csv_headers(staged.path())
            })
            .await
            .map_err(join_error)
            .and_then(|result| result);

            if let Err(ref e) = result {
                warn!(filename = %file.filename, error = %e, "Header extraction failed");
            }
            outcomes.push(HeaderOutcome::from_result(&file.filename, result));
        }

        BatchSummary::new(outcomes.iter().map(HeaderOutcome::is_error), started)
            .log("extract-headers");
        outcomes
    }

    async fn stage(&self, file: &UploadedFile) -> Result<StagedUpload> {
        let store = self.store.clone();
        let upload = file.clone();

        task::spawn_blocking(move || store.stage(&upload.filename, &upload.content))
            .await
            .map_err(join_error)?
    }
}

fn join_error(error: task::JoinError) -> ExtractifyError {
    ExtractifyError::Io(std::io::Error::other(format!("Staging task failed: {}", error)))
}
