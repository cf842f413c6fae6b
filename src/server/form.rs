//! Multipart form decoding for the upload endpoints.

use crate::extractor::CombineDirective;
use crate::pipeline::{ProcessOptions, UploadedFile};
use crate::server::handlers::{api_error, ApiError};
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

/// Every field the upload endpoints understand, as sent by the client.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub columns: Vec<String>,
    pub combine: bool,
    pub combine_key: String,
    pub combine_values: Vec<String>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "files" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content = field.bytes().await.map_err(malformed)?;
                    form.files.push(UploadedFile::new(filename, content));
                }
                "columns" => form.columns.push(field.text().await.map_err(malformed)?),
                "combine" => {
                    let value = field.text().await.map_err(malformed)?;
                    form.combine = parse_form_bool(&value).ok_or_else(|| {
                        api_error(
                            StatusCode::UNPROCESSABLE_ENTITY,
                            format!("combine: expected a boolean, got {:?}", value),
                        )
                    })?;
                }
                "combineKey" => form.combine_key = field.text().await.map_err(malformed)?,
                "combineValues" => form.combine_values.push(field.text().await.map_err(malformed)?),
                _ => debug!(field = %name, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Files for either endpoint; at least one is required.
    pub fn require_files(&self) -> Result<(), ApiError> {
        if self.files.is_empty() {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "files: at least one file is required",
            ));
        }
        Ok(())
    }

    /// Split into the uploaded files and the extraction options.
    pub fn into_process_request(self) -> Result<(Vec<UploadedFile>, ProcessOptions), ApiError> {
        self.require_files()?;

        if self.columns.is_empty() {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "columns: at least one column is required",
            ));
        }

        let combine = self.combine.then(|| CombineDirective {
            key: self.combine_key,
            values: self.combine_values,
        });

        Ok((
            self.files,
            ProcessOptions {
                columns: self.columns,
                combine,
            },
        ))
    }
}

/// Parse the boolean spellings HTML forms and JS clients send.
pub fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn malformed(error: MultipartError) -> ApiError {
    api_error(
        error.status(),
        format!("Malformed multipart body: {}", error.body_text()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(columns: &[&str], combine: bool) -> UploadForm {
        UploadForm {
            files: vec![UploadedFile::new("f.csv", "A\n")],
            columns: columns.iter().map(|c| c.to_string()).collect(),
            combine,
            combine_key: "A".to_string(),
            combine_values: vec!["B".to_string(), "C".to_string()],
        }
    }

    #[test]
    fn test_form_bool_spellings() {
        for value in ["true", "TRUE", "1", "yes", "on", " True "] {
            assert_eq!(parse_form_bool(value), Some(true), "{}", value);
        }
        for value in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_form_bool(value), Some(false), "{}", value);
        }
        assert_eq!(parse_form_bool("maybe"), None);
        assert_eq!(parse_form_bool(""), None);
    }

    #[test]
    fn test_combine_directive_only_when_enabled() {
        let (_, options) = form_with(&["A"], false).into_process_request().unwrap();
        assert_eq!(options.combine, None);

        let (_, options) = form_with(&["A"], true).into_process_request().unwrap();
        assert_eq!(
            options.combine,
            Some(CombineDirective {
                key: "A".to_string(),
                values: vec!["B".to_string(), "C".to_string()],
            })
        );
    }

    #[test]
    fn test_columns_required() {
        let (status, _) = form_with(&[], false).into_process_request().unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_files_required() {
        let mut form = form_with(&["A"], false);
        form.files.clear();

        let (status, body) = form.into_process_request().unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.contains("files"));
    }
}
