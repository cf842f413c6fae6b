//! HTTP request handlers for API endpoints

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::{FileOutcome, HeaderOutcome};
use crate::server::form::UploadForm;
use crate::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error<S: Into<String>>(status: StatusCode, message: S) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadersResponse {
    pub results: Vec<HeaderOutcome>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::version_info().to_string(),
    })
}

/// Run each uploaded CSV through the extractor.
///
/// Always answers 200 once the form is valid; per-file failures are
/// reported as `{filename, error}` entries in the array.
pub async fn process_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<FileOutcome>>, ApiError> {
    let multipart = multipart.map_err(rejection)?;
    let (files, options) = UploadForm::from_multipart(multipart)
        .await?
        .into_process_request()?;

    info!(
        files = files.len(),
        columns = options.columns.len(),
        combine = options.combine.is_some(),
        "Process request"
    );

    let outcomes = state.processor.process_files(&files, &options).await;
    Ok(Json(outcomes))
}

/// Return the CSV header row of each uploaded file.
pub async fn extract_headers(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<HeadersResponse>, ApiError> {
    let multipart = multipart.map_err(rejection)?;
    let form = UploadForm::from_multipart(multipart).await?;
    form.require_files()?;

    info!(files = form.files.len(), "Header request");

    let results = state.processor.extract_headers(&form.files).await;
    Ok(Json(HeadersResponse { results }))
}

fn rejection(rejection: MultipartRejection) -> ApiError {
    api_error(rejection.status(), rejection.body_text())
}
