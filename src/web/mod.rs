//! HTTP front end for the mashup service.
//!
//! `POST /process` validates the form synchronously and answers right away;
//! the mashup itself runs as a detached background job that emails the
//! result. The caller never learns how that job ends.

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::MashupPipeline;
use crate::validation::{MashupRequest, RawRequest};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const RESULT_HTML: &str = include_str!("../../static/result.html");

/// Acknowledgement returned once a job has been scheduled
pub const ACCEPTED_MESSAGE: &str = "Mashup is being processed. You will receive an email shortly.";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MashupPipeline>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pipeline: Arc<MashupPipeline>) -> Self {
        let config = Arc::new(pipeline.config().clone());
        Self { pipeline, config }
    }
}

/// Form fields accepted by `POST /process`; absent fields read as empty
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessForm {
    pub singer_name: String,
    pub num_videos: String,
    pub duration: String,
    pub email: String,
}

impl From<ProcessForm> for RawRequest {
    fn from(form: ProcessForm) -> Self {
        RawRequest {
            query: form.singer_name.trim().to_string(),
            count: form.num_videos.trim().to_string(),
            trim_seconds: form.duration.trim().to_string(),
            destination: form.email.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
}

/// Errors surfaced to the HTTP caller
#[derive(Debug)]
pub enum ApiError {
    /// One message per failed check
    Validation(Vec<String>),
    /// Anything that went wrong while handling the request itself
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, errors),
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, vec![msg])
            }
        };

        let body = Json(json!({
            "success": false,
            "errors": errors,
        }));

        (status, body).into_response()
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::Internal(rejection.body_text())
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/process", post(process))
        .route("/result", get(result))
        .route("/health", get(health))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn result() -> Html<&'static str> {
    Html(RESULT_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Validate the form and schedule the mashup in the background
async fn process(
    State(state): State<AppState>,
    form: Result<Form<ProcessForm>, FormRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let Form(form) = form?;
    let raw = RawRequest::from(form);

    let request = MashupRequest::parse_web(&raw, state.config.mail_configured()).map_err(|errors| {
        tracing::info!("Rejected mashup request: {}", errors.join("; "));
        ApiError::Validation(errors)
    })?;

    let job = state.pipeline.spawn_email_job(request);
    tracing::info!("Scheduled mashup job {} for '{}'", job.id(), raw.query);

    Ok(Json(ProcessResponse {
        success: true,
        message: ACCEPTED_MESSAGE.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_values_are_trimmed() {
        let raw = RawRequest::from(ProcessForm {
            singer_name: "  Sharry Maan ".into(),
            num_videos: " 20".into(),
            duration: "25 ".into(),
            email: " fan@example.com ".into(),
        });
        assert_eq!(raw.query, "Sharry Maan");
        assert_eq!(raw.count, "20");
        assert_eq!(raw.trim_seconds, "25");
        assert_eq!(raw.destination, "fan@example.com");
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = ApiError::Validation(vec!["Invalid email format".into()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_is_server_error() {
        let response = ApiError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
