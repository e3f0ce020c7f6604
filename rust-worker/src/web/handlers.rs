//! Job submission endpoint handlers.
//!
//! The submission handler only:
//! 1. Reads the JSON or multipart body (storing an uploaded file)
//! 2. Verifies the API key
//! 3. Validates the job and hands it to the dispatch queue
//! 4. Returns immediately
//!
//! Delivery happens in the background; its outcome is only logged.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::attachment::AttachmentDescriptor;
use crate::dispatch::DispatchQueue;
use crate::job::Job;
use crate::transport::Transport;
use crate::web::auth::{verify_api_key, API_KEY_HEADER};
use crate::attachment::upload::{discard_descriptor, discard_upload};
use crate::web::upload_store::{store_upload, StoredUpload, UploadError};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: DispatchQueue,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(config: Config, queue: DispatchQueue, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            queue,
            transport,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub transport: &'static str,
    pub transport_status: &'static str,
}

/// Health check endpoint. Also reports whether the transport session is usable.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let transport_status = match state.transport.health_check().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(transport = state.transport.name(), error = %e, "transport_health_check_failed");
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: "ok",
        transport: state.transport.name(),
        transport_status,
    })
}

// =============================================================================
// Send Message
// =============================================================================

/// Recipients as a JSON array, or one string holding a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipientList {
    Many(Vec<String>),
    One(String),
}

impl RecipientList {
    fn into_vec(self) -> Vec<String> {
        match self {
            RecipientList::Many(list) => list,
            RecipientList::One(raw) => parse_recipients(&raw),
        }
    }
}

/// JSON submission body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub recipients: Option<RecipientList>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Acceptance acknowledgement.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: &'static str,
    pub job_id: u64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Submission fields gathered from either body format.
#[derive(Debug, Default)]
struct Submission {
    api_key: Option<String>,
    recipients: Vec<String>,
    message: String,
    file_url: Option<String>,
    upload: Option<StoredUpload>,
}

impl From<SendMessageRequest> for Submission {
    fn from(body: SendMessageRequest) -> Self {
        Submission {
            api_key: body.api_key,
            recipients: body.recipients.map(RecipientList::into_vec).unwrap_or_default(),
            message: body.message.unwrap_or_default(),
            file_url: body.file_url,
            upload: None,
        }
    }
}

/// Parse a recipients form value: a JSON array string or a comma-separated list.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();

    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }

    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn read_multipart(mut multipart: Multipart, upload_dir: &Path) -> Result<Submission, UploadError> {
    let mut submission = Submission::default();

    let read = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                // An empty file input still arrives as a part, with no filename.
                "file" if field.file_name().map_or(true, |n| n.trim().is_empty()) => {
                    debug!("multipart_empty_file_skipped");
                }
                "file" => {
                    if let Some(previous) = submission.upload.take() {
                        discard_upload(&previous.path).await;
                    }
                    submission.upload = Some(store_upload(upload_dir, field).await?);
                }
                "apiKey" => submission.api_key = Some(field.text().await?),
                "recipients" | "recipients[]" => {
                    let value = field.text().await?;
                    submission.recipients.extend(parse_recipients(&value));
                }
                "message" => submission.message = field.text().await?,
                "fileUrl" => submission.file_url = Some(field.text().await?),
                other => debug!(field = other, "multipart_field_ignored"),
            }
        }
        Ok::<(), UploadError>(())
    }
    .await;

    if let Err(e) = read {
        if let Some(upload) = submission.upload.take() {
            discard_upload(&upload.path).await;
        }
        return Err(e);
    }

    Ok(submission)
}

/// Bulk message submission endpoint.
///
/// This endpoint:
/// 1. Checks the API key (`X-Api-Key` header or `apiKey` field)
/// 2. Requires recipients and a message
/// 3. Enqueues the job and returns 200 before any delivery starts
pub async fn send_message(State(state): State<AppState>, request: Request) -> Response {
    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let submission = if is_multipart {
        let multipart = match Multipart::from_request(request, &state).await {
            Ok(multipart) => multipart,
            Err(rejection) => return rejection.into_response(),
        };
        match read_multipart(multipart, &state.config.upload_dir).await {
            Ok(submission) => submission,
            Err(e) => {
                warn!(error = %e, "send_message_multipart_invalid");
                return error_response(StatusCode::BAD_REQUEST, e.to_string());
            }
        }
    } else {
        match Json::<SendMessageRequest>::from_request(request, &state).await {
            Ok(Json(body)) => Submission::from(body),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "send_message_body_invalid");
                return rejection.into_response();
            }
        }
    };

    info!(
        recipients = submission.recipients.len(),
        has_upload = submission.upload.is_some(),
        has_file_url = submission.file_url.is_some(),
        "send_message_received"
    );

    let provided_key = header_key.or_else(|| submission.api_key.clone());
    if let Err(e) = verify_api_key(state.config.api_key.as_deref(), provided_key.as_deref()) {
        if let Some(upload) = &submission.upload {
            discard_upload(&upload.path).await;
        }
        return error_response(StatusCode::UNAUTHORIZED, e.to_string());
    }

    // An uploaded file wins over a URL.
    let attachment = match submission.upload {
        Some(upload) => Some(upload.into_descriptor()),
        None => submission
            .file_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(|url| AttachmentDescriptor::from_url(url)),
    };

    let job = match Job::new(submission.recipients, submission.message, attachment.clone()) {
        Ok(job) => job,
        Err(e) => {
            warn!(error = %e, "send_message_validation_failed");
            discard_descriptor(attachment).await;
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let recipients = job.recipients().len();
    match state.queue.submit(job) {
        Ok(ticket) => {
            info!(job_id = ticket.job_id, recipients = recipients, "send_message_accepted");
            (
                StatusCode::OK,
                Json(SendMessageResponse {
                    success: true,
                    message: "Bulk messaging started. Check logs for progress.",
                    job_id: ticket.job_id,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "send_message_enqueue_failed");
            let message = e.to_string();
            discard_descriptor(e.into_job().into_attachment()).await;
            error_response(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::Resolver;
    use crate::dispatch::{Dispatcher, Pacing};
    use crate::transport::NoopTransport;
    use crate::web::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use reqwest::Client;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "bulkmsgboundary";

    fn state(upload_dir: &Path) -> AppState {
        let config = Config {
            api_key: Some("secret".to_string()),
            upload_dir: upload_dir.to_path_buf(),
            ..Config::default()
        };
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        let dispatcher = Dispatcher::new(
            transport.clone(),
            Resolver::new(Client::new(), config.drive_download_url.clone()),
            Pacing::from_millis(config.pacing_delay_ms),
            config.address_suffix.clone(),
        );
        let (queue, _worker) = DispatchQueue::start(Arc::new(dispatcher), 8);
        AppState::new(config, queue, transport)
    }

    fn json_request(body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/send-message")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(fields: &[(&str, &str)], file: Option<(&str, &str, &str)>) -> HttpRequest<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if let Some((file_name, mime, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        HttpRequest::builder()
            .method("POST")
            .uri("/send-message")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn test_parse_recipients() {
        assert_eq!(parse_recipients("111, 222,,333"), vec!["111", "222", "333"]);
        assert_eq!(parse_recipients(r#"["111","222"]"#), vec!["111", "222"]);
        assert!(parse_recipients("  ").is_empty());
    }

    #[test]
    fn test_request_accepts_single_string_recipients() {
        let body: SendMessageRequest =
            serde_json::from_str(r#"{"recipients": "111,222", "message": "hi"}"#).unwrap();
        let submission = Submission::from(body);
        assert_eq!(submission.recipients, vec!["111", "222"]);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(state(dir.path()))
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["transport_status"], "connected");
    }

    #[tokio::test]
    async fn test_send_message_rejects_bad_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(state(dir.path()))
            .oneshot(json_request(json!({
                "apiKey": "wrong",
                "recipients": ["111"],
                "message": "hi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Unauthorized: Invalid API key");
    }

    #[tokio::test]
    async fn test_send_message_requires_message() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(state(dir.path()))
            .oneshot(json_request(json!({
                "apiKey": "secret",
                "recipients": ["111"]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Recipients and message are required");
    }

    #[tokio::test]
    async fn test_send_message_accepts_json_job() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(state(dir.path()))
            .oneshot(json_request(json!({
                "apiKey": "secret",
                "recipients": ["111", "222"],
                "message": "hello"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["jobId"], 1);
    }

    #[tokio::test]
    async fn test_send_message_accepts_api_key_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = json_request(json!({ "recipients": ["111"], "message": "hello" }));
        request
            .headers_mut()
            .insert(API_KEY_HEADER, "secret".parse().unwrap());

        let response = router(state(dir.path())).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_multipart_upload_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart_request(
            &[("apiKey", "secret"), ("recipients", "111,222"), ("message", "see file")],
            Some(("notes.txt", "text/plain", "file body")),
        );

        let response = router(state(dir.path())).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_multipart_empty_file_part_falls_back_to_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart_request(
            &[
                ("apiKey", "secret"),
                ("recipients", "111"),
                ("message", "hi"),
                ("fileUrl", "https://cdn.example.com/a.jpg"),
            ],
            Some(("", "application/octet-stream", "")),
        );

        let response = router(state(dir.path())).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_read_multipart_ignores_empty_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart_request(
            &[("fileUrl", "https://cdn.example.com/a.jpg")],
            Some(("", "application/octet-stream", "")),
        );
        let multipart = Multipart::from_request(request, &()).await.unwrap();

        let submission = read_multipart(multipart, dir.path()).await.unwrap();

        assert!(submission.upload.is_none());
        assert_eq!(submission.file_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }

    #[tokio::test]
    async fn test_multipart_upload_removed_when_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart_request(
            &[("apiKey", "wrong"), ("recipients", "111"), ("message", "hi")],
            Some(("photo.png", "image/png", "png")),
        );

        let response = router(state(dir.path())).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_multipart_upload_removed_when_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart_request(
            &[("apiKey", "secret"), ("message", "no recipients")],
            Some(("photo.png", "image/png", "png")),
        );

        let response = router(state(dir.path())).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(file_count(dir.path()), 0);
    }
}
