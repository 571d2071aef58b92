//! REST client for a text-to-image inference endpoint.
//!
//! Each configured model has its own endpoint URL. A successful call
//! returns the raw image bytes; failures carry a JSON body such as
//! `{"error": "Model is currently loading", "estimated_time": 20.0}`.

use std::time::Duration;

use pixora_core::generation::InferencePayload;
use pixora_core::retry::STATUS_TIMEOUT;
use serde::Deserialize;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client shared by all model endpoints.
#[derive(Clone)]
pub struct InferenceApi {
    client: reqwest::Client,
}

/// A successful inference response.
#[derive(Debug, Clone)]
pub struct InferenceImage {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the endpoint, if any.
    pub content_type: Option<String>,
}

/// Errors from the inference REST layer.
#[derive(Debug, thiserror::Error)]
pub enum InferenceApiError {
    /// The per-attempt timeout elapsed before a response arrived.
    #[error("Inference request timed out")]
    Timeout,

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-2xx status code.
    #[error("Inference API error ({status}): {message}")]
    ApiError {
        status: u16,
        /// Error text extracted from the response body.
        message: String,
    },
}

impl InferenceApiError {
    /// Status code to feed into the retry policy.
    ///
    /// Timeouts count as 504. Transport failures have no status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Timeout => Some(STATUS_TIMEOUT),
            Self::Request(_) => None,
            Self::ApiError { status, .. } => Some(*status),
        }
    }
}

/// Shape of the JSON error body returned by hosted inference endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorField,
    #[serde(default)]
    estimated_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    One(String),
    Many(Vec<String>),
}

impl InferenceApi {
    /// Create a client with the given per-attempt timeout.
    pub fn new(timeout: Duration) -> Result<Self, InferenceApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Post a generation payload to `endpoint_url` authenticated with
    /// `credential`, returning the image bytes.
    pub async fn generate(
        &self,
        endpoint_url: &str,
        credential: &str,
        payload: &InferencePayload,
    ) -> Result<InferenceImage, InferenceApiError> {
        let response = self
            .client
            .post(endpoint_url)
            .bearer_auth(credential)
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceApiError::ApiError {
                status: status.as_u16(),
                message: error_message_from_body(&body),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(classify_transport_error)?;

        Ok(InferenceImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn classify_transport_error(err: reqwest::Error) -> InferenceApiError {
    if err.is_timeout() {
        InferenceApiError::Timeout
    } else {
        InferenceApiError::Request(err)
    }
}

/// Extract human-readable error text from a failure body.
///
/// Understands the `{"error": ...}` JSON shape (string or list, with an
/// optional `estimated_time`); anything else is returned trimmed, or a
/// placeholder for an empty body.
pub fn error_message_from_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let mut message = match parsed.error {
            ErrorField::One(s) => s,
            ErrorField::Many(list) => list.join("; "),
        };
        if let Some(eta) = parsed.estimated_time {
            message.push_str(&format!(" (estimated time {eta:.0}s)"));
        }
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "<empty body>".to_string()
    } else {
        trimmed.to_string()
    }
}
