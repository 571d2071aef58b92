//! Upstream inference collaborator.

use async_trait::async_trait;
use pixora_core::catalog::ModelConfig;
use pixora_core::generation::InferencePayload;
use pixora_inference::{CredentialPool, InferenceApi, InferenceApiError, InferenceImage};

/// A failed inference attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceFailure {
    /// HTTP-like status for the retry policy; `None` for transport errors,
    /// which are never retried.
    pub status: Option<u16>,
    pub message: String,
}

impl From<InferenceApiError> for InferenceFailure {
    fn from(err: InferenceApiError) -> Self {
        Self {
            status: err.status(),
            message: match &err {
                InferenceApiError::ApiError { message, .. } => message.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Issues one inference call per invocation. Retrying is the caller's job.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn generate(
        &self,
        model: &ModelConfig,
        payload: &InferencePayload,
    ) -> Result<InferenceImage, InferenceFailure>;

    /// Switch to a fresh upstream credential (after a rate limit).
    fn rotate_credential(&self);
}

/// [`InferenceBackend`] over HTTP with a rotating credential pool.
pub struct HttpInferenceBackend {
    api: InferenceApi,
    credentials: CredentialPool,
}

impl HttpInferenceBackend {
    pub fn new(api: InferenceApi, credentials: CredentialPool) -> Self {
        Self { api, credentials }
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceBackend {
    async fn generate(
        &self,
        model: &ModelConfig,
        payload: &InferencePayload,
    ) -> Result<InferenceImage, InferenceFailure> {
        self.api
            .generate(&model.endpoint_url, self.credentials.current(), payload)
            .await
            .map_err(InferenceFailure::from)
    }

    fn rotate_credential(&self) {
        self.credentials.rotate();
    }
}
