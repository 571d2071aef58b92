//! Generation orchestrator.
//!
//! Drives a single request through the state machine in [`crate::state`]:
//! validate, reserve credits, call the inference backend under the retry
//! policy, then store and record the image. Credits are reserved before the
//! first call and refunded on terminal failure or cancellation. Once an
//! inference call has succeeded they are never refunded, even if
//! persistence then fails.

use std::sync::Arc;

use pixora_core::catalog::ModelCatalog;
use pixora_core::credits::{CreditBalance, CreditSpend};
use pixora_core::error::CoreError;
use pixora_core::generation::{
    build_payload, validate_request, GenerationParams, GenerationRequest,
};
use pixora_core::retry::{RetryPolicy, RetryState};
use pixora_core::types::UserId;
use pixora_db::models::generated_image::{CreateGeneratedImage, GeneratedImage};
use pixora_inference::InferenceImage;

use crate::backend::InferenceBackend;
use crate::error::GenerationError;
use crate::ledger::{CreditLedger, LedgerError};
use crate::recorder::ImageRecorder;
use crate::state::{GenerationState, JobControl};
use crate::storage::{sniff_format, storage_key_for, ObjectStore};

/// Who is asking for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    /// Premium accounts may use premium models.
    pub premium: bool,
}

/// A validated request whose credits have been deducted.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub user_id: UserId,
    pub request: GenerationRequest,
    pub cost: i32,
    /// What was taken from each pool; a refund returns exactly this.
    pub spent: CreditSpend,
    /// Balance right after the deduction.
    pub balance_after: CreditBalance,
}

#[derive(Debug, Clone)]
pub struct GenerationSuccess {
    pub image: GeneratedImage,
    /// Upstream calls made, including the successful one.
    pub attempts: u32,
}

pub struct GenerationOrchestrator {
    catalog: Arc<ModelCatalog>,
    policy: RetryPolicy,
    backend: Arc<dyn InferenceBackend>,
    ledger: Arc<dyn CreditLedger>,
    store: Arc<dyn ObjectStore>,
    recorder: Arc<dyn ImageRecorder>,
}

impl GenerationOrchestrator {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        policy: RetryPolicy,
        backend: Arc<dyn InferenceBackend>,
        ledger: Arc<dyn CreditLedger>,
        store: Arc<dyn ObjectStore>,
        recorder: Arc<dyn ImageRecorder>,
    ) -> Self {
        Self {
            catalog,
            policy,
            backend,
            ledger,
            store,
            recorder,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<dyn CreditLedger> {
        &self.ledger
    }

    /// Validate and reserve credits, in that order.
    ///
    /// A validation failure never touches the ledger.
    pub async fn prepare(
        &self,
        requester: Requester,
        params: &GenerationParams,
        control: &JobControl,
    ) -> Result<Reservation, GenerationError> {
        control.transition(GenerationState::Validating);
        let request = match validate_request(params, &self.catalog, requester.premium) {
            Ok(request) => request,
            Err(e) => {
                control.transition(GenerationState::Failed {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let cost = request.cost();
        let reserved = match self.ledger.reserve(requester.user_id, cost).await {
            Ok(reserved) => reserved,
            Err(e) => {
                let err = match e {
                    LedgerError::Insufficient {
                        required,
                        available,
                    } => GenerationError::InsufficientCredits {
                        tier: request.quality,
                        required,
                        available,
                    },
                    LedgerError::Unavailable(msg) => GenerationError::Ledger(msg),
                };
                control.transition(GenerationState::Failed {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        control.transition(GenerationState::CreditsReserved { cost });
        Ok(Reservation {
            user_id: requester.user_id,
            request,
            cost,
            spent: reserved.spend,
            balance_after: reserved.balance,
        })
    }

    /// Run the inference retry loop and persist the result.
    pub async fn execute(
        &self,
        reservation: &Reservation,
        control: &JobControl,
    ) -> Result<GenerationSuccess, GenerationError> {
        let request = &reservation.request;
        let Some(model) = self.catalog.model(&request.model) else {
            let err = CoreError::Validation(format!("Unknown model '{}'", request.model));
            return Err(self
                .terminal(reservation, control, None, err.to_string(), 0)
                .await);
        };
        let payload = build_payload(request, &self.catalog);

        let mut retry = RetryState::default();
        let mut calls: u32 = 0;

        let image = loop {
            if control.is_cancelled() {
                return Err(self.cancelled(reservation, control, calls).await);
            }

            calls += 1;
            control.transition(GenerationState::Calling { attempt: calls });

            let failure = match self.backend.generate(model, &payload).await {
                Ok(image) if !image.bytes.is_empty() => break image,
                Ok(_) => {
                    return Err(self
                        .terminal(
                            reservation,
                            control,
                            None,
                            "Inference returned an empty image".to_string(),
                            calls,
                        )
                        .await);
                }
                Err(failure) => failure,
            };

            let Some(status) = failure.status else {
                return Err(self
                    .terminal(reservation, control, None, failure.message, calls)
                    .await);
            };

            let decision = retry.record_failure(&self.policy, status, failure.message.clone());
            if !decision.retry {
                return Err(self
                    .terminal(reservation, control, Some(status), failure.message, calls)
                    .await);
            }

            if decision.rotate_credential {
                self.backend.rotate_credential();
            }

            let delay_ms = decision.delay.as_millis() as u64;
            tracing::warn!(
                user_id = %reservation.user_id,
                model = %model.key,
                status,
                attempt = retry.attempt,
                delay_ms,
                error = %failure.message,
                "Inference attempt failed, retrying",
            );
            control.transition(GenerationState::Retrying {
                attempt: retry.attempt,
                status,
                delay_ms,
                last_error: failure.message,
            });

            tokio::select! {
                _ = control.cancel_token().cancelled() => {
                    return Err(self.cancelled(reservation, control, calls).await);
                }
                _ = tokio::time::sleep(decision.delay) => {}
            }
        };

        self.persist(reservation, control, image, calls).await
    }

    /// [`prepare`](Self::prepare) then [`execute`](Self::execute).
    pub async fn run(
        &self,
        requester: Requester,
        params: &GenerationParams,
        control: &JobControl,
    ) -> Result<GenerationSuccess, GenerationError> {
        let reservation = self.prepare(requester, params, control).await?;
        self.execute(&reservation, control).await
    }

    /// Store the binary, then insert its metadata row.
    async fn persist(
        &self,
        reservation: &Reservation,
        control: &JobControl,
        image: InferenceImage,
        attempts: u32,
    ) -> Result<GenerationSuccess, GenerationError> {
        let request = &reservation.request;
        let (extension, content_type) = sniff_format(&image.bytes);
        let storage_key = storage_key_for(reservation.user_id, extension);

        if let Err(e) = self
            .store
            .put(&storage_key, &image.bytes, content_type)
            .await
        {
            return Err(self.persistence_failed(control, e.to_string(), None, attempts));
        }

        let input = CreateGeneratedImage {
            user_id: reservation.user_id,
            storage_key: storage_key.clone(),
            prompt: request.prompt.clone(),
            seed: i64::from(request.seed),
            width: request.dimensions.width as i32,
            height: request.dimensions.height as i32,
            model: request.model.clone(),
            style: request.style.clone(),
            quality: request.quality.as_str().to_string(),
            aspect_ratio: request.aspect_ratio.clone(),
            is_private: request.is_private,
        };

        match self.recorder.record(&input).await {
            Ok(image) => {
                tracing::info!(
                    user_id = %reservation.user_id,
                    image_id = image.id,
                    attempts,
                    "Generation succeeded",
                );
                control.transition(GenerationState::Succeeded { image_id: image.id });
                Ok(GenerationSuccess { image, attempts })
            }
            Err(message) => Err(self.persistence_failed(control, message, Some(storage_key), attempts)),
        }
    }

    fn persistence_failed(
        &self,
        control: &JobControl,
        message: String,
        orphaned_storage_key: Option<String>,
        attempts: u32,
    ) -> GenerationError {
        tracing::error!(
            error = %message,
            orphaned_storage_key = orphaned_storage_key.as_deref().unwrap_or(""),
            "Image persistence failed after successful inference; credits stay spent",
        );
        let err = GenerationError::Persistence {
            message,
            orphaned_storage_key,
            attempts,
        };
        control.transition(GenerationState::Failed {
            reason: err.to_string(),
        });
        err
    }

    async fn terminal(
        &self,
        reservation: &Reservation,
        control: &JobControl,
        status: Option<u16>,
        message: String,
        attempts: u32,
    ) -> GenerationError {
        tracing::warn!(
            user_id = %reservation.user_id,
            status = status.unwrap_or(0),
            attempts,
            error = %message,
            "Generation failed",
        );
        let refunded = self.refund(reservation).await;
        let err = GenerationError::TerminalFailure {
            status,
            message,
            attempts,
            refunded,
        };
        control.transition(GenerationState::Failed {
            reason: err.to_string(),
        });
        err
    }

    async fn cancelled(
        &self,
        reservation: &Reservation,
        control: &JobControl,
        attempts: u32,
    ) -> GenerationError {
        tracing::info!(user_id = %reservation.user_id, attempts, "Generation cancelled");
        let refunded = self.refund(reservation).await;
        let err = GenerationError::Cancelled { attempts, refunded };
        control.transition(GenerationState::Failed {
            reason: err.to_string(),
        });
        err
    }

    /// Return the reserved credits. Returns whether the refund went through.
    async fn refund(&self, reservation: &Reservation) -> bool {
        match self
            .ledger
            .refund(reservation.user_id, reservation.spent)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    user_id = %reservation.user_id,
                    amount = reservation.spent.total(),
                    error = %e,
                    "Credit refund failed",
                );
                false
            }
        }
    }
}
