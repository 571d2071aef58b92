//! In-memory collaborators for driving the orchestrator without a network
//! or database.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pixora_core::catalog::{ModelCatalog, ModelConfig};
use pixora_core::credits::{CreditBalance, CreditSpend};
use pixora_core::error::CoreError;
use pixora_core::generation::{GenerationParams, InferencePayload};
use pixora_core::quality::QualityTier;
use pixora_core::retry::RetryPolicy;
use pixora_core::types::UserId;
use pixora_db::models::generated_image::{CreateGeneratedImage, GeneratedImage};
use pixora_inference::InferenceImage;
use pixora_pipeline::backend::{InferenceBackend, InferenceFailure};
use pixora_pipeline::ledger::{CreditLedger, LedgerError, Reserved};
use pixora_pipeline::orchestrator::{GenerationOrchestrator, Requester};
use pixora_pipeline::recorder::ImageRecorder;
use pixora_pipeline::storage::{ObjectStore, StorageError};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

pub type Scripted = Result<InferenceImage, InferenceFailure>;

pub fn ok_image() -> Scripted {
    Ok(InferenceImage {
        bytes: PNG_BYTES.to_vec(),
        content_type: Some("image/png".into()),
    })
}

pub fn empty_image() -> Scripted {
    Ok(InferenceImage {
        bytes: Vec::new(),
        content_type: None,
    })
}

pub fn status(code: u16) -> Scripted {
    Err(InferenceFailure {
        status: Some(code),
        message: format!("upstream returned {code}"),
    })
}

pub fn transport_error() -> Scripted {
    Err(InferenceFailure {
        status: None,
        message: "connection refused".into(),
    })
}

/// Replays a fixed sequence of responses. Once the script runs out every
/// call fails with a non-retryable 400.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    pub calls: AtomicU32,
    pub rotations: AtomicU32,
    pub payloads: Mutex<Vec<InferencePayload>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rotations(&self) -> u32 {
        self.rotations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(
        &self,
        _model: &ModelConfig,
        payload: &InferencePayload,
    ) -> Result<InferenceImage, InferenceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| status(400))
    }

    fn rotate_credential(&self) {
        self.rotations.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct InMemoryLedger {
    balance: Mutex<CreditBalance>,
    pub reservations: AtomicU32,
    pub refunds: Mutex<Vec<CreditSpend>>,
}

impl InMemoryLedger {
    pub fn new(base: i32, bonus: i32) -> Arc<Self> {
        Arc::new(Self {
            balance: Mutex::new(CreditBalance::new(base, bonus)),
            reservations: AtomicU32::new(0),
            refunds: Mutex::new(Vec::new()),
        })
    }

    pub fn balance(&self) -> CreditBalance {
        *self.balance.lock().unwrap()
    }

    pub fn reservations(&self) -> u32 {
        self.reservations.load(Ordering::SeqCst)
    }

    /// Refunded totals, in order.
    pub fn refunds(&self) -> Vec<i32> {
        self.refunds.lock().unwrap().iter().map(|s| s.total()).collect()
    }

    pub fn refunded_spends(&self) -> Vec<CreditSpend> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn reserve(&self, _user_id: UserId, cost: i32) -> Result<Reserved, LedgerError> {
        self.reservations.fetch_add(1, Ordering::SeqCst);
        let mut balance = self.balance.lock().unwrap();
        match balance.deduct(cost) {
            Ok((next, spend)) => {
                *balance = next;
                Ok(Reserved {
                    balance: next,
                    spend,
                })
            }
            Err(CoreError::InsufficientCredits {
                required,
                available,
            }) => Err(LedgerError::Insufficient {
                required,
                available,
            }),
            Err(other) => Err(LedgerError::Unavailable(other.to_string())),
        }
    }

    async fn refund(
        &self,
        _user_id: UserId,
        spend: CreditSpend,
    ) -> Result<CreditBalance, LedgerError> {
        self.refunds.lock().unwrap().push(spend);
        let mut balance = self.balance.lock().unwrap();
        *balance = balance.refund(spend);
        Ok(*balance)
    }
}

// ---------------------------------------------------------------------------
// Storage and recorder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecorder {
    pub rows: Mutex<Vec<GeneratedImage>>,
    pub fail: bool,
}

impl MemoryRecorder {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageRecorder for MemoryRecorder {
    async fn record(&self, input: &CreateGeneratedImage) -> Result<GeneratedImage, String> {
        if self.fail {
            return Err("connection reset".to_string());
        }
        let mut rows = self.rows.lock().unwrap();
        let row = GeneratedImage {
            id: rows.len() as i64 + 1,
            user_id: input.user_id,
            storage_key: input.storage_key.clone(),
            prompt: input.prompt.clone(),
            seed: input.seed,
            width: input.width,
            height: input.height,
            model: input.model.clone(),
            style: input.style.clone(),
            quality: input.quality.clone(),
            aspect_ratio: input.aspect_ratio.clone(),
            is_private: input.is_private,
            is_hot: false,
            is_trending: false,
            created_at: chrono::Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub orchestrator: GenerationOrchestrator,
    pub backend: Arc<ScriptedBackend>,
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<MemoryStore>,
    pub recorder: Arc<MemoryRecorder>,
}

pub fn harness(backend: Arc<ScriptedBackend>, ledger: Arc<InMemoryLedger>) -> Harness {
    harness_with(
        backend,
        ledger,
        Arc::new(MemoryStore::default()),
        Arc::new(MemoryRecorder::default()),
    )
}

pub fn harness_with(
    backend: Arc<ScriptedBackend>,
    ledger: Arc<InMemoryLedger>,
    store: Arc<MemoryStore>,
    recorder: Arc<MemoryRecorder>,
) -> Harness {
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ModelCatalog::default()),
        RetryPolicy::default(),
        backend.clone(),
        ledger.clone(),
        store.clone(),
        recorder.clone(),
    );
    Harness {
        orchestrator,
        backend,
        ledger,
        store,
        recorder,
    }
}

pub fn requester() -> Requester {
    Requester {
        user_id: UserId::new_v4(),
        premium: false,
    }
}

pub fn params(model: &str, quality: QualityTier) -> GenerationParams {
    GenerationParams {
        prompt: "a lighthouse at dusk".to_string(),
        model: model.to_string(),
        style: None,
        quality,
        aspect_ratio: Some("16:9".to_string()),
        width: None,
        height: None,
        seed: Some(7),
        steps: None,
        is_private: false,
    }
}
