use std::sync::Arc;

use pixora_core::catalog::ModelCatalog;
use pixora_core::retry::RetryPolicy;
use pixora_events::EventBus;
use pixora_pipeline::backend::InferenceBackend;
use pixora_pipeline::balance_cache::BalanceCache;
use pixora_pipeline::ledger::{CreditLedger, PgCreditLedger};
use pixora_pipeline::orchestrator::GenerationOrchestrator;
use pixora_pipeline::recorder::PgImageRecorder;
use pixora_pipeline::service::GenerationService;
use pixora_pipeline::storage::ObjectStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pixora_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Immutable model and style catalog.
    pub catalog: Arc<ModelCatalog>,
    /// Background generation jobs.
    pub generations: GenerationService,
    /// Short-lived balance view for `GET /credits`.
    pub balance_cache: Arc<BalanceCache>,
    /// Credit ledger shared with the generation pipeline.
    pub ledger: Arc<PgCreditLedger>,
    /// Binary image storage (deletes go straight through).
    pub store: Arc<dyn ObjectStore>,
    /// Centralized event bus for domain events.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the generation pipeline around `backend` and `store`.
    pub fn new(
        pool: pixora_db::DbPool,
        config: ServerConfig,
        catalog: Arc<ModelCatalog>,
        backend: Arc<dyn InferenceBackend>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let balance_cache = Arc::new(BalanceCache::default());

        let ledger = Arc::new(PgCreditLedger::new(
            pool.clone(),
            Arc::clone(&balance_cache),
            Arc::clone(&event_bus),
        ));
        let recorder = Arc::new(PgImageRecorder::new(pool.clone()));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            Arc::clone(&catalog),
            RetryPolicy::default(),
            backend,
            Arc::clone(&ledger) as Arc<dyn CreditLedger>,
            Arc::clone(&store),
            recorder,
        ));
        let generations =
            GenerationService::new(orchestrator, pool.clone(), Arc::clone(&event_bus));

        Self {
            pool,
            config: Arc::new(config),
            catalog,
            generations,
            balance_cache,
            ledger,
            store,
            event_bus,
        }
    }
}
