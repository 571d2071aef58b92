//! Generation jobs against a real database: job rows, ledger, events.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pixora_core::catalog::ModelCatalog;
use pixora_core::quality::QualityTier;
use pixora_core::retry::RetryPolicy;
use pixora_db::models::generation_job::{
    FAILURE_UPSTREAM, JOB_CANCELLED, JOB_FAILED, JOB_SUCCEEDED,
};
use pixora_db::repositories::{CreditRepo, GeneratedImageRepo, GenerationJobRepo};
use pixora_events::bus::{CREDITS_CHANGED, GENERATION_FAILED, GENERATION_SUCCEEDED};
use pixora_events::{DomainEvent, EventBus};
use pixora_pipeline::balance_cache::BalanceCache;
use pixora_pipeline::error::GenerationError;
use pixora_pipeline::ledger::PgCreditLedger;
use pixora_pipeline::orchestrator::{GenerationOrchestrator, Requester};
use pixora_pipeline::recorder::PgImageRecorder;
use pixora_pipeline::registry::CancelOutcome;
use pixora_pipeline::service::GenerationService;
use pixora_pipeline::storage::LocalObjectStore;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use common::{ok_image, params, status, ScriptedBackend};

struct Fixture {
    service: GenerationService,
    events: broadcast::Receiver<DomainEvent>,
    cache: Arc<BalanceCache>,
    _dir: tempfile::TempDir,
}

fn fixture(pool: &PgPool, backend: Arc<ScriptedBackend>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(EventBus::default());
    let cache = Arc::new(BalanceCache::default());
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ModelCatalog::default()),
        RetryPolicy::default(),
        backend,
        Arc::new(PgCreditLedger::new(pool.clone(), cache.clone(), bus.clone())),
        Arc::new(LocalObjectStore::new(dir.path())),
        Arc::new(PgImageRecorder::new(pool.clone())),
    );
    Fixture {
        events: bus.subscribe(),
        service: GenerationService::new(Arc::new(orchestrator), pool.clone(), bus),
        cache,
        _dir: dir,
    }
}

/// Wait for the next event of `event_type`, skipping others.
async fn next_event(rx: &mut broadcast::Receiver<DomainEvent>, event_type: &str) -> DomainEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.event_type == event_type {
                return event;
            }
        }
    })
    .await
    .expect("event not published in time")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_successful_job_records_image(pool: PgPool) {
    let user = Uuid::new_v4();
    CreditRepo::grant(&pool, user, 5, 0).await.unwrap();
    let mut f = fixture(&pool, ScriptedBackend::new([ok_image()]));

    let submitted = f
        .service
        .submit(
            Requester {
                user_id: user,
                premium: false,
            },
            params("flux", QualityTier::Hd),
        )
        .await
        .unwrap();
    assert_eq!(submitted.cost, 2);
    assert_eq!(submitted.balance_after.base, 3);

    let changed = next_event(&mut f.events, CREDITS_CHANGED).await;
    assert_eq!(changed.user_id, Some(user));

    let done = next_event(&mut f.events, GENERATION_SUCCEEDED).await;
    assert_eq!(done.subject_id, Some(submitted.job.id));
    let image_id = done.payload["image_id"].as_i64().unwrap();

    let job = GenerationJobRepo::find_by_id(&pool, submitted.job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JOB_SUCCEEDED);
    assert_eq!(job.image_id, Some(image_id));
    assert_eq!(job.attempts, 1);

    let image = GeneratedImageRepo::find_by_id(&pool, image_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(image.user_id, user);
    assert_eq!(image.quality, "HD");

    let account = CreditRepo::find(&pool, user).await.unwrap().unwrap();
    assert_eq!(account.base_credits, 3);
    assert!(f.cache.get(user).await.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rejected_job_refunds_and_records_failure(pool: PgPool) {
    let user = Uuid::new_v4();
    CreditRepo::grant(&pool, user, 5, 0).await.unwrap();
    let mut f = fixture(&pool, ScriptedBackend::new([status(400)]));

    let submitted = f
        .service
        .submit(
            Requester {
                user_id: user,
                premium: false,
            },
            params("flux", QualityTier::HdPlus),
        )
        .await
        .unwrap();

    let failed = next_event(&mut f.events, GENERATION_FAILED).await;
    assert_eq!(failed.payload["credits_refunded"], true);

    let job = GenerationJobRepo::find_by_id(&pool, submitted.job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JOB_FAILED);
    assert_eq!(job.failure_kind.as_deref(), Some(FAILURE_UPSTREAM));
    assert!(job.credits_refunded);

    let account = CreditRepo::find(&pool, user).await.unwrap().unwrap();
    assert_eq!(account.base_credits, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insufficient_credits_opens_no_job(pool: PgPool) {
    let user = Uuid::new_v4();
    CreditRepo::grant(&pool, user, 1, 0).await.unwrap();
    let f = fixture(&pool, ScriptedBackend::new([ok_image()]));

    let err = f
        .service
        .submit(
            Requester {
                user_id: user,
                premium: false,
            },
            params("flux", QualityTier::UltraHd),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::InsufficientCredits {
            required: 4,
            available: 1,
            ..
        }
    ));
    let jobs = GenerationJobRepo::list_for_user(&pool, user, 10).await.unwrap();
    assert!(jobs.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_owner_cancels_job_waiting_on_backoff(pool: PgPool) {
    let user = Uuid::new_v4();
    CreditRepo::grant(&pool, user, 5, 0).await.unwrap();
    let mut f = fixture(&pool, ScriptedBackend::new([status(503), ok_image()]));
    let requester = Requester {
        user_id: user,
        premium: false,
    };

    let submitted = f
        .service
        .submit(requester, params("flux", QualityTier::Sd))
        .await
        .unwrap();
    let job_id = submitted.job.id;

    // Wait until the job is in its 120 s backoff.
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let view = f.service.find_job(job_id, user).await.unwrap().unwrap();
            if view.job.attempts == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job never entered backoff");

    assert_eq!(
        f.service.cancel(job_id, Uuid::new_v4()).await,
        CancelOutcome::NotOwner
    );
    assert_eq!(f.service.cancel(job_id, user).await, CancelOutcome::Cancelled);

    next_event(&mut f.events, GENERATION_FAILED).await;
    let job = GenerationJobRepo::find_by_id(&pool, job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JOB_CANCELLED);
    assert!(job.credits_refunded);

    let account = CreditRepo::find(&pool, user).await.unwrap().unwrap();
    assert_eq!(account.base_credits, 5);

    // Someone else cannot see the job at all.
    assert!(f
        .service
        .find_job(job_id, Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}
