//! Integration tests for generated images and generation jobs.

use chrono::Utc;
use pixora_db::models::generated_image::{CreateGeneratedImage, UpdateImageFlags};
use pixora_db::models::generation_job::{
    CreateGenerationJob, JobFailure, FAILURE_UPSTREAM, JOB_ABANDONED, JOB_FAILED,
    JOB_SUCCEEDED,
};
use pixora_db::repositories::generated_image_repo::FeedFilter;
use pixora_db::repositories::{GeneratedImageRepo, GenerationJobRepo};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_image(user_id: Uuid, key: &str, is_private: bool) -> CreateGeneratedImage {
    CreateGeneratedImage {
        user_id,
        storage_key: key.to_string(),
        prompt: "a cat".to_string(),
        seed: 42,
        width: 1024,
        height: 576,
        model: "flux".to_string(),
        style: None,
        quality: "HD".to_string(),
        aspect_ratio: Some("16:9".to_string()),
        is_private,
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_public_feed_hides_private_and_paginates(pool: PgPool) {
    let user = Uuid::new_v4();
    let mut public_ids = Vec::new();
    for i in 0..5 {
        let img = GeneratedImageRepo::create(&pool, &new_image(user, &format!("k{i}"), false))
            .await
            .unwrap();
        public_ids.push(img.id);
    }
    GeneratedImageRepo::create(&pool, &new_image(user, "secret", true))
        .await
        .unwrap();

    let first = GeneratedImageRepo::list_public(&pool, FeedFilter::default(), 3)
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|i| !i.is_private));
    assert!(first.windows(2).all(|w| w[0].id > w[1].id));

    let cursor = first.last().unwrap().id;
    let second = GeneratedImageRepo::list_public(
        &pool,
        FeedFilter {
            before: Some(cursor),
            ..Default::default()
        },
        3,
    )
    .await
    .unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|i| i.id < cursor));

    let mine = GeneratedImageRepo::list_for_user(&pool, user, None, 10)
        .await
        .unwrap();
    assert_eq!(mine.len(), 6);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_flags_filter_feed(pool: PgPool) {
    let user = Uuid::new_v4();
    let hot = GeneratedImageRepo::create(&pool, &new_image(user, "hot", false))
        .await
        .unwrap();
    GeneratedImageRepo::create(&pool, &new_image(user, "plain", false))
        .await
        .unwrap();

    let updated = GeneratedImageRepo::update_flags(
        &pool,
        hot.id,
        &UpdateImageFlags {
            is_hot: Some(true),
            is_trending: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(updated.is_hot);
    assert!(!updated.is_trending);

    let feed = GeneratedImageRepo::list_public(
        &pool,
        FeedFilter {
            hot_only: true,
            ..Default::default()
        },
        10,
    )
    .await
    .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, hot.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_only_owner_can_delete(pool: PgPool) {
    let owner = Uuid::new_v4();
    let img = GeneratedImageRepo::create(&pool, &new_image(owner, "mine", false))
        .await
        .unwrap();

    let denied = GeneratedImageRepo::delete_owned(&pool, img.id, Uuid::new_v4())
        .await
        .unwrap();
    assert!(denied.is_none());

    let deleted = GeneratedImageRepo::delete_owned(&pool, img.id, owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deleted.storage_key, "mine");
    assert!(GeneratedImageRepo::find_by_id(&pool, img.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_storage_key_rejected(pool: PgPool) {
    let user = Uuid::new_v4();
    GeneratedImageRepo::create(&pool, &new_image(user, "dup", false))
        .await
        .unwrap();
    let err = GeneratedImageRepo::create(&pool, &new_image(user, "dup", false))
        .await
        .unwrap_err();
    let db_err = err.as_database_error().expect("should be a database error");
    assert_eq!(db_err.constraint(), Some("uq_generated_images_storage_key"));
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

fn new_job(user_id: Uuid) -> CreateGenerationJob {
    CreateGenerationJob {
        user_id,
        params: serde_json::json!({"prompt": "a cat"}),
        credits_reserved: 2,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_job_success_is_terminal(pool: PgPool) {
    let user = Uuid::new_v4();
    let job = GenerationJobRepo::create(&pool, &new_job(user)).await.unwrap();
    assert!(job.is_running());

    let img = GeneratedImageRepo::create(&pool, &new_image(user, "job-img", false))
        .await
        .unwrap();
    assert!(GenerationJobRepo::mark_succeeded(&pool, job.id, img.id, 3)
        .await
        .unwrap());

    // A finished job cannot be moved again.
    let failure = JobFailure {
        failure_kind: Some(FAILURE_UPSTREAM.to_string()),
        ..Default::default()
    };
    assert!(!GenerationJobRepo::mark_finished(&pool, job.id, JOB_FAILED, &failure)
        .await
        .unwrap());

    let found = GenerationJobRepo::find_by_id(&pool, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, JOB_SUCCEEDED);
    assert_eq!(found.image_id, Some(img.id));
    assert_eq!(found.attempts, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_running_jobs_are_abandoned(pool: PgPool) {
    let user = Uuid::new_v4();
    let job = GenerationJobRepo::create(&pool, &new_job(user)).await.unwrap();

    let none = GenerationJobRepo::mark_abandoned_before(&pool, Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(none, 0);

    let swept = GenerationJobRepo::mark_abandoned_before(&pool, Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let found = GenerationJobRepo::find_by_id(&pool, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, JOB_ABANDONED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_abandoned_job_still_records_its_outcome(pool: PgPool) {
    let user = Uuid::new_v4();
    let job = GenerationJobRepo::create(&pool, &new_job(user)).await.unwrap();
    GenerationJobRepo::mark_abandoned_before(&pool, Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();

    let failure = JobFailure {
        failure_kind: Some(FAILURE_UPSTREAM.to_string()),
        attempts: 1,
        credits_refunded: true,
        ..Default::default()
    };
    assert!(GenerationJobRepo::mark_finished(&pool, job.id, JOB_FAILED, &failure)
        .await
        .unwrap());

    let found = GenerationJobRepo::find_by_id(&pool, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, JOB_FAILED);
    assert!(found.credits_refunded);

    // Once closed for real, the outcome is final.
    assert!(!GenerationJobRepo::mark_finished(&pool, job.id, JOB_FAILED, &failure)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_abandoned_job_can_still_succeed(pool: PgPool) {
    let user = Uuid::new_v4();
    let job = GenerationJobRepo::create(&pool, &new_job(user)).await.unwrap();
    GenerationJobRepo::mark_abandoned_before(&pool, Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();

    let img = GeneratedImageRepo::create(&pool, &new_image(user, "late-img", false))
        .await
        .unwrap();
    assert!(GenerationJobRepo::mark_succeeded(&pool, job.id, img.id, 2)
        .await
        .unwrap());

    let found = GenerationJobRepo::find_by_id(&pool, job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, JOB_SUCCEEDED);
    assert_eq!(found.image_id, Some(img.id));
}
