mod common;

use chrono::{Duration, Utc};
use redis::AsyncCommands;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::token_for;
use consultbook::cache::{AppointmentCache, key};
use consultbook::models::{Appointment, AppointmentStatus};

async fn redis_conn(url: &str) -> redis::aio::MultiplexedConnection {
    redis::Client::open(url)
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis")
}

// ── Read-through ────────────────────────────────────────────────

#[tokio::test]
async fn cached_read_follows_status_changes() {
    let Some(app) = common::spawn_app_with_redis().await else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };
    let mut redis = redis_conn(&common::redis_url().unwrap()).await;

    let consultant = app.create_consultant("Ada").await;
    let token = token_for("alice", &[]);
    let (appt, status) = app
        .book(&token, consultant["id"].as_str().unwrap(), "2030-01-07T09:00:00Z", None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id: Uuid = appt["id"].as_str().unwrap().parse().unwrap();
    let path = format!("/api/appointments/{id}");

    let (got, status) = app.get_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["status"], "scheduled");

    // The read populated the entry with a bounded lifetime.
    let ttl: i64 = redis.ttl(key(id)).await.unwrap();
    assert!((1..=300).contains(&ttl), "ttl was {ttl}");

    let (_, status) = app
        .post_auth(&format!("{path}/cancel"), &token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (got, status) = app.get_auth(&path, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["status"], "cancelled");

    let body: String = redis.hget(key(id), "body").await.unwrap();
    assert!(body.contains("\"cancelled\""));

    common::cleanup(app).await;
}

#[tokio::test]
async fn cached_entry_is_not_served_to_other_callers() {
    let Some(app) = common::spawn_app_with_redis().await else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };

    let consultant = app.create_consultant("Ada").await;
    let alice = token_for("alice", &[]);
    let bob = token_for("bob", &[]);
    let (appt, _) = app
        .book(&alice, consultant["id"].as_str().unwrap(), "2030-01-07T09:00:00Z", None)
        .await;
    let path = format!("/api/appointments/{}", appt["id"].as_str().unwrap());

    let (_, status) = app.get_auth(&path, &alice).await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app.get_auth(&path, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn health_reports_cache_ok() {
    let Some(app) = common::spawn_app_with_redis().await else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["checks"]["cache"], "ok");

    common::cleanup(app).await;
}

// ── Versioning ──────────────────────────────────────────────────

fn appointment(id: Uuid, status: AppointmentStatus, updated_at: chrono::DateTime<Utc>) -> Appointment {
    let start_time = Utc::now() + Duration::days(1);
    Appointment {
        id,
        consultant_id: Uuid::now_v7(),
        booked_by: "alice".to_string(),
        start_time,
        end_time: start_time + Duration::hours(1),
        status,
        created_at: updated_at,
        updated_at,
    }
}

#[tokio::test]
async fn older_snapshot_does_not_replace_newer_entry() {
    let Some(url) = common::redis_url() else {
        eprintln!("REDIS_URL not set, skipping");
        return;
    };
    let cache = AppointmentCache::connect(&url, 60).await.unwrap();

    let id = Uuid::now_v7();
    let read_at = Utc::now();
    let stale = appointment(id, AppointmentStatus::Scheduled, read_at);
    let fresh = appointment(id, AppointmentStatus::Cancelled, read_at + Duration::milliseconds(5));

    // A mutation commits and writes its row before a slower reader stores what it loaded earlier.
    assert!(cache.put(&fresh).await);
    assert!(!cache.put(&stale).await);

    let cached = cache.get(id).await.unwrap();
    assert_eq!(cached.status, AppointmentStatus::Cancelled);

    // Rewriting the same version is a no-op, a newer one wins.
    assert!(!cache.put(&fresh).await);
    let newer = appointment(id, AppointmentStatus::Completed, read_at + Duration::seconds(1));
    assert!(cache.put(&newer).await);
    assert_eq!(cache.get(id).await.unwrap().status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn disabled_cache_is_inert() {
    let cache = AppointmentCache::disabled();
    let id = Uuid::now_v7();

    assert!(!cache.put(&appointment(id, AppointmentStatus::Scheduled, Utc::now())).await);
    assert!(cache.get(id).await.is_none());
    assert_eq!(cache.ping().await, None);
}
