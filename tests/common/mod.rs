use std::net::SocketAddr;

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use consultbook::cache::AppointmentCache;
use consultbook::config::{AuthConfig, Config, RateLimitConfig, SigningKey};

pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";
pub const ISSUER: &str = "https://idp.test";
pub const AUDIENCE: &str = "consultbook";
pub const ADMIN: &str = "admin-subject";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

/// Mint a token the way the identity provider would.
pub fn token_for(subject: &str, roles: &[&str]) -> String {
    sign(json!({
        "sub": subject,
        "roles": roles,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": (Utc::now() + Duration::minutes(15)).timestamp(),
    }))
}

pub fn sign(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to sign test token")
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_token(&self) -> String {
        token_for(ADMIN, &["admin"])
    }

    /// Create a consultant as admin, return the consultant JSON.
    pub async fn create_consultant(&self, name: &str) -> Value {
        let (body, status) = self
            .post_auth("/api/consultants", &self.admin_token(), &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create consultant failed: {body}");
        body
    }

    /// Book an appointment, return (body, status).
    pub async fn book(
        &self,
        token: &str,
        consultant_id: &str,
        start_time: &str,
        end_time: Option<&str>,
    ) -> (Value, StatusCode) {
        let mut body = json!({ "consultant_id": consultant_id, "start_time": start_time });
        if let Some(end) = end_time {
            body["end_time"] = json!(end);
        }
        self.post_auth("/api/appointments", token, &body).await
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        redis_url: None,
        auth: AuthConfig {
            key: SigningKey::Secret(JWT_SECRET.to_string()),
            issuer: Some(ISSUER.to_string()),
            audience: Some(AUDIENCE.to_string()),
        },
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        max_body_size: 65_536,
        rate_limit: RateLimitConfig::default(),
        default_duration_minutes: 60,
        cache_ttl_secs: 300,
    }
}

/// Spawn a test app with a fresh temporary database and no cache.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(AppointmentCache::disabled()).await
}

/// `REDIS_URL` for cache tests; those tests skip themselves when it is unset.
#[allow(dead_code)]
pub fn redis_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty())
}

/// Spawn a test app backed by Redis, or `None` when `REDIS_URL` is not set.
#[allow(dead_code)]
pub async fn spawn_app_with_redis() -> Option<TestApp> {
    let url = redis_url()?;
    let cache = AppointmentCache::connect(&url, 300)
        .await
        .expect("Failed to connect to Redis");
    Some(spawn_app_with(cache).await)
}

pub async fn spawn_app_with(cache: AppointmentCache) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!(
        "consultbook_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let (app, _state) = consultbook::build_app(
        pool.clone(),
        test_config(test_url),
        cache,
    )
    .expect("Failed to build app");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
