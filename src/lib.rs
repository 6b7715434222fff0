pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::TokenVerifier;
use crate::cache::AppointmentCache;
use crate::config::Config;
use crate::middleware::{authenticate, throttle};
use crate::rate_limit::CallerRateLimiter;
use crate::state::{AppState, SharedState};

pub fn build_app(
    pool: PgPool,
    config: Config,
    cache: AppointmentCache,
) -> Result<(Router, SharedState), String> {
    let verifier = TokenVerifier::new(&config.auth)?;
    let limiter = CallerRateLimiter::new(config.rate_limit);
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        verifier,
        limiter,
        cache,
    });

    // Layers run bottom-up: authenticate, then throttle by the authenticated subject.
    let api = routes::api_routes()
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            throttle::per_caller,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authenticate::require_bearer,
        ));

    let app = Router::new()
        .merge(api)
        .merge(routes::health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("cache-control"),
                    HeaderValue::from_static("no-store"),
                )),
        )
        .with_state(state.clone());

    Ok((app, state))
}
