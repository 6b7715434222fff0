use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;

use crate::state::SharedState;

/// Report database and cache reachability. 503 when any configured dependency is down.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<serde_json::Value>) {
    let database_ok = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check: database unreachable: {e}");
            false
        }
    };

    let cache = state.cache.ping().await;
    if cache == Some(false) {
        tracing::warn!("Health check: cache unreachable");
    }

    let healthy = database_ok && cache != Some(false);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if healthy { "ok" } else { "unhealthy" },
        "checks": {
            "database": if database_ok { "ok" } else { "error" },
            "cache": match cache {
                Some(true) => "ok",
                Some(false) => "error",
                None => "disabled",
            },
        },
    });

    (status, Json(body))
}
