pub mod appointments;
pub mod consultants;
pub mod health;

use axum::Router;
use axum::routing::{get, post};

use crate::state::SharedState;

/// Routes behind bearer authentication and the per-caller rate limit.
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Appointments
        .route(
            "/api/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route(
            "/api/appointments/{id}",
            get(appointments::get).put(appointments::reschedule),
        )
        .route("/api/appointments/{id}/complete", post(appointments::complete))
        .route("/api/appointments/{id}/cancel", post(appointments::cancel))
        // Consultants
        .route(
            "/api/consultants",
            get(consultants::list).post(consultants::create),
        )
        .route("/api/consultants/{id}", get(consultants::get))
        .route(
            "/api/consultants/{id}/appointments",
            get(consultants::schedule),
        )
}

pub fn health_routes() -> Router<SharedState> {
    Router::new().route("/health", get(health::health))
}
