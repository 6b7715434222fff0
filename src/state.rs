use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::TokenVerifier;
use crate::cache::AppointmentCache;
use crate::config::Config;
use crate::rate_limit::CallerRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub verifier: TokenVerifier,
    pub limiter: CallerRateLimiter,
    pub cache: AppointmentCache,
}
