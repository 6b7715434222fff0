use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::extractor::Caller;
use crate::error::AppError;
use crate::state::SharedState;

/// Apply the per-caller fixed window. Must run after `require_bearer`.
pub async fn per_caller(
    State(state): State<SharedState>,
    caller: Caller,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(retry_after) = state.limiter.check(&caller.subject) {
        tracing::warn!(subject = %caller.subject, retry_after, "Rate limit exceeded");
        return Err(AppError::RateLimited(retry_after));
    }

    Ok(next.run(req).await)
}
