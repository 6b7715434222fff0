use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejection;

use crate::auth::extractor::Caller;
use crate::error::AppError;
use crate::state::SharedState;

/// Reject requests without a valid bearer token and attach the `Caller` for later layers.
pub async fn require_bearer(
    State(state): State<SharedState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .map_err(|_| AppError::Unauthorized("Missing authentication token".to_string()))?;

    let claims = state.verifier.verify(bearer.token()).map_err(|e| {
        tracing::debug!("Rejected bearer token: {e}");
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    req.extensions_mut().insert(Caller::from(claims));
    Ok(next.run(req).await)
}
