use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::Claims;
use crate::error::AppError;

pub const ADMIN_ROLE: &str = "admin";

/// Authenticated identity attached to a request by the bearer middleware.
#[derive(Debug, Clone)]
pub struct Caller {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Caller {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.roles.iter().any(|r| r == ADMIN_ROLE) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            roles: claims.roles,
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))
    }
}
