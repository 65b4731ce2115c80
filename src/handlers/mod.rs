pub mod bookings;
pub mod cars;
pub mod health;
pub mod locations;
pub mod users;

use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::state::AppState;

/// Resolve the request's bearer token to a principal id via the identity
/// collaborator. Every protected route goes through here; the principal is
/// then passed down explicitly, never read from ambient state.
pub(crate) async fn require_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() {
        return Err(AppError::Unauthenticated);
    }

    match state.identity.resolve_token(token).await {
        Ok(Some(principal)) => Ok(principal),
        Ok(None) => Err(AppError::Unauthenticated),
        Err(err) => {
            tracing::error!(error = %err, "identity lookup failed");
            Err(AppError::Upstream(err.to_string()))
        }
    }
}
