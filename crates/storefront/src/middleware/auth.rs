//! Admin bearer-token guard.
//!
//! `/api/admin/*` is protected by a single shared token from
//! `BRICKHAUS_ADMIN_TOKEN`. Tokens are compared as SHA-256 digests so the
//! comparison time does not depend on how much of the token matched.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Reject requests without the admin bearer token.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let verdict = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(|token| token_matches(token, state.config().admin_token.expose_secret()));

    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with wrong token");
            AppError::Unauthorized("invalid admin token".to_string()).into_response()
        }
        None => AppError::Unauthorized("admin token required".to_string()).into_response(),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn token_matches(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cr3t-T0ken", "s3cr3t-T0ken"));
        assert!(!token_matches("s3cr3t-T0ke", "s3cr3t-T0ken"));
        assert!(!token_matches("", "s3cr3t-T0ken"));
    }
}
