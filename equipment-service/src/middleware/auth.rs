use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    services::{ServiceError, SessionClaims},
    AppState,
};

fn unauthenticated() -> AppError {
    ServiceError::Unauthenticated.into()
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
}

/// Middleware to require a valid session token.
///
/// Every failure gets the same body; the reason is only logged.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            tracing::debug!("Request without bearer token");
            return Err(unauthenticated());
        }
    };

    let claims = match state.jwt.validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(reason = %e, "Rejected session token");
            return Err(unauthenticated());
        }
    };

    // Claims live in the request extensions for this request only
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get verified claims in handlers
pub struct AuthUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<SessionClaims>()
            .ok_or_else(unauthenticated)?;

        Ok(AuthUser(claims.clone()))
    }
}
