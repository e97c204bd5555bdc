use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    models::Role,
    services::{ServiceError, SessionClaims},
};

/// Route layer rejecting callers less privileged than the required role.
///
/// Must run behind `auth_middleware`. Wire it with
/// `from_fn_with_state(Role::Manager, require_role)`.
pub async fn require_role(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<SessionClaims>()
        .ok_or(ServiceError::Unauthenticated)?;

    if !claims.role().satisfies(required) {
        tracing::warn!(
            user_id = %claims.sub,
            organization_id = %claims.organization_id,
            role = %claims.role(),
            required_role = %required,
            "Insufficient role"
        );
        return Err(ServiceError::Forbidden { required }.into());
    }

    Ok(next.run(req).await)
}
