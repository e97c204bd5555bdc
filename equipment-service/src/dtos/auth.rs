use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, User};
use crate::services::SessionClaims;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "6f1c2a9e-5b1d-4a47-9a3e-0c8b7f9d1e20")]
    pub organization_id: Uuid,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "tech@example.com")]
    pub email: String,

    #[validate(length(min = 1, max = 256, message = "Password is required"))]
    #[schema(example = "Backhoe#Loader42", min_length = 12)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "6f1c2a9e-5b1d-4a47-9a3e-0c8b7f9d1e20")]
    pub organization_id: Uuid,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "tech@example.com")]
    pub email: String,

    #[validate(length(min = 1, max = 256, message = "Password is required"))]
    #[schema(example = "Backhoe#Loader42")]
    pub password: String,
}

/// Public view of a user; never carries the hash or lockout counters.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "tech@example.com")]
    pub email: String,
    #[schema(value_type = i16, example = 4)]
    pub role: Role,
    #[schema(example = "active")]
    pub status: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            organization_id: user.organization_id,
            email: user.email.clone(),
            role: user.role(),
            status: user.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub token: String,
    #[schema(example = "tech@example.com")]
    pub email: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[schema(example = "tech@example.com")]
    pub email: String,
}

/// Verified claims of the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "tech@example.com")]
    pub email: String,
    #[schema(value_type = i16, example = 4)]
    pub role: Role,
    #[schema(example = "member")]
    pub role_name: String,
    /// Token expiry (Unix timestamp)
    pub expires_at: i64,
}

impl From<SessionClaims> for MeResponse {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            organization_id: claims.organization_id,
            role_name: claims.role_id.to_string(),
            role: claims.role_id,
            email: claims.email,
            expires_at: claims.exp,
        }
    }
}
