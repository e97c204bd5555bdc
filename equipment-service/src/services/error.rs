use service_core::error::AppError;
use thiserror::Error;

use super::policy::PolicyError;
use super::store::StoreError;
use crate::models::Role;

/// Business rule violations, reported one at a time in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("serial_number is required")]
    SerialNumberRequired,

    #[error("make is required")]
    MakeRequired,

    #[error("model is required")]
    ModelRequired,

    #[error("location cannot be empty string")]
    LocationEmpty,

    #[error("serial_number already exists in organization")]
    SerialNumberExists,

    #[error("status_id is invalid")]
    InvalidStatus,

    #[error("warranty_expires must be in the future")]
    WarrantyNotInFuture,

    #[error("warranty_expires must be after purchased_date")]
    WarrantyBeforePurchase,

    #[error("{0}")]
    WeakPassword(PolicyError),
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Email already registered in organization")]
    EmailExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account temporarily locked")]
    AccountLocked { remaining_seconds: i64 },

    /// Missing, malformed or unverifiable session token. One message for all.
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient role. Required: {required}")]
    Forbidden { required: Role },

    #[error("Equipment not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => ServiceError::Conflict(constraint),
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Backend(e) => ServiceError::Internal(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(ValidationError::SerialNumberExists) => {
                AppError::Conflict(anyhow::anyhow!(ValidationError::SerialNumberExists))
            }
            ServiceError::Validation(e) => AppError::UnprocessableEntity(anyhow::anyhow!(e)),
            ServiceError::EmailExists => {
                AppError::Conflict(anyhow::anyhow!("Email already registered in organization"))
            }
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::AccountLocked { .. } => {
                AppError::Unauthorized(anyhow::anyhow!("Account temporarily locked"))
            }
            e @ ServiceError::Unauthenticated => AppError::Unauthorized(anyhow::anyhow!(e)),
            e @ ServiceError::Forbidden { .. } => AppError::Forbidden(anyhow::anyhow!(e)),
            ServiceError::NotFound => AppError::NotFound(anyhow::anyhow!("Equipment not found")),
            ServiceError::Conflict(_) => AppError::Conflict(anyhow::anyhow!("Resource already exists")),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
