use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserSummary},
        ErrorResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Register a user in an organization
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 409, description = "Email already registered in organization", body = ErrorResponse),
        (status = 422, description = "Validation error or weak password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth_service
        .register(req.organization_id, &req.email, req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: session.user.email.clone(),
            user: UserSummary::from(&session.user),
            token: session.token,
        }),
    ))
}

/// Login with organization, email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or account temporarily locked", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .auth_service
        .login(req.organization_id, &req.email, req.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            token: session.token,
            email: session.user.email,
        }),
    ))
}
