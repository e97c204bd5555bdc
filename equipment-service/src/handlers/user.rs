use axum::Json;

use crate::{
    dtos::{auth::MeResponse, ErrorResponse},
    middleware::AuthUser,
};

/// Verified identity of the caller
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Claims of the presented session token", body = MeResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse::from(claims))
}
