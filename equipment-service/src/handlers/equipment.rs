use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{
        equipment::{
            CreateEquipmentRequest, EquipmentListResponse, ListEquipmentQuery,
            UpdateEquipmentRequest,
        },
        ErrorResponse,
    },
    middleware::AuthUser,
    models::{Equipment, EquipmentFilter},
    utils::ValidatedJson,
    AppState,
};

/// List the caller's organization equipment, newest first
#[utoipa::path(
    get,
    path = "/api/equipment",
    params(ListEquipmentQuery),
    responses(
        (status = 200, description = "Equipment of the caller's organization", body = EquipmentListResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ListEquipmentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EquipmentFilter::from(query);
    let equipment = state
        .equipment_service
        .list(claims.organization_id, &filter)
        .await?;
    let total = state
        .equipment_service
        .count(claims.organization_id)
        .await?;

    Ok(Json(EquipmentListResponse { equipment, total }))
}

/// Fetch one equipment record
#[utoipa::path(
    get,
    path = "/api/equipment/{id}",
    params(("id" = Uuid, Path, description = "Equipment id")),
    responses(
        (status = 200, description = "Equipment record", body = Equipment),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let equipment = state
        .equipment_service
        .get(claims.organization_id, id)
        .await?;
    Ok(Json(equipment))
}

/// Create an equipment record in the caller's organization
#[utoipa::path(
    post,
    path = "/api/equipment",
    request_body = CreateEquipmentRequest,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Malformed body or date", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 409, description = "Serial number already exists in organization", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let equipment = state
        .equipment_service
        .create(claims.organization_id, claims.sub, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update the mutable fields of an equipment record
#[utoipa::path(
    patch,
    path = "/api/equipment/{id}",
    params(("id" = Uuid, Path, description = "Equipment id")),
    request_body = UpdateEquipmentRequest,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 400, description = "Malformed body or date", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn update_equipment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEquipmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let equipment = state
        .equipment_service
        .update(claims.organization_id, id, req.into(), claims.sub)
        .await?;
    Ok(Json(equipment))
}

/// Soft-delete an equipment record (manager or above)
#[utoipa::path(
    delete,
    path = "/api/equipment/{id}",
    params(("id" = Uuid, Path, description = "Equipment id")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Insufficient role", body = ErrorResponse),
        (status = 404, description = "Equipment not found", body = ErrorResponse)
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .equipment_service
        .delete(claims.organization_id, id, claims.sub)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
