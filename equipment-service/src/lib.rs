pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{EquipmentConfig, Environment, SwaggerMode};
use crate::dtos::ErrorResponse;
use crate::models::Role;
use crate::services::{
    AuthService, EquipmentService, EquipmentStore, JwtService, LockoutPolicy, UserStore,
};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::user::get_me,
        handlers::equipment::list_equipment,
        handlers::equipment::get_equipment,
        handlers::equipment::create_equipment,
        handlers::equipment::update_equipment,
        handlers::equipment::delete_equipment,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::UserSummary,
            dtos::auth::MeResponse,
            dtos::equipment::CreateEquipmentRequest,
            dtos::equipment::UpdateEquipmentRequest,
            dtos::equipment::EquipmentListResponse,
            models::Equipment,
            models::EquipmentStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "User", description = "Caller identity"),
        (name = "Equipment", description = "Tenant-scoped equipment records"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EquipmentConfig>,
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtService,
    pub auth_service: AuthService,
    pub equipment_service: EquipmentService,
}

impl AppState {
    /// Wires the services over one store that backs both users and equipment.
    pub fn new<S>(config: Arc<EquipmentConfig>, store: Arc<S>) -> Self
    where
        S: UserStore + EquipmentStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let equipment: Arc<dyn EquipmentStore> = store;

        let jwt = JwtService::new(&config.jwt);
        let lockout = LockoutPolicy::from(&config.lockout);
        let auth_service = AuthService::new(users.clone(), jwt.clone(), lockout);
        let equipment_service = EquipmentService::new(equipment);

        Self {
            config,
            users,
            jwt,
            auth_service,
            equipment_service,
        }
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let delete_equipment = handlers::delete_equipment
        .layer(from_fn_with_state(Role::Manager, middleware::require_role));

    let protected = Router::new()
        .route("/api/me", get(handlers::get_me))
        .route(
            "/api/equipment",
            get(handlers::list_equipment).post(handlers::create_equipment),
        )
        .route(
            "/api/equipment/:id",
            get(handlers::get_equipment)
                .patch(handlers::update_equipment)
                .delete(delete_equipment),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let app = app
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .merge(protected)
        .with_state(state.clone())
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins(&state.config.security.allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

/// Unparseable origins are dropped rather than widened.
fn cors_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Ignoring it.", origin, e);
                None
            }
        })
        .collect()
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Backing store unavailable", body = ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.users.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment).to_lowercase(),
        "checks": {
            "store": "up"
        }
    })))
}
