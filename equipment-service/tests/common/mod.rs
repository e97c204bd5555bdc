//! Shared setup for equipment-service integration tests.
//!
//! Drives the real router with `oneshot` over an in-memory store, so no
//! PostgreSQL is needed.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use equipment_service::{
    build_router,
    config::{
        DatabaseConfig, EquipmentConfig, Environment, JwtConfig, LockoutConfig, SecurityConfig,
        StoreBackend, SwaggerConfig, SwaggerMode,
    },
    models::Role,
    services::MemoryStore,
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "equipment-service-test-secret-0123456789";
pub const TEST_PASSWORD: &str = "Backhoe#Loader42";
pub const MAX_FAILED_ATTEMPTS: i32 = 3;

pub fn test_config() -> EquipmentConfig {
    EquipmentConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "equipment-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store_backend: StoreBackend::Memory,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
        },
        lockout: LockoutConfig {
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            duration_seconds: 900,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Public,
        },
    }
}

/// A registered caller: their organization, id and bearer token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: EquipmentConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(Arc::new(config), store.clone());
        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            router,
            state,
            store,
        }
    }

    /// Sends one request and returns the status with the decoded JSON body
    /// (`Value::Null` when the body is empty or not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_raw(request).await
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, organization_id: Uuid, email: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "organization_id": organization_id,
                "email": email,
                "password": TEST_PASSWORD,
            })),
        )
        .await
    }

    pub async fn login(
        &self,
        organization_id: Uuid,
        email: &str,
        password: &str,
    ) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "organization_id": organization_id,
                "email": email,
                "password": password,
            })),
        )
        .await
    }

    /// Registers a fresh member and returns their session.
    pub async fn member(&self, organization_id: Uuid) -> Caller {
        let email = format!("member-{}@example.com", Uuid::new_v4().simple());
        let (status, body) = self.register(organization_id, &email).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        Caller {
            organization_id,
            user_id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Same caller, re-issued with another role.
    pub fn with_role(&self, caller: &Caller, role: Role) -> Caller {
        let token = self
            .state
            .jwt
            .issue(caller.user_id, caller.organization_id, &caller.email, role)
            .unwrap();
        Caller {
            token,
            ..caller.clone()
        }
    }

    /// Creates a record and returns its JSON.
    pub async fn create_equipment(&self, caller: &Caller, serial_number: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/equipment",
                &caller.token,
                json!({
                    "serial_number": serial_number,
                    "make": "Caterpillar",
                    "model": "320 GC",
                    "location": "Yard A",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }
}
