//! # Baby Tracker Backend
//!
//! Orchestration layer tying the pieces together:
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (access policy, validation, calendar, presets)
//!     ↓
//! Storage Layer (document store, blob store)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AppConfig, StorageBackend};
use crate::domain::{
    AuthProvider, BabyService, EventService, FamilyService, FileConfigSource, LocalAuthProvider, SettingsService,
};
use crate::storage::{BlobStore, DocumentStore, FsBlobStore, MemoryDocumentStore, YamlDocumentStore};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub baby_service: BabyService,
    pub event_service: EventService,
    pub family_service: FamilyService,
    pub settings_service: SettingsService,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, settings_service: SettingsService) -> Self {
        Self {
            baby_service: BabyService::new(store.clone(), blobs.clone()),
            event_service: EventService::new(store.clone(), blobs, settings_service.clone()),
            family_service: FamilyService::new(store.clone()),
            auth: Arc::new(LocalAuthProvider::new(store)),
            settings_service,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up storage ({:?}) under {}", config.storage, config.data_dir.display());
    let store: Arc<dyn DocumentStore> = match config.storage {
        StorageBackend::Yaml => Arc::new(YamlDocumentStore::new(&config.data_dir)?),
        StorageBackend::Memory => Arc::new(MemoryDocumentStore::new()),
    };
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.photos_dir())?);

    info!("Setting up admin settings from {}", config.admin_settings_source().display());
    let settings_service = SettingsService::new(
        Arc::new(FileConfigSource::new(config.admin_settings_source())),
        Some(config.admin_settings_cache()),
        config.settings_poll_interval(),
    );

    info!("Setting up domain model");
    Ok(AppState::new(store, blobs, settings_service))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, allowed_origin: &str) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(Router::new()
        .nest("/api", io::rest::router())
        .layer(cors)
        .with_state(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_config(env: &TestEnvironment) -> AppConfig {
        AppConfig {
            data_dir: env.base_directory().to_path_buf(),
            storage: StorageBackend::Memory,
            ..AppConfig::default()
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_requests_without_session_are_rejected() {
        let env = TestEnvironment::new().unwrap();
        let state = initialize_backend(&test_config(&env)).await.unwrap();
        let app = create_router(state, "http://localhost:8080").unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/babies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sign_up_then_create_and_list_baby() {
        let env = TestEnvironment::new().unwrap();
        let state = initialize_backend(&test_config(&env)).await.unwrap();
        let app = create_router(state.clone(), "http://localhost:8080").unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/sign-up",
                serde_json::json!({ "email": "Parent@Example.com", "password": "secret1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/babies",
                serde_json::json!({ "name": "Ada", "birth_date": "2025-01-10", "gender": "FEMALE" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let user = state.auth.current_user().await.unwrap();
        let babies = state.baby_service.list_babies(&user.id).await.unwrap();
        assert_eq!(babies.len(), 1);
        assert_eq!(babies[0].parent_ids, vec![user.id.clone()]);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/sign-in",
                serde_json::json!({ "email": "parent@example.com", "password": "wrong-password" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let env = TestEnvironment::new().unwrap();
        let state = initialize_backend(&test_config(&env)).await.unwrap();
        state.auth.sign_up("a@example.com", "secret1").await.unwrap();
        let app = create_router(state, "http://localhost:8080").unwrap();

        let response = app
            .oneshot(Request::builder().uri("/api/events/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
