//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, Method},
    routing::{get, post},
    BoxError, Router,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::{
    certificate_document_handler, certificate_qr_handler, delete_certificate_handler,
    get_certificate_handler, health, issue_certificate_handler, list_certificates_handler,
    login_handler, logout_handler, me_handler, ready, verify_by_hash_handler, verify_handler,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Turn middleware failures into the JSON error envelope.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::timeout("Request took too long")
    } else {
        ApiError::internal(format!("Unhandled middleware error: {}", err))
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
                .allow_credentials(true)
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Create the application router for the given state
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    // Request body limit
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    // Request timeout
    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(
            config.timeout_secs,
        )));

    let api = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/me", get(me_handler))
        .route(
            "/certificates",
            post(issue_certificate_handler).get(list_certificates_handler),
        )
        .route(
            "/certificates/{certificate_id}",
            get(get_certificate_handler).delete(delete_certificate_handler),
        )
        .route(
            "/certificates/{certificate_id}/document",
            get(certificate_document_handler),
        )
        .route("/certificates/{certificate_id}/qr", get(certificate_qr_handler))
        .route("/verify", post(verify_handler))
        .route("/verify/{certificate_hash}", get(verify_by_hash_handler))
        .with_state(state);

    // Base router with common layers
    let router = Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&config))
        .layer(body_limit)
        .layer(timeout);

    // Conditionally apply rate limiting (disabled in tests, enabled in production)
    let governor_conf = if config.rate_limit_enabled {
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish()
    } else {
        None
    };

    match governor_conf {
        Some(governor_conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
            router
                .layer(GovernorLayer::new(Arc::new(governor_conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => {
            if config.rate_limit_enabled {
                tracing::error!("Rate limiting: invalid configuration, DISABLED");
            } else {
                tracing::warn!("Rate limiting: DISABLED");
            }
            router.layer(TraceLayer::new_for_http())
        }
    }
}
