//! API 模块
//!
//! 提供 REST API 支持。

#[cfg(test)]
mod api_tests;
pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::api::app_state::AppState;
use crate::error::AppError;
use crate::observability::{ObservabilityState, create_observability_router};
use crate::security::middleware::{cors_layer, security_headers_middleware};
use axum::{BoxError, Router, error_handling::HandleErrorLayer, extract::DefaultBodyLimit};
use tower::{ServiceBuilder, timeout::error::Elapsed};
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: AppState) -> Router {
    let config = app_state.config.clone();
    let observability = Arc::new(ObservabilityState::new(
        app_state.gateway.clone(),
        env!("CARGO_PKG_VERSION"),
    ));

    let api = Router::new().merge(routes::profile_routes::create_profile_router(
        app_state.clone(),
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .merge(create_observability_router(observability))
        .layer(DefaultBodyLimit::max(config.server.max_request_size));

    if config.security.security_headers_enabled {
        router = router.layer(axum::middleware::from_fn(security_headers_middleware));
    }

    let router = router.layer(cors_layer(&config.security));
    with_request_timeout(router, Duration::from_secs(config.server.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// 超时的请求返回结构化的 408 错误体
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .timeout(timeout),
    )
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        AppError::Timeout("request exceeded the configured timeout".to_string())
    } else {
        AppError::Internal(err.to_string())
    }
}

pub async fn initialize_api(app_state: AppState) -> Result<Router, AppError> {
    tracing::info!("Initializing API router...");
    Ok(create_router(app_state))
}
