//! Security Middleware Module
//!
//! Provides Axum middleware for authentication, CORS and security headers.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::app_state::AppState;
use crate::config::config::SecurityConfig;
use crate::security::auth::Credentials;

/// Authentication middleware
///
/// Rejects the request with 401 unless the identity verifier accepts its
/// credentials; on success the [`AuthenticatedAccount`](crate::security::auth::AuthenticatedAccount) is stored in the
/// request extensions.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let credentials = extract_credentials(&req);

    match state.verifier.verify(&credentials).await {
        Ok(account) => {
            tracing::debug!(
                account_id = %account.account_id,
                method = %account.method,
                "Request authenticated"
            );
            req.extensions_mut().insert(account);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), "Authentication rejected: {}", e);
            e.into_response()
        }
    }
}

/// Extract credentials from request headers
fn extract_credentials(req: &Request) -> Credentials {
    if let Some(auth) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth.to_str() {
            return Credentials::from_authorization_header(Some(auth_str));
        }
    }

    if let Some(api_key) = req.headers().get("X-API-Key") {
        if let Ok(key) = api_key.to_str() {
            return Credentials::new(Some(key.to_string()), None);
        }
    }

    Credentials::default()
}

/// Security headers middleware
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    response
}

/// Build the CORS layer from security settings
pub fn cors_layer(settings: &SecurityConfig) -> CorsLayer {
    let allow_origin = if settings.cors_allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            settings
                .cors_allowed_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                }),
        )
    };

    let layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
        ]);

    // credentials cannot be combined with a wildcard origin
    if settings.cors_allowed_origins.iter().any(|o| o == "*") {
        layer
    } else {
        layer.allow_credentials(true)
    }
}
