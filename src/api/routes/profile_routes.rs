//! Profile Routes
//!
//! 定义用户画像相关的 API 路由。

use crate::api::handlers::profile_handler::*;
use crate::security::middleware::require_auth;
use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建画像路由器
///
/// 读取接口公开；写接口和 `/profiles/me` 需要认证。
pub fn create_profile_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profiles/:id", get(get_profile));

    let protected = Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/me", get(get_my_profile))
        .route("/profiles/picture", post(upload_picture))
        .route(
            "/profiles/:id",
            axum::routing::put(update_profile).delete(delete_profile),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}
