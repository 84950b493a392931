//! OpenAPI 文档
//!
//! 由 utoipa 从处理函数和 DTO 上的注解生成。

use axum::{Json, Router, routing::get};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::dto::profile_dto::*;
use crate::api::handlers::profile_handler;
use crate::error::ErrorResponse;

/// 文档路径
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "GitConnect Profile API", description = "Developer profile lifecycle"),
    paths(
        profile_handler::create_profile,
        profile_handler::list_profiles,
        profile_handler::get_profile,
        profile_handler::get_my_profile,
        profile_handler::update_profile,
        profile_handler::delete_profile,
        profile_handler::upload_picture,
    ),
    components(schemas(
        CreateProfileRequest,
        UpdateProfileRequest,
        ProfileResponse,
        ListProfilesResponse,
        DeleteProfileResponse,
        UploadPictureForm,
        UploadPictureResponse,
        ErrorResponse,
    )),
    modifiers(&SecuritySchemes),
    tags((name = "profiles", description = "Profile management"))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

/// 文档路由
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_profile_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/profiles",
            "/api/profiles/{id}",
            "/api/profiles/me",
            "/api/profiles/picture",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer"));
        assert!(schemes.contains_key("api_key"));
    }
}
