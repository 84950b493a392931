//! Profile API Handlers
//!
//! HTTP handlers for profile CRUD operations and picture upload.

use axum::{
    Json,
    extract::{
        Extension, Multipart, Path, Query, State,
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use futures_util::StreamExt;
use tracing::debug;
use validator::Validate;

use crate::{
    api::{app_state::AppState, dto::profile_dto::*},
    error::{AppError, ErrorResponse},
    security::auth::AuthenticatedAccount,
    storage::ByteStream,
};

/// Multipart field carrying the picture
pub const PICTURE_FIELD: &str = "profile_picture";

/// Create a profile for the authenticated account
///
/// POST /api/profiles
#[utoipa::path(
    post,
    path = "/api/profiles",
    tag = "profiles",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Invalid body or unknown account", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 403, description = "Body account does not match the caller", body = ErrorResponse),
        (status = 409, description = "Account already has a profile", body = ErrorResponse),
    ),
    security(("bearer" = []), ("api_key" = []))
)]
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    payload: Result<Json<CreateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    debug!("Creating profile for account: {}", account.account_id);
    request.validate()?;

    let claimed = request.account_id.clone();
    let profile = state
        .profile_service
        .create_profile(&account.account_id, claimed.as_deref(), request.into())
        .await?;

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

/// List profiles
///
/// GET /api/profiles
#[utoipa::path(
    get,
    path = "/api/profiles",
    tag = "profiles",
    params(ListProfilesParams),
    responses(
        (status = 200, description = "Profiles", body = ListProfilesResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    params: Result<Query<ListProfilesParams>, QueryRejection>,
) -> Result<Json<ListProfilesResponse>, AppError> {
    let Query(params) = params?;
    debug!(
        "Listing profiles: page={:?}, page_size={:?}",
        params.page, params.page_size
    );

    let page = state
        .profile_service
        .list_profiles(params.pagination())
        .await?;

    Ok(Json(page.into()))
}

/// Get a profile by ID
///
/// GET /api/profiles/:id
#[utoipa::path(
    get,
    path = "/api/profiles/{id}",
    tag = "profiles",
    params(("id" = String, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    debug!("Getting profile: {}", id);
    let profile = state.profile_service.read_profile(&id).await?;
    Ok(Json(profile.into()))
}

/// Get the caller's own profile
///
/// GET /api/profiles/me
#[utoipa::path(
    get,
    path = "/api/profiles/me",
    tag = "profiles",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "Caller has no profile", body = ErrorResponse),
    ),
    security(("bearer" = []), ("api_key" = []))
)]
pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
) -> Result<Json<ProfileResponse>, AppError> {
    debug!("Getting profile for account: {}", account.account_id);
    let profile = state
        .profile_service
        .read_own_profile(&account.account_id)
        .await?;
    Ok(Json(profile.into()))
}

/// Update a profile
///
/// PUT /api/profiles/:id
#[utoipa::path(
    put,
    path = "/api/profiles/{id}",
    tag = "profiles",
    params(("id" = String, Path, description = "Profile ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 403, description = "Profile belongs to another account", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
    ),
    security(("bearer" = []), ("api_key" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(request) = payload?;
    debug!("Updating profile: {}", id);
    request.validate()?;

    let profile = state
        .profile_service
        .update_profile(&account.account_id, &id, request.into())
        .await?;

    Ok(Json(profile.into()))
}

/// Delete a profile
///
/// DELETE /api/profiles/:id
#[utoipa::path(
    delete,
    path = "/api/profiles/{id}",
    tag = "profiles",
    params(("id" = String, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile deleted", body = DeleteProfileResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 403, description = "Profile belongs to another account", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse),
    ),
    security(("bearer" = []), ("api_key" = []))
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
) -> Result<Json<DeleteProfileResponse>, AppError> {
    debug!("Deleting profile: {}", id);

    let removed = state
        .profile_service
        .delete_profile(&account.account_id, &id)
        .await?;

    Ok(Json(DeleteProfileResponse {
        id: removed.id,
        message: "Profile deleted successfully".to_string(),
    }))
}

/// Upload the caller's profile picture
///
/// POST /api/profiles/picture
#[utoipa::path(
    post,
    path = "/api/profiles/picture",
    tag = "profiles",
    request_body(content = UploadPictureForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Picture stored", body = UploadPictureResponse),
        (status = 400, description = "Missing field, bad type or too large", body = ErrorResponse),
        (status = 408, description = "Upload did not finish in time", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 404, description = "Caller has no profile", body = ErrorResponse),
        (status = 500, description = "Picture could not be stored", body = ErrorResponse),
    ),
    security(("bearer" = []), ("api_key" = []))
)]
pub async fn upload_picture(
    State(state): State<AppState>,
    Extension(account): Extension<AuthenticatedAccount>,
    mut multipart: Multipart,
) -> Result<Json<UploadPictureResponse>, AppError> {
    debug!("Uploading picture for account: {}", account.account_id);
    let body_limit = state.config.server.max_request_size as u64;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_rejection(e, body_limit))?
    {
        if field.name() != Some(PICTURE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        // 分段未声明长度时为 0，实际大小由写入时的流式上限把关
        let declared = field
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let content: ByteStream<'_> = field.map(|chunk| chunk.map_err(stream_error)).boxed();

        let locator = state
            .profile_service
            .upload_picture(&account.account_id, content, &content_type, declared)
            .await?;

        return Ok(Json(UploadPictureResponse {
            picture: locator.as_str().to_string(),
            message: "Profile picture uploaded successfully".to_string(),
        }));
    }

    Err(AppError::Validation(format!(
        "Missing multipart field: {}",
        PICTURE_FIELD
    )))
}

/// 请求体超过上限时返回 `PayloadTooLarge`，其余为格式错误
fn multipart_rejection(e: MultipartError, body_limit: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            size: body_limit + 1,
            limit: body_limit,
        }
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// 请求体超过上限时保留“过大”的语义
fn stream_error(e: MultipartError) -> std::io::Error {
    let kind = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        std::io::ErrorKind::FileTooLarge
    } else {
        std::io::ErrorKind::InvalidData
    };
    std::io::Error::new(kind, e.body_text())
}
