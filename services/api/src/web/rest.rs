//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the upload and project endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::auth;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use burner_core::domain::{ProjectStatus, Video};
use burner_core::ports::PortError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::token_handler,
        auth::oauth_redirect_handler,
        auth::logout_handler,
        auth::me_handler,
        request_upload_handler,
        create_project_handler,
        list_projects_handler,
        download_project_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::TokenRequest,
            auth::AuthResponse,
            auth::TokenResponse,
            auth::MeResponse,
            UploadUrlRequest,
            UploadUrlResponse,
            CreateProjectBody,
            ProjectResponse,
            DownloadResponse,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Burner API", description = "Accounts, upload credentials and caption projects.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
}

/// The write credential for one object. `fileId` is the object key.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub file_id: String,
    pub public_url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateProjectBody {
    pub r2_key: String,
    pub original_filename: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub r2_key: String,
    pub original_filename: String,
    /// One of `PENDING`, `QUEUED`, `PROCESSING`, `COMPLETED`, `FAILED`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Video> for ProjectResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            r2_key: video.s3_key,
            original_filename: video.original_name,
            status: video.status.as_str().to_string(),
            created_at: video.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    pub download_url: String,
}

/// Builds the object key for a new upload: `{user_id}/{uuid}.{ext}`.
///
/// Returns `None` when the file name has no usable extension.
pub fn object_key_for(user_id: Uuid, file_name: &str) -> Option<String> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())?
        .to_lowercase();
    Some(format!("{}/{}.{}", user_id, Uuid::new_v4(), ext))
}

fn internal(context: &str, e: PortError) -> (StatusCode, String) {
    error!("{}: {:?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Issue a presigned PUT URL for a new video upload.
#[utoipa::path(
    post,
    path = "/api/upload/request",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload credential issued", body = UploadUrlResponse),
        (status = 400, description = "File name has no extension"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn request_upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UploadUrlRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Derive the object key from the file extension
    let key = object_key_for(user_id, &req.file_name).ok_or((
        StatusCode::BAD_REQUEST,
        "File name must have an extension".to_string(),
    ))?;

    // 2. Presign the write with the declared content type
    let upload_url = state
        .storage
        .presign_put(&key, &req.file_type)
        .map_err(|e| internal("Failed to generate upload URL", e))?;

    // 3. Track the pending object
    state
        .db
        .create_video(
            user_id,
            &key,
            state.storage.bucket(),
            &req.file_name,
            &req.file_type,
        )
        .await
        .map_err(|e| internal("Failed to record upload", e))?;

    info!("Issued upload URL for {} to user {}", key, user_id);
    Ok(Json(UploadUrlResponse {
        upload_url,
        public_url: state.storage.public_url(&key),
        file_id: key,
    }))
}

/// Confirm an uploaded object and queue it for caption processing.
#[utoipa::path(
    post,
    path = "/api/v1/projects/create",
    request_body = CreateProjectBody,
    responses(
        (status = 200, description = "Project queued", body = ProjectResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No upload with this key for the caller"),
        (status = 409, description = "The upload was already activated"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateProjectBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let not_found = || (StatusCode::NOT_FOUND, "Upload not found".to_string());

    // 1. The key must name an upload owned by the caller
    let video = match state.db.get_video_by_key(&req.r2_key).await {
        Ok(video) if video.user_id == user_id => video,
        Ok(_) | Err(PortError::NotFound(_)) => return Err(not_found()),
        Err(e) => return Err(internal("Failed to load upload", e)),
    };

    // 2. Only a pending upload can be queued
    if video.status != ProjectStatus::Pending {
        return Err((
            StatusCode::CONFLICT,
            format!("Project is already {}", video.status.as_str()),
        ));
    }

    // 3. Queue it
    let video = state
        .db
        .update_video_status(video.id, ProjectStatus::Queued)
        .await
        .map_err(|e| internal("Failed to create project", e))?;

    info!(
        "Queued project {} ({}) for user {}",
        video.id, req.original_filename, user_id
    );
    Ok(Json(ProjectResponse::from(video)))
}

/// List the caller's projects, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    responses(
        (status = 200, description = "Projects", body = [ProjectResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let videos = state
        .db
        .list_videos_for_user(user_id)
        .await
        .map_err(|e| internal("Failed to list projects", e))?;

    let projects: Vec<ProjectResponse> = videos.into_iter().map(ProjectResponse::from).collect();
    Ok(Json(projects))
}

/// Issue a presigned GET URL for one of the caller's projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/download",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Download URL", body = DownloadResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer" = []))
)]
pub async fn download_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(project_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let video = match state.db.get_video_by_id(project_id).await {
        Ok(video) if video.user_id == user_id => video,
        Ok(_) | Err(PortError::NotFound(_)) => {
            return Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
        }
        Err(e) => return Err(internal("Failed to load project", e)),
    };

    let download_url = state
        .storage
        .presign_get(&video.s3_key)
        .map_err(|e| internal("Failed to generate download URL", e))?;

    Ok(Json(DownloadResponse { download_url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_keep_the_owner_and_lowercased_extension() {
        let user = Uuid::new_v4();
        let key = object_key_for(user, "Holiday.Clip.MP4").unwrap();
        assert!(key.starts_with(&format!("{}/", user)));
        assert!(key.ends_with(".mp4"));
        assert_ne!(key, object_key_for(user, "Holiday.Clip.MP4").unwrap());
    }

    #[test]
    fn names_without_extension_have_no_key() {
        let user = Uuid::new_v4();
        assert!(object_key_for(user, "README").is_none());
        assert!(object_key_for(user, "trailing.").is_none());
    }
}
