//! crates/burner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the backend
//! implements the storage-facing ports, the client implements the HTTP-facing ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{
    CreateProjectRequest, FileDescriptor, Project, ProjectStatus, SessionUser, UploadRequest,
    UploadTicket, User, UserCredentials, Video,
};
use crate::session::PersistedSession;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The remote side answered with a non-success status.
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("Cancelled")]
    Cancelled,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Client Ports
//=========================================================================================

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges a username and password for an access token (`POST /auth/token`).
    async fn login(&self, username: &str, password: &str) -> PortResult<String>;

    /// Fetches the user that owns the token.
    async fn current_user(&self, token: &str) -> PortResult<SessionUser>;

    /// The URL a browser is sent to for an OAuth login with `provider`.
    fn oauth_url(&self, provider: &str) -> String;
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Asks the backend for a write credential for a new object.
    async fn request_upload(&self, token: &str, request: &UploadRequest)
        -> PortResult<UploadTicket>;

    /// Tells the backend the object is in storage so processing can start.
    async fn create_project(
        &self,
        token: &str,
        request: &CreateProjectRequest,
    ) -> PortResult<Project>;
}

/// Receives byte-level progress from a transfer.
pub trait ProgressObserver: Send + Sync {
    /// `total` is `None` when the transport cannot tell how large the body is.
    fn on_progress(&self, sent: u64, total: Option<u64>);
}

#[async_trait]
pub trait ObjectTransfer: Send + Sync {
    /// Streams `file` to `url` with a PUT.
    ///
    /// Non-2xx responses map to `PortError::Rejected`, an abort through `cancel`
    /// to `PortError::Cancelled`, and transport failures to `PortError::Unexpected`.
    async fn put(
        &self,
        url: &str,
        file: &FileDescriptor,
        progress: &dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> PortResult<Option<PersistedSession>>;

    async fn save(&self, session: &PersistedSession) -> PortResult<()>;

    async fn clear(&self) -> PortResult<()>;
}

//=========================================================================================
// Backend Ports
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a session that has not expired.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;

    /// Deletes every session that expired at or before `now`; returns how many.
    async fn delete_expired_auth_sessions(&self, now: DateTime<Utc>) -> PortResult<u64>;

    // --- Videos ---
    async fn create_video(
        &self,
        user_id: Uuid,
        s3_key: &str,
        bucket: &str,
        original_name: &str,
        content_type: &str,
    ) -> PortResult<Video>;

    async fn get_video_by_key(&self, s3_key: &str) -> PortResult<Video>;

    async fn get_video_by_id(&self, video_id: Uuid) -> PortResult<Video>;

    async fn update_video_status(&self, video_id: Uuid, status: ProjectStatus)
        -> PortResult<Video>;

    async fn list_videos_for_user(&self, user_id: Uuid) -> PortResult<Vec<Video>>;
}

pub trait ObjectStorage: Send + Sync {
    /// A time-limited URL that accepts a PUT of `key` with the given content type.
    fn presign_put(&self, key: &str, content_type: &str) -> PortResult<String>;

    /// A time-limited URL for reading `key`.
    fn presign_get(&self, key: &str) -> PortResult<String>;

    fn public_url(&self, key: &str) -> String;

    fn bucket(&self) -> &str;
}
