//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use burner_core::domain::{ProjectStatus, User, UserCredentials, Video};
use burner_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Provider name stored for email/password identities.
const PASSWORD_PROVIDER: &str = "password";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: String,
    email_verified: bool,
    credits: i32,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            email_verified: self.email_verified,
            credits: self.credits,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    username: String,
    password_hashed: Option<String>,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        let hashed_password = self.password_hashed.ok_or_else(|| {
            PortError::NotFound(format!("No password identity for {}", self.email))
        })?;
        Ok(UserCredentials {
            user_id: self.user_id,
            email: self.email,
            username: self.username,
            hashed_password,
        })
    }
}

#[derive(FromRow)]
struct VideoRecord {
    id: Uuid,
    user_id: Uuid,
    s3_key: String,
    bucket: String,
    original_name: String,
    content_type: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl VideoRecord {
    fn to_domain(self) -> PortResult<Video> {
        let status = self
            .status
            .parse::<ProjectStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Video {
            id: self.id,
            user_id: self.user_id,
            s3_key: self.s3_key,
            bucket: self.bucket,
            original_name: self.original_name,
            content_type: self.content_type,
            status,
            created_at: self.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, username, email_verified, credits, created_at";
const VIDEO_COLUMNS: &str =
    "id, user_id, s3_key, bucket, original_name, content_type, status, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_password(
        &self,
        email: &str,
        username: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, username) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(username)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Account {} already exists", email))
            }
            other => unexpected(other),
        })?;

        sqlx::query(
            "INSERT INTO auth_identities (user_id, provider, provider_user_id, password_hashed) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id)
        .bind(PASSWORD_PROVIDER)
        .bind(email)
        .bind(hashed_password)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT u.id AS user_id, u.email, u.username, i.password_hashed \
             FROM users u JOIN auth_identities i ON i.user_id = u.id \
             WHERE u.email = $1 AND i.provider = $2",
        )
        .bind(email)
        .bind(PASSWORD_PROVIDER)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        record.to_domain()
    }

    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        let user_id: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions \
             WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            other => unexpected(other),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_expired_auth_sessions(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn create_video(
        &self,
        user_id: Uuid,
        s3_key: &str,
        bucket: &str,
        original_name: &str,
        content_type: &str,
    ) -> PortResult<Video> {
        let record = sqlx::query_as::<_, VideoRecord>(&format!(
            "INSERT INTO videos (user_id, s3_key, bucket, original_name, content_type, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            VIDEO_COLUMNS
        ))
        .bind(user_id)
        .bind(s3_key)
        .bind(bucket)
        .bind(original_name)
        .bind(content_type)
        .bind(ProjectStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_video_by_key(&self, s3_key: &str) -> PortResult<Video> {
        let record = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {} FROM videos WHERE s3_key = $1",
            VIDEO_COLUMNS
        ))
        .bind(s3_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Video {} not found", s3_key)))?;
        record.to_domain()
    }

    async fn get_video_by_id(&self, video_id: Uuid) -> PortResult<Video> {
        let record = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {} FROM videos WHERE id = $1",
            VIDEO_COLUMNS
        ))
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Video {} not found", video_id)))?;
        record.to_domain()
    }

    async fn update_video_status(
        &self,
        video_id: Uuid,
        status: ProjectStatus,
    ) -> PortResult<Video> {
        let record = sqlx::query_as::<_, VideoRecord>(&format!(
            "UPDATE videos SET status = $1 WHERE id = $2 RETURNING {}",
            VIDEO_COLUMNS
        ))
        .bind(status.as_str())
        .bind(video_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Video {} not found", video_id)))?;
        record.to_domain()
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> PortResult<Vec<Video>> {
        let records = sqlx::query_as::<_, VideoRecord>(&format!(
            "SELECT {} FROM videos WHERE user_id = $1 ORDER BY created_at DESC",
            VIDEO_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
