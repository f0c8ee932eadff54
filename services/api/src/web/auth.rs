//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, token login, OAuth redirects, logout
//! and the current-user lookup.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Extension, Form, Json,
};
use burner_core::ports::PortError;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::bearer_token;
use crate::web::state::AppState;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const INVALID_LOGIN: &str = "Incorrect username or password";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Form body of `POST /auth/token`. The username is the account email.
#[derive(Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

//=========================================================================================
// Token Helpers
//=========================================================================================

/// Auth sessions are keyed by the SHA-256 hex digest of the bearer token.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn new_access_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "An account with this email already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let user = state
        .db
        .create_user_with_password(&email, req.name.trim(), &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                "User with this email already exists".to_string(),
            ),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
            }
        })?;

    info!("Created user {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /auth/token - Exchange a username and password for a bearer token
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Incorrect username or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    Form(req): Form<TokenRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get credentials by email
    let creds = state
        .db
        .get_credentials_by_email(&req.username.trim().to_lowercase())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => (StatusCode::BAD_REQUEST, INVALID_LOGIN.to_string()),
            other => {
                error!("Failed to load credentials: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("Failed login for user {}", creds.user_id);
        return Err((StatusCode::BAD_REQUEST, INVALID_LOGIN.to_string()));
    }

    // 3. Purge expired sessions, then create the new one
    let now = Utc::now();
    match state.db.delete_expired_auth_sessions(now).await {
        Ok(0) => {}
        Ok(purged) => debug!("Purged {} expired auth sessions", purged),
        Err(e) => warn!("Failed to purge expired auth sessions: {:?}", e),
    }
    let access_token = new_access_token();
    let expires_at = now + Duration::minutes(state.config.auth_token_ttl_minutes);
    state
        .db
        .create_auth_session(&hash_token(&access_token), creds.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    // 4. Return the token
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /auth/token/{provider} - Redirect to an OAuth provider's login page
#[utoipa::path(
    get,
    path = "/auth/token/{provider}",
    params(("provider" = String, Path, description = "OAuth provider, e.g. `google`.")),
    responses(
        (status = 307, description = "Redirect to the provider"),
        (status = 404, description = "Unknown or unconfigured provider")
    )
)]
pub async fn oauth_redirect_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect, (StatusCode, String)> {
    let not_available = || {
        (
            StatusCode::NOT_FOUND,
            format!("OAuth provider '{}' is not available", provider),
        )
    };
    if provider != "google" {
        return Err(not_available());
    }
    let client_id = state.config.google_client_id.as_deref().ok_or_else(not_available)?;
    let redirect_uri = state
        .config
        .oauth_redirect_url
        .clone()
        .unwrap_or_else(|| format!("{}/oauth/callback", state.config.cors_origin));

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
        GOOGLE_AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode("openid email profile"),
    );
    Ok(Redirect::temporary(&url))
}

/// POST /auth/logout - Invalidate the current bearer token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    ),
    security(("bearer" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Extract the token (the middleware already validated it)
    let token = bearer_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete auth session from database
    state
        .db
        .delete_auth_session(&hash_token(token))
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    Ok(StatusCode::OK)
}

/// GET /auth/me - The user that owns the bearer token
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<MeResponse>, (StatusCode, String)> {
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => (StatusCode::UNAUTHORIZED, "User not found".to_string()),
        other => {
            error!("Failed to load user {}: {:?}", user_id, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user".to_string())
        }
    })?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let hashed = hash_token("abc");
        assert_eq!(
            hashed,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_token("abd"), hashed);
    }

    #[test]
    fn access_tokens_are_long_and_unique() {
        let a = new_access_token();
        let b = new_access_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
