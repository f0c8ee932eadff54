//! services/cli/src/adapters/http.rs
//!
//! `reqwest` implementations of the `AuthApi` and `UploadApi` ports against
//! the Burner API.

use async_trait::async_trait;
use burner_core::domain::{
    CreateProjectRequest, Project, SessionUser, UploadRequest, UploadTicket,
};
use burner_core::ports::{AuthApi, PortError, PortResult, UploadApi};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Maps a transport failure to the port error.
pub(crate) fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Passes 2xx responses through and maps everything else onto `PortError`.
pub(crate) async fn check(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    debug!("Request rejected with {}: {}", status, message);
    Err(match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::CONFLICT => PortError::Conflict(message),
        other => PortError::Rejected {
            status: other.as_u16(),
            message,
        },
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    check(response).await?.json::<T>().await.map_err(transport)
}

//=========================================================================================
// Auth API
//=========================================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Creates a new `HttpAuthApi` for the API at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, username: &str, password: &str) -> PortResult<String> {
        let response = self
            .client
            .post(format!("{}/auth/token", self.base_url))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(transport)?;
        let token: TokenResponse = json(response).await?;
        Ok(token.access_token)
    }

    async fn current_user(&self, token: &str) -> PortResult<SessionUser> {
        let response = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        json(response).await
    }

    fn oauth_url(&self, provider: &str) -> String {
        format!("{}/auth/token/{}", self.base_url, provider)
    }
}

impl HttpAuthApi {
    /// Revokes `token` on the server.
    pub async fn logout(&self, token: &str) -> PortResult<()> {
        let response = self
            .client
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }
}

//=========================================================================================
// Upload API
//=========================================================================================

#[derive(Clone)]
pub struct HttpUploadApi {
    client: Client,
    base_url: String,
}

impl HttpUploadApi {
    /// Creates a new `HttpUploadApi` for the API at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// The caller's projects, newest first.
    pub async fn list_projects(&self, token: &str) -> PortResult<Vec<Project>> {
        let response = self
            .client
            .get(format!("{}/api/v1/projects", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        json(response).await
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn request_upload(
        &self,
        token: &str,
        request: &UploadRequest,
    ) -> PortResult<UploadTicket> {
        let response = self
            .client
            .post(format!("{}/api/upload/request", self.base_url))
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        json(response).await
    }

    async fn create_project(
        &self,
        token: &str,
        request: &CreateProjectRequest,
    ) -> PortResult<Project> {
        let response = self
            .client
            .post(format!("{}/api/v1/projects/create", self.base_url))
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        json(response).await
    }
}
