//! services/cli/src/error.rs
//!
//! Defines the primary error type for the command-line client.

use crate::config::ConfigError;
use burner_core::domain::CueError;
use burner_core::ports::PortError;
use burner_core::session::AuthError;
use burner_core::upload::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Upload(#[from] UploadError),

    #[error("Request failed: {0}")]
    Port(#[from] PortError),

    #[error("Invalid cue: {0}")]
    Cue(#[from] CueError),

    #[error("Not logged in. Run `burner login` first.")]
    NotLoggedIn,

    #[error("{0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
