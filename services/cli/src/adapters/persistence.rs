//! services/cli/src/adapters/persistence.rs
//!
//! Keeps the session record in a JSON file, in the same `{state, version}`
//! envelope the web client writes under its storage key.

use async_trait::async_trait;
use burner_core::ports::{PortError, PortResult, SessionPersistence};
use burner_core::session::PersistedSession;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENVELOPE_VERSION: u32 = 0;

#[derive(Serialize, Deserialize)]
struct Envelope {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    /// Creates a new `FileSessionPersistence` backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl SessionPersistence for FileSessionPersistence {
    async fn load(&self) -> PortResult<Option<PersistedSession>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(envelope.state))
    }

    async fn save(&self, session: &PersistedSession) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let envelope = Envelope {
            state: session.clone(),
            version: ENVELOPE_VERSION,
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}
