//! crates/burner_core/src/upload.rs
//!
//! The three-step upload hand-off:
//!
//! 1. ask the backend for a presigned write URL,
//! 2. PUT the file straight to object storage, tracking progress,
//! 3. tell the backend the object landed so processing can start.
//!
//! Each step only runs after the previous one succeeded. Any failure is terminal
//! for the attempt; the caller starts over with a new `upload` call. Dropping the
//! `upload` future part-way through cancels the attempt and leaves the flow in
//! `Error`, so the next call is not refused as in-flight.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::{CreateProjectRequest, FileDescriptor, UploadRequest, UploadedFile};
use crate::ports::{ObjectTransfer, PortError, ProgressObserver, UploadApi};

/// How long the success confirmation stays up before the flow reverts to idle.
pub const SUCCESS_RESET_DELAY: Duration = Duration::from_secs(3);

//=========================================================================================
// Status and Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Requesting,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    pub fn can_transition_to(self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Idle, Requesting)
                | (Success, Requesting)
                | (Error, Requesting)
                | (Requesting, Uploading)
                | (Requesting, Error)
                | (Uploading, Success)
                | (Uploading, Error)
                | (Success, Idle)
        )
    }
}

/// Why the PUT to object storage did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferFailure {
    #[error("Upload failed with status {0}")]
    Status(u16),
    #[error("Upload cancelled")]
    Cancelled,
    #[error("Upload failed")]
    Transport(String),
}

impl From<PortError> for TransferFailure {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Rejected { status, .. } => TransferFailure::Status(status),
            PortError::Cancelled => TransferFailure::Cancelled,
            other => TransferFailure::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The permission endpoint refused to issue a write URL.
    #[error("Failed to get upload URL")]
    CredentialRequest(#[source] PortError),
    #[error("{0}")]
    Transfer(TransferFailure),
    /// The object is in storage but the backend did not accept it.
    #[error("Failed to create project")]
    Activation(#[source] PortError),
    #[error("An upload is already in progress")]
    InFlight,
    #[error("Invalid upload transition from {from:?} to {to:?}")]
    InvalidTransition { from: UploadStatus, to: UploadStatus },
}

//=========================================================================================
// Upload State
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadState {
    pub status: UploadStatus,
    /// Whole percent, 0 to 100.
    pub progress: u8,
    pub error: Option<String>,
    pub uploaded_file: Option<UploadedFile>,
}

impl UploadState {
    pub fn transition(&mut self, to: UploadStatus) -> Result<(), UploadError> {
        if !self.status.can_transition_to(to) {
            return Err(UploadError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// True while a request or transfer is outstanding; the upload control is disabled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status,
            UploadStatus::Requesting | UploadStatus::Uploading
        )
    }

    pub fn status_message(&self) -> String {
        match self.status {
            UploadStatus::Idle => "Drop your file here or click to browse".to_string(),
            UploadStatus::Requesting => "Requesting upload permission...".to_string(),
            UploadStatus::Uploading => format!("Uploading... {}%", self.progress),
            UploadStatus::Success => "Upload complete!".to_string(),
            UploadStatus::Error => self
                .error
                .clone()
                .unwrap_or_else(|| "Upload failed".to_string()),
        }
    }
}

/// Whole-percent progress, or `None` when the total is unknown.
pub fn progress_percent(sent: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (sent as f64 / total as f64 * 100.0).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

struct StateProgress {
    state: Arc<Mutex<UploadState>>,
}

impl ProgressObserver for StateProgress {
    fn on_progress(&self, sent: u64, total: Option<u64>) {
        let Some(percent) = progress_percent(sent, total) else {
            return;
        };
        let mut state = lock(&self.state);
        if state.status == UploadStatus::Uploading {
            state.progress = percent;
        }
    }
}

fn lock(state: &Mutex<UploadState>) -> MutexGuard<'_, UploadState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take_token(slot: &Mutex<Option<CancellationToken>>) -> Option<CancellationToken> {
    slot.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

fn put_token(slot: &Mutex<Option<CancellationToken>>, token: CancellationToken) {
    *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
}

//=========================================================================================
// Upload Flow
//=========================================================================================

pub struct UploadFlow {
    upload_api: Arc<dyn UploadApi>,
    transfer: Arc<dyn ObjectTransfer>,
    state: Arc<Mutex<UploadState>>,
    success_reset: Duration,
    attempt_cancel: Mutex<Option<CancellationToken>>,
    reset_timer: Mutex<Option<CancellationToken>>,
}

impl UploadFlow {
    pub fn new(upload_api: Arc<dyn UploadApi>, transfer: Arc<dyn ObjectTransfer>) -> Self {
        Self {
            upload_api,
            transfer,
            state: Arc::new(Mutex::new(UploadState::default())),
            success_reset: SUCCESS_RESET_DELAY,
            attempt_cancel: Mutex::new(None),
            reset_timer: Mutex::new(None),
        }
    }

    pub fn with_success_reset(mut self, delay: Duration) -> Self {
        self.success_reset = delay;
        self
    }

    pub fn snapshot(&self) -> UploadState {
        lock(&self.state).clone()
    }

    /// Aborts the running attempt, whichever step it is in.
    ///
    /// A cancel before the transfer starts means the transfer never runs. Once
    /// the object is stored, activation still completes.
    pub fn cancel(&self) {
        let slot = self
            .attempt_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = slot.as_ref() {
            info!("Cancelling upload.");
            token.cancel();
        }
    }

    /// Runs one upload attempt for `file` using the session `token`.
    pub async fn upload(
        &self,
        token: &str,
        file: &FileDescriptor,
    ) -> Result<UploadedFile, UploadError> {
        // 1. Refuse a second attempt while one is running, then reset the state.
        {
            let mut state = lock(&self.state);
            if state.is_busy() {
                warn!("Ignoring upload of {}: another upload is in flight.", file.name);
                return Err(UploadError::InFlight);
            }
            if let Some(timer) = take_token(&self.reset_timer) {
                timer.cancel();
            }
            state.transition(UploadStatus::Requesting)?;
            state.progress = 0;
            state.error = None;
            state.uploaded_file = None;
        }
        let cancel = CancellationToken::new();
        put_token(&self.attempt_cancel, cancel.clone());
        let _attempt = AttemptGuard { flow: self };

        // 2. Request the write credential.
        let request = UploadRequest {
            file_name: file.name.clone(),
            file_type: file.content_type.clone(),
        };
        let requested = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.upload_api.request_upload(token, &request) => Some(result),
        };
        let ticket = match requested {
            Some(Ok(ticket)) => ticket,
            Some(Err(e)) => {
                error!("Upload credential request failed: {:?}", e);
                return Err(self.fail(UploadError::CredentialRequest(e)));
            }
            None => {
                info!("Upload of {} cancelled before the transfer.", file.name);
                return Err(self.fail(UploadError::Transfer(TransferFailure::Cancelled)));
            }
        };

        // 3. Stream the file to object storage.
        lock(&self.state).transition(UploadStatus::Uploading)?;
        let observer = StateProgress {
            state: self.state.clone(),
        };
        let transferred = self
            .transfer
            .put(&ticket.upload_url, file, &observer, cancel)
            .await;
        if let Err(e) = transferred {
            error!("Upload transfer failed: {:?}", e);
            return Err(self.fail(UploadError::Transfer(e.into())));
        }

        // 4. Activate the project. The object stays in storage if this fails.
        let activation = CreateProjectRequest {
            r2_key: ticket.file_id.clone(),
            original_filename: file.name.clone(),
        };
        if let Err(e) = self.upload_api.create_project(token, &activation).await {
            error!(
                "Project activation failed; object {} remains in storage: {:?}",
                ticket.file_id, e
            );
            return Err(self.fail(UploadError::Activation(e)));
        }

        // 5. Report success and schedule the confirmation to clear.
        let uploaded = UploadedFile {
            id: ticket.file_id,
            name: file.name.clone(),
            size: file.size,
            url: ticket.public_url,
            uploaded_at: Utc::now(),
        };
        {
            let mut state = lock(&self.state);
            state.transition(UploadStatus::Success)?;
            state.progress = 100;
            state.error = None;
            state.uploaded_file = Some(uploaded.clone());
        }
        info!("Upload of {} complete as {}", uploaded.name, uploaded.id);
        self.schedule_reset();
        Ok(uploaded)
    }

    fn fail(&self, err: UploadError) -> UploadError {
        let mut state = lock(&self.state);
        if let Err(e) = state.transition(UploadStatus::Error) {
            warn!("{}", e);
        }
        state.progress = 0;
        state.error = Some(err.to_string());
        state.uploaded_file = None;
        err
    }

    /// Ends an attempt whose future was dropped while still busy.
    fn abandon(&self) {
        if let Some(token) = take_token(&self.attempt_cancel) {
            token.cancel();
        }
        let mut state = lock(&self.state);
        if state.is_busy() {
            warn!("Upload abandoned while {:?}.", state.status);
            state.status = UploadStatus::Error;
            state.progress = 0;
            state.error = Some(TransferFailure::Cancelled.to_string());
            state.uploaded_file = None;
        }
    }

    fn schedule_reset(&self) {
        let timer = CancellationToken::new();
        put_token(&self.reset_timer, timer.clone());
        let state = self.state.clone();
        let deadline = tokio::time::Instant::now() + self.success_reset;
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    let mut state = lock(&state);
                    if state.status == UploadStatus::Success {
                        state.status = UploadStatus::Idle;
                        state.progress = 0;
                    }
                }
            }
        });
    }
}

impl Drop for UploadFlow {
    fn drop(&mut self) {
        if let Some(timer) = take_token(&self.reset_timer) {
            timer.cancel();
        }
        if let Some(attempt) = take_token(&self.attempt_cancel) {
            attempt.cancel();
        }
    }
}

/// Lives for one `upload` call. Every exit, including a dropped future,
/// releases the attempt token; a still-busy state becomes `Error`.
struct AttemptGuard<'a> {
    flow: &'a UploadFlow,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.flow.abandon();
    }
}

//=========================================================================================
// File Helpers
//=========================================================================================

/// MIME type for the file families the upload zone accepts.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Human-readable size, base 1024, up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", (value * 100.0).round() / 100.0);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
