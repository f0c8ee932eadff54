//! crates/burner_core/src/domain.rs
//!
//! Defines the core data structures shared by the backend and the client.
//! Types that cross a wire carry their serde shape here so both sides agree on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Client Session Types
//=========================================================================================

/// The user record held by the client session after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

//=========================================================================================
// Subtitle Cues
//=========================================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CueError {
    #[error("Cue {id} has a non-finite time")]
    NotFinite { id: String },
    #[error("Cue {id} starts before zero ({start})")]
    NegativeStart { id: String, start: f64 },
    #[error("Cue {id} must start before it ends ({start} >= {end})")]
    EmptyInterval { id: String, start: f64, end: f64 },
}

/// A timed subtitle entry. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    /// Creates a cue, rejecting intervals that are not `0 <= start < end`.
    pub fn new(
        id: impl Into<String>,
        start: f64,
        end: f64,
        text: impl Into<String>,
    ) -> Result<Self, CueError> {
        let cue = Self {
            id: id.into(),
            start,
            end,
            text: text.into(),
        };
        cue.validate()?;
        Ok(cue)
    }

    pub fn validate(&self) -> Result<(), CueError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(CueError::NotFinite { id: self.id.clone() });
        }
        if self.start < 0.0 {
            return Err(CueError::NegativeStart {
                id: self.id.clone(),
                start: self.start,
            });
        }
        if self.start >= self.end {
            return Err(CueError::EmptyInterval {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Checks every cue of a list that was deserialized without going through `Cue::new`.
pub fn validate_cues(cues: &[Cue]) -> Result<(), CueError> {
    cues.iter().try_for_each(Cue::validate)
}

/// Playback position mirrored from the media element. Read-only input to the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackClock {
    pub current_time: f64,
    pub duration: f64,
}

//=========================================================================================
// Upload Wire Types
//=========================================================================================

/// Body of `POST /api/upload/request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub file_type: String,
}

/// The write credential returned by the permission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub file_id: String,
    pub public_url: String,
}

/// Body of `POST /api/v1/projects/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub r2_key: String,
    pub original_filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// An upload URL was issued but the client has not confirmed the object yet.
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Queued => "QUEUED",
            ProjectStatus::Processing => "PROCESSING",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProjectStatus::Pending),
            "QUEUED" => Ok(ProjectStatus::Queued),
            "PROCESSING" => Ok(ProjectStatus::Processing),
            "COMPLETED" => Ok(ProjectStatus::Completed),
            "FAILED" => Ok(ProjectStatus::Failed),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

/// Project descriptor returned by the activation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub r2_key: String,
    pub original_filename: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// A local file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// The file reported back to the user after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

//=========================================================================================
// Caption Style
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionFont {
    #[default]
    Montserrat,
    PlayfairDisplay,
    SpaceMono,
    BebasNeue,
    CrimsonPro,
}

impl CaptionFont {
    pub const ALL: [CaptionFont; 5] = [
        CaptionFont::Montserrat,
        CaptionFont::PlayfairDisplay,
        CaptionFont::SpaceMono,
        CaptionFont::BebasNeue,
        CaptionFont::CrimsonPro,
    ];

    pub fn family(&self) -> &'static str {
        match self {
            CaptionFont::Montserrat => "Montserrat",
            CaptionFont::PlayfairDisplay => "Playfair Display",
            CaptionFont::SpaceMono => "Space Mono",
            CaptionFont::BebasNeue => "Bebas Neue",
            CaptionFont::CrimsonPro => "Crimson Pro",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionColor {
    #[default]
    Yellow,
    Red,
    Blue,
    Green,
    White,
}

impl CaptionColor {
    pub fn hex(&self) -> &'static str {
        match self {
            CaptionColor::Yellow => "#FCD34D",
            CaptionColor::Red => "#EF4444",
            CaptionColor::Blue => "#3B82F6",
            CaptionColor::Green => "#10B981",
            CaptionColor::White => "#FFFFFF",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Style applied to burned-in captions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub font: CaptionFont,
    pub color: CaptionColor,
    pub position: CaptionPosition,
}

//=========================================================================================
// Backend Records
//=========================================================================================

/// Represents a user account on the backend.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub email_verified: bool,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub hashed_password: String,
}

/// An uploaded (or about to be uploaded) video object tracked by the backend.
#[derive(Debug, Clone)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub s3_key: String,
    pub bucket: String,
    pub original_name: String,
    pub content_type: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

impl Video {
    pub fn to_project(&self) -> Project {
        Project {
            id: self.id,
            r2_key: self.s3_key.clone(),
            original_filename: self.original_name.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}
