//! services/cli/src/commands.rs
//!
//! The work behind each `burner` subcommand. Commands return the text to
//! print so the binary stays a thin dispatcher.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use burner_core::domain::{validate_cues, Cue, FileDescriptor, UploadedFile};
use burner_core::ports::AuthApi;
use burner_core::routes::{guard, Route, RouteDecision};
use burner_core::session::SessionStore;
use burner_core::srt::render_srt;
use burner_core::timeline::{active_cue, TimelineScale};
use burner_core::upload::{content_type_for, format_file_size, UploadFlow, UploadState};
use tracing::{info, warn};

use crate::adapters::{HttpAuthApi, HttpUploadApi};
use crate::error::CliError;

/// How often the upload command samples the flow state.
const PROGRESS_TICK: Duration = Duration::from_millis(200);

//=========================================================================================
// Session Commands
//=========================================================================================

/// The token of an authenticated session, or `NotLoggedIn`.
pub fn require_token(store: &SessionStore) -> Result<String, CliError> {
    match guard(Route::Dashboard, store.state()) {
        RouteDecision::Render(_) => store
            .token()
            .map(str::to_string)
            .ok_or(CliError::NotLoggedIn),
        RouteDecision::Redirect(_) | RouteDecision::AwaitHydration => Err(CliError::NotLoggedIn),
    }
}

pub async fn login(
    store: &mut SessionStore,
    api: &dyn AuthApi,
    username: &str,
    password: &str,
) -> Result<String, CliError> {
    store.login_with_password(api, username, password).await?;
    Ok(match store.user() {
        Some(user) => format!("Logged in as {} <{}>", user.username, user.email),
        None => format!("Logged in as {}", username),
    })
}

pub async fn oauth_callback(store: &mut SessionStore, query: &str) -> Result<String, CliError> {
    store.complete_oauth(query).await?;
    Ok("Logged in.".to_string())
}

/// Revokes the token server-side when possible, then clears the local session.
pub async fn logout(store: &mut SessionStore, api: &HttpAuthApi) -> Result<String, CliError> {
    if let Some(token) = store.token() {
        if let Err(e) = api.logout(token).await {
            warn!("Could not revoke the token on the server: {:?}", e);
        }
    }
    store.logout().await?;
    Ok("Logged out.".to_string())
}

/// Shows the session user, fetching and saving it when the session has none yet.
pub async fn whoami(store: &mut SessionStore, api: &dyn AuthApi) -> Result<String, CliError> {
    let token = require_token(store)?;
    if store.user().is_none() {
        let user = api.current_user(&token).await?;
        store.set_user(user).await?;
    }
    match store.user() {
        Some(user) => Ok(format!("{} <{}> ({})", user.username, user.email, user.id)),
        None => Err(CliError::NotLoggedIn),
    }
}

pub async fn projects(store: &SessionStore, api: &HttpUploadApi) -> Result<String, CliError> {
    let token = require_token(store)?;
    let projects = api.list_projects(&token).await?;
    if projects.is_empty() {
        return Ok("No projects yet.".to_string());
    }
    let mut out = String::new();
    for project in projects {
        let _ = writeln!(
            out,
            "{}  {:<10}  {}  {}",
            project.id,
            project.status.as_str(),
            project.created_at.format("%Y-%m-%d %H:%M"),
            project.original_filename
        );
    }
    Ok(out.trim_end().to_string())
}

//=========================================================================================
// Upload
//=========================================================================================

/// Describes a local file for upload.
pub async fn describe_file(path: &Path) -> Result<FileDescriptor, CliError> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(CliError::Usage(format!("{} is not a file", path.display())));
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::Usage(format!("{} has no usable file name", path.display())))?
        .to_string();
    Ok(FileDescriptor {
        path: path.to_path_buf(),
        name,
        size: metadata.len(),
        content_type: content_type_for(path).to_string(),
    })
}

/// Runs one upload, reporting each new status line through `report`.
///
/// The first Ctrl-C cancels the attempt, which then ends with a cancellation
/// error. A second Ctrl-C abandons the command without waiting.
pub async fn upload(
    flow: Arc<UploadFlow>,
    token: &str,
    file: &FileDescriptor,
    mut report: impl FnMut(&UploadState),
) -> Result<UploadedFile, CliError> {
    info!("Uploading {} ({})", file.name, format_file_size(file.size));
    let attempt = flow.upload(token, file);
    tokio::pin!(attempt);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut ticker = tokio::time::interval(PROGRESS_TICK);
    let mut last_line = String::new();
    let mut interrupted = false;
    let mut listening = true;
    let result = loop {
        tokio::select! {
            result = &mut attempt => break result,
            _ = ticker.tick() => {
                let state = flow.snapshot();
                let line = state.status_message();
                if line != last_line {
                    report(&state);
                    last_line = line;
                }
            }
            signal = &mut interrupt, if listening => {
                if let Err(e) = signal {
                    warn!("Cannot listen for Ctrl-C: {}", e);
                    listening = false;
                    continue;
                }
                if interrupted {
                    return Err(CliError::Upload("Upload interrupted".to_string()));
                }
                interrupted = true;
                warn!("Cancelling upload; press Ctrl-C again to quit.");
                flow.cancel();
                interrupt.set(tokio::signal::ctrl_c());
            }
        }
    };

    report(&flow.snapshot());
    Ok(result?)
}

//=========================================================================================
// Cues and Timeline
//=========================================================================================

/// Reads a JSON array of cues and validates every interval.
pub fn load_cues(path: &Path) -> Result<Vec<Cue>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let cues: Vec<Cue> = serde_json::from_str(&raw)?;
    validate_cues(&cues)?;
    Ok(cues)
}

pub fn cues_active(cues: &[Cue], at: f64) -> String {
    match active_cue(cues, at) {
        Some(cue) => format!("{} [{:.3} - {:.3}] {}", cue.id, cue.start, cue.end, cue.text),
        None => "No active cue.".to_string(),
    }
}

pub fn cues_srt(cues: &[Cue]) -> String {
    render_srt(cues)
}

/// A pointer click on the track, in viewport pixels.
#[derive(Debug, Clone, Copy)]
pub struct TrackClick {
    pub client_x: f64,
    pub track_left: f64,
    pub scroll_left: f64,
}

pub fn timeline(duration: f64, click: Option<TrackClick>) -> Result<String, CliError> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(CliError::Usage(format!("invalid duration {}", duration)));
    }
    let scale = TimelineScale::default();
    let mut out = String::new();
    let _ = writeln!(out, "track width: {}px", scale.track_width(duration));
    let markers = scale.markers(duration);
    let labels: Vec<String> = markers
        .iter()
        .map(|m| format!("{}@{}", m.label, m.left))
        .collect();
    let _ = writeln!(out, "markers: {}", labels.join(" "));
    if let Some(click) = click {
        let time = scale.seek_from_pointer(
            click.client_x,
            click.track_left,
            click.scroll_left,
            duration,
        );
        let _ = writeln!(out, "seek: {:.2}s", time);
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use burner_core::domain::{
        CreateProjectRequest, Project, ProjectStatus, SessionUser, UploadRequest, UploadTicket,
    };
    use burner_core::ports::{
        ObjectTransfer, PortError, PortResult, ProgressObserver, SessionPersistence, UploadApi,
    };
    use burner_core::upload::UploadStatus;
    use chrono::Utc;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use crate::adapters::FileSessionPersistence;

    struct FakeAuth;

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, username: &str, password: &str) -> PortResult<String> {
            if username == "ada@example.com" && password == "pw" {
                Ok("tok-1".to_string())
            } else {
                Err(PortError::Rejected {
                    status: 400,
                    message: "Incorrect username or password".to_string(),
                })
            }
        }

        async fn current_user(&self, token: &str) -> PortResult<SessionUser> {
            if token != "tok-1" {
                return Err(PortError::Unauthorized);
            }
            Ok(SessionUser {
                id: "u-1".to_string(),
                email: "ada@example.com".to_string(),
                username: "Ada".to_string(),
            })
        }

        fn oauth_url(&self, provider: &str) -> String {
            format!("http://api/auth/token/{}", provider)
        }
    }

    struct FakeUploads;

    #[async_trait]
    impl UploadApi for FakeUploads {
        async fn request_upload(
            &self,
            _token: &str,
            request: &UploadRequest,
        ) -> PortResult<UploadTicket> {
            Ok(UploadTicket {
                upload_url: "http://r2/put".to_string(),
                file_id: format!("u-1/{}", request.file_name),
                public_url: format!("http://cdn/u-1/{}", request.file_name),
            })
        }

        async fn create_project(
            &self,
            _token: &str,
            request: &CreateProjectRequest,
        ) -> PortResult<Project> {
            Ok(Project {
                id: Uuid::nil(),
                r2_key: request.r2_key.clone(),
                original_filename: request.original_filename.clone(),
                status: ProjectStatus::Queued,
                created_at: Utc::now(),
            })
        }
    }

    struct InstantTransfer;

    #[async_trait]
    impl ObjectTransfer for InstantTransfer {
        async fn put(
            &self,
            _url: &str,
            file: &FileDescriptor,
            progress: &dyn ProgressObserver,
            _cancel: CancellationToken,
        ) -> PortResult<()> {
            progress.on_progress(file.size, Some(file.size));
            Ok(())
        }
    }

    async fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        let persistence: Arc<dyn SessionPersistence> = Arc::new(FileSessionPersistence::new(
            dir.path().join("auth-storage.json"),
        ));
        SessionStore::hydrate(persistence).await
    }

    #[tokio::test]
    async fn login_persists_and_a_new_process_sees_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        let message = login(&mut store, &FakeAuth, "ada@example.com", "pw").await.unwrap();
        assert_eq!(message, "Logged in as Ada <ada@example.com>");

        let restored = store_in(&dir).await;
        assert_eq!(require_token(&restored).unwrap(), "tok-1");
        assert_eq!(restored.user().unwrap().username, "Ada");
    }

    #[tokio::test]
    async fn bad_credentials_leave_the_session_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        let err = login(&mut store, &FakeAuth, "ada@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(matches!(require_token(&store), Err(CliError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn whoami_fetches_a_missing_user_after_oauth() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        oauth_callback(&mut store, "?token=tok-1").await.unwrap();
        assert!(store.user().is_none());

        let line = whoami(&mut store, &FakeAuth).await.unwrap();
        assert_eq!(line, "Ada <ada@example.com> (u-1)");
        assert!(store_in(&dir).await.user().is_some());
    }

    #[tokio::test]
    async fn oauth_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        let err = oauth_callback(&mut store, "error=access_denied").await.unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn logout_clears_locally_even_if_revoke_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir).await;
        login(&mut store, &FakeAuth, "ada@example.com", "pw").await.unwrap();

        let unreachable = HttpAuthApi::new(reqwest::Client::new(), "http://127.0.0.1:9");
        logout(&mut store, &unreachable).await.unwrap();
        assert!(matches!(require_token(&store), Err(CliError::NotLoggedIn)));
        assert!(!dir.path().join("auth-storage.json").exists());
    }

    #[tokio::test]
    async fn upload_reports_progress_and_returns_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        let file = describe_file(&path).await.unwrap();
        assert_eq!(file.content_type, "video/mp4");
        assert_eq!(file.size, 2048);

        let flow = Arc::new(UploadFlow::new(Arc::new(FakeUploads), Arc::new(InstantTransfer)));
        let mut seen = Vec::new();
        let uploaded = upload(flow, "tok-1", &file, |state| seen.push(state.status))
            .await
            .unwrap();

        assert_eq!(uploaded.id, "u-1/clip.mp4");
        assert_eq!(uploaded.url, "http://cdn/u-1/clip.mp4");
        assert_eq!(seen.last(), Some(&UploadStatus::Success));
    }

    #[tokio::test]
    async fn describing_a_directory_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            describe_file(dir.path()).await,
            Err(CliError::Usage(_))
        ));
    }

    fn cue(id: &str, start: f64, end: f64, text: &str) -> Cue {
        Cue::new(id, start, end, text).unwrap()
    }

    #[test]
    fn active_cue_lookup_prints_the_match() {
        let cues = vec![cue("a", 0.0, 1.5, "Hello"), cue("b", 1.5, 3.0, "world")];
        assert_eq!(cues_active(&cues, 2.0), "b [1.500 - 3.000] world");
        assert_eq!(cues_active(&cues, 9.0), "No active cue.");
    }

    #[test]
    fn cue_files_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"[{"id":"a","start":0.0,"end":1.0,"text":"Hi"}]"#).unwrap();
        let cues = load_cues(&good).unwrap();
        assert_eq!(cues_srt(&cues), "1\n00:00:00,000 --> 00:00:01,000\nHi\n\n");

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"[{"id":"a","start":2.0,"end":1.0,"text":"Hi"}]"#).unwrap();
        assert!(matches!(load_cues(&bad), Err(CliError::Cue(_))));
    }

    #[test]
    fn timeline_reports_width_markers_and_seek() {
        let out = timeline(
            30.0,
            Some(TrackClick {
                client_x: 350.0,
                track_left: 100.0,
                scroll_left: 50.0,
            }),
        )
        .unwrap();
        assert!(out.starts_with("track width: 3000px"));
        assert!(out.contains("0s@0 1s@100"));
        assert!(out.ends_with("seek: 3.00s"));

        let short = timeline(3.0, None).unwrap();
        assert!(short.starts_with("track width: 2000px"));
        assert!(timeline(f64::NAN, None).is_err());
    }
}
