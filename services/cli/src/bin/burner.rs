//! services/cli/src/bin/burner.rs

use std::path::PathBuf;
use std::sync::Arc;

use burner_core::ports::{AuthApi, SessionPersistence};
use burner_core::session::SessionStore;
use burner_core::upload::{format_file_size, UploadFlow};
use clap::{Parser, Subcommand};
use cli_lib::{
    adapters::{FileSessionPersistence, HttpAuthApi, HttpObjectTransfer, HttpUploadApi},
    commands::{self, TrackClick},
    config::Config,
    error::CliError,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload videos and work with caption cues on Burner")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with an email and password
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (falls back to BURNER_PASSWORD)
        #[arg(short, long, env = "BURNER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the URL that starts an OAuth login
    OauthUrl {
        #[arg(short, long, default_value = "google")]
        provider: String,
    },
    /// Finish an OAuth login from the callback query string
    OauthCallback {
        /// e.g. "token=..." or "?error=..."
        query: String,
    },
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List your projects, newest first
    Projects,
    /// Upload a video and queue it for captioning
    Upload {
        file: PathBuf,
    },
    /// Inspect a cue list (JSON array of {id, start, end, text})
    Cues {
        #[command(subcommand)]
        command: CuesCommand,
    },
    /// Lay out the timeline for a video of the given length
    Timeline {
        /// Duration in seconds
        #[arg(short, long)]
        duration: f64,

        /// Pointer x position of a click on the track
        #[arg(long)]
        click_x: Option<f64>,

        /// Horizontal scroll offset of the track
        #[arg(long)]
        scroll_left: Option<f64>,

        /// Left edge of the track in the viewport
        #[arg(long, default_value_t = 0.0)]
        track_left: f64,
    },
}

#[derive(Subcommand, Debug)]
enum CuesCommand {
    /// Print the cue under the playhead at a time
    Active {
        #[arg(short, long)]
        file: PathBuf,

        /// Playback time in seconds
        #[arg(long)]
        at: f64,
    },
    /// Render the cues as SubRip
    Srt {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let args = Args::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!("Using API at {}", config.api_url);

    // --- 2. Build the Adapters and Hydrate the Session ---
    let client = reqwest::Client::new();
    let auth = HttpAuthApi::new(client.clone(), config.api_url.clone());
    let uploads = HttpUploadApi::new(client.clone(), config.api_url.clone());
    let persistence: Arc<dyn SessionPersistence> =
        Arc::new(FileSessionPersistence::new(config.session_file.clone()));
    let mut store = SessionStore::hydrate(persistence).await;

    // --- 3. Dispatch ---
    let output = match args.command {
        Command::Login { username, password } => {
            commands::login(&mut store, &auth, &username, &password).await?
        }
        Command::OauthUrl { provider } => auth.oauth_url(&provider),
        Command::OauthCallback { query } => commands::oauth_callback(&mut store, &query).await?,
        Command::Logout => commands::logout(&mut store, &auth).await?,
        Command::Whoami => commands::whoami(&mut store, &auth).await?,
        Command::Projects => commands::projects(&store, &uploads).await?,
        Command::Upload { file } => {
            let token = commands::require_token(&store)?;
            let file = commands::describe_file(&file).await?;
            let flow = Arc::new(UploadFlow::new(
                Arc::new(uploads),
                Arc::new(HttpObjectTransfer::new(client)),
            ));
            let uploaded = commands::upload(flow, &token, &file, |state| {
                println!("{}", state.status_message());
            })
            .await?;
            format!(
                "{} ({}) uploaded as {}\n{}",
                uploaded.name,
                format_file_size(uploaded.size),
                uploaded.id,
                uploaded.url
            )
        }
        Command::Cues { command } => match command {
            CuesCommand::Active { file, at } => {
                commands::cues_active(&commands::load_cues(&file)?, at)
            }
            CuesCommand::Srt { file } => commands::cues_srt(&commands::load_cues(&file)?),
        },
        Command::Timeline {
            duration,
            click_x,
            scroll_left,
            track_left,
        } => {
            let click = click_x.map(|client_x| TrackClick {
                client_x,
                track_left,
                scroll_left: scroll_left.unwrap_or(0.0),
            });
            commands::timeline(duration, click)?
        }
    };

    println!("{}", output);
    Ok(())
}
