//! dramaturgy-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store shared with the rest of the platform, and serves the notification
//! API under `/api`.
//!
//! # Issuing a session
//!
//! To mint a bearer token for an existing user (e.g. for local testing):
//!
//! ```
//! cargo run -p dramaturgy-server -- --issue-session alice
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use chrono::{Duration, Utc};
use clap::Parser;
use dramaturgy_api::{
  AppState,
  auth::{generate_token, hash_token},
};
use dramaturgy_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "The Dramaturgy notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create a session for USERNAME, print its token and exit.
  #[arg(long, value_name = "USERNAME")]
  issue_session: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: issue a session token and exit.
  if let Some(username) = cli.issue_session {
    let token = issue_session(&store, &username, server_cfg.session_ttl_hours).await?;
    println!("{token}");
    return Ok(());
  }

  let state = AppState::new(Arc::new(store), server_cfg.notifications.clone());
  let app = Router::new()
    .nest("/api", dramaturgy_api::api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn issue_session(
  store: &SqliteStore,
  username: &str,
  ttl_hours: u32,
) -> anyhow::Result<String> {
  let user = store
    .find_user_by_username(username)
    .await
    .context("failed to look up user")?
    .with_context(|| format!("no user named {username:?}"))?;

  let token = generate_token();
  let expires_at = Utc::now() + Duration::hours(i64::from(ttl_hours));
  store
    .create_session(user.id, &hash_token(&token), expires_at)
    .await
    .context("failed to create session")?;

  tracing::info!(user_id = %user.id, %expires_at, "issued session");
  Ok(token)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
