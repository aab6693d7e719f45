//! agora server binary.
//!
//! Reads `agora.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the JSON API over HTTP. The `add-user` and
//! `add-session` subcommands seed accounts, since registration and login are
//! handled elsewhere.

mod settings;

use std::{path::PathBuf, sync::Arc};

use agora_core::Discussion;
use agora_store_sqlite::SqliteStore;
use anyhow::Context as _;
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Agora discussion server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "agora.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Register a user and print its id.
  AddUser { display_name: String },
  /// Bind a session token to an existing user.
  AddSession {
    #[arg(long)]
    user:      Uuid,
    #[arg(long)]
    token:     String,
    /// Lifetime of the session; omit for a session that never expires.
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    ttl_hours: Option<i64>,
  },
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
  let server_cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::AddUser { display_name } => {
      let user = store
        .add_user(&display_name)
        .await
        .context("failed to add user")?;
      println!("{}", user.user_id);
      Ok(())
    }
    Command::AddSession { user, token, ttl_hours } => {
      let expires_at = ttl_hours
        .map(|h| session_expiry(Utc::now(), h))
        .transpose()?;
      store
        .add_session(&token, user.into(), expires_at)
        .await
        .context("failed to add session")?;
      tracing::info!(%user, ?expires_at, "session added");
      Ok(())
    }
  }
}

fn session_expiry(now: DateTime<Utc>, ttl_hours: i64) -> anyhow::Result<DateTime<Utc>> {
  TimeDelta::try_hours(ttl_hours)
    .and_then(|ttl| now.checked_add_signed(ttl))
    .with_context(|| format!("session ttl of {ttl_hours} hours is out of range"))
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let discussion = Arc::new(Discussion::new(Arc::new(store)));
  let app = agora_api::api_router(discussion, server_cfg.session_cookie.as_str())
    .layer(TraceLayer::new_for_http());

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to install Ctrl+C handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut s) => {
        s.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  tracing::info!("shutdown signal received");
}
