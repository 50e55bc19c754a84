//! Vocab Trainer · learn English words from YouTube videos
//!
//! - Axum HTTP API (catalog, word lists, flashcard sessions, profiles)
//! - Static site fallback (`static_dir`, default ./static)
//! - Offline helpers for the word data directory (`manifest`, `stamp-dates`)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   VOCAB_CONFIG_PATH     : path to TOML config (asset paths, fallback videos, count options)
//!   VOCAB_ASSET_BASE_URL  : fetch data files over HTTP from this site instead of static_dir
//!   VOCAB_STORE_PATH      : JSON file for profiles/unknown words (in-memory if unset)
//!   YOUTUBE_API_KEY       : enables YouTube Data API metadata if present
//!   YOUTUBE_API_BASE_URL  : default "https://www.googleapis.com/youtube/v3"
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default), "compact" or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod assets;
mod words;
mod manifest;
mod catalog;
mod selection;
mod session;
mod store;
mod profile;
mod youtube;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Run the HTTP server (default).
  Serve,
  /// Regenerate video-list.json from the word data directory.
  Manifest(ManifestArgs),
  /// Add video_info.updated_at to word files that lack it.
  StampDates(DirArgs),
}

#[derive(Debug, Args)]
struct ManifestArgs {
  /// Directory holding `<id>_words_with_meaning.json` files.
  #[arg(long, default_value = "static/CaptionData/Youtube")]
  dir: PathBuf,
  /// Output manifest path.
  #[arg(long, default_value = "static/video-list.json")]
  out: PathBuf,
}

#[derive(Debug, Args)]
struct DirArgs {
  #[arg(long, default_value = "static/CaptionData/Youtube")]
  dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  telemetry::init_tracing();
  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve().await,
    Command::Manifest(args) => manifest::run_generate(&args.dir, &args.out).map(|_| ()).context("manifest"),
    Command::StampDates(args) => manifest::run_stamp_dates(&args.dir).map(|_| ()).context("stamp-dates"),
  }
}

async fn serve() -> anyhow::Result<()> {
  // Shared application state (config, assets, store, caches, sessions).
  let state = Arc::new(AppState::new()?);

  // Background sweep so abandoned sessions do not pile up between requests.
  let sweeper = state.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(Duration::from_secs(60));
    loop {
      tick.tick().await;
      sweeper.sweep_sessions().await;
    }
  });

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await.with_context(|| format!("bind {}", addr))?;
  info!(target: "vocab_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "vocab_backend", "Shutdown signal received");
    })
    .await
    .context("serve")?;
  Ok(())
}
