//! Read-only access to the statically served data files (manifest, word lists).
//!
//! Paths are site-relative, the way the browser would request them:
//! `./x.json` resolves against the deployment base, `/x.json` against the origin root.
//! Two sources are provided: `HttpAssets` (fetch from a deployed site with reqwest) and
//! `DirAssets` (read from the local static directory).

use std::fmt;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug)]
pub enum AssetError {
  NotFound(String),
  Transport(String),
  InvalidPath(String),
}

impl fmt::Display for AssetError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AssetError::NotFound(p) => write!(f, "asset not found: {}", p),
      AssetError::Transport(e) => write!(f, "asset transport error: {}", e),
      AssetError::InvalidPath(p) => write!(f, "invalid asset path: {}", p),
    }
  }
}

impl std::error::Error for AssetError {}

#[async_trait]
pub trait AssetSource: Send + Sync {
  /// Cheap existence probe (HTTP HEAD or a metadata lookup). Errors count as "absent".
  async fn exists(&self, path: &str) -> bool;
  /// Full body of the asset as text.
  async fn fetch_text(&self, path: &str) -> Result<String, AssetError>;
}

/// Fetches assets over HTTP relative to a deployment base URL.
/// No request timeout is set; a hung server leaves the caller waiting.
#[derive(Clone)]
pub struct HttpAssets {
  client: reqwest::Client,
  base: Url,
}

impl HttpAssets {
  /// `base` is the page URL the site is served from, e.g. `https://host/VocabTest/`.
  pub fn new(base: &str) -> Result<Self, AssetError> {
    let mut base = Url::parse(base).map_err(|e| AssetError::InvalidPath(format!("{}: {}", base, e)))?;
    // Without a trailing slash, "./x" would replace the last segment instead of appending.
    if !base.path().ends_with('/') {
      let p = format!("{}/", base.path());
      base.set_path(&p);
    }
    Ok(Self { client: reqwest::Client::new(), base })
  }

  pub fn base(&self) -> &Url { &self.base }

  /// Join `path` onto the base. Anything that lands on another origin is refused.
  fn resolve(&self, path: &str) -> Result<Url, AssetError> {
    let url = self.base.join(path).map_err(|e| AssetError::InvalidPath(format!("{}: {}", path, e)))?;
    if url.origin() != self.base.origin() {
      return Err(AssetError::InvalidPath(path.to_string()));
    }
    Ok(url)
  }
}

#[async_trait]
impl AssetSource for HttpAssets {
  #[instrument(level = "debug", skip(self))]
  async fn exists(&self, path: &str) -> bool {
    let Ok(url) = self.resolve(path) else { return false };
    match self.client.head(url.clone()).header(USER_AGENT, "vocab-backend/0.1").send().await {
      Ok(res) => {
        debug!(target: "words", %url, status = %res.status(), "HEAD probe");
        res.status().is_success()
      }
      Err(e) => {
        debug!(target: "words", %url, error = %e, "HEAD probe failed");
        false
      }
    }
  }

  #[instrument(level = "debug", skip(self))]
  async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
    let url = self.resolve(path)?;
    let res = self.client.get(url.clone())
      .header(USER_AGENT, "vocab-backend/0.1")
      .send().await
      .map_err(|e| AssetError::Transport(e.to_string()))?;

    if res.status() == reqwest::StatusCode::NOT_FOUND {
      return Err(AssetError::NotFound(url.to_string()));
    }
    if !res.status().is_success() {
      return Err(AssetError::Transport(format!("HTTP {} for {}", res.status(), url)));
    }
    res.text().await.map_err(|e| AssetError::Transport(e.to_string()))
  }
}

/// Reads assets from a local directory that mirrors the deployed site root.
/// `./x` and `/x` both map to `<root>/x`.
#[derive(Clone, Debug)]
pub struct DirAssets {
  root: PathBuf,
}

impl DirAssets {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
    let rel = path.trim_start_matches("./").trim_start_matches('/');
    let rel_path = Path::new(rel);
    let escapes = rel_path.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if rel.is_empty() || escapes {
      return Err(AssetError::InvalidPath(path.to_string()));
    }
    Ok(self.root.join(rel_path))
  }
}

#[async_trait]
impl AssetSource for DirAssets {
  async fn exists(&self, path: &str) -> bool {
    match self.resolve(path) {
      Ok(p) => tokio::fs::metadata(&p).await.map(|m| m.is_file()).unwrap_or(false),
      Err(_) => false,
    }
  }

  async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
    let p = self.resolve(path)?;
    tokio::fs::read_to_string(&p).await.map_err(|e| match e.kind() {
      std::io::ErrorKind::NotFound => AssetError::NotFound(p.display().to_string()),
      _ => AssetError::Transport(format!("{}: {}", p.display(), e)),
    })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use std::net::SocketAddr;
  use tower_http::services::ServeDir;

  /// Serve `dir` under `mount` (e.g. "/VocabTest") on an ephemeral port; returns the origin URL.
  pub(crate) async fn serve_dir(dir: &Path, mount: &str) -> String {
    let app = axum::Router::new().nest_service(mount, ServeDir::new(dir));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
  }

  #[tokio::test]
  async fn dir_assets_maps_relative_and_absolute_paths_to_root() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("CaptionData/Youtube")).unwrap();
    std::fs::write(tmp.path().join("CaptionData/Youtube/a.json"), "[]").unwrap();
    let assets = DirAssets::new(tmp.path());

    assert!(assets.exists("./CaptionData/Youtube/a.json").await);
    assert!(assets.exists("/CaptionData/Youtube/a.json").await);
    assert!(!assets.exists("/a.json").await);
    assert!(!assets.exists("../etc/passwd").await);
    assert!(matches!(assets.fetch_text("/missing.json").await, Err(AssetError::NotFound(_))));
    assert_eq!(assets.fetch_text("./CaptionData/Youtube/a.json").await.unwrap(), "[]");
  }

  #[tokio::test]
  async fn http_assets_resolves_like_a_browser() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("video-list.json"), r#"{"videos":[]}"#).unwrap();
    let origin = serve_dir(tmp.path(), "/VocabTest").await;

    // Base without a trailing slash still treats the last segment as a directory.
    let assets = HttpAssets::new(&format!("{}/VocabTest", origin)).unwrap();
    assert!(assets.exists("./video-list.json").await);
    // Absolute path escapes the deployment base, so it is not found at the origin root.
    assert!(!assets.exists("/video-list.json").await);
    assert!(matches!(assets.fetch_text("/video-list.json").await, Err(AssetError::NotFound(_))));
    assert_eq!(assets.fetch_text("./video-list.json").await.unwrap(), r#"{"videos":[]}"#);
  }

  #[tokio::test]
  async fn http_assets_stays_on_the_base_origin() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("x.json"), "[]").unwrap();
    let site = serve_dir(tmp.path(), "/VocabTest").await;
    let other = serve_dir(tmp.path(), "/elsewhere").await;
    let other_host = other.trim_start_matches("http:");

    let assets = HttpAssets::new(&format!("{}/VocabTest/", site)).unwrap();
    assert!(assets.exists("./x.json").await);
    // Protocol-relative and absolute URLs pointing elsewhere are not followed.
    assert!(!assets.exists(&format!("{}/elsewhere/x.json", other_host)).await);
    assert!(matches!(assets.fetch_text(&format!("{}/elsewhere/x.json", other)).await, Err(AssetError::InvalidPath(_))));
  }
}
