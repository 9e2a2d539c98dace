use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::library::Library;
use crate::scan::PlaylistOrder;
use crate::sequencer::{DEFAULT_EMPTY_RETRY, DEFAULT_SLIDE_DURATION, Pacing};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directory whose files (and immediate subdirectories) are played.
    pub media_root: PathBuf,
    /// Site-relative path under which `media_root` is served.
    pub media_url_prefix: String,
    /// Address the HTTP server binds to.
    pub bind_address: IpAddr,
    pub port: u16,
    /// How long each image stays on screen.
    #[serde(with = "humantime_serde")]
    pub slide_duration: Duration,
    /// How long the "no media" placeholder waits before reloading.
    #[serde(with = "humantime_serde")]
    pub empty_retry: Duration,
    /// Time in-flight requests get to finish after an interrupt.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
    /// Order of entries within a playlist.
    pub playlist_order: PlaylistOrder,
    /// Optional on-disk assets (icons and the like) served under `/static`.
    pub static_dir: Option<PathBuf>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s).with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.slide_duration > Duration::ZERO,
            "slide-duration must be positive"
        );
        ensure!(self.empty_retry > Duration::ZERO, "empty-retry must be positive");
        ensure!(
            self.media_url_prefix.starts_with('/'),
            "media-url-prefix must start with '/'"
        );
        ensure!(
            self.media_url_prefix.len() > 1 && !self.media_url_prefix.ends_with('/'),
            "media-url-prefix must name a path below '/' without a trailing slash"
        );
        ensure!(
            !matches!(self.media_url_prefix.as_str(), "/api" | "/precise" | "/assets" | "/static"),
            "media-url-prefix {} collides with a built-in route",
            self.media_url_prefix
        );
        Ok(self)
    }

    #[must_use]
    pub fn pacing(&self) -> Pacing {
        Pacing {
            slide_duration: self.slide_duration,
            empty_retry: self.empty_retry,
        }
    }

    #[must_use]
    pub fn library(&self) -> Library {
        Library::new(
            self.media_root.clone(),
            self.media_url_prefix.clone(),
            self.playlist_order,
        )
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("static/resources"),
            media_url_prefix: "/resources".to_string(),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            slide_duration: DEFAULT_SLIDE_DURATION,
            empty_retry: DEFAULT_EMPTY_RETRY,
            shutdown_grace: Duration::from_secs(10),
            playlist_order: PlaylistOrder::default(),
            static_dir: None,
        }
    }
}
