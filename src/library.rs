//! Playlist resolution for the root media directory and its named folders.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;
use crate::scan::{self, Playlist, PlaylistOrder};

/// Page path prefix that scopes the slideshow to one folder.
pub const PRECISE_PREFIX: &str = "/precise/";
/// API path serving playlists.
pub const API_FILES: &str = "/api/files";

/// Which directory a playlist is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Root,
    Folder(String),
}

impl Scope {
    /// Derive the scope from a page location such as `/` or `/precise/lobby`.
    #[must_use]
    pub fn from_page_path(path: &str) -> Self {
        match path.strip_prefix(PRECISE_PREFIX) {
            Some(folder) if !folder.trim_matches('/').is_empty() => {
                Self::Folder(folder.trim_matches('/').to_string())
            }
            _ => Self::Root,
        }
    }

    /// API endpoint that serves this scope's playlist.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::Root => API_FILES.to_string(),
            Self::Folder(folder) => format!("{API_FILES}/{folder}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Folder(folder) => f.write_str(folder),
        }
    }
}

/// The media root on disk and how it is exposed to clients.
#[derive(Debug, Clone)]
pub struct Library {
    media_root: PathBuf,
    url_prefix: String,
    order: PlaylistOrder,
}

impl Library {
    pub fn new(
        media_root: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        order: PlaylistOrder,
    ) -> Self {
        Self {
            media_root: media_root.into(),
            url_prefix: url_prefix.into(),
            order,
        }
    }

    #[must_use]
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Build a fresh playlist for `scope`.
    ///
    /// The scanner only runs once the target directory is known to exist.
    ///
    /// # Errors
    /// [`Error::NotFound`] for a missing or unusable folder, [`Error::Scan`]
    /// when reading the directory fails.
    pub fn playlist(&self, scope: &Scope) -> Result<Playlist, Error> {
        let (dir, base_url) = match scope {
            Scope::Root => (self.media_root.clone(), self.url_prefix.clone()),
            Scope::Folder(folder) => {
                if !is_plain_segment(folder) {
                    return Err(Error::NotFound(folder.clone()));
                }
                (
                    self.media_root.join(folder),
                    scan::media_url(&self.url_prefix, folder),
                )
            }
        };

        match dir.try_exists() {
            Ok(true) if dir.is_dir() => {}
            Ok(_) => {
                debug!(%scope, dir = %dir.display(), "media directory missing");
                return Err(Error::NotFound(scope.to_string()));
            }
            Err(err) => return Err(Error::scan(dir, err)),
        }

        scan::scan(&dir, &base_url, self.order)
    }
}

/// A single path segment naming an immediate subdirectory.
fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
