//! Directory scanning: turns one media directory into a playlist.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::media::{self, MediaKind};

const SAFE_PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// One playable slide: where to fetch it and what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Full MIME type detected from the file's bytes.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Site-relative URL of the file.
    pub url: String,
}

impl MediaDescriptor {
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::of(&self.content_type)
    }
}

/// Ordered descriptors produced by a single scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist(Vec<MediaDescriptor>);

impl Playlist {
    #[must_use]
    pub fn new(items: Vec<MediaDescriptor>) -> Self {
        Self(items)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MediaDescriptor> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaDescriptor> {
        self.0.iter()
    }
}

impl FromIterator<MediaDescriptor> for Playlist {
    fn from_iter<T: IntoIterator<Item = MediaDescriptor>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Order in which scanned entries are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaylistOrder {
    /// Lexicographic by file name.
    #[default]
    Name,
    /// Whatever order the filesystem listing yields.
    Listing,
}

/// Join a site-relative base path and a file name into a URL.
#[must_use]
pub fn media_url(base_url: &str, file_name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(file_name, SAFE_PATH_SEGMENT)
    )
}

/// Scan the direct children of `dir` for images and videos.
///
/// `dir` must exist; callers check that first. Subdirectories are skipped,
/// and the first I/O error aborts the whole scan.
///
/// # Errors
/// Returns [`Error::Scan`] if the listing or any file's content cannot be read.
pub fn scan(dir: &Path, base_url: &str, order: PlaylistOrder) -> Result<Playlist, Error> {
    let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true);
    if order == PlaylistOrder::Name {
        walker = walker.sort_by_file_name();
    }

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            Error::scan(path, err)
        })?;
        if entry.file_type().is_dir() {
            trace!(path = %entry.path().display(), "skipping subdirectory");
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping file with non UTF-8 name");
            continue;
        };
        let mime = media::classify(entry.path()).map_err(|err| Error::scan(entry.path(), err))?;
        if MediaKind::of(mime).is_none() {
            trace!(path = %entry.path().display(), mime, "not playable");
            continue;
        }
        out.push(MediaDescriptor {
            content_type: mime.to_string(),
            url: media_url(base_url, name),
        });
    }

    debug!(dir = %dir.display(), count = out.len(), "scanned media directory");
    Ok(Playlist(out))
}
