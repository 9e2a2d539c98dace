//! Digital-signage slideshow: directory playlists served over HTTP and
//! the sequencer that plays them.

pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod media;
pub mod player;
pub mod scan;
pub mod sequencer;
pub mod web;

pub use error::Error;
pub use library::{Library, Scope};
pub use scan::{MediaDescriptor, Playlist, PlaylistOrder};
