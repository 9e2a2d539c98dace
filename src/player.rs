//! Drives a [`Sequencer`] against a real clock and a page surface.

use std::future::Future;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Error;
use crate::library::{Library, Scope};
use crate::scan::Playlist;
use crate::sequencer::{Command, Pacing, Sequencer, Slide, Wait};

/// Natural end of playback reported by the video element at this index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaEnded(pub usize);

/// Where a page load gets its playlist from.
pub trait PlaylistSource {
    fn fetch(&self, scope: &Scope) -> impl Future<Output = Result<Playlist, Error>> + Send;
}

impl PlaylistSource for Library {
    async fn fetch(&self, scope: &Scope) -> Result<Playlist, Error> {
        self.playlist(scope)
    }
}

/// The document the slideshow is drawn into.
pub trait Stage {
    fn render(&mut self, slides: &[Slide]);
    fn show_placeholder(&mut self);
    fn reveal(&mut self, index: usize);
    fn hide(&mut self, index: usize);
    fn play_video(&mut self, index: usize);
    /// Called once when the page is about to be reloaded from scratch.
    fn reload(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Reload,
    Cancelled,
}

/// Run one page load: fetch, render, play until a reload is due.
///
/// # Errors
/// Returns [`Error::Fetch`] when the playlist cannot be fetched; nothing is
/// rendered in that case and no retry is attempted.
#[instrument(skip_all, fields(%scope))]
pub async fn run_page<P, S>(
    source: &P,
    scope: &Scope,
    stage: &mut S,
    ended_rx: &mut Receiver<MediaEnded>,
    pacing: Pacing,
    cancel: &CancellationToken,
) -> Result<PageOutcome, Error>
where
    P: PlaylistSource,
    S: Stage,
{
    let playlist = source
        .fetch(scope)
        .await
        .map_err(|err| Error::Fetch(err.to_string()))?;
    info!(slides = playlist.len(), "playlist loaded");

    let mut sequencer = Sequencer::new(pacing);
    let mut pending = sequencer.load(playlist);

    loop {
        let mut wait = None;
        for command in pending.drain(..) {
            match command {
                Command::Render(slides) => stage.render(&slides),
                Command::ShowPlaceholder => stage.show_placeholder(),
                Command::Reveal(index) => stage.reveal(index),
                Command::Hide(index) => stage.hide(index),
                Command::PlayVideo(index) => stage.play_video(index),
                Command::Wait(w) => wait = Some(w),
                Command::Reload => {
                    stage.reload();
                    return Ok(PageOutcome::Reload);
                }
            }
        }

        let Some(wait) = wait else {
            warn!(phase = ?sequencer.phase(), "sequencer produced no trigger; stopping page");
            return Ok(PageOutcome::Cancelled);
        };

        pending = match wait {
            Wait::Timer(duration) => select! {
                _ = cancel.cancelled() => return Ok(PageOutcome::Cancelled),
                _ = sleep(duration) => sequencer.timer_elapsed(),
            },
            Wait::Retry(duration) => select! {
                _ = cancel.cancelled() => return Ok(PageOutcome::Cancelled),
                _ = sleep(duration) => sequencer.retry_elapsed(),
            },
            Wait::Ended(index) => loop {
                select! {
                    _ = cancel.cancelled() => return Ok(PageOutcome::Cancelled),
                    event = ended_rx.recv() => match event {
                        Some(MediaEnded(i)) if i == index => break sequencer.media_ended(i),
                        Some(MediaEnded(other)) => {
                            debug!(expected = index, got = other, "stale ended event");
                        }
                        None => {
                            warn!("media event source closed");
                            return Ok(PageOutcome::Cancelled);
                        }
                    },
                }
            },
        };
    }
}

/// Play page load after page load until cancelled.
///
/// Every load builds a fresh sequencer. A failed fetch leaves the page
/// inert until cancellation, as nothing would trigger another load.
pub async fn run<P, S>(
    source: P,
    scope: Scope,
    mut stage: S,
    mut ended_rx: Receiver<MediaEnded>,
    pacing: Pacing,
    cancel: CancellationToken,
) -> Result<()>
where
    P: PlaylistSource,
    S: Stage,
{
    loop {
        match run_page(&source, &scope, &mut stage, &mut ended_rx, pacing, &cancel).await {
            Ok(PageOutcome::Reload) => continue,
            Ok(PageOutcome::Cancelled) => break,
            Err(err) => {
                warn!(error = %err, "page load failed; idle until cancelled");
                cancel.cancelled().await;
                break;
            }
        }
    }
    info!("player stopped");
    Ok(())
}
