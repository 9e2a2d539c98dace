//! Slideshow sequencing as an explicit state machine.
//!
//! The sequencer never touches a clock or a media element. Each input
//! returns the commands a page must apply, including which single trigger
//! to wait for next; feeding that trigger back in advances the show. A
//! fresh [`Sequencer`] is built for every page load and is never reset.

use std::time::Duration;

use tracing::{debug, trace};

use crate::media::MediaKind;
use crate::scan::Playlist;

/// How long an image stays visible.
pub const DEFAULT_SLIDE_DURATION: Duration = Duration::from_secs(15);
/// How long the empty placeholder waits before loading again.
pub const DEFAULT_EMPTY_RETRY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub slide_duration: Duration,
    pub empty_retry: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            slide_duration: DEFAULT_SLIDE_DURATION,
            empty_retry: DEFAULT_EMPTY_RETRY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loaded,
    Playing(usize),
    Exhausted,
    Empty,
}

impl Phase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Empty)
    }
}

/// One hidden element created when the playlist is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub index: usize,
    pub kind: MediaKind,
    pub url: String,
    pub content_type: String,
}

/// The single trigger a page waits on before feeding the next input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Image pacing; answer with [`Sequencer::timer_elapsed`].
    Timer(Duration),
    /// Natural end of the video at this index; answer with [`Sequencer::media_ended`].
    Ended(usize),
    /// Empty placeholder refresh; answer with [`Sequencer::retry_elapsed`].
    Retry(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Render(Vec<Slide>),
    ShowPlaceholder,
    Reveal(usize),
    Hide(usize),
    PlayVideo(usize),
    Wait(Wait),
    Reload,
}

/// Playback state owned by one page load.
#[derive(Debug, Clone)]
pub struct SequencerState {
    pub playlist: Playlist,
    /// Index of the visible slide; equals the playlist length once exhausted.
    pub index: usize,
    pub slide_duration: Duration,
}

#[derive(Debug)]
pub struct Sequencer {
    pacing: Pacing,
    phase: Phase,
    state: SequencerState,
    slides: Vec<Slide>,
}

impl Sequencer {
    #[must_use]
    pub fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            phase: Phase::Idle,
            state: SequencerState {
                playlist: Playlist::default(),
                index: 0,
                slide_duration: pacing.slide_duration,
            },
            slides: Vec::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Accept the fetched playlist, render it and start playing.
    ///
    /// Only valid from [`Phase::Idle`]; later calls are ignored.
    pub fn load(&mut self, playlist: Playlist) -> Vec<Command> {
        if self.phase != Phase::Idle {
            trace!(phase = ?self.phase, "load ignored");
            return Vec::new();
        }

        // Descriptors that are neither image nor video cannot be rendered.
        let playlist: Playlist = playlist.iter().filter(|d| d.kind().is_some()).cloned().collect();
        self.slides = playlist
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                item.kind().map(|kind| Slide {
                    index,
                    kind,
                    url: item.url.clone(),
                    content_type: item.content_type.clone(),
                })
            })
            .collect();

        self.state.playlist = playlist;
        self.state.index = 0;

        if self.slides.is_empty() {
            self.phase = Phase::Empty;
            debug!(retry = ?self.pacing.empty_retry, "empty playlist; showing placeholder");
            return vec![
                Command::ShowPlaceholder,
                Command::Wait(Wait::Retry(self.pacing.empty_retry)),
            ];
        }

        self.phase = Phase::Loaded;
        let mut commands = vec![Command::Render(self.slides.clone())];
        commands.extend(self.start());
        commands
    }

    fn start(&mut self) -> Vec<Command> {
        debug_assert_eq!(self.phase, Phase::Loaded);
        self.phase = Phase::Playing(0);
        self.reveal(0)
    }

    /// The image pacing timer fired.
    pub fn timer_elapsed(&mut self) -> Vec<Command> {
        match self.current_kind() {
            Some((index, MediaKind::Image)) => self.advance(index),
            _ => {
                trace!(phase = ?self.phase, "timer ignored");
                Vec::new()
            }
        }
    }

    /// The video at `index` reached its natural end.
    pub fn media_ended(&mut self, index: usize) -> Vec<Command> {
        match self.current_kind() {
            Some((current, MediaKind::Video)) if current == index => self.advance(current),
            _ => {
                trace!(phase = ?self.phase, index, "ended event ignored");
                Vec::new()
            }
        }
    }

    /// The empty placeholder's refresh interval passed.
    pub fn retry_elapsed(&mut self) -> Vec<Command> {
        if self.phase == Phase::Empty {
            vec![Command::Reload]
        } else {
            Vec::new()
        }
    }

    fn current_kind(&self) -> Option<(usize, MediaKind)> {
        let Phase::Playing(index) = self.phase else {
            return None;
        };
        let slide = self.slides.get(index)?;
        Some((index, slide.kind))
    }

    fn advance(&mut self, current: usize) -> Vec<Command> {
        let next = current + 1;
        self.state.index = next;
        let mut commands = vec![Command::Hide(current)];
        if next == self.slides.len() {
            self.phase = Phase::Exhausted;
            debug!(played = next, "playlist exhausted; reloading");
            commands.push(Command::Reload);
        } else {
            self.phase = Phase::Playing(next);
            commands.extend(self.reveal(next));
        }
        commands
    }

    fn reveal(&mut self, index: usize) -> Vec<Command> {
        let Some(kind) = self.slides.get(index).map(|slide| slide.kind) else {
            trace!(index, "no slide to reveal");
            return Vec::new();
        };
        self.state.index = index;
        let mut commands = vec![Command::Reveal(index)];
        match kind {
            MediaKind::Image => {
                commands.push(Command::Wait(Wait::Timer(self.state.slide_duration)));
            }
            MediaKind::Video => {
                commands.push(Command::PlayVideo(index));
                commands.push(Command::Wait(Wait::Ended(index)));
            }
        }
        trace!(index, "revealed slide");
        commands
    }
}
