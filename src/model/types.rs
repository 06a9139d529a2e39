//! Core type definitions for the application

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Repeat mode state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Repeat: Off",
            RepeatMode::All => "Repeat: All",
            RepeatMode::One => "Repeat: One",
        }
    }
}

/// Which kind of list the current track belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Album,
    Playlist,
    Favourites,
    #[default]
    Unknown,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Album => "album",
            ContextKind::Playlist => "playlist",
            ContextKind::Favourites => "favourites",
            ContextKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// The ordered list the current track is played from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BrowsingContext {
    pub kind: ContextKind,
    pub container_id: Option<String>,
}

impl BrowsingContext {
    pub fn album(album_id: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Album,
            container_id: Some(album_id.into()),
        }
    }

    pub fn playlist(playlist_id: impl Into<String>) -> Self {
        Self {
            kind: ContextKind::Playlist,
            container_id: Some(playlist_id.into()),
        }
    }

    pub fn favourites() -> Self {
        Self {
            kind: ContextKind::Favourites,
            container_id: None,
        }
    }

    pub fn album_id(&self) -> Option<&str> {
        match self.kind {
            ContextKind::Album => self.container_id.as_deref(),
            _ => None,
        }
    }

    pub fn playlist_id(&self) -> Option<&str> {
        match self.kind {
            ContextKind::Playlist => self.container_id.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for BrowsingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container_id {
            Some(id) => write!(f, "{} {}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// What the navigation layer hands to the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub context: BrowsingContext,
    pub track_id: Option<String>,
}

impl Route {
    pub fn new(context: BrowsingContext, track_id: impl Into<String>) -> Self {
        Self {
            context,
            track_id: Some(track_id.into()),
        }
    }
}

/// Severity of a transient notice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Ok,
    Warn,
    Error,
}

/// A short, auto-dismissing message shown over the now-playing card
#[derive(Clone, Debug)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: Instant,
}

/// Terminal front-end state, owned by the event loop
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub show_track_list: bool,
    pub track_list_selected: usize,
    pub scrub: Option<Scrub>,
    pub should_quit: bool,
}

/// An in-progress keyboard seek gesture
#[derive(Clone, Copy, Debug)]
pub struct Scrub {
    pub target_sec: f64,
    pub last_input: Instant,
}
