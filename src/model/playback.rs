//! Playback-related types and state management

use crate::api::to_backend_url;

use super::content::{CatalogTrack, ContextTrackList};
use super::types::{BrowsingContext, Notice, RepeatMode};

pub const DEFAULT_VOLUME_PERCENT: u8 = 50;

/// Authoritative playback state, owned by the now-playing controller
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub track_id: Option<String>,
    pub is_playing: bool,
    pub position_sec: f64,
    pub duration_sec: f64,
    pub volume: u8,
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            track_id: None,
            is_playing: false,
            position_sec: 0.0,
            duration_sec: 0.0,
            volume: DEFAULT_VOLUME_PERCENT,
            shuffle: false,
            repeat: RepeatMode::Off,
        }
    }
}

impl PlaybackState {
    /// Set the position, keeping `0 <= position <= duration`
    pub fn set_position(&mut self, position_sec: f64) {
        let position = if position_sec.is_finite() { position_sec } else { 0.0 };
        self.position_sec = position.clamp(0.0, self.duration_sec.max(0.0));
    }

    /// Set the duration and re-clamp the position against it
    pub fn set_duration(&mut self, duration_sec: f64) {
        self.duration_sec = if duration_sec.is_finite() {
            duration_sec.max(0.0)
        } else {
            0.0
        };
        self.set_position(self.position_sec);
    }

    pub fn is_current(&self, track_id: &str) -> bool {
        self.track_id.as_deref() == Some(track_id)
    }
}

/// Metadata about the loaded track, resolved from the catalog
#[derive(Clone, Debug, PartialEq)]
pub struct TrackMetadata {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_id: Option<String>,
    pub artwork_url: String,
    pub is_explicit: bool,
    pub duration_sec: f64,
}

impl TrackMetadata {
    pub fn from_catalog(track: &CatalogTrack, image_base_url: &str) -> Self {
        let album = track.album.as_ref();
        let artwork_url = album
            .and_then(|a| a.cover_art_path.as_deref())
            .map(|path| to_backend_url(image_base_url, path))
            .unwrap_or_default();

        Self {
            id: track.id.clone(),
            title: non_empty(Some(track.title.as_str())).unwrap_or("Unknown Track").to_string(),
            artist: non_empty(track.track_artist.as_deref())
                .or_else(|| non_empty(track.album_artist.as_deref()))
                .unwrap_or("Unknown Artist")
                .to_string(),
            album: non_empty(album.and_then(|a| a.title.as_deref()))
                .unwrap_or("Unknown Album")
                .to_string(),
            album_id: album.and_then(|a| a.id.clone()).or_else(|| track.album_id.clone()),
            artwork_url,
            is_explicit: track.is_explicit,
            duration_sec: track.duration_sec.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Complete playback information for rendering the UI
#[derive(Clone, Debug)]
pub struct PlaybackInfo {
    pub state: PlaybackState,
    pub track: Option<TrackMetadata>,
    pub context: BrowsingContext,
    pub tracks: ContextTrackList,
    pub notice: Option<Notice>,
    pub device_name: String,
}
