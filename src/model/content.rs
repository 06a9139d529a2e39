//! Catalog data: tracks as the server returns them and the ordered
//! track list of the active browsing context

use std::sync::Arc;

use serde::{Deserialize, Deserializer};

/// Accept ids serialized either as strings or as numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Album reference embedded in a track (`withAlbum=1`)
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogAlbum {
    #[serde(deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub album_artist: Option<String>,
    pub cover_art_path: Option<String>,
}

/// A track as returned by the catalog endpoints
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogTrack {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "optional_string_or_number")]
    pub album_id: Option<String>,
    pub title: String,
    pub track_artist: Option<String>,
    pub album_artist: Option<String>,
    pub track_no: Option<u32>,
    pub disc_no: Option<u32>,
    pub duration_sec: Option<f64>,
    pub is_explicit: bool,
    pub is_favourite: bool,
    /// Position inside a playlist, when the track comes from one
    pub position: Option<u32>,
    pub album: Option<CatalogAlbum>,
}

/// `{ ..., "tracks": [...] }` as returned by album and playlist lookups
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WithTracks {
    pub tracks: Vec<CatalogTrack>,
}

/// The favourites endpoint answers with a bare array or a wrapped list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TrackListResponse {
    List(Vec<CatalogTrack>),
    Wrapped { tracks: Vec<CatalogTrack> },
    Other(serde_json::Value),
}

impl TrackListResponse {
    pub fn into_tracks(self) -> Vec<CatalogTrack> {
        match self {
            TrackListResponse::List(tracks) | TrackListResponse::Wrapped { tracks } => tracks,
            TrackListResponse::Other(_) => Vec::new(),
        }
    }
}

/// Order tracks the way an album reads: disc, then track number, then title
pub fn sort_album_like(tracks: &mut [CatalogTrack]) {
    tracks.sort_by(|a, b| {
        a.disc_no
            .unwrap_or(0)
            .cmp(&b.disc_no.unwrap_or(0))
            .then_with(|| a.track_no.unwrap_or(0).cmp(&b.track_no.unwrap_or(0)))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
}

/// Entry of the context track list used for prev/next and the track-list sheet
#[derive(Clone, Debug, PartialEq)]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    pub duration_sec: f64,
    /// 1-based position inside the context (track number for albums)
    pub position_hint: u32,
}

impl TrackSummary {
    pub fn from_catalog(track: &CatalogTrack, index: usize) -> Self {
        Self {
            id: track.id.clone(),
            title: if track.title.is_empty() {
                "Unknown Track".to_string()
            } else {
                track.title.clone()
            },
            duration_sec: track.duration_sec.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
            position_hint: track
                .track_no
                .or(track.position)
                .unwrap_or(index as u32 + 1),
        }
    }
}

/// Ordered track list of the active context; replaced wholesale, never edited
#[derive(Clone, Debug, Default)]
pub struct ContextTrackList {
    pub tracks: Arc<[TrackSummary]>,
    pub loading: bool,
}

impl ContextTrackList {
    pub fn loaded(tracks: Vec<TrackSummary>) -> Self {
        Self {
            tracks: tracks.into(),
            loading: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn index_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackSummary> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn is_last(&self, track_id: &str) -> bool {
        !self.tracks.is_empty() && self.index_of(track_id) == Some(self.tracks.len() - 1)
    }
}
