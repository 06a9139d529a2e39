//! Durable "what's playing now" snapshot shared with other surfaces
//!
//! The snapshot is advisory: it is written best-effort on every meaningful
//! state change and readers must cope with it being stale, partial or absent.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::playback::{PlaybackState, TrackMetadata};
use super::types::{BrowsingContext, ContextKind};

pub const DEFAULT_SNAPSHOT_FILE: &str = ".cache/now_playing.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotArtwork {
    pub url: String,
    pub alt: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub is_explicit: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotAlbum {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotContext {
    pub kind: ContextKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotPlayback {
    pub is_playing: bool,
    pub position_sec: f64,
    pub duration_sec: f64,
    pub volume: u8,
}

/// Denormalized projection of the playback state, persisted as JSON
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NowPlayingSnapshot {
    pub artwork: SnapshotArtwork,
    pub track: SnapshotTrack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<SnapshotAlbum>,
    pub context: SnapshotContext,
    pub playback: SnapshotPlayback,
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NowPlayingSnapshot {
    pub fn project(
        state: &PlaybackState,
        track: Option<&TrackMetadata>,
        context: &BrowsingContext,
        device_name: &str,
    ) -> Self {
        let track_id = state.track_id.clone().unwrap_or_default();
        // Metadata for a different track than the loaded one is not shown
        let track = track.filter(|t| t.id == track_id);

        let title = track.map_or("Unknown Track", |t| t.title.as_str()).to_string();
        let album_title = track.map_or("Unknown Album", |t| t.album.as_str()).to_string();
        let album_id = context
            .album_id()
            .map(str::to_string)
            .or_else(|| track.and_then(|t| t.album_id.clone()));

        Self {
            artwork: SnapshotArtwork {
                url: track.map(|t| t.artwork_url.clone()).unwrap_or_default(),
                alt: format!("{} artwork", title),
            },
            track: SnapshotTrack {
                id: track_id,
                title,
                artist: track.map_or("Unknown Artist", |t| t.artist.as_str()).to_string(),
                album: album_title.clone(),
                is_explicit: track.is_some_and(|t| t.is_explicit),
            },
            album: album_id.map(|id| SnapshotAlbum {
                id,
                title: album_title,
            }),
            context: SnapshotContext {
                kind: context.kind,
                album_id: context.album_id().map(str::to_string),
                playlist_id: context.playlist_id().map(str::to_string),
            },
            playback: SnapshotPlayback {
                is_playing: state.is_playing,
                position_sec: state.position_sec,
                duration_sec: state.duration_sec,
                volume: state.volume,
            },
            device_name: device_name.to_string(),
            updated_at: Some(Utc::now()),
        }
    }
}

/// Sink for snapshots; injected so tests can observe or disable it
pub trait SnapshotWriter: Send + Sync {
    fn write(&self, snapshot: &NowPlayingSnapshot) -> Result<()>;
}

/// Snapshot slot backed by a JSON file
#[derive(Clone, Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable snapshots read as `None`
    pub fn read(&self) -> Option<NowPlayingSnapshot> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Ignoring unreadable snapshot");
                None
            }
        }
    }
}

impl SnapshotWriter for FileSnapshotStore {
    fn write(&self, snapshot: &NowPlayingSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// The fields whose change triggers a snapshot write
#[derive(Clone, Debug, PartialEq)]
struct MirrorKey {
    track_id: String,
    metadata_id: Option<String>,
    is_playing: bool,
    position_sec: f64,
    duration_sec: f64,
    volume: u8,
}

/// A projected snapshot waiting to be written, tagged with its staging order
#[derive(Debug)]
pub struct PendingSnapshot {
    seq: u64,
    snapshot: NowPlayingSnapshot,
}

#[derive(Default)]
struct Staging {
    key: Option<MirrorKey>,
    seq: u64,
}

/// Writes a snapshot whenever a mirrored field changes; never fails the caller.
///
/// Staging is cheap and happens while the caller holds its state lock, so
/// snapshots are ordered like the state changes. Flushing does the I/O and
/// skips any snapshot staged before one that was already written.
pub struct PersistenceMirror {
    writer: Arc<dyn SnapshotWriter>,
    device_name: String,
    staging: Mutex<Staging>,
    flushed: Mutex<u64>,
}

impl PersistenceMirror {
    pub fn new(writer: Arc<dyn SnapshotWriter>, device_name: impl Into<String>) -> Self {
        Self {
            writer,
            device_name: device_name.into(),
            staging: Mutex::new(Staging::default()),
            flushed: Mutex::new(0),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Project the state if a mirrored field changed since the last staging
    pub fn stage(
        &self,
        state: &PlaybackState,
        track: Option<&TrackMetadata>,
        context: &BrowsingContext,
    ) -> Option<PendingSnapshot> {
        let track_id = state.track_id.clone()?;

        let key = MirrorKey {
            track_id,
            metadata_id: track.map(|t| t.id.clone()),
            is_playing: state.is_playing,
            position_sec: state.position_sec,
            duration_sec: state.duration_sec,
            volume: state.volume,
        };

        let seq = {
            let mut staging = self.staging.lock().unwrap_or_else(|e| e.into_inner());
            if staging.key.as_ref() == Some(&key) {
                return None;
            }
            staging.key = Some(key);
            staging.seq += 1;
            staging.seq
        };

        Some(PendingSnapshot {
            seq,
            snapshot: NowPlayingSnapshot::project(state, track, context, &self.device_name),
        })
    }

    /// Returns whether a write was attempted
    pub fn flush(&self, pending: PendingSnapshot) -> bool {
        let mut flushed = self.flushed.lock().unwrap_or_else(|e| e.into_inner());
        if pending.seq <= *flushed {
            tracing::trace!(seq = pending.seq, "Skipping superseded snapshot");
            return false;
        }
        *flushed = pending.seq;
        if let Err(e) = self.writer.write(&pending.snapshot) {
            tracing::debug!(error = %e, "Now-playing snapshot write failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<NowPlayingSnapshot>>);

    impl SnapshotWriter for Recording {
        fn write(&self, snapshot: &NowPlayingSnapshot) -> Result<()> {
            self.0.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    struct Failing;

    impl SnapshotWriter for Failing {
        fn write(&self, _snapshot: &NowPlayingSnapshot) -> Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    fn observe(
        mirror: &PersistenceMirror,
        state: &PlaybackState,
        track: Option<&TrackMetadata>,
        context: &BrowsingContext,
    ) -> bool {
        mirror
            .stage(state, track, context)
            .is_some_and(|pending| mirror.flush(pending))
    }

    fn playing(track_id: &str, position: f64) -> PlaybackState {
        let mut state = PlaybackState {
            track_id: Some(track_id.to_string()),
            is_playing: true,
            ..Default::default()
        };
        state.set_duration(200.0);
        state.set_position(position);
        state
    }

    fn metadata(id: &str) -> TrackMetadata {
        TrackMetadata {
            id: id.to_string(),
            title: "Song".into(),
            artist: "Artist".into(),
            album: "Record".into(),
            album_id: Some("a9".into()),
            artwork_url: "http://pi/covers/a9.jpg".into(),
            is_explicit: true,
            duration_sec: 200.0,
        }
    }

    #[test]
    fn mirror_writes_only_on_mirrored_changes() {
        let recording = Arc::new(Recording::default());
        let mirror = PersistenceMirror::new(recording.clone(), "Raspberry Pi");
        let context = BrowsingContext::album("a1");

        assert!(!observe(&mirror, &PlaybackState::default(), None, &context), "nothing loaded");
        assert!(observe(&mirror, &playing("t1", 0.0), None, &context));
        assert!(!observe(&mirror, &playing("t1", 0.0), None, &context));

        let mut shuffled = playing("t1", 0.0);
        shuffled.shuffle = true;
        assert!(!observe(&mirror, &shuffled, None, &context), "shuffle is not mirrored");

        assert!(observe(&mirror, &playing("t1", 1.5), None, &context));
        assert!(observe(&mirror, &playing("t1", 1.5), Some(&metadata("t1")), &context));

        let written = recording.0.lock().unwrap();
        assert_eq!(written.len(), 3);
        let last = written.last().unwrap();
        assert_eq!(last.track.title, "Song");
        assert_eq!(last.playback.position_sec, 1.5);
        assert_eq!(last.context.album_id.as_deref(), Some("a1"));
        assert_eq!(last.album.as_ref().map(|a| a.id.as_str()), Some("a1"));
        assert_eq!(last.device_name, "Raspberry Pi");
    }

    #[test]
    fn superseded_snapshot_is_not_written() {
        let recording = Arc::new(Recording::default());
        let mirror = PersistenceMirror::new(recording.clone(), "pi");
        let context = BrowsingContext::album("a1");

        let older = mirror.stage(&playing("t1", 1.0), None, &context).unwrap();
        let newer = mirror.stage(&playing("t1", 2.0), None, &context).unwrap();
        assert!(mirror.flush(newer));
        assert!(!mirror.flush(older));

        let written = recording.0.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].playback.position_sec, 2.0);
    }

    #[test]
    fn mirror_swallows_writer_failures() {
        let mirror = PersistenceMirror::new(Arc::new(Failing), "pi");
        assert!(observe(&mirror, &playing("t1", 3.0), None, &BrowsingContext::favourites()));
    }

    #[test]
    fn projection_ignores_metadata_of_other_track() {
        let snapshot = NowPlayingSnapshot::project(
            &playing("t2", 0.0),
            Some(&metadata("t1")),
            &BrowsingContext::playlist("p1"),
            "pi",
        );
        assert_eq!(snapshot.track.id, "t2");
        assert_eq!(snapshot.track.title, "Unknown Track");
        assert_eq!(snapshot.artwork.alt, "Unknown Track artwork");
        assert_eq!(snapshot.context.playlist_id.as_deref(), Some("p1"));
        assert!(snapshot.album.is_none());
    }

    #[test]
    fn file_store_round_trip_and_tolerant_reads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested/now_playing.json"));
        assert!(store.read().is_none(), "first run has no snapshot");

        let snapshot = NowPlayingSnapshot::project(
            &playing("t1", 42.0),
            Some(&metadata("t1")),
            &BrowsingContext::album("a1"),
            "pi",
        );
        store.write(&snapshot).unwrap();
        assert_eq!(store.read(), Some(snapshot));

        fs::write(store.path(), r#"{"track":{"title":"Partial"}}"#).unwrap();
        let partial = store.read().unwrap();
        assert_eq!(partial.track.title, "Partial");
        assert_eq!(partial.playback.volume, 0);
        assert_eq!(partial.context.kind, ContextKind::Unknown);

        fs::write(store.path(), "not json").unwrap();
        assert!(store.read().is_none());
    }
}
