//! Model module - Application state and data types
//!
//! This module contains the data structures shared by the controller and the view.
//! It is organized into submodules by responsibility:
//!
//! - `types`: Core type definitions (repeat mode, browsing context, notices, UI state)
//! - `playback`: Playback state and track metadata
//! - `content`: Catalog tracks and the context track list
//! - `snapshot`: Persisted now-playing snapshot and its writer

mod types;
mod playback;
mod content;
mod snapshot;

pub use types::{
    BrowsingContext, ContextKind, Notice, NoticeKind, RepeatMode, Route, Scrub, UiState,
};

pub use playback::{PlaybackInfo, PlaybackState, TrackMetadata, DEFAULT_VOLUME_PERCENT};

pub use content::{
    sort_album_like, CatalogAlbum, CatalogTrack, ContextTrackList,
    TrackListResponse, TrackSummary, WithTracks,
};

pub use snapshot::{
    FileSnapshotStore, NowPlayingSnapshot, PersistenceMirror, SnapshotWriter,
    DEFAULT_SNAPSHOT_FILE,
};
