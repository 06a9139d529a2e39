//! Track list of the active browsing context

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::Catalog;
use crate::model::{
    BrowsingContext, CatalogTrack, ContextKind, ContextTrackList, TrackSummary, sort_album_like,
};

use super::PlaybackError;
use super::debounce::Generation;

/// Resolves and holds the ordered track list used for prev/next.
///
/// The list is replaced wholesale by each completed load; responses of loads
/// that were superseded or invalidated are dropped.
pub struct TrackContextLoader {
    catalog: Arc<dyn Catalog>,
    generation: Generation,
    list: Mutex<ContextTrackList>,
}

impl TrackContextLoader {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            generation: Generation::default(),
            list: Mutex::new(ContextTrackList::default()),
        }
    }

    fn list(&self) -> MutexGuard<'_, ContextTrackList> {
        self.list.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn view(&self) -> ContextTrackList {
        self.list().clone()
    }

    /// Make every in-flight load stale
    pub fn invalidate(&self) {
        self.generation.advance();
    }

    fn replace(&self, ticket: u64, list: ContextTrackList) -> bool {
        if !self.generation.is_current(ticket) {
            return false;
        }
        *self.list() = list;
        true
    }

    pub async fn load(&self, context: &BrowsingContext) -> Result<(), PlaybackError> {
        let ticket = self.generation.advance();

        let container_id = context
            .container_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let needs_id = matches!(context.kind, ContextKind::Album | ContextKind::Playlist);
        if context.kind == ContextKind::Unknown || (needs_id && container_id.is_none()) {
            self.replace(ticket, ContextTrackList::default());
            if needs_id {
                return Err(PlaybackError::Validation(format!("Missing {} id.", context.kind)));
            }
            return Ok(());
        }

        self.replace(ticket, ContextTrackList {
            tracks: self.view().tracks,
            loading: true,
        });
        tracing::debug!(%context, "Loading context track list");

        let id = container_id.unwrap_or_default();
        let result = match context.kind {
            ContextKind::Album => self.catalog.album_tracks(id).await.map(|mut tracks| {
                sort_album_like(&mut tracks);
                tracks
            }),
            // Playlists are played in the order the server returns
            ContextKind::Playlist => self.catalog.playlist_tracks(id).await,
            ContextKind::Favourites => self.catalog.favourite_tracks().await.map(|mut tracks| {
                sort_album_like(&mut tracks);
                tracks
            }),
            ContextKind::Unknown => Ok(Vec::new()),
        };

        match result {
            Ok(tracks) => {
                let count = tracks.len();
                if self.replace(ticket, summarize(&tracks)) {
                    tracing::info!(%context, count, "Context track list loaded");
                } else {
                    tracing::debug!(%context, "Discarding stale context track list");
                }
                Ok(())
            }
            Err(source) => {
                if !self.replace(ticket, ContextTrackList::default()) {
                    tracing::debug!(%context, error = %source, "Ignoring failure of stale context load");
                    return Ok(());
                }
                Err(PlaybackError::TrackList(source))
            }
        }
    }
}

fn summarize(tracks: &[CatalogTrack]) -> ContextTrackList {
    ContextTrackList::loaded(
        tracks
            .iter()
            .enumerate()
            .map(|(index, track)| TrackSummary::from_catalog(track, index))
            .collect(),
    )
}
