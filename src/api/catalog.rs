//! Catalog lookups: albums, playlists, favourites and single tracks

use async_trait::async_trait;

use crate::model::{CatalogTrack, TrackListResponse, WithTracks};

use super::{ApiClient, ApiError};

/// Read-only view of the server's music catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Tracks of an album, in server order
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<CatalogTrack>, ApiError>;
    /// Tracks of a playlist, in server order
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<CatalogTrack>, ApiError>;
    async fn favourite_tracks(&self) -> Result<Vec<CatalogTrack>, ApiError>;
    /// Track details including its album
    async fn track(&self, track_id: &str) -> Result<CatalogTrack, ApiError>;
}

/// HTTP implementation of [`Catalog`]
#[derive(Clone, Debug)]
pub struct CatalogClient {
    api: ApiClient,
}

impl CatalogClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn require_id<'a>(kind: &str, id: &'a str) -> Result<&'a str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        Err(ApiError::InvalidInput(format!("{kind} id is empty")))
    } else {
        Ok(id)
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<CatalogTrack>, ApiError> {
        let album_id = require_id("album", album_id)?;
        crate::log_api_request!("album_tracks", album_id);
        let path = format!("/albums/{}", urlencoding::encode(album_id));
        let result: Result<WithTracks, _> = self.api.get_json(&path, &[("withTracks", "1")]).await;
        crate::log_api_result!("album_tracks", result);
        Ok(result?.tracks)
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<CatalogTrack>, ApiError> {
        let playlist_id = require_id("playlist", playlist_id)?;
        crate::log_api_request!("playlist_tracks", playlist_id);
        let path = format!("/playlists/{}", urlencoding::encode(playlist_id));
        let result: Result<WithTracks, _> = self.api.get_json(&path, &[("withTracks", "1")]).await;
        crate::log_api_result!("playlist_tracks", result);
        Ok(result?.tracks)
    }

    async fn favourite_tracks(&self) -> Result<Vec<CatalogTrack>, ApiError> {
        crate::log_api_request!("favourite_tracks");
        let result: Result<TrackListResponse, _> = self
            .api
            .get_json("/tracks", &[("favourite", "1"), ("withAlbum", "1")])
            .await;
        crate::log_api_result!("favourite_tracks", result);
        Ok(result?.into_tracks())
    }

    async fn track(&self, track_id: &str) -> Result<CatalogTrack, ApiError> {
        let track_id = require_id("track", track_id)?;
        crate::log_api_request!("track", track_id);
        let path = format!("/tracks/{}", urlencoding::encode(track_id));
        let result: Result<CatalogTrack, _> = self.api.get_json(&path, &[("withAlbum", "1")]).await;
        crate::log_api_result!("track", result);
        result
    }
}
