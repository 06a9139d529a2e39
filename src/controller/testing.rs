//! Test doubles for the controller's collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, Catalog, PlayerTransport, RemoteState, ResumeOutcome};
use crate::model::{
    BrowsingContext, CatalogAlbum, CatalogTrack, NowPlayingSnapshot, Route, SnapshotWriter,
};

use super::{Collaborators, NowPlayingController, SessionOptions, Timings};

#[derive(Clone, Debug, PartialEq)]
pub enum TransportCall {
    Start { track_id: String, position_sec: f64 },
    Pause(bool),
    Resume,
    Seek(f64),
    Volume(u8),
    GetState,
}

#[derive(Clone, Copy, Debug)]
pub enum ResumeBehavior {
    Resumed(ResumeOutcome),
    NothingLoaded,
    Fail,
}

fn offline() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "Playback engine offline".to_string(),
    }
}

pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    start_delays: Mutex<HashMap<String, Duration>>,
    resume: Mutex<ResumeBehavior>,
    remote: Mutex<RemoteState>,
    fail_start: AtomicBool,
    fail_pause: AtomicBool,
    fail_seek: AtomicBool,
    fail_volume: AtomicBool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            start_delays: Mutex::new(HashMap::new()),
            resume: Mutex::new(ResumeBehavior::Resumed(ResumeOutcome::default())),
            remote: Mutex::new(RemoteState {
                paused: true,
                volume: 50,
                ..Default::default()
            }),
            fail_start: AtomicBool::new(false),
            fail_pause: AtomicBool::new(false),
            fail_seek: AtomicBool::new(false),
            fail_volume: AtomicBool::new(false),
        }
    }
}

impl MockTransport {
    pub fn delay_start(&self, track_id: &str, delay: Duration) {
        self.start_delays.lock().unwrap().insert(track_id.to_string(), delay);
    }

    pub fn set_resume(&self, behavior: ResumeBehavior) {
        *self.resume.lock().unwrap() = behavior;
    }

    pub fn set_remote(&self, state: RemoteState) {
        *self.remote.lock().unwrap() = state;
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pause(&self, fail: bool) {
        self.fail_pause.store(fail, Ordering::SeqCst);
    }

    pub fn fail_seek(&self, fail: bool) {
        self.fail_seek.store(fail, Ordering::SeqCst);
    }

    pub fn fail_volume(&self, fail: bool) {
        self.fail_volume.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn starts(&self) -> Vec<(String, f64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Start { track_id, position_sec } => Some((track_id, position_sec)),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    pub fn volumes(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Volume(volume) => Some(volume),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlayerTransport for MockTransport {
    async fn start_track(&self, track_id: &str, position_sec: f64) -> Result<(), ApiError> {
        self.record(TransportCall::Start {
            track_id: track_id.to_string(),
            position_sec,
        });
        let delay = self.start_delays.lock().unwrap().get(track_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(())
    }

    async fn pause(&self, paused: bool) -> Result<bool, ApiError> {
        self.record(TransportCall::Pause(paused));
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(paused)
    }

    async fn resume(&self) -> Result<ResumeOutcome, ApiError> {
        self.record(TransportCall::Resume);
        let behavior = *self.resume.lock().unwrap();
        match behavior {
            ResumeBehavior::Resumed(outcome) => Ok(outcome),
            ResumeBehavior::NothingLoaded => Err(ApiError::Precondition {
                message: "Nothing is loaded".to_string(),
            }),
            ResumeBehavior::Fail => Err(offline()),
        }
    }

    async fn seek(&self, position_sec: f64) -> Result<f64, ApiError> {
        self.record(TransportCall::Seek(position_sec));
        if self.fail_seek.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(position_sec)
    }

    async fn set_volume(&self, volume: u8) -> Result<u8, ApiError> {
        self.record(TransportCall::Volume(volume));
        if self.fail_volume.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(volume)
    }

    async fn get_state(&self) -> Result<RemoteState, ApiError> {
        self.record(TransportCall::GetState);
        Ok(*self.remote.lock().unwrap())
    }
}

pub fn catalog_track(id: &str, track_no: u32, duration_sec: f64) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        title: format!("Song {id}"),
        track_artist: Some("The Band".to_string()),
        track_no: Some(track_no),
        duration_sec: Some(duration_sec),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MockCatalog {
    albums: HashMap<String, Vec<CatalogTrack>>,
    playlists: HashMap<String, Vec<CatalogTrack>>,
    favourites: Vec<CatalogTrack>,
    details: HashMap<String, CatalogTrack>,
    list_delay: Option<Duration>,
    fail_lists: bool,
    list_requests: AtomicUsize,
}

impl MockCatalog {
    /// Registers the album's tracks for list and detail lookups
    pub fn with_album(mut self, album_id: &str, tracks: Vec<CatalogTrack>) -> Self {
        for track in &tracks {
            let detailed = CatalogTrack {
                album_id: Some(album_id.to_string()),
                album: Some(CatalogAlbum {
                    id: Some(album_id.to_string()),
                    title: Some("Record".to_string()),
                    cover_art_path: Some(format!("/covers/{album_id}.jpg")),
                    ..Default::default()
                }),
                ..track.clone()
            };
            self.details.insert(track.id.clone(), detailed);
        }
        self.albums.insert(album_id.to_string(), tracks);
        self
    }

    pub fn with_playlist(mut self, playlist_id: &str, tracks: Vec<CatalogTrack>) -> Self {
        self.playlists.insert(playlist_id.to_string(), tracks);
        self
    }

    pub fn with_favourites(mut self, tracks: Vec<CatalogTrack>) -> Self {
        self.favourites = tracks;
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn list_requests(&self) -> usize {
        self.list_requests.load(Ordering::SeqCst)
    }

    async fn list(&self, tracks: Option<&Vec<CatalogTrack>>) -> Result<Vec<CatalogTrack>, ApiError> {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lists {
            return Err(offline());
        }
        tracks.cloned().ok_or_else(|| ApiError::Status {
            status: 404,
            message: "Not found".to_string(),
        })
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<CatalogTrack>, ApiError> {
        self.list(self.albums.get(album_id)).await
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<CatalogTrack>, ApiError> {
        self.list(self.playlists.get(playlist_id)).await
    }

    async fn favourite_tracks(&self) -> Result<Vec<CatalogTrack>, ApiError> {
        self.list(Some(&self.favourites)).await
    }

    async fn track(&self, track_id: &str) -> Result<CatalogTrack, ApiError> {
        self.details.get(track_id).cloned().ok_or_else(|| ApiError::Status {
            status: 404,
            message: "Track not found".to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemorySnapshots(Mutex<Vec<NowPlayingSnapshot>>);

impl MemorySnapshots {
    pub fn written(&self) -> Vec<NowPlayingSnapshot> {
        self.0.lock().unwrap().clone()
    }
}

impl SnapshotWriter for MemorySnapshots {
    fn write(&self, snapshot: &NowPlayingSnapshot) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<Route>>);

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.0.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<Route> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl super::Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.0.lock().unwrap().push(route);
    }
}

pub struct Fixture {
    pub controller: NowPlayingController,
    pub transport: Arc<MockTransport>,
    pub catalog: Arc<MockCatalog>,
    pub navigator: Arc<RecordingNavigator>,
    pub snapshots: Arc<MemorySnapshots>,
}

impl Fixture {
    /// Album `a1` with `t1` (200 s) and `t2` (180 s)
    pub fn album() -> Self {
        let catalog = MockCatalog::default().with_album(
            "a1",
            vec![catalog_track("t1", 1, 200.0), catalog_track("t2", 2, 180.0)],
        );
        Self::with(MockTransport::default(), catalog, BrowsingContext::album("a1"))
    }

    pub fn with(transport: MockTransport, catalog: MockCatalog, context: BrowsingContext) -> Self {
        let transport = Arc::new(transport);
        let catalog = Arc::new(catalog);
        let navigator = Arc::new(RecordingNavigator::default());
        let snapshots = Arc::new(MemorySnapshots::default());

        let controller = NowPlayingController::new(
            Collaborators {
                transport: transport.clone(),
                catalog: catalog.clone(),
                navigator: navigator.clone(),
                snapshots: snapshots.clone(),
            },
            context,
            SessionOptions {
                device_name: "Living Room".to_string(),
                image_base_url: "http://pi.local:3000".to_string(),
                timings: Timings::default(),
            },
        );

        Self {
            controller,
            transport,
            catalog,
            navigator,
            snapshots,
        }
    }

    /// Feed navigation requests back into the controller, like the event loop does
    pub async fn pump_routes(&self) {
        for route in self.navigator.take() {
            self.controller.on_route(route.track_id).await;
        }
    }
}
