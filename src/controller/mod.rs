//! Controller module - Now-playing synchronization
//!
//! This module owns the playback state and keeps it in step with the remote
//! playback engine. It is organized into submodules by responsibility:
//!
//! - `playback`: Track loading, play/pause/resume and state resync
//! - `seek`: Debounced seek and volume
//! - `navigation`: Previous/next resolution and the end-of-track transition
//! - `context`: Track list of the browsing context
//! - `clock`: Local position estimate between authoritative syncs
//! - `debounce`: Latest-value debouncer and request generations
//! - `input`: Key event handling for the terminal front-end

mod clock;
mod context;
mod debounce;
mod input;
mod navigation;
mod playback;
mod seek;

#[cfg(test)]
mod testing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::api::{ApiError, Catalog, PlayerTransport};
use crate::model::{
    BrowsingContext, Notice, NoticeKind, PersistenceMirror, PlaybackInfo, PlaybackState, Route,
    SnapshotWriter, TrackMetadata,
};

use clock::{ClockDriver, LocalPlaybackClock};
use context::TrackContextLoader;
use debounce::{Generation, LatestValueDebouncer};

/// Tuning constants of the synchronization core
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timings {
    pub seek_debounce: Duration,
    pub volume_debounce: Duration,
    pub tick: Duration,
    /// A committed seek this close to the end counts as reaching it
    pub end_epsilon_sec: f64,
    pub notice_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            seek_debounce: Duration::from_millis(140),
            volume_debounce: Duration::from_millis(160),
            tick: Duration::from_millis(250),
            end_epsilon_sec: 0.25,
            notice_ttl: Duration::from_millis(3200),
        }
    }
}

/// Receives route changes requested by the controller (prev/next, track list)
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Forwards routes to the event loop, which feeds them back into `on_route`
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        if self.tx.send(route).is_err() {
            tracing::debug!("Route receiver closed, dropping navigation request");
        }
    }
}

/// Previous/next cannot be resolved against the context list
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BoundaryWarning {
    #[error("Track list is still loading.")]
    ListLoading,
    #[error("No tracks in this list.")]
    ListEmpty,
    #[error("Current track is not in this list.")]
    TrackNotInList,
    #[error("Already at the first track.")]
    NoPrevious,
    #[error("Already at the last track.")]
    NoNext,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to {action}: {source}")]
    Transient {
        action: &'static str,
        source: ApiError,
    },
    #[error("failed to load track list: {0}")]
    TrackList(#[source] ApiError),
    #[error(transparent)]
    Boundary(#[from] BoundaryWarning),
}

impl PlaybackError {
    pub(crate) fn transient(action: &'static str) -> impl FnOnce(ApiError) -> Self {
        move |source| PlaybackError::Transient { action, source }
    }

    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            PlaybackError::Boundary(_) => NoticeKind::Warn,
            _ => NoticeKind::Error,
        }
    }
}

/// Message shown to the user for a playback error
pub(crate) fn format_error(error: &PlaybackError) -> String {
    match error {
        PlaybackError::Validation(message) => message.clone(),
        PlaybackError::Boundary(warning) => warning.to_string(),
        PlaybackError::Transient { action, source } => {
            server_message(source).unwrap_or_else(|| format!("Failed to {action}."))
        }
        PlaybackError::TrackList(source) => server_message(source)
            .unwrap_or_else(|| "Failed to load track list for previous/next navigation.".to_string()),
    }
}

/// The server's own explanation reads better than ours
fn server_message(source: &ApiError) -> Option<String> {
    match source {
        ApiError::Status { message, .. } | ApiError::Precondition { message } => Some(message.clone()),
        ApiError::InvalidInput(message) => Some(message.clone()),
        ApiError::Request(e) if e.is_timeout() => Some("Music server did not respond in time.".to_string()),
        ApiError::Request(e) if e.is_connect() => Some("Music server is unreachable.".to_string()),
        _ => None,
    }
}

/// The single transient notice, auto-dismissed after `ttl`
pub(crate) struct NoticeBoard {
    ttl: Duration,
    slot: StdMutex<Option<Notice>>,
}

impl NoticeBoard {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: StdMutex::new(None),
        }
    }

    pub(crate) fn post(&self, kind: NoticeKind, message: impl Into<String>) {
        *lock(&self.slot) = Some(Notice {
            kind,
            message: message.into(),
            raised_at: Instant::now(),
        });
    }

    pub(crate) fn current(&self) -> Option<Notice> {
        let mut slot = lock(&self.slot);
        if slot.as_ref().is_some_and(|n| n.raised_at.elapsed() >= self.ttl) {
            *slot = None;
        }
        slot.clone()
    }

    pub(crate) fn dismiss(&self) {
        *lock(&self.slot) = None;
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// External collaborators of a controller session
pub struct Collaborators {
    pub transport: Arc<dyn PlayerTransport>,
    pub catalog: Arc<dyn Catalog>,
    pub navigator: Arc<dyn Navigator>,
    pub snapshots: Arc<dyn SnapshotWriter>,
}

/// Per-session settings that are not timing related
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub device_name: String,
    /// Base that relative artwork paths are resolved against
    pub image_base_url: String,
    pub timings: Timings,
}

pub(crate) struct Inner {
    transport: Arc<dyn PlayerTransport>,
    catalog: Arc<dyn Catalog>,
    navigator: Arc<dyn Navigator>,
    mirror: PersistenceMirror,
    timings: Timings,
    image_base_url: String,
    context: BrowsingContext,

    state: Mutex<PlaybackState>,
    track: StdMutex<Option<TrackMetadata>>,
    /// Track requested by the last route, loaded or not
    route_track: StdMutex<Option<String>>,
    notices: NoticeBoard,
    tracks: TrackContextLoader,
    clock: ClockDriver,
    seek_debounce: LatestValueDebouncer<f64>,
    volume_debounce: LatestValueDebouncer<u8>,

    load_generation: Generation,
    ended: AtomicBool,
    closed: AtomicBool,
}

/// Owns the playback state of one browsing context and drives the remote engine.
///
/// Cloning is cheap; all clones share the same session. Background tasks
/// (debounce timers, the clock) only hold weak references, so dropping the
/// last handle tears the session down.
#[derive(Clone)]
pub struct NowPlayingController {
    inner: Arc<Inner>,
}

impl NowPlayingController {
    pub fn new(deps: Collaborators, context: BrowsingContext, options: SessionOptions) -> Self {
        let timings = options.timings;
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let seek_target = weak.clone();
            let seek_debounce = LatestValueDebouncer::new(timings.seek_debounce, move |position: f64| {
                let weak = seek_target.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => NowPlayingController { inner }.send_seek(position).await,
                        None => false,
                    }
                }
                .boxed()
            });

            let volume_target = weak.clone();
            let volume_debounce = LatestValueDebouncer::new(timings.volume_debounce, move |volume: u8| {
                let weak = volume_target.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => NowPlayingController { inner }.send_volume(volume).await,
                        None => false,
                    }
                }
                .boxed()
            })
            .deduplicated();

            Inner {
                transport: deps.transport,
                catalog: Arc::clone(&deps.catalog),
                navigator: deps.navigator,
                mirror: PersistenceMirror::new(deps.snapshots, options.device_name),
                timings,
                image_base_url: options.image_base_url,
                context,
                state: Mutex::new(PlaybackState::default()),
                track: StdMutex::new(None),
                route_track: StdMutex::new(None),
                notices: NoticeBoard::new(timings.notice_ttl),
                tracks: TrackContextLoader::new(deps.catalog),
                clock: ClockDriver::new(timings.tick),
                seek_debounce,
                volume_debounce,
                load_generation: Generation::default(),
                ended: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }
        });

        Self { inner }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.state.lock().await.clone()
    }

    /// Everything the view needs for one frame
    pub async fn info(&self) -> PlaybackInfo {
        let state = self.state().await;
        PlaybackInfo {
            state,
            track: lock(&self.inner.track).clone(),
            context: self.inner.context.clone(),
            tracks: self.inner.tracks.view(),
            notice: self.inner.notices.current(),
            device_name: self.inner.mirror.device_name().to_string(),
        }
    }

    pub fn dismiss_notice(&self) {
        self.inner.notices.dismiss();
    }

    /// Stop every background task and invalidate in-flight requests.
    ///
    /// Responses that arrive afterwards are discarded and no state mutation
    /// happens past this point.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(context = %self.inner.context, "Shutting down now-playing session");
        self.inner.clock.stop();
        self.inner.seek_debounce.cancel();
        self.inner.volume_debounce.cancel();
        self.inner.load_generation.advance();
        self.inner.tracks.invalidate();
    }

    /// Mutate the state, mirror it and start or stop the clock to match;
    /// a no-op once the session is closed.
    ///
    /// The clock decision is made under the state lock so concurrent commits
    /// leave it matching the last state. The snapshot is written after release.
    pub(crate) async fn commit<R>(&self, f: impl FnOnce(&mut PlaybackState) -> R) -> Option<R> {
        let (result, pending) = {
            let mut state = self.inner.state.lock().await;
            if self.is_closed() {
                return None;
            }
            let result = f(&mut state);
            let pending = self
                .inner
                .mirror
                .stage(&state, lock(&self.inner.track).as_ref(), &self.inner.context);
            self.sync_clock(state.is_playing && state.duration_sec > 0.0);
            (result, pending)
        };

        if let Some(pending) = pending {
            self.inner.mirror.flush(pending);
        }
        Some(result)
    }

    fn sync_clock(&self, ticking: bool) {
        if !ticking || self.is_closed() {
            self.inner.clock.stop();
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        self.inner.clock.ensure_running(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => NowPlayingController { inner }.on_tick().await,
                    None => false,
                }
            }
            .boxed()
        });
    }

    /// Advance the local position; resolves to `false` once ticking should stop.
    ///
    /// A tick that finds playback stopped tears the clock down under the state
    /// lock, so a concurrent resume always starts a fresh one.
    async fn on_tick(&self) -> bool {
        let elapsed = self.inner.clock.take_elapsed();
        let reached_end = self
            .commit(|state| {
                if !state.is_playing || state.duration_sec <= 0.0 {
                    return None;
                }
                let next = LocalPlaybackClock::advance(state.position_sec, state.duration_sec, elapsed);
                state.set_position(next);
                Some(state.position_sec >= state.duration_sec)
            })
            .await
            .flatten();

        match reached_end {
            None => false,
            Some(true) if !self.inner.ended.load(Ordering::SeqCst) => {
                let controller = self.clone();
                tokio::spawn(async move { controller.handle_track_ended().await });
                true
            }
            Some(_) => true,
        }
    }

    /// Surface an error as a notice
    pub(crate) fn report(&self, error: PlaybackError) {
        if self.is_closed() {
            return;
        }
        match &error {
            PlaybackError::Boundary(warning) => tracing::info!(%warning, "Navigation unavailable"),
            PlaybackError::Validation(message) => tracing::warn!(%message, "Rejected playback request"),
            PlaybackError::Transient { .. } | PlaybackError::TrackList(_) => {
                tracing::error!(error = %error, "Playback request failed")
            }
        }
        self.inner.notices.post(error.notice_kind(), format_error(&error));
    }

    pub(crate) fn notify(&self, kind: NoticeKind, message: impl Into<String>) {
        if !self.is_closed() {
            self.inner.notices.post(kind, message);
        }
    }
}

pub(crate) fn validate_track_id(track_id: &str) -> Result<String, PlaybackError> {
    let track_id = track_id.trim();
    if track_id.is_empty() {
        return Err(PlaybackError::Validation("No track selected.".to_string()));
    }
    Ok(track_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn format_error_prefers_server_message() {
        let error = PlaybackError::Transient {
            action: "seek",
            source: ApiError::Status {
                status: 503,
                message: "mpv is not running".into(),
            },
        };
        assert_eq!(format_error(&error), "mpv is not running");

        let error = PlaybackError::Transient {
            action: "seek",
            source: ApiError::Decode(serde_json::from_str::<u8>("x").unwrap_err()),
        };
        assert_eq!(format_error(&error), "Failed to seek.");
        assert_eq!(error.notice_kind(), NoticeKind::Error);

        let warning = PlaybackError::from(BoundaryWarning::NoNext);
        assert_eq!(format_error(&warning), "Already at the last track.");
        assert_eq!(warning.notice_kind(), NoticeKind::Warn);
    }

    #[tokio::test(start_paused = true)]
    async fn notices_expire_after_ttl() {
        let board = NoticeBoard::new(Duration::from_millis(3200));
        board.post(NoticeKind::Ok, "Saved");
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(board.current().map(|n| n.message), Some("Saved".to_string()));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(board.current().is_none());

        board.post(NoticeKind::Warn, "Again");
        board.dismiss();
        assert!(board.current().is_none());
    }

    #[tokio::test]
    async fn channel_navigator_forwards_routes() {
        let (navigator, mut rx) = ChannelNavigator::new();
        navigator.navigate(Route::new(BrowsingContext::album("a1"), "t2"));
        let route = rx.recv().await.unwrap();
        assert_eq!(route.track_id.as_deref(), Some("t2"));
        assert_eq!(route.context.album_id(), Some("a1"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_background_work() {
        let fixture = Fixture::album();
        fixture.controller.on_route(Some("t1".into())).await;
        assert!(fixture.controller.inner.clock.is_running());

        fixture.controller.seek(30.0).await;
        fixture.controller.set_volume(80).await;
        fixture.controller.shutdown();
        assert!(!fixture.controller.inner.clock.is_running());

        let before = fixture.controller.state().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fixture.controller.state().await, before, "no tick after shutdown");
        assert_eq!(fixture.transport.seeks(), Vec::<f64>::new());
        assert_eq!(fixture.transport.volumes(), Vec::<u8>::new());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clock_follows_the_last_committed_state() {
        let fixture = Fixture::album();
        fixture.controller.on_route(Some("t1".into())).await;

        for round in 0..200 {
            let tasks: Vec<_> = (0..4)
                .map(|i| {
                    let controller = fixture.controller.clone();
                    let play = (round + i) % 2 == 0;
                    tokio::spawn(async move { controller.commit(|state| state.is_playing = play).await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            let playing = fixture.controller.state().await.is_playing;
            assert_eq!(fixture.controller.inner.clock.is_running(), playing, "round {round}");
        }
    }

    #[derive(Default)]
    struct GatedSnapshots {
        gate: StdMutex<()>,
        entered: AtomicBool,
    }

    impl SnapshotWriter for GatedSnapshots {
        fn write(&self, _snapshot: &crate::model::NowPlayingSnapshot) -> anyhow::Result<()> {
            self.entered.store(true, Ordering::SeqCst);
            let _open = self.gate.lock().unwrap();
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_snapshot_write_does_not_hold_the_state() {
        let snapshots = Arc::new(GatedSnapshots::default());
        let controller = NowPlayingController::new(
            Collaborators {
                transport: Arc::new(MockTransport::default()),
                catalog: Arc::new(MockCatalog::default()),
                navigator: Arc::new(RecordingNavigator::default()),
                snapshots: snapshots.clone(),
            },
            BrowsingContext::album("a1"),
            SessionOptions::default(),
        );

        let closed = snapshots.gate.lock().unwrap();
        let writer = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller
                    .commit(|state| {
                        state.track_id = Some("t1".into());
                        state.volume = 20;
                    })
                    .await
            }
        });
        while !snapshots.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let state = tokio::time::timeout(Duration::from_secs(1), controller.state())
            .await
            .expect("state is readable while the snapshot is being written");
        assert_eq!(state.volume, 20);

        drop(closed);
        writer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_last_handle_stops_clock() {
        let fixture = Fixture::album();
        fixture.controller.on_route(Some("t1".into())).await;
        let weak = Arc::downgrade(&fixture.controller.inner);
        let Fixture { controller, .. } = fixture;
        drop(controller);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(weak.upgrade().is_none());
    }
}
