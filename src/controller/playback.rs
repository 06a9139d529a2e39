//! Track loading, play/pause and state reconciliation

use std::sync::atomic::Ordering;

use crate::model::{NoticeKind, PlaybackState, TrackMetadata};

use super::{NowPlayingController, PlaybackError, lock, validate_track_id};

impl NowPlayingController {
    /// Session entry point: load the context list, seed the volume from the
    /// server, then load the routed track
    pub async fn mount(&self, track_id: Option<String>) {
        tracing::info!(context = %self.inner.context, track_id = ?track_id, "Mounting now-playing session");

        let controller = self.clone();
        tokio::spawn(async move { controller.load_context().await });

        // A bad id is rejected before the player is contacted at all
        let track_id = match routed_track_id(track_id.as_deref()) {
            Ok(id) => id,
            Err(e) => return self.report(e),
        };

        if let Err(e) = self.sync_remote_state().await {
            tracing::warn!(error = %e, "Initial player state sync failed");
        }
        self.on_route(Some(track_id)).await;
    }

    /// Fetch the context track list, replacing the current one
    pub async fn load_context(&self) {
        let context = self.inner.context.clone();
        if let Err(e) = self.inner.tracks.load(&context).await {
            self.report(e);
        }
    }

    /// Route-driven load: track details and playback start run concurrently
    /// under one generation; the track always starts from the beginning
    pub async fn on_route(&self, track_id: Option<String>) {
        let track_id = match routed_track_id(track_id.as_deref()) {
            Ok(id) => id,
            Err(e) => return self.report(e),
        };
        if self.is_closed() {
            return;
        }

        *lock(&self.inner.route_track) = Some(track_id.clone());
        self.inner.seek_debounce.cancel();
        let ticket = self.inner.load_generation.advance();
        tracing::debug!(track_id = %track_id, ticket, "Route changed");

        let (details, started) = tokio::join!(
            self.fetch_details(&track_id, ticket),
            self.start_track(track_id.clone(), 0.0, ticket),
        );
        for error in [details.err(), started.err()].into_iter().flatten() {
            self.report(error);
        }
    }

    /// Load `track_id` on the remote engine at `start_sec`
    pub async fn load_track(&self, track_id: &str, start_sec: f64) {
        let result = match validate_track_id(track_id) {
            Ok(track_id) => {
                self.inner.seek_debounce.cancel();
                let ticket = self.inner.load_generation.advance();
                self.start_track(track_id, start_sec, ticket).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    async fn start_track(&self, track_id: String, start_sec: f64, ticket: u64) -> Result<(), PlaybackError> {
        let result = self.inner.transport.start_track(&track_id, start_sec).await;

        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            tracing::debug!(track_id = %track_id, ticket, "Discarding stale start response");
            return Ok(());
        }
        result.map_err(PlaybackError::transient("start playback"))?;

        let duration = self.resolve_duration(&track_id);
        self.inner.ended.store(false, Ordering::SeqCst);
        self.inner.clock.reset();
        self.commit(|state| {
            state.track_id = Some(track_id.clone());
            state.is_playing = true;
            state.set_duration(duration);
            state.set_position(start_sec);
        })
        .await;

        tracing::info!(track_id = %track_id, start_sec, duration, "Track started");
        Ok(())
    }

    /// Details first, then the context list, else unknown
    fn resolve_duration(&self, track_id: &str) -> f64 {
        let from_details = lock(&self.inner.track)
            .as_ref()
            .filter(|meta| meta.id == track_id)
            .map(|meta| meta.duration_sec)
            .filter(|d| *d > 0.0);

        from_details
            .or_else(|| {
                self.inner
                    .tracks
                    .view()
                    .get(track_id)
                    .map(|t| t.duration_sec)
                    .filter(|d| *d > 0.0)
            })
            .unwrap_or(0.0)
    }

    async fn fetch_details(&self, track_id: &str, ticket: u64) -> Result<(), PlaybackError> {
        let result = self.inner.catalog.track(track_id).await;
        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            tracing::debug!(track_id = %track_id, ticket, "Discarding stale track details");
            return Ok(());
        }

        let meta = TrackMetadata::from_catalog(
            &result.map_err(PlaybackError::transient("load track"))?,
            &self.inner.image_base_url,
        );
        let duration = meta.duration_sec;
        *lock(&self.inner.track) = Some(meta);

        // Details may land after playback started with a fallback duration
        self.commit(|state| {
            if state.is_current(track_id) && duration > 0.0 {
                state.set_duration(duration);
            }
        })
        .await;
        Ok(())
    }

    /// Flip between playing and paused
    pub async fn toggle_playback(&self) {
        let playing = self.inner.state.lock().await.is_playing;
        self.toggle_play(!playing).await;
    }

    /// `play = false` pauses optimistically and rolls back on failure;
    /// `play = true` only changes state once the server confirms
    pub async fn toggle_play(&self, play: bool) {
        let result = if play { self.resume().await } else { self.pause().await };
        if let Err(e) = result {
            self.report(e);
        }
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        let ticket = self.inner.load_generation.current();
        let Some(pre) = self
            .commit(|state| {
                let pre = state.clone();
                state.is_playing = false;
                pre
            })
            .await
        else {
            return Ok(());
        };

        let result = self.inner.transport.pause(true).await;
        if !self.inner.load_generation.is_current(ticket) {
            tracing::debug!("Discarding pause response for a replaced track");
            return Ok(());
        }

        match result {
            Ok(paused) => {
                self.commit(|state| state.is_playing = !paused).await;
                tracing::info!(action = "paused", "Playback toggled");
                Ok(())
            }
            Err(source) => {
                self.commit(|state| rollback_pause(state, &pre)).await;
                Err(PlaybackError::Transient { action: "pause", source })
            }
        }
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        let ticket = self.inner.load_generation.current();
        let result = self.inner.transport.resume().await;
        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            tracing::debug!("Discarding resume response for a replaced track");
            return Ok(());
        }

        match result {
            Ok(outcome) => {
                self.inner.clock.reset();
                self.commit(|state| {
                    state.is_playing = !outcome.paused;
                    if let Some(position) = outcome.position_sec {
                        state.set_position(position);
                    }
                })
                .await;
                tracing::info!(action = "resumed", "Playback toggled");
                Ok(())
            }
            Err(e) if e.is_precondition() => {
                let (track_id, position) = {
                    let state = self.inner.state.lock().await;
                    (state.track_id.clone(), state.position_sec)
                };
                let Some(track_id) = track_id.or_else(|| lock(&self.inner.route_track).clone()) else {
                    return Err(PlaybackError::Validation("Nothing to play.".to_string()));
                };
                tracing::info!(track_id = %track_id, position, reason = %e, "Nothing loaded remotely, reloading track");
                self.load_track(&track_id, position).await;
                Ok(())
            }
            Err(source) => Err(PlaybackError::Transient {
                action: "resume playback",
                source,
            }),
        }
    }

    /// Adopt the server's authoritative state and report failures
    pub async fn resync(&self) {
        match self.sync_remote_state().await {
            Ok(()) => self.notify(NoticeKind::Ok, "Synced with player."),
            Err(e) => self.report(e),
        }
    }

    async fn sync_remote_state(&self) -> Result<(), PlaybackError> {
        let ticket = self.inner.load_generation.current();
        let remote = self
            .inner
            .transport
            .get_state()
            .await
            .map_err(PlaybackError::transient("sync player state"))?;

        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            tracing::debug!("Discarding player state issued before a newer load");
            return Ok(());
        }

        let volume = remote.volume.min(100);
        let adopt_volume = !self.inner.volume_debounce.is_pending();
        let adopt_position = !self.inner.seek_debounce.is_pending();
        if adopt_volume {
            self.inner.volume_debounce.mark_sent(volume);
        }
        self.inner.clock.reset();
        self.commit(|state| {
            if adopt_volume {
                state.volume = volume;
            }
            if state.track_id.is_none() {
                return;
            }
            if remote.duration_sec.is_finite() && remote.duration_sec > 0.0 {
                state.set_duration(remote.duration_sec);
            }
            state.is_playing = !remote.paused;
            if adopt_position {
                state.set_position(remote.position_sec);
            }
        })
        .await;

        tracing::debug!(paused = remote.paused, position = remote.position_sec, volume, "Adopted player state");
        Ok(())
    }

    pub async fn cycle_repeat(&self) {
        if let Some(repeat) = self
            .commit(|state| {
                state.repeat = state.repeat.next();
                state.repeat
            })
            .await
        {
            tracing::debug!(?repeat, "Repeat mode changed");
            self.notify(NoticeKind::Ok, repeat.label());
        }
    }

    pub async fn toggle_shuffle(&self) {
        if let Some(shuffle) = self
            .commit(|state| {
                state.shuffle = !state.shuffle;
                state.shuffle
            })
            .await
        {
            tracing::debug!(shuffle, "Shuffle toggled");
            self.notify(NoticeKind::Ok, if shuffle { "Shuffle: On" } else { "Shuffle: Off" });
        }
    }
}

/// Undo an optimistic pause
fn rollback_pause(state: &mut PlaybackState, pre: &PlaybackState) {
    if state.track_id == pre.track_id {
        state.is_playing = pre.is_playing;
    }
}

fn routed_track_id(track_id: Option<&str>) -> Result<String, PlaybackError> {
    match track_id {
        Some(id) => validate_track_id(id),
        None => Err(PlaybackError::Validation("No track selected.".to_string())),
    }
}
