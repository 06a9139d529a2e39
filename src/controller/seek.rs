//! Seek and volume: immediate local update, debounced remote write

use std::sync::atomic::Ordering;

use super::{NowPlayingController, PlaybackError};

impl NowPlayingController {
    /// Move the playhead locally and schedule a debounced remote seek
    pub async fn seek(&self, target_sec: f64) {
        let position = self
            .commit(|state| {
                state.track_id.as_ref()?;
                state.set_position(target_sec);
                Some(state.position_sec)
            })
            .await
            .flatten();

        if let Some(position) = position {
            self.inner.seek_debounce.schedule(position);
        }
    }

    /// Commit a seek gesture: cancel any pending debounced seek and send now.
    ///
    /// Committing within the end epsilon counts as reaching the end of the track.
    pub async fn seek_end(&self, final_sec: f64) {
        self.inner.seek_debounce.cancel();

        let Some((position, duration)) = self
            .commit(|state| {
                state.track_id.as_ref()?;
                state.set_position(final_sec);
                Some((state.position_sec, state.duration_sec))
            })
            .await
            .flatten()
        else {
            return;
        };

        let ticket = self.inner.load_generation.current();
        let result = self.inner.transport.seek(position).await;
        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            tracing::debug!(position, "Discarding seek response for a replaced track");
            return;
        }
        if let Err(source) = result {
            return self.report(PlaybackError::Transient { action: "seek", source });
        }

        self.inner.clock.reset();
        self.commit(|state| state.set_position(position)).await;
        tracing::debug!(position, duration, "Seek committed");

        let near_end = duration > 0.0 && position >= (duration - self.inner.timings.end_epsilon_sec).max(0.0);
        if near_end {
            self.handle_track_ended().await;
        } else {
            self.inner.ended.store(false, Ordering::SeqCst);
        }
    }

    /// Set the volume locally and schedule a debounced remote write
    pub async fn set_volume(&self, volume: i32) {
        let volume = volume.clamp(0, 100) as u8;
        if self.commit(|state| state.volume = volume).await.is_some() {
            self.inner.volume_debounce.schedule(volume);
        }
    }

    /// Debounced seek send; resolves to whether the server accepted it
    pub(crate) async fn send_seek(&self, position_sec: f64) -> bool {
        let ticket = self.inner.load_generation.current();
        let result = self.inner.transport.seek(position_sec).await;
        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            return false;
        }
        match result {
            Ok(_) => {
                self.inner.clock.reset();
                self.inner.ended.store(false, Ordering::SeqCst);
                true
            }
            Err(source) => {
                self.report(PlaybackError::Transient { action: "seek", source });
                false
            }
        }
    }

    /// Debounced volume send; resolves to whether the server accepted it
    pub(crate) async fn send_volume(&self, volume: u8) -> bool {
        match self.inner.transport.set_volume(volume).await {
            Ok(applied) => {
                tracing::debug!(volume, applied, "Volume applied");
                true
            }
            Err(source) => {
                self.report(PlaybackError::Transient {
                    action: "set volume",
                    source,
                });
                false
            }
        }
    }
}
