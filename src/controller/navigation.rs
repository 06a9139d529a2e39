//! Previous/next resolution and the end-of-track transition

use std::sync::atomic::Ordering;

use crate::model::{ContextTrackList, RepeatMode, Route};

use super::{BoundaryWarning, NowPlayingController, PlaybackError, lock, validate_track_id};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Pick the neighbour of `current` in `list`.
///
/// Lookup is by track identity. The ends wrap around only with
/// [`RepeatMode::All`].
pub fn resolve_sibling(
    list: &ContextTrackList,
    current: Option<&str>,
    direction: Direction,
    repeat: RepeatMode,
) -> Result<String, BoundaryWarning> {
    if list.loading {
        return Err(BoundaryWarning::ListLoading);
    }
    if list.is_empty() {
        return Err(BoundaryWarning::ListEmpty);
    }
    let index = current
        .and_then(|id| list.index_of(id))
        .ok_or(BoundaryWarning::TrackNotInList)?;

    let last = list.len() - 1;
    let wrap = repeat == RepeatMode::All;
    let target = match direction {
        Direction::Previous if index > 0 => index - 1,
        Direction::Previous if wrap => last,
        Direction::Previous => return Err(BoundaryWarning::NoPrevious),
        Direction::Next if index < last => index + 1,
        Direction::Next if wrap => 0,
        Direction::Next => return Err(BoundaryWarning::NoNext),
    };
    Ok(list.tracks[target].id.clone())
}

impl NowPlayingController {
    pub async fn go_prev(&self) {
        if let Err(e) = self.step(Direction::Previous).await {
            self.report(e);
        }
    }

    pub async fn go_next(&self) {
        if let Err(e) = self.step(Direction::Next).await {
            self.report(e);
        }
    }

    /// Jump to a track picked from the track list
    pub fn select_track(&self, track_id: &str) {
        match validate_track_id(track_id) {
            Ok(track_id) => self.navigate_to(track_id),
            Err(e) => self.report(e),
        }
    }

    async fn step(&self, direction: Direction) -> Result<(), PlaybackError> {
        let (current, repeat) = {
            let state = self.inner.state.lock().await;
            (state.track_id.clone(), state.repeat)
        };
        let current = current.or_else(|| lock(&self.inner.route_track).clone());
        let target = resolve_sibling(&self.inner.tracks.view(), current.as_deref(), direction, repeat)?;
        self.navigate_to(target);
        Ok(())
    }

    fn navigate_to(&self, track_id: String) {
        if self.is_closed() {
            return;
        }
        tracing::info!(track_id = %track_id, context = %self.inner.context, "Navigating");
        self.inner
            .navigator
            .navigate(Route::new(self.inner.context.clone(), track_id));
    }

    /// Runs at most once per track until a load or seek re-arms it
    pub(crate) async fn handle_track_ended(&self) {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return;
        }

        let (current, repeat) = {
            let state = self.inner.state.lock().await;
            (state.track_id.clone(), state.repeat)
        };
        tracing::debug!(track_id = ?current, ?repeat, "Track ended");

        match repeat {
            RepeatMode::One => self.restart_track().await,
            RepeatMode::Off if current.as_deref().is_some_and(|id| self.inner.tracks.view().is_last(id)) => {
                self.commit(|state| state.is_playing = false).await;
                tracing::info!("Reached the end of the list");
            }
            RepeatMode::Off | RepeatMode::All => self.go_next().await,
        }
    }

    async fn restart_track(&self) {
        let ticket = self.inner.load_generation.current();
        let result = self.inner.transport.seek(0.0).await;
        if !self.inner.load_generation.is_current(ticket) || self.is_closed() {
            return;
        }
        match result {
            Ok(_) => {
                self.inner.clock.reset();
                self.commit(|state| {
                    state.set_position(0.0);
                    state.is_playing = true;
                })
                .await;
                self.inner.ended.store(false, Ordering::SeqCst);
            }
            // The guard stays set; the next seek or load re-arms it
            Err(source) => self.report(PlaybackError::Transient {
                action: "restart track",
                source,
            }),
        }
    }
}
