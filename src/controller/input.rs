//! Key event handling

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::time::Instant;

use crate::model::{Scrub, UiState};

use super::NowPlayingController;

const SCRUB_STEP_SEC: f64 = 5.0;
/// A scrub gesture is committed once the arrows have been idle this long
pub const SCRUB_COMMIT_AFTER: Duration = Duration::from_millis(400);
const VOLUME_STEP: i32 = 5;

impl NowPlayingController {
    /// Run a remote operation without blocking the event loop
    fn spawn_op<F, Fut>(&self, op: F)
    where
        F: FnOnce(NowPlayingController) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(op(self.clone()));
    }

    pub async fn handle_key_event(&self, key: KeyEvent, ui: &mut UiState) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            ui.should_quit = true;
            return Ok(());
        }

        // Track list sheet captures navigation keys while open
        if ui.show_track_list {
            let tracks = self.inner.tracks.view();
            match key.code {
                KeyCode::Up => {
                    ui.track_list_selected = ui.track_list_selected.saturating_sub(1);
                    return Ok(());
                }
                KeyCode::Down => {
                    if ui.track_list_selected + 1 < tracks.len() {
                        ui.track_list_selected += 1;
                    }
                    return Ok(());
                }
                KeyCode::Enter => {
                    if let Some(track) = tracks.tracks.get(ui.track_list_selected) {
                        self.select_track(&track.id);
                    }
                    ui.show_track_list = false;
                    return Ok(());
                }
                KeyCode::Esc | KeyCode::Char('t') | KeyCode::Char('T') => {
                    ui.show_track_list = false;
                    return Ok(());
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                ui.should_quit = true;
            }
            // Play/Pause toggle
            KeyCode::Char(' ') => {
                self.spawn_op(|c| async move { c.toggle_playback().await });
            }
            KeyCode::Left => {
                self.scrub(ui, -SCRUB_STEP_SEC).await;
            }
            KeyCode::Right => {
                self.scrub(ui, SCRUB_STEP_SEC).await;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let volume = self.state().await.volume as i32;
                self.set_volume(volume + VOLUME_STEP).await;
            }
            KeyCode::Char('-') => {
                let volume = self.state().await.volume as i32;
                self.set_volume(volume - VOLUME_STEP).await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.spawn_op(|c| async move { c.go_next().await });
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.spawn_op(|c| async move { c.go_prev().await });
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.cycle_repeat().await;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.toggle_shuffle().await;
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                let tracks = self.inner.tracks.view();
                let current = self.state().await.track_id;
                ui.track_list_selected = current.and_then(|id| tracks.index_of(&id)).unwrap_or(0);
                ui.show_track_list = true;
            }
            KeyCode::Char('g') | KeyCode::Char('G') => {
                self.spawn_op(|c| async move { c.resync().await });
            }
            KeyCode::Enter => {
                self.dismiss_notice();
            }
            _ => {}
        }
        Ok(())
    }

    /// Arrow keys emulate dragging the seek bar: each press moves the
    /// playhead locally, the gesture is committed when the keys go idle
    async fn scrub(&self, ui: &mut UiState, delta_sec: f64) {
        let state = self.state().await;
        if state.track_id.is_none() {
            return;
        }
        let from = ui.scrub.map_or(state.position_sec, |s| s.target_sec);
        let target = (from + delta_sec).clamp(0.0, state.duration_sec.max(0.0));
        ui.scrub = Some(Scrub {
            target_sec: target,
            last_input: Instant::now(),
        });
        self.seek(target).await;
    }

    /// Commit a scrub gesture whose keys have been idle long enough
    pub fn finish_idle_scrub(&self, ui: &mut UiState) {
        let Some(scrub) = ui.scrub else {
            return;
        };
        if scrub.last_input.elapsed() < SCRUB_COMMIT_AFTER {
            return;
        }
        ui.scrub = None;
        let target = scrub.target_sec;
        tracing::debug!(target, "Committing scrub gesture");
        self.spawn_op(move |c| async move { c.seek_end(target).await });
    }
}
