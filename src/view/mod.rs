//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Header and now-playing card
//! - `progress`: Seek bar with playback modes and volume
//! - `overlays`: Notice toast, track list sheet, key help

mod utils;
mod layout;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{PlaybackInfo, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, info: &PlaybackInfo, ui_state: &UiState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Context + device
                Constraint::Min(0),    // Now-playing card
                Constraint::Length(3), // Seek bar
                Constraint::Length(1), // Key hints
            ])
            .split(frame.area());

        layout::render_header(frame, chunks[0], info);
        layout::render_card(frame, chunks[1], info);

        // While scrubbing, show where the playhead will land
        let position = ui_state.scrub.map_or(info.state.position_sec, |s| s.target_sec);
        progress::render_progress_bar(frame, chunks[2], info, position, ui_state.scrub.is_some());

        overlays::render_key_hints(frame, chunks[3]);

        if ui_state.show_track_list {
            overlays::render_track_list(frame, info, ui_state.track_list_selected);
        }

        if let Some(notice) = &info.notice {
            overlays::render_notice(frame, notice);
        }
    }
}
