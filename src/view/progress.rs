//! Seek bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::PlaybackInfo;
use super::utils::format_duration;

pub fn render_progress_bar(
    frame: &mut Frame,
    area: Rect,
    info: &PlaybackInfo,
    position_sec: f64,
    scrubbing: bool,
) {
    let state = &info.state;

    let status_text = match &info.track {
        _ if state.track_id.is_none() => " No track playing".to_string(),
        Some(track) if state.is_playing => format!(" ▶ {} | {}", track.title, track.artist),
        Some(track) => format!("⏸  {} | {}", track.title, track.artist),
        None if state.is_playing => " ▶ ...".to_string(),
        None => "⏸  ...".to_string(),
    };

    let shuffle_text = if state.shuffle { "Shuffle: On" } else { "Shuffle: Off" };
    let volume_text = format!("Vol: {}%", state.volume);

    let duration = if state.duration_sec > 0.0 {
        format_duration(state.duration_sec)
    } else {
        format_duration(f64::NAN)
    };
    let time_str = format!("{} / {}", format_duration(position_sec), duration);

    let progress_ratio = if state.duration_sec > 0.0 {
        (position_sec / state.duration_sec).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let title = format!("{} ", status_text);
    let controls_info = format!(" {} | {} | {} ", shuffle_text, state.repeat.label(), volume_text);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(if scrubbing { Color::Yellow } else { Color::Green }))
        .ratio(progress_ratio)
        .label(time_str);

    frame.render_widget(gauge, area);
}
