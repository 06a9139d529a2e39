//! Overlay rendering (notice toast, track list sheet, key hints)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::model::{Notice, NoticeKind, PlaybackInfo};
use super::utils::{calculate_num_width, format_duration, render_scrollable_list, truncate_string};

fn notice_style(kind: NoticeKind) -> (Color, &'static str) {
    match kind {
        NoticeKind::Ok => (Color::Green, " Info "),
        NoticeKind::Warn => (Color::Yellow, " Warning "),
        NoticeKind::Error => (Color::Red, " Error (Enter to dismiss) "),
    }
}

pub fn render_notice(frame: &mut Frame, notice: &Notice) {
    let area = frame.area();

    let popup_width = 52.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize;

    let line_count = notice.message.chars().count().div_ceil(inner_width) as u16;
    let popup_height = (2 + line_count.max(1)).min(area.height.saturating_sub(4));

    // Toast sits just above the seek bar
    let popup_area = Rect {
        x: area.width.saturating_sub(popup_width) / 2,
        y: area.height.saturating_sub(popup_height + 5),
        width: popup_width,
        height: popup_height,
    };

    frame.render_widget(Clear, popup_area);

    let (color, title) = notice_style(notice.kind);
    let widget = Paragraph::new(notice.message.clone())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title)
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        );

    frame.render_widget(widget, popup_area);
}

pub fn render_track_list(frame: &mut Frame, info: &PlaybackInfo, selected: usize) {
    let area = frame.area();
    let list = &info.tracks;

    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = (list.len().max(1) as u16 + 2).min(area.height.saturating_sub(4)).max(3);
    let popup_area = Rect {
        x: area.width.saturating_sub(popup_width) / 2,
        y: area.height.saturating_sub(popup_height) / 2,
        width: popup_width,
        height: popup_height,
    };

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Tracks (↑↓ Enter Esc) ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Black));

    if list.is_empty() {
        let text = if list.loading { "Loading..." } else { "No tracks in this list." };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, popup_area);
        return;
    }

    let num_width = calculate_num_width(list.len());
    // borders + number column + duration column + spacing
    let title_width = (popup_width as usize).saturating_sub(num_width + 12);
    let current = info.state.track_id.as_deref();

    let items: Vec<ListItem> = list
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let is_current = current == Some(track.id.as_str());
            let marker = if is_current { "▶" } else { " " };
            let duration = if track.duration_sec > 0.0 {
                format_duration(track.duration_sec)
            } else {
                "--:--".to_string()
            };
            let text = format!(
                "{}{:>width$} {} {:>5}",
                marker,
                track.position_hint,
                truncate_string(&track.title, title_width),
                duration,
                width = num_width,
            );

            let style = if i == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else if is_current {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    render_scrollable_list(frame, popup_area, items, selected, block);
}

pub fn render_key_hints(frame: &mut Frame, area: Rect) {
    let hints = [
        ("Space", "play/pause"),
        ("←/→", "seek"),
        ("N/P", "next/prev"),
        ("+/-", "volume"),
        ("R", "repeat"),
        ("S", "shuffle"),
        ("T", "tracks"),
        ("G", "sync"),
        ("Q", "quit"),
    ];

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(
                    format!(" {}", key),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {} ", desc), Style::default().fg(Color::DarkGray)),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
