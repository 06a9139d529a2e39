//! Layout rendering (header bar, now-playing card)

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Wrap},
    Frame,
};

use crate::model::{ContextKind, PlaybackInfo};

fn context_label(info: &PlaybackInfo) -> String {
    let kind = match info.context.kind {
        ContextKind::Album => "Album",
        ContextKind::Playlist => "Playlist",
        ContextKind::Favourites => "Favourites",
        ContextKind::Unknown => "Now Playing",
    };
    match (&info.track, info.context.kind) {
        (Some(track), ContextKind::Album) => format!("{}: {}", kind, track.album),
        _ => match &info.context.container_id {
            Some(id) => format!("{} {}", kind, id),
            None => kind.to_string(),
        },
    }
}

pub fn render_header(frame: &mut Frame, area: Rect, info: &PlaybackInfo) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Context
            Constraint::Length(28), // Device name
        ])
        .split(area);

    let list_status = if info.tracks.loading {
        " (loading tracks...)".to_string()
    } else if !info.tracks.is_empty() {
        format!(" ({} tracks)", info.tracks.len())
    } else {
        String::new()
    };

    let context = Paragraph::new(format!("{}{}", context_label(info), list_status))
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Playing from ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(context, chunks[0]);

    let device = Paragraph::new(format!("🎵 {}", info.device_name))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Device "));
    frame.render_widget(device, chunks[1]);
}

pub fn render_card(frame: &mut Frame, area: Rect, info: &PlaybackInfo) {
    let loaded = info.state.track_id.as_deref();
    // Metadata of a previous track is never shown for the loaded one
    let track = info.track.as_ref().filter(|t| Some(t.id.as_str()) == loaded);

    let lines = match (loaded, track) {
        (None, _) => vec![Line::from(Span::styled(
            "Nothing playing",
            Style::default().fg(Color::DarkGray),
        ))],
        (Some(_), None) => vec![Line::from(Span::styled(
            "Loading track...",
            Style::default().fg(Color::DarkGray),
        ))],
        (Some(_), Some(track)) => {
            let mut title = vec![Span::styled(
                track.title.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )];
            if track.is_explicit {
                title.push(Span::styled(" [E]", Style::default().fg(Color::Yellow)));
            }

            let mut lines = vec![
                Line::from(title),
                Line::from(Span::styled(track.artist.clone(), Style::default().fg(Color::Green))),
                Line::from(Span::styled(track.album.clone(), Style::default().fg(Color::Gray))),
            ];
            if !track.artwork_url.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("Artwork: {}", track.artwork_url),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            lines
        }
    };

    // Center the text block vertically inside the card
    let inner_height = area.height.saturating_sub(2);
    let top_pad = inner_height.saturating_sub(lines.len() as u16) / 2;

    let card = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Now Playing ")
                .padding(Padding::new(1, 1, top_pad, 0)),
        );
    frame.render_widget(card, area);
}
