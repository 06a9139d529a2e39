mod api;
mod config;
mod controller;
mod logging;
mod model;
mod view;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::UnboundedReceiver;

use api::{ApiClient, CatalogClient, PlayerClient};
use config::Config;
use controller::{ChannelNavigator, Collaborators, NowPlayingController, SessionOptions};
use model::{BrowsingContext, FileSnapshotStore, NowPlayingSnapshot, Route, UiState};
use view::AppView;

const USAGE: &str = "usage:
  nowplaying-rs play album <album-id> <track-id>
  nowplaying-rs play playlist <playlist-id> <track-id>
  nowplaying-rs play favourites <track-id>
  nowplaying-rs status";

#[derive(Debug, PartialEq)]
enum Command {
    Play {
        context: BrowsingContext,
        track_id: String,
    },
    Status,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        ["status"] => Command::Status,
        ["play", "album", album_id, track_id] => Command::Play {
            context: BrowsingContext::album(*album_id),
            track_id: track_id.to_string(),
        },
        ["play", "playlist", playlist_id, track_id] => Command::Play {
            context: BrowsingContext::playlist(*playlist_id),
            track_id: track_id.to_string(),
        },
        ["play", "favourites", track_id] => Command::Play {
            context: BrowsingContext::favourites(),
            track_id: track_id.to_string(),
        },
        _ => bail!("{}", USAGE),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    let config = Config::load();

    match command {
        Command::Status => {
            print_status(FileSnapshotStore::new(&config.snapshot_path).read());
            Ok(())
        }
        Command::Play { context, track_id } => play(config, context, track_id).await,
    }
}

fn print_status(snapshot: Option<NowPlayingSnapshot>) {
    let Some(snapshot) = snapshot else {
        println!("Nothing has been played yet.");
        return;
    };
    let playback = &snapshot.playback;
    let state = if playback.is_playing { "Playing" } else { "Paused" };
    println!("{}: {} - {}", state, snapshot.track.title, snapshot.track.artist);
    println!("Album: {}", snapshot.track.album);
    println!(
        "Position: {:.0}s / {:.0}s  Volume: {}%",
        playback.position_sec, playback.duration_sec, playback.volume
    );
    println!("Device: {}", snapshot.device_name);
    if let Some(updated_at) = snapshot.updated_at {
        println!("Updated: {}", updated_at.to_rfc3339());
    }
}

async fn play(config: Config, context: BrowsingContext, track_id: String) -> Result<()> {
    tracing::info!("=== nowplaying-rs starting ===");
    let api = ApiClient::new(&config.api_base_url, config.api_timeout)
        .context("Failed to build the HTTP client")?;
    tracing::info!(
        api = %api.base_url(),
        device = %config.device_name,
        %context,
        track_id = %track_id,
        "Session configuration"
    );
    let (navigator, routes) = ChannelNavigator::new();

    let controller = NowPlayingController::new(
        Collaborators {
            transport: Arc::new(PlayerClient::new(api.clone())),
            catalog: Arc::new(CatalogClient::new(api)),
            navigator: Arc::new(navigator),
            snapshots: Arc::new(FileSnapshotStore::new(&config.snapshot_path)),
        },
        context,
        SessionOptions {
            device_name: config.device_name.clone(),
            image_base_url: config.image_base_url.clone(),
            timings: config.timings(),
        },
    );

    let controller_for_mount = controller.clone();
    tokio::spawn(async move {
        controller_for_mount.mount(Some(track_id)).await;
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &controller, routes).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    controller.shutdown();

    if let Err(err) = &res {
        tracing::error!(error = ?err, "Application error");
    }
    tracing::info!("nowplaying-rs shutting down");
    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &NowPlayingController,
    mut routes: UnboundedReceiver<Route>,
) -> Result<()> {
    let mut ui_state = UiState::default();

    loop {
        // Feed navigation requests back into the controller
        while let Ok(route) = routes.try_recv() {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.on_route(route.track_id).await;
            });
        }

        controller.finish_idle_scrub(&mut ui_state);

        let info = controller.info().await;
        terminal.draw(|f| {
            AppView::render(f, &info, &ui_state);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key, &mut ui_state).await?;
            }
        }

        if ui_state.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parses_play_commands() {
        assert_eq!(
            parse_args(&args("play album a1 t3")).unwrap(),
            Command::Play {
                context: BrowsingContext::album("a1"),
                track_id: "t3".into()
            }
        );
        assert_eq!(
            parse_args(&args("play playlist p9 t1")).unwrap(),
            Command::Play {
                context: BrowsingContext::playlist("p9"),
                track_id: "t1".into()
            }
        );
        assert_eq!(
            parse_args(&args("play favourites t7")).unwrap(),
            Command::Play {
                context: BrowsingContext::favourites(),
                track_id: "t7".into()
            }
        );
        assert_eq!(parse_args(&args("status")).unwrap(), Command::Status);
    }

    #[test]
    fn rejects_incomplete_commands() {
        for line in ["", "play", "play album a1", "play favourites", "stop", "status now"] {
            let err = parse_args(&args(line)).unwrap_err();
            assert!(err.to_string().contains("usage:"), "{line}");
        }
    }
}
