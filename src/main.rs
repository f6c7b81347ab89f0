mod action;
mod app;
mod command;
mod config;
mod error;
mod event;
mod forge;
mod git;
mod github;
mod image_art;
mod list_window;
mod markdown;
mod page;
mod progress;
mod tui;
mod types;
mod ui;

use std::fs::{self, File, OpenOptions};
use std::panic;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::config::Config;
use crate::event::Event;
use crate::forge::Forge;
use crate::github::GitHub;
use crate::tui::EventHandler;

fn log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("remgit");
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("remgit.log"))
        .ok()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // The terminal belongs to the UI, so prefer a file
    match log_file() {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let config = Arc::new(Config::load());
    tracing::debug!(?config, "configuration loaded");

    let forge: Arc<dyn Forge> = Arc::new(GitHub::new(config.token.clone())?);
    tracing::info!(forge = forge.name(), "starting");

    let result = run(forge, config).await;

    tui::restore()?;

    result
}

async fn run(forge: Arc<dyn Forge>, config: Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(forge, config, action_tx.clone())?;

    let tick_rate = Duration::from_millis(100);
    let render_rate = Duration::from_millis(16); // ~60fps
    let mut events = EventHandler::new(tick_rate, render_rate);

    let outcome: Result<(), Box<dyn std::error::Error>> = loop {
        tokio::select! {
            Some(event) = events.next() => {
                if event.is_quit() {
                    break Ok(());
                }

                match event {
                    Event::Render => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &app)) {
                            break Err(e.into());
                        }
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                if let Err(e) = app.update(action) {
                    tracing::error!(error = %e, "controller failed");
                    break Err(e.into());
                }
            }
        }

        if app.should_quit {
            break Ok(());
        }
    };

    app.shutdown();
    outcome
}
