use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

mod app;
mod config;
mod modules;
mod ui;

use app::App;
use config::Config;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_tracing();
    let config = Config::load()?;
    let mut app = App::new(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "exited with error");
        eprintln!("Error: {:?}", err);
    }
    tracing::info!("shutdown");

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| {
            app.viewport = f.area();
            ui::draw(f, app)
        })?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let event = event::read()?;
        let now = app.elapsed();
        if app.handle_event(event, now) {
            return Ok(());
        }
    }
}

/// Logs to a file because the terminal belongs to the UI. `HERALD_LOG_DIR`
/// overrides the cache directory; with neither available logging stays off.
fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let (log_dir, file_name) = match std::env::var("HERALD_LOG_DIR").ok().map(PathBuf::from) {
        Some(dir) => (dir, format!("herald.{}.log", std::process::id())),
        None => match dirs::cache_dir() {
            Some(dir) => (dir.join("herald"), "herald.log".to_string()),
            None => return,
        },
    };
    if fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let log_path = log_dir.join(file_name);
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("herald=info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(path = ?log_path, "tracing initialised");
}
