//! Terminal dashboard that polls utility outages for the configured addresses.

mod app;
mod input;
mod ui;

use std::{
    env,
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vypadek_core::{
    aggregator::OutageAggregator,
    config::{LoggingConfig, OutageConfig},
    signal::{OutageSignal, SignalAdapter},
};
use vypadek_provider_cez as cez;

use crate::app::App;
use crate::input::Action;

const DEFAULT_CONFIG: &str = "vypadek.toml";
const DEFAULT_LOG_FILTER: &str = "info";
// How often the host asks for an update; the refresh interval decides whether
// that touches the network.
const SCAN_INTERVAL: StdDuration = StdDuration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = OutageConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_logging(&config.logging)?;

    // HTTP + core setup
    let client = cez::build_client(&config.request)?;
    let pool = cez::pool(&client, &config)?;
    let adapter = SignalAdapter::for_pool(config.name.clone(), &pool);
    let aggregator = Arc::new(OutageAggregator::new(pool, config.refresh_interval()));

    info!(
        unique_id = adapter.unique_id(),
        refresh_rate = config.refresh_rate,
        "starting outage monitor"
    );

    let (signal_tx, signal_rx) = watch::channel(adapter.project(&aggregator.snapshot()));
    let poller = tokio::spawn(poll(Arc::clone(&aggregator), adapter, signal_tx));

    // App state
    let app = App::new(aggregator, signal_rx);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app);

    poller.abort();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

/// Host timer: ask for an update every scan interval and publish the signal.
async fn poll(
    aggregator: Arc<OutageAggregator>,
    adapter: SignalAdapter,
    signal_tx: watch::Sender<OutageSignal>,
) {
    let mut ticker = tokio::time::interval(SCAN_INTERVAL);
    loop {
        ticker.tick().await;
        let signal = adapter.update(&aggregator).await;
        if signal_tx.send(signal).is_err() {
            break;
        }
    }
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.sync_signal();
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (small timeout so new signals show up quickly)
        if event::poll(StdDuration::from_millis(200))?
            && let CEvent::Key(key) = event::read()?
        {
            match input::handle_key_event(key, &mut app) {
                Action::Quit => break,
                Action::None => {}
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    // stdout belongs to the dashboard, so logs only go to a file
    let Some(path) = logging.file.as_deref() else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| {
        EnvFilter::new(logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
