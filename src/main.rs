use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use perfwatch::config::AppConfig;
use perfwatch::data::duration::parse_duration;
use perfwatch::logging::{self, LogTarget};
use perfwatch::server::Server;
use perfwatch::{events, ui, App, HttpBackend, MetricsFetcher};

#[derive(Parser, Debug)]
#[command(name = "perfwatch")]
#[command(about = "Terminal dashboard for web-performance metrics")]
struct Args {
    /// Configuration file (TOML). Defaults to ./perfwatch.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the metrics backend
    #[arg(short, long, conflicts_with = "serve")]
    backend: Option<String>,

    /// Poll interval (e.g., "5s", "500ms")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Log file used while the dashboard is running
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Fetch one snapshot, write it to a JSON file and exit
    #[arg(short, long, conflicts_with = "serve")]
    export: Option<PathBuf>,

    /// Run the development backend, optionally on ADDR
    #[arg(long, value_name = "ADDR", num_args = 0..=1)]
    serve: Option<Option<String>>,

    /// Grafana origin for the development backend's /grafana proxy
    #[arg(long, requires = "serve")]
    grafana_origin: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Handle serve mode (development backend)
    if let Some(addr) = &args.serve {
        let listen_addr = addr.clone().unwrap_or_else(|| config.server.listen_addr.clone());
        logging::init(&config.log_level, LogTarget::Stderr)?;
        return serve(&listen_addr, &config.server.grafana_origin);
    }

    // Handle export mode (non-interactive)
    if let Some(export_path) = &args.export {
        logging::init(&config.log_level, LogTarget::Stderr)?;
        return export_to_file(&config, export_path);
    }

    logging::init(&config.log_level, LogTarget::File(config.log_file.clone()))?;
    run_tui(&config)
}

/// Layer CLI flags over the loaded configuration.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;

    if let Some(backend) = &args.backend {
        config.backend_url = backend.clone();
    }
    if let Some(refresh) = &args.refresh {
        let interval = parse_duration(refresh)?;
        config.poll_interval_ms = u64::try_from(interval.as_millis())
            .context("refresh interval is too large")?;
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = log_file.clone();
    }
    if let Some(origin) = &args.grafana_origin {
        config.server.grafana_origin = origin.clone();
    }
    if let Some(Some(addr)) = &args.serve {
        config.server.listen_addr = addr.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Run the development backend until interrupted
fn serve(listen_addr: &str, grafana_origin: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = Server::bind(listen_addr, grafana_origin).await?;
        eprintln!("Serving on http://{}", server.local_addr()?);
        tokio::select! {
            result = server.run() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                Ok(())
            }
        }
    })
}

/// Run the TUI against the configured backend
fn run_tui(config: &AppConfig) -> Result<()> {
    // The poller and async actions need a runtime; the UI loop stays on this thread
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let backend = Arc::new(HttpBackend::with_timeout(
        &config.backend_url,
        config.request_timeout(),
    )?);
    info!(backend = %config.backend_url, interval_ms = config.poll_interval_ms, "starting dashboard");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(backend, config.poll_interval());

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        warn!(error = %e, "dashboard exited with error");
    }
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        app.process_events();

        terminal.draw(|frame| ui::render(frame, app))?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, ui::TABS_ROW),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Export one metrics snapshot to a JSON file
fn export_to_file(config: &AppConfig, export_path: &Path) -> Result<()> {
    let backend = HttpBackend::with_timeout(&config.backend_url, config.request_timeout())?;
    let rt = tokio::runtime::Runtime::new()?;
    let snapshot = rt
        .block_on(backend.fetch_metrics())
        .with_context(|| format!("failed to fetch metrics from {}", config.backend_url))?;

    let export = serde_json::json!({
        "backend": config.backend_url,
        "exported_at": chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "latest": {
            "score": snapshot.latest_score(),
            "lcp": snapshot.latest_lcp(),
            "tbt": snapshot.latest_tbt(),
            "inp": snapshot.latest_inp(),
        },
        "metrics": snapshot,
    });

    let json = serde_json::to_string_pretty(&export)?;
    std::fs::write(export_path, json)
        .with_context(|| format!("failed to write {}", export_path.display()))?;

    println!("Exported metrics to: {}", export_path.display());
    Ok(())
}
