//! cross-watch - watch a compose page and cross-post detected submits

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use libcrosscast::bridge::{FsPageBridge, PageBridge};
use libcrosscast::capture::capture_content;
use libcrosscast::config::{self, Config};
use libcrosscast::logging::{self, LogFormat};
use libcrosscast::{
    ComposeWatcher, Dispatcher, LogNotifier, TomlSettingsStore, WatcherConfig,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cross-watch")]
#[command(version)]
#[command(about = "Watch a compose page and cross-post detected submits")]
#[command(long_about = "\
cross-watch - compose page watcher

DESCRIPTION:
    cross-watch polls a DOM snapshot of the compose page (kept updated
    by a companion capture helper), detects the moment the user submits
    a post, and republishes the captured text and media to the
    configured destinations.

USAGE:
    # Watch the snapshot file named in the config
    cross-watch

    # Watch an explicit snapshot with a 250ms poll
    cross-watch --page /tmp/compose.html --poll-interval 250ms

    # Dump what would be captured right now and exit
    cross-watch --capture-once

SIGNALS:
    SIGTERM, SIGINT - graceful shutdown (an in-flight post finishes)

CONFIGURATION:
    Configuration file: ~/.config/crosscast/config.toml

    [destinations.mastodon]
    enabled = true
    token = \"...\"
    instance = \"mastodon.social\"

    [watch]
    page = \"/tmp/compose.html\"
    raster_dir = \"/tmp/compose-media\"
    poll_interval_ms = 500
")]
struct Cli {
    /// Page snapshot file to watch (overrides config)
    #[arg(long, value_name = "FILE")]
    page: Option<PathBuf>,

    /// Directory of rasterized media keyed by source URL (overrides config)
    #[arg(long, value_name = "DIR")]
    raster_dir: Option<PathBuf>,

    /// Poll interval, e.g. "500ms" or "2s" (overrides config)
    #[arg(long, value_name = "DURATION")]
    poll_interval: Option<String>,

    /// Target specific destination(s) (comma-separated)
    #[arg(short, long)]
    target: Option<String>,

    /// Capture the page once, print the payload as JSON, and exit
    #[arg(long)]
    capture_once: bool,

    /// Config file path (defaults to the XDG location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        logging::init(LogFormat::Text, "debug");
    } else {
        logging::init_default();
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::resolve_config_path().context("cannot resolve config path")?,
    };
    let config = if config_path.exists() {
        Config::load_from_path(&config_path)
            .with_context(|| format!("cannot load config from {:?}", config_path))?
    } else {
        Config::default_config()
    };

    let page = cli
        .page
        .clone()
        .or_else(|| expand_path(config.watch.page.as_deref()))
        .context("no page snapshot to watch; pass --page or set [watch].page")?;
    let raster_dir = cli
        .raster_dir
        .clone()
        .or_else(|| expand_path(config.watch.raster_dir.as_deref()));

    let bridge = Arc::new(FsPageBridge::new(&page, raster_dir));

    if cli.capture_once {
        return capture_once(bridge.as_ref()).await;
    }

    let poll_interval = match &cli.poll_interval {
        Some(raw) => humantime::parse_duration(raw).context("invalid --poll-interval")?,
        None => Duration::from_millis(config.watch.poll_interval_ms),
    };
    let targets = resolve_targets(&cli, &config);
    anyhow::ensure!(!targets.is_empty(), "no destinations targeted");

    let store = Arc::new(TomlSettingsStore::new(&config_path));
    let dispatcher = Dispatcher::new(store, Some(bridge.clone() as Arc<dyn PageBridge>));
    let mut watcher = ComposeWatcher::new(
        bridge,
        dispatcher,
        Box::new(LogNotifier),
        WatcherConfig {
            poll_interval,
            targets,
        },
    );

    info!("cross-watch starting on {:?}", page);
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    watcher.run(shutdown).await?;
    info!("cross-watch stopped");
    Ok(())
}

fn expand_path(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(|p| PathBuf::from(shellexpand::tilde(p).to_string()))
}

fn resolve_targets(cli: &Cli, config: &Config) -> BTreeSet<String> {
    match &cli.target {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => config.defaults.targets.iter().cloned().collect(),
    }
}

/// Dump the current capture as JSON; the re-capture the popup used to
/// trigger on demand.
async fn capture_once(bridge: &FsPageBridge) -> anyhow::Result<()> {
    let html = bridge.snapshot().await.context("cannot read snapshot")?;
    match capture_content(&html, bridge).await {
        Some(content) => println!("{}", serde_json::to_string_pretty(&content)?),
        None => eprintln!("No capturable content on the page"),
    }
    Ok(())
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("signal setup failed")?;

    // Spawn thread to handle signals
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    Ok(())
}
