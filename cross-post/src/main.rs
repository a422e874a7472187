//! cross-post - one-shot cross-posting from the command line

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use libcrosscast::config::{self, Config, DefaultsConfig};
use libcrosscast::logging::{self, LogFormat};
use libcrosscast::platforms::create_destination;
use libcrosscast::settings::SettingsStore;
use libcrosscast::types::{ImageMimeType, InlineImage, MediaItem};
use libcrosscast::{
    CrosscastError, CrosspostRequest, Dispatcher, PostContent, Result, TomlSettingsStore,
};

#[derive(Parser, Debug)]
#[command(name = "cross-post")]
#[command(version)]
#[command(about = "Cross-post content to configured destinations", long_about = None)]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Target specific destination(s) (comma-separated)
    #[arg(short, long)]
    target: Option<String>,

    /// Attach an image file (repeatable)
    #[arg(short, long, value_name = "FILE")]
    media: Vec<PathBuf>,

    /// Alt text for the attached images, in order (repeatable)
    #[arg(long, value_name = "TEXT")]
    alt: Vec<String>,

    /// Validate stored credentials instead of posting
    #[arg(long)]
    verify: bool,

    /// Clear the stored token for a destination and exit
    #[arg(long, value_name = "PLATFORM")]
    clear_token: Option<String>,

    /// Config file path (defaults to the XDG location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(LogFormat::Text, if cli.verbose { "debug" } else { "error" });

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::resolve_config_path()?,
    };
    let store = Arc::new(TomlSettingsStore::new(&config_path));

    if let Some(platform) = &cli.clear_token {
        store.clear_token(platform).await?;
        println!("Cleared stored {} token", platform);
        return Ok(());
    }

    let targets = resolve_targets(&cli, &config_path)?;

    if cli.verify {
        return verify_targets(store.as_ref(), &targets).await;
    }

    let text = match &cli.content {
        Some(content) => content.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map_err(|e| {
                CrosscastError::InvalidInput(format!("failed to read stdin: {}", e))
            })?;
            buffer
        }
    };

    let media = load_media(&cli)?;
    let content = PostContent::new(text, media)
        .ok_or_else(|| CrosscastError::InvalidInput("content is empty".to_string()))?;

    let request = CrosspostRequest::new(content, targets);
    let dispatcher = Dispatcher::new(store, None);
    let result = dispatcher.crosspost(&request).await;

    match cli.format.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        ),
        _ => {
            for (target, outcome) in &result.per_target {
                if outcome.success {
                    println!(
                        "{}: posted ({})",
                        target,
                        outcome.post_id.as_deref().unwrap_or("-")
                    );
                } else if let Some(e) = &outcome.error {
                    println!("{}: failed: {}", target, e);
                } else {
                    println!("{}: skipped (disabled or not configured)", target);
                }
            }
        }
    }

    if result.any_success() {
        Ok(())
    } else {
        match result.first_error() {
            Some(e) => Err(e.clone().into()),
            None => Err(CrosscastError::InvalidInput(
                "no targeted destination is enabled".to_string(),
            )),
        }
    }
}

fn resolve_targets(cli: &Cli, config_path: &Path) -> Result<BTreeSet<String>> {
    if let Some(raw) = &cli.target {
        let targets: BTreeSet<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if targets.is_empty() {
            return Err(CrosscastError::InvalidInput(
                "no targets given".to_string(),
            ));
        }
        return Ok(targets);
    }

    let defaults = Config::load_from_path(config_path)
        .map(|c| c.defaults.targets)
        .unwrap_or_else(|_| DefaultsConfig::default().targets);
    Ok(defaults.into_iter().collect())
}

fn load_media(cli: &Cli) -> Result<Vec<MediaItem>> {
    let mut items = Vec::new();
    for (index, path) in cli.media.iter().enumerate() {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mime = ImageMimeType::from_extension(extension).ok_or_else(|| {
            CrosscastError::InvalidInput(format!("unsupported image type: {}", path.display()))
        })?;
        let bytes = std::fs::read(path).map_err(|e| {
            CrosscastError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let alt_text = cli.alt.get(index).cloned().unwrap_or_default();
        items.push(MediaItem::from_inline(InlineImage::new(mime, bytes), alt_text));
    }
    Ok(items)
}

/// Check each targeted destination's stored token against its
/// `verify_credentials` endpoint.
async fn verify_targets(store: &TomlSettingsStore, targets: &BTreeSet<String>) -> Result<()> {
    let http = reqwest::Client::new();
    let mut failed = false;

    for target in targets {
        let Some(settings) = store.load(target).await else {
            println!("{}: not configured", target);
            failed = true;
            continue;
        };
        if !settings.enabled {
            println!("{}: disabled", target);
            continue;
        }
        if !settings.has_token() {
            println!("{}: no token stored", target);
            failed = true;
            continue;
        }

        match create_destination(target, &settings, &http) {
            Some(Ok(destination)) => match destination.verify_credentials().await {
                Ok(()) => println!("{}: token valid", target),
                Err(e) => {
                    println!("{}: {}", target, e);
                    failed = true;
                }
            },
            Some(Err(e)) => {
                println!("{}: {}", target, e);
                failed = true;
            }
            None => {
                println!("{}: unknown destination", target);
                failed = true;
            }
        }
    }

    if failed {
        Err(CrosscastError::InvalidInput(
            "credential check failed".to_string(),
        ))
    } else {
        Ok(())
    }
}
