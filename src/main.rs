use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use webrss_client::api::{Backend, HttpBackend};
use webrss_client::app::App;
use webrss_client::config::Config;
use webrss_client::keybindings::KeybindingRegistry;
use webrss_client::sync::SyncController;
use webrss_client::ui;

#[derive(Parser, Debug)]
#[command(name = "webrss", about = "Terminal client for the webrss RSS reader")]
struct Args {
    /// Config file (default: ~/.config/webrss/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server URL, overriding the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Start at a location, e.g. `10-example-feed` or `search=rust`
    #[arg(long, value_name = "PATH")]
    open: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print categories and feeds with unread counts, then exit
    #[arg(long)]
    list: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let config_path = match args.config.clone().or_else(Config::default_path) {
        Some(path) => path,
        None => anyhow::bail!("HOME is not set; pass --config"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let mut backend =
        HttpBackend::new(config.client_options()).context("Failed to create HTTP client")?;
    if let Some((username, password)) = config.credentials() {
        backend
            .login(&username, &password)
            .await
            .with_context(|| format!("Login failed for '{}'", username))?;
        tracing::info!(user = %username, "Logged in");
    }

    if args.list {
        let categories = backend
            .list_categories()
            .await
            .context("Failed to fetch categories")?;
        for category in &categories {
            let unread: i64 = category.feeds.iter().map(|f| f.unread.max(0)).sum();
            println!("{} ({})", category.title, unread);
            for feed in &category.feeds {
                println!("  {:>5}  {} ({})", feed.id, feed.feed_title, feed.unread.max(0));
            }
        }
        return Ok(());
    }

    let (controller, events) = SyncController::new(Arc::new(backend), config.poll_interval());
    let controller = controller.with_location(args.open.as_deref().unwrap_or("/"));

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
    }

    let mut app = App::new(controller, keybindings);
    app.user_name = config.username.clone().unwrap_or_default();
    app.controller.load_categories(false);

    ui::run(&mut app, events).await?;

    println!("Goodbye!");
    Ok(())
}
