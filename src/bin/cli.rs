//! auto-rerun command line
//!
//! Watches a page in Chrome and reruns failed generations, scans saved
//! snapshots offline, and manages the configuration file.

use anyhow::{Context, Result, bail};
use auto_rerun::config::store::DEFAULT_CONFIG_FILE;
use auto_rerun::{BrowserSession, ButtonLocator, ChromePage, Config, ConfigStore, ConnectionOptions, DomTree,
                 ErrorClassifier, LaunchOptions, Monitor, SystemClock};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Parser)]
#[command(name = "auto-rerun")]
#[command(version)]
#[command(about = "Automatically reruns failed AI generations in the browser", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Enable debug logging (also enabled by `debug: true` in the config)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open or attach to Chrome and watch the page for failed generations
    Watch(WatchArgs),

    /// Run the detectors against a saved DOM snapshot
    Scan {
        /// Snapshot JSON as produced by the DOM snapshot script
        #[arg(value_name = "SNAPSHOT.json")]
        snapshot: PathBuf,
    },

    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct WatchArgs {
    /// Page to open before watching (default: watch the current tab)
    url: Option<String>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long)]
    no_sandbox: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Update fields; values are JSON, bare words are taken as strings
    Set {
        #[arg(value_name = "KEY=VALUE", required = true)]
        pairs: Vec<String>,
    },

    /// Print the JSON Schema of the configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = ConfigStore::load(&cli.config).with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(cli.debug || store.config().debug);
    log::debug!("Configuration from {}", cli.config.display());

    match cli.command {
        Command::Watch(args) => watch(store.config().clone(), args).await,
        Command::Scan { snapshot } => scan(store.config(), &snapshot),
        Command::Config { action } => configure(store, action),
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "info,auto_rerun=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

async fn watch(config: Config, args: WatchArgs) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));

    let signal_flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, shutting down");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    // CDP calls block, so the monitor lives on a blocking thread
    let worker_flag = shutdown.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let session = open_session(&args)?;
        if let Some(url) = &args.url {
            session.navigate(url)?;
            session.wait_for_navigation()?;
        }

        let page = ChromePage::from_session(&session)?;
        let mut monitor = Monitor::new(config, page, SystemClock::new())?;
        monitor.run(&worker_flag)?;
        Ok(())
    })
    .await??;

    Ok(())
}

fn open_session(args: &WatchArgs) -> Result<BrowserSession> {
    if let Some(endpoint) = &args.ws_endpoint {
        return BrowserSession::connect(ConnectionOptions::new(endpoint.clone()))
            .with_context(|| format!("Failed to connect to {}", endpoint));
    }

    let mut options = LaunchOptions::new().headless(!args.headed).sandbox(!args.no_sandbox);
    if let Some(path) = &args.chrome_path {
        options = options.chrome_path(path.clone());
    }
    if let Some(dir) = &args.user_data_dir {
        options = options.user_data_dir(dir.clone());
    }
    BrowserSession::launch(options).context("Failed to launch Chrome")
}

fn scan(config: &Config, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tree = DomTree::from_json(&raw)?;

    let classifier = ErrorClassifier::from_config(config);
    let locator = ButtonLocator::from_config(config);

    let detections = classifier.scan(&tree, 0);
    let visible_error = classifier.find_visible_error(&tree).map(|node| node.node_ref.to_string());
    let candidate = locator.locate(&tree, &classifier);

    let report = json!({
        "elements": tree.count_elements(),
        "interactive": tree.count_interactive(),
        "detections": detections,
        "visible_error": visible_error,
        "candidate": candidate,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn configure(mut store: ConfigStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.config().to_value())?);
        }
        ConfigAction::Set { pairs } => {
            let mut patch = Map::new();
            for pair in &pairs {
                let Some((key, raw)) = pair.split_once('=') else {
                    bail!("Expected KEY=VALUE, got '{}'", pair);
                };
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                patch.insert(key.trim().to_string(), value);
            }

            let report = store.update(&Value::Object(patch))?;
            for key in &report.applied {
                println!("set {}", key);
            }
            for (key, reason) in &report.rejected {
                eprintln!("rejected {}: {}", key, reason);
            }
            if !report.is_clean() {
                bail!("{} field(s) rejected", report.rejected.len());
            }
        }
        ConfigAction::Schema => {
            let schema = schemars::schema_for!(Config);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}
