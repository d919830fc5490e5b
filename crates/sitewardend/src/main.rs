//! sitewardend - The sitewarden native host
//!
//! This is the main entry point for the sitewardend service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Core engine
//! - Browser adapter (native messaging over stdin/stdout)
//! - Alarm scheduler

use anyhow::{Context, Result};
use clap::Parser;
use sitewarden_config::{SeedConfig, load_config_or_default};
use sitewarden_core::{CoreEngine, CoreInput, EffectExecutor, PersistQueue};
use sitewarden_host_api::{AlarmScheduler, BrowserHost};
use sitewarden_host_native::{NativeBrowserHost, TokioAlarmScheduler};
use sitewarden_ipc::NativeMessagingServer;
use sitewarden_store::{SqliteStore, Store};
use sitewarden_util::{
    SITEWARDEN_CONFIG_ENV, SITEWARDEN_DATA_DIR_ENV, default_config_path, is_mock_time_active,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// sitewardend - Site blocking native host for the sitewarden extension
#[derive(Parser, Debug)]
#[command(name = "sitewardend")]
#[command(about = "Site blocking native host for the sitewarden extension", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/sitewarden/config.toml)
    #[arg(short, long, env = SITEWARDEN_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set SITEWARDEN_DATA_DIR env var)
    #[arg(short, long, env = SITEWARDEN_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "SITEWARDEN_LOG_JSON")]
    log_json: bool,

    /// Arguments passed by the browser: the calling extension's origin,
    /// or a manifest path and extension id
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    browser_args: Vec<String>,
}

impl Args {
    /// Origin of the calling extension, if the browser passed one
    fn extension_origin(&self) -> Option<&str> {
        self.browser_args
            .first()
            .map(String::as_str)
            .filter(|arg| arg.contains("://"))
    }
}

/// Main service state
struct Service {
    engine: CoreEngine,
    store: Arc<dyn Store>,
    browser: Arc<NativeBrowserHost>,
    alarms: Arc<TokioAlarmScheduler>,
    executor: EffectExecutor,
    seed: SeedConfig,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(config_path = %args.config.display(), "Configuration loaded");

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("sitewarden.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Browser adapter over stdin/stdout
        let server = NativeMessagingServer::stdio();
        let browser = Arc::new(
            NativeBrowserHost::new(server, config.extension.command_timeout)
                .await
                .context("Failed to start browser adapter")?,
        );

        let alarms = Arc::new(TokioAlarmScheduler::new());

        let pages = config.extension.page_urls(args.extension_origin());
        if !pages.block_page.contains("://") {
            warn!(
                block_page = %pages.block_page,
                "Block page is relative and no extension origin was given"
            );
        }

        let engine = CoreEngine::new(pages, config.whitelist.cleanup_period);
        let persist = PersistQueue::start(store.clone(), config.persistence.clone());
        let executor = EffectExecutor::new(browser.clone(), alarms.clone(), persist);

        Ok(Self {
            engine,
            store,
            browser,
            alarms,
            executor,
            seed: config.seed,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut browser_events = self.browser.subscribe();
        let mut alarm_events = self.alarms.subscribe();

        let effects = self
            .engine
            .initialize(self.store.as_ref(), &self.seed, sitewarden_util::now())
            .context("Failed to load state from store")?;
        self.executor.execute(effects);

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // Browser events; the stream ends when the extension disconnects
                message = browser_events.recv() => {
                    let Some(message) = message else {
                        info!("Browser disconnected, shutting down");
                        break;
                    };
                    if let Some(input) = CoreInput::from_browser(message) {
                        self.dispatch(input);
                    }
                }

                // Local timers
                Some(fired) = alarm_events.recv() => {
                    self.dispatch(fired.into());
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down sitewardend");
        if !self.store.is_healthy() {
            warn!("Store unhealthy at shutdown, pending writes may be lost");
        }
        self.executor.shutdown().await;

        info!("Shutdown complete");
        Ok(())
    }

    /// Tab commands are left running so the loop is back in `select!` at once
    fn dispatch(&mut self, input: CoreInput) {
        debug!(input = ?input, "Handling input");
        let effects = self.engine.handle(input, sitewarden_util::now());
        self.executor.execute(effects);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for native-messaging frames
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "sitewardend starting");
    if is_mock_time_active() {
        warn!(now = %sitewarden_util::now(), "Mock time is active");
    }

    // Create and run the service
    let service = Service::new(&args).await?;
    service.run().await
}
