// # cfddnsd - Cloudflare DDNS Daemon
//
// The daemon is a thin integration layer. All reconciliation logic lives in
// cfddns-core; this binary only:
// 1. Loads the TOML config file and applies environment overrides
// 2. Initializes logging and the runtime
// 3. Wires the HTTP IP source and the Cloudflare provider into the engine
// 4. Runs the scheduler until SIGTERM or SIGINT
//
// ## Configuration
//
// The config file path comes from `CFDDNS_CONFIG` (default `cfddns.toml`).
// These environment variables override or extend the file:
//
// - `CFDDNS_API_KEY`: Cloudflare API key or token
// - `CFDDNS_EMAIL`: Account email (switches to global API key auth)
// - `CFDDNS_IP_URL`: IPv4 echo service (default https://api.ipify.org)
// - `CFDDNS_MODE`: `dry-run` logs intended writes without performing them
// - `CFDDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CFDDNS_CONFIG=/etc/cfddns/cfddns.toml
// export CFDDNS_API_KEY=your_token
//
// cfddnsd
// ```

use anyhow::{Context, Result};
use cfddns_core::{
    CfddnsConfig, RandomInterval, Reconciler, RecordRegistry, Scheduler, Synchronizer,
};
use cfddns_ip_http::{DEFAULT_IP_URL, HttpIpSource};
use cfddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default config file, relative to the working directory
const DEFAULT_CONFIG_PATH: &str = "cfddns.toml";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum CfddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CfddnsExitCode> for ExitCode {
    fn from(code: CfddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Settings taken from the process environment
#[derive(Debug)]
struct Settings {
    config_path: PathBuf,
    api_key: Option<String>,
    email: Option<String>,
    ip_url: Option<String>,
    mode: Option<String>,
    log_level: Option<String>,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            config_path: var("CFDDNS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            api_key: var("CFDDNS_API_KEY"),
            email: var("CFDDNS_EMAIL"),
            ip_url: var("CFDDNS_IP_URL"),
            mode: var("CFDDNS_MODE"),
            log_level: var("CFDDNS_LOG_LEVEL"),
        }
    }

    /// Whether writes should be logged instead of performed
    fn dry_run(&self) -> Result<bool> {
        match self.mode.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => Ok(false),
            Some("dry-run") | Some("dry_run") => Ok(true),
            Some(other) => anyhow::bail!(
                "CFDDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        }
    }

    /// IPv4 echo service to query
    fn ip_url(&self) -> &str {
        self.ip_url.as_deref().unwrap_or(DEFAULT_IP_URL)
    }

    /// Resolve the log level
    ///
    /// `CFDDNS_LOG_LEVEL` wins; otherwise `verbose = true` selects debug.
    fn log_level(&self, verbose: bool) -> Result<Level> {
        let Some(level) = &self.log_level else {
            return Ok(if verbose { Level::DEBUG } else { Level::INFO });
        };

        match level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "CFDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                level
            ),
        }
    }

    /// Read the config file, apply overrides and validate the result
    fn load_config(&self) -> Result<CfddnsConfig> {
        let mut config = CfddnsConfig::read(&self.config_path)
            .with_context(|| format!("cannot load {}", self.config_path.display()))?;

        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut CfddnsConfig) {
        if let Some(key) = &self.api_key {
            config.cloudflare.api_key = key.clone();
        }
        if let Some(email) = &self.email {
            config.cloudflare.email = Some(email.clone());
        }
    }
}

fn main() -> ExitCode {
    let settings = Settings::from_env();

    let dry_run = match settings.dry_run() {
        Ok(dry_run) => dry_run,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    let config = match settings.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    let log_level = match settings.log_level(config.verbose) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CfddnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd daemon");
    info!(
        "Configuration loaded from {}: {} hostname(s)",
        settings.config_path.display(),
        config.global.hostnames.len()
    );
    if dry_run {
        warn!("Dry-run mode: DNS records will not be modified");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CfddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let mut scheduler = match build_scheduler(&config, &settings, dry_run).await {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return CfddnsExitCode::ConfigError;
            }
        };

        match run_daemon(&mut scheduler).await {
            Ok(()) => CfddnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                CfddnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wire the IP source and provider into a scheduler
///
/// Zone lookups happen here; any hostname whose zone cannot be resolved
/// aborts startup.
async fn build_scheduler(
    config: &CfddnsConfig,
    settings: &Settings,
    dry_run: bool,
) -> Result<Scheduler> {
    let ip_source = Arc::new(
        HttpIpSource::with_timeout(settings.ip_url(), config.engine.request_timeout())
            .context("cannot create IP source")?,
    );
    let provider = Arc::new(
        CloudflareProvider::new(&config.cloudflare, dry_run)
            .context("cannot create Cloudflare provider")?,
    );

    info!("IP source: {}", ip_source.url());
    for hostname in &config.global.hostnames {
        info!("Managing record: {}", hostname);
    }

    let registry = RecordRegistry::build(&config.global.hostnames, provider.as_ref())
        .await
        .context("cannot resolve zones")?;

    let synchronizer = Synchronizer::from_config(provider, &config.engine);
    let reconciler = Reconciler::new(
        ip_source,
        synchronizer,
        registry,
        config.engine.request_timeout(),
    );
    let interval = RandomInterval::from_config(&config.schedule)?;

    Ok(Scheduler::new(reconciler, interval))
}

/// Run the scheduler until a shutdown signal arrives
async fn run_daemon(scheduler: &mut Scheduler) -> Result<()> {
    let shutdown = shutdown_signal()?;

    let cycles = scheduler
        .run_until(async {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    info!("Shutting down daemon after {} cycle(s)", cycles);
    Ok(())
}

/// Install handlers for SIGTERM and SIGINT
///
/// The returned future resolves with the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install a CTRL-C handler
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}
