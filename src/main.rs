//! dbus-idle command-line interface.

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use dbus_idle::backend::wayland;
use dbus_idle::BackendKind;
use dbus_idle::Config;
use dbus_idle::IdleMonitor;
use dbus_idle::watch::IdleTracker;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Get idle time from various backends.
#[derive(Parser, Debug)]
#[command(name = "dbus-idle")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend to use for idle detection.
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Seconds of inactivity after which the session counts as idle.
    #[arg(long)]
    threshold: Option<u64>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "error")]
    log_level: String,

    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep polling and print a line whenever the session goes idle or active.
    #[arg(long)]
    watch: bool,

    /// Poll interval in seconds for watch mode.
    #[arg(long)]
    interval: Option<u64>,

    /// List the globals advertised by the Wayland compositor and exit.
    #[arg(long)]
    list_globals: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    let level = if config.debug { "debug" } else { args.log_level.as_str() };
    init_logging(level)?;

    debug!("dbus-idle v{} starting", dbus_idle::version());
    debug!("Configuration: {:?}", config);

    if args.list_globals {
        return list_globals().await;
    }

    let mut monitor = IdleMonitor::get_monitor(config.backend, &config)
        .await
        .context("Failed to get idle time")?;

    if args.watch {
        return run_watch(&mut monitor, &config).await;
    }

    let idle = monitor
        .idle_time()
        .await
        .context("Failed to get idle time")?;
    // Debug formatting keeps the fractional part, e.g. "180.0"
    println!("Idle time: {:?} seconds", idle.as_secs_f64());

    Ok(())
}

/// Command line flags win over the config file.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(threshold) = args.threshold {
        config.idle_threshold_seconds = threshold;
    }
    if let Some(interval) = args.interval {
        config.poll_interval_seconds = interval;
    }
    if args.debug {
        config.debug = true;
    }
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("dbus_idle={level}"))
        .or_else(|_| EnvFilter::try_new("error"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

/// Print every Wayland global, one per line.
async fn list_globals() -> Result<()> {
    let globals = tokio::task::spawn_blocking(wayland::list_globals)
        .await?
        .context("Failed to list Wayland globals")?;

    for global in globals {
        println!(
            "Available interface: {} (version {})",
            global.interface, global.version
        );
    }

    Ok(())
}

/// Poll the monitor until interrupted, printing activity changes.
async fn run_watch(monitor: &mut IdleMonitor, config: &Config) -> Result<()> {
    let mut tracker = IdleTracker::new(monitor.threshold());
    let mut poll_timer = tokio::time::interval(config.poll_interval());
    poll_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        "Watching {} backend every {:?} (threshold {:?})",
        monitor.backend(),
        config.poll_interval(),
        monitor.threshold()
    );

    loop {
        tokio::select! {
            _ = poll_timer.tick() => {
                match monitor.idle_time().await {
                    Ok(idle) => {
                        if let Some(transition) = tracker.observe(idle) {
                            println!("{transition}");
                        }
                    }
                    Err(e) => {
                        // Transient; keep polling
                        warn!("Failed to poll idle time: {}", e);
                    }
                }
            }

            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping watch");
                return Ok(());
            }
        }
    }
}
