//! Monitor command handler.
//!
//! Drives the polling loop: sample, render, evaluate alerts, sleep.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;

use crate::core::system_monitor::{
    build_provider, AlertEvaluator, MetricsProvider, NotificationSink, ProviderMode, Snapshot,
};
use crate::core::MonitorConfig;
use crate::platform::{DesktopNotifier, LogNotifier};
use crate::ui::format_summary;

/// Upper bound of the random offset added to each sleep
pub const SLEEP_JITTER: Duration = Duration::from_millis(100);

/// Everything the loop needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub mode: ProviderMode,
    pub config: MonitorConfig,
    pub json: bool,
    pub count: Option<u64>,
    pub notify: bool,
}

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(MonitorConfig::default_path);

    let mut config = MonitorConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.refresh_interval = interval;
        config.validate();
    }

    let mode = if matches.get_flag("mock") {
        ProviderMode::Synthetic
    } else {
        ProviderMode::Live
    };

    let options = MonitorOptions {
        mode,
        config,
        json: matches.get_flag("json"),
        count: matches.get_one::<u64>("count").copied(),
        notify: !matches.get_flag("no-notify"),
    };

    run(options)
}

/// Run the polling loop until Ctrl+C or `count` cycles
pub fn run(options: MonitorOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build async runtime")?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let mut provider = build_provider(options.mode, &options.config);
    if let Err(e) = provider.init() {
        provider.shutdown();
        return Err(e).context("Failed to initialize metrics provider");
    }
    log::info!(
        "Monitoring every {}ms ({:?} mode)",
        options.config.refresh_interval,
        options.mode
    );

    let sink: Box<dyn NotificationSink> = if options.notify {
        Box::new(DesktopNotifier::new())
    } else {
        Box::new(LogNotifier)
    };

    let result = runtime.block_on(polling_loop(
        provider.as_mut(),
        sink.as_ref(),
        &options,
        shutdown_rx,
    ));

    provider.shutdown();
    result
}

async fn polling_loop(
    provider: &mut dyn MetricsProvider,
    sink: &dyn NotificationSink,
    options: &MonitorOptions,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut alerts = AlertEvaluator::new(options.config.alert_thresholds);
    let mut rng = StdRng::from_os_rng();
    let mut cycles: u64 = 0;

    loop {
        let snapshot = provider.sample();
        render(&snapshot, options.json)?;

        let conditions = alerts.evaluate_and_dispatch(&snapshot, sink);
        if !conditions.is_empty() {
            log::debug!("{} alert condition(s) active", conditions.len());
        }

        cycles += 1;
        if options.count.is_some_and(|limit| cycles >= limit) {
            break;
        }

        let delay = jittered(options.config.sampling_interval(), &mut rng);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => {
                log::info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}

fn render(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!("{}", format_summary(snapshot));
    }
    Ok(())
}

/// `base` shifted by a uniform offset in `[-SLEEP_JITTER, +SLEEP_JITTER)`, never zero
pub fn jittered<R: Rng + ?Sized>(base: Duration, rng: &mut R) -> Duration {
    let jitter = SLEEP_JITTER.as_millis() as i64;
    let offset = rng.random_range(-jitter..jitter);
    let millis = (base.as_millis() as i64 + offset).max(1);
    Duration::from_millis(millis as u64)
}
