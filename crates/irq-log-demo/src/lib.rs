//! Async IRQ Log Demo
//!
//! Spawns simulated interrupt sources that log in bursts through the async
//! transport while a reporter samples ring occupancy and drop counts.

use anyhow::{anyhow, Context};
use irq_log::{irq_log, AsyncIrqLog, LogConfig, TracingSink};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Interrupt source simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of concurrent interrupt sources
    pub sources: usize,
    /// Bursts fired by each source
    pub bursts: usize,
    /// Messages per burst
    pub burst_len: usize,
    /// Pause between bursts (milliseconds)
    pub burst_interval_ms: u64,
    /// Statistics reporting period (milliseconds)
    pub report_interval_ms: u64,
    /// How long to wait for the consumer to catch up at the end (milliseconds)
    pub settle_timeout_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sources: 3,
            bursts: 20,
            burst_len: 16,
            burst_interval_ms: 25,
            report_interval_ms: 100,
            settle_timeout_ms: 2000,
        }
    }
}

/// Full demo settings: `[log]` and `[demo]` tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub log: LogConfig,
    pub demo: DemoConfig,
}

impl DemoSettings {
    /// Load from an optional file plus `IRQ_DEMO__*` environment overrides
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("IRQ_DEMO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading settings from {}", path))?;

        let loaded: DemoSettings = settings.try_deserialize()?;
        loaded.log.validate()?;
        Ok(loaded)
    }
}

/// Outcome of one demo run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    pub attempted: u64,
    pub accepted: u64,
    pub delivered: u64,
    pub dropped: u32,
}

/// Initialize logging
pub fn init_logging() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Spawn one simulated interrupt source; the thread returns how many messages were accepted
fn spawn_source(log: AsyncIrqLog, id: usize, config: &DemoConfig) -> anyhow::Result<JoinHandle<u64>> {
    let bursts = config.bursts;
    let burst_len = config.burst_len;
    let interval = Duration::from_millis(config.burst_interval_ms);
    let start = Instant::now();

    let handle = thread::Builder::new()
        .name(format!("irq-src-{}", id))
        .spawn(move || {
            let mut accepted = 0;
            for burst in 0..bursts {
                for event in 0..burst_len {
                    let ts = start.elapsed().as_micros();
                    // Drops are expected under burst load; they show up in drop_count
                    if irq_log!(log, "[irq{}] burst {} event {} ts={}us", id, burst, event, ts).is_ok() {
                        accepted += 1;
                    }
                }
                thread::sleep(interval);
            }
            accepted
        })?;

    Ok(handle)
}

/// Run the simulation and report what reached the sink
pub async fn run_demo(settings: DemoSettings) -> anyhow::Result<DemoReport> {
    let log = AsyncIrqLog::new(settings.log.clone(), TracingSink)?;
    log.init()?;

    let demo = &settings.demo;
    info!(
        "Starting {} sources x {} bursts x {} events",
        demo.sources, demo.bursts, demo.burst_len
    );

    let sources = (0..demo.sources)
        .map(|id| spawn_source(log.clone(), id, demo))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(demo.report_interval_ms));
    while !sources.iter().all(|h| h.is_finished()) {
        ticker.tick().await;
        info!(
            "ring {:.0}% full ({} bytes), delivered {}, dropped {}",
            log.fill_ratio() * 100.0,
            log.pending_bytes(),
            log.delivered_count(),
            log.drop_count()
        );
    }

    let mut accepted = 0;
    for source in sources {
        accepted += source
            .join()
            .map_err(|_| anyhow!("interrupt source panicked"))?;
    }

    let deadline = Instant::now() + Duration::from_millis(demo.settle_timeout_ms);
    while log.delivered_count() < accepted && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    if log.delivered_count() < accepted {
        warn!(
            "Consumer still behind after {}ms: {} of {} delivered",
            demo.settle_timeout_ms,
            log.delivered_count(),
            accepted
        );
    }

    let report = DemoReport {
        attempted: (demo.sources * demo.bursts * demo.burst_len) as u64,
        accepted,
        delivered: log.delivered_count(),
        dropped: log.drop_count(),
    };

    log.deinit()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_settings() -> DemoSettings {
        DemoSettings {
            log: LogConfig::default(),
            demo: DemoConfig {
                sources: 2,
                bursts: 3,
                burst_len: 4,
                burst_interval_ms: 1,
                report_interval_ms: 5,
                settle_timeout_ms: 5000,
            },
        }
    }

    #[test]
    fn test_default_settings_valid() {
        let settings = DemoSettings::default();
        assert!(settings.log.validate().is_ok());
        assert_eq!(settings.demo.sources, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let settings = DemoSettings::load("/nonexistent/irq-log-demo").unwrap();
        assert_eq!(settings.log.buffer_size, 2048);
        assert_eq!(settings.demo.burst_len, 16);
    }

    #[tokio::test]
    async fn test_run_demo_accounts_for_every_message() {
        let report = run_demo(quick_settings()).await.unwrap();

        assert_eq!(report.attempted, 24);
        assert_eq!(report.accepted + report.dropped as u64, report.attempted);
        assert_eq!(report.delivered, report.accepted);
    }

    #[tokio::test]
    async fn test_tiny_ring_drops_under_burst() {
        let mut settings = quick_settings();
        settings.log = LogConfig {
            buffer_size: 65,
            max_message_length: 64,
            ..Default::default()
        };
        settings.demo.burst_len = 50;

        let report = run_demo(settings).await.unwrap();
        assert_eq!(report.accepted + report.dropped as u64, report.attempted);
        assert!(report.accepted >= 1);
    }
}
