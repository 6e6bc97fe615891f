//! Async IRQ Log Demo - Main Entry Point

use irq_log_demo::{init_logging, run_demo, DemoSettings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== Async IRQ Log Demo v{} ===", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "irq-log-demo".to_string());
    let settings = DemoSettings::load(&path)?;
    info!("Settings: {:?}", settings);

    let report = run_demo(settings).await?;
    info!(
        "Done: {} attempted, {} accepted, {} delivered, {} dropped",
        report.attempted, report.accepted, report.delivered, report.dropped
    );

    Ok(())
}
