//! Scan a fleet from a JSON roster and print the report as CSV.
//!
//! ```sh
//! cargo run --example fleet_scan -- roster.json
//! ```
//!
//! The roster is a JSON array of device records:
//!
//! ```json
//! [
//!   {"host": "10.0.0.7", "user": "admin", "password": "admin", "command": "scan"},
//!   {"host": "10.0.0.8", "user": "admin", "password": "admin", "command": "accept"}
//! ]
//! ```

use anyhow::{Context, Result};

use linkfleet::config::EngineConfig;
use linkfleet::fleet::{Device, FleetOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let roster_path = std::env::args()
        .nth(1)
        .context("usage: fleet_scan <roster.json>")?;
    let roster_text = std::fs::read_to_string(&roster_path)
        .with_context(|| format!("reading roster {roster_path}"))?;
    let roster: Vec<Device> =
        serde_json::from_str(&roster_text).context("parsing roster records")?;

    let config = EngineConfig::default();
    let orchestrator = FleetOrchestrator::new(config);

    let report = orchestrator.run(&roster).await?;
    println!("{}", report.to_csv());

    let failed = report.rows().iter().filter(|row| !row.success).count();
    eprintln!("{} device(s), {} failed", report.len(), failed);
    Ok(())
}
