//! Report command implementation.

use crate::config::Settings;
use crate::monitoring::MetricsAggregator;
use anyhow::Result;

/// Print the analytics report.
pub fn run_report(settings: &Settings) -> Result<()> {
    let metrics = MetricsAggregator::open(&settings.metrics_path());
    print!("{}", metrics.report());
    Ok(())
}
