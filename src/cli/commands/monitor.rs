//! Monitor command - live dashboard.

use crate::config::Settings;
use crate::monitoring::{Dashboard, MonitoringService};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the dashboard until Ctrl+C.
pub async fn run_monitor(interval: Option<u64>, settings: Settings) -> Result<()> {
    let monitoring = Arc::new(MonitoringService::from_settings(&settings).await?);

    let mut dashboard_settings = settings.dashboard.clone();
    if let Some(secs) = interval {
        dashboard_settings.refresh_interval_secs = secs;
    }

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    Dashboard::new(monitoring, dashboard_settings).run(token).await;
    ctrl_c.abort();
    println!("Monitoring dashboard stopped");
    Ok(())
}
