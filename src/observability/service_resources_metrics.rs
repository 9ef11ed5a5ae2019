use anyhow::{anyhow, Result};
use chrono::Utc;
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::time::sleep;
use tracing::debug;

use crate::observability::metrics::get_metrics;

const SCRAPE_INTERVAL: Duration = Duration::from_secs(5);

/// Keeps the process gauges fresh while metrics are exposed; returns at once otherwise.
pub async fn collect_process_metrics(is_metrics_enabled: bool) -> Result<()> {
    if !is_metrics_enabled {
        return Ok(());
    }
    let metrics = get_metrics().await;
    let mut sys = System::new();
    let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("cannot resolve own pid: {}", e))?;

    let started_at = Utc::now().timestamp();
    metrics.process_start_time.set(started_at);

    loop {
        let pids = [pid];
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            false,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_tasks(),
        );

        if let Some(proc) = sys.process(pid) {
            metrics.process_cpu_usage.set(proc.cpu_usage().into());
            metrics.process_memory_usage.set(proc.memory() as i64);
            metrics.process_virtual_memory.set(proc.virtual_memory() as i64);
            if let Some(tasks) = proc.tasks() {
                metrics.process_threads.set(tasks.len() as i64);
            }
            metrics.process_uptime.set(Utc::now().timestamp() - started_at);
        } else {
            debug!("process {} not visible to sysinfo", pid);
        }

        sleep(SCRAPE_INTERVAL).await;
    }
}
