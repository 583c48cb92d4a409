// src/pipeline/monitor.rs

//! Polling loop.

use std::future::Future;
use std::time::Duration;

use crate::pipeline::cycle::Monitor;

/// Run cycles every `interval` until `shutdown` resolves.
///
/// `shutdown` is only observed while sleeping between cycles; a cycle that
/// has started always runs to completion. Returns the number of cycles run.
pub async fn run_monitor<F>(monitor: &mut Monitor, interval: Duration, shutdown: F) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0;

    loop {
        cycles += 1;
        log::info!("Cycle {cycles} starting");
        let report = monitor.run_cycle().await;
        log::debug!("Cycle {cycles} report: {report:?}");

        log::info!("Next check in {}s", interval.as_secs());
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown requested, stopping after {cycles} cycle(s)");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    cycles
}
