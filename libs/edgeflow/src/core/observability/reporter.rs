// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};

use super::snapshots::format_rows;
use super::statistics::StatisticsAggregator;
use crate::core::error::{EdgeFlowError, Result};

/// Background thread that logs the statistics table every interval.
pub struct StatsReporter {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StatsReporter {
    pub fn spawn(stats: Arc<StatisticsAggregator>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("stats-reporter".to_string())
            .spawn(move || {
                tracing::debug!("[stats-reporter] Thread started (interval {:?})", interval);
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let rows = stats.snapshot();
                            if !rows.is_empty() {
                                tracing::info!("Statistics:\n{}", format_rows(&rows));
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("[stats-reporter] Thread exiting");
            })
            .map_err(|e| EdgeFlowError::RuntimeIo(format!("Failed to spawn thread: {}", e)))?;

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        match self.shutdown_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!("[stats-reporter] Thread already exited");
            }
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("[stats-reporter] Thread panicked");
            }
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stop_is_prompt() {
        let stats = Arc::new(StatisticsAggregator::new());
        stats.add_entry(0, "cam", "classification", "m").unwrap();
        let reporter = StatsReporter::spawn(stats, Duration::from_secs(60)).unwrap();

        let start = Instant::now();
        reporter.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_shutdown_after_exit_is_harmless() {
        let stats = Arc::new(StatisticsAggregator::new());
        let mut reporter = StatsReporter::spawn(stats, Duration::from_secs(60)).unwrap();
        reporter.shutdown();
        assert!(reporter.handle.is_none());
        // The thread is gone, so the channel is disconnected now.
        reporter.shutdown();
        drop(reporter);
    }
}
