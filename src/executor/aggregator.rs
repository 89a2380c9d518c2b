//! Failure aggregation
//!
//! A single task drains the failure channel that all workers write to.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::FailureRecord;

/// Default number of failures buffered in flight
pub const DEFAULT_FAILURE_BUFFER: usize = 5;

/// Create the bounded failure channel; capacity is at least one
pub fn failure_channel(
    capacity: usize,
) -> (mpsc::Sender<FailureRecord>, mpsc::Receiver<FailureRecord>) {
    mpsc::channel(capacity.max(1))
}

/// Collects failures in arrival order
pub struct ResultAggregator {
    handle: JoinHandle<Vec<FailureRecord>>,
}

impl ResultAggregator {
    /// Start draining `rx` on a background task
    pub fn spawn(mut rx: mpsc::Receiver<FailureRecord>) -> Self {
        let handle = tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(record) = rx.recv().await {
                debug!("Collected failure #{}: {}", failures.len() + 1, record.name);
                failures.push(record);
            }
            failures
        });

        Self { handle }
    }

    /// Wait until every sender is dropped and the channel is drained
    pub async fn finish(self) -> Result<Vec<FailureRecord>> {
        self.handle.await.context("Failure aggregator task failed")
    }
}
