//! Harness orchestration
//!
//! Wires the supplier, the worker pool, and the aggregator together and
//! returns a [`Summary`] once all three have finished.

use anyhow::{Context, Result};
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::aggregator::{failure_channel, ResultAggregator, DEFAULT_FAILURE_BUFFER};
use super::pool::{CaseQueue, Comparator, WorkerPool};
use super::process::{ProcessRunner, Target};
use crate::config::AppConfig;
use crate::models::{Summary, TestCase};

/// Runs a whole suite against one target
pub struct Harness {
    pool: WorkerPool,
    failure_buffer: usize,
    queue_capacity: usize,
}

impl Harness {
    pub fn new(target: Target) -> Self {
        Self {
            pool: WorkerPool::new(target),
            failure_buffer: DEFAULT_FAILURE_BUFFER,
            queue_capacity: 0,
        }
    }

    /// Build a harness from the effective configuration
    pub fn from_config(config: &AppConfig, target: Target) -> Self {
        Self::new(target)
            .concurrency(config.concurrency)
            .deadline(config.deadline())
            .failure_buffer(config.failure_buffer)
            .queue_capacity(config.queue_capacity)
            .runner(ProcessRunner::new().with_max_output(config.max_output_bytes))
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.pool = self.pool.with_concurrency(concurrency);
        self
    }

    /// Per-case deadline; zero disables it
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.pool = self.pool.with_deadline(deadline);
        self
    }

    pub fn failure_buffer(mut self, capacity: usize) -> Self {
        self.failure_buffer = capacity.max(1);
        self
    }

    /// Test-case queue size; zero means one slot per worker
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn runner(mut self, runner: ProcessRunner) -> Self {
        self.pool = self.pool.with_runner(runner);
        self
    }

    pub fn comparator(mut self, compare: Comparator) -> Self {
        self.pool = self.pool.with_comparator(compare);
        self
    }

    fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            self.pool.concurrency()
        } else {
            self.queue_capacity
        }
    }

    /// Run every case from `source` and wait for the final summary.
    ///
    /// The source is consumed on a blocking thread so it may do file I/O.
    pub async fn run<S>(&self, source: S) -> Result<Summary>
    where
        S: IntoIterator<Item = TestCase> + Send + 'static,
        S::IntoIter: Send,
    {
        let started_at = Utc::now();
        let start = Instant::now();

        debug!("Harness: supplying");
        let (case_tx, queue) = CaseQueue::bounded(self.effective_queue_capacity());
        let supplier = tokio::task::spawn_blocking(move || supply(source, case_tx));

        debug!("Harness: running");
        let (failure_tx, failure_rx) = failure_channel(self.failure_buffer);
        let aggregator = ResultAggregator::spawn(failure_rx);
        let processed = self.pool.spawn(queue, failure_tx).join().await;

        // Every failure sender lived in a worker, so the channel is closed now.
        debug!("Harness: aggregating");
        let supplied = supplier.await.context("Test case supplier failed")?;
        let failed = aggregator.finish().await?;

        if supplied != processed {
            warn!(
                "Supplied {} test cases but only {} were processed",
                supplied, processed
            );
        }

        let summary = Summary::new(started_at, processed, failed, start.elapsed());
        info!(
            "Run completed in {}ms - Pass: {}/{} ({:.1}%)",
            summary.elapsed.as_millis(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        Ok(summary)
    }
}

fn supply<S>(source: S, tx: mpsc::Sender<TestCase>) -> usize
where
    S: IntoIterator<Item = TestCase>,
{
    let mut supplied = 0;
    for case in source {
        if tx.blocking_send(case).is_err() {
            warn!("All workers stopped; abandoning remaining test cases");
            break;
        }
        supplied += 1;
    }
    debug!("Supplier finished after {} test cases", supplied);
    supplied
}
