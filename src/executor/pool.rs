//! Worker pool
//!
//! N workers drain one shared test-case queue. Each case is run once through
//! the [`ProcessRunner`], judged, and any failure is sent to the aggregator.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::process::{ProcessRunner, Target};
use crate::models::{ExecutionOutcome, FailureKind, FailureRecord, TestCase};

/// Default per-case deadline
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3);

/// Decides whether trimmed actual output matches trimmed expected output
pub type Comparator = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Byte-for-byte equality, applied after trimming
pub fn exact_match() -> Comparator {
    Arc::new(|expected: &str, actual: &str| expected == actual)
}

/// Single-pass queue shared by all workers; each case is handed out once
#[derive(Clone)]
pub struct CaseQueue {
    rx: Arc<Mutex<mpsc::Receiver<TestCase>>>,
}

impl CaseQueue {
    /// Create a bounded queue and the sender used by the supplier
    pub fn bounded(capacity: usize) -> (mpsc::Sender<TestCase>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Next case, or `None` once the supplier closed the queue and it is empty
    pub async fn next(&self) -> Option<TestCase> {
        self.rx.lock().await.recv().await
    }
}

/// Turn one outcome into a failure record, or `None` if the case passed
pub fn judge(
    name: String,
    expected: &[u8],
    outcome: ExecutionOutcome,
    compare: &Comparator,
) -> Option<FailureRecord> {
    let expected = String::from_utf8_lossy(expected).trim().to_string();

    match outcome {
        ExecutionOutcome::Success(out) => {
            let actual = String::from_utf8_lossy(&out);
            let actual = actual.trim();
            if compare(&expected, actual) {
                None
            } else {
                Some(FailureRecord::mismatch(name, expected, actual))
            }
        }
        failed => {
            let kind = failed.failure_kind().unwrap_or(FailureKind::Runtime);
            Some(FailureRecord::new(name, kind, expected, failed.to_string()))
        }
    }
}

struct WorkerContext {
    target: Target,
    runner: ProcessRunner,
    deadline: Duration,
    compare: Comparator,
}

/// Fixed-size pool of test workers
#[derive(Clone)]
pub struct WorkerPool {
    concurrency: usize,
    ctx: Arc<WorkerContext>,
}

impl WorkerPool {
    pub fn new(target: Target) -> Self {
        Self {
            concurrency: 1,
            ctx: Arc::new(WorkerContext {
                target,
                runner: ProcessRunner::new(),
                deadline: DEFAULT_DEADLINE,
                compare: exact_match(),
            }),
        }
    }

    /// Number of workers; zero is raised to one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.ctx_mut(|ctx| ctx.deadline = deadline);
        self
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.ctx_mut(|ctx| ctx.runner = runner);
        self
    }

    pub fn with_comparator(mut self, compare: Comparator) -> Self {
        self.ctx_mut(|ctx| ctx.compare = compare);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn deadline(&self) -> Duration {
        self.ctx.deadline
    }

    pub fn target(&self) -> &Target {
        &self.ctx.target
    }

    fn ctx_mut(&mut self, f: impl FnOnce(&mut WorkerContext)) {
        match Arc::get_mut(&mut self.ctx) {
            Some(ctx) => f(ctx),
            None => {
                let mut ctx = WorkerContext {
                    target: self.ctx.target.clone(),
                    runner: self.ctx.runner.clone(),
                    deadline: self.ctx.deadline,
                    compare: self.ctx.compare.clone(),
                };
                f(&mut ctx);
                self.ctx = Arc::new(ctx);
            }
        }
    }

    /// Start the workers.
    ///
    /// Each worker owns a clone of `failures`; the channel closes once the
    /// last worker exits.
    pub fn spawn(&self, queue: CaseQueue, failures: mpsc::Sender<FailureRecord>) -> PoolHandle {
        debug!(
            "Starting {} workers for `{}` (deadline {}ms)",
            self.concurrency,
            self.ctx.target,
            self.ctx.deadline.as_millis()
        );

        let workers = (0..self.concurrency)
            .map(|id| {
                let ctx = self.ctx.clone();
                let queue = queue.clone();
                let failures = failures.clone();
                tokio::spawn(worker(id, ctx, queue, failures))
            })
            .collect();

        PoolHandle { workers }
    }

    /// Run the pool to completion and return the number of cases processed
    pub async fn run(&self, queue: CaseQueue, failures: mpsc::Sender<FailureRecord>) -> usize {
        self.spawn(queue, failures).join().await
    }
}

/// Running workers; [`PoolHandle::join`] is the completion barrier
pub struct PoolHandle {
    workers: Vec<JoinHandle<usize>>,
}

impl PoolHandle {
    /// Wait for every worker to drain the queue and finish its last case
    pub async fn join(self) -> usize {
        let mut processed = 0;
        for (id, result) in join_all(self.workers).await.into_iter().enumerate() {
            match result {
                Ok(count) => processed += count,
                Err(e) => error!("Worker {} terminated abnormally: {}", id, e),
            }
        }
        processed
    }
}

async fn worker(
    id: usize,
    ctx: Arc<WorkerContext>,
    queue: CaseQueue,
    failures: mpsc::Sender<FailureRecord>,
) -> usize {
    let mut processed = 0;

    while let Some(case) = queue.next().await {
        let (name, input, expected) = case.into_parts();
        debug!("Worker {} running {}", id, name);

        let outcome = ctx
            .runner
            .run_target(&ctx.target, Some(input), ctx.deadline)
            .await;
        processed += 1;

        if let Some(record) = judge(name, &expected, outcome, &ctx.compare) {
            debug!("Worker {}: {}", id, record);
            if failures.send(record).await.is_err() {
                warn!("Worker {}: failure collector closed, dropping record", id);
            }
        }
    }

    debug!("Worker {} finished after {} cases", id, processed);
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_judge_trims_before_comparing() {
        let outcome = ExecutionOutcome::Success(b"  42  \n".to_vec());
        assert_eq!(judge("t".into(), b"42\n", outcome, &exact_match()), None);
    }

    #[test]
    fn test_judge_reports_mismatch() {
        let outcome = ExecutionOutcome::Success(b"43".to_vec());
        let record = judge("t".into(), b"42", outcome, &exact_match()).unwrap();
        assert_eq!(record.kind, FailureKind::Mismatch);
        assert_eq!(record.expected, "42");
        assert_eq!(record.got, "43");
    }

    #[test]
    fn test_judge_skips_comparison_on_timeout() {
        let always_equal: Comparator = Arc::new(|_: &str, _: &str| true);
        let outcome = ExecutionOutcome::TimedOut(Duration::from_secs(3));
        let record = judge("slow".into(), b"y\n", outcome, &always_equal).unwrap();

        assert_eq!(record.kind, FailureKind::Timeout);
        assert_eq!(record.expected, "y");
        assert!(record.got.contains("3.00 seconds"));
    }

    #[test]
    fn test_judge_startup_error() {
        let outcome = ExecutionOutcome::startup_error("failed to start java: not found");
        let record = judge("t".into(), b"ok", outcome, &exact_match()).unwrap();
        assert_eq!(record.kind, FailureKind::Startup);
        assert!(record.got.contains("not found"));
    }

    #[test]
    fn test_pool_builder() {
        let pool = WorkerPool::new(Target::new("cat"))
            .with_concurrency(0)
            .with_deadline(Duration::from_secs(7));
        assert_eq!(pool.concurrency(), 1);
        assert_eq!(pool.deadline(), Duration::from_secs(7));
        assert_eq!(pool.target().program, "cat");
    }

    #[test]
    fn test_builder_on_shared_pool_does_not_affect_clone() {
        let pool = WorkerPool::new(Target::new("cat"));
        let copy = pool.clone().with_deadline(Duration::from_secs(1));
        assert_eq!(pool.deadline(), DEFAULT_DEADLINE);
        assert_eq!(copy.deadline(), Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queue_hands_each_case_to_one_consumer() {
        let (tx, queue) = CaseQueue::bounded(2);

        let consumers: Vec<_> = (0..8)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(case) = queue.next().await {
                        seen.push(case.name().to_string());
                    }
                    seen
                })
            })
            .collect();
        drop(queue);

        for i in 0..500 {
            tx.send(TestCase::new(format!("case-{i}"), "", ""))
                .await
                .unwrap();
        }
        drop(tx);

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 500);
        assert_eq!(unique.len(), 500);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_run_counts_and_reports() {
        let (tx, queue) = CaseQueue::bounded(4);
        let (fail_tx, mut fail_rx) = mpsc::channel(64);

        let case = |i: usize| {
            let expected = if i % 5 == 0 { "wrong".to_string() } else { i.to_string() };
            TestCase::new(format!("c{i}"), format!("{i}\n"), expected)
        };

        // Fill the queue before any worker exists.
        for i in 0..4 {
            tx.send(case(i)).await.unwrap();
        }

        let pool = WorkerPool::new(Target::new("cat")).with_concurrency(3);
        let handle = pool.spawn(queue, fail_tx);

        for i in 4..20 {
            tx.send(case(i)).await.unwrap();
        }
        drop(tx);

        assert_eq!(handle.join().await, 20);

        let mut names = Vec::new();
        while let Some(record) = fail_rx.recv().await {
            assert_eq!(record.kind, FailureKind::Mismatch);
            names.push(record.name);
        }
        names.sort();
        assert_eq!(names, vec!["c0", "c10", "c15", "c5"]);
    }
}
