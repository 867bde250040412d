//! Bounded-concurrency task executor.
//!
//! Generalizes the teacher's single-loop probe dispatch in the old
//! `checker::run_checker` (one monitor probed at a time, in sequence) into
//! an explicit pool of N worker coroutines pulling from a shared queue, in
//! the spirit of `other_examples/Pratyay360-cloud-ping`'s
//! `Semaphore`-bounded `ProbeRunner`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::models::now_iso;

/// A unit of work the pool executes. `execute` returns `Err` only for the
/// final, post-retry failure — the pool handles retries internally.
pub trait Task: Send + 'static {
    fn name(&self) -> String;
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + '_>>;
}

/// Outcome of one task's full attempt budget (first try plus retries), per
/// §4.2's `{task_name, success, error?, duration, timestamp}` completion
/// record.
#[derive(Debug)]
pub struct TaskResult {
    pub name: String,
    pub success: bool,
    pub error: Option<WorkerError>,
    pub duration: Duration,
    pub timestamp: String,
}

#[derive(Debug)]
pub enum SubmitError {
    QueueFull,
    ShuttingDown,
}

struct Job(Box<dyn Task>);

/// Owns N worker coroutines reading from a bounded task queue and writing
/// results to a bounded, non-blocking result channel.
pub struct WorkerPool {
    task_tx: mpsc::Sender<Job>,
    result_rx: tokio::sync::Mutex<mpsc::Receiver<TaskResult>>,
    stopped: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `config.worker_count` workers, each retrying a failed task up
    /// to `config.worker_retry_count` additional times with
    /// `config.worker_retry_delay` between attempts before reporting the
    /// final error.
    pub fn new(config: &WorkerConfig) -> Self {
        let queue_capacity = config.worker_count.saturating_mul(4).max(16);
        let (task_tx, task_rx) = mpsc::channel::<Job>(queue_capacity);
        let (result_tx, result_rx) = mpsc::channel::<TaskResult>(queue_capacity);
        let stopped = Arc::new(AtomicBool::new(false));
        let task_rx = Arc::new(tokio::sync::Mutex::new(task_rx));

        let retry_count = config.worker_retry_count;
        let retry_delay = config.worker_retry_delay;

        let mut handles = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = task_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(Job(task)) = job else {
                        break;
                    };

                    let name = task.name();
                    let started = Instant::now();
                    let mut attempt = 0u32;
                    let error = loop {
                        match task.execute().await {
                            Ok(()) => break None,
                            Err(e) if attempt < retry_count => {
                                attempt += 1;
                                debug!(worker = worker_id, task = %name, attempt, "retrying task");
                                tokio::time::sleep(retry_delay).await;
                                let _ = &e;
                            }
                            Err(e) => break Some(e),
                        }
                    };
                    let duration = started.elapsed();

                    let result = TaskResult {
                        name,
                        success: error.is_none(),
                        error,
                        duration,
                        timestamp: now_iso(),
                    };
                    if result_tx.try_send(result).is_err() {
                        warn!(worker = worker_id, "result channel full, dropping task result");
                    }
                }
            }));
        }

        WorkerPool {
            task_tx,
            result_rx: tokio::sync::Mutex::new(result_rx),
            stopped,
            handles,
        }
    }

    /// Enqueues a task. Returns immediately; never blocks the caller.
    pub fn submit(&self, task: impl Task) -> Result<(), SubmitError> {
        if self.stopped.load(Ordering::Relaxed) {
            return Err(SubmitError::ShuttingDown);
        }
        self.task_tx
            .try_send(Job(Box::new(task)))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SubmitError::ShuttingDown,
            })
    }

    /// Pulls the next available result, if any, without blocking.
    pub async fn try_recv_result(&self) -> Option<TaskResult> {
        self.result_rx.lock().await.try_recv().ok()
    }

    /// Stops accepting new submissions and waits for in-flight workers to
    /// drain their current task before returning.
    pub async fn stop(self) {
        self.stopped.store(true, Ordering::Relaxed);
        drop(self.task_tx);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingTask {
        counter: Arc<AtomicUsize>,
        fail_times: Arc<AtomicUsize>,
    }

    impl Task for CountingTask {
        fn name(&self) -> String {
            "counting".to_string()
        }

        fn execute(&self) -> Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + '_>> {
            Box::pin(async move {
                if self.fail_times.load(Ordering::Relaxed) > 0 {
                    self.fail_times.fetch_sub(1, Ordering::Relaxed);
                    return Err(WorkerError::Cancelled);
                }
                self.counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            worker_count: 2,
            worker_retry_count: 2,
            worker_retry_delay: Duration::from_millis(1),
            health_check_period: Duration::from_secs(30),
            ssl_check_period: Duration::from_secs(300),
            alert_eval_period: Duration::from_secs(60),
            notify_period: Duration::from_secs(30),
            event_queue_capacity: 64,
            database_path: ":memory:".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            bind_port: 0,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
        }
    }

    #[tokio::test]
    async fn succeeding_task_reports_no_error() {
        let pool = WorkerPool::new(&test_config());
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit(CountingTask {
            counter: counter.clone(),
            fail_times: Arc::new(AtomicUsize::new(0)),
        })
        .unwrap();

        let result = loop {
            if let Some(r) = pool.try_recv_result().await {
                break r;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(result.error.is_none());
        assert!(result.success);
        assert!(!result.timestamp.is_empty());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn task_recovers_within_retry_budget() {
        let pool = WorkerPool::new(&test_config());
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit(CountingTask {
            counter: counter.clone(),
            fail_times: Arc::new(AtomicUsize::new(2)),
        })
        .unwrap();

        let result = loop {
            if let Some(r) = pool.try_recv_result().await {
                break r;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(result.error.is_none());
        pool.stop().await;
    }

    #[tokio::test]
    async fn task_exhausting_retry_budget_reports_final_error() {
        let pool = WorkerPool::new(&test_config());
        let counter = Arc::new(AtomicUsize::new(0));
        pool.submit(CountingTask {
            counter: counter.clone(),
            fail_times: Arc::new(AtomicUsize::new(10)),
        })
        .unwrap();

        let result = loop {
            if let Some(r) = pool.try_recv_result().await {
                break r;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(result.error.is_some());
        assert!(!result.success);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        pool.stop().await;
    }
}
