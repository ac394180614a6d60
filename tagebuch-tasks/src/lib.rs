//! In-process worker queue backing the task dispatch endpoint.
//!
//! Jobs travel over a bounded channel to a single worker task; every job
//! carries a oneshot reply side, and dispatchers wait on it under an
//! explicit deadline instead of blocking unboundedly.

use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct TaskRequest {
    pub amount: i64,
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum DispatchError {
    #[error("The worker did not reply within {0:?}")]
    Timeout(Duration),
    #[error("The worker is gone")]
    WorkerGone,
}

/// The unit of work the queue executes. Implemented by the arithmetic
/// worker in production and by fixtures in tests.
#[async_trait]
pub trait TaskWorker: Send + Sync + 'static {
    async fn execute(&self, request: TaskRequest) -> i64;
}

/// Computes `amount * (x + y)`, saturating at the i64 limits so
/// request-supplied extremes cannot panic the worker task.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ArithmeticWorker;

#[async_trait]
impl TaskWorker for ArithmeticWorker {
    async fn execute(&self, request: TaskRequest) -> i64 {
        request
            .amount
            .saturating_mul(request.x.saturating_add(request.y))
    }
}

struct Job {
    request: TaskRequest,
    reply_tx: oneshot::Sender<i64>,
}

#[derive(Clone)]
pub struct TaskQueue {
    job_tx: mpsc::Sender<Job>,
    timeout: Duration,
}

impl TaskQueue {
    /// Starts the worker task and returns the dispatch handle.
    #[must_use]
    pub fn spawn(worker: Arc<dyn TaskWorker>, timeout: Duration) -> Self {
        let (job_tx, mut job_rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(job) = job_rx.recv().await {
                // Timed-out dispatchers dropped their receiver.
                if job.reply_tx.is_closed() {
                    debug!(request = ?job.request, "Skipping abandoned job");
                    continue;
                }

                let result = worker.execute(job.request).await;
                if job.reply_tx.send(result).is_err() {
                    debug!(request = ?job.request, "Dropping result for abandoned job");
                }
            }
        });

        Self { job_tx, timeout }
    }

    /// Submits a job and waits for the worker's result. The deadline
    /// spans the enqueue as well, so a full queue cannot hold a caller
    /// past the configured timeout.
    pub async fn dispatch(&self, request: TaskRequest) -> Result<i64, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job { request, reply_tx };

        let submit_and_wait = async {
            self.job_tx
                .send(job)
                .await
                .map_err(|_| DispatchError::WorkerGone)?;

            reply_rx.await.map_err(|_| DispatchError::WorkerGone)
        };

        match tokio::time::timeout(self.timeout, submit_and_wait).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?request, timeout = ?self.timeout, "Worker result timed out");
                Err(DispatchError::Timeout(self.timeout))
            }
        }
    }
}
