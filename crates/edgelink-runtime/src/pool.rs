//! Fixed-size worker pool.
//!
//! A set of worker tasks drains one unbounded FIFO queue. Submission never
//! blocks. Jobs are opaque futures; there is no per-job priority or
//! cancellation. The pool is torn down once, at service shutdown: a
//! graceful shutdown drains the queue first, a forced one abandons it.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default worker count, matching the size of the command fan-out the
/// dispatcher produces for typical `all` requests.
pub const DEFAULT_WORKERS: usize = 8;

type Job = BoxFuture<'static, ()>;

pub struct WorkerPool {
    tx: std::sync::Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start a pool of `workers` tasks.
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let handles = (0..workers.max(1))
            .map(|n| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    loop {
                        // Hold the receiver lock only while dequeueing so
                        // jobs run concurrently across workers.
                        let job = { rx.lock().await.recv().await };
                        match job {
                            Some(job) => job.await,
                            None => break,
                        }
                    }
                    debug!(worker = n, "pool worker exiting");
                })
            })
            .collect();
        Self {
            tx: std::sync::Mutex::new(Some(tx)),
            workers: std::sync::Mutex::new(handles),
        }
    }

    /// Enqueue a job. Returns `false` once the pool has been shut down.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let tx = self.tx.lock().unwrap();
        match tx.as_ref() {
            Some(tx) => tx.send(Box::pin(job)).is_ok(),
            None => false,
        }
    }

    /// Stop the pool. With `force` false, pending jobs are drained and the
    /// workers joined; with `force` true the queue is abandoned and
    /// in-flight jobs are interrupted at their next await point.
    pub async fn shutdown(&self, force: bool) {
        let tx = self.tx.lock().unwrap().take();
        drop(tx);
        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            if force {
                handle.abort();
            } else if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    debug!(%err, "pool worker terminated abnormally");
                }
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
