//! Periodic task scheduler.
//!
//! One runner task sleeps until the earliest due time, submits the fired
//! action onto the worker pool and recomputes the next due time as
//! `max(now, previous + interval)`: the schedule corrects toward its
//! interval rather than bursting to catch up with wall clock. `start` is
//! idempotent; `stop` cancels the sleeper and prevents further
//! submissions while letting in-flight submissions complete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::pool::WorkerPool;

/// Action fired on each schedule tick; produces the job submitted to the
/// worker pool.
pub type TaskAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A recurring self-invocation.
#[derive(Clone)]
pub struct ScheduledTask {
    pub name: String,
    pub interval: Duration,
    /// Delay before the first firing; zero means one full interval.
    pub start_delay: Duration,
    /// Number of firings; zero repeats forever.
    pub repeats: u64,
    pub action: TaskAction,
}

impl ScheduledTask {
    pub fn new(name: impl Into<String>, interval: Duration, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            interval,
            start_delay: Duration::ZERO,
            repeats: 0,
            action,
        }
    }

    pub fn with_repeats(mut self, repeats: u64) -> Self {
        self.repeats = repeats;
        self
    }
}

struct Entry {
    next_due: Instant,
    remaining: Option<u64>,
    task: ScheduledTask,
}

pub struct Scheduler {
    entries: Arc<std::sync::Mutex<Vec<Entry>>>,
    wake: Arc<tokio::sync::Notify>,
    running: AtomicBool,
    stop_tx: std::sync::Mutex<Option<watch::Sender<bool>>>,
    runner: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(std::sync::Mutex::new(Vec::new())),
            wake: Arc::new(tokio::sync::Notify::new()),
            running: AtomicBool::new(false),
            stop_tx: std::sync::Mutex::new(None),
            runner: std::sync::Mutex::new(None),
        }
    }

    /// Register a task. Effective immediately, whether or not the runner
    /// has started.
    pub fn add(&self, task: ScheduledTask) {
        let first = if task.start_delay.is_zero() {
            task.interval
        } else {
            task.start_delay
        };
        let entry = Entry {
            next_due: Instant::now() + first,
            remaining: (task.repeats > 0).then_some(task.repeats),
            task,
        };
        self.entries.lock().unwrap().push(entry);
        self.wake.notify_one();
    }

    pub fn task_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Start the runner. Subsequent calls are no-ops.
    pub fn start(&self, pool: Arc<WorkerPool>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let (stop_tx, mut stop_rx) = watch::channel(false);
        *self.stop_tx.lock().unwrap() = Some(stop_tx);
        let entries = self.entries.clone();
        let wake = self.wake.clone();
        let handle = tokio::spawn(async move {
            loop {
                let due = entries
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|e| e.next_due)
                    .min();
                match due {
                    Some(due) => {
                        tokio::select! {
                            _ = stop_rx.changed() => break,
                            _ = wake.notified() => continue,
                            _ = tokio::time::sleep_until(due) => {}
                        }
                        let now = Instant::now();
                        let mut fired = Vec::new();
                        {
                            let mut entries = entries.lock().unwrap();
                            for entry in entries.iter_mut() {
                                if entry.next_due > now {
                                    continue;
                                }
                                fired.push((entry.task.name.clone(), (entry.task.action)()));
                                entry.next_due =
                                    (entry.next_due + entry.task.interval).max(now);
                                if let Some(rem) = &mut entry.remaining {
                                    *rem -= 1;
                                }
                            }
                            entries.retain(|e| e.remaining != Some(0));
                        }
                        for (name, job) in fired {
                            debug!(task = %name, "schedule fired");
                            pool.submit(job);
                        }
                    }
                    None => {
                        tokio::select! {
                            _ = stop_rx.changed() => break,
                            _ = wake.notified() => {}
                        }
                    }
                }
            }
            info!("scheduler stopped");
        });
        *self.runner.lock().unwrap() = Some(handle);
    }

    /// Cancel the sleeper and prevent further submissions. Jobs already
    /// handed to the pool are unaffected.
    pub async fn stop(&self) {
        let tx = self.stop_tx.lock().unwrap().take();
        if let Some(tx) = tx {
            let _ = tx.send(true);
        }
        let handle = self.runner.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_action(count: Arc<AtomicUsize>) -> TaskAction {
        Arc::new(move || {
            let count = count.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_interval() {
        let pool = Arc::new(WorkerPool::new(2));
        let sched = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        sched.add(ScheduledTask::new(
            "tick",
            Duration::from_secs(1),
            counting_action(count.clone()),
        ));
        sched.start(pool.clone());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        sched.stop().await;
        pool.shutdown(false).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_limit_is_honoured() {
        let pool = Arc::new(WorkerPool::new(1));
        let sched = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        sched.add(
            ScheduledTask::new(
                "bounded",
                Duration::from_secs(1),
                counting_action(count.clone()),
            )
            .with_repeats(3),
        );
        sched.start(pool.clone());

        tokio::time::sleep(Duration::from_secs(10)).await;
        sched.stop().await;
        pool.shutdown(false).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(sched.task_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let pool = Arc::new(WorkerPool::new(1));
        let sched = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        sched.add(ScheduledTask::new(
            "tick",
            Duration::from_secs(1),
            counting_action(count.clone()),
        ));
        sched.start(pool.clone());
        sched.start(pool.clone());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        sched.stop().await;
        pool.shutdown(false).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_firings() {
        let pool = Arc::new(WorkerPool::new(1));
        let sched = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        sched.add(ScheduledTask::new(
            "tick",
            Duration::from_secs(1),
            counting_action(count.clone()),
        ));
        sched.start(pool.clone());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        sched.stop().await;
        let fired = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), fired);
        pool.shutdown(false).await;
    }

    #[tokio::test(start_paused = true)]
    async fn task_added_after_start_is_picked_up() {
        let pool = Arc::new(WorkerPool::new(1));
        let sched = Scheduler::new();
        sched.start(pool.clone());

        let count = Arc::new(AtomicUsize::new(0));
        sched.add(ScheduledTask::new(
            "late",
            Duration::from_secs(1),
            counting_action(count.clone()),
        ));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        sched.stop().await;
        pool.shutdown(false).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
