// Deferred work that runs after the response has been sent

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use crate::config::TaskConfig;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Task {
    name: &'static str,
    job: Job,
    completion: Completion,
}

#[derive(Default)]
struct Tracker {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when the task finishes, panics or is dropped unrun
struct Completion(Arc<Tracker>);

impl Drop for Completion {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Bounded queue of fire-and-forget jobs drained by a background worker.
///
/// Each job runs on its own tokio task under a timeout, so a slow or failing
/// job never blocks the ones behind it. Jobs that do not fit in the queue are
/// dropped with a warning.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
    tracker: Arc<Tracker>,
}

impl TaskQueue {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start(capacity: usize, task_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(rx, task_timeout));

        Self {
            tx,
            tracker: Arc::new(Tracker::default()),
        }
    }

    pub fn from_config(config: &TaskConfig) -> Self {
        Self::start(
            config.queue_capacity,
            Duration::from_millis(config.task_timeout_ms),
        )
    }

    /// Queue a job. Never blocks the caller.
    pub fn spawn<F>(&self, name: &'static str, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.pending.fetch_add(1, Ordering::AcqRel);
        let task = Task {
            name,
            job: Box::pin(job),
            completion: Completion(Arc::clone(&self.tracker)),
        };

        if let Err(e) = self.tx.try_send(task) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "worker stopped",
            };
            tracing::warn!("Task: {} dropped ({})", name, reason);
        }
    }

    /// Jobs queued or running
    pub fn pending(&self) -> usize {
        self.tracker.pending.load(Ordering::Acquire)
    }

    /// Resolve once every job queued so far has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.tracker.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Task>, task_timeout: Duration) {
    tracing::debug!("Task worker started");

    while let Some(task) = rx.recv().await {
        tokio::spawn(run_task(task, task_timeout));
    }

    tracing::debug!("Task worker stopped");
}

async fn run_task(task: Task, task_timeout: Duration) {
    let Task {
        name,
        job,
        completion,
    } = task;
    let start = Instant::now();

    match timeout(task_timeout, job).await {
        Ok(()) => tracing::debug!("Task: {} completed in {:?}", name, start.elapsed()),
        Err(_) => tracing::error!("Task: {} timed out after {:?}", name, task_timeout),
    }

    drop(completion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn runs_queued_jobs() {
        let queue = TaskQueue::start(16, Duration::from_secs(1));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = counter.clone();
            queue.spawn("increment", async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        queue.wait_idle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn idle_queue_returns_immediately() {
        let queue = TaskQueue::start(1, Duration::from_secs(1));
        queue.wait_idle().await;
    }

    #[tokio::test]
    async fn panicking_job_does_not_hang_waiters() {
        let queue = TaskQueue::start(4, Duration::from_secs(1));
        let ran = Arc::new(AtomicBool::new(false));

        queue.spawn("boom", async { panic!("job failed") });
        let flag = ran.clone();
        queue.spawn("after", async move {
            flag.store(true, Ordering::SeqCst);
        });
        queue.wait_idle().await;

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn slow_job_is_cut_off() {
        let queue = TaskQueue::start(4, Duration::from_millis(20));
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        queue.spawn("slow", async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });
        queue.wait_idle().await;

        assert!(!finished.load(Ordering::SeqCst));
    }
}
