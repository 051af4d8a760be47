//! Shared time-based task scheduler
//!
//! Every delayed task of a session (window terminators, aggregators, the
//! stream shutdown timer) registers here. Delays are measured from a single
//! origin instant, so tasks scheduled in a loop do not drift relative to one
//! another, and no per-window executor is created.

use std::future::Future;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

pub struct TaskScheduler {
    origin: Instant,
    tasks: JoinSet<()>,
    shutdown: CancellationToken,
}

impl TaskScheduler {
    /// Create a scheduler whose delays count from now
    ///
    /// Tasks that have not started when `shutdown` fires are skipped.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            origin: Instant::now(),
            tasks: JoinSet::new(),
            shutdown,
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Run `task` once, `delay` after the origin
    pub fn schedule<F>(&mut self, label: impl Into<String>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        let deadline = self.origin + delay;
        let shutdown = self.shutdown.clone();

        self.tasks.spawn(async move {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    log::debug!("Skipping {}: session shut down before it started", label);
                    return;
                }
                _ = sleep_until(deadline) => {}
            }

            log::debug!("⏰ Firing {}", label);
            task.await;
        });
    }

    /// Tasks registered and not yet joined
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every registered task to finish
    ///
    /// A panicking task is logged and does not affect its siblings.
    pub async fn join_all(&mut self) -> usize {
        let mut completed = 0;
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(()) => completed += 1,
                Err(e) => log::error!("❌ Scheduled task failed: {}", e),
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_tasks_fire_at_their_delay() {
        let mut scheduler = TaskScheduler::new(CancellationToken::new());
        let origin = scheduler.origin();
        let fired = Arc::new(Mutex::new(Vec::new()));

        for (i, secs) in [3u64, 1, 2].into_iter().enumerate() {
            let fired = fired.clone();
            scheduler.schedule(format!("task-{}", i), Duration::from_secs(secs), async move {
                fired.lock().unwrap().push((secs, origin.elapsed()));
            });
        }
        assert_eq!(scheduler.pending(), 3);

        assert_eq!(scheduler.join_all().await, 3);

        let fired = fired.lock().unwrap();
        let order: Vec<u64> = fired.iter().map(|(secs, _)| *secs).collect();
        assert_eq!(order, vec![1, 2, 3]);
        for (secs, elapsed) in fired.iter() {
            assert!(*elapsed >= Duration::from_secs(*secs));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_skips_unstarted_tasks() {
        let shutdown = CancellationToken::new();
        let mut scheduler = TaskScheduler::new(shutdown.clone());
        let fired = Arc::new(Mutex::new(Vec::new()));

        for secs in [1u64, 10] {
            let fired = fired.clone();
            scheduler.schedule("task", Duration::from_secs(secs), async move {
                fired.lock().unwrap().push(secs);
            });
        }
        scheduler.schedule("shutdown", Duration::from_secs(5), async move {
            shutdown.cancel();
        });

        scheduler.join_all().await;
        assert_eq!(*fired.lock().unwrap(), vec![1]);
    }
}
