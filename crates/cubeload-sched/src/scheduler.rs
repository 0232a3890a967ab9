//! Queue, pool, and hand-off wired together.

use std::sync::Arc;
use std::time::Duration;

use cubeload_core::{Level, Position};
use tracing::{debug, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedError;
use crate::handoff::OwnerQueue;
use crate::pool::WorkerPool;
use crate::queue::{Lane, SchedulerStats, TaskQueue};

/// Work executed off the owner for every dispatched action.
pub type Runner<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// An action whose runner finished, handed back to the owner.
///
/// The key's slot is still held: the owner decides when to
/// [`complete`](Scheduler::complete) it.
#[derive(Debug)]
pub struct Completed<A> {
    /// The key the action belonged to.
    pub key: Position,
    /// The lane whose slot is held.
    pub lane: Lane,
    /// The action, returned for the owner's follow-up.
    pub action: A,
}

/// Owner-side scheduler: queue state lives here, execution on the pool.
pub struct Scheduler<A> {
    queue: TaskQueue<A>,
    pool: WorkerPool,
    completions: OwnerQueue<Completed<A>>,
    runner: Runner<A>,
    /// Dispatched jobs whose completion has not been drained yet.
    running: usize,
}

impl<A: Send + 'static> Scheduler<A> {
    /// Build a scheduler from a validated config.
    pub fn new(config: &SchedulerConfig, runner: Runner<A>) -> Result<Self, SchedError> {
        let pool = WorkerPool::new(config.resolved_worker_count())?;
        Ok(Self {
            queue: TaskQueue::new(
                config.priority_levels,
                config.max_concurrent_loads,
                config.max_concurrent_unloads,
            ),
            pool,
            completions: OwnerQueue::new(),
            runner,
            running: 0,
        })
    }

    /// See [`TaskQueue::enqueue`].
    pub fn enqueue(&mut self, lane: Lane, key: Position, priority: Level, action: A) -> Option<A> {
        self.queue.enqueue(lane, key, priority, action)
    }

    /// See [`TaskQueue::update_priority`].
    pub fn update_priority(&mut self, key: Position, priority: Level) -> bool {
        self.queue.update_priority(key, priority)
    }

    /// See [`TaskQueue::cancel`].
    pub fn cancel(&mut self, key: Position) -> Option<A> {
        self.queue.cancel(key)
    }

    /// Dispatch everything the lane caps allow. Returns how many jobs were
    /// submitted.
    ///
    /// If the pool has been shut down the dispatched actions are dropped and
    /// their slots released.
    pub fn pump(&mut self) -> usize {
        let mut submitted = 0;
        for dispatch in self.queue.poll() {
            let runner = Arc::clone(&self.runner);
            let handle = self.completions.handle();
            let key = dispatch.key;
            let lane = dispatch.lane;
            let action = dispatch.action;
            let job = move || {
                runner(&action);
                handle.run(Completed { key, lane, action });
            };
            match self.pool.execute(job) {
                Ok(()) => {
                    submitted += 1;
                    self.running += 1;
                }
                Err(e) => {
                    warn!(%key, %lane, error = %e, "dropping dispatched action");
                    self.queue.complete(key);
                }
            }
        }
        submitted
    }

    /// Take every completion posted so far.
    pub fn drain_completed(&mut self) -> Vec<Completed<A>> {
        let done = self.completions.drain();
        self.running -= done.len();
        done
    }

    /// Block up to `timeout` for at least one completion.
    pub fn wait_completed(&mut self, timeout: Duration) -> Vec<Completed<A>> {
        if self.running == 0 {
            return self.drain_completed();
        }
        let done = self.completions.wait(timeout);
        self.running -= done.len();
        done
    }

    /// See [`TaskQueue::waiting_lane`].
    pub fn waiting_lane(&self, key: Position) -> Option<Lane> {
        self.queue.waiting_lane(key)
    }

    /// Release the slot held by `key`. See [`TaskQueue::complete`].
    pub fn complete(&mut self, key: Position) -> bool {
        self.queue.complete(key)
    }

    /// Jobs submitted to the pool whose completion has not been drained.
    pub fn running_len(&self) -> usize {
        self.running
    }

    /// Read access to the queue.
    pub fn queue(&self) -> &TaskQueue<A> {
        &self.queue
    }

    /// `true` when nothing is queued, deferred, in flight, or running.
    pub fn is_idle(&self) -> bool {
        self.running == 0 && self.queue.is_idle()
    }

    /// Cumulative queue counters.
    pub fn stats(&self) -> SchedulerStats {
        self.queue.stats()
    }

    /// One-line state for debug output.
    pub fn summary(&self) -> String {
        format!("{}, running={}", self.queue.summary(), self.running)
    }

    /// Stop the pool. Jobs already submitted still run and post their
    /// completions.
    pub fn shutdown(&mut self) {
        let joined = self.pool.shutdown();
        debug!(joined, "scheduler shut down");
    }
}

impl<A> std::fmt::Debug for Scheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queue", &self.queue.summary())
            .field("pool", &self.pool)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn inline_config() -> SchedulerConfig {
        SchedulerConfig {
            worker_count: Some(0),
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn inline_dispatch_posts_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let runner: Runner<u32> = Arc::new(move |a: &u32| log.lock().unwrap().push(*a));
        let mut s = Scheduler::new(&inline_config(), runner).unwrap();

        s.enqueue(Lane::Load, Position::new(1, 0, 0), 0, 10);
        s.enqueue(Lane::Unload, Position::new(2, 0, 0), 0, 20);
        assert_eq!(s.pump(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![10, 20]);

        let done = s.drain_completed();
        assert_eq!(done.len(), 2);
        assert!(!s.is_idle(), "slots stay held until complete()");
        for c in done {
            assert!(s.complete(c.key));
        }
        assert!(s.is_idle());
        assert_eq!(s.stats().completed, 2);
    }

    #[test]
    fn pump_after_shutdown_releases_slots() {
        let runner: Runner<()> = Arc::new(|_: &()| {});
        let mut s = Scheduler::new(&inline_config(), runner).unwrap();
        s.shutdown();
        s.enqueue(Lane::Load, Position::new(0, 0, 0), 0, ());
        assert_eq!(s.pump(), 0);
        assert!(s.is_idle());
    }

    #[test]
    fn wait_completed_with_nothing_running_returns_immediately() {
        let runner: Runner<()> = Arc::new(|_: &()| {});
        let mut s = Scheduler::new(&inline_config(), runner).unwrap();
        assert!(s.wait_completed(Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn summary_includes_running() {
        let runner: Runner<()> = Arc::new(|_: &()| {});
        let s = Scheduler::new(&inline_config(), runner).unwrap();
        assert!(s.summary().ends_with("running=0"));
    }
}
