//! Delayed one-shot task scheduler.
//!
//! [`RetryScheduler`] keeps a deadline-ordered queue of [`RetryTask`]s and
//! drains it from a single background tokio task, running due tasks one at
//! a time through a [`TaskHandler`]. Tasks can be cancelled individually by
//! [`TaskId`]; [`dispose`](RetryScheduler::dispose) discards everything
//! still pending without running it.
//!
//! All timing goes through [`tokio::time`], so tests drive the scheduler
//! with a paused clock (`#[tokio::test(start_paused = true)]`).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info_span};

use gooey_types::error::{GooeyError, Result};

/// Identity of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Executes fired tasks. Implemented by the owner of the scheduled work.
#[async_trait]
pub trait TaskHandler<A: Send + 'static>: Send + Sync {
    /// Run one fired task. Never called concurrently with itself.
    async fn run_task(&self, id: TaskId, action: A);
}

/// A unit of work waiting for its deadline.
#[derive(Debug)]
pub struct RetryTask<A> {
    /// Task identity.
    pub id: TaskId,
    /// When the task becomes due.
    pub deadline: Instant,
    /// What to do when it fires.
    pub action: A,
}

impl<A> PartialEq for RetryTask<A> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl<A> Eq for RetryTask<A> {}

impl<A> PartialOrd for RetryTask<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for RetryTask<A> {
    // Earlier deadline first; ties broken by scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.id).cmp(&(other.deadline, other.id))
    }
}

struct Queue<A> {
    heap: BinaryHeap<Reverse<RetryTask<A>>>,
    live: HashSet<TaskId>,
    next_id: u64,
    closed: bool,
}

impl<A> Queue<A> {
    /// Drop cancelled entries off the top and report the next deadline.
    fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.live.contains(&top.id) {
                return Some(top.deadline);
            }
            self.heap.pop();
        }
        None
    }

    fn pop_due(&mut self, now: Instant) -> Option<RetryTask<A>> {
        let deadline = self.next_deadline()?;
        if deadline > now {
            return None;
        }
        let Reverse(task) = self.heap.pop()?;
        self.live.remove(&task.id);
        Some(task)
    }
}

struct Inner<A> {
    queue: Mutex<Queue<A>>,
    notify: Notify,
    cancel: CancellationToken,
    span: Span,
}

/// Deadline queue drained by one background worker.
///
/// Cloning yields another handle to the same queue.
pub struct RetryScheduler<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for RetryScheduler<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + fmt::Debug + 'static> Default for RetryScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Send + fmt::Debug + 'static> RetryScheduler<A> {
    /// Create an idle scheduler. Call [`start`](Self::start) to begin
    /// executing tasks; tasks scheduled before that simply wait.
    pub fn new() -> Self {
        Self::with_span(info_span!("scheduler"))
    }

    /// Create a scheduler that logs under `span`.
    pub fn with_span(span: Span) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(Queue {
                    heap: BinaryHeap::new(),
                    live: HashSet::new(),
                    next_id: 0,
                    closed: false,
                }),
                notify: Notify::new(),
                cancel: CancellationToken::new(),
                span,
            }),
        }
    }

    /// Spawn the worker that runs due tasks through `handler`.
    pub fn start(&self, handler: Arc<dyn TaskHandler<A>>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { worker(inner, handler).await })
    }

    /// Schedule `action` to run once after `delay`.
    ///
    /// Fails with [`GooeyError::DelayOutOfRange`] when `delay` does not fit
    /// on the clock.
    pub fn schedule(&self, delay: Duration, action: A) -> Result<TaskId> {
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or(GooeyError::DelayOutOfRange {
                secs: delay.as_secs(),
            })?;
        let mut queue = self.inner.queue.lock();
        if queue.closed {
            return Err(GooeyError::SchedulerClosed);
        }
        let id = TaskId(queue.next_id);
        queue.next_id += 1;
        debug!(
            parent: &self.inner.span,
            task = %id,
            delay_secs = delay.as_secs(),
            action = ?action,
            "scheduled retry task"
        );
        queue.live.insert(id);
        queue.heap.push(Reverse(RetryTask {
            id,
            deadline,
            action,
        }));
        drop(queue);
        self.inner.notify.notify_one();
        Ok(id)
    }

    /// Cancel a pending task. Returns `false` if it already ran, was
    /// already cancelled, or never existed.
    pub fn cancel(&self, id: TaskId) -> bool {
        let removed = self.inner.queue.lock().live.remove(&id);
        if removed {
            debug!(parent: &self.inner.span, task = %id, "cancelled retry task");
            self.inner.notify.notify_one();
        }
        removed
    }

    /// Whether `id` is still waiting to fire.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.inner.queue.lock().live.contains(&id)
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().live.len()
    }

    /// Discard every pending task without running it and stop the worker.
    ///
    /// Idempotent. Later calls to [`schedule`](Self::schedule) fail with
    /// [`GooeyError::SchedulerClosed`].
    pub fn dispose(&self) {
        let discarded = {
            let mut queue = self.inner.queue.lock();
            queue.closed = true;
            queue.heap.clear();
            let n = queue.live.len();
            queue.live.clear();
            n
        };
        self.inner.cancel.cancel();
        debug!(parent: &self.inner.span, discarded, "retry scheduler disposed");
    }
}

async fn worker<A: Send + 'static>(inner: Arc<Inner<A>>, handler: Arc<dyn TaskHandler<A>>) {
    loop {
        let next = inner.queue.lock().next_deadline();

        match next {
            None => {
                tokio::select! {
                    biased;
                    _ = inner.cancel.cancelled() => return,
                    _ = inner.notify.notified() => continue,
                }
            }
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = inner.cancel.cancelled() => return,
                    _ = inner.notify.notified() => continue,
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
        }

        // Take one due task at a time so a task cancelled by the previous
        // one's side effects never runs.
        loop {
            if inner.cancel.is_cancelled() {
                return;
            }
            let due = inner.queue.lock().pop_due(Instant::now());
            let Some(task) = due else { break };
            handler.run_task(task.id, task.action).await;
        }
    }
}
