use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::{abortable, AbortHandle};
use futures::task::SpawnError;

use crate::apply_notifier::ApplyNotifier;
use crate::platform::RuntimeScheduler;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn task: {0}")]
    Spawn(#[from] SpawnError),
    #[error("runtime has been dropped")]
    Dropped,
}

struct RuntimeInner {
    scheduler: Rc<dyn RuntimeScheduler>,
    notifier: ApplyNotifier,
}

/// Owns the scheduler and the apply notifier shared by every state cell
/// created for this runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        let notifier = ApplyNotifier::new();
        let frame_scheduler = Rc::downgrade(&scheduler);
        notifier.set_pending_changes_callback(move || {
            if let Some(scheduler) = frame_scheduler.upgrade() {
                scheduler.schedule_frame();
            }
        });
        Self {
            inner: Rc::new(RuntimeInner {
                scheduler,
                notifier,
            }),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
            notifier: self.inner.notifier.clone(),
        }
    }

    pub fn notifier(&self) -> ApplyNotifier {
        self.inner.notifier.clone()
    }

    /// Announces pending global writes as one batch.
    pub fn send_apply_notifications(&self) -> bool {
        self.inner.notifier.send_apply_notifications()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("notifier", &self.inner.notifier)
            .finish()
    }
}

#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
    notifier: ApplyNotifier,
}

impl RuntimeHandle {
    pub fn notifier(&self) -> ApplyNotifier {
        self.notifier.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn schedule_frame(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.scheduler.schedule_frame();
        }
    }

    /// Starts `future` as a cooperative task. The returned [`Job`] cancels
    /// it; cancellation drops the future the next time the executor runs.
    pub fn launch(&self, future: impl Future<Output = ()> + 'static) -> Result<Job, RuntimeError> {
        let inner = self.inner.upgrade().ok_or(RuntimeError::Dropped)?;
        let (task, abort) = abortable(future);
        let state = Rc::new(JobState::default());
        let completion = Rc::clone(&state);
        inner.scheduler.spawn_local(Box::pin(async move {
            if task.await.is_ok() {
                completion.completed.set(true);
            }
        }))?;
        Ok(Job { abort, state })
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[derive(Default)]
struct JobState {
    completed: Cell<bool>,
    cancelled: Cell<bool>,
}

/// Handle to a task started with [`RuntimeHandle::launch`].
///
/// Dropping a job does not cancel the task.
pub struct Job {
    abort: AbortHandle,
    state: Rc<JobState>,
}

impl Job {
    pub fn cancel(&self) {
        if self.state.completed.get() || self.state.cancelled.replace(true) {
            return;
        }
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    pub fn is_completed(&self) -> bool {
        self.state.completed.get()
    }

    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && !self.is_completed()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("completed", &self.is_completed())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
pub(crate) struct TestScheduler {
    spawner: futures::executor::LocalSpawner,
    frame_requests: Cell<usize>,
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_frame(&self) {
        self.frame_requests.set(self.frame_requests.get() + 1);
    }

    fn spawn_local(
        &self,
        task: futures::future::LocalBoxFuture<'static, ()>,
    ) -> Result<(), RuntimeError> {
        use futures::task::LocalSpawnExt;
        self.spawner.spawn_local(task)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) struct TestRuntime {
    pool: std::cell::RefCell<futures::executor::LocalPool>,
    scheduler: Rc<TestScheduler>,
    runtime: Runtime,
}

#[cfg(test)]
impl TestRuntime {
    pub(crate) fn new() -> Self {
        let pool = futures::executor::LocalPool::new();
        let scheduler = Rc::new(TestScheduler {
            spawner: pool.spawner(),
            frame_requests: Cell::new(0),
        });
        let runtime = Runtime::new(scheduler.clone());
        Self {
            pool: std::cell::RefCell::new(pool),
            scheduler,
            runtime,
        }
    }

    pub(crate) fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub(crate) fn notifier(&self) -> ApplyNotifier {
        self.runtime.notifier()
    }

    pub(crate) fn frame_requests(&self) -> usize {
        self.scheduler.frame_requests.get()
    }

    pub(crate) fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Sends pending notifications and runs tasks until both are quiet.
    pub(crate) fn pump(&self) {
        loop {
            let sent = self.runtime.send_apply_notifications();
            self.run_until_stalled();
            if !sent && !self.runtime.notifier().has_pending_changes() {
                break;
            }
        }
    }
}
