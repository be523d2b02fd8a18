//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete implementation of the platform abstraction
//! defined in `maps-compose-core`. Hosts construct a [`StdRuntime`], hand its
//! [`RuntimeHandle`] to compositions and state cells, and call
//! [`StdRuntime::pump`] from their frame loop.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use maps_compose_core::{ApplyNotifier, Runtime, RuntimeError, RuntimeHandle, RuntimeScheduler};

/// Upper bound on notify-and-run passes in a single [`StdRuntime::pump`].
const MAX_PUMP_PASSES: usize = 64;

/// Scheduler that runs tasks on a single-threaded [`LocalPool`].
pub struct StdScheduler {
    spawner: LocalSpawner,
    frame_requested: Cell<bool>,
    frame_waker: RefCell<Option<Rc<dyn Fn()>>>,
}

impl StdScheduler {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self {
            spawner,
            frame_requested: Cell::new(false),
            frame_waker: RefCell::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.replace(false)
    }

    /// Registers a waker that will be invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + 'static) {
        *self.frame_waker.borrow_mut() = Some(Rc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self.frame_waker.borrow_mut() = None;
    }

    fn wake(&self) {
        let waker = self.frame_waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("frame_requested", &self.frame_requested.get())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.set(true);
        self.wake();
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) -> Result<(), RuntimeError> {
        self.spawner.spawn_local(task).map_err(|err| {
            log::error!("failed to spawn runtime task: {err}");
            RuntimeError::from(err)
        })
    }
}

/// Convenience container bundling the executor, scheduler and runtime.
#[derive(Clone)]
pub struct StdRuntime {
    pool: Rc<RefCell<LocalPool>>,
    scheduler: Rc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let scheduler = Rc::new(StdScheduler::new(pool.spawner()));
        let runtime = Runtime::new(scheduler.clone());
        Self {
            pool: Rc::new(RefCell::new(pool)),
            scheduler,
            runtime,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn notifier(&self) -> ApplyNotifier {
        self.runtime.notifier()
    }

    pub fn scheduler(&self) -> Rc<StdScheduler> {
        Rc::clone(&self.scheduler)
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    /// Registers a waker to be called when the runtime schedules a new frame.
    pub fn set_frame_waker(&self, waker: impl Fn() + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Runs every task that can make progress without waiting.
    ///
    /// Must not be called from inside a task of this runtime.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Announces pending state changes and runs tasks until neither produces
    /// more work. Returns the number of passes taken.
    pub fn pump(&self) -> usize {
        for pass in 1..=MAX_PUMP_PASSES {
            let sent = self.runtime.send_apply_notifications();
            self.run_until_stalled();
            if !sent && !self.runtime.notifier().has_pending_changes() {
                return pass;
            }
        }
        log::warn!("runtime still busy after {MAX_PUMP_PASSES} pump passes");
        MAX_PUMP_PASSES
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
