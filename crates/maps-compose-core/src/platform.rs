//! Platform abstraction traits for the runtime.
//!
//! The host decides how frames are requested and where tasks run; the core
//! only needs a single-threaded spawner and a way to ask for a frame when
//! state changes are waiting to be announced.

use futures::future::LocalBoxFuture;

use crate::runtime::RuntimeError;

/// Schedules work for the runtime.
///
/// Implementations run every spawned task on the thread that drives the
/// runtime, so tasks may freely touch UI-thread state.
pub trait RuntimeScheduler {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);

    /// Spawn a task onto the runtime's execution thread.
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) -> Result<(), RuntimeError>;
}
