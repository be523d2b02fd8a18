//! Mutable snapshots and read tracking.
//!
//! Snapshots entered on a thread form a stack. Reads of any [`MutableState`]
//! are reported to the read observer of every snapshot on the stack, and
//! writes are buffered in the innermost snapshot until it is applied. A root
//! snapshot commits its buffered writes to the cells and announces the cells
//! that actually changed, one batch per [`ApplyNotifier`] the cells are bound
//! to.
//!
//! [`MutableState`]: crate::MutableState

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::apply_notifier::{ApplyNotifier, ObserverId};
use crate::collections::map::HashMap;
use crate::state::{StateId, StateIdSet, StateObject};

pub type SnapshotId = usize;

/// Callback invoked with the identity of every state read inside a snapshot.
pub type ReadObserver = Rc<dyn Fn(StateId)>;

static NEXT_SNAPSHOT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static SNAPSHOT_STACK: RefCell<Vec<Rc<SnapshotInner>>> = const { RefCell::new(Vec::new()) };
}

struct PendingWrite {
    object: Rc<dyn StateObject>,
    value: Box<dyn Any>,
}

pub(crate) struct SnapshotInner {
    id: SnapshotId,
    parent: Option<Rc<SnapshotInner>>,
    read_observer: Option<ReadObserver>,
    pending: RefCell<HashMap<StateId, PendingWrite>>,
    notifier: ApplyNotifier,
    closed: Cell<bool>,
}

impl SnapshotInner {
    pub(crate) fn record_write(&self, object: Rc<dyn StateObject>, value: Box<dyn Any>) {
        let id = object.state_id();
        self.pending
            .borrow_mut()
            .insert(id, PendingWrite { object, value });
    }

    fn pending_value<T: Clone + 'static>(&self, id: StateId) -> Option<T> {
        self.pending
            .borrow()
            .get(&id)
            .and_then(|write| write.value.downcast_ref::<T>())
            .cloned()
    }

    fn take_pending(&self) -> HashMap<StateId, PendingWrite> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

/// A snapshot whose writes stay private until [`MutableSnapshot::apply`].
///
/// Dropping a snapshot without applying it discards its writes.
pub struct MutableSnapshot {
    inner: Rc<SnapshotInner>,
}

impl fmt::Debug for MutableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableSnapshot")
            .field("id", &self.inner.id)
            .field("pending", &self.inner.pending.borrow().len())
            .field("nested", &self.inner.parent.is_some())
            .finish()
    }
}

/// Takes a mutable snapshot nested in the snapshot currently entered on this
/// thread, if any.
pub fn take_mutable_snapshot(
    notifier: &ApplyNotifier,
    read_observer: Option<ReadObserver>,
) -> MutableSnapshot {
    let parent = SNAPSHOT_STACK.with(|stack| stack.borrow().last().cloned());
    new_snapshot(notifier, read_observer, parent)
}

/// Takes a mutable snapshot that applies straight to the cells, even while
/// another snapshot is entered. It does not see writes buffered by the
/// snapshots below it.
pub(crate) fn take_root_mutable_snapshot(
    notifier: &ApplyNotifier,
    read_observer: Option<ReadObserver>,
) -> MutableSnapshot {
    new_snapshot(notifier, read_observer, None)
}

fn new_snapshot(
    notifier: &ApplyNotifier,
    read_observer: Option<ReadObserver>,
    parent: Option<Rc<SnapshotInner>>,
) -> MutableSnapshot {
    MutableSnapshot {
        inner: Rc::new(SnapshotInner {
            id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            parent,
            read_observer,
            pending: RefCell::new(HashMap::default()),
            notifier: notifier.clone(),
            closed: Cell::new(false),
        }),
    }
}

/// Runs `block` in a fresh mutable snapshot and applies it.
pub fn with_mutable_snapshot<R>(notifier: &ApplyNotifier, block: impl FnOnce() -> R) -> R {
    let snapshot = take_mutable_snapshot(notifier, None);
    let result = snapshot.enter(block);
    snapshot.apply();
    result
}

struct EnteredGuard {
    id: SnapshotId,
}

impl Drop for EnteredGuard {
    fn drop(&mut self) {
        SNAPSHOT_STACK.with(|stack| {
            let popped = stack
                .borrow_mut()
                .pop()
                .expect("snapshot stack underflow: attempted to leave a snapshot that was never entered");
            debug_assert_eq!(
                popped.id, self.id,
                "snapshots must be left in the order they were entered"
            );
        });
    }
}

impl MutableSnapshot {
    #[inline]
    pub fn id(&self) -> SnapshotId {
        self.inner.id
    }

    /// Makes this snapshot current for the duration of `block`.
    pub fn enter<R>(&self, block: impl FnOnce() -> R) -> R {
        SNAPSHOT_STACK.with(|stack| stack.borrow_mut().push(Rc::clone(&self.inner)));
        let _guard = EnteredGuard { id: self.inner.id };
        block()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    /// Commits the snapshot.
    ///
    /// A nested snapshot hands its writes to its parent; a root snapshot
    /// installs them and returns the identities of the cells that changed.
    pub fn apply(self) -> StateIdSet {
        self.apply_from(None)
    }

    /// Like [`apply`](Self::apply), but the batch sent through this snapshot's
    /// notifier is not delivered to the observer `origin`.
    pub(crate) fn apply_from(self, origin: Option<ObserverId>) -> StateIdSet {
        let pending = self.inner.take_pending();
        self.inner.closed.set(true);

        if let Some(parent) = self.inner.parent.as_ref().filter(|p| !p.closed.get()) {
            let merged: StateIdSet = pending.keys().copied().collect();
            parent.pending.borrow_mut().extend(pending);
            return merged;
        }

        let mut changed = StateIdSet::default();
        let mut batches: Vec<(ApplyNotifier, StateIdSet)> = Vec::new();
        for (id, write) in pending {
            let notifier = write.object.notifier().clone();
            if !write.object.commit(write.value) {
                continue;
            }
            changed.insert(id);
            match batches.iter_mut().find(|(n, _)| n.same_as(&notifier)) {
                Some((_, ids)) => {
                    ids.insert(id);
                }
                None => {
                    let mut ids = StateIdSet::default();
                    ids.insert(id);
                    batches.push((notifier, ids));
                }
            }
        }
        if !changed.is_empty() {
            log::trace!(
                "snapshot {} applied {} changed state(s) across {} notifier(s)",
                self.inner.id,
                changed.len(),
                batches.len()
            );
        }
        for (notifier, ids) in batches {
            // The origin observer id is only meaningful on the snapshot's own
            // notifier.
            let origin = origin.filter(|_| notifier.same_as(&self.inner.notifier));
            notifier.dispatch(Arc::new(ids), origin);
        }
        changed
    }
}

impl Drop for MutableSnapshot {
    fn drop(&mut self) {
        if !self.inner.closed.replace(true) {
            let discarded = self.inner.take_pending().len();
            if discarded > 0 {
                log::trace!(
                    "snapshot {} disposed, discarding {} write(s)",
                    self.inner.id,
                    discarded
                );
            }
        }
    }
}

pub(crate) fn current_mutable_snapshot() -> Option<Rc<SnapshotInner>> {
    SNAPSHOT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Returns the value buffered for `id` by the innermost entered snapshot
/// that wrote it, looking no further down than the nearest root snapshot.
pub(crate) fn pending_value<T: Clone + 'static>(id: StateId) -> Option<T> {
    SNAPSHOT_STACK.with(|stack| {
        let stack = stack.borrow();
        if stack.is_empty() {
            return None;
        }
        for snapshot in stack.iter().rev() {
            if let Some(value) = snapshot.pending_value::<T>(id) {
                return Some(value);
            }
            if snapshot.parent.is_none() {
                break;
            }
        }
        None
    })
}

pub(crate) fn record_read(id: StateId) {
    let observers: Vec<ReadObserver> = SNAPSHOT_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter_map(|snapshot| snapshot.read_observer.clone())
            .collect()
    });
    for observer in observers {
        observer(id);
    }
}

/// Returns `true` while at least one snapshot is entered on this thread.
pub fn in_snapshot() -> bool {
    SNAPSHOT_STACK.with(|stack| !stack.borrow().is_empty())
}
