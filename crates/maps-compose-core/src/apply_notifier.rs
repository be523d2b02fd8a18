//! Broadcast of committed state changes.
//!
//! The notifier is an explicit registry rather than process-wide state: every
//! [`MutableState`](crate::MutableState) is bound to one notifier, and every
//! observer registers with the notifier it wants to hear from.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::state::{StateId, StateIdSet};

/// The set of state identities changed by one commit.
pub type ChangeBatch = Arc<StateIdSet>;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ObserverId(u64);

type ApplyObserver = Rc<dyn Fn(&ChangeBatch)>;

struct NotifierInner {
    observers: RefCell<Vec<(ObserverId, ApplyObserver)>>,
    next_observer_id: Cell<u64>,
    pending_global: RefCell<StateIdSet>,
    on_pending: RefCell<Option<Rc<dyn Fn()>>>,
}

#[derive(Clone)]
pub struct ApplyNotifier {
    inner: Rc<NotifierInner>,
}

impl ApplyNotifier {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(NotifierInner {
                observers: RefCell::new(Vec::new()),
                next_observer_id: Cell::new(1),
                pending_global: RefCell::new(StateIdSet::default()),
                on_pending: RefCell::new(None),
            }),
        }
    }

    /// Registers `observer` to receive every batch dispatched from now on.
    ///
    /// The registration lives as long as the returned handle.
    #[must_use = "dropping the handle unregisters the observer"]
    pub fn register_apply_observer(
        &self,
        observer: impl Fn(&ChangeBatch) + 'static,
    ) -> ApplyObserverHandle {
        let id = ObserverId(self.inner.next_observer_id.get());
        self.inner.next_observer_id.set(id.0 + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        ApplyObserverHandle {
            notifier: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Returns `true` if global writes are waiting for
    /// [`send_apply_notifications`](Self::send_apply_notifications).
    pub fn has_pending_changes(&self) -> bool {
        !self.inner.pending_global.borrow().is_empty()
    }

    /// Installs the hook invoked when the first global write of a new batch
    /// is recorded. Runtimes use it to request a frame.
    pub fn set_pending_changes_callback(&self, callback: impl Fn() + 'static) {
        *self.inner.on_pending.borrow_mut() = Some(Rc::new(callback));
    }

    /// Dispatches every global write recorded since the last call as one
    /// batch. Returns `false` if there was nothing to send.
    pub fn send_apply_notifications(&self) -> bool {
        let changed = mem::take(&mut *self.inner.pending_global.borrow_mut());
        if changed.is_empty() {
            return false;
        }
        self.dispatch(Arc::new(changed), None);
        true
    }

    /// Returns `true` if both handles refer to the same registry.
    pub fn same_as(&self, other: &ApplyNotifier) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn record_global_write(&self, id: StateId) {
        let first = {
            let mut pending = self.inner.pending_global.borrow_mut();
            let was_empty = pending.is_empty();
            pending.insert(id);
            was_empty
        };
        if first {
            let callback = self.inner.on_pending.borrow().clone();
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    pub(crate) fn dispatch(&self, batch: ChangeBatch, origin: Option<ObserverId>) {
        let observers: Vec<ApplyObserver> = self
            .inner
            .observers
            .borrow()
            .iter()
            .filter(|(id, _)| Some(*id) != origin)
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            observer(&batch);
        }
    }
}

impl Default for ApplyNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ApplyNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyNotifier")
            .field("observers", &self.observer_count())
            .field("pending", &self.inner.pending_global.borrow().len())
            .finish()
    }
}

/// Registration returned by [`ApplyNotifier::register_apply_observer`].
///
/// The observer is removed exactly once, on [`dispose`](Self::dispose) or
/// drop, whichever comes first.
pub struct ApplyObserverHandle {
    notifier: Weak<NotifierInner>,
    id: Option<ObserverId>,
}

impl ApplyObserverHandle {
    pub fn id(&self) -> Option<ObserverId> {
        self.id
    }

    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(inner) = self.notifier.upgrade() {
            let removed = {
                let mut observers = inner.observers.borrow_mut();
                let before = observers.len();
                observers.retain(|(candidate, _)| *candidate != id);
                before - observers.len()
            };
            debug_assert_eq!(removed, 1, "apply observer {id:?} was not registered");
        }
    }
}

impl Drop for ApplyObserverHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ApplyObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyObserverHandle")
            .field("id", &self.id)
            .finish()
    }
}
