//! Observable state cells.
//!
//! A [`MutableState`] is the unit of change tracking: every read is reported
//! to the snapshots currently entered on this thread, and every write is
//! either buffered in the innermost mutable snapshot or published to the
//! cell's [`ApplyNotifier`] as a pending global change.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::apply_notifier::ApplyNotifier;
use crate::collections::map::HashSet;
use crate::runtime::RuntimeHandle;
use crate::snapshot;

/// Process-unique identity of a state cell. Identities are never reused.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct StateId(usize);

static NEXT_STATE_ID: AtomicUsize = AtomicUsize::new(1);

impl StateId {
    fn next() -> Self {
        StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

pub type StateIdSet = HashSet<StateId>;

/// Decides whether a write actually changes a cell.
pub trait MutationPolicy<T>: 'static {
    fn equivalent(&self, a: &T, b: &T) -> bool;
}

/// Writes of a value equal to the current one are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralEqualityPolicy;

impl<T: PartialEq> MutationPolicy<T> for StructuralEqualityPolicy {
    fn equivalent(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Every write counts as a change. Used for values without meaningful
/// equality, such as callbacks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverEqualPolicy;

impl<T> MutationPolicy<T> for NeverEqualPolicy {
    fn equivalent(&self, _a: &T, _b: &T) -> bool {
        false
    }
}

/// Type-erased view of a cell used by snapshots to commit buffered writes.
pub(crate) trait StateObject {
    fn state_id(&self) -> StateId;

    /// The notifier this cell announces its changes through.
    fn notifier(&self) -> &ApplyNotifier;

    /// Installs a value buffered by a snapshot. Returns `true` if the
    /// committed value changed under the cell's policy.
    fn commit(&self, value: Box<dyn Any>) -> bool;
}

struct MutableStateInner<T> {
    id: StateId,
    value: RefCell<T>,
    policy: Box<dyn MutationPolicy<T>>,
    notifier: ApplyNotifier,
}

impl<T: Clone + 'static> StateObject for MutableStateInner<T> {
    fn state_id(&self) -> StateId {
        self.id
    }

    fn notifier(&self) -> &ApplyNotifier {
        &self.notifier
    }

    fn commit(&self, value: Box<dyn Any>) -> bool {
        let value = match value.downcast::<T>() {
            Ok(value) => *value,
            Err(_) => panic!(
                "snapshot committed a value of the wrong type to state {:?}",
                self.id
            ),
        };
        let mut current = self.value.borrow_mut();
        if self.policy.equivalent(&current, &value) {
            return false;
        }
        *current = value;
        true
    }
}

/// Read-only view of a [`MutableState`].
pub struct State<T> {
    inner: Rc<MutableStateInner<T>>,
}

pub struct MutableState<T> {
    inner: Rc<MutableStateInner<T>>,
}

impl<T> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for State<T> {}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for MutableState<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for MutableState<T> {}

impl<T> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> MutableState<T> {
    /// Creates a cell with structural equality, publishing global writes to
    /// `notifier`.
    pub fn new(value: T, notifier: &ApplyNotifier) -> Self {
        Self::with_policy(value, notifier, StructuralEqualityPolicy)
    }

    pub fn with_runtime(value: T, runtime: &RuntimeHandle) -> Self {
        Self::new(value, &runtime.notifier())
    }
}

impl<T: Clone + 'static> MutableState<T> {
    pub fn with_policy(
        value: T,
        notifier: &ApplyNotifier,
        policy: impl MutationPolicy<T>,
    ) -> Self {
        Self {
            inner: Rc::new(MutableStateInner {
                id: StateId::next(),
                value: RefCell::new(value),
                policy: Box::new(policy),
                notifier: notifier.clone(),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> StateId {
        self.inner.id
    }

    pub fn as_state(&self) -> State<T> {
        State {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.as_state().with(f)
    }

    pub fn get(&self) -> T {
        self.as_state().get()
    }

    pub fn value(&self) -> T {
        self.get()
    }

    /// Reads the value without reporting the read to any snapshot.
    pub fn peek(&self) -> T {
        self.as_state().peek()
    }

    pub fn set(&self, value: T) {
        let inner = &self.inner;
        if let Some(snapshot) = snapshot::current_mutable_snapshot() {
            let equivalent = match snapshot::pending_value::<T>(inner.id) {
                Some(pending) => inner.policy.equivalent(&pending, &value),
                None => inner.policy.equivalent(&inner.value.borrow(), &value),
            };
            if !equivalent {
                let object: Rc<dyn StateObject> = Rc::clone(inner) as Rc<dyn StateObject>;
                snapshot.record_write(object, Box::new(value));
            }
            return;
        }

        let changed = {
            let mut current = inner.value.borrow_mut();
            if inner.policy.equivalent(&current, &value) {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            inner.notifier.record_global_write(inner.id);
        }
    }

    pub fn replace(&self, value: T) {
        self.set(value);
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self.peek();
        let result = f(&mut value);
        self.set(value);
        result
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for MutableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableState")
            .field("id", &self.inner.id)
            .field("value", &self.peek())
            .finish()
    }
}

impl<T: Clone + 'static> State<T> {
    #[inline]
    pub fn id(&self) -> StateId {
        self.inner.id
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        snapshot::record_read(self.inner.id);
        match snapshot::pending_value::<T>(self.inner.id) {
            Some(pending) => f(&pending),
            None => f(&self.inner.value.borrow()),
        }
    }

    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    pub fn value(&self) -> T {
        self.get()
    }

    pub fn peek(&self) -> T {
        match snapshot::pending_value::<T>(self.inner.id) {
            Some(pending) => pending,
            None => self.inner.value.borrow().clone(),
        }
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("value", &self.peek())
            .finish()
    }
}
