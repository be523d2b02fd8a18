//! Turning state reads into a stream of values.
//!
//! [`snapshot_flow`] evaluates a block while recording which state cells it
//! reads, then re-evaluates it whenever a committed change batch touches one
//! of those cells. Batches that pile up while the consumer is busy are
//! drained together, so a burst of changes costs at most one re-evaluation.
//!
//! ```
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use maps_compose_core::{snapshot_flow, ApplyNotifier, MutableState};
//!
//! let notifier = ApplyNotifier::new();
//! let zoom = MutableState::new(10, &notifier);
//! let flow = snapshot_flow(&notifier, {
//!     let zoom = zoom.clone();
//!     move || zoom.get() * 2
//! });
//! let mut values = flow.values();
//! assert_eq!(block_on(values.next()), Some(20));
//! ```

use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::{Stream, StreamExt};

use crate::apply_notifier::{ApplyNotifier, ApplyObserverHandle, ChangeBatch};
use crate::snapshot::{take_root_mutable_snapshot, ReadObserver};
use crate::state::StateIdSet;

type Block<T, E> = Rc<dyn Fn() -> Result<T, E>>;

/// A cold, restartable description of a snapshot-driven stream.
///
/// Nothing is evaluated until a stream obtained from [`stream`](Self::stream)
/// or [`values`](Self::values) is polled, and every stream is independent.
pub struct SnapshotFlow<T, E = Infallible> {
    notifier: ApplyNotifier,
    block: Block<T, E>,
}

impl<T, E> Clone for SnapshotFlow<T, E> {
    fn clone(&self) -> Self {
        Self {
            notifier: self.notifier.clone(),
            block: Rc::clone(&self.block),
        }
    }
}

impl<T, E> fmt::Debug for SnapshotFlow<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotFlow")
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Turns the state reads of `block` into a stream of values.
///
/// The returned flow is lazy: `block` first runs when a stream is polled. It
/// runs again only after a change batch on `notifier` touches a cell it read
/// last time, and batches that queue up meanwhile cost one re-evaluation.
/// A result equal to the previously emitted one is not emitted.
///
/// ```
/// use futures::{FutureExt, StreamExt};
/// use maps_compose_core::{snapshot_flow, ApplyNotifier, MutableState};
///
/// let notifier = ApplyNotifier::new();
/// let zoom = MutableState::new(3, &notifier);
/// let flow = snapshot_flow(&notifier, {
///     let zoom = zoom.clone();
///     move || zoom.get() > 5
/// });
/// let mut values = flow.values();
/// assert_eq!(values.next().now_or_never(), Some(Some(false)));
///
/// zoom.set(4);
/// notifier.send_apply_notifications();
/// assert_eq!(values.next().now_or_never(), None);
///
/// zoom.set(8);
/// notifier.send_apply_notifications();
/// assert_eq!(values.next().now_or_never(), Some(Some(true)));
/// ```
pub fn snapshot_flow<T, F>(notifier: &ApplyNotifier, block: F) -> SnapshotFlow<T>
where
    F: Fn() -> T + 'static,
    T: 'static,
{
    SnapshotFlow {
        notifier: notifier.clone(),
        block: Rc::new(move || Ok(block())),
    }
}

/// Fallible variant of [`snapshot_flow`]. The first `Err` is yielded and
/// ends the stream.
pub fn try_snapshot_flow<T, E, F>(notifier: &ApplyNotifier, block: F) -> SnapshotFlow<T, E>
where
    F: Fn() -> Result<T, E> + 'static,
{
    SnapshotFlow {
        notifier: notifier.clone(),
        block: Rc::new(block),
    }
}

impl<T: Clone + PartialEq, E> SnapshotFlow<T, E> {
    pub fn stream(&self) -> SnapshotStream<T, E> {
        SnapshotStream {
            notifier: self.notifier.clone(),
            block: Rc::clone(&self.block),
            reads: Rc::new(RefCell::new(StateIdSet::default())),
            subscription: None,
            last: None,
            done: false,
        }
    }
}

impl<T: Clone + PartialEq> SnapshotFlow<T, Infallible> {
    pub fn values(&self) -> SnapshotValues<T> {
        SnapshotValues {
            inner: self.stream(),
        }
    }
}

struct Subscription {
    // Field order matters: the registration goes first so the sender it owns
    // is gone before the receiver.
    handle: ApplyObserverHandle,
    receiver: UnboundedReceiver<ChangeBatch>,
}

/// One running collection of a [`SnapshotFlow`].
///
/// Dropping the stream unregisters it from the notifier.
pub struct SnapshotStream<T, E = Infallible> {
    notifier: ApplyNotifier,
    block: Block<T, E>,
    reads: Rc<RefCell<StateIdSet>>,
    subscription: Option<Subscription>,
    last: Option<T>,
    done: bool,
}

// No field is structurally pinned.
impl<T, E> Unpin for SnapshotStream<T, E> {}

impl<T: Clone + PartialEq, E> SnapshotStream<T, E> {
    fn subscribe(&mut self) {
        let (sender, receiver) = mpsc::unbounded();
        let handle = self.notifier.register_apply_observer(move |batch| {
            // A closed receiver means the stream is being torn down.
            let _ = sender.unbounded_send(Arc::clone(batch));
        });
        self.subscription = Some(Subscription { handle, receiver });
    }

    fn evaluate(&mut self) -> Result<T, E> {
        self.reads.borrow_mut().clear();
        let reads = Rc::clone(&self.reads);
        let observer: ReadObserver = Rc::new(move |id| {
            reads.borrow_mut().insert(id);
        });
        // A root snapshot, so the block's writes are announced with this stream as
        // their origin even when polled inside another snapshot.
        let snapshot = take_root_mutable_snapshot(&self.notifier, Some(observer));
        let block = Rc::clone(&self.block);
        let result = snapshot.enter(|| block());
        if result.is_ok() {
            let origin = self
                .subscription
                .as_ref()
                .and_then(|subscription| subscription.handle.id());
            snapshot.apply_from(origin);
        }
        result
    }

    /// Waits for at least one batch, then drains whatever else is already
    /// queued. Yields whether any drained batch touched the read set, or
    /// `None` once the notifier is gone.
    fn poll_changes(&mut self, cx: &mut Context<'_>) -> Poll<Option<bool>> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Poll::Ready(None);
        };
        let first = match subscription.receiver.poll_next_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => return Poll::Ready(None),
            Poll::Ready(Some(batch)) => batch,
        };
        let reads = self.reads.borrow();
        let mut found = intersects(&first, &reads);
        let mut drained = 1usize;
        while let Poll::Ready(Some(batch)) = subscription.receiver.poll_next_unpin(cx) {
            drained += 1;
            if !found {
                found = intersects(&batch, &reads);
            }
        }
        if drained > 1 {
            log::trace!("snapshot flow coalesced {drained} change batches");
        }
        Poll::Ready(Some(found))
    }

    fn finish(&mut self) {
        self.done = true;
        self.subscription = None;
    }
}

impl<T: Clone + PartialEq, E> Stream for SnapshotStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if this.subscription.is_none() {
            // Register before evaluating so changes committed during the
            // first evaluation are not missed.
            this.subscribe();
            return Poll::Ready(Some(match this.evaluate() {
                Ok(value) => {
                    this.last = Some(value.clone());
                    Ok(value)
                }
                Err(err) => {
                    this.finish();
                    Err(err)
                }
            }));
        }

        loop {
            match this.poll_changes(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.finish();
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(false)) => {
                    log::trace!("snapshot flow skipped unrelated changes");
                }
                Poll::Ready(Some(true)) => match this.evaluate() {
                    Ok(value) => {
                        if this.last.as_ref() != Some(&value) {
                            this.last = Some(value.clone());
                            return Poll::Ready(Some(Ok(value)));
                        }
                        log::trace!("snapshot flow suppressed an equal value");
                    }
                    Err(err) => {
                        this.finish();
                        return Poll::Ready(Some(Err(err)));
                    }
                },
            }
        }
    }
}

impl<T, E> fmt::Debug for SnapshotStream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("reads", &self.reads.borrow().len())
            .field("subscribed", &self.subscription.is_some())
            .field("done", &self.done)
            .finish()
    }
}

/// Infallible stream of values produced by [`SnapshotFlow::values`].
pub struct SnapshotValues<T> {
    inner: SnapshotStream<T, Infallible>,
}

impl<T: Clone + PartialEq> Stream for SnapshotValues<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(value))) => Poll::Ready(Some(value)),
            Poll::Ready(Some(Err(never))) => match never {},
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for SnapshotValues<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnapshotValues").field(&self.inner).finish()
    }
}

/// Returns `true` if the two sets share an element, probing the larger set
/// with the members of the smaller one.
pub fn intersects(a: &StateIdSet, b: &StateIdSet) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().any(|id| large.contains(id))
}
