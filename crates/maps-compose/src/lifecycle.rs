//! Forwarding host lifecycle transitions to the embedded map widget.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use maps_compose_core::{Applier, Composer};

use crate::widget::{MapWidget, SavedState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
    /// Matches every event when filtering; never dispatched by a lifecycle.
    Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleState {
    Destroyed,
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleEvent {
    /// The state a lifecycle is in right after dispatching this event.
    pub fn target_state(self) -> Option<LifecycleState> {
        match self {
            LifecycleEvent::Create | LifecycleEvent::Stop => Some(LifecycleState::Created),
            LifecycleEvent::Start | LifecycleEvent::Pause => Some(LifecycleState::Started),
            LifecycleEvent::Resume => Some(LifecycleState::Resumed),
            LifecycleEvent::Destroy => Some(LifecycleState::Destroyed),
            LifecycleEvent::Any => None,
        }
    }

    /// The event that moves a lifecycle one step up from `state`.
    pub fn up_from(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Initialized => Some(LifecycleEvent::Create),
            LifecycleState::Created => Some(LifecycleEvent::Start),
            LifecycleState::Started => Some(LifecycleEvent::Resume),
            LifecycleState::Destroyed | LifecycleState::Resumed => None,
        }
    }
}

pub trait LifecycleObserver {
    fn on_state_changed(&self, event: LifecycleEvent);
}

pub trait Lifecycle {
    fn current_state(&self) -> LifecycleState;
    fn add_observer(&self, observer: Rc<dyn LifecycleObserver>);
    fn remove_observer(&self, observer: &Rc<dyn LifecycleObserver>);
}

pub trait ComponentCallbacks {
    fn on_low_memory(&self);
}

pub trait ComponentCallbacksHost {
    fn register_component_callbacks(&self, callbacks: Rc<dyn ComponentCallbacks>);
    fn unregister_component_callbacks(&self, callbacks: &Rc<dyn ComponentCallbacks>);
}

fn same_object<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// A host lifecycle driven by explicit events.
///
/// Observers added late are brought up to the current state by replaying
/// the events they missed.
pub struct LifecycleRegistry {
    state: Cell<LifecycleState>,
    observers: RefCell<Vec<Rc<dyn LifecycleObserver>>>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self {
            state: Cell::new(LifecycleState::Initialized),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Moves to the state `event` leads to and notifies every observer.
    ///
    /// # Panics
    ///
    /// Panics on [`LifecycleEvent::Any`].
    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        let Some(next) = event.target_state() else {
            panic!("{event:?} cannot be dispatched by a lifecycle");
        };
        self.state.set(next);
        log::debug!("lifecycle {event:?} -> {next:?}");
        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer.on_state_changed(event);
        }
    }
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for LifecycleRegistry {
    fn current_state(&self) -> LifecycleState {
        self.state.get()
    }

    fn add_observer(&self, observer: Rc<dyn LifecycleObserver>) {
        self.observers.borrow_mut().push(Rc::clone(&observer));
        let target = self.state.get();
        let mut reached = LifecycleState::Initialized;
        while reached < target {
            let Some(event) = LifecycleEvent::up_from(reached) else {
                break;
            };
            observer.on_state_changed(event);
            match event.target_state() {
                Some(state) => reached = state,
                None => break,
            }
        }
    }

    fn remove_observer(&self, observer: &Rc<dyn LifecycleObserver>) {
        self.observers
            .borrow_mut()
            .retain(|candidate| !same_object(candidate, observer));
    }
}

impl fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("state", &self.state.get())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Broadcasts host-level signals such as low memory.
#[derive(Default)]
pub struct ComponentCallbacksRegistry {
    callbacks: RefCell<Vec<Rc<dyn ComponentCallbacks>>>,
}

impl ComponentCallbacksRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn dispatch_low_memory(&self) {
        let callbacks = self.callbacks.borrow().clone();
        for callback in callbacks {
            callback.on_low_memory();
        }
    }
}

impl ComponentCallbacksHost for ComponentCallbacksRegistry {
    fn register_component_callbacks(&self, callbacks: Rc<dyn ComponentCallbacks>) {
        self.callbacks.borrow_mut().push(callbacks);
    }

    fn unregister_component_callbacks(&self, callbacks: &Rc<dyn ComponentCallbacks>) {
        self.callbacks
            .borrow_mut()
            .retain(|candidate| !same_object(candidate, callbacks));
    }
}

impl fmt::Debug for ComponentCallbacksRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCallbacksRegistry")
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

/// Host services a map needs to follow its container.
#[derive(Clone)]
pub struct MapHost {
    pub lifecycle: Rc<dyn Lifecycle>,
    pub component_callbacks: Rc<dyn ComponentCallbacksHost>,
}

impl fmt::Debug for MapHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHost")
            .field("lifecycle_state", &self.lifecycle.current_state())
            .finish()
    }
}

pub struct MapLifecycleObserver<W> {
    widget: Rc<W>,
}

impl<W: MapWidget> MapLifecycleObserver<W> {
    pub fn new(widget: Rc<W>) -> Self {
        Self { widget }
    }
}

impl<W: MapWidget> LifecycleObserver for MapLifecycleObserver<W> {
    fn on_state_changed(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Create => self.widget.on_create(&SavedState::empty()),
            LifecycleEvent::Start => self.widget.on_start(),
            LifecycleEvent::Resume => self.widget.on_resume(),
            LifecycleEvent::Pause => self.widget.on_pause(),
            LifecycleEvent::Stop => self.widget.on_stop(),
            LifecycleEvent::Destroy => self.widget.on_destroy(),
            LifecycleEvent::Any => panic!("unsupported lifecycle event {event:?}"),
        }
    }
}

pub struct MapComponentCallbacks<W> {
    widget: Rc<W>,
}

impl<W: MapWidget> MapComponentCallbacks<W> {
    pub fn new(widget: Rc<W>) -> Self {
        Self { widget }
    }
}

impl<W: MapWidget> ComponentCallbacks for MapComponentCallbacks<W> {
    fn on_low_memory(&self) {
        self.widget.on_low_memory();
    }
}

/// Keeps a lifecycle observer registered until dropped.
#[must_use = "dropping the registration removes the observer"]
pub struct LifecycleRegistration {
    lifecycle: Rc<dyn Lifecycle>,
    observer: Rc<dyn LifecycleObserver>,
}

impl LifecycleRegistration {
    pub fn new(lifecycle: Rc<dyn Lifecycle>, observer: Rc<dyn LifecycleObserver>) -> Self {
        lifecycle.add_observer(Rc::clone(&observer));
        Self {
            lifecycle,
            observer,
        }
    }
}

impl Drop for LifecycleRegistration {
    fn drop(&mut self) {
        self.lifecycle.remove_observer(&self.observer);
    }
}

/// Keeps component callbacks registered until dropped.
#[must_use = "dropping the registration unregisters the callbacks"]
pub struct ComponentCallbacksRegistration {
    host: Rc<dyn ComponentCallbacksHost>,
    callbacks: Rc<dyn ComponentCallbacks>,
}

impl ComponentCallbacksRegistration {
    pub fn new(host: Rc<dyn ComponentCallbacksHost>, callbacks: Rc<dyn ComponentCallbacks>) -> Self {
        host.register_component_callbacks(Rc::clone(&callbacks));
        Self { host, callbacks }
    }
}

impl Drop for ComponentCallbacksRegistration {
    fn drop(&mut self) {
        self.host.unregister_component_callbacks(&self.callbacks);
    }
}

/// Ties `widget` to the host lifecycle for as long as the calling
/// composition stays alive.
pub fn map_lifecycle<A, W>(composer: &mut Composer<'_, A>, host: &MapHost, widget: Rc<W>)
where
    A: Applier,
    W: MapWidget + 'static,
{
    let lifecycle = Rc::clone(&host.lifecycle);
    let observed = Rc::clone(&widget);
    composer.disposable_effect(move |scope| {
        let registration =
            LifecycleRegistration::new(lifecycle, Rc::new(MapLifecycleObserver::new(observed)));
        log::debug!("map widget registered with host lifecycle");
        scope.on_dispose(move || {
            drop(registration);
            log::debug!("map widget unregistered from host lifecycle");
        })
    });

    let callbacks_host = Rc::clone(&host.component_callbacks);
    composer.disposable_effect(move |scope| {
        let registration = ComponentCallbacksRegistration::new(
            callbacks_host,
            Rc::new(MapComponentCallbacks::new(widget)),
        );
        scope.on_dispose(move || drop(registration))
    });
}
