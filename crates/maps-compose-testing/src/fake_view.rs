use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use maps_compose::{GoogleMapOptions, MapController, MapError, MapWidget, SavedState};

use crate::fake_controller::FakeMapController;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetCall {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
    LowMemory,
    AwaitMap,
}

type MapResult = Result<Rc<dyn MapController>, MapError>;

/// Map widget backed by a [`FakeMapController`].
///
/// A deferred view hands out its map only after [`complete`](Self::complete);
/// destroying it first fails every pending `await_map`.
pub struct FakeMapView {
    options: GoogleMapOptions,
    controller: Rc<FakeMapController>,
    calls: RefCell<Vec<WidgetCall>>,
    ready: RefCell<Option<oneshot::Sender<Result<(), MapError>>>>,
    map: Shared<LocalBoxFuture<'static, MapResult>>,
}

impl FakeMapView {
    /// A view whose map is available immediately.
    pub fn ready(options: &GoogleMapOptions) -> Rc<Self> {
        let controller = Self::controller_for(options);
        let map: Rc<dyn MapController> = controller.clone();
        Rc::new(Self {
            options: options.clone(),
            controller,
            calls: RefCell::new(Vec::new()),
            ready: RefCell::new(None),
            map: future::ready::<MapResult>(Ok(map)).boxed_local().shared(),
        })
    }

    /// A view whose map resolves on [`complete`](Self::complete) or
    /// [`fail`](Self::fail).
    pub fn deferred(options: &GoogleMapOptions) -> Rc<Self> {
        let controller = Self::controller_for(options);
        let map: Rc<dyn MapController> = controller.clone();
        let (sender, receiver) = oneshot::channel();
        let resolved = receiver
            .map(move |outcome| match outcome {
                Ok(Ok(())) => Ok(map),
                Ok(Err(err)) => Err(err),
                Err(oneshot::Canceled) => Err(MapError::Destroyed),
            })
            .boxed_local()
            .shared();
        Rc::new(Self {
            options: options.clone(),
            controller,
            calls: RefCell::new(Vec::new()),
            ready: RefCell::new(Some(sender)),
            map: resolved,
        })
    }

    fn controller_for(options: &GoogleMapOptions) -> Rc<FakeMapController> {
        FakeMapController::new(options.camera.unwrap_or_default())
    }

    fn resolve(&self, outcome: Result<(), MapError>) {
        match self.ready.borrow_mut().take() {
            Some(sender) => {
                // The receiver is owned by `self.map`.
                let _ = sender.send(outcome);
            }
            None => log::warn!("fake map view resolved twice"),
        }
    }

    pub fn complete(&self) {
        self.resolve(Ok(()));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.resolve(Err(MapError::InitializationFailed(reason.into())));
    }

    pub fn controller(&self) -> Rc<FakeMapController> {
        Rc::clone(&self.controller)
    }

    pub fn options(&self) -> &GoogleMapOptions {
        &self.options
    }

    pub fn calls(&self) -> Vec<WidgetCall> {
        self.calls.borrow().clone()
    }

    /// Calls other than [`WidgetCall::AwaitMap`].
    pub fn lifecycle_calls(&self) -> Vec<WidgetCall> {
        self.calls
            .borrow()
            .iter()
            .copied()
            .filter(|call| *call != WidgetCall::AwaitMap)
            .collect()
    }

    fn record(&self, call: WidgetCall) {
        log::trace!("fake map view {call:?}");
        self.calls.borrow_mut().push(call);
    }
}

impl fmt::Debug for FakeMapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeMapView")
            .field("options", &self.options)
            .field("calls", &self.calls.borrow())
            .field("pending", &self.ready.borrow().is_some())
            .finish()
    }
}

impl MapWidget for FakeMapView {
    fn on_create(&self, _saved_state: &SavedState) {
        self.record(WidgetCall::Create);
    }

    fn on_start(&self) {
        self.record(WidgetCall::Start);
    }

    fn on_resume(&self) {
        self.record(WidgetCall::Resume);
    }

    fn on_pause(&self) {
        self.record(WidgetCall::Pause);
    }

    fn on_stop(&self) {
        self.record(WidgetCall::Stop);
    }

    fn on_destroy(&self) {
        self.record(WidgetCall::Destroy);
        // Dropping the sender fails a map that never arrived.
        self.ready.borrow_mut().take();
    }

    fn on_low_memory(&self) {
        self.record(WidgetCall::LowMemory);
    }

    fn await_map(&self) -> LocalBoxFuture<'static, MapResult> {
        self.record(WidgetCall::AwaitMap);
        self.map.clone().boxed_local()
    }
}
