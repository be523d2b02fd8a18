//! Mounting declarative map content (markers) onto a live map.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::StreamExt;
use maps_compose_core::collections::map::HashMap;
use maps_compose_core::{
    snapshot_flow, with_node_mut, Applier, ApplyNotifier, Composer, MutableState, Node, NodeError,
    NodeId, NodeSlots, RuntimeHandle,
};

use crate::geo::{LatLng, MarkerId, MarkerOptions};
use crate::widget::{MapController, MarkerClickListener};

/// Routes the map's single marker click listener to per-marker handlers.
#[derive(Default)]
pub struct MarkerClickRegistry {
    handlers: RefCell<HashMap<MarkerId, MarkerClickListener>>,
}

impl MarkerClickRegistry {
    pub fn register(&self, id: MarkerId, handler: MarkerClickListener) {
        self.handlers.borrow_mut().insert(id, handler);
    }

    pub fn unregister(&self, id: MarkerId) {
        self.handlers.borrow_mut().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a handler consumed the click.
    pub fn dispatch(&self, id: MarkerId) -> bool {
        let handler = self.handlers.borrow().get(&id).cloned();
        handler.is_some_and(|handler| handler(id))
    }

    fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

/// Applier whose nodes live on a map rather than in a view tree.
pub struct MapApplier {
    map: Rc<dyn MapController>,
    slots: NodeSlots,
    marker_clicks: Rc<MarkerClickRegistry>,
}

impl MapApplier {
    pub fn new(map: Rc<dyn MapController>) -> Self {
        let marker_clicks = Rc::new(MarkerClickRegistry::default());
        let registry = Rc::downgrade(&marker_clicks);
        map.set_on_marker_click_listener(Some(Rc::new(move |id| {
            registry
                .upgrade()
                .is_some_and(|registry| registry.dispatch(id))
        })));
        Self {
            map,
            slots: NodeSlots::default(),
            marker_clicks,
        }
    }

    pub fn map(&self) -> Rc<dyn MapController> {
        Rc::clone(&self.map)
    }

    pub fn marker_clicks(&self) -> Rc<MarkerClickRegistry> {
        Rc::clone(&self.marker_clicks)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn with_node<N: Node, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut N) -> R,
    ) -> Result<R, NodeError> {
        with_node_mut(self, id, f)
    }
}

impl Applier for MapApplier {
    fn create(&mut self, node: Box<dyn Node>) -> NodeId {
        self.slots.insert(node)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut dyn Node, NodeError> {
        self.slots.get_mut(id)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.slots.remove(id)
    }

    fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.marker_clicks.clear();
    }
}

impl Drop for MapApplier {
    fn drop(&mut self) {
        self.map.set_on_marker_click_listener(None);
    }
}

impl fmt::Debug for MapApplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapApplier")
            .field("nodes", &self.len())
            .field("marker_click_handlers", &self.marker_clicks.len())
            .finish()
    }
}

/// A marker placed on the map while the node is mounted.
pub struct MarkerNode {
    map: Rc<dyn MapController>,
    options: MarkerOptions,
    on_click: Option<MarkerClickListener>,
    marker_clicks: Rc<MarkerClickRegistry>,
    marker: Rc<Cell<Option<MarkerId>>>,
}

impl MarkerNode {
    pub fn marker_id(&self) -> Option<MarkerId> {
        self.marker.get()
    }

    pub fn options(&self) -> &MarkerOptions {
        &self.options
    }
}

impl Node for MarkerNode {
    fn mount(&mut self) {
        let id = self.map.add_marker(&self.options);
        self.marker.set(Some(id));
        if let Some(on_click) = &self.on_click {
            self.marker_clicks.register(id, Rc::clone(on_click));
        }
    }

    fn unmount(&mut self) {
        if let Some(id) = self.marker.take() {
            self.marker_clicks.unregister(id);
            self.map.remove_marker(id);
        }
    }

    fn on_cleared(&mut self) {
        if let Some(id) = self.marker.take() {
            self.marker_clicks.unregister(id);
        }
    }
}

/// Observable position of a [`Marker`].
#[derive(Clone, Debug)]
pub struct MarkerState {
    position: MutableState<LatLng>,
}

impl MarkerState {
    pub fn new(notifier: &ApplyNotifier, position: LatLng) -> Self {
        Self {
            position: MutableState::new(position, notifier),
        }
    }

    pub fn with_runtime(runtime: &RuntimeHandle, position: LatLng) -> Self {
        Self::new(&runtime.notifier(), position)
    }

    pub fn position(&self) -> LatLng {
        self.position.get()
    }

    pub fn set_position(&self, position: LatLng) {
        self.position.set(position);
    }
}

/// Places a marker at `state`'s position and moves it whenever the
/// position changes.
#[allow(non_snake_case)]
pub fn Marker(
    composer: &mut Composer<'_, MapApplier>,
    state: &MarkerState,
    options: MarkerOptions,
    on_click: Option<MarkerClickListener>,
) -> NodeId {
    let applier = composer.applier();
    let map = applier.map();
    let marker_clicks = applier.marker_clicks();
    let marker = Rc::new(Cell::new(None));
    let initial = state.position.peek();
    let options = MarkerOptions {
        position: initial,
        ..options
    };
    let id = composer.emit(MarkerNode {
        map: Rc::clone(&map),
        options: options.clone(),
        on_click,
        marker_clicks,
        marker: Rc::clone(&marker),
    });

    let notifier = composer.runtime().notifier();
    let position = state.position.clone();
    composer.launched_effect(move |_| async move {
        let mut positions = snapshot_flow(&notifier, move || position.get()).values();
        let mut applied = initial;
        while let Some(next) = positions.next().await {
            if next == applied {
                continue;
            }
            if let Some(marker_id) = marker.get() {
                let updated = MarkerOptions {
                    position: next,
                    ..options.clone()
                };
                map.update_marker(marker_id, &updated);
                applied = next;
            }
        }
    });
    id
}
