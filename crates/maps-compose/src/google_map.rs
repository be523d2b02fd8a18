//! The `GoogleMap` composable: embeds a map widget and keeps it in sync with
//! observable state.

use std::fmt;
use std::rc::Rc;

use futures::future::join3;
use futures::StreamExt;
use maps_compose_core::{
    snapshot_flow, Applier, ApplyNotifier, Composer, Composition, CompositionContext,
    DisposingComposition, MutableState, Node, NodeId, RuntimeHandle,
};

use crate::applier::MapApplier;
use crate::camera::{CameraPosition, CameraPositionState, CameraUpdate};
use crate::lifecycle::{map_lifecycle, MapHost};
use crate::listeners::{ListenerSet, MapClickListeners};
use crate::modifier::Modifier;
use crate::properties::{MapProperties, MapPropertiesState, MapUiSettings, MapUiSettingsState};
use crate::widget::{GoogleMapOptions, LocationSource, MapController, MapWidget};

/// Content composed onto the map once it is available.
pub type MapContent = Rc<dyn Fn(&mut Composer<'_, MapApplier>)>;

/// Everything `GoogleMap` reads besides the host and the widget factory.
pub struct GoogleMapProps {
    pub modifier: Modifier,
    /// Called once, when the widget is created.
    pub options_factory: Rc<dyn Fn() -> GoogleMapOptions>,
    pub camera_position_state: CameraPositionState,
    pub properties: MapPropertiesState,
    pub ui_settings: MapUiSettingsState,
    pub location_source: Option<Rc<dyn LocationSource>>,
    pub listeners: MapClickListeners,
    pub content: Option<MapContent>,
}

impl GoogleMapProps {
    /// Default props with every state holder bound to `runtime`.
    pub fn new(runtime: &RuntimeHandle) -> Self {
        let notifier = runtime.notifier();
        Self {
            modifier: Modifier::empty(),
            options_factory: Rc::new(GoogleMapOptions::default),
            camera_position_state: CameraPositionState::new(&notifier, CameraPosition::default()),
            properties: MapPropertiesState::new(&notifier, MapProperties::default()),
            ui_settings: MapUiSettingsState::new(&notifier, MapUiSettings::default()),
            location_source: None,
            listeners: MapClickListeners::new(&notifier),
            content: None,
        }
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn options(mut self, factory: impl Fn() -> GoogleMapOptions + 'static) -> Self {
        self.options_factory = Rc::new(factory);
        self
    }

    pub fn camera_position_state(mut self, state: CameraPositionState) -> Self {
        self.camera_position_state = state;
        self
    }

    pub fn properties(mut self, properties: MapPropertiesState) -> Self {
        self.properties = properties;
        self
    }

    pub fn ui_settings(mut self, ui_settings: MapUiSettingsState) -> Self {
        self.ui_settings = ui_settings;
        self
    }

    pub fn location_source(mut self, source: Rc<dyn LocationSource>) -> Self {
        self.location_source = Some(source);
        self
    }

    pub fn listeners(mut self, listeners: MapClickListeners) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn content(mut self, content: impl Fn(&mut Composer<'_, MapApplier>) + 'static) -> Self {
        self.content = Some(Rc::new(content));
        self
    }
}

impl fmt::Debug for GoogleMapProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleMapProps")
            .field("modifier", &self.modifier)
            .field("camera_position_state", &self.camera_position_state)
            .field("properties", &self.properties)
            .field("ui_settings", &self.ui_settings)
            .field("has_location_source", &self.location_source.is_some())
            .field("has_content", &self.content.is_some())
            .finish()
    }
}

/// Host-tree node standing in for the embedded widget.
pub struct EmbeddedMapNode {
    pub modifier: Modifier,
    pub options: GoogleMapOptions,
    pub widget: Rc<dyn MapWidget>,
}

impl Node for EmbeddedMapNode {}

impl fmt::Debug for EmbeddedMapNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedMapNode")
            .field("modifier", &self.modifier)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Compared by identity; a location source has no value of its own.
#[derive(Clone, Default)]
struct LocationSourceSlot(Option<Rc<dyn LocationSource>>);

impl PartialEq for LocationSourceSlot {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (None, None) => true,
            _ => false,
        }
    }
}

/// What the caller keeps of a placed `GoogleMap`.
pub struct GoogleMapHandle<W> {
    node: NodeId,
    widget: Rc<W>,
    location_source: MutableState<LocationSourceSlot>,
}

impl<W> GoogleMapHandle<W> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn widget(&self) -> &Rc<W> {
        &self.widget
    }

    /// Swaps the location source; the map picks it up with the listeners.
    pub fn set_location_source(&self, source: Option<Rc<dyn LocationSource>>) {
        self.location_source.set(LocationSourceSlot(source));
    }
}

impl<W> fmt::Debug for GoogleMapHandle<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleMapHandle")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Applies `read()` to the map now, then again every time the state it
/// reads changes to a different value.
async fn sync_facet<T, R, F>(notifier: ApplyNotifier, facet: &'static str, read: R, apply: F)
where
    T: Clone + PartialEq + 'static,
    R: Fn() -> T + 'static,
    F: Fn(&T),
{
    let read = Rc::new(read);
    let mut applied = read();
    apply(&applied);
    let mut values = snapshot_flow(&notifier, {
        let read = Rc::clone(&read);
        move || read()
    })
    .values();
    while let Some(value) = values.next().await {
        if value == applied {
            continue;
        }
        log::trace!("syncing map {facet}");
        apply(&value);
        applied = value;
    }
}

type ListenerFacet = (ListenerSet, LocationSourceSlot);
type PropertiesFacet = (MapProperties, CameraPosition);

fn apply_listeners(map: &dyn MapController, (listeners, source): &ListenerFacet) {
    listeners.apply_to(map);
    map.set_location_source(source.0.clone());
}

fn apply_properties_and_camera(map: &dyn MapController, (properties, camera): &PropertiesFacet) {
    properties.apply_to(map);
    if map.camera_position() != *camera {
        map.move_camera(&CameraUpdate::NewCameraPosition(*camera));
    }
}

fn compose_content(
    map: &Rc<dyn MapController>,
    parent: &CompositionContext,
    content: MapContent,
) -> Option<DisposingComposition<MapApplier>> {
    let mut composition = Composition::with_parent(MapApplier::new(Rc::clone(map)), parent);
    match composition.set_content(|composer| content(composer)) {
        Ok(()) => Some(DisposingComposition::new(composition)),
        Err(err) => {
            log::error!("failed to compose map content: {err}");
            None
        }
    }
}

/// Embeds a map widget built by `widget_factory` and keeps it in sync with
/// the state holders in `props`.
///
/// The widget follows `host`'s lifecycle while the calling composition is
/// alive. Once the widget yields its map, listeners, UI settings and
/// properties with the camera are applied and then re-applied whenever the
/// state they read changes. `props.content` is composed onto the map in a
/// nested composition that lives as long as the sync does.
#[allow(non_snake_case)]
pub fn GoogleMap<A, W, F>(
    composer: &mut Composer<'_, A>,
    host: &MapHost,
    widget_factory: F,
    props: GoogleMapProps,
) -> GoogleMapHandle<W>
where
    A: Applier,
    W: MapWidget + 'static,
    F: FnOnce(&GoogleMapOptions) -> Rc<W>,
{
    let GoogleMapProps {
        modifier,
        options_factory,
        camera_position_state,
        properties,
        ui_settings,
        location_source,
        listeners,
        content,
    } = props;

    let options = options_factory();
    let widget = widget_factory(&options);
    let node = composer.emit(EmbeddedMapNode {
        modifier,
        options,
        widget: Rc::clone(&widget) as Rc<dyn MapWidget>,
    });
    log::debug!("map widget attached as node {node}");

    map_lifecycle(composer, host, Rc::clone(&widget));

    let notifier = composer.runtime().notifier();
    let location_source = MutableState::new(LocationSourceSlot(location_source), &notifier);
    let parent = composer.composition_context().clone();
    let source_state = location_source.clone();
    let awaited = Rc::clone(&widget);
    composer.launched_effect(move |_| async move {
        let map = match awaited.await_map().await {
            Ok(map) => map,
            Err(err) => {
                log::error!("map unavailable: {err}");
                return;
            }
        };
        log::debug!("map ready, starting sync");

        let _camera_binding = camera_position_state
            .bind(&map)
            .map_err(|err| log::error!("camera not bound: {err}"))
            .ok();
        let _content = content.and_then(|content| compose_content(&map, &parent, content));

        let listener_sync = sync_facet(
            notifier.clone(),
            "listeners",
            move || (listeners.snapshot(), source_state.get()),
            {
                let map = Rc::clone(&map);
                move |value: &ListenerFacet| apply_listeners(&*map, value)
            },
        );
        let ui_settings_sync = sync_facet(
            notifier.clone(),
            "ui settings",
            move || ui_settings.snapshot(),
            {
                let map = Rc::clone(&map);
                move |settings: &MapUiSettings| settings.apply_to(map.ui_settings())
            },
        );
        let camera_state = camera_position_state.clone();
        let properties_sync = sync_facet(
            notifier,
            "properties",
            move || (properties.snapshot(), camera_state.position()),
            {
                let map = Rc::clone(&map);
                move |value: &PropertiesFacet| apply_properties_and_camera(&*map, value)
            },
        );
        join3(listener_sync, ui_settings_sync, properties_sync).await;
    });

    GoogleMapHandle {
        node,
        widget,
        location_source,
    }
}
