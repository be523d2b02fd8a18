use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use maps_compose::widget::{
    CameraIdleListener, CameraMoveListener, CameraMoveStartedListener, MapClickListener,
    MapLoadedCallback, MarkerClickListener, MyLocationButtonClickListener,
    MyLocationClickListener, PoiClickListener,
};
use maps_compose::{
    CameraMoveStartedReason, CameraPosition, CameraUpdate, IndoorBuilding,
    IndoorStateChangeListener, LatLng, LatLngBounds, Location, LocationSource, MapController,
    MapStyleOptions, MapType, MarkerId, MarkerOptions, PointOfInterest, UiSettings,
};

/// One call made on a [`FakeMapController`] or its UI settings.
#[derive(Clone, Debug, PartialEq)]
pub enum MapCall {
    SetBuildingsEnabled(bool),
    SetIndoorEnabled(bool),
    SetMyLocationEnabled(bool),
    SetTrafficEnabled(bool),
    SetLatLngBoundsForCameraTarget(Option<LatLngBounds>),
    SetMapStyle(Option<MapStyleOptions>),
    SetMapType(MapType),
    SetMaxZoomPreference(f32),
    SetMinZoomPreference(f32),
    UiSetting { name: &'static str, enabled: bool },
    MoveCamera(CameraUpdate),
    /// A listener slot was set (`installed`) or cleared.
    Listener { name: &'static str, installed: bool },
    SetLocationSource { installed: bool },
    AddMarker(MarkerId, MarkerOptions),
    UpdateMarker(MarkerId, MarkerOptions),
    RemoveMarker(MarkerId),
    Clear,
}

impl MapCall {
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            MapCall::SetBuildingsEnabled(_)
                | MapCall::SetIndoorEnabled(_)
                | MapCall::SetMyLocationEnabled(_)
                | MapCall::SetTrafficEnabled(_)
                | MapCall::SetLatLngBoundsForCameraTarget(_)
                | MapCall::SetMapStyle(_)
                | MapCall::SetMapType(_)
                | MapCall::SetMaxZoomPreference(_)
                | MapCall::SetMinZoomPreference(_)
        )
    }
}

type CallLog = Rc<RefCell<Vec<MapCall>>>;

/// Records UI setting calls into the controller's log.
pub struct FakeUiSettings {
    log: CallLog,
}

impl FakeUiSettings {
    fn record(&self, name: &'static str, enabled: bool) {
        self.log
            .borrow_mut()
            .push(MapCall::UiSetting { name, enabled });
    }
}

impl UiSettings for FakeUiSettings {
    fn set_compass_enabled(&self, enabled: bool) {
        self.record("compass", enabled);
    }

    fn set_indoor_level_picker_enabled(&self, enabled: bool) {
        self.record("indoor_level_picker", enabled);
    }

    fn set_map_toolbar_enabled(&self, enabled: bool) {
        self.record("map_toolbar", enabled);
    }

    fn set_my_location_button_enabled(&self, enabled: bool) {
        self.record("my_location_button", enabled);
    }

    fn set_rotation_gestures_enabled(&self, enabled: bool) {
        self.record("rotation_gestures", enabled);
    }

    fn set_scroll_gestures_enabled(&self, enabled: bool) {
        self.record("scroll_gestures", enabled);
    }

    fn set_scroll_gestures_enabled_during_rotate_or_zoom(&self, enabled: bool) {
        self.record("scroll_gestures_during_rotate_or_zoom", enabled);
    }

    fn set_tilt_gestures_enabled(&self, enabled: bool) {
        self.record("tilt_gestures", enabled);
    }

    fn set_zoom_controls_enabled(&self, enabled: bool) {
        self.record("zoom_controls", enabled);
    }

    fn set_zoom_gestures_enabled(&self, enabled: bool) {
        self.record("zoom_gestures", enabled);
    }
}

#[derive(Default)]
struct Listeners {
    camera_move_started: Option<CameraMoveStartedListener>,
    camera_move: Option<CameraMoveListener>,
    camera_idle: Option<CameraIdleListener>,
    indoor_state_change: Option<IndoorStateChangeListener>,
    map_click: Option<MapClickListener>,
    map_long_click: Option<MapClickListener>,
    map_loaded: Option<MapLoadedCallback>,
    my_location_button_click: Option<MyLocationButtonClickListener>,
    my_location_click: Option<MyLocationClickListener>,
    poi_click: Option<PoiClickListener>,
    marker_click: Option<MarkerClickListener>,
}

/// In-memory map that records every call and lets tests fire map events.
pub struct FakeMapController {
    log: CallLog,
    ui_settings: FakeUiSettings,
    camera: Cell<CameraPosition>,
    listeners: RefCell<Listeners>,
    location_source: RefCell<Option<Rc<dyn LocationSource>>>,
    markers: RefCell<BTreeMap<MarkerId, MarkerOptions>>,
    next_marker: Cell<u64>,
    reject_styles: Cell<bool>,
}

impl FakeMapController {
    pub fn new(camera: CameraPosition) -> Rc<Self> {
        let log = CallLog::default();
        Rc::new(Self {
            ui_settings: FakeUiSettings {
                log: Rc::clone(&log),
            },
            log,
            camera: Cell::new(camera),
            listeners: RefCell::new(Listeners::default()),
            location_source: RefCell::new(None),
            markers: RefCell::new(BTreeMap::new()),
            next_marker: Cell::new(1),
            reject_styles: Cell::new(false),
        })
    }

    fn record(&self, call: MapCall) {
        log::trace!("fake map call {call:?}");
        self.log.borrow_mut().push(call);
    }

    fn record_listener(&self, name: &'static str, installed: bool) {
        self.record(MapCall::Listener { name, installed });
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.log.borrow().clone()
    }

    pub fn take_calls(&self) -> Vec<MapCall> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn count(&self, matches: impl Fn(&MapCall) -> bool) -> usize {
        self.log.borrow().iter().filter(|call| matches(call)).count()
    }

    pub fn markers(&self) -> BTreeMap<MarkerId, MarkerOptions> {
        self.markers.borrow().clone()
    }

    /// Makes `set_map_style` report a parse failure.
    pub fn reject_styles(&self, reject: bool) {
        self.reject_styles.set(reject);
    }

    pub fn location_source(&self) -> Option<Rc<dyn LocationSource>> {
        self.location_source.borrow().clone()
    }

    pub fn has_camera_listeners(&self) -> bool {
        let listeners = self.listeners.borrow();
        listeners.camera_move_started.is_some()
            && listeners.camera_move.is_some()
            && listeners.camera_idle.is_some()
    }

    pub fn has_marker_click_listener(&self) -> bool {
        self.listeners.borrow().marker_click.is_some()
    }

    pub fn click_map(&self, point: LatLng) {
        let listener = self.listeners.borrow().map_click.clone();
        if let Some(listener) = listener {
            listener(point);
        }
    }

    pub fn long_click_map(&self, point: LatLng) {
        let listener = self.listeners.borrow().map_long_click.clone();
        if let Some(listener) = listener {
            listener(point);
        }
    }

    pub fn finish_loading(&self) {
        let callback = self.listeners.borrow().map_loaded.clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn click_poi(&self, poi: &PointOfInterest) {
        let listener = self.listeners.borrow().poi_click.clone();
        if let Some(listener) = listener {
            listener(poi);
        }
    }

    /// Returns whether the click was consumed.
    pub fn click_my_location_button(&self) -> bool {
        let listener = self.listeners.borrow().my_location_button_click.clone();
        listener.is_some_and(|listener| listener())
    }

    pub fn click_my_location(&self, location: &Location) {
        let listener = self.listeners.borrow().my_location_click.clone();
        if let Some(listener) = listener {
            listener(location);
        }
    }

    pub fn focus_indoor_building(&self) {
        let listener = self.listeners.borrow().indoor_state_change.clone();
        if let Some(listener) = listener {
            (listener.on_indoor_building_focused)();
        }
    }

    pub fn activate_indoor_level(&self, building: &IndoorBuilding) {
        let listener = self.listeners.borrow().indoor_state_change.clone();
        if let Some(listener) = listener {
            (listener.on_indoor_level_activated)(building);
        }
    }

    /// Returns whether the click was consumed.
    pub fn click_marker(&self, id: MarkerId) -> bool {
        let listener = self.listeners.borrow().marker_click.clone();
        listener.is_some_and(|listener| listener(id))
    }

    /// Moves the camera the way a user drag would: move-started, one move
    /// and idle.
    pub fn gesture_to(&self, position: CameraPosition) {
        let (started, moved, idle) = {
            let listeners = self.listeners.borrow();
            (
                listeners.camera_move_started.clone(),
                listeners.camera_move.clone(),
                listeners.camera_idle.clone(),
            )
        };
        if let Some(started) = started {
            started(CameraMoveStartedReason::Gesture);
        }
        self.camera.set(position);
        if let Some(moved) = moved {
            moved();
        }
        if let Some(idle) = idle {
            idle();
        }
    }
}

impl fmt::Debug for FakeMapController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeMapController")
            .field("camera", &self.camera.get())
            .field("markers", &self.markers.borrow().len())
            .field("calls", &self.log.borrow().len())
            .finish()
    }
}

impl MapController for FakeMapController {
    fn set_buildings_enabled(&self, enabled: bool) {
        self.record(MapCall::SetBuildingsEnabled(enabled));
    }

    fn set_indoor_enabled(&self, enabled: bool) {
        self.record(MapCall::SetIndoorEnabled(enabled));
    }

    fn set_my_location_enabled(&self, enabled: bool) {
        self.record(MapCall::SetMyLocationEnabled(enabled));
    }

    fn set_traffic_enabled(&self, enabled: bool) {
        self.record(MapCall::SetTrafficEnabled(enabled));
    }

    fn set_lat_lng_bounds_for_camera_target(&self, bounds: Option<LatLngBounds>) {
        self.record(MapCall::SetLatLngBoundsForCameraTarget(bounds));
    }

    fn set_map_style(&self, style: Option<&MapStyleOptions>) -> bool {
        self.record(MapCall::SetMapStyle(style.cloned()));
        style.is_none() || !self.reject_styles.get()
    }

    fn set_map_type(&self, map_type: MapType) {
        self.record(MapCall::SetMapType(map_type));
    }

    fn set_max_zoom_preference(&self, zoom: f32) {
        self.record(MapCall::SetMaxZoomPreference(zoom));
    }

    fn set_min_zoom_preference(&self, zoom: f32) {
        self.record(MapCall::SetMinZoomPreference(zoom));
    }

    fn ui_settings(&self) -> &dyn UiSettings {
        &self.ui_settings
    }

    fn camera_position(&self) -> CameraPosition {
        self.camera.get()
    }

    fn move_camera(&self, update: &CameraUpdate) {
        self.record(MapCall::MoveCamera(*update));
        self.camera.set(update.apply_to(&self.camera.get()));
    }

    fn set_on_camera_move_started_listener(&self, listener: Option<CameraMoveStartedListener>) {
        self.record_listener("camera_move_started", listener.is_some());
        self.listeners.borrow_mut().camera_move_started = listener;
    }

    fn set_on_camera_move_listener(&self, listener: Option<CameraMoveListener>) {
        self.record_listener("camera_move", listener.is_some());
        self.listeners.borrow_mut().camera_move = listener;
    }

    fn set_on_camera_idle_listener(&self, listener: Option<CameraIdleListener>) {
        self.record_listener("camera_idle", listener.is_some());
        self.listeners.borrow_mut().camera_idle = listener;
    }

    fn set_on_indoor_state_change_listener(&self, listener: Option<IndoorStateChangeListener>) {
        self.record_listener("indoor_state_change", listener.is_some());
        self.listeners.borrow_mut().indoor_state_change = listener;
    }

    fn set_on_map_click_listener(&self, listener: Option<MapClickListener>) {
        self.record_listener("map_click", listener.is_some());
        self.listeners.borrow_mut().map_click = listener;
    }

    fn set_on_map_long_click_listener(&self, listener: Option<MapClickListener>) {
        self.record_listener("map_long_click", listener.is_some());
        self.listeners.borrow_mut().map_long_click = listener;
    }

    fn set_on_map_loaded_callback(&self, callback: Option<MapLoadedCallback>) {
        self.record_listener("map_loaded", callback.is_some());
        self.listeners.borrow_mut().map_loaded = callback;
    }

    fn set_on_my_location_button_click_listener(
        &self,
        listener: Option<MyLocationButtonClickListener>,
    ) {
        self.record_listener("my_location_button_click", listener.is_some());
        self.listeners.borrow_mut().my_location_button_click = listener;
    }

    fn set_on_my_location_click_listener(&self, listener: Option<MyLocationClickListener>) {
        self.record_listener("my_location_click", listener.is_some());
        self.listeners.borrow_mut().my_location_click = listener;
    }

    fn set_on_poi_click_listener(&self, listener: Option<PoiClickListener>) {
        self.record_listener("poi_click", listener.is_some());
        self.listeners.borrow_mut().poi_click = listener;
    }

    fn set_location_source(&self, source: Option<Rc<dyn LocationSource>>) {
        self.record(MapCall::SetLocationSource {
            installed: source.is_some(),
        });
        *self.location_source.borrow_mut() = source;
    }

    fn set_on_marker_click_listener(&self, listener: Option<MarkerClickListener>) {
        self.record_listener("marker_click", listener.is_some());
        self.listeners.borrow_mut().marker_click = listener;
    }

    fn add_marker(&self, options: &MarkerOptions) -> MarkerId {
        let id = MarkerId(self.next_marker.get());
        self.next_marker.set(id.0 + 1);
        self.markers.borrow_mut().insert(id, options.clone());
        self.record(MapCall::AddMarker(id, options.clone()));
        id
    }

    fn update_marker(&self, id: MarkerId, options: &MarkerOptions) {
        if let Some(marker) = self.markers.borrow_mut().get_mut(&id) {
            *marker = options.clone();
        }
        self.record(MapCall::UpdateMarker(id, options.clone()));
    }

    fn remove_marker(&self, id: MarkerId) {
        self.markers.borrow_mut().remove(&id);
        self.record(MapCall::RemoveMarker(id));
    }

    fn clear(&self) {
        self.markers.borrow_mut().clear();
        self.record(MapCall::Clear);
    }
}
