//! Boundary traits for the embedded map widget and the controller it yields.
//!
//! Everything behind these traits (drawing, tiles, gestures) belongs to the
//! platform widget. The binding only drives it through these calls.

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraMoveStartedReason, CameraPosition, CameraUpdate};
use crate::error::MapError;
use crate::geo::{IndoorBuilding, LatLng, LatLngBounds, Location, MarkerId, MarkerOptions, PointOfInterest};
use crate::properties::{MapStyleOptions, MapType};

pub type MapClickListener = Rc<dyn Fn(LatLng)>;
pub type MapLoadedCallback = Rc<dyn Fn()>;
/// Returns `true` to consume the click and suppress the default behavior.
pub type MyLocationButtonClickListener = Rc<dyn Fn() -> bool>;
pub type MyLocationClickListener = Rc<dyn Fn(&Location)>;
pub type PoiClickListener = Rc<dyn Fn(&PointOfInterest)>;
/// Returns `true` to consume the click.
pub type MarkerClickListener = Rc<dyn Fn(MarkerId) -> bool>;
pub type CameraMoveStartedListener = Rc<dyn Fn(CameraMoveStartedReason)>;
pub type CameraMoveListener = Rc<dyn Fn()>;
pub type CameraIdleListener = Rc<dyn Fn()>;

/// Pair of callbacks for indoor map state.
#[derive(Clone)]
pub struct IndoorStateChangeListener {
    pub on_indoor_building_focused: Rc<dyn Fn()>,
    pub on_indoor_level_activated: Rc<dyn Fn(&IndoorBuilding)>,
}

/// Opaque bundle handed to [`MapWidget::on_create`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SavedState {
    entries: BTreeMap<String, String>,
}

impl SavedState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

/// Construction options for the map widget, read once when it is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleMapOptions {
    pub camera: Option<CameraPosition>,
    pub map_id: Option<String>,
    pub lite_mode: bool,
    pub z_order_on_top: bool,
}

/// An imperative map view with a host-driven lifecycle.
pub trait MapWidget {
    fn on_create(&self, saved_state: &SavedState);
    fn on_start(&self);
    fn on_resume(&self);
    fn on_pause(&self);
    fn on_stop(&self);
    fn on_destroy(&self);
    fn on_low_memory(&self);

    /// Resolves once the widget has initialized its map.
    fn await_map(&self) -> LocalBoxFuture<'static, Result<Rc<dyn MapController>, MapError>>;
}

pub trait UiSettings {
    fn set_compass_enabled(&self, enabled: bool);
    fn set_indoor_level_picker_enabled(&self, enabled: bool);
    fn set_map_toolbar_enabled(&self, enabled: bool);
    fn set_my_location_button_enabled(&self, enabled: bool);
    fn set_rotation_gestures_enabled(&self, enabled: bool);
    fn set_scroll_gestures_enabled(&self, enabled: bool);
    fn set_scroll_gestures_enabled_during_rotate_or_zoom(&self, enabled: bool);
    fn set_tilt_gestures_enabled(&self, enabled: bool);
    fn set_zoom_controls_enabled(&self, enabled: bool);
    fn set_zoom_gestures_enabled(&self, enabled: bool);
}

/// Supplies location fixes to the map's my-location layer.
pub trait LocationSource {
    fn activate(&self, on_location_changed: Rc<dyn Fn(&Location)>);
    fn deactivate(&self);
}

/// The map owned by a widget. All methods must be called on the UI thread.
pub trait MapController {
    fn set_buildings_enabled(&self, enabled: bool);
    fn set_indoor_enabled(&self, enabled: bool);
    fn set_my_location_enabled(&self, enabled: bool);
    fn set_traffic_enabled(&self, enabled: bool);
    fn set_lat_lng_bounds_for_camera_target(&self, bounds: Option<LatLngBounds>);
    /// Returns `false` if the style could not be parsed.
    fn set_map_style(&self, style: Option<&MapStyleOptions>) -> bool;
    fn set_map_type(&self, map_type: MapType);
    fn set_max_zoom_preference(&self, zoom: f32);
    fn set_min_zoom_preference(&self, zoom: f32);

    fn ui_settings(&self) -> &dyn UiSettings;

    fn camera_position(&self) -> CameraPosition;
    fn move_camera(&self, update: &CameraUpdate);
    fn set_on_camera_move_started_listener(&self, listener: Option<CameraMoveStartedListener>);
    fn set_on_camera_move_listener(&self, listener: Option<CameraMoveListener>);
    fn set_on_camera_idle_listener(&self, listener: Option<CameraIdleListener>);

    fn set_on_indoor_state_change_listener(&self, listener: Option<IndoorStateChangeListener>);
    fn set_on_map_click_listener(&self, listener: Option<MapClickListener>);
    fn set_on_map_long_click_listener(&self, listener: Option<MapClickListener>);
    fn set_on_map_loaded_callback(&self, callback: Option<MapLoadedCallback>);
    fn set_on_my_location_button_click_listener(
        &self,
        listener: Option<MyLocationButtonClickListener>,
    );
    fn set_on_my_location_click_listener(&self, listener: Option<MyLocationClickListener>);
    fn set_on_poi_click_listener(&self, listener: Option<PoiClickListener>);
    fn set_location_source(&self, source: Option<Rc<dyn LocationSource>>);

    fn set_on_marker_click_listener(&self, listener: Option<MarkerClickListener>);
    fn add_marker(&self, options: &MarkerOptions) -> MarkerId;
    fn update_marker(&self, id: MarkerId, options: &MarkerOptions);
    fn remove_marker(&self, id: MarkerId);

    /// Removes every marker and overlay from the map.
    fn clear(&self);
}
