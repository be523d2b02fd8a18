//! Map property and UI-setting values with their observable state holders.
//!
//! Each holder keeps one [`MutableState`] per field so a sync that reads a
//! single field only reacts to that field.

use serde::{Deserialize, Serialize};

use maps_compose_core::{with_mutable_snapshot, ApplyNotifier, MutableState, RuntimeHandle};

use crate::geo::LatLngBounds;
use crate::widget::{MapController, UiSettings};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    None,
    #[default]
    Normal,
    Satellite,
    Terrain,
    Hybrid,
}

/// JSON style definition understood by the map widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapStyleOptions {
    pub json: String,
}

impl MapStyleOptions {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

macro_rules! state_holder {
    (
        $(#[$value_meta:meta])*
        value $value:ident;
        $(#[$state_meta:meta])*
        state $state:ident;
        fields {
            $( $field:ident, $setter:ident: $ty:ty = $default:expr; )+
        }
    ) => {
        $(#[$value_meta])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $value {
            $( pub $field: $ty, )+
        }

        impl Default for $value {
            fn default() -> Self {
                Self {
                    $( $field: $default, )+
                }
            }
        }

        $(#[$state_meta])*
        #[derive(Clone)]
        pub struct $state {
            notifier: ApplyNotifier,
            $( $field: MutableState<$ty>, )+
        }

        impl $state {
            pub fn new(notifier: &ApplyNotifier, initial: $value) -> Self {
                Self {
                    notifier: notifier.clone(),
                    $( $field: MutableState::new(initial.$field, notifier), )+
                }
            }

            pub fn with_runtime(runtime: &RuntimeHandle, initial: $value) -> Self {
                Self::new(&runtime.notifier(), initial)
            }

            $(
                pub fn $field(&self) -> $ty {
                    self.$field.get()
                }

                pub fn $setter(&self, value: $ty) {
                    self.$field.set(value);
                }
            )+

            /// Reads every field, reporting each read to the current snapshot.
            pub fn snapshot(&self) -> $value {
                $value {
                    $( $field: self.$field.get(), )+
                }
            }

            /// Writes every field of `value`. The changes are committed as one
            /// batch.
            pub fn assign(&self, value: &$value) {
                with_mutable_snapshot(&self.notifier, || {
                    $( self.$field.set(value.$field.clone()); )+
                });
            }
        }

        impl std::fmt::Debug for $state {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($state))
                    $( .field(stringify!($field), &self.$field.peek()) )+
                    .finish()
            }
        }
    };
}

state_holder! {
    /// Data-level properties of the map.
    value MapProperties;
    state MapPropertiesState;
    fields {
        is_building_enabled, set_building_enabled: bool = false;
        is_indoor_enabled, set_indoor_enabled: bool = false;
        is_my_location_enabled, set_my_location_enabled: bool = false;
        is_traffic_enabled, set_traffic_enabled: bool = false;
        lat_lng_bounds_for_camera_target, set_lat_lng_bounds_for_camera_target: Option<LatLngBounds> = None;
        map_style_options, set_map_style_options: Option<MapStyleOptions> = None;
        map_type, set_map_type: MapType = MapType::Normal;
        max_zoom_preference, set_max_zoom_preference: f32 = 21.0;
        min_zoom_preference, set_min_zoom_preference: f32 = 3.0;
    }
}

state_holder! {
    /// Which built-in controls and gestures the map offers.
    value MapUiSettings;
    state MapUiSettingsState;
    fields {
        compass_enabled, set_compass_enabled: bool = true;
        indoor_level_picker_enabled, set_indoor_level_picker_enabled: bool = true;
        map_toolbar_enabled, set_map_toolbar_enabled: bool = true;
        my_location_button_enabled, set_my_location_button_enabled: bool = true;
        rotation_gestures_enabled, set_rotation_gestures_enabled: bool = true;
        scroll_gestures_enabled, set_scroll_gestures_enabled: bool = true;
        scroll_gestures_enabled_during_rotate_or_zoom, set_scroll_gestures_enabled_during_rotate_or_zoom: bool = true;
        tilt_gestures_enabled, set_tilt_gestures_enabled: bool = true;
        zoom_controls_enabled, set_zoom_controls_enabled: bool = true;
        zoom_gestures_enabled, set_zoom_gestures_enabled: bool = true;
    }
}

impl MapProperties {
    pub fn apply_to(&self, map: &dyn MapController) {
        map.set_buildings_enabled(self.is_building_enabled);
        map.set_indoor_enabled(self.is_indoor_enabled);
        map.set_my_location_enabled(self.is_my_location_enabled);
        map.set_traffic_enabled(self.is_traffic_enabled);
        map.set_lat_lng_bounds_for_camera_target(self.lat_lng_bounds_for_camera_target);
        if !map.set_map_style(self.map_style_options.as_ref()) {
            log::warn!("map rejected style options");
        }
        map.set_map_type(self.map_type);
        map.set_max_zoom_preference(self.max_zoom_preference);
        map.set_min_zoom_preference(self.min_zoom_preference);
    }
}

impl MapPropertiesState {
    pub fn apply_to(&self, map: &dyn MapController) {
        self.snapshot().apply_to(map);
    }
}

impl MapUiSettings {
    pub fn apply_to(&self, settings: &dyn UiSettings) {
        settings.set_compass_enabled(self.compass_enabled);
        settings.set_indoor_level_picker_enabled(self.indoor_level_picker_enabled);
        settings.set_map_toolbar_enabled(self.map_toolbar_enabled);
        settings.set_my_location_button_enabled(self.my_location_button_enabled);
        settings.set_rotation_gestures_enabled(self.rotation_gestures_enabled);
        settings.set_scroll_gestures_enabled(self.scroll_gestures_enabled);
        settings.set_scroll_gestures_enabled_during_rotate_or_zoom(
            self.scroll_gestures_enabled_during_rotate_or_zoom,
        );
        settings.set_tilt_gestures_enabled(self.tilt_gestures_enabled);
        settings.set_zoom_controls_enabled(self.zoom_controls_enabled);
        settings.set_zoom_gestures_enabled(self.zoom_gestures_enabled);
    }
}

impl MapUiSettingsState {
    pub fn apply_to(&self, settings: &dyn UiSettings) {
        self.snapshot().apply_to(settings);
    }
}
