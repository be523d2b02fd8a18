//! Declarative binding for an imperative map widget.
//!
//! [`GoogleMap`] embeds a [`MapWidget`] in a composition, forwards the host
//! lifecycle to it and keeps the map in sync with observable state such as
//! [`CameraPositionState`], [`MapPropertiesState`] and [`MapUiSettingsState`].

pub mod applier;
pub mod camera;
mod error;
pub mod geo;
mod google_map;
pub mod lifecycle;
mod listeners;
mod modifier;
mod properties;
pub mod widget;

pub use applier::{Marker, MapApplier, MarkerClickRegistry, MarkerNode, MarkerState};
pub use camera::{
    CameraBinding, CameraMoveStartedReason, CameraPosition, CameraPositionState, CameraUpdate,
};
pub use error::MapError;
pub use geo::{
    IndoorBuilding, IndoorLevel, LatLng, LatLngBounds, Location, MarkerId, MarkerOptions,
    PointOfInterest,
};
pub use google_map::{EmbeddedMapNode, GoogleMap, GoogleMapHandle, GoogleMapProps, MapContent};
pub use lifecycle::{
    map_lifecycle, ComponentCallbacks, ComponentCallbacksHost, ComponentCallbacksRegistry,
    Lifecycle, LifecycleEvent, LifecycleObserver, LifecycleRegistry, LifecycleState, MapHost,
};
pub use listeners::{ListenerSet, MapClickListeners};
pub use modifier::{ModOp, Modifier};
pub use properties::{
    MapProperties, MapPropertiesState, MapStyleOptions, MapType, MapUiSettings,
    MapUiSettingsState,
};
pub use widget::{
    GoogleMapOptions, IndoorStateChangeListener, LocationSource, MapController, MapWidget,
    SavedState, UiSettings,
};

#[cfg(test)]
#[path = "tests/geo_camera_tests.rs"]
mod geo_camera_tests;

#[cfg(test)]
#[path = "tests/state_holder_tests.rs"]
mod state_holder_tests;

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod lifecycle_tests;
