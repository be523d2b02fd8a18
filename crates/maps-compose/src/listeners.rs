//! Observable map event callbacks.

use std::fmt;
use std::rc::Rc;

use maps_compose_core::{ApplyNotifier, MutableState, NeverEqualPolicy, RuntimeHandle};

use crate::geo::{IndoorBuilding, LatLng, Location, PointOfInterest};
use crate::widget::{
    IndoorStateChangeListener, MapClickListener, MapController, MapLoadedCallback,
    MyLocationButtonClickListener, MyLocationClickListener, PoiClickListener,
};

/// The event callbacks of one map, each held in its own state cell.
///
/// Setting a callback always counts as a change, so a running sync installs
/// the new closure even if it cannot be compared with the old one.
#[derive(Clone)]
pub struct MapClickListeners {
    on_indoor_building_focused: MutableState<Rc<dyn Fn()>>,
    on_indoor_level_activated: MutableState<Rc<dyn Fn(&IndoorBuilding)>>,
    on_map_click: MutableState<MapClickListener>,
    on_map_long_click: MutableState<MapClickListener>,
    on_map_loaded: MutableState<MapLoadedCallback>,
    on_my_location_button_click: MutableState<MyLocationButtonClickListener>,
    on_my_location_click: MutableState<MyLocationClickListener>,
    on_poi_click: MutableState<PoiClickListener>,
}

fn callback_state<T: Clone + 'static>(notifier: &ApplyNotifier, value: T) -> MutableState<T> {
    MutableState::with_policy(value, notifier, NeverEqualPolicy)
}

impl MapClickListeners {
    /// Creates listeners that ignore every event.
    pub fn new(notifier: &ApplyNotifier) -> Self {
        Self {
            on_indoor_building_focused: callback_state(notifier, Rc::new(|| {}) as Rc<dyn Fn()>),
            on_indoor_level_activated: callback_state(
                notifier,
                Rc::new(|_: &IndoorBuilding| {}) as Rc<dyn Fn(&IndoorBuilding)>,
            ),
            on_map_click: callback_state(notifier, Rc::new(|_: LatLng| {}) as MapClickListener),
            on_map_long_click: callback_state(notifier, Rc::new(|_: LatLng| {}) as MapClickListener),
            on_map_loaded: callback_state(notifier, Rc::new(|| {}) as MapLoadedCallback),
            on_my_location_button_click: callback_state(
                notifier,
                Rc::new(|| false) as MyLocationButtonClickListener,
            ),
            on_my_location_click: callback_state(
                notifier,
                Rc::new(|_: &Location| {}) as MyLocationClickListener,
            ),
            on_poi_click: callback_state(
                notifier,
                Rc::new(|_: &PointOfInterest| {}) as PoiClickListener,
            ),
        }
    }

    pub fn with_runtime(runtime: &RuntimeHandle) -> Self {
        Self::new(&runtime.notifier())
    }

    pub fn set_on_indoor_building_focused(&self, callback: impl Fn() + 'static) {
        self.on_indoor_building_focused.set(Rc::new(callback));
    }

    pub fn set_on_indoor_level_activated(&self, callback: impl Fn(&IndoorBuilding) + 'static) {
        self.on_indoor_level_activated.set(Rc::new(callback));
    }

    pub fn set_on_map_click(&self, callback: impl Fn(LatLng) + 'static) {
        self.on_map_click.set(Rc::new(callback));
    }

    pub fn set_on_map_long_click(&self, callback: impl Fn(LatLng) + 'static) {
        self.on_map_long_click.set(Rc::new(callback));
    }

    pub fn set_on_map_loaded(&self, callback: impl Fn() + 'static) {
        self.on_map_loaded.set(Rc::new(callback));
    }

    pub fn set_on_my_location_button_click(&self, callback: impl Fn() -> bool + 'static) {
        self.on_my_location_button_click.set(Rc::new(callback));
    }

    pub fn set_on_my_location_click(&self, callback: impl Fn(&Location) + 'static) {
        self.on_my_location_click.set(Rc::new(callback));
    }

    pub fn set_on_poi_click(&self, callback: impl Fn(&PointOfInterest) + 'static) {
        self.on_poi_click.set(Rc::new(callback));
    }

    /// Reads every callback, reporting each read to the current snapshot.
    pub fn snapshot(&self) -> ListenerSet {
        ListenerSet {
            on_indoor_building_focused: self.on_indoor_building_focused.get(),
            on_indoor_level_activated: self.on_indoor_level_activated.get(),
            on_map_click: self.on_map_click.get(),
            on_map_long_click: self.on_map_long_click.get(),
            on_map_loaded: self.on_map_loaded.get(),
            on_my_location_button_click: self.on_my_location_button_click.get(),
            on_my_location_click: self.on_my_location_click.get(),
            on_poi_click: self.on_poi_click.get(),
        }
    }

    pub fn apply_to(&self, map: &dyn MapController) {
        self.snapshot().apply_to(map);
    }
}

impl fmt::Debug for MapClickListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapClickListeners").finish_non_exhaustive()
    }
}

/// The callbacks of [`MapClickListeners`] at one point in time.
///
/// Two sets are equal when they hold the very same closures.
#[derive(Clone)]
pub struct ListenerSet {
    pub on_indoor_building_focused: Rc<dyn Fn()>,
    pub on_indoor_level_activated: Rc<dyn Fn(&IndoorBuilding)>,
    pub on_map_click: MapClickListener,
    pub on_map_long_click: MapClickListener,
    pub on_map_loaded: MapLoadedCallback,
    pub on_my_location_button_click: MyLocationButtonClickListener,
    pub on_my_location_click: MyLocationClickListener,
    pub on_poi_click: PoiClickListener,
}

fn same<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl PartialEq for ListenerSet {
    fn eq(&self, other: &Self) -> bool {
        same(&self.on_indoor_building_focused, &other.on_indoor_building_focused)
            && same(&self.on_indoor_level_activated, &other.on_indoor_level_activated)
            && same(&self.on_map_click, &other.on_map_click)
            && same(&self.on_map_long_click, &other.on_map_long_click)
            && same(&self.on_map_loaded, &other.on_map_loaded)
            && same(&self.on_my_location_button_click, &other.on_my_location_button_click)
            && same(&self.on_my_location_click, &other.on_my_location_click)
            && same(&self.on_poi_click, &other.on_poi_click)
    }
}

impl ListenerSet {
    pub fn apply_to(&self, map: &dyn MapController) {
        map.set_on_indoor_state_change_listener(Some(IndoorStateChangeListener {
            on_indoor_building_focused: Rc::clone(&self.on_indoor_building_focused),
            on_indoor_level_activated: Rc::clone(&self.on_indoor_level_activated),
        }));
        map.set_on_map_click_listener(Some(Rc::clone(&self.on_map_click)));
        map.set_on_map_long_click_listener(Some(Rc::clone(&self.on_map_long_click)));
        map.set_on_map_loaded_callback(Some(Rc::clone(&self.on_map_loaded)));
        map.set_on_my_location_button_click_listener(Some(Rc::clone(
            &self.on_my_location_button_click,
        )));
        map.set_on_my_location_click_listener(Some(Rc::clone(&self.on_my_location_click)));
        map.set_on_poi_click_listener(Some(Rc::clone(&self.on_poi_click)));
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").finish_non_exhaustive()
    }
}
