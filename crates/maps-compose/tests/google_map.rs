use std::cell::{Cell, RefCell};
use std::rc::Rc;

use maps_compose::{
    CameraMoveStartedReason, CameraPosition, CameraPositionState, EmbeddedMapNode,
    GoogleMapOptions, IndoorBuilding, LatLng, LifecycleEvent, Location, LocationSource,
    MapClickListeners, MapController, MapProperties, MapPropertiesState, MapType, MapUiSettings,
    MapUiSettingsState, Modifier, PointOfInterest,
};
use maps_compose_core::MutableState;
use maps_compose_testing::{FakeMapView, MapCall, MapTestHarness, WidgetCall};

struct FakeLocationSource;

impl LocationSource for FakeLocationSource {
    fn activate(&self, _on_location_changed: Rc<dyn Fn(&Location)>) {}

    fn deactivate(&self) {}
}

fn is_ui_setting(call: &MapCall) -> bool {
    matches!(call, MapCall::UiSetting { .. })
}

fn is_move(call: &MapCall) -> bool {
    matches!(call, MapCall::MoveCamera(_))
}

fn installed(name: &'static str) -> MapCall {
    MapCall::Listener {
        name,
        installed: true,
    }
}

#[test]
fn attach_then_detach_before_any_lifecycle_event_calls_nothing() {
    let mut harness = MapTestHarness::new();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::deferred, props)
        .expect("compose map");
    assert_eq!(harness.lifecycle().observer_count(), 1);
    assert_eq!(harness.component_callbacks().callback_count(), 1);

    harness.dispose();

    assert!(handle.widget().lifecycle_calls().is_empty());
    assert_eq!(harness.lifecycle().observer_count(), 0);
    assert_eq!(harness.component_callbacks().callback_count(), 0);
    assert_eq!(harness.notifier().observer_count(), 0);
}

#[test]
fn host_lifecycle_is_forwarded_to_the_widget() {
    let mut harness = MapTestHarness::new();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");

    harness.resume();
    harness.dispatch_low_memory();
    for event in [
        LifecycleEvent::Pause,
        LifecycleEvent::Stop,
        LifecycleEvent::Destroy,
    ] {
        harness.handle_lifecycle_event(event);
    }

    assert_eq!(
        handle.widget().lifecycle_calls(),
        vec![
            WidgetCall::Create,
            WidgetCall::Start,
            WidgetCall::Resume,
            WidgetCall::LowMemory,
            WidgetCall::Pause,
            WidgetCall::Stop,
            WidgetCall::Destroy,
        ]
    );
}

#[test]
fn widget_attached_to_a_resumed_host_catches_up() {
    let mut harness = MapTestHarness::new();
    harness.resume();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");

    assert_eq!(
        handle.widget().lifecycle_calls(),
        vec![WidgetCall::Create, WidgetCall::Start, WidgetCall::Resume]
    );
}

#[test]
fn detaching_does_not_destroy_the_widget() {
    let mut harness = MapTestHarness::new();
    harness.resume();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");

    harness.dispose();
    harness.handle_lifecycle_event(LifecycleEvent::Pause);

    assert_eq!(
        handle.widget().lifecycle_calls(),
        vec![WidgetCall::Create, WidgetCall::Start, WidgetCall::Resume]
    );
}

#[test]
fn option_and_widget_factories_run_once() {
    let mut harness = MapTestHarness::new();
    let options_calls = Rc::new(Cell::new(0));
    let widget_calls = Rc::new(Cell::new(0));
    let ui_settings =
        MapUiSettingsState::with_runtime(&harness.runtime_handle(), MapUiSettings::default());
    let props = harness
        .props()
        .modifier(Modifier::fill_max_size().then(Modifier::test_tag("map")))
        .ui_settings(ui_settings.clone())
        .options({
            let options_calls = Rc::clone(&options_calls);
            move || {
                options_calls.set(options_calls.get() + 1);
                GoogleMapOptions {
                    map_id: Some("demo".into()),
                    lite_mode: true,
                    ..GoogleMapOptions::default()
                }
            }
        });

    let handle = harness
        .set_map(
            {
                let widget_calls = Rc::clone(&widget_calls);
                move |options: &GoogleMapOptions| {
                    widget_calls.set(widget_calls.get() + 1);
                    FakeMapView::ready(options)
                }
            },
            props,
        )
        .expect("compose map");
    ui_settings.set_compass_enabled(false);
    harness.pump();
    ui_settings.set_compass_enabled(true);
    harness.pump();

    assert_eq!(options_calls.get(), 1);
    assert_eq!(widget_calls.get(), 1);
    assert_eq!(handle.widget().options().map_id.as_deref(), Some("demo"));

    let (tag, lite_mode) = harness
        .applier_mut()
        .with_node(handle.node(), |node: &mut EmbeddedMapNode| {
            (
                node.modifier.test_tag_value().map(str::to_owned),
                node.options.lite_mode,
            )
        })
        .expect("embedded node");
    assert_eq!(tag.as_deref(), Some("map"));
    assert!(lite_mode);
    assert_eq!(harness.applier_mut().ids(), vec![handle.node()]);
}

#[test]
fn initial_sync_applies_every_facet_once() {
    let mut harness = MapTestHarness::new();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();

    assert_eq!(map.count(is_ui_setting), 10);
    assert_eq!(map.count(MapCall::is_property), 9);
    assert_eq!(map.count(is_move), 0);
    let calls = map.calls();
    for name in [
        "camera_move_started",
        "camera_move",
        "camera_idle",
        "indoor_state_change",
        "map_click",
        "map_long_click",
        "map_loaded",
        "my_location_button_click",
        "my_location_click",
        "poi_click",
    ] {
        assert!(calls.contains(&installed(name)), "{name} not installed");
    }
    assert!(calls.contains(&MapCall::SetLocationSource { installed: false }));
    assert!(calls.contains(&MapCall::SetMinZoomPreference(3.0)));
    assert_eq!(harness.notifier().observer_count(), 3);
}

#[test]
fn ui_setting_change_reapplies_only_ui_settings() {
    let mut harness = MapTestHarness::new();
    let ui_settings =
        MapUiSettingsState::with_runtime(&harness.runtime_handle(), MapUiSettings::default());
    let props = harness.props().ui_settings(ui_settings.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    map.take_calls();

    ui_settings.set_compass_enabled(false);
    harness.pump();

    let calls = map.take_calls();
    assert_eq!(calls.len(), 10);
    assert!(calls.iter().all(is_ui_setting));
    assert!(calls.contains(&MapCall::UiSetting {
        name: "compass",
        enabled: false,
    }));
}

#[test]
fn burst_of_changes_is_applied_once() {
    let mut harness = MapTestHarness::new();
    let ui_settings =
        MapUiSettingsState::with_runtime(&harness.runtime_handle(), MapUiSettings::default());
    let props = harness.props().ui_settings(ui_settings.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    map.take_calls();

    ui_settings.set_compass_enabled(false);
    ui_settings.set_tilt_gestures_enabled(false);
    ui_settings.set_zoom_controls_enabled(false);
    harness.pump();

    assert_eq!(map.take_calls().len(), 10);
}

#[test]
fn reverted_change_is_not_reapplied() {
    let mut harness = MapTestHarness::new();
    let properties =
        MapPropertiesState::with_runtime(&harness.runtime_handle(), MapProperties::default());
    let props = harness.props().properties(properties.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    map.take_calls();

    properties.set_traffic_enabled(true);
    properties.set_traffic_enabled(false);
    harness.pump();

    assert!(map.take_calls().is_empty());
}

#[test]
fn unrelated_state_does_not_touch_the_map() {
    let mut harness = MapTestHarness::new();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    map.take_calls();

    let unrelated = MutableState::new(0, &harness.notifier());
    unrelated.set(1);
    harness.pump();

    assert!(map.take_calls().is_empty());
}

#[test]
fn property_change_reapplies_properties() {
    let mut harness = MapTestHarness::new();
    let properties =
        MapPropertiesState::with_runtime(&harness.runtime_handle(), MapProperties::default());
    let props = harness.props().properties(properties.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    map.take_calls();

    properties.set_map_type(MapType::Satellite);
    harness.pump();

    let calls = map.take_calls();
    assert!(calls.contains(&MapCall::SetMapType(MapType::Satellite)));
    assert!(!calls.iter().any(is_ui_setting));
    assert!(!calls.iter().any(is_move));
}

#[test]
fn camera_state_moves_the_map() {
    let mut harness = MapTestHarness::new();
    let start = CameraPosition::from_lat_lng_zoom(LatLng::new(1.0, 1.0), 5.0);
    let camera = CameraPositionState::with_runtime(&harness.runtime_handle(), start);
    let props = harness
        .props()
        .camera_position_state(camera.clone())
        .options(move || GoogleMapOptions {
            camera: Some(start),
            ..GoogleMapOptions::default()
        });
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    assert_eq!(map.count(is_move), 0);
    assert!(camera.is_bound());

    let target = CameraPosition::from_lat_lng_zoom(LatLng::new(48.85, 2.35), 12.0);
    camera.set_position(target);
    harness.pump();

    assert_eq!(map.count(is_move), 1);
    assert_eq!(map.camera_position(), target);
}

#[test]
fn gestures_are_written_back_to_camera_state() {
    let mut harness = MapTestHarness::new();
    let camera =
        CameraPositionState::with_runtime(&harness.runtime_handle(), CameraPosition::default());
    let props = harness.props().camera_position_state(camera.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();

    let dragged = CameraPosition::from_lat_lng_zoom(LatLng::new(-33.86, 151.2), 9.0);
    map.gesture_to(dragged);
    harness.pump();

    assert_eq!(camera.position(), dragged);
    assert!(!camera.is_moving());
    assert_eq!(
        camera.camera_move_started_reason(),
        CameraMoveStartedReason::Gesture
    );
    assert_eq!(map.count(is_move), 0);
}

#[test]
fn move_camera_goes_straight_to_a_bound_map() {
    let mut harness = MapTestHarness::new();
    let camera =
        CameraPositionState::with_runtime(&harness.runtime_handle(), CameraPosition::default());
    let props = harness.props().camera_position_state(camera.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();

    camera.move_camera(maps_compose::CameraUpdate::ZoomTo(7.0));
    harness.pump();

    assert_eq!(map.count(is_move), 1);
    assert_eq!(camera.position().zoom, 7.0);
    assert_eq!(map.camera_position().zoom, 7.0);
}

#[test]
fn camera_state_cannot_drive_two_maps() {
    let mut harness = MapTestHarness::new();
    let camera =
        CameraPositionState::with_runtime(&harness.runtime_handle(), CameraPosition::default());
    let host = harness.host();
    let first_props = harness.props().camera_position_state(camera.clone());
    let second_props = harness.props().camera_position_state(camera.clone());
    let views = Rc::new(RefCell::new(Vec::new()));
    harness
        .set_content(|composer| {
            let first = maps_compose::GoogleMap(composer, &host, FakeMapView::ready, first_props);
            let second =
                maps_compose::GoogleMap(composer, &host, FakeMapView::ready, second_props);
            views
                .borrow_mut()
                .extend([Rc::clone(first.widget()), Rc::clone(second.widget())]);
        })
        .expect("compose maps");

    let bound = views
        .borrow()
        .iter()
        .filter(|view| view.controller().has_camera_listeners())
        .count();
    assert_eq!(bound, 1);
    assert!(camera.is_bound());
}

#[test]
fn listener_changes_reach_the_map() {
    let mut harness = MapTestHarness::new();
    let listeners = MapClickListeners::with_runtime(&harness.runtime_handle());
    let props = harness.props().listeners(listeners.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    let events = Rc::new(RefCell::new(Vec::<String>::new()));

    map.click_map(LatLng::new(1.0, 2.0));
    assert!(!map.click_my_location_button());

    listeners.set_on_map_click({
        let events = Rc::clone(&events);
        move |point| events.borrow_mut().push(format!("click {}", point.latitude))
    });
    listeners.set_on_map_long_click({
        let events = Rc::clone(&events);
        move |_| events.borrow_mut().push("long click".into())
    });
    listeners.set_on_map_loaded({
        let events = Rc::clone(&events);
        move || events.borrow_mut().push("loaded".into())
    });
    listeners.set_on_my_location_button_click(|| true);
    listeners.set_on_my_location_click({
        let events = Rc::clone(&events);
        move |location| events.borrow_mut().push(format!("me {}", location.provider))
    });
    listeners.set_on_poi_click({
        let events = Rc::clone(&events);
        move |poi| events.borrow_mut().push(format!("poi {}", poi.name))
    });
    listeners.set_on_indoor_building_focused({
        let events = Rc::clone(&events);
        move || events.borrow_mut().push("building".into())
    });
    listeners.set_on_indoor_level_activated({
        let events = Rc::clone(&events);
        move |building| {
            events
                .borrow_mut()
                .push(format!("level {}", building.levels.len()))
        }
    });
    harness.pump();

    map.click_map(LatLng::new(3.0, 4.0));
    map.long_click_map(LatLng::new(3.0, 4.0));
    map.finish_loading();
    assert!(map.click_my_location_button());
    map.click_my_location(&Location {
        provider: "gps".into(),
        ..Location::default()
    });
    map.click_poi(&PointOfInterest {
        position: LatLng::new(0.0, 0.0),
        place_id: "p1".into(),
        name: "Museum".into(),
    });
    map.focus_indoor_building();
    map.activate_indoor_level(&IndoorBuilding::default());

    assert_eq!(
        *events.borrow(),
        vec![
            "click 3".to_string(),
            "long click".into(),
            "loaded".into(),
            "me gps".into(),
            "poi Museum".into(),
            "building".into(),
            "level 0".into(),
        ]
    );
}

#[test]
fn location_source_follows_the_handle() {
    let mut harness = MapTestHarness::new();
    let source: Rc<dyn LocationSource> = Rc::new(FakeLocationSource);
    let props = harness.props().location_source(Rc::clone(&source));
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    assert!(map.location_source().is_some());

    handle.set_location_source(None);
    harness.pump();
    assert!(map.location_source().is_none());

    handle.set_location_source(Some(source));
    harness.pump();
    assert!(map.location_source().is_some());
}

#[test]
fn deferred_map_syncs_once_ready() {
    let mut harness = MapTestHarness::new();
    let ui_settings =
        MapUiSettingsState::with_runtime(&harness.runtime_handle(), MapUiSettings::default());
    let props = harness.props().ui_settings(ui_settings.clone());
    let handle = harness
        .set_map(FakeMapView::deferred, props)
        .expect("compose map");
    let view = Rc::clone(handle.widget());
    let map = view.controller();

    ui_settings.set_compass_enabled(false);
    harness.pump();
    assert!(map.calls().is_empty());
    assert_eq!(harness.notifier().observer_count(), 0);

    view.complete();
    harness.pump();

    assert!(map.calls().contains(&MapCall::UiSetting {
        name: "compass",
        enabled: false,
    }));
    assert_eq!(harness.notifier().observer_count(), 3);
}

#[test]
fn failed_initialization_skips_sync() {
    let mut harness = MapTestHarness::new();
    let properties =
        MapPropertiesState::with_runtime(&harness.runtime_handle(), MapProperties::default());
    let camera =
        CameraPositionState::with_runtime(&harness.runtime_handle(), CameraPosition::default());
    let props = harness
        .props()
        .properties(properties.clone())
        .camera_position_state(camera.clone());
    let handle = harness
        .set_map(FakeMapView::deferred, props)
        .expect("compose map");
    let view = Rc::clone(handle.widget());

    view.fail("missing api key");
    harness.pump();
    properties.set_traffic_enabled(true);
    harness.pump();

    assert!(view.controller().calls().is_empty());
    assert!(!camera.is_bound());
    assert_eq!(harness.notifier().observer_count(), 0);
}

#[test]
fn destroying_the_widget_before_its_map_arrives_ends_the_sync() {
    let mut harness = MapTestHarness::new();
    harness.resume();
    let props = harness.props();
    let handle = harness
        .set_map(FakeMapView::deferred, props)
        .expect("compose map");
    let view = Rc::clone(handle.widget());

    harness.handle_lifecycle_event(LifecycleEvent::Pause);
    harness.handle_lifecycle_event(LifecycleEvent::Stop);
    harness.handle_lifecycle_event(LifecycleEvent::Destroy);

    assert!(view.controller().calls().is_empty());
    assert_eq!(view.calls().last(), Some(&WidgetCall::Destroy));
}

#[test]
fn dispose_stops_sync_and_unbinds_the_camera() {
    let mut harness = MapTestHarness::new();
    let camera =
        CameraPositionState::with_runtime(&harness.runtime_handle(), CameraPosition::default());
    let properties =
        MapPropertiesState::with_runtime(&harness.runtime_handle(), MapProperties::default());
    let props = harness
        .props()
        .camera_position_state(camera.clone())
        .properties(properties.clone());
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    assert!(map.has_camera_listeners());

    harness.dispose();
    map.take_calls();
    properties.set_indoor_enabled(true);
    harness.pump();

    assert!(map.take_calls().is_empty());
    assert!(!map.has_camera_listeners());
    assert!(!camera.is_bound());
    assert_eq!(harness.notifier().observer_count(), 0);
}
