use super::*;
use maps_compose_core::{ApplyNotifier, ApplyObserverHandle};
use std::cell::RefCell;
use std::rc::Rc;

fn batch_sizes(notifier: &ApplyNotifier) -> (ApplyObserverHandle, Rc<RefCell<Vec<usize>>>) {
    let sizes = Rc::new(RefCell::new(Vec::new()));
    let handle = notifier.register_apply_observer({
        let sizes = Rc::clone(&sizes);
        move |batch| sizes.borrow_mut().push(batch.len())
    });
    (handle, sizes)
}

#[test]
fn defaults_match_the_widget_defaults() {
    let properties = MapProperties::default();
    assert!(!properties.is_building_enabled);
    assert!(!properties.is_my_location_enabled);
    assert_eq!(properties.map_type, MapType::Normal);
    assert_eq!(properties.max_zoom_preference, 21.0);
    assert_eq!(properties.min_zoom_preference, 3.0);
    assert!(properties.map_style_options.is_none());

    let settings = MapUiSettings::default();
    assert!(settings.compass_enabled);
    assert!(settings.zoom_gestures_enabled);
    assert!(settings.scroll_gestures_enabled_during_rotate_or_zoom);
}

#[test]
fn properties_load_from_partial_json() {
    let properties: MapProperties =
        serde_json::from_str(r#"{"map_type":"satellite","is_traffic_enabled":true}"#)
            .expect("parse properties");
    assert_eq!(properties.map_type, MapType::Satellite);
    assert!(properties.is_traffic_enabled);
    assert_eq!(properties.min_zoom_preference, 3.0);

    let settings: MapUiSettings =
        serde_json::from_str(r#"{"compass_enabled":false}"#).expect("parse ui settings");
    assert_eq!(
        settings,
        MapUiSettings {
            compass_enabled: false,
            ..MapUiSettings::default()
        }
    );
}

#[test]
fn map_type_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&MapType::Hybrid).expect("serialize"),
        r#""hybrid""#
    );
    let parsed: MapType = serde_json::from_str(r#""terrain""#).expect("parse");
    assert_eq!(parsed, MapType::Terrain);
}

#[test]
fn state_round_trips_through_snapshot() {
    let notifier = ApplyNotifier::new();
    let initial = MapProperties {
        is_indoor_enabled: true,
        map_style_options: Some(MapStyleOptions::new("[]")),
        ..MapProperties::default()
    };
    let state = MapPropertiesState::new(&notifier, initial.clone());
    assert_eq!(state.snapshot(), initial);
    assert!(state.is_indoor_enabled());

    state.set_map_type(MapType::Hybrid);
    assert_eq!(state.map_type(), MapType::Hybrid);
    assert!(notifier.has_pending_changes());
}

#[test]
fn assign_commits_changed_fields_as_one_batch() {
    let notifier = ApplyNotifier::new();
    let state = MapUiSettingsState::new(&notifier, MapUiSettings::default());
    let (_handle, sizes) = batch_sizes(&notifier);

    state.assign(&MapUiSettings {
        compass_enabled: false,
        zoom_controls_enabled: false,
        ..MapUiSettings::default()
    });

    assert_eq!(*sizes.borrow(), vec![2]);
    assert!(!state.compass_enabled());
    assert!(!state.zoom_controls_enabled());
    assert!(state.tilt_gestures_enabled());
    assert!(!notifier.has_pending_changes());
}

#[test]
fn assigning_the_current_value_is_not_a_change() {
    let notifier = ApplyNotifier::new();
    let state = MapPropertiesState::new(&notifier, MapProperties::default());
    let (_handle, sizes) = batch_sizes(&notifier);

    state.assign(&MapProperties::default());
    state.set_max_zoom_preference(21.0);

    assert!(sizes.borrow().is_empty());
    assert!(!notifier.has_pending_changes());
}

#[test]
fn listener_sets_compare_by_identity() {
    let notifier = ApplyNotifier::new();
    let listeners = MapClickListeners::new(&notifier);
    let before = listeners.snapshot();
    assert!(before == listeners.snapshot());

    listeners.set_on_map_click(|_| {});
    let after = listeners.snapshot();
    assert!(before != after);
    assert!(after == listeners.snapshot());
}

#[test]
fn setting_a_listener_is_always_a_change() {
    let notifier = ApplyNotifier::new();
    let listeners = MapClickListeners::new(&notifier);
    let (_handle, sizes) = batch_sizes(&notifier);

    listeners.set_on_map_loaded(|| {});
    assert!(notifier.send_apply_notifications());
    listeners.set_on_map_loaded(|| {});
    assert!(notifier.send_apply_notifications());

    assert_eq!(*sizes.borrow(), vec![1, 1]);
}

#[test]
fn default_listeners_do_nothing() {
    let notifier = ApplyNotifier::new();
    let listeners = MapClickListeners::new(&notifier).snapshot();
    (listeners.on_map_click)(LatLng::new(1.0, 1.0));
    (listeners.on_map_loaded)();
    assert!(!(listeners.on_my_location_button_click)());
}

#[test]
fn modifiers_chain_in_order() {
    let modifier = Modifier::fill_max_size()
        .then(Modifier::padding(4.0))
        .then(Modifier::test_tag("map"));
    assert_eq!(
        modifier.ops(),
        &[
            ModOp::FillMaxWidth(1.0),
            ModOp::FillMaxHeight(1.0),
            ModOp::Padding(4.0),
            ModOp::TestTag("map".into()),
        ]
    );
    assert_eq!(modifier.test_tag_value(), Some("map"));
    assert_eq!(Modifier::empty().then(modifier.clone()), modifier);
}
