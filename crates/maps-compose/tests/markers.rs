use std::cell::Cell;
use std::rc::Rc;

use maps_compose::{LatLng, Marker, MarkerId, MarkerOptions, MarkerState};
use maps_compose_testing::{FakeMapView, MapCall, MapTestHarness};

#[test]
fn content_markers_follow_their_state() {
    let mut harness = MapTestHarness::new();
    let marker = MarkerState::with_runtime(&harness.runtime_handle(), LatLng::new(1.0, 1.0));
    let props = harness.props().content({
        let marker = marker.clone();
        move |composer| {
            Marker(composer, &marker, MarkerOptions::default().title("start"), None);
        }
    });
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();

    let markers = map.markers();
    assert_eq!(markers.len(), 1);
    let (&id, options) = markers.iter().next().expect("one marker");
    assert_eq!(options.position, LatLng::new(1.0, 1.0));
    assert_eq!(options.title.as_deref(), Some("start"));
    assert!(map.has_marker_click_listener());

    marker.set_position(LatLng::new(2.0, 3.0));
    harness.pump();

    assert_eq!(map.markers()[&id].position, LatLng::new(2.0, 3.0));
    assert_eq!(map.markers()[&id].title.as_deref(), Some("start"));
    let updates = map.count(|call| matches!(call, MapCall::UpdateMarker(..)));
    assert_eq!(updates, 1);
}

#[test]
fn marker_clicks_reach_their_handler() {
    let mut harness = MapTestHarness::new();
    let clicked = Rc::new(Cell::new(None));
    let marker = MarkerState::with_runtime(&harness.runtime_handle(), LatLng::new(0.0, 0.0));
    let props = harness.props().content({
        let clicked = Rc::clone(&clicked);
        move |composer| {
            let clicked = Rc::clone(&clicked);
            Marker(
                composer,
                &marker,
                MarkerOptions::default(),
                Some(Rc::new(move |id: MarkerId| {
                    clicked.set(Some(id));
                    true
                })),
            );
        }
    });
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    let id = *map.markers().keys().next().expect("one marker");

    assert!(map.click_marker(id));
    assert_eq!(clicked.get(), Some(id));
    assert!(!map.click_marker(MarkerId(id.0 + 100)));
}

#[test]
fn disposing_the_host_disposes_map_content() {
    let mut harness = MapTestHarness::new();
    let marker = MarkerState::with_runtime(&harness.runtime_handle(), LatLng::new(5.0, 5.0));
    let props = harness.props().content({
        let marker = marker.clone();
        move |composer| {
            Marker(composer, &marker, MarkerOptions::default(), None);
        }
    });
    let handle = harness
        .set_map(FakeMapView::ready, props)
        .expect("compose map");
    let map = handle.widget().controller();
    assert_eq!(harness.composition().context().child_count(), 1);
    assert_eq!(harness.notifier().observer_count(), 4);

    harness.dispose();

    assert!(map.markers().is_empty());
    assert!(map.calls().contains(&MapCall::Clear));
    assert!(!map.has_marker_click_listener());
    assert_eq!(harness.composition().context().child_count(), 0);
    assert_eq!(harness.notifier().observer_count(), 0);

    map.take_calls();
    marker.set_position(LatLng::new(6.0, 6.0));
    harness.pump();
    assert!(map.take_calls().is_empty());
}

#[test]
fn content_waits_for_the_map() {
    let mut harness = MapTestHarness::new();
    let marker = MarkerState::with_runtime(&harness.runtime_handle(), LatLng::new(0.0, 0.0));
    let props = harness.props().content(move |composer| {
        Marker(composer, &marker, MarkerOptions::default(), None);
    });
    let handle = harness
        .set_map(FakeMapView::deferred, props)
        .expect("compose map");
    let view = Rc::clone(handle.widget());
    assert_eq!(harness.composition().context().child_count(), 0);

    view.complete();
    harness.pump();

    assert_eq!(view.controller().markers().len(), 1);
    assert_eq!(harness.composition().context().child_count(), 1);
}
