use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use maps_compose::{
    CameraPosition, CameraPositionState, ComponentCallbacksHost, ComponentCallbacksRegistry,
    GoogleMap, GoogleMapOptions, GoogleMapProps, LatLng, Lifecycle, LifecycleEvent,
    LifecycleRegistry, MapClickListeners, MapHost, MapProperties, MapPropertiesState, MapType,
    MapUiSettings, MapUiSettingsState, Marker, MarkerOptions, MarkerState, Modifier,
};
use maps_compose_core::{Composition, MemoryApplier};
use maps_compose_runtime_std::StdRuntime;
use maps_compose_testing::{FakeMapController, FakeMapView};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoConfig {
    ui_settings: MapUiSettings,
    properties: MapProperties,
    camera: CameraPosition,
    options: GoogleMapOptions,
}

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn report(step: &str, map: &FakeMapController) {
    let calls = map.take_calls();
    println!("{step}: {} map call(s)", calls.len());
    for call in calls {
        log::info!("  {call:?}");
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match std::env::args_os().nth(1) {
        Some(path) => match load_config(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => DemoConfig::default(),
    };
    log::debug!("demo config: {config:?}");

    println!("=== maps-compose demo ===");

    let runtime = StdRuntime::new();
    runtime.set_frame_waker(|| log::trace!("frame requested"));
    let handle = runtime.runtime_handle();
    let lifecycle = Rc::new(LifecycleRegistry::new());
    let callbacks = Rc::new(ComponentCallbacksRegistry::new());
    let host = MapHost {
        lifecycle: Rc::clone(&lifecycle) as Rc<dyn Lifecycle>,
        component_callbacks: Rc::clone(&callbacks) as Rc<dyn ComponentCallbacksHost>,
    };

    let camera = CameraPositionState::with_runtime(&handle, config.camera);
    let ui_settings = MapUiSettingsState::with_runtime(&handle, config.ui_settings);
    let properties = MapPropertiesState::with_runtime(&handle, config.properties);
    let listeners = MapClickListeners::with_runtime(&handle);
    listeners.set_on_map_click(|point| {
        println!("map clicked at {:.4}, {:.4}", point.latitude, point.longitude)
    });
    let marker = MarkerState::with_runtime(&handle, config.camera.target);

    let options = GoogleMapOptions {
        camera: config.options.camera.or(Some(config.camera)),
        ..config.options
    };
    let props = GoogleMapProps::new(&handle)
        .modifier(Modifier::fill_max_size().then(Modifier::test_tag("map")))
        .options(move || options.clone())
        .camera_position_state(camera.clone())
        .ui_settings(ui_settings.clone())
        .properties(properties.clone())
        .listeners(listeners)
        .content({
            let marker = marker.clone();
            move |composer| {
                Marker(
                    composer,
                    &marker,
                    MarkerOptions::default().title("You are here"),
                    None,
                );
            }
        });

    let mut composition = Composition::new(MemoryApplier::new(), handle.clone());
    let mut view = None;
    let composed = composition.set_content(|composer| {
        let map = GoogleMap(composer, &host, FakeMapView::deferred, props);
        view = Some(Rc::clone(map.widget()));
    });
    let view = match (composed, view) {
        (Ok(()), Some(view)) => view,
        (Err(err), _) => {
            log::error!("failed to compose the map: {err}");
            return ExitCode::FAILURE;
        }
        (Ok(()), None) => {
            log::error!("composition produced no map");
            return ExitCode::FAILURE;
        }
    };
    let map = view.controller();

    for event in [
        LifecycleEvent::Create,
        LifecycleEvent::Start,
        LifecycleEvent::Resume,
    ] {
        lifecycle.handle_lifecycle_event(event);
    }
    runtime.pump();
    println!("widget lifecycle: {:?}", view.lifecycle_calls());

    view.complete();
    runtime.pump();
    report("map ready", &map);

    ui_settings.set_zoom_controls_enabled(false);
    properties.set_map_type(MapType::Hybrid);
    runtime.pump();
    report("settings changed", &map);

    let dragged = CameraPosition::from_lat_lng_zoom(LatLng::new(47.3667, 8.55), 14.0);
    map.gesture_to(dragged);
    runtime.pump();
    println!("camera after gesture: {:?}", camera.position());
    report("camera gesture", &map);

    marker.set_position(dragged.target);
    map.click_map(dragged.target);
    runtime.pump();
    report("marker moved", &map);

    callbacks.dispatch_low_memory();
    lifecycle.handle_lifecycle_event(LifecycleEvent::Pause);
    lifecycle.handle_lifecycle_event(LifecycleEvent::Stop);
    composition.dispose();
    runtime.pump();
    report("detached", &map);
    lifecycle.handle_lifecycle_event(LifecycleEvent::Destroy);

    println!("widget lifecycle: {:?}", view.lifecycle_calls());
    ExitCode::SUCCESS
}
