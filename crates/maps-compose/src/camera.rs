//! Camera position values and the observable camera state holder.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use maps_compose_core::{ApplyNotifier, MutableState, RuntimeHandle};
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::geo::{LatLng, LatLngBounds};
use crate::widget::MapController;

pub const MIN_ZOOM: f32 = 0.0;
pub const MAX_ZOOM: f32 = 21.0;
pub const MAX_TILT: f32 = 90.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f32,
    pub tilt: f32,
    pub bearing: f32,
}

impl CameraPosition {
    pub fn from_lat_lng_zoom(target: LatLng, zoom: f32) -> Self {
        Self {
            target,
            zoom,
            ..Self::default()
        }
    }

    fn normalized(mut self) -> Self {
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.tilt = self.tilt.clamp(0.0, MAX_TILT);
        self.bearing = self.bearing.rem_euclid(360.0);
        self
    }
}

/// A change to the camera, resolved against the current position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraUpdate {
    NewCameraPosition(CameraPosition),
    NewLatLng(LatLng),
    NewLatLngZoom(LatLng, f32),
    NewLatLngBounds(LatLngBounds),
    ZoomTo(f32),
    ZoomBy(f32),
    ZoomIn,
    ZoomOut,
}

impl CameraUpdate {
    pub fn apply_to(&self, current: &CameraPosition) -> CameraPosition {
        let next = match *self {
            CameraUpdate::NewCameraPosition(position) => position,
            CameraUpdate::NewLatLng(target) => CameraPosition {
                target,
                ..*current
            },
            CameraUpdate::NewLatLngZoom(target, zoom) => CameraPosition {
                target,
                zoom,
                ..*current
            },
            CameraUpdate::NewLatLngBounds(bounds) => CameraPosition {
                target: bounds.center(),
                ..*current
            },
            CameraUpdate::ZoomTo(zoom) => CameraPosition { zoom, ..*current },
            CameraUpdate::ZoomBy(delta) => CameraPosition {
                zoom: current.zoom + delta,
                ..*current
            },
            CameraUpdate::ZoomIn => CameraPosition {
                zoom: current.zoom + 1.0,
                ..*current
            },
            CameraUpdate::ZoomOut => CameraPosition {
                zoom: current.zoom - 1.0,
                ..*current
            },
        };
        next.normalized()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMoveStartedReason {
    #[default]
    NoMovementYet,
    Gesture,
    ApiAnimation,
    DeveloperAnimation,
    Unknown,
}

type MapSlot = Rc<RefCell<Option<Weak<dyn MapController>>>>;

/// Observable camera state, kept in sync with at most one map at a time.
///
/// While bound, camera gestures on the map are written back into the state
/// when the camera becomes idle.
#[derive(Clone)]
pub struct CameraPositionState {
    position: MutableState<CameraPosition>,
    is_moving: MutableState<bool>,
    move_started_reason: MutableState<CameraMoveStartedReason>,
    map: MapSlot,
}

impl CameraPositionState {
    pub fn new(notifier: &ApplyNotifier, position: CameraPosition) -> Self {
        Self {
            position: MutableState::new(position, notifier),
            is_moving: MutableState::new(false, notifier),
            move_started_reason: MutableState::new(
                CameraMoveStartedReason::NoMovementYet,
                notifier,
            ),
            map: Rc::new(RefCell::new(None)),
        }
    }

    pub fn with_runtime(runtime: &RuntimeHandle, position: CameraPosition) -> Self {
        Self::new(&runtime.notifier(), position)
    }

    pub fn position(&self) -> CameraPosition {
        self.position.get()
    }

    /// Sets the desired position. A bound map picks it up on its next sync.
    pub fn set_position(&self, position: CameraPosition) {
        self.position.set(position);
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving.get()
    }

    pub fn camera_move_started_reason(&self) -> CameraMoveStartedReason {
        self.move_started_reason.get()
    }

    fn bound_map(&self) -> Option<Rc<dyn MapController>> {
        self.map.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_bound(&self) -> bool {
        self.bound_map().is_some()
    }

    /// Moves the bound map's camera immediately, or only updates the state
    /// if no map is bound.
    pub fn move_camera(&self, update: CameraUpdate) {
        match self.bound_map() {
            Some(map) => {
                map.move_camera(&update);
                self.position.set(map.camera_position());
            }
            None => {
                let next = update.apply_to(&self.position.peek());
                self.position.set(next);
            }
        }
    }

    /// Binds this state to `map` until the returned binding is dropped.
    pub fn bind(&self, map: &Rc<dyn MapController>) -> Result<CameraBinding, MapError> {
        if self.is_bound() {
            return Err(MapError::CameraAlreadyBound);
        }
        *self.map.borrow_mut() = Some(Rc::downgrade(map));

        let started = self.clone();
        map.set_on_camera_move_started_listener(Some(Rc::new(move |reason| {
            started.move_started_reason.set(reason);
            started.is_moving.set(true);
        })));

        let moving = self.clone();
        map.set_on_camera_move_listener(Some(Rc::new(move || {
            if let Some(map) = moving.bound_map() {
                moving.position.set(map.camera_position());
            }
        })));

        let idle = self.clone();
        map.set_on_camera_idle_listener(Some(Rc::new(move || {
            if let Some(map) = idle.bound_map() {
                idle.position.set(map.camera_position());
            }
            idle.is_moving.set(false);
        })));

        log::debug!("camera position state bound to map");
        Ok(CameraBinding {
            state: self.clone(),
            map: Rc::downgrade(map),
        })
    }
}

impl fmt::Debug for CameraPositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraPositionState")
            .field("position", &self.position.peek())
            .field("is_moving", &self.is_moving.peek())
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Keeps a [`CameraPositionState`] bound to a map. Dropping it removes the
/// camera listeners and releases the state for another map.
pub struct CameraBinding {
    state: CameraPositionState,
    map: Weak<dyn MapController>,
}

impl Drop for CameraBinding {
    fn drop(&mut self) {
        if let Some(map) = self.map.upgrade() {
            map.set_on_camera_move_started_listener(None);
            map.set_on_camera_move_listener(None);
            map.set_on_camera_idle_listener(None);
        }
        *self.state.map.borrow_mut() = None;
        log::debug!("camera position state unbound");
    }
}

impl fmt::Debug for CameraBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraBinding")
            .field("map_alive", &(self.map.strong_count() > 0))
            .finish()
    }
}
