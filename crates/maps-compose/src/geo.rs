//! Geographic value types shared by the map controller and state holders.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    /// Latitude is clamped to `[-90, 90]` and longitude wrapped into
    /// `[-180, 180)`.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let longitude = if (-180.0..180.0).contains(&longitude) {
            longitude
        } else {
            ((longitude - 180.0) % 360.0 + 360.0) % 360.0 - 180.0
        };
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub southwest: LatLng,
    pub northeast: LatLng,
}

impl LatLngBounds {
    pub fn new(southwest: LatLng, northeast: LatLng) -> Self {
        Self {
            southwest,
            northeast,
        }
    }

    fn spans_antimeridian(&self) -> bool {
        self.southwest.longitude > self.northeast.longitude
    }

    pub fn contains(&self, point: LatLng) -> bool {
        let latitude_ok =
            (self.southwest.latitude..=self.northeast.latitude).contains(&point.latitude);
        let longitude_ok = if self.spans_antimeridian() {
            point.longitude >= self.southwest.longitude
                || point.longitude <= self.northeast.longitude
        } else {
            (self.southwest.longitude..=self.northeast.longitude).contains(&point.longitude)
        };
        latitude_ok && longitude_ok
    }

    pub fn center(&self) -> LatLng {
        let latitude = (self.southwest.latitude + self.northeast.latitude) / 2.0;
        let mut east = self.northeast.longitude;
        if self.spans_antimeridian() {
            east += 360.0;
        }
        LatLng::new(latitude, (self.southwest.longitude + east) / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub position: LatLng,
    pub place_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndoorLevel {
    pub name: String,
    pub short_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndoorBuilding {
    pub levels: Vec<IndoorLevel>,
    pub active_level_index: Option<usize>,
    pub default_level_index: usize,
    pub underground: bool,
}

impl IndoorBuilding {
    pub fn active_level(&self) -> Option<&IndoorLevel> {
        self.active_level_index
            .and_then(|index| self.levels.get(index))
    }
}

/// A position fix as reported by a location source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub position: LatLng,
    pub accuracy_meters: Option<f32>,
    pub bearing: Option<f32>,
    pub provider: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub alpha: f32,
    pub draggable: bool,
    pub visible: bool,
    pub z_index: f32,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            position: LatLng::default(),
            title: None,
            snippet: None,
            alpha: 1.0,
            draggable: false,
            visible: true,
            z_index: 0.0,
        }
    }
}

impl MarkerOptions {
    pub fn at(position: LatLng) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}
