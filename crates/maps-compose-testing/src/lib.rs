//! Testing utilities and harness for maps-compose

mod fake_controller;
mod fake_view;
mod harness;

pub use fake_controller::{FakeMapController, MapCall};
pub use fake_view::{FakeMapView, WidgetCall};
pub use harness::MapTestHarness;

pub mod prelude {
    pub use crate::{FakeMapController, FakeMapView, MapCall, MapTestHarness, WidgetCall};
}
