#![doc = r"Snapshot state, change notification and composition primitives for maps-compose."]

extern crate self as maps_compose_core;

pub mod applier;
pub mod apply_notifier;
pub mod collections;
pub mod composition;
pub mod platform;
pub mod runtime;
pub mod snapshot;
pub mod snapshot_flow;
pub mod state;

pub use applier::{with_node_mut, Applier, AsAny, MemoryApplier, Node, NodeError, NodeId, NodeSlots};
pub use apply_notifier::{ApplyNotifier, ApplyObserverHandle, ChangeBatch, ObserverId};
pub use composition::{
    Composer, Composition, CompositionContext, CompositionError, DisposableEffectResult,
    DisposableEffectScope, DisposingComposition, LaunchedEffectScope,
};
pub use platform::RuntimeScheduler;
pub use runtime::{Job, Runtime, RuntimeError, RuntimeHandle};
pub use snapshot::{
    in_snapshot, take_mutable_snapshot, with_mutable_snapshot, MutableSnapshot, ReadObserver,
    SnapshotId,
};
pub use snapshot_flow::{
    intersects, snapshot_flow, try_snapshot_flow, SnapshotFlow, SnapshotStream, SnapshotValues,
};
pub use state::{
    MutableState, MutationPolicy, NeverEqualPolicy, State, StateId, StateIdSet,
    StructuralEqualityPolicy,
};

#[cfg(test)]
pub(crate) use runtime::TestRuntime;

#[cfg(test)]
#[path = "tests/snapshot_tests.rs"]
mod snapshot_tests;

#[cfg(test)]
#[path = "tests/snapshot_flow_tests.rs"]
mod snapshot_flow_tests;

#[cfg(test)]
#[path = "tests/composition_tests.rs"]
mod composition_tests;
