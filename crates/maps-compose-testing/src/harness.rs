use std::cell::RefCell;
use std::rc::Rc;

use maps_compose::{
    ComponentCallbacksHost, ComponentCallbacksRegistry, GoogleMap, GoogleMapHandle,
    GoogleMapOptions, GoogleMapProps, Lifecycle, LifecycleEvent, LifecycleRegistry, MapHost,
    MapWidget,
};
use maps_compose_core::{
    ApplyNotifier, Composer, Composition, CompositionError, MemoryApplier, RuntimeHandle,
};
use maps_compose_runtime_std::StdRuntime;

/// Headless host for exercising maps in tests.
///
/// `MapTestHarness` owns a [`StdRuntime`], a host composition over an
/// in-memory applier, and the lifecycle and component-callback registries a
/// map attaches to. Tests drive it with [`pump`](Self::pump) and explicit
/// lifecycle events instead of a real frame loop.
pub struct MapTestHarness {
    runtime: StdRuntime,
    lifecycle: Rc<LifecycleRegistry>,
    component_callbacks: Rc<ComponentCallbacksRegistry>,
    composition: Composition<MemoryApplier>,
}

impl MapTestHarness {
    pub fn new() -> Self {
        let runtime = StdRuntime::new();
        let composition = Composition::new(MemoryApplier::new(), runtime.runtime_handle());
        Self {
            runtime,
            lifecycle: Rc::new(LifecycleRegistry::new()),
            component_callbacks: Rc::new(ComponentCallbacksRegistry::new()),
            composition,
        }
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.runtime_handle()
    }

    pub fn notifier(&self) -> ApplyNotifier {
        self.runtime.notifier()
    }

    pub fn host(&self) -> MapHost {
        MapHost {
            lifecycle: Rc::clone(&self.lifecycle) as Rc<dyn Lifecycle>,
            component_callbacks: Rc::clone(&self.component_callbacks)
                as Rc<dyn ComponentCallbacksHost>,
        }
    }

    pub fn lifecycle(&self) -> &Rc<LifecycleRegistry> {
        &self.lifecycle
    }

    pub fn component_callbacks(&self) -> &Rc<ComponentCallbacksRegistry> {
        &self.component_callbacks
    }

    /// Default props bound to this harness' runtime.
    pub fn props(&self) -> GoogleMapProps {
        GoogleMapProps::new(&self.runtime_handle())
    }

    /// Installs `content` in the host composition and runs the tasks it
    /// launched until they stall.
    pub fn set_content(
        &mut self,
        content: impl FnOnce(&mut Composer<'_, MemoryApplier>),
    ) -> Result<(), CompositionError> {
        self.composition.set_content(content)?;
        self.pump();
        Ok(())
    }

    /// Composes a single `GoogleMap` and returns its handle.
    pub fn set_map<W>(
        &mut self,
        widget_factory: impl FnOnce(&GoogleMapOptions) -> Rc<W>,
        props: GoogleMapProps,
    ) -> Result<GoogleMapHandle<W>, CompositionError>
    where
        W: MapWidget + 'static,
    {
        let host = self.host();
        let handle = RefCell::new(None);
        self.set_content(|composer| {
            *handle.borrow_mut() = Some(GoogleMap(composer, &host, widget_factory, props));
        })?;
        handle.into_inner().ok_or(CompositionError::Disposed)
    }

    /// Delivers pending state changes and runs tasks until idle.
    pub fn pump(&self) -> usize {
        self.runtime.pump()
    }

    pub fn handle_lifecycle_event(&self, event: LifecycleEvent) {
        self.lifecycle.handle_lifecycle_event(event);
        self.pump();
    }

    /// Moves the host lifecycle from initialized to resumed.
    pub fn resume(&self) {
        for event in [
            LifecycleEvent::Create,
            LifecycleEvent::Start,
            LifecycleEvent::Resume,
        ] {
            self.handle_lifecycle_event(event);
        }
    }

    pub fn dispatch_low_memory(&self) {
        self.component_callbacks.dispatch_low_memory();
    }

    /// Disposes the host composition and lets cancelled tasks unwind.
    pub fn dispose(&mut self) {
        self.composition.dispose();
        self.pump();
    }

    pub fn composition(&mut self) -> &mut Composition<MemoryApplier> {
        &mut self.composition
    }

    pub fn applier_mut(&mut self) -> &mut MemoryApplier {
        self.composition.applier_mut()
    }
}

impl Default for MapTestHarness {
    fn default() -> Self {
        Self::new()
    }
}
