use super::*;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type EventLog = Rc<RefCell<Vec<String>>>;

struct TestNode {
    name: &'static str,
    log: EventLog,
}

impl Node for TestNode {
    fn mount(&mut self) {
        self.log.borrow_mut().push(format!("mount {}", self.name));
    }

    fn unmount(&mut self) {
        self.log.borrow_mut().push(format!("unmount {}", self.name));
    }

    fn on_cleared(&mut self) {
        self.log.borrow_mut().push(format!("cleared {}", self.name));
    }
}

#[derive(Default)]
struct TestDummyNode;

impl Node for TestDummyNode {}

fn push(log: &EventLog, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

#[test]
fn content_emits_nodes_into_applier() {
    let runtime = TestRuntime::new();
    let log = EventLog::default();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());

    composition
        .set_content(|composer| {
            composer.emit(TestNode {
                name: "a",
                log: Rc::clone(&log),
            });
            let id = composer.emit(TestDummyNode);
            assert!(composer.with_node_mut(id, |_: &mut TestDummyNode| ()).is_ok());
        })
        .expect("compose");

    assert_eq!(composition.roots(), &[0, 1]);
    assert_eq!(composition.applier().len(), 2);
    assert_eq!(*log.borrow(), vec!["mount a".to_string()]);
    let name = composition
        .applier_mut()
        .with_node(0, |node: &mut TestNode| node.name)
        .expect("node a");
    assert_eq!(name, "a");

    composition.dispose();
    assert!(composition.applier().is_empty());
    assert_eq!(log.borrow().last().map(String::as_str), Some("cleared a"));
}

#[test]
fn node_lookup_reports_missing_and_mismatched_nodes() {
    let mut applier = MemoryApplier::new();
    let id = applier.create(Box::new(TestDummyNode));
    let err = applier
        .with_node(id, |_: &mut TestNode| ())
        .expect_err("type mismatch");
    assert!(matches!(err, NodeError::TypeMismatch { id: 0, .. }));

    applier.remove(id).expect("remove");
    assert_eq!(
        applier.with_node(id, |_: &mut TestDummyNode| ()),
        Err(NodeError::Missing { id })
    );
    assert_eq!(applier.remove(id), Err(NodeError::Missing { id }));
}

#[test]
fn effects_run_after_content_and_dispose_in_reverse() {
    let runtime = TestRuntime::new();
    let log = EventLog::default();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());

    composition
        .set_content(|composer| {
            let first = Rc::clone(&log);
            composer.disposable_effect(move |scope| {
                push(&first, "effect 1");
                scope.on_dispose(move || push(&first, "dispose 1"))
            });
            let side = Rc::clone(&log);
            composer.side_effect(move || push(&side, "side"));
            let second = Rc::clone(&log);
            composer.disposable_effect(move |scope| {
                push(&second, "effect 2");
                scope.on_dispose(move || push(&second, "dispose 2"))
            });
            composer.disposable_effect(|_| DisposableEffectResult::default());
            push(&log, "content");
        })
        .expect("compose");

    composition.dispose();
    assert_eq!(
        *log.borrow(),
        vec!["content", "effect 1", "side", "effect 2", "dispose 2", "dispose 1"]
    );
    assert!(composition.is_disposed());
}

#[test]
fn panicking_disposer_does_not_skip_siblings() {
    let runtime = TestRuntime::new();
    let log = EventLog::default();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());

    composition
        .set_content(|composer| {
            let first = Rc::clone(&log);
            composer.disposable_effect(move |scope| {
                scope.on_dispose(move || push(&first, "dispose 1"))
            });
            composer.disposable_effect(|scope| scope.on_dispose(|| panic!("dispose 2 failed")));
            let third = Rc::clone(&log);
            composer.disposable_effect(move |scope| {
                scope.on_dispose(move || push(&third, "dispose 3"))
            });
            composer.emit(TestDummyNode);
        })
        .expect("compose");

    let result = panic::catch_unwind(AssertUnwindSafe(|| composition.dispose()));
    assert!(result.is_err());
    assert_eq!(*log.borrow(), vec!["dispose 3", "dispose 1"]);
    assert!(composition.applier().is_empty());
    assert!(composition.is_disposed());
}

#[test]
fn launched_effect_is_cancelled_on_dispose() {
    let runtime = TestRuntime::new();
    let active_seen = Rc::new(Cell::new(false));
    let (sender, receiver) = futures::channel::oneshot::channel::<()>();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());

    let seen = Rc::clone(&active_seen);
    composition
        .set_content(move |composer| {
            composer.launched_effect(move |scope| async move {
                seen.set(scope.is_active());
                let _ = receiver.await;
            });
        })
        .expect("compose");

    runtime.run_until_stalled();
    assert!(active_seen.get());

    composition.dispose();
    runtime.run_until_stalled();
    assert!(sender.send(()).is_err());
}

#[test]
fn set_content_replaces_previous_content() {
    let runtime = TestRuntime::new();
    let log = EventLog::default();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());

    for round in ["first", "second"] {
        let log = Rc::clone(&log);
        composition
            .set_content(move |composer| {
                composer.disposable_effect(move |scope| {
                    push(&log, round);
                    scope.on_dispose(move || push(&log, &format!("dispose {round}")))
                });
                composer.emit(TestDummyNode);
            })
            .expect("compose");
    }

    assert_eq!(composition.applier().len(), 1);
    assert_eq!(*log.borrow(), vec!["first", "dispose first", "second"]);
}

#[test]
fn disposed_composition_rejects_content() {
    let runtime = TestRuntime::new();
    let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());
    composition.dispose();
    composition.dispose();
    assert!(matches!(
        composition.set_content(|_| {}),
        Err(CompositionError::Disposed)
    ));
}

#[test]
fn nested_composition_tracks_parent() {
    let runtime = TestRuntime::new();
    let mut parent = Composition::new(MemoryApplier::new(), runtime.handle());
    let context = parent.context().clone();

    let child = Composition::with_parent(MemoryApplier::new(), &context);
    assert_eq!(context.child_count(), 1);
    assert!(child.context().parent().is_some());

    let guard = DisposingComposition::new(child);
    assert!(!guard.is_disposed());
    drop(guard);
    assert_eq!(context.child_count(), 0);

    parent.dispose();
    assert!(context.is_disposed());
}

#[test]
fn dropping_undisposed_composition_still_cleans_up() {
    let runtime = TestRuntime::new();
    let log = EventLog::default();
    {
        let mut composition = Composition::new(MemoryApplier::new(), runtime.handle());
        let cleanup = Rc::clone(&log);
        composition
            .set_content(move |composer| {
                composer.disposable_effect(move |scope| {
                    scope.on_dispose(move || push(&cleanup, "disposed"))
                });
            })
            .expect("compose");
    }
    assert_eq!(*log.borrow(), vec!["disposed"]);
}

#[test]
fn launch_failure_is_reported_by_set_content() {
    let runtime = TestRuntime::new();
    let handle = runtime.handle();
    drop(runtime);
    let mut composition = Composition::new(MemoryApplier::new(), handle);
    let result = composition.set_content(|composer| {
        composer.launched_effect(|_| async {});
    });
    assert!(matches!(
        result,
        Err(CompositionError::Runtime(RuntimeError::Dropped))
    ));
}
