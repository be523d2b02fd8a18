//! A flat composition: content emits nodes into an [`Applier`] and registers
//! effects that run once the content has been emitted.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::thread;

use futures::future::LocalBoxFuture;

use crate::applier::{self, Applier, Node, NodeError, NodeId};
use crate::runtime::{RuntimeError, RuntimeHandle};

#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("composition has been disposed")]
    Disposed,
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Node(#[from] NodeError),
}

struct ContextInner {
    runtime: RuntimeHandle,
    parent: Option<CompositionContext>,
    children: Cell<usize>,
    disposed: Cell<bool>,
}

/// Identity of a composition as seen by the compositions nested in it.
#[derive(Clone)]
pub struct CompositionContext {
    inner: Rc<ContextInner>,
}

impl CompositionContext {
    fn root(runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                runtime,
                parent: None,
                children: Cell::new(0),
                disposed: Cell::new(false),
            }),
        }
    }

    fn child(&self) -> Self {
        self.inner.children.set(self.inner.children.get() + 1);
        Self {
            inner: Rc::new(ContextInner {
                runtime: self.inner.runtime.clone(),
                parent: Some(self.clone()),
                children: Cell::new(0),
                disposed: Cell::new(false),
            }),
        }
    }

    fn unregister_child(&self) {
        let children = self.inner.children.get();
        debug_assert!(children > 0, "child composition unregistered twice");
        self.inner.children.set(children.saturating_sub(1));
    }

    fn mark_disposed(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(parent) = &self.inner.parent {
            parent.unregister_child();
        }
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.inner.runtime.clone()
    }

    /// Number of live compositions created with this context as parent.
    pub fn child_count(&self) -> usize {
        self.inner.children.get()
    }

    pub fn parent(&self) -> Option<&CompositionContext> {
        self.inner.parent.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl fmt::Debug for CompositionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionContext")
            .field("children", &self.child_count())
            .field("nested", &self.inner.parent.is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

type Disposer = Box<dyn FnOnce()>;

pub struct Composition<A: Applier> {
    applier: A,
    context: CompositionContext,
    roots: Vec<NodeId>,
    disposers: Vec<Disposer>,
    disposed: bool,
}

impl<A: Applier> Composition<A> {
    pub fn new(applier: A, runtime: RuntimeHandle) -> Self {
        Self::from_context(applier, CompositionContext::root(runtime))
    }

    /// Creates a composition nested in the one that owns `parent`.
    pub fn with_parent(applier: A, parent: &CompositionContext) -> Self {
        Self::from_context(applier, parent.child())
    }

    fn from_context(applier: A, context: CompositionContext) -> Self {
        Self {
            applier,
            context,
            roots: Vec::new(),
            disposers: Vec::new(),
            disposed: false,
        }
    }

    /// Replaces the content of the composition.
    ///
    /// Previous content is torn down first. Effects registered by `content`
    /// run in registration order after it returns.
    pub fn set_content(
        &mut self,
        content: impl FnOnce(&mut Composer<'_, A>),
    ) -> Result<(), CompositionError> {
        if self.disposed {
            return Err(CompositionError::Disposed);
        }
        if !self.roots.is_empty() || !self.disposers.is_empty() {
            self.teardown_content();
        }

        let runtime = self.context.runtime();
        let effects = {
            let mut composer = Composer {
                applier: &mut self.applier,
                runtime: &runtime,
                context: &self.context,
                roots: &mut self.roots,
                effects: Vec::new(),
            };
            content(&mut composer);
            composer.effects
        };
        for effect in effects {
            if let Some(disposer) = effect.run(&runtime)? {
                self.disposers.push(disposer);
            }
        }
        Ok(())
    }

    fn teardown_content(&mut self) {
        if let Some(payload) = self.run_disposers() {
            panic::resume_unwind(payload);
        }
        self.applier.clear();
        self.roots.clear();
    }

    fn run_disposers(&mut self) -> Option<Box<dyn Any + Send>> {
        let mut first_panic = None;
        for disposer in mem::take(&mut self.disposers).into_iter().rev() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(disposer)) {
                log::error!("composition disposer panicked");
                first_panic.get_or_insert(payload);
            }
        }
        first_panic
    }

    fn dispose_collecting(&mut self) -> Option<Box<dyn Any + Send>> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        let payload = self.run_disposers();
        self.applier.clear();
        self.roots.clear();
        self.context.mark_disposed();
        log::debug!("composition disposed");
        payload
    }

    /// Runs every disposer in reverse registration order, then clears the
    /// applier and detaches from the parent composition.
    ///
    /// All disposers run even if one panics; the first panic is resumed
    /// afterwards.
    pub fn dispose(&mut self) {
        if let Some(payload) = self.dispose_collecting() {
            panic::resume_unwind(payload);
        }
    }

    fn dispose_from_drop(&mut self) {
        if let Some(payload) = self.dispose_collecting() {
            if thread::panicking() {
                log::error!("composition disposer panicked while unwinding");
            } else {
                panic::resume_unwind(payload);
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub fn applier_mut(&mut self) -> &mut A {
        &mut self.applier
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn context(&self) -> &CompositionContext {
        &self.context
    }
}

impl<A: Applier> Drop for Composition<A> {
    fn drop(&mut self) {
        if !self.disposed {
            log::warn!("composition dropped without dispose");
            self.dispose_from_drop();
        }
    }
}

impl<A: Applier> fmt::Debug for Composition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("roots", &self.roots)
            .field("disposers", &self.disposers.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Owns a composition and disposes it when dropped, including when the task
/// holding it is cancelled.
pub struct DisposingComposition<A: Applier> {
    composition: Composition<A>,
}

impl<A: Applier> DisposingComposition<A> {
    pub fn new(composition: Composition<A>) -> Self {
        Self { composition }
    }
}

impl<A: Applier> Deref for DisposingComposition<A> {
    type Target = Composition<A>;

    fn deref(&self) -> &Composition<A> {
        &self.composition
    }
}

impl<A: Applier> DerefMut for DisposingComposition<A> {
    fn deref_mut(&mut self) -> &mut Composition<A> {
        &mut self.composition
    }
}

impl<A: Applier> Drop for DisposingComposition<A> {
    fn drop(&mut self) {
        self.composition.dispose_from_drop();
    }
}

impl<A: Applier> fmt::Debug for DisposingComposition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisposingComposition")
            .field(&self.composition)
            .finish()
    }
}

enum PendingEffect {
    Side(Box<dyn FnOnce()>),
    Disposable(Box<dyn FnOnce(DisposableEffectScope) -> DisposableEffectResult>),
    Launched(Box<dyn FnOnce(LaunchedEffectScope) -> LocalBoxFuture<'static, ()>>),
}

impl PendingEffect {
    fn run(self, runtime: &RuntimeHandle) -> Result<Option<Disposer>, RuntimeError> {
        match self {
            PendingEffect::Side(effect) => {
                effect();
                Ok(None)
            }
            PendingEffect::Disposable(effect) => Ok(effect(DisposableEffectScope).cleanup),
            PendingEffect::Launched(effect) => {
                let active = Rc::new(Cell::new(true));
                let scope = LaunchedEffectScope {
                    runtime: runtime.clone(),
                    active: Rc::clone(&active),
                };
                let job = runtime.launch(effect(scope)).map_err(|err| {
                    log::error!("failed to launch effect: {err}");
                    err
                })?;
                Ok(Some(Box::new(move || {
                    active.set(false);
                    job.cancel();
                })))
            }
        }
    }
}

/// Handed to composition content to emit nodes and register effects.
pub struct Composer<'a, A: Applier> {
    applier: &'a mut A,
    runtime: &'a RuntimeHandle,
    context: &'a CompositionContext,
    roots: &'a mut Vec<NodeId>,
    effects: Vec<PendingEffect>,
}

impl<A: Applier> Composer<'_, A> {
    pub fn emit(&mut self, node: impl Node) -> NodeId {
        let id = self.applier.create(Box::new(node));
        self.roots.push(id);
        id
    }

    pub fn with_node_mut<N: Node, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut N) -> R,
    ) -> Result<R, NodeError> {
        applier::with_node_mut(&mut *self.applier, id, f)
    }

    pub fn applier(&mut self) -> &mut A {
        &mut *self.applier
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    pub fn composition_context(&self) -> &CompositionContext {
        self.context
    }

    /// Runs `effect` after the content has been emitted. The returned
    /// result's cleanup runs when the composition is disposed.
    pub fn disposable_effect(
        &mut self,
        effect: impl FnOnce(DisposableEffectScope) -> DisposableEffectResult + 'static,
    ) {
        self.effects.push(PendingEffect::Disposable(Box::new(effect)));
    }

    /// Launches the future built by `effect` once the content has been
    /// emitted. The task is cancelled when the composition is disposed.
    pub fn launched_effect<F, Fut>(&mut self, effect: F)
    where
        F: FnOnce(LaunchedEffectScope) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.effects
            .push(PendingEffect::Launched(Box::new(move |scope| {
                Box::pin(effect(scope))
            })));
    }

    pub fn side_effect(&mut self, effect: impl FnOnce() + 'static) {
        self.effects.push(PendingEffect::Side(Box::new(effect)));
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DisposableEffectScope;

impl DisposableEffectScope {
    pub fn on_dispose(&self, cleanup: impl FnOnce() + 'static) -> DisposableEffectResult {
        DisposableEffectResult::new(cleanup)
    }
}

#[derive(Default)]
pub struct DisposableEffectResult {
    cleanup: Option<Disposer>,
}

impl DisposableEffectResult {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

impl fmt::Debug for DisposableEffectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableEffectResult")
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct LaunchedEffectScope {
    runtime: RuntimeHandle,
    active: Rc<Cell<bool>>,
}

impl LaunchedEffectScope {
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn runtime(&self) -> RuntimeHandle {
        self.runtime.clone()
    }
}

impl fmt::Debug for LaunchedEffectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedEffectScope")
            .field("active", &self.is_active())
            .finish()
    }
}
