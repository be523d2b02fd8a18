use std::any::{self, Any};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node {id} missing")]
    Missing { id: NodeId },
    #[error("node {id} type mismatch; expected {expected}")]
    TypeMismatch { id: NodeId, expected: &'static str },
}

/// Dynamic access to the concrete node type behind a `dyn Node`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait Node: AsAny {
    /// Called once the applier has inserted the node.
    fn mount(&mut self) {}
    /// Called when the node is removed on its own.
    fn unmount(&mut self) {}
    /// Called when the whole tree is cleared at once; the backing structure
    /// has already dropped whatever the node created.
    fn on_cleared(&mut self) {}
}

/// Mounts nodes produced by a composition into some concrete tree.
pub trait Applier: 'static {
    fn create(&mut self, node: Box<dyn Node>) -> NodeId;
    fn get_mut(&mut self, id: NodeId) -> Result<&mut dyn Node, NodeError>;
    fn remove(&mut self, id: NodeId) -> Result<(), NodeError>;
    fn clear(&mut self);
}

pub fn with_node_mut<A, N, R>(
    applier: &mut A,
    id: NodeId,
    f: impl FnOnce(&mut N) -> R,
) -> Result<R, NodeError>
where
    A: Applier + ?Sized,
    N: Node,
{
    let node = applier.get_mut(id)?;
    let typed = node
        .as_any_mut()
        .downcast_mut::<N>()
        .ok_or(NodeError::TypeMismatch {
            id,
            expected: any::type_name::<N>(),
        })?;
    Ok(f(typed))
}

/// Slot storage shared by appliers that keep their nodes in a flat list.
#[derive(Default)]
pub struct NodeSlots {
    nodes: Vec<Option<Box<dyn Node>>>,
}

impl NodeSlots {
    pub fn insert(&mut self, mut node: Box<dyn Node>) -> NodeId {
        let id = self.nodes.len();
        node.mount();
        self.nodes.push(Some(node));
        id
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut dyn Node, NodeError> {
        let slot = self
            .nodes
            .get_mut(id)
            .ok_or(NodeError::Missing { id })?
            .as_deref_mut()
            .ok_or(NodeError::Missing { id })?;
        Ok(slot)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), NodeError> {
        let mut node = self
            .nodes
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(NodeError::Missing { id })?;
        node.unmount();
        Ok(())
    }

    pub fn clear(&mut self) {
        for mut node in self.nodes.drain(..).flatten() {
            node.on_cleared();
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_ref().map(|_| id))
    }
}

/// Applier that keeps nodes in memory with no backing structure.
#[derive(Default)]
pub struct MemoryApplier {
    slots: NodeSlots,
}

impl MemoryApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node<N: Node, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut N) -> R,
    ) -> Result<R, NodeError> {
        with_node_mut(self, id, f)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.slots.ids().collect()
    }
}

impl Applier for MemoryApplier {
    fn create(&mut self, node: Box<dyn Node>) -> NodeId {
        self.slots.insert(node)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut dyn Node, NodeError> {
        self.slots.get_mut(id)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.slots.remove(id)
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}
