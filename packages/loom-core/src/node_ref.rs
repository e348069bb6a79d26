//! `$ref`: imperative access to a mounted node or component instance.

use std::fmt;

use loom_reactive::signal::create_signal;
use loom_reactive::Signal;

use crate::node_ops::NodeOps;

/// A handle a `$ref` prop can bind to: either a plain node, or a live component instance (for
/// refs placed on a component rather than an element).
#[derive(Clone)]
pub enum RefTarget<N: NodeOps> {
    Node(N),
    Component(std::rc::Rc<crate::component::ComponentInstance<N>>),
}

impl<N: NodeOps> fmt::Debug for RefTarget<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(n) => f.debug_tuple("Node").field(n).finish(),
            Self::Component(_) => f.debug_tuple("Component").finish(),
        }
    }
}

/// A reference to a node or component instance, settable by the renderer on mount and readable
/// imperatively thereafter (typically from an `on_mount`/effect callback — reading it during the
/// component's own render body will panic or return `None`, since the ref is not yet set at that
/// point).
///
/// Backed by a [`Signal`], so reading a [`NodeRef`] inside an effect re-runs that effect once the
/// ref is actually assigned.
pub struct NodeRef<N: NodeOps>(Signal<Option<RefTarget<N>>>);

impl<N: NodeOps> NodeRef<N> {
    pub fn new() -> Self {
        create_node_ref()
    }

    /// Gets the bound node.
    ///
    /// # Panics
    /// Panics if the ref is not yet set, or is bound to a component instance rather than a node.
    #[track_caller]
    pub fn get(&self) -> N {
        self.try_get().expect("NodeRef is not set to a node")
    }

    pub fn try_get(&self) -> Option<N> {
        match self.0.get_clone() {
            Some(RefTarget::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn try_get_component(&self) -> Option<std::rc::Rc<crate::component::ComponentInstance<N>>> {
        match self.0.get_clone() {
            Some(RefTarget::Component(instance)) => Some(instance),
            _ => None,
        }
    }

    pub fn set(&self, node: N) {
        self.0.set(Some(RefTarget::Node(node)));
    }

    pub fn set_component(&self, instance: std::rc::Rc<crate::component::ComponentInstance<N>>) {
        self.0.set(Some(RefTarget::Component(instance)));
    }
}

impl<N: NodeOps> Default for NodeRef<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeOps> fmt::Debug for NodeRef<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.0.peek_clone()).finish()
    }
}

impl<N: NodeOps> Clone for NodeRef<N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N: NodeOps> Copy for NodeRef<N> {}

/// Creates a new, unset [`NodeRef`] owned by the current scope.
pub fn create_node_ref<N: NodeOps>() -> NodeRef<N> {
    NodeRef(create_signal(None))
}
