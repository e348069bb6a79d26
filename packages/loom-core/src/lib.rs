//! The renderer-agnostic reactive UI runtime: disposal-scoped components, a pluggable node
//! contract ([`node_ops::NodeOps`]), list/fragment reconciliation, and the control-flow
//! primitives built on top of them. Pairs with [`loom_reactive`] (the signal graph, re-exported
//! here for convenience) and a concrete `NodeOps` backend such as `loom-web`'s DOM or SSR
//! renderers.

pub mod component;
pub mod control_flow;
pub mod node_ops;
pub mod node_ref;
pub mod props;
pub mod reconcile;
pub mod renderer;
pub mod spawn;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use loom_reactive;

/// Common imports for authoring components against a concrete [`node_ops::NodeOps`] backend.
pub mod prelude {
    pub use loom_reactive::prelude::*;

    pub use crate::component::{expose, get_current_self, mount, provide, Children, ComponentInstance};
    pub use crate::control_flow::{
        async_view, create_cache, fn_view, for_view, for_view_by_identity, if_view, lazy_view, memo, parse_view,
        refresh_entries, suspense_view, unkeyed_view, use_memo, CacheHandle, ForHandle, PortalPair, Track,
        Transition, TransitionPhase, WeakCacheHandle,
    };
    pub use crate::node_ops::{ElementTag, NodeOps};
    pub use crate::node_ref::{create_node_ref, NodeRef, RefTarget};
    pub use crate::props::{parse_prop_key, PropKind, PropValue, Props};
    pub use crate::renderer::{Renderer, Tag};
    pub use crate::spawn::{set_spawner, spawn_local_scoped};
    pub use crate::view::{IntoView, View};
}
