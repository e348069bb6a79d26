//! `Renderer<N>` — the spec's `R`: the factory/dispatch layer built on top of [`NodeOps`].
//!
//! Grounded on `sycamore-core`'s implicit renderer (the free functions in `component.rs`/
//! `render.rs` that every `G: GenericNode` call site goes through) collapsed into one struct per
//! spec §4.3's `createRenderer(nodeOps)` — the teacher has no single `R` value because its
//! monomorphization happens at the macro-expansion call site instead.

use std::marker::PhantomData;

use loom_reactive::signal::Signal;
use loom_reactive::MaybeSignal;

use crate::node_ops::{ElementTag, NodeOps};
use crate::props::{parse_prop_key, PropValue, Props};
use crate::reconcile::insert;
use crate::view::View;

/// What [`Renderer::c`] dispatches on — the spec's `tag` argument to `R.c(tag, props,
/// ...children)`. The component/signal branches of `R.c`'s dispatch table need the renderer
/// itself (to call back into `c`/`render`), so they are closures rather than a `NodeOps`-level
/// concept.
pub enum Tag<N: NodeOps> {
    /// A plain or namespaced element tag — `nodeOps.createNode`.
    Element(ElementTag),
    /// `R.f`, the fragment sentinel — `nodeOps.createFragment`.
    Fragment,
    /// A component template: `createComponent(template, props, children)` followed by invoking
    /// its render function with `R`.
    Component(Box<dyn FnOnce(&Renderer<N>) -> View<N>>),
    /// A signal used directly as a tag: remounts the subtree whenever it changes.
    Dyn(Signal<View<N>>),
    /// `null`/`undefined`/`false` — nothing is produced.
    Empty,
}

/// The renderer: a thin, stateless (zero-sized) wrapper that ties [`NodeOps`] element creation to
/// the prop-naming protocol and the [`crate::reconcile`] insertion machinery.
pub struct Renderer<N: NodeOps> {
    _marker: PhantomData<N>,
}

impl<N: NodeOps> Default for Renderer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeOps> Renderer<N> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// `R.text(value)` — a signal-aware text node.
    pub fn text(&self, value: impl Into<MaybeSignal<String>>) -> View<N> {
        View::text(value)
    }

    /// `R.c(tag, props, ...children)`.
    pub fn c(&self, tag: Tag<N>, mut props: Props<N>, children: Vec<View<N>>) -> View<N> {
        match tag {
            Tag::Empty => View::empty(),
            Tag::Fragment => {
                let node = N::create_fragment();
                self.append_normalized_children(&node, children);
                View::new_node(node)
            }
            Tag::Element(element_tag) => {
                let node = N::create_node(element_tag);
                self.set_props(&node, &mut props);
                self.append_normalized_children(&node, children);
                View::new_node(node)
            }
            Tag::Component(render) => render(self),
            Tag::Dyn(signal) => View::new_dyn(move || signal.get_clone()),
        }
    }

    fn append_normalized_children(&self, node: &N, children: Vec<View<N>>) {
        if children.is_empty() {
            return;
        }
        let fragment = self.normalize_children(children);
        insert(node, fragment, None, None, true);
    }

    /// `R.normalizeChildren` — flattens a `Vec<View<N>>` produced by call-site children into a
    /// single fragment view. Unlike the spec's dynamically-typed JS children (which might be
    /// arrays, primitives, or nullish), Rust call sites already produce `View<N>` per child via
    /// [`crate::view::IntoView`], so "flatten nested arrays / convert primitives / drop nullish"
    /// has already happened by the time children reach here — this step only wraps them.
    pub fn normalize_children(&self, children: Vec<View<N>>) -> View<N> {
        View::new_fragment(children)
    }

    /// Applies every prop in `props` to `node`: `$ref` is handled directly (refs are a core
    /// concept, not a renderer backend concept — see spec §4.2); everything else is classified
    /// via [`parse_prop_key`] and forwarded to [`NodeOps::set_prop`].
    pub fn set_props(&self, node: &N, props: &mut Props<N>) {
        let entries: Vec<_> = props.drain().collect();
        for (key, value) in entries {
            if key == "$ref" {
                if let PropValue::Ref(node_ref) = value {
                    node_ref.set(node.clone());
                }
                continue;
            }
            let kind = parse_prop_key(&key);
            node.set_prop(kind, value);
        }
    }

    /// `R.render(target, view)` — mounts `view` as a child of `target`. This is the entry point
    /// `render(target, template, props, ...children)` from spec §4.2 collapses into once `view`
    /// has already been produced by [`crate::component::mount`]/[`Renderer::c`].
    pub fn render(&self, target: &N, view: View<N>) {
        insert(target, view, None, None, true);
    }
}
