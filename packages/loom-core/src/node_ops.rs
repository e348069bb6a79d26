//! The renderer contract (`NodeOps` in the spec's `nodeOps`/`R` terms).
//!
//! A backend implements [`NodeOps`] once and gets the entire view/component/control-flow layer
//! for free, the same bargain the teacher library offers through `GenericNode`. The method
//! names here track the spec's `nodeOps` contract (`isNode`/`createNode`/`createTextNode`/
//! `createAnchor`/`createFragment`/`appendNode`/`insertBefore`/`removeNode`/`setProps`)
//! snake-cased; the remaining methods (`parent_node`, `next_sibling`, `replace_child`, ...) are
//! implementation-detail plumbing the reconciler needs and which `GenericNode` also exposes
//! beyond its documented "public" surface.

use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

use crate::props::{PropKind, PropValue};

/// A tag or fragment/component dispatch target for [`NodeOps::create_node`]. Mirrors the
/// dispatch the spec's `R.c(tag, props, ...children)` performs on its `tag` argument, minus the
/// component/signal cases (those are handled in `loom-core::renderer::Renderer::c`, above this
/// trait, since they need the component runtime, not just node creation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementTag {
    /// A plain HTML/XML-ish tag name, e.g. `"div"`.
    Html(&'static str),
    /// A tag in a non-default namespace, e.g. SVG/MathML elements.
    Namespaced {
        tag: &'static str,
        namespace: &'static str,
    },
}

/// Abstraction over a rendering backend: DOM, HTML-string SSR, or a custom target.
///
/// Implementors should be cheap to clone (typically an `Rc`-backed handle) and compare equal by
/// reference identity, since the reconciler uses nodes as hashmap keys during keyed-list diffing.
pub trait NodeOps: Debug + Clone + PartialEq + Eq + Hash + 'static {
    /// Event handler payload type this backend hands to `on:`-bound callbacks.
    type Event;

    /// Creates an element node for `tag`. This is `createNode` in the spec.
    fn create_node(tag: ElementTag) -> Self;

    /// Creates a text node with the given initial content. This is `createTextNode`; the
    /// reactive-binding half of "signal-aware" text nodes lives in
    /// [`crate::view::View::text`], which calls [`NodeOps::update_text`] inside an effect rather
    /// than requiring every backend to know about signals itself.
    fn create_text_node(text: Cow<'static, str>) -> Self;

    /// Updates the content of a node created by [`NodeOps::create_text_node`].
    fn update_text(&self, text: &str);

    /// Creates an anchor (marker/placeholder) node: an empty, otherwise-inert node used to mark
    /// a position for later insertion — e.g. the empty branch of an `If`, or the end of an empty
    /// `For` list. This is `createAnchor`.
    fn create_anchor() -> Self {
        Self::create_text_node("".into())
    }

    /// Returns `true` if `self` is a "real" content node as opposed to a pure anchor. The
    /// default backend-agnostic answer is `true`; backends that distinguish anchors at the type
    /// level (comment nodes vs. elements) can override this. This is `isNode`.
    fn is_node(&self) -> bool {
        true
    }

    /// Creates an empty fragment root — a node that children can be appended/inserted relative
    /// to but which itself is never attached to a real parent (`DocumentFragment` on the DOM).
    /// This is `createFragment`.
    fn create_fragment() -> Self;

    /// Appends `child` as the last child of `self`. This is `appendNode`.
    fn append_node(&self, child: &Self) {
        self.insert_before(child, None);
    }

    /// Inserts `child` as a child of `self`, immediately before `reference`, or at the end if
    /// `reference` is `None`. This is `insertBefore`.
    fn insert_before(&self, child: &Self, reference: Option<&Self>);

    /// Detaches `child` from `self`'s children. This is `removeNode`.
    fn remove_node(&self, child: &Self);

    /// Applies a single already-classified prop to `self`. `kind` is the result of
    /// [`crate::props::parse_prop_key`] (so the backend never reparses the `on:`/`attr:`/...
    /// prefix itself — only `$ref`, which the renderer handles directly, is never passed here).
    /// This is `setProps`, called once per prop rather than given the whole bag, so a backend
    /// never needs to know the full [`crate::props::Props`] shape.
    fn set_prop(&self, kind: PropKind<'_>, value: PropValue<Self>);

    /// Removes a child from wherever it currently lives (no-op if detached).
    fn remove_self(&self) {
        if let Some(parent) = self.parent_node() {
            parent.remove_node(self);
        }
    }

    /// Replaces `old` (a child of `self`) with `new`.
    fn replace_child(&self, old: &Self, new: &Self) {
        self.insert_before(new, Some(old));
        self.remove_node(old);
    }

    /// Clears every child of `self`. The default removes children one at a time; DOM-like
    /// backends typically override this with a faster bulk clear (`innerText = ""`).
    fn clear_children(&self) {
        while let Some(child) = self.first_child() {
            self.remove_node(&child);
        }
    }

    fn first_child(&self) -> Option<Self>;
    fn parent_node(&self) -> Option<Self>;
    fn next_sibling(&self) -> Option<Self>;

    /// Serializes `self` and its descendants. Backends that are not string-renderable (DOM)
    /// can leave this at the default, which panics.
    fn serialize(&self) -> String {
        panic!("this NodeOps backend does not support serialization")
    }
}
