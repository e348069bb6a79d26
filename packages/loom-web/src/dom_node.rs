//! [`NodeOps`] backend for the browser DOM.
//!
//! Grounded on the teacher's `sycamore-web::DomNode` (`GenericNode` impl over `web_sys::Node`,
//! `packages/sycamore-web/src/node/dom_node.rs`): the node-identity trick (an expando property
//! making an opaque `web_sys::Node` `Hash`-able), the `className`-vs-`setAttribute("class", ...)`
//! SVG fallback, and the event-closure-leaked-into-`on_cleanup` pattern are all carried over
//! unchanged. What's new is `set_prop`: the teacher dispatches each attribute/property/class/style
//! binding kind at macro-expansion time via generated code; here [`crate::attributes::bind_prop`]
//! does the same dispatch at runtime off [`loom_core::props::PropKind`].

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use js_sys::Array;
use wasm_bindgen::prelude::*;
use web_sys::{Comment, Element, Node, Text};

use loom_core::node_ops::{ElementTag, NodeOps};
use loom_core::props::{PropKind, PropValue};

use crate::attributes::bind_prop;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = Node)]
    type NodeWithId;
    #[wasm_bindgen(method, getter, js_name = "$$$loomNodeId")]
    fn node_id(this: &NodeWithId) -> Option<usize>;
    #[wasm_bindgen(method, setter, js_name = "$$$loomNodeId")]
    fn set_node_id(this: &NodeWithId, id: usize);

    #[wasm_bindgen(extends = Element)]
    type ElementTrySetClassName;
    #[wasm_bindgen(method, catch, setter, js_name = "className")]
    fn try_set_class_name(this: &ElementTrySetClassName, class_name: &str) -> Result<(), JsValue>;
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

impl NodeId {
    fn of(node: &Node) -> Self {
        thread_local!(static COUNTER: Cell<usize> = const { Cell::new(1) });

        if let Some(id) = node.unchecked_ref::<NodeWithId>().node_id() {
            return Self(id);
        }
        let id = COUNTER.with(|c| {
            let id = c.get();
            c.set(id + 1);
            id
        });
        node.unchecked_ref::<NodeWithId>().set_node_id(id);
        Self(id)
    }
}

/// Returns the current document, panicking if called outside a browser (or worker) context.
pub fn document() -> web_sys::Document {
    web_sys::window()
        .expect_throw("no global `window`; are we running outside a browser?")
        .document()
        .expect_throw("window has no `document`")
}

/// A DOM node (element, text, comment, or `DocumentFragment`).
///
/// _Requires the `dom` feature._
#[derive(Clone)]
pub struct DomNode {
    node: Node,
    id: Cell<NodeId>,
}

impl DomNode {
    pub fn from_web_sys(node: Node) -> Self {
        Self {
            node,
            id: Cell::new(NodeId::default()),
        }
    }

    pub fn as_web_sys(&self) -> &Node {
        &self.node
    }

    fn get_id(&self) -> NodeId {
        if self.id.get() == NodeId::default() {
            self.id.set(NodeId::of(&self.node));
        }
        self.id.get()
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.node.is_same_node(Some(&other.node))
    }
}
impl Eq for DomNode {}

impl Hash for DomNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get_id().hash(state);
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(el) = self.node.dyn_ref::<Element>() {
            write!(f, "{}", el.outer_html())
        } else if let Some(text) = self.node.dyn_ref::<Text>() {
            write!(f, "{:?}", text.data())
        } else if let Some(comment) = self.node.dyn_ref::<Comment>() {
            write!(f, "<!--{}-->", comment.data())
        } else {
            f.write_str("#document-fragment")
        }
    }
}

impl NodeOps for DomNode {
    type Event = web_sys::Event;

    fn create_node(tag: ElementTag) -> Self {
        let node: Node = match tag {
            ElementTag::Html(tag) => document().create_element(tag).unwrap_throw().into(),
            ElementTag::Namespaced { tag, namespace } => {
                document().create_element_ns(Some(namespace), tag).unwrap_throw().into()
            }
        };
        Self::from_web_sys(node)
    }

    fn create_text_node(text: std::borrow::Cow<'static, str>) -> Self {
        Self::from_web_sys(document().create_text_node(&text).into())
    }

    fn update_text(&self, text: &str) {
        self.node.set_text_content(Some(text));
    }

    fn create_anchor() -> Self {
        Self::from_web_sys(document().create_comment("").into())
    }

    fn is_node(&self) -> bool {
        self.node.node_type() != Node::COMMENT_NODE
    }

    fn create_fragment() -> Self {
        Self::from_web_sys(document().create_document_fragment().into())
    }

    fn insert_before(&self, child: &Self, reference: Option<&Self>) {
        self.node
            .insert_before(&child.node, reference.map(|r| &r.node))
            .unwrap_throw();
    }

    fn remove_node(&self, child: &Self) {
        self.node.remove_child(&child.node).unwrap_throw();
    }

    fn set_prop(&self, kind: PropKind<'_>, value: PropValue<Self>) {
        bind_prop(self, kind, value);
    }

    fn first_child(&self) -> Option<Self> {
        self.node.first_child().map(Self::from_web_sys)
    }

    fn parent_node(&self) -> Option<Self> {
        self.node.parent_node().map(Self::from_web_sys)
    }

    fn next_sibling(&self) -> Option<Self> {
        self.node.next_sibling().map(Self::from_web_sys)
    }

    fn remove_self(&self) {
        if let Some(el) = self.node.dyn_ref::<Element>() {
            el.remove();
        } else if let Some(parent) = self.parent_node() {
            parent.remove_node(self);
        }
    }
}

/// Sets (or clears, via an empty class list) the `class` attribute, falling back to
/// `setAttribute` for SVG elements where the `className` property setter throws.
pub(crate) fn set_class_name(node: &Node, value: &str) {
    if node
        .unchecked_ref::<ElementTrySetClassName>()
        .try_set_class_name(value)
        .is_err()
    {
        node.unchecked_ref::<Element>().set_attribute("class", value).unwrap_throw();
    }
}

pub(crate) fn toggle_class(node: &Node, class: &str, enabled: bool) {
    let list = node.unchecked_ref::<Element>().class_list();
    if enabled {
        list.add(&Array::of1(&class.into())).unwrap_throw();
    } else {
        list.remove(&Array::of1(&class.into())).unwrap_throw();
    }
}
