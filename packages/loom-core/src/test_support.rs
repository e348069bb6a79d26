//! An in-memory [`NodeOps`] backend used only by this crate's own test suite.
//!
//! Grounded on the teacher's predecessor `maple-core::generic_node::vdom::Node` (a `Rc<RefCell<_>>`
//! tree implementing `GenericNode` purely in memory, with no DOM/string rendering at all) —
//! unlike that implementation, `parent_node`/`next_sibling` are fully implemented here rather than
//! left `unimplemented!()`, since the reconciler genuinely exercises them.

#![cfg(test)]

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::node_ops::{ElementTag, NodeOps};
use crate::props::PropKind;
use crate::props::PropValue;

#[derive(Clone)]
enum Inner {
    Element {
        tag: &'static str,
        children: Vec<TestNode>,
        parent: Option<TestNode>,
    },
    Text {
        text: String,
        parent: Option<TestNode>,
    },
    Fragment {
        children: Vec<TestNode>,
        parent: Option<TestNode>,
    },
}

#[derive(Clone)]
pub struct TestNode(Rc<RefCell<Inner>>);

impl PartialEq for TestNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for TestNode {}

impl std::hash::Hash for TestNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            Inner::Element { tag, children, .. } => {
                f.debug_struct("Element").field("tag", tag).field("children", children).finish()
            }
            Inner::Text { text, .. } => f.debug_tuple("Text").field(text).finish(),
            Inner::Fragment { children, .. } => f.debug_tuple("Fragment").field(children).finish(),
        }
    }
}

impl TestNode {
    pub fn tag(&self) -> Option<&'static str> {
        match &*self.0.borrow() {
            Inner::Element { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub fn text_content(&self) -> Option<String> {
        match &*self.0.borrow() {
            Inner::Text { text, .. } => Some(text.clone()),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<TestNode> {
        match &*self.0.borrow() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => children.clone(),
            Inner::Text { .. } => Vec::new(),
        }
    }

    fn set_parent(&self, parent: Option<TestNode>) {
        match &mut *self.0.borrow_mut() {
            Inner::Element { parent: p, .. }
            | Inner::Text { parent: p, .. }
            | Inner::Fragment { parent: p, .. } => *p = parent,
        }
    }
}

impl NodeOps for TestNode {
    type Event = ();

    fn create_node(tag: ElementTag) -> Self {
        let tag = match tag {
            ElementTag::Html(tag) => tag,
            ElementTag::Namespaced { tag, .. } => tag,
        };
        TestNode(Rc::new(RefCell::new(Inner::Element {
            tag,
            children: Vec::new(),
            parent: None,
        })))
    }

    fn create_text_node(text: std::borrow::Cow<'static, str>) -> Self {
        TestNode(Rc::new(RefCell::new(Inner::Text {
            text: text.into_owned(),
            parent: None,
        })))
    }

    fn update_text(&self, text: &str) {
        if let Inner::Text { text: t, .. } = &mut *self.0.borrow_mut() {
            *t = text.to_string();
        }
    }

    fn create_fragment() -> Self {
        TestNode(Rc::new(RefCell::new(Inner::Fragment {
            children: Vec::new(),
            parent: None,
        })))
    }

    fn insert_before(&self, child: &Self, reference: Option<&Self>) {
        let index = match &*self.0.borrow() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => match reference {
                Some(r) => children.iter().position(|c| c == r).expect("reference not a child"),
                None => children.len(),
            },
            Inner::Text { .. } => panic!("cannot insert into a text node"),
        };
        match &mut *self.0.borrow_mut() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => {
                children.insert(index, child.clone());
            }
            Inner::Text { .. } => unreachable!(),
        }
        child.set_parent(Some(self.clone()));
    }

    fn remove_node(&self, child: &Self) {
        match &mut *self.0.borrow_mut() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => {
                children.retain(|c| c != child);
            }
            Inner::Text { .. } => panic!("cannot remove from a text node"),
        }
        child.set_parent(None);
    }

    fn set_prop(&self, kind: PropKind<'_>, _value: PropValue<Self>) {
        let _ = kind;
    }

    fn first_child(&self) -> Option<Self> {
        match &*self.0.borrow() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => children.first().cloned(),
            Inner::Text { .. } => None,
        }
    }

    fn parent_node(&self) -> Option<Self> {
        match &*self.0.borrow() {
            Inner::Element { parent, .. } | Inner::Text { parent, .. } | Inner::Fragment { parent, .. } => {
                parent.clone()
            }
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        let parent = self.parent_node()?;
        let siblings = parent.children();
        let index = siblings.iter().position(|c| c == self)?;
        siblings.get(index + 1).cloned()
    }
}
