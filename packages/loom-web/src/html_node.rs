//! [`NodeOps`] backend that serializes to an HTML string instead of touching a real DOM.
//!
//! Grounded on the teacher's `SsrNode` (`sycamore-web/src/node/ssr_node.rs`): the attribute/
//! bool-attribute/inner_html field split, the void-element table, and the escaping rules
//! (`html_escape::encode_double_quoted_attribute_to_string` / `encode_text_to_string`) all carry
//! over unchanged. What's different: the teacher's tree is write-only (appended to once, then
//! rendered, `parent_node`/`next_sibling` unimplemented) because its reconciler never runs against
//! `SsrNode` directly; this one needs real `parent`/sibling links since `loom-core`'s reconciler
//! is `NodeOps`-generic and exercises them even for SSR (e.g. a `For` list reordering before its
//! first and only render).

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use once_cell::sync::Lazy;

use loom_core::node_ops::{ElementTag, NodeOps};
use loom_core::props::{PropKind, PropValue};
use loom_reactive::effect::create_effect;

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track",
        "wbr", "command", "keygen", "menuitem",
    ]
    .into_iter()
    .collect()
});

enum Inner {
    Element {
        tag: &'static str,
        attributes: Vec<(String, String)>,
        bool_attributes: Vec<(String, bool)>,
        classes: Vec<(String, bool)>,
        styles: Vec<(String, String)>,
        inner_html: Option<String>,
        children: Vec<HtmlNode>,
        parent: Option<HtmlNode>,
    },
    Text {
        text: String,
        parent: Option<HtmlNode>,
    },
    /// A `<!---->` marker: the spec's anchor node, used for `If`/`For` empty states.
    Anchor { parent: Option<HtmlNode> },
    Fragment {
        children: Vec<HtmlNode>,
        parent: Option<HtmlNode>,
    },
}

/// An HTML-string ([`NodeOps`]) backend, suitable for server-side rendering.
///
/// _Requires the `ssr` feature._
#[derive(Clone)]
pub struct HtmlNode(Rc<RefCell<Inner>>);

impl PartialEq for HtmlNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for HtmlNode {}

impl std::hash::Hash for HtmlNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl std::fmt::Debug for HtmlNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.clone().serialize())
    }
}

impl HtmlNode {
    fn set_parent(&self, parent: Option<HtmlNode>) {
        match &mut *self.0.borrow_mut() {
            Inner::Element { parent: p, .. }
            | Inner::Text { parent: p, .. }
            | Inner::Anchor { parent: p }
            | Inner::Fragment { parent: p, .. } => *p = parent,
        }
    }

    fn children(&self) -> Vec<HtmlNode> {
        match &*self.0.borrow() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => children.clone(),
            Inner::Text { .. } | Inner::Anchor { .. } => Vec::new(),
        }
    }

    fn render_into(&self, buf: &mut String) {
        match &*self.0.borrow() {
            Inner::Element {
                tag,
                attributes,
                bool_attributes,
                classes,
                styles,
                inner_html,
                children,
                ..
            } => {
                buf.push('<');
                buf.push_str(tag);
                for (name, value) in attributes {
                    buf.push(' ');
                    buf.push_str(name);
                    buf.push_str("=\"");
                    html_escape::encode_double_quoted_attribute_to_string(value, buf);
                    buf.push('"');
                }
                if !classes.is_empty() {
                    let joined = classes
                        .iter()
                        .filter(|(_, enabled)| *enabled)
                        .map(|(name, _)| name.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !joined.is_empty() {
                        buf.push_str(" class=\"");
                        html_escape::encode_double_quoted_attribute_to_string(&joined, buf);
                        buf.push('"');
                    }
                }
                if !styles.is_empty() {
                    buf.push_str(" style=\"");
                    for (prop, value) in styles {
                        buf.push_str(prop);
                        buf.push(':');
                        buf.push_str(value);
                        buf.push(';');
                    }
                    buf.push('"');
                }
                for (name, value) in bool_attributes {
                    if *value {
                        buf.push(' ');
                        buf.push_str(name);
                    }
                }

                let is_void = VOID_ELEMENTS.contains(tag);
                if is_void {
                    buf.push_str("/>");
                    return;
                }
                buf.push('>');
                if let Some(inner_html) = inner_html {
                    buf.push_str(inner_html);
                } else {
                    for child in children {
                        child.render_into(buf);
                    }
                }
                buf.push_str("</");
                buf.push_str(tag);
                buf.push('>');
            }
            Inner::Text { text, .. } => html_escape::encode_text_to_string(text, buf),
            Inner::Anchor { .. } => buf.push_str("<!--/-->"),
            Inner::Fragment { children, .. } => {
                for child in children {
                    child.render_into(buf);
                }
            }
        }
    }

    /// Serializes this node (and, for elements/fragments, its descendants) to an HTML string.
    pub fn serialize(self) -> String {
        let mut buf = String::new();
        self.render_into(&mut buf);
        buf
    }
}

impl NodeOps for HtmlNode {
    /// SSR has no live event loop to dispatch to; `on:` bindings are accepted (so the same
    /// component code compiles against both backends) but never invoked.
    type Event = std::convert::Infallible;

    fn create_node(tag: ElementTag) -> Self {
        let tag = match tag {
            ElementTag::Html(tag) => tag,
            ElementTag::Namespaced { tag, .. } => tag,
        };
        HtmlNode(Rc::new(RefCell::new(Inner::Element {
            tag,
            attributes: Vec::new(),
            bool_attributes: Vec::new(),
            classes: Vec::new(),
            styles: Vec::new(),
            inner_html: None,
            children: Vec::new(),
            parent: None,
        })))
    }

    fn create_text_node(text: std::borrow::Cow<'static, str>) -> Self {
        HtmlNode(Rc::new(RefCell::new(Inner::Text {
            text: text.into_owned(),
            parent: None,
        })))
    }

    fn update_text(&self, text: &str) {
        if let Inner::Text { text: t, .. } = &mut *self.0.borrow_mut() {
            *t = text.to_string();
        }
    }

    fn create_anchor() -> Self {
        HtmlNode(Rc::new(RefCell::new(Inner::Anchor { parent: None })))
    }

    fn is_node(&self) -> bool {
        !matches!(&*self.0.borrow(), Inner::Anchor { .. })
    }

    fn create_fragment() -> Self {
        HtmlNode(Rc::new(RefCell::new(Inner::Fragment {
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
            _ => panic!("cannot insert into a text or anchor node"),
        };
        match &mut *self.0.borrow_mut() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => {
                children.insert(index, child.clone());
            }
            _ => unreachable!(),
        }
        child.set_parent(Some(self.clone()));
    }

    fn remove_node(&self, child: &Self) {
        match &mut *self.0.borrow_mut() {
            Inner::Element { children, .. } | Inner::Fragment { children, .. } => {
                children.retain(|c| c != child);
            }
            _ => panic!("cannot remove from a text or anchor node"),
        }
        child.set_parent(None);
    }

    fn set_prop(&self, kind: PropKind<'_>, value: PropValue<Self>) {
        match value {
            PropValue::Event(_) => {
                // No-op: there is no live DOM to dispatch to during SSR.
            }
            PropValue::Ref(_) => {}
            PropValue::Remove => remove_prop(self, kind),
            PropValue::Str(signal) => match kind {
                PropKind::Style(prop) => {
                    let node = self.clone();
                    let prop = prop.to_string();
                    create_effect(move || {
                        let value = signal.read();
                        node.set_style(prop.clone(), value);
                    });
                }
                PropKind::Namespaced { name, .. } | PropKind::Attr(name) | PropKind::Default(name) | PropKind::Prop(name) => {
                    let node = self.clone();
                    let name = name.to_string();
                    create_effect(move || {
                        let value = signal.read();
                        node.set_attr(name.clone(), value);
                    });
                }
                PropKind::Macro(name) => {
                    tracing::warn!(directive = name, "no SSR renderer directive registered for `m:{name}`");
                }
                PropKind::Class(_) => {
                    tracing::warn!("string value given for `class:`, which expects a boolean toggle");
                }
                PropKind::Event(_) | PropKind::Ref => unreachable!(),
            },
            PropValue::Bool(signal) => match kind {
                PropKind::Class(class) => {
                    let node = self.clone();
                    let class = class.to_string();
                    create_effect(move || {
                        let value = signal.read();
                        node.set_class(class.clone(), value);
                    });
                }
                PropKind::Attr(name) | PropKind::Default(name) | PropKind::Prop(name) => {
                    let node = self.clone();
                    let name = name.to_string();
                    create_effect(move || {
                        let value = signal.read();
                        node.set_bool_attr(name.clone(), value);
                    });
                }
                PropKind::Macro(name) => {
                    tracing::warn!(directive = name, "no SSR renderer directive registered for `m:{name}`");
                }
                PropKind::Namespaced { .. } | PropKind::Event(_) | PropKind::Ref | PropKind::Style(_) => {
                    tracing::warn!("boolean value given for a prop kind that expects a string");
                }
            },
        }
    }

    fn first_child(&self) -> Option<Self> {
        self.children().into_iter().next()
    }

    fn parent_node(&self) -> Option<Self> {
        match &*self.0.borrow() {
            Inner::Element { parent, .. }
            | Inner::Text { parent, .. }
            | Inner::Anchor { parent }
            | Inner::Fragment { parent, .. } => parent.clone(),
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        let parent = self.parent_node()?;
        let siblings = parent.children();
        let index = siblings.iter().position(|c| c == self)?;
        siblings.get(index + 1).cloned()
    }

    fn serialize(&self) -> String {
        self.clone().serialize()
    }
}

fn remove_prop(node: &HtmlNode, kind: PropKind<'_>) {
    match &mut *node.0.borrow_mut() {
        Inner::Element {
            attributes,
            bool_attributes,
            classes,
            styles,
            ..
        } => match kind {
            PropKind::Attr(name) | PropKind::Default(name) | PropKind::Namespaced { name, .. } | PropKind::Prop(name) => {
                attributes.retain(|(n, _)| n != name);
                bool_attributes.retain(|(n, _)| n != name);
            }
            PropKind::Class(class) => classes.retain(|(n, _)| n != class),
            PropKind::Style(prop) => styles.retain(|(p, _)| p != prop),
            PropKind::Event(_) | PropKind::Ref | PropKind::Macro(_) => {}
        },
        _ => {}
    }
}

impl HtmlNode {
    fn set_attr(&self, name: String, value: String) {
        if let Inner::Element { attributes, .. } = &mut *self.0.borrow_mut() {
            if let Some(existing) = attributes.iter_mut().find(|(n, _)| *n == name) {
                existing.1 = value;
            } else {
                attributes.push((name, value));
            }
        }
    }

    fn set_bool_attr(&self, name: String, value: bool) {
        if let Inner::Element { bool_attributes, .. } = &mut *self.0.borrow_mut() {
            if let Some(existing) = bool_attributes.iter_mut().find(|(n, _)| *n == name) {
                existing.1 = value;
            } else {
                bool_attributes.push((name, value));
            }
        }
    }

    fn set_class(&self, class: String, enabled: bool) {
        if let Inner::Element { classes, .. } = &mut *self.0.borrow_mut() {
            if let Some(existing) = classes.iter_mut().find(|(n, _)| *n == class) {
                existing.1 = enabled;
            } else {
                classes.push((class, enabled));
            }
        }
    }

    fn set_style(&self, prop: String, value: String) {
        if let Inner::Element { styles, .. } = &mut *self.0.borrow_mut() {
            if let Some(existing) = styles.iter_mut().find(|(p, _)| *p == prop) {
                existing.1 = value;
            } else {
                styles.push((prop, value));
            }
        }
    }

    /// Sets `inner_html` directly, bypassing escaping — the spec's `rawHTML` bypass. Mutually
    /// exclusive with children; callers are expected not to also append children to this node.
    pub fn set_raw_inner_html(&self, html: String) {
        if let Inner::Element { inner_html, .. } = &mut *self.0.borrow_mut() {
            *inner_html = Some(html);
        }
    }
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;
    use loom_reactive::signal::create_signal;
    use loom_reactive::MaybeSignal;

    use super::*;
    use loom_core::props::{PropKind, PropValue};

    #[test]
    fn renders_attributes_classes_and_styles() {
        let _ = create_root(|| {
            let node = HtmlNode::create_node(ElementTag::Html("div"));
            node.set_prop(PropKind::Default("id"), PropValue::Str(MaybeSignal::Static("main".into())));
            node.set_prop(PropKind::Class("active"), PropValue::Bool(MaybeSignal::Static(true)));
            node.set_prop(PropKind::Style("color"), PropValue::Str(MaybeSignal::Static("red".into())));
            assert_eq!(node.serialize(), r#"<div id="main" class="active" style="color:red;"></div>"#);
        });
    }

    #[test]
    fn void_elements_self_close_instead_of_getting_a_closing_tag() {
        let _ = create_root(|| {
            let node = HtmlNode::create_node(ElementTag::Html("br"));
            assert_eq!(node.serialize(), "<br/>");
        });
    }

    #[test]
    fn text_content_is_escaped() {
        let _ = create_root(|| {
            let node = HtmlNode::create_text_node("<script>".into());
            assert_eq!(node.serialize(), "&lt;script&gt;");
        });
    }

    #[test]
    fn reactive_attribute_updates_before_first_serialize() {
        let _ = create_root(|| {
            let disabled = create_signal(false);
            let node = HtmlNode::create_node(ElementTag::Html("button"));
            node.set_prop(PropKind::Attr("disabled"), PropValue::Bool(disabled.into()));
            disabled.set(true);
            assert_eq!(node.clone().serialize(), r#"<button disabled></button>"#);
        });
    }
}
