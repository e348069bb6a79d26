//! The prop-naming protocol: `on:`, `attr:`, `prop:`, `<ns>:`, `class:`, `style:`, `m:`, `$ref`.
//!
//! Parsing a prop key into a [`PropKind`] is renderer-agnostic (it's just string matching), so it
//! lives here rather than being duplicated in every [`crate::node_ops::NodeOps`] backend — a
//! backend only has to handle the already-resolved [`PropValue`] variants in
//! [`NodeOps::set_prop`](crate::node_ops::NodeOps::set_prop).
//!
//! Grounded on the teacher's `AttributeValue`/`Attributes` (`sycamore-core/src/component.rs`),
//! generalized from a fixed macro-expanded enum into a key-prefix parser since `loom` has no
//! JSX-style compiler to pre-classify each prop at compile time.

use std::collections::HashMap;

use loom_reactive::MaybeSignal;

use crate::node_ref::NodeRef;
use crate::node_ops::NodeOps;

/// What a prop key, after stripping its protocol prefix, should do to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind<'a> {
    /// `on:click = ...` — attach an event listener for the event named after the prefix.
    Event(&'a str),
    /// `attr:id = ...` — force-set as a plain HTML attribute even if a same-named DOM property
    /// exists (the default for unprefixed keys prefers the property when the backend has one).
    Attr(&'a str),
    /// `prop:value = ...` — force-set as a DOM/backend property rather than an attribute.
    Prop(&'a str),
    /// `<ns>:href = ...` for a non-default XML namespace, e.g. `xlink:href`.
    Namespaced { namespace: &'a str, name: &'a str },
    /// `class:active = ...` — toggle a single class based on a boolean.
    Class(&'a str),
    /// `style:color = ...` — set a single inline style property.
    Style(&'a str),
    /// `m:autofocus` — invoke a named renderer macro/directive with the prop's value as its
    /// argument.
    Macro(&'a str),
    /// `$ref` — bind a [`NodeRef`] to this node on creation.
    Ref,
    /// No recognized prefix: dispatch to the backend's default attribute-or-property heuristic.
    Default(&'a str),
}

/// Parses a prop key into its [`PropKind`]. `$ref` is matched exactly; every other form is
/// `prefix:rest`.
pub fn parse_prop_key(key: &str) -> PropKind<'_> {
    if key == "$ref" {
        return PropKind::Ref;
    }
    if let Some(rest) = key.strip_prefix("on:") {
        return PropKind::Event(rest);
    }
    if let Some(rest) = key.strip_prefix("attr:") {
        return PropKind::Attr(rest);
    }
    if let Some(rest) = key.strip_prefix("prop:") {
        return PropKind::Prop(rest);
    }
    if let Some(rest) = key.strip_prefix("class:") {
        return PropKind::Class(rest);
    }
    if let Some(rest) = key.strip_prefix("style:") {
        return PropKind::Style(rest);
    }
    if let Some(rest) = key.strip_prefix("m:") {
        return PropKind::Macro(rest);
    }
    if let Some((namespace, name)) = key.split_once(':') {
        return PropKind::Namespaced { namespace, name };
    }
    PropKind::Default(key)
}

/// A prop value, after protocol-prefix resolution, ready for a [`NodeOps`] backend to apply.
///
/// `String`/`Bool` carry a [`MaybeSignal`] rather than a bare value because nearly every prop in
/// the spec's prop protocol is reactive-capable (`attr:disabled = is_disabled_signal` is exactly
/// as valid as `attr:disabled = true`); the renderer subscribes once, in
/// [`crate::renderer::Renderer::set_props`], rather than every backend re-deriving the reactive
/// wiring itself.
pub enum PropValue<N: NodeOps> {
    Str(MaybeSignal<String>),
    Bool(MaybeSignal<bool>),
    Event(Box<dyn FnMut(N::Event)>),
    Ref(NodeRef<N>),
    Remove,
}

/// A spread-able bag of resolved props, used for passthrough (`..props.attributes`-style)
/// component composition. Generalizes the teacher's `Attributes<G>`.
#[derive(Default)]
pub struct Props<N: NodeOps> {
    values: HashMap<String, PropValue<N>>,
}

impl<N: NodeOps> Props<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropValue<N>) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue<N>> {
        self.values.remove(key)
    }

    /// Drains every prop, most commonly to apply them all to a freshly created node.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, PropValue<N>)> + '_ {
        self.values.drain()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_protocol_prefix() {
        assert_eq!(parse_prop_key("$ref"), PropKind::Ref);
        assert_eq!(parse_prop_key("on:click"), PropKind::Event("click"));
        assert_eq!(parse_prop_key("attr:id"), PropKind::Attr("id"));
        assert_eq!(parse_prop_key("prop:value"), PropKind::Prop("value"));
        assert_eq!(parse_prop_key("class:active"), PropKind::Class("active"));
        assert_eq!(parse_prop_key("style:color"), PropKind::Style("color"));
        assert_eq!(parse_prop_key("m:autofocus"), PropKind::Macro("autofocus"));
        assert_eq!(
            parse_prop_key("xlink:href"),
            PropKind::Namespaced {
                namespace: "xlink",
                name: "href"
            }
        );
        assert_eq!(parse_prop_key("id"), PropKind::Default("id"));
    }
}
