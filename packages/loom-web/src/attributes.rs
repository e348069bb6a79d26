//! Prop application for [`DomNode`] — the DOM side of [`loom_core::props::PropKind`] dispatch.
//!
//! Grounded on the teacher's `AttributeValue`/`SetAttribute` (`sycamore-web/src/attributes.rs`):
//! that code picked one of `setAttribute`/property-reflection/`classList`/`style` at
//! macro-expansion time based on the *static type* of `MaybeDyn<T>` the generated call site had.
//! `loom-core` has no macro layer, so the same four buckets are chosen here at runtime from
//! [`PropKind`] instead, but the underlying `web_sys` calls (and the `className`-vs-SVG fallback)
//! are the teacher's.

use wasm_bindgen::prelude::*;
use web_sys::Element;

use loom_core::props::{PropKind, PropValue};
use loom_reactive::effect::create_effect;

use crate::dom_node::{set_class_name, toggle_class, DomNode};

/// Applies one already-classified prop to `node`, wiring up a [`create_effect`] when the value is
/// signal-backed so the DOM stays in sync — the spec's `bind(handler, value)` collapsed into one
/// call per prop kind, since every [`PropValue`] variant here already carries a
/// [`loom_reactive::MaybeSignal`] rather than the three separate cases `bind` distinguishes.
pub(crate) fn bind_prop(node: &DomNode, kind: PropKind<'_>, value: PropValue<DomNode>) {
    match value {
        PropValue::Event(handler) => bind_event(node, event_name(kind), handler),
        PropValue::Ref(_) => {
            // `$ref` is resolved by `Renderer::set_props` before a prop ever reaches `set_prop`.
        }
        PropValue::Remove => remove_prop(node, kind),
        PropValue::Str(signal) => match kind {
            PropKind::Prop(name) => bind_str(node.clone(), signal, move |n, v| {
                js_sys::Reflect::set(n.as_web_sys(), &name.into(), &v.into()).unwrap_throw();
            }),
            PropKind::Style(prop) => {
                let prop = prop.to_string();
                bind_str(node.clone(), signal, move |n, v| {
                    n.as_web_sys()
                        .unchecked_ref::<Element>()
                        .unchecked_ref::<web_sys::HtmlElement>()
                        .style()
                        .set_property(&prop, v)
                        .unwrap_throw();
                });
            }
            PropKind::Namespaced { namespace, name } => {
                let namespace = namespace.to_string();
                let name = name.to_string();
                bind_str(node.clone(), signal, move |n, v| {
                    n.as_web_sys()
                        .unchecked_ref::<Element>()
                        .set_attribute_ns(Some(&namespace), &name, v)
                        .unwrap_throw();
                });
            }
            PropKind::Attr(name) | PropKind::Default(name) if name == "class" => {
                bind_str(node.clone(), signal, move |n, v| set_class_name(n.as_web_sys(), v));
            }
            PropKind::Attr(name) | PropKind::Default(name) => {
                let name = name.to_string();
                bind_str(node.clone(), signal, move |n, v| {
                    n.as_web_sys().unchecked_ref::<Element>().set_attribute(&name, v).unwrap_throw();
                });
            }
            PropKind::Macro(name) => {
                tracing::warn!(directive = name, "no DOM renderer directive registered for `m:{name}`");
            }
            PropKind::Class(_) => {
                tracing::warn!("string value given for `class:`, which expects a boolean toggle");
            }
            PropKind::Event(_) | PropKind::Ref => unreachable!("handled above"),
        },
        PropValue::Bool(signal) => match kind {
            PropKind::Class(class) => {
                let class = class.to_string();
                bind_bool(node.clone(), signal, move |n, v| toggle_class(n.as_web_sys(), &class, v));
            }
            PropKind::Prop(name) => bind_bool(node.clone(), signal, move |n, v| {
                js_sys::Reflect::set(n.as_web_sys(), &name.into(), &JsValue::from_bool(v)).unwrap_throw();
            }),
            PropKind::Attr(name) | PropKind::Default(name) => {
                let name = name.to_string();
                bind_bool(node.clone(), signal, move |n, v| {
                    let el = n.as_web_sys().unchecked_ref::<Element>();
                    if v {
                        el.set_attribute(&name, "").unwrap_throw();
                    } else {
                        el.remove_attribute(&name).unwrap_throw();
                    }
                });
            }
            PropKind::Macro(name) => {
                tracing::warn!(directive = name, "no DOM renderer directive registered for `m:{name}`");
            }
            PropKind::Namespaced { .. } | PropKind::Event(_) | PropKind::Ref | PropKind::Style(_) => {
                tracing::warn!("boolean value given for a prop kind that expects a string");
            }
        },
    }
}

fn event_name<'a>(kind: PropKind<'a>) -> &'a str {
    match kind {
        PropKind::Event(name) => name,
        _ => panic!("PropValue::Event paired with a non-event PropKind"),
    }
}

fn remove_prop(node: &DomNode, kind: PropKind<'_>) {
    let el = node.as_web_sys().unchecked_ref::<Element>();
    match kind {
        PropKind::Attr(name) | PropKind::Default(name) => {
            let _ = el.remove_attribute(name);
        }
        PropKind::Namespaced { name, .. } => {
            let _ = el.remove_attribute(name);
        }
        PropKind::Prop(name) => {
            let _ = js_sys::Reflect::delete_property(node.as_web_sys(), &name.into());
        }
        PropKind::Style(prop) => {
            let _ = el
                .unchecked_ref::<web_sys::HtmlElement>()
                .style()
                .remove_property(prop);
        }
        PropKind::Class(class) => toggle_class(node.as_web_sys(), class, false),
        PropKind::Event(_) | PropKind::Ref | PropKind::Macro(_) => {}
    }
}

fn bind_str(node: DomNode, value: loom_reactive::MaybeSignal<String>, apply: impl Fn(&DomNode, &str) + 'static) {
    create_effect(move || {
        let v = value.read();
        apply(&node, &v);
    });
}

fn bind_bool(node: DomNode, value: loom_reactive::MaybeSignal<bool>, apply: impl Fn(&DomNode, bool) + 'static) {
    create_effect(move || {
        let v = value.read();
        apply(&node, v);
    });
}

fn bind_event(node: &DomNode, name: &str, mut handler: Box<dyn FnMut(web_sys::Event)>) {
    let closure = Closure::wrap(Box::new(move |event: web_sys::Event| handler(event)) as Box<dyn FnMut(web_sys::Event)>);
    node.as_web_sys()
        .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
        .unwrap_throw();
    loom_reactive::scope::on_cleanup(move || drop(closure));
}
