//! `Parse` — hands a caller-supplied parser an append callback and collects whatever it produces
//! into reactive children (spec §4.8). Grounded on [`crate::component::mount`]'s scope-owned setup
//! pattern: `parse_view` is a thin scope around a `Vec<View<N>>` accumulator, nothing more.

use std::cell::RefCell;
use std::rc::Rc;

use loom_reactive::scope::create_child_scope;

use crate::node_ops::NodeOps;
use crate::view::View;

/// Runs `parser` once, inside its own disposal scope, passing it an `append` callback it may call
/// any number of times (zero, one, or many — streaming parsers that discover children
/// incrementally are the point). `expose`, if given, receives whatever `parser` returns once it's
/// done, mirroring `createComponent`'s own `expose` protocol.
///
/// Scope-owned: everything `parser` sets up (signals, effects, nested components) while running
/// is torn down together when the view this returns is disposed.
pub fn parse_view<N, T>(
    parser: impl FnOnce(&mut dyn FnMut(View<N>)) -> T,
    expose: impl FnOnce(T) + 'static,
) -> View<N>
where
    N: NodeOps,
{
    let children: Rc<RefCell<Vec<View<N>>>> = Rc::new(RefCell::new(Vec::new()));
    let mut result = None;
    create_child_scope(|| {
        let children = children.clone();
        let mut append = move |view: View<N>| children.borrow_mut().push(view);
        result = Some(parser(&mut append));
    });
    expose(result.unwrap());

    let mut children = children.borrow_mut();
    View::new_fragment(std::mem::take(&mut *children))
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn collects_every_appended_child_in_call_order() {
        let _ = create_root(|| {
            let exposed = Rc::new(RefCell::new(None));
            let exposed_clone = exposed.clone();

            let view = parse_view::<TestNode, usize>(
                |append| {
                    append(View::new_node(TestNode::create_node(ElementTag::Html("a"))));
                    append(View::new_node(TestNode::create_node(ElementTag::Html("b"))));
                    append(View::new_node(TestNode::create_node(ElementTag::Html("c"))));
                    3
                },
                move |count| *exposed_clone.borrow_mut() = Some(count),
            );

            let flat = view.flatten();
            assert_eq!(flat.len(), 3);
            assert_eq!(flat[0].tag(), Some("a"));
            assert_eq!(flat[2].tag(), Some("c"));
            assert_eq!(*exposed.borrow(), Some(3));
        });
    }

    #[test]
    fn parser_that_never_appends_yields_an_empty_fragment() {
        let _ = create_root(|| {
            let view = parse_view::<TestNode, ()>(|_append| {}, |_| {});
            assert!(view.flatten().is_empty());
        });
    }
}
