//! `If` — reactive branch (spec §4.4).

use loom_reactive::MaybeSignal;

use crate::node_ops::NodeOps;
use crate::view::View;

/// Renders `true_branch` while `condition` is truthy, else `false_branch` (if given; otherwise
/// nothing is rendered). Swapping always disposes the previously-mounted branch's scope and
/// mounts the other branch fresh — no identity-stable remount is attempted, matching spec §4.4
/// exactly ("swapping branches always disposes").
///
/// Grounded on [`View::new_dyn_scoped`], itself generalized from the teacher's
/// `View::new_dyn`/child-scope-per-run pattern in `sycamore-core::view`.
pub fn if_view<N: NodeOps>(
    condition: impl Into<MaybeSignal<bool>>,
    true_branch: impl Fn() -> View<N> + 'static,
    false_branch: Option<impl Fn() -> View<N> + 'static>,
) -> View<N> {
    let condition = condition.into();
    View::new_dyn_scoped(move || {
        if condition.read() {
            true_branch()
        } else if let Some(false_branch) = &false_branch {
            false_branch()
        } else {
            View::empty()
        }
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use loom_reactive::scope::create_root;
    use loom_reactive::signal::create_signal;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn swaps_branch_and_disposes_previous_scope() {
        let _ = create_root(|| {
            let cond = create_signal(true);
            let disposed = Rc::new(RefCell::new(0));
            let disposed_in_branch = disposed.clone();

            let view = if_view::<TestNode>(
                cond,
                move || {
                    let disposed = disposed_in_branch.clone();
                    loom_reactive::scope::on_cleanup(move || *disposed.borrow_mut() += 1);
                    View::new_node(TestNode::create_node(ElementTag::Html("span")))
                },
                Some(|| View::new_node(TestNode::create_node(ElementTag::Html("div")))),
            );
            assert!(view.clone().flatten()[0].tag() == Some("span"));
            assert_eq!(*disposed.borrow(), 0);

            cond.set(false);
            assert_eq!(*disposed.borrow(), 1);
            assert!(view.flatten()[0].tag() == Some("div"));
        });
    }
}
