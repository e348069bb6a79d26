//! `Fn` — dynamic subtree with an error boundary (spec §4.5).

use std::panic::{catch_unwind, AssertUnwindSafe};

use loom_reactive::error::LoomError;
use loom_reactive::MaybeSignal;

use crate::node_ops::NodeOps;
use crate::view::View;

/// Re-derives its subtree from `handler(ctx)` every time a signal `ctx` or `handler` reads
/// changes.
///
/// Open Question (spec §9) resolved here: the spec notes `Fn`'s identity-stable-return-avoids-
/// remount behavior is "treated here as remount; source appears to agree but is not asserted".
/// Rust closures have no JS-style reference identity to compare, so this implementation always
/// remounts on re-run — a fresh disposal scope every time, exactly like [`crate::control_flow::if_view`].
/// See `DESIGN.md` for the recorded decision.
///
/// If `handler` (or anything it sets up) panics, the panic is caught, the partially-built scope
/// is torn down, and `catch` (if given) renders a fallback subtree in its place instead of
/// unwinding past the scheduler.
pub fn fn_view<N: NodeOps, C: Clone + 'static>(
    ctx: impl Into<MaybeSignal<C>>,
    mut handler: impl FnMut(C) -> View<N> + 'static,
    catch: Option<impl Fn(&LoomError) -> View<N> + 'static>,
) -> View<N> {
    let ctx = ctx.into();
    View::new_dyn_scoped(move || {
        let ctx_value = ctx.read();
        match catch_unwind(AssertUnwindSafe(|| handler(ctx_value))) {
            Ok(view) => view,
            Err(payload) => {
                let err = LoomError::from_panic_payload(&*payload);
                tracing::error!(error = %err, "Fn handler panicked");
                match &catch {
                    Some(catch) => catch(&err),
                    None => std::panic::resume_unwind(payload),
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;
    use loom_reactive::signal::create_signal;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn reruns_on_dependency_change() {
        let _ = create_root(|| {
            let count = create_signal(0);
            let view = fn_view::<TestNode, ()>(
                (),
                move |_| {
                    let n = count.get();
                    View::text(n.to_string())
                },
                None::<fn(&LoomError) -> View<TestNode>>,
            );
            assert_eq!(view.clone().flatten()[0].text_content().as_deref(), Some("0"));
            count.set(5);
            assert_eq!(view.flatten()[0].text_content().as_deref(), Some("5"));
        });
    }

    #[test]
    fn catches_panics_and_renders_fallback() {
        let _ = create_root(|| {
            let view = fn_view::<TestNode, ()>(
                (),
                |_| -> View<TestNode> { panic!("boom") },
                Some(|_err: &LoomError| View::new_node(TestNode::create_node(ElementTag::Html("div")))),
            );
            assert_eq!(view.flatten()[0].tag(), Some("div"));
        });
    }
}
