//! `Suspense` — a shared fallback for a group of pending [`super::async_::async_view`]
//! descendants (spec §4.7).

use loom_reactive::scope::{provide_context, try_use_context};
use loom_reactive::signal::{create_signal, Signal};

use crate::node_ops::NodeOps;
use crate::view::View;

/// The ambient "how many `Async` descendants are still pending" counter, provided by
/// [`suspense_view`] and consulted by every [`super::async_::async_view`] instantiated under it.
/// Plain context, not a special mechanism — a `Suspense` boundary is just a component that
/// provides this before rendering its children.
#[derive(Clone, Copy)]
pub(crate) struct SuspenseCounter(Signal<i32>);

/// Called by [`super::async_::async_view`] when it starts a new pending future. Returns the
/// enclosing counter (if any) so the caller can capture it and decrement the very same one later
/// — `try_use_context` only resolves while the providing scope is on the stack, which is no
/// longer true once a spawned future gets polled to completion, so looking the context up again
/// at that point would silently find nothing.
pub(crate) fn suspense_inc() -> Option<SuspenseCounter> {
    let counter = try_use_context::<SuspenseCounter>();
    if let Some(counter) = counter {
        counter.0.update(|n| *n += 1);
    }
    counter
}

/// Decrements the counter captured by [`suspense_inc`] at setup time. A no-op if `counter` is
/// `None`, i.e. there was no enclosing `Suspense` when the future started.
pub(crate) fn suspense_dec(counter: Option<SuspenseCounter>) {
    if let Some(counter) = counter {
        counter.0.update(|n| *n -= 1);
    }
}

/// Renders `children` once instantiated, but displays `fallback` instead for as long as any
/// `Async` descendant instantiated while `children` runs is still pending. `children` itself is
/// always instantiated eagerly (unlike `If`'s branches) — `Suspense` only swaps what is
/// *displayed*, it does not defer setup.
pub fn suspense_view<N: NodeOps>(
    fallback: impl Fn() -> View<N> + 'static,
    children: impl FnOnce() -> View<N>,
) -> View<N> {
    let counter = create_signal(0);
    provide_context(SuspenseCounter(counter));
    let content = children();

    View::new_dyn(move || {
        if counter.get() > 0 {
            fallback()
        } else {
            content.clone()
        }
    })
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;
    use crate::control_flow::async_::async_view;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn shows_fallback_while_any_descendant_is_pending() {
        let _ = create_root(|| {
            use futures::task::LocalSpawnExt;
            let mut pool = futures::executor::LocalPool::new();
            let spawner = pool.spawner();
            crate::spawn::set_spawner(move |f| spawner.spawn_local(f).unwrap());

            let (tx, rx) = futures::channel::oneshot::channel::<Result<(), ()>>();
            let view = suspense_view::<TestNode>(
                || View::new_node(TestNode::create_node(ElementTag::Html("progress"))),
                || {
                    async_view::<TestNode, (), ()>(
                        async move { rx.await.unwrap() },
                        View::empty,
                        None::<fn(&())>,
                        |_| View::new_node(TestNode::create_node(ElementTag::Html("span"))),
                    )
                },
            );
            assert_eq!(view.clone().flatten()[0].tag(), Some("progress"));
            tx.send(Ok(())).unwrap();
            pool.run_until_stalled();
            assert_eq!(view.flatten()[0].tag(), Some("span"));
        });
    }
}
