//! `Async` — a deferred subtree bound to a future's resolution (spec §4.7).

use std::rc::Rc;

use loom_reactive::signal::create_signal;

use crate::node_ops::NodeOps;
use crate::spawn::spawn_local_scoped;
use crate::view::View;

use super::suspense::{suspense_dec, suspense_inc};

#[derive(Clone)]
enum AsyncState<T, E> {
    Pending,
    Ready(Rc<T>),
    Failed(Rc<E>),
}

/// Mounts `fallback` immediately, then awaits `future`: on success swaps to `resolved(value)`, on
/// failure swaps to `catch(error)` (or panics past the caller if no `catch` is given, mirroring
/// `Fn`'s uncaught-error behavior).
///
/// Cancellation (spec §4.7, testable property 7): `future` runs on [`spawn_local_scoped`], which
/// aborts it the moment the enclosing scope is disposed — if that happens before resolution, the
/// `state` signal this closure would have written to no longer exists, so the write is simply
/// never attempted; no mount or write happens afterward.
///
/// Participates in the nearest enclosing [`crate::control_flow::suspense::suspense_view`]: the
/// ambient pending counter (if any is in scope) is incremented for as long as this `Async` is
/// pending and decremented exactly once when it settles.
pub fn async_view<N, T, E>(
    future: impl std::future::Future<Output = Result<T, E>> + 'static,
    fallback: impl Fn() -> View<N> + 'static,
    catch: Option<impl Fn(&E) -> View<N> + 'static>,
    resolved: impl Fn(&T) -> View<N> + 'static,
) -> View<N>
where
    N: NodeOps,
    T: 'static,
    E: 'static,
{
    let state = create_signal(AsyncState::<T, E>::Pending);

    let counter = suspense_inc();
    spawn_local_scoped(async move {
        let outcome = future.await;
        suspense_dec(counter);
        match outcome {
            Ok(value) => state.set(AsyncState::Ready(Rc::new(value))),
            Err(error) => state.set(AsyncState::Failed(Rc::new(error))),
        }
    });

    View::new_dyn_scoped(move || match state.get_clone() {
        AsyncState::Pending => fallback(),
        AsyncState::Ready(value) => resolved(&value),
        AsyncState::Failed(error) => match &catch {
            Some(catch) => catch(&error),
            None => panic!("Async future rejected with no `catch` handler installed"),
        },
    })
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;
    use crate::node_ops::ElementTag;
    use crate::test_support::TestNode;

    #[test]
    fn renders_fallback_then_resolved_value() {
        let _ = create_root(|| {
            use futures::task::LocalSpawnExt;
            let mut pool = futures::executor::LocalPool::new();
            let spawner = pool.spawner();
            crate::spawn::set_spawner(move |f| spawner.spawn_local(f).unwrap());

            let (tx, rx) = futures::channel::oneshot::channel::<Result<i32, ()>>();
            let view = async_view::<TestNode, i32, ()>(
                async move { rx.await.unwrap() },
                || View::new_node(TestNode::create_node(ElementTag::Html("span"))),
                None::<fn(&())>,
                |v| View::text(v.to_string()),
            );
            assert_eq!(view.clone().flatten()[0].tag(), Some("span"));

            tx.send(Ok(42)).unwrap();
            pool.run_until_stalled();
            assert_eq!(view.flatten()[0].text_content().as_deref(), Some("42"));
        });
    }

    #[test]
    fn cancellation_drops_resolution_silently() {
        let _ = create_root(|| {
            use futures::task::LocalSpawnExt;
            let mut pool = futures::executor::LocalPool::new();
            let spawner = pool.spawner();
            crate::spawn::set_spawner(move |f| spawner.spawn_local(f).unwrap());

            let (tx, rx) = futures::channel::oneshot::channel::<Result<i32, ()>>();
            let scope = loom_reactive::scope::create_child_scope(|| {
                let _view = async_view::<TestNode, i32, ()>(
                    async move { rx.await.unwrap() },
                    || View::new_node(TestNode::create_node(ElementTag::Html("span"))),
                    None::<fn(&())>,
                    |v| View::text(v.to_string()),
                );
            });
            scope.dispose();
            let _ = tx.send(Ok(42));
            // Draining the pool must not panic even though the future's `on_cleanup` abort
            // handle fired before it ever polled to completion.
            pool.run_until_stalled();
        });
    }
}
