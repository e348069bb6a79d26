//! `Lazy` — a component template whose definition is itself loaded asynchronously (spec §4.7).

use crate::control_flow::async_::async_view;
use crate::node_ops::NodeOps;
use crate::view::View;

/// On first instantiation, awaits `loader` and renders whatever it produces by calling it with
/// `render`. Behaves exactly like [`async_view`] underneath — a `Lazy` component *is* an `Async`
/// boundary whose resolved value is a component rather than plain data, matching spec §4.7's
/// "transparently behaves as Async".
pub fn lazy_view<N, C, E>(
    loader: impl std::future::Future<Output = Result<C, E>> + 'static,
    fallback: impl Fn() -> View<N> + 'static,
    catch: Option<impl Fn(&E) -> View<N> + 'static>,
    render: impl Fn(&C) -> View<N> + 'static,
) -> View<N>
where
    N: NodeOps,
    C: 'static,
    E: 'static,
{
    async_view(loader, fallback, catch, render)
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn renders_fallback_then_loaded_component() {
        let _ = create_root(|| {
            use futures::task::LocalSpawnExt;
            let mut pool = futures::executor::LocalPool::new();
            let spawner = pool.spawner();
            crate::spawn::set_spawner(move |f| spawner.spawn_local(f).unwrap());

            let (tx, rx) = futures::channel::oneshot::channel::<Result<&'static str, ()>>();
            let view = lazy_view::<TestNode, &'static str, ()>(
                async move { rx.await.unwrap() },
                || View::new_node(TestNode::create_node(ElementTag::Html("span"))),
                None::<fn(&())>,
                |tag| View::new_node(TestNode::create_node(ElementTag::Html(tag))),
            );
            assert_eq!(view.clone().flatten()[0].tag(), Some("span"));
            tx.send(Ok("h1")).unwrap();
            pool.run_until_stalled();
            assert_eq!(view.flatten()[0].tag(), Some("h1"));
        });
    }
}
