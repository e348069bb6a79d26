//! `Cache`/`Cached` — a pool of component instances reused across insertion/removal instead of
//! torn down and rebuilt (spec §4.8). Grounded on the same row-lifecycle code `For` uses
//! ([`super::for_`]), generalised so the keyed collection is driven imperatively (`add`/`replace`/
//! `del`/`clear`) rather than by diffing a whole `entries` signal each tick.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use loom_reactive::scope::{create_child_scope, ReactiveScope};
use loom_reactive::signal::{create_signal, Signal};

use crate::node_ops::NodeOps;
use crate::view::View;

struct Slot<D, N: NodeOps> {
    data: Signal<D>,
    view: View<N>,
    scope: ReactiveScope,
}

struct CacheInner<K, D, N: NodeOps> {
    order: Vec<K>,
    live: HashMap<K, Slot<D, N>>,
    /// Instances removed by `del`/`clear`: kept alive (not disposed) so `add` can reassign their
    /// data signal instead of re-running `template`, per spec §4.8 "reassigns props without
    /// re-setup".
    reuse_pool: Vec<Slot<D, N>>,
    template: Rc<dyn Fn(Signal<D>) -> View<N>>,
}

impl<K: Eq + Hash + Clone, D, N: NodeOps> CacheInner<K, D, N> {
    fn take_or_create(&mut self, data: D) -> Slot<D, N> {
        match self.reuse_pool.pop() {
            Some(slot) => {
                slot.data.set(data);
                slot
            }
            None => {
                let template = self.template.clone();
                let mut created = None;
                let scope = create_child_scope(|| {
                    let data_signal = create_signal(data);
                    let view = template(data_signal);
                    created = Some((data_signal, view));
                });
                let (data_signal, view) = created.unwrap();
                Slot {
                    data: data_signal,
                    view,
                    scope,
                }
            }
        }
    }
}

/// The imperative handle `createCache` publishes: `add`/`replace`/`del`/`clear` plus, via
/// [`CacheHandle::downgrade`], the "weak item→node map for caller-side lookup" spec §4.8
/// describes as `Cached`'s own export.
pub struct CacheHandle<K, D, N: NodeOps> {
    inner: Rc<RefCell<CacheInner<K, D, N>>>,
}

impl<K, D, N: NodeOps> Clone for CacheHandle<K, D, N> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

/// A non-owning reference to a [`CacheHandle`]'s item→node map, for callers that want to look a
/// node up without keeping the whole cache alive.
pub struct WeakCacheHandle<K, D, N: NodeOps> {
    inner: Weak<RefCell<CacheInner<K, D, N>>>,
}

impl<K, D, N: NodeOps> Clone for WeakCacheHandle<K, D, N> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<K: Eq + Hash + Clone, D, N: NodeOps> WeakCacheHandle<K, D, N> {
    pub fn upgrade(&self) -> Option<CacheHandle<K, D, N>> {
        self.inner.upgrade().map(|inner| CacheHandle { inner })
    }
}

impl<K: Eq + Hash + Clone + 'static, D: 'static, N: NodeOps> CacheHandle<K, D, N> {
    /// Inserts `data` under `key`, appending it to the live order. Reuses a pooled instance from
    /// an earlier `del`/`clear` if one is available, otherwise runs `template` fresh. Replaces any
    /// existing live entry under the same key (equivalent to `del` then `add`).
    pub fn add(&self, key: K, data: D) {
        let mut inner = self.inner.borrow_mut();
        if let Some(old) = inner.live.remove(&key) {
            inner.reuse_pool.push(old);
            inner.order.retain(|k| k != &key);
        }
        let slot = inner.take_or_create(data);
        inner.live.insert(key.clone(), slot);
        inner.order.push(key);
    }

    /// Updates the data of an already-live entry in place, without re-running `template` — a
    /// no-op if `key` is not currently live.
    pub fn replace(&self, key: &K, data: D) {
        let inner = self.inner.borrow();
        if let Some(slot) = inner.live.get(key) {
            slot.data.set(data);
        }
    }

    /// Removes `key` from the live list and returns its instance to the reuse pool; the instance
    /// is not disposed, only hidden, so its scope (and anything it holds) stays alive until reused
    /// or the whole cache is dropped.
    pub fn del(&self, key: &K) {
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.live.remove(key) {
            inner.reuse_pool.push(slot);
        }
        inner.order.retain(|k| k != key);
    }

    /// Moves every live entry into the reuse pool.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        let keys: Vec<K> = inner.order.drain(..).collect();
        for key in keys {
            if let Some(slot) = inner.live.remove(&key) {
                inner.reuse_pool.push(slot);
            }
        }
    }

    /// Looks up the currently-rendered view for a live key.
    pub fn node_for(&self, key: &K) -> Option<View<N>> {
        self.inner.borrow().live.get(key).map(|slot| slot.view.clone())
    }

    pub fn downgrade(&self) -> WeakCacheHandle<K, D, N> {
        WeakCacheHandle { inner: Rc::downgrade(&self.inner) }
    }

    fn render(&self) -> View<N> {
        let inner = self.inner.borrow();
        let views = inner
            .order
            .iter()
            .map(|key| inner.live.get(key).unwrap().view.clone())
            .collect();
        View::new_fragment(views)
    }
}

/// `createCache(template)`: returns the rendered [`View`] (a fragment that tracks live-list order)
/// and the [`CacheHandle`] used to mutate it. Unlike `For`, nothing here is itself reactive — the
/// caller drives `add`/`replace`/`del`/`clear` imperatively and is expected to wrap the returned
/// view in a [`super::fn_::fn_view`] (or similar) if it wants the fragment to re-render on
/// mutation; `Cache` only owns instance lifecycle, not a dependency on "the live list changed".
pub fn create_cache<K, D, N>(template: impl Fn(Signal<D>) -> View<N> + 'static) -> (View<N>, CacheHandle<K, D, N>)
where
    K: Eq + Hash + Clone + 'static,
    D: 'static,
    N: NodeOps,
{
    let handle = CacheHandle {
        inner: Rc::new(RefCell::new(CacheInner {
            order: Vec::new(),
            live: HashMap::new(),
            reuse_pool: Vec::new(),
            template: Rc::new(template),
        })),
    };
    (handle.render(), handle)
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[test]
    fn reuses_pooled_instance_instead_of_rerunning_template() {
        let _ = create_root(|| {
            let setup_runs = Rc::new(RefCell::new(0));
            let runs = setup_runs.clone();
            let (_, cache) = create_cache::<u32, &'static str, TestNode>(move |data| {
                *runs.borrow_mut() += 1;
                let node = TestNode::create_node(ElementTag::Html("li"));
                let _ = data;
                View::new_node(node)
            });

            cache.add(1, "a");
            cache.add(2, "b");
            assert_eq!(*setup_runs.borrow(), 2);

            cache.del(&1);
            cache.add(3, "c");
            // The third insertion reuses the pooled slot from key 1 rather than re-running setup.
            assert_eq!(*setup_runs.borrow(), 2);

            assert!(cache.node_for(&1).is_none());
            assert!(cache.node_for(&3).is_some());
        });
    }

    #[test]
    fn replace_reassigns_data_without_resetup() {
        let _ = create_root(|| {
            let setup_runs = Rc::new(RefCell::new(0));
            let runs = setup_runs.clone();
            let (_, cache) = create_cache::<u32, i32, TestNode>(move |_data| {
                *runs.borrow_mut() += 1;
                View::new_node(TestNode::create_node(ElementTag::Html("li")))
            });

            cache.add(1, 10);
            cache.replace(&1, 20);
            assert_eq!(*setup_runs.borrow(), 1);
        });
    }

    #[test]
    fn weak_handle_upgrades_while_cache_is_alive_and_fails_after_drop() {
        let _ = create_root(|| {
            let (_, cache) = create_cache::<u32, (), TestNode>(|_| View::empty());
            let weak = cache.downgrade();
            assert!(weak.upgrade().is_some());
            drop(cache);
            assert!(weak.upgrade().is_none());
        });
    }
}
