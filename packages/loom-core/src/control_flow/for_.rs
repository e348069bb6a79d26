//! `For` — keyed list reconciliation (spec §4.6, testable property §8.6).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use loom_reactive::effect::create_effect;
use loom_reactive::scope::{create_child_scope, ReactiveScope};
use loom_reactive::signal::{create_signal, Signal};
use loom_reactive::MaybeSignal;

use crate::node_ops::NodeOps;
use crate::view::View;

/// How a row's key is derived from its data. The spec's `track=null` default (the entry's own
/// `Eq`/`Hash` impl, or the value itself for primitives) is [`for_view_by_identity`], which builds
/// this from a cloning identity function rather than exposing a separate variant here — there is
/// no sensible `K` to derive a key as other than `By` once `track` names a concrete key type.
pub enum Track<T, K> {
    By(Rc<dyn Fn(&T) -> K>),
}

struct Row<T, N: NodeOps> {
    data: Signal<T>,
    index: Option<Signal<usize>>,
    view: View<N>,
    scope: ReactiveScope,
}

/// The exposed imperative API `For` publishes via [`crate::component::expose`]: `getItem`,
/// `remove` (only meaningful when keys are derived, not identity), and `clear`.
pub struct ForHandle<T, K, N: NodeOps> {
    rows: Rc<RefCell<IndexedRows<T, K, N>>>,
}

struct IndexedRows<T, K, N: NodeOps> {
    order: Vec<K>,
    by_key: HashMap<K, Row<T, N>>,
    /// Rows created for duplicate keys in the most recent pass (spec §4.6: "subsequent
    /// duplicates create new rows"). Not addressable via `ForHandle` (duplicates have no unique
    /// key to address them by) and not diffed across passes — each pass disposes the previous
    /// pass's `extra` rows outright and creates fresh ones for whatever duplicates persist.
    extra: Vec<Row<T, N>>,
}

impl<T: 'static, K: Eq + Hash + Clone + 'static, N: NodeOps> ForHandle<T, K, N> {
    pub fn get_item(&self, key: &K) -> Option<T>
    where
        T: Clone,
    {
        self.rows.borrow().by_key.get(key).map(|row| row.data.peek_clone())
    }

    pub fn remove(&self, key: &K) {
        if let Some(row) = self.rows.borrow_mut().by_key.remove(key) {
            row.scope.dispose();
        }
        self.rows.borrow_mut().order.retain(|k| k != key);
    }

    pub fn clear(&self) {
        let mut rows = self.rows.borrow_mut();
        for (_, row) in rows.by_key.drain() {
            row.scope.dispose();
        }
        for row in rows.extra.drain(..) {
            row.scope.dispose();
        }
        rows.order.clear();
    }
}

/// Renders one [`View`] per entry in `entries`, keyed by `track`, reconciling in place on change
/// per the spec's four-step protocol: build `oldKeyToIndex`, drop rows whose keys disappeared,
/// walk the new sequence reusing/moving/creating rows, then push fresh `data`/`index` into
/// reused rows' signals.
///
/// Duplicate keys in a new sequence: first occurrence claims the existing row; later duplicates
/// get a fresh row and a `tracing::warn!` (spec §4.6, §7 "reconciler invariant violation"). These
/// extra rows render but are not addressable via [`ForHandle`] (there is no unique key left to
/// address them by) and are not diffed across passes — each pass tears down the previous pass's
/// extras and creates fresh ones for whatever duplicates persist.
///
/// Row identity is a `ReactiveScope` + a per-row data [`Signal`] (so template code reading
/// `item.get()` updates in place rather than being torn down) plus, when `indexed` is set, an
/// index [`Signal`] updated whenever the row's position changes. The surrounding `View<N>` fragment
/// itself is patched via [`crate::reconcile::reconcile_fragments`] at the node level, reusing the
/// identical two-pointer algorithm the spec names for this purpose.
pub fn for_view<T, K, N>(
    entries: impl Into<MaybeSignal<Vec<T>>>,
    track: Track<T, K>,
    indexed: bool,
    template: impl Fn(Signal<T>, Option<Signal<usize>>) -> View<N> + 'static,
) -> (View<N>, ForHandle<T, K, N>)
where
    T: Clone + 'static,
    K: Eq + Hash + Clone + 'static,
    N: NodeOps,
{
    let entries = entries.into();
    let rows = Rc::new(RefCell::new(IndexedRows::<T, K, N> {
        order: Vec::new(),
        by_key: HashMap::new(),
        extra: Vec::new(),
    }));
    let handle = ForHandle { rows: rows.clone() };

    let view = View::new_dyn({
        let rows = rows.clone();
        move || {
            let new_entries = entries.read();
            let mut new_keys = Vec::with_capacity(new_entries.len());
            let key_of: Box<dyn Fn(&T) -> K> = match &track {
                Track::By(f) => {
                    let f = f.clone();
                    Box::new(move |data: &T| f(data))
                }
            };
            for entry in &new_entries {
                new_keys.push(key_of(entry));
            }

            let mut rows_mut = rows.borrow_mut();

            // Last pass's duplicate-key rows are never reused across passes (they have no key
            // of their own to reconcile by) — dispose them before building this pass's rows.
            for row in rows_mut.extra.drain(..) {
                row.scope.dispose();
            }

            // Step 1+2: drop rows whose key no longer appears.
            let new_key_set: std::collections::HashSet<&K> = new_keys.iter().collect();
            let stale: Vec<K> = rows_mut
                .order
                .iter()
                .filter(|k| !new_key_set.contains(k))
                .cloned()
                .collect();
            for key in stale {
                if let Some(row) = rows_mut.by_key.remove(&key) {
                    row.scope.dispose();
                }
            }

            // Step 3+4: walk the new sequence, reusing, creating, and repositioning rows.
            let mut seen_this_pass: std::collections::HashSet<K> = std::collections::HashSet::new();
            let mut new_order = Vec::with_capacity(new_keys.len());
            let mut new_views = Vec::with_capacity(new_keys.len());

            let make_row = |data: T, position: usize| -> Row<T, N> {
                let mut new_row = None;
                let scope = create_child_scope(|| {
                    let data_signal = create_signal(data);
                    let index_signal = if indexed { Some(create_signal(position)) } else { None };
                    let view = template(data_signal, index_signal);
                    new_row = Some((data_signal, index_signal, view));
                });
                let (data, index, view) = new_row.unwrap();
                Row { data, index, view, scope }
            };

            for (position, (key, data)) in new_keys.into_iter().zip(new_entries.into_iter()).enumerate() {
                if !seen_this_pass.insert(key.clone()) {
                    tracing::warn!("duplicate key in For; creating a fresh row for the duplicate");
                    let row = make_row(data, position);
                    new_views.push(row.view.clone());
                    rows_mut.extra.push(row);
                    continue;
                }

                if let Some(existing) = rows_mut.by_key.get(&key) {
                    existing.data.set(data);
                    if let Some(index_signal) = existing.index {
                        index_signal.set(position);
                    }
                    new_views.push(existing.view.clone());
                } else {
                    let row = make_row(data, position);
                    new_views.push(row.view.clone());
                    rows_mut.by_key.insert(key.clone(), row);
                }
                new_order.push(key);
            }

            rows_mut.order = new_order;
            drop(rows_mut);

            View::new_fragment(new_views)
        }
    });

    (view, handle)
}

/// `For` specialised so `K = T`: the spec's `track=null` default, where primitive/`Eq`-able
/// entries are their own keys.
pub fn for_view_by_identity<T, N>(
    entries: impl Into<MaybeSignal<Vec<T>>>,
    indexed: bool,
    template: impl Fn(Signal<T>, Option<Signal<usize>>) -> View<N> + 'static,
) -> (View<N>, ForHandle<T, T, N>)
where
    T: Clone + Eq + Hash + 'static,
    N: NodeOps,
{
    for_view(entries, Track::By(Rc::new(|t: &T| t.clone())), indexed, template)
}

/// `UnKeyed` (spec §4.8): like `For`, but each *position* (not each entry's derived key) owns a
/// signal updated in place when `entries` changes — reorders cause per-position re-renders
/// instead of node moves, trading reconciliation quality for not needing any key function at all.
pub fn unkeyed_view<T, N>(
    entries: impl Into<MaybeSignal<Vec<T>>>,
    template: impl Fn(Signal<T>) -> View<N> + 'static,
) -> View<N>
where
    T: Clone + 'static,
    N: NodeOps,
{
    let entries = entries.into();
    let rows: Rc<RefCell<Vec<(Signal<T>, View<N>, ReactiveScope)>>> = Rc::new(RefCell::new(Vec::new()));

    View::new_dyn(move || {
        let new_entries = entries.read();
        let mut rows_mut = rows.borrow_mut();

        while rows_mut.len() > new_entries.len() {
            let (_, _, scope) = rows_mut.pop().unwrap();
            scope.dispose();
        }

        for (i, data) in new_entries.into_iter().enumerate() {
            if let Some((signal, _, _)) = rows_mut.get(i) {
                signal.set(data);
            } else {
                let mut created = None;
                let scope = create_child_scope(|| {
                    let signal = create_signal(data);
                    let view = template(signal);
                    created = Some((signal, view));
                });
                let (signal, view) = created.unwrap();
                rows_mut.push((signal, view, scope));
            }
        }

        View::new_fragment(rows_mut.iter().map(|(_, view, _)| view.clone()).collect())
    })
}

/// Forces `entries` to be re-read even when the underlying value is reference-equal, matching
/// spec §4.6's "`entries` is re-read on `trigger` even when reference-equal".
pub fn refresh_entries<T>(entries: Signal<Vec<T>>) {
    entries.trigger();
}

#[allow(unused)]
fn assert_any<T: Any>() {}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use loom_reactive::scope::{create_root, on_cleanup};
    use loom_reactive::signal::create_signal;

    use super::*;
    use crate::node_ops::{ElementTag, NodeOps};
    use crate::test_support::TestNode;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    struct Item(u32);

    fn row_template(disposed: Rc<RefCell<u32>>) -> impl Fn(Signal<Item>, Option<Signal<usize>>) -> View<TestNode> {
        move |_data, _index| {
            let disposed = disposed.clone();
            on_cleanup(move || *disposed.borrow_mut() += 1);
            View::new_node(TestNode::create_node(ElementTag::Html("li")))
        }
    }

    #[test]
    fn reorders_without_recreating_rows() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(0));
            let entries = create_signal(vec![Item(1), Item(2), Item(3)]);
            let (view, _handle) = for_view(
                entries,
                Track::By(Rc::new(|i: &Item| i.0)),
                false,
                row_template(disposed.clone()),
            );

            let before = view.clone().flatten();
            assert_eq!(before.len(), 3);

            entries.set(vec![Item(3), Item(1), Item(2)]);

            let after = view.clone().flatten();
            assert_eq!(after.len(), 3);
            // Same three node identities, reordered — not torn down and recreated.
            assert_eq!(after[0], before[2]);
            assert_eq!(after[1], before[0]);
            assert_eq!(after[2], before[1]);
            assert_eq!(*disposed.borrow(), 0);
        });
    }

    #[test]
    fn dropped_keys_dispose_their_row_scope() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(0));
            let entries = create_signal(vec![Item(1), Item(2), Item(3)]);
            let (_view, _handle) = for_view(
                entries,
                Track::By(Rc::new(|i: &Item| i.0)),
                false,
                row_template(disposed.clone()),
            );

            entries.set(vec![Item(1), Item(3)]);
            assert_eq!(*disposed.borrow(), 1);

            entries.set(vec![]);
            assert_eq!(*disposed.borrow(), 3);
        });
    }

    #[test]
    fn duplicate_keys_get_a_fresh_row_instead_of_being_dropped() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(0));
            let entries = create_signal(vec![Item(1), Item(1)]);
            let (view, handle) = for_view(
                entries,
                Track::By(Rc::new(|i: &Item| i.0)),
                false,
                row_template(disposed.clone()),
            );

            // Both entries render — the duplicate is not silently swallowed — but only the first
            // occurrence is addressable by key.
            assert_eq!(view.clone().flatten().len(), 2);
            assert!(handle.get_item(&1).is_some());

            // Re-running the pass with the duplicate gone disposes its ephemeral row.
            entries.set(vec![Item(1)]);
            assert_eq!(view.flatten().len(), 1);
            assert_eq!(*disposed.borrow(), 1);
        });
    }

    #[test]
    fn handle_supports_get_item_remove_and_clear() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(0));
            let entries = create_signal(vec![Item(1), Item(2)]);
            let (_view, handle) = for_view(
                entries,
                Track::By(Rc::new(|i: &Item| i.0)),
                false,
                row_template(disposed.clone()),
            );

            assert_eq!(handle.get_item(&1), Some(Item(1)));
            handle.remove(&1);
            assert_eq!(handle.get_item(&1), None);
            assert_eq!(*disposed.borrow(), 1);

            handle.clear();
            assert_eq!(*disposed.borrow(), 2);
        });
    }

    #[test]
    fn by_identity_keys_primitives_by_value() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(0));
            let entries = create_signal(vec![1u32, 2, 3]);
            let (view, _handle) = for_view_by_identity(entries, false, move |data: Signal<u32>, _index| {
                let disposed = disposed.clone();
                on_cleanup(move || *disposed.borrow_mut() += 1);
                View::new_node(TestNode::create_node(ElementTag::Html("span")))
            });

            let before = view.clone().flatten();
            entries.set(vec![3, 2, 1]);
            let after = view.flatten();
            assert_eq!(after.len(), 3);
            assert_eq!(after[0], before[2]);
            assert_eq!(after[2], before[0]);
        });
    }
}
