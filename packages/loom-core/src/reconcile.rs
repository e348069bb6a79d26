//! Inserting and reconciling [`View`] trees against a live [`NodeOps`] tree.
//!
//! Grounded on the teacher's `sycamore_core::render` module (`insert`/`reconcile_fragments`/
//! `normalize_incoming_fragment`/`clean_children`), generalized from `GenericNode` to `NodeOps`
//! and from `sycamore_reactive`'s split signal to the consolidated [`loom_reactive::Signal`]. The
//! two-pointer-plus-map `reconcile_fragments` algorithm (spec §4.6's `For` reconciliation
//! protocol) is reused verbatim at both the fragment-patching level here and, row-wise, by
//! [`crate::control_flow::for_`].

use std::collections::HashMap;
use std::rc::Rc;

use loom_reactive::effect::create_effect;

use crate::node_ops::NodeOps;
use crate::view::{View, ViewType};

/// Inserts `accessor` under `parent` at `marker`, replacing `initial` if given.
///
/// * `marker` - `Some` inserts directly before it; `None` appends at the end of `parent`.
/// * `multi` - `false` enables the single-child fast path when clearing.
pub fn insert<N: NodeOps>(
    parent: &N,
    accessor: View<N>,
    initial: Option<View<N>>,
    marker: Option<&N>,
    multi: bool,
) {
    insert_expression(
        parent,
        &accessor,
        initial.map(View::flatten),
        marker,
        false,
        multi,
    );
}

fn insert_expression<N: NodeOps>(
    parent: &N,
    value: &View<N>,
    mut current: Option<Vec<N>>,
    marker: Option<&N>,
    unwrap_fragment: bool,
    multi: bool,
) {
    match &value.inner {
        ViewType::Node(node) => {
            if let Some(current) = current {
                clean_children(parent, current, marker, Some(node), multi);
            } else if marker.is_none() {
                parent.append_node(node);
            } else {
                parent.insert_before(node, marker);
            }
        }
        ViewType::Dyn(f) => {
            let parent = parent.clone();
            let marker = marker.cloned();
            let f = *f;
            create_effect(move || {
                let value = f.get_clone();
                insert_expression(
                    &parent,
                    &value,
                    current.clone(),
                    marker.as_ref(),
                    false,
                    multi,
                );
                current = Some(value.flatten());
            });
        }
        ViewType::Fragment(fragment) => {
            let mut v = Vec::new();
            // Subscribes to every dynamic view nested in `fragment` so the effect below re-runs
            // when any of them changes, even though the fragment itself is not a Signal.
            let dynamic = normalize_incoming_fragment(&mut v, fragment.as_ref(), unwrap_fragment);
            if dynamic {
                let parent = parent.clone();
                let marker = marker.cloned();
                create_effect(move || {
                    let value = View::new_fragment(v.clone());
                    insert_expression(
                        &parent,
                        &value,
                        current.clone(),
                        marker.as_ref(),
                        true,
                        false,
                    );
                    current = Some(value.flatten());
                });
            } else {
                let v = v
                    .into_iter()
                    .map(|x| match x.inner {
                        ViewType::Node(node) => node,
                        _ => unreachable!(),
                    })
                    .collect::<Vec<_>>();

                if v.is_empty() && current.is_some() && !multi {
                    clean_children(parent, Vec::new(), None, None, false);
                } else {
                    match current {
                        Some(mut current) => match &mut current[..] {
                            [node] => {
                                reconcile_fragments(parent, std::slice::from_mut(node), &v);
                            }
                            fragment => {
                                if fragment.is_empty() {
                                    append_nodes(parent, v, marker);
                                } else {
                                    reconcile_fragments(parent, fragment, &v);
                                }
                            }
                        },
                        None => append_nodes(parent, v, marker),
                    }
                }
            }
        }
    }
}

/// Removes `current` from `parent`, optionally leaving `replacement` in their place.
pub fn clean_children<N: NodeOps>(
    parent: &N,
    current: Vec<N>,
    _marker: Option<&N>,
    replacement: Option<&N>,
    multi: bool,
) {
    if !multi {
        parent.clear_children();
        if let Some(replacement) = replacement {
            parent.append_node(replacement);
        }
    } else {
        debug_assert!(!current.is_empty());
        for node in current {
            if node.parent_node().as_ref() == Some(parent) {
                if let Some(replacement) = replacement {
                    parent.replace_child(&node, replacement);
                } else {
                    parent.remove_node(&node);
                }
            } else if let Some(replacement) = replacement {
                parent.append_node(replacement);
            }
        }
    }
}

/// Appends every node in `fragment` to `parent`, immediately before `marker`.
pub fn append_nodes<N: NodeOps>(parent: &N, fragment: Vec<N>, marker: Option<&N>) {
    for node in fragment {
        parent.insert_before(&node, marker);
    }
}

/// Flattens `fragment` into `buf`, returning whether the result should be re-derived inside an
/// effect (i.e. it contains a [`ViewType::Dyn`] view).
pub fn normalize_incoming_fragment<N: NodeOps>(
    buf: &mut Vec<View<N>>,
    fragment: &[View<N>],
    unwrap: bool,
) -> bool {
    let mut dynamic = false;

    for view in fragment {
        match &view.inner {
            ViewType::Node(_) => buf.push(view.clone()),
            ViewType::Dyn(f) => {
                if unwrap {
                    let mut value = f.get_clone();
                    while let ViewType::Dyn(f) = &value.inner {
                        value = f.get_clone();
                    }
                    let fragment: Rc<[View<N>]> = match &value.inner {
                        ViewType::Node(_) => Rc::new([value]),
                        ViewType::Fragment(fragment) => Rc::from(fragment.to_vec()),
                        _ => unreachable!(),
                    };
                    dynamic = normalize_incoming_fragment(buf, &fragment, false) || dynamic;
                } else {
                    buf.push(view.clone());
                    dynamic = true;
                }
            }
            ViewType::Fragment(fragment) => {
                dynamic = normalize_incoming_fragment(buf, fragment, false) || dynamic;
            }
        }
    }

    dynamic
}

/// Reconciles `a` (the currently-attached nodes) into `b` (the desired nodes), minimizing moves.
///
/// This is the spec's `For` row-reconciliation algorithm (§4.6): common-prefix/common-suffix
/// trim, a backwards-swap special case, then a hashmap fallback that detects the longest
/// in-order run to avoid quadratic blowup on arbitrary permutations.
///
/// # Panics
/// Panics if `a` is empty — append nodes with [`append_nodes`] instead.
pub fn reconcile_fragments<N: NodeOps>(parent: &N, a: &mut [N], b: &[N]) {
    debug_assert!(!a.is_empty(), "a cannot be empty");

    #[cfg(debug_assertions)]
    {
        for (i, node) in a.iter().enumerate() {
            if node.parent_node().as_ref() != Some(parent) {
                panic!("node {i} in existing nodes Vec is not a child of parent. node = {node:#?}");
            }
        }
    }

    let b_len = b.len();
    let mut a_end = a.len();
    let mut b_end = b_len;
    let mut a_start = 0;
    let mut b_start = 0;
    let mut map = None::<HashMap<N, usize>>;

    let after = a[a_end - 1].next_sibling();

    while a_start < a_end || b_start < b_end {
        if a_end == a_start {
            let node = if b_end < b_len {
                if b_start != 0 {
                    b[b_start - 1].next_sibling()
                } else {
                    Some(b[b_end - b_start].clone())
                }
            } else {
                after.clone()
            };

            for new_node in &b[b_start..b_end] {
                parent.insert_before(new_node, node.as_ref());
            }
            b_start = b_end;
        } else if b_end == b_start {
            for node in &a[a_start..a_end] {
                if map.is_none() || !map.as_ref().unwrap().contains_key(node) {
                    parent.remove_node(node);
                }
            }
            a_start = a_end;
        } else if a[a_start] == b[b_start] {
            a_start += 1;
            b_start += 1;
        } else if a[a_end - 1] == b[b_end - 1] {
            a_end -= 1;
            b_end -= 1;
        } else if a[a_start] == b[b_end - 1] && b[b_start] == a[a_end - 1] {
            let node = a[a_end - 1].next_sibling();
            parent.insert_before(&b[b_start], a[a_start].next_sibling().as_ref());
            parent.insert_before(&b[b_end - 1], node.as_ref());
            a_start += 1;
            b_start += 1;
            a_end -= 1;
            b_end -= 1;
            a[a_end] = b[b_end].clone();
        } else {
            if map.is_none() {
                let tmp = b[b_start..b_end]
                    .iter()
                    .enumerate()
                    .map(|(i, g)| (g.clone(), i))
                    .collect();
                map = Some(tmp);
            }
            let map = map.as_ref().unwrap();

            if let Some(&index) = map.get(&a[a_start]) {
                if b_start < index && index < b_end {
                    let mut i = a_start;
                    let mut sequence = 1;
                    let mut t;

                    while i + 1 < a_end && i + 1 < b_end {
                        i += 1;
                        t = map.get(&a[i]).copied();
                        if t != Some(index + sequence) {
                            break;
                        }
                        sequence += 1;
                    }

                    if sequence > index - b_start {
                        let node = &a[a_start];
                        while b_start < index {
                            parent.insert_before(&b[b_start], Some(node));
                            b_start += 1;
                        }
                    } else {
                        parent.replace_child(&a[a_start], &b[b_start]);
                        a_start += 1;
                        b_start += 1;
                    }
                } else {
                    a_start += 1;
                }
            } else {
                parent.remove_node(&a[a_start]);
                a_start += 1;
            }
        }
    }

    #[cfg(debug_assertions)]
    {
        for (i, node) in b.iter().enumerate() {
            if node.parent_node().as_ref() != Some(parent) {
                panic!(
                    "node {i} in new nodes Vec is not a child of parent after reconciliation. node = {node:#?}",
                );
            }
        }
    }
}
