//! [`View`]: the renderer-agnostic representation of "a node, a dynamic subtree, or a fragment".

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use loom_reactive::effect::create_effect;
use loom_reactive::signal::{create_signal, Signal};

use crate::node_ops::NodeOps;

#[derive(Clone)]
pub(crate) enum ViewType<N: NodeOps> {
    Node(N),
    Dyn(Signal<View<N>>),
    #[allow(clippy::redundant_allocation)]
    Fragment(Rc<Box<[View<N>]>>),
}

/// A view: either a single node, a fragment of views, or a dynamic view that swaps out its
/// content over time. This is the value every [`crate::node_ops::NodeOps::create_node`]-backed
/// element, every component's render function, and every control-flow primitive
/// (`If`/`Fn`/`For`/...) produces.
#[derive(Clone)]
pub struct View<N: NodeOps> {
    pub(crate) inner: ViewType<N>,
}

impl<N: NodeOps> View<N> {
    pub fn new_node(node: N) -> Self {
        Self {
            inner: ViewType::Node(node),
        }
    }

    /// Creates a view that re-derives itself every time a signal `f` reads changes. Unlike
    /// [`View::new_dyn_scoped`], `f`'s signal reads are tracked by the *caller's* effect
    /// machinery — `new_dyn` owns the effect itself.
    pub fn new_dyn(mut f: impl FnMut() -> View<N> + 'static) -> Self {
        let signal = create_signal(None::<Signal<View<N>>>);
        create_effect(move || {
            let view = f();
            if let Some(existing) = signal.peek_clone() {
                existing.set(view);
            } else {
                signal.set(Some(create_signal(view)));
            }
        });
        Self {
            inner: ViewType::Dyn(signal.peek_clone().unwrap()),
        }
    }

    /// Like [`View::new_dyn`], but `f` runs inside a fresh disposal scope that is torn down and
    /// recreated on every re-run — used by control-flow primitives (`If`, `Fn`) whose branches
    /// need their own cleanup lifetime distinct from the enclosing component. The previous run's
    /// scope is kept alive (and only disposed right before the next run starts) so that anything
    /// it set up survives until the branch is actually about to be replaced — matching how
    /// `create_effect` retires its own scope.
    pub fn new_dyn_scoped(mut f: impl FnMut() -> View<N> + 'static) -> Self {
        let mut prev_scope: Option<loom_reactive::scope::ReactiveScope> = None;
        Self::new_dyn(move || {
            prev_scope.take();
            let mut result = None;
            prev_scope = Some(loom_reactive::scope::create_child_scope(|| result = Some(f())));
            result.unwrap()
        })
    }

    pub fn new_fragment(fragment: Vec<View<N>>) -> Self {
        Self {
            inner: ViewType::Fragment(Rc::from(fragment.into_boxed_slice())),
        }
    }

    /// An empty view, represented as a single anchor node.
    pub fn empty() -> Self {
        Self::new_node(N::create_anchor())
    }

    pub fn as_node(&self) -> Option<&N> {
        match &self.inner {
            ViewType::Node(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&[View<N>]> {
        match &self.inner {
            ViewType::Fragment(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dyn(&self) -> Option<Signal<View<N>>> {
        match &self.inner {
            ViewType::Dyn(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self.inner, ViewType::Node(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.inner, ViewType::Fragment(_))
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self.inner, ViewType::Dyn(_))
    }

    /// Flattens this view down to the concrete list of nodes it currently renders as, recursing
    /// through fragments and reading through (and tracking) dynamic views.
    pub fn flatten(self) -> Vec<N> {
        match self.inner {
            ViewType::Node(node) => vec![node],
            ViewType::Dyn(signal) => signal.get_clone().flatten(),
            ViewType::Fragment(fragment) => {
                fragment.iter().flat_map(|v| v.clone().flatten()).collect()
            }
        }
    }

    /// A text node, reactive over `text`: whenever `text` changes, the existing node's content is
    /// updated in place via [`NodeOps::update_text`] rather than the node being replaced. This is
    /// the spec's "signal-aware `createTextNode`".
    pub fn text(text: impl Into<loom_reactive::MaybeSignal<String>>) -> Self {
        let text = text.into();
        match text {
            loom_reactive::MaybeSignal::Static(s) => Self::new_node(N::create_text_node(Cow::Owned(s))),
            dynamic => {
                let node = N::create_text_node(Cow::Borrowed(""));
                let node_for_effect = node.clone();
                create_effect(move || {
                    node_for_effect.update_text(&dynamic.read());
                });
                Self::new_node(node)
            }
        }
    }
}

impl<N: NodeOps> Default for View<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<N: NodeOps> fmt::Debug for View<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ViewType::Node(node) => node.fmt(f),
            ViewType::Dyn(signal) => signal.peek_clone().fmt(f),
            ViewType::Fragment(fragment) => fragment.fmt(f),
        }
    }
}

/// Converts a value into a [`View`] — the renderer-facing counterpart of `Display` for anything
/// that can appear as a child in a view tree.
pub trait IntoView<N: NodeOps> {
    fn into_view(self) -> View<N>;
}

impl<N: NodeOps> IntoView<N> for View<N> {
    fn into_view(self) -> View<N> {
        self
    }
}

impl<T: fmt::Display + 'static, N: NodeOps> IntoView<N> for T {
    fn into_view(self) -> View<N> {
        macro_rules! specialize_as_ref_to_str {
            ($($t: ty),*) => {
                $(
                    if let Some(s) = <dyn Any>::downcast_ref::<$t>(&self) {
                        return View::new_node(N::create_text_node(Cow::Owned(s.as_ref().to_owned())));
                    }
                )*
            }
        }
        specialize_as_ref_to_str!(&str, String, Rc<str>, Rc<String>, Cow<'_, str>);

        let t = self.to_string();
        View::new_node(N::create_text_node(Cow::Owned(t)))
    }
}
