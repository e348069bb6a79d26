//! Values that may be static or reactive — the `read()`/`bind()` glue between plain data and the
//! signal graph.
//!
//! Grounded on the teacher's `MaybeDyn<T>` (`sycamore-reactive/src/maybe_dyn.rs`), which exists
//! for exactly the same reason: component props and renderer-facing APIs need to accept either a
//! plain value or something backed by a signal without forcing every caller to wrap a literal in
//! a throwaway signal.

use std::rc::Rc;

use crate::signal::Signal;

/// Either a plain value or a signal/derived closure producing one.
///
/// Construct via `.into()` from a bare `T`, a `Signal<T>`, or a `Fn() -> T` closure (see the
/// [`From`] impls below); read with [`MaybeSignal::read`]/[`get`](MaybeSignal::get)/
/// [`get_clone`](MaybeSignal::get_clone).
#[derive(Clone)]
pub enum MaybeSignal<T> {
    Static(T),
    Signal(Signal<T>),
    Derived(Rc<dyn Fn() -> T>),
}

impl<T: 'static> MaybeSignal<T> {
    /// Reads the current value, subscribing to future changes if backed by a signal or derived
    /// closure. This is the spec's `read()`.
    pub fn read(&self) -> T
    where
        T: Clone,
    {
        match self {
            Self::Static(value) => value.clone(),
            Self::Signal(signal) => signal.get_clone(),
            Self::Derived(f) => f(),
        }
    }
}

impl MaybeSignal<bool> {
    /// `sig.choose(a, b)` (spec §4.1): a derived [`MaybeSignal`] that reads `a` while this one is
    /// truthy and `b` otherwise, re-deriving whenever this signal or whichever branch is currently
    /// selected changes.
    pub fn choose<A>(&self, a: impl Into<MaybeSignal<A>>, b: impl Into<MaybeSignal<A>>) -> MaybeSignal<A>
    where
        A: Clone + 'static,
    {
        let cond = self.clone();
        let a = a.into();
        let b = b.into();
        MaybeSignal::Derived(Rc::new(move || if cond.read() { a.read() } else { b.read() }))
    }
}

impl<T> From<T> for MaybeSignal<T> {
    fn from(value: T) -> Self {
        Self::Static(value)
    }
}

impl<T> From<Signal<T>> for MaybeSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        Self::Signal(signal)
    }
}

/// Reads any value convertible into a [`MaybeSignal`] — static values pass through untouched,
/// signals are read (and tracked).
pub fn read<T: Clone + 'static>(value: impl Into<MaybeSignal<T>>) -> T {
    value.into().read()
}

/// Expands to a [`MaybeSignal<String>`] that re-derives itself from the interpolated signals
/// each time any of them changes — the runtime counterpart of a JSX template literal. Since
/// JSX-style source transforms are out of scope, this is an ordinary `macro_rules!` rather than
/// a proc-macro: `t!("{}-{}", a, b)` expands to a `Derived` closure over clones of `a` and `b`.
#[macro_export]
macro_rules! t {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::maybe_signal::MaybeSignal::Derived(::std::rc::Rc::new(move || {
            format!($fmt $(, $crate::maybe_signal::read($arg))*)
        }))
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::create_effect;
    use crate::scope::create_root;
    use crate::signal::create_signal;

    #[test]
    fn reads_static_and_signal_uniformly() {
        create_root(|| {
            let s = create_signal(5);
            let a: MaybeSignal<i32> = 1.into();
            let b: MaybeSignal<i32> = s.into();
            assert_eq!(read(a), 1);
            assert_eq!(read(b), 5);
        });
    }

    #[test]
    fn choose_switches_branch_with_the_condition() {
        create_root(|| {
            let cond: MaybeSignal<bool> = create_signal(true).into();
            let picked = cond.choose("yes", "no");
            assert_eq!(picked.read(), "yes");

            let cond: MaybeSignal<bool> = create_signal(false).into();
            let picked = cond.choose("yes", "no");
            assert_eq!(picked.read(), "no");
        });
    }

    #[test]
    fn template_string_tracks_interpolated_signals() {
        create_root(|| {
            let name = create_signal("world".to_string());
            let template = t!("hello, {}!", name);
            let out = create_signal(String::new());
            create_effect(move || {
                out.set(template.read());
            });
            assert_eq!(out.get_clone(), "hello, world!");
            name.set("loom".to_string());
            assert_eq!(out.get_clone(), "hello, loom!");
        });
    }
}
