//! `memo`/`useMemo` — a function wrapped so its body runs at most once, with any signals,
//! effects or cleanups it creates tied to the scope that was current when it was *first called*
//! rather than whichever scope happens to call it later (spec §4.8). Grounded on
//! [`loom_reactive::scope::ReactiveScope::extend`], the same "re-enter a captured scope" primitive
//! [`crate::control_flow::for_`]'s rows use to keep a row's signals alive across reconciliation
//! passes.

use std::cell::RefCell;
use std::rc::Rc;

use loom_reactive::scope::current_scope;

enum MemoState<T> {
    Unevaluated,
    Evaluated(Rc<T>),
}

/// Wraps `f` so the first call runs it for real, with its signals/effects/cleanups owned by the
/// scope that was current at the moment `memo` itself was called, and every later call (from
/// anywhere) just returns the cached result without touching `f` again.
///
/// # Panics
/// Panics if called outside of a reactive scope.
pub fn memo<T: 'static>(f: impl FnOnce() -> T + 'static) -> impl Fn() -> Rc<T> {
    let capture_scope = current_scope().expect("memo() must be used inside a reactive scope");
    let state = Rc::new(RefCell::new((MemoState::<T>::Unevaluated, Some(f))));

    move || {
        {
            let state_ref = state.borrow();
            if let MemoState::Evaluated(value) = &state_ref.0 {
                return value.clone();
            }
        }

        let mut value = None;
        capture_scope.extend(|| {
            let f = state.borrow_mut().1.take().expect("memo body already consumed");
            value = Some(f());
        });
        let value = Rc::new(value.unwrap());
        state.borrow_mut().0 = MemoState::Evaluated(value.clone());
        value
    }
}

enum UseMemoState<T> {
    /// `use_memo` itself hasn't been invoked from inside a scope yet — `f` is still waiting.
    Unbound(Option<Box<dyn FnOnce() -> T>>),
    /// First invocation captured a scope and handed off to a real [`memo`]; every later call just
    /// delegates to it.
    Bound(Box<dyn Fn() -> Rc<T>>),
}

/// `useMemo(fn)`: the module-scope helper spec §4.8 describes — unlike [`memo`], which captures
/// the current scope the instant it's called (so it can only be called from inside one), this is
/// meant to be called at module scope, *before* any component exists, and its returned factory
/// invoked later from inside a component. Calling `memo` itself at module scope would panic
/// immediately (no active scope to capture); `use_memo` defers that capture to the factory's
/// first invocation instead.
pub fn use_memo<T: 'static>(f: impl FnOnce() -> T + 'static) -> impl Fn() -> Rc<T> {
    let state = Rc::new(RefCell::new(UseMemoState::Unbound(Some(Box::new(f) as Box<dyn FnOnce() -> T>))));

    move || {
        enum Action<T> {
            CallBound(Rc<T>),
            Bind(Box<dyn FnOnce() -> T>),
        }
        let action = match &mut *state.borrow_mut() {
            UseMemoState::Bound(memoized) => Action::CallBound(memoized()),
            UseMemoState::Unbound(f) => {
                Action::Bind(f.take().expect("use_memo factory body already consumed"))
            }
        };
        match action {
            Action::CallBound(value) => value,
            Action::Bind(f) => {
                let memoized = memo(f);
                let value = memoized();
                *state.borrow_mut() = UseMemoState::Bound(Box::new(memoized));
                value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::{create_root, on_cleanup};

    use super::*;

    #[test]
    fn runs_body_at_most_once_and_caches_the_result() {
        let _ = create_root(|| {
            let runs = Rc::new(RefCell::new(0));
            let r = runs.clone();
            let cached = memo(move || {
                *r.borrow_mut() += 1;
                42
            });

            assert_eq!(*cached(), 42);
            assert_eq!(*cached(), 42);
            assert_eq!(*cached(), 42);
            assert_eq!(*runs.borrow(), 1);
        });
    }

    #[test]
    fn cleanup_registered_inside_the_body_ties_to_the_capturing_scope() {
        let _ = create_root(|| {
            let disposed = Rc::new(RefCell::new(false));
            let d = disposed.clone();

            let scope = loom_reactive::scope::create_child_scope(|| {});
            let mut cached = None;
            scope.extend(|| {
                cached = Some(memo(move || {
                    on_cleanup({
                        let d = d.clone();
                        move || *d.borrow_mut() = true
                    });
                    7
                }));
            });
            let cached = cached.unwrap();

            assert_eq!(*cached(), 7);
            assert!(!*disposed.borrow());
            scope.dispose();
            assert!(*disposed.borrow());
        });
    }
}
