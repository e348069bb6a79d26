//! Effects and derived (computed) signals.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::scope::{create_root, current_scope, ReactiveScope, SCOPE_STACK};
use crate::signal::{alloc_signal_data, create_signal, Signal, SignalDataAny, SignalId};

thread_local! {
    /// The effect currently tracking dependencies, if any. Signal reads consult this to decide
    /// whether to record themselves as a dependency.
    pub(crate) static CURRENT_LISTENER: RefCell<Option<Listener>> = RefCell::new(None);
}

pub(crate) struct EffectState {
    pub callback: Rc<RefCell<dyn FnMut()>>,
    dependencies: HashSet<SignalId>,
    /// Scope owning everything created during the effect's most recent run (including nested
    /// effects). Recreated — and its predecessor disposed first — on every re-run.
    scope: Option<ReactiveScope>,
}

pub(crate) struct Listener(Rc<RefCell<Option<EffectState>>>);

impl Listener {
    pub fn add_dependency(&self, signal: SignalId) {
        self.0
            .borrow_mut()
            .as_mut()
            .unwrap()
            .dependencies
            .insert(signal);
    }

    fn clear_dependencies(&self) {
        for dependency in &self.0.borrow().as_ref().unwrap().dependencies {
            dependency.get_mut(|data| {
                if let Some(data) = data {
                    data.unsubscribe(Rc::as_ptr(&self.0));
                }
            });
        }
        self.0.borrow_mut().as_mut().unwrap().dependencies.clear();
    }
}

pub(crate) type EffectStatePtr = *const RefCell<Option<EffectState>>;

/// Creates an effect: runs `f` once immediately, recording every signal it reads (directly, not
/// through `peek`/`untrack`) as a dependency. Whenever any dependency changes, `f` re-runs, after
/// its dependency set is cleared and rebuilt from scratch — so a conditional branch that stops
/// reading a signal un-subscribes from it on the next run.
///
/// `f` runs inside a fresh child scope each time, which is disposed (running its cleanups and
/// tearing down any nested effects) immediately before the next run starts. This is also the
/// spec's `watch()`.
///
/// # Panics
/// Panics if called outside of a reactive scope.
pub fn create_effect(mut f: impl FnMut() + 'static) {
    let effect_state = Rc::new(RefCell::new(None));

    let callback: Rc<RefCell<dyn FnMut()>> = Rc::new(RefCell::new({
        let effect_state = Rc::downgrade(&effect_state);
        move || {
            CURRENT_LISTENER.with(|listener| {
                let effect_state = Weak::upgrade(&effect_state).unwrap();
                let new_listener = Listener(Rc::clone(&effect_state));
                new_listener.clear_dependencies();
                let old_listener = mem::replace(&mut *listener.borrow_mut(), Some(new_listener));

                // Dispose the previous run's scope before the new run starts, so cleanups see
                // the state as it was just before re-running, not after.
                let _: Option<ReactiveScope> =
                    mem::take(&mut effect_state.borrow_mut().as_mut().unwrap().scope);

                let scope = create_root(|| {
                    f();
                });
                effect_state.borrow_mut().as_mut().unwrap().scope = Some(scope);

                let effect_state_ref = effect_state.borrow();
                let effect_state_ref = effect_state_ref.as_ref().unwrap();
                for dependency in &effect_state_ref.dependencies {
                    dependency.get_mut(|data| {
                        if let Some(data) = data {
                            data.subscribe(Rc::downgrade(&effect_state))
                        }
                    })
                }

                mem::replace(&mut *listener.borrow_mut(), old_listener).unwrap();
            });
        }
    }));

    *effect_state.borrow_mut() = Some(EffectState {
        callback: Rc::clone(&callback),
        dependencies: HashSet::new(),
        scope: None,
    });
    debug_assert_eq!(Rc::strong_count(&effect_state), 1);
    debug_assert!(RefCell::try_borrow_mut(&effect_state).is_ok());

    // An effect always runs at least once, synchronously, regardless of any active batch.
    callback.borrow_mut()();

    SCOPE_STACK.with(|scope_stack| {
        if let Some(scope) = scope_stack.borrow().last() {
            scope.add_effect_state(effect_state);
        } else {
            panic!("create_effect must be used inside a reactive scope")
        }
    });
}

/// Backing storage for a [`Memo`]: like [`crate::signal::SignalData`], but the value is computed
/// from `derive` instead of written directly, and is only (re)computed lazily, on read, when
/// `dirty`.
struct MemoData<T> {
    /// `None` until the first read; a computed signal never runs `derive` at all if nothing ever
    /// reads it (spec §3/§4.1/§8.2).
    value: Option<Rc<T>>,
    dependents: IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>,
    dirty: Cell<bool>,
    derive: RefCell<Box<dyn FnMut() -> T>>,
    /// Tracks `derive`'s own upstream dependencies. Its callback never recomputes — it only
    /// flips `dirty` and forwards a notification to this memo's own dependents, so the actual
    /// recompute stays pull-based, run from [`Memo::ensure_fresh`] the next time someone reads it.
    tracker: Rc<RefCell<Option<EffectState>>>,
}

impl<T: 'static> SignalDataAny for MemoData<T> {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
    fn subscribe(&mut self, effect: Weak<RefCell<Option<EffectState>>>) {
        self.dependents.insert(Weak::as_ptr(&effect), effect);
    }
    fn unsubscribe(&mut self, ptr: EffectStatePtr) {
        self.dependents.remove(&ptr);
    }
    fn clone_dependents(&self) -> IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>> {
        self.dependents.clone()
    }
    fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }
}

/// A lazily-evaluated derived signal: the spec's `computed`/`$` (§3 "Computed / Derived", §4.1).
///
/// Unlike [`Signal`], a `Memo`'s function does not run at creation time and does not re-run on
/// every dependency write. It runs at most once per dependency change, and only when something
/// actually reads the memo — reading it while clean returns the cached value with no recompute
/// at all. `Memo<T>` is `Copy`, the same cheap-handle shape as `Signal<T>`.
pub struct Memo<T> {
    id: SignalId,
    _phantom: PhantomData<*const T>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Memo<T> {}

impl<T: PartialEq + 'static> PartialEq for Memo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.peek_clone().eq(&other.peek_clone())
    }
}
impl<T: Eq + 'static> Eq for Memo<T> {}

impl<T: Hash + 'static> Hash for Memo<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peek_clone().hash(state);
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Memo").field(&*self.peek()).finish()
    }
}

impl<T: 'static> Memo<T> {
    fn track(self) {
        let _ = CURRENT_LISTENER.try_with(|current_listener| {
            if let Some(listener) = current_listener.borrow().as_ref() {
                listener.add_dependency(self.id);
            }
        });
    }

    /// Recomputes `derive` if (and only if) this memo is currently dirty, re-tracking whichever
    /// signals it reads this time around and unsubscribing from any it stopped reading — the same
    /// dependency-rebuild-from-scratch contract [`create_effect`] gives.
    fn ensure_fresh(self) {
        crate::batch::maybe_auto_flush();

        let is_dirty = self
            .id
            .get(|data| data.is_some_and(|data| Self::downcast(data).dirty.get()));
        if !is_dirty {
            return;
        }

        let tracker = self
            .id
            .get(|data| data.map(|data| Rc::clone(&Self::downcast(data).tracker)))
            .unwrap_or_else(|| panic!("{}", self.id.disposed_error()));

        CURRENT_LISTENER.with(|listener| {
            let new_listener = Listener(Rc::clone(&tracker));
            new_listener.clear_dependencies();
            let old_listener = mem::replace(&mut *listener.borrow_mut(), Some(new_listener));

            let new_value = self.id.get_mut(|data| {
                let mut derive = Self::downcast_mut(data.unwrap()).derive.borrow_mut();
                (*derive)()
            });

            let dependencies = tracker.borrow().as_ref().unwrap().dependencies.clone();
            for dependency in &dependencies {
                dependency.get_mut(|data| {
                    if let Some(data) = data {
                        data.subscribe(Rc::downgrade(&tracker));
                    }
                });
            }

            mem::replace(&mut *listener.borrow_mut(), old_listener);

            self.id.get_mut(|data| {
                let data = Self::downcast_mut(data.unwrap());
                data.value = Some(Rc::new(new_value));
                data.dirty.set(false);
            });
        });
    }

    fn downcast(data: &dyn SignalDataAny) -> &MemoData<T> {
        data.as_any()
            .downcast_ref::<MemoData<T>>()
            .expect("MemoData should have correct type")
    }

    fn downcast_mut(data: &mut dyn SignalDataAny) -> &mut MemoData<T> {
        data.as_any_mut()
            .downcast_mut::<MemoData<T>>()
            .expect("MemoData should have correct type")
    }

    fn value(self) -> Rc<T> {
        self.track();
        self.ensure_fresh();
        self.id
            .get(|data| data.and_then(|data| Self::downcast(data).value.clone()))
            .unwrap_or_else(|| panic!("{}", self.id.disposed_error()))
    }

    /// Reads the value, recomputing first if dirty, and subscribes the current effect/computed
    /// (if any) to future changes.
    #[track_caller]
    pub fn with<U>(self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.value())
    }

    /// Reads the value without subscribing to future changes. Still recomputes first if dirty —
    /// laziness is about *when* `derive` runs (on demand), not about serving a stale value.
    #[track_caller]
    pub fn peek(self) -> Rc<T> {
        self.ensure_fresh();
        self.id
            .get(|data| data.and_then(|data| Self::downcast(data).value.clone()))
            .unwrap_or_else(|| panic!("{}", self.id.disposed_error()))
    }

    /// [`Memo::peek`], cloning the value out.
    #[track_caller]
    pub fn peek_clone(self) -> T
    where
        T: Clone,
    {
        (*self.peek()).clone()
    }
}

impl<T: Copy + 'static> Memo<T> {
    /// Reads the value, subscribing to future changes. Requires `T: Copy`; for other types use
    /// [`Memo::get_clone`] or [`Memo::with`].
    #[track_caller]
    pub fn get(self) -> T {
        *self.value()
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Reads the value by cloning it out, subscribing to future changes.
    #[track_caller]
    pub fn get_clone(self) -> T {
        (*self.value()).clone()
    }
}

/// Creates a lazily-evaluated derived signal from `derived`: the spec's `computed(fn)`/`$`.
///
/// `derived` does not run at creation time. It runs the first time the returned [`Memo`] is read,
/// and thereafter only when a dependency it read on its most recent run has since changed — a
/// memo whose result is never read never runs `derived` at all, no matter how many of its
/// dependencies change in the meantime (spec §8.2).
///
/// # Panics
/// Panics if called outside of a reactive scope.
#[track_caller]
pub fn create_memo<F, T>(derived: F) -> Memo<T>
where
    F: FnMut() -> T + 'static,
    T: 'static,
{
    let scope = current_scope().expect("create_memo must be used inside a ReactiveScope");

    // Placeholder callback, replaced below once `id` — which the real callback needs to look
    // itself back up — is known.
    let tracker: Rc<RefCell<Option<EffectState>>> = Rc::new(RefCell::new(Some(EffectState {
        callback: Rc::new(RefCell::new(|| {})),
        dependencies: HashSet::new(),
        scope: None,
    })));

    let data = MemoData::<T> {
        value: None,
        dependents: IndexMap::new(),
        dirty: Cell::new(true),
        derive: RefCell::new(Box::new(derived)),
        tracker: Rc::clone(&tracker),
    };

    let id = alloc_signal_data(&scope, Box::new(data));

    let callback: Rc<RefCell<dyn FnMut()>> = Rc::new(RefCell::new(move || {
        // Runs whenever a signal `derived` previously read changes. Never recomputes here —
        // only flips dirty and, on the clean->dirty transition, forwards one notification to
        // our own dependents so an effect reading this memo is scheduled to re-run (and pulls
        // the real recompute when it does, via `ensure_fresh`).
        let notify_dependents = id.get_mut(|data| {
            data.and_then(|data| {
                let data = Memo::<T>::downcast_mut(data);
                if data.dirty.replace(true) {
                    None
                } else {
                    Some(data.clone_dependents())
                }
            })
        });
        if let Some(dependents) = notify_dependents {
            crate::batch::enqueue(dependents);
        }
    }));
    tracker.borrow_mut().as_mut().unwrap().callback = callback;

    Memo {
        id,
        _phantom: PhantomData,
    }
}

/// Like [`create_memo`], but skips notifying dependents when the recomputed value compares equal
/// (via [`PartialEq`]) to the previous one — the push side of the graph stays lazy even when its
/// input keeps "changing" to the same effective value.
///
/// # Panics
/// Panics if called outside of a reactive scope.
#[track_caller]
pub fn create_selector<F, T>(derived: F) -> Signal<T>
where
    F: FnMut() -> T + 'static,
    T: PartialEq + 'static,
{
    create_selector_with(derived, PartialEq::eq)
}

/// Like [`create_selector`], but with a custom comparison function instead of [`PartialEq`].
/// `comparator(old, new)` returning `true` means "treat as unchanged, don't notify".
///
/// # Panics
/// Panics if called outside of a reactive scope.
#[track_caller]
pub fn create_selector_with<F, T, C>(mut derived: F, comparator: C) -> Signal<T>
where
    F: FnMut() -> T + 'static,
    T: 'static,
    C: Fn(&T, &T) -> bool + 'static,
{
    let memo = Rc::new(std::cell::Cell::new(None::<Signal<T>>));

    let mut scope =
        Some(current_scope().expect("create_memo must be used inside a ReactiveScope"));

    create_effect({
        let memo = Rc::clone(&memo);
        move || {
            let new_value = derived();
            if let Some(memo_signal) = memo.get() {
                if !comparator(&memo_signal.peek(), &new_value) {
                    memo_signal.set(new_value);
                }
            } else {
                // Only runs once: the backing signal is created lazily, on the outer scope
                // rather than the effect's own (disposed-and-recreated) scope, so it survives
                // the memo's subsequent re-runs.
                scope.as_ref().unwrap().extend(|| {
                    memo.set(Some(create_signal(new_value)));
                });
                drop(scope.take());
            }
            debug_assert!(memo.get().is_some());
        }
    });

    memo.get().unwrap()
}

/// Runs `f` without tracking any signal reads it performs as dependencies of the enclosing
/// effect/computed. Does not create a new scope.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    CURRENT_LISTENER.with(|current_listener| {
        let saved = mem::take(&mut *current_listener.borrow_mut());
        let ret = f();
        *current_listener.borrow_mut() = saved;
        ret
    })
}

#[cfg(test)]
mod tests {
    use crate::scope::on_cleanup;
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn effects() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let double = create_signal(1);

            create_effect(move || {
                double.set(state.get() * 2);
            });
            assert_eq!(double.get(), 0);

            state.set(1);
            assert_eq!(double.get(), 2);
            state.set(2);
            assert_eq!(double.get(), 4);
        });
    }

    #[test]
    fn effect_should_subscribe_once() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let counter = create_signal(0);
            create_effect(move || {
                counter.set(counter.peek_clone() + 1);
                state.get();
                state.get();
            });
            assert_eq!(counter.get(), 1);
            state.set(1);
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn effect_should_recreate_dependencies() {
        let _ = create_root(|| {
            let condition = create_signal(true);
            let state1 = create_signal(0);
            let state2 = create_signal(1);
            let counter = create_signal(0);
            create_effect(move || {
                counter.set(counter.peek_clone() + 1);
                if condition.get() {
                    state1.get();
                } else {
                    state2.get();
                }
            });
            assert_eq!(counter.get(), 1);
            state1.set(1);
            assert_eq!(counter.get(), 2);
            state2.set(1);
            assert_eq!(counter.get(), 2);
            condition.set(false);
            assert_eq!(counter.get(), 3);
            state1.set(2);
            assert_eq!(counter.get(), 3);
            state2.set(2);
            assert_eq!(counter.get(), 4);
        });
    }

    #[test]
    fn nested_effects_should_recreate_inner() {
        let _ = create_root(|| {
            let counter = create_signal(0);
            let trigger = create_signal(());
            create_effect(move || {
                trigger.get();
                create_effect(move || {
                    counter.set(counter.peek_clone() + 1);
                });
            });
            assert_eq!(counter.get(), 1);
            trigger.set(());
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn outer_effects_rerun_first() {
        let _ = create_root(|| {
            let trigger = create_signal(());
            let outer_counter = create_signal(0);
            let inner_counter = create_signal(0);
            create_effect(move || {
                trigger.get();
                outer_counter.set(outer_counter.peek_clone() + 1);
                create_effect(move || {
                    trigger.get();
                    inner_counter.set(inner_counter.peek_clone() + 1);
                });
            });
            assert_eq!(outer_counter.get(), 1);
            assert_eq!(inner_counter.get(), 1);
            trigger.set(());
            assert_eq!(outer_counter.get(), 2);
            assert_eq!(inner_counter.get(), 2);
        });
    }

    #[test]
    fn destroy_effects_on_scope_drop() {
        let _ = create_root(|| {
            let counter = create_signal(0);
            let trigger = create_signal(());
            let scope = create_root(move || {
                create_effect(move || {
                    trigger.get();
                    counter.set(counter.peek_clone() + 1);
                });
            });
            assert_eq!(counter.get(), 1);
            trigger.set(());
            assert_eq!(counter.get(), 2);
            drop(scope);
            trigger.set(());
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn memo_only_runs_when_dependency_changes() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let counter = create_signal(0);
            let double = create_memo(move || {
                counter.set(counter.peek_clone() + 1);
                state.get() * 2
            });
            // Lazy: creating the memo must not run `derived` at all.
            assert_eq!(counter.get(), 0);

            assert_eq!(double.get(), 0);
            assert_eq!(counter.get(), 1);
            // Reading again without any intervening write must not recompute.
            assert_eq!(double.get(), 0);
            assert_eq!(counter.get(), 1);

            state.set(2);
            assert_eq!(double.get(), 4);
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn memo_never_runs_derived_if_never_read() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let _unread = create_memo(move || {
                runs.set(runs.peek_clone() + 1);
                state.get() * 2
            });
            assert_eq!(runs.peek_clone(), 0);

            // Mutating the dependency any number of times still must not run `derived` — a
            // computed that nobody reads stays completely inert (spec §8.2).
            state.set(1);
            state.set(2);
            state.set(3);
            assert_eq!(runs.peek_clone(), 0);
        });
    }

    #[test]
    fn memo_recomputes_once_per_dependency_change_once_read() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            let memo = create_memo(move || {
                runs.set(runs.peek_clone() + 1);
                state.get() * 2
            });

            // First read performs the deferred initial computation.
            assert_eq!(memo.get(), 0);
            assert_eq!(runs.peek_clone(), 1);

            // Several writes with no read in between still only cost one recompute, paid for
            // by the eventual read.
            state.set(1);
            state.set(2);
            assert_eq!(runs.peek_clone(), 1);
            assert_eq!(memo.get(), 4);
            assert_eq!(runs.peek_clone(), 2);
        });
    }

    #[test]
    fn selector_does_not_notify_on_equal_value() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let double = create_selector(move || state.get() * 2);
            let counter = create_signal(0);
            create_effect(move || {
                counter.set(counter.peek_clone() + 1);
                double.get();
            });
            assert_eq!(double.get(), 0);
            assert_eq!(counter.get(), 1);
            state.set(0);
            assert_eq!(counter.get(), 1);
            state.set(2);
            assert_eq!(counter.get(), 2);
        });
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let _ = create_root(|| {
            let state = create_signal(1);
            let double = create_memo(move || untrack(|| state.get()) * 2);
            assert_eq!(double.get(), 2);
            state.set(2);
            assert_eq!(double.get(), 2);
        });
    }

    #[test]
    fn cleanup_runs_once_per_rerun_and_is_untracked() {
        let _ = create_root(|| {
            let trigger = create_signal(());
            let counter = create_signal(0);
            create_effect(move || {
                counter.set(counter.peek_clone() + 1);
                on_cleanup(move || {
                    trigger.get();
                });
            });
            assert_eq!(counter.get(), 1);
            trigger.set(());
            assert_eq!(counter.get(), 1);
        });
    }
}
