//! Reactive signals: the mutable cells at the leaves of the dependency graph.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
#[cfg(debug_assertions)]
use std::panic::Location;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::effect::{create_effect, EffectState, EffectStatePtr, CURRENT_LISTENER};
use crate::error::LoomError;
use crate::scope::{current_scope, ReactiveScope, ScopeKey, VALID_SCOPES};

/// Backing storage for a signal: its current value plus the effects that depend on it.
pub(crate) struct SignalData<T> {
    inner: Rc<T>,
    dependents: IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>,
}

impl<T> Clone for SignalData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            dependents: self.dependents.clone(),
        }
    }
}

pub(crate) trait SignalDataAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn subscribe(&mut self, effect: Weak<RefCell<Option<EffectState>>>);
    fn unsubscribe(&mut self, ptr: EffectStatePtr);
    #[must_use]
    fn clone_dependents(&self) -> IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>;
    fn has_dependents(&self) -> bool;
}

impl<T: 'static> SignalDataAny for SignalData<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
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

/// Data needed to locate a [`SignalData`] without holding a reference into its owning scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SignalId {
    scope_key: ScopeKey,
    signal_index: usize,
    #[cfg(debug_assertions)]
    creation_loc: Location<'static>,
    #[cfg(debug_assertions)]
    scope_creation_loc: Location<'static>,
}

impl SignalId {
    pub fn get<Out>(self, f: impl FnOnce(Option<&dyn SignalDataAny>) -> Out) -> Out {
        VALID_SCOPES.with(|scopes| {
            let scopes = scopes.borrow();
            let Some(scope) = scopes.get(self.scope_key) else {
                return f(None);
            };
            let scope = scope.0.borrow();
            f(Some(scope.signals[self.signal_index].as_ref()))
        })
    }

    pub fn get_mut<Out>(self, f: impl FnOnce(Option<&mut dyn SignalDataAny>) -> Out) -> Out {
        VALID_SCOPES.with(|scopes| {
            let scopes = scopes.borrow();
            let Some(scope) = scopes.get(self.scope_key) else {
                return f(None);
            };
            let mut scope = scope.0.borrow_mut();
            f(Some(scope.signals[self.signal_index].as_mut()))
        })
    }

    pub(crate) fn disposed_error(self) -> LoomError {
        LoomError::ScopeDisposed {
            #[cfg(debug_assertions)]
            signal_loc: self.creation_loc.to_string(),
            #[cfg(debug_assertions)]
            scope_loc: self.scope_creation_loc.to_string(),
            #[cfg(not(debug_assertions))]
            signal_loc: String::new(),
            #[cfg(not(debug_assertions))]
            scope_loc: String::new(),
        }
    }
}

/// A reactive cell holding a value of type `T`.
///
/// Reading a signal (via [`Signal::get`], [`Signal::get_clone`] or [`Signal::with`]) inside an
/// effect or computed subscribes that effect to the signal: whenever the signal's value changes,
/// the effect re-runs. Reading it outside of any tracking context, or via
/// [`Signal::peek`]/[`Signal::peek_clone`], never subscribes.
///
/// `Signal<T>` is `Copy` — it is a cheap handle into the owning scope's storage, not the storage
/// itself. Cloning it around is the idiomatic way to share reactive state between closures.
pub struct Signal<T> {
    id: SignalId,
    _phantom: PhantomData<*const T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Signal<T> {}

impl<T: PartialEq + 'static> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.peek_clone().eq(&other.peek_clone())
    }
}
impl<T: Eq + 'static> Eq for Signal<T> {}

impl<T: Hash + 'static> Hash for Signal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peek_clone().hash(state);
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&*self.peek()).finish()
    }
}

impl<T: 'static> Signal<T> {
    fn track(self) {
        let _ = CURRENT_LISTENER.try_with(|current_listener| {
            if let Some(listener) = current_listener.borrow().as_ref() {
                listener.add_dependency(self.id);
            }
        });
    }

    fn data(self) -> Rc<T> {
        crate::batch::maybe_auto_flush();
        let data = self.id.get(|data| {
            data.map(|data| {
                Rc::clone(
                    &data
                        .as_any()
                        .downcast_ref::<SignalData<T>>()
                        .expect("SignalData should have correct type")
                        .inner,
                )
            })
        });
        match data {
            Some(data) => data,
            None => panic!("{}", self.id.disposed_error()),
        }
    }

    /// Reads the value, subscribing the current effect/computed (if any) to future changes.
    /// Returns an `Rc<T>` to avoid cloning; for `Copy`/`Clone` types see [`Signal::get`] and
    /// [`Signal::get_clone`].
    #[track_caller]
    pub fn with<U>(self, f: impl FnOnce(&T) -> U) -> U {
        self.track();
        f(&self.data())
    }

    /// Reads the value without subscribing to future changes — an explicit escape hatch from
    /// the dependency tracker, equivalent to wrapping the read in [`crate::effect::untrack`].
    #[track_caller]
    pub fn peek(self) -> Rc<T> {
        self.data()
    }

    /// [`Signal::peek`], cloning the value out.
    #[track_caller]
    pub fn peek_clone(self) -> T
    where
        T: Clone,
    {
        (*self.data()).clone()
    }

    /// Forces all current subscribers to re-run without changing the stored value. Used when a
    /// value is mutated in place (through interior mutability) in a way the signal cannot detect
    /// on its own.
    #[track_caller]
    pub fn trigger(self) {
        let dependents = self
            .id
            .get_mut(|data| data.map(|data| data.clone_dependents()));
        match dependents {
            Some(dependents) => notify(dependents),
            None => panic!("{}", self.id.disposed_error()),
        }
    }

    /// Whether anything currently depends on this signal. Used by [`crate::effect`]'s memos to
    /// decide whether a dirty mark needs to eagerly cascade or can stay purely lazy.
    pub(crate) fn has_dependents(self) -> bool {
        self.id
            .get(|data| data.is_some_and(|data| data.has_dependents()))
    }
}

impl<T: Copy + 'static> Signal<T> {
    /// Reads the value, subscribing to future changes. Requires `T: Copy`; for other types use
    /// [`Signal::get_clone`] or [`Signal::with`].
    #[track_caller]
    pub fn get(self) -> T {
        self.track();
        *self.data()
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Reads the value by cloning it out, subscribing to future changes.
    #[track_caller]
    pub fn get_clone(self) -> T {
        self.track();
        (*self.data()).clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Replaces the value. Dependents are only notified if the new value is unequal to the old
    /// one — a no-op write is silent. Dependent effects are re-run in reverse registration order
    /// so outer effects observe the change before inner ones. Use [`Signal::trigger`] to force
    /// dependents to re-run even when the value is unchanged (or not comparable at all).
    #[track_caller]
    pub fn set(self, value: T) {
        let dependents = self.id.get_mut(|data| {
            data.map(|data| {
                let data = data
                    .as_any_mut()
                    .downcast_mut::<SignalData<T>>()
                    .expect("SignalData should have correct type");
                let changed = *data.inner != value;
                data.inner = Rc::new(value);
                changed.then(|| data.clone_dependents())
            })
        });
        match dependents {
            Some(Some(dependents)) => notify(dependents),
            Some(None) => {}
            None => panic!("{}", self.id.disposed_error()),
        }
    }

    /// Subscribes this signal to `source`: whenever `source` changes, this signal is set to a
    /// clone of `source`'s value. Stops when either signal's owning scope is disposed.
    pub fn connect(self, source: Signal<T>)
    where
        T: Clone,
    {
        create_effect(move || {
            self.set(source.get_clone());
        });
    }
}

impl<T: 'static> Signal<T> {
    /// Updates the value in place via `f`, then notifies dependents unconditionally — there is no
    /// prior value to compare `f`'s result against without cloning twice, so (unlike
    /// [`Signal::set`]) this always re-runs dependents. Equivalent to
    /// `sig.set(f(sig.peek_clone()))` but avoids an intermediate read when `T` is expensive to
    /// clone twice.
    #[track_caller]
    pub fn update(self, f: impl FnOnce(&mut T)) {
        let dependents = self.id.get_mut(|data| {
            data.map(|data| {
                let data = data
                    .as_any_mut()
                    .downcast_mut::<SignalData<T>>()
                    .expect("SignalData should have correct type");
                let mut value = (*data.inner).clone_or_panic();
                f(&mut value);
                data.inner = Rc::new(value);
                data.clone_dependents()
            })
        });
        match dependents {
            Some(dependents) => notify(dependents),
            None => panic!("{}", self.id.disposed_error()),
        }
    }
}

/// Helper so [`Signal::update`] can mutate in place without requiring `T: Clone` on every other
/// method — only `update` needs a scratch copy.
trait CloneOrPanic {
    fn clone_or_panic(&self) -> Self;
}
impl<T: Clone> CloneOrPanic for T {
    fn clone_or_panic(&self) -> Self {
        self.clone()
    }
}

/// Queues every still-live dependent effect to run on the next flush, never dispatching inline.
/// Outside an explicit [`crate::batch::batch`] this still runs synchronously from the caller's
/// point of view, because [`Signal::data`]'s read path drains the queue (via
/// [`crate::batch::maybe_auto_flush`]) before returning a value — but it means two writes in a
/// row, with no read between them, coalesce into one flush instead of the second observing an
/// effect mid-rerun from the first.
fn notify(dependents: IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>) {
    crate::batch::enqueue(dependents);
}

/// Allocates a new slot in `scope`'s signal storage for `data` and returns a handle locating it.
/// Shared by [`create_signal`] and [`crate::effect::create_memo`] (whose lazily-computed backing
/// storage lives in the very same per-scope `signals` vector, so it can reuse this crate's
/// subscribe/unsubscribe/notify plumbing instead of duplicating it).
#[track_caller]
pub(crate) fn alloc_signal_data(scope: &ReactiveScope, data: Box<dyn SignalDataAny>) -> SignalId {
    let scope_key = scope.key();
    let signal_index = scope.inner.borrow().signals.len();
    scope.inner.borrow_mut().signals.push(data);

    SignalId {
        scope_key,
        signal_index,
        #[cfg(debug_assertions)]
        creation_loc: *Location::caller(),
        #[cfg(debug_assertions)]
        scope_creation_loc: scope.inner.borrow().creation_loc,
    }
}

/// Creates a new signal with the given initial value, owned by the current scope.
///
/// # Panics
/// Panics if called outside of a reactive scope.
#[track_caller]
pub fn create_signal<T: 'static>(value: T) -> Signal<T> {
    let scope = current_scope().expect("create_signal must be used inside a ReactiveScope");
    let data = SignalData {
        inner: Rc::new(value),
        dependents: IndexMap::new(),
    };
    Signal {
        id: alloc_signal_data(&scope, Box::new(data)),
        _phantom: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use crate::scope::create_root;

    use super::*;

    #[test]
    fn signal_read_write() {
        let _ = create_root(|| {
            let state = create_signal(0);
            assert_eq!(state.get(), 0);
            state.set(1);
            assert_eq!(state.get(), 1);
        });
    }

    #[test]
    fn signal_read_outside_alive_scope() {
        let mut get_state = None;
        let root = create_root(|| {
            get_state = Some(create_signal(0));
        });
        get_state.unwrap().get();
        drop(root);
    }

    #[test]
    #[should_panic(expected = "reactive scope for signal already destroyed")]
    fn signal_read_with_scope_already_destroyed() {
        let mut get_state = None;
        let _ = create_root(|| {
            get_state = Some(create_signal(0));
        });
        get_state.unwrap().get();
    }

    #[test]
    fn trigger_reruns_dependents_without_changing_value() {
        let _ = create_root(|| {
            let cell: Signal<Rc<RefCell<i32>>> = create_signal(Rc::new(RefCell::new(0)));
            let runs = create_signal(0);
            create_effect(move || {
                cell.with(|_| {});
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);
            *cell.peek().borrow_mut() += 1;
            cell.trigger();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn set_is_a_no_op_when_the_value_is_unchanged() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            create_effect(move || {
                state.get();
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);

            state.set(0);
            assert_eq!(runs.get(), 1);

            state.set(1);
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn trigger_reruns_dependents_even_with_an_equal_value() {
        let _ = create_root(|| {
            let state = create_signal(0);
            let runs = create_signal(0);
            create_effect(move || {
                state.get();
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);

            state.trigger();
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn update_mutates_in_place_and_notifies() {
        let _ = create_root(|| {
            let list = create_signal(vec![1, 2, 3]);
            list.update(|v| v.push(4));
            assert_eq!(list.peek_clone(), vec![1, 2, 3, 4]);
        });
    }
}
