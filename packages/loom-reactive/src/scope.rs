//! Disposal scopes: the ownership tree for signals, effects, cleanups and context.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
#[cfg(debug_assertions)]
use std::panic::Location;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::effect::{untrack, EffectState};
use crate::signal::SignalDataAny;

new_key_type! {
    pub(crate) struct ScopeKey;
}

thread_local! {
    /// A stack of [`ReactiveScope`] on the current thread. The top of the stack is the scope in
    /// which new signals/effects/cleanups/child scopes are currently being created.
    pub(crate) static SCOPE_STACK: RefCell<Vec<ReactiveScope>> = RefCell::new(Vec::new());
    /// All [`ReactiveScope`]s that are currently valid on the current thread, keyed so that a
    /// [`SignalId`](crate::signal::SignalId) can find its backing storage without holding a
    /// reference into the scope itself.
    pub(crate) static VALID_SCOPES: RefCell<SlotMap<ScopeKey, ReactiveScopeGlobalRef>> = RefCell::new(SlotMap::with_key());
}

fn insert_scope(scope: ReactiveScopeGlobalRef) -> ScopeKey {
    VALID_SCOPES.with(|scopes| scopes.borrow_mut().insert(scope))
}

fn remove_scope(key: ScopeKey) {
    VALID_SCOPES.with(|scopes| {
        scopes
            .borrow_mut()
            .remove(key)
            .expect("could not find scope with key")
    });
}

struct CleanupCallback(Box<dyn FnOnce()>);

/// A `TypeId`-keyed bag of context values owned by a single scope.
#[derive(Default)]
pub(crate) struct ContextMap {
    values: HashMap<TypeId, Rc<dyn Any>>,
}

pub(crate) struct ReactiveScopeInner {
    pub(crate) key: Option<ScopeKey>,
    /// Parent scope, used to walk up the tree for context lookup. `None` for root scopes.
    pub(crate) parent: Option<ReactiveScope>,
    pub(crate) signals: Vec<Box<dyn SignalDataAny>>,
    effects: Vec<Rc<RefCell<Option<EffectState>>>>,
    cleanups: Vec<CleanupCallback>,
    pub(crate) context: ContextMap,
    pub(crate) disposed: bool,
    #[cfg(debug_assertions)]
    pub(crate) creation_loc: Location<'static>,
}

impl ReactiveScopeInner {
    #[cfg_attr(debug_assertions, track_caller)]
    fn new(parent: Option<ReactiveScope>) -> Self {
        Self {
            key: None,
            parent,
            signals: Default::default(),
            effects: Default::default(),
            cleanups: Default::default(),
            context: Default::default(),
            disposed: false,
            #[cfg(debug_assertions)]
            creation_loc: *Location::caller(),
        }
    }

    /// Runs cleanups in reverse registration order and drops owned effects so that nested
    /// disposal scopes tear down before this one finishes.
    fn run_cleanup(&mut self) {
        let cleanups = std::mem::take(&mut self.cleanups);
        let effects = std::mem::take(&mut self.effects);

        for cb in cleanups.into_iter().rev() {
            untrack(cb.0);
        }

        debug_assert!(effects.iter().all(|e| Rc::strong_count(e) == 1));
        drop(effects);
    }
}

pub(crate) struct ReactiveScopeGlobalRef(pub Rc<RefCell<ReactiveScopeInner>>);

/// Owns the signals, effects, cleanup callbacks, and context values created within it.
///
/// Disposing a scope (either by dropping the last owning handle or by calling
/// [`ReactiveScope::dispose`] explicitly) runs its cleanup callbacks in reverse registration
/// order, then its child scopes' cleanups (which have already run by the time a parent scope
/// is dropped, since children are dropped first). Disposal is idempotent: disposing an
/// already-disposed scope is a no-op.
#[derive(Clone)]
pub struct ReactiveScope {
    pub(crate) inner: Rc<RefCell<ReactiveScopeInner>>,
}

impl ReactiveScope {
    #[cfg_attr(debug_assertions, track_caller)]
    fn new(parent: Option<ReactiveScope>) -> Self {
        let inner = Rc::new(RefCell::new(ReactiveScopeInner::new(parent)));
        let key = insert_scope(ReactiveScopeGlobalRef(inner.clone()));
        inner.borrow_mut().key = Some(key);
        Self { inner }
    }

    pub(crate) fn key(&self) -> ScopeKey {
        self.inner.borrow().key.unwrap()
    }

    pub(crate) fn add_effect_state(&self, effect: Rc<RefCell<Option<EffectState>>>) {
        self.inner.borrow_mut().effects.push(effect);
    }

    /// Registers a callback to run when this scope is disposed.
    ///
    /// Prefer [`on_cleanup`] to add a cleanup callback to the *current* scope.
    pub fn add_cleanup_callback(&self, callback: impl FnOnce() + 'static) {
        self.inner
            .borrow_mut()
            .cleanups
            .push(CleanupCallback(Box::new(callback)));
    }

    /// Runs `f` with this scope pushed onto the scope stack, so that signals, effects and
    /// cleanups created by `f` are owned by this scope rather than whatever scope is currently
    /// active.
    pub fn extend(&self, f: impl FnOnce()) {
        SCOPE_STACK.with(|scope_stack| {
            scope_stack.borrow_mut().push(self.clone());
            f();
            scope_stack.borrow_mut().pop().unwrap();
        });
    }

    /// Returns `true` if this scope has already been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Disposes the scope immediately: runs cleanups in reverse order, drops owned effects, and
    /// removes the scope from the valid-scope registry. Safe to call more than once; subsequent
    /// calls are no-ops.
    pub fn dispose(&self) {
        let already_disposed = {
            let mut inner = self.inner.borrow_mut();
            let was = inner.disposed;
            inner.disposed = true;
            was
        };
        if already_disposed {
            return;
        }
        self.inner.borrow_mut().run_cleanup();
        remove_scope(self.key());
    }

    fn provide_context<T: 'static>(&self, value: T) {
        let type_id = TypeId::of::<T>();
        self.inner
            .borrow_mut()
            .context
            .values
            .insert(type_id, Rc::new(value));
    }

    fn find_context<T: 'static>(&self) -> Option<Rc<T>> {
        let type_id = TypeId::of::<T>();
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let found = scope.inner.borrow().context.values.get(&type_id).cloned();
            if let Some(value) = found {
                return value.downcast::<T>().ok();
            }
            current = scope.inner.borrow().parent.clone();
        }
        None
    }
}

impl Drop for ReactiveScope {
    fn drop(&mut self) {
        // `self` plus the entry in `VALID_SCOPES` each hold one strong ref; once those are the
        // only two left, this is the last owning handle going out of scope.
        if !self.inner.borrow().disposed && Rc::strong_count(&self.inner) == 2 {
            self.dispose();
        }
    }
}

/// Creates a new detached [`ReactiveScope`] with no parent.
#[must_use = "dropping a ReactiveScope disposes it and everything it owns"]
#[track_caller]
pub fn create_root(f: impl FnOnce()) -> ReactiveScope {
    create_child_scope_impl(None, f)
}

/// Creates a new [`ReactiveScope`] that is a child of the current scope, inheriting its context
/// chain for lookups but owned and disposed independently.
///
/// # Panics
/// Panics if called outside of a reactive scope.
#[track_caller]
pub fn create_child_scope(f: impl FnOnce()) -> ReactiveScope {
    let parent = current_scope().expect("create_child_scope must be used inside a ReactiveScope");
    create_child_scope_impl(Some(parent), f)
}

#[track_caller]
fn create_child_scope_impl(parent: Option<ReactiveScope>, f: impl FnOnce()) -> ReactiveScope {
    let scope = ReactiveScope::new(parent);
    SCOPE_STACK.with(|scope_stack| {
        scope_stack.borrow_mut().push(scope.clone());
        f();
        scope_stack.borrow_mut().pop().unwrap();
    });
    scope
}

/// Adds a cleanup callback to the current scope.
///
/// # Panics
/// Panics if not inside a reactive scope.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    SCOPE_STACK.with(|current_scope| {
        current_scope
            .borrow()
            .last()
            .expect("on_cleanup must be used inside a reactive scope")
            .add_cleanup_callback(f);
    });
}

/// Returns a shallow clone of the current scope, or `None` if not inside a reactive scope.
pub fn current_scope() -> Option<ReactiveScope> {
    SCOPE_STACK.with(|scope_stack| scope_stack.borrow().last().cloned())
}

/// Provides a context value in the current scope. Lower scopes (including this one) can read it
/// back with [`use_context`]. Shadows, rather than conflicts with, a same-typed context provided
/// in an ancestor scope.
///
/// # Panics
/// Panics if a context of the same type has already been provided *in this exact scope* (not an
/// ancestor — that case is shadowing, which is allowed), and if called outside a reactive scope.
#[track_caller]
pub fn provide_context<T: 'static>(value: T) {
    let scope = current_scope().expect("provide_context must be used inside a reactive scope");
    let type_id = TypeId::of::<T>();
    if scope.inner.borrow().context.values.contains_key(&type_id) {
        panic!("a context of this type has already been provided in this scope");
    }
    scope.provide_context(value);
}

/// Tries to get a context value of type `T`, walking up the scope hierarchy from the current
/// scope. Returns `None` if no matching context has been provided.
pub fn try_use_context<T: 'static>() -> Option<Rc<T>> {
    current_scope().and_then(|scope| scope.find_context::<T>())
}

/// Gets a context value of type `T`, walking up the scope hierarchy.
///
/// # Panics
/// Panics if no context of this type is found.
#[track_caller]
pub fn use_context<T: 'static>() -> Rc<T> {
    try_use_context().expect("context value not found for type")
}

/// Depth of the current scope relative to its furthest root ancestor. The root scope is `0`.
pub fn scope_depth() -> u32 {
    let Some(mut scope) = current_scope() else {
        return 0;
    };
    let mut depth = 0;
    loop {
        let parent = scope.inner.borrow().parent.clone();
        match parent {
            Some(next) => {
                scope = next;
                depth += 1;
            }
            None => break,
        }
    }
    depth
}

thread_local! {
    /// Bumped on entry/exit of [`create_root`]/[`create_child_scope`] nesting so effect re-runs
    /// triggered from deep inside a long dependency chain can be flagged as runaway.
    pub(crate) static SCOPE_NESTING_DEPTH: Cell<u32> = const { Cell::new(0) };
}

#[cfg(test)]
mod tests {
    use crate::signal::create_signal;

    use super::*;

    #[test]
    fn cleanup() {
        let _ = create_root(|| {
            let cleanup_called = create_signal(false);
            let scope = create_root(move || {
                on_cleanup(move || {
                    cleanup_called.set(true);
                });
            });
            assert!(!cleanup_called.get_clone());
            drop(scope);
            assert!(cleanup_called.get_clone());
        });
    }

    #[test]
    fn dispose_is_idempotent() {
        let _ = create_root(|| {
            let calls = create_signal(0);
            let scope = create_root(move || {
                on_cleanup(move || calls.set(calls.peek_clone() + 1));
            });
            scope.dispose();
            scope.dispose();
            scope.dispose();
            assert_eq!(calls.get_clone(), 1);
        });
    }

    #[test]
    fn context_shadowing() {
        create_root(|| {
            provide_context(1i32);
            assert_eq!(*use_context::<i32>(), 1);
            create_child_scope(|| {
                assert_eq!(*use_context::<i32>(), 1);
                provide_context(2i32);
                assert_eq!(*use_context::<i32>(), 2);
            });
            assert_eq!(*use_context::<i32>(), 1);
        });
    }

    #[test]
    fn scope_depth_increases_with_nesting() {
        create_root(|| {
            assert_eq!(scope_depth(), 0);
            create_child_scope(|| {
                assert_eq!(scope_depth(), 1);
                create_child_scope(|| {
                    assert_eq!(scope_depth(), 2);
                });
                assert_eq!(scope_depth(), 1);
            });
        });
    }
}
