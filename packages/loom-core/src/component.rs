//! The component runtime: setup-once instances with owned disposal scopes.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use loom_reactive::scope::{create_child_scope, current_scope, provide_context, ReactiveScope};

use crate::node_ops::NodeOps;
use crate::view::View;

thread_local! {
    /// The currently-being-set-up instances' exposed-value cells, used by [`expose`]. Kept
    /// separate from [`CURRENT_SELF`] because `expose<T>` has no `N: NodeOps` parameter to
    /// downcast a `Rc<ComponentInstance<N>>` with, but can push/pop a concrete
    /// `Rc<RefCell<Option<Rc<dyn Any>>>>` regardless of which backend the component renders to.
    static CURRENT_EXPOSED: RefCell<Vec<Rc<RefCell<Option<Rc<dyn Any>>>>>> = const { RefCell::new(Vec::new()) };
    /// The instance currently being set up, used by [`get_current_self`]. An element or
    /// control-flow primitive pushes a reactive scope but never pushes here — only `mount` does.
    static CURRENT_SELF: RefCell<Vec<Rc<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// A retained record of one mounted component: its disposal scope, its rendered root view, and
/// whatever it chose to [`expose`] as an imperative API.
///
/// This is new relative to the teacher library, whose components are "disappearing" — plain
/// function calls with no retained record at all. The spec's component model is retained (`$ref`
/// on a component must resolve to *something*, `expose()` must have somewhere to live), so
/// `ComponentInstance` exists to be that something; it is built from the same
/// scope/context/cleanup primitives the teacher's disappearing components already use internally.
pub struct ComponentInstance<N: NodeOps> {
    scope: ReactiveScope,
    root: RefCell<Option<View<N>>>,
    exposed: Rc<RefCell<Option<Rc<dyn Any>>>>,
}

impl<N: NodeOps> ComponentInstance<N> {
    /// The view this component instance rendered. `None` only momentarily during setup, before
    /// the render closure returns.
    pub fn root_view(&self) -> View<N> {
        self.root
            .borrow()
            .clone()
            .expect("component instance root accessed before setup finished")
    }

    /// The disposal scope owning everything this component instance created.
    pub fn scope(&self) -> &ReactiveScope {
        &self.scope
    }

    /// Disposes the instance: tears down its scope (running cleanups in reverse order) and all
    /// descendant scopes. Idempotent.
    pub fn dispose(&self) {
        self.scope.dispose();
    }

    /// Retrieves whatever this instance passed to [`expose`], if it called it and the type
    /// matches.
    pub fn exposed<T: 'static>(&self) -> Option<Rc<T>> {
        self.exposed.borrow().clone()?.downcast::<T>().ok()
    }
}

/// Registers `value` as this component's imperative API, retrievable later via
/// [`ComponentInstance::exposed`] (typically by a parent holding a `$ref` to this component).
///
/// # Panics
/// Panics if called outside of component setup, or more than once per component.
pub fn expose<T: 'static>(value: T) {
    CURRENT_EXPOSED.with(|stack| {
        let stack = stack.borrow();
        let cell = stack.last().expect("expose() called outside of component setup");
        let mut cell = cell.borrow_mut();
        if cell.is_some() {
            panic!("expose() called more than once in the same component");
        }
        *cell = Some(Rc::new(value));
    });
}

/// Returns a handle to the component instance currently being set up, for components that want
/// to capture their own instance (e.g. to hand it out before `expose` is called).
///
/// # Panics
/// Panics if called outside of component setup, or if `N` does not match the instance currently
/// being set up.
pub fn get_current_self<N: NodeOps>() -> Rc<ComponentInstance<N>> {
    CURRENT_SELF.with(|stack| {
        stack
            .borrow()
            .last()
            .expect("get_current_self() called outside of component setup")
            .clone()
            .downcast::<ComponentInstance<N>>()
            .expect("get_current_self() called with mismatched node type")
    })
}

/// Instantiates a component: runs `setup` once inside a fresh child disposal scope, retaining the
/// result as a [`ComponentInstance`]. `setup` is run untracked (component bodies are not
/// themselves reactive — only the effects/computeds *they create* are), matching the teacher's
/// `component_scope`.
///
/// # Panics
/// Panics if called outside of a reactive scope (there must be a parent scope to child off of).
pub fn mount<N: NodeOps>(setup: impl FnOnce() -> View<N> + 'static) -> Rc<ComponentInstance<N>> {
    let result: Rc<RefCell<Option<Rc<ComponentInstance<N>>>>> = Rc::new(RefCell::new(None));
    let result_inner = result.clone();

    create_child_scope(move || {
        // `create_child_scope` pushes the new scope before calling us, so it is already current.
        let scope = current_scope().unwrap();
        let exposed = Rc::new(RefCell::new(None));
        let instance = Rc::new(ComponentInstance {
            scope,
            root: RefCell::new(None),
            exposed: exposed.clone(),
        });
        *result_inner.borrow_mut() = Some(instance.clone());

        CURRENT_EXPOSED.with(|s| s.borrow_mut().push(exposed));
        CURRENT_SELF.with(|s| s.borrow_mut().push(instance.clone()));
        let view = loom_reactive::effect::untrack(setup);
        CURRENT_EXPOSED.with(|s| {
            s.borrow_mut().pop();
        });
        CURRENT_SELF.with(|s| {
            s.borrow_mut().pop();
        });

        *instance.root.borrow_mut() = Some(view);
    });

    result.borrow_mut().take().unwrap()
}

/// Provides a value visible to this component's own setup and to every descendant component,
/// until shadowed by a nearer `provide_context::<T>` call. Thin wrapper over
/// [`loom_reactive::provide_context`] kept here so component authors import one `loom_core`
/// prelude instead of reaching into the reactive crate directly.
pub fn provide<T: 'static>(value: T) {
    provide_context(value);
}

/// A deferred child-rendering closure, passed to a component that declares a `children` field.
/// Deferring the call lets a component decide *whether* and *in what scope* to render its
/// children (conditionally, inside an effect, inside a child's own disposal scope, ...).
pub struct Children<N: NodeOps> {
    f: Box<dyn FnOnce() -> View<N>>,
}

impl<N: NodeOps> std::fmt::Debug for Children<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Children").finish()
    }
}

impl<F, N: NodeOps> From<F> for Children<N>
where
    F: FnOnce() -> View<N> + 'static,
{
    fn from(f: F) -> Self {
        Self { f: Box::new(f) }
    }
}

impl<N: NodeOps> From<View<N>> for Children<N> {
    fn from(view: View<N>) -> Self {
        Self { f: Box::new(|| view) }
    }
}

impl<N: NodeOps> Default for Children<N> {
    fn default() -> Self {
        Self {
            f: Box::new(View::default),
        }
    }
}

impl<N: NodeOps> Children<N> {
    pub fn new(f: impl FnOnce() -> View<N> + 'static) -> Self {
        Self { f: Box::new(f) }
    }

    pub fn call(self) -> View<N> {
        (self.f)()
    }
}
