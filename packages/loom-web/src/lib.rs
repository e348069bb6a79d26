//! DOM and HTML-string rendering backends for `loom`.
//!
//! This crate supplies the two concrete [`loom_core::node_ops::NodeOps`] implementations spec
//! §6 calls out by name — the live browser DOM ([`DomNode`]) and an HTML-string SSR target
//! ([`HtmlNode`]) — plus the small amount of glue every host needs around `loom-core`: a spawner
//! for `Async`/`Suspense`/`Lazy` (spec §4.7) and the `render`/`render_to_string` entry points a
//! binary actually calls.
//!
//! Grounded on the teacher's `sycamore-web`: that crate picks DOM vs. SSR by *target*, not by an
//! either/or Cargo feature — `wasm32` gets the DOM backend, everything else gets SSR, and
//! `--cfg sycamore_force_ssr` overrides this to force SSR even on `wasm32` (server-side wasm).
//! This crate keeps exactly that scheme, renamed to `loom_force_ssr`; the `dom` Cargo feature
//! only toggles the optional `wasm-bindgen`/`web-sys` dependencies `DomNode` needs, it does not
//! by itself select the backend.
//!
//! # Feature flags
//!
//! - `dom` (default) — pulls in the `wasm-bindgen`/`web-sys` stack [`DomNode`] needs. Required to
//!   build for `wasm32` at all; irrelevant off `wasm32`.
//! - `ssr` — no additional dependencies (SSR's `html-escape` dependency is already gated on
//!   `target_arch` alone); kept so downstream crates can request it explicitly the same way they
//!   request `dom`.

#[cfg(all(feature = "dom", any(target_arch = "wasm32", loom_force_ssr)))]
pub mod attributes;
#[cfg(all(feature = "dom", any(target_arch = "wasm32", loom_force_ssr)))]
pub mod dom_node;
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
pub mod html_node;

#[cfg(all(target_arch = "wasm32", not(loom_force_ssr)))]
pub use dom_node::{document, DomNode};
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
pub use html_node::HtmlNode;

use loom_core::component::mount;
use loom_core::renderer::Renderer;
use loom_core::view::View;

/// Registers the spawner every `loom-web` entry point needs before the first `Async`/`Lazy`
/// instantiates: on wasm this is `wasm_bindgen_futures::spawn_local`, off wasm (SSR / tests) a
/// `futures::executor::LocalPool` driven to completion by the caller. Idempotent — harmless (if
/// wasteful) to call more than once, matching `set_spawner`'s own "last writer wins" semantics.
#[cfg(all(target_arch = "wasm32", not(loom_force_ssr)))]
fn install_dom_spawner() {
    loom_core::spawn::set_spawner(wasm_bindgen_futures::spawn_local);
}

/// A local, manually-driven executor for non-wasm targets: SSR and any native host that embeds
/// `loom-web` without its own `!Send` task runtime. Callers that actually use `Async`/`Suspense`
/// in SSR should prefer [`render_to_string_await_suspense`], which drives this pool itself.
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
thread_local! {
    static LOCAL_POOL: std::cell::RefCell<futures::executor::LocalPool> =
        std::cell::RefCell::new(futures::executor::LocalPool::new());
    static LOCAL_POOL_INSTALLED: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
fn install_local_pool_spawner() {
    use futures::task::LocalSpawnExt;

    if LOCAL_POOL_INSTALLED.with(|c| c.get()) {
        return;
    }
    LOCAL_POOL_INSTALLED.with(|c| c.set(true));
    loom_core::spawn::set_spawner(|f| {
        LOCAL_POOL.with(|pool| {
            pool.borrow().spawner().spawn_local(f).expect("local pool spawner is never shut down");
        });
    });
}

/// Polls every future spawned via [`loom_core::spawn::spawn_local_scoped`] on the current thread
/// until none can make further progress without external input. Only meaningful off wasm, where
/// [`install_local_pool_spawner`] installed the pool this drives.
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
pub fn run_spawned_until_stalled() {
    LOCAL_POOL.with(|pool| pool.borrow_mut().run_until_stalled());
}

/// Mounts `f` as the root component of the app and inserts its rendered view as a child of
/// `target`. Leaks the component instance's disposal scope for the lifetime of the process —
/// there is no "unmount the whole app" use case, matching the teacher's `render_to`, which
/// likewise never calls the scope disposer it gets back from `create_scope`.
#[cfg(all(target_arch = "wasm32", not(loom_force_ssr)))]
pub fn render_to(target: DomNode, f: impl FnOnce(&Renderer<DomNode>) -> View<DomNode> + 'static) {
    install_dom_spawner();
    loom_reactive::scope::create_root(move || {
        let renderer = Renderer::<DomNode>::new();
        let instance = mount(move || f(&renderer));
        renderer.render(&target, instance.root_view());
        std::mem::forget(instance);
    });
}

/// [`render_to`] into `<body>`.
#[cfg(all(target_arch = "wasm32", not(loom_force_ssr)))]
pub fn render(f: impl FnOnce(&Renderer<DomNode>) -> View<DomNode> + 'static) {
    use wasm_bindgen::UnwrapThrowExt;

    let body = document().body().expect_throw("document has no <body>");
    render_to(DomNode::from_web_sys(body.into()), f);
}

/// Renders `f` to an HTML string synchronously: any `Suspense` boundary still pending when `f`
/// returns serializes with its fallback showing, since nothing here drives the spawned futures.
/// Use [`render_to_string_await_suspense`] to wait for them first.
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
pub fn render_to_string(f: impl FnOnce(&Renderer<HtmlNode>) -> View<HtmlNode>) -> String {
    let mut out = String::new();
    let _ = loom_reactive::scope::create_root(|| {
        let renderer = Renderer::<HtmlNode>::new();
        let instance = mount(move || f(&renderer));
        out = instance
            .root_view()
            .flatten()
            .into_iter()
            .map(HtmlNode::serialize)
            .collect();
        instance.dispose();
    });
    out
}

/// Like [`render_to_string`], but first drains every `Async`/`Lazy` future spawned during `f`
/// (via a local executor — see [`run_spawned_until_stalled`]) so `Suspense` boundaries resolve
/// before serialization. Bounded by `max_passes` flush/poll rounds to guard against a future that
/// perpetually reschedules itself without ever settling (the spec's "runaway flush" diagnostic,
/// applied to the spawn loop rather than the signal graph).
#[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
pub fn render_to_string_await_suspense(
    f: impl FnOnce(&Renderer<HtmlNode>) -> View<HtmlNode>,
    max_passes: usize,
) -> String {
    install_local_pool_spawner();
    let mut out = String::new();
    let _ = loom_reactive::scope::create_root(|| {
        let renderer = Renderer::<HtmlNode>::new();
        let instance = mount(move || f(&renderer));
        for _ in 0..max_passes {
            run_spawned_until_stalled();
            loom_reactive::tick();
        }
        out = instance
            .root_view()
            .flatten()
            .into_iter()
            .map(HtmlNode::serialize)
            .collect();
        instance.dispose();
    });
    out
}

/// Common imports for a binary that renders a `loom` app against this crate's DOM or SSR backend.
pub mod prelude {
    pub use loom_core::prelude::*;

    #[cfg(all(target_arch = "wasm32", not(loom_force_ssr)))]
    pub use crate::{document, render, render_to, DomNode};
    #[cfg(any(not(target_arch = "wasm32"), loom_force_ssr))]
    pub use crate::{render_to_string, render_to_string_await_suspense, HtmlNode};
}
