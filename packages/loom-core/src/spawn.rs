//! A pluggable "spawn a `!Send` future, tied to the current disposal scope" contract.
//!
//! Grounded on `sycamore-futures::spawn_local_scoped` (`futures::future::abortable` + an
//! `on_cleanup` that aborts the handle), generalized away from that crate's
//! `wasm_bindgen_futures`/`tokio::task::spawn_local` split: rather than `loom-core` depending on
//! either executor directly, a host (`loom-web`'s DOM backend, or a test harness) registers a
//! spawner once via [`set_spawner`]. This is what lets `Async`/`Suspense`/`Lazy`/`Transition` live
//! in `loom-core` without `loom-core` knowing whether it's running under wasm or tokio.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use futures::future::abortable;

use loom_reactive::scope::on_cleanup;

type BoxedFuture = Pin<Box<dyn Future<Output = ()>>>;

thread_local! {
    static SPAWNER: RefCell<Option<Rc<dyn Fn(BoxedFuture)>>> = const { RefCell::new(None) };
}

/// Registers the function used to actually poll spawned futures to completion. Call once at
/// startup; `loom-web`'s `dom` feature does this with `wasm_bindgen_futures::spawn_local`, its
/// `ssr` feature (and test harnesses) with `tokio::task::spawn_local`.
pub fn set_spawner(spawner: impl Fn(BoxedFuture) + 'static) {
    SPAWNER.with(|cell| *cell.borrow_mut() = Some(Rc::new(spawner)));
}

/// Spawns `f` on the current scope. If the scope is disposed before `f` completes, it is aborted
/// immediately — this is what makes `Async`'s cancellation guarantee (spec §4.7, testable
/// property 7) hold: a disposed `Async` instance's pending future can never resolve into writes.
///
/// # Panics
/// Panics if no spawner has been registered via [`set_spawner`].
pub fn spawn_local_scoped(f: impl Future<Output = ()> + 'static) {
    let (task, handle) = abortable(f);
    on_cleanup(move || handle.abort());
    SPAWNER.with(|cell| {
        let spawner = cell
            .borrow()
            .clone()
            .expect("no spawner registered; call loom_web's install function first");
        spawner(Box::pin(async move {
            let _ = task.await;
        }));
    });
}
