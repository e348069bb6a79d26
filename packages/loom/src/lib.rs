//! # Loom
//!
//! Loom is a retained-mode reactive UI runtime: a signal graph with glitch-free batching, a
//! component runtime built on disposal scopes, and a renderer-agnostic set of control-flow
//! primitives (`If`, `For`, `Fn`, `Async`, `Suspense`, `Portal`, `Cache`, ...) that any host —
//! the live DOM, an HTML string, or a custom node graph — plugs into by implementing one trait,
//! [`node_ops::NodeOps`].
//!
//! This crate is a thin re-export shell over three lower-level crates, the same way `sycamore`
//! is a shell over `sycamore-reactive`/`sycamore-core`/`sycamore-web`:
//!
//! - [`loom_reactive`] — the signal graph (re-exported as [`reactive`]).
//! - [`loom_core`] — the component runtime, renderer contract, and control-flow primitives.
//! - [`loom_web`] — concrete DOM and HTML-string renderer backends (re-exported as [`web`], only
//!   with the `dom` or `ssr` feature enabled).
//!
//! ## Feature flags
//!
//! - `dom` (default) — enables the live-DOM backend ([`loom_web::DomNode`]) and the top-level
//!   [`render`]/[`render_to`] entry points.
//! - `ssr` — enables the HTML-string backend ([`loom_web::HtmlNode`]) and [`render_to_string`].
//! - `serde` — enables serializing and deserializing [`reactive::Signal`]s, forwarded to
//!   `loom-reactive`.
//!
//! ## Example
//!
//! ```
//! use loom::prelude::*;
//!
//! create_root(|| {
//!     let count = create_signal(0);
//!     let doubled = create_memo(move || count.get() * 2);
//!     count.set(21);
//!     assert_eq!(doubled.get(), 42);
//! });
//! ```

/// Reactive primitives for Loom: signals, computeds, effects, and disposal scopes.
///
/// Re-export of the [`loom_reactive`] crate.
pub mod reactive {
    pub use loom_reactive::*;
}

pub use loom_core::{component, control_flow, node_ops, node_ref, props, reconcile, renderer, spawn, view};

/// DOM and HTML-string rendering backends.
///
/// Re-export of the [`loom_web`] crate.
#[cfg(any(feature = "dom", feature = "ssr"))]
pub mod web {
    pub use loom_web::*;
}

#[cfg(all(feature = "dom", target_arch = "wasm32", not(loom_force_ssr)))]
pub use loom_web::{document, render, render_to};
#[cfg(all(feature = "ssr", any(not(target_arch = "wasm32"), loom_force_ssr)))]
pub use loom_web::{render_to_string, render_to_string_await_suspense};

/// The Loom prelude.
///
/// In most cases, it is idiomatic to use a glob import at the top of a file that builds UI:
///
/// ```rust
/// use loom::prelude::*;
/// ```
pub mod prelude {
    pub use loom_core::prelude::*;

    #[cfg(all(feature = "dom", target_arch = "wasm32", not(loom_force_ssr)))]
    pub use loom_web::{document, render, render_to, DomNode};
    #[cfg(all(feature = "ssr", any(not(target_arch = "wasm32"), loom_force_ssr)))]
    pub use loom_web::{render_to_string, render_to_string_await_suspense, HtmlNode};
}
