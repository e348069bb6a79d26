//! The reactive signal graph underlying `loom`.
//!
//! This crate has no idea what a "node" or a "component" is — it only knows about signals,
//! effects, computed values, disposal scopes and context. [`loom_core`](../loom_core/index.html)
//! builds the renderer-facing runtime on top of it, the same way `sycamore-core` builds on
//! `sycamore-reactive`.
//!
//! # Example
//! ```
//! use loom_reactive::prelude::*;
//!
//! create_root(|| {
//!     let count = create_signal(0);
//!     let double = create_memo(move || count.get() * 2);
//!     assert_eq!(double.get(), 0);
//!     count.set(21);
//!     assert_eq!(double.get(), 42);
//! });
//! ```

pub mod batch;
pub mod effect;
pub mod error;
pub mod maybe_signal;
pub mod scope;
pub mod signal;

/// Re-exports of the commonly used items, the way `sycamore_reactive::*` does for its users.
pub mod prelude {
    pub use crate::batch::{batch, next_tick, tick};
    pub use crate::effect::{create_effect, create_memo, create_selector, create_selector_with, untrack, Memo};
    pub use crate::error::LoomError;
    pub use crate::maybe_signal::{read, MaybeSignal};
    pub use crate::scope::{
        create_child_scope, create_root, current_scope, on_cleanup, provide_context, scope_depth,
        try_use_context, use_context, ReactiveScope,
    };
    pub use crate::signal::{create_signal, Signal};
    pub use crate::t;
}

pub use prelude::*;
