//! Control-flow primitives (spec §4.4–§4.8): reactive swaps of subtrees with correct disposal,
//! keyed/unkeyed list reconciliation, async boundaries, and instance reuse. Each submodule is a
//! free function (or small handle type) over [`crate::view::View`] — there is no macro layer
//! here; a JSX-like call site is expected to call these directly.

mod async_;
mod cache;
mod fn_;
mod for_;
mod if_;
mod lazy;
mod memo;
mod parse;
mod portal;
mod suspense;
mod transition;

pub use async_::async_view;
pub use cache::{create_cache, CacheHandle, WeakCacheHandle};
pub use fn_::fn_view;
pub use for_::{for_view, for_view_by_identity, refresh_entries, unkeyed_view, ForHandle, Track};
pub use if_::if_view;
pub use lazy::lazy_view;
pub use memo::{memo, use_memo};
pub use parse::parse_view;
pub use portal::PortalPair;
pub use suspense::suspense_view;
pub use transition::{Transition, TransitionPhase};
