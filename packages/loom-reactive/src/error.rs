//! Error types surfaced by the signal graph and scheduler.

use thiserror::Error;

/// Errors that can occur while driving the reactive graph.
///
/// Most signal-graph misuse (reading a disposed signal, duplicate context) is deliberately a
/// panic rather than a `Result`, matching the teacher library's convention that these are
/// programmer errors caught during development. `LoomError` exists for the subset of failures
/// that a long-running app legitimately wants to catch at a boundary: a runaway flush, or a
/// render error bubbling up through `Fn`'s `catch` handler.
#[derive(Debug, Clone, Error)]
pub enum LoomError {
    /// A signal was read or written after the scope that owns it was disposed.
    #[error("reactive scope for signal already destroyed\nsignal created at {signal_loc}\ninside scope created at {scope_loc}")]
    ScopeDisposed {
        signal_loc: String,
        scope_loc: String,
    },
    /// The effect scheduler exceeded its re-entrancy budget while flushing pending effects,
    /// which almost always means two effects are each other's dependency in a way that never
    /// settles.
    #[error("runaway reactive flush: exceeded {max_passes} passes, {pending} effects still pending")]
    RunawayFlush { max_passes: u32, pending: usize },
    /// A `$ref` was set but has no reactive scope to tie its lifetime to (used outside of a
    /// component's render).
    #[error("node ref was assigned outside of a mounted component scope")]
    RefWithoutParent,
    /// A component template, or a `Fn`/`Async` handler, panicked during setup or a reactive
    /// re-run. Caught at the nearest enclosing error boundary rather than unwinding past the
    /// scheduler, matching the setup-error/render-error handling in the spec's error model.
    #[error("setup panicked: {message}")]
    SetupPanicked { message: String },
    /// A reconciler invariant was violated in a way that is tolerated rather than fatal (e.g. a
    /// duplicate key in `For`): first occurrence wins, logged via `tracing::warn!` rather than
    /// surfaced as an error to the caller.
    #[error("reconciler invariant violated: {0}")]
    ReconcilerWarning(String),
}

impl LoomError {
    /// Builds a [`LoomError::SetupPanicked`] from a caught panic payload (as produced by
    /// [`std::panic::catch_unwind`]), recovering the message when it is a `&str` or `String`.
    pub fn from_panic_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        LoomError::SetupPanicked { message }
    }
}
