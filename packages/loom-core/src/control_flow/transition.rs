//! `Transition` — the entering/leaving/pending/entered state machine behind animated swaps
//! (spec §4.7). Animation itself (CSS classes, `requestAnimationFrame` choreography) is host
//! specific and lives in `loom-web`'s macros; only the state machine is part of the core.

use loom_reactive::signal::{create_signal, Signal};

/// The phase of one `Transition`-managed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// No swap in progress; the current content is fully settled.
    Entered,
    /// A new subtree has just been mounted and is animating into place.
    Entering,
    /// The previous subtree is animating out; it is still mounted but on its way to removal.
    Leaving,
}

/// A handle to a single `Transition`'s state machine. Cloning shares the same underlying signals
/// (cheap, `Copy`-like handle), the way [`loom_reactive::Signal`] itself is shared.
#[derive(Clone, Copy)]
pub struct Transition {
    phase: Signal<TransitionPhase>,
    queued: Signal<bool>,
}

impl Transition {
    pub fn new() -> Self {
        Self {
            phase: create_signal(TransitionPhase::Entered),
            queued: create_signal(false),
        }
    }

    /// The current phase, reactive: read it from an effect to drive animation classes.
    pub fn phase(&self) -> TransitionPhase {
        self.phase.get()
    }

    /// Whether a swap has been requested but is still queued behind an in-flight one, reactive: a
    /// host can read this alongside [`Transition::phase`] to drive a "pending" animation class
    /// while the current swap finishes.
    pub fn is_queued(&self) -> bool {
        self.queued.get()
    }

    /// Requests a swap. If one is already in flight, the request is recorded as queued and
    /// re-issued once the in-flight swap reaches [`TransitionPhase::Entered`].
    pub fn start(&self) {
        match self.phase.peek_clone() {
            TransitionPhase::Entered => self.phase.set(TransitionPhase::Entering),
            _ => self.queued.set(true),
        }
    }

    /// Advances the state machine one step: `Entering` -> `Leaving` -> `Entered`, at which point
    /// a queued request (if any) immediately starts a new cycle. Called by the host renderer's
    /// animation-frame/transition-end callback, not by application code directly.
    pub fn advance(&self) {
        let next = match self.phase.peek_clone() {
            TransitionPhase::Entering => TransitionPhase::Leaving,
            TransitionPhase::Leaving => TransitionPhase::Entered,
            TransitionPhase::Entered => TransitionPhase::Entered,
        };
        self.phase.set(next);
        if next == TransitionPhase::Entered && self.queued.peek_clone() {
            self.queued.set(false);
            self.phase.set(TransitionPhase::Entering);
        }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use loom_reactive::scope::create_root;

    use super::*;

    #[test]
    fn advances_through_the_full_cycle() {
        let _ = create_root(|| {
            let t = Transition::new();
            assert_eq!(t.phase(), TransitionPhase::Entered);
            t.start();
            assert_eq!(t.phase(), TransitionPhase::Entering);
            t.advance();
            assert_eq!(t.phase(), TransitionPhase::Leaving);
            t.advance();
            assert_eq!(t.phase(), TransitionPhase::Entered);
        });
    }

    #[test]
    fn queues_a_request_started_mid_transition() {
        let _ = create_root(|| {
            let t = Transition::new();
            t.start();
            t.start(); // queued, since the first is already entering
            t.advance(); // -> Leaving
            t.advance(); // -> Entered, then immediately re-enters the queued request
            assert_eq!(t.phase(), TransitionPhase::Entering);
        });
    }

    #[test]
    fn is_queued_reflects_a_request_waiting_behind_an_in_flight_swap() {
        let _ = create_root(|| {
            let t = Transition::new();
            assert!(!t.is_queued());
            t.start();
            assert!(!t.is_queued()); // first request starts immediately, nothing queued
            t.start();
            assert!(t.is_queued()); // second request waits behind it
            t.advance(); // -> Leaving
            assert!(t.is_queued());
            t.advance(); // -> Entered, queued request consumed and re-started
            assert!(!t.is_queued());
        });
    }
}
