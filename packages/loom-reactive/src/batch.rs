//! Glitch-free batched flush.
//!
//! Every signal write queues its dependents rather than running them inline — [`crate::signal`]'s
//! `notify` always calls [`enqueue`]. [`batch`] (and the scheduler-driven [`next_tick`]) exist to
//! widen the window that gets coalesced into one flush: writes made while a batch is active share
//! the same pending queue and are drained exactly once when the outermost batch exits, rather
//! than settling on the next signal read. Outside of an explicit `batch`, the queue still drains
//! itself automatically the next time anything reads a signal (see [`maybe_auto_flush`]), so two
//! bare sequential writes in the same synchronous task are never observed in an inconsistent
//! in-between state — callers don't have to remember to wrap them in `batch` to get glitch-free
//! reads, only to widen the coalescing window across multiple statements.
//!
//! Grounded on `leptos_reactive::runtime`'s `pending_effects`/`batching` fields and
//! `run_effects` loop, adapted from its `NodeId`/`SlotMap` graph-coloring scheduler onto this
//! crate's `IndexMap`-of-dependents signal model.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::effect::{EffectState, EffectStatePtr};
use crate::error::LoomError;

/// Effects are normally re-run at most this many times while flushing a single batch before the
/// scheduler gives up and reports a [`LoomError::RunawayFlush`]. A legitimate app settles in a
/// handful of passes; anything north of this is almost certainly two effects perpetually
/// re-triggering each other.
const MAX_FLUSH_PASSES: u32 = 1000;

thread_local! {
    static BATCH_DEPTH: Cell<u32> = const { Cell::new(0) };
    static PENDING: RefCell<IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>> =
        RefCell::new(IndexMap::new());
    static AFTER_FLUSH: RefCell<Vec<Box<dyn FnOnce()>>> = const { RefCell::new(Vec::new()) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
}

/// Returns `true` if a [`batch`] is currently active, i.e. signal writes are being coalesced into
/// one wider flush rather than draining as soon as something reads.
pub(crate) fn is_batching() -> bool {
    BATCH_DEPTH.with(|d| d.get() > 0)
}

/// Returns `true` while a [`flush`] is already draining `PENDING`, so a read triggered from
/// inside a running dependent doesn't recursively re-enter the drain loop.
pub(crate) fn is_flushing() -> bool {
    FLUSHING.with(Cell::get)
}

/// Queues `dependents` to run on the next flush. Called unconditionally by every
/// [`crate::signal::Signal::set`]/[`update`](crate::signal::Signal::update)/[`trigger`](crate::signal::Signal::trigger)
/// — nothing dispatches a dependent inline anymore, whether or not a [`batch`] is active.
pub(crate) fn enqueue(
    dependents: IndexMap<EffectStatePtr, Weak<RefCell<Option<EffectState>>>>,
) {
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        for (ptr, effect) in dependents {
            pending.entry(ptr).or_insert(effect);
        }
    });
}

/// Drains `PENDING` if anything is queued and no wider batch or flush is already in progress.
/// Called from [`crate::signal::Signal`]'s read path so that, absent an explicit [`batch`], the
/// graph settles by the time any caller actually observes a value — giving bare sequential writes
/// the same glitch-free guarantee an explicit `batch` gives a wrapped block.
pub(crate) fn maybe_auto_flush() {
    if is_batching() || is_flushing() {
        return;
    }
    if PENDING.with(|p| !p.borrow().is_empty()) {
        flush();
    }
}

/// Runs `f`, coalescing every signal write made during it into a single flush at the end.
///
/// Nested calls to `batch` share the outermost batch's queue; only the outermost call triggers
/// a flush. Returns `f`'s return value.
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    BATCH_DEPTH.with(|d| d.set(d.get() + 1));
    let result = f();
    let is_outermost = BATCH_DEPTH.with(|d| {
        let depth = d.get() - 1;
        d.set(depth);
        depth == 0
    });
    if is_outermost {
        flush();
    }
    result
}

/// Forces an immediate flush of any effects queued by a batch, without waiting for the batch to
/// end. No-op if nothing is pending.
pub fn tick() {
    flush();
}

/// Schedules `f` to run once, after the current flush (if any) completes. If no flush is
/// currently in progress, `f` runs immediately. This is the microtask-granularity `nextTick`
/// hook used by view-layer code that needs to read post-update DOM state.
pub fn next_tick(f: impl FnOnce() + 'static) {
    if is_batching() || PENDING.with(|p| !p.borrow().is_empty()) {
        AFTER_FLUSH.with(|q| q.borrow_mut().push(Box::new(f)));
    } else {
        f();
    }
}

/// Clears [`FLUSHING`] on drop so a panic unwinding out of a dependent's callback doesn't leave
/// the flag stuck, which would wedge [`maybe_auto_flush`] forever.
struct FlushGuard;
impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|f| f.set(false));
    }
}

fn flush() {
    if is_flushing() {
        // Already draining further up the call stack; that loop's next pass will pick up
        // whatever is pending now.
        return;
    }
    FLUSHING.with(|f| f.set(true));
    let _guard = FlushGuard;
    let mut passes = 0;
    loop {
        let batch = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if batch.is_empty() {
            break;
        }
        passes += 1;
        if passes > MAX_FLUSH_PASSES {
            let pending_count = PENDING.with(|p| p.borrow().len());
            tracing::error!(
                max_passes = MAX_FLUSH_PASSES,
                pending = pending_count,
                "{}",
                LoomError::RunawayFlush {
                    max_passes: MAX_FLUSH_PASSES,
                    pending: pending_count,
                }
            );
            PENDING.with(|p| p.borrow_mut().clear());
            break;
        }
        // Outer effects first, matching the unbatched (eager) re-run order.
        for dependent in batch.values().rev() {
            if let Some(effect) = dependent.upgrade() {
                let callback = Rc::clone(&effect.borrow().as_ref().unwrap().callback);
                callback.borrow_mut()();
            }
        }
    }

    let callbacks = AFTER_FLUSH.with(|q| std::mem::take(&mut *q.borrow_mut()));
    for cb in callbacks {
        cb();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::create_effect;
    use crate::scope::create_root;
    use crate::signal::create_signal;

    #[test]
    fn batch_coalesces_multiple_writes_into_one_run() {
        let _ = create_root(|| {
            let a = create_signal(1);
            let b = create_signal(2);
            let runs = create_signal(0);
            let sum = create_signal(0);
            create_effect(move || {
                sum.set(a.get() + b.get());
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);

            batch(|| {
                a.set(10);
                b.set(20);
            });

            assert_eq!(sum.get(), 30);
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn nested_batches_flush_once() {
        let _ = create_root(|| {
            let a = create_signal(0);
            let runs = create_signal(0);
            create_effect(move || {
                a.get();
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);

            batch(|| {
                batch(|| {
                    a.set(1);
                });
                a.set(2);
            });
            assert_eq!(runs.get(), 2);
        });
    }

    #[test]
    fn next_tick_runs_after_pending_flush() {
        let _ = create_root(|| {
            let order = create_signal(Vec::<&'static str>::new());
            let a = create_signal(0);
            create_effect(move || {
                a.get();
                order.update(|v| v.push("effect"));
            });
            batch(|| {
                a.set(1);
                next_tick(move || order.update(|v| v.push("tick")));
            });
            assert_eq!(order.get_clone(), vec!["effect", "effect", "tick"]);
        });
    }

    #[test]
    fn bare_writes_without_batch_still_coalesce() {
        let _ = create_root(|| {
            let a = create_signal(1);
            let b = create_signal(2);
            let runs = create_signal(0);
            let sum = create_signal(0);
            create_effect(move || {
                sum.set(a.get() + b.get());
                runs.set(runs.peek_clone() + 1);
            });
            assert_eq!(runs.get(), 1);

            // No `batch` wrapper here — the default write path still queues, and the effect
            // doesn't drain until something actually reads, so it sees both writes at once.
            a.set(10);
            b.set(20);

            assert_eq!(sum.get(), 30);
            assert_eq!(runs.get(), 2);
        });
    }
}
