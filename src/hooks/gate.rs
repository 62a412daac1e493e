/*!
 * Hook Gate
 * Thread-local switch deciding whether allocation events are recorded
 *
 * The gate protects against re-entry: any allocation the profiler makes
 * for itself (tree creation, serialization, snapshot I/O) runs under a
 * `HookGuard` and is invisible to the counters. Guards save and restore
 * the previous state so nesting whole regions is safe.
 */

use std::cell::Cell;
use std::marker::PhantomData;

/// "this thread has no tree yet"
pub(crate) const SLOT_NONE: u32 = u32::MAX;
/// "registration failed; this thread stays uninstrumented"
pub(crate) const SLOT_UNINSTRUMENTED: u32 = u32::MAX - 1;

thread_local! {
    static HOOKS_ENABLED: Cell<bool> = const { Cell::new(true) };
    static CURRENT_TREE_SLOT: Cell<u32> = const { Cell::new(SLOT_NONE) };
}

/// Whether allocation events on this thread are currently recorded.
/// A thread whose TLS is already torn down reads as disabled.
#[inline]
pub(crate) fn hooks_enabled() -> bool {
    HOOKS_ENABLED.try_with(Cell::get).unwrap_or(false)
}

#[inline]
pub(crate) fn current_slot() -> u32 {
    CURRENT_TREE_SLOT
        .try_with(Cell::get)
        .unwrap_or(SLOT_UNINSTRUMENTED)
}

#[inline]
pub(crate) fn set_current_slot(slot: u32) {
    let _ = CURRENT_TREE_SLOT.try_with(|c| c.set(slot));
}

/// RAII token disabling allocation tracking on the current thread for its
/// lifetime. Restores the previous state on drop, so disablers nest.
pub struct HookGuard {
    prev: bool,
    // the saved state belongs to this thread's gate
    _not_send: PhantomData<*const ()>,
}

impl HookGuard {
    pub fn new() -> Self {
        let prev = HOOKS_ENABLED
            .try_with(|c| {
                let prev = c.get();
                c.set(false);
                prev
            })
            .unwrap_or(false);
        Self {
            prev,
            _not_send: PhantomData,
        }
    }
}

impl Default for HookGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        let _ = HOOKS_ENABLED.try_with(|c| c.set(self.prev));
    }
}
