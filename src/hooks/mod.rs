/*!
 * Interception Layer
 * Routes observed allocation events to the per-thread scope tree
 *
 * Decisions made on every event, in order: is the gate open on this
 * thread, is profiling active at all (main tree registered), does this
 * thread have a tree yet. The first allocation a thread performs creates
 * its tree lazily, with the gate closed so none of the registration's own
 * allocations are counted.
 */

mod allocator;
mod gate;

pub use allocator::ScopeAlloc;
pub use gate::HookGuard;

pub(crate) use gate::{current_slot, hooks_enabled, set_current_slot};

use crate::core::types::AllocKind;
use crate::tree::{registry, ScopeTree};
use gate::{SLOT_NONE, SLOT_UNINSTRUMENTED};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes observed before the main tree existed; surfaced in stats but
/// attributed to no scope.
static BYTES_BEFORE_INIT: AtomicU64 = AtomicU64::new(0);

pub(crate) fn bytes_allocated_before_init() -> u64 {
    BYTES_BEFORE_INIT.load(Ordering::Relaxed)
}

/// The calling thread's tree, if it already has one.
pub(crate) fn current_tree() -> Option<&'static ScopeTree> {
    match current_slot() {
        SLOT_NONE | SLOT_UNINSTRUMENTED => None,
        slot => registry().tree(slot as usize).map(|t| t.as_ref()),
    }
}

/// The calling thread's tree, registering one on first use. A failed
/// registration (registry full, out of memory) marks the thread
/// uninstrumented for the rest of its life.
pub(crate) fn current_tree_or_register() -> Option<&'static ScopeTree> {
    match current_slot() {
        SLOT_UNINSTRUMENTED => None,
        SLOT_NONE => {
            if !registry().has_main_tree() {
                return None;
            }
            let _hooks_off = HookGuard::new();
            match registry().register_secondary() {
                Ok((slot, tree)) => {
                    set_current_slot(slot as u32);
                    Some(tree.as_ref())
                }
                Err(e) => {
                    set_current_slot(SLOT_UNINSTRUMENTED);
                    log::warn!("thread left uninstrumented: {e}");
                    None
                }
            }
        }
        slot => registry().tree(slot as usize).map(|t| t.as_ref()),
    }
}

/// Allocation path: the real allocator already served the request; record
/// the usable size against the current scope (or the pre-init counter).
#[inline]
pub(crate) fn on_alloc(kind: AllocKind, usable: u64) {
    if !hooks_enabled() {
        return;
    }
    if !registry().has_main_tree() {
        BYTES_BEFORE_INIT.fetch_add(usable, Ordering::Relaxed);
        return;
    }
    if let Some(tree) = current_tree_or_register() {
        tree.track_alloc(kind, usable);
    }
}

/// Free path: no lazy tree creation here; a thread that never allocated
/// has nothing to balance.
#[inline]
pub(crate) fn on_free(usable: u64) {
    if !hooks_enabled() {
        return;
    }
    if let Some(tree) = current_tree() {
        tree.track_free(usable);
    }
}
