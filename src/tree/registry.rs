/*!
 * Tree Registry
 * Process-wide directory of scope trees, one per observed thread
 *
 * Slots are reserved with an atomic counter and written once; trees are
 * never removed, so readers can traverse the registered prefix without a
 * lock. Slot 0 is the main thread's tree and its presence is the signal
 * that profiling is active.
 */

use crate::core::limits::MAX_TREES;
use crate::core::{MtagError, MtagResult};
use crate::hooks;
use crate::os;
use crate::tree::tree::ScopeTree;
use crate::tree::visit::{GlobalTotals, TreeVisitor};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct TreeRegistry {
    slots: [OnceLock<Arc<ScopeTree>>; MAX_TREES],
    count: AtomicUsize,
    shutdown: AtomicBool,
    start_unix: AtomicU64,
}

static REGISTRY: TreeRegistry = TreeRegistry::new();

/// The process-wide registry singleton
#[inline]
pub(crate) fn registry() -> &'static TreeRegistry {
    &REGISTRY
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TreeRegistry {
    const fn new() -> Self {
        Self {
            slots: [const { OnceLock::new() }; MAX_TREES],
            count: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            start_unix: AtomicU64::new(0),
        }
    }

    /// Profiling is active once the main tree exists
    #[inline]
    pub fn has_main_tree(&self) -> bool {
        self.slots[0].get().is_some()
    }

    pub fn main_tree(&self) -> Option<&Arc<ScopeTree>> {
        self.slots[0].get()
    }

    pub fn tree(&self, slot: usize) -> Option<&Arc<ScopeTree>> {
        self.slots.get(slot)?.get()
    }

    /// Registers the main thread's tree in slot 0 and stamps the profiling
    /// start time. Must be the first registration.
    pub fn register_main(
        &self,
        max_tree_nodes: u32,
        max_tree_levels: u32,
    ) -> MtagResult<&Arc<ScopeTree>> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(MtagError::RegistryShutDown);
        }
        self.count
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| MtagError::AlreadyInitialized)?;

        let tree = Arc::new(ScopeTree::new(max_tree_nodes, max_tree_levels, true)?);
        self.start_unix.store(unix_now(), Ordering::SeqCst);
        let _ = self.slots[0].set(tree);
        self.slots[0].get().ok_or(MtagError::NotInitialized)
    }

    /// Reserves the next slot for the calling thread's tree; limits are
    /// inherited from the main tree. Runs on the first allocation a new
    /// thread performs, so the caller keeps hooks disabled.
    pub fn register_secondary(&self) -> MtagResult<(usize, &Arc<ScopeTree>)> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(MtagError::RegistryShutDown);
        }
        let main = self.main_tree().ok_or(MtagError::NotInitialized)?;

        let idx = self.count.fetch_add(1, Ordering::SeqCst);
        if idx >= MAX_TREES {
            self.count.fetch_sub(1, Ordering::SeqCst);
            return Err(MtagError::RegistryFull(MAX_TREES));
        }

        let tree = Arc::new(ScopeTree::new(
            main.max_tree_nodes(),
            main.max_tree_levels(),
            false,
        )?);
        let _ = self.slots[idx].set(tree);
        let slot = self.slots[idx].get().ok_or(MtagError::NotInitialized)?;
        Ok((idx, slot))
    }

    /// All registered trees, in registration order. A slot whose tree
    /// creation failed mid-way is simply skipped.
    pub fn trees(&self) -> impl Iterator<Item = &Arc<ScopeTree>> {
        let n = self.count.load(Ordering::SeqCst).min(MAX_TREES);
        self.slots[..n].iter().filter_map(|s| s.get())
    }

    pub fn n_trees(&self) -> usize {
        self.trees().count()
    }

    /// The profiler's own footprint: the per-tree arenas dominate
    pub fn memory_usage(&self) -> u64 {
        self.trees().map(|t| t.memory_usage()).sum()
    }

    /// Sums (allocated, freed) root totals over every tree. Each tree
    /// aggregates under its own lock, so the cross-tree sum is
    /// approximate by design.
    pub fn collect_allocated_freed_all(&self) -> (u64, u64) {
        let mut allocated = 0u64;
        let mut freed = 0u64;
        for t in self.trees() {
            let (a, f) = t.totals();
            allocated += a;
            freed += f;
        }
        (allocated, freed)
    }

    /// One serialization pass: the process-wide total is computed first so
    /// every tree's weights share the same denominator, then each tree is
    /// frozen and walked, then the visitor gets the global totals.
    pub fn collect<V: TreeVisitor>(&self, visitor: &mut V) {
        let (total_allocated, total_freed) = self.collect_allocated_freed_all();
        for t in self.trees() {
            t.collect(total_allocated, visitor);
        }
        visitor.finish(&GlobalTotals {
            n_trees: self.n_trees(),
            pid: os::pid(),
            start_unix: self.start_unix.load(Ordering::SeqCst),
            now_unix: unix_now(),
            bytes_before_init: hooks::bytes_allocated_before_init(),
            profiler_self_usage: self.memory_usage(),
            vm_size_bytes: os::process_vm_size_bytes().unwrap_or(0),
            vm_rss_bytes: os::process_vm_rss_bytes().unwrap_or(0),
            total_tracked_allocated: total_allocated,
            total_tracked_freed: total_freed,
        });
    }

    /// Rejects registrations from late-starting threads during teardown
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn start_unix(&self) -> u64 {
        self.start_unix.load(Ordering::SeqCst)
    }
}
