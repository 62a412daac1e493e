/*!
 * Scope Tree
 * One thread's tree of scope nodes with a push/pop cursor
 *
 * The cursor belongs to the owning thread. Structure mutations (push,
 * pop, aggregation walks) serialize on one mutex; counter updates on the
 * cursor node are lock-free so the allocation hot path never blocks.
 */

use crate::core::limits::{DEFAULT_THREAD_STACK_ESTIMATE, SECONDARY_ARENA_ESTIMATE};
use crate::core::types::{AllocKind, NodeId, ScopeName, Tid, NIL_NODE};
use crate::core::MtagError;
use crate::os;
use crate::pool::NodePool;
use crate::tree::node::{NodeCounters, NodeMeta};
use crate::tree::visit::{NodeView, TreeSnapshotInfo, TreeVisitor};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

struct TreeStructure {
    pool: NodePool<NodeMeta>,
    root: NodeId,
    levels_reached: u32,
}

impl TreeStructure {
    fn find_child_by_name(&self, parent: NodeId, name: &ScopeName) -> Option<NodeId> {
        self.pool
            .get(parent)
            .children()
            .iter()
            .copied()
            .find(|&c| self.pool.get(c).name == *name)
    }
}

pub struct ScopeTree {
    inner: Mutex<TreeStructure>,
    counters: Box<[NodeCounters]>,
    cursor: AtomicU32,
    cursor_level: AtomicU32,
    owner_tid: Tid,
    vm_size_at_creation: u64,
    max_tree_nodes: u32,
    max_tree_levels: u32,
    push_failures: AtomicU64,
    free_tracking_failures: AtomicU64,
}

impl ScopeTree {
    /// Builds the pool, the counter arena and the root node. The root is
    /// named after the calling thread's kernel name, so this must run on
    /// the owning thread. Allocates; callers keep hooks disabled.
    pub(crate) fn new(max_nodes: u32, max_levels: u32, is_main_thread: bool) -> Result<Self, MtagError> {
        let mut pool: NodePool<NodeMeta> = NodePool::new(max_nodes as usize);
        let counters: Box<[NodeCounters]> =
            (0..max_nodes).map(|_| NodeCounters::new()).collect();

        let root = pool.acquire().ok_or(MtagError::PoolExhausted)?;
        pool.get_mut(root).init(NIL_NODE, 0);
        pool.get_mut(root).name = os::current_thread_name();

        // Main thread pre-accounts what the loader mapped before the
        // profiler existed; secondary threads estimate their stack plus
        // allocator arena. Only used for kernel-VM reconciliation.
        let vm_size_at_creation = if is_main_thread {
            os::process_vm_size_bytes().unwrap_or(0)
        } else {
            os::current_thread_stack_size().unwrap_or(DEFAULT_THREAD_STACK_ESTIMATE)
                + SECONDARY_ARENA_ESTIMATE
        };

        Ok(Self {
            inner: Mutex::new(TreeStructure {
                pool,
                root,
                levels_reached: 0,
            }),
            counters,
            cursor: AtomicU32::new(root),
            cursor_level: AtomicU32::new(0),
            owner_tid: os::gettid(),
            vm_size_at_creation,
            max_tree_nodes: max_nodes,
            max_tree_levels: max_levels,
            push_failures: AtomicU64::new(0),
            free_tracking_failures: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn owner_tid(&self) -> Tid {
        self.owner_tid
    }

    #[inline]
    pub fn max_tree_nodes(&self) -> u32 {
        self.max_tree_nodes
    }

    #[inline]
    pub fn max_tree_levels(&self) -> u32 {
        self.max_tree_levels
    }

    pub fn push_failures(&self) -> u64 {
        self.push_failures.load(Ordering::Relaxed)
    }

    pub fn free_tracking_failures(&self) -> u64 {
        self.free_tracking_failures.load(Ordering::Relaxed)
    }

    pub fn nodes_in_use(&self) -> u32 {
        self.inner.lock().pool.in_use() as u32
    }

    /// Depth of the cursor below the root; equals the net number of
    /// successful pushes.
    pub fn cursor_level(&self) -> u32 {
        self.cursor_level.load(Ordering::Relaxed)
    }

    pub fn root_name(&self) -> ScopeName {
        let s = self.inner.lock();
        s.pool.get(s.root).name
    }

    /// Backing storage of this tree (the profiler's own footprint)
    pub fn memory_usage(&self) -> u64 {
        let pool_bytes = self.inner.lock().pool.memory_usage() as u64;
        pool_bytes + (self.counters.len() * std::mem::size_of::<NodeCounters>()) as u64
    }

    /// Moves the cursor one level down into the child named `name`,
    /// creating it on first use. Returns whether the cursor moved; a
    /// failed push must not be paired with a pop. Never allocates.
    pub fn push(&self, name: &ScopeName) -> bool {
        if self.cursor_level.load(Ordering::Relaxed) >= self.max_tree_levels {
            self.push_failures.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let mut s = self.inner.lock();
        let cur = self.cursor.load(Ordering::Relaxed);

        if let Some(existing) = s.find_child_by_name(cur, name) {
            let level = s.pool.get(existing).level;
            self.cursor.store(existing, Ordering::Relaxed);
            self.cursor_level.store(level, Ordering::Relaxed);
            return true;
        }

        let Some(id) = s.pool.acquire() else {
            drop(s);
            self.push_failures.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let level = s.pool.get(cur).level + 1;
        {
            let node = s.pool.get_mut(id);
            node.init(cur, level);
            node.name = *name;
        }
        if !s.pool.get_mut(cur).link_child(id) {
            s.pool.release(id);
            drop(s);
            self.push_failures.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.counters[id as usize].reset();
        s.levels_reached = s.levels_reached.max(level);
        self.cursor.store(id, Ordering::Relaxed);
        self.cursor_level.store(level, Ordering::Relaxed);
        true
    }

    /// Moves the cursor back to its parent, recording the visit on the
    /// node being left. Popping at the root is a programming error.
    /// Never allocates.
    pub fn pop(&self) {
        let s = self.inner.lock();
        let cur = self.cursor.load(Ordering::Relaxed);
        let parent = s.pool.get(cur).parent;
        debug_assert!(parent != NIL_NODE, "scope pop with cursor at tree root");
        if parent == NIL_NODE {
            return;
        }
        self.counters[cur as usize].record_leave();
        self.cursor.store(parent, Ordering::Relaxed);
        self.cursor_level.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn track_alloc(&self, kind: AllocKind, bytes: u64) {
        let idx = self.cursor.load(Ordering::Relaxed) as usize;
        self.counters[idx].record_alloc(kind, bytes);
    }

    #[inline]
    pub fn track_free(&self, bytes: u64) {
        let idx = self.cursor.load(Ordering::Relaxed) as usize;
        if !self.counters[idx].record_free(bytes) {
            self.free_tracking_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Aggregates the whole tree and returns the root's (allocated, freed)
    /// totals.
    pub fn totals(&self) -> (u64, u64) {
        let s = self.inner.lock();
        compute_totals(&s, &self.counters, s.root)
    }

    /// Freezes the tree, recomputes totals and weights (weights against
    /// `denominator`, normally the process-wide total so they compare
    /// across threads), then drives the visitor root-first.
    pub fn collect<V: TreeVisitor>(&self, denominator: u64, visitor: &mut V) {
        let s = self.inner.lock();
        let root = s.root;
        compute_totals(&s, &self.counters, root);
        compute_weights(&s, &self.counters, root, denominator);

        let info = TreeSnapshotInfo {
            tid: self.owner_tid,
            root_name: s.pool.get(root).name,
            levels_reached: s.levels_reached,
            nodes_in_use: s.pool.in_use() as u32,
            max_tree_nodes: self.max_tree_nodes,
            max_tree_levels: self.max_tree_levels,
            push_failures: self.push_failures(),
            free_tracking_failures: self.free_tracking_failures(),
            vm_size_at_creation: self.vm_size_at_creation,
            memory_usage: s.pool.memory_usage() as u64
                + (self.counters.len() * std::mem::size_of::<NodeCounters>()) as u64,
        };

        visitor.enter_tree(&info);
        visit_node(&s, &self.counters, root, self.owner_tid, visitor);
        visitor.exit_tree(&info);
    }
}

/// Post-order totals pass: a node's total is its self bytes plus the
/// totals of its children.
fn compute_totals(s: &TreeStructure, counters: &[NodeCounters], id: NodeId) -> (u64, u64) {
    let c = &counters[id as usize];
    let mut allocated = c.bytes_self_allocated();
    let mut freed = c.bytes_self_freed();
    for &child in s.pool.get(id).children() {
        let (a, f) = compute_totals(s, counters, child);
        allocated += a;
        freed += f;
    }
    c.store_totals(allocated, freed);
    (allocated, freed)
}

fn compute_weights(s: &TreeStructure, counters: &[NodeCounters], id: NodeId, denominator: u64) {
    counters[id as usize].store_weights(denominator);
    for &child in s.pool.get(id).children() {
        compute_weights(s, counters, child, denominator);
    }
}

fn visit_node<V: TreeVisitor>(
    s: &TreeStructure,
    counters: &[NodeCounters],
    id: NodeId,
    tid: Tid,
    visitor: &mut V,
) {
    let meta = s.pool.get(id);
    let view = NodeView {
        name: meta.name.as_str(),
        level: meta.level,
        tid,
        is_root: meta.parent == NIL_NODE,
        num_children: meta.num_children(),
        counters: counters[id as usize].snapshot(),
    };
    if visitor.enter_node(&view) {
        for &child in meta.children() {
            visit_node(s, counters, child, tid, visitor);
        }
    }
    visitor.exit_node(&view);
}
