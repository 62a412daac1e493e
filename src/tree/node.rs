/*!
 * Tree Node
 * Per-scope metadata and counters
 *
 * A node is split in two: `NodeMeta` is the tree structure (name, level,
 * links) and only ever changes under the tree's structural mutex;
 * `NodeCounters` are plain relaxed atomics so the owning thread can bump
 * them on every allocation without taking any lock. Readers aggregating
 * under the mutex may observe counters a few events stale; aggregated
 * totals are approximations by contract.
 */

use crate::core::limits::{MAX_CHILDREN, WEIGHT_MULTIPLIER};
use crate::core::types::{AllocKind, NodeId, ScopeName, NIL_NODE};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tree structure of one scope node. Guarded by the tree's structural lock.
#[derive(Clone)]
pub struct NodeMeta {
    pub name: ScopeName,
    pub level: u32,
    pub parent: NodeId,
    children: [NodeId; MAX_CHILDREN],
    num_children: u8,
}

impl Default for NodeMeta {
    fn default() -> Self {
        Self {
            name: ScopeName::empty(),
            level: 0,
            parent: NIL_NODE,
            children: [NIL_NODE; MAX_CHILDREN],
            num_children: 0,
        }
    }
}

impl NodeMeta {
    pub fn init(&mut self, parent: NodeId, level: u32) {
        self.name = ScopeName::empty();
        self.level = level;
        self.parent = parent;
        self.children = [NIL_NODE; MAX_CHILDREN];
        self.num_children = 0;
    }

    /// Appends a child id; fails when the fanout bound is hit.
    pub fn link_child(&mut self, child: NodeId) -> bool {
        if (self.num_children as usize) < MAX_CHILDREN {
            self.children[self.num_children as usize] = child;
            self.num_children += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children[..self.num_children as usize]
    }

    #[inline]
    pub fn num_children(&self) -> u32 {
        u32::from(self.num_children)
    }
}

/// Hot-path counters of one scope node.
///
/// `bytes_total_*` and `weight_*` are derived fields, written by the
/// aggregation pass and meaningful only while the structural lock is held.
pub struct NodeCounters {
    bytes_self_allocated: AtomicU64,
    bytes_self_freed: AtomicU64,
    calls: [AtomicU64; AllocKind::COUNT],
    visits: AtomicU64,
    bytes_total_allocated: AtomicU64,
    bytes_total_freed: AtomicU64,
    weight_total: AtomicU64,
    weight_self: AtomicU64,
}

impl NodeCounters {
    pub fn new() -> Self {
        Self {
            bytes_self_allocated: AtomicU64::new(0),
            bytes_self_freed: AtomicU64::new(0),
            calls: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
            visits: AtomicU64::new(0),
            bytes_total_allocated: AtomicU64::new(0),
            bytes_total_freed: AtomicU64::new(0),
            weight_total: AtomicU64::new(0),
            weight_self: AtomicU64::new(0),
        }
    }

    /// Zero everything; used when a pool slot is (re)acquired.
    pub fn reset(&self) {
        self.bytes_self_allocated.store(0, Ordering::Relaxed);
        self.bytes_self_freed.store(0, Ordering::Relaxed);
        for c in &self.calls {
            c.store(0, Ordering::Relaxed);
        }
        self.visits.store(0, Ordering::Relaxed);
        self.bytes_total_allocated.store(0, Ordering::Relaxed);
        self.bytes_total_freed.store(0, Ordering::Relaxed);
        self.weight_total.store(0, Ordering::Relaxed);
        self.weight_self.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alloc(&self, kind: AllocKind, bytes: u64) {
        self.bytes_self_allocated.fetch_add(bytes, Ordering::Relaxed);
        self.calls[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Adds to the freed counter and reports whether the node's net bytes
    /// are still non-negative. A `false` return means this free could not
    /// be balanced against allocations attributed here (the block's home
    /// scope is elsewhere); net accessors clamp at zero.
    #[inline]
    pub fn record_free(&self, bytes: u64) -> bool {
        self.calls[AllocKind::Free.index()].fetch_add(1, Ordering::Relaxed);
        let allocated = self.bytes_self_allocated.load(Ordering::Relaxed);
        let freed = self.bytes_self_freed.fetch_add(bytes, Ordering::Relaxed);
        freed + bytes <= allocated
    }

    /// Called exactly when the cursor exits this node
    #[inline]
    pub fn record_leave(&self) {
        self.visits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn bytes_self_allocated(&self) -> u64 {
        self.bytes_self_allocated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_self_freed(&self) -> u64 {
        self.bytes_self_freed.load(Ordering::Relaxed)
    }

    pub fn store_totals(&self, allocated: u64, freed: u64) {
        self.bytes_total_allocated.store(allocated, Ordering::Relaxed);
        self.bytes_total_freed.store(freed, Ordering::Relaxed);
    }

    pub fn bytes_total_allocated(&self) -> u64 {
        self.bytes_total_allocated.load(Ordering::Relaxed)
    }

    pub fn bytes_total_freed(&self) -> u64 {
        self.bytes_total_freed.load(Ordering::Relaxed)
    }

    /// Weights are fractions of `denominator` scaled by `WEIGHT_MULTIPLIER`;
    /// with a zero denominator both weights are zero.
    pub fn store_weights(&self, denominator: u64) {
        let (total, own) = if denominator > 0 {
            (
                WEIGHT_MULTIPLIER * self.bytes_total_allocated() / denominator,
                WEIGHT_MULTIPLIER * self.bytes_self_allocated() / denominator,
            )
        } else {
            (0, 0)
        };
        self.weight_total.store(total, Ordering::Relaxed);
        self.weight_self.store(own, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let mut calls = [0u64; AllocKind::COUNT];
        for (dst, src) in calls.iter_mut().zip(&self.calls) {
            *dst = src.load(Ordering::Relaxed);
        }
        CounterSnapshot {
            bytes_self_allocated: self.bytes_self_allocated(),
            bytes_self_freed: self.bytes_self_freed(),
            bytes_total_allocated: self.bytes_total_allocated(),
            bytes_total_freed: self.bytes_total_freed(),
            weight_total: self.weight_total.load(Ordering::Relaxed),
            weight_self: self.weight_self.load(Ordering::Relaxed),
            visits: self.visits.load(Ordering::Relaxed),
            calls,
        }
    }
}

/// Plain-value copy of one node's counters, handed to visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub bytes_self_allocated: u64,
    pub bytes_self_freed: u64,
    pub bytes_total_allocated: u64,
    pub bytes_total_freed: u64,
    pub weight_total: u64,
    pub weight_self: u64,
    pub visits: u64,
    pub calls: [u64; AllocKind::COUNT],
}

impl CounterSnapshot {
    /// Self bytes still held by this scope, clamped at zero: a scope that
    /// frees blocks allocated elsewhere never reports negative usage.
    pub fn net_self_bytes(&self) -> u64 {
        self.bytes_self_allocated.saturating_sub(self.bytes_self_freed)
    }

    /// Subtree bytes still held, clamped at zero.
    pub fn net_total_bytes(&self) -> u64 {
        self.bytes_total_allocated.saturating_sub(self.bytes_total_freed)
    }

    #[inline]
    pub fn calls_to(&self, kind: AllocKind) -> u64 {
        self.calls[kind.index()]
    }
}
