/*!
 * Visitor Contract
 * Read-only snapshot interface the output emitters consume
 *
 * The tree drives a visitor over its frozen structure while holding the
 * structural lock; emitters never see live nodes, only value snapshots.
 */

use crate::core::types::{ScopeName, Tid};
use crate::tree::node::CounterSnapshot;

/// Per-tree header handed to `enter_tree`/`exit_tree`
#[derive(Debug, Clone)]
pub struct TreeSnapshotInfo {
    pub tid: Tid,
    pub root_name: ScopeName,
    pub levels_reached: u32,
    pub nodes_in_use: u32,
    pub max_tree_nodes: u32,
    pub max_tree_levels: u32,
    pub push_failures: u64,
    pub free_tracking_failures: u64,
    pub vm_size_at_creation: u64,
    pub memory_usage: u64,
}

/// One node of the frozen tree
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub name: &'a str,
    pub level: u32,
    pub tid: Tid,
    pub is_root: bool,
    pub num_children: u32,
    pub counters: CounterSnapshot,
}

/// Process-wide figures delivered once, after every tree was visited
#[derive(Debug, Clone)]
pub struct GlobalTotals {
    pub n_trees: usize,
    pub pid: u32,
    pub start_unix: u64,
    pub now_unix: u64,
    pub bytes_before_init: u64,
    pub profiler_self_usage: u64,
    pub vm_size_bytes: u64,
    pub vm_rss_bytes: u64,
    pub total_tracked_allocated: u64,
    pub total_tracked_freed: u64,
}

pub trait TreeVisitor {
    fn enter_tree(&mut self, info: &TreeSnapshotInfo);

    /// Return `false` to skip the node's subtree (children are not
    /// visited); `exit_node` is still called for the node itself.
    fn enter_node(&mut self, node: &NodeView<'_>) -> bool;

    fn exit_node(&mut self, node: &NodeView<'_>);

    fn exit_tree(&mut self, info: &TreeSnapshotInfo);

    fn finish(&mut self, totals: &GlobalTotals) {
        let _ = totals;
    }
}
