/*!
 * Flat Map Emitter
 * Flattens the forest into `"tid<TID>:<scope path>.<metric>"` keys
 */

use crate::core::types::AllocKind;
use crate::tree::{GlobalTotals, NodeView, TreeSnapshotInfo, TreeVisitor};
use std::collections::HashMap;

/// Flat stats mapping: flattened key strings to 64-bit counters
pub type StatsMap = HashMap<String, u64, ahash::RandomState>;

pub struct MapEmitter {
    map: StatsMap,
    prefix: String,
    path: Vec<String>,
}

impl MapEmitter {
    pub fn new() -> Self {
        Self {
            map: StatsMap::default(),
            prefix: String::new(),
            path: Vec::new(),
        }
    }

    pub fn into_map(self) -> StatsMap {
        self.map
    }

    fn put(&mut self, key: String, value: u64) {
        self.map.insert(key, value);
    }
}

impl Default for MapEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeVisitor for MapEmitter {
    fn enter_tree(&mut self, info: &TreeSnapshotInfo) {
        self.prefix = format!("tid{}:", info.tid);
        self.path.clear();
        self.put(
            format!("{}.nTreeNodesInUse", self.prefix),
            u64::from(info.nodes_in_use),
        );
        self.put(
            format!("{}.nMaxTreeNodes", self.prefix),
            u64::from(info.max_tree_nodes),
        );
        self.put(
            format!("{}.nPushNodeFailures", self.prefix),
            info.push_failures,
        );
        self.put(
            format!("{}.nFreeTrackingFailed", self.prefix),
            info.free_tracking_failures,
        );
    }

    fn enter_node(&mut self, node: &NodeView<'_>) -> bool {
        self.path.push(node.name.to_string());
        let base = format!("{}{}", self.prefix, self.path.join("."));
        let c = &node.counters;
        self.put(
            format!("{base}.nBytesTotalAllocated"),
            c.bytes_total_allocated,
        );
        self.put(
            format!("{base}.nBytesSelfAllocated"),
            c.bytes_self_allocated,
        );
        self.put(format!("{base}.nBytesSelfFreed"), c.bytes_self_freed);
        self.put(format!("{base}.nTimesEnteredAndExited"), c.visits);
        for kind in AllocKind::ALL {
            self.put(
                format!("{base}.nCallsTo_{}", kind.as_str()),
                c.calls_to(kind),
            );
        }
        true
    }

    fn exit_node(&mut self, _node: &NodeView<'_>) {
        self.path.pop();
    }

    fn exit_tree(&mut self, _info: &TreeSnapshotInfo) {}

    fn finish(&mut self, totals: &GlobalTotals) {
        self.put(".nTrees".to_string(), totals.n_trees as u64);
    }
}
