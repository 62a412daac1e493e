/*!
 * Human Emitter
 * Indented per-thread tree with small subtrees collapsed
 */

use crate::core::limits::{HUMAN_COLLAPSE_BYTES, HUMAN_COLLAPSE_WEIGHT};
use crate::output::fmt::{pretty_print_bytes, weight_percent_string};
use crate::output::CollectOptions;
use crate::tree::{GlobalTotals, NodeView, TreeSnapshotInfo, TreeVisitor};

pub struct HumanEmitter {
    out: String,
    collapse: bool,
}

impl HumanEmitter {
    pub fn new(options: &CollectOptions) -> Self {
        Self {
            out: String::new(),
            collapse: options.collapse_small_subtrees,
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

impl TreeVisitor for HumanEmitter {
    fn enter_tree(&mut self, info: &TreeSnapshotInfo) {
        self.out.push_str(&format!(
            "Thread '{}' TID {} (nodes {}/{}, push failures {}, free-tracking failures {})\n",
            info.root_name,
            info.tid,
            info.nodes_in_use,
            info.max_tree_nodes,
            info.push_failures,
            info.free_tracking_failures,
        ));
    }

    fn enter_node(&mut self, node: &NodeView<'_>) -> bool {
        let indent = " ".repeat((node.level * 2) as usize);
        let c = &node.counters;
        if self.collapse
            && !node.is_root
            && (c.bytes_total_allocated < HUMAN_COLLAPSE_BYTES
                || c.weight_total < HUMAN_COLLAPSE_WEIGHT)
        {
            self.out.push_str(&format!("{indent}...\n"));
            return false;
        }
        self.out.push_str(&format!(
            "{indent}{}: total={} ({}%), self={} ({}%), visits={}\n",
            node.name,
            pretty_print_bytes(c.bytes_total_allocated),
            weight_percent_string(c.weight_total),
            pretty_print_bytes(c.bytes_self_allocated),
            weight_percent_string(c.weight_self),
            c.visits,
        ));
        true
    }

    fn exit_node(&mut self, _node: &NodeView<'_>) {}

    fn exit_tree(&mut self, _info: &TreeSnapshotInfo) {
        self.out.push('\n');
    }

    fn finish(&mut self, totals: &GlobalTotals) {
        self.out.push_str(&format!(
            "Memory allocated before profiler init = {}\n",
            pretty_print_bytes(totals.bytes_before_init)
        ));
        self.out.push_str(&format!(
            "Profiler self usage = {}\n",
            pretty_print_bytes(totals.profiler_self_usage)
        ));
        self.out.push_str(&format!(
            "Total tracked across all threads = {}\n",
            pretty_print_bytes(totals.total_tracked_allocated)
        ));
        self.out.push_str(&format!(
            "VmSize now = {}, VmRSS now = {}\n",
            pretty_print_bytes(totals.vm_size_bytes),
            pretty_print_bytes(totals.vm_rss_bytes)
        ));
    }
}
