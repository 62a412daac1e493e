/*!
 * Graphviz Emitter
 * One digraph with a subgraph cluster per thread tree
 *
 * Node fill color and font size scale with the node's self weight so the
 * biggest direct contributors stand out at a glance.
 */

use crate::output::fmt::{pretty_print_bytes, weight_percent_string, weight_percent_value};
use crate::tree::{GlobalTotals, NodeView, TreeSnapshotInfo, TreeVisitor};

pub struct DotEmitter {
    out: String,
    path: Vec<String>,
    tid_prefix: String,
}

impl DotEmitter {
    pub fn new() -> Self {
        let mut out = String::new();
        out.push_str("digraph MallocForest {\n");
        Self {
            out,
            path: Vec::new(),
            tid_prefix: String::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn node_id(&self) -> String {
        format!("{}{}", self.tid_prefix, self.path.join("."))
    }

    fn append_node(&mut self, id: &str, label: &str, shape: &str, fillcolor: &str, fontsize: &str) {
        // node names are quoted: scope names may hold graphviz-invalid chars
        self.out.push_str(&format!("\"{id}\" [label=\"{label}\""));
        if !shape.is_empty() {
            self.out.push_str(&format!(" shape={shape}"));
        }
        if !fillcolor.is_empty() {
            self.out.push_str(&format!(" fillcolor={fillcolor}"));
        }
        if !fontsize.is_empty() {
            self.out.push_str(&format!(" fontsize={fontsize}"));
        }
        self.out.push_str("]\n");
    }

    fn append_edge(&mut self, from: &str, to: &str) {
        self.out.push_str(&format!("\"{from}\" -> \"{to}\"\n"));
    }
}

impl Default for DotEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// reds9 bucket + font size from the self-weight percentage
fn self_weight_style(weight_self: u64) -> (&'static str, &'static str) {
    match weight_percent_value(weight_self) {
        0..=4 => ("1", "9"),
        5..=9 => ("2", "10"),
        10..=19 => ("3", "12"),
        20..=39 => ("4", "14"),
        40..=59 => ("5", "16"),
        60..=79 => ("6", "18"),
        _ => ("7", "20"),
    }
}

impl TreeVisitor for DotEmitter {
    fn enter_tree(&mut self, info: &TreeSnapshotInfo) {
        self.tid_prefix = format!("{}_", info.tid);
        self.path.clear();
        self.out
            .push_str(&format!("subgraph cluster_TID{} {{\n", info.tid));
        self.out
            .push_str("node [colorscheme=reds9 style=filled]\n");
        self.out.push_str(&format!(
            "labelloc=\"b\"\nlabel=\"thread={} nodes={}/{} pushFailures={}\"\n",
            info.root_name, info.nodes_in_use, info.max_tree_nodes, info.push_failures
        ));
    }

    fn enter_node(&mut self, node: &NodeView<'_>) -> bool {
        let parent_id = if node.is_root {
            String::new()
        } else {
            self.node_id()
        };
        self.path.push(node.name.to_string());
        let id = self.node_id();

        let c = &node.counters;
        let mut weight = if c.bytes_total_allocated != c.bytes_self_allocated {
            format!(
                "total={} ({}%)\\nself={} ({}%)",
                pretty_print_bytes(c.bytes_total_allocated),
                weight_percent_string(c.weight_total),
                pretty_print_bytes(c.bytes_self_allocated),
                weight_percent_string(c.weight_self),
            )
        } else {
            format!(
                "total=self={} ({}%)",
                pretty_print_bytes(c.bytes_total_allocated),
                weight_percent_string(c.weight_total),
            )
        };
        weight.push_str(&format!(
            "\\nnum_alloc_self={}",
            c.calls[0] + c.calls[1] + c.calls[2]
        ));

        let (label, shape) = if node.is_root {
            // root edge label: this subtree's share of the process total
            (
                format!(
                    "thread={}\\nTID={}\\n{}% of process total\\n{}",
                    node.name,
                    node.tid,
                    weight_percent_string(c.weight_total),
                    weight
                ),
                "box",
            )
        } else {
            (format!("scope={}\\n{}", node.name, weight), "")
        };

        let (fill, fontsize) = self_weight_style(c.weight_self);
        self.append_node(&id, &label, shape, fill, fontsize);
        if !node.is_root {
            self.append_edge(&parent_id, &id);
        }
        true
    }

    fn exit_node(&mut self, _node: &NodeView<'_>) {
        self.path.pop();
    }

    fn exit_tree(&mut self, _info: &TreeSnapshotInfo) {
        self.out.push_str("}\n");
    }

    fn finish(&mut self, totals: &GlobalTotals) {
        self.out.push_str(&format!(
            "labelloc=\"b\"\nlabel=\"Memory allocated before init = {}\\nProfiler self usage = {}\\nTotal tracked across all threads = {}\"\n",
            pretty_print_bytes(totals.bytes_before_init),
            pretty_print_bytes(totals.profiler_self_usage),
            pretty_print_bytes(totals.total_tracked_allocated),
        ));
        self.out.push_str("}\n");
    }
}
