/*!
 * JSON Emitter
 * Structured document: per-tree objects plus process-wide totals
 */

use crate::core::types::AllocKind;
use crate::output::fmt::weight_percent_f64;
use crate::tree::{GlobalTotals, NodeView, TreeSnapshotInfo, TreeVisitor};
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Serialize)]
struct TreeHeader {
    #[serde(rename = "nTreeLevels")]
    levels: u32,
    #[serde(rename = "nTreeNodesInUse")]
    nodes_in_use: u32,
    #[serde(rename = "nMaxTreeNodes")]
    max_tree_nodes: u32,
    #[serde(rename = "nMaxTreeLevels")]
    max_tree_levels: u32,
    #[serde(rename = "nPushNodeFailures")]
    push_failures: u64,
    #[serde(rename = "nFreeTrackingFailed")]
    free_tracking_failures: u64,
    #[serde(rename = "nVmSizeAtCreation")]
    vm_size_at_creation: u64,
}

struct NodeFrame {
    name: String,
    fields: Map<String, Value>,
    nested: Map<String, Value>,
}

pub struct JsonEmitter {
    doc: Map<String, Value>,
    trees: Vec<(String, Value)>,
    tree_fields: Map<String, Value>,
    stack: Vec<NodeFrame>,
    pending_root: Option<(String, Value)>,
}

impl JsonEmitter {
    pub fn new() -> Self {
        Self {
            doc: Map::new(),
            trees: Vec::new(),
            tree_fields: Map::new(),
            stack: Vec::new(),
            pending_root: None,
        }
    }

    pub fn into_string(self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.doc)).unwrap_or_default()
    }
}

impl Default for JsonEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeVisitor for JsonEmitter {
    fn enter_tree(&mut self, info: &TreeSnapshotInfo) {
        let header = TreeHeader {
            levels: info.levels_reached,
            nodes_in_use: info.nodes_in_use,
            max_tree_nodes: info.max_tree_nodes,
            max_tree_levels: info.max_tree_levels,
            push_failures: info.push_failures,
            free_tracking_failures: info.free_tracking_failures,
            vm_size_at_creation: info.vm_size_at_creation,
        };
        self.tree_fields = match serde_json::to_value(&header) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        };
        self.pending_root = None;
    }

    fn enter_node(&mut self, node: &NodeView<'_>) -> bool {
        let c = &node.counters;
        let mut fields = Map::new();
        fields.insert("nBytesTotalAllocated".into(), json!(c.bytes_total_allocated));
        fields.insert("nBytesTotalFreed".into(), json!(c.bytes_total_freed));
        fields.insert("nBytesSelfAllocated".into(), json!(c.bytes_self_allocated));
        fields.insert("nBytesSelfFreed".into(), json!(c.bytes_self_freed));
        fields.insert("nTimesEnteredAndExited".into(), json!(c.visits));
        for kind in AllocKind::ALL {
            fields.insert(
                format!("nCallsTo_{}", kind.as_str()),
                json!(c.calls_to(kind)),
            );
        }
        fields.insert(
            "nWeightPercentage".into(),
            json!(weight_percent_f64(c.weight_total)),
        );
        self.stack.push(NodeFrame {
            name: node.name.to_string(),
            fields,
            nested: Map::new(),
        });
        true
    }

    fn exit_node(&mut self, _node: &NodeView<'_>) {
        let mut frame = match self.stack.pop() {
            Some(f) => f,
            None => return,
        };
        frame
            .fields
            .insert("nestedScopes".into(), Value::Object(frame.nested));
        let obj = Value::Object(frame.fields);
        match self.stack.last_mut() {
            Some(parent) => {
                parent.nested.insert(frame.name, obj);
            }
            None => self.pending_root = Some((frame.name, obj)),
        }
    }

    fn exit_tree(&mut self, info: &TreeSnapshotInfo) {
        let mut tree_obj = std::mem::take(&mut self.tree_fields);
        if let Some((root_name, root_obj)) = self.pending_root.take() {
            tree_obj.insert(root_name, root_obj);
        }
        self.trees
            .push((format!("tree_for_TID{}", info.tid), Value::Object(tree_obj)));
    }

    fn finish(&mut self, totals: &GlobalTotals) {
        self.doc.insert("PID".into(), json!(totals.pid));
        self.doc
            .insert("tmStartProfiling".into(), json!(totals.start_unix));
        self.doc
            .insert("tmCurrentSnapshot".into(), json!(totals.now_unix));
        for (name, tree) in self.trees.drain(..) {
            self.doc.insert(name, tree);
        }
        self.doc.insert(
            "nBytesAllocBeforeInit".into(),
            json!(totals.bytes_before_init),
        );
        self.doc.insert(
            "nBytesMallocTagSelfUsage".into(),
            json!(totals.profiler_self_usage),
        );
        self.doc
            .insert("vmSizeNowBytes".into(), json!(totals.vm_size_bytes));
        self.doc
            .insert("vmRSSNowBytes".into(), json!(totals.vm_rss_bytes));
        self.doc.insert(
            "nTotalTrackedBytes".into(),
            json!(totals.total_tracked_allocated),
        );
    }
}
