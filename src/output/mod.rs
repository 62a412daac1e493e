/*!
 * Output Emitters
 * Visitor implementations turning tree snapshots into documents
 */

pub mod dot;
pub mod fmt;
pub mod human;
pub mod json;
pub mod map;

pub use dot::DotEmitter;
pub use human::HumanEmitter;
pub use json::JsonEmitter;
pub use map::{MapEmitter, StatsMap};

/// Which document a stats pass produces. `All` is meaningful for the
/// file-writing APIs and covers the machine formats (JSON + DOT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    GraphvizDot,
    HumanText,
    All,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::GraphvizDot => "dot",
            OutputFormat::HumanText => "txt",
            OutputFormat::All => "",
        }
    }
}

/// Knobs for the stats pass
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Collapse subtrees below 1kB / 1% in the human output
    pub collapse_small_subtrees: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            collapse_small_subtrees: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AllocKind, ScopeName};
    use crate::tree::{ScopeTree, TreeVisitor};

    fn sample_tree() -> ScopeTree {
        let t = ScopeTree::new(16, 8, false).unwrap();
        assert!(t.push(&ScopeName::new("FuncA")));
        t.track_alloc(AllocKind::Malloc, 100_000);
        assert!(t.push(&ScopeName::new("FuncB")));
        t.track_alloc(AllocKind::Calloc, 900_000);
        t.track_free(900_000);
        t.pop();
        t.pop();
        t
    }

    fn drive<V: TreeVisitor>(tree: &ScopeTree, visitor: &mut V) {
        let (total, _) = tree.totals();
        tree.collect(total, visitor);
    }

    #[test]
    fn map_emitter_uses_the_key_schema() {
        let t = sample_tree();
        let mut v = MapEmitter::new();
        drive(&t, &mut v);
        let map = v.into_map();
        let prefix = format!("tid{}:", t.owner_tid());
        let root = t.root_name().as_str().to_string();

        assert_eq!(map[&format!("{prefix}.nMaxTreeNodes")], 16);
        assert_eq!(map[&format!("{prefix}.nPushNodeFailures")], 0);
        assert!(map.contains_key(&format!("{prefix}.nTreeNodesInUse")));
        assert!(map.contains_key(&format!("{prefix}.nFreeTrackingFailed")));

        let a = format!("{prefix}{root}.FuncA");
        assert_eq!(map[&format!("{a}.nBytesSelfAllocated")], 100_000);
        assert_eq!(map[&format!("{a}.nBytesTotalAllocated")], 1_000_000);
        assert_eq!(map[&format!("{a}.nCallsTo_malloc")], 1);
        assert_eq!(map[&format!("{a}.FuncB.nCallsTo_calloc")], 1);
        assert_eq!(map[&format!("{a}.FuncB.nCallsTo_free")], 1);
        assert_eq!(map[&format!("{a}.FuncB.nBytesSelfFreed")], 900_000);
        assert_eq!(map[&format!("{a}.FuncB.nTimesEnteredAndExited")], 1);
    }

    #[test]
    fn map_emission_is_idempotent_on_a_quiet_tree() {
        let t = sample_tree();
        let mut v1 = MapEmitter::new();
        drive(&t, &mut v1);
        let mut v2 = MapEmitter::new();
        drive(&t, &mut v2);
        assert_eq!(v1.into_map(), v2.into_map());
    }

    #[test]
    fn json_emitter_produces_a_parsable_tree_document() {
        let t = sample_tree();
        let mut v = JsonEmitter::new();
        drive(&t, &mut v);
        // no finish() here: the engine drives that with process totals;
        // the per-tree object must still be attached on finish
        v.finish(&crate::tree::GlobalTotals {
            n_trees: 1,
            pid: 42,
            start_unix: 1,
            now_unix: 2,
            bytes_before_init: 0,
            profiler_self_usage: 0,
            vm_size_bytes: 0,
            vm_rss_bytes: 0,
            total_tracked_allocated: 1_000_000,
            total_tracked_freed: 900_000,
        });
        let doc: serde_json::Value = serde_json::from_str(&v.into_string()).unwrap();

        assert_eq!(doc["PID"], 42);
        assert_eq!(doc["nTotalTrackedBytes"], 1_000_000);
        let tree = &doc[&format!("tree_for_TID{}", t.owner_tid())];
        assert_eq!(tree["nMaxTreeNodes"], 16);
        let root = &tree[t.root_name().as_str()];
        let a = &root["nestedScopes"]["FuncA"];
        assert_eq!(a["nBytesSelfAllocated"], 100_000);
        assert_eq!(a["nWeightPercentage"], 100.0);
        let b = &a["nestedScopes"]["FuncB"];
        assert_eq!(b["nBytesTotalFreed"], 900_000);
        assert_eq!(b["nWeightPercentage"], 90.0);
    }

    #[test]
    fn dot_emitter_clusters_per_thread() {
        let t = sample_tree();
        let mut v = DotEmitter::new();
        drive(&t, &mut v);
        v.finish(&crate::tree::GlobalTotals {
            n_trees: 1,
            pid: 42,
            start_unix: 1,
            now_unix: 2,
            bytes_before_init: 0,
            profiler_self_usage: 0,
            vm_size_bytes: 0,
            vm_rss_bytes: 0,
            total_tracked_allocated: 1_000_000,
            total_tracked_freed: 900_000,
        });
        let dot = v.into_string();
        assert!(dot.starts_with("digraph MallocForest {"));
        assert!(dot.contains(&format!("subgraph cluster_TID{}", t.owner_tid())));
        assert!(dot.contains("colorscheme=reds9"));
        assert!(dot.contains("-> "));
        assert!(dot.contains("scope=FuncA"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn human_emitter_collapses_small_subtrees() {
        let t = ScopeTree::new(16, 8, false).unwrap();
        assert!(t.push(&ScopeName::new("big")));
        t.track_alloc(AllocKind::Malloc, 1_000_000);
        t.pop();
        assert!(t.push(&ScopeName::new("tiny")));
        t.track_alloc(AllocKind::Malloc, 10);
        t.pop();

        let mut v = HumanEmitter::new(&CollectOptions::default());
        drive(&t, &mut v);
        let text = v.into_string();
        assert!(text.contains("big: total="));
        assert!(!text.contains("tiny:"));
        assert!(text.contains("..."));
        // indentation is two spaces per level
        assert!(text.contains("\n  big:"));
    }

    #[test]
    fn human_emitter_keeps_everything_when_not_collapsing() {
        let t = ScopeTree::new(16, 8, false).unwrap();
        assert!(t.push(&ScopeName::new("tiny")));
        t.track_alloc(AllocKind::Malloc, 10);
        t.pop();
        let mut v = HumanEmitter::new(&CollectOptions {
            collapse_small_subtrees: false,
        });
        drive(&t, &mut v);
        assert!(v.into_string().contains("tiny: total="));
    }
}
