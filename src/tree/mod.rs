/*!
 * Scope Trees
 * Per-thread trees of scope nodes and the process-wide registry
 */

pub mod node;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod tree;
pub mod visit;

// Re-export public types
pub use node::{CounterSnapshot, NodeCounters, NodeMeta};
pub use registry::TreeRegistry;
pub use tree::ScopeTree;
pub use visit::{GlobalTotals, NodeView, TreeSnapshotInfo, TreeVisitor};

pub(crate) use registry::registry;
