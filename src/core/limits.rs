/*!
 * Profiler Limits and Constants
 *
 * Centralized location for all tuning bounds and recognized environment
 * variables. Hot-path structures are sized from these at init time and
 * never grow afterwards.
 */

/// Maximum number of scope trees, i.e. observed threads (slot 0 = main).
/// Further threads stay uninstrumented; the real allocator is unaffected.
pub const MAX_TREES: usize = 128;

/// Maximum children per tree node
/// [PERF] Small fixed fanout keeps child lookup a linear scan over one
/// cache line of ids
pub const MAX_CHILDREN: usize = 16;

/// Capacity of the inline scope-name buffer
/// Must be >= 16 so a kernel thread name (prctl PR_GET_NAME) always fits
pub const SCOPE_NAME_CAP: usize = 32;

/// Node weights are stored as a fraction of the process-wide total
/// multiplied by this, so no float lives in the tree
pub const WEIGHT_MULTIPLIER: u64 = 10_000;

/// Default node-pool capacity per tree
pub const DEFAULT_MAX_TREE_NODES: u32 = 256;

/// Default depth bound per tree (root = level 0)
pub const DEFAULT_MAX_TREE_LEVELS: u32 = 256;

/// Per-thread allocator arena estimate added to a secondary thread's
/// `vm_size_at_creation` (glibc reserves up to one 64MB-class arena per
/// core; 128MB is the reconciliation heuristic carried from the field)
pub const SECONDARY_ARENA_ESTIMATE: u64 = 128 * 1024 * 1024;

/// Fallback stack-size estimate when the OS query fails (glibc default)
pub const DEFAULT_THREAD_STACK_ESTIMATE: u64 = 8 * 1024 * 1024;

/// Human output collapses subtrees below this total allocation
pub const HUMAN_COLLAPSE_BYTES: u64 = 1024;

/// Human output collapses subtrees below this total weight (1%)
pub const HUMAN_COLLAPSE_WEIGHT: u64 = WEIGHT_MULTIPLIER / 100;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Default path for the JSON stats document
pub const ENV_STATS_OUTPUT_JSON: &str = "MTAG_STATS_OUTPUT_JSON";

/// Default path for the Graphviz DOT output
pub const ENV_STATS_OUTPUT_GRAPHVIZ_DOT: &str = "MTAG_STATS_OUTPUT_GRAPHVIZ_DOT";

/// Default prefix for the numbered snapshot file sequence
pub const ENV_SNAPSHOT_OUTPUT_PREFIX: &str = "MTAG_SNAPSHOT_OUTPUT_PREFIX_FILE_PATH";

/// Default snapshot interval in seconds (0 disables snapshotting)
pub const ENV_SNAPSHOT_INTERVAL_SEC: &str = "MTAG_SNAPSHOT_INTERVAL_SEC";
