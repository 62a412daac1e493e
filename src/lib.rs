/*!
 * mtag
 * Per-thread hierarchical heap-allocation profiler
 *
 * Every heap request of the host program is observed through a
 * global-allocator wrapper and attributed to the current *scope* of the
 * calling thread. Scopes are declared lexically with RAII guards and form
 * one bounded tree per thread; the forest serializes to a flat counter
 * map, JSON, Graphviz DOT or an indented human view.
 *
 * ```no_run
 * use mtag::{EngineConfig, ScopeAlloc, ScopeGuard};
 *
 * #[global_allocator]
 * static ALLOC: ScopeAlloc = ScopeAlloc::system();
 *
 * fn main() {
 *     mtag::init(EngineConfig::default());
 *     {
 *         let _scope = ScopeGuard::new("startup");
 *         let _config = String::from("..."); // attributed to <thread>.startup
 *     }
 *     println!("{:?}", mtag::collect_stats_map().get(".nTrees"));
 * }
 * ```
 *
 * The profiler is a best-effort observer: the real allocator services
 * every request, limits degrade into failure counters, and nothing on the
 * allocation hot path blocks or allocates.
 */

pub mod core;
pub mod engine;
pub mod hooks;
pub mod os;
pub mod output;
pub mod pool;
pub mod scope;
pub mod snapshot;
pub mod tree;

// Re-export the public surface
pub use crate::core::limits;
pub use crate::core::types::{AllocKind, Tid};
pub use crate::core::{MtagError, MtagResult};
pub use engine::{
    collect_stats, collect_stats_map, get_limit, init, init_default, shutdown,
    stat_key_prefix_for_thread, write_snapshot_if_needed, write_stats, EngineConfig,
};
pub use hooks::{HookGuard, ScopeAlloc};
pub use output::{CollectOptions, OutputFormat, StatsMap};
pub use scope::ScopeGuard;
