/*!
 * Engine Facade
 * Public init, stats and snapshot API over the registry
 *
 * The profiler is a best-effort observer: every public entry point
 * answers with a value, never a panic, and failures are logged and
 * reported as `false`. All work in here runs with hooks disabled so the
 * profiler's own allocations stay invisible.
 */

use crate::core::limits::{
    DEFAULT_MAX_TREE_LEVELS, DEFAULT_MAX_TREE_NODES, ENV_SNAPSHOT_INTERVAL_SEC,
    ENV_SNAPSHOT_OUTPUT_PREFIX, ENV_STATS_OUTPUT_GRAPHVIZ_DOT, ENV_STATS_OUTPUT_JSON, MAX_CHILDREN,
    MAX_TREES,
};
use crate::core::types::Tid;
use crate::core::{MtagError, MtagResult};
use crate::hooks::{self, HookGuard};
use crate::os;
use crate::output::{
    CollectOptions, DotEmitter, HumanEmitter, JsonEmitter, MapEmitter, OutputFormat, StatsMap,
};
use crate::snapshot::SNAPSHOTS;
use crate::tree::registry;
use std::time::Duration;

/// Engine configuration; the defaults match an unconfigured process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Node-pool capacity of every tree
    pub max_tree_nodes: u32,
    /// Depth bound of every tree (root = 0)
    pub max_tree_levels: u32,
    /// Zero disables periodic snapshots
    pub snapshot_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tree_nodes: DEFAULT_MAX_TREE_NODES,
            max_tree_levels: DEFAULT_MAX_TREE_LEVELS,
            snapshot_interval: Duration::ZERO,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by the recognized environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(secs) = std::env::var(ENV_SNAPSHOT_INTERVAL_SEC) {
            if let Ok(secs) = secs.trim().parse::<u64>() {
                config.snapshot_interval = Duration::from_secs(secs);
            }
        }
        config
    }
}

/// Starts profiling: registers the main thread's tree and arms the
/// snapshot driver. Returns whether the engine came up; `false` means the
/// process simply runs unprofiled.
pub fn init(config: EngineConfig) -> bool {
    let _hooks_off = HookGuard::new();
    match registry().register_main(config.max_tree_nodes, config.max_tree_levels) {
        Ok(_) => {
            hooks::set_current_slot(0);
            SNAPSHOTS.configure(config.snapshot_interval);
            log::debug!(
                "profiler engine initialized: {} nodes x {} levels per tree, snapshot interval {}s",
                config.max_tree_nodes,
                config.max_tree_levels,
                config.snapshot_interval.as_secs()
            );
            true
        }
        Err(e) => {
            log::warn!("profiler engine init failed: {e}");
            false
        }
    }
}

/// `init` with `EngineConfig::from_env()`
pub fn init_default() -> bool {
    init(EngineConfig::from_env())
}

/// Rejects tree registrations from late-starting threads; existing trees
/// stay readable until process exit.
pub fn shutdown() {
    registry().request_shutdown();
}

/// Flattened counters for every registered tree. Two calls on a quiescent
/// process return equal maps.
pub fn collect_stats_map() -> StatsMap {
    let _hooks_off = HookGuard::new();
    let mut emitter = MapEmitter::new();
    registry().collect(&mut emitter);
    emitter.into_map()
}

/// One stats document in the requested format (`All` renders JSON)
pub fn collect_stats(format: OutputFormat, options: &CollectOptions) -> String {
    let _hooks_off = HookGuard::new();
    collect_to_string(format, options)
}

fn collect_to_string(format: OutputFormat, options: &CollectOptions) -> String {
    match format {
        OutputFormat::Json | OutputFormat::All => {
            let mut emitter = JsonEmitter::new();
            registry().collect(&mut emitter);
            emitter.into_string()
        }
        OutputFormat::GraphvizDot => {
            let mut emitter = DotEmitter::new();
            registry().collect(&mut emitter);
            emitter.into_string()
        }
        OutputFormat::HumanText => {
            let mut emitter = HumanEmitter::new(options);
            registry().collect(&mut emitter);
            emitter.into_string()
        }
    }
}

/// Writes one stats document (or, for `All`, the JSON + DOT pair) to
/// disk. An empty path falls back to the format's environment variable.
pub fn write_stats(format: OutputFormat, path: &str, options: &CollectOptions) -> bool {
    let _hooks_off = HookGuard::new();
    let formats: &[OutputFormat] = match format {
        OutputFormat::All => &[OutputFormat::Json, OutputFormat::GraphvizDot],
        OutputFormat::Json => &[OutputFormat::Json],
        OutputFormat::GraphvizDot => &[OutputFormat::GraphvizDot],
        OutputFormat::HumanText => &[OutputFormat::HumanText],
    };
    let pair = formats.len() > 1;
    for f in formats {
        // a path given together with All becomes a prefix for the pair
        let result = if pair && !path.is_empty() {
            write_one(*f, &format!("{path}.{}", f.extension()), options)
        } else {
            resolve_output_path(*f, if pair { "" } else { path })
                .and_then(|p| write_one(*f, &p, options))
        };
        if let Err(e) = result {
            log::warn!("writing {:?} stats failed: {e}", f);
            return false;
        }
    }
    true
}

fn resolve_output_path(format: OutputFormat, path: &str) -> MtagResult<String> {
    if !path.is_empty() {
        return Ok(path.to_string());
    }
    let var = match format {
        OutputFormat::Json => ENV_STATS_OUTPUT_JSON,
        OutputFormat::GraphvizDot => ENV_STATS_OUTPUT_GRAPHVIZ_DOT,
        _ => return Err(MtagError::NoOutputPath),
    };
    match std::env::var(var) {
        Ok(p) if !p.is_empty() => Ok(p),
        _ => Err(MtagError::NoOutputPath),
    }
}

fn write_one(format: OutputFormat, path: &str, options: &CollectOptions) -> MtagResult<()> {
    let doc = collect_to_string(format, options);
    std::fs::write(path, doc)?;
    log::debug!("wrote {:?} stats to {path}", format);
    Ok(())
}

/// Writes `<prefix>.NNNN.<ext>` files when the snapshot interval has
/// elapsed; returns whether a snapshot was produced. An empty prefix
/// falls back to `MTAG_SNAPSHOT_OUTPUT_PREFIX_FILE_PATH`.
pub fn write_snapshot_if_needed(format: OutputFormat, prefix: &str) -> bool {
    let _hooks_off = HookGuard::new();
    if !registry().has_main_tree() {
        return false;
    }
    let prefix = if prefix.is_empty() {
        match std::env::var(ENV_SNAPSHOT_OUTPUT_PREFIX) {
            Ok(p) if !p.is_empty() => p,
            _ => return false,
        }
    } else {
        prefix.to_string()
    };
    if !SNAPSHOTS.should_write() {
        return false;
    }

    let seq = SNAPSHOTS.next_seq();
    let formats: &[OutputFormat] = match format {
        OutputFormat::All => &[OutputFormat::Json, OutputFormat::GraphvizDot],
        OutputFormat::Json => &[OutputFormat::Json],
        OutputFormat::GraphvizDot => &[OutputFormat::GraphvizDot],
        OutputFormat::HumanText => &[OutputFormat::HumanText],
    };
    let options = CollectOptions::default();
    for f in formats {
        let path = crate::snapshot::SnapshotDriver::snapshot_path(&prefix, seq, f.extension());
        if let Err(e) = write_one(*f, &path, &options) {
            log::warn!("snapshot write failed: {e}");
            return false;
        }
    }
    true
}

/// `"tid<N>:"`, the key prefix of the target thread's entries in the
/// flat stats map; 0 means the calling thread.
pub fn stat_key_prefix_for_thread(tid: Tid) -> String {
    let tid = if tid == 0 { os::gettid() } else { tid };
    format!("tid{tid}:")
}

/// Configured bound for `max_trees`, `max_tree_nodes`, `max_tree_levels`
/// or `max_node_siblings`; zero for unrecognized names.
pub fn get_limit(name: &str) -> usize {
    match name {
        "max_trees" => MAX_TREES,
        "max_node_siblings" => MAX_CHILDREN,
        "max_tree_nodes" => registry()
            .main_tree()
            .map(|t| t.max_tree_nodes() as usize)
            .unwrap_or(DEFAULT_MAX_TREE_NODES as usize),
        "max_tree_levels" => registry()
            .main_tree()
            .map(|t| t.max_tree_levels() as usize)
            .unwrap_or(DEFAULT_MAX_TREE_LEVELS as usize),
        _ => 0,
    }
}
