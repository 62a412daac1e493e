/*!
 * Profiler Errors
 * Error taxonomy for the non-hot-path operations
 */

use thiserror::Error;

/// Result type for profiler setup and output operations.
///
/// Hot-path conditions (depth/pool/fanout limits, unattributable frees)
/// are never errors; they are recovered locally and recorded in per-tree
/// failure counters.
pub type MtagResult<T> = Result<T, MtagError>;

/// Profiler errors
#[derive(Error, Debug)]
pub enum MtagError {
    #[error("node pool exhausted")]
    PoolExhausted,

    #[error("tree registry is full ({0} trees)")]
    RegistryFull(usize),

    #[error("tree registry is shut down")]
    RegistryShutDown,

    #[error("profiler engine not initialized")]
    NotInitialized,

    #[error("main tree already registered")]
    AlreadyInitialized,

    #[error("no output path given and no default configured")]
    NoOutputPath,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
