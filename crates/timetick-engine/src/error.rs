//! Error types for the TimeTick engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or unit registration failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: timetick_core::ConfigError,
    },

    /// Snapshot encoding or decoding failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: timetick_core::SnapshotError,
    },

    /// Reading or writing the snapshot file failed.
    #[error("snapshot file error at {path}: {source}")]
    SnapshotFile {
        /// The snapshot file path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
