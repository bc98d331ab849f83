//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and game execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: terrarium_core::ConfigError,
    },

    /// Game state construction failed.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: terrarium_core::GameError,
    },

    /// A controller could not be built.
    #[error("controller error: {source}")]
    Controller {
        /// The underlying runner error.
        #[from]
        source: terrarium_runner::RunnerError,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid {name}: {reason}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An experiment file could not be read or parsed.
    #[error("experiment file {}: {reason}", path.display())]
    Experiment {
        /// The experiment file.
        path: std::path::PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Roster setup failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },

    /// Writing the event log failed.
    #[error("event log I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An event log record could not be serialized.
    #[error("event log encoding error: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
