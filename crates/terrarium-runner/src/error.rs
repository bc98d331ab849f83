//! Error types for the controller runtime.
//!
//! Uses `thiserror` for typed errors that surface through controller
//! construction, prompt rendering and text exchange.

use terrarium_core::DecisionError;

/// Errors that can occur while building or driving a controller.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// A persona name is not in the persona table.
    #[error("unknown persona '{0}'")]
    UnknownPersona(String),

    /// A controller kind cannot be built by this constructor.
    #[error("unsupported controller kind '{0}'")]
    UnknownController(String),

    /// The line source failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl From<RunnerError> for DecisionError {
    fn from(error: RunnerError) -> Self {
        Self::Internal {
            message: error.to_string(),
        }
    }
}
