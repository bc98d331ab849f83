//! Error types for the `terrarium-world` crate.

use terrarium_types::AgentId;

/// Errors that can occur during world store operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An agent was not found in the world.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// An agent with this display name is already registered.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),
}

/// Errors that can occur when constructing the puzzle engine.
#[derive(Debug, thiserror::Error)]
pub enum PuzzleError {
    /// Puzzles must split into at least one clue.
    #[error("clues_per_puzzle must be at least 1")]
    ZeroClues,

    /// The catalog has no puzzles with the configured number of clues.
    #[error("puzzle catalog has no entries with {clues_per_puzzle} clues")]
    EmptyCatalog {
        /// The configured clue count.
        clues_per_puzzle: u32,
    },
}
