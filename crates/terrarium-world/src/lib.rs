//! World store, restricted views, and the puzzle engine for the Terrarium
//! survival game.
//!
//! # Modules
//!
//! - [`catalog`] -- The built-in letter-fill puzzle catalog.
//! - [`config`] -- Puzzle and view configuration ([`PuzzleConfig`], [`ViewConfig`]).
//! - [`error`] -- Error types ([`WorldError`], [`PuzzleError`]).
//! - [`puzzle`] -- [`PuzzleEngine`]: minting, answer checking, expiry.
//! - [`state`] -- [`WorldState`], the single owner of mutable game state.
//! - [`view`] -- Per-agent restricted view assembly.

pub mod catalog;
pub mod config;
pub mod error;
pub mod puzzle;
pub mod state;
pub mod view;

// Re-export primary types at crate root.
pub use config::{PuzzleConfig, ViewConfig};
pub use error::{PuzzleError, WorldError};
pub use puzzle::PuzzleEngine;
pub use state::WorldState;
pub use view::build_view;
