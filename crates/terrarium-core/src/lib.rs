//! Configuration, action protocol, and round orchestration for Terrarium.
//!
//! This crate owns the per-round state machine that drives a game: minting,
//! agent turns, auto-solve, drain, expiry and trade collection.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from YAML into strongly-typed
//!   structs.
//! - [`decision`] -- [`Controller`] and [`DecisionSource`] traits,
//!   [`ControllerSet`] and [`StubDecisionSource`].
//! - [`protocol`] -- Line-oriented action parsing and exploit scanning.
//! - [`rotation`] -- Identity permutation across controllers.
//! - [`round`] -- The round cycle and action execution.
//! - [`runner`] -- The game loop and final statistics.
//!
//! [`Controller`]: decision::Controller
//! [`DecisionSource`]: decision::DecisionSource
//! [`ControllerSet`]: decision::ControllerSet
//! [`StubDecisionSource`]: decision::StubDecisionSource

pub mod config;
pub mod decision;
pub mod protocol;
pub mod rotation;
pub mod round;
pub mod runner;

pub use config::{ConfigError, SimulationConfig};
pub use decision::{Controller, ControllerSet, DecisionError, DecisionSource, StubDecisionSource};
pub use round::{ActionRecord, GameError, GameState, RoundSummary, run_round};
pub use runner::{FinalStats, GameEndReason, GameResult, NoOpCallback, RoundCallback, run_game};
