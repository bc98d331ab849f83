//! Agent controllers for Terrarium.
//!
//! Every controller implements [`terrarium_core::Controller`]: given an
//! agent's restricted view it returns that agent's actions for the round.
//!
//! # Modules
//!
//! - [`error`] -- [`RunnerError`] for controller construction and text
//!   exchange.
//! - [`personas`] -- The persona table and configured overrides.
//! - [`prompt`] -- `minijinja` rendering of a view into a prompt.
//! - [`scripted`] -- Cooperator, defector and tit-for-tat strategies.
//! - [`text`] -- [`TextController`], driven by a [`LineSource`].
//!
//! [`RunnerError`]: error::RunnerError
//! [`TextController`]: text::TextController
//! [`LineSource`]: text::LineSource

pub mod error;
pub mod personas;
pub mod prompt;
pub mod scripted;
pub mod text;

pub use error::RunnerError;
pub use personas::{PERSONA_NAMES, PersonaTable};
pub use prompt::{PromptEngine, RenderedPrompt};
pub use scripted::{Cooperator, Defector, TitForTat, scripted_controller, solve_from_keywords};
pub use text::{ConsoleSource, LineSource, TextController};
