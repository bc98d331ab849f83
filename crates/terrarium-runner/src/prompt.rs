//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from a directory (`system.j2` and `situation.j2`) so
//! operators can tune what agents read without recompiling. When no
//! directory is given the built-in copies are used.

use std::path::Path;

use minijinja::{Environment, context, path_loader};
use terrarium_types::AgentView;

use crate::error::RunnerError;

const SYSTEM_TEMPLATE: &str = "system.j2";
const SITUATION_TEMPLATE: &str = "situation.j2";

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

/// The complete rendered prompt handed to a text controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Persona, rules, clues, puzzles and the action grammar.
    pub system: String,
    /// Round, balances, feeds, offers and the closing question.
    pub user: String,
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    pub fn with_defaults() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.add_template(SYSTEM_TEMPLATE, include_str!("../templates/system.j2"))
            .map_err(|e| RunnerError::Template(format!("failed to add system template: {e}")))?;
        env.add_template(SITUATION_TEMPLATE, include_str!("../templates/situation.j2"))
            .map_err(|e| RunnerError::Template(format!("failed to add situation template: {e}")))?;
        Ok(Self { env })
    }

    /// Create a prompt engine loading templates from `templates_dir`.
    ///
    /// Both templates are loaded eagerly so a missing file fails here
    /// rather than mid-game.
    pub fn from_dir(templates_dir: &Path) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.set_loader(path_loader(templates_dir));
        for name in [SYSTEM_TEMPLATE, SITUATION_TEMPLATE] {
            env.get_template(name).map_err(|e| {
                RunnerError::Template(format!(
                    "failed to load {name} from {}: {e}",
                    templates_dir.display()
                ))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for one agent's turn.
    ///
    /// `shout_words` is the free shout cap; 0 leaves SHOUT out of the
    /// action grammar.
    pub fn render(
        &self,
        view: &AgentView,
        persona: &str,
        shout_words: usize,
    ) -> Result<RenderedPrompt, RunnerError> {
        let ctx = context! { view => view, persona => persona, shout_words => shout_words };

        let system = self
            .env
            .get_template(SYSTEM_TEMPLATE)
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(&ctx)
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template(SITUATION_TEMPLATE)
            .map_err(|e| RunnerError::Template(format!("missing situation template: {e}")))?
            .render(&ctx)
            .map_err(|e| RunnerError::Template(format!("situation render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}
