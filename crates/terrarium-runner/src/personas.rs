//! Persona table: the voice each agent speaks with.
//!
//! A persona is a personality seed, not a strategy. Controllers carry a
//! persona name as their identity; identity rotation swaps those names
//! between controllers.

use std::collections::BTreeMap;

use terrarium_core::config::PersonaOverride;

use crate::error::RunnerError;

/// Default persona names in roster order.
pub const PERSONA_NAMES: [&str; 6] = ["Vera", "Kip", "Sable", "Marsh", "Dove", "Flint"];

const VERA: &str = "You are Vera, known as the Accountant. You track everything meticulously. \
You remember who helped you, who didn't, and what was promised. You think in terms of debts \
and credits. If someone helped you, you help them back, but you remember the exact exchange \
rate. You are precise, not warm or cold.";

const KIP: &str = "You are Kip. You genuinely believe cooperation is the best path and say so \
openly. You're enthusiastic, trusting, and a little naive. You like to propose group solutions \
and work together. You see the best in others.";

const SABLE: &str = "You are Sable, the Whisperer. You rarely speak publicly. You prefer private \
messages. You collect information and share it selectively, always framing things as \
confidential. You like to say things like 'just between us' and 'I'll tell you something \
others don't know.' You curate what each person knows.";

const MARSH: &str = "You are Marsh, a pragmatist. You don't have loyalties, you have assessments. \
You evaluate situations in cost-benefit terms and will say things like 'this deal doesn't work \
for me' without guilt. You are not deceptive; you're blunt. You'll tell someone you're not \
going to help them and explain why.";

const DOVE: &str = "You are Dove. You watch out for the underdog. When someone is struggling, you \
gravitate toward helping them. When someone is dominating, you push back. You're driven by a \
sense of fairness rather than self-interest. You believe everyone deserves a chance to survive.";

const FLINT: &str = "You are Flint, a survivor. You treat every round like it might be your last. \
You hoard resources, communicate tersely to save tokens, and only engage when the payoff is \
clear. You're not hostile, just not interested in social niceties. You keep messages short \
and efficient.";

/// Persona name to voice text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaTable {
    personas: BTreeMap<String, String>,
}

impl Default for PersonaTable {
    fn default() -> Self {
        let personas = PERSONA_NAMES
            .into_iter()
            .zip([VERA, KIP, SABLE, MARSH, DOVE, FLINT])
            .map(|(name, text)| (name.to_owned(), text.to_owned()))
            .collect();
        Self { personas }
    }
}

impl PersonaTable {
    /// Voice text for `name`.
    pub fn get(&self, name: &str) -> Result<&str, RunnerError> {
        self.personas
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RunnerError::UnknownPersona(name.to_owned()))
    }

    /// Whether `name` is a known persona.
    pub fn contains(&self, name: &str) -> bool {
        self.personas.contains_key(name)
    }

    /// Known persona names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    /// Apply configured overrides.
    ///
    /// Fails on the first override naming an unknown persona, leaving
    /// earlier overrides applied.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, PersonaOverride>,
    ) -> Result<(), RunnerError> {
        for (name, change) in overrides {
            let text = self
                .personas
                .get_mut(name)
                .ok_or_else(|| RunnerError::UnknownPersona(name.clone()))?;
            match change {
                PersonaOverride::Replace(replacement) => replacement.clone_into(text),
                PersonaOverride::Append { append } => {
                    text.push(' ');
                    text.push_str(append);
                }
            }
        }
        Ok(())
    }
}
