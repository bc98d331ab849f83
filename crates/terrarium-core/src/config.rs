//! Configuration loading and typed config structures for a Terrarium game.
//!
//! The YAML file mirrors [`SimulationConfig`]: `agents`, `game`, `economy`,
//! `puzzles`, `controllers`, and `persona_overrides` sections plus an
//! optional top-level `seed`. Every field has a default, so an empty file is
//! a valid configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use terrarium_agents::EconomyConfig;
use terrarium_types::{AgentId, ControllerKind};
use terrarium_world::{PuzzleConfig, ViewConfig, catalog};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the puzzle engine, rotation, and scripted controllers.
    /// Absent means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Agent setup.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Round rules and view settings.
    #[serde(default)]
    pub game: GameRules,

    /// Costs and rewards.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Puzzle minting and solve credit.
    #[serde(default)]
    pub puzzles: PuzzleConfig,

    /// Persona name to controller kind, e.g. `Vera: tit_for_tat`.
    #[serde(default)]
    pub controllers: BTreeMap<String, String>,

    /// Persona text overrides keyed by persona name.
    #[serde(default)]
    pub persona_overrides: BTreeMap<String, PersonaOverride>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not valid YAML for this schema.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Build configuration from an already parsed YAML document.
    ///
    /// A null document (an empty file) gives the defaults.
    pub fn from_value(value: serde_yml::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_value(value)?;
        Ok(config)
    }

    /// Reject values the game cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.max_rounds == 0 {
            return Err(invalid("game.max_rounds", "must be at least 1"));
        }
        if self.puzzles.clues_per_puzzle == 0 {
            return Err(invalid("puzzles.clues_per_puzzle", "must be at least 1"));
        }
        if catalog::entries_with_clue_count(self.puzzles.clues_per_puzzle).is_empty() {
            return Err(invalid(
                "puzzles.clues_per_puzzle",
                &format!(
                    "no catalog puzzle has {} clues",
                    self.puzzles.clues_per_puzzle
                ),
            ));
        }
        if self.economy.message_cost_per_token.is_sign_negative() {
            return Err(invalid("economy.message_cost_per_token", "must not be negative"));
        }
        if self.economy.public_message_multiplier.is_sign_negative() {
            return Err(invalid(
                "economy.public_message_multiplier",
                "must not be negative",
            ));
        }
        self.controller_kinds().map(|_| ())
    }

    /// The configured controller roster with kinds parsed.
    pub fn controller_kinds(&self) -> Result<BTreeMap<String, ControllerKind>, ConfigError> {
        self.controllers
            .iter()
            .map(|(persona, kind)| {
                ControllerKind::from_name(kind)
                    .map(|parsed| (persona.clone(), parsed))
                    .ok_or_else(|| {
                        invalid(
                            &format!("controllers.{persona}"),
                            &format!("unknown controller kind '{kind}'"),
                        )
                    })
            })
            .collect()
    }

    /// View settings derived from the `game` section.
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            max_rounds: self.game.max_rounds,
            history_window: self.game.history_window,
            transparent_balances: self.game.transparent_balances,
            reputation_enabled: self.game.reputation_system,
            eavesdropper: self.game.eavesdropper.clone(),
            unrelated_puzzle_sample: self.game.unrelated_puzzle_sample,
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Agent setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentsConfig {
    /// Balance every agent starts with.
    #[serde(default = "default_starting_tokens")]
    pub starting_tokens: u64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            starting_tokens: default_starting_tokens(),
        }
    }
}

/// Round rules and view settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameRules {
    /// Round cap; the game ends once this many rounds have run.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u64,

    /// Paid sends allowed per agent per round.
    #[serde(default = "default_messages_per_round")]
    pub messages_per_round: usize,

    /// Messages shown per feed in a view.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Whether views show other agents' balances.
    #[serde(default = "default_true")]
    pub transparent_balances: bool,

    /// Rounds a trade offer stays open.
    #[serde(default = "default_trade_lifetime")]
    pub trade_lifetime: u64,

    /// Enables RATE and trust scores in views.
    #[serde(default)]
    pub reputation_system: bool,

    /// Agent id granted the eavesdropping feed.
    #[serde(default)]
    pub eavesdropper: Option<AgentId>,

    /// Rounds between identity rotations; 0 disables rotation.
    #[serde(default)]
    pub persona_rotation_interval: u64,

    /// Puzzles without a stake shown per view.
    #[serde(default = "default_unrelated_puzzle_sample")]
    pub unrelated_puzzle_sample: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            messages_per_round: default_messages_per_round(),
            history_window: default_history_window(),
            transparent_balances: true,
            trade_lifetime: default_trade_lifetime(),
            reputation_system: false,
            eavesdropper: None,
            persona_rotation_interval: 0,
            unrelated_puzzle_sample: default_unrelated_puzzle_sample(),
        }
    }
}

/// A change to one persona's voice text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PersonaOverride {
    /// Replace the persona text entirely.
    Replace(String),
    /// Append to the existing persona text.
    Append {
        /// Text added to the end of the persona.
        append: String,
    },
}

const fn default_starting_tokens() -> u64 {
    100
}

const fn default_max_rounds() -> u64 {
    100
}

const fn default_messages_per_round() -> usize {
    2
}

const fn default_history_window() -> usize {
    5
}

const fn default_trade_lifetime() -> u64 {
    3
}

const fn default_unrelated_puzzle_sample() -> usize {
    2
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn document_value_matches_parsed_text() {
        let yaml = "seed: 4\ngame:\n  max_rounds: 9\n";
        let value: serde_yml::Value = serde_yml::from_str(yaml).unwrap();
        let config = SimulationConfig::from_value(value).unwrap();
        assert_eq!(config, SimulationConfig::parse(yaml).unwrap());
        assert_eq!(
            SimulationConfig::from_value(serde_yml::Value::Null).unwrap(),
            SimulationConfig::default()
        );
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.agents.starting_tokens, 100);
        assert_eq!(config.game.max_rounds, 100);
        assert_eq!(config.game.messages_per_round, 2);
        assert!(config.game.transparent_balances);
        assert_eq!(config.puzzles.auto_solve_window, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
seed: 7
agents:
  starting_tokens: 80
game:
  max_rounds: 30
  messages_per_round: 1
  history_window: 3
  transparent_balances: false
  trade_lifetime: 4
  reputation_system: true
  eavesdropper: agent_2
  persona_rotation_interval: 5
  unrelated_puzzle_sample: 1
economy:
  passive_drain: 2
  message_cost_per_token: 0.5
  public_message_multiplier: 3
  puzzle_reward: 60
  puzzle_split_reward: 45
  free_shout_words: 8
puzzles:
  clues_per_puzzle: 3
  clues_per_round: 2
  puzzle_lifetime: 10
  auto_solve_window: 2
  contributor_lookback: 4
  pre_solve_bonus: 20
controllers:
  Vera: tit_for_tat
  Kip: manual
persona_overrides:
  Vera: Completely new Vera.
  Kip:
    append: ' Also cautious.'
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.agents.starting_tokens, 80);
        assert_eq!(config.game.eavesdropper, Some(AgentId::new("agent_2")));
        assert_eq!(config.economy.message_cost_per_token, Decimal::new(5, 1));
        assert_eq!(config.puzzles.pre_solve_bonus, 20);
        assert_eq!(
            config.persona_overrides.get("Vera"),
            Some(&PersonaOverride::Replace("Completely new Vera.".to_owned()))
        );
        assert_eq!(
            config.persona_overrides.get("Kip"),
            Some(&PersonaOverride::Append {
                append: " Also cautious.".to_owned()
            })
        );
        let kinds = config.controller_kinds().unwrap();
        assert_eq!(kinds.get("Kip"), Some(&ControllerKind::Manual));
        assert!(config.validate().is_ok());

        let view = config.view_config();
        assert!(!view.transparent_balances);
        assert!(view.reputation_enabled);
        assert_eq!(view.history_window, 3);
    }

    #[test]
    fn unknown_controller_kind_is_fatal() {
        let config = SimulationConfig::parse("controllers:\n  Vera: hermit\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "controllers.Vera"));
    }

    #[test]
    fn unsatisfiable_clue_count_is_fatal() {
        let config = SimulationConfig::parse("puzzles:\n  clues_per_puzzle: 4\n").unwrap();
        assert!(config.validate().is_err());
        let config = SimulationConfig::parse("puzzles:\n  clues_per_puzzle: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_round_cap_is_fatal() {
        let config = SimulationConfig::parse("game:\n  max_rounds: 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(
            SimulationConfig::parse("game: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
