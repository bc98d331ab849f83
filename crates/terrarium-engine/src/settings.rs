//! Runtime settings for the engine binary.
//!
//! Game rules live in the YAML file; everything about *this run* comes
//! from environment variables:
//!
//! - `TERRARIUM_CONFIG` -- path to the game config (default `terrarium-config.yaml`)
//! - `TERRARIUM_RESULTS_DIR` -- event log root (default `results`)
//! - `TERRARIUM_GAME_ID` -- log directory name (default a fresh UUID v7)
//! - `TERRARIUM_MODE` -- `scripted` or `manual` (default `scripted`)
//! - `TERRARIUM_MAX_ROUNDS` -- overrides `game.max_rounds`
//! - `TERRARIUM_TEMPLATES` -- prompt template directory (default built-in)
//! - `TERRARIUM_EXPERIMENT` -- experiment file layered over the config
//! - `TERRARIUM_REPEAT` -- replications of the experiment (default 1)
//! - `TERRARIUM_GAME_ID_PREFIX` -- replication id prefix (default the
//!   experiment file's stem)

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "terrarium-config.yaml";
const DEFAULT_RESULTS_DIR: &str = "results";

/// How agents are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Controllers as configured (scripted strategies by default).
    Scripted,
    /// Every agent reads its actions from the terminal.
    Manual,
}

impl Mode {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "scripted" => Some(Self::Scripted),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Settings for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Game config file. A missing file means defaults.
    pub config_path: PathBuf,
    /// Root directory for per-game event logs.
    pub results_dir: PathBuf,
    /// Identifier of this game.
    pub game_id: String,
    /// Controller mode.
    pub mode: Mode,
    /// Round cap override.
    pub max_rounds: Option<u64>,
    /// Prompt template directory override.
    pub templates_dir: Option<PathBuf>,
    /// Experiment file to run instead of a single game.
    pub experiment: Option<PathBuf>,
    /// Number of experiment replications, at least 1.
    pub repeat: u32,
    /// Prefix for replication game ids.
    pub game_id_prefix: Option<String>,
}

impl EngineSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("TERRARIUM_MODE") {
            Some(raw) => Mode::from_name(&raw).ok_or_else(|| EngineError::Env {
                name: "TERRARIUM_MODE",
                reason: format!("expected 'scripted' or 'manual', got '{raw}'"),
            })?,
            None => Mode::Scripted,
        };

        let max_rounds = lookup("TERRARIUM_MAX_ROUNDS")
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| EngineError::Env {
                    name: "TERRARIUM_MAX_ROUNDS",
                    reason: format!("{e}"),
                })
            })
            .transpose()?;

        let experiment = lookup("TERRARIUM_EXPERIMENT")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let repeat = match lookup("TERRARIUM_REPEAT") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("{e}"))
                .and_then(|n| {
                    if n == 0 {
                        Err("must be at least 1".to_owned())
                    } else {
                        Ok(n)
                    }
                })
                .map_err(|reason| EngineError::Env {
                    name: "TERRARIUM_REPEAT",
                    reason,
                })?,
            None => 1,
        };
        if repeat > 1 && experiment.is_none() {
            return Err(EngineError::Env {
                name: "TERRARIUM_REPEAT",
                reason: "replications need TERRARIUM_EXPERIMENT".to_owned(),
            });
        }

        Ok(Self {
            config_path: lookup("TERRARIUM_CONFIG")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
            results_dir: lookup("TERRARIUM_RESULTS_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR), PathBuf::from),
            game_id: lookup("TERRARIUM_GAME_ID")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            mode,
            max_rounds,
            templates_dir: lookup("TERRARIUM_TEMPLATES").map(PathBuf::from),
            experiment,
            repeat,
            game_id_prefix: lookup("TERRARIUM_GAME_ID_PREFIX").filter(|p| !p.trim().is_empty()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<EngineSettings, EngineError> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        EngineSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.config_path, PathBuf::from("terrarium-config.yaml"));
        assert_eq!(s.results_dir, PathBuf::from("results"));
        assert_eq!(s.mode, Mode::Scripted);
        assert_eq!(s.max_rounds, None);
        assert_eq!(s.templates_dir, None);
        assert_eq!(s.experiment, None);
        assert_eq!(s.repeat, 1);
        assert!(Uuid::parse_str(&s.game_id).is_ok());
    }

    #[test]
    fn overrides_are_read() {
        let s = settings(&[
            ("TERRARIUM_CONFIG", "/etc/game.yaml"),
            ("TERRARIUM_GAME_ID", "trial-3"),
            ("TERRARIUM_MODE", "Manual"),
            ("TERRARIUM_MAX_ROUNDS", "12"),
            ("TERRARIUM_TEMPLATES", "prompts"),
        ])
        .unwrap();
        assert_eq!(s.config_path, PathBuf::from("/etc/game.yaml"));
        assert_eq!(s.game_id, "trial-3");
        assert_eq!(s.mode, Mode::Manual);
        assert_eq!(s.max_rounds, Some(12));
        assert_eq!(s.templates_dir, Some(PathBuf::from("prompts")));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            settings(&[("TERRARIUM_MODE", "llm")]),
            Err(EngineError::Env { name: "TERRARIUM_MODE", .. })
        ));
        assert!(matches!(
            settings(&[("TERRARIUM_MAX_ROUNDS", "many")]),
            Err(EngineError::Env { name: "TERRARIUM_MAX_ROUNDS", .. })
        ));
    }

    #[test]
    fn experiment_settings_are_read() {
        let s = settings(&[
            ("TERRARIUM_EXPERIMENT", "experiments/scarce.yaml"),
            ("TERRARIUM_REPEAT", "3"),
            ("TERRARIUM_GAME_ID_PREFIX", "scarce"),
        ])
        .unwrap();
        assert_eq!(s.experiment, Some(PathBuf::from("experiments/scarce.yaml")));
        assert_eq!(s.repeat, 3);
        assert_eq!(s.game_id_prefix.as_deref(), Some("scarce"));
    }

    #[test]
    fn repeat_needs_an_experiment_and_a_positive_count() {
        assert!(matches!(
            settings(&[("TERRARIUM_REPEAT", "2")]),
            Err(EngineError::Env { name: "TERRARIUM_REPEAT", .. })
        ));
        assert!(matches!(
            settings(&[("TERRARIUM_EXPERIMENT", "e.json"), ("TERRARIUM_REPEAT", "0")]),
            Err(EngineError::Env { name: "TERRARIUM_REPEAT", .. })
        ));
    }
}
