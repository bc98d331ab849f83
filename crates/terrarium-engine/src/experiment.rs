//! Experiments: a base config plus overrides, run one or more times.
//!
//! An experiment file (YAML, or JSON when the extension is `.json`) looks
//! like:
//!
//! ```yaml
//! notes: Scarce economy, hostile Marsh
//! config_overrides:
//!   economy:
//!     passive_drain: 3
//! persona_overrides:
//!   Marsh:
//!     append: Never share a true clue.
//! ```
//!
//! `config_overrides` is merged into the base config document key by key:
//! nested mappings merge recursively, anything else replaces the base
//! value. `persona_overrides` entries replace the base config's entries of
//! the same persona.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_yml::Value;
use terrarium_core::config::PersonaOverride;
use terrarium_core::{ConfigError, SimulationConfig};
use tracing::info;

use crate::error::EngineError;
use crate::game::{self, PlayedGame};
use crate::settings::EngineSettings;

/// An experiment definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Experiment {
    /// Free-form description, logged at startup.
    #[serde(default)]
    pub notes: Option<String>,
    /// Partial config document layered over the base config.
    #[serde(default)]
    pub config_overrides: Option<Value>,
    /// Persona text overrides.
    #[serde(default)]
    pub persona_overrides: BTreeMap<String, PersonaOverride>,
}

impl Experiment {
    /// Load an experiment file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let fail = |reason: String| EngineError::Experiment {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents).map_err(|e| fail(e.to_string()))
        } else if contents.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yml::from_str(&contents).map_err(|e| fail(e.to_string()))
        }
    }

    /// Layer this experiment over the base config document.
    pub fn apply(&self, mut base: Value) -> Result<SimulationConfig, EngineError> {
        if let Some(overrides) = &self.config_overrides {
            merge_overrides(&mut base, overrides.clone());
        }
        let mut config = SimulationConfig::from_value(base)?;
        config.persona_overrides.extend(
            self.persona_overrides
                .iter()
                .map(|(name, change)| (name.clone(), change.clone())),
        );
        config.validate()?;
        Ok(config)
    }
}

/// Read the base config as a raw document. A missing file is an empty one.
pub fn load_base(path: &Path) -> Result<Value, EngineError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Value::Null);
    }
    let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
    if contents.trim().is_empty() {
        return Ok(Value::Null);
    }
    let document = serde_yml::from_str(&contents).map_err(ConfigError::from)?;
    Ok(document)
}

/// Merge `overrides` into `base`.
///
/// Where both sides hold a mapping under the same key the merge recurses;
/// otherwise the override replaces the base value.
pub fn merge_overrides(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) if slot.is_mapping() && value.is_mapping() => {
                        merge_overrides(slot, value);
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

/// One planned run of an experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replication {
    /// Game id, also the event log directory name.
    pub game_id: String,
    /// Config for this run.
    pub config: SimulationConfig,
}

/// Plan `repeat` runs of `config`.
///
/// Ids are `<prefix>_<stamp>` for a single run and `<prefix>_rep<i>_<stamp>`
/// otherwise, with `i` counting from 1. A seeded config gives replication
/// `i` the seed `seed + i - 1`, so runs differ but each one replays.
pub fn plan_replications(
    config: &SimulationConfig,
    prefix: &str,
    repeat: u32,
    started: &DateTime<Utc>,
) -> Vec<Replication> {
    let stamp = started.format("%Y%m%dT%H%M%S");
    (1..=repeat.max(1))
        .map(|index| {
            let game_id = if repeat > 1 {
                format!("{prefix}_rep{index}_{stamp}")
            } else {
                format!("{prefix}_{stamp}")
            };
            let mut config = config.clone();
            config.seed = config
                .seed
                .map(|seed| seed.wrapping_add(u64::from(index).saturating_sub(1)));
            Replication { game_id, config }
        })
        .collect()
}

/// Prefix for replication ids: the configured one, else the file stem.
pub fn game_id_prefix(settings: &EngineSettings, experiment_path: &Path) -> String {
    settings.game_id_prefix.clone().unwrap_or_else(|| {
        experiment_path
            .file_stem()
            .map_or_else(|| "experiment".to_owned(), |s| s.to_string_lossy().into_owned())
    })
}

/// Load the experiment named by `settings` and play every replication.
pub fn run(settings: &EngineSettings, experiment_path: &Path) -> Result<Vec<PlayedGame>, EngineError> {
    let experiment = Experiment::load(experiment_path)?;
    let mut config = experiment.apply(load_base(&settings.config_path)?)?;
    if let Some(max_rounds) = settings.max_rounds {
        config.game.max_rounds = max_rounds;
    }
    info!(
        experiment = %experiment_path.display(),
        notes = experiment.notes.as_deref().unwrap_or("(none)"),
        replications = settings.repeat,
        persona_overrides = experiment.persona_overrides.len(),
        "Experiment loaded"
    );

    let prefix = game_id_prefix(settings, experiment_path);
    let plan = plan_replications(&config, &prefix, settings.repeat, &Utc::now());
    let total = plan.len();
    let mut played = Vec::with_capacity(total);
    for (index, replication) in (1_usize..).zip(&plan) {
        info!(replication = index, total, game_id = %replication.game_id, "Replication started");
        let game = game::play(&replication.config, settings, &replication.game_id)?;
        info!(
            replication = index,
            total_rounds = game.result.stats.total_rounds,
            survivors = game.result.stats.survivors.len(),
            puzzles_solved = game.result.stats.puzzles_solved,
            "Replication finished"
        );
        played.push(game);
    }
    Ok(played)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::settings::Mode;

    fn yaml(text: &str) -> Value {
        serde_yml::from_str(text).unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "terrarium_experiment_{name}_{}",
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn settings(dir: &Path, repeat: u32) -> EngineSettings {
        EngineSettings {
            config_path: dir.join("missing.yaml"),
            results_dir: dir.join("results"),
            game_id: "unused".to_owned(),
            mode: Mode::Scripted,
            max_rounds: Some(2),
            templates_dir: None,
            experiment: None,
            repeat,
            game_id_prefix: None,
        }
    }

    #[test]
    fn nested_override_keeps_sibling_keys() {
        let mut base = yaml("economy:\n  passive_drain: 1\n  puzzle_reward: 50\ngame:\n  max_rounds: 30\n");
        merge_overrides(&mut base, yaml("economy:\n  passive_drain: 3\nseed: 8\n"));
        assert_eq!(
            base,
            yaml("economy:\n  passive_drain: 3\n  puzzle_reward: 50\ngame:\n  max_rounds: 30\nseed: 8\n")
        );
    }

    #[test]
    fn scalar_override_replaces_a_mapping() {
        let mut base = yaml("controllers:\n  Vera: cooperator\n");
        merge_overrides(&mut base, yaml("controllers: {}\n"));
        let config = SimulationConfig::from_value(base).unwrap();
        assert!(config.controllers.is_empty());

        let mut empty = Value::Null;
        merge_overrides(&mut empty, yaml("seed: 2\n"));
        assert_eq!(empty, yaml("seed: 2\n"));
    }

    #[test]
    fn experiment_applies_config_and_persona_overrides() {
        let experiment: Experiment = serde_json::from_str(
            r#"{
                "notes": "scarce",
                "config_overrides": {"economy": {"message_cost_per_token": 0.5}},
                "persona_overrides": {"Marsh": {"append": "Trust no one."}}
            }"#,
        )
        .unwrap();
        let base = yaml("seed: 3\neconomy:\n  puzzle_reward: 60\npersona_overrides:\n  Kip: Kip is quiet.\n");
        let config = experiment.apply(base).unwrap();

        assert_eq!(config.seed, Some(3));
        assert_eq!(config.economy.puzzle_reward, 60);
        assert_eq!(config.economy.message_cost_per_token, Decimal::new(5, 1));
        assert_eq!(config.persona_overrides.len(), 2);
        assert_eq!(
            config.persona_overrides["Marsh"],
            PersonaOverride::Append {
                append: "Trust no one.".to_owned()
            }
        );
    }

    #[test]
    fn invalid_merged_config_is_rejected() {
        let experiment = Experiment {
            config_overrides: Some(yaml("game:\n  max_rounds: 0\n")),
            ..Experiment::default()
        };
        assert!(matches!(
            experiment.apply(Value::Null),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn loads_yaml_and_json_by_extension() {
        let dir = temp_dir("load");
        let yaml_path = dir.join("scarce.yaml");
        fs::write(&yaml_path, "notes: yaml run\nconfig_overrides:\n  seed: 5\n").unwrap();
        let json_path = dir.join("scarce.json");
        fs::write(&json_path, r#"{"notes": "json run", "model_map": {"Vera": "x"}}"#).unwrap();

        assert_eq!(Experiment::load(&yaml_path).unwrap().notes.as_deref(), Some("yaml run"));
        assert_eq!(Experiment::load(&json_path).unwrap().notes.as_deref(), Some("json run"));
        assert!(matches!(
            Experiment::load(&dir.join("absent.json")),
            Err(EngineError::Experiment { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn replications_get_prefixed_ids_and_stepped_seeds() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let config = SimulationConfig::parse("seed: 10\n").unwrap();

        let plan = plan_replications(&config, "scarce", 3, &started);
        let ids: Vec<&str> = plan.iter().map(|r| r.game_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "scarce_rep1_20260301T120000",
                "scarce_rep2_20260301T120000",
                "scarce_rep3_20260301T120000",
            ]
        );
        let seeds: Vec<Option<u64>> = plan.iter().map(|r| r.config.seed).collect();
        assert_eq!(seeds, vec![Some(10), Some(11), Some(12)]);

        let single = plan_replications(&config, "scarce", 1, &started);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].game_id, "scarce_20260301T120000");
    }

    #[test]
    fn prefix_defaults_to_file_stem() {
        let dir = temp_dir("prefix");
        let mut s = settings(&dir, 1);
        assert_eq!(game_id_prefix(&s, Path::new("experiments/hostile.json")), "hostile");
        s.game_id_prefix = Some("trial".to_owned());
        assert_eq!(game_id_prefix(&s, Path::new("experiments/hostile.json")), "trial");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn run_plays_every_replication() {
        let dir = temp_dir("repeat");
        let experiment_path = dir.join("quick.yaml");
        fs::write(&experiment_path, "config_overrides:\n  seed: 21\n").unwrap();
        let s = settings(&dir, 3);

        let played = run(&s, &experiment_path).unwrap();
        assert_eq!(played.len(), 3);
        for (index, game) in (1..).zip(&played) {
            let path = &game.events;
            assert!(path.exists());
            let game_dir = path.parent().unwrap().file_name().unwrap().to_string_lossy();
            assert!(game_dir.starts_with(&format!("quick_rep{index}_")));
        }
        assert!(played.iter().all(|game| game.result.stats.total_rounds <= 2));

        fs::remove_dir_all(&dir).ok();
    }
}
