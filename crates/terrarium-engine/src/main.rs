//! Game engine binary for Terrarium.
//!
//! This is the main entry point that wires together configuration, the
//! agent roster, the round loop and the event log. It runs one game, or
//! every replication of an experiment, and exits.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Read runtime settings from the environment
//! 3. Experiment mode: layer the experiment over the config and run each
//!    replication, then exit
//! 4. Load the game configuration (`terrarium-config.yaml` by default)
//! 5. Play the game: state, roster, event log, round loop
//! 6. Log the result

mod error;
mod event_log;
mod experiment;
mod game;
mod settings;
mod spawner;

use std::path::Path;

use anyhow::Context;
use terrarium_core::SimulationConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::settings::EngineSettings;

/// Application entry point for the game engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails or the event log
/// cannot be written.
fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    init_tracing();
    info!("terrarium-engine starting");

    // 2. Runtime settings.
    let settings = EngineSettings::from_env()?;
    info!(
        game_id = %settings.game_id,
        mode = ?settings.mode,
        config_path = %settings.config_path.display(),
        "Settings loaded"
    );

    // 3. Experiment mode.
    if let Some(path) = &settings.experiment {
        let played = experiment::run(&settings, path)
            .with_context(|| format!("experiment {} failed", path.display()))?;
        for game in &played {
            info!(
                end_reason = ?game.result.end_reason,
                total_rounds = game.result.stats.total_rounds,
                events = %game.events.display(),
                "Replication result"
            );
        }
        info!(replications = played.len(), "terrarium-engine shutdown complete");
        return Ok(());
    }

    // 4. Load configuration.
    let mut config = load_config(&settings.config_path)?;
    if let Some(max_rounds) = settings.max_rounds {
        config.game.max_rounds = max_rounds;
    }
    info!(
        seed = ?config.seed,
        max_rounds = config.game.max_rounds,
        starting_tokens = config.agents.starting_tokens,
        clues_per_puzzle = config.puzzles.clues_per_puzzle,
        "Configuration loaded"
    );

    // 5. Play the game.
    let played = game::play(&config, &settings, &settings.game_id).with_context(|| {
        format!(
            "game {} failed (results under {})",
            settings.game_id,
            settings.results_dir.display()
        )
    })?;

    // 6. Log results.
    info!(
        end_reason = ?played.result.end_reason,
        total_rounds = played.result.stats.total_rounds,
        events = %played.events.display(),
        "terrarium-engine shutdown complete"
    );
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so manual-mode prompts on stdout stay readable.
/// `TERRARIUM_LOG_JSON=1` selects the JSON formatter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TERRARIUM_LOG_JSON").is_ok_and(|value| value == "1");
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the game configuration.
///
/// A missing file means defaults; a file that exists but fails to parse
/// is an error.
fn load_config(path: &Path) -> anyhow::Result<SimulationConfig> {
    if path.exists() {
        SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
