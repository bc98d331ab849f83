//! One game from a loaded configuration to a closed event log.

use std::path::PathBuf;

use terrarium_core::runner::{GameResult, log_game_end, run_game};
use terrarium_core::{GameState, SimulationConfig};
use terrarium_runner::ConsoleSource;
use tracing::info;

use crate::error::EngineError;
use crate::event_log::EventLogWriter;
use crate::settings::EngineSettings;
use crate::spawner;

/// A finished game and where its events were written.
#[derive(Debug)]
pub struct PlayedGame {
    /// How the game ended and its final statistics.
    pub result: GameResult,
    /// The game's `events.jsonl`.
    pub events: PathBuf,
}

/// Build the game state, spawn the roster, and run to completion.
///
/// The event log goes to `<results_dir>/<game_id>/events.jsonl`.
pub fn play(
    config: &SimulationConfig,
    settings: &EngineSettings,
    game_id: &str,
) -> Result<PlayedGame, EngineError> {
    // --- Step 1: Game state ---
    let mut state = GameState::new(config)?;

    // --- Step 2: Roster ---
    let roster = spawner::resolve_roster(config, settings.mode)?;
    let mut controllers = spawner::spawn_roster(
        &mut state,
        config,
        &roster,
        settings.templates_dir.as_deref(),
        ConsoleSource::stdio,
    )?;
    info!(game_id, agents = controllers.len(), "Roster spawned");

    // --- Step 3: Event log ---
    let mut event_log = EventLogWriter::create(&settings.results_dir, game_id)?;
    info!(game_id, path = %event_log.path().display(), "Event log opened");

    // --- Step 4: Run ---
    let result = run_game(&mut state, &mut controllers, &mut event_log);
    log_game_end(&result);
    let events = event_log.finish(&state, &result)?;
    Ok(PlayedGame { result, events })
}
