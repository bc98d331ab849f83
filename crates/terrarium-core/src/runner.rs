//! Game loop runner.
//!
//! [`run_game`] wraps the single-round [`run_round`] function: it applies
//! the pre-solve bonus, runs rounds until the game-over predicate holds,
//! notifies a [`RoundCallback`] after each round and returns the final
//! statistics.
//!
//! [`run_round`]: crate::round::run_round

use std::collections::BTreeMap;

use serde::Serialize;
use terrarium_types::EventType;
use tracing::{info, warn};

use crate::decision::DecisionSource;
use crate::round::{self, GameState, RoundSummary};

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEndReason {
    /// The configured round cap was reached.
    MaxRoundsReached,
    /// Exactly one agent remains alive.
    LastSurvivor,
    /// Every agent is dead.
    Extinction,
}

/// A surviving agent and its closing balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Survivor {
    /// Display name.
    pub name: String,
    /// Closing balance.
    pub tokens: u64,
}

/// An eliminated agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eliminated {
    /// Display name.
    pub name: String,
    /// Round the agent died in.
    pub death_round: Option<u64>,
}

/// End-of-game statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalStats {
    /// Rounds executed.
    pub total_rounds: u64,
    /// Living agents, richest first. Ties keep roster order.
    pub survivors: Vec<Survivor>,
    /// Dead agents in roster order.
    pub eliminated: Vec<Eliminated>,
    /// Closing balance per agent name.
    pub final_balances: BTreeMap<String, u64>,
    /// Puzzles resolved by SOLVE or auto-solve.
    pub puzzles_solved: usize,
    /// Puzzles that expired unsolved.
    pub puzzles_expired: usize,
    /// Events in the log.
    pub total_events: usize,
}

impl FinalStats {
    /// Compute statistics from the current game state.
    pub fn collect(state: &GameState) -> Self {
        let world = &state.world;
        let mut survivors: Vec<Survivor> = world
            .agents_in_order()
            .filter(|a| a.alive)
            .map(|a| Survivor {
                name: a.name.clone(),
                tokens: a.tokens,
            })
            .collect();
        survivors.sort_by(|a, b| b.tokens.cmp(&a.tokens));

        let eliminated = world
            .agents_in_order()
            .filter(|a| !a.alive)
            .map(|a| Eliminated {
                name: a.name.clone(),
                death_round: a.death_round,
            })
            .collect();

        Self {
            total_rounds: world.round,
            survivors,
            eliminated,
            final_balances: world
                .agents_in_order()
                .map(|a| (a.name.clone(), a.tokens))
                .collect(),
            puzzles_solved: world.solved_puzzles.len(),
            puzzles_expired: world
                .event_log
                .iter()
                .filter(|e| e.event_type == EventType::PuzzleExpired)
                .count(),
            total_events: world.event_log.len(),
        }
    }
}

/// Result of a complete game.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Why the game ended.
    pub end_reason: GameEndReason,
    /// The last round summary, if any round ran.
    pub final_summary: Option<RoundSummary>,
    /// Closing statistics.
    pub stats: FinalStats,
}

/// Callback invoked after each round completes.
///
/// Implementations can use this to persist events, render progress, etc.
pub trait RoundCallback {
    /// Called after a round completes.
    fn on_round(&mut self, summary: &RoundSummary, state: &GameState);
}

/// A no-op round callback for testing.
pub struct NoOpCallback;

impl RoundCallback for NoOpCallback {
    fn on_round(&mut self, _summary: &RoundSummary, _state: &GameState) {}
}

/// Run the game until the round cap is reached or at most one agent lives.
///
/// The pre-solve bonus is applied once before the first round.
pub fn run_game(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
    callback: &mut dyn RoundCallback,
) -> GameResult {
    info!(
        agents = state.world.roster.len(),
        max_rounds = state.rules.max_rounds,
        "Game starting"
    );
    state.apply_pre_solve_bonus();

    let mut last_summary = None;
    while !state.is_game_over() {
        let summary = round::run_round(state, source);
        callback.on_round(&summary, state);
        last_summary = Some(summary);
    }

    let end_reason = match state.world.alive_count() {
        0 => GameEndReason::Extinction,
        1 => GameEndReason::LastSurvivor,
        _ => GameEndReason::MaxRoundsReached,
    };
    GameResult {
        end_reason,
        final_summary: last_summary,
        stats: FinalStats::collect(state),
    }
}

/// Log the game end sequence.
pub fn log_game_end(result: &GameResult) {
    info!(
        reason = ?result.end_reason,
        total_rounds = result.stats.total_rounds,
        survivors = result.stats.survivors.len(),
        puzzles_solved = result.stats.puzzles_solved,
        puzzles_expired = result.stats.puzzles_expired,
        "Game ended"
    );

    if let Some(winner) = result.stats.survivors.first() {
        info!(name = %winner.name, tokens = winner.tokens, "Richest survivor");
    } else if result.final_summary.is_none() {
        warn!("Game ended with no rounds executed");
    }
}
