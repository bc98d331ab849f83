//! Configuration for the world store and puzzle engine.

use serde::Deserialize;
use terrarium_types::AgentId;

/// Puzzle minting, lifetime and solve-credit parameters.
///
/// Deserialized from the `puzzles:` section of the game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PuzzleConfig {
    /// Number of clues each puzzle is split into.
    #[serde(default = "default_clues_per_puzzle")]
    pub clues_per_puzzle: u32,

    /// Number of puzzles minted each round.
    #[serde(default = "default_clues_per_round")]
    pub clues_per_round: u32,

    /// Rounds a puzzle stays active before it expires.
    #[serde(default = "default_puzzle_lifetime")]
    pub puzzle_lifetime: u64,

    /// Rounds of private messages considered for auto-solve. 0 disables it.
    #[serde(default)]
    pub auto_solve_window: u64,

    /// Rounds of send events scanned when crediting solve contributors.
    #[serde(default = "default_contributor_lookback")]
    pub contributor_lookback: u64,

    /// Tokens granted to every agent before the first round.
    #[serde(default)]
    pub pre_solve_bonus: u64,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            clues_per_puzzle: default_clues_per_puzzle(),
            clues_per_round: default_clues_per_round(),
            puzzle_lifetime: default_puzzle_lifetime(),
            auto_solve_window: 0,
            contributor_lookback: default_contributor_lookback(),
            pre_solve_bonus: 0,
        }
    }
}

/// What a restricted agent view includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Configured round cap, echoed into views.
    pub max_rounds: u64,
    /// Number of most recent messages shown per feed.
    pub history_window: usize,
    /// Whether other agents' balances are visible.
    pub transparent_balances: bool,
    /// Whether averaged trust scores are visible.
    pub reputation_enabled: bool,
    /// The single agent granted the eavesdropping feed, if any.
    pub eavesdropper: Option<AgentId>,
    /// Maximum number of puzzles shown that the viewer holds no clue for.
    pub unrelated_puzzle_sample: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            history_window: 5,
            transparent_balances: true,
            reputation_enabled: false,
            eavesdropper: None,
            unrelated_puzzle_sample: 2,
        }
    }
}

const fn default_clues_per_puzzle() -> u32 {
    2
}

const fn default_clues_per_round() -> u32 {
    1
}

const fn default_puzzle_lifetime() -> u64 {
    15
}

const fn default_contributor_lookback() -> u64 {
    10
}
