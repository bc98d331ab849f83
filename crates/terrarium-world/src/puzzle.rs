//! Puzzle minting, answer checking and expiry.
//!
//! The [`PuzzleEngine`] owns its catalog cursor and RNG, so independent games
//! never share shuffle state. The catalog is filtered to the configured clue
//! count, shuffled once, consumed in order and reshuffled on exhaustion.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use terrarium_types::{Clue, EventType, Puzzle, PuzzleId};
use tracing::{debug, info};

use crate::catalog::{self, CatalogEntry};
use crate::config::PuzzleConfig;
use crate::error::PuzzleError;
use crate::state::WorldState;

/// Mints puzzles into the world and retires them.
#[derive(Debug)]
pub struct PuzzleEngine {
    /// Minting parameters.
    config: PuzzleConfig,
    /// Catalog entries matching the configured clue count, in draw order.
    pool: Vec<&'static CatalogEntry>,
    /// Index of the next entry to draw.
    cursor: usize,
    /// Sequence number of the last minted puzzle.
    minted: u64,
    /// Source of shuffles, id letters and recipient samples.
    rng: StdRng,
}

impl PuzzleEngine {
    /// Create an engine. A `seed` makes minting reproducible.
    pub fn new(config: PuzzleConfig, seed: Option<u64>) -> Result<Self, PuzzleError> {
        if config.clues_per_puzzle == 0 {
            return Err(PuzzleError::ZeroClues);
        }
        let mut pool = catalog::entries_with_clue_count(config.clues_per_puzzle);
        if pool.is_empty() {
            return Err(PuzzleError::EmptyCatalog {
                clues_per_puzzle: config.clues_per_puzzle,
            });
        }
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        pool.shuffle(&mut rng);
        Ok(Self {
            config,
            pool,
            cursor: 0,
            minted: 0,
            rng,
        })
    }

    /// The engine's configuration.
    pub const fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    /// Mint this round's puzzles and distribute their clues.
    ///
    /// Nothing is minted when fewer living agents exist than clues per
    /// puzzle. Returns the ids of the new puzzles.
    pub fn mint(&mut self, world: &mut WorldState) -> Vec<PuzzleId> {
        let alive = world.alive_agent_ids();
        let clue_count = usize::try_from(self.config.clues_per_puzzle).unwrap_or(usize::MAX);
        if alive.len() < clue_count {
            debug!(
                round = world.round,
                alive = alive.len(),
                clue_count,
                "Too few living agents to mint puzzles"
            );
            return Vec::new();
        }

        let mut minted = Vec::new();
        for _ in 0..self.config.clues_per_round {
            let Some(entry) = self.draw() else {
                break;
            };
            let id = self.next_id();

            let recipients: Vec<_> = rand::seq::index::sample(&mut self.rng, alive.len(), clue_count)
                .iter()
                .filter_map(|i| alive.get(i).cloned())
                .collect();

            let mut clues = Vec::new();
            let mut assigned = BTreeMap::new();
            let mut clue_holders = serde_json::Map::new();
            for (index, (holder, text)) in (0_u32..).zip(recipients.iter().zip(entry.clues)) {
                let clue = Clue {
                    puzzle_id: id.clone(),
                    index,
                    text: (*text).to_owned(),
                };
                if let Some(agent) = world.agent_mut(holder) {
                    agent.inventory.insert(id.clone(), clue.clone());
                    clue_holders.insert(agent.name.clone(), json!(text));
                }
                assigned.insert(index, holder.clone());
                clues.push(clue);
            }

            let description = format!(
                "Puzzle {id} ({category}): Each clue shows part of the word. \
                 Combine the {n} letter patterns to spell the answer.",
                category = entry.category,
                n = clues.len(),
            );

            world.log_event(
                EventType::PuzzleCreated,
                None,
                json!({
                    "puzzle_id": id,
                    "category": entry.category,
                    "answer": entry.answer,
                    "clue_holders": clue_holders,
                }),
            );
            debug!(round = world.round, puzzle_id = %id, category = entry.category, "Puzzle minted");

            world.active_puzzles.push(Puzzle {
                id: id.clone(),
                category: entry.category.to_owned(),
                clues,
                answer: entry.answer.to_owned(),
                description,
                created_round: world.round,
                lifetime: self.config.puzzle_lifetime,
                assigned,
                solved: false,
                solved_by: Vec::new(),
                solved_round: None,
            });
            minted.push(id);
        }
        minted
    }

    /// Case-insensitive, whitespace-trimmed exact match against the answer.
    pub fn check_answer(puzzle: &Puzzle, answer: &str) -> bool {
        answer.trim().to_uppercase() == puzzle.answer.to_uppercase()
    }

    /// Retire every unsolved puzzle whose age has reached its lifetime.
    ///
    /// Expired clues are removed from every inventory. Solved puzzles are
    /// never expired. Returns the ids of the expired puzzles.
    pub fn expire(world: &mut WorldState) -> Vec<PuzzleId> {
        let round = world.round;
        let (expired, still_active): (Vec<Puzzle>, Vec<Puzzle>) = world
            .active_puzzles
            .drain(..)
            .partition(|p| !p.solved && p.is_expired(round));
        world.active_puzzles = still_active;

        let mut ids = Vec::new();
        for puzzle in expired {
            world.purge_clues(&puzzle.id);
            world.log_event(
                EventType::PuzzleExpired,
                None,
                json!({ "puzzle_id": puzzle.id }),
            );
            info!(round, puzzle_id = %puzzle.id, "Puzzle expired unsolved");
            ids.push(puzzle.id);
        }
        ids
    }

    /// Next catalog entry, reshuffling when the pool is exhausted.
    fn draw(&mut self) -> Option<&'static CatalogEntry> {
        if self.cursor >= self.pool.len() {
            self.pool.shuffle(&mut self.rng);
            self.cursor = 0;
        }
        let entry = self.pool.get(self.cursor).copied();
        self.cursor = self.cursor.saturating_add(1);
        entry
    }

    /// Next puzzle id: a random uppercase letter and the mint sequence.
    fn next_id(&mut self) -> PuzzleId {
        self.minted = self.minted.saturating_add(1);
        let letter = char::from(self.rng.random_range(b'A'..=b'Z'));
        PuzzleId::from_parts(letter, self.minted)
    }
}
