//! Core entity structs: agents, clues, puzzles, messages, trade offers, events.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EventType;
use crate::ids::{AgentId, EventId, PuzzleId, TradeId};

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Mutable per-agent game state.
///
/// `alive` flips to `false` exactly once, when the balance reaches zero, and
/// `death_round` is set at the same moment and never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Roster identifier.
    pub id: AgentId,
    /// Display name (persona name at registration).
    pub name: String,
    /// Token balance. Never negative by construction.
    pub tokens: u64,
    /// Whether the agent is still in the game.
    pub alive: bool,
    /// Held clues, at most one per puzzle.
    pub inventory: BTreeMap<PuzzleId, Clue>,
    /// Agents this one has exchanged private messages with.
    pub known_agents: BTreeSet<AgentId>,
    /// Round in which the agent died, if it has.
    pub death_round: Option<u64>,
}

impl Agent {
    /// Create a living agent with an empty inventory.
    pub fn new(id: AgentId, name: impl Into<String>, tokens: u64) -> Self {
        Self {
            id,
            name: name.into(),
            tokens,
            alive: true,
            inventory: BTreeMap::new(),
            known_agents: BTreeSet::new(),
            death_round: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Clue
// ---------------------------------------------------------------------------

/// One partial-answer fragment of a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Clue {
    /// The puzzle this clue belongs to.
    pub puzzle_id: PuzzleId,
    /// Ordinal of this clue within the puzzle.
    pub index: u32,
    /// Letter-fill text, e.g. `The answer is BL__`.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Puzzle
// ---------------------------------------------------------------------------

/// A puzzle whose clues are split across several agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Puzzle {
    /// Unique puzzle identifier.
    pub id: PuzzleId,
    /// Catalog category (color, animal, ...).
    pub category: String,
    /// Ordered clues.
    pub clues: Vec<Clue>,
    /// Canonical answer, uppercase.
    pub answer: String,
    /// Human-readable description shown in views.
    pub description: String,
    /// Round the puzzle was minted in.
    pub created_round: u64,
    /// Number of rounds the puzzle stays active.
    pub lifetime: u64,
    /// Clue index to the agent it was assigned to at creation.
    pub assigned: BTreeMap<u32, AgentId>,
    /// Whether the puzzle has been solved.
    pub solved: bool,
    /// Agents credited with the solve.
    pub solved_by: Vec<AgentId>,
    /// Round the puzzle was solved in.
    pub solved_round: Option<u64>,
}

impl Puzzle {
    /// Whether the puzzle's age has reached its lifetime at `round`.
    pub const fn is_expired(&self, round: u64) -> bool {
        round.saturating_sub(self.created_round) >= self.lifetime
    }

    /// Whether `agent_id` was assigned one of this puzzle's clues.
    pub fn is_holder(&self, agent_id: &AgentId) -> bool {
        self.assigned.values().any(|holder| holder == agent_id)
    }

    /// Assigned clue holders in clue-index order.
    pub fn holders(&self) -> Vec<AgentId> {
        self.assigned.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Message {
    /// The sending agent.
    pub sender: AgentId,
    /// The sender's display name at send time.
    pub sender_name: String,
    /// Message text, opaque to the engine.
    pub content: String,
    /// Round the message was sent in.
    pub round: u64,
    /// Recipient of a private message; `None` for public messages.
    pub recipient: Option<AgentId>,
    /// Tokens charged for the message (0 for shouts).
    pub token_cost: u64,
    /// Real-world time of creation.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TradeOffer
// ---------------------------------------------------------------------------

/// Resolution state of a trade offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TradeStatus {
    /// Waiting for the target to accept.
    Pending,
    /// Accepted and settled.
    Accepted,
    /// An acceptance was attempted but could not be settled.
    NotAccepted,
}

/// A token offer from one agent to another in exchange for something
/// described in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TradeOffer {
    /// Sequential offer identifier.
    pub id: TradeId,
    /// The agent offering tokens.
    pub proposer: AgentId,
    /// The agent the offer is addressed to.
    pub target: AgentId,
    /// Tokens offered. Always greater than zero.
    pub offer_tokens: u64,
    /// What the proposer wants in return (free text).
    pub ask: String,
    /// Round the offer was created in.
    pub created_round: u64,
    /// Number of rounds the offer stays open.
    pub lifetime: u64,
    /// Current resolution.
    pub status: TradeStatus,
}

impl TradeOffer {
    /// Whether the offer's age has reached its lifetime at `round`.
    pub const fn is_expired(&self, round: u64) -> bool {
        round.saturating_sub(self.created_round) >= self.lifetime
    }

    /// Rounds remaining before the offer expires at `round`.
    pub const fn expires_in(&self, round: u64) -> u64 {
        self.lifetime
            .saturating_sub(round.saturating_sub(self.created_round))
    }

    /// Whether the offer is still waiting for its target.
    pub fn is_pending(&self) -> bool {
        self.status == TradeStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An append-only record in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// The round when this event occurred.
    pub round: u64,
    /// The category of event.
    pub event_type: EventType,
    /// The acting agent; `None` for system events.
    pub agent_id: Option<AgentId>,
    /// Type-specific payload.
    pub details: serde_json::Value,
    /// Real-world timestamp when the event was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(
        round: u64,
        event_type: EventType,
        agent_id: Option<AgentId>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: EventId::new(),
            round,
            event_type,
            agent_id,
            details,
            created_at: Utc::now(),
        }
    }

    /// Read a string field from the payload.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(serde_json::Value::as_str)
    }
}
