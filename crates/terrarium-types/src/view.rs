//! The restricted view handed to a controller each round.
//!
//! The view is the **only** information an agent receives about the world.
//! Ground-truth clue assignments, other agents' inventories and individual
//! ratings never appear here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, PuzzleId, TradeId};

// ---------------------------------------------------------------------------
// AgentView
// ---------------------------------------------------------------------------

/// Everything one agent can see at the start of its turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentView {
    /// The viewing agent.
    pub agent_id: AgentId,
    /// The viewing agent's display name.
    pub name: String,
    /// Current round number.
    pub round: u64,
    /// Configured round cap.
    pub max_rounds: u64,
    /// The viewer's balance.
    pub tokens: u64,
    /// Clues the viewer holds, by puzzle.
    pub clues: BTreeMap<PuzzleId, String>,
    /// Recent public messages, oldest first.
    pub public_messages: Vec<VisibleMessage>,
    /// Recent messages in the viewer's private inbox, oldest first.
    pub private_messages: Vec<VisibleMessage>,
    /// Every other agent in roster order.
    pub other_agents: Vec<OtherAgent>,
    /// Active puzzles the viewer holds a clue for, then a small sample of others.
    pub puzzles: Vec<PuzzleSummary>,
    /// Open offers addressed to the viewer.
    pub incoming_trades: Vec<IncomingTrade>,
    /// Other agents' private exchanges, present only for the eavesdropper.
    pub intercepted_messages: Option<Vec<InterceptedMessage>>,
    /// Average trust score per living counterpart name, present only when
    /// reputation is enabled.
    pub trust_scores: Option<BTreeMap<String, f64>>,
}

impl AgentView {
    /// The summary of an active puzzle, if it is visible to the viewer.
    pub fn puzzle(&self, puzzle_id: &PuzzleId) -> Option<&PuzzleSummary> {
        self.puzzles.iter().find(|p| &p.id == puzzle_id)
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// A message as shown to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VisibleMessage {
    /// Sender display name.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Round the message was sent in.
    pub round: u64,
}

/// Another agent as shown to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OtherAgent {
    /// Roster identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Whether the agent is alive.
    pub alive: bool,
    /// Balance, present only when balances are transparent.
    pub tokens: Option<u64>,
}

/// An active puzzle as shown to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PuzzleSummary {
    /// Puzzle identifier.
    pub id: PuzzleId,
    /// Description text.
    pub description: String,
    /// Number of clues needed to solve.
    pub clues_needed: u32,
    /// The viewer's own clue, if it holds one.
    pub your_clue: Option<String>,
    /// Names of living co-holders, if the viewer holds a clue.
    pub partners: Vec<String>,
}

/// A pending offer addressed to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IncomingTrade {
    /// Offer identifier.
    pub trade_id: TradeId,
    /// Proposer display name.
    pub from: String,
    /// Tokens offered.
    pub offer_tokens: u64,
    /// What the proposer wants.
    pub wants: String,
    /// Rounds left before the offer expires.
    pub expires_in: u64,
}

/// A private message between two other agents, seen by the eavesdropper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InterceptedMessage {
    /// Sender display name.
    pub sender: String,
    /// Recipient display name.
    pub receiver: String,
    /// Message text.
    pub content: String,
    /// Round the message was sent in.
    pub round: u64,
}
