//! The world store: the single owner of all mutable game state.
//!
//! [`WorldState`] holds the round counter, agent table, message feeds,
//! puzzle lists, pending trades, trust scores and the append-only event
//! log. The round orchestrator owns exactly one instance and passes it by
//! mutable reference to every subsystem.

use std::collections::BTreeMap;

use terrarium_types::{Agent, AgentId, Event, EventType, Message, Puzzle, PuzzleId, TradeId, TradeOffer};

use crate::error::WorldError;

/// All mutable state of one game.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    /// Current round number (0 before the first round).
    pub round: u64,
    /// Agent table keyed by id.
    pub agents: BTreeMap<AgentId, Agent>,
    /// Agent ids in registration order. This is the processing order.
    pub roster: Vec<AgentId>,
    /// Public feed, oldest first.
    pub public_messages: Vec<Message>,
    /// Private inboxes keyed by recipient.
    pub private_messages: BTreeMap<AgentId, Vec<Message>>,
    /// Puzzles that are neither solved nor expired.
    pub active_puzzles: Vec<Puzzle>,
    /// Puzzles resolved by a solve or auto-solve.
    pub solved_puzzles: Vec<Puzzle>,
    /// Open and recently resolved trade offers.
    pub pending_trades: Vec<TradeOffer>,
    /// Latest rating score keyed by (rater, ratee).
    pub trust_scores: BTreeMap<(AgentId, AgentId), i8>,
    /// Append-only event log.
    pub event_log: Vec<Event>,
    /// Balance granted to each registered agent.
    starting_tokens: u64,
    /// Last allocated trade sequence number.
    trade_sequence: u64,
}

impl WorldState {
    /// Create an empty world that registers agents with `starting_tokens`.
    pub fn new(starting_tokens: u64) -> Self {
        Self {
            starting_tokens,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Register an agent under the next roster id with the starting balance.
    pub fn add_agent(&mut self, name: &str) -> Result<AgentId, WorldError> {
        if self.resolve_name(name).is_some() {
            return Err(WorldError::DuplicateName(name.to_owned()));
        }
        let id = AgentId::from_index(self.roster.len());
        self.agents
            .insert(id.clone(), Agent::new(id.clone(), name, self.starting_tokens));
        self.roster.push(id.clone());
        Ok(id)
    }

    /// Look up an agent.
    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Look up an agent mutably.
    pub fn agent_mut(&mut self, id: &AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    /// Look up an agent, failing with [`WorldError::AgentNotFound`].
    pub fn require_agent(&self, id: &AgentId) -> Result<&Agent, WorldError> {
        self.agents
            .get(id)
            .ok_or_else(|| WorldError::AgentNotFound(id.clone()))
    }

    /// All agents in roster order.
    pub fn agents_in_order(&self) -> impl Iterator<Item = &Agent> {
        self.roster.iter().filter_map(|id| self.agents.get(id))
    }

    /// Ids of living agents in roster order.
    pub fn alive_agent_ids(&self) -> Vec<AgentId> {
        self.agents_in_order()
            .filter(|a| a.alive)
            .map(|a| a.id.clone())
            .collect()
    }

    /// Number of living agents.
    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|a| a.alive).count()
    }

    /// Whether the agent exists and is alive.
    pub fn is_alive(&self, id: &AgentId) -> bool {
        self.agents.get(id).is_some_and(|a| a.alive)
    }

    /// Resolve a display name to an agent id, ignoring case.
    pub fn resolve_name(&self, name: &str) -> Option<AgentId> {
        let wanted = name.to_lowercase();
        self.agents_in_order()
            .find(|a| a.name.to_lowercase() == wanted)
            .map(|a| a.id.clone())
    }

    /// Display name of an agent, or its id if unknown.
    pub fn name_of(&self, id: &AgentId) -> String {
        self.agents
            .get(id)
            .map_or_else(|| id.to_string(), |a| a.name.clone())
    }

    // -----------------------------------------------------------------------
    // Puzzles
    // -----------------------------------------------------------------------

    /// Find an active, unsolved puzzle.
    pub fn open_puzzle(&self, id: &PuzzleId) -> Option<&Puzzle> {
        self.active_puzzles
            .iter()
            .find(|p| &p.id == id && !p.solved)
    }

    /// Find a puzzle among the active and solved lists.
    pub fn find_puzzle(&self, id: &PuzzleId) -> Option<&Puzzle> {
        self.active_puzzles
            .iter()
            .chain(self.solved_puzzles.iter())
            .find(|p| &p.id == id)
    }

    /// Remove every clue of a puzzle from every inventory.
    pub fn purge_clues(&mut self, id: &PuzzleId) {
        for agent in self.agents.values_mut() {
            agent.inventory.remove(id);
        }
    }

    /// Mark an open puzzle solved by `solved_by` in the current round.
    ///
    /// The puzzle moves from the active list to the solved list and its clues
    /// leave every inventory. Returns `None` if the puzzle is not open.
    pub fn close_puzzle(&mut self, id: &PuzzleId, solved_by: Vec<AgentId>) -> Option<Puzzle> {
        let position = self
            .active_puzzles
            .iter()
            .position(|p| &p.id == id && !p.solved)?;
        let mut puzzle = self.active_puzzles.remove(position);
        puzzle.solved = true;
        puzzle.solved_round = Some(self.round);
        puzzle.solved_by = solved_by;
        self.purge_clues(id);
        self.solved_puzzles.push(puzzle.clone());
        Some(puzzle)
    }

    // -----------------------------------------------------------------------
    // Trades
    // -----------------------------------------------------------------------

    /// Allocate the next trade offer id (`T1`, `T2`, ...).
    pub fn next_trade_id(&mut self) -> TradeId {
        self.trade_sequence = self.trade_sequence.saturating_add(1);
        TradeId::from_sequence(self.trade_sequence)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Append an event stamped with the current round.
    pub fn log_event(
        &mut self,
        event_type: EventType,
        agent_id: Option<&AgentId>,
        details: serde_json::Value,
    ) {
        self.event_log
            .push(Event::new(self.round, event_type, agent_id.cloned(), details));
    }

    /// Events logged during `round`.
    pub fn events_in_round(&self, round: u64) -> impl Iterator<Item = &Event> {
        self.event_log.iter().filter(move |e| e.round == round)
    }

    /// Events from the most recent `window` rounds, newest first.
    ///
    /// An event belongs to the window when `current_round - event.round <= window`.
    /// The scan stops at the first older event because the log is round-ordered.
    pub fn recent_events(&self, window: u64) -> impl Iterator<Item = &Event> {
        let round = self.round;
        self.event_log
            .iter()
            .rev()
            .take_while(move |e| round.saturating_sub(e.round) <= window)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registration_assigns_roster_ids_and_balance() {
        let mut world = WorldState::new(100);
        let vera = world.add_agent("Vera").unwrap();
        let kip = world.add_agent("Kip").unwrap();
        assert_eq!(vera.as_str(), "agent_0");
        assert_eq!(kip.as_str(), "agent_1");
        assert_eq!(world.agent(&kip).map(|a| a.tokens), Some(100));
        assert_eq!(world.alive_agent_ids(), vec![vera, kip]);
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let mut world = WorldState::new(10);
        world.add_agent("Vera").unwrap();
        assert!(matches!(
            world.add_agent("VERA"),
            Err(WorldError::DuplicateName(_))
        ));
    }

    #[test]
    fn roster_order_survives_double_digit_ids() {
        let mut world = WorldState::new(10);
        for i in 0..12 {
            world.add_agent(&format!("Agent{i}")).unwrap();
        }
        let ids = world.alive_agent_ids();
        assert_eq!(ids.get(2).map(AgentId::as_str), Some("agent_2"));
        assert_eq!(ids.get(10).map(AgentId::as_str), Some("agent_10"));
    }

    #[test]
    fn resolve_name_ignores_case() {
        let mut world = WorldState::new(10);
        let sable = world.add_agent("Sable").unwrap();
        assert_eq!(world.resolve_name("sABLE"), Some(sable));
        assert_eq!(world.resolve_name("Nobody"), None);
    }

    #[test]
    fn trade_ids_are_monotonic() {
        let mut world = WorldState::new(10);
        assert_eq!(world.next_trade_id().as_str(), "T1");
        assert_eq!(world.next_trade_id().as_str(), "T2");
    }

    #[test]
    fn recent_events_respects_window() {
        let mut world = WorldState::new(10);
        for round in 1..=6 {
            world.round = round;
            world.log_event(EventType::Pass, None, serde_json::json!({}));
        }
        let rounds: Vec<u64> = world.recent_events(2).map(|e| e.round).collect();
        assert_eq!(rounds, vec![6, 5, 4]);
        assert_eq!(world.events_in_round(3).count(), 1);
    }

    #[test]
    fn closing_a_puzzle_moves_it_and_purges_clues() {
        use std::collections::BTreeMap;

        use terrarium_types::Clue;

        let mut world = WorldState::new(10);
        let vera = world.add_agent("Vera").unwrap();
        let id = PuzzleId::new("A-1");
        let clue = Clue {
            puzzle_id: id.clone(),
            index: 0,
            text: "The answer is BL__".to_owned(),
        };
        world.agent_mut(&vera).unwrap().inventory.insert(id.clone(), clue.clone());
        world.round = 4;
        world.active_puzzles.push(Puzzle {
            id: id.clone(),
            category: "color".to_owned(),
            clues: vec![clue],
            answer: "BLUE".to_owned(),
            description: String::new(),
            created_round: 1,
            lifetime: 15,
            assigned: BTreeMap::from([(0, vera.clone())]),
            solved: false,
            solved_by: Vec::new(),
            solved_round: None,
        });

        assert!(world.open_puzzle(&id).is_some());
        let closed = world.close_puzzle(&id, vec![vera.clone()]).unwrap();
        assert_eq!(closed.solved_round, Some(4));
        assert!(world.active_puzzles.is_empty());
        assert_eq!(world.solved_puzzles.len(), 1);
        assert!(world.agent(&vera).unwrap().inventory.is_empty());
        assert!(world.find_puzzle(&id).is_some_and(|p| p.solved));
        assert!(world.close_puzzle(&id, Vec::new()).is_none());
    }
}
