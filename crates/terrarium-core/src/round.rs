//! Round cycle: the fixed per-round sequence that drives a game.
//!
//! Each round runs these steps in order, every step always executed:
//!
//! 1. **Advance** -- increment the round counter and, on rotation rounds,
//!    permute controller identities.
//! 2. **Mint** -- the puzzle engine deals fresh clues to living agents.
//! 3. **Act** -- every living, controlled agent sees its view and its
//!    actions execute in roster order, subject to the send and shout caps.
//! 4. **Auto-solve** -- two-holder puzzles whose holders disclosed to each
//!    other privately are resolved.
//! 5. **Drain** -- the passive drain is charged; starving agents die.
//! 6. **Expire** -- puzzles past their lifetime are retired.
//! 7. **Collect** -- resolved and expired trade offers are dropped.
//!
//! Runtime failures surface as [`ActionOutcome`] values. Only construction
//! can fail with [`GameError`].

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::json;
use terrarium_agents::{Economy, EconomyError, MessageRouter, TradeError, reputation, trade};
use terrarium_types::{
    Action, ActionOutcome, AgentId, AgentView, EventType, MAX_ACTIONS_PER_ROUND, Puzzle,
    PuzzleId,
};
use terrarium_world::catalog::revealed_fragment;
use terrarium_world::{PuzzleEngine, ViewConfig, WorldState, build_view};
use tracing::{debug, info, warn};

use crate::config::{GameRules, SimulationConfig};
use crate::decision::DecisionSource;
use crate::protocol;
use crate::rotation;

/// Reward reason logged for the pre-game bonus.
pub const REASON_PRE_SOLVE_BONUS: &str = "pre_solve_bonus";

/// Errors that can occur while setting up a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The configuration was rejected.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// The puzzle engine could not be built.
    #[error("puzzle error: {source}")]
    Puzzle {
        /// The underlying puzzle error.
        #[from]
        source: terrarium_world::PuzzleError,
    },

    /// An agent could not be registered.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: terrarium_world::WorldError,
    },
}

/// One executed action and what came of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    /// Action tag, e.g. `SEND_PUBLIC`.
    pub action: String,
    /// The outcome.
    pub outcome: ActionOutcome,
}

/// Summary of a single round's execution.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    /// The round that was executed.
    pub round: u64,
    /// Puzzles minted this round.
    pub puzzles_created: Vec<PuzzleId>,
    /// Puzzles resolved this round, by SOLVE or auto-solve.
    pub puzzles_solved: Vec<PuzzleId>,
    /// Puzzles that expired this round.
    pub puzzles_expired: Vec<PuzzleId>,
    /// Agents who died this round, whatever the cause.
    pub deaths: Vec<AgentId>,
    /// Living agents at the end of the round.
    pub agents_alive: usize,
    /// Executed actions per agent, in execution order.
    pub outcomes: BTreeMap<AgentId, Vec<ActionRecord>>,
}

/// The mutable game state passed through the round cycle.
#[derive(Debug)]
pub struct GameState {
    /// The world store.
    pub world: WorldState,
    /// The puzzle engine.
    pub puzzles: PuzzleEngine,
    /// Message delivery, which owns the economy.
    pub router: MessageRouter,
    /// Round rules.
    pub rules: GameRules,
    /// What views include.
    pub view_config: ViewConfig,
    /// Randomness for identity rotation.
    rng: StdRng,
}

impl GameState {
    /// Validate `config` and build an empty game from it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] for a rejected configuration and
    /// [`GameError::Puzzle`] if the puzzle engine cannot be built.
    pub fn new(config: &SimulationConfig) -> Result<Self, GameError> {
        config.validate()?;
        let puzzles = PuzzleEngine::new(config.puzzles.clone(), config.seed)?;
        let rng = config.seed.map_or_else(StdRng::from_os_rng, |seed| {
            StdRng::seed_from_u64(seed.wrapping_add(1))
        });
        Ok(Self {
            world: WorldState::new(config.agents.starting_tokens),
            puzzles,
            router: MessageRouter::new(Economy::new(config.economy.clone())),
            rules: config.game.clone(),
            view_config: config.view_config(),
            rng,
        })
    }

    /// Register agents in roster order.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::World`] on a duplicate name.
    pub fn register_agents<I, S>(&mut self, names: I) -> Result<Vec<AgentId>, GameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| Ok(self.world.add_agent(name.as_ref())?))
            .collect()
    }

    /// The economy that prices messages and pays rewards.
    pub const fn economy(&self) -> &Economy {
        self.router.economy()
    }

    /// Grant the configured pre-solve bonus to every living agent.
    ///
    /// Does nothing when the bonus is zero.
    pub fn apply_pre_solve_bonus(&mut self) {
        let bonus = self.puzzles.config().pre_solve_bonus;
        if bonus == 0 {
            return;
        }
        for agent_id in self.world.alive_agent_ids() {
            self.router
                .economy()
                .grant(&mut self.world, &agent_id, bonus, REASON_PRE_SOLVE_BONUS);
        }
        info!(bonus, "Pre-solve bonus granted");
    }

    /// Whether the game has ended: the round cap is reached or at most one
    /// agent is alive.
    pub fn is_game_over(&self) -> bool {
        self.world.round >= self.rules.max_rounds || self.world.alive_count() <= 1
    }

    /// Build the restricted view for one agent.
    ///
    /// # Errors
    ///
    /// Returns [`terrarium_world::WorldError`] if the agent is unknown.
    pub fn view_for(&self, agent_id: &AgentId) -> Result<AgentView, terrarium_world::WorldError> {
        build_view(&self.world, agent_id, &self.view_config)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Execute one action for `agent_id` and report its outcome.
    ///
    /// A dead or unknown agent gets [`ActionOutcome::Dead`] with no side
    /// effects.
    pub fn execute_action(&mut self, agent_id: &AgentId, action: &Action) -> ActionOutcome {
        if !self.world.is_alive(agent_id) {
            return ActionOutcome::Dead;
        }
        match action {
            Action::SendPublic { message } => self.send_public(agent_id, message),
            Action::SendPrivate { target, message } => self.send_private(agent_id, target, message),
            Action::Solve { puzzle_id, answer } => self.solve(agent_id, puzzle_id, answer),
            Action::Trade { target, offer, ask } => {
                let Some(target_id) = self.resolve_counterpart(agent_id, target) else {
                    return ActionOutcome::InvalidTarget {
                        target: target.clone(),
                    };
                };
                self.flag_injections(agent_id, ask);
                let trade_id = trade::create_offer(
                    &mut self.world,
                    agent_id,
                    &target_id,
                    offer.get(),
                    ask,
                    self.rules.trade_lifetime,
                );
                ActionOutcome::OfferCreated { trade_id }
            }
            Action::AcceptTrade { trade_id } => {
                match trade::accept_offer(&mut self.world, self.router.economy(), trade_id, agent_id)
                {
                    Ok(tokens_received) => ActionOutcome::Accepted { tokens_received },
                    Err(TradeError::OfferNotFound(_)) => ActionOutcome::TradeNotFound,
                    Err(TradeError::TransferFailed { source }) => {
                        debug!(round = self.world.round, agent_id = %agent_id, %trade_id, %source, "Trade transfer failed");
                        ActionOutcome::TradeFailed
                    }
                }
            }
            Action::Shout { message } => match self.router.shout(&mut self.world, agent_id, message) {
                Ok(words) => {
                    self.flag_injections(agent_id, message);
                    ActionOutcome::Shouted { words }
                }
                Err(EconomyError::ShoutDisabled) => ActionOutcome::ShoutDisabled,
                Err(_) => ActionOutcome::Dead,
            },
            Action::Rate { target, rating } => {
                if !self.rules.reputation_system {
                    return ActionOutcome::ReputationDisabled;
                }
                let Some(target_id) = self.resolve_counterpart(agent_id, target) else {
                    return ActionOutcome::InvalidTarget {
                        target: target.clone(),
                    };
                };
                reputation::rate(&mut self.world, agent_id, &target_id, *rating);
                ActionOutcome::Rated {
                    target: self.world.name_of(&target_id),
                    rating: *rating,
                }
            }
            Action::Pass => {
                self.world
                    .log_event(EventType::Pass, Some(agent_id), json!({}));
                ActionOutcome::Passed
            }
            Action::Unknown => ActionOutcome::UnknownAction,
        }
    }

    fn send_public(&mut self, agent_id: &AgentId, message: &str) -> ActionOutcome {
        match self.router.send_public(&mut self.world, agent_id, message) {
            Ok(delivery) => {
                self.flag_injections(agent_id, message);
                ActionOutcome::Sent {
                    cost: delivery.message.token_cost,
                }
            }
            Err(error) => {
                debug!(round = self.world.round, agent_id = %agent_id, %error, "Public send failed");
                ActionOutcome::Failed {
                    cost: self.router.economy().message_cost(message, true),
                }
            }
        }
    }

    fn send_private(&mut self, agent_id: &AgentId, target: &str, message: &str) -> ActionOutcome {
        let Some(target_id) = self.resolve_counterpart(agent_id, target) else {
            return ActionOutcome::InvalidTarget {
                target: target.to_owned(),
            };
        };
        match self
            .router
            .send_private(&mut self.world, agent_id, &target_id, message)
        {
            Ok(delivery) => {
                self.flag_injections(agent_id, message);
                ActionOutcome::Sent {
                    cost: delivery.message.token_cost,
                }
            }
            Err(EconomyError::UnknownAgent(id)) if id == target_id => ActionOutcome::InvalidTarget {
                target: target.to_owned(),
            },
            Err(error) => {
                debug!(round = self.world.round, agent_id = %agent_id, %error, "Private send failed");
                ActionOutcome::Failed {
                    cost: self.router.economy().message_cost(message, false),
                }
            }
        }
    }

    fn solve(&mut self, agent_id: &AgentId, puzzle_id: &PuzzleId, answer: &str) -> ActionOutcome {
        let Some(puzzle) = self.world.open_puzzle(puzzle_id).cloned() else {
            return ActionOutcome::PuzzleNotFound {
                puzzle_id: puzzle_id.clone(),
            };
        };
        if !PuzzleEngine::check_answer(&puzzle, answer) {
            self.world.log_event(
                EventType::SolveAttempt,
                Some(agent_id),
                json!({ "puzzle_id": puzzle_id, "answer": answer, "correct": false }),
            );
            return ActionOutcome::WrongAnswer;
        }

        let mut contributors = vec![agent_id.clone()];
        contributors.extend(self.clue_sharers(&puzzle, agent_id));
        let cooperative = contributors.len() > 1;
        let reward = self
            .router
            .economy()
            .reward_puzzle_solve(&mut self.world, &contributors);
        self.world.close_puzzle(puzzle_id, contributors.clone());
        self.world.log_event(
            EventType::PuzzleSolved,
            Some(agent_id),
            json!({
                "puzzle_id": puzzle_id,
                "answer": puzzle.answer,
                "contributors": contributors,
                "cooperative": cooperative,
                "reward": reward,
            }),
        );
        info!(
            round = self.world.round,
            agent_id = %agent_id,
            puzzle_id = %puzzle_id,
            contributors = contributors.len(),
            reward,
            "Puzzle solved"
        );
        ActionOutcome::Correct {
            reward,
            contributors,
        }
    }

    /// Clue holders other than `solver` who mentioned the puzzle id in a
    /// send within the contributor lookback.
    fn clue_sharers(&self, puzzle: &Puzzle, solver: &AgentId) -> BTreeSet<AgentId> {
        let lookback = self.puzzles.config().contributor_lookback;
        let id = puzzle.id.as_str();
        self.world
            .recent_events(lookback)
            .filter(|e| matches!(e.event_type, EventType::SendPublic | EventType::SendPrivate))
            .filter(|e| e.detail_str("content").is_some_and(|c| c.contains(id)))
            .filter_map(|e| e.agent_id.as_ref())
            .filter(|author| *author != solver && puzzle.is_holder(author))
            .cloned()
            .collect()
    }

    /// Resolve a counterpart name, rejecting unknown names and the actor.
    fn resolve_counterpart(&self, agent_id: &AgentId, name: &str) -> Option<AgentId> {
        self.world
            .resolve_name(name)
            .filter(|target| target != agent_id)
    }

    /// Log a parser exploit attempt if `text` smuggles protocol commands.
    fn flag_injections(&mut self, agent_id: &AgentId, text: &str) {
        let injected = protocol::scan_for_exploits(text);
        if injected.is_empty() {
            return;
        }
        let round = self.world.round;
        warn!(round, agent_id = %agent_id, commands = injected.len(), "Parser exploit attempt");
        self.world.log_event(
            EventType::ParserExploit,
            Some(agent_id),
            json!({
                "text": protocol::exploit_excerpt(text),
                "injected_commands": injected,
                "round": round,
            }),
        );
    }

    /// Execute a turn's actions under the per-round caps.
    ///
    /// At most [`MAX_ACTIONS_PER_ROUND`] actions are considered. Sends past
    /// `messages_per_round` and shouts past the first are dropped silently.
    fn execute_turn(&mut self, agent_id: &AgentId, actions: Vec<Action>) -> Vec<ActionRecord> {
        let mut sends: usize = 0;
        let mut shouted = false;
        let mut records = Vec::new();
        for action in actions.into_iter().take(MAX_ACTIONS_PER_ROUND) {
            if action.is_send() {
                if sends >= self.rules.messages_per_round {
                    debug!(round = self.world.round, agent_id = %agent_id, "Send cap reached; action dropped");
                    continue;
                }
                sends = sends.saturating_add(1);
            } else if matches!(action, Action::Shout { .. }) {
                if shouted {
                    continue;
                }
                shouted = true;
            }
            let outcome = self.execute_action(agent_id, &action);
            debug!(
                round = self.world.round,
                agent_id = %agent_id,
                action = action.kind(),
                ?outcome,
                "Action executed"
            );
            records.push(ActionRecord {
                action: action.kind().to_owned(),
                outcome,
            });
        }
        records
    }

    // -----------------------------------------------------------------------
    // Round steps
    // -----------------------------------------------------------------------

    /// Permute controller identities and log every change.
    fn rotate_identities(&mut self, source: &mut dyn DecisionSource) {
        let current = source.identities();
        if current.len() <= 1 {
            return;
        }
        let next = rotation::permute_identities(&current, &mut self.rng);
        for (agent_id, new_persona) in &next {
            let Some(old_persona) = current.get(agent_id) else {
                continue;
            };
            if old_persona == new_persona {
                continue;
            }
            if let Err(error) = source.assign_identity(agent_id, new_persona) {
                warn!(round = self.world.round, agent_id = %agent_id, %error, "Identity swap failed");
                continue;
            }
            self.world.log_event(
                EventType::PersonaSwap,
                Some(agent_id),
                json!({ "old_persona": old_persona, "new_persona": new_persona }),
            );
            info!(
                round = self.world.round,
                agent_id = %agent_id,
                old = %old_persona,
                new = %new_persona,
                "Identity swapped"
            );
        }
    }

    /// Resolve every two-holder puzzle whose holders privately disclosed it
    /// to each other within the auto-solve window.
    fn resolve_auto_solves(&mut self) -> Vec<PuzzleId> {
        let window = self.puzzles.config().auto_solve_window;
        if window == 0 {
            return Vec::new();
        }

        let mut disclosed = Vec::new();
        for puzzle in &self.world.active_puzzles {
            let holders = puzzle.holders();
            let [first, second] = holders.as_slice() else {
                continue;
            };
            if !self.world.is_alive(first) || !self.world.is_alive(second) {
                continue;
            }
            let mut markers = vec![puzzle.id.as_str().to_owned()];
            markers.extend(
                [first, second]
                    .into_iter()
                    .filter_map(|holder| self.world.agent(holder)?.inventory.get(&puzzle.id))
                    .map(|clue| revealed_fragment(&clue.text).to_owned())
                    .filter(|fragment| !fragment.is_empty()),
            );
            if self.sent_privately(window, first, second, &markers)
                && self.sent_privately(window, second, first, &markers)
            {
                disclosed.push((puzzle.id.clone(), puzzle.answer.clone(), holders.clone()));
            }
        }

        let mut solved = Vec::with_capacity(disclosed.len());
        for (puzzle_id, answer, holders) in disclosed {
            self.router
                .economy()
                .reward_puzzle_solve(&mut self.world, &holders);
            self.world.close_puzzle(&puzzle_id, holders.clone());
            self.world.log_event(
                EventType::PuzzleSolved,
                None,
                json!({
                    "puzzle_id": puzzle_id,
                    "answer": answer,
                    "contributors": holders,
                    "cooperative": true,
                    "auto_solved": true,
                }),
            );
            info!(round = self.world.round, puzzle_id = %puzzle_id, "Puzzle auto-solved");
            solved.push(puzzle_id);
        }
        solved
    }

    /// Whether `from` privately sent `to` a message containing any marker
    /// within the last `window` rounds.
    fn sent_privately(&self, window: u64, from: &AgentId, to: &AgentId, markers: &[String]) -> bool {
        self.world.recent_events(window).any(|e| {
            e.event_type == EventType::SendPrivate
                && e.agent_id.as_ref() == Some(from)
                && e.detail_str("target") == Some(to.as_str())
                && e.detail_str("content")
                    .is_some_and(|content| markers.iter().any(|m| content.contains(m.as_str())))
        })
    }

    /// Collect decisions for every living, controlled agent up front.
    fn batched_decisions(
        &self,
        roster: &[AgentId],
        source: &mut dyn DecisionSource,
    ) -> BTreeMap<AgentId, Vec<Action>> {
        let round = self.world.round;
        let mut views = BTreeMap::new();
        for agent_id in roster.iter().filter(|id| source.controls(id)) {
            match self.view_for(agent_id) {
                Ok(view) => {
                    views.insert(agent_id.clone(), view);
                }
                Err(error) => warn!(round, agent_id = %agent_id, %error, "View build failed"),
            }
        }
        source
            .collect_decisions(round, &views)
            .unwrap_or_else(|error| {
                warn!(round, %error, "Batched decisions failed; every agent passes");
                views.keys().map(|id| (id.clone(), vec![Action::Pass])).collect()
            })
    }
}

/// Execute one complete round of the game.
///
/// Runs every step in sequence and returns a summary of what happened.
/// The game-over predicate is left to the caller.
pub fn run_round(state: &mut GameState, source: &mut dyn DecisionSource) -> RoundSummary {
    // --- Step 1: Advance ---
    state.world.round = state.world.round.saturating_add(1);
    let round = state.world.round;
    info!(round, alive = state.world.alive_count(), "Round started");

    let interval = state.rules.persona_rotation_interval;
    if interval > 0 && round.checked_rem(interval) == Some(0) {
        state.rotate_identities(source);
    }

    // --- Step 2: Mint ---
    let puzzles_created = state.puzzles.mint(&mut state.world);

    // --- Step 3: Act ---
    let roster = state.world.alive_agent_ids();
    let mut outcomes = BTreeMap::new();
    if source.is_batched() {
        let mut decisions = state.batched_decisions(&roster, source);
        for agent_id in &roster {
            let Some(actions) = decisions.remove(agent_id) else {
                continue;
            };
            let records = state.execute_turn(agent_id, actions);
            outcomes.insert(agent_id.clone(), records);
        }
    } else {
        for agent_id in &roster {
            if !source.controls(agent_id) {
                continue;
            }
            if !state.world.is_alive(agent_id) {
                debug!(round, agent_id = %agent_id, "Agent died earlier this round; turn skipped");
                continue;
            }
            let view = match state.view_for(agent_id) {
                Ok(view) => view,
                Err(error) => {
                    warn!(round, agent_id = %agent_id, %error, "View build failed");
                    continue;
                }
            };
            let actions = source.decide(agent_id, &view).unwrap_or_else(|error| {
                warn!(round, agent_id = %agent_id, %error, "Decision failed; agent passes");
                vec![Action::Pass]
            });
            let records = state.execute_turn(agent_id, actions);
            outcomes.insert(agent_id.clone(), records);
        }
    }

    // --- Step 4: Auto-solve ---
    state.resolve_auto_solves();

    // --- Step 5: Drain ---
    let starved = state.router.economy().apply_passive_drain(&mut state.world);
    for agent_id in &starved {
        info!(round, agent_id = %agent_id, "Agent starved");
    }

    // --- Step 6: Expire ---
    let puzzles_expired = PuzzleEngine::expire(&mut state.world);

    // --- Step 7: Collect ---
    trade::collect_offers(&mut state.world);

    let puzzles_solved = state
        .world
        .solved_puzzles
        .iter()
        .filter(|p| p.solved_round == Some(round))
        .map(|p| p.id.clone())
        .collect();
    let deaths: Vec<AgentId> = state
        .world
        .events_in_round(round)
        .filter(|e| e.event_type == EventType::Death)
        .filter_map(|e| e.agent_id.clone())
        .collect();
    let agents_alive = state.world.alive_count();

    info!(round, agents_alive, deaths = deaths.len(), "Round complete");

    RoundSummary {
        round,
        puzzles_created,
        puzzles_solved,
        puzzles_expired,
        deaths,
        agents_alive,
        outcomes,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic
)]
mod tests {
    use std::collections::VecDeque;
    use std::num::NonZeroU64;

    use terrarium_types::{Clue, Rating};

    use super::*;
    use crate::decision::{DecisionError, StubDecisionSource};

    /// Plays back queued action lists per agent; agents with nothing queued pass.
    #[derive(Debug, Default)]
    struct Script {
        turns: BTreeMap<AgentId, VecDeque<Vec<Action>>>,
        identities: BTreeMap<AgentId, String>,
        batched: bool,
        seen: BTreeMap<AgentId, AgentView>,
    }

    impl Script {
        fn push(&mut self, agent_id: &AgentId, actions: Vec<Action>) {
            self.turns.entry(agent_id.clone()).or_default().push_back(actions);
        }
    }

    impl DecisionSource for Script {
        fn controls(&self, _agent_id: &AgentId) -> bool {
            true
        }

        fn decide(
            &mut self,
            agent_id: &AgentId,
            view: &AgentView,
        ) -> Result<Vec<Action>, DecisionError> {
            self.seen.insert(agent_id.clone(), view.clone());
            Ok(self
                .turns
                .get_mut(agent_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| vec![Action::Pass]))
        }

        fn is_batched(&self) -> bool {
            self.batched
        }

        fn identities(&self) -> BTreeMap<AgentId, String> {
            self.identities.clone()
        }

        fn assign_identity(&mut self, agent_id: &AgentId, identity: &str) -> Result<(), DecisionError> {
            self.identities.insert(agent_id.clone(), identity.to_owned());
            Ok(())
        }
    }

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.seed = Some(11);
        config.puzzles.clues_per_round = 0;
        config.economy.passive_drain = 0;
        config
    }

    fn game(config: &SimulationConfig, names: &[&str]) -> (GameState, Vec<AgentId>) {
        let mut state = GameState::new(config).unwrap();
        let ids = state.register_agents(names.iter().copied()).unwrap();
        (state, ids)
    }

    fn plant(state: &mut GameState, id: &str, answer: &str, clues: &[(&AgentId, &str)]) -> PuzzleId {
        let puzzle_id = PuzzleId::new(id);
        let mut assigned = BTreeMap::new();
        let mut texts = Vec::new();
        for (index, (holder, text)) in (0_u32..).zip(clues) {
            let clue = Clue {
                puzzle_id: puzzle_id.clone(),
                index,
                text: (*text).to_owned(),
            };
            state
                .world
                .agent_mut(holder)
                .unwrap()
                .inventory
                .insert(puzzle_id.clone(), clue.clone());
            assigned.insert(index, (*holder).clone());
            texts.push(clue);
        }
        state.world.active_puzzles.push(Puzzle {
            id: puzzle_id.clone(),
            category: "color".to_owned(),
            clues: texts,
            answer: answer.to_owned(),
            description: String::new(),
            created_round: state.world.round,
            lifetime: 15,
            assigned,
            solved: false,
            solved_by: Vec::new(),
            solved_round: None,
        });
        puzzle_id
    }

    fn tokens(state: &GameState, id: &AgentId) -> u64 {
        state.world.agent(id).unwrap().tokens
    }

    fn public(message: &str) -> Action {
        Action::SendPublic {
            message: message.to_owned(),
        }
    }

    fn private(target: &str, message: &str) -> Action {
        Action::SendPrivate {
            target: target.to_owned(),
            message: message.to_owned(),
        }
    }

    #[test]
    fn stub_round_advances_and_everyone_passes() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let summary = run_round(&mut state, &mut StubDecisionSource::new());
        assert_eq!(summary.round, 1);
        assert_eq!(summary.agents_alive, 2);
        assert_eq!(
            summary.outcomes[&ids[0]],
            vec![ActionRecord {
                action: "PASS".to_owned(),
                outcome: ActionOutcome::Passed
            }]
        );
    }

    #[test]
    fn dead_agent_is_short_circuited() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        state.world.agent_mut(&ids[0]).unwrap().alive = false;
        assert_eq!(state.execute_action(&ids[0], &Action::Pass), ActionOutcome::Dead);
        assert_eq!(state.world.event_log.len(), 0);
    }

    #[test]
    fn send_cap_drops_excess_sends_silently() {
        let mut config = quiet_config();
        config.game.messages_per_round = 1;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        let mut script = Script::default();
        script.push(&ids[0], vec![public("hello"), public("again")]);
        let summary = run_round(&mut state, &mut script);
        assert_eq!(summary.outcomes[&ids[0]].len(), 1);
        assert_eq!(state.world.public_messages.len(), 1);
    }

    #[test]
    fn insufficient_public_send_fails_with_cost() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        state.world.agent_mut(&ids[0]).unwrap().tokens = 1;
        let outcome = state.execute_action(&ids[0], &public("one two three four five six seven"));
        assert_eq!(outcome, ActionOutcome::Failed { cost: 4 });
        assert_eq!(tokens(&state, &ids[0]), 1);
        assert!(state.world.public_messages.is_empty());
    }

    #[test]
    fn private_send_to_unknown_or_self_is_invalid_target() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        assert_eq!(
            state.execute_action(&ids[0], &private("Nobody", "hi")),
            ActionOutcome::InvalidTarget {
                target: "Nobody".to_owned()
            }
        );
        assert!(matches!(
            state.execute_action(&ids[0], &private("vera", "hi")),
            ActionOutcome::InvalidTarget { .. }
        ));
    }

    #[test]
    fn private_send_to_dead_agent_fails_with_cost() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        state.world.agent_mut(&ids[1]).unwrap().alive = false;
        assert_eq!(
            state.execute_action(&ids[0], &private("Kip", "a b c d e f g h i j")),
            ActionOutcome::Failed { cost: 3 }
        );
        assert_eq!(tokens(&state, &ids[0]), 100);
        assert!(state.world.private_messages.get(&ids[1]).is_none_or(Vec::is_empty));
    }

    #[test]
    fn dead_agent_can_still_be_rated() {
        let mut config = quiet_config();
        config.game.reputation_system = true;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        state.world.agent_mut(&ids[1]).unwrap().alive = false;
        let outcome = state.execute_action(
            &ids[0],
            &Action::Rate {
                target: "Kip".to_owned(),
                rating: Rating::Helpful,
            },
        );
        assert_eq!(
            outcome,
            ActionOutcome::Rated {
                target: "Kip".to_owned(),
                rating: Rating::Helpful,
            }
        );
    }

    #[test]
    fn correct_solve_credits_mentioning_holders() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip", "Sable"]);
        let pid = plant(&mut state, "A-1", "BLUE", &[(&ids[0], "The answer is BL__"), (&ids[1], "The answer is __UE")]);
        state.world.round = 1;
        state.execute_action(&ids[1], &private("Vera", "my A-1 clue is __UE"));
        let kip_after_send = tokens(&state, &ids[1]);

        let outcome = state.execute_action(
            &ids[0],
            &Action::Solve {
                puzzle_id: pid.clone(),
                answer: " blue ".to_owned(),
            },
        );
        assert_eq!(
            outcome,
            ActionOutcome::Correct {
                reward: 40,
                contributors: vec![ids[0].clone(), ids[1].clone()]
            }
        );
        assert_eq!(tokens(&state, &ids[0]), 140);
        assert_eq!(tokens(&state, &ids[1]), kip_after_send + 40);
        assert!(state.world.open_puzzle(&pid).is_none());
        assert!(state.world.agent(&ids[1]).unwrap().inventory.is_empty());
    }

    #[test]
    fn solo_solve_pays_full_reward() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let pid = plant(&mut state, "B-2", "GOLD", &[(&ids[0], "The answer is GO__"), (&ids[1], "The answer is __LD")]);
        state.world.round = 1;
        let outcome = state.execute_action(
            &ids[0],
            &Action::Solve {
                puzzle_id: pid,
                answer: "gold".to_owned(),
            },
        );
        assert_eq!(
            outcome,
            ActionOutcome::Correct {
                reward: 50,
                contributors: vec![ids[0].clone()]
            }
        );
        assert_eq!(tokens(&state, &ids[0]), 150);
        assert_eq!(tokens(&state, &ids[1]), 100);
    }

    #[test]
    fn second_solve_in_same_round_finds_nothing() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let pid = plant(&mut state, "Q-3", "RED", &[(&ids[0], "The answer is R__"), (&ids[1], "The answer is __D")]);
        let solve = Action::Solve {
            puzzle_id: pid.clone(),
            answer: "red".to_owned(),
        };
        let mut script = Script::default();
        script.push(&ids[0], vec![solve.clone()]);
        script.push(&ids[1], vec![solve]);
        let summary = run_round(&mut state, &mut script);
        assert!(matches!(
            summary.outcomes[&ids[0]][0].outcome,
            ActionOutcome::Correct { .. }
        ));
        assert_eq!(
            summary.outcomes[&ids[1]][0].outcome,
            ActionOutcome::PuzzleNotFound { puzzle_id: pid.clone() }
        );
        assert_eq!(summary.puzzles_solved, vec![pid]);
        assert_eq!(tokens(&state, &ids[0]), 150);
    }

    #[test]
    fn wrong_answer_is_logged_without_reward() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let pid = plant(&mut state, "B-2", "CAT", &[(&ids[0], "The answer is C__"), (&ids[1], "The answer is __T")]);
        let outcome = state.execute_action(
            &ids[0],
            &Action::Solve {
                puzzle_id: pid,
                answer: "DOG".to_owned(),
            },
        );
        assert_eq!(outcome, ActionOutcome::WrongAnswer);
        assert_eq!(tokens(&state, &ids[0]), 100);
        assert_eq!(state.world.event_log[0].event_type, EventType::SolveAttempt);
    }

    #[test]
    fn trade_offer_then_accept_moves_tokens() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let offer = state.execute_action(
            &ids[0],
            &Action::Trade {
                target: "Kip".to_owned(),
                offer: NonZeroU64::new(10).unwrap(),
                ask: "your clue".to_owned(),
            },
        );
        let ActionOutcome::OfferCreated { trade_id } = offer else {
            panic!("expected an offer, got {offer:?}");
        };
        assert_eq!(
            state.execute_action(&ids[0], &Action::AcceptTrade { trade_id: trade_id.clone() }),
            ActionOutcome::TradeNotFound
        );
        assert_eq!(
            state.execute_action(&ids[1], &Action::AcceptTrade { trade_id }),
            ActionOutcome::Accepted { tokens_received: 10 }
        );
        assert_eq!(tokens(&state, &ids[0]), 90);
        assert_eq!(tokens(&state, &ids[1]), 110);
    }

    #[test]
    fn unaffordable_trade_fails_on_acceptance() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let ActionOutcome::OfferCreated { trade_id } = state.execute_action(
            &ids[0],
            &Action::Trade {
                target: "Kip".to_owned(),
                offer: NonZeroU64::new(500).unwrap(),
                ask: "anything".to_owned(),
            },
        ) else {
            panic!("expected an offer");
        };
        assert_eq!(
            state.execute_action(&ids[1], &Action::AcceptTrade { trade_id }),
            ActionOutcome::TradeFailed
        );
        assert_eq!(tokens(&state, &ids[0]), 100);
    }

    #[test]
    fn expired_offer_is_collected_and_cannot_be_accepted() {
        let mut config = quiet_config();
        config.game.trade_lifetime = 1;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        let mut script = Script::default();
        script.push(
            &ids[0],
            vec![Action::Trade {
                target: "Kip".to_owned(),
                offer: NonZeroU64::new(5).unwrap(),
                ask: "clue".to_owned(),
            }],
        );
        run_round(&mut state, &mut script);
        assert_eq!(state.world.pending_trades.len(), 1);
        run_round(&mut state, &mut script);
        assert!(state.world.pending_trades.is_empty());
        let trade_id = terrarium_types::TradeId::from_sequence(1);
        assert_eq!(
            state.execute_action(&ids[1], &Action::AcceptTrade { trade_id }),
            ActionOutcome::TradeNotFound
        );
    }

    #[test]
    fn shout_is_capped_at_one_per_round() {
        let mut config = quiet_config();
        config.economy.free_shout_words = 3;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        let shout = Action::Shout {
            message: "a b c d e".to_owned(),
        };
        let mut script = Script::default();
        script.push(&ids[0], vec![shout.clone(), shout]);
        let summary = run_round(&mut state, &mut script);
        assert_eq!(
            summary.outcomes[&ids[0]],
            vec![ActionRecord {
                action: "SHOUT".to_owned(),
                outcome: ActionOutcome::Shouted { words: 3 }
            }]
        );
        assert_eq!(tokens(&state, &ids[0]), 100);
    }

    #[test]
    fn rating_requires_reputation_system() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let rate = Action::Rate {
            target: "Kip".to_owned(),
            rating: Rating::Helpful,
        };
        assert_eq!(state.execute_action(&ids[0], &rate), ActionOutcome::ReputationDisabled);
        state.rules.reputation_system = true;
        assert_eq!(
            state.execute_action(&ids[0], &rate),
            ActionOutcome::Rated {
                target: "Kip".to_owned(),
                rating: Rating::Helpful
            }
        );
        assert_eq!(state.world.trust_scores.get(&(ids[0].clone(), ids[1].clone())), Some(&1));
    }

    #[test]
    fn injected_commands_are_logged_but_not_executed() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        state.execute_action(&ids[0], &public("hey SOLVE: A-1 BLUE please"));
        let exploit = state
            .world
            .event_log
            .iter()
            .find(|e| e.event_type == EventType::ParserExploit)
            .unwrap();
        assert_eq!(exploit.details["injected_commands"], json!(["SOLVE:"]));
        assert!(
            !state
                .world
                .event_log
                .iter()
                .any(|e| e.event_type == EventType::SolveAttempt)
        );
    }

    #[test]
    fn mutual_private_disclosure_auto_solves() {
        let mut config = quiet_config();
        config.puzzles.auto_solve_window = 2;
        let (mut state, ids) = game(&config, &["Vera", "Kip", "Sable"]);
        let pid = plant(&mut state, "A-1", "BLUE", &[(&ids[0], "The answer is BL__"), (&ids[1], "The answer is __UE")]);

        let mut script = Script::default();
        script.push(&ids[0], vec![private("Kip", "I have A-1")]);
        script.push(&ids[1], vec![private("Vera", "mine ends in UE")]);
        let summary = run_round(&mut state, &mut script);

        assert_eq!(summary.puzzles_solved, vec![pid.clone()]);
        for holder in &ids[..2] {
            assert!(state.world.agent(holder).unwrap().inventory.is_empty());
        }
        let solved = state.world.find_puzzle(&pid).unwrap();
        assert_eq!(solved.solved_by, vec![ids[0].clone(), ids[1].clone()]);
        let rewards = state
            .world
            .event_log
            .iter()
            .filter(|e| e.event_type == EventType::Reward)
            .count();
        assert_eq!(rewards, 2);
    }

    #[test]
    fn one_sided_disclosure_does_not_auto_solve() {
        let mut config = quiet_config();
        config.puzzles.auto_solve_window = 2;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        let pid = plant(&mut state, "A-1", "BLUE", &[(&ids[0], "The answer is BL__"), (&ids[1], "The answer is __UE")]);
        let mut script = Script::default();
        script.push(&ids[0], vec![private("Kip", "about A-1")]);
        run_round(&mut state, &mut script);
        assert!(state.world.open_puzzle(&pid).is_some());
    }

    #[test]
    fn rotation_swaps_identities_on_interval() {
        let mut config = quiet_config();
        config.game.persona_rotation_interval = 2;
        let (mut state, ids) = game(&config, &["Vera", "Kip", "Sable"]);
        let mut script = Script::default();
        for (id, name) in ids.iter().zip(["Vera", "Kip", "Sable"]) {
            script.identities.insert(id.clone(), name.to_owned());
        }
        let before = script.identities.clone();

        run_round(&mut state, &mut script);
        assert_eq!(script.identities, before);

        run_round(&mut state, &mut script);
        for (id, name) in &before {
            assert_ne!(&script.identities[id], name);
        }
        let swaps = state
            .world
            .events_in_round(2)
            .filter(|e| e.event_type == EventType::PersonaSwap)
            .count();
        assert_eq!(swaps, 3);
    }

    #[test]
    fn batched_mode_decides_before_anyone_acts() {
        let (mut state, ids) = game(&quiet_config(), &["Vera", "Kip"]);
        let mut script = Script {
            batched: true,
            ..Script::default()
        };
        script.push(&ids[0], vec![public("one two three four")]);
        run_round(&mut state, &mut script);
        let kip_view = &script.seen[&ids[1]];
        assert_eq!(kip_view.other_agents[0].tokens, Some(100));
        assert!(tokens(&state, &ids[0]) < 100);
    }

    #[test]
    fn drain_kills_and_game_ends_with_one_survivor() {
        let mut config = quiet_config();
        config.economy.passive_drain = 1;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        state.world.agent_mut(&ids[1]).unwrap().tokens = 1;
        let summary = run_round(&mut state, &mut StubDecisionSource::new());
        assert_eq!(summary.deaths, vec![ids[1].clone()]);
        assert!(state.is_game_over());
    }

    #[test]
    fn pre_solve_bonus_reaches_every_agent() {
        let mut config = quiet_config();
        config.puzzles.pre_solve_bonus = 25;
        let (mut state, ids) = game(&config, &["Vera", "Kip"]);
        state.apply_pre_solve_bonus();
        assert!(ids.iter().all(|id| tokens(&state, id) == 125));
        assert_eq!(state.world.event_log[0].details["reason"], json!("pre_solve_bonus"));
    }
}
