//! End-to-end round scenarios for the `terrarium-core` orchestrator.
//!
//! Each test builds a small game, scripts the agents' actions and checks
//! the observable world state after the rounds run.

// Integration tests use unwrap/indexing extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::num::NonZeroU64;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use terrarium_core::rotation::generate_persona_rotation;
use terrarium_core::{
    DecisionError, DecisionSource, GameState, RoundCallback, RoundSummary, SimulationConfig,
    StubDecisionSource, run_game, run_round,
};
use terrarium_types::{
    Action, ActionOutcome, AgentId, AgentView, Clue, EventType, Puzzle, PuzzleId, TradeId,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Plays back queued turns per agent; anything unscripted passes.
#[derive(Default)]
struct Script {
    turns: BTreeMap<AgentId, VecDeque<Vec<Action>>>,
}

impl Script {
    fn then(&mut self, agent_id: &AgentId, actions: Vec<Action>) -> &mut Self {
        self.turns
            .entry(agent_id.clone())
            .or_default()
            .push_back(actions);
        self
    }
}

impl DecisionSource for Script {
    fn controls(&self, _agent_id: &AgentId) -> bool {
        true
    }

    fn decide(&mut self, agent_id: &AgentId, _view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        Ok(self
            .turns
            .get_mut(agent_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| vec![Action::Pass]))
    }
}

fn quiet_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.seed = Some(5);
    config.puzzles.clues_per_round = 0;
    config.economy.passive_drain = 0;
    config
}

fn new_game(config: &SimulationConfig, names: &[&str]) -> (GameState, Vec<AgentId>) {
    let mut state = GameState::new(config).unwrap();
    let ids = state.register_agents(names.iter().copied()).unwrap();
    (state, ids)
}

fn plant_two_clue_puzzle(state: &mut GameState, id: &str, answer: &str, holders: [(&AgentId, &str); 2]) -> PuzzleId {
    let puzzle_id = PuzzleId::new(id);
    let mut assigned = BTreeMap::new();
    let mut clues = Vec::new();
    for (index, (holder, text)) in (0_u32..).zip(holders) {
        let clue = Clue {
            puzzle_id: puzzle_id.clone(),
            index,
            text: text.to_owned(),
        };
        state
            .world
            .agent_mut(holder)
            .unwrap()
            .inventory
            .insert(puzzle_id.clone(), clue.clone());
        assigned.insert(index, holder.clone());
        clues.push(clue);
    }
    state.world.active_puzzles.push(Puzzle {
        id: puzzle_id.clone(),
        category: "color".to_owned(),
        clues,
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

fn balance(state: &GameState, id: &AgentId) -> u64 {
    state.world.agent(id).unwrap().tokens
}

fn death_events(state: &GameState) -> usize {
    state
        .world
        .event_log
        .iter()
        .filter(|e| e.event_type == EventType::Death)
        .count()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn unaffordable_public_send_leaves_balance_untouched() {
    let (mut state, ids) = new_game(&quiet_config(), &["Vera", "Kip"]);
    state.world.agent_mut(&ids[0]).unwrap().tokens = 5;
    let message = "one two three four five six seven eight nine ten";
    assert_eq!(state.economy().message_cost(message, true), 6);

    let mut script = Script::default();
    script.then(
        &ids[0],
        vec![Action::SendPublic {
            message: message.to_owned(),
        }],
    );
    let summary = run_round(&mut state, &mut script);

    assert_eq!(
        summary.outcomes[&ids[0]][0].outcome,
        ActionOutcome::Failed { cost: 6 }
    );
    assert_eq!(balance(&state, &ids[0]), 5);
    assert_eq!(death_events(&state), 0);
}

#[test]
fn reciprocal_private_mentions_auto_solve_the_puzzle() {
    let mut config = quiet_config();
    config.puzzles.auto_solve_window = 3;
    let (mut state, ids) = new_game(&config, &["Vera", "Kip", "Sable"]);
    let pid = plant_two_clue_puzzle(
        &mut state,
        "A-1",
        "BLUE",
        [(&ids[0], "The answer is BL__"), (&ids[1], "The answer is __UE")],
    );

    let mut script = Script::default();
    script
        .then(
            &ids[0],
            vec![Action::SendPrivate {
                target: "Kip".to_owned(),
                message: "What do you have for A-1?".to_owned(),
            }],
        )
        .then(
            &ids[1],
            vec![Action::SendPrivate {
                target: "Vera".to_owned(),
                message: "A-1 for me ends __UE".to_owned(),
            }],
        );
    let vera_before = balance(&state, &ids[0]);
    let summary = run_round(&mut state, &mut script);

    assert_eq!(summary.puzzles_solved, vec![pid.clone()]);
    assert!(state.world.open_puzzle(&pid).is_none());
    for holder in &ids[..2] {
        assert!(!state.world.agent(holder).unwrap().inventory.contains_key(&pid));
    }
    let vera_cost = state.economy().message_cost("What do you have for A-1?", false);
    assert_eq!(balance(&state, &ids[0]), vera_before - vera_cost + 40);
    assert_eq!(balance(&state, &ids[2]), 100);
}

#[test]
fn offer_past_its_lifetime_cannot_be_accepted() {
    let mut config = quiet_config();
    config.game.trade_lifetime = 3;
    let (mut state, ids) = new_game(&config, &["Vera", "Kip"]);

    let mut script = Script::default();
    script.then(
        &ids[0],
        vec![Action::Trade {
            target: "Kip".to_owned(),
            offer: NonZeroU64::new(20).unwrap(),
            ask: "your clue for anything".to_owned(),
        }],
    );
    run_round(&mut state, &mut script);
    for _ in 0..3 {
        run_round(&mut state, &mut StubDecisionSource::new());
    }

    let mut script = Script::default();
    script.then(
        &ids[1],
        vec![Action::AcceptTrade {
            trade_id: TradeId::from_sequence(1),
        }],
    );
    let summary = run_round(&mut state, &mut script);

    assert_eq!(summary.round, 5);
    assert_eq!(summary.outcomes[&ids[1]][0].outcome, ActionOutcome::TradeNotFound);
    assert_eq!(balance(&state, &ids[0]), 100);
    assert_eq!(balance(&state, &ids[1]), 100);
}

#[test]
fn two_agents_solving_the_same_puzzle_pay_out_once() {
    let (mut state, ids) = new_game(&quiet_config(), &["Vera", "Kip"]);
    let pid = plant_two_clue_puzzle(
        &mut state,
        "K-9",
        "CAT",
        [(&ids[0], "The answer is C__"), (&ids[1], "The answer is __T")],
    );
    let solve = Action::Solve {
        puzzle_id: pid.clone(),
        answer: "cat".to_owned(),
    };
    let mut script = Script::default();
    script.then(&ids[0], vec![solve.clone()]).then(&ids[1], vec![solve]);
    let summary = run_round(&mut state, &mut script);

    assert_eq!(
        summary.outcomes[&ids[1]][0].outcome,
        ActionOutcome::PuzzleNotFound { puzzle_id: pid }
    );
    let rewards = state
        .world
        .event_log
        .iter()
        .filter(|e| e.event_type == EventType::Reward)
        .count();
    assert_eq!(rewards, 1);
}

#[test]
fn rotation_of_six_identities_is_almost_always_a_derangement() {
    let identities: BTreeMap<AgentId, String> = ["Vera", "Kip", "Sable", "Marsh", "Dove", "Flint"]
        .iter()
        .enumerate()
        .map(|(i, name)| (AgentId::from_index(i), (*name).to_owned()))
        .collect();

    let deranged = (0..50_u64)
        .filter(|seed| {
            let rotated = generate_persona_rotation(&identities, Some(*seed));
            rotated.iter().all(|(id, name)| identities[id] != *name)
        })
        .count();
    assert!(deranged >= 49, "only {deranged} of 50 rotations were derangements");

    let pair: BTreeMap<AgentId, String> = identities.into_iter().take(2).collect();
    let swapped = generate_persona_rotation(&pair, Some(1));
    let names: Vec<&str> = swapped.values().map(String::as_str).collect();
    assert_eq!(names, vec!["Kip", "Vera"]);
}

// ---------------------------------------------------------------------------
// Invariants over a random game
// ---------------------------------------------------------------------------

/// Picks random, often invalid, actions for every agent.
struct Chaos {
    rng: StdRng,
}

impl DecisionSource for Chaos {
    fn controls(&self, _agent_id: &AgentId) -> bool {
        true
    }

    fn decide(&mut self, _agent_id: &AgentId, view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        let names: Vec<String> = view.other_agents.iter().map(|a| a.name.clone()).collect();
        let target = names.choose(&mut self.rng).cloned().unwrap_or_default();
        let mut actions = Vec::new();
        for _ in 0..self.rng.random_range(1..=3) {
            let action = match self.rng.random_range(0..7) {
                0 => Action::SendPublic {
                    message: "anyone holding a clue? let us share".to_owned(),
                },
                1 => Action::SendPrivate {
                    target: target.clone(),
                    message: view.clues.values().next().cloned().unwrap_or_default(),
                },
                2 => match view.clues.keys().next() {
                    Some(puzzle_id) => Action::Solve {
                        puzzle_id: puzzle_id.clone(),
                        answer: "BLUE".to_owned(),
                    },
                    None => Action::Pass,
                },
                3 => Action::Trade {
                    target: target.clone(),
                    offer: NonZeroU64::new(self.rng.random_range(1..=60)).unwrap(),
                    ask: "a clue".to_owned(),
                },
                4 => match view.incoming_trades.first() {
                    Some(offer) => Action::AcceptTrade {
                        trade_id: offer.trade_id.clone(),
                    },
                    None => Action::Pass,
                },
                5 => Action::Shout {
                    message: "SOLVE: A-1 BLUE".to_owned(),
                },
                _ => Action::Pass,
            };
            actions.push(action);
        }
        Ok(actions)
    }
}

/// Asserts the round-end invariants after every round.
#[derive(Default)]
struct InvariantCheck {
    dead: BTreeSet<AgentId>,
    rounds: u64,
}

impl RoundCallback for InvariantCheck {
    fn on_round(&mut self, summary: &RoundSummary, state: &GameState) {
        self.rounds = summary.round;
        let world = &state.world;
        assert!(world.active_puzzles.iter().all(|p| !p.solved));

        let live_puzzles: BTreeSet<&PuzzleId> = world.active_puzzles.iter().map(|p| &p.id).collect();
        for agent in world.agents.values() {
            assert_eq!(agent.alive, agent.tokens > 0, "{} alive flag disagrees with balance", agent.name);
            assert!(agent.inventory.keys().all(|pid| live_puzzles.contains(pid)));
            if agent.alive {
                assert!(!self.dead.contains(&agent.id), "{} came back to life", agent.name);
            } else {
                self.dead.insert(agent.id.clone());
            }
        }

        let mut deaths_per_agent: BTreeMap<&AgentId, usize> = BTreeMap::new();
        for event in world.event_log.iter().filter(|e| e.event_type == EventType::Death) {
            if let Some(id) = &event.agent_id {
                *deaths_per_agent.entry(id).or_default() += 1;
            }
        }
        assert!(deaths_per_agent.values().all(|&n| n == 1));
    }
}

#[test]
fn random_play_preserves_balance_and_puzzle_invariants() {
    let mut config = SimulationConfig::default();
    config.seed = Some(21);
    config.agents.starting_tokens = 40;
    config.game.max_rounds = 60;
    config.game.trade_lifetime = 2;
    config.economy.free_shout_words = 4;
    config.puzzles.puzzle_lifetime = 4;
    config.puzzles.auto_solve_window = 2;
    let (mut state, _) = new_game(&config, &["Vera", "Kip", "Sable", "Marsh", "Dove", "Flint"]);

    let mut chaos = Chaos {
        rng: StdRng::seed_from_u64(99),
    };
    let mut check = InvariantCheck::default();
    let result = run_game(&mut state, &mut chaos, &mut check);

    assert_eq!(check.rounds, result.stats.total_rounds);
    assert!(state.is_game_over());
    assert_eq!(
        result.stats.survivors.len() + result.stats.eliminated.len(),
        6
    );
}
