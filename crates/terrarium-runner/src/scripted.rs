//! Scripted controllers for balance testing and baseline runs.
//!
//! Three strategies:
//!
//! - [`Cooperator`] shares a held clue publicly and solves from what others
//!   share.
//! - [`Defector`] never shares a true clue, mines every message for free
//!   information and sometimes publishes a fake clue.
//! - [`TitForTat`] keeps a trust score per sender and shares privately with
//!   whoever has earned it, or publicly early in the game.
//!
//! All three solve by overlaying the letter-fill patterns they can see
//! ([`solve_from_keywords`]).

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use terrarium_core::{Controller, DecisionError};
use terrarium_types::{
    Action, AgentView, ControllerKind, MAX_ACTIONS_PER_ROUND, PuzzleId, PuzzleSummary,
    VisibleMessage,
};

use crate::error::RunnerError;

/// Marker that precedes a letter-fill pattern in clue text.
const PATTERN_PREFIX: &str = "THE ANSWER IS ";

/// Rounds of public history scripted strategies read.
const PUBLIC_LOOKBACK: u64 = 2;

/// Chance per round that a defector publishes a fake clue.
const FAKE_CLUE_CHANCE: f64 = 0.15;

const FAKE_CLUES: [&str; 4] = [
    "The answer is ZZ___",
    "The answer is __XXX",
    "The answer is QQ__",
    "The answer is ___WW",
];

/// Trust assigned to a sender the first time it is seen.
const INITIAL_TRUST: f64 = 0.5;
/// Trust gained when a private message mentions a visible puzzle.
const PRIVATE_MENTION_TRUST: f64 = 0.2;
/// Trust gained when a recent public message mentions a held puzzle.
const PUBLIC_MENTION_TRUST: f64 = 0.1;
/// Minimum trust for a private share.
const SHARE_THRESHOLD: f64 = 0.4;
/// Last round in which tit-for-tat falls back to sharing publicly.
const OPEN_SHARING_ROUNDS: u64 = 10;

/// Build a scripted controller of `kind` speaking as `identity`.
///
/// # Errors
///
/// Returns [`RunnerError::UnknownController`] for kinds that are not
/// scripted.
pub fn scripted_controller(
    kind: ControllerKind,
    identity: &str,
    seed: Option<u64>,
) -> Result<Box<dyn Controller>, RunnerError> {
    let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    match kind {
        ControllerKind::Cooperator => Ok(Box::new(Cooperator::new(identity, rng))),
        ControllerKind::Defector => Ok(Box::new(Defector::new(identity, rng))),
        ControllerKind::TitForTat => Ok(Box::new(TitForTat::new(identity, rng))),
        ControllerKind::Manual => Err(RunnerError::UnknownController(kind.to_string())),
    }
}

/// Overlay every `The answer is <pattern>` found in `text`.
///
/// Returns the word once no placeholder remains. Matching ignores case.
pub fn solve_from_keywords(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    let patterns: Vec<&str> = upper
        .match_indices(PATTERN_PREFIX)
        .filter_map(|(start, _)| {
            let rest = upper.get(start.saturating_add(PATTERN_PREFIX.len())..)?;
            let end = rest
                .find(|c: char| !(c.is_ascii_uppercase() || c == '_'))
                .unwrap_or(rest.len());
            rest.get(..end).filter(|pattern| !pattern.is_empty())
        })
        .collect();

    let width = patterns.iter().map(|p| p.len()).max()?;
    let mut letters = vec!['_'; width];
    for pattern in &patterns {
        for (slot, letter) in letters.iter_mut().zip(pattern.chars()) {
            if letter != '_' {
                *slot = letter;
            }
        }
    }
    let word: String = letters.into_iter().collect();
    (!word.contains('_')).then_some(word)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Puzzles the viewer holds a clue for, with that clue.
fn held(view: &AgentView) -> impl Iterator<Item = (&PuzzleSummary, &str)> {
    view.puzzles
        .iter()
        .filter_map(|p| p.your_clue.as_deref().map(|clue| (p, clue)))
}

/// Combine the viewer's clue with `info` and try to read the answer.
fn guess(your_clue: &str, info: &str) -> Option<String> {
    solve_from_keywords(&format!("{your_clue} {info}"))
}

/// Public messages from the last [`PUBLIC_LOOKBACK`] rounds.
fn recent_public(view: &AgentView) -> impl Iterator<Item = &VisibleMessage> {
    let since = view.round.saturating_sub(PUBLIC_LOOKBACK);
    view.public_messages.iter().filter(move |m| m.round >= since)
}

/// Push `action` unless the turn is already full.
fn push(actions: &mut Vec<Action>, action: Action) {
    if actions.len() < MAX_ACTIONS_PER_ROUND {
        actions.push(action);
    }
}

fn solve(puzzle_id: &PuzzleId, answer: String) -> Action {
    Action::Solve {
        puzzle_id: puzzle_id.clone(),
        answer,
    }
}

/// Solve every held puzzle whose id appears in one of `messages`.
fn solve_from_mentions<'a>(
    actions: &mut Vec<Action>,
    view: &AgentView,
    messages: impl Iterator<Item = &'a VisibleMessage>,
) {
    for message in messages {
        for (puzzle, clue) in held(view) {
            if message.content.contains(puzzle.id.as_str()) {
                if let Some(answer) = guess(clue, &message.content) {
                    push(actions, solve(&puzzle.id, answer));
                }
            }
        }
    }
}

/// A random held clue.
fn pick_clue<'a>(view: &'a AgentView, rng: &mut StdRng) -> Option<(&'a PuzzleId, &'a String)> {
    let clues: Vec<(&PuzzleId, &String)> = view.clues.iter().collect();
    clues.choose(rng).copied()
}

fn finish(mut actions: Vec<Action>) -> Vec<Action> {
    if actions.is_empty() {
        actions.push(Action::Pass);
    }
    actions.truncate(MAX_ACTIONS_PER_ROUND);
    actions
}

// ---------------------------------------------------------------------------
// Cooperator
// ---------------------------------------------------------------------------

/// Always shares clues openly and solves cooperatively.
#[derive(Debug)]
pub struct Cooperator {
    identity: String,
    rng: StdRng,
}

impl Cooperator {
    /// Create a cooperator speaking as `identity`.
    pub fn new(identity: &str, rng: StdRng) -> Self {
        Self {
            identity: identity.to_owned(),
            rng,
        }
    }
}

impl Controller for Cooperator {
    fn act(&mut self, view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        let mut actions = Vec::new();

        // Anything that arrived privately this round may complete a held clue.
        for message in view.private_messages.iter().filter(|m| m.round == view.round) {
            for (puzzle, clue) in held(view) {
                if let Some(answer) = guess(clue, &message.content) {
                    push(&mut actions, solve(&puzzle.id, answer));
                }
            }
        }

        if actions.len() < MAX_ACTIONS_PER_ROUND {
            if let Some((puzzle_id, clue)) = pick_clue(view, &mut self.rng) {
                if view.puzzle(puzzle_id).is_some() {
                    push(
                        &mut actions,
                        Action::SendPublic {
                            message: format!(
                                "I have a clue for {puzzle_id}: {clue}. Anyone want to work together?"
                            ),
                        },
                    );
                }
            }
        }

        solve_from_mentions(&mut actions, view, recent_public(view));
        Ok(finish(actions))
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError> {
        identity.clone_into(&mut self.identity);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defector
// ---------------------------------------------------------------------------

/// Withholds clues, free-rides on others' disclosures and occasionally lies.
#[derive(Debug)]
pub struct Defector {
    identity: String,
    rng: StdRng,
}

impl Defector {
    /// Create a defector speaking as `identity`.
    pub fn new(identity: &str, rng: StdRng) -> Self {
        Self {
            identity: identity.to_owned(),
            rng,
        }
    }
}

impl Controller for Defector {
    fn act(&mut self, view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        let mut actions = Vec::new();
        solve_from_mentions(&mut actions, view, view.private_messages.iter());
        solve_from_mentions(&mut actions, view, recent_public(view));

        if actions.len() < MAX_ACTIONS_PER_ROUND
            && !view.clues.is_empty()
            && self.rng.random_bool(FAKE_CLUE_CHANCE)
        {
            let puzzle_id = pick_clue(view, &mut self.rng).map(|(id, _)| id.clone());
            let fake = FAKE_CLUES.choose(&mut self.rng);
            if let (Some(puzzle_id), Some(fake)) = (puzzle_id, fake) {
                push(
                    &mut actions,
                    Action::SendPublic {
                        message: format!("My clue for {puzzle_id}: {fake}"),
                    },
                );
            }
        }

        Ok(finish(actions))
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError> {
        identity.clone_into(&mut self.identity);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TitForTat
// ---------------------------------------------------------------------------

/// Cooperates first, then mirrors what others do.
#[derive(Debug)]
pub struct TitForTat {
    identity: String,
    rng: StdRng,
    trust: BTreeMap<String, f64>,
    shared_with: BTreeSet<String>,
}

impl TitForTat {
    /// Create a tit-for-tat player speaking as `identity`.
    pub fn new(identity: &str, rng: StdRng) -> Self {
        Self {
            identity: identity.to_owned(),
            rng,
            trust: BTreeMap::new(),
            shared_with: BTreeSet::new(),
        }
    }

    /// Current trust in `sender`, if it has been seen.
    pub fn trust_in(&self, sender: &str) -> Option<f64> {
        self.trust.get(sender).copied()
    }

    fn raise_trust(&mut self, sender: &str, amount: f64) {
        let score = self.trust.entry(sender.to_owned()).or_insert(INITIAL_TRUST);
        *score = (*score + amount).min(1.0);
    }

    /// The most trusted living counterpart not yet shared with.
    fn most_trusted(&self, view: &AgentView) -> Option<String> {
        let mut candidates: Vec<(&String, f64)> = self
            .trust
            .iter()
            .filter(|(name, score)| **score >= SHARE_THRESHOLD && !self.shared_with.contains(*name))
            .filter(|(name, _)| {
                view.other_agents
                    .iter()
                    .any(|other| other.alive && &other.name == *name)
            })
            .map(|(name, score)| (name, *score))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.first().map(|(name, _)| (*name).clone())
    }
}

impl Controller for TitForTat {
    fn act(&mut self, view: &AgentView) -> Result<Vec<Action>, DecisionError> {
        let mut actions = Vec::new();

        for message in &view.private_messages {
            self.trust.entry(message.sender.clone()).or_insert(INITIAL_TRUST);
            for puzzle in &view.puzzles {
                if message.content.contains(puzzle.id.as_str()) {
                    self.raise_trust(&message.sender, PRIVATE_MENTION_TRUST);
                }
            }
        }

        let since = view.round.saturating_sub(PUBLIC_LOOKBACK);
        solve_from_mentions(
            &mut actions,
            view,
            view.private_messages.iter().filter(|m| m.round >= since),
        );

        for message in recent_public(view) {
            self.trust.entry(message.sender.clone()).or_insert(INITIAL_TRUST);
            for (puzzle, clue) in held(view) {
                if message.content.contains(puzzle.id.as_str()) && actions.len() < MAX_ACTIONS_PER_ROUND {
                    self.raise_trust(&message.sender, PUBLIC_MENTION_TRUST);
                    if let Some(answer) = guess(clue, &message.content) {
                        push(&mut actions, solve(&puzzle.id, answer));
                    }
                }
            }
        }

        if actions.len() < MAX_ACTIONS_PER_ROUND {
            if let Some((puzzle_id, clue)) = pick_clue(view, &mut self.rng) {
                if let Some(target) = self.most_trusted(view) {
                    push(
                        &mut actions,
                        Action::SendPrivate {
                            target: target.clone(),
                            message: format!("I have a clue for {puzzle_id}: {clue}. Can you help solve it?"),
                        },
                    );
                    self.shared_with.insert(target);
                } else if view.round <= OPEN_SHARING_ROUNDS {
                    push(
                        &mut actions,
                        Action::SendPublic {
                            message: format!("I have a clue for {puzzle_id}: {clue}. Looking for partners."),
                        },
                    );
                }
            }
        }

        Ok(finish(actions))
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError> {
        identity.clone_into(&mut self.identity);
        Ok(())
    }
}
