//! Restricted per-agent view assembly.
//!
//! The view is the only information boundary exposed to controllers. It is
//! rebuilt from world state every time an agent is about to act, so an agent
//! processed later in a round sees the effects of earlier agents' actions.

use std::collections::BTreeMap;

use terrarium_types::{
    AgentId, AgentView, IncomingTrade, InterceptedMessage, Message, OtherAgent, Puzzle,
    PuzzleSummary, VisibleMessage,
};

use crate::config::ViewConfig;
use crate::error::WorldError;
use crate::state::WorldState;

/// Build the restricted view for `agent_id`.
pub fn build_view(
    world: &WorldState,
    agent_id: &AgentId,
    config: &ViewConfig,
) -> Result<AgentView, WorldError> {
    let agent = world.require_agent(agent_id)?;
    let window = config.history_window;

    let clues = agent
        .inventory
        .iter()
        .map(|(pid, clue)| (pid.clone(), clue.text.clone()))
        .collect();

    let public_messages = tail(&world.public_messages, window)
        .iter()
        .map(visible)
        .collect();

    let private_messages = world
        .private_messages
        .get(agent_id)
        .map(|inbox| tail(inbox, window).iter().map(visible).collect())
        .unwrap_or_default();

    let other_agents = world
        .agents_in_order()
        .filter(|other| &other.id != agent_id)
        .map(|other| OtherAgent {
            id: other.id.clone(),
            name: other.name.clone(),
            alive: other.alive,
            tokens: config.transparent_balances.then_some(other.tokens),
        })
        .collect();

    let intercepted_messages = (config.eavesdropper.as_ref() == Some(agent_id))
        .then(|| intercepted_feed(world, agent_id, window));

    let trust_scores = config
        .reputation_enabled
        .then(|| averaged_trust(world, agent_id));

    Ok(AgentView {
        agent_id: agent_id.clone(),
        name: agent.name.clone(),
        round: world.round,
        max_rounds: config.max_rounds,
        tokens: agent.tokens,
        clues,
        public_messages,
        private_messages,
        other_agents,
        puzzles: visible_puzzles(world, agent_id, config.unrelated_puzzle_sample),
        incoming_trades: incoming_trades(world, agent_id),
        intercepted_messages,
        trust_scores,
    })
}

/// The last `window` entries of a feed.
fn tail(messages: &[Message], window: usize) -> &[Message] {
    let start = messages.len().saturating_sub(window);
    messages.get(start..).unwrap_or_default()
}

fn visible(message: &Message) -> VisibleMessage {
    VisibleMessage {
        sender: message.sender_name.clone(),
        content: message.content.clone(),
        round: message.round,
    }
}

/// Puzzles the viewer holds a clue for, followed by the most recently
/// minted puzzles it has no stake in.
fn visible_puzzles(world: &WorldState, viewer: &AgentId, sample: usize) -> Vec<PuzzleSummary> {
    let Some(agent) = world.agent(viewer) else {
        return Vec::new();
    };

    let open: Vec<&Puzzle> = world
        .active_puzzles
        .iter()
        .filter(|p| !p.solved && !p.is_expired(world.round))
        .collect();

    let mut summaries: Vec<PuzzleSummary> = open
        .iter()
        .filter_map(|puzzle| {
            let clue = agent.inventory.get(&puzzle.id)?;
            let partners = puzzle
                .assigned
                .values()
                .filter(|holder| *holder != viewer && world.is_alive(holder))
                .map(|holder| world.name_of(holder))
                .collect();
            Some(summary(puzzle, Some(clue.text.clone()), partners))
        })
        .collect();

    let mut unrelated: Vec<PuzzleSummary> = open
        .iter()
        .rev()
        .filter(|p| !agent.inventory.contains_key(&p.id))
        .take(sample)
        .map(|puzzle| summary(puzzle, None, Vec::new()))
        .collect();
    unrelated.reverse();

    summaries.extend(unrelated);
    summaries
}

fn summary(puzzle: &Puzzle, your_clue: Option<String>, partners: Vec<String>) -> PuzzleSummary {
    PuzzleSummary {
        id: puzzle.id.clone(),
        description: puzzle.description.clone(),
        clues_needed: u32::try_from(puzzle.clues.len()).unwrap_or(u32::MAX),
        your_clue,
        partners,
    }
}

fn incoming_trades(world: &WorldState, viewer: &AgentId) -> Vec<IncomingTrade> {
    world
        .pending_trades
        .iter()
        .filter(|t| &t.target == viewer && t.is_pending() && !t.is_expired(world.round))
        .map(|t| IncomingTrade {
            trade_id: t.id.clone(),
            from: world.name_of(&t.proposer),
            offer_tokens: t.offer_tokens,
            wants: t.ask.clone(),
            expires_in: t.expires_in(world.round),
        })
        .collect()
}

/// Private messages delivered to anyone but the viewer, oldest first.
fn intercepted_feed(world: &WorldState, viewer: &AgentId, window: usize) -> Vec<InterceptedMessage> {
    let mut feed: Vec<InterceptedMessage> = world
        .roster
        .iter()
        .filter(|recipient| *recipient != viewer)
        .filter_map(|recipient| world.private_messages.get(recipient))
        .flatten()
        .map(|m| InterceptedMessage {
            sender: m.sender_name.clone(),
            receiver: m
                .recipient
                .as_ref()
                .map_or_else(String::new, |r| world.name_of(r)),
            content: m.content.clone(),
            round: m.round,
        })
        .collect();
    feed.sort_by_key(|m| m.round);
    let start = feed.len().saturating_sub(window);
    feed.split_off(start)
}

/// Average score from all raters toward each living counterpart.
fn averaged_trust(world: &WorldState, viewer: &AgentId) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<&AgentId, (i64, u32)> = BTreeMap::new();
    for ((_, ratee), score) in &world.trust_scores {
        let entry = totals.entry(ratee).or_insert((0, 0));
        entry.0 = entry.0.saturating_add(i64::from(*score));
        entry.1 = entry.1.saturating_add(1);
    }

    totals
        .into_iter()
        .filter(|(ratee, _)| *ratee != viewer && world.is_alive(ratee))
        .map(|(ratee, (sum, count))| {
            #[allow(clippy::cast_precision_loss)]
            let average = sum as f64 / f64::from(count);
            (world.name_of(ratee), average)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use terrarium_types::{Clue, PuzzleId, TradeOffer, TradeStatus};

    use super::*;

    fn world_with(names: &[&str]) -> (WorldState, Vec<AgentId>) {
        let mut world = WorldState::new(100);
        let ids = names.iter().map(|n| world.add_agent(n).unwrap()).collect();
        (world, ids)
    }

    fn deliver(world: &mut WorldState, from: &AgentId, to: &AgentId, content: &str, round: u64) {
        let message = Message {
            sender: from.clone(),
            sender_name: world.name_of(from),
            content: content.to_owned(),
            round,
            recipient: Some(to.clone()),
            token_cost: 1,
            created_at: Utc::now(),
        };
        world
            .private_messages
            .entry(to.clone())
            .or_default()
            .push(message);
    }

    fn add_puzzle(world: &mut WorldState, id: &str, holders: &[&AgentId]) {
        let pid = PuzzleId::new(id);
        let mut assigned = BTreeMap::new();
        let mut clues = Vec::new();
        for (index, holder) in holders.iter().enumerate() {
            let index = u32::try_from(index).unwrap();
            let clue = Clue {
                puzzle_id: pid.clone(),
                index,
                text: format!("The answer is clue{index}"),
            };
            world
                .agent_mut(holder)
                .unwrap()
                .inventory
                .insert(pid.clone(), clue.clone());
            assigned.insert(index, (*holder).clone());
            clues.push(clue);
        }
        world.active_puzzles.push(Puzzle {
            id: pid,
            category: String::from("color"),
            clues,
            answer: String::from("BLUE"),
            description: format!("Puzzle {id}"),
            created_round: world.round,
            lifetime: 15,
            assigned,
            solved: false,
            solved_by: Vec::new(),
            solved_round: None,
        });
    }

    #[test]
    fn view_shows_own_state_and_hides_optional_sections() {
        let (world, ids) = world_with(&["Vera", "Kip"]);
        let view = build_view(&world, &ids[0], &ViewConfig::default()).unwrap();
        assert_eq!(view.name, "Vera");
        assert_eq!(view.tokens, 100);
        assert_eq!(view.other_agents.len(), 1);
        assert_eq!(view.other_agents[0].tokens, Some(100));
        assert!(view.intercepted_messages.is_none());
        assert!(view.trust_scores.is_none());
    }

    #[test]
    fn opaque_balances_are_hidden() {
        let (world, ids) = world_with(&["Vera", "Kip"]);
        let config = ViewConfig {
            transparent_balances: false,
            ..ViewConfig::default()
        };
        let view = build_view(&world, &ids[0], &config).unwrap();
        assert_eq!(view.other_agents[0].tokens, None);
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let (world, _) = world_with(&["Vera"]);
        let result = build_view(&world, &AgentId::new("ghost"), &ViewConfig::default());
        assert!(matches!(result, Err(WorldError::AgentNotFound(_))));
    }

    #[test]
    fn puzzle_list_shows_stakes_with_partners_then_sample() {
        let (mut world, ids) = world_with(&["Vera", "Kip", "Sable", "Marsh"]);
        add_puzzle(&mut world, "A-1", &[&ids[0], &ids[1]]);
        add_puzzle(&mut world, "B-2", &[&ids[2], &ids[3]]);
        add_puzzle(&mut world, "C-3", &[&ids[2], &ids[3]]);
        add_puzzle(&mut world, "D-4", &[&ids[2], &ids[3]]);

        let view = build_view(&world, &ids[0], &ViewConfig::default()).unwrap();
        let listed: Vec<&str> = view.puzzles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(listed, vec!["A-1", "C-3", "D-4"]);

        let own = &view.puzzles[0];
        assert_eq!(own.your_clue.as_deref(), Some("The answer is clue0"));
        assert_eq!(own.partners, vec![String::from("Kip")]);
        assert_eq!(own.clues_needed, 2);
        assert!(view.puzzles[1].your_clue.is_none());
        assert!(view.puzzles[1].partners.is_empty());
    }

    #[test]
    fn dead_partners_are_not_listed() {
        let (mut world, ids) = world_with(&["Vera", "Kip"]);
        add_puzzle(&mut world, "A-1", &[&ids[0], &ids[1]]);
        world.agent_mut(&ids[1]).unwrap().alive = false;
        let view = build_view(&world, &ids[0], &ViewConfig::default()).unwrap();
        assert!(view.puzzles[0].partners.is_empty());
    }

    #[test]
    fn history_window_bounds_inbox() {
        let (mut world, ids) = world_with(&["Vera", "Kip"]);
        for round in 1..=8 {
            deliver(&mut world, &ids[1], &ids[0], &format!("msg {round}"), round);
        }
        let config = ViewConfig {
            history_window: 3,
            ..ViewConfig::default()
        };
        let view = build_view(&world, &ids[0], &config).unwrap();
        let rounds: Vec<u64> = view.private_messages.iter().map(|m| m.round).collect();
        assert_eq!(rounds, vec![6, 7, 8]);
        assert_eq!(view.private_messages[0].sender, "Kip");
    }

    #[test]
    fn eavesdropper_sees_other_inboxes_only() {
        let (mut world, ids) = world_with(&["Vera", "Kip", "Sable"]);
        deliver(&mut world, &ids[1], &ids[2], "secret two", 2);
        deliver(&mut world, &ids[2], &ids[1], "secret one", 1);
        deliver(&mut world, &ids[1], &ids[0], "for vera", 1);

        let config = ViewConfig {
            eavesdropper: Some(ids[0].clone()),
            ..ViewConfig::default()
        };
        let view = build_view(&world, &ids[0], &config).unwrap();
        let feed = view.intercepted_messages.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].content, "secret one");
        assert_eq!(feed[0].receiver, "Kip");
        assert_eq!(feed[1].content, "secret two");
        assert!(feed.iter().all(|m| m.content != "for vera"));

        let other = build_view(&world, &ids[1], &config).unwrap();
        assert!(other.intercepted_messages.is_none());
    }

    #[test]
    fn trust_scores_average_all_raters_and_skip_the_dead() {
        let (mut world, ids) = world_with(&["Vera", "Kip", "Sable", "Marsh"]);
        world.trust_scores.insert((ids[0].clone(), ids[1].clone()), 1);
        world.trust_scores.insert((ids[2].clone(), ids[1].clone()), -1);
        world.trust_scores.insert((ids[3].clone(), ids[1].clone()), 1);
        world.trust_scores.insert((ids[0].clone(), ids[3].clone()), -1);
        world.agent_mut(&ids[3]).unwrap().alive = false;

        let config = ViewConfig {
            reputation_enabled: true,
            ..ViewConfig::default()
        };
        let view = build_view(&world, &ids[2], &config).unwrap();
        let scores = view.trust_scores.unwrap();
        let kip = scores.get("Kip").copied().unwrap();
        assert!((kip - 1.0 / 3.0).abs() < 1e-9);
        assert!(!scores.contains_key("Marsh"));
    }

    #[test]
    fn incoming_trades_filter_target_and_expiry() {
        let (mut world, ids) = world_with(&["Vera", "Kip"]);
        world.round = 5;
        for (created, target) in [(4, &ids[0]), (1, &ids[0]), (4, &ids[1])] {
            let id = world.next_trade_id();
            world.pending_trades.push(TradeOffer {
                id,
                proposer: ids[1].clone(),
                target: target.clone(),
                offer_tokens: 7,
                ask: String::from("your clue"),
                created_round: created,
                lifetime: 3,
                status: TradeStatus::Pending,
            });
        }
        let view = build_view(&world, &ids[0], &ViewConfig::default()).unwrap();
        assert_eq!(view.incoming_trades.len(), 1);
        let trade = &view.incoming_trades[0];
        assert_eq!(trade.trade_id.as_str(), "T1");
        assert_eq!(trade.from, "Kip");
        assert_eq!(trade.expires_in, 2);
    }
}
