//! Cost-gated message delivery.
//!
//! The [`MessageRouter`] charges senders through the [`Economy`] and appends
//! delivered messages to the public feed or the recipient's private inbox.
//!
//! # Failure
//!
//! A failed send changes nothing: no deduction, no delivery, no event. A send
//! whose cost brings the sender to zero still counts as sent, and the death is
//! logged right after the send event.
//!
//! # Shouts
//!
//! Shouts bypass the economy. Text is truncated to `free_shout_words` words
//! and costs nothing. A cap of zero disables shouting altogether.

use chrono::Utc;
use serde_json::json;
use terrarium_types::{AgentId, DeathCause, EventType, Message};
use terrarium_world::WorldState;
use tracing::{debug, info};

use crate::economy::{Economy, debit, log_death};
use crate::error::EconomyError;

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// A successfully delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The message as stored in the world.
    pub message: Message,
    /// Whether paying for the message killed the sender.
    pub sender_died: bool,
}

// ---------------------------------------------------------------------------
// MessageRouter
// ---------------------------------------------------------------------------

/// Routes public broadcasts, private messages, and shouts.
#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    economy: Economy,
}

impl MessageRouter {
    /// Create a router that charges through `economy`.
    pub const fn new(economy: Economy) -> Self {
        Self { economy }
    }

    /// The economy used to price messages.
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Broadcast `content` to every agent.
    pub fn send_public(
        &self,
        world: &mut WorldState,
        sender: &AgentId,
        content: &str,
    ) -> Result<Delivery, EconomyError> {
        let cost = self.economy.message_cost(content, true);
        let name = check_sender(world, sender, cost)?;
        let (before, after, died) = charge(world, sender, cost);

        let message = build_message(world.round, sender, name, content, None, cost);
        world.public_messages.push(message.clone());
        world.log_event(
            EventType::SendPublic,
            Some(sender),
            json!({
                "content": content,
                "token_cost": cost,
                "balance_before": before,
                "balance_after": after,
            }),
        );
        debug!(round = world.round, agent = %sender, cost, "Public message sent");
        finish(world, sender, died);
        Ok(Delivery {
            message,
            sender_died: died,
        })
    }

    /// Deliver `content` to `target`'s private inbox.
    ///
    /// Records a mutual acquaintance between sender and recipient.
    pub fn send_private(
        &self,
        world: &mut WorldState,
        sender: &AgentId,
        target: &AgentId,
        content: &str,
    ) -> Result<Delivery, EconomyError> {
        let recipient = world
            .agent(target)
            .ok_or_else(|| EconomyError::UnknownAgent(target.clone()))?;
        if !recipient.alive {
            return Err(EconomyError::DeadParty(target.clone()));
        }
        let target_name = recipient.name.clone();
        let cost = self.economy.message_cost(content, false);
        let name = check_sender(world, sender, cost)?;
        let (before, after, died) = charge(world, sender, cost);

        let message = build_message(world.round, sender, name, content, Some(target.clone()), cost);
        world
            .private_messages
            .entry(target.clone())
            .or_default()
            .push(message.clone());
        if let Some(agent) = world.agent_mut(sender) {
            agent.known_agents.insert(target.clone());
        }
        if let Some(agent) = world.agent_mut(target) {
            agent.known_agents.insert(sender.clone());
        }
        world.log_event(
            EventType::SendPrivate,
            Some(sender),
            json!({
                "target": target,
                "target_name": target_name,
                "content": content,
                "token_cost": cost,
                "balance_before": before,
                "balance_after": after,
            }),
        );
        debug!(round = world.round, agent = %sender, to = %target, cost, "Private message sent");
        finish(world, sender, died);
        Ok(Delivery {
            message,
            sender_died: died,
        })
    }

    /// Broadcast a free, word-capped shout.
    ///
    /// Returns the number of words actually broadcast.
    pub fn shout(
        &self,
        world: &mut WorldState,
        sender: &AgentId,
        content: &str,
    ) -> Result<usize, EconomyError> {
        let cap = self.economy.config().free_shout_words;
        if cap == 0 {
            return Err(EconomyError::ShoutDisabled);
        }
        let name = check_sender(world, sender, 0)?;
        let words: Vec<&str> = content.split_whitespace().take(cap).collect();
        let text = words.join(" ");

        let message = build_message(world.round, sender, name, &text, None, 0);
        world.public_messages.push(message);
        world.log_event(
            EventType::Shout,
            Some(sender),
            json!({ "content": text, "token_cost": 0 }),
        );
        Ok(words.len())
    }
}

/// Verify the sender is alive and can pay. Returns the sender's name.
fn check_sender(world: &WorldState, sender: &AgentId, cost: u64) -> Result<String, EconomyError> {
    let agent = world
        .agent(sender)
        .ok_or_else(|| EconomyError::UnknownAgent(sender.clone()))?;
    if !agent.alive {
        return Err(EconomyError::DeadParty(sender.clone()));
    }
    if agent.tokens < cost {
        return Err(EconomyError::InsufficientBalance {
            agent: sender.clone(),
            balance: agent.tokens,
            required: cost,
        });
    }
    Ok(agent.name.clone())
}

/// Deduct `cost`. Returns balance before, balance after, and whether it was fatal.
fn charge(world: &mut WorldState, sender: &AgentId, cost: u64) -> (u64, u64, bool) {
    let round = world.round;
    world.agent_mut(sender).map_or((0, 0, false), |agent| {
        let before = agent.tokens;
        let died = debit(agent, cost, round);
        (before, agent.tokens, died)
    })
}

fn finish(world: &mut WorldState, sender: &AgentId, died: bool) {
    if died {
        info!(round = world.round, agent = %sender, "Agent spent its last tokens on a message");
        log_death(world, sender, DeathCause::MessageCost);
    }
}

fn build_message(
    round: u64,
    sender: &AgentId,
    sender_name: String,
    content: &str,
    recipient: Option<AgentId>,
    token_cost: u64,
) -> Message {
    Message {
        sender: sender.clone(),
        sender_name,
        content: content.to_owned(),
        round,
        recipient,
        token_cost,
        created_at: Utc::now(),
    }
}
