//! Token costs, rewards, and transfers.
//!
//! The [`Economy`] holds only configuration. All balances live in the
//! [`WorldState`] passed to each call. Balances never go negative: a debit
//! that reaches zero kills the agent on the spot and records its death round.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use terrarium_types::{Agent, AgentId, DeathCause, EventType};
use terrarium_world::WorldState;
use tracing::{debug, info};

use crate::config::EconomyConfig;
use crate::error::EconomyError;

/// Reward reason recorded for puzzle solves.
pub const REASON_PUZZLE_SOLVE: &str = "puzzle_solve";

/// Cost, reward, and transfer rules.
#[derive(Debug, Clone, Default)]
pub struct Economy {
    config: EconomyConfig,
}

impl Economy {
    /// Create an economy with the given constants.
    pub const fn new(config: EconomyConfig) -> Self {
        Self { config }
    }

    /// The economy's constants.
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Token cost of sending `text`.
    ///
    /// `max(1, round(words * rate))`, then for public messages multiplied by
    /// the surcharge, truncated, and floored at 1 again. Rounding is
    /// half-to-even.
    pub fn message_cost(&self, text: &str, is_public: bool) -> u64 {
        let words = Decimal::from(text.split_whitespace().count());
        let base = words
            .checked_mul(self.config.message_cost_per_token)
            .and_then(|cost| cost.round().to_u64())
            .unwrap_or(u64::MAX)
            .max(1);
        if !is_public {
            return base;
        }
        Decimal::from(base)
            .checked_mul(self.config.public_message_multiplier)
            .and_then(|cost| cost.trunc().to_u64())
            .unwrap_or(u64::MAX)
            .max(1)
    }

    /// Charge every living agent the per-round drain.
    ///
    /// Returns the agents that died, in roster order.
    pub fn apply_passive_drain(&self, world: &mut WorldState) -> Vec<AgentId> {
        let round = world.round;
        let mut deaths = Vec::new();
        for id in world.alive_agent_ids() {
            let Some(agent) = world.agent_mut(&id) else {
                continue;
            };
            if debit(agent, self.config.passive_drain, round) {
                info!(round, agent = %id, "Agent starved");
                log_death(world, &id, DeathCause::Starvation);
                deaths.push(id);
            }
        }
        deaths
    }

    /// Pay out a puzzle solve.
    ///
    /// A single solver gets the solo reward. Every member of a larger set gets
    /// the full split reward. Dead or unknown solvers are skipped. Returns the
    /// per-member amount.
    pub fn reward_puzzle_solve(&self, world: &mut WorldState, solvers: &[AgentId]) -> u64 {
        let cooperative = solvers.len() > 1;
        let amount = if cooperative {
            self.config.puzzle_split_reward
        } else {
            self.config.puzzle_reward
        };
        for id in solvers {
            credit(world, id, amount, REASON_PUZZLE_SOLVE, cooperative);
        }
        amount
    }

    /// Pay `amount` to a living agent for some reason other than a solve.
    pub fn grant(&self, world: &mut WorldState, agent_id: &AgentId, amount: u64, reason: &str) {
        credit(world, agent_id, amount, reason, false);
    }

    /// Move `amount` tokens from `proposer` to `target`.
    ///
    /// Fails with no state change unless both parties are alive, the amount
    /// is positive, and the proposer can cover it. A proposer drained to zero
    /// dies.
    pub fn process_trade(
        &self,
        world: &mut WorldState,
        proposer: &AgentId,
        target: &AgentId,
        amount: u64,
    ) -> Result<(), EconomyError> {
        if amount == 0 {
            return Err(EconomyError::ZeroAmount);
        }
        let payer = world
            .agent(proposer)
            .ok_or_else(|| EconomyError::UnknownAgent(proposer.clone()))?;
        let payee = world
            .agent(target)
            .ok_or_else(|| EconomyError::UnknownAgent(target.clone()))?;
        if !payer.alive {
            return Err(EconomyError::DeadParty(proposer.clone()));
        }
        if !payee.alive {
            return Err(EconomyError::DeadParty(target.clone()));
        }
        if payer.tokens < amount {
            return Err(EconomyError::InsufficientBalance {
                agent: proposer.clone(),
                balance: payer.tokens,
                required: amount,
            });
        }
        let credited = payee
            .tokens
            .checked_add(amount)
            .ok_or_else(|| EconomyError::ArithmeticOverflow {
                context: format!("crediting {amount} to {target}"),
            })?;

        let round = world.round;
        let died = world
            .agent_mut(proposer)
            .is_some_and(|agent| debit(agent, amount, round));
        if let Some(agent) = world.agent_mut(target) {
            agent.tokens = credited;
        }
        world.log_event(
            EventType::Trade,
            Some(proposer),
            json!({ "target": target, "amount": amount }),
        );
        debug!(round, from = %proposer, to = %target, amount, "Tokens transferred");
        if died {
            info!(round, agent = %proposer, "Agent traded away its last tokens");
            log_death(world, proposer, DeathCause::Trade);
        }
        Ok(())
    }
}

/// Subtract `amount` from an agent, clamping at zero.
///
/// Returns `true` when this debit killed the agent.
pub fn debit(agent: &mut Agent, amount: u64, round: u64) -> bool {
    agent.tokens = agent.tokens.saturating_sub(amount);
    if agent.tokens == 0 && agent.alive {
        agent.alive = false;
        agent.death_round = Some(round);
        return true;
    }
    false
}

/// Append a DEATH event for `agent_id` in the current round.
pub fn log_death(world: &mut WorldState, agent_id: &AgentId, cause: DeathCause) {
    let round = world.round;
    world.log_event(
        EventType::Death,
        Some(agent_id),
        json!({ "cause": cause.to_string(), "round": round }),
    );
}

fn credit(world: &mut WorldState, agent_id: &AgentId, amount: u64, reason: &str, cooperative: bool) {
    let Some(agent) = world.agent_mut(agent_id) else {
        return;
    };
    if !agent.alive {
        return;
    }
    agent.tokens = agent.tokens.saturating_add(amount);
    world.log_event(
        EventType::Reward,
        Some(agent_id),
        json!({ "amount": amount, "reason": reason, "cooperative": cooperative }),
    );
}
