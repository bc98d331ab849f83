//! Trade offer lifecycle.
//!
//! An offer is created pending and addressed to one target. The target may
//! accept it while it is pending and unexpired, which executes the token
//! transfer. Offers are never withdrawn; unanswered offers lapse once their
//! lifetime elapses and are dropped by [`collect_offers`].

use serde_json::json;
use terrarium_types::{AgentId, EventType, TradeId, TradeOffer, TradeStatus};
use terrarium_world::WorldState;
use tracing::debug;

use crate::economy::Economy;
use crate::error::TradeError;

/// Open a pending offer of `offer_tokens` from `proposer` to `target`.
///
/// The proposer's balance is not checked here; it is checked on acceptance.
pub fn create_offer(
    world: &mut WorldState,
    proposer: &AgentId,
    target: &AgentId,
    offer_tokens: u64,
    ask: &str,
    lifetime: u64,
) -> TradeId {
    let id = world.next_trade_id();
    world.pending_trades.push(TradeOffer {
        id: id.clone(),
        proposer: proposer.clone(),
        target: target.clone(),
        offer_tokens,
        ask: ask.to_owned(),
        created_round: world.round,
        lifetime,
        status: TradeStatus::Pending,
    });
    world.log_event(
        EventType::TradeOffered,
        Some(proposer),
        json!({
            "trade_id": id,
            "target": target,
            "offer_tokens": offer_tokens,
            "ask": ask,
        }),
    );
    debug!(round = world.round, trade_id = %id, from = %proposer, to = %target, "Trade offered");
    id
}

/// Accept offer `trade_id` on behalf of `acceptor`.
///
/// Only a pending, unexpired offer addressed to `acceptor` qualifies. A
/// rejected transfer marks the offer not accepted. Returns the tokens
/// received.
pub fn accept_offer(
    world: &mut WorldState,
    economy: &Economy,
    trade_id: &TradeId,
    acceptor: &AgentId,
) -> Result<u64, TradeError> {
    let round = world.round;
    let position = world
        .pending_trades
        .iter()
        .position(|offer| {
            offer.id == *trade_id
                && offer.target == *acceptor
                && offer.is_pending()
                && !offer.is_expired(round)
        })
        .ok_or_else(|| TradeError::OfferNotFound(trade_id.clone()))?;
    let Some(offer) = world.pending_trades.get(position).cloned() else {
        return Err(TradeError::OfferNotFound(trade_id.clone()));
    };

    let result = economy.process_trade(world, &offer.proposer, acceptor, offer.offer_tokens);
    let status = if result.is_ok() {
        TradeStatus::Accepted
    } else {
        TradeStatus::NotAccepted
    };
    if let Some(stored) = world.pending_trades.get_mut(position) {
        stored.status = status;
    }
    result?;

    world.log_event(
        EventType::TradeAccepted,
        Some(acceptor),
        json!({
            "trade_id": trade_id,
            "from": offer.proposer,
            "tokens_received": offer.offer_tokens,
        }),
    );
    Ok(offer.offer_tokens)
}

/// Drop every offer that is resolved or past its lifetime.
pub fn collect_offers(world: &mut WorldState) {
    let round = world.round;
    world
        .pending_trades
        .retain(|offer| offer.is_pending() && !offer.is_expired(round));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crate::error::EconomyError;

    use super::*;

    fn setup() -> (WorldState, AgentId, AgentId) {
        let mut world = WorldState::new(50);
        let a = world.add_agent("Vera").unwrap();
        let b = world.add_agent("Kip").unwrap();
        world.round = 1;
        (world, a, b)
    }

    #[test]
    fn accepted_offer_transfers_tokens() {
        let (mut world, a, b) = setup();
        let id = create_offer(&mut world, &a, &b, 10, "your clue for A-1", 3);
        assert_eq!(id.as_str(), "T1");

        world.round = 2;
        let received = accept_offer(&mut world, &Economy::default(), &id, &b).unwrap();
        assert_eq!(received, 10);
        assert_eq!(world.agent(&a).unwrap().tokens, 40);
        assert_eq!(world.agent(&b).unwrap().tokens, 60);
        assert_eq!(world.pending_trades[0].status, TradeStatus::Accepted);
    }

    #[test]
    fn only_the_target_can_accept() {
        let (mut world, a, b) = setup();
        let id = create_offer(&mut world, &a, &b, 10, "x", 3);
        assert_eq!(
            accept_offer(&mut world, &Economy::default(), &id, &a),
            Err(TradeError::OfferNotFound(id))
        );
    }

    #[test]
    fn expired_offer_is_not_found() {
        let (mut world, a, b) = setup();
        let id = create_offer(&mut world, &a, &b, 10, "x", 3);
        world.round = 5;
        assert_eq!(
            accept_offer(&mut world, &Economy::default(), &id, &b),
            Err(TradeError::OfferNotFound(id))
        );
        assert_eq!(world.agent(&b).unwrap().tokens, 50);
    }

    #[test]
    fn failed_transfer_resolves_offer() {
        let (mut world, a, b) = setup();
        let id = create_offer(&mut world, &a, &b, 80, "x", 3);
        let err = accept_offer(&mut world, &Economy::default(), &id, &b).unwrap_err();
        assert!(matches!(
            err,
            TradeError::TransferFailed {
                source: EconomyError::InsufficientBalance { .. }
            }
        ));
        assert_eq!(world.pending_trades[0].status, TradeStatus::NotAccepted);
        assert_eq!(
            accept_offer(&mut world, &Economy::default(), &id, &b),
            Err(TradeError::OfferNotFound(id))
        );
    }

    #[test]
    fn concurrent_offers_are_independent() {
        let (mut world, a, b) = setup();
        let first = create_offer(&mut world, &a, &b, 5, "x", 3);
        let second = create_offer(&mut world, &a, &b, 7, "y", 3);
        assert_ne!(first, second);
        accept_offer(&mut world, &Economy::default(), &second, &b).unwrap();
        assert!(world.pending_trades[0].is_pending());
    }

    #[test]
    fn collection_keeps_only_live_pending_offers() {
        let (mut world, a, b) = setup();
        let accepted = create_offer(&mut world, &a, &b, 5, "x", 3);
        create_offer(&mut world, &a, &b, 5, "y", 1);
        create_offer(&mut world, &b, &a, 5, "z", 3);
        accept_offer(&mut world, &Economy::default(), &accepted, &b).unwrap();

        world.round = 2;
        collect_offers(&mut world);
        assert_eq!(world.pending_trades.len(), 1);
        assert_eq!(world.pending_trades[0].id.as_str(), "T3");
    }
}
