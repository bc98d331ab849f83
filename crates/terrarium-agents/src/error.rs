//! Error types for the terrarium-agents crate.
//!
//! Every runtime failure here is recoverable: it ends the single action that
//! triggered it, never the round.

use terrarium_types::{AgentId, TradeId};

/// Errors from balance-moving operations and message delivery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EconomyError {
    /// No agent with this id is registered.
    #[error("agent not found: {0}")]
    UnknownAgent(AgentId),

    /// One of the parties is dead.
    #[error("agent {0} is dead")]
    DeadParty(AgentId),

    /// The payer cannot cover the amount.
    #[error("insufficient balance for {agent}: have {balance}, need {required}")]
    InsufficientBalance {
        /// The paying agent.
        agent: AgentId,
        /// Balance at the time of the attempt.
        balance: u64,
        /// Amount that was required.
        required: u64,
    },

    /// Transfers must move at least one token.
    #[error("transfer amount must be positive")]
    ZeroAmount,

    /// Free shouts are switched off by configuration.
    #[error("shouting is disabled")]
    ShoutDisabled,

    /// A balance addition overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: String,
    },
}

/// Errors from accepting a trade offer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// No pending, unexpired offer with this id targets the acceptor.
    #[error("trade offer {0} not found")]
    OfferNotFound(TradeId),

    /// The offer exists but the token transfer was rejected.
    #[error("trade transfer failed: {source}")]
    TransferFailed {
        /// Why the transfer was rejected.
        #[from]
        source: EconomyError,
    },
}
