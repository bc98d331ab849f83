//! Typed actions submitted by controllers and the outcomes the engine
//! reports back for each of them.
//!
//! Actions are a closed sum type; the round orchestrator matches on it
//! exhaustively, so a new action kind cannot be added without an executor
//! arm.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::enums::Rating;
use crate::ids::{AgentId, PuzzleId, TradeId};

/// Maximum number of actions an agent may submit in one round.
pub const MAX_ACTIONS_PER_ROUND: usize = 2;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One action an agent takes during its turn.
///
/// Targets are agent display names as written by the controller; they are
/// resolved case-insensitively at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Paid broadcast to every agent.
    SendPublic {
        /// Message text.
        message: String,
    },
    /// Paid message to a single agent.
    SendPrivate {
        /// Recipient display name.
        target: String,
        /// Message text.
        message: String,
    },
    /// Submit an answer for a puzzle.
    Solve {
        /// The puzzle being answered.
        puzzle_id: PuzzleId,
        /// The proposed answer.
        answer: String,
    },
    /// Open a token offer to another agent.
    Trade {
        /// Recipient display name.
        target: String,
        /// Tokens offered.
        offer: NonZeroU64,
        /// What is wanted in return.
        ask: String,
    },
    /// Accept a pending offer addressed to this agent.
    AcceptTrade {
        /// The offer being accepted.
        trade_id: TradeId,
    },
    /// Free word-capped broadcast.
    Shout {
        /// Message text, truncated at execution.
        message: String,
    },
    /// Rate another agent.
    Rate {
        /// Ratee display name.
        target: String,
        /// The rating given.
        rating: Rating,
    },
    /// Do nothing this turn.
    Pass,
    /// An action kind this engine does not recognise.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Whether the action counts against the per-round send cap.
    pub const fn is_send(&self) -> bool {
        matches!(self, Self::SendPublic { .. } | Self::SendPrivate { .. })
    }

    /// Short tag used in logs and round summaries.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SendPublic { .. } => "SEND_PUBLIC",
            Self::SendPrivate { .. } => "SEND_PRIVATE",
            Self::Solve { .. } => "SOLVE",
            Self::Trade { .. } => "TRADE",
            Self::AcceptTrade { .. } => "ACCEPT_TRADE",
            Self::Shout { .. } => "SHOUT",
            Self::Rate { .. } => "RATE",
            Self::Pass => "PASS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

/// The result of executing one action.
///
/// Every runtime failure is an outcome, never an error: it ends the action,
/// not the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The acting agent is dead; nothing happened.
    Dead,
    /// The message was delivered.
    Sent {
        /// Tokens charged.
        cost: u64,
    },
    /// The message could not be delivered; nothing was charged.
    Failed {
        /// The price that could not be paid or was refused.
        cost: u64,
    },
    /// The target name matches no agent, or names the acting agent.
    ///
    /// A dead but known recipient is not an invalid target: a private send
    /// to one reports [`ActionOutcome::Failed`].
    InvalidTarget {
        /// The rejected name.
        target: String,
    },
    /// No active, unsolved puzzle has this id.
    PuzzleNotFound {
        /// The requested puzzle.
        puzzle_id: PuzzleId,
    },
    /// The answer was right and rewards were paid.
    Correct {
        /// Tokens paid to each living contributor.
        reward: u64,
        /// Everyone credited with the solve, solver first.
        contributors: Vec<AgentId>,
    },
    /// The answer was wrong.
    WrongAnswer,
    /// A pending trade offer was opened.
    OfferCreated {
        /// The new offer's id.
        trade_id: TradeId,
    },
    /// The offer was accepted and settled.
    Accepted {
        /// Tokens received from the proposer.
        tokens_received: u64,
    },
    /// No open offer with that id targets this agent.
    TradeNotFound,
    /// The offer exists but could not be settled.
    TradeFailed,
    /// The shout was broadcast.
    Shouted {
        /// Number of words kept after truncation.
        words: usize,
    },
    /// Shouting is disabled by configuration.
    ShoutDisabled,
    /// The rating was recorded.
    Rated {
        /// The ratee as named by the rater.
        target: String,
        /// The rating given.
        rating: Rating,
    },
    /// Ratings are disabled by configuration.
    ReputationDisabled,
    /// The agent passed.
    Passed,
    /// The action kind was not recognised.
    UnknownAction,
}

impl ActionOutcome {
    /// The status tag for logs.
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Dead => "dead",
            Self::Sent { .. } => "sent",
            Self::Failed { .. } => "failed",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::PuzzleNotFound { .. } => "puzzle_not_found",
            Self::Correct { .. } => "correct",
            Self::WrongAnswer => "wrong_answer",
            Self::OfferCreated { .. } => "offer_created",
            Self::Accepted { .. } => "accepted",
            Self::TradeNotFound => "trade_not_found",
            Self::TradeFailed => "trade_failed",
            Self::Shouted { .. } => "shouted",
            Self::ShoutDisabled => "shout_disabled",
            Self::Rated { .. } => "rated",
            Self::ReputationDisabled => "reputation_disabled",
            Self::Passed => "passed",
            Self::UnknownAction => "unknown_action",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_tags_deserialize_to_unknown() {
        let action: Action = serde_json::from_str(r#"{"action":"DANCE"}"#).unwrap();
        assert_eq!(action, Action::Unknown);
    }

    #[test]
    fn trade_offer_must_be_positive() {
        let zero = serde_json::from_str::<Action>(
            r#"{"action":"TRADE","target":"Kip","offer":0,"ask":"clue"}"#,
        );
        assert!(zero.is_err());
        let five = serde_json::from_str::<Action>(
            r#"{"action":"TRADE","target":"Kip","offer":5,"ask":"clue"}"#,
        )
        .unwrap();
        assert_eq!(five.kind(), "TRADE");
    }

    #[test]
    fn only_paid_messages_count_as_sends() {
        assert!(Action::SendPublic { message: String::from("hi") }.is_send());
        assert!(!Action::Shout { message: String::from("hi") }.is_send());
        assert!(!Action::Pass.is_send());
    }

    #[test]
    fn outcome_status_serializes_as_tag() {
        let json = serde_json::to_value(ActionOutcome::Sent { cost: 4 }).unwrap();
        assert_eq!(json["status"], "sent");
        assert_eq!(json["cost"], 4);
        assert_eq!(ActionOutcome::TradeNotFound.status(), "trade_not_found");
    }

    #[test]
    fn correct_outcome_carries_reward() {
        let outcome = ActionOutcome::Correct {
            reward: 50,
            contributors: vec![AgentId::from_index(0)],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "correct");
        assert_eq!(json["reward"], 50);
        assert_eq!(json["contributors"].as_array().unwrap().len(), 1);
    }
}
