//! Enumeration types shared across the workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A type of event recorded in the event log.
///
/// Serialized in `SCREAMING_SNAKE_CASE` so log records read `SEND_PUBLIC`,
/// `PUZZLE_SOLVED`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    // --- Communication ---
    /// A paid public message was broadcast.
    SendPublic,
    /// A paid private message was delivered to one recipient.
    SendPrivate,
    /// A free, word-capped public broadcast.
    Shout,

    // --- Economy ---
    /// Tokens were granted (puzzle solve, pre-solve bonus).
    Reward,
    /// Tokens moved from one agent to another.
    Trade,
    /// An agent's balance reached zero.
    Death,

    // --- Trades ---
    /// A pending trade offer was created.
    TradeOffered,
    /// A pending trade offer was accepted and settled.
    TradeAccepted,

    // --- Puzzles ---
    /// A puzzle was minted and its clues distributed.
    PuzzleCreated,
    /// A puzzle was solved, explicitly or by mutual disclosure.
    PuzzleSolved,
    /// A puzzle aged out unsolved.
    PuzzleExpired,
    /// A wrong answer was submitted.
    SolveAttempt,

    // --- Agent behaviour ---
    /// The agent explicitly passed.
    Pass,
    /// The agent rated another agent.
    Rate,
    /// Free text contained the action grammar itself.
    ParserExploit,
    /// A controller's persona identity was rotated.
    PersonaSwap,

    // --- System ---
    /// Final record written by the event sink when the game ends.
    GameEnd,
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// A reputation rating one agent gives another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Rating {
    /// Scores +1.
    Helpful,
    /// Scores 0.
    Neutral,
    /// Scores -1.
    Unhelpful,
}

impl Rating {
    /// The signed trust score written for this rating.
    pub const fn score(self) -> i8 {
        match self {
            Self::Helpful => 1,
            Self::Neutral => 0,
            Self::Unhelpful => -1,
        }
    }

    /// Parse a rating word. Matching is exact; callers lowercase first.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "helpful" => Some(Self::Helpful),
            "neutral" => Some(Self::Neutral),
            "unhelpful" => Some(Self::Unhelpful),
            _ => None,
        }
    }
}

impl core::fmt::Display for Rating {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Helpful => write!(f, "helpful"),
            Self::Neutral => write!(f, "neutral"),
            Self::Unhelpful => write!(f, "unhelpful"),
        }
    }
}

// ---------------------------------------------------------------------------
// Death causes
// ---------------------------------------------------------------------------

/// Why an agent's balance reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DeathCause {
    /// The per-round passive drain exhausted the balance.
    Starvation,
    /// Paying for a message exhausted the balance.
    MessageCost,
    /// Giving away tokens in a trade exhausted the balance.
    Trade,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Starvation => write!(f, "starvation"),
            Self::MessageCost => write!(f, "message_cost"),
            Self::Trade => write!(f, "trade"),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller kinds
// ---------------------------------------------------------------------------

/// The kind of controller bound to an agent.
///
/// Parsed from configuration; an unrecognized kind is a fatal
/// configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Always shares clues openly.
    Cooperator,
    /// Withholds clues and occasionally lies.
    Defector,
    /// Cooperates first, then mirrors what others do.
    TitForTat,
    /// Reads action text from an external line source.
    Manual,
}

impl ControllerKind {
    /// Parse a configuration name such as `tit_for_tat`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cooperator" => Some(Self::Cooperator),
            "defector" => Some(Self::Defector),
            "tit_for_tat" => Some(Self::TitForTat),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl core::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cooperator => write!(f, "cooperator"),
            Self::Defector => write!(f, "defector"),
            Self::TitForTat => write!(f, "tit_for_tat"),
            Self::Manual => write!(f, "manual"),
        }
    }
}
