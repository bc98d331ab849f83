//! Strongly-typed identifier wrappers.
//!
//! Agents, puzzles and trade offers are addressed by short human-readable
//! strings (`agent_3`, `Q-12`, `T7`) because those strings appear verbatim
//! in controller text and in the event log. Events use UUID v7 so records
//! from different games never collide.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of an agent, assigned at registration (`agent_0`, `agent_1`, ...).
    AgentId
}

define_id! {
    /// Identifier of a puzzle: a random uppercase letter and a sequence number.
    PuzzleId
}

define_id! {
    /// Identifier of a trade offer (`T1`, `T2`, ...).
    TradeId
}

impl AgentId {
    /// Build the identifier for the agent registered at `index` in the roster.
    pub fn from_index(index: usize) -> Self {
        Self(format!("agent_{index}"))
    }
}

impl PuzzleId {
    /// Build a puzzle identifier from its letter prefix and sequence number.
    pub fn from_parts(letter: char, sequence: u64) -> Self {
        Self(format!("{letter}-{sequence}"))
    }
}

impl TradeId {
    /// Build a trade identifier from the world's monotonically increasing counter.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("T{sequence}"))
    }
}

/// Unique identifier for an event in the event log (UUID v7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new identifier using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
