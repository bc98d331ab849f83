//! Shared type definitions for the Terrarium survival game.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types exported with `ts-rs` flow downstream to the
//! analysis tooling that reads the event log.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers for agents, puzzles, trades and events
//! - [`enums`] -- Event types, ratings, death causes, controller kinds
//! - [`structs`] -- Agents, clues, puzzles, messages, trade offers, events
//! - [`actions`] -- Actions controllers submit and the outcomes they produce
//! - [`view`] -- The restricted per-agent view delivered each round

pub mod actions;
pub mod enums;
pub mod ids;
pub mod structs;
pub mod view;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, ActionOutcome, MAX_ACTIONS_PER_ROUND};
pub use enums::{ControllerKind, DeathCause, EventType, Rating};
pub use ids::{AgentId, EventId, PuzzleId, TradeId};
pub use structs::{Agent, Clue, Event, Message, Puzzle, TradeOffer, TradeStatus};
pub use view::{
    AgentView, IncomingTrade, InterceptedMessage, OtherAgent, PuzzleSummary, VisibleMessage,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::PuzzleId::export_all();
        let _ = crate::ids::TradeId::export_all();
        let _ = crate::ids::EventId::export_all();

        // Enums
        let _ = crate::enums::EventType::export_all();
        let _ = crate::enums::Rating::export_all();
        let _ = crate::enums::DeathCause::export_all();

        // Structs
        let _ = crate::structs::Agent::export_all();
        let _ = crate::structs::Clue::export_all();
        let _ = crate::structs::Puzzle::export_all();
        let _ = crate::structs::Message::export_all();
        let _ = crate::structs::TradeStatus::export_all();
        let _ = crate::structs::TradeOffer::export_all();
        let _ = crate::structs::Event::export_all();

        // View
        let _ = crate::view::AgentView::export_all();
        let _ = crate::view::VisibleMessage::export_all();
        let _ = crate::view::OtherAgent::export_all();
        let _ = crate::view::PuzzleSummary::export_all();
        let _ = crate::view::IncomingTrade::export_all();
        let _ = crate::view::InterceptedMessage::export_all();
    }
}
