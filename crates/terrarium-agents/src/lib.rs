//! Economy, message routing, trades, and reputation for the Terrarium game.
//!
//! Everything here operates on a borrowed [`WorldState`]; the types in this
//! crate hold configuration only.
//!
//! # Modules
//!
//! - [`communication`] -- [`MessageRouter`]: public, private, and shout delivery.
//! - [`config`] -- [`EconomyConfig`] constants.
//! - [`economy`] -- [`Economy`]: message pricing, drain, rewards, transfers.
//! - [`error`] -- [`EconomyError`] and [`TradeError`].
//! - [`reputation`] -- Rater-to-ratee scores.
//! - [`trade`] -- Offer creation, acceptance, and collection.
//!
//! [`WorldState`]: terrarium_world::WorldState

pub mod communication;
pub mod config;
pub mod economy;
pub mod error;
pub mod reputation;
pub mod trade;

// Re-export primary types at crate root.
pub use communication::{Delivery, MessageRouter};
pub use config::EconomyConfig;
pub use economy::Economy;
pub use error::{EconomyError, TradeError};
