//! Economic constants.
//!
//! Deserialized from the `economy` section of the game configuration file.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Costs and rewards applied by the economy and the message router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Tokens every living agent loses at the end of each round (default: 1).
    #[serde(default = "default_passive_drain")]
    pub passive_drain: u64,

    /// Tokens charged per word of message text (default: 0.3).
    #[serde(default = "default_message_cost_per_token")]
    pub message_cost_per_token: Decimal,

    /// Factor applied to the cost of public messages (default: 2).
    #[serde(default = "default_public_message_multiplier")]
    pub public_message_multiplier: Decimal,

    /// Reward for a solo solve (default: 50).
    #[serde(default = "default_puzzle_reward")]
    pub puzzle_reward: u64,

    /// Reward paid to EACH member of a cooperative solve (default: 40).
    #[serde(default = "default_puzzle_split_reward")]
    pub puzzle_split_reward: u64,

    /// Word cap for free shouts; 0 disables shouting (default: 0).
    #[serde(default)]
    pub free_shout_words: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            passive_drain: default_passive_drain(),
            message_cost_per_token: default_message_cost_per_token(),
            public_message_multiplier: default_public_message_multiplier(),
            puzzle_reward: default_puzzle_reward(),
            puzzle_split_reward: default_puzzle_split_reward(),
            free_shout_words: 0,
        }
    }
}

const fn default_passive_drain() -> u64 {
    1
}

fn default_message_cost_per_token() -> Decimal {
    Decimal::new(3, 1)
}

const fn default_public_message_multiplier() -> Decimal {
    Decimal::TWO
}

const fn default_puzzle_reward() -> u64 {
    50
}

const fn default_puzzle_split_reward() -> u64 {
    40
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EconomyConfig::default();
        assert_eq!(config.passive_drain, 1);
        assert_eq!(config.message_cost_per_token, Decimal::from_str("0.3").unwrap());
        assert_eq!(config.public_message_multiplier, Decimal::TWO);
        assert_eq!(config.puzzle_reward, 50);
        assert_eq!(config.puzzle_split_reward, 40);
        assert_eq!(config.free_shout_words, 0);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: EconomyConfig =
            serde_yml::from_str("message_cost_per_token: 0.5\nfree_shout_words: 10\n").unwrap();
        assert_eq!(config.message_cost_per_token, Decimal::from_str("0.5").unwrap());
        assert_eq!(config.free_shout_words, 10);
        assert_eq!(config.puzzle_reward, 50);
    }
}
