//! Identity rotation across controllers.
//!
//! Every configured interval, personas are permuted between controllers. A
//! derangement is preferred (nobody keeps their persona); after
//! [`DERANGEMENT_ATTEMPTS`] shuffles without one, the last shuffle is used.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use terrarium_types::AgentId;

/// Shuffles tried before settling for a permutation with fixed points.
pub const DERANGEMENT_ATTEMPTS: usize = 100;

/// Permute identities across agents, seeded for reproducibility.
///
/// Fewer than two identities cannot be deranged and are returned unchanged.
pub fn generate_persona_rotation(
    current: &BTreeMap<AgentId, String>,
    seed: Option<u64>,
) -> BTreeMap<AgentId, String> {
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    permute_identities(current, &mut rng)
}

/// Permute identities across agents using `rng`.
pub fn permute_identities<R: Rng + ?Sized>(
    current: &BTreeMap<AgentId, String>,
    rng: &mut R,
) -> BTreeMap<AgentId, String> {
    if current.len() <= 1 {
        return current.clone();
    }
    let original: Vec<&String> = current.values().collect();
    let mut shuffled = original.clone();
    for _ in 0..DERANGEMENT_ATTEMPTS {
        shuffled.clone_from(&original);
        shuffled.shuffle(rng);
        if shuffled.iter().zip(&original).all(|(new, old)| new != old) {
            break;
        }
    }
    current
        .keys()
        .cloned()
        .zip(shuffled.into_iter().cloned())
        .collect()
}
