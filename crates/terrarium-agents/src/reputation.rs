//! Peer ratings.
//!
//! A rating is a signed score keyed by (rater, ratee). A new rating always
//! overwrites the rater's previous score for that ratee. Views aggregate
//! scores anonymously; individual ratings are never exposed.

use serde_json::json;
use terrarium_types::{AgentId, EventType, Rating};
use terrarium_world::WorldState;

/// Record `rater`'s opinion of `ratee`. Returns the stored score.
pub fn rate(world: &mut WorldState, rater: &AgentId, ratee: &AgentId, rating: Rating) -> i8 {
    let score = rating.score();
    world
        .trust_scores
        .insert((rater.clone(), ratee.clone()), score);
    world.log_event(
        EventType::Rate,
        Some(rater),
        json!({ "target": ratee, "rating": rating, "score": score }),
    );
    score
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn later_rating_overwrites_earlier() {
        let mut world = WorldState::new(10);
        let a = world.add_agent("Vera").unwrap();
        let b = world.add_agent("Kip").unwrap();
        let c = world.add_agent("Sable").unwrap();

        assert_eq!(rate(&mut world, &a, &b, Rating::Helpful), 1);
        assert_eq!(rate(&mut world, &a, &b, Rating::Unhelpful), -1);
        rate(&mut world, &c, &b, Rating::Neutral);

        assert_eq!(world.trust_scores.get(&(a, b.clone())), Some(&-1));
        assert_eq!(world.trust_scores.get(&(c, b)), Some(&0));
        assert_eq!(world.event_log.len(), 3);
        assert_eq!(world.event_log.last().unwrap().detail_str("rating"), Some("neutral"));
    }
}
