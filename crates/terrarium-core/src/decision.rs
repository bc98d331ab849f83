//! Decision source boundary.
//!
//! The orchestrator hands each controlled agent its [`AgentView`] and gets
//! back an ordered action list. The [`DecisionSource`] trait abstracts the
//! mechanism: a set of per-agent [`Controller`]s, a batched model backend,
//! a human at a terminal, or a test stub.
//!
//! Failures never abort a round. An agent whose decision fails is treated as
//! having passed.

use std::collections::BTreeMap;

use terrarium_types::{Action, AgentId, AgentView};
use tracing::warn;

/// Errors that can occur while obtaining a decision.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// An internal error in the decision source.
    #[error("decision source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },

    /// The controller's reply could not be used.
    #[error("unusable reply from {agent_id}: {message}")]
    Parse {
        /// The agent whose reply failed.
        agent_id: AgentId,
        /// Description of the problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Decision logic bound to a single agent.
///
/// A controller carries an identity (a persona name) that identity rotation
/// may swap between controllers mid-game.
pub trait Controller: std::fmt::Debug {
    /// Choose this round's actions from the agent's view.
    fn act(&mut self, view: &AgentView) -> Result<Vec<Action>, DecisionError>;

    /// The persona this controller currently plays.
    fn identity(&self) -> &str;

    /// Take on a different persona.
    fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError>;
}

// ---------------------------------------------------------------------------
// DecisionSource
// ---------------------------------------------------------------------------

/// A source of agent decisions.
///
/// Sources either answer one agent at a time through [`decide`], or, when
/// [`is_batched`] is true, answer every living agent in one
/// [`collect_decisions`] call made before any action executes.
///
/// [`decide`]: DecisionSource::decide
/// [`is_batched`]: DecisionSource::is_batched
/// [`collect_decisions`]: DecisionSource::collect_decisions
pub trait DecisionSource {
    /// Whether this source has a controller for `agent_id`.
    fn controls(&self, agent_id: &AgentId) -> bool;

    /// Decide the actions of one agent.
    fn decide(&mut self, agent_id: &AgentId, view: &AgentView)
    -> Result<Vec<Action>, DecisionError>;

    /// Whether the orchestrator should call [`collect_decisions`] once per
    /// round instead of [`decide`] per agent.
    ///
    /// [`collect_decisions`]: DecisionSource::collect_decisions
    /// [`decide`]: DecisionSource::decide
    fn is_batched(&self) -> bool {
        false
    }

    /// Decide for every agent in `views` at once.
    ///
    /// The default calls [`decide`] per agent and substitutes a pass for any
    /// agent whose decision fails.
    ///
    /// [`decide`]: DecisionSource::decide
    fn collect_decisions(
        &mut self,
        round: u64,
        views: &BTreeMap<AgentId, AgentView>,
    ) -> Result<BTreeMap<AgentId, Vec<Action>>, DecisionError> {
        let mut decisions = BTreeMap::new();
        for (agent_id, view) in views {
            let actions = self.decide(agent_id, view).unwrap_or_else(|error| {
                warn!(round, agent_id = %agent_id, %error, "Decision failed; agent passes");
                vec![Action::Pass]
            });
            decisions.insert(agent_id.clone(), actions);
        }
        Ok(decisions)
    }

    /// Current identity of every controlled agent.
    fn identities(&self) -> BTreeMap<AgentId, String> {
        BTreeMap::new()
    }

    /// Give the controller of `agent_id` a new identity.
    fn assign_identity(&mut self, _agent_id: &AgentId, _identity: &str) -> Result<(), DecisionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ControllerSet
// ---------------------------------------------------------------------------

/// Per-agent controllers behind one [`DecisionSource`].
#[derive(Debug, Default)]
pub struct ControllerSet {
    controllers: BTreeMap<AgentId, Box<dyn Controller>>,
    batched: bool,
}

impl ControllerSet {
    /// Create an empty, unbatched set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every agent up front each round instead of one at a time.
    #[must_use]
    pub fn batched(mut self, batched: bool) -> Self {
        self.batched = batched;
        self
    }

    /// Bind `controller` to `agent_id`, replacing any previous binding.
    pub fn insert(&mut self, agent_id: AgentId, controller: Box<dyn Controller>) {
        self.controllers.insert(agent_id, controller);
    }

    /// Number of bound agents.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Whether no agent is bound.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl DecisionSource for ControllerSet {
    fn controls(&self, agent_id: &AgentId) -> bool {
        self.controllers.contains_key(agent_id)
    }

    fn decide(
        &mut self,
        agent_id: &AgentId,
        view: &AgentView,
    ) -> Result<Vec<Action>, DecisionError> {
        let controller = self
            .controllers
            .get_mut(agent_id)
            .ok_or_else(|| DecisionError::Internal {
                message: format!("no controller bound to {agent_id}"),
            })?;
        controller.act(view)
    }

    fn is_batched(&self) -> bool {
        self.batched
    }

    fn identities(&self) -> BTreeMap<AgentId, String> {
        self.controllers
            .iter()
            .map(|(id, controller)| (id.clone(), controller.identity().to_owned()))
            .collect()
    }

    fn assign_identity(&mut self, agent_id: &AgentId, identity: &str) -> Result<(), DecisionError> {
        let controller = self
            .controllers
            .get_mut(agent_id)
            .ok_or_else(|| DecisionError::Internal {
                message: format!("no controller bound to {agent_id}"),
            })?;
        controller.assume_identity(identity)
    }
}

// ---------------------------------------------------------------------------
// StubDecisionSource
// ---------------------------------------------------------------------------

/// A decision source that controls every agent and always passes.
#[derive(Debug, Clone, Default)]
pub struct StubDecisionSource;

impl StubDecisionSource {
    /// Create a new stub decision source.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionSource for StubDecisionSource {
    fn controls(&self, _agent_id: &AgentId) -> bool {
        true
    }

    fn decide(
        &mut self,
        _agent_id: &AgentId,
        _view: &AgentView,
    ) -> Result<Vec<Action>, DecisionError> {
        Ok(vec![Action::Pass])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn make_view(agent_id: &AgentId) -> AgentView {
        AgentView {
            agent_id: agent_id.clone(),
            name: "Vera".to_owned(),
            round: 1,
            max_rounds: 10,
            tokens: 100,
            clues: BTreeMap::new(),
            public_messages: Vec::new(),
            private_messages: Vec::new(),
            other_agents: Vec::new(),
            puzzles: Vec::new(),
            incoming_trades: Vec::new(),
            intercepted_messages: None,
            trust_scores: None,
        }
    }

    #[derive(Debug)]
    struct Fixed {
        identity: String,
        fail: bool,
    }

    impl Controller for Fixed {
        fn act(&mut self, _view: &AgentView) -> Result<Vec<Action>, DecisionError> {
            if self.fail {
                return Err(DecisionError::Internal {
                    message: "backend down".to_owned(),
                });
            }
            Ok(vec![Action::Shout {
                message: self.identity.clone(),
            }])
        }

        fn identity(&self) -> &str {
            &self.identity
        }

        fn assume_identity(&mut self, identity: &str) -> Result<(), DecisionError> {
            identity.clone_into(&mut self.identity);
            Ok(())
        }
    }

    fn fixed(identity: &str, fail: bool) -> Box<dyn Controller> {
        Box::new(Fixed {
            identity: identity.to_owned(),
            fail,
        })
    }

    #[test]
    fn stub_passes_for_everyone() {
        let mut source = StubDecisionSource::new();
        let agent = AgentId::from_index(0);
        assert!(source.controls(&agent));
        assert_eq!(
            source.decide(&agent, &make_view(&agent)).unwrap(),
            vec![Action::Pass]
        );
    }

    #[test]
    fn controller_set_routes_by_agent() {
        let mut set = ControllerSet::new();
        let a = AgentId::from_index(0);
        let b = AgentId::from_index(1);
        set.insert(a.clone(), fixed("Vera", false));
        assert!(set.controls(&a));
        assert!(!set.controls(&b));
        assert_eq!(
            set.decide(&a, &make_view(&a)).unwrap(),
            vec![Action::Shout {
                message: "Vera".to_owned()
            }]
        );
        assert!(set.decide(&b, &make_view(&b)).is_err());
    }

    #[test]
    fn batched_collection_turns_failures_into_passes() {
        let mut set = ControllerSet::new().batched(true);
        let a = AgentId::from_index(0);
        let b = AgentId::from_index(1);
        set.insert(a.clone(), fixed("Vera", false));
        set.insert(b.clone(), fixed("Kip", true));
        assert!(set.is_batched());

        let mut views = BTreeMap::new();
        views.insert(a.clone(), make_view(&a));
        views.insert(b.clone(), make_view(&b));
        let decisions = set.collect_decisions(1, &views).unwrap();
        assert_eq!(decisions.get(&b), Some(&vec![Action::Pass]));
        assert_eq!(decisions.get(&a).map(Vec::len), Some(1));
    }

    #[test]
    fn identities_follow_assignment() {
        let mut set = ControllerSet::new();
        let a = AgentId::from_index(0);
        set.insert(a.clone(), fixed("Vera", false));
        set.assign_identity(&a, "Flint").unwrap();
        assert_eq!(set.identities().get(&a).map(String::as_str), Some("Flint"));
        assert!(set.assign_identity(&AgentId::from_index(9), "Kip").is_err());
        assert_eq!(set.len(), 1);
    }
}
