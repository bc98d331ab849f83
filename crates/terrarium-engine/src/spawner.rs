//! Roster setup: which personas play and who controls them.
//!
//! Agents are registered in persona order, so the roster order is also the
//! processing order for the whole game. Each agent gets its own controller;
//! scripted controllers are seeded from the game seed so a seeded game
//! replays exactly.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use terrarium_core::decision::Controller;
use terrarium_core::{ControllerSet, GameState, SimulationConfig};
use terrarium_runner::{
    LineSource, PERSONA_NAMES, PersonaTable, PromptEngine, TextController, scripted_controller,
};
use terrarium_types::ControllerKind;
use tracing::info;

use crate::error::EngineError;
use crate::settings::Mode;

/// Persona and controller kind of each agent when the config names none.
pub const DEFAULT_ROSTER: [(&str, ControllerKind); 6] = [
    ("Vera", ControllerKind::TitForTat),
    ("Kip", ControllerKind::Cooperator),
    ("Sable", ControllerKind::TitForTat),
    ("Marsh", ControllerKind::Defector),
    ("Dove", ControllerKind::Cooperator),
    ("Flint", ControllerKind::Defector),
];

/// Seed offset for controller RNGs. The puzzle engine and the rotation
/// step use offsets 0 and 1.
const CONTROLLER_SEED_OFFSET: u64 = 2;

/// Resolve the roster from the `controllers` config section.
///
/// An empty section means [`DEFAULT_ROSTER`]. Otherwise exactly the listed
/// personas play, in persona order. Manual mode puts every agent under
/// terminal control.
pub fn resolve_roster(
    config: &SimulationConfig,
    mode: Mode,
) -> Result<Vec<(String, ControllerKind)>, EngineError> {
    let kinds = config.controller_kinds()?;

    if let Some(unknown) = kinds.keys().find(|name| !PERSONA_NAMES.contains(&name.as_str())) {
        return Err(EngineError::Spawner {
            message: format!("controllers names unknown persona '{unknown}'"),
        });
    }

    let roster = if kinds.is_empty() {
        DEFAULT_ROSTER
            .iter()
            .map(|(name, kind)| ((*name).to_owned(), *kind))
            .collect()
    } else {
        PERSONA_NAMES
            .iter()
            .filter_map(|name| kinds.get(*name).map(|kind| ((*name).to_owned(), *kind)))
            .collect::<Vec<_>>()
    };

    Ok(match mode {
        Mode::Scripted => roster,
        Mode::Manual => roster
            .into_iter()
            .map(|(name, _)| (name, ControllerKind::Manual))
            .collect(),
    })
}

/// Register the roster's agents and bind a controller to each.
///
/// `console` is called at most once, and only when some agent is under
/// manual control; that one source then answers for every manual agent.
pub fn spawn_roster<S, F>(
    state: &mut GameState,
    config: &SimulationConfig,
    roster: &[(String, ControllerKind)],
    templates_dir: Option<&Path>,
    console: F,
) -> Result<ControllerSet, EngineError>
where
    S: LineSource + 'static,
    F: FnOnce() -> S,
{
    let mut personas = PersonaTable::default();
    personas.apply_overrides(&config.persona_overrides)?;

    let agent_ids = state.register_agents(roster.iter().map(|(name, _)| name))?;

    let any_manual = roster.iter().any(|(_, kind)| *kind == ControllerKind::Manual);
    let manual = if any_manual {
        let prompts = match templates_dir {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::with_defaults()?,
        };
        Some((Arc::new(prompts), Rc::new(RefCell::new(console()))))
    } else {
        None
    };

    let mut controllers = ControllerSet::new();
    for ((agent_id, (name, kind)), offset) in agent_ids.into_iter().zip(roster).zip(0_u64..) {
        let controller: Box<dyn Controller> = match (kind, &manual) {
            (ControllerKind::Manual, Some((prompts, console))) => Box::new(TextController::new(
                name,
                personas.clone(),
                Arc::clone(prompts),
                config.economy.free_shout_words,
                Box::new(Rc::clone(console)),
            )?),
            (ControllerKind::Manual, None) => {
                return Err(EngineError::Spawner {
                    message: format!("no console for manual agent {name}"),
                });
            }
            (scripted, _) => scripted_controller(
                *scripted,
                name,
                config.seed.map(|seed| controller_seed(seed, offset)),
            )?,
        };
        info!(agent_id = %agent_id, persona = %name, controller = %kind, "Agent spawned");
        controllers.insert(agent_id, controller);
    }
    Ok(controllers)
}

const fn controller_seed(seed: u64, offset: u64) -> u64 {
    seed.wrapping_add(CONTROLLER_SEED_OFFSET).wrapping_add(offset)
}
