//! Round callback that appends the game's events to a JSONL file.
//!
//! Each line is one event flattened to
//! `{game_id, round, timestamp, event_type, agent, ...payload}`, where
//! `agent` is the acting agent's name (null for system events). The file
//! ends with a `GAME_END` record carrying the final statistics.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use terrarium_core::runner::{FinalStats, GameEndReason, GameResult, RoundCallback};
use terrarium_core::{GameState, RoundSummary};
use terrarium_types::Event;
use tracing::{debug, warn};

use crate::error::EngineError;

/// File name of the event log inside the game directory.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Writes new events after every round.
///
/// The world's event log is append-only, so a cursor into it is enough to
/// know what has been written. Events logged before the first round (the
/// pre-solve bonus) carry round 0.
#[derive(Debug)]
pub struct EventLogWriter {
    game_id: String,
    path: PathBuf,
    out: BufWriter<File>,
    cursor: usize,
    failure: Option<EngineError>,
}

#[derive(Serialize)]
struct GameEndRecord<'a> {
    game_id: &'a str,
    round: u64,
    timestamp: String,
    event_type: &'static str,
    agent: Option<String>,
    end_reason: GameEndReason,
    #[serde(flatten)]
    stats: &'a FinalStats,
}

impl EventLogWriter {
    /// Create `<results_dir>/<game_id>/events.jsonl`, truncating any
    /// previous log for the same game id.
    pub fn create(results_dir: &Path, game_id: &str) -> Result<Self, EngineError> {
        let dir = results_dir.join(game_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(EVENTS_FILE);
        let out = BufWriter::new(File::create(&path)?);
        Ok(Self {
            game_id: game_id.to_owned(),
            path,
            out,
            cursor: 0,
            failure: None,
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_pending(&mut self, state: &GameState) -> Result<(), EngineError> {
        let pending = state.world.event_log.get(self.cursor..).unwrap_or_default();
        for event in pending {
            let record = event_record(&self.game_id, event, state)?;
            serde_json::to_writer(&mut self.out, &record)?;
            self.out.write_all(b"\n")?;
        }
        self.cursor = state.world.event_log.len();
        self.out.flush()?;
        Ok(())
    }

    /// Write any remaining events and the `GAME_END` record.
    ///
    /// Returns the first write failure seen during the game, if any.
    pub fn finish(mut self, state: &GameState, result: &GameResult) -> Result<PathBuf, EngineError> {
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        self.write_pending(state)?;

        let record = GameEndRecord {
            game_id: &self.game_id,
            round: result.stats.total_rounds,
            timestamp: timestamp(&Utc::now()),
            event_type: "GAME_END",
            agent: None,
            end_reason: result.end_reason,
            stats: &result.stats,
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(self.path)
    }
}

impl RoundCallback for EventLogWriter {
    fn on_round(&mut self, summary: &RoundSummary, state: &GameState) {
        if self.failure.is_some() {
            return;
        }
        let before = self.cursor;
        match self.write_pending(state) {
            Ok(()) => debug!(
                round = summary.round,
                events = self.cursor.saturating_sub(before),
                "Events written"
            ),
            Err(error) => {
                warn!(
                    round = summary.round,
                    %error,
                    path = %self.path.display(),
                    "Event log write failed, logging stopped"
                );
                self.failure = Some(error);
            }
        }
    }
}

/// Flatten one event into its log record.
///
/// Payload keys never overwrite the common fields. A non-object payload
/// is kept under `details`.
fn event_record(game_id: &str, event: &Event, state: &GameState) -> Result<Value, EngineError> {
    let mut record = Map::new();
    record.insert("game_id".to_owned(), Value::from(game_id));
    record.insert("round".to_owned(), Value::from(event.round));
    record.insert("timestamp".to_owned(), Value::from(timestamp(&event.created_at)));
    record.insert("event_type".to_owned(), serde_json::to_value(event.event_type)?);
    record.insert(
        "agent".to_owned(),
        event
            .agent_id
            .as_ref()
            .map_or(Value::Null, |id| Value::from(state.world.name_of(id))),
    );

    match &event.details {
        Value::Object(payload) => {
            for (key, value) in payload {
                record.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Value::Null => {}
        other => {
            record.insert("details".to_owned(), other.clone());
        }
    }
    Ok(Value::Object(record))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use terrarium_core::{NoOpCallback, SimulationConfig, StubDecisionSource, run_game};

    use super::*;

    fn temp_results(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "terrarium_event_log_{name}_{}",
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn game() -> GameState {
        let config = SimulationConfig::parse(
            "seed: 5\ngame:\n  max_rounds: 3\npuzzles:\n  pre_solve_bonus: 7\n",
        )
        .unwrap();
        let mut state = GameState::new(&config).unwrap();
        state.register_agents(["Vera", "Kip", "Sable"]).unwrap();
        state
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn writes_every_event_then_game_end() {
        let results = temp_results("full");
        let mut state = game();
        let mut writer = EventLogWriter::create(&results, "g1").unwrap();
        let result = run_game(&mut state, &mut StubDecisionSource::new(), &mut writer);
        let path = writer.finish(&state, &result).unwrap();

        assert_eq!(path, results.join("g1").join(EVENTS_FILE));
        let lines = read_lines(&path);
        assert_eq!(lines.len(), state.world.event_log.len() + 1);

        let first = &lines[0];
        assert_eq!(first["game_id"], "g1");
        assert_eq!(first["event_type"], "REWARD");
        assert_eq!(first["agent"], "Vera");
        assert_eq!(first["reason"], "pre_solve_bonus");
        assert_eq!(first["round"], 0);
        assert!(first["timestamp"].as_str().unwrap().ends_with('Z'));

        let last = lines.last().unwrap();
        assert_eq!(last["event_type"], "GAME_END");
        assert_eq!(last["end_reason"], "max_rounds_reached");
        assert_eq!(last["total_rounds"], 3);
        assert_eq!(last["survivors"].as_array().unwrap().len(), 3);
        assert!(last["agent"].is_null());

        fs::remove_dir_all(&results).ok();
    }

    #[test]
    fn events_are_written_once() {
        let results = temp_results("cursor");
        let mut state = game();
        let mut writer = EventLogWriter::create(&results, "g2").unwrap();
        let result = run_game(&mut state, &mut StubDecisionSource::new(), &mut writer);
        // A second pass over the same state adds nothing.
        writer.write_pending(&state).unwrap();
        let path = writer.finish(&state, &result).unwrap();

        let lines = read_lines(&path);
        let game_end = lines.iter().filter(|l| l["event_type"] == "GAME_END").count();
        assert_eq!(game_end, 1);
        assert_eq!(lines.len(), state.world.event_log.len() + 1);

        fs::remove_dir_all(&results).ok();
    }

    #[test]
    fn system_events_have_null_agent() {
        let results = temp_results("system");
        let mut state = game();
        let mut writer = EventLogWriter::create(&results, "g3").unwrap();
        let result = run_game(&mut state, &mut StubDecisionSource::new(), &mut NoOpCallback);
        let path = writer.finish(&state, &result).unwrap();

        let lines = read_lines(&path);
        let created: Vec<&Value> = lines
            .iter()
            .filter(|l| l["event_type"] == "PUZZLE_CREATED")
            .collect();
        assert!(!created.is_empty());
        assert!(created.iter().all(|l| l["agent"].is_null()));

        fs::remove_dir_all(&results).ok();
    }
}
