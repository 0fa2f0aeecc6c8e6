use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use serde_json::Value;
use startup_schema::{PhaseRecord, ResolutionRecord, SaveRecord, SAVE_SCHEMA_VERSION};
use thiserror::Error;

use crate::{
    actions::{ActionResolution, RiskOutcome},
    config::TuningConfig,
    content::ContentRegistry,
    endings::EndingKind,
    rng::SessionRng,
    session::{GameSession, TurnPhase, TurnProgress},
    state::StartupState,
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file version '{found}' is not supported (expected '{expected}')")]
    SchemaVersion { found: String, expected: &'static str },
    #[error("failed to read save file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write save file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse save file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to encode save file: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    #[error("save file is inconsistent: {reason}")]
    State { reason: String },
}

pub fn to_save_record(session: &GameSession) -> SaveRecord {
    let saved_at_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    SaveRecord {
        version: SAVE_SCHEMA_VERSION.to_string(),
        saved_at_unix,
        turn: session.state().turn(),
        state: session.state().to_record(),
        rng: session.rng().to_record(),
        phase: PhaseRecord {
            awaiting_actions: session.phase() == TurnPhase::AwaitingActions,
            actions_taken: session.actions_taken().clone(),
            action_limit: Some(session.action_limit()),
            event_narratives: session.event_narratives().to_vec(),
            resolutions: session
                .resolutions()
                .iter()
                .map(|resolution| ResolutionRecord {
                    action_id: resolution.action_id.clone(),
                    narrative: resolution.narrative.clone(),
                    risk: resolution.risk.map(|risk| risk.as_str().to_string()),
                })
                .collect(),
        },
        ending: session.ending().map(|kind| kind.as_str().to_string()),
    }
}

/// Rebuild a session from a decoded save. The state is clamped into the
/// current tuning's bounds and malformed active-event entries are dropped.
pub fn session_from_save(
    record: SaveRecord,
    content: Arc<ContentRegistry>,
    tuning: Arc<TuningConfig>,
) -> Result<GameSession, PersistenceError> {
    check_version(&record.version)?;
    if record.turn != record.state.turn {
        return Err(PersistenceError::State {
            reason: format!(
                "header turn {} does not match state turn {}",
                record.turn, record.state.turn
            ),
        });
    }
    let ending = match record.ending.as_deref() {
        Some(name) => Some(EndingKind::from_name(name).ok_or_else(|| PersistenceError::State {
            reason: format!("unknown ending '{name}'"),
        })?),
        None => None,
    };

    let state = StartupState::from_record(&record.state, tuning.field_bounds());
    let rng = SessionRng::restore(record.rng);
    let phase = record.phase;
    let resolutions = phase
        .resolutions
        .into_iter()
        .map(resolution_from_record)
        .collect::<Result<Vec<_>, _>>()?;
    let progress = TurnProgress {
        phase: if phase.awaiting_actions {
            TurnPhase::AwaitingActions
        } else {
            TurnPhase::AwaitingEvents
        },
        action_limit: phase.action_limit,
        actions_taken: phase.actions_taken,
        event_narratives: phase.event_narratives,
        resolutions,
    };
    let mut session = GameSession::from_parts(content, tuning, state, rng);
    session.resume(progress, ending);
    Ok(session)
}

fn resolution_from_record(record: ResolutionRecord) -> Result<ActionResolution, PersistenceError> {
    let risk = match record.risk.as_deref() {
        Some(name) => Some(RiskOutcome::from_name(name).ok_or_else(|| PersistenceError::State {
            reason: format!("unknown risk outcome '{name}'"),
        })?),
        None => None,
    };
    Ok(ActionResolution {
        action_id: record.action_id,
        narrative: record.narrative,
        risk,
    })
}

/// Write the session as JSON. The file is written beside `path` first and
/// renamed into place, so an interrupted save keeps the previous file.
pub fn save_to_path(session: &GameSession, path: &Path) -> Result<(), PersistenceError> {
    let record = to_save_record(session);
    let json = serde_json::to_string_pretty(&record)
        .map_err(|source| PersistenceError::Encode { source })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistenceError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let staging = staging_path(path);
    fs::write(&staging, json).map_err(|source| PersistenceError::Write {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        target: "startup_sim::persistence",
        path = %path.display(),
        turn = record.turn,
        "save.written"
    );
    Ok(())
}

/// Load a save written by [`save_to_path`]. The version tag is checked
/// before the rest of the file is decoded; the file is never modified.
pub fn load_from_path(
    path: &Path,
    content: Arc<ContentRegistry>,
    tuning: Arc<TuningConfig>,
) -> Result<GameSession, PersistenceError> {
    let contents = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&contents)?;
    let version = value
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default();
    check_version(version)?;

    let record: SaveRecord = serde_json::from_value(value)?;
    let session = session_from_save(record, content, tuning)?;
    tracing::info!(
        target: "startup_sim::persistence",
        path = %path.display(),
        turn = session.state().turn(),
        "save.loaded"
    );
    Ok(session)
}

fn check_version(found: &str) -> Result<(), PersistenceError> {
    if found == SAVE_SCHEMA_VERSION {
        Ok(())
    } else {
        tracing::warn!(
            target: "startup_sim::persistence",
            found,
            expected = SAVE_SCHEMA_VERSION,
            "save.version_mismatch"
        );
        Err(PersistenceError::SchemaVersion {
            found: found.to_string(),
            expected: SAVE_SCHEMA_VERSION,
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "save.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
