use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use thiserror::Error;
use tracing::{error, info, warn};

use startup_core::{
    load_tuning_config, profiles::DEFAULT_PROFILE_ID, save_to_path, ContentRegistry, GameSession,
    TurnReport,
};

const SCRIPT_ENV: &str = "STARTUP_SIM_SCRIPT";
const SEED_ENV: &str = "STARTUP_SIM_SEED";
const PROFILE_ENV: &str = "STARTUP_SIM_PROFILE";
const SAVE_PATH_ENV: &str = "STARTUP_SIM_SAVE_PATH";
const FORCE_EVENT_ENV: &str = "STARTUP_SIM_FORCE_EVENT";

/// Per-turn action lists, e.g. `[["ship_feature"], ["marketing_blast", "team_offsite"]]`.
type Script = Vec<Vec<String>>;

#[derive(Debug, Error)]
enum ScriptError {
    #[error("failed to read script: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let tuning = load_tuning_config(None);
    let content = ContentRegistry::load_from_env();

    let seed = match env::var(SEED_ENV) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(err) => {
                warn!(target: "startup_sim::headless", value = %raw, error = %err, "seed.invalid");
                None
            }
        },
        Err(_) => None,
    };
    let profile = env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE_ID.to_string());

    let script = match env::var(SCRIPT_ENV) {
        Ok(path) => match read_script(Path::new(&path)) {
            Ok(script) => Some(script),
            Err(err) => {
                error!(target: "startup_sim::headless", path = %path, error = %err, "script.load_failed");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => None,
    };

    let mut session = match GameSession::from_profile(content, tuning, &profile, seed) {
        Ok(session) => session,
        Err(err) => {
            error!(target: "startup_sim::headless", profile = %profile, error = %err, "session.create_failed");
            return ExitCode::FAILURE;
        }
    };

    info!(
        target: "startup_sim::headless",
        profile = %profile,
        seed = session.rng().seed(),
        scripted = script.is_some(),
        "headless.ready"
    );

    if let Ok(event_id) = env::var(FORCE_EVENT_ENV) {
        let forced = session
            .begin_turn()
            .and_then(|_| session.force_event(&event_id));
        if let Err(err) = forced {
            error!(target: "startup_sim::headless", event = %event_id, error = %err, "event.force_failed");
            return ExitCode::FAILURE;
        }
    }

    let mut turn_index = 0usize;
    while !session.is_over() {
        let choices = match &script {
            Some(script) => match script.get(turn_index) {
                Some(choices) => choices.clone(),
                None => break,
            },
            None => autopilot_choice(&session),
        };
        turn_index += 1;

        match session.run_turn(choices.as_slice()) {
            Ok(report) => log_report(&report),
            Err(err) => {
                error!(target: "startup_sim::headless", error = %err, "turn.failed");
                return ExitCode::FAILURE;
            }
        }
    }

    let metrics = session.metrics();
    info!(
        target: "startup_sim::headless",
        turn = metrics.turn,
        valuation = metrics.valuation,
        balance = metrics.finances.balance,
        runway = metrics.finances.runway_months,
        active_events = metrics.active_events.len(),
        "headless.metrics"
    );

    if let Some(kind) = session.ending() {
        info!(
            target: "startup_sim::headless",
            ending = kind.as_str(),
            title = kind.title(),
            description = kind.description(),
            "headless.finished"
        );
    }

    if let Ok(path) = env::var(SAVE_PATH_ENV) {
        if let Err(err) = save_to_path(&session, &PathBuf::from(&path)) {
            error!(target: "startup_sim::headless", path = %path, error = %err, "save.failed");
        }
    }

    ExitCode::SUCCESS
}

fn read_script(path: &Path) -> Result<Script, ScriptError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn autopilot_choice(session: &GameSession) -> Vec<String> {
    session
        .affordable_actions()
        .first()
        .map(|action| vec![action.id.clone()])
        .unwrap_or_default()
}

fn log_report(report: &TurnReport) {
    for line in &report.event_narratives {
        info!(target: "startup_sim::headless", turn = report.turn, "{line}");
    }
    for resolution in &report.actions {
        info!(
            target: "startup_sim::headless",
            turn = report.turn,
            action = %resolution.action_id,
            "{}",
            resolution.narrative
        );
    }
    for rejection in &report.rejected {
        warn!(target: "startup_sim::headless", turn = report.turn, "{rejection}");
    }
    info!(
        target: "startup_sim::headless",
        turn = report.turn,
        balance = report.finances.balance,
        net = report.finances.net,
        runway = report.finances.runway_months,
        valuation = report.valuation,
        digest = format_args!("{:016x}", report.digest),
        "turn.summary"
    );
}
