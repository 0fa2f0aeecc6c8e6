#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use startup_core::{ContentRegistry, GameSession, TuningConfig, TurnReport};

pub const SCRIPT: [&[&str]; 6] = [
    &["ship_feature", "team_offsite"],
    &["marketing_blast"],
    &["investor_pitch", "refactor_codebase"],
    &[],
    &["hire_engineers", "marketing_blast"],
    &["venture_debt"],
];

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn builtin_session(seed: u64) -> GameSession {
    GameSession::new(ContentRegistry::builtin(), TuningConfig::builtin(), Some(seed))
}

pub fn session_with(content: Arc<ContentRegistry>, seed: u64) -> GameSession {
    GameSession::new(content, TuningConfig::builtin(), Some(seed))
}

/// Play scripted turns, cycling the script, until `turns` have run or the
/// game ends.
pub fn play(session: &mut GameSession, turns: usize) -> Vec<TurnReport> {
    let mut reports = Vec::new();
    for index in 0..turns {
        if session.is_over() {
            break;
        }
        let choices = SCRIPT[index % SCRIPT.len()];
        reports.push(session.run_turn(choices).expect("scripted turn resolves"));
    }
    reports
}
