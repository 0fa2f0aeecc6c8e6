mod common;

use common::{builtin_session, play, SCRIPT};
use startup_core::MetricField;

#[test]
fn identical_seeds_replay_identically() {
    let mut first = builtin_session(2024);
    let mut second = builtin_session(2024);

    let reports_a = play(&mut first, 36);
    let reports_b = play(&mut second, 36);

    assert!(!reports_a.is_empty());
    assert_eq!(reports_a, reports_b);
    assert_eq!(first.state(), second.state());
    assert_eq!(first.rng().to_record(), second.rng().to_record());
    assert_eq!(first.ending(), second.ending());
}

#[test]
fn phased_calls_match_run_turn() {
    let mut batched = builtin_session(77);
    let mut phased = builtin_session(77);

    for choices in SCRIPT.iter().take(4) {
        let expected = batched.run_turn(*choices).expect("batched turn");

        let narratives = phased.begin_turn().expect("begin turn");
        let mut resolutions = Vec::new();
        for choice in choices.iter() {
            if let Ok(resolution) = phased.select_action(choice) {
                resolutions.push(resolution);
            }
        }
        let report = phased.settle_turn().expect("settle turn");

        assert_eq!(narratives, expected.event_narratives);
        assert_eq!(resolutions, expected.actions);
        assert_eq!(report.digest, expected.digest);
    }
}

#[test]
fn metrics_stay_in_bounds_for_many_seeds() {
    for seed in 0..24 {
        let mut session = builtin_session(seed);
        for _ in 0..40 {
            if session.is_over() {
                break;
            }
            let choices: Vec<String> = session
                .affordable_actions()
                .iter()
                .take(2)
                .map(|action| action.id.clone())
                .collect();
            session.run_turn(choices.as_slice()).expect("turn resolves");

            let state = session.state();
            for field in MetricField::ALL {
                let bound = state.bounds().get(field);
                let value = state.get(field);
                assert!(value >= bound.min, "seed {seed}: {field} = {value} below {}", bound.min);
                if let Some(max) = bound.max {
                    assert!(value <= max, "seed {seed}: {field} = {value} above {max}");
                }
            }
        }
        assert!(session.is_over(), "seed {seed} should reach an ending within 40 turns");
    }
}
