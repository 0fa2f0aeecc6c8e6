use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use startup_core::{ContentRegistry, GameSession, TuningConfig};

const SCRIPT: [&[&str]; 4] = [
    &["ship_feature", "team_offsite"],
    &["marketing_blast"],
    &["refactor_codebase", "investor_pitch"],
    &[],
];

fn bench_session(c: &mut Criterion) {
    let content = ContentRegistry::builtin();
    let tuning = TuningConfig::builtin();
    let mut group = c.benchmark_group("session");

    for turns in [12u32, 36] {
        group.bench_with_input(BenchmarkId::new("turns", turns), &turns, |b, &turns| {
            b.iter_batched(
                || GameSession::new(Arc::clone(&content), Arc::clone(&tuning), Some(42)),
                |mut session| {
                    for turn in 0..turns {
                        if session.is_over() {
                            break;
                        }
                        let choices = SCRIPT[turn as usize % SCRIPT.len()];
                        let _ = session.run_turn(choices);
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(session_benches, bench_session);
criterion_main!(session_benches);
