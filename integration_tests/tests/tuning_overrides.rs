use std::sync::Arc;

use startup_core::{
    config::EconomyTickConfig, ActionCatalog, ContentRegistry, EventCatalog, GameSession,
    ProfileCatalog, TuningConfig,
};

fn quiet_content() -> Arc<ContentRegistry> {
    Arc::new(ContentRegistry::new(
        ActionCatalog::builtin(),
        EventCatalog::default(),
        ProfileCatalog::builtin(),
    ))
}

#[test]
fn economy_jitter_moves_revenue_and_expenses() -> anyhow::Result<()> {
    let jittery = Arc::new(TuningConfig::builtin().as_ref().clone().with_economy(
        EconomyTickConfig {
            enabled: true,
            revenue_variance: (0.10, 0.20),
            expense_variance: (0.05, 0.10),
        },
    ));

    let mut steady = GameSession::new(quiet_content(), TuningConfig::builtin(), Some(8));
    let mut first = GameSession::new(quiet_content(), Arc::clone(&jittery), Some(8));
    let mut second = GameSession::new(quiet_content(), jittery, Some(8));

    steady.run_turn::<&str>(&[])?;
    let report = first.run_turn::<&str>(&[])?;
    assert_eq!(second.run_turn::<&str>(&[])?, report);

    assert!(first.state().monthly_revenue() > steady.state().monthly_revenue());
    assert!(first.state().monthly_expenses() > steady.state().monthly_expenses());
    assert_eq!(first.state().balance(), steady.state().balance());
    assert_ne!(first.rng().to_record(), steady.rng().to_record());
    Ok(())
}

#[test]
fn saturated_event_weight_triggers_first_event_by_id() -> anyhow::Result<()> {
    let eager = Arc::new(
        TuningConfig::builtin()
            .as_ref()
            .clone()
            .with_event_probability_weight(1_000.0),
    );
    let mut session = GameSession::new(ContentRegistry::builtin(), eager, Some(3));
    let first_id = session
        .content()
        .events()
        .iter()
        .next()
        .map(|event| event.id.clone())
        .expect("builtin events exist");

    let narratives = session.begin_turn()?;
    assert_eq!(narratives.len(), 1);
    assert_eq!(session.state().active_events().len(), 1);
    assert!(session.state().active_events().contains_key(&first_id));

    let metrics = session.metrics();
    assert_eq!(metrics.active_events.len(), 1);
    assert_eq!(metrics.active_events[0].0, first_id);
    Ok(())
}
