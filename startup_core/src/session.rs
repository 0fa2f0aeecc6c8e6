use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::{
    actions::{self, ActionError, ActionResolution},
    config::TuningConfig,
    content::{ActionDefinition, ContentRegistry},
    endings::{check_endings, EndingKind},
    events::{self, EventError},
    finance::{settle_month, FinancialSnapshot},
    hashing::state_digest,
    metrics::{collect_metrics, CompanyMetrics},
    rng::SessionRng,
    state::StartupState,
    valuation::compute_valuation,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("unknown start profile '{id}'")]
    UnknownProfile { id: String },
    #[error("the game is over ({})", .0.title())]
    Concluded(EndingKind),
    #[error("cannot {operation} while {}", .phase.describe())]
    Phase {
        operation: &'static str,
        phase: TurnPhase,
    },
    #[error("failed to digest state: {0}")]
    Digest(#[from] bincode::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Next step is `begin_turn`.
    AwaitingEvents,
    /// Events have run; actions may be selected, then the turn settled.
    AwaitingActions,
}

impl TurnPhase {
    fn describe(&self) -> &'static str {
        match self {
            TurnPhase::AwaitingEvents => "the turn has not begun",
            TurnPhase::AwaitingActions => "actions are being chosen",
        }
    }
}

/// Everything that happened during one turn, in resolution order.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub turn: u32,
    pub event_narratives: Vec<String>,
    pub actions: Vec<ActionResolution>,
    /// Selections refused during [`GameSession::run_turn`], as player-facing messages.
    pub rejected: Vec<String>,
    pub finances: FinancialSnapshot,
    pub valuation: i64,
    pub ending: Option<EndingKind>,
    pub digest: u64,
}

/// Bookkeeping of a turn restored from a save.
pub(crate) struct TurnProgress {
    pub phase: TurnPhase,
    pub action_limit: Option<u32>,
    pub actions_taken: BTreeMap<String, u32>,
    pub event_narratives: Vec<String>,
    pub resolutions: Vec<ActionResolution>,
}

/// One game: state, random stream and turn bookkeeping.
///
/// A turn runs `begin_turn` (event tick and trigger), any number of
/// `select_action` calls, then `settle_turn` (finances, endings, counter).
pub struct GameSession {
    content: Arc<ContentRegistry>,
    tuning: Arc<TuningConfig>,
    state: StartupState,
    rng: SessionRng,
    phase: TurnPhase,
    action_limit: u32,
    actions_taken: BTreeMap<String, u32>,
    event_narratives: Vec<String>,
    resolutions: Vec<ActionResolution>,
    ending: Option<EndingKind>,
}

impl GameSession {
    /// Start from the baseline company. `seed` defaults to the tuning seed.
    pub fn new(content: Arc<ContentRegistry>, tuning: Arc<TuningConfig>, seed: Option<u64>) -> Self {
        let state = StartupState::new(tuning.field_bounds());
        let rng = SessionRng::from_seed(seed.unwrap_or_else(|| tuning.default_seed()));
        Self::from_parts(content, tuning, state, rng)
    }

    pub fn from_profile(
        content: Arc<ContentRegistry>,
        tuning: Arc<TuningConfig>,
        profile_id: &str,
        seed: Option<u64>,
    ) -> Result<Self, SessionError> {
        let profile = content
            .profiles()
            .get(profile_id)
            .ok_or_else(|| SessionError::UnknownProfile {
                id: profile_id.to_string(),
            })?;
        let state = profile.build_state(tuning.field_bounds());
        let rng = SessionRng::from_seed(seed.unwrap_or_else(|| tuning.default_seed()));
        tracing::info!(
            target: "startup_sim::session",
            profile = %profile.id,
            seed = rng.seed(),
            "session.created"
        );
        Ok(Self::from_parts(content, tuning, state, rng))
    }

    pub(crate) fn from_parts(
        content: Arc<ContentRegistry>,
        tuning: Arc<TuningConfig>,
        state: StartupState,
        rng: SessionRng,
    ) -> Self {
        let action_limit = tuning.actions().default_per_turn();
        Self {
            content,
            tuning,
            state,
            rng,
            phase: TurnPhase::AwaitingEvents,
            action_limit,
            actions_taken: BTreeMap::new(),
            event_narratives: Vec::new(),
            resolutions: Vec::new(),
            ending: None,
        }
    }

    pub(crate) fn resume(&mut self, progress: TurnProgress, ending: Option<EndingKind>) {
        self.phase = progress.phase;
        self.action_limit = self.tuning.actions().clamp_limit(progress.action_limit);
        self.actions_taken = progress.actions_taken;
        self.event_narratives = progress.event_narratives;
        self.resolutions = progress.resolutions;
        self.ending = ending;
    }

    /// Per-turn action limit, clamped into the configured range.
    pub fn with_action_limit(mut self, requested: Option<u32>) -> Self {
        self.action_limit = self.tuning.actions().clamp_limit(requested);
        self
    }

    pub fn state(&self) -> &StartupState {
        &self.state
    }

    pub fn rng(&self) -> &SessionRng {
        &self.rng
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn action_limit(&self) -> u32 {
        self.action_limit
    }

    pub fn actions_taken(&self) -> &BTreeMap<String, u32> {
        &self.actions_taken
    }

    /// Event narratives of the turn in progress.
    pub fn event_narratives(&self) -> &[String] {
        &self.event_narratives
    }

    /// Actions resolved so far in the turn in progress.
    pub fn resolutions(&self) -> &[ActionResolution] {
        &self.resolutions
    }

    pub fn ending(&self) -> Option<EndingKind> {
        self.ending
    }

    pub fn is_over(&self) -> bool {
        self.ending.is_some()
    }

    pub fn affordable_actions(&self) -> Vec<&ActionDefinition> {
        actions::list_affordable(&self.state, self.content.actions())
    }

    pub fn metrics(&self) -> CompanyMetrics {
        collect_metrics(&self.state, self.tuning.valuation())
    }

    /// Event phase: tick active events, then give dormant ones their chance.
    pub fn begin_turn(&mut self) -> Result<Vec<String>, SessionError> {
        self.ensure_running()?;
        self.ensure_phase(TurnPhase::AwaitingEvents, "begin a turn")?;

        let events = self.content.events();
        let mut narratives = events::tick(&mut self.state, events);
        narratives.extend(events::maybe_trigger(
            &mut self.state,
            events,
            self.tuning.event_probability_weight(),
            &mut self.rng,
        ));

        tracing::info!(
            target: "startup_sim::session",
            turn = self.state.turn(),
            active = self.state.active_events().len(),
            "turn.begun"
        );
        self.phase = TurnPhase::AwaitingActions;
        self.actions_taken.clear();
        self.resolutions.clear();
        self.event_narratives = narratives.clone();
        Ok(narratives)
    }

    /// Start an event outside the trigger roll, e.g. for a scripted scenario.
    /// Only valid while actions are being chosen; the narrative joins the
    /// turn's event narratives. Returns `None` if the event is already active.
    pub fn force_event(&mut self, id: &str) -> Result<Option<String>, SessionError> {
        self.ensure_running()?;
        self.ensure_phase(TurnPhase::AwaitingActions, "force an event")?;

        let narrative = events::activate(&mut self.state, self.content.events(), id)?;
        if let Some(line) = &narrative {
            tracing::info!(
                target: "startup_sim::session",
                event = id,
                turn = self.state.turn(),
                "event.forced"
            );
            self.event_narratives.push(line.clone());
        }
        Ok(narrative)
    }

    /// Resolve one chosen action. A refused selection changes nothing and
    /// does not count toward the turn's limits.
    pub fn select_action(&mut self, id: &str) -> Result<ActionResolution, SessionError> {
        self.ensure_running()?;
        self.ensure_phase(TurnPhase::AwaitingActions, "select an action")?;

        let action = self
            .content
            .actions()
            .get(id)
            .ok_or_else(|| ActionError::UnknownAction { id: id.to_string() })?;
        let selections: u32 = self.actions_taken.values().sum();
        actions::validate_selection_limit(selections, &self.actions_taken, action, self.action_limit)?;

        let resolution =
            actions::apply_action(&mut self.state, self.content.actions(), id, &mut self.rng)?;
        *self.actions_taken.entry(id.to_string()).or_insert(0) += 1;
        self.resolutions.push(resolution.clone());
        Ok(resolution)
    }

    /// Close the turn: settle finances, check endings, advance the counter
    /// unless the game just ended.
    pub fn settle_turn(&mut self) -> Result<TurnReport, SessionError> {
        self.ensure_running()?;
        self.ensure_phase(TurnPhase::AwaitingActions, "settle the turn")?;

        let turn = self.state.turn();
        let finances = settle_month(&mut self.state, self.tuning.economy(), &mut self.rng);
        self.state.clamp_all();
        let valuation = compute_valuation(&self.state, self.tuning.valuation());
        let ending = check_endings(&self.state, &self.tuning);
        if ending.is_none() {
            self.state.advance_turn();
        }
        let digest = state_digest(&self.state)?;

        tracing::info!(
            target: "startup_sim::session",
            turn,
            valuation,
            digest = format_args!("{digest:016x}"),
            ending = ending.map(|kind| kind.as_str()),
            "turn.settled"
        );

        self.phase = TurnPhase::AwaitingEvents;
        self.ending = ending;
        self.actions_taken.clear();
        Ok(TurnReport {
            turn,
            event_narratives: std::mem::take(&mut self.event_narratives),
            actions: std::mem::take(&mut self.resolutions),
            rejected: Vec::new(),
            finances,
            valuation,
            ending,
            digest,
        })
    }

    /// Play a whole turn with a prepared list of choices. Refused choices are
    /// reported and skipped; the rest resolve in order.
    pub fn run_turn<S: AsRef<str>>(&mut self, choices: &[S]) -> Result<TurnReport, SessionError> {
        if self.phase == TurnPhase::AwaitingEvents {
            self.begin_turn()?;
        }
        let mut rejected = Vec::new();
        for choice in choices {
            match self.select_action(choice.as_ref()) {
                Ok(_) => {}
                Err(SessionError::Action(err)) => {
                    tracing::info!(
                        target: "startup_sim::session",
                        action = choice.as_ref(),
                        error = %err,
                        "action.rejected"
                    );
                    rejected.push(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        let mut report = self.settle_turn()?;
        report.rejected = rejected;
        Ok(report)
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.ending {
            Some(kind) => Err(SessionError::Concluded(kind)),
            None => Ok(()),
        }
    }

    fn ensure_phase(&self, expected: TurnPhase, operation: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::Phase {
                operation,
                phase: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EndingThresholds,
        content::{ActionCatalog, EventCatalog},
        fields::MetricField,
        profiles::ProfileCatalog,
    };

    fn quiet_registry() -> Arc<ContentRegistry> {
        Arc::new(ContentRegistry::new(
            ActionCatalog::builtin(),
            EventCatalog::default(),
            ProfileCatalog::builtin(),
        ))
    }

    fn session() -> GameSession {
        GameSession::new(quiet_registry(), TuningConfig::builtin(), Some(7))
    }

    #[test]
    fn forced_event_joins_the_turn_report() {
        let mut session = GameSession::new(ContentRegistry::builtin(), TuningConfig::builtin(), Some(7));
        assert!(matches!(
            session.force_event("pr_boost"),
            Err(SessionError::Phase { .. })
        ));
        let before = session.begin_turn().unwrap().len();
        assert!(matches!(
            session.force_event("alien_invasion"),
            Err(SessionError::Event(EventError::UnknownEvent { .. }))
        ));
        let dormant = session
            .content()
            .events()
            .iter()
            .map(|event| event.id.clone())
            .find(|id| !session.state().active_events().contains_key(id))
            .expect("at most one event triggers per turn");
        let first = session.force_event(&dormant).unwrap();
        assert!(first.is_some());
        assert_eq!(session.force_event(&dormant).unwrap(), None);
        assert!(session.state().active_events().contains_key(&dormant));

        let report = session.settle_turn().unwrap();
        assert_eq!(report.event_narratives.len(), before + 1);
        assert_eq!(report.event_narratives.last(), first.as_ref());
    }

    #[test]
    fn turn_phases_must_run_in_order() {
        let mut session = session();
        assert!(matches!(
            session.select_action("team_offsite"),
            Err(SessionError::Phase { phase: TurnPhase::AwaitingEvents, .. })
        ));
        assert!(matches!(
            session.settle_turn(),
            Err(SessionError::Phase { .. })
        ));
        session.begin_turn().unwrap();
        assert!(matches!(
            session.begin_turn(),
            Err(SessionError::Phase { phase: TurnPhase::AwaitingActions, .. })
        ));
        session.select_action("team_offsite").unwrap();
        let report = session.settle_turn().unwrap();
        assert_eq!(report.turn, 1);
        assert_eq!(session.state().turn(), 2);
        assert_eq!(session.phase(), TurnPhase::AwaitingEvents);
    }

    #[test]
    fn refused_selection_does_not_count() {
        let mut session = session().with_action_limit(Some(2));
        session.begin_turn().unwrap();
        assert!(matches!(
            session.select_action("does_not_exist"),
            Err(SessionError::Action(ActionError::UnknownAction { .. }))
        ));
        session.select_action("team_offsite").unwrap();
        assert!(matches!(
            session.select_action("team_offsite"),
            Err(SessionError::Action(ActionError::ActionCap { cap: 1, .. }))
        ));
        session.select_action("hire_engineers").unwrap();
        assert!(matches!(
            session.select_action("venture_debt"),
            Err(SessionError::Action(ActionError::LimitExceeded { limit: 2 }))
        ));
        assert_eq!(session.actions_taken().values().sum::<u32>(), 2);
    }

    #[test]
    fn action_limit_is_clamped() {
        assert_eq!(session().with_action_limit(Some(9)).action_limit(), 3);
        assert_eq!(session().with_action_limit(Some(0)).action_limit(), 1);
        assert_eq!(session().with_action_limit(None).action_limit(), 2);
    }

    #[test]
    fn run_turn_reports_rejections_and_settles() {
        let mut session = session();
        let report = session
            .run_turn(&["team_offsite", "does_not_exist", "refactor_codebase"])
            .unwrap();
        assert_eq!(report.actions.len(), 2);
        assert_eq!(report.rejected, vec!["unknown action 'does_not_exist'".to_string()]);
        assert_eq!(report.ending, None);
    }

    #[test]
    fn ended_session_refuses_further_turns() {
        let tuning = Arc::new(TuningConfig::builtin().as_ref().clone().with_endings(
            EndingThresholds {
                max_turns: 1,
                ..EndingThresholds::default()
            },
        ));
        let mut session = GameSession::new(quiet_registry(), tuning, Some(1));
        assert_eq!(session.run_turn::<&str>(&[]).unwrap().ending, None);
        let report = session.run_turn::<&str>(&[]).unwrap();
        assert_eq!(report.ending, Some(EndingKind::JourneyComplete));
        assert_eq!(session.state().turn(), 2);
        assert!(matches!(
            session.begin_turn(),
            Err(SessionError::Concluded(EndingKind::JourneyComplete))
        ));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = GameSession::from_profile(quiet_registry(), TuningConfig::builtin(), "unicorn", None)
            .err()
            .expect("unknown profile");
        assert!(matches!(err, SessionError::UnknownProfile { .. }));
    }

    #[test]
    fn profile_seeds_the_state() {
        let session =
            GameSession::from_profile(quiet_registry(), TuningConfig::builtin(), "bootstrapped", None)
                .unwrap();
        assert_eq!(session.state().headcount(), 6);
        assert_eq!(session.rng().seed(), 42);
        assert_eq!(session.state().get(MetricField::Balance), 150_000.0);
    }
}
