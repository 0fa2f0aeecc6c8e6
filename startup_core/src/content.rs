use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use startup_schema::{
    ActionRecord, ContentFile, DeltaRecord, EventRecord, PressureCurveRecord, PressureRecord,
};
use thiserror::Error;

use crate::{
    fields::MetricField,
    profiles::ProfileCatalog,
    state::{negate, resolve_deltas, Deltas, StartupState, StateError},
};

pub const BUILTIN_ACTIONS: &str = include_str!("data/actions.json");
pub const BUILTIN_EVENTS: &str = include_str!("data/events.json");
pub const ACTIONS_PATH_ENV: &str = "STARTUP_ACTIONS_PATH";
pub const EVENTS_PATH_ENV: &str = "STARTUP_EVENTS_PATH";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("{kind} definition #{index} is missing its 'id'")]
    MissingId { kind: &'static str, index: usize },
    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },
    #[error("{kind} '{id}' references unknown startup metric '{name}'")]
    UnknownField {
        kind: &'static str,
        id: String,
        name: String,
    },
    #[error("event '{id}' has an invalid pressure rule: {reason}")]
    InvalidPressure { id: String, reason: String },
    #[error("action '{id}' must allow at least one use per turn")]
    InvalidLimit { id: String },
}

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("failed to read content from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse content: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskBranch {
    pub effects: Deltas,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRisk {
    pub success_chance: f64,
    pub success: RiskBranch,
    pub failure: RiskBranch,
}

/// A decision the player can take during a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub narrative: String,
    pub costs: Deltas,
    pub effects: Deltas,
    pub risk: Option<ActionRisk>,
    pub max_per_turn: Option<u32>,
}

impl ActionDefinition {
    pub fn balance_cost(&self) -> Option<f64> {
        self.costs.get(&MetricField::Balance).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressureCurve {
    Level,
    Inverse,
    Shortfall { threshold: f64 },
}

/// State-dependent boost to an event's trigger chance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureRule {
    pub metric: MetricField,
    pub curve: PressureCurve,
    pub weight: f64,
}

impl PressureRule {
    pub fn pressure(&self, state: &StartupState) -> f64 {
        let normalized = state
            .bounds()
            .get(self.metric)
            .normalize(state.get(self.metric))
            .unwrap_or(0.0);
        let factor = match self.curve {
            PressureCurve::Level => normalized,
            PressureCurve::Inverse => 1.0 - normalized,
            PressureCurve::Shortfall { threshold } => (threshold - normalized).max(0.0),
        };
        factor * self.weight
    }
}

/// A random event. Whether it is running lives in the state's active-event
/// table, never on the definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    pub trigger_chance: f64,
    pub duration_turns: u32,
    pub deltas: Deltas,
    pub revert_deltas: Option<Deltas>,
    pub persistent: bool,
    pub pressure: Option<PressureRule>,
    pub narrative: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCatalog {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionCatalog {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_ACTIONS).expect("builtin action catalog should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentLoadError> {
        let file: ContentFile<ActionRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(file.into_entries())?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ContentLoadError> {
        Self::from_json_str(&read_content(path)?)
    }

    pub fn from_records(records: Vec<ActionRecord>) -> Result<Self, DefinitionError> {
        let mut actions = BTreeMap::new();
        for (index, record) in records.into_iter().enumerate() {
            let action = coerce_action(index, record)?;
            if actions.contains_key(&action.id) {
                return Err(DefinitionError::Duplicate {
                    kind: "action",
                    id: action.id,
                });
            }
            actions.insert(action.id.clone(), action);
        }
        Ok(Self { actions })
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = ActionDefinition>) -> Self {
        Self {
            actions: definitions
                .into_iter()
                .map(|action| (action.id.clone(), action))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    /// Actions ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCatalog {
    events: BTreeMap<String, EventDefinition>,
}

impl EventCatalog {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_EVENTS).expect("builtin event catalog should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentLoadError> {
        let file: ContentFile<EventRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(file.into_entries())?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ContentLoadError> {
        Self::from_json_str(&read_content(path)?)
    }

    pub fn from_records(records: Vec<EventRecord>) -> Result<Self, DefinitionError> {
        let mut events = BTreeMap::new();
        for (index, record) in records.into_iter().enumerate() {
            let event = coerce_event(index, record)?;
            if events.contains_key(&event.id) {
                return Err(DefinitionError::Duplicate {
                    kind: "event",
                    id: event.id,
                });
            }
            events.insert(event.id.clone(), event);
        }
        Ok(Self { events })
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = EventDefinition>) -> Self {
        Self {
            events: definitions
                .into_iter()
                .map(|event| (event.id.clone(), event))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.events.get(id)
    }

    /// Events ordered by id; this is the trigger evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Immutable content shared by every component of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentRegistry {
    actions: ActionCatalog,
    events: EventCatalog,
    profiles: ProfileCatalog,
}

impl ContentRegistry {
    pub fn new(actions: ActionCatalog, events: EventCatalog, profiles: ProfileCatalog) -> Self {
        Self {
            actions,
            events,
            profiles,
        }
    }

    pub fn builtin() -> Arc<Self> {
        Arc::new(Self::new(
            ActionCatalog::builtin(),
            EventCatalog::builtin(),
            ProfileCatalog::builtin(),
        ))
    }

    /// Load every table from the environment overrides, falling back to the
    /// builtin table for any that is missing or malformed.
    pub fn load_from_env() -> Arc<Self> {
        Arc::new(Self::new(
            load_actions(None),
            load_events(None),
            crate::profiles::load_profiles(None),
        ))
    }

    pub fn actions(&self) -> &ActionCatalog {
        &self.actions
    }

    pub fn events(&self) -> &EventCatalog {
        &self.events
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.profiles
    }
}

/// Load actions from `path` (or the environment override). A missing or
/// malformed source yields the builtin catalog.
pub fn load_actions(path: Option<&Path>) -> ActionCatalog {
    load_with_fallback(path, ACTIONS_PATH_ENV, "actions", ActionCatalog::from_file)
        .unwrap_or_else(ActionCatalog::builtin)
}

pub fn load_events(path: Option<&Path>) -> EventCatalog {
    load_with_fallback(path, EVENTS_PATH_ENV, "events", EventCatalog::from_file)
        .unwrap_or_else(EventCatalog::builtin)
}

pub(crate) fn load_with_fallback<T>(
    path: Option<&Path>,
    env_key: &str,
    table: &'static str,
    loader: impl Fn(&Path) -> Result<T, ContentLoadError>,
) -> Option<T> {
    let candidate = path
        .map(Path::to_path_buf)
        .or_else(|| env::var(env_key).ok().map(PathBuf::from));

    let Some(path) = candidate else {
        tracing::info!(target: "startup_sim::content", table, "content.loaded=builtin");
        return None;
    };

    match loader(&path) {
        Ok(loaded) => {
            tracing::info!(
                target: "startup_sim::content",
                table,
                path = %path.display(),
                "content.loaded=file"
            );
            Some(loaded)
        }
        Err(err) => {
            tracing::warn!(
                target: "startup_sim::content",
                table,
                path = %path.display(),
                error = %err,
                "content.load_failed"
            );
            None
        }
    }
}

pub(crate) fn read_content(path: &Path) -> Result<String, ContentLoadError> {
    fs::read_to_string(path).map_err(|source| ContentLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn record_id(
    kind: &'static str,
    index: usize,
    id: Option<String>,
) -> Result<String, DefinitionError> {
    match id.map(|id| id.trim().to_string()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(DefinitionError::MissingId { kind, index }),
    }
}

/// `ship_feature` -> `Ship Feature`.
pub(crate) fn display_name(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_for(kind: &'static str, id: &str, record: &DeltaRecord) -> Result<Deltas, DefinitionError> {
    resolve_deltas(record).map_err(|StateError::UnknownField { name }| DefinitionError::UnknownField {
        kind,
        id: id.to_string(),
        name,
    })
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn coerce_action(index: usize, record: ActionRecord) -> Result<ActionDefinition, DefinitionError> {
    let id = record_id("action", index, record.id)?;
    let name = record.name.unwrap_or_else(|| display_name(&id));

    let costs = match (record.costs, record.cost) {
        (Some(costs), _) => resolve_for("action", &id, &costs)?,
        (None, Some(cost)) => Deltas::from([(MetricField::Balance, cost)]),
        (None, None) => Deltas::new(),
    };
    let effects = resolve_for("action", &id, &record.effects)?;

    let risk = match record.risk {
        Some(risk) => Some(ActionRisk {
            success_chance: clamp_probability(risk.success_chance),
            success: RiskBranch {
                effects: resolve_for("action", &id, &risk.success_effects)?,
                narrative: risk.success_narrative.unwrap_or_default(),
            },
            failure: RiskBranch {
                effects: resolve_for("action", &id, &risk.failure_effects)?,
                narrative: risk.failure_narrative.unwrap_or_default(),
            },
        }),
        None => None,
    };

    if record.max_per_turn == Some(0) {
        return Err(DefinitionError::InvalidLimit { id });
    }

    Ok(ActionDefinition {
        id,
        name,
        narrative: record.narrative.unwrap_or_default(),
        costs,
        effects,
        risk,
        max_per_turn: record.max_per_turn,
    })
}

fn coerce_event(index: usize, record: EventRecord) -> Result<EventDefinition, DefinitionError> {
    let id = record_id("event", index, record.id)?;
    let name = record.name.unwrap_or_else(|| display_name(&id));
    let duration_turns = record.duration_turns.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
    let deltas = resolve_for("event", &id, &record.deltas)?;

    // Multi-turn events without an explicit revert undo their immediate effect.
    let revert_deltas = match record.revert_deltas {
        Some(revert) if !revert.is_empty() => Some(resolve_for("event", &id, &revert)?),
        _ if duration_turns > 1 && !deltas.is_empty() => Some(negate(&deltas)),
        _ => None,
    };

    let pressure = match record.pressure {
        Some(pressure) => Some(coerce_pressure(&id, pressure)?),
        None => None,
    };

    Ok(EventDefinition {
        trigger_chance: clamp_probability(record.trigger_chance),
        duration_turns,
        deltas,
        revert_deltas,
        persistent: record.persistent.unwrap_or(true),
        pressure,
        narrative: record.narrative.unwrap_or_default(),
        name,
        id,
    })
}

fn coerce_pressure(id: &str, record: PressureRecord) -> Result<PressureRule, DefinitionError> {
    let invalid = |reason: String| DefinitionError::InvalidPressure {
        id: id.to_string(),
        reason,
    };
    let metric = MetricField::from_name(&record.metric)
        .ok_or_else(|| invalid(format!("unknown metric '{}'", record.metric)))?;
    if !record.weight.is_finite() {
        return Err(invalid("weight must be finite".to_string()));
    }
    let curve = match record.curve {
        PressureCurveRecord::Level => PressureCurve::Level,
        PressureCurveRecord::Inverse => PressureCurve::Inverse,
        PressureCurveRecord::Shortfall => PressureCurve::Shortfall {
            threshold: clamp_probability(record.threshold),
        },
    };
    Ok(PressureRule {
        metric,
        curve,
        weight: record.weight,
    })
}
