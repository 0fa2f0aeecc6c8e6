//! Data contracts for the startup simulator.
//!
//! Content records mirror the JSON content files (actions, events, starting
//! profiles) and accept the legacy field names older content used.
//! Persistence records describe a saved session. Everything here is plain
//! data; validation and coercion live in `startup_core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Version tag written into every save file. Loads refuse any other value.
pub const SAVE_SCHEMA_VERSION: &str = "1.0";

/// Metric name to amount, as authored in content files.
pub type DeltaRecord = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRecord {
    #[serde(alias = "key")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "description")]
    pub narrative: Option<String>,
    pub costs: Option<DeltaRecord>,
    /// Legacy single cost, charged against the cash balance only.
    pub cost: Option<f64>,
    #[serde(alias = "impact")]
    pub effects: DeltaRecord,
    pub risk: Option<RiskRecord>,
    pub max_per_turn: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRecord {
    pub success_chance: f64,
    pub success_effects: DeltaRecord,
    pub success_narrative: Option<String>,
    pub failure_effects: DeltaRecord,
    pub failure_narrative: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    #[serde(alias = "key")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "probability")]
    pub trigger_chance: f64,
    #[serde(alias = "duration")]
    pub duration_turns: Option<i64>,
    #[serde(alias = "effects")]
    pub deltas: DeltaRecord,
    #[serde(alias = "revert_effects")]
    pub revert_deltas: Option<DeltaRecord>,
    pub persistent: Option<bool>,
    pub pressure: Option<PressureRecord>,
    #[serde(alias = "description")]
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureRecord {
    pub metric: String,
    pub curve: PressureCurveRecord,
    #[serde(default)]
    pub threshold: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureCurveRecord {
    /// Grows with the normalised metric.
    Level,
    /// Grows as the normalised metric falls.
    Inverse,
    /// Grows with the gap between `threshold` and the normalised metric.
    Shortfall,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    #[serde(alias = "key")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub stats: DeltaRecord,
}

/// A content file is either a bare list of records or a versioned wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentFile<T> {
    List(Vec<T>),
    Wrapped {
        #[serde(default)]
        version: u32,
        entries: Vec<T>,
    },
}

impl<T> ContentFile<T> {
    pub fn into_entries(self) -> Vec<T> {
        match self {
            ContentFile::List(entries) => entries,
            ContentFile::Wrapped { entries, .. } => entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub balance: i64,
    pub monthly_revenue: i64,
    pub monthly_expenses: i64,
    pub users: i64,
    pub growth_rate: f64,
    pub churn_rate: f64,
    pub product_quality: f64,
    pub brand_awareness: f64,
    pub team_morale: f64,
    pub headcount: i64,
    pub debt: i64,
    pub turn: u32,
    /// `id:remaining_turns` pairs.
    #[serde(default)]
    pub active_events: Vec<String>,
}

/// Continuation point of the session's ChaCha stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngStateRecord {
    pub seed: u64,
    pub word_pos: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseRecord {
    pub awaiting_actions: bool,
    pub actions_taken: BTreeMap<String, u32>,
    /// Per-turn action limit; older saves fall back to the tuning default.
    pub action_limit: Option<u32>,
    /// Narratives already produced by the turn in progress.
    pub event_narratives: Vec<String>,
    pub resolutions: Vec<ResolutionRecord>,
}

/// One action resolved during the turn in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub action_id: String,
    pub narrative: String,
    /// `success` or `failure` when the action carried a risk.
    #[serde(default)]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version: String,
    pub saved_at_unix: u64,
    pub turn: u32,
    pub state: StateRecord,
    pub rng: RngStateRecord,
    #[serde(default)]
    pub phase: PhaseRecord,
    #[serde(default)]
    pub ending: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_action_aliases_deserialize() {
        let record: ActionRecord = serde_json::from_str(
            r#"{"key": "legacy", "description": "Old style.", "cost": 500, "impact": {"users": 10}}"#,
        )
        .expect("legacy record parses");
        assert_eq!(record.id.as_deref(), Some("legacy"));
        assert_eq!(record.narrative.as_deref(), Some("Old style."));
        assert_eq!(record.cost, Some(500.0));
        assert_eq!(record.effects.get("users"), Some(&10.0));
        assert!(record.costs.is_none());
    }

    #[test]
    fn content_file_accepts_list_and_wrapper() {
        let list: ContentFile<EventRecord> =
            serde_json::from_str(r#"[{"id": "a"}, {"id": "b"}]"#).expect("list parses");
        assert_eq!(list.into_entries().len(), 2);

        let wrapped: ContentFile<EventRecord> =
            serde_json::from_str(r#"{"version": 2, "entries": [{"id": "a"}]}"#)
                .expect("wrapper parses");
        assert_eq!(wrapped.into_entries().len(), 1);
    }

    #[test]
    fn pressure_curve_uses_snake_case() {
        let record: PressureRecord = serde_json::from_str(
            r#"{"metric": "team_morale", "curve": "shortfall", "threshold": 0.75, "weight": 0.15}"#,
        )
        .expect("pressure parses");
        assert_eq!(record.curve, PressureCurveRecord::Shortfall);
    }

    #[test]
    fn phase_defaults_when_absent() {
        let json = r#"{
            "version": "1.0",
            "saved_at_unix": 0,
            "turn": 3,
            "state": {
                "balance": 1, "monthly_revenue": 2, "monthly_expenses": 3, "users": 4,
                "growth_rate": 0.1, "churn_rate": 0.05, "product_quality": 50.0,
                "brand_awareness": 40.0, "team_morale": 60.0, "headcount": 5,
                "debt": 0, "turn": 3
            },
            "rng": {"seed": 42, "word_pos": 16}
        }"#;
        let record: SaveRecord = serde_json::from_str(json).expect("save parses");
        assert_eq!(record.phase, PhaseRecord::default());
        assert!(record.state.active_events.is_empty());
        assert_eq!(record.rng.word_pos, 16);
        assert!(record.ending.is_none());
        assert!(record.phase.action_limit.is_none());
    }

    #[test]
    fn resolution_risk_is_optional() {
        let record: ResolutionRecord =
            serde_json::from_str(r#"{"action_id": "team_offsite", "narrative": "Fun."}"#)
                .expect("resolution parses");
        assert!(record.risk.is_none());
    }
}
