use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

use crate::fields::{Bound, FieldBounds, FieldKind, MetricField};

pub const BUILTIN_TUNING_CONFIG: &str = include_str!("data/tuning_config.json");
pub const TUNING_CONFIG_ENV: &str = "STARTUP_TUNING_CONFIG_PATH";

/// Balancing knobs for a session. Loaded once and shared read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    default_seed: u64,
    actions: ActionLimitConfig,
    event_probability_weight: f64,
    valuation: ValuationWeights,
    endings: EndingThresholds,
    economy: EconomyTickConfig,
    bounds: FieldBoundsTable,
    #[serde(skip)]
    resolved_bounds: FieldBounds,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            default_seed: 42,
            actions: ActionLimitConfig::default(),
            event_probability_weight: 0.35,
            valuation: ValuationWeights::default(),
            endings: EndingThresholds::default(),
            economy: EconomyTickConfig::default(),
            bounds: FieldBoundsTable::default(),
            resolved_bounds: FieldBounds::default(),
        }
    }
}

impl TuningConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            Self::from_json_str(BUILTIN_TUNING_CONFIG).expect("builtin tuning config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, TuningConfigError> {
        let mut config: TuningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TuningConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| TuningConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn default_seed(&self) -> u64 {
        self.default_seed
    }

    pub fn actions(&self) -> &ActionLimitConfig {
        &self.actions
    }

    pub fn event_probability_weight(&self) -> f64 {
        self.event_probability_weight
    }

    pub fn valuation(&self) -> &ValuationWeights {
        &self.valuation
    }

    pub fn endings(&self) -> &EndingThresholds {
        &self.endings
    }

    pub fn economy(&self) -> &EconomyTickConfig {
        &self.economy
    }

    pub fn field_bounds(&self) -> FieldBounds {
        self.resolved_bounds
    }

    pub fn with_event_probability_weight(mut self, weight: f64) -> Self {
        self.event_probability_weight = weight.max(0.0);
        self
    }

    pub fn with_endings(mut self, endings: EndingThresholds) -> Self {
        self.endings = endings;
        self
    }

    pub fn with_economy(mut self, economy: EconomyTickConfig) -> Self {
        self.economy = economy;
        self
    }

    fn validate(&mut self) -> Result<(), TuningConfigError> {
        self.resolved_bounds = self.bounds.resolve()?;
        self.actions.validate()?;
        if self.event_probability_weight < 0.0 {
            return Err(TuningConfigError::InvalidRange {
                name: "event_probability_weight".to_string(),
            });
        }
        self.economy.validate()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum TuningConfigError {
    #[error("failed to parse tuning config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read tuning config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no {kind} bound declared for metric '{name}'")]
    MissingBound { name: String, kind: &'static str },
    #[error("invalid bound for '{name}': {reason}")]
    InvalidBound { name: String, reason: String },
    #[error("invalid range for '{name}'")]
    InvalidRange { name: String },
}

/// Per-turn action allowance and the hard range any override is clamped into.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionLimitConfig {
    default_per_turn: u32,
    min_per_turn: u32,
    max_per_turn: u32,
}

impl Default for ActionLimitConfig {
    fn default() -> Self {
        Self {
            default_per_turn: 2,
            min_per_turn: 1,
            max_per_turn: 3,
        }
    }
}

impl ActionLimitConfig {
    pub fn default_per_turn(&self) -> u32 {
        self.clamp_limit(None)
    }

    pub fn range(&self) -> (u32, u32) {
        (self.min_per_turn, self.max_per_turn)
    }

    /// Clamp a requested per-turn limit (or the default) into the range.
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_per_turn)
            .clamp(self.min_per_turn, self.max_per_turn)
    }

    fn validate(&self) -> Result<(), TuningConfigError> {
        if self.min_per_turn == 0 || self.min_per_turn > self.max_per_turn {
            return Err(TuningConfigError::InvalidRange {
                name: "actions".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValuationWeights {
    pub cash: f64,
    pub revenue: f64,
    pub market_share: f64,
    pub reputation: f64,
    pub team_size: f64,
    pub bug_rate: f64,
    pub expense: f64,
}

impl Default for ValuationWeights {
    fn default() -> Self {
        Self {
            cash: 1.0,
            revenue: 1.1,
            market_share: 30.0,
            reputation: 1_000.0,
            team_size: 2_000.0,
            bug_rate: -200_000.0,
            expense: 1.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndingThresholds {
    pub morale_collapse: f64,
    pub exit_valuation: i64,
    pub exit_brand_awareness: f64,
    pub runway_alert_months: i64,
    pub low_cash: i64,
    pub max_turns: u32,
}

impl Default for EndingThresholds {
    fn default() -> Self {
        Self {
            morale_collapse: 5.0,
            exit_valuation: 5_000_000,
            exit_brand_awareness: 70.0,
            runway_alert_months: 1,
            low_cash: 100_000,
            max_turns: 36,
        }
    }
}

/// Optional multiplicative jitter on revenue and expenses at settlement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EconomyTickConfig {
    pub enabled: bool,
    pub revenue_variance: (f64, f64),
    pub expense_variance: (f64, f64),
}

impl Default for EconomyTickConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            revenue_variance: (-0.01, 0.015),
            expense_variance: (-0.008, 0.012),
        }
    }
}

impl EconomyTickConfig {
    fn validate(&self) -> Result<(), TuningConfigError> {
        for (name, (low, high)) in [
            ("economy.revenue_variance", self.revenue_variance),
            ("economy.expense_variance", self.expense_variance),
        ] {
            if low > high || low <= -1.0 {
                return Err(TuningConfigError::InvalidRange {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntegerBound {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeBound {
    pub min: f64,
    pub max: f64,
}

/// Declared bound tables, one per field kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldBoundsTable {
    integer: BTreeMap<String, IntegerBound>,
    percent: BTreeMap<String, RangeBound>,
    rate: BTreeMap<String, RangeBound>,
}

impl Default for FieldBoundsTable {
    fn default() -> Self {
        let mut table = Self {
            integer: BTreeMap::new(),
            percent: BTreeMap::new(),
            rate: BTreeMap::new(),
        };
        for field in MetricField::ALL {
            let name = field.name().to_string();
            match field.kind() {
                FieldKind::Integer => {
                    table.integer.insert(name, IntegerBound { min: 0, max: None });
                }
                FieldKind::Percent => {
                    table.percent.insert(name, RangeBound { min: 0.0, max: 100.0 });
                }
                FieldKind::Rate => {
                    table.rate.insert(name, RangeBound { min: 0.0, max: 1.0 });
                }
            }
        }
        table
    }
}

impl FieldBoundsTable {
    /// Check the tables against the field registry and build the lookup.
    pub fn resolve(&self) -> Result<FieldBounds, TuningConfigError> {
        let mut resolved = FieldBounds::default();

        let mut declared: Vec<(&String, FieldKind, Bound)> = Vec::new();
        for (name, bound) in &self.integer {
            if let Some(max) = bound.max {
                if max < bound.min {
                    return Err(invalid_bound(name, "max is below min"));
                }
            }
            declared.push((
                name,
                FieldKind::Integer,
                Bound::new(bound.min as f64, bound.max.map(|max| max as f64)),
            ));
        }
        for (kind, table) in [(FieldKind::Percent, &self.percent), (FieldKind::Rate, &self.rate)] {
            for (name, bound) in table {
                if bound.max < bound.min {
                    return Err(invalid_bound(name, "max is below min"));
                }
                declared.push((name, kind, Bound::new(bound.min, Some(bound.max))));
            }
        }

        for (name, kind, bound) in declared {
            let field = MetricField::from_name(name)
                .ok_or_else(|| invalid_bound(name, "not a startup metric"))?;
            if field.kind() != kind {
                return Err(invalid_bound(
                    name,
                    &format!("declared as {} but the metric is {}", kind.as_str(), field.kind().as_str()),
                ));
            }
            resolved.set(field, bound);
        }

        for field in MetricField::ALL {
            let present = match field.kind() {
                FieldKind::Integer => self.integer.contains_key(field.name()),
                FieldKind::Percent => self.percent.contains_key(field.name()),
                FieldKind::Rate => self.rate.contains_key(field.name()),
            };
            if !present {
                return Err(TuningConfigError::MissingBound {
                    name: field.name().to_string(),
                    kind: field.kind().as_str(),
                });
            }
        }

        Ok(resolved)
    }
}

fn invalid_bound(name: &str, reason: &str) -> TuningConfigError {
    TuningConfigError::InvalidBound {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolve the tuning config: explicit path, then the environment override,
/// then the builtin. Files that fail to load are logged and skipped.
pub fn load_tuning_config(path: Option<&Path>) -> Arc<TuningConfig> {
    let candidate = path
        .map(Path::to_path_buf)
        .or_else(|| env::var(TUNING_CONFIG_ENV).ok().map(PathBuf::from));

    if let Some(path) = candidate {
        match TuningConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "startup_sim::config",
                    path = %path.display(),
                    "tuning_config.loaded=file"
                );
                return Arc::new(config);
            }
            Err(err) => {
                tracing::warn!(
                    target: "startup_sim::config",
                    path = %path.display(),
                    error = %err,
                    "tuning_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "startup_sim::config", "tuning_config.loaded=builtin");
    TuningConfig::builtin()
}
