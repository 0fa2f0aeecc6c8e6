//! Turn-resolution engine for the startup simulator.
//!
//! A [`GameSession`] owns one company's [`StartupState`] and its random
//! stream. Each turn ticks and triggers events, resolves the player's chosen
//! actions, settles the month's finances and checks for an ending. Content
//! (actions, events, starting profiles) and balancing knobs are loaded once
//! into immutable values and shared behind `Arc`.

pub mod actions;
pub mod config;
pub mod content;
pub mod endings;
pub mod events;
pub mod fields;
pub mod finance;
pub mod hashing;
pub mod metrics;
pub mod persistence;
pub mod profiles;
pub mod rng;
pub mod session;
pub mod state;
pub mod valuation;

pub use actions::{ActionError, ActionResolution, RiskOutcome};
pub use config::{load_tuning_config, TuningConfig, TuningConfigError};
pub use content::{
    ActionCatalog, ActionDefinition, ContentLoadError, ContentRegistry, DefinitionError,
    EventCatalog, EventDefinition,
};
pub use endings::{check_endings, EndingKind};
pub use events::EventError;
pub use fields::{Bound, FieldBounds, FieldKind, MetricField};
pub use finance::FinancialSnapshot;
pub use metrics::CompanyMetrics;
pub use persistence::{load_from_path, save_to_path, PersistenceError};
pub use profiles::{ProfileCatalog, StartProfile};
pub use rng::{RollSource, ScriptedRolls, SessionRng};
pub use session::{GameSession, SessionError, TurnPhase, TurnReport};
pub use state::{Deltas, StartupState, StateError};
pub use valuation::compute_valuation;
