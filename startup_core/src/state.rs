use std::collections::BTreeMap;

use startup_schema::{DeltaRecord, StateRecord};
use thiserror::Error;

use crate::{
    events::{decode_active_events, encode_active_events},
    fields::{FieldBounds, FieldKind, MetricField},
};

/// Resolved metric deltas. Keys are registry fields, so applying them
/// cannot fail part-way through.
pub type Deltas = BTreeMap<MetricField, f64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("unknown startup metric '{name}'")]
    UnknownField { name: String },
}

/// Resolve a name-keyed delta map against the field registry.
///
/// Every key is checked before anything is returned.
pub fn resolve_deltas(record: &DeltaRecord) -> Result<Deltas, StateError> {
    record
        .iter()
        .map(|(name, delta)| {
            MetricField::from_name(name)
                .map(|field| (field, *delta))
                .ok_or_else(|| StateError::UnknownField { name: name.clone() })
        })
        .collect()
}

pub fn negate(deltas: &Deltas) -> Deltas {
    deltas.iter().map(|(field, delta)| (*field, -delta)).collect()
}

const BASELINE_BALANCE: i64 = 500_000;
const BASELINE_MONTHLY_REVENUE: i64 = 45_000;
const BASELINE_MONTHLY_EXPENSES: i64 = 110_000;
const BASELINE_USERS: i64 = 1_500;
const BASELINE_HEADCOUNT: i64 = 18;
const BASELINE_DEBT: i64 = 0;
const BASELINE_PRODUCT_QUALITY: f64 = 60.0;
const BASELINE_BRAND_AWARENESS: f64 = 40.0;
const BASELINE_TEAM_MORALE: f64 = 70.0;
const BASELINE_GROWTH_RATE: f64 = 0.08;
const BASELINE_CHURN_RATE: f64 = 0.04;

/// The company being simulated.
///
/// Every mutating method finishes with [`StartupState::clamp_all`], so the
/// metrics always sit inside the bounds the state was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct StartupState {
    balance: i64,
    monthly_revenue: i64,
    monthly_expenses: i64,
    users: i64,
    headcount: i64,
    debt: i64,
    product_quality: f64,
    brand_awareness: f64,
    team_morale: f64,
    growth_rate: f64,
    churn_rate: f64,
    turn: u32,
    active_events: BTreeMap<String, u32>,
    bounds: FieldBounds,
}

impl Default for StartupState {
    fn default() -> Self {
        Self::new(FieldBounds::default())
    }
}

impl StartupState {
    pub fn new(bounds: FieldBounds) -> Self {
        let mut state = Self {
            balance: BASELINE_BALANCE,
            monthly_revenue: BASELINE_MONTHLY_REVENUE,
            monthly_expenses: BASELINE_MONTHLY_EXPENSES,
            users: BASELINE_USERS,
            headcount: BASELINE_HEADCOUNT,
            debt: BASELINE_DEBT,
            product_quality: BASELINE_PRODUCT_QUALITY,
            brand_awareness: BASELINE_BRAND_AWARENESS,
            team_morale: BASELINE_TEAM_MORALE,
            growth_rate: BASELINE_GROWTH_RATE,
            churn_rate: BASELINE_CHURN_RATE,
            turn: 1,
            active_events: BTreeMap::new(),
            bounds,
        };
        state.clamp_all();
        state
    }

    /// Rebuild a state from its persisted record. Malformed active-event
    /// entries are dropped and every metric is clamped.
    pub fn from_record(record: &StateRecord, bounds: FieldBounds) -> Self {
        let mut state = Self {
            balance: record.balance,
            monthly_revenue: record.monthly_revenue,
            monthly_expenses: record.monthly_expenses,
            users: record.users,
            headcount: record.headcount,
            debt: record.debt,
            product_quality: record.product_quality,
            brand_awareness: record.brand_awareness,
            team_morale: record.team_morale,
            growth_rate: record.growth_rate,
            churn_rate: record.churn_rate,
            turn: record.turn,
            active_events: decode_active_events(&record.active_events),
            bounds,
        };
        state.clamp_all();
        state
    }

    pub fn to_record(&self) -> StateRecord {
        StateRecord {
            balance: self.balance,
            monthly_revenue: self.monthly_revenue,
            monthly_expenses: self.monthly_expenses,
            users: self.users,
            growth_rate: self.growth_rate,
            churn_rate: self.churn_rate,
            product_quality: self.product_quality,
            brand_awareness: self.brand_awareness,
            team_morale: self.team_morale,
            headcount: self.headcount,
            debt: self.debt,
            turn: self.turn,
            active_events: encode_active_events(&self.active_events),
        }
    }

    pub fn bounds(&self) -> &FieldBounds {
        &self.bounds
    }

    pub fn get(&self, field: MetricField) -> f64 {
        match field {
            MetricField::Balance => self.balance as f64,
            MetricField::MonthlyRevenue => self.monthly_revenue as f64,
            MetricField::MonthlyExpenses => self.monthly_expenses as f64,
            MetricField::Users => self.users as f64,
            MetricField::Headcount => self.headcount as f64,
            MetricField::Debt => self.debt as f64,
            MetricField::ProductQuality => self.product_quality,
            MetricField::BrandAwareness => self.brand_awareness,
            MetricField::TeamMorale => self.team_morale,
            MetricField::GrowthRate => self.growth_rate,
            MetricField::ChurnRate => self.churn_rate,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn monthly_revenue(&self) -> i64 {
        self.monthly_revenue
    }

    pub fn monthly_expenses(&self) -> i64 {
        self.monthly_expenses
    }

    pub fn users(&self) -> i64 {
        self.users
    }

    pub fn headcount(&self) -> i64 {
        self.headcount
    }

    pub fn debt(&self) -> i64 {
        self.debt
    }

    pub fn product_quality(&self) -> f64 {
        self.product_quality
    }

    pub fn brand_awareness(&self) -> f64 {
        self.brand_awareness
    }

    pub fn team_morale(&self) -> f64 {
        self.team_morale
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn churn_rate(&self) -> f64 {
        self.churn_rate
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn active_events(&self) -> &BTreeMap<String, u32> {
        &self.active_events
    }

    pub(crate) fn active_events_mut(&mut self) -> &mut BTreeMap<String, u32> {
        &mut self.active_events
    }

    /// Overwrite one metric, then clamp.
    pub fn set(&mut self, field: MetricField, value: f64) {
        self.write(field, value);
        self.clamp_all();
    }

    pub fn with(mut self, field: MetricField, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }

    pub(crate) fn advance_turn(&mut self) {
        self.turn = self.turn.saturating_add(1);
    }

    /// Add every delta (integer metrics are rounded to the nearest whole
    /// unit) and clamp.
    pub fn apply_deltas(&mut self, deltas: &Deltas) {
        for (field, delta) in deltas {
            let next = self.get(*field) + delta;
            self.write(*field, next);
        }
        self.clamp_all();
    }

    /// Name-keyed variant of [`StartupState::apply_deltas`]. Fails without
    /// touching the state if any name is not a registered metric.
    pub fn apply_named_deltas(&mut self, deltas: &DeltaRecord) -> Result<(), StateError> {
        let resolved = resolve_deltas(deltas)?;
        self.apply_deltas(&resolved);
        Ok(())
    }

    /// Clamp every metric into its bound. Idempotent.
    pub fn clamp_all(&mut self) {
        for field in MetricField::ALL {
            let bound = self.bounds.get(field);
            let current = self.get(field);
            let clamped = bound.clamp(current);
            if clamped != current {
                self.write(field, clamped);
            }
        }
    }

    /// Whole months the balance covers at the current expense rate; 0 when
    /// there is no burn.
    pub fn runway_months(&self) -> i64 {
        if self.monthly_expenses <= 0 {
            return 0;
        }
        (self.balance / self.monthly_expenses).max(0)
    }

    fn write(&mut self, field: MetricField, value: f64) {
        let whole = || value.round() as i64;
        match field {
            MetricField::Balance => self.balance = whole(),
            MetricField::MonthlyRevenue => self.monthly_revenue = whole(),
            MetricField::MonthlyExpenses => self.monthly_expenses = whole(),
            MetricField::Users => self.users = whole(),
            MetricField::Headcount => self.headcount = whole(),
            MetricField::Debt => self.debt = whole(),
            MetricField::ProductQuality => self.product_quality = value,
            MetricField::BrandAwareness => self.brand_awareness = value,
            MetricField::TeamMorale => self.team_morale = value,
            MetricField::GrowthRate => self.growth_rate = value,
            MetricField::ChurnRate => self.churn_rate = value,
        }
        debug_assert!(field.kind() != FieldKind::Integer || self.get(field).fract() == 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Bound;

    fn named(pairs: &[(&str, f64)]) -> DeltaRecord {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn baseline_matches_reference_company() {
        let state = StartupState::default();
        assert_eq!(state.balance(), 500_000);
        assert_eq!(state.monthly_revenue(), 45_000);
        assert_eq!(state.monthly_expenses(), 110_000);
        assert_eq!(state.headcount(), 18);
        assert_eq!(state.turn(), 1);
        assert!(state.active_events().is_empty());
    }

    #[test]
    fn integer_deltas_round_to_nearest() {
        let mut state = StartupState::default().with(MetricField::Users, 100.0);
        state.apply_named_deltas(&named(&[("users", 2.6)])).unwrap();
        assert_eq!(state.users(), 103);
        state.apply_named_deltas(&named(&[("users", -0.4)])).unwrap();
        assert_eq!(state.users(), 103);
    }

    #[test]
    fn deltas_clamp_into_bounds() {
        let mut state = StartupState::default();
        state
            .apply_named_deltas(&named(&[
                ("product_quality", 150.0),
                ("balance", -10_000_000.0),
                ("churn_rate", 3.0),
                ("team_morale", -500.0),
            ]))
            .unwrap();
        assert_eq!(state.product_quality(), 100.0);
        assert_eq!(state.balance(), 0);
        assert_eq!(state.churn_rate(), 1.0);
        assert_eq!(state.team_morale(), 0.0);
    }

    #[test]
    fn unknown_field_aborts_without_mutation() {
        let mut state = StartupState::default();
        let before = state.clone();
        let err = state
            .apply_named_deltas(&named(&[("balance", 1_000.0), ("bug_rate", 1.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::UnknownField {
                name: "bug_rate".to_string()
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn clamp_is_idempotent() {
        let bounds = FieldBounds::default().with(MetricField::Headcount, Bound::new(2.0, Some(40.0)));
        let mut state = StartupState::new(bounds).with(MetricField::Headcount, 90.0);
        state.clamp_all();
        let once = state.clone();
        state.clamp_all();
        assert_eq!(state, once);
        assert_eq!(state.headcount(), 40);
    }

    #[test]
    fn runway_uses_integer_division() {
        let state = StartupState::default()
            .with(MetricField::Balance, 25_000.0)
            .with(MetricField::MonthlyExpenses, 5_000.0);
        assert_eq!(state.runway_months(), 5);

        let state = state.with(MetricField::Balance, 9_999.0).with(MetricField::MonthlyExpenses, 3_000.0);
        assert_eq!(state.runway_months(), 3);

        let no_burn = state.with(MetricField::MonthlyExpenses, 0.0);
        assert_eq!(no_burn.runway_months(), 0);
    }

    #[test]
    fn record_round_trip_preserves_metrics_and_events() {
        let mut state = StartupState::default()
            .with(MetricField::Balance, 750_000.0)
            .with_turn(5);
        state.active_events_mut().insert("server_crash".to_string(), 2);
        let restored = StartupState::from_record(&state.to_record(), FieldBounds::default());
        assert_eq!(restored, state);
    }

    #[test]
    fn from_record_clamps_out_of_range_values() {
        let mut record = StartupState::default().to_record();
        record.team_morale = 180.0;
        record.balance = -20;
        record.active_events = vec!["bad".to_string(), "pr_boost:1".to_string()];
        let state = StartupState::from_record(&record, FieldBounds::default());
        assert_eq!(state.team_morale(), 100.0);
        assert_eq!(state.balance(), 0);
        assert_eq!(state.active_events().len(), 1);
    }
}
