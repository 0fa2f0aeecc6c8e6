use serde::Serialize;

use crate::{
    config::ValuationWeights, finance::FinancialSnapshot, state::StartupState,
    valuation::compute_valuation,
};

/// Read-only dashboard figures for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyMetrics {
    pub turn: u32,
    pub valuation: i64,
    pub finances: FinancialSnapshot,
    pub users: i64,
    pub headcount: i64,
    pub debt: i64,
    pub product_quality: f64,
    pub brand_awareness: f64,
    pub team_morale: f64,
    pub active_events: Vec<(String, u32)>,
}

pub fn collect_metrics(state: &StartupState, weights: &ValuationWeights) -> CompanyMetrics {
    CompanyMetrics {
        turn: state.turn(),
        valuation: compute_valuation(state, weights),
        finances: FinancialSnapshot::capture(state),
        users: state.users(),
        headcount: state.headcount(),
        debt: state.debt(),
        product_quality: state.product_quality(),
        brand_awareness: state.brand_awareness(),
        team_morale: state.team_morale(),
        active_events: state
            .active_events()
            .iter()
            .map(|(id, remaining)| (id.clone(), *remaining))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_reflect_state() {
        let mut state = StartupState::default().with_turn(4);
        state.active_events_mut().insert("pr_boost".to_string(), 1);
        let metrics = collect_metrics(&state, &ValuationWeights::default());
        assert_eq!(metrics.turn, 4);
        assert_eq!(metrics.finances.burn, 65_000);
        assert_eq!(metrics.active_events, vec![("pr_boost".to_string(), 1)]);
        assert_eq!(metrics.valuation, 0);
    }
}
