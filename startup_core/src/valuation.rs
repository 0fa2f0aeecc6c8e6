use crate::{config::ValuationWeights, fields::MetricField, state::StartupState};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Heuristic company worth in whole dollars, never negative.
///
/// Cash, annualised revenue, the user base, the averaged qualitative scores
/// and headcount add value; bug pressure (the shortfall of product quality
/// inside its bound), annualised expenses and debt take it away.
pub fn compute_valuation(state: &StartupState, weights: &ValuationWeights) -> i64 {
    let annual_revenue = state.monthly_revenue() as f64 * MONTHS_PER_YEAR;
    let annual_expenses = state.monthly_expenses() as f64 * MONTHS_PER_YEAR;
    let qualitative =
        (state.product_quality() + state.brand_awareness() + state.team_morale()) / 3.0;
    let bug_rate = 1.0 - quality_ratio(state);

    let value = weights.cash * state.balance() as f64
        + weights.revenue * annual_revenue
        + weights.market_share * state.users() as f64
        + weights.reputation * qualitative
        + weights.team_size * state.headcount() as f64
        + weights.bug_rate * bug_rate
        - weights.expense * annual_expenses
        - state.debt() as f64;

    if value.is_finite() {
        value.round().max(0.0) as i64
    } else {
        0
    }
}

fn quality_ratio(state: &StartupState) -> f64 {
    state
        .bounds()
        .get(MetricField::ProductQuality)
        .normalize(state.product_quality())
        .unwrap_or_else(|| (state.product_quality() / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profitable() -> StartupState {
        StartupState::default()
            .with(MetricField::Balance, 1_000_000.0)
            .with(MetricField::MonthlyRevenue, 100_000.0)
            .with(MetricField::MonthlyExpenses, 50_000.0)
            .with(MetricField::Users, 10_000.0)
            .with(MetricField::Headcount, 10.0)
            .with(MetricField::ProductQuality, 75.0)
            .with(MetricField::BrandAwareness, 60.0)
            .with(MetricField::TeamMorale, 90.0)
    }

    #[test]
    fn weighted_sum_matches_hand_computation() {
        // 1_000_000 + 1_320_000 + 300_000 + 75_000 + 20_000 - 50_000 - 630_000
        assert_eq!(
            compute_valuation(&profitable(), &ValuationWeights::default()),
            2_035_000
        );
    }

    #[test]
    fn debt_reduces_value() {
        let leveraged = profitable().with(MetricField::Debt, 500_000.0);
        assert_eq!(
            compute_valuation(&leveraged, &ValuationWeights::default()),
            1_535_000
        );
    }

    #[test]
    fn valuation_is_floored_at_zero() {
        let broke = StartupState::default()
            .with(MetricField::Balance, 0.0)
            .with(MetricField::MonthlyExpenses, 900_000.0)
            .with(MetricField::Debt, 2_000_000.0);
        assert_eq!(compute_valuation(&broke, &ValuationWeights::default()), 0);
    }
}
