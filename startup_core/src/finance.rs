use serde::Serialize;

use crate::{
    config::EconomyTickConfig,
    fields::MetricField,
    rng::RollSource,
    state::{Deltas, StartupState},
};

/// Cash-flow view of the company at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinancialSnapshot {
    pub balance: i64,
    pub monthly_revenue: i64,
    pub monthly_expenses: i64,
    /// `revenue - expenses`; negative while burning.
    pub net: i64,
    /// `max(0, expenses - revenue)`.
    pub burn: i64,
    pub runway_months: i64,
}

impl FinancialSnapshot {
    pub fn capture(state: &StartupState) -> Self {
        let net = state.monthly_revenue() - state.monthly_expenses();
        Self {
            balance: state.balance(),
            monthly_revenue: state.monthly_revenue(),
            monthly_expenses: state.monthly_expenses(),
            net,
            burn: (-net).max(0),
            runway_months: state.runway_months(),
        }
    }
}

/// Close the month: bank the net cash flow and move the user base by
/// growth minus churn. With the economy tick enabled, revenue and expenses
/// then drift by one draw each (revenue first).
///
/// Returns the snapshot of the month that was settled, with the runway as
/// it stands afterwards.
pub fn settle_month(
    state: &mut StartupState,
    economy: &EconomyTickConfig,
    rng: &mut impl RollSource,
) -> FinancialSnapshot {
    let net = state.monthly_revenue() - state.monthly_expenses();
    let user_change = (state.users() as f64 * (state.growth_rate() - state.churn_rate())).round();
    state.apply_deltas(&Deltas::from([
        (MetricField::Balance, net as f64),
        (MetricField::Users, user_change),
    ]));

    if economy.enabled {
        let revenue_factor = 1.0 + draw_in(rng, economy.revenue_variance);
        let expense_factor = 1.0 + draw_in(rng, economy.expense_variance);
        state.set(
            MetricField::MonthlyRevenue,
            state.monthly_revenue() as f64 * revenue_factor,
        );
        state.set(
            MetricField::MonthlyExpenses,
            state.monthly_expenses() as f64 * expense_factor,
        );
        tracing::debug!(
            target: "startup_sim::finance",
            revenue_factor,
            expense_factor,
            "finance.economy_tick"
        );
    }

    let snapshot = FinancialSnapshot {
        net,
        burn: (-net).max(0),
        ..FinancialSnapshot::capture(state)
    };
    tracing::info!(
        target: "startup_sim::finance",
        balance = snapshot.balance,
        net = snapshot.net,
        runway = snapshot.runway_months,
        "finance.settled"
    );
    snapshot
}

fn draw_in(rng: &mut impl RollSource, (low, high): (f64, f64)) -> f64 {
    low + rng.roll() * (high - low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;

    #[test]
    fn settlement_banks_net_and_grows_users() {
        let mut state = StartupState::default();
        let mut rolls = ScriptedRolls::new([]);
        let snapshot = settle_month(&mut state, &EconomyTickConfig::default(), &mut rolls);
        assert_eq!(state.balance(), 435_000);
        assert_eq!(state.users(), 1_560);
        assert_eq!(snapshot.net, -65_000);
        assert_eq!(snapshot.burn, 65_000);
        assert_eq!(snapshot.runway_months, 3);
        assert_eq!(rolls.consumed(), 0);
    }

    #[test]
    fn profitable_company_has_no_burn() {
        let state = StartupState::default()
            .with(MetricField::MonthlyRevenue, 200_000.0)
            .with(MetricField::MonthlyExpenses, 150_000.0);
        let snapshot = FinancialSnapshot::capture(&state);
        assert_eq!(snapshot.net, 50_000);
        assert_eq!(snapshot.burn, 0);
    }

    #[test]
    fn balance_never_goes_negative() {
        let mut state = StartupState::default().with(MetricField::Balance, 10_000.0);
        settle_month(&mut state, &EconomyTickConfig::default(), &mut ScriptedRolls::new([]));
        assert_eq!(state.balance(), 0);
    }

    #[test]
    fn economy_tick_draws_revenue_then_expenses() {
        let economy = EconomyTickConfig {
            enabled: true,
            revenue_variance: (-0.1, 0.1),
            expense_variance: (0.0, 0.2),
        };
        let mut state = StartupState::default();
        let mut rolls = ScriptedRolls::new([1.0, 0.5]);
        settle_month(&mut state, &economy, &mut rolls);
        assert_eq!(rolls.consumed(), 2);
        assert_eq!(state.monthly_revenue(), 49_500);
        assert_eq!(state.monthly_expenses(), 121_000);
    }
}
