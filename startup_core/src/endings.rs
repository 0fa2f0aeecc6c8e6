use serde::{Deserialize, Serialize};

use crate::{config::TuningConfig, state::StartupState, valuation::compute_valuation};

/// Terminal outcomes, in the priority order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndingKind {
    Bankruptcy,
    TeamCollapse,
    TriumphantExit,
    OutOfRunway,
    JourneyComplete,
}

impl EndingKind {
    pub const PRIORITY: [EndingKind; 5] = [
        EndingKind::Bankruptcy,
        EndingKind::TeamCollapse,
        EndingKind::TriumphantExit,
        EndingKind::OutOfRunway,
        EndingKind::JourneyComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndingKind::Bankruptcy => "bankruptcy",
            EndingKind::TeamCollapse => "team_collapse",
            EndingKind::TriumphantExit => "triumphant_exit",
            EndingKind::OutOfRunway => "out_of_runway",
            EndingKind::JourneyComplete => "journey_complete",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        Self::PRIORITY
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
    }

    pub fn title(&self) -> &'static str {
        match self {
            EndingKind::Bankruptcy => "Bankruptcy",
            EndingKind::TeamCollapse => "Team Collapse",
            EndingKind::TriumphantExit => "Triumphant Exit",
            EndingKind::OutOfRunway => "Out of Runway",
            EndingKind::JourneyComplete => "Journey Complete",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EndingKind::Bankruptcy => "The bank account hit zero and the lights went out.",
            EndingKind::TeamCollapse => "Morale cratered and the team walked out the door.",
            EndingKind::TriumphantExit => {
                "A strategic buyer acquires the company at a headline valuation."
            }
            EndingKind::OutOfRunway => {
                "Cash is nearly gone, the burn keeps climbing and no one will fund the gap."
            }
            EndingKind::JourneyComplete => {
                "The company survived its first years and lives on to write the next chapter."
            }
        }
    }
}

/// First matching ending, or `None` while the game continues.
pub fn check_endings(state: &StartupState, tuning: &TuningConfig) -> Option<EndingKind> {
    let thresholds = tuning.endings();
    let ending = EndingKind::PRIORITY.into_iter().find(|kind| match kind {
        EndingKind::Bankruptcy => state.balance() <= 0,
        EndingKind::TeamCollapse => state.team_morale() <= thresholds.morale_collapse,
        EndingKind::TriumphantExit => {
            compute_valuation(state, tuning.valuation()) > thresholds.exit_valuation
                && state.brand_awareness() > thresholds.exit_brand_awareness
        }
        EndingKind::OutOfRunway => {
            state.runway_months() <= thresholds.runway_alert_months
                && state.monthly_expenses() > state.monthly_revenue()
                && state.balance() < thresholds.low_cash
        }
        EndingKind::JourneyComplete => state.turn() > thresholds.max_turns,
    });

    if let Some(kind) = ending {
        tracing::info!(
            target: "startup_sim::endings",
            ending = kind.as_str(),
            turn = state.turn(),
            "ending.reached"
        );
    }
    ending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::MetricField;

    fn tuning() -> TuningConfig {
        (*TuningConfig::builtin()).clone()
    }

    #[test]
    fn zero_balance_is_bankruptcy() {
        let state = StartupState::default()
            .with(MetricField::Balance, 0.0)
            .with(MetricField::TeamMorale, 1.0);
        assert_eq!(check_endings(&state, &tuning()), Some(EndingKind::Bankruptcy));
    }

    #[test]
    fn morale_threshold_is_inclusive() {
        let state = StartupState::default().with(MetricField::TeamMorale, 5.0);
        assert_eq!(check_endings(&state, &tuning()), Some(EndingKind::TeamCollapse));
        let state = state.with(MetricField::TeamMorale, 5.5);
        assert_eq!(check_endings(&state, &tuning()), None);
    }

    #[test]
    fn exit_needs_value_and_awareness() {
        let rich = StartupState::default()
            .with(MetricField::Balance, 6_000_000.0)
            .with(MetricField::BrandAwareness, 70.0);
        assert_eq!(check_endings(&rich, &tuning()), None);
        let famous = rich.with(MetricField::BrandAwareness, 71.0);
        assert_eq!(
            check_endings(&famous, &tuning()),
            Some(EndingKind::TriumphantExit)
        );
    }

    #[test]
    fn out_of_runway_requires_burn_and_low_cash() {
        let state = StartupState::default().with(MetricField::Balance, 90_000.0);
        assert_eq!(check_endings(&state, &tuning()), Some(EndingKind::OutOfRunway));

        let profitable = state.clone().with(MetricField::MonthlyRevenue, 120_000.0);
        assert_eq!(check_endings(&profitable, &tuning()), None);
    }

    #[test]
    fn journey_completes_after_max_turns() {
        let state = StartupState::default().with_turn(36);
        assert_eq!(check_endings(&state, &tuning()), None);
        let state = state.with_turn(37);
        assert_eq!(
            check_endings(&state, &tuning()),
            Some(EndingKind::JourneyComplete)
        );
    }

    #[test]
    fn ending_names_round_trip() {
        for kind in EndingKind::PRIORITY {
            assert_eq!(EndingKind::from_name(kind.as_str()), Some(kind));
        }
        insta::assert_snapshot!(EndingKind::OutOfRunway.title(), @"Out of Runway");
    }
}
