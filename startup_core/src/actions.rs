use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    content::{ActionCatalog, ActionDefinition},
    rng::RollSource,
    state::{negate, StartupState},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("unknown action '{id}'")]
    UnknownAction { id: String },
    #[error("cannot afford '{id}': it costs {cost} but only {balance} is in the bank")]
    InsufficientFunds { id: String, cost: f64, balance: i64 },
    #[error("only {limit} actions may be taken per turn")]
    LimitExceeded { limit: u32 },
    #[error("'{id}' may only be taken {cap} time(s) per turn")]
    ActionCap { id: String, cap: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskOutcome {
    Success,
    Failure,
}

impl RiskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskOutcome::Success => "success",
            RiskOutcome::Failure => "failure",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "success" => Some(RiskOutcome::Success),
            "failure" => Some(RiskOutcome::Failure),
            _ => None,
        }
    }
}

/// Result of one resolved action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResolution {
    pub action_id: String,
    pub narrative: String,
    pub risk: Option<RiskOutcome>,
}

pub fn is_affordable(state: &StartupState, action: &ActionDefinition) -> bool {
    match action.balance_cost() {
        Some(cost) => (state.balance() as f64) >= cost,
        None => true,
    }
}

/// Actions whose declared balance cost is covered, by display name then id.
pub fn list_affordable<'a>(
    state: &StartupState,
    catalog: &'a ActionCatalog,
) -> Vec<&'a ActionDefinition> {
    let mut affordable: Vec<&ActionDefinition> = catalog
        .iter()
        .filter(|action| is_affordable(state, action))
        .collect();
    affordable.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    affordable
}

/// Check that taking `action` once more keeps the turn inside both the
/// global limit and the action's own cap.
pub fn validate_selection_limit(
    selections_so_far: u32,
    per_action: &BTreeMap<String, u32>,
    action: &ActionDefinition,
    turn_limit: u32,
) -> Result<(), ActionError> {
    if selections_so_far.saturating_add(1) > turn_limit {
        return Err(ActionError::LimitExceeded { limit: turn_limit });
    }
    if let Some(cap) = action.max_per_turn {
        let taken = per_action.get(&action.id).copied().unwrap_or(0);
        if taken.saturating_add(1) > cap {
            return Err(ActionError::ActionCap {
                id: action.id.clone(),
                cap,
            });
        }
    }
    Ok(())
}

/// Resolve one action: pay costs, apply effects, then roll the risk branch
/// if there is one. A risk succeeds only when the draw is strictly below
/// the success chance.
///
/// Nothing is applied when the id is unknown or the balance cost is not
/// covered.
pub fn apply_action(
    state: &mut StartupState,
    catalog: &ActionCatalog,
    id: &str,
    rng: &mut impl RollSource,
) -> Result<ActionResolution, ActionError> {
    let action = catalog.get(id).ok_or_else(|| ActionError::UnknownAction {
        id: id.to_string(),
    })?;

    if let Some(cost) = action.balance_cost() {
        if (state.balance() as f64) < cost {
            return Err(ActionError::InsufficientFunds {
                id: action.id.clone(),
                cost,
                balance: state.balance(),
            });
        }
    }

    state.apply_deltas(&negate(&action.costs));
    state.apply_deltas(&action.effects);

    let mut parts = vec![action.narrative.as_str()];
    let mut outcome = None;
    if let Some(risk) = &action.risk {
        let roll = rng.roll();
        let (branch, result) = if roll < risk.success_chance {
            (&risk.success, RiskOutcome::Success)
        } else {
            (&risk.failure, RiskOutcome::Failure)
        };
        tracing::debug!(
            target: "startup_sim::actions",
            action = %action.id,
            roll,
            chance = risk.success_chance,
            success = result == RiskOutcome::Success,
            "action.risk_roll"
        );
        state.apply_deltas(&branch.effects);
        parts.push(branch.narrative.as_str());
        outcome = Some(result);
    }
    state.clamp_all();

    let narrative = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    tracing::info!(target: "startup_sim::actions", action = %action.id, "action.resolved");
    Ok(ActionResolution {
        action_id: action.id.clone(),
        narrative,
        risk: outcome,
    })
}
