use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    content::{EventCatalog, EventDefinition},
    rng::RollSource,
    state::StartupState,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("unknown event '{id}'")]
    UnknownEvent { id: String },
}

/// Persisted form of the active-event table: `id:remaining` per entry,
/// ordered by id.
pub fn encode_active_events(active: &BTreeMap<String, u32>) -> Vec<String> {
    active
        .iter()
        .map(|(id, remaining)| format!("{id}:{remaining}"))
        .collect()
}

/// Inverse of [`encode_active_events`]. Entries without a separator, with an
/// empty id, or with a remaining count that is not a positive integer are
/// discarded.
pub fn decode_active_events(entries: &[String]) -> BTreeMap<String, u32> {
    let mut active = BTreeMap::new();
    for entry in entries {
        let Some((id, remaining)) = entry.rsplit_once(':') else {
            tracing::debug!(target: "startup_sim::events", entry = %entry, "event.decode_skipped");
            continue;
        };
        let id = id.trim();
        match remaining.trim().parse::<u32>() {
            Ok(remaining) if remaining > 0 && !id.is_empty() => {
                active.insert(id.to_string(), remaining);
            }
            _ => {
                tracing::debug!(target: "startup_sim::events", entry = %entry, "event.decode_skipped");
            }
        }
    }
    active
}

/// Base chance scaled by the global frequency weight plus the event's
/// pressure term, clamped to `[0, 1]`.
pub fn state_adjusted_chance(event: &EventDefinition, state: &StartupState, weight: f64) -> f64 {
    let pressure = event
        .pressure
        .map(|rule| rule.pressure(state))
        .unwrap_or(0.0);
    let chance = event.trigger_chance * weight + pressure;
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

/// Trigger phase: walk dormant events in id order, one draw each, and
/// activate the first whose draw lands at or under its adjusted chance.
pub fn maybe_trigger(
    state: &mut StartupState,
    catalog: &EventCatalog,
    weight: f64,
    rng: &mut impl RollSource,
) -> Vec<String> {
    let mut narratives = Vec::new();
    for event in catalog.iter() {
        if state.active_events().contains_key(&event.id) {
            continue;
        }
        let chance = state_adjusted_chance(event, state, weight);
        let roll = rng.roll();
        tracing::debug!(
            target: "startup_sim::events",
            event = %event.id,
            chance,
            roll,
            "event.trigger_roll"
        );
        if roll <= chance {
            narratives.push(start_event(state, event));
            break;
        }
    }
    state.clamp_all();
    narratives
}

/// Force an event active regardless of chance. Fails if the id is not in
/// the catalog; an already active event keeps its remaining turns.
pub fn activate(
    state: &mut StartupState,
    catalog: &EventCatalog,
    id: &str,
) -> Result<Option<String>, EventError> {
    let event = catalog.get(id).ok_or_else(|| EventError::UnknownEvent {
        id: id.to_string(),
    })?;
    if state.active_events().contains_key(id) {
        return Ok(None);
    }
    Ok(Some(start_event(state, event)))
}

/// Advance every active event by one turn. Continuing events re-apply their
/// deltas when persistent; expiring events apply their revert and leave the
/// table.
pub fn tick(state: &mut StartupState, catalog: &EventCatalog) -> Vec<String> {
    let mut narratives = Vec::new();
    let active: Vec<(String, u32)> = state
        .active_events()
        .iter()
        .map(|(id, remaining)| (id.clone(), *remaining))
        .collect();

    for (id, remaining) in active {
        let Some(event) = catalog.get(&id) else {
            tracing::warn!(target: "startup_sim::events", event = %id, "event.unknown_dropped");
            state.active_events_mut().remove(&id);
            continue;
        };

        let left = remaining.saturating_sub(1);
        if left > 0 {
            if event.persistent {
                state.apply_deltas(&event.deltas);
            }
            state.active_events_mut().insert(id, left);
            narratives.push(format!("{} persists ({} turns left).", event.name, left));
        } else {
            if let Some(revert) = &event.revert_deltas {
                state.apply_deltas(revert);
            }
            state.active_events_mut().remove(&id);
            tracing::info!(target: "startup_sim::events", event = %event.id, "event.concluded");
            narratives.push(format!("{} has concluded.", event.name));
        }
    }

    state.clamp_all();
    narratives
}

fn start_event(state: &mut StartupState, event: &EventDefinition) -> String {
    state.apply_deltas(&event.deltas);
    state
        .active_events_mut()
        .insert(event.id.clone(), event.duration_turns);
    tracing::info!(
        target: "startup_sim::events",
        event = %event.id,
        duration = event.duration_turns,
        "event.triggered"
    );
    if event.narrative.is_empty() {
        format!("{} strikes.", event.name)
    } else {
        format!("{}: {}", event.name, event.narrative)
    }
}
