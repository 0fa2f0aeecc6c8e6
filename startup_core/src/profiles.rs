use std::{collections::BTreeMap, path::Path};

use startup_schema::{ContentFile, ProfileRecord};

use crate::{
    content::{display_name, load_with_fallback, read_content, record_id, ContentLoadError, DefinitionError},
    fields::{FieldBounds, MetricField},
    state::StartupState,
};

pub const BUILTIN_START_PROFILES: &str = include_str!("data/start_profiles.json");
pub const PROFILES_PATH_ENV: &str = "STARTUP_PROFILES_PATH";
pub const DEFAULT_PROFILE_ID: &str = "baseline";

/// A named starting company. `stats` replaces baseline values outright.
#[derive(Debug, Clone, PartialEq)]
pub struct StartProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub stats: BTreeMap<MetricField, f64>,
}

impl StartProfile {
    pub fn build_state(&self, bounds: FieldBounds) -> StartupState {
        let mut state = StartupState::new(bounds);
        for (field, value) in &self.stats {
            state.set(*field, *value);
        }
        state
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, StartProfile>,
}

impl ProfileCatalog {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_START_PROFILES).expect("builtin start profiles should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentLoadError> {
        let file: ContentFile<ProfileRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(file.into_entries())?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ContentLoadError> {
        Self::from_json_str(&read_content(path)?)
    }

    pub fn from_records(records: Vec<ProfileRecord>) -> Result<Self, DefinitionError> {
        let mut profiles = BTreeMap::new();
        for (index, record) in records.into_iter().enumerate() {
            let id = record_id("profile", index, record.id)?;
            let mut stats = BTreeMap::new();
            for (name, value) in record.stats {
                let field = MetricField::from_name(&name).ok_or_else(|| {
                    DefinitionError::UnknownField {
                        kind: "profile",
                        id: id.clone(),
                        name: name.clone(),
                    }
                })?;
                stats.insert(field, value);
            }
            if profiles.contains_key(&id) {
                return Err(DefinitionError::Duplicate { kind: "profile", id });
            }
            let profile = StartProfile {
                name: record.name.unwrap_or_else(|| display_name(&id)),
                description: record.description.unwrap_or_default(),
                stats,
                id: id.clone(),
            };
            profiles.insert(id, profile);
        }
        Ok(Self { profiles })
    }

    pub fn get(&self, id: &str) -> Option<&StartProfile> {
        self.profiles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StartProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

pub fn load_profiles(path: Option<&Path>) -> ProfileCatalog {
    load_with_fallback(path, PROFILES_PATH_ENV, "profiles", ProfileCatalog::from_file)
        .unwrap_or_else(ProfileCatalog::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_includes_baseline_profile() {
        let catalog = ProfileCatalog::builtin();
        let baseline = catalog.get(DEFAULT_PROFILE_ID).expect("baseline profile");
        assert!(baseline.stats.is_empty());
        assert_eq!(
            baseline.build_state(FieldBounds::default()),
            StartupState::default()
        );
    }

    #[test]
    fn profile_stats_override_baseline() {
        let catalog = ProfileCatalog::builtin();
        let state = catalog
            .get("turnaround")
            .expect("turnaround profile")
            .build_state(FieldBounds::default());
        assert_eq!(state.debt(), 400_000);
        assert_eq!(state.product_quality(), 38.0);
        assert_eq!(state.turn(), 1);
    }

    #[test]
    fn unknown_stat_is_a_definition_error() {
        let err = ProfileCatalog::from_json_str(r#"[{"id": "odd", "stats": {"karma": 3}}]"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ContentLoadError::Definition(DefinitionError::UnknownField { kind: "profile", .. })
        ));
    }

    #[test]
    fn out_of_range_stats_are_clamped() {
        let catalog =
            ProfileCatalog::from_json_str(r#"[{"key": "wild", "stats": {"team_morale": 250}}]"#)
                .unwrap();
        let profile = catalog.get("wild").unwrap();
        assert_eq!(profile.name, "Wild");
        assert_eq!(profile.build_state(FieldBounds::default()).team_morale(), 100.0);
    }
}
