//! Job configuration.
//!
//! Every field defaults to the constants the consolidation was written
//! against, so running without a config file reproduces the stock behavior.
//! A TOML file may override any subset of fields.

use crate::core::error::MigrateError;
use crate::core::store::IndexSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Collection and index names the jobs are willing to create or touch.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// Unified collection every source is consolidated into.
    pub target: String,
    /// Marker carried by collections already in the prefixed log format.
    pub source_prefix: String,
    /// Collections that are never migration sources.
    pub reserved: Vec<String>,
    pub identity_field: String,
    pub classification_field: String,
    /// Sub-object that prefixed sources nest event payloads under.
    pub payload_field: String,
    pub deprecated_timestamp: String,
    pub canonical_timestamp: String,
    pub indexes: Vec<IndexSpec>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            target: "logdata".to_string(),
            source_prefix: "logs_".to_string(),
            reserved: [
                "logdata",
                "api_stats",
                "users",
                "sessions",
                "settings",
                "announcements",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            identity_field: "_id".to_string(),
            classification_field: "game".to_string(),
            payload_field: "data".to_string(),
            deprecated_timestamp: "dbtimestamp".to_string(),
            canonical_timestamp: "serverTimestamp".to_string(),
            indexes: vec![
                IndexSpec::new(
                    "idx_game_serverTimestamp",
                    &[("game", 1), ("serverTimestamp", -1)],
                ),
                IndexSpec::new("idx_game_playerId", &[("game", 1), ("playerId", 1)]),
                IndexSpec::new("idx_game_eventType", &[("game", 1), ("eventType", 1)]),
            ],
        }
    }
}

impl MigrateConfig {
    /// Reserved names plus the target, which is always excluded from sources.
    pub fn excluded_names(&self) -> Vec<String> {
        let mut names = self.reserved.clone();
        if !names.contains(&self.target) {
            names.push(self.target.clone());
        }
        names
    }

    pub fn validate(&self) -> Result<(), MigrateError> {
        check_name("target", &self.target)?;
        if self.source_prefix.is_empty() {
            return Err(MigrateError::ConfigError(
                "source_prefix must not be empty".into(),
            ));
        }
        for (label, field) in [
            ("identity_field", &self.identity_field),
            ("classification_field", &self.classification_field),
            ("payload_field", &self.payload_field),
            ("deprecated_timestamp", &self.deprecated_timestamp),
            ("canonical_timestamp", &self.canonical_timestamp),
        ] {
            if field.is_empty() || field.contains('"') || field.contains('\\') {
                return Err(MigrateError::ConfigError(format!(
                    "{} is not a usable field name: {:?}",
                    label, field
                )));
            }
        }
        if self.identity_field == self.classification_field
            || self.identity_field == self.payload_field
            || self.classification_field == self.payload_field
        {
            return Err(MigrateError::ConfigError(
                "identity, classification and payload fields must differ".into(),
            ));
        }
        if self.deprecated_timestamp == self.canonical_timestamp {
            return Err(MigrateError::ConfigError(
                "deprecated and canonical timestamp names are identical".into(),
            ));
        }
        for spec in &self.indexes {
            check_name("index", &spec.name)?;
            if spec.keys.is_empty() {
                return Err(MigrateError::ConfigError(format!(
                    "index {} has no keys",
                    spec.name
                )));
            }
            if let Some((field, dir)) = spec.keys.iter().find(|(_, d)| *d != 1 && *d != -1) {
                return Err(MigrateError::ConfigError(format!(
                    "index {}: direction for {} must be 1 or -1, got {}",
                    spec.name, field, dir
                )));
            }
        }
        Ok(())
    }
}

fn check_name(label: &str, name: &str) -> Result<(), MigrateError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(MigrateError::ConfigError(format!(
            "{} name {:?} must match {}",
            label,
            name,
            NAME_RE.as_str()
        )))
    }
}

/// Check a user-supplied collection name against the same rule as config names.
pub fn validate_collection_name(name: &str) -> Result<(), MigrateError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(MigrateError::InvalidName(name.to_string()))
    }
}

/// Load configuration from `path`. No path, or a path that does not exist,
/// yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<MigrateConfig, MigrateError> {
    let config = match path {
        Some(p) if p.exists() => {
            let content = fs::read_to_string(p).map_err(MigrateError::IoError)?;
            toml::from_str(&content).map_err(|e| MigrateError::ConfigError(e.to_string()))?
        }
        _ => MigrateConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
