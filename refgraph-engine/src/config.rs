//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How the level aggregate of an entity is updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelIndexMode {
    /// Newly found levels are appended; entries are never dropped.
    #[default]
    Append,
    /// The aggregate is replaced by what the subtree yields now.
    Replace,
}

/// Where level entities live and how they are collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Relation linking an entity directly to its levels.
    pub relation: String,
    /// Type of the level entities.
    pub entity_type: String,
    /// Relation that is not part of the hierarchy and is skipped when aggregating.
    pub excluded_relation: Option<String>,
    /// Pseudo-property carrying level labels instead of ids.
    pub label_property: String,
    /// Literal of a level entity that labels are matched against.
    pub label_field: String,
    pub mode: LevelIndexMode,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            relation: "Niveau".to_string(),
            entity_type: "Niveau".to_string(),
            excluded_relation: Some("Vakleergebied".to_string()),
            label_property: "niveaus".to_string(),
            label_field: "title".to_string(),
            mode: LevelIndexMode::Append,
        }
    }
}

/// Configuration for the import and patch engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix stripped from ids addressed by patch changes,
    /// e.g. the public base URI of the data set.
    pub id_prefix: Option<String>,
    pub level: LevelConfig,
}

impl EngineConfig {
    /// Parses a configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
