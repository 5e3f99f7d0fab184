use crate::error::ReplayResult;
use chrono::{DateTime, Utc};
use refgraph_engine::ErrorPayload;
use refgraph_types::CommandId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Recorded outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandStatus {
    Applied {
        updated: usize,
        at: DateTime<Utc>,
    },
    Failed {
        error: ErrorPayload,
        at: DateTime<Utc>,
    },
}

impl CommandStatus {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Applied { at, .. } | Self::Failed { at, .. } => *at,
        }
    }
}

/// Outcome of every command seen so far, keyed by command id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusBook {
    entries: BTreeMap<CommandId, CommandStatus>,
}

impl StatusBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a status book written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the book as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> ReplayResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn get(&self, id: &CommandId) -> Option<&CommandStatus> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &CommandId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn record(&mut self, id: CommandId, status: CommandStatus) {
        self.entries.insert(id, status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommandId, &CommandStatus)> {
        self.entries.iter()
    }
}
