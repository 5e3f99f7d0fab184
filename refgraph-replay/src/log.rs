use crate::error::{ReplayError, ReplayResult};
use refgraph_engine::Command;
use std::path::Path;

/// Commands in log order, read from a JSON-lines file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLog {
    commands: Vec<Command>,
}

impl CommandLog {
    /// Reads a log file. Blank lines are skipped.
    pub fn load(path: impl AsRef<Path>) -> ReplayResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses JSON-lines text; `line` in errors is 1-based.
    pub fn parse(text: &str) -> ReplayResult<Self> {
        let mut commands = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let command = serde_json::from_str(line)
                .map_err(|source| ReplayError::Parse { line: i + 1, source })?;
            commands.push(command);
        }
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }
}

impl From<Vec<Command>> for CommandLog {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}
