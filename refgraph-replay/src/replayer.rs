use crate::status::{CommandStatus, StatusBook};
use chrono::Utc;
use refgraph_engine::{Command, PatchEngine};
use refgraph_storage::EntityGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Counts from one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub failed: usize,
    /// Already recorded before this pass.
    pub skipped: usize,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} failed, {} skipped",
            self.applied, self.failed, self.skipped
        )
    }
}

/// Applies logged commands in order and remembers what it has seen.
#[derive(Debug, Clone)]
pub struct Replayer {
    engine: PatchEngine,
    status: StatusBook,
}

impl Replayer {
    pub fn new(engine: PatchEngine) -> Self {
        Self::with_status(engine, StatusBook::new())
    }

    /// Resumes with a previously recorded status book.
    pub fn with_status(engine: PatchEngine, status: StatusBook) -> Self {
        Self { engine, status }
    }

    pub fn engine(&self) -> &PatchEngine {
        &self.engine
    }

    pub fn status(&self) -> &StatusBook {
        &self.status
    }

    pub fn into_status(self) -> StatusBook {
        self.status
    }

    /// Applies every command not yet recorded, strictly in the given order.
    ///
    /// A failing command is recorded and replay moves on; a command that
    /// is already recorded, whether applied or failed, is never retried.
    pub fn replay(&mut self, graph: &mut EntityGraph, commands: &[Command]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for command in commands {
            if self.status.contains(&command.id) {
                debug!("Skipping recorded command {}", command.id);
                summary.skipped += 1;
                continue;
            }
            let status = match self.engine.apply(graph, command) {
                Ok(updated) => {
                    summary.applied += 1;
                    CommandStatus::Applied {
                        updated,
                        at: Utc::now(),
                    }
                }
                Err(e) => {
                    warn!("Command {} failed: {}", command.id, e);
                    summary.failed += 1;
                    CommandStatus::Failed {
                        error: e.payload(),
                        at: Utc::now(),
                    }
                }
            };
            self.status.record(command.id.clone(), status);
        }
        info!("Replay finished: {}", summary);
        summary
    }
}
