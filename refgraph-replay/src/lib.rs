//! Command-log replay for refgraph.
//!
//! A command log is a JSON-lines file of [`Command`](refgraph_engine::Command)s.
//! [`Replayer`] applies them in log order against one graph and keeps a
//! [`StatusBook`] with the outcome of each, so a host can call it again as
//! the log grows and only unseen commands are applied.

mod error;
mod log;
mod replayer;
mod status;

pub use error::{ReplayError, ReplayResult};
pub use log::CommandLog;
pub use replayer::{ReplaySummary, Replayer};
pub use status::{CommandStatus, StatusBook};
