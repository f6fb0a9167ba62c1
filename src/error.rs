use thiserror::Error;

/// Everything that can go wrong with a single step of a check run.
///
/// None of these abort the run. Each one is turned into a recorded verdict or
/// skip record by the scenario runner.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckError {
    #[error("no response: {0}")]
    Transport(String),

    #[error("-> {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed body from {source_step}: {detail}")]
    MalformedBody { source_step: String, detail: String },

    #[error("{role} authentication failed: {reason}")]
    Authentication { role: String, reason: String },

    #[error("no {slot} captured by an earlier step")]
    DependencyUnmet { slot: String },
}
