use thiserror::Error;

mod graph;
pub use graph::*;
mod commands;
pub use commands::*;
mod align;
pub use align::*;
mod lanes;
pub use lanes::*;
mod visibility;
pub use visibility::*;
mod history;
pub use history::*;
mod session;
pub use session::*;
mod autosave;
pub use autosave::*;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("invalid operation: {0}")]
    InvalidOp(String),
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("button not found: {0}")]
    ButtonNotFound(ButtonId),
    #[error("connection not found between {0} -> {1}")]
    ConnectionNotFound(NodeId, NodeId),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
    #[error("malformed project data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// How an error should be surfaced to the person editing or watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing node, button or media; shown to the user, halts only the affected action.
    Content,
    /// Rejected edit; the graph is left untouched.
    Validation,
}

impl TimelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TimelineError::NodeNotFound(_)
            | TimelineError::ButtonNotFound(_)
            | TimelineError::Malformed(_) => ErrorKind::Content,
            TimelineError::InvalidOp(_)
            | TimelineError::ConnectionNotFound(..)
            | TimelineError::HistoryEmpty(_) => ErrorKind::Validation,
        }
    }
}

/// Playback position in seconds.
pub type Seconds = f64;
