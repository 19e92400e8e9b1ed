/// Playback engine for interactive video projects.
/// Walks the node graph from the start node and decides where each click or video end leads.
use thiserror::Error;
use timeline::{ButtonId, NodeId};

mod hls;
pub use hls::*;
mod timers;
pub use timers::*;
mod player;
pub use player::*;

#[derive(Debug, Error, PartialEq)]
pub enum ContentError {
    #[error("project has no video nodes")]
    NoStartNode,
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("node {0} has no video url")]
    MissingVideoUrl(NodeId),
    #[error("button not found: {0}")]
    ButtonNotFound(ButtonId),
    #[error("button {0} has nowhere to go")]
    MissingLinkTarget(ButtonId),
    #[error("malformed project data: {0}")]
    MalformedProject(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("network error: {0}")]
    Network(String),
    #[error("playback has not started")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
