//! Playback transition state machine.
//!
//! The player never touches media itself. Each input (start, click, video end, media
//! failure) returns the effects the host should carry out, tagged with the load
//! generation so late events from a previous video can be recognised and dropped.

use serde::Serialize;
use timeline::{
    visible_buttons, ButtonId, ButtonLink, EndAction, NodeId, Project, Seconds, VideoNode,
    VisibleButton,
};
use tracing::{debug, info, warn};

use crate::{direct_download_url, is_hls_manifest, ContentError, Generation, PlaybackError, Result, TimerSet};

/// Replays allowed on a node with nowhere to go before playback stops.
pub const MAX_AUTO_LOOPS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Playing { node: NodeId },
    Stopped { node: NodeId },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PlayerEffect {
    /// Load `url` from the start; any previous position is discarded.
    LoadVideo {
        node: NodeId,
        url: String,
        generation: Generation,
    },
    /// Seek the current video to 0 and play again.
    Replay { node: NodeId, generation: Generation },
    OpenUrl { url: String },
    ShowEmbed { button: ButtonId, embed_code: String },
    Stop { node: NodeId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFailure {
    /// The streaming manifest or its segments could not be fetched.
    HlsNetwork,
    /// Decode errors, unsupported formats, anything else.
    Other,
}

/// Result of advancing the clock on the current node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub visible: Vec<VisibleButton>,
    /// Buttons whose animate-out delay elapsed since the previous tick.
    pub exits_started: Vec<ButtonId>,
}

#[derive(Debug, Clone)]
pub struct Player {
    project: Project,
    state: PlayerState,
    generation: Generation,
    loops: u32,
    current_url: Option<String>,
    fallback_used: bool,
    timers: TimerSet<ButtonId>,
}

impl Player {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            state: PlayerState::Idle,
            generation: Generation::default(),
            loops: 0,
            current_url: None,
            fallback_used: false,
            timers: TimerSet::new(),
        }
    }

    /// Bootstraps from embed payload JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let project = Project::from_json(json)
            .map_err(|e| ContentError::MalformedProject(e.to_string()))?;
        Ok(Self::new(project))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn loop_count(&self) -> u32 {
        self.loops
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn current_node(&self) -> Option<&VideoNode> {
        match self.state {
            PlayerState::Idle => None,
            PlayerState::Playing { node } | PlayerState::Stopped { node } => {
                self.project.node(node)
            }
        }
    }

    pub fn start(&mut self) -> Result<Vec<PlayerEffect>> {
        let start = self
            .project
            .start_node()
            .map(|n| n.id)
            .ok_or(ContentError::NoStartNode)?;
        info!(project = %self.project.id, node = %start, "playback starting");
        self.load_node(start)
    }

    /// Jumps straight to `node_id`, as the editor preview does.
    pub fn play_node(&mut self, node_id: NodeId) -> Result<Vec<PlayerEffect>> {
        self.load_node(node_id)
    }

    pub fn click(&mut self, button_id: ButtonId) -> Result<Vec<PlayerEffect>> {
        let node = self.current_node().ok_or(PlaybackError::NotStarted)?;
        let button = node
            .button(button_id)
            .ok_or(ContentError::ButtonNotFound(button_id))?;

        match &button.link {
            ButtonLink::NodeLink { target: Some(target) } => {
                let target = *target;
                info!(button = %button_id, %target, "button routes to node");
                self.load_node(target)
            }
            ButtonLink::NodeLink { target: None } => {
                Err(ContentError::MissingLinkTarget(button_id).into())
            }
            ButtonLink::UrlLink { target } => {
                if target.trim().is_empty() {
                    return Err(ContentError::MissingLinkTarget(button_id).into());
                }
                Ok(vec![PlayerEffect::OpenUrl {
                    url: target.clone(),
                }])
            }
            ButtonLink::EmbedLink { embed_code } => {
                if embed_code.trim().is_empty() {
                    return Err(ContentError::MissingLinkTarget(button_id).into());
                }
                Ok(vec![PlayerEffect::ShowEmbed {
                    button: button_id,
                    embed_code: embed_code.clone(),
                }])
            }
        }
    }

    /// The current video reached its natural end.
    ///
    /// A lone button that links to a node wins, then the node's end action, then looping
    /// up to [`MAX_AUTO_LOOPS`] times before stopping.
    pub fn video_ended(&mut self, generation: Generation) -> Result<Vec<PlayerEffect>> {
        if generation != self.generation {
            debug!(stale = generation.0, current = self.generation.0, "ignoring stale video end");
            return Ok(Vec::new());
        }
        let node_id = match self.state {
            PlayerState::Playing { node } => node,
            PlayerState::Stopped { .. } => return Ok(Vec::new()),
            PlayerState::Idle => return Err(PlaybackError::NotStarted),
        };
        let node = self
            .project
            .node(node_id)
            .ok_or(ContentError::NodeNotFound(node_id))?;

        let lone_target = match node.buttons.as_slice() {
            [only] => only.target_node(),
            _ => None,
        };
        if let Some(target) = lone_target {
            info!(node = %node_id, %target, "single choice, advancing");
            return self.load_node(target);
        }

        match &node.end_action {
            EndAction::Node {
                target: Some(target),
            } => {
                let target = *target;
                info!(node = %node_id, %target, "end action advancing");
                return self.load_node(target);
            }
            EndAction::Url { target } if !target.trim().is_empty() => {
                let url = target.clone();
                info!(node = %node_id, %url, "end action opening url");
                self.stop(node_id);
                return Ok(vec![PlayerEffect::OpenUrl { url }, PlayerEffect::Stop { node: node_id }]);
            }
            _ => {}
        }

        if self.loops < MAX_AUTO_LOOPS {
            self.loops += 1;
            self.arm(node_id);
            info!(node = %node_id, loops = self.loops, "looping");
            return Ok(vec![PlayerEffect::Replay {
                node: node_id,
                generation: self.generation,
            }]);
        }

        info!(node = %node_id, "no auto-advance");
        self.stop(node_id);
        Ok(vec![PlayerEffect::Stop { node: node_id }])
    }

    /// Media failed to load. HLS network failures get one retry against a direct file.
    pub fn media_error(
        &mut self,
        generation: Generation,
        failure: MediaFailure,
    ) -> Result<Vec<PlayerEffect>> {
        if generation != self.generation {
            debug!(stale = generation.0, "ignoring stale media error");
            return Ok(Vec::new());
        }
        let node_id = match self.state {
            PlayerState::Playing { node } => node,
            _ => return Err(PlaybackError::NotStarted),
        };
        let current = self.current_url.clone().unwrap_or_default();

        match failure {
            MediaFailure::HlsNetwork if !self.fallback_used => {
                let fallback = direct_download_url(&current);
                if fallback == current {
                    let reason = if is_hls_manifest(&current) {
                        "stream failed and no direct file is known for"
                    } else {
                        "stream failed for a non-manifest url"
                    };
                    return Err(PlaybackError::Network(format!("{} {}", reason, current)));
                }
                warn!(node = %node_id, from = %current, to = %fallback, "retrying with direct file");
                self.fallback_used = true;
                self.current_url = Some(fallback.clone());
                Ok(vec![PlayerEffect::LoadVideo {
                    node: node_id,
                    url: fallback,
                    generation: self.generation,
                }])
            }
            MediaFailure::HlsNetwork => Err(PlaybackError::Network(format!(
                "direct file fallback failed for {}",
                current
            ))),
            MediaFailure::Other => Err(PlaybackError::Network(format!(
                "could not load {}",
                current
            ))),
        }
    }

    /// Records the media length once the host has probed it.
    pub fn set_media_duration(&mut self, generation: Generation, duration: Seconds) {
        if generation != self.generation {
            return;
        }
        let node_id = match self.state {
            PlayerState::Playing { node } | PlayerState::Stopped { node } => node,
            PlayerState::Idle => return,
        };
        if let Some(node) = self.project.node_mut(node_id) {
            node.duration = Some(duration.max(0.0));
        }
    }

    pub fn tick(&mut self, current_time: Seconds) -> Tick {
        let exits_started = self.timers.fire_due(current_time, self.generation);
        let visible = self
            .current_node()
            .map(|node| visible_buttons(node, current_time, None))
            .unwrap_or_default();
        Tick {
            visible,
            exits_started,
        }
    }

    fn load_node(&mut self, node_id: NodeId) -> Result<Vec<PlayerEffect>> {
        let node = self
            .project
            .node(node_id)
            .ok_or(ContentError::NodeNotFound(node_id))?;
        if node.url.trim().is_empty() {
            return Err(ContentError::MissingVideoUrl(node_id).into());
        }
        let url = node.url.clone();

        self.loops = 0;
        self.fallback_used = false;
        self.current_url = Some(url.clone());
        self.arm(node_id);
        debug!(node = %node_id, generation = self.generation.0, "node loaded");

        Ok(vec![PlayerEffect::LoadVideo {
            node: node_id,
            url,
            generation: self.generation,
        }])
    }

    /// Starts a fresh generation on `node_id` and schedules its animate-out timers.
    fn arm(&mut self, node_id: NodeId) {
        self.generation = self.generation.next();
        self.timers.cancel_all();
        self.state = PlayerState::Playing { node: node_id };

        let exits: Vec<(Seconds, ButtonId)> = self
            .project
            .node(node_id)
            .map(|node| {
                node.buttons
                    .iter()
                    .filter(|b| b.animate_out.enabled)
                    .map(|b| (b.time + b.animate_out.delay.max(0.0), b.id))
                    .collect()
            })
            .unwrap_or_default();
        for (due, button) in exits {
            self.timers.schedule(self.generation, due, button);
        }
    }

    fn stop(&mut self, node_id: NodeId) {
        self.loops = 0;
        self.timers.cancel_all();
        self.state = PlayerState::Stopped { node: node_id };
    }
}
