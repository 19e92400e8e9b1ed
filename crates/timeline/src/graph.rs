use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Seconds, TimelineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ButtonId(pub Uuid);

impl ButtonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ButtonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved unit of work: the video node graph plus its editor-only edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub videos: Vec<VideoNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub start_node_id: Option<NodeId>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ProjectId::new(), name)
    }

    pub fn with_id(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            videos: Vec::new(),
            connections: Vec::new(),
            start_node_id: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn node(&self, id: NodeId) -> Option<&VideoNode> {
        self.videos.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut VideoNode> {
        self.videos.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.videos.iter().any(|n| n.id == id)
    }

    /// Where playback begins: the explicit start id, then a flagged node, then the first node.
    pub fn start_node(&self) -> Option<&VideoNode> {
        self.start_node_id
            .and_then(|id| self.node(id))
            .or_else(|| self.videos.iter().find(|n| n.is_start_node))
            .or_else(|| self.videos.first())
    }

    pub fn has_connection(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.iter().any(|c| c.from == from && c.to == to)
    }

    /// Structural problems that would make the project unsafe to play or save.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingName);
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.videos {
            if !seen.insert(node.id) {
                issues.push(ValidationIssue::DuplicateNodeId(node.id));
            }

            let mut buttons = std::collections::HashSet::new();
            for button in &node.buttons {
                if !buttons.insert(button.id) {
                    issues.push(ValidationIssue::DuplicateButtonId(node.id, button.id));
                }
                if let ButtonLink::NodeLink {
                    target: Some(target),
                } = &button.link
                {
                    if !self.contains_node(*target) {
                        issues.push(ValidationIssue::DanglingButtonTarget(button.id, *target));
                    }
                }
            }

            if let Some(target) = node.end_action.next_node() {
                if !self.contains_node(target) {
                    issues.push(ValidationIssue::DanglingEndAction(node.id, target));
                }
            }
        }

        for connection in &self.connections {
            if !self.contains_node(connection.from) || !self.contains_node(connection.to) {
                issues.push(ValidationIssue::DanglingConnection(
                    connection.from,
                    connection.to,
                ));
            }
        }

        if let Some(start) = self.start_node_id {
            if !self.contains_node(start) {
                issues.push(ValidationIssue::DanglingStartNode(start));
            }
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingName,
    DuplicateNodeId(NodeId),
    DuplicateButtonId(NodeId, ButtonId),
    DanglingButtonTarget(ButtonId, NodeId),
    DanglingEndAction(NodeId, NodeId),
    DanglingConnection(NodeId, NodeId),
    DanglingStartNode(NodeId),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingName => write!(f, "project name is required"),
            ValidationIssue::DuplicateNodeId(id) => write!(f, "duplicate node id {}", id),
            ValidationIssue::DuplicateButtonId(node, id) => {
                write!(f, "duplicate button id {} in node {}", id, node)
            }
            ValidationIssue::DanglingButtonTarget(button, target) => {
                write!(f, "button {} links to missing node {}", button, target)
            }
            ValidationIssue::DanglingEndAction(node, target) => {
                write!(f, "node {} ends into missing node {}", node, target)
            }
            ValidationIssue::DanglingConnection(from, to) => {
                write!(f, "connection {} -> {} references a missing node", from, to)
            }
            ValidationIssue::DanglingStartNode(id) => write!(f, "start node {} is missing", id),
        }
    }
}

pub const DEFAULT_NODE_X: f64 = 100.0;
pub const DEFAULT_NODE_Y: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Media length once the player has probed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Seconds>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub end_action: EndAction,
    #[serde(default)]
    pub is_start_node: bool,
}

impl VideoNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            url: String::new(),
            x: DEFAULT_NODE_X,
            y: DEFAULT_NODE_Y,
            duration: None,
            buttons: Vec::new(),
            end_action: EndAction::None,
            is_start_node: false,
        }
    }

    pub fn button(&self, id: ButtonId) -> Option<&Button> {
        self.buttons.iter().find(|b| b.id == id)
    }

    pub fn button_mut(&mut self, id: ButtonId) -> Option<&mut Button> {
        self.buttons.iter_mut().find(|b| b.id == id)
    }
}

/// What happens when a node's video reaches its natural end.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EndAction {
    #[default]
    None,
    Node {
        #[serde(default)]
        target: Option<NodeId>,
    },
    Url {
        #[serde(default)]
        target: String,
    },
}

impl EndAction {
    pub fn next_node(&self) -> Option<NodeId> {
        match self {
            EndAction::Node { target } => *target,
            _ => None,
        }
    }
}

/// Editor-only edge mirroring a node's routing target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: ButtonId,
    pub text: String,
    /// Appearance time in seconds from the start of the node's video.
    pub time: Seconds,
    /// Explicit visible lifetime; the placeholder value counts as unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Seconds>,
    #[serde(flatten)]
    pub link: ButtonLink,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub style: ButtonStyle,
    #[serde(default)]
    pub animation: Animation,
    #[serde(default)]
    pub animate_out: AnimateOut,
    #[serde(default)]
    pub shadow: Shadow,
    #[serde(default)]
    pub contains_image: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Button {
    pub fn new(text: impl Into<String>, time: Seconds) -> Self {
        Self {
            id: ButtonId::new(),
            text: text.into(),
            time: time.max(0.0),
            duration: None,
            link: ButtonLink::NodeLink { target: None },
            position: Position::default(),
            style: ButtonStyle::default(),
            animation: Animation::default(),
            animate_out: AnimateOut::default(),
            shadow: Shadow::default(),
            contains_image: false,
            image_url: None,
        }
    }

    pub fn target_node(&self) -> Option<NodeId> {
        match &self.link {
            ButtonLink::NodeLink { target } => *target,
            _ => None,
        }
    }
}

/// Where a click on a button leads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "linkType")]
pub enum ButtonLink {
    #[serde(rename = "node")]
    NodeLink {
        #[serde(default)]
        target: Option<NodeId>,
    },
    #[serde(rename = "url")]
    UrlLink {
        #[serde(default)]
        target: String,
    },
    #[serde(rename = "embed")]
    EmbedLink {
        #[serde(default, rename = "embedCode")]
        embed_code: String,
    },
}

/// Top-left corner, in percent of the player frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 40.0, y: 80.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonStyle {
    /// Percent of the player width.
    pub width: f64,
    /// Percent of the player height.
    pub height: f64,
    pub color: String,
    pub background_color: String,
    pub font_size: f64,
    pub padding: f64,
    pub border_radius: f64,
    pub border: String,
    pub line_height: f64,
    pub opacity: f64,
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Self {
            width: 20.0,
            height: 8.0,
            color: "#ffffff".to_string(),
            background_color: "#2563eb".to_string(),
            font_size: 16.0,
            padding: 8.0,
            border_radius: 6.0,
            border: "none".to_string(),
            line_height: 1.2,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    None,
    Fade,
    Slide,
}

/// Side a sliding button enters from (and leaves toward).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlideDirection {
    Left,
    Right,
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Animation {
    #[serde(rename = "type")]
    pub kind: AnimationKind,
    pub direction: SlideDirection,
    /// Seconds.
    pub duration: Seconds,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            kind: AnimationKind::None,
            direction: SlideDirection::Bottom,
            duration: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimateOut {
    pub enabled: bool,
    /// Seconds after the button's appearance before it starts leaving.
    pub delay: Seconds,
}

impl Default for AnimateOut {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Shadow {
    pub enabled: bool,
    pub color: String,
    pub opacity: f64,
    pub h_offset: f64,
    pub v_offset: f64,
    pub blur: f64,
    pub spread: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#000000".to_string(),
            opacity: 0.5,
            h_offset: 2.0,
            v_offset: 2.0,
            blur: 4.0,
            spread: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_wire_format_tags_link_type() {
        let mut button = Button::new("Go", 1.5);
        button.link = ButtonLink::EmbedLink {
            embed_code: "<iframe></iframe>".to_string(),
        };
        let value = serde_json::to_value(&button).unwrap();
        assert_eq!(value["linkType"], "embed");
        assert_eq!(value["embedCode"], "<iframe></iframe>");
        assert_eq!(value["animateOut"]["enabled"], false);
        assert_eq!(value["style"]["backgroundColor"], "#2563eb");
        assert_eq!(value["animation"]["type"], "none");
    }

    #[test]
    fn sparse_json_fills_defaults() {
        let node = NodeId::new();
        let json = format!(
            r#"{{
                "id": "{}",
                "name": "Demo",
                "videos": [{{
                    "id": "{}",
                    "name": "Intro",
                    "url": "https://cdn.example.com/intro.mp4",
                    "buttons": [{{
                        "id": "{}",
                        "text": "Next",
                        "time": 2,
                        "linkType": "url",
                        "target": "https://example.com"
                    }}],
                    "endAction": {{ "type": "none" }}
                }}]
            }}"#,
            ProjectId::new(),
            node,
            ButtonId::new()
        );
        let project = Project::from_json(&json).unwrap();
        let button = &project.videos[0].buttons[0];
        assert_eq!(
            button.link,
            ButtonLink::UrlLink {
                target: "https://example.com".to_string()
            }
        );
        assert_eq!(button.style, ButtonStyle::default());
        assert_eq!(project.start_node().map(|n| n.id), Some(node));
    }

    #[test]
    fn malformed_json_is_a_content_error() {
        let err = Project::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Content);
    }

    #[test]
    fn validate_reports_dangling_references() {
        let mut project = Project::new("Demo");
        let mut node = VideoNode::new("A");
        let ghost = NodeId::new();
        node.end_action = EndAction::Node {
            target: Some(ghost),
        };
        let id = node.id;
        project.videos.push(node);
        project.connections.push(Connection { from: id, to: ghost });

        let issues = project.validate();
        assert!(issues.contains(&ValidationIssue::DanglingEndAction(id, ghost)));
        assert!(issues.contains(&ValidationIssue::DanglingConnection(id, ghost)));
    }
}
