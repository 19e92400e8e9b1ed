use tracing::{debug, warn};

use crate::{
    Button, ButtonId, ButtonLink, Connection, EndAction, NodeId, Project, Seconds, TimelineError,
    VideoNode, DEFAULT_NODE_X, DEFAULT_NODE_Y,
};

/// Canvas offset applied to duplicated nodes and to each newly added node.
pub const DUPLICATE_NODE_OFFSET: f64 = 40.0;
/// Percent offset applied to duplicated buttons so the copy is visibly distinct.
pub const DUPLICATE_BUTTON_OFFSET: f64 = 5.0;

pub fn add_node(project: &mut Project, name: impl Into<String>) -> VideoNode {
    let mut node = VideoNode::new(name);
    let stagger = (project.videos.len() % 10) as f64 * DUPLICATE_NODE_OFFSET;
    node.x = DEFAULT_NODE_X + stagger;
    node.y = DEFAULT_NODE_Y + stagger;

    if project.videos.is_empty() {
        node.is_start_node = true;
        project.start_node_id = Some(node.id);
    }

    debug!(node = %node.id, name = %node.name, "node added");
    project.videos.push(node.clone());
    node
}

pub fn delete_node(project: &mut Project, node_id: NodeId) -> Result<VideoNode, TimelineError> {
    let idx = project
        .videos
        .iter()
        .position(|n| n.id == node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;
    let removed = project.videos.remove(idx);

    let mut unlinked = 0usize;
    for node in project.videos.iter_mut() {
        if node.end_action.next_node() == Some(node_id) {
            node.end_action = EndAction::Node { target: None };
        }
        for button in node.buttons.iter_mut() {
            if let ButtonLink::NodeLink { target } = &mut button.link {
                if *target == Some(node_id) {
                    *target = None;
                    unlinked += 1;
                }
            }
        }
    }

    let before = project.connections.len();
    project
        .connections
        .retain(|c| c.from != node_id && c.to != node_id);
    let pruned = before - project.connections.len();

    let was_start = removed.is_start_node || project.start_node_id == Some(node_id);
    if was_start {
        let next = project.videos.first().map(|n| n.id);
        set_start_flags(project, next);
    }

    debug!(node = %node_id, pruned, unlinked, was_start, "node deleted");
    Ok(removed)
}

pub fn duplicate_node(project: &mut Project, node_id: NodeId) -> Result<VideoNode, TimelineError> {
    let source = project
        .node(node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;

    let mut copy = source.clone();
    copy.id = NodeId::new();
    copy.name = format!("{} (copy)", source.name);
    copy.x += DUPLICATE_NODE_OFFSET;
    copy.y += DUPLICATE_NODE_OFFSET;
    copy.is_start_node = false;
    if copy.end_action.next_node() == Some(node_id) {
        copy.end_action = EndAction::Node { target: None };
    }
    for button in copy.buttons.iter_mut() {
        button.id = ButtonId::new();
    }

    debug!(source = %node_id, node = %copy.id, "node duplicated");
    project.videos.push(copy.clone());
    Ok(copy)
}

pub fn rename_node(
    project: &mut Project,
    node_id: NodeId,
    name: impl Into<String>,
) -> Result<(), TimelineError> {
    let node = project
        .node_mut(node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;
    node.name = name.into();
    Ok(())
}

pub fn set_node_url(
    project: &mut Project,
    node_id: NodeId,
    url: impl Into<String>,
) -> Result<(), TimelineError> {
    let node = project
        .node_mut(node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;
    node.url = url.into();
    // A new source invalidates the probed length.
    node.duration = None;
    Ok(())
}

pub fn move_node(project: &mut Project, node_id: NodeId, x: f64, y: f64) -> Result<(), TimelineError> {
    let node = project
        .node_mut(node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;
    node.x = x;
    node.y = y;
    Ok(())
}

pub fn set_start_node(project: &mut Project, node_id: NodeId) -> Result<(), TimelineError> {
    if !project.contains_node(node_id) {
        return Err(TimelineError::NodeNotFound(node_id));
    }
    set_start_flags(project, Some(node_id));
    Ok(())
}

fn set_start_flags(project: &mut Project, start: Option<NodeId>) {
    project.start_node_id = start;
    for node in project.videos.iter_mut() {
        node.is_start_node = Some(node.id) == start;
    }
}

pub fn set_end_action(
    project: &mut Project,
    node_id: NodeId,
    action: EndAction,
) -> Result<(), TimelineError> {
    if let Some(target) = action.next_node() {
        if !project.contains_node(target) {
            return Err(TimelineError::NodeNotFound(target));
        }
    }
    let node = project
        .node_mut(node_id)
        .ok_or(TimelineError::NodeNotFound(node_id))?;
    node.end_action = action;
    Ok(())
}

/// Draws the editor edge `from -> to` and routes `from`'s video end to `to`.
///
/// Returns `Ok(false)` without touching the project when the edge already exists.
pub fn set_connection(project: &mut Project, from: NodeId, to: NodeId) -> Result<bool, TimelineError> {
    if !project.contains_node(to) {
        return Err(TimelineError::NodeNotFound(to));
    }
    if project.has_connection(from, to) {
        warn!(%from, %to, "connection already exists, ignoring");
        return Ok(false);
    }
    let node = project
        .node_mut(from)
        .ok_or(TimelineError::NodeNotFound(from))?;
    node.end_action = EndAction::Node { target: Some(to) };

    project.connections.push(Connection { from, to });
    debug!(%from, %to, "connection set");
    Ok(true)
}

pub fn remove_connection(project: &mut Project, from: NodeId, to: NodeId) -> Result<(), TimelineError> {
    let idx = project
        .connections
        .iter()
        .position(|c| c.from == from && c.to == to)
        .ok_or(TimelineError::ConnectionNotFound(from, to))?;
    project.connections.remove(idx);

    if let Some(node) = project.node_mut(from) {
        if node.end_action.next_node() == Some(to) {
            node.end_action = EndAction::None;
        }
    }
    debug!(%from, %to, "connection removed");
    Ok(())
}

pub fn add_button(node: &mut VideoNode, at_time: Seconds) -> Button {
    let button = Button::new(format!("Button {}", node.buttons.len() + 1), at_time);
    debug!(node = %node.id, button = %button.id, time = button.time, "button added");
    node.buttons.push(button.clone());
    button
}

pub fn delete_button(node: &mut VideoNode, button_id: ButtonId) -> Result<Button, TimelineError> {
    let idx = node
        .buttons
        .iter()
        .position(|b| b.id == button_id)
        .ok_or(TimelineError::ButtonNotFound(button_id))?;
    debug!(node = %node.id, button = %button_id, "button deleted");
    Ok(node.buttons.remove(idx))
}

pub fn duplicate_button(node: &mut VideoNode, button_id: ButtonId) -> Result<Button, TimelineError> {
    let source = node
        .button(button_id)
        .ok_or(TimelineError::ButtonNotFound(button_id))?;

    let mut copy = source.clone();
    copy.id = ButtonId::new();
    copy.position.x = (copy.position.x + DUPLICATE_BUTTON_OFFSET).min(100.0);
    copy.position.y = (copy.position.y + DUPLICATE_BUTTON_OFFSET).min(100.0);

    debug!(node = %node.id, source = %button_id, button = %copy.id, "button duplicated");
    node.buttons.push(copy.clone());
    Ok(copy)
}

/// Applies an arbitrary edit to one button, then re-clamps its time and geometry.
pub fn update_button(
    node: &mut VideoNode,
    button_id: ButtonId,
    edit: impl FnOnce(&mut Button),
) -> Result<(), TimelineError> {
    let button = node
        .button_mut(button_id)
        .ok_or(TimelineError::ButtonNotFound(button_id))?;
    edit(button);
    button.time = button.time.max(0.0);
    if let Some(duration) = button.duration {
        button.duration = Some(duration.max(0.0));
    }
    button.position.x = clamp_percent(button.position.x);
    button.position.y = clamp_percent(button.position.y);
    button.style.width = clamp_percent(button.style.width);
    button.style.height = clamp_percent(button.style.height);
    Ok(())
}

pub fn move_button(node: &mut VideoNode, button_id: ButtonId, x: f64, y: f64) -> Result<(), TimelineError> {
    let button = node
        .button_mut(button_id)
        .ok_or(TimelineError::ButtonNotFound(button_id))?;
    button.position.x = clamp_percent(x);
    button.position.y = clamp_percent(y);
    Ok(())
}

pub fn resize_button(
    node: &mut VideoNode,
    button_id: ButtonId,
    width: f64,
    height: f64,
) -> Result<(), TimelineError> {
    let button = node
        .button_mut(button_id)
        .ok_or(TimelineError::ButtonNotFound(button_id))?;
    button.style.width = clamp_percent(width);
    button.style.height = clamp_percent(height);
    Ok(())
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_nodes() -> (Project, NodeId, NodeId, NodeId) {
        let mut project = Project::new("Test");
        let a = add_node(&mut project, "A").id;
        let b = add_node(&mut project, "B").id;
        let c = add_node(&mut project, "C").id;
        (project, a, b, c)
    }

    #[test]
    fn first_node_becomes_start() {
        let (project, a, b, _) = three_nodes();
        assert_eq!(project.start_node_id, Some(a));
        assert!(project.node(a).unwrap().is_start_node);
        assert!(!project.node(b).unwrap().is_start_node);
    }

    #[test]
    fn delete_node_repairs_references() {
        let (mut project, a, b, c) = three_nodes();
        set_connection(&mut project, a, b).unwrap();
        set_connection(&mut project, c, b).unwrap();
        set_connection(&mut project, b, c).unwrap();
        let node_a = project.node_mut(a).unwrap();
        let to_b = add_button(node_a, 1.0).id;
        node_a.button_mut(to_b).unwrap().link = ButtonLink::NodeLink { target: Some(b) };
        let to_c = add_button(node_a, 2.0).id;
        node_a.button_mut(to_c).unwrap().link = ButtonLink::NodeLink { target: Some(c) };

        delete_node(&mut project, b).unwrap();

        let node_a = project.node(a).unwrap();
        assert_eq!(node_a.button(to_b).unwrap().target_node(), None);
        assert_eq!(node_a.button(to_c).unwrap().target_node(), Some(c));

        assert!(project.connections.iter().all(|c| c.from != b && c.to != b));
        assert_eq!(
            project.node(a).unwrap().end_action,
            EndAction::Node { target: None }
        );
        assert_eq!(project.node(c).unwrap().end_action.next_node(), None);
        assert!(project.validate().is_empty());
    }

    #[test]
    fn deleting_start_node_promotes_first_remaining() {
        let (mut project, a, b, _) = three_nodes();
        delete_node(&mut project, a).unwrap();
        assert_eq!(project.start_node_id, Some(b));
        assert!(project.node(b).unwrap().is_start_node);

        let mut single = Project::new("One");
        let only = add_node(&mut single, "Only").id;
        delete_node(&mut single, only).unwrap();
        assert_eq!(single.start_node_id, None);
    }

    #[test]
    fn duplicate_node_gets_fresh_ids() {
        let (mut project, a, _, _) = three_nodes();
        let node = project.node_mut(a).unwrap();
        let original_button = add_button(node, 2.0).id;
        node.end_action = EndAction::Node { target: Some(a) };

        let copy = duplicate_node(&mut project, a).unwrap();
        assert_ne!(copy.id, a);
        assert!(!copy.is_start_node);
        assert_eq!(copy.end_action, EndAction::Node { target: None });
        assert_eq!(copy.buttons.len(), 1);
        assert_ne!(copy.buttons[0].id, original_button);
        let source = project.node(a).unwrap();
        assert_eq!(copy.x, source.x + DUPLICATE_NODE_OFFSET);
    }

    #[test]
    fn set_connection_is_idempotent() {
        let (mut project, a, b, _) = three_nodes();
        assert!(set_connection(&mut project, a, b).unwrap());
        assert!(!set_connection(&mut project, a, b).unwrap());
        assert_eq!(project.connections, vec![Connection { from: a, to: b }]);
        assert_eq!(
            project.node(a).unwrap().end_action,
            EndAction::Node { target: Some(b) }
        );
    }

    #[test]
    fn set_connection_to_missing_node_leaves_project_untouched() {
        let (mut project, a, _, _) = three_nodes();
        let before = project.clone();
        let err = set_connection(&mut project, a, NodeId::new()).unwrap_err();
        assert!(matches!(err, TimelineError::NodeNotFound(_)));
        assert_eq!(project, before);
    }

    #[test]
    fn remove_connection_clears_matching_end_action() {
        let (mut project, a, b, _) = three_nodes();
        set_connection(&mut project, a, b).unwrap();
        remove_connection(&mut project, a, b).unwrap();
        assert!(project.connections.is_empty());
        assert_eq!(project.node(a).unwrap().end_action, EndAction::None);
        assert!(matches!(
            remove_connection(&mut project, a, b),
            Err(TimelineError::ConnectionNotFound(..))
        ));
    }

    #[test]
    fn duplicate_button_offsets_position() {
        let mut node = VideoNode::new("A");
        let button = add_button(&mut node, 4.0);
        let copy = duplicate_button(&mut node, button.id).unwrap();
        assert_ne!(copy.id, button.id);
        assert_eq!(copy.position.x, button.position.x + DUPLICATE_BUTTON_OFFSET);
        assert_eq!(copy.position.y, button.position.y + DUPLICATE_BUTTON_OFFSET);
        assert_eq!(node.buttons.len(), 2);
    }

    #[test]
    fn update_button_clamps_values() {
        let mut node = VideoNode::new("A");
        let id = add_button(&mut node, 1.0).id;
        update_button(&mut node, id, |b| {
            b.time = -3.0;
            b.position.x = 140.0;
            b.link = ButtonLink::UrlLink {
                target: "https://example.com".to_string(),
            };
        })
        .unwrap();
        let button = node.button(id).unwrap();
        assert_eq!(button.time, 0.0);
        assert_eq!(button.position.x, 100.0);
        assert!(matches!(button.link, ButtonLink::UrlLink { .. }));
    }

    #[test]
    fn set_end_action_rejects_missing_target() {
        let (mut project, a, _, _) = three_nodes();
        let err = set_end_action(
            &mut project,
            a,
            EndAction::Node {
                target: Some(NodeId::new()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, TimelineError::NodeNotFound(_)));
    }
}
