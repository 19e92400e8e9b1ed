//! Editor session: the project being edited, the current selection and undo history.
//!
//! Every mutating call snapshots the project before touching it. If the edit fails the
//! snapshot is discarded, so a rejected edit leaves neither the graph nor the history
//! changed.

use std::time::Instant;

use tracing::{debug, warn};

use crate::{
    align_buttons, commands, visible_buttons, AlignMode, AutosaveDebounce, Button, ButtonId,
    EndAction, NodeId, Project, Seconds, TimelineError, UndoHistory, VideoNode, VisibleButton,
};

#[derive(Debug, Clone)]
pub struct EditorSession {
    project: Project,
    selected_node: Option<NodeId>,
    selected_button: Option<ButtonId>,
    history: UndoHistory,
    autosave: AutosaveDebounce,
    dragging: bool,
    /// A confirmed edit will reuse the snapshot pushed by `checkpoint`.
    pending_checkpoint: bool,
}

impl EditorSession {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            selected_node: None,
            selected_button: None,
            history: UndoHistory::default(),
            autosave: AutosaveDebounce::default(),
            dragging: false,
            pending_checkpoint: false,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn autosave_due(&self, now: Instant) -> bool {
        self.autosave.is_due(now)
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn mark_saved(&mut self) {
        self.autosave.mark_saved();
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected_node
    }

    pub fn selected_button(&self) -> Option<ButtonId> {
        self.selected_button
    }

    pub fn select_node(&mut self, node_id: NodeId) -> Result<(), TimelineError> {
        if !self.project.contains_node(node_id) {
            return Err(TimelineError::NodeNotFound(node_id));
        }
        if self.selected_node != Some(node_id) {
            self.selected_button = None;
        }
        self.selected_node = Some(node_id);
        Ok(())
    }

    pub fn select_button(&mut self, node_id: NodeId, button_id: ButtonId) -> Result<(), TimelineError> {
        let node = self
            .project
            .node(node_id)
            .ok_or(TimelineError::NodeNotFound(node_id))?;
        if node.button(button_id).is_none() {
            return Err(TimelineError::ButtonNotFound(button_id));
        }
        self.selected_node = Some(node_id);
        self.selected_button = Some(button_id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected_node = None;
        self.selected_button = None;
    }

    /// Pushes a snapshot ahead of an edit the caller is about to confirm. The next
    /// mutation records into this snapshot instead of pushing its own.
    pub fn checkpoint(&mut self, label: &str) {
        if self.pending_checkpoint {
            return;
        }
        self.history.push(label, self.project.clone());
        self.pending_checkpoint = true;
    }

    /// Pops the snapshot pushed by [`checkpoint`](Self::checkpoint) when the user backs out.
    pub fn cancel_checkpoint(&mut self) -> bool {
        if !std::mem::take(&mut self.pending_checkpoint) {
            return false;
        }
        self.history.discard_last()
    }

    pub fn undo(&mut self) -> Result<(), TimelineError> {
        self.dragging = false;
        self.pending_checkpoint = false;
        let entry = self
            .history
            .pop()
            .ok_or(TimelineError::HistoryEmpty("undo stack"))?;
        self.project = entry.snapshot;
        self.revalidate_selection();
        self.touched();
        debug!(label = %entry.label, "undo applied");
        Ok(())
    }

    /// Starts a drag; moves and resizes until [`end_drag`](Self::end_drag) share one undo step.
    pub fn begin_drag(&mut self, label: &str) {
        if self.dragging {
            return;
        }
        if !std::mem::take(&mut self.pending_checkpoint) {
            self.history.push(label, self.project.clone());
        }
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        if !self.dragging {
            return;
        }
        self.dragging = false;
        if let Some(entry) = self.history.pop() {
            if entry.snapshot == self.project {
                debug!(label = %entry.label, "drag ended without changes");
            } else {
                self.history.push(entry.label, entry.snapshot);
            }
        }
    }

    pub fn add_node(&mut self, name: &str) -> Result<NodeId, TimelineError> {
        self.apply("Add node", |project| Ok(commands::add_node(project, name).id))
    }

    pub fn delete_node(&mut self, node_id: NodeId) -> Result<(), TimelineError> {
        self.apply("Delete node", |project| {
            commands::delete_node(project, node_id).map(|_| ())
        })?;
        self.revalidate_selection();
        Ok(())
    }

    pub fn duplicate_node(&mut self, node_id: NodeId) -> Result<NodeId, TimelineError> {
        self.apply("Duplicate node", |project| {
            commands::duplicate_node(project, node_id).map(|n| n.id)
        })
    }

    pub fn rename_node(&mut self, node_id: NodeId, name: &str) -> Result<(), TimelineError> {
        self.apply("Rename node", |project| {
            commands::rename_node(project, node_id, name)
        })
    }

    pub fn set_node_url(&mut self, node_id: NodeId, url: &str) -> Result<(), TimelineError> {
        self.apply("Change video", |project| {
            commands::set_node_url(project, node_id, url)
        })
    }

    pub fn set_start_node(&mut self, node_id: NodeId) -> Result<(), TimelineError> {
        self.apply("Set start node", |project| {
            commands::set_start_node(project, node_id)
        })
    }

    pub fn set_end_action(&mut self, node_id: NodeId, action: EndAction) -> Result<(), TimelineError> {
        self.apply("Change end action", |project| {
            commands::set_end_action(project, node_id, action)
        })
    }

    pub fn move_node(&mut self, node_id: NodeId, x: f64, y: f64) -> Result<(), TimelineError> {
        self.apply_coalesced("Move node", |project| {
            commands::move_node(project, node_id, x, y)
        })
    }

    /// Returns `false` when the connection already existed; nothing is recorded then.
    pub fn set_connection(&mut self, from: NodeId, to: NodeId) -> Result<bool, TimelineError> {
        let added = self.apply("Connect nodes", |project| {
            commands::set_connection(project, from, to)
        })?;
        if !added {
            self.history.discard_last();
        }
        Ok(added)
    }

    pub fn remove_connection(&mut self, from: NodeId, to: NodeId) -> Result<(), TimelineError> {
        self.apply("Disconnect nodes", |project| {
            commands::remove_connection(project, from, to)
        })
    }

    pub fn add_button(&mut self, node_id: NodeId, at_time: Seconds) -> Result<ButtonId, TimelineError> {
        self.apply_on_node("Add button", node_id, |node| {
            Ok(commands::add_button(node, at_time).id)
        })
    }

    pub fn delete_button(&mut self, node_id: NodeId, button_id: ButtonId) -> Result<(), TimelineError> {
        self.apply_on_node("Delete button", node_id, |node| {
            commands::delete_button(node, button_id).map(|_| ())
        })?;
        self.revalidate_selection();
        Ok(())
    }

    pub fn duplicate_button(
        &mut self,
        node_id: NodeId,
        button_id: ButtonId,
    ) -> Result<ButtonId, TimelineError> {
        self.apply_on_node("Duplicate button", node_id, |node| {
            commands::duplicate_button(node, button_id).map(|b| b.id)
        })
    }

    pub fn update_button(
        &mut self,
        node_id: NodeId,
        button_id: ButtonId,
        edit: impl FnOnce(&mut Button),
    ) -> Result<(), TimelineError> {
        self.apply_on_node("Edit button", node_id, |node| {
            commands::update_button(node, button_id, edit)
        })
    }

    pub fn move_button(
        &mut self,
        node_id: NodeId,
        button_id: ButtonId,
        x: f64,
        y: f64,
    ) -> Result<(), TimelineError> {
        self.apply_coalesced("Move button", |project| {
            let node = project
                .node_mut(node_id)
                .ok_or(TimelineError::NodeNotFound(node_id))?;
            commands::move_button(node, button_id, x, y)
        })
    }

    pub fn resize_button(
        &mut self,
        node_id: NodeId,
        button_id: ButtonId,
        width: f64,
        height: f64,
    ) -> Result<(), TimelineError> {
        self.apply_coalesced("Resize button", |project| {
            let node = project
                .node_mut(node_id)
                .ok_or(TimelineError::NodeNotFound(node_id))?;
            commands::resize_button(node, button_id, width, height)
        })
    }

    pub fn align_buttons(
        &mut self,
        node_id: NodeId,
        anchor: ButtonId,
        mode: AlignMode,
    ) -> Result<usize, TimelineError> {
        self.apply_on_node("Align buttons", node_id, |node| {
            align_buttons(node, anchor, mode)
        })
    }

    /// Records the probed media length. Not an edit, so it is neither undoable nor dirtying.
    pub fn set_node_duration(&mut self, node_id: NodeId, duration: Seconds) -> Result<(), TimelineError> {
        let node = self
            .project
            .node_mut(node_id)
            .ok_or(TimelineError::NodeNotFound(node_id))?;
        node.duration = Some(duration.max(0.0));
        Ok(())
    }

    /// Buttons to draw over `node_id` at `current_time`; the selection is pinned only while paused.
    pub fn visible_buttons(
        &self,
        node_id: NodeId,
        current_time: Seconds,
        paused: bool,
    ) -> Result<Vec<VisibleButton>, TimelineError> {
        let node = self
            .project
            .node(node_id)
            .ok_or(TimelineError::NodeNotFound(node_id))?;
        let selection = if paused && self.selected_node == Some(node_id) {
            self.selected_button
        } else {
            None
        };
        Ok(visible_buttons(node, current_time, selection))
    }

    fn apply<T>(
        &mut self,
        label: &str,
        edit: impl FnOnce(&mut Project) -> Result<T, TimelineError>,
    ) -> Result<T, TimelineError> {
        self.snapshot(label);
        self.run(label, true, edit)
    }

    fn apply_coalesced<T>(
        &mut self,
        label: &str,
        edit: impl FnOnce(&mut Project) -> Result<T, TimelineError>,
    ) -> Result<T, TimelineError> {
        let checkpointed = !self.dragging;
        if checkpointed {
            self.snapshot(label);
        }
        self.run(label, checkpointed, edit)
    }

    fn apply_on_node<T>(
        &mut self,
        label: &str,
        node_id: NodeId,
        edit: impl FnOnce(&mut VideoNode) -> Result<T, TimelineError>,
    ) -> Result<T, TimelineError> {
        self.apply(label, |project| {
            let node = project
                .node_mut(node_id)
                .ok_or(TimelineError::NodeNotFound(node_id))?;
            edit(node)
        })
    }

    fn run<T>(
        &mut self,
        label: &str,
        checkpointed: bool,
        edit: impl FnOnce(&mut Project) -> Result<T, TimelineError>,
    ) -> Result<T, TimelineError> {
        match edit(&mut self.project) {
            Ok(value) => {
                self.touched();
                Ok(value)
            }
            Err(err) => {
                if checkpointed {
                    self.history.discard_last();
                }
                warn!(label, error = %err, "edit rejected");
                Err(err)
            }
        }
    }

    /// Pushes the pre-edit snapshot unless a confirmed checkpoint already holds it.
    fn snapshot(&mut self, label: &str) {
        if !std::mem::take(&mut self.pending_checkpoint) {
            self.history.push(label, self.project.clone());
        }
    }

    fn touched(&mut self) {
        self.autosave.mark_edited(Instant::now());
    }

    /// Drops selection that no longer points into the graph.
    fn revalidate_selection(&mut self) {
        let node = self.selected_node.and_then(|id| self.project.node(id));
        match node {
            None => {
                self.selected_node = None;
                self.selected_button = None;
            }
            Some(node) => {
                if let Some(button) = self.selected_button {
                    if node.button(button).is_none() {
                        self.selected_button = None;
                    }
                }
            }
        }
    }
}
