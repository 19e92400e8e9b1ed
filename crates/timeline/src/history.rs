use std::collections::VecDeque;

use tracing::debug;

use crate::Project;

/// Number of snapshots kept before the oldest is dropped.
pub const UNDO_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// What the user did right after this snapshot was taken ("Delete node", ...).
    pub label: String,
    pub snapshot: Project,
}

/// Bounded stack of whole-project snapshots. Undo only; there is no redo branch.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(UNDO_CAPACITY)
    }
}

impl UndoHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Records the state *before* a mutation, evicting the oldest entry when full.
    pub fn push(&mut self, label: impl Into<String>, snapshot: Project) {
        if self.entries.len() == self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(label = %evicted.label, "undo history full, oldest entry dropped");
            }
        }
        let label = label.into();
        debug!(label = %label, depth = self.entries.len() + 1, "undo snapshot pushed");
        self.entries.push_back(HistoryEntry { label, snapshot });
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        let entry = self.entries.pop_back()?;
        debug!(label = %entry.label, depth = self.entries.len(), "undo snapshot popped");
        Some(entry)
    }

    /// Drops the newest snapshot without restoring it, e.g. when a confirm dialog is cancelled.
    pub fn discard_last(&mut self) -> bool {
        self.entries.pop_back().is_some()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.entries.back().map(|e| e.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = UndoHistory::default();
        for i in 0..=UNDO_CAPACITY {
            history.push(format!("edit {}", i), Project::new(format!("v{}", i)));
        }
        assert_eq!(history.len(), UNDO_CAPACITY);

        let mut names = Vec::new();
        while let Some(entry) = history.pop() {
            names.push(entry.snapshot.name);
        }
        assert_eq!(names.first().map(String::as_str), Some("v20"));
        assert_eq!(names.last().map(String::as_str), Some("v1"));
    }

    #[test]
    fn discard_last_does_not_touch_older_entries() {
        let mut history = UndoHistory::new(3);
        history.push("a", Project::new("a"));
        history.push("b", Project::new("b"));
        assert!(history.discard_last());
        assert_eq!(history.undo_label(), Some("a"));
        assert!(history.discard_last());
        assert!(!history.discard_last());
        assert!(history.is_empty());
    }
}
