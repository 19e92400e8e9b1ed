//! Debounced autosave timing.
//!
//! `AutosaveDebounce` owns no thread or task. The caller records edits and polls
//! [`AutosaveDebounce::is_due`]; a save is due once the project has been quiet for the
//! debounce delay. Saves are last-writer-wins at the store, so an autosave racing an
//! explicit save simply overwrites it with the same or newer state.

use std::time::{Duration, Instant};

use tracing::debug;

pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct AutosaveDebounce {
    delay: Duration,
    last_edit: Option<Instant>,
}

impl Default for AutosaveDebounce {
    fn default() -> Self {
        Self::new(AUTOSAVE_DEBOUNCE)
    }
}

impl AutosaveDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_edit: None,
        }
    }

    /// Every edit pushes the deadline back.
    pub fn mark_edited(&mut self, now: Instant) {
        if self.last_edit.is_none() {
            debug!("project has unsaved changes");
        }
        self.last_edit = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.last_edit.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_edit
            .map(|edited| now.saturating_duration_since(edited) >= self.delay)
            .unwrap_or(false)
    }

    /// Time left before a save becomes due, `None` when clean.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.last_edit
            .map(|edited| self.delay.saturating_sub(now.saturating_duration_since(edited)))
    }

    pub fn mark_saved(&mut self) {
        self.last_edit = None;
        debug!("autosave state cleared");
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_state_is_never_due() {
        let saver = AutosaveDebounce::default();
        assert!(!saver.is_due(Instant::now()));
        assert_eq!(saver.remaining(Instant::now()), None);
    }

    #[test]
    fn later_edits_push_the_deadline_back() {
        let mut saver = AutosaveDebounce::default();
        let t0 = Instant::now();
        saver.mark_edited(t0);
        assert!(!saver.is_due(t0 + Duration::from_millis(1500)));

        saver.mark_edited(t0 + Duration::from_millis(1500));
        assert!(!saver.is_due(t0 + Duration::from_millis(2500)));
        assert!(saver.is_due(t0 + Duration::from_millis(3500)));

        saver.mark_saved();
        assert!(!saver.is_dirty());
        assert!(!saver.is_due(t0 + Duration::from_secs(10)));
    }
}
