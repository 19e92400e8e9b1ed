use serde::Serialize;
use timeline::Seconds;
use tracing::debug;

/// Incremented every time a node (re)loads. Timers and media events carry the generation
/// they were created under; anything older than the current one is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone)]
struct PendingTimer<T> {
    generation: Generation,
    due: Seconds,
    payload: T,
}

/// Timers keyed to media time and scoped to a load generation.
#[derive(Debug, Clone)]
pub struct TimerSet<T> {
    pending: Vec<PendingTimer<T>>,
}

impl<T> Default for TimerSet<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<T> TimerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, generation: Generation, due: Seconds, payload: T) {
        self.pending.push(PendingTimer {
            generation,
            due,
            payload,
        });
    }

    pub fn cancel_all(&mut self) {
        if !self.pending.is_empty() {
            debug!(count = self.pending.len(), "timers cancelled");
        }
        self.pending.clear();
    }

    /// Removes and returns timers of `current` that are due at `now`, earliest first.
    /// Timers from any other generation are dropped without firing.
    pub fn fire_due(&mut self, now: Seconds, current: Generation) -> Vec<T> {
        let stale = self
            .pending
            .iter()
            .filter(|t| t.generation != current)
            .count();
        if stale > 0 {
            debug!(stale, generation = current.0, "stale timers discarded");
        }

        let mut due = Vec::new();
        let mut keep = Vec::with_capacity(self.pending.len());
        for timer in self.pending.drain(..) {
            if timer.generation != current {
                continue;
            }
            if timer.due <= now {
                due.push(timer);
            } else {
                keep.push(timer);
            }
        }
        self.pending = keep;

        due.sort_by(|a, b| a.due.total_cmp(&b.due));
        due.into_iter().map(|t| t.payload).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
