use serde::Serialize;

use crate::{effective_duration, Button, ButtonId, Seconds};

/// Row a button's bar occupies in the editor timeline strip. Has no effect on playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneAssignment {
    pub button_id: ButtonId,
    pub lane: usize,
    pub start: Seconds,
    pub end: Seconds,
}

/// Stacks overlapping button windows into the fewest rows, first-fit by start time.
///
/// Assignments come back in the same order as `buttons`.
pub fn assign_lanes(buttons: &[Button], video_duration: Option<Seconds>) -> Vec<LaneAssignment> {
    let mut order: Vec<usize> = (0..buttons.len()).collect();
    order.sort_by(|&a, &b| buttons[a].time.total_cmp(&buttons[b].time).then(a.cmp(&b)));

    let mut lane_ends: Vec<Seconds> = Vec::new();
    let mut assigned: Vec<Option<LaneAssignment>> = vec![None; buttons.len()];

    for idx in order {
        let button = &buttons[idx];
        let start = button.time;
        let end = start + effective_duration(button, video_duration);

        let lane = match lane_ends.iter().position(|&lane_end| lane_end <= start) {
            Some(free) => {
                lane_ends[free] = end;
                free
            }
            None => {
                lane_ends.push(end);
                lane_ends.len() - 1
            }
        };

        assigned[idx] = Some(LaneAssignment {
            button_id: button.id,
            lane,
            start,
            end,
        });
    }

    assigned.into_iter().flatten().collect()
}

pub fn lane_count(assignments: &[LaneAssignment]) -> usize {
    assignments.iter().map(|a| a.lane + 1).max().unwrap_or(0)
}
