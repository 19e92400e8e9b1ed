use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ButtonId, TimelineError, VideoNode};

/// Buttons whose appearance time lies within this many seconds of the anchor are aligned together.
pub const ALIGN_WINDOW_SECS: f64 = 2.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Put every button on the anchor's row.
    Horizontal,
    /// Distribute buttons left to right with equal gaps.
    Spread,
}

/// Aligns the anchor and its time-neighbours. Returns how many buttons were touched.
pub fn align_buttons(
    node: &mut VideoNode,
    anchor: ButtonId,
    mode: AlignMode,
) -> Result<usize, TimelineError> {
    let anchor_button = node
        .button(anchor)
        .ok_or(TimelineError::ButtonNotFound(anchor))?;
    let anchor_time = anchor_button.time;
    let anchor_y = anchor_button.position.y;

    let mut group: Vec<usize> = node
        .buttons
        .iter()
        .enumerate()
        .filter(|(_, b)| (b.time - anchor_time).abs() <= ALIGN_WINDOW_SECS)
        .map(|(i, _)| i)
        .collect();

    match mode {
        AlignMode::Horizontal => {
            for &i in &group {
                node.buttons[i].position.y = anchor_y;
            }
        }
        AlignMode::Spread => {
            group.sort_by(|&a, &b| {
                node.buttons[a]
                    .position
                    .x
                    .total_cmp(&node.buttons[b].position.x)
            });

            let total_width: f64 = group.iter().map(|&i| node.buttons[i].style.width).sum();
            let slots = (group.len() + 1) as f64;
            let gap = ((100.0 - total_width) / slots).max(0.0);

            let mut cursor = gap;
            for &i in &group {
                let button = &mut node.buttons[i];
                button.position.x = cursor;
                cursor += button.style.width + gap;
            }
            debug!(node = %node.id, gap, total_width, "buttons spread");
        }
    }

    Ok(group.len())
}
