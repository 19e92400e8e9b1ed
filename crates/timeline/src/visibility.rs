//! Button visibility as a pure function of playback time.
//!
//! Each button moves through `hidden -> visible -> exiting -> hidden`. Nothing here is
//! sticky: the phase is recomputed from the current time on every call, so scrubbing
//! backwards re-enters a window and replays the entry animation.

use serde::Serialize;

use crate::{AnimationKind, Button, ButtonId, Seconds, SlideDirection, VideoNode};

/// Shortest lifetime a button can resolve to.
pub const MIN_VISIBLE_SECS: Seconds = 0.1;
/// Duration the editor pre-fills; a button still carrying it is treated as having none.
pub const PLACEHOLDER_BUTTON_DURATION: Seconds = 5.0;
/// Travel of a slide animation, in percent of the player frame.
pub const SLIDE_DISTANCE: f64 = 10.0;

/// How long a button stays on screen after `button.time`.
///
/// Resolution order: animate-out delay, explicit non-placeholder duration, the rest of
/// the video, then [`MIN_VISIBLE_SECS`].
pub fn effective_duration(button: &Button, video_duration: Option<Seconds>) -> Seconds {
    if button.animate_out.enabled {
        return button.animate_out.delay.max(0.0);
    }

    if let Some(duration) = button.duration {
        if duration > 0.0 && (duration - PLACEHOLDER_BUTTON_DURATION).abs() > f64::EPSILON {
            return duration;
        }
    }

    if let Some(total) = video_duration {
        let remaining = total - button.time;
        if remaining > 0.0 {
            return remaining;
        }
    }

    MIN_VISIBLE_SECS
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ButtonPhase {
    Hidden,
    /// `entered` is the entry animation progress in `[0, 1]`.
    Visible { entered: f64 },
    /// `progress` is the exit animation progress in `[0, 1)`.
    Exiting { progress: f64 },
}

pub fn button_phase(
    button: &Button,
    current_time: Seconds,
    video_duration: Option<Seconds>,
) -> ButtonPhase {
    let start = button.time;
    if current_time < start {
        return ButtonPhase::Hidden;
    }

    let elapsed = current_time - start;
    let visible_for = effective_duration(button, video_duration);
    if elapsed < visible_for {
        return ButtonPhase::Visible {
            entered: animation_progress(button, elapsed),
        };
    }

    if button.animate_out.enabled {
        let exit_elapsed = elapsed - visible_for;
        let exit_len = exit_length(button);
        if exit_elapsed < exit_len {
            return ButtonPhase::Exiting {
                progress: exit_elapsed / exit_len,
            };
        }
    }

    ButtonPhase::Hidden
}

fn exit_length(button: &Button) -> Seconds {
    match button.animation.kind {
        AnimationKind::None => 0.0,
        _ => button.animation.duration.max(0.0),
    }
}

fn animation_progress(button: &Button, elapsed: Seconds) -> f64 {
    let length = exit_length(button);
    if length <= 0.0 {
        1.0
    } else {
        (elapsed / length).clamp(0.0, 1.0)
    }
}

/// Render-ready transform for one visible button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFrame {
    pub opacity: f64,
    /// Percent of the player width.
    pub offset_x: f64,
    /// Percent of the player height.
    pub offset_y: f64,
}

impl AnimationFrame {
    fn resting(button: &Button) -> Self {
        Self {
            opacity: button.style.opacity,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// `away` is 0 when the button sits at rest and 1 when it is fully off.
    fn displaced(button: &Button, away: f64) -> Self {
        let mut frame = Self::resting(button);
        match button.animation.kind {
            AnimationKind::None => {}
            AnimationKind::Fade => frame.opacity = button.style.opacity * (1.0 - away),
            AnimationKind::Slide => {
                let distance = SLIDE_DISTANCE * away;
                match button.animation.direction {
                    SlideDirection::Left => frame.offset_x = -distance,
                    SlideDirection::Right => frame.offset_x = distance,
                    SlideDirection::Top => frame.offset_y = -distance,
                    SlideDirection::Bottom => frame.offset_y = distance,
                }
            }
        }
        frame
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleButton {
    pub id: ButtonId,
    #[serde(flatten)]
    pub phase: ButtonPhase,
    pub frame: AnimationFrame,
    /// Shown only because it is selected in a paused editor.
    pub pinned: bool,
}

/// Buttons of `node` that should be on screen at `current_time`.
///
/// `selection` is the editor override: pass the selected button only while playback is
/// paused, and it stays visible at rest regardless of time.
pub fn visible_buttons(
    node: &VideoNode,
    current_time: Seconds,
    selection: Option<ButtonId>,
) -> Vec<VisibleButton> {
    node.buttons
        .iter()
        .filter_map(|button| {
            let phase = button_phase(button, current_time, node.duration);
            let frame = match phase {
                ButtonPhase::Hidden => {
                    if selection == Some(button.id) {
                        return Some(VisibleButton {
                            id: button.id,
                            phase: ButtonPhase::Visible { entered: 1.0 },
                            frame: AnimationFrame::resting(button),
                            pinned: true,
                        });
                    }
                    return None;
                }
                ButtonPhase::Visible { entered } => AnimationFrame::displaced(button, 1.0 - entered),
                ButtonPhase::Exiting { progress } => AnimationFrame::displaced(button, progress),
            };
            Some(VisibleButton {
                id: button.id,
                phase,
                frame,
                pinned: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimateOut, Animation};

    fn button_at(time: f64) -> Button {
        Button::new("B", time)
    }

    #[test]
    fn duration_priority_order() {
        let mut b = button_at(4.0);
        b.duration = Some(8.0);
        b.animate_out = AnimateOut {
            enabled: true,
            delay: 2.0,
        };
        assert_eq!(effective_duration(&b, Some(30.0)), 2.0);

        b.animate_out.enabled = false;
        assert_eq!(effective_duration(&b, Some(30.0)), 8.0);

        b.duration = Some(PLACEHOLDER_BUTTON_DURATION);
        assert_eq!(effective_duration(&b, Some(30.0)), 26.0);

        b.duration = None;
        assert_eq!(effective_duration(&b, None), MIN_VISIBLE_SECS);
        assert_eq!(effective_duration(&b, Some(3.0)), MIN_VISIBLE_SECS);
    }

    #[test]
    fn window_is_half_open() {
        let mut b = button_at(2.0);
        b.duration = Some(3.0);
        assert_eq!(button_phase(&b, 1.99, None), ButtonPhase::Hidden);
        assert_eq!(button_phase(&b, 2.0, None), ButtonPhase::Visible { entered: 1.0 });
        assert_eq!(button_phase(&b, 4.99, None), ButtonPhase::Visible { entered: 1.0 });
        assert_eq!(button_phase(&b, 5.0, None), ButtonPhase::Hidden);
    }

    #[test]
    fn animate_out_goes_through_exiting() {
        let mut b = button_at(1.0);
        b.animation = Animation {
            kind: AnimationKind::Fade,
            direction: SlideDirection::Bottom,
            duration: 1.0,
        };
        b.animate_out = AnimateOut {
            enabled: true,
            delay: 2.0,
        };
        assert_eq!(button_phase(&b, 1.5, None), ButtonPhase::Visible { entered: 0.5 });
        assert_eq!(button_phase(&b, 3.5, None), ButtonPhase::Exiting { progress: 0.5 });
        assert_eq!(button_phase(&b, 4.0, None), ButtonPhase::Hidden);
        // Scrubbing back re-enters.
        assert_eq!(button_phase(&b, 2.0, None), ButtonPhase::Visible { entered: 1.0 });
    }

    #[test]
    fn animate_out_without_animation_hides_immediately() {
        let mut b = button_at(0.0);
        b.animate_out = AnimateOut {
            enabled: true,
            delay: 1.0,
        };
        assert_eq!(button_phase(&b, 1.0, None), ButtonPhase::Hidden);
    }

    #[test]
    fn slide_frames_follow_direction() {
        let mut b = button_at(0.0);
        b.duration = Some(10.0);
        b.animation = Animation {
            kind: AnimationKind::Slide,
            direction: SlideDirection::Left,
            duration: 1.0,
        };
        let mut node = VideoNode::new("A");
        node.buttons.push(b);
        let visible = visible_buttons(&node, 0.5, None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].frame.offset_x, -SLIDE_DISTANCE * 0.5);
        assert_eq!(visible[0].frame.offset_y, 0.0);
    }

    #[test]
    fn selected_button_is_pinned_outside_its_window() {
        let mut node = VideoNode::new("A");
        let mut b = button_at(10.0);
        b.duration = Some(1.0);
        let id = b.id;
        node.buttons.push(b);

        assert!(visible_buttons(&node, 0.0, None).is_empty());
        let pinned = visible_buttons(&node, 0.0, Some(id));
        assert_eq!(pinned.len(), 1);
        assert!(pinned[0].pinned);
        assert_eq!(pinned[0].frame.opacity, 1.0);
    }

    #[test]
    fn buttons_default_to_the_end_of_the_video() {
        let mut node = VideoNode::new("A");
        node.duration = Some(12.0);
        node.buttons.push(button_at(3.0));
        assert_eq!(visible_buttons(&node, 11.9, None).len(), 1);
        assert!(visible_buttons(&node, 12.0, None).is_empty());
    }
}
