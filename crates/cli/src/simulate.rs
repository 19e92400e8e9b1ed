//! Scripted playback for checking a project's branching without a browser.

use anyhow::{bail, Result};
use playback::{MediaFailure, Player, PlayerEffect, PlayerState};
use std::str::FromStr;
use timeline::{ButtonId, NodeId, Project};

/// One scripted input.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The current video played to the end.
    End,
    /// The stream failed to load.
    StreamError,
    /// Click a button on the current node, by id or by its label.
    Click(String),
}

impl FromStr for Event {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "end" => Ok(Event::End),
            "stream-error" => Ok(Event::StreamError),
            other => match other.strip_prefix("click:") {
                Some(target) if !target.trim().is_empty() => {
                    Ok(Event::Click(target.trim().to_string()))
                }
                _ => bail!("unknown event {:?} (expected end, stream-error or click:<button>)", s),
            },
        }
    }
}

/// Runs `events` against a fresh player and returns the printed log.
///
/// Without events the video is left to end on its own until playback stops, leaves for
/// a URL, or `max_steps` transitions have happened.
pub fn run(project: Project, events: &[Event], max_steps: usize) -> Result<Vec<String>> {
    let mut player = Player::new(project);
    let mut log = Vec::new();

    let effects = player.start()?;
    describe(&player, &effects, &mut log);

    if events.is_empty() {
        for _ in 0..max_steps {
            if !matches!(player.state(), PlayerState::Playing { .. }) {
                break;
            }
            let effects = player.video_ended(player.generation())?;
            let left = effects
                .iter()
                .any(|e| matches!(e, PlayerEffect::OpenUrl { .. }));
            describe(&player, &effects, &mut log);
            if left {
                break;
            }
        }
        return Ok(log);
    }

    for event in events {
        let effects = match event {
            Event::End => player.video_ended(player.generation())?,
            Event::StreamError => {
                player.media_error(player.generation(), MediaFailure::HlsNetwork)?
            }
            Event::Click(target) => {
                let button = find_button(&player, target)?;
                player.click(button)?
            }
        };
        describe(&player, &effects, &mut log);
    }
    Ok(log)
}

fn find_button(player: &Player, target: &str) -> Result<ButtonId> {
    let Some(node) = player.current_node() else {
        bail!("nothing is playing");
    };
    node.buttons
        .iter()
        .find(|b| b.id.to_string() == target || b.text == target)
        .map(|b| b.id)
        .ok_or_else(|| anyhow::anyhow!("no button {:?} on node {:?}", target, node.name))
}

fn describe(player: &Player, effects: &[PlayerEffect], log: &mut Vec<String>) {
    let name = |id: NodeId| {
        player
            .project()
            .node(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    for effect in effects {
        let line = match effect {
            PlayerEffect::LoadVideo { node, url, .. } => format!("play  {} ({})", name(*node), url),
            PlayerEffect::Replay { node, .. } => {
                format!("loop  {} ({}/{})", name(*node), player.loop_count(), playback::MAX_AUTO_LOOPS)
            }
            PlayerEffect::OpenUrl { url } => format!("open  {}", url),
            PlayerEffect::ShowEmbed { embed_code, .. } => format!("embed {}", embed_code),
            PlayerEffect::Stop { node } => format!("stop  {}", name(*node)),
        };
        log.push(line);
    }
}
