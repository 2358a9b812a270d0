use crate::engine::{self, Size};
use anyhow::{Context, Result};
use futures::future::try_join_all;
use web_sys::HtmlImageElement;

pub mod player;

/// Fractional frame advance per tick, scaled by the global speed factor.
pub const FRAME_STEP: f64 = 0.13;

/// Closed set of behavioral states for the player character. Each variant
/// carries its own frame-set descriptor: frame count, base sprite dimensions
/// and the asset path pattern its frames are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Run,
    Dead,
}

impl PlayerState {
    pub fn frame_count(self) -> usize {
        match self {
            PlayerState::Idle => 5,
            PlayerState::Run => 8,
            PlayerState::Dead => 5,
        }
    }

    /// Unscaled dimensions of a single source frame.
    pub fn sprite_size(self) -> Size {
        let (width, height) = match self {
            PlayerState::Idle => (53.0, 70.0),
            PlayerState::Run => (48.0, 68.0),
            PlayerState::Dead => (72.0, 70.0),
        };
        Size { width, height }
    }

    /// Terminal states hold their last frame instead of looping.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Dead)
    }

    pub fn name(self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Run => "run",
            PlayerState::Dead => "dead",
        }
    }

    /// Frames are numbered from 1 on disk.
    pub fn frame_source(self, index: usize) -> String {
        format!("characters/{0}/{0}_{1}.png", self.name(), index)
    }
}

/// Load the full frame set for a state, all frames concurrently.
pub async fn load_frames(state: PlayerState) -> Result<Vec<HtmlImageElement>> {
    let loads = (1..=state.frame_count()).map(|index| {
        let source = state.frame_source(index);
        async move { engine::load_image(&source).await }
    });
    try_join_all(loads)
        .await
        .with_context(|| format!("Failed to load '{}' frame set", state.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_state_describes_its_frame_set() {
        assert_eq!(PlayerState::Idle.frame_count(), 5);
        assert_eq!(PlayerState::Run.frame_count(), 8);
        assert_eq!(PlayerState::Dead.frame_count(), 5);

        let run = PlayerState::Run.sprite_size();
        assert_eq!(run.width, 48.0);
        assert_eq!(run.height, 68.0);
    }

    #[test]
    fn only_dead_is_terminal() {
        assert!(PlayerState::Dead.is_terminal());
        assert!(!PlayerState::Idle.is_terminal());
        assert!(!PlayerState::Run.is_terminal());
    }

    #[test]
    fn frame_sources_follow_the_asset_layout() {
        assert_eq!(
            PlayerState::Run.frame_source(3),
            "characters/run/run_3.png"
        );
        assert_eq!(
            PlayerState::Dead.frame_source(1),
            "characters/dead/dead_1.png"
        );
    }
}
