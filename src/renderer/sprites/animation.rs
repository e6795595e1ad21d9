//! Staged sprite animations and their playback engine.

use glam::Vec2;
use std::rc::Rc;

use crate::core::error::Result;
use crate::core::types::Seconds;
use crate::renderer::sprites::atlas::SpriteComponent;
use crate::renderer::sprites::sprite::Sprite;

/// One frame of an animation.
#[derive(Clone, Debug)]
pub struct AnimationStage {
    pub component: Rc<SpriteComponent>,
    /// Seconds the stage is shown; zero-length stages are skipped within a tick.
    pub duration: Seconds,
    pub anchor: String,
}

/// An ordered, immutable sequence of stages.
#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub stages: Vec<AnimationStage>,
}

impl Animation {
    pub fn new(name: impl Into<String>, stages: Vec<AnimationStage>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    pub fn total_duration(&self) -> Seconds {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Largest stage footprint, for laying out animation previews
    pub fn max_size(&self) -> Vec2 {
        self.stages
            .iter()
            .map(|s| s.component.rect.size())
            .fold(Vec2::ZERO, Vec2::max)
    }
}

/// Plays an animation's stages in order on a sprite.
#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    pub animation: Rc<Animation>,
    index: usize,
    /// Time left on the current stage; non-positive means the stage is over.
    remaining: Seconds,
    complete: bool,
}

impl AnimationPlayer {
    pub fn new(animation: Rc<Animation>) -> Self {
        Self {
            animation,
            index: 0,
            remaining: 0.0,
            complete: false,
        }
    }

    pub fn stage_index(&self) -> usize {
        self.index
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Rewind to the first stage, show it, then play `extra_time` into it.
    pub fn start(&mut self, sprite: &mut Sprite, extra_time: Seconds) -> Result<Option<Seconds>> {
        self.index = 0;
        self.complete = false;
        let Some(first) = self.animation.stages.first() else {
            self.complete = true;
            return Ok(Some(extra_time));
        };
        self.remaining = first.duration;
        self.apply_stage(sprite)?;
        self.consume(sprite, extra_time)
    }

    /// Returns the leftover time once the last stage has run out.
    pub fn advance(&mut self, sprite: &mut Sprite, dt: Seconds) -> Result<Option<Seconds>> {
        if self.complete {
            return Ok(None);
        }
        self.consume(sprite, dt)
    }

    fn consume(&mut self, sprite: &mut Sprite, dt: Seconds) -> Result<Option<Seconds>> {
        self.remaining -= dt;
        while self.remaining <= 0.0 {
            let carry = -self.remaining;
            self.index += 1;
            if self.index >= self.animation.stages.len() {
                self.complete = true;
                return Ok(Some(carry));
            }
            self.apply_stage(sprite)?;
            self.remaining = self.animation.stages[self.index].duration - carry;
        }
        Ok(None)
    }

    fn apply_stage(&self, sprite: &mut Sprite) -> Result<()> {
        let stage = &self.animation.stages[self.index];
        sprite.set_component(
            stage.component.clone(),
            Vec2::ZERO,
            Some(stage.duration),
            &stage.anchor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SpriteHandle;
    use crate::renderer::sprites::atlas::{SpriteRegion, CENTER_ANCHOR};

    fn animation(durations: &[f32]) -> Rc<Animation> {
        let stages = durations
            .iter()
            .enumerate()
            .map(|(i, d)| AnimationStage {
                component: Rc::new(SpriteComponent::new(
                    format!("frame.{}", i),
                    SpriteRegion::new(i as u32 * 8, 0, 8, 8),
                )),
                duration: *d,
                anchor: CENTER_ANCHOR.to_string(),
            })
            .collect();
        Rc::new(Animation::new("test", stages))
    }

    fn sprite() -> Sprite {
        Sprite::new(SpriteHandle::new(0, 0), Vec2::ZERO, 0)
    }

    #[test]
    fn test_start_applies_first_stage() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.1, 0.1]));
        assert_eq!(player.start(&mut sprite, 0.0).unwrap(), None);
        assert_eq!(sprite.component_name(), Some("frame.0"));
        assert_eq!(player.stage_index(), 0);
    }

    #[test]
    fn test_stage_advance() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.5, 0.5]));
        player.start(&mut sprite, 0.0).unwrap();

        assert_eq!(player.advance(&mut sprite, 0.25).unwrap(), None);
        assert_eq!(sprite.component_name(), Some("frame.0"));

        assert_eq!(player.advance(&mut sprite, 0.5).unwrap(), None);
        assert_eq!(sprite.component_name(), Some("frame.1"));
    }

    #[test]
    fn test_exact_completion_has_zero_overshoot() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.5, 0.5]));
        player.start(&mut sprite, 0.0).unwrap();
        assert_eq!(player.advance(&mut sprite, 1.0).unwrap(), Some(0.0));
        assert!(player.is_complete());
    }

    #[test]
    fn test_overshoot_reports_excess() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.5, 0.5]));
        player.start(&mut sprite, 0.0).unwrap();
        let leftover = player.advance(&mut sprite, 1.25).unwrap().unwrap();
        assert!((leftover - 0.25).abs() < 1e-6);
        assert_eq!(sprite.component_name(), Some("frame.1"));
    }

    #[test]
    fn test_zero_duration_stages_consumed_in_one_tick() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.5, 0.0, 0.0, 0.5]));
        player.start(&mut sprite, 0.0).unwrap();
        assert_eq!(player.advance(&mut sprite, 0.75).unwrap(), None);
        assert_eq!(player.stage_index(), 3);
        assert_eq!(sprite.component_name(), Some("frame.3"));
    }

    #[test]
    fn test_extra_time_carries_into_start() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(animation(&[0.5, 0.5]));
        assert_eq!(player.start(&mut sprite, 0.6).unwrap(), None);
        assert_eq!(player.stage_index(), 1);
    }

    #[test]
    fn test_empty_animation_completes_on_start() {
        let mut sprite = sprite();
        let mut player = AnimationPlayer::new(Rc::new(Animation::new("empty", vec![])));
        assert_eq!(player.start(&mut sprite, 0.3).unwrap(), Some(0.3));
        assert!(player.is_complete());
    }

    #[test]
    fn test_max_size() {
        let anim = animation(&[0.1, 0.2]);
        assert_eq!(anim.max_size(), Vec2::new(8.0, 8.0));
        assert!((anim.total_duration() - 0.3).abs() < 1e-6);
    }
}
