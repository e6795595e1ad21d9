//! Transition engines: time-bounded visual changes attached to a sprite.
//!
//! Every engine follows the same contract. `start` begins the change and may
//! immediately play some extra time into it; `advance` consumes a time delta.
//! Both return `Some(overshoot)` on the call that completes the engine, where
//! `overshoot` is the part of the delta the engine did not need. Chained
//! transitions start with that overshoot so timing never drifts with the
//! frame rate.

use glam::Vec2;
use std::rc::Rc;

use crate::core::error::Result;
use crate::core::types::{EngineId, Opacity, Seconds, SpriteHandle};
use crate::renderer::sprites::animation::{Animation, AnimationPlayer};
use crate::renderer::sprites::atlas::{SpriteComponent, CENTER_ANCHOR};
use crate::renderer::sprites::manager::SpriteManager;
use crate::renderer::sprites::sprite::Sprite;

/// Points in an engine's life that callbacks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    OnComplete,
}

/// Passed to completion callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub sprite: SpriteHandle,
    pub engine: EngineId,
    pub overshoot: Seconds,
}

/// A completion callback. It runs once, after its engine has been detached
/// from the sprite, with full access to the sprite manager.
pub type Callback = Box<dyn FnOnce(&mut SpriteManager, Completion) -> Result<()>>;

/// Callbacks registered per hook, kept in registration order.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Vec<(Hook, Callback)>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hook: Hook, callback: Callback) {
        self.callbacks.push((hook, callback));
    }

    pub fn on_complete(
        mut self,
        callback: impl FnOnce(&mut SpriteManager, Completion) -> Result<()> + 'static,
    ) -> Self {
        self.add(Hook::OnComplete, Box::new(callback));
        self
    }

    /// Remove and return every callback for `hook`, in registration order
    pub fn take(&mut self, hook: Hook) -> Vec<Callback> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.callbacks)
            .into_iter()
            .partition(|(h, _)| *h == hook);
        self.callbacks = kept;
        taken.into_iter().map(|(_, cb)| cb).collect()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Pure timer.
#[derive(Debug, Clone)]
pub struct StaticDelay {
    remaining: Seconds,
    complete: bool,
}

impl StaticDelay {
    pub fn new(duration: Seconds) -> Self {
        Self {
            remaining: duration,
            complete: false,
        }
    }

    fn advance(&mut self, dt: Seconds) -> Option<Seconds> {
        if self.complete {
            return None;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.complete = true;
            Some(-self.remaining)
        } else {
            None
        }
    }
}

/// Straight-line move at constant speed.
#[derive(Debug, Clone)]
pub struct MoveEngine {
    pub destination: Vec2,
    pub speed: f32,
    unit: Vec2,
    complete: bool,
}

impl MoveEngine {
    /// The direction is fixed here, from `start` to `destination`.
    pub fn new(start: Vec2, destination: Vec2, speed: f32) -> Self {
        Self {
            destination,
            speed,
            unit: (destination - start).normalize_or_zero(),
            complete: false,
        }
    }

    fn advance(&mut self, sprite: &mut Sprite, dt: Seconds) -> Option<Seconds> {
        if self.complete {
            return None;
        }
        let position = sprite.position();
        if self.unit == Vec2::ZERO {
            return Some(self.finish(sprite, dt));
        }

        let next = position + self.unit * self.speed * dt;
        // Axes the move does not travel along cannot overshoot
        let overshot_x = self.unit.x != 0.0 && (next.x - self.destination.x) * self.unit.x.signum() >= 0.0;
        let overshot_y = self.unit.y != 0.0 && (next.y - self.destination.y) * self.unit.y.signum() >= 0.0;

        if overshot_x || overshot_y {
            let needed = (self.destination - position).length() / self.speed;
            Some(self.finish(sprite, (dt - needed).max(0.0)))
        } else {
            sprite.set_position(next);
            None
        }
    }

    fn finish(&mut self, sprite: &mut Sprite, overshoot: Seconds) -> Seconds {
        sprite.set_position(self.destination);
        self.complete = true;
        overshoot
    }
}

/// A move that loops a walk animation while travelling and settles on a
/// resting pose at the destination.
#[derive(Debug, Clone)]
pub struct MoveWithAnimationEngine {
    movement: MoveEngine,
    walk_animation: Rc<Animation>,
    walk: Option<AnimationPlayer>,
    resting: Option<Rc<SpriteComponent>>,
    resting_anchor: String,
}

impl MoveWithAnimationEngine {
    pub fn new(movement: MoveEngine, walk_animation: Rc<Animation>) -> Self {
        Self {
            movement,
            walk_animation,
            walk: None,
            resting: None,
            resting_anchor: CENTER_ANCHOR.to_string(),
        }
    }

    pub fn with_resting(mut self, component: Rc<SpriteComponent>, anchor: impl Into<String>) -> Self {
        self.resting = Some(component);
        self.resting_anchor = anchor.into();
        self
    }

    pub fn is_walking(&self) -> bool {
        self.walk.is_some()
    }

    fn start(&mut self, sprite: &mut Sprite, extra_time: Seconds) -> Result<Option<Seconds>> {
        if let Some(overshoot) = self.movement.advance(sprite, extra_time) {
            return self.settle(sprite, overshoot).map(Some);
        }
        let mut player = AnimationPlayer::new(self.walk_animation.clone());
        let leftover = player.start(sprite, extra_time)?;
        self.walk = Some(player);
        self.keep_walking(sprite, leftover)?;
        Ok(None)
    }

    fn advance(&mut self, sprite: &mut Sprite, dt: Seconds) -> Result<Option<Seconds>> {
        if let Some(overshoot) = self.movement.advance(sprite, dt) {
            return self.settle(sprite, overshoot).map(Some);
        }
        let leftover = match self.walk.as_mut() {
            Some(player) => player.advance(sprite, dt)?,
            None => None,
        };
        self.keep_walking(sprite, leftover)?;
        Ok(None)
    }

    /// Restart the walk each time it runs out, carrying the leftover time
    fn keep_walking(&mut self, sprite: &mut Sprite, mut leftover: Option<Seconds>) -> Result<()> {
        if self.walk_animation.total_duration() <= 0.0 {
            return Ok(());
        }
        while let (Some(extra), Some(player)) = (leftover, self.walk.as_mut()) {
            leftover = player.start(sprite, extra)?;
        }
        Ok(())
    }

    fn settle(&mut self, sprite: &mut Sprite, overshoot: Seconds) -> Result<Seconds> {
        self.walk = None;
        if let Some(resting) = &self.resting {
            sprite.set_component(resting.clone(), Vec2::ZERO, None, &self.resting_anchor)?;
        }
        Ok(overshoot)
    }
}

/// Linear opacity ramp, floored to whole channel values.
#[derive(Debug, Clone)]
pub struct FadeEngine {
    pub target: Opacity,
    pub duration: Seconds,
    from: Option<Opacity>,
    elapsed: Seconds,
    complete: bool,
}

impl FadeEngine {
    /// `duration` must be positive; a zero-length fade is a plain opacity set.
    pub fn new(target: Opacity, duration: Seconds) -> Self {
        Self {
            target,
            duration,
            from: None,
            elapsed: 0.0,
            complete: false,
        }
    }

    /// Fade from a fixed start value instead of the sprite's current opacity
    pub fn from_opacity(mut self, from: Opacity) -> Self {
        self.from = Some(from);
        self
    }

    fn start(&mut self, sprite: &mut Sprite, extra_time: Seconds) -> Option<Seconds> {
        let from = *self.from.get_or_insert(sprite.opacity());
        sprite.set_opacity(from);
        self.advance(sprite, extra_time)
    }

    fn advance(&mut self, sprite: &mut Sprite, dt: Seconds) -> Option<Seconds> {
        if self.complete {
            return None;
        }
        let from = self.from.unwrap_or(sprite.opacity()) as f32;
        self.elapsed += dt;
        let fraction = (self.elapsed / self.duration).min(1.0);
        let value = (from + (self.target as f32 - from) * fraction).floor();
        let opacity = value.clamp(0.0, 255.0) as Opacity;
        sprite.set_opacity(opacity);

        if opacity == self.target {
            self.complete = true;
            Some((self.elapsed - self.duration).max(0.0))
        } else {
            None
        }
    }
}

/// The closed set of engine variants.
#[derive(Debug, Clone)]
pub enum TransitionEngine {
    StaticDelay(StaticDelay),
    Move(MoveEngine),
    MoveWithAnimation(MoveWithAnimationEngine),
    Fade(FadeEngine),
    Animation(AnimationPlayer),
}

impl TransitionEngine {
    pub fn start(&mut self, sprite: &mut Sprite, extra_time: Seconds) -> Result<Option<Seconds>> {
        match self {
            Self::StaticDelay(delay) => Ok(delay.advance(extra_time)),
            Self::Move(movement) => Ok(movement.advance(sprite, extra_time)),
            Self::MoveWithAnimation(engine) => engine.start(sprite, extra_time),
            Self::Fade(fade) => Ok(fade.start(sprite, extra_time)),
            Self::Animation(player) => player.start(sprite, extra_time),
        }
    }

    pub fn advance(&mut self, sprite: &mut Sprite, dt: Seconds) -> Result<Option<Seconds>> {
        match self {
            Self::StaticDelay(delay) => Ok(delay.advance(dt)),
            Self::Move(movement) => Ok(movement.advance(sprite, dt)),
            Self::MoveWithAnimation(engine) => engine.advance(sprite, dt),
            Self::Fade(fade) => Ok(fade.advance(sprite, dt)),
            Self::Animation(player) => player.advance(sprite, dt),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::StaticDelay(delay) => delay.complete,
            Self::Move(movement) => movement.complete,
            Self::MoveWithAnimation(engine) => engine.movement.complete,
            Self::Fade(fade) => fade.complete,
            Self::Animation(player) => player.is_complete(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StaticDelay(_) => "delay",
            Self::Move(_) => "move",
            Self::MoveWithAnimation(_) => "move_with_animation",
            Self::Fade(_) => "fade",
            Self::Animation(_) => "animation",
        }
    }

    pub fn as_animation(&self) -> Option<&AnimationPlayer> {
        match self {
            Self::Animation(player) => Some(player),
            _ => None,
        }
    }
}

/// An engine attached to a sprite, with its callbacks.
#[derive(Debug)]
pub struct Transition {
    pub id: EngineId,
    pub engine: TransitionEngine,
    pub callbacks: CallbackRegistry,
}

impl Transition {
    pub fn new(id: EngineId, engine: TransitionEngine, callbacks: CallbackRegistry) -> Self {
        Self {
            id,
            engine,
            callbacks,
        }
    }

    pub fn is_running_animation(&self) -> bool {
        self.engine
            .as_animation()
            .is_some_and(|player| !player.is_complete())
    }
}
