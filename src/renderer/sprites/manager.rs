//! Sprite arena: ownership, hierarchy, per-frame ticking and draw submission.
//!
//! Sprites live in generation-checked slots and refer to each other only by
//! handle. Parent/child and master/follower links are plain handle lists, so
//! deleting a sprite is a walk over those lists rather than a graph of owning
//! pointers.

use glam::Vec2;
use std::rc::Rc;

use crate::core::error::{GameError, Result};
use crate::core::types::{EngineId, Opacity, Seconds, SpriteHandle};
use crate::renderer::sprites::animation::{Animation, AnimationPlayer};
use crate::renderer::sprites::atlas::SpriteComponent;
use crate::renderer::sprites::instance::{Renderer, SpriteQuad};
use crate::renderer::sprites::sprite::{DrawKey, Sprite};
use crate::renderer::sprites::transition::{
    Callback, CallbackRegistry, Completion, FadeEngine, Hook, MoveEngine, StaticDelay, Transition,
    TransitionEngine,
};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    sprite: Option<Sprite>,
}

/// Counts from one [`SpriteManager::draw`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub sprites: usize,
    pub batches: usize,
    pub culled: usize,
}

#[derive(Debug, Default)]
pub struct SpriteManager {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    next_engine: u64,
}

impl SpriteManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, position: Vec2, z_group: i32) -> SpriteHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let handle = SpriteHandle::new(index, slot.generation);
        slot.sprite = Some(Sprite::new(handle, position, z_group));
        self.live += 1;
        handle
    }

    /// Create a sprite already showing `component`
    pub fn create_with_component(
        &mut self,
        position: Vec2,
        z_group: i32,
        component: Rc<SpriteComponent>,
        anchor: &str,
    ) -> Result<SpriteHandle> {
        // Resolve before allocating so a bad anchor leaves no stray sprite
        component.get_anchor(anchor)?;
        let handle = self.create(position, z_group);
        self.set_component(handle, component, Vec2::ZERO, None, anchor)?;
        Ok(handle)
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&Sprite> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.sprite.as_ref())
    }

    pub fn get_mut(&mut self, handle: SpriteHandle) -> Option<&mut Sprite> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.sprite.as_mut())
    }

    pub fn sprite(&self, handle: SpriteHandle) -> Result<&Sprite> {
        self.get(handle).ok_or(GameError::SpriteNotFound(handle))
    }

    pub fn sprite_mut(&mut self, handle: SpriteHandle) -> Result<&mut Sprite> {
        self.get_mut(handle).ok_or(GameError::SpriteNotFound(handle))
    }

    pub fn contains(&self, handle: SpriteHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live handles in slot order
    pub fn handles(&self) -> Vec<SpriteHandle> {
        self.slots
            .iter()
            .filter_map(|slot| slot.sprite.as_ref().map(|s| s.handle))
            .collect()
    }

    /// Delete a sprite, its children and its followers
    ///
    /// Pending transitions are dropped without firing their callbacks.
    pub fn delete(&mut self, handle: SpriteHandle) -> Result<()> {
        self.sprite(handle)?;
        let mut stack = vec![handle];
        let mut removed = 0usize;

        while let Some(current) = stack.pop() {
            let Some(sprite) = self.take_slot(current) else {
                continue;
            };
            removed += 1;

            if let Some(parent) = sprite.parent.and_then(|p| self.get_mut(p)) {
                parent.children.retain(|&c| c != current);
            }
            if let Some(master) = sprite.master.and_then(|m| self.get_mut(m)) {
                master.followers.retain(|&f| f != current);
            }
            stack.extend(sprite.children.iter().copied());
            stack.extend(sprite.followers.iter().copied());
        }

        if removed > 1 {
            tracing::debug!(sprite = ?handle, removed, "Deleted sprite with dependents");
        }
        Ok(())
    }

    fn take_slot(&mut self, handle: SpriteHandle) -> Option<Sprite> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let sprite = slot.sprite.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(sprite)
    }

    /// Attach `child` so that it is positioned relative to `parent`
    pub fn add_child(&mut self, parent: SpriteHandle, child: SpriteHandle) -> Result<()> {
        self.sprite(parent)?;
        let old_parent = self.sprite(child)?.parent;
        if let Some(old) = old_parent.and_then(|p| self.get_mut(p)) {
            old.children.retain(|&c| c != child);
        }
        let sprite = self.sprite_mut(child)?;
        sprite.parent = Some(parent);
        sprite.set_dirty();
        self.sprite_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Make `follower` mirror every visual change of `master`
    ///
    /// The follower is synchronised immediately.
    pub fn add_follower(&mut self, master: SpriteHandle, follower: SpriteHandle) -> Result<()> {
        self.sprite(follower)?;
        // Walking up from the master must not reach the follower
        let mut cursor = Some(master);
        while let Some(current) = cursor {
            if current == follower {
                return Err(GameError::FollowerCycle { master, follower });
            }
            cursor = self.sprite(current)?.master;
        }

        if let Some(old) = self.sprite(follower)?.master {
            self.remove_follower(old, follower);
        }
        self.sprite_mut(follower)?.master = Some(master);
        self.sprite_mut(master)?.followers.push(follower);
        self.sync_followers(master);
        Ok(())
    }

    pub fn remove_follower(&mut self, master: SpriteHandle, follower: SpriteHandle) {
        if let Some(sprite) = self.get_mut(master) {
            sprite.followers.retain(|&f| f != follower);
        }
        if let Some(sprite) = self.get_mut(follower) {
            if sprite.master == Some(master) {
                sprite.master = None;
            }
        }
    }

    /// Copy the master's visual onto all of its followers, recursively
    fn sync_followers(&mut self, master: SpriteHandle) {
        let Some(sprite) = self.get(master) else {
            return;
        };
        if sprite.followers.is_empty() {
            return;
        }
        let visual = sprite.visual().clone();
        for follower in sprite.followers.clone() {
            if let Some(target) = self.get_mut(follower) {
                target.apply_visual(visual.clone());
            }
            self.sync_followers(follower);
        }
    }

    pub fn set_component(
        &mut self,
        handle: SpriteHandle,
        component: Rc<SpriteComponent>,
        displacement: Vec2,
        duration: Option<Seconds>,
        anchor: &str,
    ) -> Result<()> {
        self.sprite_mut(handle)?
            .set_component(component, displacement, duration, anchor)?;
        self.sync_followers(handle);
        Ok(())
    }

    pub fn set_position(&mut self, handle: SpriteHandle, position: Vec2) -> Result<()> {
        self.sprite_mut(handle)?.set_position(position);
        Ok(())
    }

    pub fn set_opacity(&mut self, handle: SpriteHandle, opacity: Opacity) -> Result<()> {
        self.sprite_mut(handle)?.set_opacity(opacity);
        Ok(())
    }

    fn next_engine_id(&mut self) -> EngineId {
        self.next_engine += 1;
        EngineId(self.next_engine)
    }

    /// Start `engine` on a sprite, playing `extra_time` into it
    ///
    /// An engine that completes while starting is never scheduled; its
    /// callbacks fire before this returns.
    pub fn start_transition(
        &mut self,
        handle: SpriteHandle,
        mut engine: TransitionEngine,
        extra_time: Seconds,
        mut callbacks: CallbackRegistry,
    ) -> Result<EngineId> {
        let id = self.next_engine_id();
        let sprite = self.sprite_mut(handle)?;
        let version = sprite.visual_version();
        let finished = engine.start(sprite, extra_time)?;
        let changed = sprite.visual_version() != version;

        match finished {
            Some(overshoot) => {
                if changed {
                    self.sync_followers(handle);
                }
                let completion = Completion {
                    sprite: handle,
                    engine: id,
                    overshoot,
                };
                self.fire_callbacks(completion, callbacks.take(Hook::OnComplete));
            }
            None => {
                sprite.engines.push(Transition::new(id, engine, callbacks));
                if changed {
                    self.sync_followers(handle);
                }
            }
        }
        Ok(id)
    }

    /// Wait `duration`, then fire `callbacks`
    pub fn delay(
        &mut self,
        handle: SpriteHandle,
        duration: Seconds,
        extra_time: Seconds,
        callbacks: CallbackRegistry,
    ) -> Result<EngineId> {
        let engine = TransitionEngine::StaticDelay(StaticDelay::new(duration));
        self.start_transition(handle, engine, extra_time, callbacks)
    }

    /// Move in a straight line from the current position
    pub fn move_to(
        &mut self,
        handle: SpriteHandle,
        destination: Vec2,
        speed: f32,
        extra_time: Seconds,
        callbacks: CallbackRegistry,
    ) -> Result<EngineId> {
        let start = self.sprite(handle)?.position();
        let engine = TransitionEngine::Move(MoveEngine::new(start, destination, speed));
        self.start_transition(handle, engine, extra_time, callbacks)
    }

    /// Fade towards `target`; a zero duration sets it straight away
    pub fn fade_to(
        &mut self,
        handle: SpriteHandle,
        target: Opacity,
        duration: Seconds,
        extra_time: Seconds,
        mut callbacks: CallbackRegistry,
    ) -> Result<EngineId> {
        if duration > 0.0 {
            let engine = TransitionEngine::Fade(FadeEngine::new(target, duration));
            return self.start_transition(handle, engine, extra_time, callbacks);
        }

        self.sprite_mut(handle)?.set_opacity(target);
        let id = self.next_engine_id();
        let completion = Completion {
            sprite: handle,
            engine: id,
            overshoot: extra_time,
        };
        self.fire_callbacks(completion, callbacks.take(Hook::OnComplete));
        Ok(id)
    }

    /// Play `animation` on a sprite
    ///
    /// A sprite runs at most one animation. Unless `override_running` is set,
    /// starting a second one is an error and the first keeps running. With
    /// the override the first is dropped without firing its callbacks.
    pub fn start_animation(
        &mut self,
        handle: SpriteHandle,
        animation: Rc<Animation>,
        extra_time: Seconds,
        override_running: bool,
        callbacks: CallbackRegistry,
    ) -> Result<EngineId> {
        let running = self
            .sprite(handle)?
            .running_animation()
            .map(|t| (t.id, t.engine.as_animation().map(|p| p.animation.name.clone())));

        if let Some((id, name)) = running {
            if !override_running {
                return Err(GameError::AnimationInProgress {
                    sprite: handle,
                    current: name.unwrap_or_default(),
                });
            }
            self.remove_engine(handle, id);
        }

        let engine = TransitionEngine::Animation(AnimationPlayer::new(animation));
        self.start_transition(handle, engine, extra_time, callbacks)
    }

    /// Stop the running animation, optionally firing its callbacks
    pub fn stop_animation(
        &mut self,
        handle: SpriteHandle,
        fire_callbacks: bool,
        ignore_missing: bool,
    ) -> Result<()> {
        let running = self.sprite(handle)?.running_animation().map(|t| t.id);
        let Some(id) = running else {
            if ignore_missing {
                return Ok(());
            }
            return Err(GameError::AnimationNotFound(handle));
        };

        if let Some(mut transition) = self.remove_engine(handle, id) {
            if fire_callbacks {
                let completion = Completion {
                    sprite: handle,
                    engine: id,
                    overshoot: 0.0,
                };
                self.fire_callbacks(completion, transition.callbacks.take(Hook::OnComplete));
            }
        }
        Ok(())
    }

    /// Play `animation` forever, each cycle starting with the previous
    /// cycle's overshoot
    pub fn start_looping_animation(
        &mut self,
        handle: SpriteHandle,
        animation: Rc<Animation>,
        extra_time: Seconds,
    ) -> Result<EngineId> {
        if animation.total_duration() <= 0.0 {
            return Err(GameError::ZeroLengthLoop(animation.name.clone()));
        }
        let callbacks = CallbackRegistry::new().on_complete(Self::repeat(animation.clone()));
        self.start_animation(handle, animation, extra_time, false, callbacks)
    }

    fn repeat(animation: Rc<Animation>) -> Callback {
        Box::new(move |manager: &mut SpriteManager, done: Completion| {
            manager
                .start_looping_animation(done.sprite, animation, done.overshoot)
                .map(|_| ())
        })
    }

    /// Detach an engine without firing its callbacks
    ///
    /// Removing an engine that is already gone is a no-op.
    pub fn remove_engine(&mut self, handle: SpriteHandle, id: EngineId) -> Option<Transition> {
        let sprite = self.get_mut(handle)?;
        let index = sprite.engines.iter().position(|t| t.id == id)?;
        Some(sprite.engines.remove(index))
    }

    /// Run callbacks in order; a failing callback is logged and the rest still run
    fn fire_callbacks(&mut self, completion: Completion, callbacks: Vec<Callback>) {
        for callback in callbacks {
            if let Err(err) = callback(self, completion) {
                tracing::warn!(
                    sprite = ?completion.sprite,
                    engine = ?completion.engine,
                    error = %err,
                    "Completion callback failed"
                );
            }
        }
    }

    /// Advance every engine of every sprite by `dt`
    ///
    /// Engines run in list order per sprite. Sprites created during the tick
    /// wait for the next one; sprites deleted during it are skipped. Engines
    /// started by a callback during the tick were already given their
    /// overshoot, so they also wait for the next one.
    pub fn tick(&mut self, dt: Seconds) {
        let last_before_tick = self.next_engine;
        for handle in self.handles() {
            let Some(sprite) = self.get_mut(handle) else {
                continue;
            };
            if sprite.engines.is_empty() {
                continue;
            }

            let version = sprite.visual_version();
            let engines = std::mem::take(&mut sprite.engines);
            let mut running = Vec::with_capacity(engines.len());
            let mut finished = Vec::new();

            for mut transition in engines {
                if transition.id.0 > last_before_tick {
                    running.push(transition);
                    continue;
                }
                match transition.engine.advance(sprite, dt) {
                    Ok(None) => running.push(transition),
                    Ok(Some(overshoot)) => finished.push((transition, overshoot)),
                    Err(err) => {
                        tracing::warn!(
                            sprite = ?handle,
                            engine = ?transition.id,
                            kind = transition.engine.kind(),
                            error = %err,
                            "Transition failed, dropping it"
                        );
                    }
                }
            }
            sprite.engines = running;
            let changed = sprite.visual_version() != version;

            if changed {
                self.sync_followers(handle);
            }
            for (mut transition, overshoot) in finished {
                let completion = Completion {
                    sprite: handle,
                    engine: transition.id,
                    overshoot,
                };
                self.fire_callbacks(completion, transition.callbacks.take(Hook::OnComplete));
            }
        }
    }

    /// Position including every ancestor's offset
    pub fn world_position(&self, handle: SpriteHandle) -> Result<Vec2> {
        let mut sprite = self.sprite(handle)?;
        let mut position = sprite.position();
        while let Some(parent) = sprite.parent.and_then(|p| self.get(p)) {
            position += parent.position();
            sprite = parent;
        }
        Ok(position)
    }

    /// Recompute the transform of every sprite that, or whose ancestor, is dirty
    ///
    /// Returns how many transforms were recomputed.
    pub fn refresh_transforms(&mut self) -> usize {
        let roots: Vec<SpriteHandle> = self
            .slots
            .iter()
            .filter_map(|slot| slot.sprite.as_ref())
            .filter(|s| s.parent.is_none())
            .map(|s| s.handle)
            .collect();

        let mut updated = 0;
        let mut stack: Vec<(SpriteHandle, Vec2, bool)> =
            roots.into_iter().map(|h| (h, Vec2::ZERO, false)).collect();
        while let Some((handle, offset, parent_updated)) = stack.pop() {
            let Some(sprite) = self.get_mut(handle) else {
                continue;
            };
            let refresh = parent_updated || sprite.is_dirty();
            if refresh {
                sprite.update_transform(offset);
                updated += 1;
            }
            let child_offset = offset + sprite.position();
            stack.extend(
                sprite
                    .children
                    .iter()
                    .map(|&child| (child, child_offset, refresh)),
            );
        }
        updated
    }

    /// Submit every visible sprite to the renderer, batched by z group
    pub fn draw(&mut self, renderer: &mut dyn Renderer) -> DrawStats {
        self.refresh_transforms();
        let viewport = renderer.viewport();
        let atlas_size = renderer.atlas_size();
        let mut stats = DrawStats::default();

        let mut keys: Vec<DrawKey> = self
            .slots
            .iter()
            .filter_map(|slot| slot.sprite.as_ref())
            .filter(|s| s.is_visible() && s.visual().component.is_some())
            .map(|s| s.draw_key())
            .collect();
        keys.sort();

        let mut batch: Vec<SpriteQuad> = Vec::new();
        let mut batch_group: Option<i32> = None;
        for key in keys {
            let Some(sprite) = self.get(key.handle()) else {
                continue;
            };
            let Some(component) = sprite.visual().component.as_ref() else {
                continue;
            };
            let transform = sprite.transform();
            if !viewport.intersects(transform.position, transform.size) {
                stats.culled += 1;
                continue;
            }

            if batch_group != Some(key.z_group()) {
                if let Some(group) = batch_group {
                    renderer.draw_batch(group, &batch);
                    stats.batches += 1;
                    batch.clear();
                }
                batch_group = Some(key.z_group());
            }
            batch.push(SpriteQuad::new(
                transform.position - viewport.offset,
                transform.size,
                component.rect,
                atlas_size,
                sprite.opacity(),
            ));
            stats.sprites += 1;
        }
        if let Some(group) = batch_group {
            renderer.draw_batch(group, &batch);
            stats.batches += 1;
        }
        stats
    }
}
