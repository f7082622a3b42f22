//! Bullet visual tracking: remote bullets become tracers that fly the path
//! the server promised, and removals of our own bullets retire the matching
//! visual from the local pool. When and where impact effects fire is decided
//! here; what they look like belongs to the injected sink.

use std::collections::HashMap;

use crate::constants::{BULLET_LIFETIME_MS, OWN_BULLET_MATCH_PX};
use crate::protocol::{Bullet, BulletId, Team};

use super::EffectSink;

/// Visual for a bullet owned by a remote player. The server only sends the
/// creation snapshot; travel is predicted as `x + vx * lifetime` across the
/// bullet's lifetime, which is exactly linear motion at `vx`.
pub struct Tracer {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub tint: Team,
    age_ms: f64,
}

/// Slot in the local player's own visual pool, spawned at fire time by the
/// weapon layer and retired here when the server confirms the removal.
pub struct PoolBullet {
    pub active: bool,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    age_ms: f64,
}

pub struct BulletTracker {
    tracers: HashMap<BulletId, Tracer>,
    pool: Vec<PoolBullet>,
}

impl BulletTracker {
    pub fn new() -> BulletTracker {
        BulletTracker {
            tracers: HashMap::new(),
            pool: vec![],
        }
    }

    /// Replicated `bullet-added`. Our own bullets were already spawned
    /// locally at fire time, so only remote ones grow a tracer. An unknown
    /// owner (already disconnected) falls back to a red tint.
    pub fn on_bullet_added(&mut self, bullet: &Bullet, is_own: bool, owner_team: Option<Team>) {
        if is_own {
            return;
        }
        self.tracers.insert(
            bullet.id.clone(),
            Tracer {
                x: bullet.x,
                y: bullet.y,
                velocity_x: bullet.velocity_x,
                tint: owner_team.unwrap_or(Team::Red),
                age_ms: 0.0,
            },
        );
    }

    /// Replicated `bullet-removed`. Removing an id twice is a no-op.
    pub fn on_bullet_removed(
        &mut self,
        id: &str,
        x: f32,
        _y: f32,
        is_own: bool,
        fx: &mut dyn EffectSink,
    ) {
        if let Some(tracer) = self.tracers.remove(id) {
            // Impact where the tracer visually is, not where the server
            // last mirrored it.
            fx.impact_at(tracer.x, tracer.y);
            return;
        }
        if is_own {
            self.retire_own_near(x, fx);
        }
    }

    /// The weapon layer fired; keep the visual in the pool so the server's
    /// removal can be matched back to it. Inactive slots are reused.
    pub fn note_own_shot(&mut self, x: f32, y: f32, velocity_x: f32) {
        let fresh = PoolBullet {
            active: true,
            x,
            y,
            velocity_x,
            age_ms: 0.0,
        };
        match self.pool.iter_mut().find(|slot| !slot.active) {
            Some(slot) => *slot = fresh,
            None => self.pool.push(fresh),
        }
    }

    /// Advance every visual by one frame; tracers and pool bullets past
    /// their lifetime are culled even if the removal event never arrives.
    pub fn update(&mut self, delta_ms: f64) {
        let dt_seconds = (delta_ms / 1000.0) as f32;
        self.tracers.retain(|_, tracer| {
            tracer.x += tracer.velocity_x * dt_seconds;
            tracer.age_ms += delta_ms;
            tracer.age_ms < BULLET_LIFETIME_MS
        });
        for slot in self.pool.iter_mut().filter(|slot| slot.active) {
            slot.x += slot.velocity_x * dt_seconds;
            slot.age_ms += delta_ms;
            if slot.age_ms >= BULLET_LIFETIME_MS {
                slot.active = false;
            }
        }
    }

    pub fn tracers(&self) -> impl Iterator<Item = (&BulletId, &Tracer)> {
        self.tracers.iter()
    }

    pub fn active_pool_bullets(&self) -> impl Iterator<Item = &PoolBullet> {
        self.pool.iter().filter(|slot| slot.active)
    }

    /// Leaving multiplayer drops every visual.
    pub fn clear(&mut self) {
        self.tracers.clear();
        self.pool.clear();
    }

    fn retire_own_near(&mut self, x: f32, fx: &mut dyn EffectSink) {
        let mut best: Option<(usize, f32)> = None;
        for (index, slot) in self.pool.iter().enumerate() {
            if !slot.active {
                continue;
            }
            let distance = (slot.x - x).abs();
            if distance <= OWN_BULLET_MATCH_PX
                && best.map_or(true, |(_, closest)| distance < closest)
            {
                best = Some((index, distance));
            }
        }
        if let Some((index, _)) = best {
            let slot = &mut self.pool[index];
            slot.active = false;
            fx.impact_at(slot.x, slot.y);
        }
    }
}

impl Default for BulletTracker {
    fn default() -> Self {
        Self::new()
    }
}
