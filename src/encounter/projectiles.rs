//! Simple projectiles
//!
//! Rocks and shots that are spawned by a sequencer step, fly on their own, and are destroyed
//! when they leave the play area (bottom, left or right edge) or outlive their lifetime,
//! which is capped at [`MAX_LIFETIME`].
//! Leaving through the top is allowed so lobbed shots can come back down.

use bevy::math::{Rect, Vec2};

use super::tag::DamageTag;

/// No projectile outlives this, whatever its own lifetime says.
pub const MAX_LIFETIME: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    CrawlingRock,
    Rock,
    ArcShot,
    RainDrop,
    FlatShot,
    ChargedShot,
}

/// How a projectile's velocity evolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Linear,
    Ballistic { gravity: f32 },
    /// Travel as launched until reaching `height`, then continue horizontally at `speed`.
    LevelOff { height: f32, speed: f32 },
}

/// Everything needed to spawn a projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpec {
    pub kind: ProjectileKind,
    pub origin: Vec2,
    pub velocity: Vec2,
    pub motion: Motion,
    pub damage: f32,
    pub radius: f32,
    pub lifetime: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u32,
    pub kind: ProjectileKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub motion: Motion,
    pub damage: f32,
    pub radius: f32,
    pub age: f32,
    pub lifetime: Option<f32>,
    pub tag: DamageTag,
    levelled: bool,
}

impl Projectile {
    fn step(&mut self, dt: f32) {
        match self.motion {
            Motion::Linear => {}
            Motion::Ballistic { gravity } => {
                self.velocity.y -= gravity * dt;
            }
            Motion::LevelOff { height, speed } => {
                if !self.levelled && self.position.y <= height {
                    let dir = if self.velocity.x < 0.0 { -1.0 } else { 1.0 };
                    self.velocity = Vec2::new(dir * speed, 0.0);
                    self.position.y = height;
                    self.levelled = true;
                }
            }
        }
        self.position += self.velocity * dt;
        self.age += dt;
    }

    fn is_expired(&self, area: Rect) -> bool {
        let out = self.position.y < area.min.y
            || self.position.x < area.min.x
            || self.position.x > area.max.x;
        let limit = self.lifetime.map_or(MAX_LIFETIME, |l| l.min(MAX_LIFETIME));
        let old = self.age >= limit;
        out || old
    }
}

/// Live projectiles owned by one encounter.
#[derive(Debug, Clone, Default)]
pub struct ProjectilePool {
    next_id: u32,
    live: Vec<Projectile>,
}

impl ProjectilePool {
    /// Spawn a projectile. It is Damageable from the moment it exists.
    pub fn spawn(&mut self, spec: ProjectileSpec) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.live.push(Projectile {
            id,
            kind: spec.kind,
            position: spec.origin,
            velocity: spec.velocity,
            motion: spec.motion,
            damage: spec.damage.max(0.0),
            radius: spec.radius,
            age: 0.0,
            lifetime: spec.lifetime,
            tag: DamageTag::Damageable,
            levelled: false,
        });
        id
    }

    /// Advance every projectile and drop the ones that expired. Returns how many were dropped.
    pub fn update(&mut self, dt: f32, area: Rect) -> usize {
        for projectile in self.live.iter_mut() {
            projectile.step(dt);
        }
        let before = self.live.len();
        self.live.retain(|p| !p.is_expired(area));
        before - self.live.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.live.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Projectile> {
        self.live.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}
