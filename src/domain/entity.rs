/// Entities: Character, Item, and the Tween every moving thing rides on.

use super::geometry::{within, Vec2};
use super::obstacle::WorldId;

/// One frame's worth of pointer gesture, already in world coordinates.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Gesture {
    Press(Vec2),
    Held(Vec2),
    Release(Vec2),
}

/// Immutable input snapshot handed to `step` once per tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub gesture: Option<Gesture>,
    pub switch_world: bool,
}

/// The avatar shared by both worlds.
#[derive(Clone, Debug)]
pub struct Character {
    pub position: Vec2,
    /// Heading in radians of the last dispatched motion.
    pub heading: f32,
    /// Interaction radius: draw gestures start here, items and guards collide here.
    pub radius: f32,
    pub resources: u32,
    pub artifacts: u32,
}

impl Character {
    pub fn new(position: Vec2, radius: f32, resources: u32) -> Self {
        Character {
            position,
            heading: 0.0,
            radius,
            resources,
            artifacts: 0,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        within(self.position, point, self.radius)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemKind {
    /// Spent on Present→Past switches.
    Resource,
    /// Counts toward the level goal.
    Artifact,
}

#[derive(Clone, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub position: Vec2,
    pub world: WorldId,
}

/// Linear motion from `from` to `to` over `duration` seconds.
#[derive(Clone, Debug)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    pub duration: f32,
    elapsed: f32,
}

impl Tween {
    pub fn new(from: Vec2, to: Vec2, duration: f32) -> Self {
        Tween { from, to, duration: duration.max(0.0), elapsed: 0.0 }
    }

    /// Build a tween that covers the distance at `speed` units per second.
    pub fn at_speed(from: Vec2, to: Vec2, speed: f32) -> Self {
        let duration = if speed > 0.0 { from.distance(to) / speed } else { 0.0 };
        Tween::new(from, to, duration)
    }

    pub fn position(&self) -> Vec2 {
        if self.is_done() {
            return self.to;
        }
        self.from.lerp(self.to, (self.elapsed / self.duration).min(1.0))
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Advance by `dt` seconds. Returns the new position.
    pub fn tick(&mut self, dt: f32) -> Vec2 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.position()
    }
}
