/// Feeds the drawn path to the animator one waypoint at a time.

use crate::domain::geometry::Vec2;
use crate::domain::path::PathTracer;

use super::action::Animator;

/// Action name of the character's walk.
pub const CHARACTER_MOVE: &str = "character_move";

#[derive(Clone, Debug)]
pub struct MotionDriver {
    speed: f32,
}

/// A motion command that was just dispatched.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Dispatched {
    pub from: Vec2,
    pub to: Vec2,
    pub duration: f32,
}

impl MotionDriver {
    pub fn new(speed: f32) -> Self {
        MotionDriver { speed: speed.max(f32::EPSILON) }
    }

    /// Dispatch the next waypoint if the character is idle.
    ///
    /// At most one character move is ever in flight, so waypoints run
    /// strictly in the order they were drawn.
    pub fn advance(
        &self,
        trace: &mut PathTracer,
        from: Vec2,
        animator: &mut dyn Animator,
    ) -> Option<Dispatched> {
        if animator.is_active(CHARACTER_MOVE) {
            return None;
        }
        let to = trace.remove_first()?;
        let duration = from.distance(to) / self.speed;
        animator.submit(CHARACTER_MOVE, from, to, duration);
        Some(Dispatched { from, to, duration })
    }
}
