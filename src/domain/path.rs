/// Path drawing: turns a held pointer gesture into evenly spaced waypoints.
///
/// A gesture must start on the character. While the pointer is still inside
/// the character's radius the tracer is *initiating* and commits nothing;
/// once it leaves, every sample is walked from the last committed point in
/// fixed steps, each step checked against the active world's obstacles.

use std::collections::VecDeque;

use super::entity::Character;
use super::geometry::Vec2;
use super::obstacle::{CollisionOracle, WorldId};

/// Result of feeding one pointer sample to the tracer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceOutcome {
    /// Not drawing (no gesture, or the trace was already stopped).
    Idle,
    /// Pointer still on the character; nothing committed.
    Initiating,
    /// Drawing; this many waypoints were appended (possibly zero).
    Extended(usize),
    /// The next step hit an obstacle. Drawing stopped; the step was not added.
    Obstructed,
}

#[derive(Clone, Debug)]
pub struct PathTracer {
    waypoints: VecDeque<Vec2>,
    spacing: f32,
    drawing: bool,
    initiating: bool,
    /// Last committed point (the character position right after `begin`).
    last: Vec2,
}

impl PathTracer {
    pub fn new(spacing: f32) -> Self {
        PathTracer {
            waypoints: VecDeque::new(),
            spacing: spacing.max(f32::EPSILON),
            drawing: false,
            initiating: false,
            last: Vec2::ZERO,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_initiating(&self) -> bool {
        self.initiating
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.waypoints.iter().copied()
    }

    /// Start a gesture. Only a press on the character starts drawing; the
    /// previous trace is discarded when it does.
    pub fn begin(&mut self, point: Vec2, character: &Character) -> bool {
        if !character.contains(point) {
            return false;
        }
        self.waypoints.clear();
        self.drawing = true;
        self.initiating = true;
        self.last = character.position;
        true
    }

    pub fn sample(
        &mut self,
        point: Vec2,
        character: &Character,
        oracle: &dyn CollisionOracle,
        world: WorldId,
    ) -> TraceOutcome {
        if !self.drawing {
            return TraceOutcome::Idle;
        }
        if self.initiating {
            if character.contains(point) {
                return TraceOutcome::Initiating;
            }
            self.initiating = false;
        }

        let mut added = 0;
        while self.last.distance(point) > self.spacing {
            let candidate = self.last.toward(point, self.spacing);
            if oracle.is_obstructed(candidate, world) {
                self.drawing = false;
                log::debug!("path obstructed at ({:.0}, {:.0}) in {}", candidate.x, candidate.y, world.label());
                return TraceOutcome::Obstructed;
            }
            self.waypoints.push_back(candidate);
            self.last = candidate;
            added += 1;
        }
        TraceOutcome::Extended(added)
    }

    /// Release: stop drawing. Committed waypoints stay queued.
    pub fn end(&mut self) {
        self.drawing = false;
        self.initiating = false;
    }

    pub fn remove_first(&mut self) -> Option<Vec2> {
        self.waypoints.pop_front()
    }

    /// Drop the whole trace and stop drawing.
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.drawing = false;
        self.initiating = false;
    }
}
