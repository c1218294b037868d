/// Guard AI: the patrol / chase / return state machine.
///
/// Three modes:
///   1. **Patrol**: ping-pong along the authored route, one leg at a time.
///      Leg duration = leg length / patrol speed.
///   2. **Chase**: straight-line pursuit of the character, re-aimed every
///      tick. The guard records where it has been on a LIFO trail.
///   3. **Return**: pop the trail one leg at a time back to where the chase
///      began, then re-join the route at the stop it was heading for.
///
/// `transition` decides the mode from what the guard senses; `GuardAgent::tick`
/// then acts out the mode.

use crate::config::GuardConfig;

use super::entity::Tween;
use super::geometry::Vec2;
use super::obstacle::{CollisionOracle, WorldId};
use super::route::{PatrolCursor, PatrolRoute};

/// What a guard perceives of the character this tick.
#[derive(Clone, Copy, Debug)]
pub struct Quarry {
    pub position: Vec2,
    pub heading: f32,
}

/// Distance and line of sight to the quarry. No quarry = infinitely far.
#[derive(Clone, Copy, Debug)]
pub struct Senses {
    pub distance: f32,
    pub in_sight: bool,
}

impl Senses {
    pub const NOTHING: Senses = Senses { distance: f32::INFINITY, in_sight: false };

    pub fn observe(
        from: Vec2,
        quarry: Option<Quarry>,
        oracle: &dyn CollisionOracle,
        world: WorldId,
        detection_radius: f32,
    ) -> Senses {
        let q = match quarry {
            Some(q) => q,
            None => return Senses::NOTHING,
        };
        let distance = from.distance(q.position);
        // Sight is only consulted when it could matter.
        let in_sight = distance < detection_radius && oracle.line_of_sight(from, q.position, world);
        Senses { distance, in_sight }
    }

    fn spotted(&self, detection_radius: f32) -> bool {
        self.distance < detection_radius && self.in_sight
    }
}

/// Explicit LIFO of positions recorded during a chase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnPath {
    stack: Vec<Vec2>,
}

impl ReturnPath {
    pub fn push(&mut self, p: Vec2) {
        self.stack.push(p);
    }

    pub fn pop(&mut self) -> Option<Vec2> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<Vec2> {
        self.stack.last().copied()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Oldest first.
    pub fn points(&self) -> &[Vec2] {
        &self.stack
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GuardState {
    Patrol { cursor: PatrolCursor },
    Chase { saved: PatrolCursor, trail: ReturnPath },
    Return { saved: PatrolCursor, trail: ReturnPath },
}

impl Default for GuardState {
    fn default() -> Self {
        GuardState::Patrol { cursor: PatrolCursor::default() }
    }
}

/// Data-free mirror of `GuardState` for display and comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GuardMode {
    Patrol,
    Chase,
    Return,
}

impl GuardState {
    pub fn mode(&self) -> GuardMode {
        match self {
            GuardState::Patrol { .. } => GuardMode::Patrol,
            GuardState::Chase { .. } => GuardMode::Chase,
            GuardState::Return { .. } => GuardMode::Return,
        }
    }

    pub fn trail(&self) -> Option<&ReturnPath> {
        match self {
            GuardState::Patrol { .. } => None,
            GuardState::Chase { trail, .. } | GuardState::Return { trail, .. } => Some(trail),
        }
    }
}

/// Pure mode transition. `position` is where the guard stands now; it seeds
/// the trail when a chase begins or resumes.
pub fn transition(state: GuardState, senses: Senses, position: Vec2, cfg: &GuardConfig) -> GuardState {
    match state {
        GuardState::Patrol { cursor } if senses.spotted(cfg.detection_radius) => {
            let mut trail = ReturnPath::default();
            trail.push(position);
            GuardState::Chase { saved: cursor, trail }
        }
        GuardState::Chase { saved, trail } if senses.distance > cfg.lose_radius => {
            GuardState::Return { saved, trail }
        }
        GuardState::Return { saved, mut trail } if senses.spotted(cfg.detection_radius) => {
            if trail.peek() != Some(position) {
                trail.push(position);
            }
            GuardState::Chase { saved, trail }
        }
        other => other,
    }
}

#[derive(Clone, Debug)]
pub struct GuardAgent {
    pub id: usize,
    pub position: Vec2,
    /// Facing in radians, for the renderer.
    pub heading: f32,
    route: PatrolRoute,
    state: GuardState,
    /// In-flight patrol or return leg. Chase moves without one.
    leg: Option<Tween>,
}

impl GuardAgent {
    pub fn new(id: usize, spawn: Vec2, route: PatrolRoute) -> Self {
        if route.is_static() {
            log::warn!("guard {id}: route has {} stop(s); guard holds its post", route.len());
        }
        GuardAgent {
            id,
            position: spawn,
            heading: 0.0,
            route,
            state: GuardState::default(),
            leg: None,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn mode(&self) -> GuardMode {
        self.state.mode()
    }

    pub fn route(&self) -> &PatrolRoute {
        &self.route
    }

    /// One simulation step: sense, transition, act.
    pub fn tick(
        &mut self,
        dt: f32,
        quarry: Option<Quarry>,
        oracle: &dyn CollisionOracle,
        world: WorldId,
        cfg: &GuardConfig,
    ) {
        let senses = Senses::observe(self.position, quarry, oracle, world, cfg.detection_radius);
        let before = self.state.mode();
        let state = std::mem::take(&mut self.state);
        self.state = transition(state, senses, self.position, cfg);
        let after = self.state.mode();

        if before != after {
            // Every mode change abandons the current leg or pursuit target.
            self.leg = None;
            log::debug!("guard {} ({}): {:?} -> {:?}", self.id, world.label(), before, after);
        }

        match after {
            GuardMode::Patrol => self.patrol(dt, cfg),
            GuardMode::Chase => {
                if let Some(q) = quarry {
                    self.chase(dt, q, oracle, world, cfg);
                }
            }
            GuardMode::Return => self.retrace(dt, cfg),
        }
    }

    fn patrol(&mut self, dt: f32, cfg: &GuardConfig) {
        let leg_finished = self.leg.as_ref().map_or(true, Tween::is_done);
        if leg_finished {
            let target = match &mut self.state {
                GuardState::Patrol { cursor } => {
                    if self.route.is_static() {
                        self.route.stop(0)
                    } else {
                        let idx = cursor.advance(self.route.len());
                        self.route.stop(idx)
                    }
                }
                _ => return,
            };
            if target == self.position {
                self.leg = None;
                return;
            }
            self.leg = Some(Tween::at_speed(self.position, target, cfg.patrol_speed));
        }
        self.ride_leg(dt);
    }

    fn chase(&mut self, dt: f32, q: Quarry, oracle: &dyn CollisionOracle, world: WorldId, cfg: &GuardConfig) {
        let next = self.position.toward(q.position, cfg.chase_speed * dt);
        if oracle.is_obstructed(next, world) {
            return;
        }
        self.position = next;
        self.heading = q.heading;
        if let GuardState::Chase { trail, .. } = &mut self.state {
            let far_enough = trail
                .peek()
                .map_or(true, |top| top.distance(self.position) >= cfg.trail_spacing);
            if far_enough {
                trail.push(self.position);
            }
        }
    }

    fn retrace(&mut self, dt: f32, cfg: &GuardConfig) {
        let leg_finished = self.leg.as_ref().map_or(true, Tween::is_done);
        if leg_finished {
            let popped = match &mut self.state {
                GuardState::Return { trail, .. } => trail.pop(),
                _ => return,
            };
            match popped {
                Some(p) => {
                    self.leg = Some(Tween::at_speed(self.position, p, cfg.return_speed));
                }
                None => {
                    self.rejoin_route(cfg);
                    return;
                }
            }
        }
        self.ride_leg(dt);
    }

    /// Trail exhausted: snap the cursor back to the saved stop and head there.
    fn rejoin_route(&mut self, cfg: &GuardConfig) {
        let saved = match &self.state {
            GuardState::Return { saved, .. } => *saved,
            _ => return,
        };
        self.state = GuardState::Patrol { cursor: saved };
        let target = self.route.stop(saved.index);
        self.leg = if target == self.position {
            None
        } else {
            Some(Tween::at_speed(self.position, target, cfg.patrol_speed))
        };
        log::debug!("guard {}: back on route at stop {}", self.id, saved.index);
    }

    fn ride_leg(&mut self, dt: f32) {
        if let Some(leg) = &mut self.leg {
            if leg.from != leg.to {
                self.heading = leg.from.angle_to(leg.to);
            }
            self.position = leg.tick(dt);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Polygon;
    use crate::domain::obstacle::{Atlas, ObstacleSet};

    const DT: f32 = 0.05;

    fn cfg() -> GuardConfig {
        GuardConfig {
            patrol_speed: 50.0,
            chase_speed: 100.0,
            return_speed: 100.0,
            detection_radius: 100.0,
            lose_radius: 200.0,
            trail_spacing: 10.0,
        }
    }

    fn open_world() -> Atlas {
        Atlas::default()
    }

    fn scenario_route() -> PatrolRoute {
        PatrolRoute::new(
            vec![Vec2::new(100.0, 500.0), Vec2::new(190.0, 500.0), Vec2::new(190.0, 400.0)],
            Vec2::new(100.0, 500.0),
        )
    }

    fn cursor_of(g: &GuardAgent) -> PatrolCursor {
        match g.state() {
            GuardState::Patrol { cursor } => *cursor,
            other => panic!("expected patrol, got {:?}", other.mode()),
        }
    }

    /// Tick until the guard's patrol cursor moves, `legs` times. Returns the indices.
    fn run_legs(g: &mut GuardAgent, legs: usize, atlas: &Atlas) -> Vec<usize> {
        let mut seen = vec![];
        let mut last = None;
        for _ in 0..100_000 {
            g.tick(DT, None, atlas, WorldId::Past, &cfg());
            let idx = cursor_of(g).index;
            if g.leg.is_some() && last != Some((idx, g.leg.as_ref().map(|l| l.to))) {
                last = Some((idx, g.leg.as_ref().map(|l| l.to)));
                seen.push(idx);
                if seen.len() == legs {
                    break;
                }
            }
        }
        seen
    }

    #[test]
    fn patrol_visits_scenario_indices() {
        let atlas = open_world();
        let mut g = GuardAgent::new(0, Vec2::new(100.0, 500.0), scenario_route());
        assert_eq!(run_legs(&mut g, 5, &atlas), vec![1, 2, 1, 0, 1]);
    }

    #[test]
    fn patrol_leg_duration_scales_with_length() {
        let atlas = open_world();
        let mut g = GuardAgent::new(0, Vec2::new(100.0, 500.0), scenario_route());
        g.tick(DT, None, &atlas, WorldId::Past, &cfg());
        let leg = g.leg.clone().unwrap();
        assert!((leg.duration - 90.0 / 50.0).abs() < 1e-4);
    }

    #[test]
    fn spotting_needs_range_and_sight() {
        let c = cfg();
        let here = Vec2::new(0.0, 0.0);
        let patrol = GuardState::default();

        let far = Senses { distance: 150.0, in_sight: true };
        assert_eq!(transition(patrol.clone(), far, here, &c).mode(), GuardMode::Patrol);

        let hidden = Senses { distance: 50.0, in_sight: false };
        assert_eq!(transition(patrol.clone(), hidden, here, &c).mode(), GuardMode::Patrol);

        let seen = Senses { distance: 50.0, in_sight: true };
        let next = transition(patrol, seen, here, &c);
        assert_eq!(next.mode(), GuardMode::Chase);
        assert_eq!(next.trail().unwrap().points(), &[here]);
    }

    #[test]
    fn chase_holds_inside_hysteresis_band() {
        let c = cfg();
        let mut trail = ReturnPath::default();
        trail.push(Vec2::ZERO);
        let chase = GuardState::Chase { saved: PatrolCursor::default(), trail };

        // Between detection (100) and lose (200): stay on the chase.
        let band = Senses { distance: 150.0, in_sight: false };
        let s = transition(chase, band, Vec2::ZERO, &c);
        assert_eq!(s.mode(), GuardMode::Chase);

        let gone = Senses { distance: 201.0, in_sight: false };
        assert_eq!(transition(s, gone, Vec2::ZERO, &c).mode(), GuardMode::Return);
    }

    #[test]
    fn losing_the_quarry_entirely_starts_return() {
        let c = cfg();
        let mut trail = ReturnPath::default();
        trail.push(Vec2::ZERO);
        let chase = GuardState::Chase { saved: PatrolCursor::default(), trail };
        assert_eq!(transition(chase, Senses::NOTHING, Vec2::ZERO, &c).mode(), GuardMode::Return);
    }

    #[test]
    fn chase_and_return_round_trip_restores_index() {
        let atlas = open_world();
        let c = cfg();
        let mut g = GuardAgent::new(3, Vec2::new(100.0, 500.0), scenario_route());
        run_legs(&mut g, 3, &atlas); // now heading for index 1, moving backward
        let before = cursor_of(&g);
        assert_eq!(before.index, 1);

        // Character appears close by: chase.
        let mut quarry = Quarry { position: g.position + Vec2::new(60.0, 0.0), heading: 0.0 };
        g.tick(DT, Some(quarry), &atlas, WorldId::Past, &c);
        assert_eq!(g.mode(), GuardMode::Chase);

        // Character runs away slowly enough that the guard records a trail.
        for _ in 0..60 {
            quarry.position = quarry.position + Vec2::new(6.0, 0.0);
            g.tick(DT, Some(quarry), &atlas, WorldId::Past, &c);
        }
        assert_eq!(g.mode(), GuardMode::Chase);
        assert!(g.state().trail().unwrap().len() > 1);

        // Character vanishes.
        g.tick(DT, None, &atlas, WorldId::Past, &c);
        assert_eq!(g.mode(), GuardMode::Return);

        for _ in 0..10_000 {
            if g.mode() == GuardMode::Patrol {
                break;
            }
            g.tick(DT, None, &atlas, WorldId::Past, &c);
        }
        assert_eq!(g.mode(), GuardMode::Patrol);
        assert_eq!(cursor_of(&g), before);
        assert!(g.state().trail().is_none());
        // Heading back to the stop it was walking toward when spotted.
        assert_eq!(g.leg.as_ref().unwrap().to, g.route().stop(before.index));
    }

    #[test]
    fn return_retraces_in_reverse_order() {
        let atlas = open_world();
        let c = cfg();
        let mut g = GuardAgent::new(0, Vec2::new(0.0, 0.0), PatrolRoute::new(vec![], Vec2::ZERO));
        let mut trail = ReturnPath::default();
        trail.push(Vec2::new(0.0, 0.0));
        trail.push(Vec2::new(20.0, 0.0));
        trail.push(Vec2::new(40.0, 0.0));
        g.position = Vec2::new(50.0, 0.0);
        g.state = GuardState::Return { saved: PatrolCursor::default(), trail };

        let mut targets = vec![];
        for _ in 0..1000 {
            g.tick(DT, None, &atlas, WorldId::Past, &c);
            if let Some(leg) = &g.leg {
                if targets.last() != Some(&leg.to) {
                    targets.push(leg.to);
                }
            }
            if g.mode() == GuardMode::Patrol {
                break;
            }
        }
        assert_eq!(
            targets,
            vec![Vec2::new(40.0, 0.0), Vec2::new(20.0, 0.0), Vec2::new(0.0, 0.0)],
        );
        assert_eq!(g.mode(), GuardMode::Patrol);
    }

    #[test]
    fn respotting_during_return_resumes_chase() {
        let c = cfg();
        let mut trail = ReturnPath::default();
        trail.push(Vec2::ZERO);
        let saved = PatrolCursor { index: 2, forward: false };
        let ret = GuardState::Return { saved, trail };
        let seen = Senses { distance: 20.0, in_sight: true };
        let next = transition(ret, seen, Vec2::new(5.0, 0.0), &c);
        match next {
            GuardState::Chase { saved: s, trail } => {
                assert_eq!(s, saved);
                assert_eq!(trail.points(), &[Vec2::ZERO, Vec2::new(5.0, 0.0)]);
            }
            other => panic!("expected chase, got {:?}", other.mode()),
        }
    }

    #[test]
    fn static_guard_still_chases() {
        let atlas = open_world();
        let c = cfg();
        let post = Vec2::new(400.0, 600.0);
        let mut g = GuardAgent::new(1, post, PatrolRoute::new(vec![post], post));
        g.tick(DT, None, &atlas, WorldId::Past, &c);
        assert_eq!(g.position, post);

        let q = Quarry { position: post + Vec2::new(30.0, 0.0), heading: 1.0 };
        g.tick(DT, Some(q), &atlas, WorldId::Past, &c);
        assert_eq!(g.mode(), GuardMode::Chase);
        assert!(g.position.x > post.x);
        assert_eq!(g.heading, 1.0);
    }

    #[test]
    fn wall_blocks_detection() {
        let wall = Polygon::new(vec![
            Vec2::new(40.0, -50.0),
            Vec2::new(50.0, -50.0),
            Vec2::new(50.0, 50.0),
            Vec2::new(40.0, 50.0),
        ])
        .unwrap();
        let atlas = Atlas::new(ObstacleSet::new(vec![wall]), ObstacleSet::default());
        let c = cfg();
        let mut g = GuardAgent::new(0, Vec2::ZERO, PatrolRoute::new(vec![], Vec2::ZERO));
        let q = Quarry { position: Vec2::new(80.0, 0.0), heading: 0.0 };

        g.tick(DT, Some(q), &atlas, WorldId::Past, &c);
        assert_eq!(g.mode(), GuardMode::Patrol);

        // Same spot, other world has no wall.
        g.tick(DT, Some(q), &atlas, WorldId::Present, &c);
        assert_eq!(g.mode(), GuardMode::Chase);
    }

    #[test]
    fn chase_does_not_step_into_obstacles() {
        let block = Polygon::new(vec![
            Vec2::new(2.0, -5.0),
            Vec2::new(20.0, -5.0),
            Vec2::new(20.0, 5.0),
            Vec2::new(2.0, 5.0),
        ])
        .unwrap();
        let atlas = Atlas::new(ObstacleSet::default(), ObstacleSet::new(vec![block]));
        let c = cfg();
        let mut g = GuardAgent::new(0, Vec2::ZERO, PatrolRoute::new(vec![], Vec2::ZERO));
        let mut trail = ReturnPath::default();
        trail.push(Vec2::ZERO);
        g.state = GuardState::Chase { saved: PatrolCursor::default(), trail };

        let q = Quarry { position: Vec2::new(60.0, 0.0), heading: 0.0 };
        g.tick(DT, Some(q), &atlas, WorldId::Present, &c);
        assert_eq!(g.position, Vec2::ZERO);
    }
}
