/// Obstacle geometry and the collision oracle.
///
/// Each world owns an `ObstacleSet` of polygons. `Atlas` pairs the two sets
/// and answers obstruction queries for either world; everything in the
/// simulation asks through the `CollisionOracle` trait so tests can swap in
/// hand-built oracles.

use super::geometry::{Polygon, Vec2};

/// Which of the two parallel worlds.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum WorldId {
    Past,
    Present,
}

impl WorldId {
    pub fn other(self) -> WorldId {
        match self {
            WorldId::Past => WorldId::Present,
            WorldId::Present => WorldId::Past,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorldId::Past => "Past",
            WorldId::Present => "Present",
        }
    }
}

/// Step used by the default line-of-sight sampler.
const SIGHT_SAMPLE_STEP: f32 = 4.0;

pub trait CollisionOracle {
    fn is_obstructed(&self, point: Vec2, world: WorldId) -> bool;

    /// Is the straight segment `from..to` free of obstacles in `world`?
    ///
    /// The default walks the segment in small steps; geometric
    /// implementations override it with an exact test.
    fn line_of_sight(&self, from: Vec2, to: Vec2, world: WorldId) -> bool {
        let dist = from.distance(to);
        let steps = (dist / SIGHT_SAMPLE_STEP).ceil() as usize;
        (0..=steps).all(|i| {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            !self.is_obstructed(from.lerp(to, t), world)
        })
    }
}

/// Obstacle polygons of one world plus its visibility flag.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSet {
    polygons: Vec<Polygon>,
    pub visible: bool,
}

impl ObstacleSet {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        ObstacleSet { polygons, visible: false }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.polygons.iter().any(|p| p.contains(point))
    }

    pub fn blocks_segment(&self, from: Vec2, to: Vec2) -> bool {
        self.polygons.iter().any(|p| p.blocks_segment(from, to))
    }
}

/// Both worlds' geometry. Built once per level load.
#[derive(Clone, Debug, Default)]
pub struct Atlas {
    pub past: ObstacleSet,
    pub present: ObstacleSet,
}

impl Atlas {
    pub fn new(past: ObstacleSet, present: ObstacleSet) -> Self {
        Atlas { past, present }
    }

    pub fn get(&self, world: WorldId) -> &ObstacleSet {
        match world {
            WorldId::Past => &self.past,
            WorldId::Present => &self.present,
        }
    }

    pub fn get_mut(&mut self, world: WorldId) -> &mut ObstacleSet {
        match world {
            WorldId::Past => &mut self.past,
            WorldId::Present => &mut self.present,
        }
    }
}

impl CollisionOracle for Atlas {
    fn is_obstructed(&self, point: Vec2, world: WorldId) -> bool {
        self.get(world).contains(point)
    }

    fn line_of_sight(&self, from: Vec2, to: Vec2, world: WorldId) -> bool {
        !self.get(world).blocks_segment(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(x: f32, y: f32, w: f32, h: f32) -> Polygon {
        Polygon::new(vec![
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ])
        .unwrap()
    }

    fn atlas() -> Atlas {
        Atlas::new(
            ObstacleSet::new(vec![wall(50.0, 0.0, 10.0, 100.0)]),
            ObstacleSet::new(vec![]),
        )
    }

    /// Only answers point queries, so the sampled line of sight is used.
    struct PointOnly(ObstacleSet);

    impl CollisionOracle for PointOnly {
        fn is_obstructed(&self, point: Vec2, _world: WorldId) -> bool {
            self.0.contains(point)
        }
    }

    #[test]
    fn obstruction_is_per_world() {
        let a = atlas();
        let p = Vec2::new(55.0, 50.0);
        assert!(a.is_obstructed(p, WorldId::Past));
        assert!(!a.is_obstructed(p, WorldId::Present));
    }

    #[test]
    fn wall_blocks_sight_only_in_its_world() {
        let a = atlas();
        let from = Vec2::new(0.0, 50.0);
        let to = Vec2::new(100.0, 50.0);
        assert!(!a.line_of_sight(from, to, WorldId::Past));
        assert!(a.line_of_sight(from, to, WorldId::Present));
    }

    #[test]
    fn sampled_sight_agrees_with_exact() {
        let oracle = PointOnly(ObstacleSet::new(vec![wall(50.0, 0.0, 10.0, 100.0)]));
        assert!(!oracle.line_of_sight(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), WorldId::Past));
        assert!(oracle.line_of_sight(Vec2::new(0.0, 150.0), Vec2::new(100.0, 150.0), WorldId::Past));
    }
}
