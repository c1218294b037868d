/// Planar geometry: points, obstacle polygons, segment tests.
///
/// World units are unscaled floats. The y axis grows downward, matching the
/// terminal grid the front end draws into.

use std::ops::{Add, Mul, Sub};

use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Debug, Default, Deserialize)]
#[serde(from = "[f32; 2]")]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Heading in radians of the vector from `self` to `other`.
    pub fn angle_to(self, other: Vec2) -> f32 {
        let d = other - self;
        d.y.atan2(d.x)
    }

    /// The point `step` units from `self` along the direction to `target`.
    /// Never overshoots; returns `target` when it is closer than `step`.
    pub fn toward(self, target: Vec2, step: f32) -> Vec2 {
        let dist = self.distance(target);
        if dist <= step || dist == 0.0 {
            return target;
        }
        self + (target - self) * (step / dist)
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(p: [f32; 2]) -> Self {
        Vec2::new(p[0], p[1])
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Radius containment shared by item pickup and guard contact.
#[inline]
pub fn within(center: Vec2, point: Vec2, radius: f32) -> bool {
    center.distance(point) < radius
}

/// Closed polygon described by its vertices in order (either winding).
#[derive(Clone, Debug)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    min: Vec2,
    max: Vec2,
}

impl Polygon {
    /// Returns `None` for fewer than three vertices.
    pub fn new(vertices: Vec<Vec2>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in &vertices[1..] {
            min = Vec2::new(min.x.min(v.x), min.y.min(v.y));
            max = Vec2::new(max.x.max(v.x), max.y.max(v.y));
        }
        Some(Polygon { vertices, min, max })
    }

    /// Iterate edges as (start, end), closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Even-odd ray cast. Points exactly on an edge may land either side.
    pub fn contains(&self, p: Vec2) -> bool {
        if p.x < self.min.x || p.x > self.max.x || p.y < self.min.y || p.y > self.max.y {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Does the segment `from..to` enter or cross this polygon?
    pub fn blocks_segment(&self, from: Vec2, to: Vec2) -> bool {
        if self.contains(from) || self.contains(to) {
            return true;
        }
        self.edges().any(|(a, b)| segments_intersect(from, to, a, b))
    }
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper or touching intersection of segments `p1p2` and `q1q2`.
pub fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    let on_segment = |a: Vec2, b: Vec2, p: Vec2| {
        p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
    };
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Polygon {
        Polygon::new(vec![
            Vec2::new(x, y),
            Vec2::new(x + side, y),
            Vec2::new(x + side, y + side),
            Vec2::new(x, y + side),
        ])
        .unwrap()
    }

    #[test]
    fn toward_steps_without_overshoot() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(30.0, 40.0);
        let p = a.toward(b, 10.0);
        assert!((p.x - 6.0).abs() < 1e-4);
        assert!((p.y - 8.0).abs() < 1e-4);
        assert_eq!(a.toward(b, 100.0), b);
    }

    #[test]
    fn polygon_needs_three_vertices() {
        assert!(Polygon::new(vec![Vec2::ZERO, Vec2::new(1.0, 0.0)]).is_none());
    }

    #[test]
    fn polygon_contains_interior_only() {
        let sq = square(10.0, 10.0, 20.0);
        assert!(sq.contains(Vec2::new(20.0, 20.0)));
        assert!(!sq.contains(Vec2::new(5.0, 20.0)));
        assert!(!sq.contains(Vec2::new(20.0, 35.0)));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U shape opening upward
        let u = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(30.0, 0.0),
            Vec2::new(30.0, 30.0),
            Vec2::new(0.0, 30.0),
        ])
        .unwrap();
        assert!(!u.contains(Vec2::new(15.0, 10.0)));
        assert!(u.contains(Vec2::new(5.0, 10.0)));
        assert!(u.contains(Vec2::new(15.0, 25.0)));
    }

    #[test]
    fn segment_through_polygon_is_blocked() {
        let sq = square(10.0, 10.0, 20.0);
        assert!(sq.blocks_segment(Vec2::new(0.0, 20.0), Vec2::new(40.0, 20.0)));
        assert!(!sq.blocks_segment(Vec2::new(0.0, 0.0), Vec2::new(40.0, 0.0)));
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(
            Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0), Vec2::new(10.0, 0.0),
        ));
        assert!(!segments_intersect(
            Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0),
        ));
    }

    #[test]
    fn within_is_strict() {
        assert!(within(Vec2::ZERO, Vec2::new(9.9, 0.0), 10.0));
        assert!(!within(Vec2::ZERO, Vec2::new(10.0, 0.0), 10.0));
    }
}
