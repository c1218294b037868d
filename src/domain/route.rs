/// Patrol routes and the ping-pong cursor that walks them.

use super::geometry::Vec2;

/// Authored waypoints a guard cycles through.
///
/// Fewer than two stops makes the guard static: it holds its post
/// (the single stop, or its spawn point for an empty route).
#[derive(Clone, Debug)]
pub struct PatrolRoute {
    stops: Vec<Vec2>,
    post: Vec2,
}

impl PatrolRoute {
    pub fn new(stops: Vec<Vec2>, spawn: Vec2) -> Self {
        let post = stops.first().copied().unwrap_or(spawn);
        PatrolRoute { stops, post }
    }

    pub fn is_static(&self) -> bool {
        self.stops.len() < 2
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// The stop at `index`, or the post for static routes.
    pub fn stop(&self, index: usize) -> Vec2 {
        self.stops.get(index).copied().unwrap_or(self.post)
    }
}

/// Position on a route: the stop being headed for and the travel direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PatrolCursor {
    pub index: usize,
    pub forward: bool,
}

impl Default for PatrolCursor {
    fn default() -> Self {
        PatrolCursor { index: 0, forward: true }
    }
}

impl PatrolCursor {
    /// Step to the next stop, bouncing at both ends. Static routes stay at 0.
    pub fn advance(&mut self, len: usize) -> usize {
        if len < 2 {
            self.index = 0;
            return 0;
        }
        if self.forward {
            self.index += 1;
            if self.index == len - 1 {
                self.forward = false;
            }
        } else {
            self.index -= 1;
            if self.index == 0 {
                self.forward = true;
            }
        }
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_stop_route_bounces() {
        let mut c = PatrolCursor::default();
        let seq: Vec<usize> = (0..5).map(|_| c.advance(3)).collect();
        assert_eq!(seq, vec![1, 2, 1, 0, 1]);
    }

    #[test]
    fn index_stays_in_bounds_and_flips_only_at_ends() {
        for len in 2..8 {
            let mut c = PatrolCursor::default();
            let mut prev = c;
            for _ in 0..50 {
                c.advance(len);
                assert!(c.index < len);
                if c.forward != prev.forward {
                    assert!(c.index == 0 || c.index == len - 1);
                }
                prev = c;
            }
        }
    }

    #[test]
    fn two_stop_route_alternates() {
        let mut c = PatrolCursor::default();
        let seq: Vec<usize> = (0..4).map(|_| c.advance(2)).collect();
        assert_eq!(seq, vec![1, 0, 1, 0]);
    }

    #[test]
    fn static_routes_hold_post() {
        let single = PatrolRoute::new(vec![Vec2::new(4.0, 4.0)], Vec2::ZERO);
        assert!(single.is_static());
        assert_eq!(single.stop(0), Vec2::new(4.0, 4.0));

        let empty = PatrolRoute::new(vec![], Vec2::new(7.0, 1.0));
        assert_eq!(empty.stop(3), Vec2::new(7.0, 1.0));

        let mut c = PatrolCursor::default();
        assert_eq!(c.advance(1), 0);
    }
}
