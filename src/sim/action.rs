/// Animation dispatcher: named, fire-and-forget motion commands.
///
/// The simulation only ever talks to the `Animator` trait. `ActionManager`
/// is the in-process implementation the game runs on; it tweens each named
/// action once per frame and remembers where finished actions came to rest.

use std::collections::HashMap;

use crate::domain::entity::Tween;
use crate::domain::geometry::Vec2;

pub trait Animator {
    /// Start (or replace) the action `name`.
    fn submit(&mut self, name: &str, from: Vec2, to: Vec2, duration: f32);
    fn is_active(&self, name: &str) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct ActionManager {
    actions: HashMap<String, Tween>,
}

impl ActionManager {
    pub fn new() -> Self {
        ActionManager::default()
    }

    /// Advance every action by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for tween in self.actions.values_mut() {
            tween.tick(dt);
        }
    }

    /// Current (or resting) position of the action `name`.
    pub fn position(&self, name: &str) -> Option<Vec2> {
        self.actions.get(name).map(Tween::position)
    }

    /// Drop every action, finished or not.
    pub fn dispose(&mut self) {
        self.actions.clear();
    }
}

impl Animator for ActionManager {
    fn submit(&mut self, name: &str, from: Vec2, to: Vec2, duration: f32) {
        self.actions.insert(name.to_string(), Tween::new(from, to, duration));
    }

    fn is_active(&self, name: &str) -> bool {
        self.actions.get(name).map_or(false, |t| !t.is_done())
    }
}
