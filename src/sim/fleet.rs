/// All guards of one world.

use crate::config::GuardConfig;
use crate::domain::ai::{GuardAgent, Quarry};
use crate::domain::entity::Character;
use crate::domain::obstacle::{CollisionOracle, WorldId};

#[derive(Clone, Debug)]
pub struct GuardFleet {
    world: WorldId,
    guards: Vec<GuardAgent>,
    visible: bool,
}

impl GuardFleet {
    pub fn new(world: WorldId, guards: Vec<GuardAgent>) -> Self {
        GuardFleet { world, guards, visible: false }
    }

    pub fn guards(&self) -> &[GuardAgent] {
        &self.guards
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn clear(&mut self) {
        self.guards.clear();
    }

    /// Step every guard once. Guards never coordinate; they share only the
    /// quarry they all see and the oracle.
    pub fn tick(&mut self, dt: f32, quarry: Option<Quarry>, oracle: &dyn CollisionOracle, cfg: &GuardConfig) {
        for guard in &mut self.guards {
            guard.tick(dt, quarry, oracle, self.world, cfg);
        }
    }

    /// Id of the first guard the character touches. Same test as item pickup.
    pub fn any_contains(&self, character: &Character) -> Option<usize> {
        self.guards
            .iter()
            .find(|g| character.contains(g.position))
            .map(|g| g.id)
    }
}
