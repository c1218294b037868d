/// World switching: the two world contexts, the shared avatar, and the gate
/// that decides when the avatar may cross between them.
///
/// ## Gate
///
/// ┌─────────────────────────────────────────┬──────────────┐
/// │ Condition (checked in order)            │ Outcome      │
/// ├─────────────────────────────────────────┼──────────────┤
/// │ previous attempt < debounce ago         │ Debounced    │
/// │ character position obstructed in target │ Blocked      │
/// │ resources == 0                          │ Blocked      │
/// │ otherwise                               │ Switched     │
/// └─────────────────────────────────────────┴──────────────┘
///
/// Only Present→Past costs a resource.

use crate::config::GuardConfig;
use crate::domain::ai::Quarry;
use crate::domain::entity::Character;
use crate::domain::obstacle::{Atlas, CollisionOracle, ObstacleSet, WorldId};
use crate::domain::path::PathTracer;

use super::fleet::GuardFleet;

/// One of the two parallel worlds.
///
/// `id` is the handle to this world's obstacle set in the `Atlas`; showing or
/// hiding a context toggles its guards and its obstacles together.
#[derive(Clone, Debug)]
pub struct WorldContext {
    pub id: WorldId,
    pub fleet: GuardFleet,
    pub visible: bool,
}

impl WorldContext {
    pub fn new(id: WorldId, fleet: GuardFleet) -> Self {
        WorldContext { id, fleet, visible: false }
    }

    pub fn obstacles<'a>(&self, atlas: &'a Atlas) -> &'a ObstacleSet {
        atlas.get(self.id)
    }

    fn set_visible(&mut self, visible: bool, atlas: &mut Atlas) {
        self.visible = visible;
        self.fleet.set_visible(visible);
        atlas.get_mut(self.id).visible = visible;
    }

    /// Per-frame update, identical for both worlds.
    pub fn tick(&mut self, dt: f32, quarry: Option<Quarry>, oracle: &dyn CollisionOracle, cfg: &GuardConfig) {
        self.fleet.tick(dt, quarry, oracle, cfg);
    }
}

/// State both worlds read: the avatar and which world it is in.
#[derive(Clone, Debug)]
pub struct SharedState {
    pub character: Character,
    pub active: WorldId,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockReason {
    Obstructed,
    NoResources,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwitchOutcome {
    Switched { from: WorldId, to: WorldId },
    Blocked(BlockReason),
    Debounced,
}

#[derive(Clone, Debug)]
pub struct WorldSwitcher {
    past: WorldContext,
    present: WorldContext,
    pub shared: SharedState,
    debounce: f32,
    /// Seconds since the last attempt that got past the debounce.
    since_attempt: f32,
}

impl WorldSwitcher {
    /// Starts in the past, with the past visible.
    pub fn new(
        past: WorldContext,
        present: WorldContext,
        character: Character,
        debounce: f32,
        atlas: &mut Atlas,
    ) -> Self {
        let mut s = WorldSwitcher {
            past,
            present,
            shared: SharedState { character, active: WorldId::Past },
            debounce,
            since_attempt: f32::INFINITY,
        };
        s.apply_visibility(atlas);
        s
    }

    pub fn active(&self) -> WorldId {
        self.shared.active
    }

    pub fn character(&self) -> &Character {
        &self.shared.character
    }

    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.shared.character
    }

    pub fn context(&self, id: WorldId) -> &WorldContext {
        match id {
            WorldId::Past => &self.past,
            WorldId::Present => &self.present,
        }
    }

    /// Both contexts, past first.
    pub fn contexts_mut(&mut self) -> [&mut WorldContext; 2] {
        [&mut self.past, &mut self.present]
    }

    pub fn tick(&mut self, dt: f32) {
        self.since_attempt += dt;
    }

    /// Why a switch right now would fail, if it would.
    pub fn gate(&self, oracle: &dyn CollisionOracle) -> Option<BlockReason> {
        let target = self.shared.active.other();
        if oracle.is_obstructed(self.shared.character.position, target) {
            Some(BlockReason::Obstructed)
        } else if self.shared.character.resources == 0 {
            Some(BlockReason::NoResources)
        } else {
            None
        }
    }

    /// Indicator signal: green when a switch would go through.
    pub fn can_switch(&self, oracle: &dyn CollisionOracle) -> bool {
        self.gate(oracle).is_none()
    }

    pub fn request_switch(&mut self, atlas: &mut Atlas, trace: &mut PathTracer) -> SwitchOutcome {
        if self.since_attempt < self.debounce {
            return SwitchOutcome::Debounced;
        }
        self.since_attempt = 0.0;

        if let Some(reason) = self.gate(&*atlas) {
            log::debug!("switch blocked: {:?}", reason);
            return SwitchOutcome::Blocked(reason);
        }

        let from = self.shared.active;
        let to = from.other();
        self.shared.active = to;
        if from == WorldId::Present {
            self.shared.character.resources -= 1;
        }
        trace.clear();
        self.apply_visibility(atlas);

        log::info!(
            "switched {} -> {} (resources left: {})",
            from.label(), to.label(), self.shared.character.resources,
        );
        SwitchOutcome::Switched { from, to }
    }

    fn apply_visibility(&mut self, atlas: &mut Atlas) {
        let active = self.shared.active;
        self.past.set_visible(active == WorldId::Past, atlas);
        self.present.set_visible(active == WorldId::Present, atlas);
    }
}
