/// WorldState: the complete snapshot of a running game.
///
/// ## Layout
///
/// The two parallel worlds live in `switcher` (guard fleets, active world,
/// the shared character) and `atlas` (obstacle geometry). Items of both
/// worlds sit in one list tagged with their `WorldId`.
///
/// ## Camera / Viewport
///
/// World coordinates are continuous units; the renderer maps them onto
/// terminal cells. `camera` holds the world position of the top-left of the
/// viewport and the viewport size in world units:
///   - Renderer maps: `cell(col, row) = (world - camera) / cell_size`
///   - Camera follows the character with a dead-zone approach
///   - Levels smaller than the viewport are centered

use crate::config::Tuning;
use crate::domain::entity::{Character, Item};
use crate::domain::geometry::Vec2;
use crate::domain::obstacle::{Atlas, WorldId};
use crate::domain::path::PathTracer;
use crate::sim::action::ActionManager;
use crate::sim::fleet::GuardFleet;
use crate::sim::level::{LevelDef, Stage};
use crate::sim::motion::MotionDriver;
use crate::sim::switcher::{WorldContext, WorldSwitcher};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// Touched by a guard; waiting for "again".
    Caught,
    /// Artifact goal reached; waiting for "next".
    Complete,
}

#[derive(Clone, Debug)]
pub struct Camera {
    /// World position of the top-left visible point (negative when centering)
    pub x: f32,
    pub y: f32,
    /// Viewport size in world units
    pub view_w: f32,
    pub view_h: f32,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0.0, y: 0.0, view_w: 0.0, view_h: 0.0 }
    }

    /// Follow `target` inside a world of `size`. Only scrolls once the target
    /// leaves the inner 60% of the viewport.
    pub fn follow(&mut self, target: Vec2, size: Vec2) {
        if self.view_w <= 0.0 || self.view_h <= 0.0 { return; }
        self.x = follow_axis(self.x, target.x, self.view_w, size.x);
        self.y = follow_axis(self.y, target.y, self.view_h, size.y);
    }

    /// Snap directly to center on `target`. Used on level load / restart.
    pub fn center_on(&mut self, target: Vec2, size: Vec2) {
        if self.view_w <= 0.0 || self.view_h <= 0.0 { return; }
        self.x = center_axis(target.x, self.view_w, size.x);
        self.y = center_axis(target.y, self.view_h, size.y);
    }

    pub fn world_to_view(&self, p: Vec2) -> Option<Vec2> {
        let v = Vec2::new(p.x - self.x, p.y - self.y);
        if v.x >= 0.0 && v.x < self.view_w && v.y >= 0.0 && v.y < self.view_h {
            Some(v)
        } else {
            None
        }
    }

    pub fn view_to_world(&self, v: Vec2) -> Vec2 {
        Vec2::new(v.x + self.x, v.y + self.y)
    }
}

fn follow_axis(pos: f32, target: f32, view: f32, world: f32) -> f32 {
    if world <= view {
        return -(view - world) / 2.0;
    }
    let margin = view / 5.0;
    let mut pos = pos;
    if target < pos + margin {
        pos = target - margin;
    } else if target > pos + view - margin {
        pos = target - view + margin;
    }
    pos.clamp(0.0, world - view)
}

fn center_axis(target: f32, view: f32, world: f32) -> f32 {
    if world <= view {
        -(view - world) / 2.0
    } else {
        (target - view / 2.0).clamp(0.0, world - view)
    }
}

pub struct WorldState {
    // ── Level ──
    pub levels: Vec<LevelDef>,
    pub current_level: usize,
    pub levels_cleared: usize,

    // ── Worlds ──
    pub switcher: WorldSwitcher,
    pub atlas: Atlas,
    pub items: Vec<Item>,

    // ── Character motion ──
    pub trace: PathTracer,
    pub motion: MotionDriver,
    pub actions: ActionManager,

    pub tuning: Tuning,
    pub phase: Phase,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    /// Seconds until `message` clears; 0 keeps it until replaced.
    pub message_timer: f32,
    pub camera: Camera,
}

impl WorldState {
    /// An empty world; `level::load_level` fills it in.
    pub fn new(tuning: Tuning, levels: Vec<LevelDef>) -> Self {
        let empty = |id: WorldId| WorldContext::new(id, GuardFleet::new(id, vec![]));
        let mut atlas = Atlas::default();
        let switcher = WorldSwitcher::new(
            empty(WorldId::Past),
            empty(WorldId::Present),
            Character::new(Vec2::ZERO, tuning.character.radius, 0),
            tuning.switch.debounce_secs,
            &mut atlas,
        );
        WorldState {
            levels,
            current_level: 0,
            levels_cleared: 0,
            switcher,
            atlas,
            items: vec![],
            trace: PathTracer::new(tuning.path.spacing),
            motion: MotionDriver::new(tuning.character.speed),
            actions: ActionManager::new(),
            tuning,
            phase: Phase::Playing,
            tick: 0,
            message: String::new(),
            message_timer: 0.0,
            camera: Camera::new(),
        }
    }

    /// Replace the running level with a freshly built stage.
    pub fn install(&mut self, stage: Stage) {
        for ctx in self.switcher.contexts_mut() {
            ctx.fleet.clear();
        }
        self.switcher = stage.switcher;
        self.atlas = stage.atlas;
        self.items = stage.items;
        self.trace.clear();
        self.actions.dispose();
        self.tick = 0;
        self.message.clear();
        self.message_timer = 0.0;
        let (pos, size) = (self.character().position, self.level_size());
        self.camera.center_on(pos, size);
    }

    pub fn level(&self) -> Option<&LevelDef> {
        self.levels.get(self.current_level)
    }

    pub fn level_name(&self) -> &str {
        self.level().map_or("", |l| l.name.as_str())
    }

    pub fn artifact_goal(&self) -> u32 {
        self.level().map_or(0, |l| l.artifact_goal)
    }

    pub fn level_size(&self) -> Vec2 {
        self.level().map_or(Vec2::ZERO, |l| l.size)
    }

    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn active(&self) -> WorldId {
        self.switcher.active()
    }

    pub fn character(&self) -> &Character {
        self.switcher.character()
    }

    /// Switch indicator: would a switch right now succeed?
    pub fn can_switch(&self) -> bool {
        self.switcher.can_switch(&self.atlas)
    }

    pub fn set_message(&mut self, msg: &str, secs: f32) {
        self.message = msg.to_string();
        self.message_timer = secs;
    }
}
