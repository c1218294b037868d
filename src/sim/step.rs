/// The step function: advances the world by one frame of `dt` seconds.
///
/// Processing order:
///   1. Switch request (consumes the frame's input when present)
///   2. Path gesture: press / held / release
///   3. Motion: dispatch the next waypoint if the character is idle
///   4. Item pickup (active world only), then the artifact goal
///   5. Guard fleets of both worlds; only the active one sees the character
///   6. Guard contact
///   7. Animation tick, character position synced from its move action
///
/// Nothing here returns an error: blocked switches, obstructed paths and
/// capture are outcomes, reported as `GameEvent`s.

use crate::domain::ai::Quarry;
use crate::domain::entity::{FrameInput, Gesture, ItemKind};
use crate::domain::path::TraceOutcome;
use crate::sim::motion::CHARACTER_MOVE;
use crate::sim::switcher::{BlockReason, SwitchOutcome};

use super::event::GameEvent;
use super::world::{Phase, WorldState};

const NOTICE_SECS: f32 = 2.0;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    tick_message(world, dt);
    world.switcher.tick(dt);

    if input.switch_world {
        resolve_switch(world, &mut events);
    } else if let Some(gesture) = input.gesture {
        resolve_gesture(world, gesture, &mut events);
    }
    resolve_motion(world);
    resolve_pickup(world, &mut events);
    if resolve_goal(world, &mut events) { return events; }
    resolve_guards(world, dt);
    if resolve_contact(world, &mut events) { return events; }
    resolve_animation(world, dt);

    events
}

fn tick_message(world: &mut WorldState, dt: f32) {
    if world.message_timer > 0.0 {
        world.message_timer -= dt;
        if world.message_timer <= 0.0 {
            world.message_timer = 0.0;
            world.message.clear();
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Input
// ══════════════════════════════════════════════════════════════

fn resolve_switch(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    match world.switcher.request_switch(&mut world.atlas, &mut world.trace) {
        SwitchOutcome::Switched { from, to } => {
            // Stop where we stand; the old waypoint may be inside a wall here.
            world.actions.dispose();
            world.set_message(&format!("Now in the {}", to.label()), NOTICE_SECS);
            events.push(GameEvent::WorldSwitched { from, to });
        }
        SwitchOutcome::Blocked(reason) => {
            let msg = match reason {
                BlockReason::Obstructed => "Something stands there in the other world",
                BlockReason::NoResources => "No resources left to travel",
            };
            world.set_message(msg, NOTICE_SECS);
            events.push(GameEvent::SwitchBlocked(reason));
        }
        SwitchOutcome::Debounced => {}
    }
}

fn resolve_gesture(world: &mut WorldState, gesture: Gesture, events: &mut Vec<GameEvent>) {
    let active = world.switcher.active();
    match gesture {
        Gesture::Press(p) => {
            world.trace.begin(p, world.switcher.character());
        }
        Gesture::Held(p) => {
            let outcome = world.trace.sample(p, world.switcher.character(), &world.atlas, active);
            if outcome == TraceOutcome::Obstructed {
                events.push(GameEvent::PathObstructed);
            }
        }
        Gesture::Release(_) => world.trace.end(),
    }
}

// ══════════════════════════════════════════════════════════════
// Character
// ══════════════════════════════════════════════════════════════

fn resolve_motion(world: &mut WorldState) {
    let from = world.switcher.character().position;
    if let Some(d) = world.motion.advance(&mut world.trace, from, &mut world.actions) {
        if d.from != d.to {
            world.switcher.character_mut().heading = d.from.angle_to(d.to);
        }
    }
}

fn resolve_pickup(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let active = world.switcher.active();
    let character = world.switcher.character();
    let mut taken = vec![];
    world.items.retain(|item| {
        let hit = item.world == active && character.contains(item.position);
        if hit { taken.push(item.kind); }
        !hit
    });

    for kind in taken {
        let ch = world.switcher.character_mut();
        match kind {
            ItemKind::Resource => ch.resources += 1,
            ItemKind::Artifact => ch.artifacts += 1,
        }
        events.push(GameEvent::ItemCollected { kind, world: active });
    }
}

fn resolve_goal(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let goal = world.artifact_goal();
    if goal == 0 || world.character().artifacts < goal {
        return false;
    }
    world.phase = Phase::Complete;
    world.trace.clear();
    world.levels_cleared = world.levels_cleared.max(world.current_level + 1);
    let msg = format!("{} preserved!", world.level_name());
    world.set_message(&msg, 0.0);
    log::info!("level {} complete", world.current_level + 1);
    events.push(GameEvent::LevelComplete);
    true
}

// ══════════════════════════════════════════════════════════════
// Guards
// ══════════════════════════════════════════════════════════════

fn resolve_guards(world: &mut WorldState, dt: f32) {
    let active = world.switcher.active();
    let ch = world.switcher.character();
    let quarry = Quarry { position: ch.position, heading: ch.heading };
    let atlas = &world.atlas;
    let cfg = &world.tuning.guard;

    for ctx in world.switcher.contexts_mut() {
        let sees = if ctx.id == active { Some(quarry) } else { None };
        ctx.tick(dt, sees, atlas, cfg);
    }
}

fn resolve_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let active = world.switcher.active();
    let guard = match world.switcher.context(active).fleet.any_contains(world.switcher.character()) {
        Some(id) => id,
        None => return false,
    };

    world.phase = Phase::Caught;
    world.trace.clear();
    world.actions.dispose();
    world.set_message("Caught by a guard", 0.0);
    log::info!("caught by guard {} in the {}", guard, active.label());
    events.push(GameEvent::CharacterCaught { guard, world: active });
    true
}

// ══════════════════════════════════════════════════════════════
// Animation
// ══════════════════════════════════════════════════════════════

fn resolve_animation(world: &mut WorldState, dt: f32) {
    world.actions.update(dt);
    if let Some(p) = world.actions.position(CHARACTER_MOVE) {
        world.switcher.character_mut().position = p;
    }
}

/// Rebuild the current level from its definition: guards, items, counters,
/// trace and animations all start over.
pub fn restart_level(world: &mut WorldState) {
    let stage = world.level().map(|def| def.instantiate(&world.tuning));
    if let Some(stage) = stage {
        world.install(stage);
    }
    world.phase = Phase::Playing;
    log::info!("level {} restarted", world.current_level + 1);
}
