/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::error::Error;
use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use log::LevelFilter;

use config::{GameConfig, LogConfig};
use domain::entity::{FrameInput, Gesture};
use sim::event::GameEvent;
use sim::level::{load_level, load_levels};
use sim::save::{self, SaveData};
use sim::step;
use sim::world::{Camera, Phase, WorldState};
use ui::input::{InputState, PointerGesture};
use ui::renderer::{screen_to_world, Renderer};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Longest simulated step; a stalled terminal must not teleport guards.
const MAX_DT: f32 = 0.1;

fn main() {
    let config = GameConfig::load();

    if let Err(e) = init_logging(&config.log) {
        eprintln!("Logging disabled: {e}");
    }
    log::debug!("tuning: {:?}", config.tuning);

    let levels = match load_levels(&config) {
        Ok(levels) => levels,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Cannot load levels: {e}");
            return;
        }
    };

    let mut world = WorldState::new(config.tuning.clone(), levels);
    let resume = match save::load_save() {
        Ok(Some(data)) => {
            world.levels_cleared = data.levels_cleared;
            data.current_level
        }
        Ok(None) => 0,
        Err(e) => {
            log::warn!("{e}; starting from the first level");
            0
        }
    };
    load_level(&mut world, resume);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game error: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Levels preserved: {}/{}", world.levels_cleared, world.total_levels());
}

/// Log to a file; the terminal belongs to the game while it runs.
fn init_logging(cfg: &LogConfig) -> Result<(), Box<dyn Error>> {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    let file = File::create(&cfg.file)?;
    simplelog::WriteLogger::init(cfg.level, config, file)?;
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn Error>> {
    let mut input = InputState::new();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tuning.tick_rate_ms);
    let mut pending_switch = false;

    loop {
        input.drain_events();

        if input.ctrl_c_pressed() || input.any_pressed(KEYS_QUIT) {
            break;
        }
        handle_meta(world, &input);

        if world.phase == Phase::Playing && input.any_pressed(KEYS_SWITCH) {
            pending_switch = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f32().min(MAX_DT);
            last_tick = Instant::now();

            if world.phase == Phase::Playing {
                // A switch frame ignores the pointer; keep the gesture for the next tick.
                let gesture = if pending_switch {
                    None
                } else {
                    input.take_gesture().map(|g| to_world(&world.camera, g))
                };
                let frame_input = FrameInput {
                    gesture,
                    switch_world: std::mem::take(&mut pending_switch),
                };
                let events = step::step(world, frame_input, dt);
                process_events(world, &events);
            } else {
                while input.take_gesture().is_some() {}
                pending_switch = false;
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn to_world(camera: &Camera, g: PointerGesture) -> Gesture {
    match g {
        PointerGesture::Press(c, r) => Gesture::Press(screen_to_world(camera, c, r)),
        PointerGesture::Held(c, r) => Gesture::Held(screen_to_world(camera, c, r)),
        PointerGesture::Release(c, r) => Gesture::Release(screen_to_world(camera, c, r)),
    }
}

fn process_events(world: &mut WorldState, events: &[GameEvent]) {
    for event in events {
        if *event == GameEvent::LevelComplete {
            let data = SaveData {
                current_level: (world.current_level + 1) % world.total_levels().max(1),
                levels_cleared: world.levels_cleared,
            };
            if let Err(e) = save::save_game(&data) {
                log::warn!("{e}");
                world.set_message("Progress could not be saved", 0.0);
            }
        }
    }
}

// ── Key Constants ──

const KEYS_SWITCH: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Tab];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

fn handle_meta(world: &mut WorldState, input: &InputState) {
    if input.any_pressed(KEYS_RESTART) {
        step::restart_level(world);
        world.set_message("Level restarted", 1.5);
        return;
    }

    if input.any_pressed(KEYS_CONFIRM) {
        match world.phase {
            Phase::Caught => step::restart_level(world),
            Phase::Complete => {
                let next = world.current_level + 1;
                if next >= world.total_levels() {
                    load_level(world, 0);
                    world.set_message("Every level preserved. From the top!", 3.0);
                } else {
                    load_level(world, next);
                }
            }
            Phase::Playing => {}
        }
    }
}
