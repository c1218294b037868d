/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world is continuous; each terminal cell covers `CELL_W` × `CELL_H`
/// world units and is drawn from whatever lies at its center.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::ai::GuardMode;
use crate::domain::entity::ItemKind;
use crate::domain::geometry::Vec2;
use crate::domain::obstacle::WorldId;
use crate::sim::world::{Camera, Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, so inter-row gaps match.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// World units covered by one terminal column / row.
pub const CELL_W: f32 = 10.0;
pub const CELL_H: f32 = 20.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, gap + message + gap + help below.
const RESERVED_ROWS: usize = MAP_ROW + 4;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const PANEL_BG: Color = Color::Rgb { r: 40, g: 40, b: 40 };

/// World point at the center of terminal cell (col, row).
pub fn screen_to_world(camera: &Camera, col: u16, row: u16) -> Vec2 {
    let vy = row as f32 - MAP_ROW as f32;
    camera.view_to_world(Vec2::new(
        (col as f32 + 0.5) * CELL_W,
        (vy + 0.5) * CELL_H,
    ))
}

/// Terminal cell showing world point `p`, if it is on screen.
fn world_to_screen(camera: &Camera, p: Vec2) -> Option<(usize, usize)> {
    let v = camera.world_to_view(p)?;
    Some(((v.x / CELL_W) as usize, MAP_ROW + (v.y / CELL_H) as usize))
}

fn world_palette(world: WorldId) -> (Color, Color) {
    // (obstacle fg, floor bg)
    match world {
        WorldId::Past => (Color::Rgb { r: 160, g: 120, b: 70 }, Color::Rgb { r: 38, g: 32, b: 26 }),
        WorldId::Present => (Color::Rgb { r: 110, g: 130, b: 160 }, Color::Rgb { r: 26, g: 30, b: 40 }),
    }
}

fn guard_style(mode: GuardMode) -> (char, Color) {
    match mode {
        GuardMode::Patrol => ('G', Color::Rgb { r: 90, g: 200, b: 120 }),
        GuardMode::Chase => ('G', Color::Rgb { r: 255, g: 60, b: 60 }),
        GuardMode::Return => ('g', Color::Rgb { r: 230, g: 200, b: 60 }),
    }
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport in world units, from the terminal size
        let map_rows = self.term_h.saturating_sub(RESERVED_ROWS).max(1);
        world.camera.view_w = self.term_w as f32 * CELL_W;
        world.camera.view_h = map_rows as f32 * CELL_H;

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        let (target, size) = (world.character().position, world.level_size());
        match world.phase {
            Phase::Playing => world.camera.follow(target, size),
            Phase::Caught | Phase::Complete => world.camera.center_on(target, size),
        }

        self.front.clear();
        self.compose_game(world, map_rows);
        match world.phase {
            Phase::Playing => {}
            Phase::Caught => self.compose_panel(
                map_rows,
                "CAUGHT",
                "A guard saw you through.",
                "ENTER / R: Try again",
                Color::Rgb { r: 255, g: 60, b: 60 },
            ),
            Phase::Complete => {
                let line = format!("{} preserved.", world.level_name());
                let next = if world.current_level + 1 < world.total_levels() {
                    "ENTER: Next level   R: Replay"
                } else {
                    "ENTER: Back to the first level"
                };
                self.compose_panel(map_rows, "COMPLETE", &line, next, Color::Rgb { r: 255, g: 220, b: 50 });
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState, map_rows: usize) {
        let active = w.active();
        let ch = w.character();

        // ── HUD row ──
        self.front.fill_row(HUD_ROW, HUD_BG);
        let hud = format!(
            " {} ({}/{})  │  {:<7}  │  Resources:{:<3}  Artifacts:{}/{}  │  Switch ",
            w.level_name(), w.current_level + 1, w.total_levels(),
            active.label(), ch.resources, ch.artifacts, w.artifact_goal(),
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
        let indicator = if w.can_switch() {
            Color::Rgb { r: 80, g: 255, b: 80 }
        } else {
            Color::Rgb { r: 255, g: 60, b: 60 }
        };
        self.front.put_str(hud.chars().count(), HUD_ROW, "●", indicator, HUD_BG);

        // ── Terrain ──
        let (wall_fg, floor_bg) = world_palette(active);
        let size = w.level_size();
        let obstacles = w.switcher.context(active).obstacles(&w.atlas);
        for row in 0..map_rows {
            let y = MAP_ROW + row;
            if y >= self.front.height { break; }
            for col in 0..self.front.width {
                let p = screen_to_world(&w.camera, col as u16, y as u16);
                let inside = p.x >= 0.0 && p.y >= 0.0 && p.x < size.x && p.y < size.y;
                let cell = if !inside {
                    Cell::BLANK
                } else if obstacles.visible && obstacles.contains(p) {
                    Cell::new('█', wall_fg, floor_bg)
                } else {
                    Cell::new(' ', Color::White, floor_bg)
                };
                self.front.set(col, y, cell);
            }
        }

        // ── Pending path ──
        let path_fg = if w.trace.is_drawing() {
            Color::Rgb { r: 170, g: 230, b: 255 }
        } else {
            Color::Rgb { r: 120, g: 200, b: 255 }
        };
        for p in w.trace.waypoints() {
            self.put_glyph(w, p, '·', path_fg, floor_bg);
        }

        // ── Items ──
        for item in w.items.iter().filter(|i| i.world == active) {
            let (glyph, fg) = match item.kind {
                ItemKind::Resource => ('◆', Color::Rgb { r: 100, g: 200, b: 255 }),
                ItemKind::Artifact => ('✦', Color::Rgb { r: 255, g: 220, b: 50 }),
            };
            self.put_glyph(w, item.position, glyph, fg, floor_bg);
        }

        // ── Guards ──
        let fleet = &w.switcher.context(active).fleet;
        if fleet.is_visible() {
            for g in fleet.guards() {
                let (glyph, fg) = guard_style(g.mode());
                self.put_glyph(w, g.position, glyph, fg, floor_bg);
            }
        }

        // ── Character ──
        // Highlight while a press on the character has not left it yet.
        let ch_fg = if w.trace.is_initiating() { Color::Rgb { r: 120, g: 200, b: 255 } } else { Color::White };
        self.put_glyph(w, ch.position, '@', ch_fg, floor_bg);

        // ── Message bar ──
        let msg_row = MAP_ROW + map_rows + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + map_rows + 3;
        if help_row < self.front.height {
            let help = " Drag from @: Path  Space/Tab: Switch world  R: Restart  Q/Esc: Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn put_glyph(&mut self, w: &WorldState, p: Vec2, glyph: char, fg: Color, bg: Color) {
        if let Some((col, row)) = world_to_screen(&w.camera, p) {
            self.front.set(col, row, Cell::new(glyph, fg, bg));
        }
    }

    fn compose_panel(&mut self, map_rows: usize, title: &str, line: &str, keys: &str, accent: Color) {
        let box_w = 40_usize.min(self.front.width);
        let box_h = 7_usize.min(map_rows);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + map_rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, PANEL_BG));
            }
        }
        let center = |s: &str| box_x + box_w.saturating_sub(s.chars().count()) / 2;
        self.front.put_str(center(title), box_y + 1, title, accent, PANEL_BG);
        self.front.put_str(center(line), box_y + 3, line, Color::White, PANEL_BG);
        self.front.put_str(center(keys), box_y + 5, keys, Color::Rgb { r: 100, g: 200, b: 255 }, PANEL_BG);
    }
}
