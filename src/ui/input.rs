/// Input state tracker.
///
/// Keys: tracks which keys are held so one-shot actions (switch, restart,
/// confirm) fire only on the initial press, not on terminal auto-repeat.
///
/// Pointer: left-button press / drag / release are coalesced between
/// simulation ticks. A press is never lost, drags collapse to the latest
/// position, and a release is delivered after any pending drag.
///
/// Terminals rarely report key Release, so a key counts as held until
/// `HOLD_TIMEOUT` passes without a Press/Repeat for it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Pointer gesture in terminal cells (column, row).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerGesture {
    Press(u16, u16),
    Held(u16, u16),
    Release(u16, u16),
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl-C.
    raw_events: Vec<KeyEvent>,

    pending_press: Option<(u16, u16)>,
    latest_drag: Option<(u16, u16)>,
    pending_release: Option<(u16, u16)>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            pending_press: None,
            latest_drag: None,
            pending_release: None,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(ev) => self.handle(ev),
                Err(e) => {
                    log::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn handle(&mut self, ev: Event) {
        match ev {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release => {
                self.last_active.remove(&key.code);
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let at = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pending_press = Some(at);
                self.latest_drag = None;
                self.pending_release = None;
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.latest_drag = Some(at);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.pending_release = Some(at);
            }
            _ => {}
        }
    }

    /// The pointer gesture for this simulation tick, if any.
    pub fn take_gesture(&mut self) -> Option<PointerGesture> {
        if let Some((c, r)) = self.pending_press.take() {
            return Some(PointerGesture::Press(c, r));
        }
        if let Some((c, r)) = self.latest_drag.take() {
            return Some(PointerGesture::Held(c, r));
        }
        self.pending_release.take().map(|(c, r)| PointerGesture::Release(c, r))
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE })
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn press_drag_release_arrive_in_order() {
        let mut input = InputState::new();
        input.handle(mouse(MouseEventKind::Down(MouseButton::Left), 3, 4));
        input.handle(mouse(MouseEventKind::Drag(MouseButton::Left), 5, 4));
        input.handle(mouse(MouseEventKind::Drag(MouseButton::Left), 7, 4));
        input.handle(mouse(MouseEventKind::Up(MouseButton::Left), 7, 4));

        assert_eq!(input.take_gesture(), Some(PointerGesture::Press(3, 4)));
        assert_eq!(input.take_gesture(), Some(PointerGesture::Held(7, 4)));
        assert_eq!(input.take_gesture(), Some(PointerGesture::Release(7, 4)));
        assert_eq!(input.take_gesture(), None);
    }

    #[test]
    fn new_press_discards_stale_drag() {
        let mut input = InputState::new();
        input.handle(mouse(MouseEventKind::Drag(MouseButton::Left), 9, 9));
        input.handle(mouse(MouseEventKind::Up(MouseButton::Left), 9, 9));
        input.handle(mouse(MouseEventKind::Down(MouseButton::Left), 1, 1));
        assert_eq!(input.take_gesture(), Some(PointerGesture::Press(1, 1)));
        assert_eq!(input.take_gesture(), None);
    }

    #[test]
    fn right_button_is_ignored() {
        let mut input = InputState::new();
        input.handle(mouse(MouseEventKind::Down(MouseButton::Right), 1, 1));
        assert_eq!(input.take_gesture(), None);
    }

    #[test]
    fn key_repeat_fires_once() {
        let mut input = InputState::new();
        input.handle(key(KeyCode::Char(' '), KeyModifiers::NONE));
        input.handle(key(KeyCode::Char(' '), KeyModifiers::NONE));
        assert!(input.was_pressed(KeyCode::Char(' ')));
        assert_eq!(input.fresh_presses.len(), 1);
    }

    #[test]
    fn ctrl_c_detected() {
        let mut input = InputState::new();
        input.handle(key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.ctrl_c_pressed());
    }
}
