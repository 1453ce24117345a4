//! Turns host input into engine calls.
//!
//! The adapter is the only writer into an engine's mutating methods. It owns
//! the pointer-lock gate: pointer input only reaches the engine once the lock
//! is held or the acquisition wait has run out and the unlocked fallback is
//! in effect. Escape and Space are session keys and come back to the caller as
//! [`SessionCommand`]s.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use tracing::{debug, trace};

use crate::engine::Engine;
use crate::session::LifecycleState;
use crate::target::Point;

/// How long to wait for the lock before running unlocked.
pub const LOCK_TIMEOUT_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Relative movement, as delivered under a pointer lock.
    Moved { dx: f64, dy: f64 },
    /// Absolute position; converted to a delta against the previous one.
    MovedTo(Point),
    Click,
    ButtonDown,
    ButtonUp,
    Key(Key),
    LockAcquired,
    LockLost,
}

/// What the session around the engine should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerLock {
    #[default]
    Unlocked,
    Requested {
        since_ms: f64,
    },
    Locked,
    /// The lock never arrived; input is taken unlocked.
    Fallback,
}

impl PointerLock {
    pub fn request(&mut self, now_ms: f64) {
        if matches!(self, PointerLock::Unlocked) {
            *self = PointerLock::Requested { since_ms: now_ms };
        }
    }

    pub fn acquire(&mut self) {
        *self = PointerLock::Locked;
    }

    /// Returns true if a held lock was lost.
    pub fn lose(&mut self) -> bool {
        let was_locked = *self == PointerLock::Locked;
        if was_locked {
            *self = PointerLock::Unlocked;
        }
        was_locked
    }

    /// Falls back to unlocked input once a pending request has timed out.
    /// Returns true on that transition.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match *self {
            PointerLock::Requested { since_ms } if now_ms - since_ms >= LOCK_TIMEOUT_MS => {
                debug!("pointer lock timed out, running unlocked");
                *self = PointerLock::Fallback;
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self) {
        *self = PointerLock::Unlocked;
    }

    pub fn accepts_input(&self) -> bool {
        matches!(self, PointerLock::Locked | PointerLock::Fallback)
    }
}

#[derive(Debug, Default)]
pub struct InputAdapter {
    disabled: bool,
    lock: PointerLock,
    last_pointer: Option<Point>,
}

impl InputAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.disabled = !enabled;
        if !enabled {
            self.last_pointer = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn lock(&self) -> PointerLock {
        self.lock
    }

    pub fn lock_mut(&mut self) -> &mut PointerLock {
        &mut self.lock
    }

    /// Forgets the last absolute position so the next one only re-anchors.
    pub fn reanchor(&mut self) {
        self.last_pointer = None;
    }

    pub fn dispatch(
        &mut self,
        event: InputEvent,
        engine: &mut dyn Engine,
    ) -> Option<SessionCommand> {
        match event {
            // capture is tracked even while the engine is not listening
            InputEvent::LockAcquired => {
                self.lock.acquire();
                None
            }
            InputEvent::LockLost => {
                self.last_pointer = None;
                if self.lock.lose() && !self.disabled && engine.state() == LifecycleState::Playing
                {
                    engine.pause();
                    return Some(SessionCommand::Pause);
                }
                None
            }
            _ if self.disabled => {
                trace!(?event, "input disabled, dropping");
                None
            }
            InputEvent::Key(Key::Escape) if engine.state() == LifecycleState::Playing => {
                engine.pause();
                Some(SessionCommand::Pause)
            }
            InputEvent::Key(Key::Space) if engine.state() == LifecycleState::Paused => {
                self.last_pointer = None;
                engine.resume();
                Some(SessionCommand::Resume)
            }
            InputEvent::Key(_) => None,
            // a release always goes through so a held button cannot stick
            InputEvent::ButtonUp => {
                engine.on_mouse_up();
                None
            }
            _ if !self.lock.accepts_input() => {
                trace!(?event, "pointer not captured, dropping");
                None
            }
            InputEvent::Moved { dx, dy } => {
                engine.on_mouse_move(dx, dy);
                None
            }
            InputEvent::MovedTo(p) => {
                if let Some(prev) = self.last_pointer.replace(p) {
                    engine.on_mouse_move(p.x - prev.x, p.y - prev.y);
                }
                None
            }
            InputEvent::Click => {
                engine.on_click();
                None
            }
            InputEvent::ButtonDown => {
                engine.on_mouse_down();
                None
            }
        }
    }
}

/// Canvas pixels covered by one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellScale {
    pub px_per_col: f64,
    pub px_per_row: f64,
}

impl Default for CellScale {
    fn default() -> Self {
        Self {
            px_per_col: 10.0,
            px_per_row: 20.0,
        }
    }
}

impl CellScale {
    pub fn to_canvas(&self, column: u16, row: u16) -> Point {
        Point::new(
            (column as f64 + 0.5) * self.px_per_col,
            (row as f64 + 0.5) * self.px_per_row,
        )
    }
}

/// Maps a terminal mouse report onto adapter events. A left press is both
/// the button going down and the click.
pub fn from_terminal_mouse(event: &MouseEvent, scale: CellScale) -> Vec<InputEvent> {
    let at = InputEvent::MovedTo(scale.to_canvas(event.column, event.row));
    match event.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => vec![at],
        MouseEventKind::Down(MouseButton::Left) => {
            vec![at, InputEvent::ButtonDown, InputEvent::Click]
        }
        MouseEventKind::Up(MouseButton::Left) => vec![at, InputEvent::ButtonUp],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::{build_engine, TrackingEngine};
    use crate::session::{TrainingConfig, TrainingMode};
    use crate::target::CanvasSize;
    use crossterm::event::KeyModifiers;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gridshot() -> Box<dyn Engine> {
        let mut engine = build_engine(
            TrainingMode::Gridshot,
            CanvasSize::new(800.0, 600.0),
            TrainingConfig::default(),
            Box::new(ManualClock::new()),
            Box::new(StdRng::seed_from_u64(0)),
        );
        engine.start();
        engine
    }

    fn locked() -> InputAdapter {
        let mut adapter = InputAdapter::new();
        adapter.lock_mut().acquire();
        adapter
    }

    #[test]
    fn lock_falls_back_after_timeout() {
        let mut lock = PointerLock::default();
        assert!(!lock.accepts_input());
        lock.request(1_000.0);
        assert!(!lock.poll(1_499.0));
        assert!(!lock.accepts_input());
        assert!(lock.poll(1_500.0));
        assert_eq!(lock, PointerLock::Fallback);
        assert!(lock.accepts_input());
        // losing a lock we never held does nothing
        assert!(!lock.lose());
    }

    #[test]
    fn movement_waits_for_the_lock() {
        let mut engine = gridshot();
        let mut adapter = InputAdapter::new();
        adapter.dispatch(InputEvent::Moved { dx: 10.0, dy: 0.0 }, engine.as_mut());
        assert_eq!(engine.snapshot().pointer, Point::new(400.0, 300.0));
        adapter.dispatch(InputEvent::LockAcquired, engine.as_mut());
        adapter.dispatch(InputEvent::Moved { dx: 10.0, dy: 0.0 }, engine.as_mut());
        assert_eq!(engine.snapshot().pointer, Point::new(410.0, 300.0));
    }

    #[test]
    fn absolute_positions_become_deltas() {
        let mut engine = gridshot();
        let mut adapter = locked();
        adapter.dispatch(InputEvent::MovedTo(Point::new(50.0, 50.0)), engine.as_mut());
        assert_eq!(engine.snapshot().pointer, Point::new(400.0, 300.0));
        adapter.dispatch(InputEvent::MovedTo(Point::new(70.0, 40.0)), engine.as_mut());
        assert_eq!(engine.snapshot().pointer, Point::new(420.0, 290.0));
    }

    #[test]
    fn escape_pauses_and_space_resumes() {
        let mut engine = gridshot();
        let mut adapter = locked();
        assert_eq!(
            adapter.dispatch(InputEvent::Key(Key::Space), engine.as_mut()),
            None
        );
        assert_eq!(
            adapter.dispatch(InputEvent::Key(Key::Escape), engine.as_mut()),
            Some(SessionCommand::Pause)
        );
        assert_eq!(engine.state(), LifecycleState::Paused);
        assert_eq!(
            adapter.dispatch(InputEvent::Key(Key::Escape), engine.as_mut()),
            None
        );
        assert_eq!(
            adapter.dispatch(InputEvent::Key(Key::Space), engine.as_mut()),
            Some(SessionCommand::Resume)
        );
        assert_eq!(engine.state(), LifecycleState::Playing);
    }

    #[test]
    fn losing_the_lock_pauses_a_running_session() {
        let mut engine = gridshot();
        let mut adapter = locked();
        assert_eq!(
            adapter.dispatch(InputEvent::LockLost, engine.as_mut()),
            Some(SessionCommand::Pause)
        );
        assert_eq!(engine.state(), LifecycleState::Paused);
        assert!(!adapter.lock().accepts_input());
    }

    #[test]
    fn disabled_adapter_drops_everything() {
        let mut engine = gridshot();
        let mut adapter = locked();
        adapter.set_enabled(false);
        assert_eq!(
            adapter.dispatch(InputEvent::Key(Key::Escape), engine.as_mut()),
            None
        );
        assert_eq!(engine.state(), LifecycleState::Playing);
        adapter.dispatch(InputEvent::Moved { dx: 10.0, dy: 0.0 }, engine.as_mut());
        adapter.dispatch(InputEvent::Click, engine.as_mut());
        assert_eq!(engine.snapshot().pointer, Point::new(400.0, 300.0));
    }

    #[test]
    fn disabled_adapter_still_tracks_capture() {
        let mut engine = gridshot();
        let mut adapter = InputAdapter::new();
        adapter.set_enabled(false);
        adapter.dispatch(InputEvent::LockAcquired, engine.as_mut());
        assert_eq!(adapter.lock(), PointerLock::Locked);
        assert_eq!(
            adapter.dispatch(InputEvent::LockLost, engine.as_mut()),
            None
        );
        assert!(!adapter.lock().accepts_input());
        assert_eq!(engine.state(), LifecycleState::Playing);

        adapter.set_enabled(true);
        adapter.dispatch(InputEvent::LockAcquired, engine.as_mut());
        assert_eq!(
            adapter.dispatch(InputEvent::LockLost, engine.as_mut()),
            Some(SessionCommand::Pause)
        );
    }

    #[test]
    fn button_release_is_never_dropped() {
        let clock = ManualClock::new();
        let mut engine = TrackingEngine::new(Box::new(clock), Box::new(StdRng::seed_from_u64(0)));
        engine.start();
        let mut adapter = locked();
        adapter.dispatch(InputEvent::ButtonDown, &mut engine);
        assert!(engine.is_held());
        adapter.lock_mut().release();
        adapter.dispatch(InputEvent::ButtonUp, &mut engine);
        assert!(!engine.is_held());
    }

    #[test]
    fn terminal_mouse_mapping() {
        let scale = CellScale::default();
        let press = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(
            from_terminal_mouse(&press, scale),
            vec![
                InputEvent::MovedTo(Point::new(45.0, 50.0)),
                InputEvent::ButtonDown,
                InputEvent::Click
            ]
        );
        let scroll = MouseEvent {
            kind: MouseEventKind::ScrollUp,
            ..press
        };
        assert!(from_terminal_mouse(&scroll, scale).is_empty());
    }
}
