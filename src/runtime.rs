use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind, MouseEvent};

/// About one 60 Hz frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrainerEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The terminal lost focus; treated as losing pointer capture.
    FocusLost,
    FocusGained,
    Resize(u16, u16),
    Tick,
}

/// Source of terminal events (keyboard, mouse, focus, resize)
pub trait TrainerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TrainerEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<TrainerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    Some(TrainerEvent::Key(key))
                }
                Ok(CtEvent::Mouse(mouse)) => Some(TrainerEvent::Mouse(mouse)),
                Ok(CtEvent::FocusLost) => Some(TrainerEvent::FocusLost),
                Ok(CtEvent::FocusGained) => Some(TrainerEvent::FocusGained),
                Ok(CtEvent::Resize(w, h)) => Some(TrainerEvent::Resize(w, h)),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrainerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(FRAME_INTERVAL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TrainerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TrainerEvent>) -> Self {
        Self { rx }
    }
}

impl TrainerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrainerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks are scheduled against a deadline rather than an idle timeout, so a
/// steady stream of mouse reports still yields a `Tick` once per interval.
pub struct Runner<E: TrainerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Cell<Instant>,
}

impl<E: TrainerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Cell::new(Instant::now() + ticker.interval());
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    fn schedule_tick(&self) -> TrainerEvent {
        self.next_tick.set(Instant::now() + self.ticker.interval());
        TrainerEvent::Tick
    }

    /// Blocks until the next event or the tick deadline, whichever is first
    pub fn step(&self) -> TrainerEvent {
        let timeout = self
            .next_tick
            .get()
            .saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return self.schedule_tick();
        }
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.schedule_tick(),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                self.schedule_tick()
            }
        }
    }
}
