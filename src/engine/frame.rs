//! Lifecycle and timing shared by every engine variant.
//!
//! The loop never schedules itself: a tick is *requested* and the host's
//! scheduler delivers it by calling the engine's `tick`. Pausing withdraws the
//! request, so no time can elapse against the run while paused. All
//! timestamps handed to the variants come from [`FrameLoop::now`], the
//! run clock, which excludes paused spans.

use tracing::debug;

use crate::clock::Clock;
use crate::session::LifecycleState;

/// What a call to an engine's `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No tick was pending (idle, paused, finished or already consumed).
    Skipped,
    /// State advanced and the next tick is requested.
    Continue,
    /// This tick ran the clock out; the run is over.
    Finished,
}

pub struct FrameLoop {
    clock: Box<dyn Clock>,
    state: LifecycleState,
    duration_ms: f64,
    remaining_ms: f64,
    started_at: f64,
    paused_total: f64,
    paused_at: Option<f64>,
    finished_at: Option<f64>,
    last_tick_at: f64,
    tick_requested: bool,
}

impl FrameLoop {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            state: LifecycleState::Idle,
            duration_ms: 0.0,
            remaining_ms: 0.0,
            started_at: 0.0,
            paused_total: 0.0,
            paused_at: None,
            finished_at: None,
            last_tick_at: 0.0,
            tick_requested: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == LifecycleState::Playing
    }

    pub fn set_duration_secs(&mut self, secs: f64) {
        self.duration_ms = secs.max(0.0) * 1000.0;
        self.remaining_ms = self.duration_ms;
    }

    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_ms / 1000.0
    }

    pub fn tick_requested(&self) -> bool {
        self.tick_requested
    }

    /// Running time of the current run in milliseconds, paused spans excluded.
    pub fn now(&self) -> f64 {
        match self.state {
            LifecycleState::Idle => 0.0,
            _ => {
                let reference = self
                    .finished_at
                    .or(self.paused_at)
                    .unwrap_or_else(|| self.clock.now_ms());
                reference - self.started_at - self.paused_total
            }
        }
    }

    /// Idle -> Playing. Returns false when the transition is not allowed.
    pub fn start(&mut self) -> bool {
        if self.state != LifecycleState::Idle {
            debug!(state = %self.state, "start ignored");
            return false;
        }
        let wall = self.clock.now_ms();
        self.started_at = wall;
        self.last_tick_at = wall;
        self.paused_total = 0.0;
        self.paused_at = None;
        self.finished_at = None;
        self.remaining_ms = self.duration_ms;
        self.state = LifecycleState::Playing;
        self.tick_requested = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != LifecycleState::Playing {
            return false;
        }
        self.paused_at = Some(self.clock.now_ms());
        self.tick_requested = false;
        self.state = LifecycleState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        let Some(paused_at) = self.paused_at else {
            return false;
        };
        if self.state != LifecycleState::Paused {
            return false;
        }
        let wall = self.clock.now_ms();
        self.paused_total += wall - paused_at;
        self.paused_at = None;
        // the next delta starts now, not at the last pre-pause tick
        self.last_tick_at = wall;
        self.state = LifecycleState::Playing;
        self.tick_requested = true;
        true
    }

    /// Forces the terminal state. Returns true only on the transition itself.
    pub fn finish(&mut self) -> bool {
        if self.state == LifecycleState::Finished {
            return false;
        }
        let was_idle = self.state == LifecycleState::Idle;
        let wall = self.clock.now_ms();
        if was_idle {
            self.started_at = wall;
        }
        self.finished_at = Some(self.paused_at.unwrap_or(wall));
        self.tick_requested = false;
        self.state = LifecycleState::Finished;
        true
    }

    /// Consumes the pending tick and returns the elapsed milliseconds since
    /// the previous one, or `None` if no tick is due.
    pub fn begin_tick(&mut self) -> Option<f64> {
        if !self.tick_requested || self.state != LifecycleState::Playing {
            return None;
        }
        self.tick_requested = false;
        let wall = self.clock.now_ms();
        let dt = (wall - self.last_tick_at).max(0.0);
        self.last_tick_at = wall;
        Some(dt)
    }

    /// Charges `dt` against the remaining time and either finishes the run or
    /// requests the next tick.
    pub fn end_tick(&mut self, dt: f64) -> TickOutcome {
        self.remaining_ms -= dt;
        if self.remaining_ms <= 0.0 {
            self.remaining_ms = 0.0;
            self.finish();
            TickOutcome::Finished
        } else {
            self.tick_requested = true;
            TickOutcome::Continue
        }
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("state", &self.state)
            .field("remaining_ms", &self.remaining_ms)
            .field("tick_requested", &self.tick_requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn frame(secs: f64) -> (FrameLoop, ManualClock) {
        let clock = ManualClock::new();
        let mut frame = FrameLoop::new(Box::new(clock.clone()));
        frame.set_duration_secs(secs);
        (frame, clock)
    }

    #[test]
    fn tick_decrements_remaining_by_elapsed() {
        let (mut frame, clock) = frame(1.0);
        assert!(frame.start());
        clock.advance(16.0);
        let dt = frame.begin_tick().unwrap();
        assert_eq!(dt, 16.0);
        assert_eq!(frame.end_tick(dt), TickOutcome::Continue);
        assert_eq!(frame.remaining_ms(), 984.0);
        assert!(frame.tick_requested());
    }

    #[test]
    fn no_tick_without_request() {
        let (mut frame, _clock) = frame(1.0);
        assert!(frame.begin_tick().is_none());
        frame.start();
        assert!(frame.begin_tick().is_some());
        // consumed until end_tick re-requests
        assert!(frame.begin_tick().is_none());
    }

    #[test]
    fn runs_out_and_finishes() {
        let (mut frame, clock) = frame(0.05);
        frame.start();
        clock.advance(60.0);
        let dt = frame.begin_tick().unwrap();
        assert_eq!(frame.end_tick(dt), TickOutcome::Finished);
        assert_eq!(frame.state(), LifecycleState::Finished);
        assert_eq!(frame.remaining_ms(), 0.0);
        assert!(!frame.tick_requested());
    }

    #[test]
    fn pause_excludes_time_from_run_clock_and_remaining() {
        let (mut frame, clock) = frame(10.0);
        frame.start();
        clock.advance(100.0);
        let dt = frame.begin_tick().unwrap();
        frame.end_tick(dt);
        let before = frame.remaining_ms();

        assert!(frame.pause());
        assert!(frame.begin_tick().is_none());
        clock.advance(5_000.0);
        assert_eq!(frame.now(), 100.0);
        assert!(frame.resume());
        assert_eq!(frame.remaining_ms(), before);
        assert_eq!(frame.now(), 100.0);

        clock.advance(10.0);
        assert_eq!(frame.begin_tick(), Some(10.0));
        assert_eq!(frame.now(), 110.0);
    }

    #[test]
    fn lifecycle_misuse_is_ignored() {
        let (mut frame, _clock) = frame(1.0);
        assert!(!frame.resume());
        assert!(!frame.pause());
        frame.start();
        assert!(!frame.start());
        assert!(!frame.resume());
        assert!(frame.finish());
        assert!(!frame.finish());
        assert!(!frame.start());
        assert!(!frame.pause());
    }

    #[test]
    fn run_clock_freezes_at_finish() {
        let (mut frame, clock) = frame(10.0);
        frame.start();
        clock.advance(250.0);
        frame.finish();
        clock.advance(1_000.0);
        assert_eq!(frame.now(), 250.0);
    }

    #[test]
    fn finishing_while_paused_keeps_paused_time_out() {
        let (mut frame, clock) = frame(10.0);
        frame.start();
        clock.advance(40.0);
        frame.pause();
        clock.advance(400.0);
        frame.finish();
        assert_eq!(frame.now(), 40.0);
    }
}
