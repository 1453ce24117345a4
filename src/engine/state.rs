use rand::RngCore;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::engine::frame::{FrameLoop, TickOutcome};
use crate::engine::render::Crosshair;
use crate::engine::EngineEvent;
use crate::session::{LifecycleState, TrainingConfig};
use crate::target::{CanvasSize, Point, Target, TargetIds};

/// Raw per-axis deltas above this are focus-change jumps, not aiming.
pub const GLITCH_THRESHOLD: f64 = 200.0;
/// The crosshair never sits closer than this to a canvas edge.
pub const POINTER_MARGIN: f64 = 5.0;

pub const DEFAULT_CANVAS: CanvasSize = CanvasSize::new(800.0, 600.0);

/// State every variant carries: lifecycle and timing, pointer, presentation
/// knobs, randomness and the outgoing event queue.
pub struct EngineCore {
    pub frame: FrameLoop,
    canvas: CanvasSize,
    config: TrainingConfig,
    pointer: Point,
    pointer_scale: f64,
    crosshair: Crosshair,
    rng: Box<dyn RngCore>,
    ids: TargetIds,
    events: Vec<EngineEvent>,
}

impl EngineCore {
    pub fn new(clock: Box<dyn Clock>, rng: Box<dyn RngCore>) -> Self {
        let config = TrainingConfig::default();
        let mut frame = FrameLoop::new(clock);
        frame.set_duration_secs(config.duration_secs);
        Self {
            frame,
            canvas: DEFAULT_CANVAS,
            config,
            pointer: DEFAULT_CANVAS.center(),
            pointer_scale: 1.0,
            crosshair: Crosshair::default(),
            rng,
            ids: TargetIds::default(),
            events: Vec::new(),
        }
    }

    /// Accepted only before the run starts; a run's config never changes.
    pub fn configure(&mut self, canvas: CanvasSize, config: TrainingConfig) -> bool {
        if self.state() != LifecycleState::Idle {
            debug!(state = %self.state(), "configure ignored");
            return false;
        }
        self.frame.set_duration_secs(config.duration_secs);
        self.canvas = canvas;
        self.config = config;
        self.pointer = canvas.center();
        true
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn pointer_scale(&self) -> f64 {
        self.pointer_scale
    }

    pub fn set_pointer_scale(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.pointer_scale = factor;
        }
    }

    pub fn crosshair(&self) -> Crosshair {
        self.crosshair
    }

    pub fn set_crosshair(&mut self, crosshair: Crosshair) {
        self.crosshair = crosshair;
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        self.rng.as_mut()
    }

    pub fn state(&self) -> LifecycleState {
        self.frame.state()
    }

    pub fn is_playing(&self) -> bool {
        self.frame.is_playing()
    }

    /// Run-clock milliseconds.
    pub fn now(&self) -> f64 {
        self.frame.now()
    }

    /// Idle -> Playing with the pointer re-centred.
    pub fn begin_run(&mut self) -> bool {
        if !self.frame.start() {
            return false;
        }
        self.pointer = self.canvas.center();
        debug!(duration_secs = self.config.duration_secs, "run started");
        self.emit(EngineEvent::StateChanged(LifecycleState::Playing));
        true
    }

    pub fn pause(&mut self) -> bool {
        let changed = self.frame.pause();
        if changed {
            debug!(remaining_ms = self.frame.remaining_ms(), "paused");
            self.emit(EngineEvent::StateChanged(LifecycleState::Paused));
        }
        changed
    }

    pub fn resume(&mut self) -> bool {
        let changed = self.frame.resume();
        if changed {
            debug!(remaining_ms = self.frame.remaining_ms(), "resumed");
            self.emit(EngineEvent::StateChanged(LifecycleState::Playing));
        }
        changed
    }

    pub fn finish(&mut self) -> bool {
        let changed = self.frame.finish();
        if changed {
            debug!("finished");
            self.emit(EngineEvent::StateChanged(LifecycleState::Finished));
        }
        changed
    }

    pub fn end_tick(&mut self, dt: f64) -> TickOutcome {
        let outcome = self.frame.end_tick(dt);
        if outcome == TickOutcome::Finished {
            debug!("time up");
            self.emit(EngineEvent::StateChanged(LifecycleState::Finished));
        }
        outcome
    }

    pub fn move_pointer(&mut self, dx: f64, dy: f64) {
        if !self.is_playing() {
            return;
        }
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        if dx.abs() > GLITCH_THRESHOLD || dy.abs() > GLITCH_THRESHOLD {
            trace!(dx, dy, "dropping glitch delta");
            return;
        }
        let moved = Point::new(
            self.pointer.x + dx * self.pointer_scale,
            self.pointer.y + dy * self.pointer_scale,
        );
        self.pointer = self.canvas.clamp(moved, POINTER_MARGIN);
    }

    pub fn spawn(&mut self, position: Point, radius: f64) -> Target {
        let target = Target::new(self.ids.next_id(), position, radius, self.now());
        trace!(id = target.id.0, x = position.x, y = position.y, "spawn");
        target
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCore")
            .field("frame", &self.frame)
            .field("canvas", &self.canvas)
            .field("pointer", &self.pointer)
            .field("pointer_scale", &self.pointer_scale)
            .finish_non_exhaustive()
    }
}
