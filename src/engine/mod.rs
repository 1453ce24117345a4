//! The three training variants behind one [`Engine`] capability set.
//!
//! Variants own their targets and counters and embed an [`EngineCore`] for
//! everything they share. The trait's provided methods cover lifecycle,
//! pointer movement and the tick skeleton; a variant supplies `start`,
//! `update`, `render` and `results`.

pub mod flicking;
pub mod frame;
pub mod gridshot;
pub mod render;
pub mod state;
pub mod tracking;

use chrono::{DateTime, Local};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::session::{LifecycleState, RunCounters, TrainingConfig, TrainingMode};
use crate::target::{CanvasSize, Point, Target, TargetId};
use crate::util::{fastest, mean, std_dev};

pub use flicking::FlickingEngine;
pub use frame::{FrameLoop, TickOutcome};
pub use gridshot::GridshotEngine;
pub use render::{Crosshair, DisplayList, NullSurface, Surface};
pub use state::EngineCore;
pub use tracking::TrackingEngine;

/// Notifications queued by an engine for the host to drain.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(LifecycleState),
    TargetHit { id: TargetId, reaction_ms: f64 },
    /// A click that hit nothing, where the variant penalises that.
    TargetMissed,
    TargetExpired { id: TargetId },
    FlickHit { distance: f64 },
}

/// Variant-specific extras of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModeMetrics {
    Gridshot,
    Tracking {
        tracking_ms: f64,
        total_active_ms: f64,
    },
    Flicking {
        avg_flick_distance: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub mode: TrainingMode,
    pub score: u32,
    pub accuracy: f64,
    pub avg_reaction_ms: f64,
    pub best_reaction_ms: f64,
    pub reaction_std_dev_ms: f64,
    pub reaction_times_ms: Vec<f64>,
    pub total_targets: u32,
    pub hits: u32,
    pub misses: u32,
    pub duration_secs: f64,
    pub metrics: ModeMetrics,
    pub config: TrainingConfig,
    pub timestamp: DateTime<Local>,
}

impl TrainingResult {
    /// Builds a result from the discrete-target counters. Reaction figures are
    /// rounded to whole milliseconds and are 0 without any hit.
    pub fn from_counters(
        mode: TrainingMode,
        counters: &RunCounters,
        config: &TrainingConfig,
        metrics: ModeMetrics,
    ) -> Self {
        let times = &counters.reaction_times;
        let best = fastest(times);
        Self {
            mode,
            score: counters.score,
            accuracy: counters.accuracy(),
            avg_reaction_ms: mean(times).map(f64::round).unwrap_or(0.0),
            best_reaction_ms: best.map(f64::round).unwrap_or(0.0),
            reaction_std_dev_ms: std_dev(times).unwrap_or(0.0),
            reaction_times_ms: times.clone(),
            total_targets: counters.total_targets,
            hits: counters.hits,
            misses: counters.misses,
            duration_secs: config.duration_secs,
            metrics,
            config: config.clone(),
            timestamp: Local::now(),
        }
    }
}

/// Read-only view of a running engine for the host's overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: LifecycleState,
    pub remaining_secs: f64,
    pub score: u32,
    pub accuracy: f64,
    pub active_targets: usize,
    pub pointer: Point,
}

pub trait Engine {
    fn mode(&self) -> TrainingMode;
    fn core(&self) -> &EngineCore;
    fn core_mut(&mut self) -> &mut EngineCore;

    /// Resets counters and targets, centres the pointer, spawns the opening
    /// targets and starts the loop. Only honoured from idle.
    fn start(&mut self);

    /// Advances target state by `dt` run milliseconds.
    fn update(&mut self, dt: f64);

    /// Paints the current state. Never mutates gameplay state.
    fn render(&self, surface: &mut dyn Surface);

    fn results(&self) -> TrainingResult;

    fn active_targets(&self) -> Vec<&Target>;

    fn score(&self) -> u32;

    /// 0..=100
    fn accuracy(&self) -> f64;

    fn clear_targets(&mut self);

    /// Hook run once on the transition to finished.
    fn on_finished(&mut self) {}

    fn configure(&mut self, canvas: CanvasSize, config: TrainingConfig) {
        self.core_mut().configure(canvas, config);
    }

    fn set_pointer_scale(&mut self, factor: f64) {
        self.core_mut().set_pointer_scale(factor);
    }

    fn set_crosshair(&mut self, crosshair: Crosshair) {
        self.core_mut().set_crosshair(crosshair);
    }

    fn pause(&mut self) {
        self.core_mut().pause();
    }

    fn resume(&mut self) {
        self.core_mut().resume();
    }

    /// Forces the run to finish. Idempotent.
    fn stop(&mut self) {
        if self.core_mut().finish() {
            self.on_finished();
        }
    }

    fn destroy(&mut self) {
        self.stop();
        self.clear_targets();
    }

    fn on_mouse_move(&mut self, dx: f64, dy: f64) {
        self.core_mut().move_pointer(dx, dy);
    }

    /// Returns true when the click hit a target.
    fn on_click(&mut self) -> bool {
        false
    }

    fn on_mouse_down(&mut self) {}

    fn on_mouse_up(&mut self) {}

    /// One frame: elapsed time, update, clock, then finish or render.
    fn tick(&mut self, surface: &mut dyn Surface) -> TickOutcome {
        let Some(dt) = self.core_mut().frame.begin_tick() else {
            return TickOutcome::Skipped;
        };
        self.update(dt);
        let outcome = self.core_mut().end_tick(dt);
        match outcome {
            TickOutcome::Finished => self.on_finished(),
            _ => self.render(surface),
        }
        outcome
    }

    fn state(&self) -> LifecycleState {
        self.core().state()
    }

    fn wants_tick(&self) -> bool {
        self.core().frame.tick_requested()
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state(),
            remaining_secs: self.core().frame.remaining_secs(),
            score: self.score(),
            accuracy: self.accuracy(),
            active_targets: self.active_targets().len(),
            pointer: self.core().pointer(),
        }
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.core_mut().drain_events()
    }
}

/// Builds the engine for `mode` and applies `config` for `canvas`.
pub fn build_engine(
    mode: TrainingMode,
    canvas: CanvasSize,
    config: TrainingConfig,
    clock: Box<dyn Clock>,
    rng: Box<dyn RngCore>,
) -> Box<dyn Engine> {
    let mut engine: Box<dyn Engine> = match mode {
        TrainingMode::Gridshot => Box::new(GridshotEngine::new(clock, rng)),
        TrainingMode::Tracking => Box::new(TrackingEngine::new(clock, rng)),
        TrainingMode::Flicking => Box::new(FlickingEngine::new(clock, rng)),
    };
    engine.configure(canvas, config);
    engine
}
