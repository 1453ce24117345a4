//! One moving target; keep the crosshair on it while holding the button.

use rand::{Rng, RngCore};
use tracing::trace;

use crate::clock::Clock;
use crate::engine::render::{self, palette, Surface};
use crate::engine::{Engine, EngineCore, ModeMetrics, TrainingResult};
use crate::session::{MovementPattern, TrainingMode};
use crate::target::{clamp_axis, Point, Target};

/// Per-tick chance that the random pattern picks a new heading.
pub const RETARGET_CHANCE: f64 = 0.02;
/// Extra clearance beyond the radius kept between target and canvas edge.
pub const EDGE_CLEARANCE: f64 = 20.0;

pub struct TrackingEngine {
    core: EngineCore,
    target: Option<Target>,
    held: bool,
    tracking_ms: f64,
    total_active_ms: f64,
}

impl TrackingEngine {
    pub fn new(clock: Box<dyn Clock>, rng: Box<dyn RngCore>) -> Self {
        Self {
            core: EngineCore::new(clock, rng),
            target: None,
            held: false,
            tracking_ms: 0.0,
            total_active_ms: 0.0,
        }
    }

    pub fn tracking_ms(&self) -> f64 {
        self.tracking_ms
    }

    pub fn total_active_ms(&self) -> f64 {
        self.total_active_ms
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    fn on_target(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| t.contains(self.core.pointer()))
    }

    fn speed(&self) -> f64 {
        self.core.config().speed.pixels_per_sec()
    }

    fn spawn(&mut self) {
        let speed = self.speed();
        let radius = self.core.config().target_size.radius();
        let center = self.core.canvas().center();
        let heading = if self.core.rng().gen_bool(0.5) { 1.0 } else { -1.0 };
        let target = self
            .core
            .spawn(center, radius)
            .with_velocity(Point::new(heading * speed, 0.0));
        self.target = Some(target);
    }

    fn advance_target(&mut self, dt_secs: f64) {
        let pattern = self.core.config().movement_pattern;
        let speed = self.speed();
        let canvas = self.core.canvas();
        let run_secs = self.core.now() / 1000.0;

        let mut retarget = None;
        if pattern == MovementPattern::Random {
            let rng = self.core.rng();
            if rng.gen::<f64>() < RETARGET_CHANCE {
                let vx = (rng.gen::<f64>() - 0.5) * speed * 2.0;
                let vy = (rng.gen::<f64>() - 0.5) * speed * 2.0;
                retarget = Some(Point::new(vx, vy));
            }
        }

        let Some(target) = self.target.as_mut() else {
            return;
        };
        let mut velocity = target.velocity.unwrap_or_default();

        match pattern {
            MovementPattern::Strafe => {
                target.position.x += velocity.x * dt_secs;
            }
            MovementPattern::Linear => {
                target.position.x += velocity.x * dt_secs;
                target.position.y += velocity.y * dt_secs;
            }
            MovementPattern::Curve => {
                // closed path around the centre, a function of run time alone
                let center = canvas.center();
                target.position = Point::new(
                    center.x + (run_secs * speed / 100.0).cos() * canvas.width * 0.3,
                    center.y + (run_secs * speed / 50.0).sin() * canvas.height * 0.2,
                );
            }
            MovementPattern::Random => {
                if let Some(v) = retarget {
                    trace!(vx = v.x, vy = v.y, "new heading");
                    velocity = v;
                }
                target.position.x += velocity.x * dt_secs;
                target.position.y += velocity.y * dt_secs;
            }
        }

        let margin = target.radius + EDGE_CLEARANCE;
        let p = target.position;
        if p.x < margin || p.x > canvas.width - margin {
            velocity.x = -velocity.x;
            target.position.x = clamp_axis(p.x, margin, canvas.width - margin);
        }
        if p.y < margin || p.y > canvas.height - margin {
            velocity.y = -velocity.y;
            target.position.y = clamp_axis(p.y, margin, canvas.height - margin);
        }
        target.velocity = Some(velocity);
    }
}

impl Engine for TrackingEngine {
    fn mode(&self) -> TrainingMode {
        TrainingMode::Tracking
    }

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn start(&mut self) {
        if !self.core.begin_run() {
            return;
        }
        self.tracking_ms = 0.0;
        self.total_active_ms = 0.0;
        self.held = false;
        self.spawn();
    }

    fn update(&mut self, dt: f64) {
        self.advance_target(dt / 1000.0);
        if self.held {
            self.total_active_ms += dt;
            if self.on_target() {
                self.tracking_ms += dt;
            }
        }
    }

    fn on_mouse_down(&mut self) {
        if self.core.is_playing() {
            self.held = true;
        }
    }

    fn on_mouse_up(&mut self) {
        self.held = false;
    }

    fn render(&self, surface: &mut dyn Surface) {
        surface.clear(palette::BACKGROUND);
        if let Some(target) = &self.target {
            let (outer, core) = if self.held && self.on_target() {
                (palette::TRACKING_ON, palette::TRACKING_ON_CORE)
            } else {
                (palette::TRACKING_OFF, palette::TRACKING_OFF_CORE)
            };
            render::draw_target(surface, target, outer, core);
        }
        let crosshair = self.core.crosshair();
        let color = if self.held {
            palette::HELD
        } else {
            crosshair.color
        };
        render::draw_crosshair(surface, self.core.pointer(), crosshair.size, color);
        render::draw_hud(
            surface,
            self.core.canvas(),
            &format!("Tracking: {:.1}s", self.tracking_ms / 1000.0),
            self.core.frame.remaining_secs(),
            self.accuracy(),
        );
        if !self.held {
            render::draw_hint(surface, self.core.canvas(), "Hold the left button to track");
        }
    }

    /// No discrete targets here: one target per run, hits and misses are
    /// whole seconds on and off target, and reaction times are zero.
    fn results(&self) -> TrainingResult {
        let config = self.core.config();
        TrainingResult {
            mode: TrainingMode::Tracking,
            score: self.score(),
            accuracy: self.accuracy(),
            avg_reaction_ms: 0.0,
            best_reaction_ms: 0.0,
            reaction_std_dev_ms: 0.0,
            reaction_times_ms: Vec::new(),
            total_targets: 1,
            hits: (self.tracking_ms / 1000.0).round() as u32,
            misses: ((self.total_active_ms - self.tracking_ms) / 1000.0).round() as u32,
            duration_secs: config.duration_secs,
            metrics: ModeMetrics::Tracking {
                tracking_ms: self.tracking_ms,
                total_active_ms: self.total_active_ms,
            },
            config: config.clone(),
            timestamp: chrono::Local::now(),
        }
    }

    fn active_targets(&self) -> Vec<&Target> {
        self.target.iter().collect()
    }

    /// One point per 100 ms on target.
    fn score(&self) -> u32 {
        (self.tracking_ms / 100.0).round() as u32
    }

    fn accuracy(&self) -> f64 {
        if self.total_active_ms > 0.0 {
            (self.tracking_ms / self.total_active_ms * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    fn clear_targets(&mut self) {
        self.target = None;
        self.held = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::{DisplayList, NullSurface, TickOutcome};
    use crate::session::{LifecycleState, SpeedClass, TrainingConfig};
    use crate::target::{CanvasSize, TargetSize};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CANVAS: CanvasSize = CanvasSize::new(800.0, 600.0);

    fn engine(config: TrainingConfig) -> (TrackingEngine, ManualClock) {
        let clock = ManualClock::new();
        let mut engine =
            TrackingEngine::new(Box::new(clock.clone()), Box::new(StdRng::seed_from_u64(3)));
        engine.configure(CANVAS, config);
        (engine, clock)
    }

    fn pattern(pattern: MovementPattern) -> TrainingConfig {
        TrainingConfig {
            movement_pattern: pattern,
            ..TrainingConfig::default()
        }
    }

    fn step(engine: &mut TrackingEngine, clock: &ManualClock, ms: f64) -> TickOutcome {
        clock.advance(ms);
        engine.tick(&mut NullSurface)
    }

    #[test]
    fn spawns_one_target_at_centre_moving_horizontally() {
        let (mut engine, _clock) = engine(TrainingConfig::default());
        engine.start();
        assert_eq!(engine.active_targets().len(), 1);
        let target = engine.target().unwrap();
        assert_eq!(target.position, CANVAS.center());
        let v = target.velocity.unwrap();
        assert_eq!(v.x.abs(), 240.0);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn strafe_moves_along_x_only() {
        let (mut engine, clock) = engine(pattern(MovementPattern::Strafe));
        engine.start();
        step(&mut engine, &clock, 100.0);
        let p = engine.target().unwrap().position;
        assert!(((p.x - 400.0).abs() - 24.0).abs() < 1e-9);
        assert_eq!(p.y, 300.0);
    }

    #[test]
    fn target_reflects_inside_margins() {
        let config = TrainingConfig {
            movement_pattern: MovementPattern::Linear,
            speed: SpeedClass::Fast,
            ..TrainingConfig::default()
        };
        let (mut engine, clock) = engine(config);
        engine.start();
        let initial = engine.target().unwrap().velocity.unwrap().x;
        let mut flipped = false;
        for _ in 0..200 {
            step(&mut engine, &clock, 16.0);
            let t = engine.target().unwrap();
            assert!(t.position.x >= 60.0 && t.position.x <= 740.0);
            if t.velocity.unwrap().x.signum() != initial.signum() {
                flipped = true;
            }
        }
        assert!(flipped);
    }

    #[test]
    fn curve_follows_run_time() {
        let (mut engine, clock) = engine(pattern(MovementPattern::Curve));
        engine.start();
        step(&mut engine, &clock, 500.0);
        let p = engine.target().unwrap().position;
        let expected_x = 400.0 + (0.5_f64 * 2.4).cos() * 240.0;
        let expected_y = 300.0 + (0.5_f64 * 4.8).sin() * 120.0;
        assert!((p.x - expected_x).abs() < 1e-9);
        assert!((p.y - expected_y).abs() < 1e-9);

        // paused time does not advance the path
        engine.pause();
        clock.advance(10_000.0);
        engine.resume();
        step(&mut engine, &clock, 0.0);
        let q = engine.target().unwrap().position;
        assert!((q.x - expected_x).abs() < 1e-9);
    }

    #[test]
    fn random_pattern_stays_on_canvas() {
        let config = TrainingConfig {
            movement_pattern: MovementPattern::Random,
            speed: SpeedClass::Fast,
            duration_secs: 60.0,
            ..TrainingConfig::default()
        };
        let (mut engine, clock) = engine(config);
        engine.start();
        for _ in 0..1000 {
            step(&mut engine, &clock, 16.0);
            let p = engine.target().unwrap().position;
            assert!(CANVAS.contains(p, 60.0), "{p:?}");
        }
    }

    #[test]
    fn accrues_only_while_held() {
        let (mut engine, clock) = engine(pattern(MovementPattern::Strafe));
        engine.start();
        for _ in 0..5 {
            step(&mut engine, &clock, 16.0);
        }
        assert_eq!(engine.total_active_ms(), 0.0);
        assert_eq!(engine.accuracy(), 0.0);

        engine.on_mouse_down();
        assert!(engine.is_held());
        // 80 ms held, 160 ms since start: the target is 38.4 px off centre, still under the pointer
        for _ in 0..5 {
            step(&mut engine, &clock, 16.0);
        }
        assert_eq!(engine.tracking_ms(), 80.0);
        assert_eq!(engine.total_active_ms(), 80.0);
        assert_eq!(engine.accuracy(), 100.0);

        // the target drifts away while the button stays down
        for _ in 0..50 {
            step(&mut engine, &clock, 16.0);
            assert!(engine.tracking_ms() <= engine.total_active_ms());
        }
        assert!(engine.tracking_ms() < engine.total_active_ms());

        engine.on_mouse_up();
        let before = engine.total_active_ms();
        step(&mut engine, &clock, 16.0);
        assert_eq!(engine.total_active_ms(), before);
    }

    #[test]
    fn button_is_ignored_until_playing() {
        let (mut engine, _clock) = engine(TrainingConfig::default());
        engine.on_mouse_down();
        assert!(!engine.is_held());
        engine.start();
        engine.pause();
        engine.on_mouse_down();
        assert!(!engine.is_held());
    }

    #[test]
    fn results_report_time_based_figures() {
        let (mut engine, clock) = engine(TrainingConfig::default());
        engine.start();
        engine.tracking_ms = 1549.0;
        engine.total_active_ms = 3000.0;
        clock.advance(100.0);
        engine.stop();
        let result = engine.results();
        assert_eq!(result.score, 15);
        assert_eq!(result.hits, 2);
        assert_eq!(result.misses, 1);
        assert_eq!(result.total_targets, 1);
        assert_eq!(result.avg_reaction_ms, 0.0);
        assert_eq!(result.best_reaction_ms, 0.0);
        assert!((result.accuracy - 51.633333333).abs() < 1e-6);
        assert_eq!(
            result.metrics,
            ModeMetrics::Tracking {
                tracking_ms: 1549.0,
                total_active_ms: 3000.0
            }
        );
    }

    #[test]
    fn render_colours_follow_tracking_state() {
        let config = TrainingConfig {
            target_size: TargetSize::Large,
            ..TrainingConfig::default()
        };
        let (mut engine, clock) = engine(config);
        engine.start();
        let mut list = DisplayList::new();
        clock.advance(16.0);
        engine.tick(&mut list);
        assert!(list.circles().any(|(_, _, c)| c == palette::TRACKING_OFF));
        assert!(list.texts().any(|t| t == "Hold the left button to track"));

        engine.on_mouse_down();
        clock.advance(16.0);
        engine.tick(&mut list);
        assert!(list.circles().any(|(_, _, c)| c == palette::TRACKING_ON));
        assert!(!list.texts().any(|t| t.starts_with("Hold")));
    }

    #[test]
    fn runs_to_completion() {
        let config = TrainingConfig {
            duration_secs: 1.0,
            ..TrainingConfig::default()
        };
        let (mut engine, clock) = engine(config);
        engine.start();
        let mut ticks = 0;
        while step(&mut engine, &clock, 16.0) != TickOutcome::Finished {
            ticks += 1;
        }
        assert_eq!(ticks, 62);
        assert_eq!(engine.state(), LifecycleState::Finished);
        engine.destroy();
        assert!(engine.active_targets().is_empty());
    }
}
