//! One target at a time, each spawned a set distance away from the last one
//! hit. Misses are penalised.

use std::f64::consts::TAU;

use rand::{Rng, RngCore};
use tracing::trace;

use crate::clock::Clock;
use crate::engine::render::{self, palette, Surface, TextAlign, TextStyle};
use crate::engine::{Engine, EngineCore, EngineEvent, ModeMetrics, TrainingResult};
use crate::session::{RunCounters, TrainingMode};
use crate::target::{Point, Target};
use crate::util::mean;

pub const TARGET_LIFETIME_MS: f64 = 2000.0;
/// Clearance beyond the radius kept between a spawn and the canvas edge.
pub const EDGE_CLEARANCE: f64 = 30.0;
pub const MAX_PLACEMENT_ATTEMPTS: usize = 32;

pub struct FlickingEngine {
    core: EngineCore,
    target: Option<Target>,
    /// Where the last hit target stood; spawns are measured from here.
    last_hit: Option<Point>,
    counters: RunCounters,
    flick_distances: Vec<f64>,
}

impl FlickingEngine {
    pub fn new(clock: Box<dyn Clock>, rng: Box<dyn RngCore>) -> Self {
        Self {
            core: EngineCore::new(clock, rng),
            target: None,
            last_hit: None,
            counters: RunCounters::default(),
            flick_distances: Vec::new(),
        }
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn last_hit(&self) -> Option<Point> {
        self.last_hit
    }

    pub fn flick_distances(&self) -> &[f64] {
        &self.flick_distances
    }

    pub fn avg_flick_distance(&self) -> f64 {
        mean(&self.flick_distances).unwrap_or(0.0)
    }

    /// Picks a point at a random angle and a distance drawn from the
    /// configured band around `origin`. Candidates falling outside the
    /// playable area are redrawn; if none fits, the last one is clamped.
    fn place_from(&mut self, origin: Point, radius: f64) -> Point {
        let canvas = self.core.canvas();
        let (min, max) = self.core.config().target_distance.pixel_range(canvas);
        let margin = radius + EDGE_CLEARANCE;
        let rng = self.core.rng();
        let mut candidate = origin;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let distance = if max > min {
                rng.gen_range(min..max)
            } else {
                min
            };
            let angle = rng.gen_range(0.0..TAU);
            candidate = Point::new(
                origin.x + angle.cos() * distance,
                origin.y + angle.sin() * distance,
            );
            if canvas.contains(candidate, margin) {
                return candidate;
            }
        }
        trace!("no in-bounds flick found, clamping");
        canvas.clamp(candidate, margin)
    }

    fn spawn(&mut self) {
        let radius = self.core.config().target_size.radius();
        let origin = self.last_hit.unwrap_or_else(|| self.core.canvas().center());
        let position = self.place_from(origin, radius);
        self.target = Some(self.core.spawn(position, radius));
        self.counters.total_targets += 1;
    }

    fn life_ratio(&self, target: &Target) -> f64 {
        (1.0 - target.age(self.core.now()) / TARGET_LIFETIME_MS).max(0.0)
    }
}

impl Engine for FlickingEngine {
    fn mode(&self) -> TrainingMode {
        TrainingMode::Flicking
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
        self.counters.reset();
        self.flick_distances.clear();
        self.last_hit = None;
        self.spawn();
    }

    fn update(&mut self, _dt: f64) {
        let now = self.core.now();
        let Some(target) = &self.target else {
            return;
        };
        if target.age(now) > TARGET_LIFETIME_MS {
            let id = target.id;
            trace!(id = id.0, "expired");
            self.counters.misses += 1;
            self.core.emit(EngineEvent::TargetExpired { id });
            self.spawn();
        }
    }

    fn on_click(&mut self) -> bool {
        if !self.core.is_playing() {
            return false;
        }
        let Some(target) = &self.target else {
            return false;
        };
        if !target.contains(self.core.pointer()) {
            self.counters.misses += 1;
            self.core.emit(EngineEvent::TargetMissed);
            return false;
        }

        let id = target.id;
        let position = target.position;
        let reaction_ms = target.age(self.core.now());
        let flick = self
            .last_hit
            .map(|from| from.distance_to(position))
            .unwrap_or(0.0);

        self.counters.record_hit(reaction_ms);
        trace!(id = id.0, reaction_ms, flick, "hit");
        self.core.emit(EngineEvent::TargetHit { id, reaction_ms });
        if flick > 0.0 {
            self.flick_distances.push(flick);
            self.core.emit(EngineEvent::FlickHit { distance: flick });
        }
        self.last_hit = Some(position);
        self.spawn();
        true
    }

    fn render(&self, surface: &mut dyn Surface) {
        let canvas = self.core.canvas();
        surface.clear(palette::BACKGROUND);
        surface.fill_circle(canvas.center(), 3.0, palette::WHITE.with_alpha(0.3));
        if let Some(target) = &self.target {
            let ratio = self.life_ratio(target);
            render::draw_target(
                surface,
                target,
                palette::TARGET.with_alpha(0.3 + ratio * 0.7),
                palette::TARGET_CORE,
            );
            render::draw_timer_ring(surface, target, ratio, palette::TIMER);
        }
        let crosshair = self.core.crosshair();
        render::draw_crosshair(surface, self.core.pointer(), crosshair.size, crosshair.color);
        render::draw_hud(
            surface,
            canvas,
            &format!("Score: {}", self.counters.score),
            self.core.frame.remaining_secs(),
            self.accuracy(),
        );
        surface.text(
            Point::new(canvas.width - 20.0, 65.0),
            &format!("Avg flick: {:.0}px", self.avg_flick_distance()),
            TextStyle::new(16.0, TextAlign::Right, palette::WHITE),
        );
    }

    fn results(&self) -> TrainingResult {
        TrainingResult::from_counters(
            TrainingMode::Flicking,
            &self.counters,
            self.core.config(),
            ModeMetrics::Flicking {
                avg_flick_distance: self.avg_flick_distance().round(),
            },
        )
    }

    fn active_targets(&self) -> Vec<&Target> {
        self.target.iter().collect()
    }

    fn score(&self) -> u32 {
        self.counters.score
    }

    fn accuracy(&self) -> f64 {
        self.counters.accuracy()
    }

    fn clear_targets(&mut self) {
        self.target = None;
    }
}
