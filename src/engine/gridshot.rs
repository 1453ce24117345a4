//! Static targets on a fixed grid; click them before they expire.

use rand::seq::SliceRandom;
use rand::RngCore;
use tracing::trace;

use crate::clock::Clock;
use crate::engine::render::{self, palette, Surface};
use crate::engine::{Engine, EngineCore, EngineEvent, ModeMetrics, TrainingResult};
use crate::session::{RunCounters, TrainingConfig, TrainingMode};
use crate::target::{CanvasSize, Point, Target};

pub const GRID_COLUMNS: usize = 5;
pub const GRID_ROWS: usize = 3;
pub const TARGET_LIFETIME_MS: f64 = 3000.0;

/// Cell centres, row-major, inset 15% horizontally and 20% vertically.
pub fn grid_positions(canvas: CanvasSize) -> Vec<Point> {
    let margin_x = canvas.width * 0.15;
    let margin_y = canvas.height * 0.2;
    let spacing_x = (canvas.width - margin_x * 2.0) / (GRID_COLUMNS - 1) as f64;
    let spacing_y = (canvas.height - margin_y * 2.0) / (GRID_ROWS - 1) as f64;
    (0..GRID_ROWS)
        .flat_map(|row| {
            (0..GRID_COLUMNS).map(move |col| {
                Point::new(
                    margin_x + col as f64 * spacing_x,
                    margin_y + row as f64 * spacing_y,
                )
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Placed {
    cell: usize,
    target: Target,
}

pub struct GridshotEngine {
    core: EngineCore,
    cells: Vec<Point>,
    placed: Vec<Placed>,
    counters: RunCounters,
}

impl GridshotEngine {
    pub fn new(clock: Box<dyn Clock>, rng: Box<dyn RngCore>) -> Self {
        let core = EngineCore::new(clock, rng);
        let cells = grid_positions(core.canvas());
        Self {
            core,
            cells,
            placed: Vec::new(),
            counters: RunCounters::default(),
        }
    }

    pub fn cells(&self) -> &[Point] {
        &self.cells
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Places one target on a random free cell. `false` when the grid is full.
    fn spawn_one(&mut self) -> bool {
        let free: Vec<usize> = (0..self.cells.len())
            .filter(|cell| self.placed.iter().all(|p| p.cell != *cell))
            .collect();
        let Some(&cell) = free.choose(self.core.rng()) else {
            trace!("no free grid cell");
            return false;
        };
        let radius = self.core.config().target_size.radius();
        let target = self.core.spawn(self.cells[cell], radius);
        self.placed.push(Placed { cell, target });
        self.counters.total_targets += 1;
        true
    }

    fn replenish(&mut self) {
        let wanted = self.core.config().target_count;
        while self.placed.len() < wanted {
            if !self.spawn_one() {
                break;
            }
        }
    }
}

impl Engine for GridshotEngine {
    fn mode(&self) -> TrainingMode {
        TrainingMode::Gridshot
    }

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn configure(&mut self, canvas: CanvasSize, config: TrainingConfig) {
        if self.core.configure(canvas, config) {
            self.cells = grid_positions(canvas);
        }
    }

    fn start(&mut self) {
        if !self.core.begin_run() {
            return;
        }
        self.counters.reset();
        self.placed.clear();
        self.replenish();
    }

    fn update(&mut self, _dt: f64) {
        let now = self.core.now();
        let mut expired = Vec::new();
        self.placed.retain(|p| {
            if p.target.is_hit {
                return false;
            }
            if p.target.age(now) > TARGET_LIFETIME_MS {
                expired.push(p.target.id);
                return false;
            }
            true
        });
        for id in expired {
            trace!(id = id.0, "expired");
            self.counters.misses += 1;
            self.core.emit(EngineEvent::TargetExpired { id });
        }
        self.replenish();
    }

    fn on_finished(&mut self) {
        // whatever is still up at the buzzer was never hit
        let outstanding = self.placed.iter().filter(|p| !p.target.is_hit).count();
        self.counters.misses += outstanding as u32;
    }

    fn on_click(&mut self) -> bool {
        if !self.core.is_playing() {
            return false;
        }
        let pointer = self.core.pointer();
        let now = self.core.now();
        let Some(placed) = self
            .placed
            .iter_mut()
            .find(|p| !p.target.is_hit && p.target.contains(pointer))
        else {
            return false;
        };
        placed.target.is_hit = true;
        let id = placed.target.id;
        let reaction_ms = placed.target.age(now);
        self.counters.record_hit(reaction_ms);
        trace!(id = id.0, reaction_ms, "hit");
        self.core.emit(EngineEvent::TargetHit { id, reaction_ms });
        true
    }

    fn render(&self, surface: &mut dyn Surface) {
        surface.clear(palette::BACKGROUND);
        for target in self.active_targets() {
            render::draw_target(surface, target, palette::TARGET, palette::TARGET_CORE);
        }
        let crosshair = self.core.crosshair();
        render::draw_crosshair(surface, self.core.pointer(), crosshair.size, crosshair.color);
        render::draw_hud(
            surface,
            self.core.canvas(),
            &format!("Score: {}", self.counters.score),
            self.core.frame.remaining_secs(),
            self.accuracy(),
        );
    }

    fn results(&self) -> TrainingResult {
        TrainingResult::from_counters(
            TrainingMode::Gridshot,
            &self.counters,
            self.core.config(),
            ModeMetrics::Gridshot,
        )
    }

    fn active_targets(&self) -> Vec<&Target> {
        self.placed
            .iter()
            .filter(|p| !p.target.is_hit)
            .map(|p| &p.target)
            .collect()
    }

    fn score(&self) -> u32 {
        self.counters.score
    }

    fn accuracy(&self) -> f64 {
        self.counters.accuracy()
    }

    fn clear_targets(&mut self) {
        self.placed.clear();
    }
}
