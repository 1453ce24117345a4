use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::target::{CanvasSize, TargetSize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrainingMode {
    Gridshot,
    Tracking,
    Flicking,
}

impl TrainingMode {
    pub const ALL: [TrainingMode; 3] = [
        TrainingMode::Gridshot,
        TrainingMode::Tracking,
        TrainingMode::Flicking,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TrainingMode::Gridshot => "Gridshot",
            TrainingMode::Tracking => "Tracking",
            TrainingMode::Flicking => "Flicking",
        }
    }

    /// Next mode in menu order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            TrainingMode::Gridshot => TrainingMode::Tracking,
            TrainingMode::Tracking => TrainingMode::Flicking,
            TrainingMode::Flicking => TrainingMode::Gridshot,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TrainingMode::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MovementPattern {
    Strafe,
    Linear,
    Curve,
    Random,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SpeedClass {
    Slow,
    Medium,
    Fast,
}

impl SpeedClass {
    /// Target speed in pixels per second.
    pub fn pixels_per_sec(self) -> f64 {
        let units = match self {
            SpeedClass::Slow => 2.0,
            SpeedClass::Medium => 4.0,
            SpeedClass::Fast => 7.0,
        };
        units * 60.0
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistanceClass {
    Close,
    Medium,
    Far,
}

impl DistanceClass {
    /// Flick distance bounds as fractions of the canvas diagonal.
    pub fn fraction_range(self) -> (f64, f64) {
        match self {
            DistanceClass::Close => (0.15, 0.25),
            DistanceClass::Medium => (0.25, 0.4),
            DistanceClass::Far => (0.4, 0.6),
        }
    }

    /// Flick distance bounds in pixels for `canvas`.
    pub fn pixel_range(self, canvas: CanvasSize) -> (f64, f64) {
        let (lo, hi) = self.fraction_range();
        let diagonal = canvas.diagonal();
        (lo * diagonal, hi * diagonal)
    }
}

/// Immutable parameters of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub duration_secs: f64,
    pub target_size: TargetSize,
    /// Gridshot: concurrent targets.
    pub target_count: usize,
    /// Tracking: how the target moves.
    pub movement_pattern: MovementPattern,
    pub speed: SpeedClass,
    /// Flicking: how far apart consecutive targets spawn.
    pub target_distance: DistanceClass,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            target_size: TargetSize::Medium,
            target_count: 3,
            movement_pattern: MovementPattern::Strafe,
            speed: SpeedClass::Medium,
            target_distance: DistanceClass::Medium,
        }
    }
}

/// Engine lifecycle. The countdown before `Playing` belongs to the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Playing,
    Paused,
    Finished,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        matches!(self, LifecycleState::Playing | LifecycleState::Paused)
    }
}

/// Running counters of the discrete-target variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCounters {
    pub score: u32,
    pub hits: u32,
    pub misses: u32,
    pub total_targets: u32,
    pub reaction_times: Vec<f64>,
}

impl RunCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Hits over spawned targets in percent, 0 before any target exists.
    pub fn accuracy(&self) -> f64 {
        if self.total_targets == 0 {
            0.0
        } else {
            (self.hits as f64 / self.total_targets as f64 * 100.0).clamp(0.0, 100.0)
        }
    }

    pub fn record_hit(&mut self, reaction_ms: f64) {
        self.score += 1;
        self.hits += 1;
        self.reaction_times.push(reaction_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_product_defaults() {
        let cfg = TrainingConfig::default();
        assert_eq!(cfg.duration_secs, 30.0);
        assert_eq!(cfg.target_size, TargetSize::Medium);
        assert_eq!(cfg.target_count, 3);
        assert_eq!(cfg.movement_pattern, MovementPattern::Strafe);
    }

    #[test]
    fn speed_classes() {
        assert_eq!(SpeedClass::Slow.pixels_per_sec(), 120.0);
        assert_eq!(SpeedClass::Medium.pixels_per_sec(), 240.0);
        assert_eq!(SpeedClass::Fast.pixels_per_sec(), 420.0);
    }

    #[test]
    fn distance_ranges_are_disjoint_and_ordered() {
        let canvas = CanvasSize::new(300.0, 400.0);
        let close = DistanceClass::Close.pixel_range(canvas);
        let medium = DistanceClass::Medium.pixel_range(canvas);
        let far = DistanceClass::Far.pixel_range(canvas);
        assert_eq!(close, (75.0, 125.0));
        assert!(close.1 <= medium.0 && medium.1 <= far.0);
    }

    #[test]
    fn accuracy_is_zero_without_targets() {
        let mut counters = RunCounters::default();
        assert_eq!(counters.accuracy(), 0.0);
        counters.total_targets = 4;
        counters.record_hit(250.0);
        assert_eq!(counters.accuracy(), 25.0);
        assert_eq!(counters.score, 1);
        counters.reset();
        assert_eq!(counters, RunCounters::default());
    }

    #[test]
    fn mode_cycle_and_parse() {
        assert_eq!(TrainingMode::Flicking.next(), TrainingMode::Gridshot);
        assert_eq!(TrainingMode::parse("TRACKING"), Some(TrainingMode::Tracking));
        assert_eq!(TrainingMode::parse("duel"), None);
        assert_eq!(TrainingMode::Gridshot.to_string(), "gridshot");
    }
}
