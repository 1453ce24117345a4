use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Canvas coordinate in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Drawing surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }

    /// Clamps `p` into the canvas shrunk by `margin` on every side.
    pub fn clamp(&self, p: Point, margin: f64) -> Point {
        Point::new(
            clamp_axis(p.x, margin, self.width - margin),
            clamp_axis(p.y, margin, self.height - margin),
        )
    }

    pub fn contains(&self, p: Point, margin: f64) -> bool {
        p.x >= margin && p.x <= self.width - margin && p.y >= margin && p.y <= self.height - margin
    }
}

/// `f64::clamp` panics when `lo > hi`; a canvas smaller than twice the margin
/// collapses to its midpoint instead.
pub(crate) fn clamp_axis(v: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        v.clamp(lo, hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

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
pub enum TargetSize {
    Small,
    Medium,
    Large,
}

impl TargetSize {
    /// Hit-test radius in pixels.
    pub fn radius(self) -> f64 {
        match self {
            TargetSize::Small => 25.0,
            TargetSize::Medium => 40.0,
            TargetSize::Large => 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub position: Point,
    pub radius: f64,
    /// Run-clock milliseconds at spawn.
    pub created_at: f64,
    pub is_hit: bool,
    /// Pixels per second; only moving targets carry one.
    pub velocity: Option<Point>,
}

impl Target {
    pub fn new(id: TargetId, position: Point, radius: f64, created_at: f64) -> Self {
        Self {
            id,
            position,
            radius,
            created_at,
            is_hit: false,
            velocity: None,
        }
    }

    pub fn with_velocity(mut self, velocity: Point) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn contains(&self, p: Point) -> bool {
        self.position.distance_to(p) <= self.radius
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }
}

/// Hands out unique target ids for one engine instance.
#[derive(Debug, Default)]
pub struct TargetIds {
    next: u64,
}

impl TargetIds {
    pub fn next_id(&mut self) -> TargetId {
        self.next += 1;
        TargetId(self.next)
    }
}
