//! Drawing contract between the engines and whatever paints the frame.
//!
//! Engines only ever talk to a [`Surface`]. The terminal host records into a
//! [`DisplayList`] and replays it onto a ratatui canvas; tests inspect the
//! same list.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::target::{CanvasSize, Point, Target};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0 transparent ..= 1.0 opaque
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Parses `#rrggbb` or `#rgb` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
            3 => {
                let widen = |v: u8| v * 17;
                Some(Self::rgb(
                    widen(channel(0, 1)?),
                    widen(channel(1, 1)?),
                    widen(channel(2, 1)?),
                ))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Composites `self` over an opaque `background`.
    pub fn over(self, background: Rgba) -> Rgba {
        let a = self.a.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| (fg as f64 * a + bg as f64 * (1.0 - a)).round() as u8;
        Rgba::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }
}

pub mod palette {
    use super::Rgba;

    pub const BACKGROUND: Rgba = Rgba::rgb(0x1a, 0x1a, 0x2e);
    pub const WHITE: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
    pub const TARGET: Rgba = Rgba::rgb(0xef, 0x44, 0x44);
    pub const TARGET_CORE: Rgba = Rgba::rgb(0xdc, 0x26, 0x26);
    pub const TRACKING_ON: Rgba = Rgba::rgb(0x22, 0xc5, 0x5e);
    pub const TRACKING_ON_CORE: Rgba = Rgba::rgb(0x16, 0xa3, 0x4a);
    pub const TRACKING_OFF: Rgba = Rgba::rgb(0x3b, 0x82, 0xf6);
    pub const TRACKING_OFF_CORE: Rgba = Rgba::rgb(0x25, 0x63, 0xeb);
    pub const HELD: Rgba = Rgba::rgb(0xef, 0x44, 0x44);
    pub const TIMER: Rgba = Rgba::rgb(0xfb, 0xbf, 0x24);
    pub const HINT: Rgba = Rgba::rgb(0xff, 0xff, 0xff).with_alpha(0.5);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub bold: bool,
    pub align: TextAlign,
    pub color: Rgba,
}

impl TextStyle {
    pub const fn new(size: f64, align: TextAlign, color: Rgba) -> Self {
        Self {
            size,
            bold: false,
            align,
            color,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// 2D drawing primitives the engines render with. Angles are radians,
/// clockwise from the positive x axis in canvas coordinates (y down).
pub trait Surface {
    fn clear(&mut self, color: Rgba);
    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba);
    fn stroke_arc(
        &mut self,
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
        width: f64,
        color: Rgba,
    );
    fn line(&mut self, from: Point, to: Point, width: f64, color: Rgba);
    fn text(&mut self, at: Point, text: &str, style: TextStyle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    Circle {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    Arc {
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
        width: f64,
        color: Rgba,
    },
    Line {
        from: Point,
        to: Point,
        width: f64,
        color: Rgba,
    },
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

/// Records draw calls for later replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn reset(&mut self) {
        self.commands.clear();
    }

    pub fn background(&self) -> Option<Rgba> {
        self.commands.iter().rev().find_map(|c| match c {
            DrawCommand::Clear(color) => Some(*color),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = (Point, f64, Rgba)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Circle {
                center,
                radius,
                color,
            } => Some((*center, *radius, *color)),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, color: Rgba) {
        // a clear wipes whatever the frame drew before it
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn stroke_arc(
        &mut self,
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
        width: f64,
        color: Rgba,
    ) {
        self.commands.push(DrawCommand::Arc {
            center,
            radius,
            start,
            sweep,
            width,
            color,
        });
    }

    fn line(&mut self, from: Point, to: Point, width: f64, color: Rgba) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn text(&mut self, at: Point, text: &str, style: TextStyle) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            style,
        });
    }
}

/// Discards everything. For ticking an engine nobody is looking at.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn clear(&mut self, _color: Rgba) {}
    fn fill_circle(&mut self, _center: Point, _radius: f64, _color: Rgba) {}
    fn stroke_arc(&mut self, _: Point, _: f64, _: f64, _: f64, _: f64, _: Rgba) {}
    fn line(&mut self, _from: Point, _to: Point, _width: f64, _color: Rgba) {}
    fn text(&mut self, _at: Point, _text: &str, _style: TextStyle) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crosshair {
    pub color: Rgba,
    /// Arm length in pixels.
    pub size: f64,
}

impl Default for Crosshair {
    fn default() -> Self {
        Self {
            color: palette::WHITE,
            size: 10.0,
        }
    }
}

pub const CROSSHAIR_WIDTH: f64 = 2.0;

/// Four arms of length `size` reaching out from a gap around `at`.
pub fn draw_crosshair(surface: &mut dyn Surface, at: Point, size: f64, color: Rgba) {
    let gap = (size * 0.3).max(2.0);
    let reach = gap + size;
    let arms = [
        (Point::new(at.x - gap, at.y), Point::new(at.x - reach, at.y)),
        (Point::new(at.x + gap, at.y), Point::new(at.x + reach, at.y)),
        (Point::new(at.x, at.y - gap), Point::new(at.x, at.y - reach)),
        (Point::new(at.x, at.y + gap), Point::new(at.x, at.y + reach)),
    ];
    for (from, to) in arms {
        surface.line(from, to, CROSSHAIR_WIDTH, color);
    }
}

/// Outer disc plus a darker core at 30% radius.
pub fn draw_target(surface: &mut dyn Surface, target: &Target, outer: Rgba, core: Rgba) {
    surface.fill_circle(target.position, target.radius, outer);
    surface.fill_circle(target.position, target.radius * 0.3, core);
}

/// Countdown ring for expiring targets; `ratio` is the share of life left.
pub fn draw_timer_ring(surface: &mut dyn Surface, target: &Target, ratio: f64, color: Rgba) {
    let ratio = ratio.clamp(0.0, 1.0);
    if ratio <= 0.0 {
        return;
    }
    surface.stroke_arc(
        target.position,
        target.radius + 3.0,
        -PI / 2.0,
        2.0 * PI * ratio,
        2.0,
        color,
    );
}

/// Score line on the left, whole seconds left in the middle, accuracy right.
pub fn draw_hud(
    surface: &mut dyn Surface,
    canvas: CanvasSize,
    score_line: &str,
    remaining_secs: f64,
    accuracy: f64,
) {
    let style = TextStyle::new(24.0, TextAlign::Left, palette::WHITE).bold();
    surface.text(Point::new(20.0, 40.0), score_line, style);
    surface.text(
        Point::new(canvas.width / 2.0, 40.0),
        &format!("{}s", remaining_secs.max(0.0).ceil() as u64),
        TextStyle {
            align: TextAlign::Center,
            ..style
        },
    );
    surface.text(
        Point::new(canvas.width - 20.0, 40.0),
        &format!("{accuracy:.1}%"),
        TextStyle {
            align: TextAlign::Right,
            ..style
        },
    );
}

pub fn draw_hint(surface: &mut dyn Surface, canvas: CanvasSize, text: &str) {
    surface.text(
        Point::new(canvas.width / 2.0, canvas.height - 30.0),
        text,
        TextStyle::new(16.0, TextAlign::Center, palette::HINT),
    );
}
