//! Replays an engine [`DisplayList`] onto a ratatui braille canvas.

use aimforge::engine::render::{palette, DrawCommand, Rgba, TextAlign};
use aimforge::engine::DisplayList;
use aimforge::target::{CanvasSize, Point};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine, Points},
        Widget,
    },
};
use unicode_width::UnicodeWidthStr;

pub fn to_color(color: Rgba, background: Rgba) -> Color {
    let c = color.over(background);
    Color::Rgb(c.r, c.g, c.b)
}

/// Canvas pixels per braille dot for a given drawing area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotPitch {
    pub x: f64,
    pub y: f64,
}

impl DotPitch {
    pub fn new(size: CanvasSize, area: Rect) -> Self {
        Self {
            x: size.width / (area.width.max(1) as f64 * 2.0),
            y: size.height / (area.height.max(1) as f64 * 4.0),
        }
    }
}

/// Sample points covering a filled disc.
pub fn disc_points(center: Point, radius: f64, pitch: DotPitch) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    if radius <= 0.0 {
        return points;
    }
    let mut y = -radius;
    while y <= radius {
        let half = (radius * radius - y * y).max(0.0).sqrt();
        let mut x = -half;
        while x <= half {
            points.push((center.x + x, center.y + y));
            x += pitch.x;
        }
        y += pitch.y;
    }
    points.push((center.x, center.y));
    points
}

/// Sample points along a stroked arc. Angles in radians, clockwise, y down.
pub fn arc_points(
    center: Point,
    radius: f64,
    start: f64,
    sweep: f64,
    width: f64,
    pitch: DotPitch,
) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    if radius <= 0.0 || sweep == 0.0 {
        return points;
    }
    let step = pitch.x.min(pitch.y).max(0.5);
    let inner = (radius - width / 2.0).max(0.0);
    let outer = radius + width / 2.0;
    let mut r = inner;
    while r <= outer {
        let steps = ((sweep.abs() * r.max(1.0)) / step).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let a = start + sweep * i as f64 / steps as f64;
            points.push((center.x + r * a.cos(), center.y + r * a.sin()));
        }
        r += step;
    }
    points
}

/// Engine frame as a ratatui widget. Canvas y grows downwards, ratatui's
/// grows upwards, so every y is flipped on the way through.
pub struct FrameCanvas<'a> {
    pub list: &'a DisplayList,
    pub size: CanvasSize,
}

impl<'a> FrameCanvas<'a> {
    pub fn new(list: &'a DisplayList, size: CanvasSize) -> Self {
        Self { list, size }
    }

    fn paint(&self, ctx: &mut Context, pitch: DotPitch, px_per_col: f64) {
        let background = self.list.background().unwrap_or(palette::BACKGROUND);
        let h = self.size.height;
        let flip = |pts: Vec<(f64, f64)>| pts.into_iter().map(|(x, y)| (x, h - y)).collect::<Vec<_>>();

        for command in self.list.commands() {
            match command {
                DrawCommand::Clear(_) => {}
                DrawCommand::Circle {
                    center,
                    radius,
                    color,
                } => {
                    let coords = flip(disc_points(*center, *radius, pitch));
                    ctx.draw(&Points {
                        coords: &coords,
                        color: to_color(*color, background),
                    });
                }
                DrawCommand::Arc {
                    center,
                    radius,
                    start,
                    sweep,
                    width,
                    color,
                } => {
                    let coords = flip(arc_points(*center, *radius, *start, *sweep, *width, pitch));
                    ctx.draw(&Points {
                        coords: &coords,
                        color: to_color(*color, background),
                    });
                }
                DrawCommand::Line {
                    from, to, color, ..
                } => {
                    ctx.draw(&CanvasLine {
                        x1: from.x,
                        y1: h - from.y,
                        x2: to.x,
                        y2: h - to.y,
                        color: to_color(*color, background),
                    });
                }
                DrawCommand::Text { at, text, style } => {
                    let width_px = text.width() as f64 * px_per_col;
                    let x = match style.align {
                        TextAlign::Left => at.x,
                        TextAlign::Center => at.x - width_px / 2.0,
                        TextAlign::Right => at.x - width_px,
                    };
                    let mut text_style = Style::default().fg(to_color(style.color, background));
                    if style.bold {
                        text_style = text_style.add_modifier(Modifier::BOLD);
                    }
                    ctx.print(
                        x.max(0.0),
                        h - at.y,
                        Span::styled(text.clone(), text_style),
                    );
                }
            }
        }
    }
}

impl Widget for FrameCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let background = self.list.background().unwrap_or(palette::BACKGROUND);
        let pitch = DotPitch::new(self.size, area);
        let px_per_col = self.size.width / area.width.max(1) as f64;
        Canvas::default()
            .marker(Marker::Braille)
            .background_color(to_color(background, background))
            .x_bounds([0.0, self.size.width])
            .y_bounds([0.0, self.size.height])
            .paint(|ctx| self.paint(ctx, pitch, px_per_col))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimforge::engine::render::{Surface, TextStyle};

    #[test]
    fn test_to_color_blends_alpha() {
        let half_white = palette::WHITE.with_alpha(0.5);
        assert_eq!(
            to_color(half_white, Rgba::rgb(0, 0, 0)),
            Color::Rgb(128, 128, 128)
        );
        assert_eq!(
            to_color(palette::TARGET, palette::BACKGROUND),
            Color::Rgb(0xef, 0x44, 0x44)
        );
    }

    #[test]
    fn test_disc_points_stay_inside_radius() {
        let pitch = DotPitch { x: 2.0, y: 2.0 };
        let center = Point::new(100.0, 100.0);
        let points = disc_points(center, 10.0, pitch);
        assert!(points.len() > 50);
        assert!(points
            .iter()
            .all(|&(x, y)| Point::new(x, y).distance_to(center) <= 10.0 + 1e-9));
        assert!(disc_points(center, 0.0, pitch).is_empty());
    }

    #[test]
    fn test_arc_points_follow_radius() {
        let pitch = DotPitch { x: 1.0, y: 1.0 };
        let center = Point::new(0.0, 0.0);
        let points = arc_points(center, 20.0, 0.0, std::f64::consts::PI, 0.0, pitch);
        assert!(!points.is_empty());
        for &(x, y) in &points {
            assert!((Point::new(x, y).distance_to(center) - 20.0).abs() < 1e-9);
            // clockwise from +x with y down covers the lower half
            assert!(y >= -1e-9);
        }
    }

    #[test]
    fn test_frame_canvas_renders_text() {
        let mut list = DisplayList::new();
        list.clear(palette::BACKGROUND);
        list.fill_circle(Point::new(400.0, 300.0), 40.0, palette::TARGET);
        list.text(
            Point::new(20.0, 40.0),
            "Score: 7",
            TextStyle::new(24.0, TextAlign::Left, palette::WHITE),
        );
        let area = Rect::new(0, 0, 80, 30);
        let mut buf = Buffer::empty(area);
        FrameCanvas::new(&list, CanvasSize::new(800.0, 600.0)).render(area, &mut buf);

        let rendered: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Score: 7"));
        // the target shows up as braille dots
        assert!(rendered.chars().any(|c| ('\u{2801}'..='\u{28ff}').contains(&c)));
    }
}
