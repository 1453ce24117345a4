pub mod canvas;
pub mod charting;
pub mod history;
pub mod screen;

use aimforge::engine::{ModeMetrics, TrainingResult};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Clear, Dataset, GraphType, Paragraph, Widget, Wrap},
};

use crate::{ui::canvas::FrameCanvas, App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// A band of `height` rows across the vertical middle of `area`.
fn middle_band(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        x: area.x,
        y: area.y + (area.height - height) / 2,
        width: area.width,
        height,
    }
}

fn render_overlay(lines: Vec<Line<'static>>, area: Rect, buf: &mut Buffer) {
    let band = middle_band(area, lines.len() as u16);
    Clear.render(band, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(band, buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let canvas = self.engine.core().canvas();
        match self.state {
            AppState::Idle => {
                FrameCanvas::new(&self.frame, canvas).render(area, buf);
                render_overlay(
                    vec![
                        Line::from(Span::styled(self.settings.mode.title(), bold_style)),
                        Line::from(Span::styled(
                            "waiting for the mouse, move it over this window",
                            italic_style,
                        )),
                    ],
                    area,
                    buf,
                );
            }
            AppState::Countdown => {
                FrameCanvas::new(&self.frame, canvas).render(area, buf);
                render_overlay(
                    vec![
                        Line::from(Span::styled(self.settings.mode.title(), bold_style)),
                        Line::from(Span::styled(
                            self.countdown_secs().to_string(),
                            bold_style.fg(Color::Yellow),
                        )),
                        Line::from(Span::styled(
                            format!("sensitivity: {}", self.settings.sensitivity),
                            dim_style,
                        )),
                    ],
                    area,
                    buf,
                );
            }
            AppState::Playing => {
                FrameCanvas::new(&self.frame, canvas).render(area, buf);
            }
            AppState::Paused => {
                FrameCanvas::new(&self.frame, canvas).render(area, buf);
                render_overlay(
                    vec![
                        Line::from(Span::styled(
                            "PAUSED",
                            bold_style.fg(Color::Yellow),
                        )),
                        Line::from(Span::styled(
                            "(space) resume / (q) end run / (esc)ape",
                            italic_style,
                        )),
                    ],
                    area,
                    buf,
                );
            }
            AppState::Results | AppState::History => {
                if let Some(result) = &self.last_result {
                    render_results(self, result, area, buf);
                }
            }
        }
    }
}

fn render_results(app: &App, result: &TrainingResult, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // counts
            Constraint::Length(1), // mode summary
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    if result.reaction_times_ms.is_empty() {
        let body = match &result.metrics {
            ModeMetrics::Tracking {
                tracking_ms,
                total_active_ms,
            } => format!(
                "on target {:.1}s of {:.1}s",
                tracking_ms / 1000.0,
                total_active_ms / 1000.0
            ),
            _ => "no hits this run".to_string(),
        };
        Paragraph::new(Span::styled(body, bold_style.fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(middle_band(chunks[0], 1), buf);
    } else {
        let series = charting::reaction_series(&result.reaction_times_ms);
        let (hits, slowest) = charting::compute_chart_params(&series);
        let datasets = vec![Dataset::default()
            .marker(ratatui::symbols::Marker::Braille)
            .style(magenta_style)
            .graph_type(GraphType::Line)
            .data(&series)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("hit")
                    .bounds([1.0, hits])
                    .labels(vec![
                        Span::styled("1", bold_style),
                        Span::styled(charting::format_label(hits), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("ms")
                    .bounds([0.0, slowest])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(charting::format_label(slowest), bold_style),
                    ]),
            )
            .render(chunks[0], buf);
    }

    Paragraph::new(Span::styled(
        format!(
            "{}   {} pts   {:.1}% acc   {:.0} ms avg   {:.0} ms best   {:.2} sd",
            result.mode.title(),
            result.score,
            result.accuracy,
            result.avg_reaction_ms,
            result.best_reaction_ms,
            result.reaction_std_dev_ms
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let mut counts = format!(
        "{} hits / {} misses / {} targets",
        result.hits, result.misses, result.total_targets
    );
    if let ModeMetrics::Flicking { avg_flick_distance } = result.metrics {
        counts.push_str(&format!(" / {avg_flick_distance:.0}px avg flick"));
    }
    Paragraph::new(counts)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    if let Some(summary) = &app.mode_summary {
        Paragraph::new(Span::styled(
            format!(
                "{}: best {}   avg acc {:.1}%   avg reaction {:.0} ms   over {} runs",
                summary.mode.title(),
                summary.best_score,
                summary.avg_accuracy,
                summary.avg_reaction_ms,
                summary.sessions
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (n)ext mode / (h)istory / (esc)ape",
        italic_style,
    ))
    .render(chunks[5], buf);
}
