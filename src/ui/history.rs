use aimforge::engine::TrainingResult;
use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::App;

/// "3 minutes ago" style age of a run.
pub fn humanize_age(timestamp: DateTime<Local>, now: DateTime<Local>) -> String {
    let age = (now - timestamp).to_std().unwrap_or_default();
    if age.as_secs() < 5 {
        return "just now".to_string();
    }
    HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past)
}

fn accuracy_color(accuracy: f64) -> Color {
    if accuracy >= 80.0 {
        Color::Green
    } else if accuracy >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn reaction_color(ms: f64) -> Color {
    if ms <= 0.0 {
        Color::Gray
    } else if ms < 300.0 {
        Color::Green
    } else if ms < 450.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Pure presenter for a single history row
pub fn present_row(run: &TrainingResult, now: DateTime<Local>) -> Row<'static> {
    let reaction = if run.avg_reaction_ms > 0.0 {
        format!("{:.0} ms", run.avg_reaction_ms)
    } else {
        "-".to_string()
    };

    Row::new(vec![
        Cell::from(run.mode.title()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(run.score.to_string()),
        Cell::from(format!("{:.1}%", run.accuracy))
            .style(Style::default().fg(accuracy_color(run.accuracy))),
        Cell::from(reaction).style(Style::default().fg(reaction_color(run.avg_reaction_ms))),
        Cell::from(format!("{}/{}", run.hits, run.total_targets)),
        Cell::from(humanize_age(run.timestamp, now)),
    ])
}

pub fn render_history(app: &App, f: &mut Frame) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let now = Local::now();
    let rows: Vec<Row> = app
        .recent
        .iter()
        .skip(app.history_offset)
        .map(|run| present_row(run, now))
        .collect();

    let header = Row::new(vec!["Mode", "Score", "Accuracy", "Reaction", "Hits", "When"])
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" History ({} runs) ", app.recent.len())),
    );
    f.render_widget(table, chunks[0]);

    let summary = match &app.overall {
        Some(total) => format!(
            "{} runs   avg acc {:.1}%   avg reaction {:.0} ms   total score {}",
            total.sessions, total.avg_accuracy, total.avg_reaction_ms, total.total_score
        ),
        None => "no runs recorded yet".to_string(),
    };
    f.render_widget(
        Paragraph::new(summary)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        chunks[1],
    );

    f.render_widget(
        Paragraph::new("(↑/↓) scroll / (b)ack / (q)uit")
            .style(Style::default().add_modifier(Modifier::ITALIC)),
        chunks[2],
    );
}
