use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::App;
use monkeymath::store::StoredSession;

/// "5 minutes ago" style label
pub fn relative_time(then: DateTime<Local>, now: DateTime<Local>) -> String {
    match (now - then).to_std() {
        Ok(elapsed) => HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past),
        // clock skew, stored in the future
        Err(_) => "just now".to_string(),
    }
}

fn accuracy_color(accuracy: f64) -> Color {
    if accuracy >= 90.0 {
        Color::Green
    } else if accuracy >= 70.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Pure presenter for a single history row
pub fn present_row(session: &StoredSession, now: DateTime<Local>) -> Row<'static> {
    let result = &session.result;
    let difficulty = result
        .config_snapshot
        .difficulty
        .map_or_else(|| "custom".to_string(), |d| d.to_string());

    Row::new(vec![
        Cell::from(relative_time(result.completed_at, now)),
        Cell::from(format!("{}s", result.duration_seconds)),
        Cell::from(difficulty),
        Cell::from(result.total_problems.to_string()),
        Cell::from(format!("{}%", result.accuracy_label()))
            .style(Style::default().fg(accuracy_color(result.accuracy_percent))),
        Cell::from(format!("{:.1}", result.problems_per_minute())),
    ])
}

pub fn render_dashboard(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // totals
            Constraint::Min(5),    // recent sessions
            Constraint::Length(3), // legend
        ])
        .split(f.area());

    let overall = &app.overall;
    let totals = Paragraph::new(format!(
        "{} sessions   {} problems   {}% first try   best {}%   {:.1} per minute",
        overall.total_sessions,
        overall.total_problems,
        format_one(overall.average_accuracy_percent),
        format_one(overall.best_accuracy_percent),
        overall.average_problems_per_minute,
    ))
    .block(Block::default().borders(Borders::ALL).title("All time"))
    .style(Style::default().add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center);
    f.render_widget(totals, chunks[0]);

    if app.recent.is_empty() {
        let empty = Paragraph::new("No stored sessions yet")
            .block(Block::default().borders(Borders::ALL).title("Recent"))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
    } else {
        let now = Local::now();
        let header = Row::new(vec!["When", "Length", "Level", "Problems", "Accuracy", "Per min"])
            .style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .bottom_margin(1);

        let rows: Vec<Row> = app.recent.iter().map(|s| present_row(s, now)).collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(18),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(8),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Recent"))
        .column_spacing(1);
        f.render_widget(table, chunks[1]);
    }

    let legend = Paragraph::new("(n)ew session / (b)ack / (esc)ape")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(legend, chunks[2]);
}

fn format_one(value: f64) -> String {
    format!("{value:.1}")
}
