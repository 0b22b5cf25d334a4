pub mod charting;
pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{
    ui::charting::{compute_chart_params, format_clock, format_label, solve_time_points},
    App, AppState,
};
use monkeymath::{session::SessionResult, stats::breakdown_by_operator};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Seconds left at which the countdown turns red
const LOW_TIME_SECS: u32 = 10;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.state).render(app, f);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Running => render_running(self, area, buf),
            AppState::Results | AppState::Dashboard => render_results(self, area, buf),
        }
    }
}

fn render_running(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let controller = &app.controller;
    let half = area.height.saturating_sub(3) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(half.saturating_sub(1)),
            Constraint::Length(2), // timer and tally
            Constraint::Length(1), // problem
            Constraint::Length(half),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let time_left = controller.time_left();
    let timer_style = if time_left <= LOW_TIME_SECS {
        Style::default().patch(bold_style).fg(Color::Red)
    } else {
        dim_bold_style
    };
    let tally = controller.tally();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(format_clock(time_left), timer_style),
        Span::styled(
            format!(
                "   {} solved   {}% first try",
                tally.total,
                format_one(tally.accuracy_percent())
            ),
            dim_bold_style,
        ),
    ]))
    .alignment(Alignment::Center);
    header.render(chunks[1], buf);

    if let Some(problem) = controller.current_problem() {
        let line = Line::from(vec![
            Span::styled(format!("{} = ", problem.operand_display), bold_style),
            Span::styled(
                controller.input().to_string(),
                Style::default().patch(bold_style).fg(Color::Cyan),
            ),
            Span::styled(
                "_",
                Style::default()
                    .patch(dim_bold_style)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
        ]);
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
    }

    Paragraph::new(Span::styled("(esc) end session", italic_style))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let Some(result) = app.last_result.as_ref() else {
        Paragraph::new("No result")
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // per operator
            Constraint::Length(1), // all time
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points = solve_time_points(&result.problem_history);
    let (last_problem, slowest) = compute_chart_params(&points);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&points)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("problem")
                .bounds([1.0, last_problem])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(format_label(last_problem), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, slowest])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(format_label(slowest), bold_style),
                ]),
        );
    chart.render(chunks[0], buf);

    Paragraph::new(Span::styled(summary_line(result), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        operator_line(result),
        Style::default().fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let overall = &app.overall;
    if overall.total_sessions > 0 {
        Paragraph::new(Span::styled(
            format!(
                "all time: {} sessions   {}% first try   best {}%",
                overall.total_sessions,
                format_one(overall.average_accuracy_percent),
                format_one(overall.best_accuracy_percent),
            ),
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    let mut legend = String::from("(n)ew / (d)ashboard / (esc)ape");
    if let Some(notice) = &app.notice {
        legend.push_str("   ");
        legend.push_str(notice);
    }
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[5], buf);
}

/// e.g. `24 problems   87.5% first try   24 correct   12.0/min   2.4s avg`
pub fn summary_line(result: &SessionResult) -> String {
    format!(
        "{} problems   {}% first try   {} correct   {:.1}/min   {:.1}s avg",
        result.total_problems,
        result.accuracy_label(),
        result.eventually_correct_count,
        result.problems_per_minute(),
        result.average_time_ms() / 1000.0,
    )
}

/// e.g. `+ 10 (90.0%)   × 6 (66.7%)`
pub fn operator_line(result: &SessionResult) -> String {
    breakdown_by_operator([result])
        .iter()
        .map(|(kind, b)| {
            let accuracy = monkeymath::util::percent(b.first_try_correct, b.problems);
            format!(
                "{} {} ({}%)",
                kind.symbol(),
                b.problems,
                format_one(monkeymath::util::round_tenth(accuracy))
            )
        })
        .collect::<Vec<_>>()
        .join("   ")
}

fn format_one(value: f64) -> String {
    format!("{value:.1}")
}
