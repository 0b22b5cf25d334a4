use monkeymath::session::ProblemResult;

/// One point per solved problem: (problem number, seconds taken)
pub fn solve_time_points(history: &[ProblemResult]) -> Vec<(f64, f64)> {
    history
        .iter()
        .enumerate()
        .map(|(idx, p)| ((idx + 1) as f64, p.time_taken_ms as f64 / 1000.0))
        .collect()
}

/// Compute X (problem number) and Y (seconds) bounds for the results chart
pub fn compute_chart_params(points: &[(f64, f64)]) -> (f64, f64) {
    let slowest = points.iter().map(|&(_, secs)| secs).fold(0.0, f64::max);

    let last = points.last().map_or(1.0, |p| p.0).max(1.0);

    (last, slowest.ceil().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// `m:ss` countdown label
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
