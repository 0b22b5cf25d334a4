use crate::problem::OperatorKind;
use crate::session::SessionResult;
use crate::util::{mean, percent, round_tenth};
use itertools::Itertools;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Totals over every stored session. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub total_sessions: u32,
    pub total_problems: u32,
    pub total_correct: u32,
    pub average_accuracy_percent: f64,
    pub best_accuracy_percent: f64,
    pub average_problems_per_minute: f64,
}

/// Aggregate finished sessions
///
/// Average accuracy is pooled over all problems, so a long session weighs
/// more than a short one. Best accuracy and problems per minute are taken
/// per session.
pub fn aggregate<I>(sessions: I) -> AggregateStatistics
where
    I: IntoIterator,
    I::Item: Borrow<SessionResult>,
{
    let mut stats = AggregateStatistics::default();
    let mut rates = Vec::new();

    for session in sessions {
        let session = session.borrow();
        stats.total_sessions += 1;
        stats.total_problems += session.total_problems;
        stats.total_correct += session.first_try_correct_count;
        stats.best_accuracy_percent = stats.best_accuracy_percent.max(session.accuracy_percent);
        rates.push(rate_per_minute(session));
    }

    if stats.total_sessions == 0 {
        return stats;
    }

    stats.average_accuracy_percent =
        round_tenth(percent(stats.total_correct, stats.total_problems));
    stats.average_problems_per_minute = round_tenth(mean(&rates).unwrap_or(0.0));
    stats
}

fn rate_per_minute(session: &SessionResult) -> f64 {
    if session.duration_seconds == 0 {
        0.0
    } else {
        session.total_problems as f64 / session.duration_seconds as f64 * 60.0
    }
}

/// Per-operator breakdown of one or more sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperatorBreakdown {
    pub problems: u32,
    pub first_try_correct: u32,
    pub average_time_ms: f64,
    pub average_attempts: f64,
}

pub fn breakdown_by_operator<'a, I>(sessions: I) -> BTreeMap<OperatorKind, OperatorBreakdown>
where
    I: IntoIterator<Item = &'a SessionResult>,
{
    sessions
        .into_iter()
        .flat_map(|s| s.problem_history.iter())
        .into_group_map_by(|p| p.kind)
        .into_iter()
        .map(|(kind, problems)| {
            let times: Vec<f64> = problems.iter().map(|p| p.time_taken_ms as f64).collect();
            let attempts: Vec<f64> = problems.iter().map(|p| p.attempts as f64).collect();
            let first_try = problems.iter().filter(|p| p.first_try_correct).count() as u32;
            (
                kind,
                OperatorBreakdown {
                    problems: problems.len() as u32,
                    first_try_correct: first_try,
                    average_time_ms: mean(&times).unwrap_or(0.0).round(),
                    average_attempts: round_tenth(mean(&attempts).unwrap_or(0.0)),
                },
            )
        })
        .collect()
}
