use crate::config::{Category, RangeSpec, TestConfiguration};
use crate::error::ConfigError;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperatorKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 4] = [
        OperatorKind::Addition,
        OperatorKind::Subtraction,
        OperatorKind::Multiplication,
        OperatorKind::Division,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::Addition => "+",
            OperatorKind::Subtraction => "-",
            OperatorKind::Multiplication => "×",
            OperatorKind::Division => "÷",
        }
    }

    /// Which configured range the operands are drawn from
    pub fn category(&self) -> Category {
        match self {
            OperatorKind::Addition | OperatorKind::Subtraction => Category::AdditionSubtraction,
            OperatorKind::Multiplication | OperatorKind::Division => {
                Category::MultiplicationDivision
            }
        }
    }
}

/// A generated problem. Never mutated after generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub kind: OperatorKind,
    pub operand_display: String,
    pub correct_answer: i64,
    pub created_at: Instant,
}

impl Problem {
    /// Number of characters a full-length answer occupies
    pub fn answer_len(&self) -> usize {
        self.correct_answer.to_string().len()
    }
}

/// Generate one problem using the thread-local RNG
pub fn generate(config: &TestConfiguration, now: Instant) -> Result<Problem, ConfigError> {
    generate_with(config, &mut rand::thread_rng(), now)
}

/// Generate one problem from an explicit random source
///
/// Subtraction and division are derived from an addition or multiplication
/// pair so the answer is always a non-negative integer: `c - a = b` and
/// `c ÷ a = b` where `c = a + b` or `c = a × b`. The range of the chosen
/// operator's category is checked first, so an inverted or oversized range is
/// an error rather than a panic.
pub fn generate_with<R: Rng>(
    config: &TestConfiguration,
    rng: &mut R,
    now: Instant,
) -> Result<Problem, ConfigError> {
    let kind = config
        .enabled_operators
        .iter()
        .copied()
        .choose(rng)
        .ok_or(ConfigError::NoOperators)?;

    let range = config.ranges.for_category(kind.category());
    range.validate(kind.category())?;

    let (operand_display, correct_answer) = match kind {
        OperatorKind::Addition => {
            let (a, b) = sample_pair(range, rng);
            (format!("{a} + {b}"), a + b)
        }
        OperatorKind::Subtraction => {
            let (a, b) = sample_pair(range, rng);
            (format!("{} - {a}", a + b), b)
        }
        OperatorKind::Multiplication => {
            let (a, b) = sample_pair(range, rng);
            (format!("{a} × {b}"), a * b)
        }
        OperatorKind::Division => {
            // a is the divisor and must not be zero
            let a = rng.gen_range(range.min_a.max(1)..=range.max_a.max(1)) as i64;
            let b = rng.gen_range(range.min_b..=range.max_b) as i64;
            (format!("{} ÷ {a}", a * b), b)
        }
    };

    Ok(Problem {
        kind,
        operand_display,
        correct_answer,
        created_at: now,
    })
}

fn sample_pair<R: Rng>(range: &RangeSpec, rng: &mut R) -> (i64, i64) {
    let a = rng.gen_range(range.min_a..=range.max_a) as i64;
    let b = rng.gen_range(range.min_b..=range.max_b) as i64;
    (a, b)
}

/// Split a displayed `x op y` back into its operands
pub fn parse_operands(display: &str) -> Option<(i64, &str, i64)> {
    let mut parts = display.split_whitespace();
    let left = parts.next()?.parse().ok()?;
    let op = parts.next()?;
    let right = parts.next()?.parse().ok()?;
    match parts.next() {
        Some(_) => None,
        None => Some((left, op, right)),
    }
}
