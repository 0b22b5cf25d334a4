use std::time::{Duration, Instant};

/// Minimum pause before a repeated full-length entry counts as a new attempt
pub const DEFAULT_RETYPE_THRESHOLD: Duration = Duration::from_millis(500);

/// One accepted change of the answer field
#[derive(Debug, Clone, PartialEq)]
pub struct InputEntry {
    pub value: String,
    pub at: Instant,
    pub was_backspace: bool,
}

/// Per-problem edit tracking, replaced wholesale for every new problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptState {
    pub keystroke_count: u32,
    pub backspace_count: u32,
    pub attempt_count: u32,
    pub has_reached_full_length: bool,
    pub last_input_at: Option<Instant>,
    pub input_log: Vec<InputEntry>,
}

/// What happened to a single input-change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Not an integer in progress; nothing was recorded
    Rejected,
    /// Recorded, but the value is not the answer
    Accepted(String),
    /// The value equals the answer
    Solved { first_try: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptSummary {
    pub attempts: u32,
    pub keystrokes: u32,
    pub backspaces: u32,
}

/// Turns the raw stream of answer-field values for one problem into attempt metrics
///
/// An attempt is a full-length entry: the value has as many characters as the
/// expected answer. Reaching full length again only counts as a fresh attempt
/// when the user paused for at least the retype threshold, started over from an
/// empty field, or cleared the field since the last full-length entry. Quick
/// corrections of a single digit therefore stay within the same attempt.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    correct_answer: i64,
    answer_len: usize,
    retype_threshold: Duration,
    current: String,
    state: AttemptState,
}

impl AttemptTracker {
    pub fn new(correct_answer: i64) -> Self {
        Self::with_threshold(correct_answer, DEFAULT_RETYPE_THRESHOLD)
    }

    pub fn with_threshold(correct_answer: i64, retype_threshold: Duration) -> Self {
        Self {
            correct_answer,
            answer_len: correct_answer.to_string().len(),
            retype_threshold,
            current: String::new(),
            state: AttemptState::default(),
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Last accepted value of the answer field
    pub fn value(&self) -> &str {
        &self.current
    }

    pub fn record_input(&mut self, value: &str, at: Instant) -> InputOutcome {
        if !is_partial_integer(value) {
            return InputOutcome::Rejected;
        }

        let previous_len = self.current.len();
        let was_backspace = value.len() < previous_len;
        if value.len() > previous_len {
            self.state.keystroke_count += 1;
        } else if was_backspace {
            self.state.backspace_count += 1;
        }

        if value.len() == self.answer_len {
            self.register_full_length(at);
        } else if value.is_empty() {
            self.state.has_reached_full_length = false;
        }

        self.state.last_input_at = Some(at);
        self.state.input_log.push(InputEntry {
            value: value.to_string(),
            at,
            was_backspace,
        });
        self.current = value.to_string();

        match value.parse::<i64>() {
            Ok(parsed) if parsed == self.correct_answer => InputOutcome::Solved {
                first_try: self.attempts() == 1,
            },
            _ => InputOutcome::Accepted(self.current.clone()),
        }
    }

    fn register_full_length(&mut self, at: Instant) {
        let state = &mut self.state;

        if state.attempt_count == 0 {
            state.attempt_count = 1;
        } else {
            let paused = state
                .last_input_at
                .map_or(true, |last| at.saturating_duration_since(last) >= self.retype_threshold);
            let from_empty = self.current.is_empty();

            if !state.has_reached_full_length || paused || from_empty {
                state.attempt_count += 1;
            }
        }

        state.has_reached_full_length = true;
    }

    /// Attempts so far, never less than one
    pub fn attempts(&self) -> u32 {
        self.state.attempt_count.max(1)
    }

    pub fn finalize(&self) -> AttemptSummary {
        AttemptSummary {
            attempts: self.attempts(),
            keystrokes: self.state.keystroke_count,
            backspaces: self.state.backspace_count,
        }
    }
}

/// Empty, or an optional leading minus followed by digits
pub fn is_partial_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.chars().all(|c| c.is_ascii_digit())
}
