use crate::attempt::{AttemptTracker, InputOutcome, DEFAULT_RETYPE_THRESHOLD};
use crate::clock::{Clock, SystemClock};
use crate::config::TestConfiguration;
use crate::error::SessionError;
use crate::problem::{self, OperatorKind, Problem};
use crate::store::ResultStore;
use crate::util::{mean, percent, round_tenth, std_dev};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Finished,
}

/// A problem the user resolved, with how they got there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemResult {
    pub kind: OperatorKind,
    pub operand_display: String,
    pub correct_answer: i64,
    pub user_answer: i64,
    pub correct: bool,
    pub first_try_correct: bool,
    pub time_taken_ms: u64,
    pub attempts: u32,
    pub keystrokes: u32,
    pub backspaces: u32,
}

/// Outcome of one timed run. Built once when the session finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub total_problems: u32,
    pub first_try_correct_count: u32,
    pub eventually_correct_count: u32,
    pub accuracy_percent: f64,
    pub duration_seconds: u32,
    pub problem_history: Vec<ProblemResult>,
    pub config_snapshot: TestConfiguration,
    pub completed_at: DateTime<Local>,
}

impl SessionResult {
    pub fn from_history(
        problem_history: Vec<ProblemResult>,
        config_snapshot: TestConfiguration,
        completed_at: DateTime<Local>,
    ) -> Self {
        let total_problems = problem_history.len() as u32;
        let first_try_correct_count =
            problem_history.iter().filter(|p| p.first_try_correct).count() as u32;
        let eventually_correct_count = problem_history.iter().filter(|p| p.correct).count() as u32;

        Self {
            total_problems,
            first_try_correct_count,
            eventually_correct_count,
            accuracy_percent: round_tenth(percent(first_try_correct_count, total_problems)),
            duration_seconds: config_snapshot.duration_seconds,
            problem_history,
            config_snapshot,
            completed_at,
        }
    }

    /// Accuracy as shown to the user, e.g. `"87.5"`
    pub fn accuracy_label(&self) -> String {
        format!("{:.1}", self.accuracy_percent)
    }

    fn times_ms(&self) -> Vec<f64> {
        self.problem_history
            .iter()
            .map(|p| p.time_taken_ms as f64)
            .collect()
    }

    pub fn average_time_ms(&self) -> f64 {
        mean(&self.times_ms()).unwrap_or(0.0)
    }

    pub fn time_std_dev_ms(&self) -> f64 {
        std_dev(&self.times_ms()).unwrap_or(0.0)
    }

    /// Throughput normalised to a 60 second rate, one decimal
    pub fn problems_per_minute(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        round_tenth(self.total_problems as f64 / self.duration_seconds as f64 * 60.0)
    }
}

/// Running totals shown while a session is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub total: u32,
    pub first_try_correct: u32,
    pub eventually_correct: u32,
}

impl SessionTally {
    pub fn accuracy_percent(&self) -> f64 {
        round_tenth(percent(self.first_try_correct, self.total))
    }

    fn record(&mut self, result: &ProblemResult) {
        self.total += 1;
        if result.first_try_correct {
            self.first_try_correct += 1;
        }
        if result.correct {
            self.eventually_correct += 1;
        }
    }
}

/// What the controller did with one input-change event
#[derive(Debug, Clone, PartialEq)]
pub enum InputResponse {
    /// No session is running
    Ignored,
    /// Not an integer in progress, the field keeps its previous value
    Rejected,
    /// Recorded, still waiting for the right answer
    Pending,
    /// The problem was resolved and a new one is up
    Solved(ProblemResult),
}

#[derive(Debug)]
struct ActiveProblem {
    problem: Problem,
    tracker: AttemptTracker,
}

/// Drives one timed session: Idle, then Running, then Finished
///
/// Ticks and input events must be fed one at a time from a single thread of
/// control. The session finishes exactly once, whichever of the timer or
/// [`finish`](Self::finish) gets there first.
pub struct SessionController<C: Clock = SystemClock> {
    clock: C,
    rng: StdRng,
    retype_threshold: Duration,
    store: Option<Box<dyn ResultStore>>,
    state: SessionState,
    config: Option<TestConfiguration>,
    time_left: u32,
    active: Option<ActiveProblem>,
    history: Vec<ProblemResult>,
    tally: SessionTally,
    result: Option<SessionResult>,
    stored_id: Option<i64>,
}

impl SessionController<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SessionController<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SessionController<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            rng: StdRng::from_entropy(),
            retype_threshold: DEFAULT_RETYPE_THRESHOLD,
            store: None,
            state: SessionState::Idle,
            config: None,
            time_left: 0,
            active: None,
            history: Vec::new(),
            tally: SessionTally::default(),
            result: None,
            stored_id: None,
        }
    }

    /// Persist finished sessions here
    pub fn with_store(mut self, store: Box<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_retype_threshold(mut self, threshold: Duration) -> Self {
        self.retype_threshold = threshold;
        self
    }

    pub fn start(&mut self, config: TestConfiguration) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        config.validate()?;

        let first = problem::generate_with(&config, &mut self.rng, self.clock.now())?;

        info!(
            duration = config.duration_seconds,
            operators = ?config.enabled_operators,
            difficulty = ?config.difficulty,
            "session started"
        );

        self.time_left = config.duration_seconds;
        self.active = Some(self.activate(first));
        self.config = Some(config);
        self.history.clear();
        self.tally = SessionTally::default();
        self.result = None;
        self.stored_id = None;
        self.state = SessionState::Running;
        Ok(())
    }

    fn activate(&self, problem: Problem) -> ActiveProblem {
        let tracker = AttemptTracker::with_threshold(problem.correct_answer, self.retype_threshold);
        ActiveProblem { problem, tracker }
    }

    /// Advance the countdown by one second
    ///
    /// Returns the session result on the tick that ran the timer out.
    pub fn on_tick(&mut self) -> Option<&SessionResult> {
        if self.state != SessionState::Running {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return self.finish();
        }
        None
    }

    /// Feed the full current value of the answer field
    pub fn on_input(&mut self, value: &str) -> InputResponse {
        if self.state != SessionState::Running {
            return InputResponse::Ignored;
        }
        let Some(active) = self.active.as_mut() else {
            return InputResponse::Ignored;
        };

        let now = self.clock.now();
        match active.tracker.record_input(value, now) {
            InputOutcome::Rejected => InputResponse::Rejected,
            InputOutcome::Accepted(_) => InputResponse::Pending,
            InputOutcome::Solved { first_try } => {
                let summary = active.tracker.finalize();
                let problem = &active.problem;
                let result = ProblemResult {
                    kind: problem.kind,
                    operand_display: problem.operand_display.clone(),
                    correct_answer: problem.correct_answer,
                    user_answer: problem.correct_answer,
                    correct: true,
                    first_try_correct: first_try,
                    time_taken_ms: now.saturating_duration_since(problem.created_at).as_millis()
                        as u64,
                    attempts: summary.attempts,
                    keystrokes: summary.keystrokes,
                    backspaces: summary.backspaces,
                };

                debug!(
                    problem = %result.operand_display,
                    attempts = result.attempts,
                    first_try = result.first_try_correct,
                    time_ms = result.time_taken_ms,
                    "problem resolved"
                );

                self.tally.record(&result);
                self.history.push(result.clone());
                self.next_problem();
                InputResponse::Solved(result)
            }
        }
    }

    fn next_problem(&mut self) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        // the configuration was validated in start(), so generation cannot fail here
        match problem::generate_with(config, &mut self.rng, self.clock.now()) {
            Ok(next) => self.active = Some(self.activate(next)),
            Err(e) => {
                warn!("could not generate next problem: {e}");
                self.active = None;
            }
        }
    }

    /// End the session now. Only the first call produces a result.
    pub fn finish(&mut self) -> Option<&SessionResult> {
        if self.state != SessionState::Running {
            return None;
        }
        self.state = SessionState::Finished;
        // an entry still being typed never becomes a result
        self.active = None;

        let config = self.config.clone().unwrap_or_default();
        let result = SessionResult::from_history(
            std::mem::take(&mut self.history),
            config,
            Local::now(),
        );

        info!(
            total = result.total_problems,
            first_try = result.first_try_correct_count,
            accuracy = %result.accuracy_label(),
            "session finished"
        );

        if let Some(store) = self.store.as_mut() {
            match store.add(&result) {
                Ok(id) => {
                    debug!(id, "session stored");
                    self.stored_id = Some(id);
                }
                Err(e) => warn!("failed to store session result: {e}"),
            }
        }

        self.history = result.problem_history.clone();
        self.result = Some(result);
        self.result.as_ref()
    }

    /// Throw away the session, result included, and go back to Idle
    pub fn abandon(&mut self) {
        if self.state == SessionState::Running {
            info!(time_left = self.time_left, "session abandoned");
        }
        self.state = SessionState::Idle;
        self.config = None;
        self.time_left = 0;
        self.active = None;
        self.history.clear();
        self.tally = SessionTally::default();
        self.result = None;
        self.stored_id = None;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn config(&self) -> Option<&TestConfiguration> {
        self.config.as_ref()
    }

    pub fn current_problem(&self) -> Option<&Problem> {
        self.active.as_ref().map(|a| &a.problem)
    }

    /// Current contents of the answer field
    pub fn input(&self) -> &str {
        self.active.as_ref().map_or("", |a| a.tracker.value())
    }

    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    pub fn history(&self) -> &[ProblemResult] {
        &self.history
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Row id the finished session was stored under, if storing worked
    pub fn stored_id(&self) -> Option<i64> {
        self.stored_id
    }

    pub fn store(&self) -> Option<&dyn ResultStore> {
        self.store.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{Difficulty, RangeSpec, Ranges};
    use crate::error::{ConfigError, StoreError};
    use crate::store::{MemoryStore, StoredSession};
    use assert_matches::assert_matches;
    use std::rc::Rc;

    fn small_addition(duration: u32) -> TestConfiguration {
        TestConfiguration::custom(
            duration,
            [OperatorKind::Addition],
            Ranges {
                addition: RangeSpec::new(2, 5, 2, 5),
                multiplication: RangeSpec::new(2, 12, 2, 12),
            },
        )
    }

    fn controller() -> (Rc<ManualClock>, SessionController<Rc<ManualClock>>) {
        let clock = Rc::new(ManualClock::new());
        let ctl = SessionController::with_clock(clock.clone()).with_seed(42);
        (clock, ctl)
    }

    fn answer(ctl: &SessionController<Rc<ManualClock>>) -> String {
        ctl.current_problem().unwrap().correct_answer.to_string()
    }

    /// Type the answer one character at a time
    fn type_answer(ctl: &mut SessionController<Rc<ManualClock>>, clock: &ManualClock) -> InputResponse {
        let target = answer(ctl);
        let mut response = InputResponse::Pending;
        for end in 1..=target.len() {
            clock.advance_ms(80);
            response = ctl.on_input(&target[..end]);
        }
        response
    }

    #[test]
    fn starts_idle_and_rejects_empty_operators() {
        let (_, mut ctl) = controller();
        assert_eq!(ctl.state(), SessionState::Idle);

        let cfg = TestConfiguration::from_preset(60, Vec::<OperatorKind>::new(), Difficulty::Easy);
        let err = ctl.start(cfg).unwrap_err();
        assert_matches!(err, SessionError::Config(ConfigError::NoOperators));
        assert_eq!(ctl.state(), SessionState::Idle);
        assert!(ctl.current_problem().is_none());
    }

    #[test]
    fn start_generates_first_problem_and_sets_timer() {
        let (_, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        assert_eq!(ctl.state(), SessionState::Running);
        assert_eq!(ctl.time_left(), 60);
        assert!(ctl.current_problem().is_some());
        assert_eq!(ctl.input(), "");
    }

    #[test]
    fn cannot_start_twice() {
        let (_, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        assert_matches!(ctl.start(small_addition(60)), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn solving_rolls_to_a_fresh_problem() {
        let (clock, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        let first_created = ctl.current_problem().unwrap().created_at;

        let response = type_answer(&mut ctl, &clock);
        let result = assert_matches!(response, InputResponse::Solved(r) => r);
        assert!(result.correct);
        assert!(result.first_try_correct);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.time_taken_ms as u128, clock.now().duration_since(first_created).as_millis());

        // new problem, empty field, fresh attempt state
        assert_eq!(ctl.input(), "");
        assert_ne!(ctl.current_problem().unwrap().created_at, first_created);
        assert_eq!(ctl.tally().total, 1);
        assert_eq!(ctl.history().len(), 1);
    }

    #[test]
    fn rejected_input_keeps_field() {
        let (_, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        assert_eq!(ctl.on_input("1"), InputResponse::Pending);
        assert_eq!(ctl.on_input("1x"), InputResponse::Rejected);
        assert_eq!(ctl.input(), "1");
    }

    #[test]
    fn retry_counts_as_eventually_correct_only() {
        let (clock, mut ctl) = controller();
        // every answer is a single digit between 4 and 6
        let cfg = TestConfiguration::custom(
            60,
            [OperatorKind::Addition],
            Ranges {
                addition: RangeSpec::new(2, 3, 2, 3),
                multiplication: RangeSpec::new(2, 12, 2, 12),
            },
        );
        ctl.start(cfg).unwrap();
        let target = answer(&ctl);
        let wrong = if target == "9" { "8" } else { "9" };

        ctl.on_input(wrong);
        clock.advance_ms(100);
        ctl.on_input("");
        clock.advance_ms(600);
        let response = ctl.on_input(&target);
        let result = assert_matches!(response, InputResponse::Solved(r) => r);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.backspaces, 1);
        assert!(result.correct);
        assert!(!result.first_try_correct);

        let tally = ctl.tally();
        assert_eq!(tally.eventually_correct, 1);
        assert_eq!(tally.first_try_correct, 0);
        assert_eq!(tally.accuracy_percent(), 0.0);
    }

    #[test]
    fn timer_expiry_finishes_exactly_once() {
        let (_, mut ctl) = controller();
        ctl.start(small_addition(3)).unwrap();
        assert!(ctl.on_tick().is_none());
        assert!(ctl.on_tick().is_none());
        assert!(ctl.on_tick().is_some());
        assert_eq!(ctl.state(), SessionState::Finished);

        // neither another tick nor a forced finish produces a second result
        assert!(ctl.on_tick().is_none());
        assert!(ctl.finish().is_none());
        assert_eq!(ctl.on_input("4"), InputResponse::Ignored);
    }

    #[test]
    fn empty_session_has_zero_accuracy() {
        let (_, mut ctl) = controller();
        ctl.start(small_addition(1)).unwrap();
        let result = ctl.on_tick().cloned().unwrap();
        assert_eq!(result.total_problems, 0);
        assert_eq!(result.accuracy_percent, 0.0);
        assert_eq!(result.accuracy_label(), "0.0");
        assert_eq!(result.problems_per_minute(), 0.0);
        assert_eq!(result.average_time_ms(), 0.0);
    }

    #[test]
    fn unresolved_entry_is_dropped_at_finish() {
        let (clock, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        type_answer(&mut ctl, &clock);
        ctl.on_input("1");

        let result = ctl.finish().cloned().unwrap();
        assert_eq!(result.total_problems, 1);
        assert!(ctl.current_problem().is_none());
        assert_eq!(ctl.input(), "");
    }

    #[test]
    fn finished_session_is_stored_once() {
        let clock = Rc::new(ManualClock::new());
        let mut ctl = SessionController::with_clock(clock.clone())
            .with_seed(1)
            .with_store(Box::new(MemoryStore::default()));
        ctl.start(small_addition(2)).unwrap();
        type_answer(&mut ctl, &clock);
        ctl.on_tick();
        ctl.on_tick();
        ctl.finish();

        let stored = ctl.store().unwrap().get_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(Some(stored[0].id), ctl.stored_id());
        assert_eq!(&stored[0].result, ctl.result().unwrap());
    }

    struct FailingStore;

    impl ResultStore for FailingStore {
        fn add(&mut self, _result: &SessionResult) -> Result<i64, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        fn get_all(&self) -> Result<Vec<StoredSession>, StoreError> {
            Ok(vec![])
        }
        fn get_recent(&self, _limit: usize) -> Result<Vec<StoredSession>, StoreError> {
            Ok(vec![])
        }
        fn get_by_id(&self, _id: i64) -> Result<Option<StoredSession>, StoreError> {
            Ok(None)
        }
        fn delete(&mut self, _id: i64) -> Result<(), StoreError> {
            Ok(())
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn store_failure_still_delivers_result() {
        let clock = Rc::new(ManualClock::new());
        let mut ctl = SessionController::with_clock(clock.clone())
            .with_store(Box::new(FailingStore));
        ctl.start(small_addition(1)).unwrap();
        type_answer(&mut ctl, &clock);

        let result = ctl.on_tick().cloned();
        assert!(result.is_some());
        assert_eq!(ctl.state(), SessionState::Finished);
        assert_eq!(ctl.stored_id(), None);
        assert_eq!(ctl.result().unwrap().total_problems, 1);
    }

    #[test]
    fn abandon_discards_everything() {
        let (clock, mut ctl) = controller();
        ctl.start(small_addition(60)).unwrap();
        type_answer(&mut ctl, &clock);
        ctl.abandon();

        assert_eq!(ctl.state(), SessionState::Idle);
        assert!(ctl.result().is_none());
        assert!(ctl.history().is_empty());
        assert_eq!(ctl.tally(), SessionTally::default());
        // and a new session may start
        assert!(ctl.start(small_addition(60)).is_ok());
    }

    #[test]
    fn result_summary_metrics() {
        let cfg = small_addition(30);
        let entry = |first_try: bool, ms: u64| ProblemResult {
            kind: OperatorKind::Addition,
            operand_display: "2 + 2".into(),
            correct_answer: 4,
            user_answer: 4,
            correct: true,
            first_try_correct: first_try,
            time_taken_ms: ms,
            attempts: if first_try { 1 } else { 2 },
            keystrokes: 1,
            backspaces: 0,
        };
        let result = SessionResult::from_history(
            vec![entry(true, 1000), entry(false, 3000), entry(true, 2000)],
            cfg,
            Local::now(),
        );
        assert_eq!(result.total_problems, 3);
        assert_eq!(result.first_try_correct_count, 2);
        assert_eq!(result.eventually_correct_count, 3);
        assert_eq!(result.accuracy_label(), "66.7");
        assert_eq!(result.average_time_ms(), 2000.0);
        assert_eq!(result.problems_per_minute(), 6.0);
    }
}
