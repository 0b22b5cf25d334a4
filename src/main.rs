mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use monkeymath::{
    app_dirs::AppDirs,
    attempt::DEFAULT_RETYPE_THRESHOLD,
    config::{ConfigStore, Difficulty, FileConfigStore, Preferences, RangeSpec, TestConfiguration},
    error::SessionError,
    problem::OperatorKind,
    runtime::{CrosstermEventSource, DrillEvent, DrillEventSource, FixedTicker, Runner, Ticker},
    session::{SessionController, SessionResult},
    stats::{aggregate, breakdown_by_operator, AggregateStatistics, OperatorBreakdown},
    store::{export_csv, MemoryStore, ResultStore, SqliteStore, StoredSession},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Sessions listed on the results and dashboard screens
const RECENT_LIMIT: usize = 5;

/// timed mental arithmetic drills with attempt tracking and history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed mental arithmetic drills. Answers are checked as you type, retries are counted, and every finished session is kept for your history."
)]
pub struct Cli {
    /// session length in seconds (1-3600)
    #[clap(short = 'd', long)]
    duration: Option<u32>,

    /// operators to drill, comma separated
    #[clap(short = 'o', long, value_enum, value_delimiter = ',')]
    operators: Vec<OperatorKind>,

    /// difficulty preset for operand ranges
    #[clap(short = 'l', long, value_enum)]
    level: Option<Difficulty>,

    /// custom addition/subtraction ranges as MIN..MAX,MIN..MAX
    #[clap(long, value_name = "RANGES")]
    add_range: Option<RangeSpec>,

    /// custom multiplication/division ranges as MIN..MAX,MIN..MAX
    #[clap(long, value_name = "RANGES")]
    mul_range: Option<RangeSpec>,

    /// pause in milliseconds after which re-reaching full length counts as a new attempt
    #[clap(long, default_value_t = DEFAULT_RETYPE_THRESHOLD.as_millis() as u64)]
    retype_ms: u64,

    /// print aggregate statistics as JSON and exit
    #[clap(long)]
    stats: bool,

    /// write every stored session to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// delete all stored sessions and exit
    #[clap(long)]
    clear_history: bool,

    /// do not store results of this run
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Layer command line overrides on top of the saved preferences
    fn to_configuration(&self, prefs: &Preferences) -> TestConfiguration {
        let mut cfg = prefs.to_configuration();

        if let Some(duration) = self.duration {
            cfg.duration_seconds = duration;
        }
        if !self.operators.is_empty() {
            cfg.enabled_operators = self.operators.iter().copied().collect();
        }
        if let Some(level) = self.level {
            cfg.ranges = level.ranges();
            cfg.difficulty = Some(level);
        }
        if self.add_range.is_some() || self.mul_range.is_some() {
            if let Some(range) = self.add_range {
                cfg.ranges.addition = range;
            }
            if let Some(range) = self.mul_range {
                cfg.ranges.multiplication = range;
            }
            cfg.difficulty = None;
        }

        cfg
    }

    fn has_offline_command(&self) -> bool {
        self.stats || self.export.is_some() || self.clear_history
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Results,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Continue,
    Restart,
    Quit,
}

pub struct App {
    pub config: TestConfiguration,
    pub controller: SessionController,
    pub state: AppState,
    pub last_result: Option<SessionResult>,
    pub recent: Vec<StoredSession>,
    pub overall: AggregateStatistics,
    /// Shown in the results legend when something went wrong
    pub notice: Option<String>,
}

impl App {
    pub fn new(config: TestConfiguration, controller: SessionController) -> Self {
        Self {
            config,
            controller,
            state: AppState::Running,
            last_result: None,
            recent: Vec::new(),
            overall: AggregateStatistics::default(),
            notice: None,
        }
    }

    /// Start a fresh session with the current configuration
    fn begin(&mut self) -> Result<(), SessionError> {
        self.controller.abandon();
        self.controller.start(self.config.clone())?;
        self.notice = None;
        self.state = AppState::Running;
        Ok(())
    }

    fn on_tick(&mut self) {
        if self.controller.on_tick().is_some() {
            self.on_finished();
        }
    }

    fn on_finished(&mut self) {
        self.last_result = self.controller.result().cloned();
        self.notice = self
            .controller
            .stored_id()
            .is_none()
            .then(|| "result was not saved".to_string());
        self.refresh_history();
        self.state = AppState::Results;
    }

    fn refresh_history(&mut self) {
        let Some(store) = self.controller.store() else {
            return;
        };
        match store.get_all() {
            Ok(all) => self.overall = aggregate(all.iter().map(|s| &s.result)),
            Err(e) => warn!("could not load history: {e}"),
        }
        match store.get_recent(RECENT_LIMIT) {
            Ok(recent) => self.recent = recent,
            Err(e) => warn!("could not load recent sessions: {e}"),
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match self.state {
            AppState::Running => {
                match key.code {
                    KeyCode::Esc => {
                        if self.controller.finish().is_some() {
                            self.on_finished();
                        }
                    }
                    KeyCode::Backspace => {
                        let mut value = self.controller.input().to_string();
                        if value.pop().is_some() {
                            self.controller.on_input(&value);
                        }
                    }
                    KeyCode::Char(c) => {
                        let mut value = self.controller.input().to_string();
                        value.push(c);
                        self.controller.on_input(&value);
                    }
                    _ => {}
                }
                Action::Continue
            }
            AppState::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
                KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Enter => Action::Restart,
                KeyCode::Char('d') => {
                    self.state = AppState::Dashboard;
                    Action::Continue
                }
                _ => Action::Continue,
            },
            AppState::Dashboard => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
                KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Enter => Action::Restart,
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.state = AppState::Results;
                    Action::Continue
                }
                _ => Action::Continue,
            },
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("MONKEYMATH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("monkeymath=info"));

    // the terminal belongs to the TUI, so logs only ever go to the file
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn open_store(cli: &Cli) -> Box<dyn ResultStore> {
    if cli.no_save {
        return Box::new(MemoryStore::default());
    }
    match SqliteStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("falling back to in-memory history: {e}");
            Box::new(MemoryStore::default())
        }
    }
}

#[derive(Serialize)]
struct StatsReport {
    overall: AggregateStatistics,
    by_operator: BTreeMap<OperatorKind, OperatorBreakdown>,
}

/// Commands that print or modify history without starting the TUI
fn run_offline(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut store = SqliteStore::new()?;

    if let Some(path) = &cli.export {
        let sessions = store.get_all()?;
        export_csv(&sessions, File::create(path)?)?;
        println!("exported {} sessions to {}", sessions.len(), path.display());
    }

    if cli.stats {
        let sessions = store.get_all()?;
        let results: Vec<&SessionResult> = sessions.iter().map(|s| &s.result).collect();
        let report = StatsReport {
            overall: aggregate(results.iter().copied()),
            by_operator: breakdown_by_operator(results.iter().copied()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if cli.clear_history {
        let count = store.get_all()?.len();
        store.clear()?;
        info!(count, "history cleared");
        println!("cleared {count} sessions");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.has_offline_command() {
        return run_offline(&cli);
    }

    let config_store = FileConfigStore::new();
    let config = cli.to_configuration(&config_store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e).exit();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = config_store.save(&Preferences::from(&config)) {
        warn!("could not save preferences: {e}");
    }

    let controller = SessionController::new()
        .with_store(open_store(&cli))
        .with_retype_threshold(Duration::from_millis(cli.retype_ms));
    let mut app = App::new(config, controller);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let outcome = start_tui(&mut terminal, &mut app, &mut runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: DrillEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &mut Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    app.begin()?;
    runner.reset_ticks();

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            DrillEvent::Tick => app.on_tick(),
            DrillEvent::Resize => {}
            DrillEvent::Key(key) => match app.on_key(key) {
                Action::Continue => {}
                Action::Restart => {
                    app.begin()?;
                    runner.reset_ticks();
                }
                Action::Quit => break,
            },
        }
    }

    if app.controller.is_running() {
        app.controller.abandon();
    }
    Ok(())
}
