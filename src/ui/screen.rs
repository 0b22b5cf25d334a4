use ratatui::Frame;

use crate::{ui::history::render_dashboard, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// The drill itself: problem, answer field, countdown
pub struct RunningScreen;

impl Screen for RunningScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Recent sessions and all-time totals
pub struct DashboardScreen;

impl Screen for DashboardScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_dashboard(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: AppState) -> Box<dyn Screen> {
    match state {
        AppState::Running => Box::new(RunningScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::Dashboard => Box::new(DashboardScreen),
    }
}
