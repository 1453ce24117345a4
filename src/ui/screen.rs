use ratatui::Frame;

use crate::{ui::history::render_history, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Playfield screen - the engine frame plus countdown/pause overlays
pub struct PlayScreen;

impl Screen for PlayScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Results screen - renders the results UI using the App widget
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// History screen - uses dedicated renderer
pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Idle | AppState::Countdown | AppState::Playing | AppState::Paused => {
            Box::new(PlayScreen)
        }
        AppState::Results => Box::new(ResultsScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
