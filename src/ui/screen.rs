use ratatui::Frame;

use crate::{
    ui::{history::render_history, render_empty_quiz, render_picker, render_quiz, render_review},
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

pub struct PickerScreen;

impl Screen for PickerScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_picker(app, f);
    }
}

pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_quiz(app, f);
    }
}

/// Score and per-question feedback; scrolling state lives on the app
pub struct ReviewScreen;

impl Screen for ReviewScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_review(app, f);
    }
}

pub struct EmptyQuizScreen;

impl Screen for EmptyQuizScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_empty_quiz(app, f);
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Picker => Box::new(PickerScreen),
        AppState::Quiz => Box::new(QuizScreen),
        AppState::Review => Box::new(ReviewScreen),
        AppState::EmptyQuiz => Box::new(EmptyQuizScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
