mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use kuis::{
    app_dirs::AppDirs,
    attempt::{QuizAttempt, Transition},
    config::{Config, ConfigStore, FileConfigStore},
    error::QuizError,
    logging::{self, LogTarget},
    quiz::{Catalog, Quiz, Session},
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, QuizEventSource, Runner, Ticker},
    store::{self, MemoryResultStore, QuizResult, ResultStore, SqliteResultStore},
    util::format_time,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::{Path, PathBuf},
};

/// timed multiple-choice quizzes in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Take the timed multiple-choice quizzes published for each meeting of a course, review every answer after submitting, and keep a history of your scores."
)]
pub struct Cli {
    /// quiz catalog (JSON); a file holding a single quiz works too
    catalog: Option<PathBuf>,

    /// use the built-in demo catalog
    #[clap(long, conflicts_with = "catalog")]
    demo: bool,

    /// student id recorded with results (defaults to the config file, then $USER)
    #[clap(short = 'u', long)]
    student: Option<String>,

    /// override the time limit of every quiz, in seconds
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
    time_limit: Option<u32>,

    /// result database to use
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// keep results in memory only
    #[clap(long)]
    no_save: bool,

    /// validate the catalog, print a summary and exit
    #[clap(long)]
    check: bool,

    /// write stored results as CSV to PATH ("-" for stdout) and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

impl Cli {
    fn load_catalog(&self) -> Result<Catalog, QuizError> {
        let mut catalog = match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::demo()?,
        };
        if let Some(secs) = self.time_limit {
            catalog.apply_time_limit(secs);
        }
        Ok(catalog)
    }

    fn student_id(&self, config: &Config) -> String {
        self.student
            .clone()
            .unwrap_or_else(|| config.student_id.clone())
    }

    fn db_path(&self, config: &Config) -> PathBuf {
        self.db.clone().unwrap_or_else(|| config.resolved_db_path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Picker,
    Quiz,
    Review,
    EmptyQuiz,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SortBy {
    Date,
    Score,
    Quiz,
}

#[derive(Debug)]
pub struct HistoryState {
    pub scroll_offset: usize,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            sort_by: SortBy::Date,
            sort_ascending: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// The quiz being taken and the meeting it belongs to.
#[derive(Debug)]
pub struct ActiveQuiz {
    pub session: Session,
    pub attempt: QuizAttempt,
}

pub struct App {
    pub catalog: Catalog,
    pub student_id: String,
    pub store: Box<dyn ResultStore>,
    pub state: AppState,
    pub selected: usize,
    pub active: Option<ActiveQuiz>,
    pub empty_quiz: Option<Quiz>,
    pub review_scroll: usize,
    pub history: Vec<QuizResult>,
    pub history_state: HistoryState,
    pub status: Option<String>,
}

impl App {
    pub fn new(catalog: Catalog, student_id: String, store: Box<dyn ResultStore>) -> Self {
        Self {
            catalog,
            student_id,
            store,
            state: AppState::Picker,
            selected: 0,
            active: None,
            empty_quiz: None,
            review_scroll: 0,
            history: Vec::new(),
            history_state: HistoryState::default(),
            status: None,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.catalog.quiz_entries().len()
    }

    /// True while the countdown must be running.
    pub fn attempt_in_progress(&self) -> bool {
        self.state == AppState::Quiz
            && self
                .active
                .as_ref()
                .is_some_and(|a| a.attempt.is_in_progress())
    }

    pub fn start_selected(&mut self) {
        let Some((session, quiz)) = self
            .catalog
            .quiz_entries()
            .get(self.selected)
            .map(|e| (e.session.clone(), e.quiz.clone()))
        else {
            return;
        };

        match QuizAttempt::new(quiz.clone()) {
            Ok(attempt) => {
                self.active = Some(ActiveQuiz { session, attempt });
                self.review_scroll = 0;
                self.status = None;
                self.state = AppState::Quiz;
            }
            Err(QuizError::EmptyQuiz) => {
                self.empty_quiz = Some(quiz);
                self.state = AppState::EmptyQuiz;
            }
            Err(err) => {
                tracing::warn!(%err, "could not start quiz");
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            if let Some(active) = self.active.as_mut() {
                active.attempt.cancel();
            }
            return Control::Quit;
        }

        match self.state {
            AppState::Picker => return self.on_picker_key(key),
            AppState::Quiz => self.on_quiz_key(key),
            AppState::Review => self.on_review_key(key),
            AppState::EmptyQuiz => {
                self.empty_quiz = None;
                self.state = AppState::Picker;
            }
            AppState::History => self.on_history_key(key),
        }
        Control::Continue
    }

    /// One second elapsed on the countdown.
    pub fn on_tick(&mut self) -> Control {
        if self.state != AppState::Quiz {
            return Control::Continue;
        }
        if let Some(active) = self.active.as_mut() {
            let transition = active.attempt.tick();
            let timed_out = matches!(transition, Transition::Finished { .. });
            self.apply(transition);
            if timed_out {
                self.status = Some("Time is up".to_string());
            }
        }
        Control::Continue
    }

    fn on_picker_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                self.selected = (self.selected + 1).min(self.entry_count().saturating_sub(1))
            }
            KeyCode::Enter => self.start_selected(),
            KeyCode::Char('h') => self.open_history(),
            _ => {}
        }
        Control::Continue
    }

    fn on_quiz_key(&mut self, key: KeyEvent) {
        let Some(active) = self.active.as_mut() else {
            self.state = AppState::Picker;
            return;
        };
        let attempt = &mut active.attempt;
        let current = attempt.current_index();
        let option_count = attempt.current_question().options.len();

        let transition = match key.code {
            KeyCode::Left => attempt.previous(),
            KeyCode::Right => attempt.next(),
            KeyCode::Up => {
                let option = match attempt.answer_for(current) {
                    Some(i) => i.saturating_sub(1),
                    None => option_count - 1,
                };
                attempt.select_answer(current, option)
            }
            KeyCode::Down => {
                let option = match attempt.answer_for(current) {
                    Some(i) => (i + 1).min(option_count - 1),
                    None => 0,
                };
                attempt.select_answer(current, option)
            }
            KeyCode::Char(c) => match option_index(c) {
                Some(option) if option < option_count => attempt.select_answer(current, option),
                _ => Transition::Continuing,
            },
            KeyCode::Enter if attempt.is_last_question() => attempt.submit(),
            KeyCode::Enter => attempt.next(),
            KeyCode::Esc => attempt.cancel(),
            _ => Transition::Continuing,
        };
        self.apply(transition);
    }

    fn on_review_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.review_scroll = self.review_scroll.saturating_sub(1),
            KeyCode::Down => self.review_scroll += 1,
            KeyCode::PageUp => self.review_scroll = self.review_scroll.saturating_sub(10),
            KeyCode::PageDown => self.review_scroll += 10,
            KeyCode::Enter | KeyCode::Esc => {
                if let Some(active) = self.active.as_mut() {
                    let transition = active.attempt.finish();
                    self.apply(transition);
                }
            }
            _ => {}
        }
    }

    fn on_history_key(&mut self, key: KeyEvent) {
        let hs = &mut self.history_state;
        match key.code {
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                self.state = AppState::Picker;
            }
            KeyCode::Up => hs.scroll_offset = hs.scroll_offset.saturating_sub(1),
            KeyCode::Down => hs.scroll_offset += 1,
            KeyCode::PageUp => hs.scroll_offset = hs.scroll_offset.saturating_sub(10),
            KeyCode::PageDown => hs.scroll_offset += 10,
            KeyCode::Home => hs.scroll_offset = 0,
            KeyCode::Char('1') => {
                hs.sort_by = SortBy::Date;
                hs.scroll_offset = 0;
            }
            KeyCode::Char('2') => {
                hs.sort_by = SortBy::Score;
                hs.scroll_offset = 0;
            }
            KeyCode::Char('3') => {
                hs.sort_by = SortBy::Quiz;
                hs.scroll_offset = 0;
            }
            KeyCode::Char(' ') => {
                hs.sort_ascending = !hs.sort_ascending;
                hs.scroll_offset = 0;
            }
            _ => {}
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Finished { score } => {
                self.review_scroll = 0;
                self.status = Some(format!("Submitted: {score}%"));
                self.state = AppState::Review;
            }
            Transition::Completed(result) => {
                if let Some(active) = self.active.take() {
                    let record = QuizResult::new(
                        &self.student_id,
                        &active.session,
                        active.attempt.quiz(),
                        result,
                        Local::now(),
                    );
                    self.status = Some(match self.store.save_result(&record) {
                        Ok(_) => format!("Saved {}: {}%", record.quiz_title, record.score),
                        Err(err) => {
                            tracing::error!(%err, "failed to save quiz result");
                            format!("Could not save result: {err}")
                        }
                    });
                }
                self.state = AppState::Picker;
            }
            Transition::Cancelled => {
                self.active = None;
                self.status = Some("Quiz cancelled".to_string());
                self.state = AppState::Picker;
            }
            Transition::Continuing | Transition::Rejected => {}
        }
    }

    pub fn open_history(&mut self) {
        match self.store.list_results_for_student(&self.student_id) {
            Ok(results) => {
                self.history = results;
                self.history_state = HistoryState::default();
                self.state = AppState::History;
            }
            Err(err) => {
                tracing::error!(%err, "failed to load results");
                self.status = Some(format!("Could not load history: {err}"));
            }
        }
    }

    /// History rows in the current sort order.
    pub fn sorted_history(&self) -> Vec<&QuizResult> {
        let hs = &self.history_state;
        self.history
            .iter()
            .sorted_by(|a, b| {
                let cmp = match hs.sort_by {
                    SortBy::Date => a.completed_at.cmp(&b.completed_at),
                    SortBy::Score => a.score.cmp(&b.score),
                    SortBy::Quiz => a.quiz_title.cmp(&b.quiz_title),
                };
                if hs.sort_ascending {
                    cmp
                } else {
                    cmp.reverse()
                }
            })
            .collect()
    }
}

/// `a`/`A` is the first option.
fn option_index(c: char) -> Option<usize> {
    c.is_ascii_alphabetic()
        .then(|| (c.to_ascii_lowercase() as u8 - b'a') as usize)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_store = FileConfigStore::new();
    let (config, config_err) = match config_store.load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    let interactive = !cli.check && cli.export.is_none();
    let log_target = match AppDirs::log_path() {
        Some(path) if interactive => LogTarget::File(path),
        _ => LogTarget::Stderr,
    };
    logging::init(&log_target, &config.log_filter)?;

    match config_err {
        Some(err) => tracing::warn!(%err, "using default config"),
        None if interactive => match config_store.write_if_missing(&config) {
            Ok(true) => {
                tracing::info!(path = %config_store.path().display(), "wrote default config")
            }
            Ok(false) => {}
            Err(err) => tracing::warn!(%err, "could not write default config"),
        },
        None => {}
    }

    if let Some(path) = &cli.export {
        return export_results(&cli, &config, path);
    }

    if cli.catalog.is_none() && !cli.demo {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::MissingRequiredArgument,
            "pass a catalog file or --demo",
        )
        .exit();
    }

    let catalog = match cli.load_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, err.to_string()).exit();
        }
    };

    if cli.check {
        print_summary(&catalog);
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store: Box<dyn ResultStore> = if cli.no_save {
        Box::new(MemoryResultStore::new())
    } else {
        Box::new(SqliteResultStore::open(cli.db_path(&config))?)
    };
    let mut app = App::new(catalog, cli.student_id(&config), store);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::per_second());
    let result = start_tui(&mut terminal, &mut app, &mut runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn print_summary(catalog: &Catalog) {
    let summary = catalog.summary();
    println!(
        "{} sessions, {} quizzes, {} questions",
        summary.sessions, summary.quizzes, summary.questions
    );
    for entry in catalog.quiz_entries() {
        println!(
            "  [{}] {} - {}: {} questions, {}",
            entry.session.session_number,
            entry.session.title,
            entry.quiz.title,
            entry.quiz.question_count(),
            format_time(entry.quiz.effective_time_limit()),
        );
    }
    if summary.empty_quizzes > 0 {
        println!("{} quizzes have no questions yet", summary.empty_quizzes);
    }
}

fn export_results(cli: &Cli, config: &Config, path: &Path) -> Result<(), Box<dyn Error>> {
    let db_path = cli.db_path(config);
    if !db_path.exists() {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::InvalidValue,
            format!("no result database at {}", db_path.display()),
        )
        .exit();
    }

    let store = SqliteResultStore::open(db_path)?;
    let results = match &cli.student {
        Some(student) => store.list_results_for_student(student)?,
        None => store.list_results()?,
    };

    if path == Path::new("-") {
        store::export_csv(&results, io::stdout().lock())?;
    } else {
        store::export_csv(&results, File::create(path)?)?;
        eprintln!("exported {} results to {}", results.len(), path.display());
    }
    Ok(())
}

/// Keeps the countdown running exactly while an attempt is in progress.
fn sync_countdown<E: QuizEventSource, T: Ticker>(app: &App, runner: &mut Runner<E, T>) {
    match (app.attempt_in_progress(), runner.countdown_running()) {
        (true, false) => runner.start_countdown(),
        (false, true) => runner.stop_countdown(),
        _ => {}
    }
}

fn start_tui<B: Backend, E: QuizEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &mut Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(app, f))?;

        let control = match runner.step() {
            QuizEvent::Key(key) => app.on_key(key),
            QuizEvent::Tick => app.on_tick(),
            QuizEvent::Resize => Control::Continue,
            QuizEvent::Closed => Control::Quit,
        };
        sync_countdown(app, runner);

        if control == Control::Quit {
            break;
        }
    }

    runner.stop_countdown();
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuis::{attempt::Phase, runtime::TestEventSource};
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn demo_app() -> App {
        App::new(
            Catalog::demo().unwrap(),
            "siti".to_string(),
            Box::new(MemoryResultStore::new()),
        )
    }

    fn press(app: &mut App, codes: &[KeyCode]) {
        for &code in codes {
            app.on_key(key(code));
        }
    }

    #[test]
    fn test_cli_demo() {
        let cli = Cli::parse_from(["kuis", "--demo"]);
        assert!(cli.demo);
        assert_eq!(cli.catalog, None);
        assert_eq!(cli.time_limit, None);
        assert!(!cli.no_save);
    }

    #[test]
    fn test_cli_all_flags() {
        let cli = Cli::parse_from([
            "kuis",
            "course.json",
            "-u",
            "budi",
            "-s",
            "90",
            "--db",
            "/tmp/r.db",
            "--no-save",
        ]);
        assert_eq!(cli.catalog, Some(PathBuf::from("course.json")));
        assert_eq!(cli.student.as_deref(), Some("budi"));
        assert_eq!(cli.time_limit, Some(90));
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/r.db")));
        assert!(cli.no_save);
    }

    #[test]
    fn test_cli_rejects_zero_time_limit() {
        assert!(Cli::try_parse_from(["kuis", "--demo", "-s", "0"]).is_err());
    }

    #[test]
    fn test_cli_demo_conflicts_with_catalog() {
        assert!(Cli::try_parse_from(["kuis", "course.json", "--demo"]).is_err());
    }

    #[test]
    fn test_cli_student_falls_back_to_config() {
        let config = Config {
            student_id: "from-config".into(),
            ..Config::default()
        };
        let cli = Cli::parse_from(["kuis", "--demo"]);
        assert_eq!(cli.student_id(&config), "from-config");

        let cli = Cli::parse_from(["kuis", "--demo", "-u", "budi"]);
        assert_eq!(cli.student_id(&config), "budi");
    }

    #[test]
    fn test_cli_time_limit_applies_to_catalog() {
        let cli = Cli::parse_from(["kuis", "--demo", "-s", "42"]);
        let catalog = cli.load_catalog().unwrap();
        assert!(catalog
            .quiz_entries()
            .iter()
            .all(|e| e.quiz.effective_time_limit() == 42));
    }

    #[test]
    fn test_option_index() {
        assert_eq!(option_index('a'), Some(0));
        assert_eq!(option_index('D'), Some(3));
        assert_eq!(option_index('1'), None);
    }

    #[test]
    fn test_picker_navigation_is_clamped() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Up]);
        assert_eq!(app.selected, 0);
        press(&mut app, &[KeyCode::Down; 10]);
        assert_eq!(app.selected, app.entry_count() - 1);
    }

    #[test]
    fn test_full_quiz_is_scored_and_saved() {
        let mut app = demo_app();

        // second entry: "Fractions check", correct answers [1, 0, 2, 3]
        press(&mut app, &[KeyCode::Down, KeyCode::Enter]);
        assert_eq!(app.state, AppState::Quiz);
        assert!(app.attempt_in_progress());

        press(
            &mut app,
            &[
                KeyCode::Char('b'),
                KeyCode::Right,
                KeyCode::Char('a'),
                KeyCode::Enter,
                KeyCode::Char('a'),
                KeyCode::Right,
                KeyCode::Char('d'),
                KeyCode::Enter,
            ],
        );
        assert_eq!(app.state, AppState::Review);
        assert!(!app.attempt_in_progress());
        let attempt = &app.active.as_ref().unwrap().attempt;
        assert_eq!(attempt.score(), Some(75));
        let review = attempt.review();
        assert!(!review[2].is_correct);
        assert_eq!(review[2].selected.text(), Some("1/3"));
        assert_eq!(review[2].correct_text, "1/2");

        press(&mut app, &[KeyCode::Enter]);
        assert_eq!(app.state, AppState::Picker);
        assert!(app.active.is_none());

        let saved = app.store.list_results().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].score, 75);
        assert_eq!(saved[0].student_id, "siti");
        assert_eq!(saved[0].session_id, "meeting-2");
        assert_eq!(saved[0].quiz_id, "fractions-check");
        assert_eq!(app.status.as_deref(), Some("Saved Fractions check: 75%"));
    }

    #[test]
    fn test_arrow_keys_cycle_selection() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Enter]);

        press(&mut app, &[KeyCode::Down]);
        assert_eq!(app.active.as_ref().unwrap().attempt.answer_for(0), Some(0));
        press(&mut app, &[KeyCode::Down, KeyCode::Down]);
        // first demo question has two options
        assert_eq!(app.active.as_ref().unwrap().attempt.answer_for(0), Some(1));
        press(&mut app, &[KeyCode::Up]);
        assert_eq!(app.active.as_ref().unwrap().attempt.answer_for(0), Some(0));
    }

    #[test]
    fn test_letter_beyond_options_is_ignored() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('z')]);
        assert_eq!(app.active.as_ref().unwrap().attempt.answer_for(0), None);
    }

    #[test]
    fn test_cancel_returns_to_picker_without_saving() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('b'), KeyCode::Esc]);

        assert_eq!(app.state, AppState::Picker);
        assert!(app.active.is_none());
        assert!(app.store.list_results().unwrap().is_empty());
        assert_eq!(app.status.as_deref(), Some("Quiz cancelled"));
    }

    #[test]
    fn test_empty_quiz_only_goes_back() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
        assert_eq!(app.state, AppState::EmptyQuiz);
        assert!(app.active.is_none());
        assert!(!app.attempt_in_progress());

        press(&mut app, &[KeyCode::Char('x')]);
        assert_eq!(app.state, AppState::Picker);
        assert!(app.empty_quiz.is_none());
    }

    #[test]
    fn test_timeout_moves_to_review() {
        let mut catalog = Catalog::demo().unwrap();
        catalog.apply_time_limit(2);
        let mut app = App::new(catalog, "siti".into(), Box::new(MemoryResultStore::new()));
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('b')]);

        app.on_tick();
        assert_eq!(app.state, AppState::Quiz);
        app.on_tick();
        assert_eq!(app.state, AppState::Review);
        assert_eq!(app.status.as_deref(), Some("Time is up"));

        let attempt = &app.active.as_ref().unwrap().attempt;
        assert_eq!(attempt.phase(), Phase::Finished);
        // one of three correct
        assert_eq!(attempt.score(), Some(33));

        // further ticks change nothing
        app.on_tick();
        assert_eq!(app.state, AppState::Review);
    }

    #[test]
    fn test_ctrl_c_quits_and_cancels() {
        let mut app = demo_app();
        press(&mut app, &[KeyCode::Enter]);
        let control = app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(control, Control::Quit);
        assert_eq!(
            app.active.as_ref().unwrap().attempt.phase(),
            Phase::Cancelled
        );
        assert!(!app.attempt_in_progress());
    }

    #[test]
    fn test_history_sorting() {
        let mut app = demo_app();
        // only the first question answered: right once, wrong once
        for answer in ['b', 'a'] {
            press(&mut app, &[KeyCode::Enter, KeyCode::Char(answer)]);
            press(&mut app, &[KeyCode::Right, KeyCode::Right, KeyCode::Enter]);
            press(&mut app, &[KeyCode::Enter]);
        }

        press(&mut app, &[KeyCode::Char('h')]);
        assert_eq!(app.state, AppState::History);
        assert_eq!(app.history.len(), 2);

        press(&mut app, &[KeyCode::Char('2')]);
        let scores: Vec<u8> = app.sorted_history().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![33, 0]);

        press(&mut app, &[KeyCode::Char(' ')]);
        let scores: Vec<u8> = app.sorted_history().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0, 33]);

        press(&mut app, &[KeyCode::Char('b')]);
        assert_eq!(app.state, AppState::Picker);
    }

    #[test]
    fn test_sync_countdown_follows_attempt() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_secs(1)));
        let mut app = demo_app();

        sync_countdown(&app, &mut runner);
        assert!(!runner.countdown_running());

        press(&mut app, &[KeyCode::Enter]);
        sync_countdown(&app, &mut runner);
        assert!(runner.countdown_running());

        press(&mut app, &[KeyCode::Right, KeyCode::Right, KeyCode::Enter]);
        assert_eq!(app.state, AppState::Review);
        sync_countdown(&app, &mut runner);
        assert!(!runner.countdown_running());
    }

    #[test]
    fn test_start_tui_drives_a_whole_session() {
        let (tx, rx) = mpsc::channel();
        for code in [
            KeyCode::Enter,
            KeyCode::Char('b'),
            KeyCode::Right,
            KeyCode::Char('c'),
            KeyCode::Right,
            KeyCode::Char('c'),
            KeyCode::Enter,
            KeyCode::Enter,
            KeyCode::Esc,
        ] {
            tx.send(QuizEvent::Key(key(code))).unwrap();
        }

        let mut runner = Runner::new(TestEventSource::new(rx), FixedTicker::per_second());
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut app = demo_app();

        start_tui(&mut terminal, &mut app, &mut runner).unwrap();

        assert!(!runner.countdown_running());
        let saved = app.store.list_results().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].score, 100);
        assert_eq!(saved[0].answers.len(), 3);
    }

    #[test]
    fn test_ui_renders_every_state() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut app = demo_app();

        terminal.draw(|f| ui(&mut app, f)).unwrap();
        press(&mut app, &[KeyCode::Enter]);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        press(&mut app, &[KeyCode::Right, KeyCode::Right, KeyCode::Enter]);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('h')]);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
        press(&mut app, &[KeyCode::Esc, KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
        assert_eq!(app.state, AppState::EmptyQuiz);
        terminal.draw(|f| ui(&mut app, f)).unwrap();
    }
}
