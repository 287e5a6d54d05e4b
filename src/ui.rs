pub mod history;
pub mod screen;

use kuis::{
    attempt::QuizAttempt,
    review::ReviewEntry,
    util::format_time,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
/// The timer turns red below this many seconds.
const LOW_TIME_SECS: u32 = 30;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

/// `A`, `B`, ... for option 0, 1, ...
pub fn option_label(idx: usize) -> char {
    (b'A' + (idx % 26) as u8) as char
}

fn status_line(app: &App) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        app.status.clone().unwrap_or_default(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
}

pub fn render_picker(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(Span::styled(
        format!("Quizzes for {}", app.student_id),
        bold().fg(Color::Cyan),
    ))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let entries = app.catalog.quiz_entries();
    let title_width = entries
        .iter()
        .map(|e| e.quiz.title.width())
        .max()
        .unwrap_or(0);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let padding = " ".repeat(title_width.saturating_sub(entry.quiz.title.width()));
            let details = if entry.quiz.is_empty() {
                "no questions yet".to_string()
            } else {
                format!(
                    "{} questions, {}",
                    entry.quiz.question_count(),
                    format_time(entry.quiz.effective_time_limit())
                )
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("Meeting {:<3}", entry.session.session_number),
                    dim(),
                ),
                Span::styled(format!("{}{}  ", entry.quiz.title, padding), bold()),
                Span::styled(details, italic()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Choose a quiz"))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(if entries.is_empty() {
        None
    } else {
        Some(app.selected)
    });
    f.render_stateful_widget(list, chunks[1], &mut state);

    if let Some(entry) = entries.get(app.selected) {
        let details = [
            entry.session.description.as_deref(),
            entry.quiz.content.as_deref(),
        ];
        let lines: Vec<Line> = details
            .into_iter()
            .flatten()
            .map(|text| Line::from(Span::styled(text.to_string(), dim())))
            .collect();
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[2]);
    }

    f.render_widget(status_line(app), chunks[3]);
    f.render_widget(
        Paragraph::new(Span::styled(
            "(↑/↓) select / (enter) start / (h)istory / (esc)ape",
            italic(),
        )),
        chunks[4],
    );
}

fn timer_span(attempt: &QuizAttempt) -> Span<'static> {
    let style = if attempt.remaining_secs() <= LOW_TIME_SECS {
        bold().fg(Color::Red)
    } else {
        bold()
    };
    Span::styled(format!("⏱ {}", format_time(attempt.remaining_secs())), style)
}

pub fn render_quiz(app: &App, f: &mut Frame) {
    let Some(active) = app.active.as_ref() else {
        return;
    };
    let attempt = &active.attempt;
    let question = attempt.current_question();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(4),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(10)])
        .split(chunks[0]);

    let heading = Paragraph::new(vec![
        Line::from(Span::styled(attempt.quiz().title.clone(), bold())),
        Line::from(Span::styled(
            format!(
                "Question {} of {}",
                attempt.current_index() + 1,
                attempt.question_count()
            ),
            dim(),
        )),
    ]);
    f.render_widget(heading, header[0]);
    f.render_widget(
        Paragraph::new(timer_span(attempt)).alignment(Alignment::Right),
        header[1],
    );

    let chosen = attempt.answer_for(attempt.current_index());
    let mut lines = vec![
        Line::from(Span::styled(question.question.clone(), bold())),
        Line::from(""),
    ];
    lines.extend(question.options.iter().enumerate().map(|(idx, option)| {
        let selected = chosen == Some(idx);
        let marker = if selected { "●" } else { "○" };
        let style = if selected {
            bold().fg(Color::Blue)
        } else {
            Style::default()
        };
        Line::from(Span::styled(
            format!("{marker} {}. {option}", option_label(idx)),
            style,
        ))
    }));

    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        chunks[1],
    );

    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Blue))
        .percent(u16::from(attempt.progress_percent()))
        .label(format!(
            "{}% · {} of {} answered",
            attempt.progress_percent(),
            attempt.answered_count(),
            attempt.question_count()
        ));
    f.render_widget(progress, chunks[2]);

    let legend = if attempt.is_last_question() {
        "(a-z/↑/↓) answer / (←) previous / (enter) finish quiz / (esc) cancel"
    } else {
        "(a-z/↑/↓) answer / (←/→) previous/next / (esc) cancel"
    };
    f.render_widget(Paragraph::new(Span::styled(legend, italic())), chunks[3]);
}

fn review_lines(entries: &[ReviewEntry]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in entries {
        let (mark, mark_style) = if entry.is_correct {
            ("✓", bold().fg(Color::Green))
        } else {
            ("✗", bold().fg(Color::Red))
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{mark} "), mark_style),
            Span::styled(format!("{}. {}", entry.index + 1, entry.prompt), bold()),
        ]));

        let yours = match entry.selected.text() {
            Some(text) => Span::raw(text.to_string()),
            None => Span::styled("not answered", italic().fg(Color::Red)),
        };
        lines.push(Line::from(vec![Span::styled("   Your answer: ", dim()), yours]));
        lines.push(Line::from(vec![
            Span::styled("   Correct answer: ", dim()),
            Span::styled(entry.correct_text.clone(), Style::default().fg(Color::Green)),
        ]));
        lines.push(Line::from(""));
    }
    lines
}

pub fn render_review(app: &mut App, f: &mut Frame) {
    let Some(active) = app.active.as_ref() else {
        return;
    };
    let attempt = &active.attempt;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let score = attempt.score().unwrap_or(0);
    let correct = attempt.correct_count().unwrap_or(0);
    let summary = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{score}%"),
            bold().fg(Color::Yellow),
        )),
        Line::from(Span::styled(
            format!(
                "You answered {correct} of {} questions correctly",
                attempt.question_count()
            ),
            dim(),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("Results"))
    .alignment(Alignment::Center);
    f.render_widget(summary, chunks[0]);

    let lines = review_lines(&attempt.review());
    let visible = chunks[1].height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible);
    if app.review_scroll > max_scroll {
        app.review_scroll = max_scroll;
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Review"))
            .scroll((app.review_scroll as u16, 0)),
        chunks[1],
    );

    f.render_widget(status_line(app), chunks[2]);
    f.render_widget(
        Paragraph::new(Span::styled("(↑/↓) scroll / (enter) done", italic())),
        chunks[3],
    );
}

pub fn render_empty_quiz(app: &App, f: &mut Frame) {
    let area = f.area();
    let (title, content) = app
        .empty_quiz
        .as_ref()
        .map(|q| (q.title.clone(), q.content.clone().unwrap_or_default()))
        .unwrap_or_default();

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(6),
            Constraint::Min(0),
        ])
        .split(area);

    let message = Paragraph::new(vec![
        Line::from(Span::styled(title, bold())),
        Line::from(Span::styled("This quiz has no questions yet.", dim())),
        Line::from(Span::styled(content, italic())),
        Line::from(""),
        Line::from(Span::styled("(any key) go back", italic())),
    ])
    .alignment(Alignment::Center);

    f.render_widget(message, centered(vertical[1], 60));
}

fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuis::{quiz::Catalog, store::MemoryResultStore};
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(app: &mut App, draw: fn(&mut App, &mut Frame)) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn demo_app() -> App {
        App::new(
            Catalog::demo().unwrap(),
            "siti".into(),
            Box::new(MemoryResultStore::new()),
        )
    }

    #[test]
    fn test_option_label() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
    }

    #[test]
    fn test_picker_lists_quizzes() {
        let mut app = demo_app();
        let content = rendered(&mut app, |app, f| render_picker(app, f));
        assert!(content.contains("Numbers warm-up"));
        assert!(content.contains("Fractions check"));
        assert!(content.contains("no questions yet"));
        assert!(content.contains("Quizzes for siti"));
        assert!(content.contains("Place value and rounding."));
    }

    #[test]
    fn test_picker_shows_selected_descriptions() {
        let mut app = demo_app();
        app.selected = 1;
        let content = rendered(&mut app, |app, f| render_picker(app, f));
        assert!(content.contains("Adding and comparing simple fractions."));
        assert!(content.contains("Four quick questions. Two minutes."));
        assert!(!content.contains("Place value and rounding."));
    }

    #[test]
    fn test_quiz_shows_question_timer_and_options() {
        let mut app = demo_app();
        app.start_selected();
        let content = rendered(&mut app, |app, f| render_quiz(app, f));

        assert!(content.contains("Question 1 of 3"));
        assert!(content.contains("Round 47 to the nearest ten"));
        assert!(content.contains("A. 40"));
        assert!(content.contains("B. 50"));
        assert!(content.contains("5:00"));
    }

    #[test]
    fn test_review_shows_unanswered_and_correct_text() {
        let mut app = demo_app();
        app.start_selected();
        if let Some(active) = app.active.as_mut() {
            active.attempt.submit();
        }
        let content = rendered(&mut app, |app, f| render_review(app, f));

        assert!(content.contains("0%"));
        assert!(content.contains("You answered 0 of 3 questions correctly"));
        assert!(content.contains("not answered"));
        assert!(content.contains("Correct answer: 50"));
    }

    #[test]
    fn test_review_scroll_is_clamped() {
        let mut app = demo_app();
        app.start_selected();
        if let Some(active) = app.active.as_mut() {
            active.attempt.submit();
        }
        app.review_scroll = 500;
        rendered(&mut app, |app, f| render_review(app, f));
        assert!(app.review_scroll < 500);
    }

    #[test]
    fn test_empty_quiz_message() {
        let mut app = demo_app();
        app.selected = 2;
        app.start_selected();
        let content = rendered(&mut app, |app, f| render_empty_quiz(app, f));
        assert!(content.contains("This quiz has no questions yet."));
        assert!(content.contains("Questions have not been published yet."));
        assert!(content.contains("(any key) go back"));
    }
}
