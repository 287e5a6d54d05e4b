use kuis::{store::QuizResult, util::mean};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{App, SortBy};

/// Pure presenter for a single history row
pub fn present_row(result: &QuizResult) -> Row<'static> {
    let score_color = if result.score >= 80 {
        Color::Green
    } else if result.score >= 50 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(result.completed_at.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(result.quiz_title.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}%", result.score)).style(Style::default().fg(score_color)),
        Cell::from(format!("{}/{}", result.correct_count, result.question_count)),
    ])
}

/// "n attempts, average x%" line under the title
pub fn summary_line(results: &[QuizResult]) -> String {
    let scores: Vec<f64> = results.iter().map(|r| f64::from(r.score)).collect();
    match mean(&scores) {
        Some(avg) => format!("{} attempts, average {:.0}%", scores.len(), avg),
        None => "No attempts yet".to_string(),
    }
}

pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(4), // Title
            Constraint::Min(0),    // Results table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let hs = &app.history_state;
    let sort_direction = if hs.sort_ascending { "↑" } else { "↓" };
    let title = Paragraph::new(vec![
        Line::from(format!(
            "Quiz history for {} (Sort: {} {})",
            app.student_id, hs.sort_by, sort_direction
        )),
        Line::from(summary_line(&app.history)),
    ])
    .block(Block::default().borders(Borders::ALL).title("History"))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let indicator = |col: SortBy| if hs.sort_by == col { sort_direction } else { "" };
    let header = Row::new(vec![
        Cell::from(format!("Completed {}", indicator(SortBy::Date))),
        Cell::from(format!("Quiz {}", indicator(SortBy::Quiz))),
        Cell::from(format!("Score {}", indicator(SortBy::Score))),
        Cell::from("Correct"),
    ])
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows = app.sorted_history();
    let table_height = chunks[1].height.saturating_sub(3) as usize;
    let max_scroll = rows.len().saturating_sub(table_height);
    let scroll = app.history_state.scroll_offset.min(max_scroll);

    let visible: Vec<Row> = rows
        .iter()
        .skip(scroll)
        .take(table_height)
        .map(|r| present_row(r))
        .collect();

    let table = Table::new(
        visible,
        [
            Constraint::Length(18),
            Constraint::Min(20),
            Constraint::Length(8),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(table, chunks[1]);

    app.history_state.scroll_offset = scroll;

    let instructions = Paragraph::new(
        "(↑/↓) scroll / (1) date (2) score (3) quiz / (space) reverse / (b)ack",
    )
    .style(Style::default().add_modifier(Modifier::ITALIC))
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
