use kwiz::question::QuestionKind;
use kwiz::session::QuestionResult;
use kwiz::util::{format_keys, wrap_text};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn green_bold() -> Style {
    bold().fg(Color::Green)
}

fn red_bold() -> Style {
    bold().fg(Color::Red)
}

pub fn ui(app: &App, f: &mut Frame) {
    match app.screen {
        Screen::SubjectSelect => render_subject_select(app, f),
        Screen::Taking => render_question(app, f),
        Screen::ConfirmSubmit => render_confirm_submit(app, f),
        Screen::Results => render_results(app, f),
        Screen::Review => render_review(app, f),
    }
}

fn outer_chunks(area: Rect, constraints: &[Constraint]) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(constraints)
        .split(area)
}

fn render_subject_select(app: &App, f: &mut Frame) {
    let chunks = outer_chunks(
        f.area(),
        &[
            Constraint::Length(2), // title
            Constraint::Min(1),    // subject list
            Constraint::Length(1), // status
            Constraint::Length(1), // hints
        ],
    );

    let title = Paragraph::new(Span::styled("Pick a subject", bold()))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.subjects.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "no subjects yet - add one with `kwiz import` or `kwiz add-subject`",
            dim().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(empty, chunks[1]);
    } else {
        let lines: Vec<Line> = app
            .subjects
            .iter()
            .enumerate()
            .map(|(i, (subject, count))| {
                let marker = if i == app.subject_cursor { "> " } else { "  " };
                let style = if i == app.subject_cursor { bold() } else { dim() };
                Line::from(vec![
                    Span::styled(format!("{}{}", marker, subject.name), style),
                    Span::styled(format!("  ({} questions)", count), dim()),
                ])
            })
            .collect();
        f.render_widget(Paragraph::new(lines), chunks[1]);
    }

    render_status(app, f, chunks[2]);

    let hints = Paragraph::new(Span::styled(
        "(up/down) choose  (enter) start  (esc) quit",
        dim().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[3]);
}

fn render_question(app: &App, f: &mut Frame) {
    let Some(question) = app.engine.current_question() else {
        return;
    };
    let (number, total) = app.engine.question_number();
    let area = f.area();

    let wrap_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(10) as usize;
    let prompt_lines = wrap_text(&question.text, wrap_width);

    let chunks = outer_chunks(
        area,
        &[
            Constraint::Length(2),                             // header
            Constraint::Length(prompt_lines.len() as u16 + 1), // prompt
            Constraint::Min(1),                                // options
            Constraint::Length(1),                             // status
            Constraint::Length(1),                             // hints
        ],
    );

    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!("Question {} / {}", number, total), bold()),
        Span::styled(
            format!("   {:.0}% through", app.engine.progress_percentage()),
            dim(),
        ),
        Span::styled(format!("   [{}]", question.kind), dim()),
    ]));
    f.render_widget(header, chunks[0]);

    let prompt: Vec<Line> = prompt_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l, bold())))
        .collect();
    f.render_widget(Paragraph::new(prompt), chunks[1]);

    let lines: Vec<Line> = question
        .options
        .iter()
        .enumerate()
        .map(|(i, (key, label))| {
            let selected = app.selected.contains(key);
            let marker = match (question.kind, selected) {
                (QuestionKind::Single, true) => "(x)",
                (QuestionKind::Single, false) => "( )",
                (QuestionKind::Multi, true) => "[x]",
                (QuestionKind::Multi, false) => "[ ]",
            };
            let cursor = if i == app.option_cursor { "> " } else { "  " };
            let style = match (i == app.option_cursor, selected) {
                (_, true) => green_bold(),
                (true, false) => bold(),
                (false, false) => Style::default(),
            };
            Line::from(Span::styled(
                format!("{}{} {}. {}", cursor, marker, key, label),
                style,
            ))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), chunks[2]);

    render_status(app, f, chunks[3]);

    let hints = Paragraph::new(Span::styled(
        "(space) select  (left/right) prev/next  (enter) next  (s) submit  (esc) leave quiz",
        dim().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[4]);
}

fn render_confirm_submit(app: &App, f: &mut Frame) {
    let chunks = outer_chunks(
        f.area(),
        &[
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ],
    );

    let title = Paragraph::new(Span::styled("Submit quiz?", bold())).alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let unanswered = app.engine.unanswered_questions();
    let numbers = unanswered
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let warning = Paragraph::new(Span::styled(
        format!(
            "{} unanswered question(s): {}. Unanswered questions score as incorrect.",
            unanswered.len(),
            numbers
        ),
        red_bold(),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(warning, chunks[1]);

    let hints = Paragraph::new(Span::styled(
        "(y/enter) submit anyway  (n/esc) keep going",
        dim().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[2]);
}

fn render_results(app: &App, f: &mut Frame) {
    let Some(result) = &app.result else {
        return;
    };

    let chunks = outer_chunks(
        f.area(),
        &[
            Constraint::Length(2), // title
            Constraint::Length(2), // score
            Constraint::Length(2), // rating
            Constraint::Min(0),
            Constraint::Length(1), // hints
        ],
    );

    let title = Paragraph::new(Span::styled(
        format!("Quiz Results - {}", result.subject.name),
        bold(),
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let score_style = if result.percentage >= 50.0 {
        green_bold()
    } else {
        red_bold()
    };
    let score = Paragraph::new(Span::styled(
        format!(
            "Score: {}/{} ({:.1}%)",
            result.correct_answers, result.total_questions, result.percentage
        ),
        score_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(score, chunks[1]);

    let rating = Paragraph::new(Span::styled(
        result.rating.to_string(),
        bold().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(rating, chunks[2]);

    let hints = Paragraph::new(Span::styled(
        "(v) review answers  (r) retake  (esc) back to subjects",
        dim().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[4]);
}

fn render_review(app: &App, f: &mut Frame) {
    let Some(result) = &app.result else {
        return;
    };
    let Some(entry) = result.question_results.get(app.review_index) else {
        return;
    };

    let area = f.area();
    let wrap_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(10) as usize;
    let prompt_lines = wrap_text(&entry.question.text, wrap_width);

    let chunks = outer_chunks(
        area,
        &[
            Constraint::Length(2),                             // header
            Constraint::Length(prompt_lines.len() as u16 + 1), // prompt
            Constraint::Min(1),                                // options
            Constraint::Length(2),                             // verdict
            Constraint::Length(1),                             // hints
        ],
    );

    let verdict_span = if entry.is_correct {
        Span::styled("correct", green_bold())
    } else {
        Span::styled("incorrect", red_bold())
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "Review {} / {}  -  ",
                app.review_index + 1,
                result.question_results.len()
            ),
            bold(),
        ),
        verdict_span,
    ]));
    f.render_widget(header, chunks[0]);

    let prompt: Vec<Line> = prompt_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l, bold())))
        .collect();
    f.render_widget(Paragraph::new(prompt), chunks[1]);

    f.render_widget(Paragraph::new(review_option_lines(entry)), chunks[2]);

    let verdict = Paragraph::new(Line::from(vec![
        Span::styled("your answer: ", dim()),
        Span::raw(format_keys(&entry.submitted)),
        Span::styled("   correct: ", dim()),
        Span::raw(entry.question.correct_keys().join(", ")),
    ]));
    f.render_widget(verdict, chunks[3]);

    let hints = Paragraph::new(Span::styled(
        "(left/right) prev/next  (r) retake  (b/esc) back to results",
        dim().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[4]);
}

fn review_option_lines(entry: &QuestionResult) -> Vec<Line<'static>> {
    entry
        .question
        .options
        .iter()
        .map(|(key, label)| {
            let is_correct_key = entry.question.correct_keys().contains(key);
            let was_chosen = entry.submitted.contains(key);
            let (marker, style) = match (is_correct_key, was_chosen) {
                (true, true) => ("✓", green_bold()),
                (true, false) => ("✓", green_bold().add_modifier(Modifier::DIM)),
                (false, true) => ("✗", red_bold()),
                (false, false) => (" ", dim()),
            };
            Line::from(Span::styled(format!("  {} {}. {}", marker, key, label), style))
        })
        .collect()
}

fn render_status(app: &App, f: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        let widget = Paragraph::new(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(widget, area);
    }
}
