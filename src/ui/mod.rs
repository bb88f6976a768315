pub mod table;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

/// What one live redraw shows.
#[derive(Debug, Clone)]
pub struct LiveView<'a> {
    pub iteration: i64,
    pub lines: &'a [String],
    pub spinner: char,
}

pub fn draw(frame: &mut Frame, view: &LiveView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(
            format!(" droidmon  Iteration: {} ", view.iteration),
            Style::default().add_modifier(Modifier::BOLD),
        ));

    let mut text = vec![Line::from(Span::styled(
        table::header_line(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if view.lines.is_empty() {
        text.push(Line::from("Collecting baseline sample..."));
    } else {
        text.extend(view.lines.iter().map(|line| Line::from(line.as_str())));
    }
    frame.render_widget(Paragraph::new(text).block(block), chunks[0]);

    let status = Line::from(format!(" Press q or Ctrl+C to stop... {}", view.spinner));
    frame.render_widget(Paragraph::new(status), chunks[1]);
}
