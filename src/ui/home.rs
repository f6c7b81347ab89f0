use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::config::Theme;

use super::centered_rect;

const LOGO: [&str; 5] = [
    "                           _ _   ",
    " _ __ ___ _ __ ___   __ _(_) |_ ",
    "| '__/ _ \\ '_ ` _ \\ / _` | | __|",
    "| | |  __/ | | | | | (_| | | |_ ",
    "|_|  \\___|_| |_| |_|\\__, |_|\\__|",
];

pub fn render(frame: &mut Frame, theme: &Theme, area: Rect) {
    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|row| Line::from(Span::styled(*row, Style::default().fg(theme.highlight))))
        .collect();
    lines.push(Line::from(Span::styled(
        "                    |___/        ",
        Style::default().fg(theme.highlight),
    )));
    lines.push(Line::from(""));

    let entry = |key: &'static str, label: &'static str| {
        Line::from(vec![
            Span::styled(
                format!("[{}] ", key),
                Style::default()
                    .fg(theme.special)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(label, Style::default().fg(theme.text)),
        ])
    };
    lines.push(entry("s", "Search GitHub"));
    lines.push(entry("n", "Create a repository"));
    lines.push(entry("q", "Quit"));

    let height = lines.len() as u16 + 2;
    let card = centered_rect(44, height, area);
    let menu = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.subtle)),
        );

    frame.render_widget(menu, card);
}
