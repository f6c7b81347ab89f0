use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::config::Theme;
use crate::page::create_repo::{CreateRepo, Field};

use super::centered_rect;

const LABEL_WIDTH: usize = 13;

pub fn render(frame: &mut Frame, page: &CreateRepo, theme: &Theme, area: Rect) {
    let form = centered_rect(60, Field::ALL.len() as u16 + 4, area);
    let mut lines = Vec::with_capacity(Field::ALL.len() + 1);
    let mut cursor = None;

    for (row, field) in Field::ALL.iter().copied().enumerate() {
        let focused = page.focus == field;
        let label_style = if focused {
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.subtle)
        };
        let pointer = if focused { "> " } else { "  " };

        let line = match field {
            Field::Name | Field::Description => {
                let input = if field == Field::Name {
                    &page.name
                } else {
                    &page.description
                };
                if focused && page.editing {
                    // +1 for the border
                    let x = form.x + 1 + (2 + LABEL_WIDTH + input.cursor()) as u16;
                    cursor = Some(Position::new(x, form.y + 1 + row as u16));
                }
                Line::from(vec![
                    Span::styled(pointer, label_style),
                    Span::styled(format!("{:<LABEL_WIDTH$}", field.label()), label_style),
                    Span::styled(input.value().to_string(), Style::default().fg(theme.text)),
                ])
            }
            Field::Submit => {
                let style = if page.submitting {
                    Style::default().fg(theme.subtle)
                } else {
                    label_style
                };
                Line::from(vec![
                    Span::styled(pointer, label_style),
                    Span::styled(format!("[ {} ]", field.label()), style),
                ])
            }
            toggle => {
                let on = page.toggle_value(toggle).unwrap_or(false);
                Line::from(vec![
                    Span::styled(pointer, label_style),
                    Span::styled(format!("{:<LABEL_WIDTH$}", toggle.label()), label_style),
                    Span::styled(
                        if on { "[x]" } else { "[ ]" },
                        Style::default().fg(if on { theme.special } else { theme.subtle }),
                    ),
                ])
            }
        };
        lines.push(line);
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.subtle))
            .title(" New repository "),
    );
    frame.render_widget(widget, form);

    if let Some(position) = cursor {
        frame.set_cursor_position(position);
    }
}
