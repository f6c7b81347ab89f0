use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::config::Theme;
use crate::page::user_detail::UserDetail;

use super::search::repo_card;
use super::spinner;

pub fn render(frame: &mut Frame, page: &UserDetail, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    let mut heading = vec![Span::styled(
        format!("@{}", page.user.login),
        Style::default()
            .fg(theme.highlight)
            .add_modifier(Modifier::BOLD),
    )];
    if page.loading {
        heading.push(Span::styled(
            format!("  {} loading repositories", spinner(page.ticks)),
            Style::default().fg(theme.warning),
        ));
    } else {
        heading.push(Span::styled(
            format!("  {} repositories", page.repos.len()),
            Style::default().fg(theme.subtle),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(heading)), chunks[0]);

    if page.loading {
        return;
    }
    if page.repos.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No public repositories.",
                Style::default().fg(theme.subtle),
            )),
            chunks[1],
        );
        return;
    }

    let width = chunks[1].width as usize;
    let lines: Vec<Line> = page
        .list
        .visible(page.repos.len())
        .flat_map(|idx| repo_card(&page.repos[idx], idx == page.list.cursor, theme, width))
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[1]);
}
