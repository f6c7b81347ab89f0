use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Frame;

use crate::config::Theme;
use crate::page::search::{Search, Submode};
use crate::types::{Repository, SearchMode, UserSummary};

use super::{spinner, truncate};

pub fn render(frame: &mut Frame, page: &Search, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    render_tabs(frame, page, theme, chunks[0]);
    render_input(frame, page, theme, chunks[1]);
    render_summary(frame, page, theme, chunks[2]);
    render_results(frame, page, theme, chunks[3]);
}

fn render_tabs(frame: &mut Frame, page: &Search, theme: &Theme, area: Rect) {
    let selected = match page.mode {
        SearchMode::Repo => 0,
        SearchMode::User => 1,
    };
    let tabs = Tabs::new(vec![
        SearchMode::Repo.to_string(),
        SearchMode::User.to_string(),
    ])
    .select(selected)
    .style(Style::default().fg(theme.subtle))
    .highlight_style(
        Style::default()
            .fg(theme.highlight)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(tabs, area);
}

fn render_input(frame: &mut Frame, page: &Search, theme: &Theme, area: Rect) {
    let editing = page.submode == Submode::Edit;
    let border = if editing { theme.highlight } else { theme.subtle };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" Search {} ", page.mode));

    let input = Paragraph::new(page.input.value().to_string())
        .style(Style::default().fg(theme.text))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let x = area.x + 1 + page.input.cursor() as u16;
        frame.set_cursor_position(Position::new(
            x.min(area.right().saturating_sub(2)),
            area.y + 1,
        ));
    }
}

fn render_summary(frame: &mut Frame, page: &Search, theme: &Theme, area: Rect) {
    let line = if page.loading {
        Line::from(Span::styled(
            format!("{} Searching...", spinner(page.ticks)),
            Style::default().fg(theme.warning),
        ))
    } else if page.searched() && page.len() > 0 {
        Line::from(Span::styled(
            format!(
                "{} of {} {}",
                page.len(),
                page.total_count,
                page.mode.to_string().to_lowercase()
            ),
            Style::default().fg(theme.subtle),
        ))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_results(frame: &mut Frame, page: &Search, theme: &Theme, area: Rect) {
    if page.loading {
        return;
    }

    if page.len() == 0 {
        let message = if page.searched() {
            "No results found."
        } else {
            "Type a query and press Enter."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(message, Style::default().fg(theme.subtle))),
            area,
        );
        return;
    }

    let width = area.width as usize;
    let range = page.list.visible(page.len());
    let mut lines = Vec::new();
    for idx in range {
        let selected = idx == page.list.cursor;
        match page.mode {
            SearchMode::Repo => {
                lines.extend(repo_card(&page.repos[idx], selected, theme, width))
            }
            SearchMode::User => {
                lines.extend(user_card(&page.users[idx], selected, theme, width))
            }
        }
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn marker(selected: bool, theme: &Theme) -> Span<'static> {
    if selected {
        Span::styled("▌ ", Style::default().fg(theme.highlight))
    } else {
        Span::raw("  ")
    }
}

fn title_style(selected: bool, theme: &Theme) -> Style {
    if selected {
        Style::default()
            .fg(theme.highlight)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    }
}

/// Three rows: name and stars, description, spacer.
pub(crate) fn repo_card(
    repo: &Repository,
    selected: bool,
    theme: &Theme,
    width: usize,
) -> Vec<Line<'static>> {
    let mut about = repo.description.clone().unwrap_or_default();
    if let Some(lang) = &repo.language {
        if !about.is_empty() {
            about.push_str(" · ");
        }
        about.push_str(lang);
    }

    vec![
        Line::from(vec![
            marker(selected, theme),
            Span::styled(
                truncate(&repo.full_name, width.saturating_sub(14)),
                title_style(selected, theme),
            ),
            Span::styled(
                format!("  ★ {}", repo.stars),
                Style::default().fg(theme.warning),
            ),
        ]),
        Line::from(vec![
            marker(selected, theme),
            Span::styled(
                truncate(&about, width.saturating_sub(2)),
                Style::default().fg(theme.subtle),
            ),
        ]),
        Line::from(""),
    ]
}

/// Two rows: login, spacer.
fn user_card(user: &UserSummary, selected: bool, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            marker(selected, theme),
            Span::styled(
                truncate(&format!("@{}", user.login), width.saturating_sub(2)),
                title_style(selected, theme),
            ),
        ]),
        Line::from(""),
    ]
}
