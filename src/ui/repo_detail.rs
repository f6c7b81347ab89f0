use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::config::Theme;
use crate::page::repo_detail::{RepoDetail, Stage, HEADER_ROWS};
use crate::types::Repository;

const MAX_TOPICS: usize = 5;

pub fn render(frame: &mut Frame, page: &RepoDetail, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HEADER_ROWS), Constraint::Min(0)])
        .split(area);

    render_card(frame, &page.repo, &page.stage, theme, chunks[0]);
    render_readme(frame, page, theme, chunks[1]);
}

fn label(text: &'static str, theme: &Theme) -> Span<'static> {
    Span::styled(text, Style::default().fg(theme.subtle))
}

fn value(text: String, theme: &Theme) -> Span<'static> {
    Span::styled(text, Style::default().fg(theme.text))
}

fn size_label(kb: u64) -> String {
    if kb >= 1024 * 1024 {
        format!("{:.1} GB", kb as f64 / (1024.0 * 1024.0))
    } else if kb >= 1024 {
        format!("{:.1} MB", kb as f64 / 1024.0)
    } else {
        format!("{} KB", kb)
    }
}

fn stage_label(stage: &Stage) -> String {
    match stage {
        Stage::LoadingReadme => " README (loading) ".to_string(),
        Stage::Rendering | Stage::ExtractingImages => " README (rendering) ".to_string(),
        Stage::FetchingImages(n) => format!(" README ({} images pending) ", n),
        Stage::Merging => " README (placing images) ".to_string(),
        Stage::Ready | Stage::Failed(_) => " README ".to_string(),
    }
}

fn render_card(frame: &mut Frame, repo: &Repository, stage: &Stage, theme: &Theme, area: Rect) {
    let visibility = if repo.private { "Private" } else { "Public" };
    let mut title = vec![
        Span::styled(
            repo.full_name.clone(),
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", visibility),
            Style::default().fg(if repo.private {
                theme.warning
            } else {
                theme.special
            }),
        ),
    ];
    if let Some(lang) = &repo.language {
        title.push(Span::raw("  "));
        title.push(value(lang.clone(), theme));
    }

    let topics = if repo.topics.is_empty() {
        Span::raw("")
    } else {
        Span::styled(
            repo.topics
                .iter()
                .take(MAX_TOPICS)
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" "),
            Style::default().fg(theme.special),
        )
    };

    let lines = vec![
        Line::from(title),
        Line::from(value(
            repo.description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            theme,
        )),
        Line::from(topics),
        Line::from(vec![
            Span::styled(format!("★ {}", repo.stars), Style::default().fg(theme.warning)),
            label("  forks ", theme),
            value(repo.forks.to_string(), theme),
            label("  issues ", theme),
            value(repo.open_issues.to_string(), theme),
            label("  watchers ", theme),
            value(repo.watchers.to_string(), theme),
            label("  size ", theme),
            value(size_label(repo.size_kb), theme),
        ]),
        Line::from(vec![
            label("created ", theme),
            value(repo.created_at.format("%Y-%m-%d").to_string(), theme),
            label("  updated ", theme),
            value(repo.updated_at.format("%Y-%m-%d").to_string(), theme),
            label("  branch ", theme),
            value(repo.default_branch.clone(), theme),
        ]),
        Line::from(vec![label("clone ", theme), value(repo.clone_url.clone(), theme)]),
    ];

    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.subtle))
            .title_bottom(Span::styled(
                stage_label(stage),
                Style::default().fg(theme.subtle),
            )),
    );
    frame.render_widget(card, area);
}

fn render_readme(frame: &mut Frame, page: &RepoDetail, theme: &Theme, area: Rect) {
    match &page.stage {
        Stage::LoadingReadme => {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "Loading README...",
                    Style::default().fg(theme.subtle),
                )),
                area,
            );
        }
        Stage::Failed(message) => {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    message.clone(),
                    Style::default().fg(theme.danger),
                ))
                .wrap(Wrap { trim: false }),
                area,
            );
        }
        _ => {
            let rows = area.height as usize;
            let start = page.scroll.min(page.content.len());
            let end = (start + rows).min(page.content.len());
            frame.render_widget(Paragraph::new(page.content[start..end].to_vec()), area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_scale_units() {
        assert_eq!(size_label(512), "512 KB");
        assert_eq!(size_label(2048), "2.0 MB");
        assert_eq!(size_label(3 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn stage_label_counts_pending_images() {
        assert_eq!(
            stage_label(&Stage::FetchingImages(2)),
            " README (2 images pending) "
        );
    }
}
