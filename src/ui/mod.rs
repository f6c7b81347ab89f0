mod create_repo;
mod home;
mod repo_detail;
mod search;
mod user_detail;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::config::Theme;
use crate::page::{Page, Status, Tone};
use crate::progress::CloneState;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let theme = &app.config.theme;
    render_header(frame, app, chunks[0]);

    match &app.page {
        Page::Home(_) => home::render(frame, theme, chunks[1]),
        Page::Search(page) => search::render(frame, page, theme, chunks[1]),
        Page::RepoDetail(page) => repo_detail::render(frame, page, theme, chunks[1]),
        Page::UserDetail(page) => user_detail::render(frame, page, theme, chunks[1]),
        Page::CreateRepo(page) => create_repo::render(frame, page, theme, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.page {
        Page::RepoDetail(page) => format!("remgit - {}", page.repo.full_name),
        Page::UserDetail(page) => format!("remgit - @{}", page.user.login),
        page => format!("remgit - {}", page.tag().title()),
    };

    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(app.config.theme.highlight)
            .add_modifier(Modifier::BOLD),
    )];
    if app.nav.origin != app.nav.active {
        spans.push(Span::styled(
            format!("  (from {})", app.nav.origin.title()),
            Style::default().fg(app.config.theme.text),
        ));
    }

    let header =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(app.config.theme.subtle));

    frame.render_widget(header, area);
}

fn clone_state(page: &Page) -> Option<&CloneState> {
    match page {
        Page::Search(page) => Some(&page.clone),
        Page::RepoDetail(page) => Some(&page.clone),
        _ => None,
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.config.theme;

    if let Some(clone) = clone_state(&app.page).filter(|c| c.active) {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(theme.special).bg(theme.subtle))
            .ratio(clone.progress.clamp(0.0, 1.0))
            .label(format!("Cloning {:.0}%", clone.progress * 100.0));
        frame.render_widget(gauge, area);
        return;
    }

    let line = match app.page.status() {
        Some(status) => status_line(status, theme),
        None => Line::from(Span::styled(
            app.page.help(),
            Style::default().fg(theme.text),
        )),
    };

    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(theme.subtle)),
        area,
    );
}

pub(crate) fn tone_color(tone: Tone, theme: &Theme) -> ratatui::style::Color {
    match tone {
        Tone::Info => theme.text,
        Tone::Success => theme.special,
        Tone::Warning => theme.warning,
        Tone::Danger => theme.danger,
    }
}

fn status_line(status: &Status, theme: &Theme) -> Line<'static> {
    let prefix = match status.tone {
        Tone::Danger => "Error: ",
        _ => "",
    };
    Line::from(Span::styled(
        format!("{}{}", prefix, status.text),
        Style::default().fg(tone_color(status.tone, theme)),
    ))
}

pub(crate) fn spinner(ticks: usize) -> &'static str {
    SPINNER[ticks % SPINNER.len()]
}

/// Centered rect of at most `width` x `height` inside `outer`.
pub(crate) fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height.saturating_sub(popup_height)) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .split(outer);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width.saturating_sub(popup_width)) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}

/// Shorten `text` to `max` characters, marking the cut with "...".
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", keep)
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::testing::draw;
    use super::*;
    use crate::action::{Action, SearchResults, TaskOutcome};
    use crate::config::Config;
    use crate::forge::fake::FakeForge;
    use crate::types::{sample_repo, SearchMode, SearchPage};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn app(config: Config) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(FakeForge::default()), Arc::new(config), tx).unwrap();
        app.update(Action::Resize {
            width: 80,
            height: 24,
        })
        .unwrap();
        app
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long repository name", 10), "a long ...");
    }

    #[test]
    fn spinner_cycles() {
        assert_eq!(spinner(0), spinner(SPINNER.len()));
    }

    #[tokio::test]
    async fn home_shows_menu_and_help() {
        let app = app(Config::default());
        let screen = draw(&app, 80, 24);
        assert!(screen.contains("remgit - Home"));
        assert!(screen.contains("Search GitHub"));
        assert!(screen.contains("s: search"));
    }

    #[tokio::test]
    async fn empty_search_renders_no_results() {
        let mut app = app(Config {
            show_home: false,
            ..Config::default()
        });
        let id = app.page_id;
        for c in "foo".chars() {
            app.update(Action::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
                .unwrap();
        }
        app.update(Action::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
            .unwrap();
        app.update(Action::Task {
            page: id,
            outcome: TaskOutcome::SearchLoaded {
                seq: 1,
                mode: SearchMode::Repo,
                result: Ok(SearchResults::Repos(SearchPage::default())),
            },
        })
        .unwrap();

        let screen = draw(&app, 80, 24);
        assert!(screen.contains("No results found."));
        match &app.page {
            Page::Search(search) => assert_eq!(search.list.cursor, 0),
            _ => panic!("expected search page"),
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        app.update(Action::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    #[tokio::test]
    async fn long_readme_paragraph_wraps_on_screen() {
        let mut app = app(Config {
            show_home: false,
            ..Config::default()
        });
        app.update(Action::Resize {
            width: 80,
            height: 30,
        })
        .unwrap();
        for c in "demo".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        let search_id = app.page_id;
        app.update(Action::Task {
            page: search_id,
            outcome: TaskOutcome::SearchLoaded {
                seq: 1,
                mode: SearchMode::Repo,
                result: Ok(SearchResults::Repos(SearchPage {
                    items: vec![sample_repo("o", "demo")],
                    total_count: 1,
                })),
            },
        })
        .unwrap();
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.page, Page::RepoDetail(_)));

        let detail_id = app.page_id;
        let readme = format!("{}ENDWORD", "lorem ipsum ".repeat(15));
        for outcome in [
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Ok(readme),
            },
            TaskOutcome::ImageReferences {
                generation: 1,
                references: Vec::new(),
            },
        ] {
            app.update(Action::Task {
                page: detail_id,
                outcome,
            })
            .unwrap();
        }

        let screen = draw(&app, 80, 30);
        assert!(screen.contains("ENDWORD"));
    }

    #[tokio::test]
    async fn config_issue_is_shown_in_status_bar() {
        let app = app(Config::parse("Nonsense line\n"));
        let screen = draw(&app, 80, 24);
        assert!(screen.contains("config line 1"));
    }
}
