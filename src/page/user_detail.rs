use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use crate::action::{Msg, TaskOutcome};
use crate::command::Command;
use crate::config::Config;
use crate::list_window::{page_size_for, ListWindow};
use crate::page::{NavRequest, PageTag, Status};
use crate::types::{Repository, UserSummary};

pub const CHROME_ROWS: u16 = 2;
pub const ITEM_HEIGHT: u16 = 3;

/// Read-only list of one user's repositories.
#[derive(Debug)]
pub struct UserDetail {
    pub user: UserSummary,
    pub repos: Vec<Repository>,
    pub list: ListWindow,
    pub loading: bool,
    pub ticks: usize,
    pub status: Option<Status>,
    pub config: Arc<Config>,
    origin: PageTag,
    body_rows: u16,
}

impl UserDetail {
    pub fn new(user: UserSummary, origin: PageTag, config: Arc<Config>) -> Self {
        Self {
            user,
            repos: Vec::new(),
            list: ListWindow::default(),
            loading: false,
            ticks: 0,
            status: None,
            config,
            origin,
            body_rows: 0,
        }
    }

    pub fn init(&mut self) -> Vec<Command> {
        self.loading = true;
        vec![Command::FetchUserRepos {
            login: self.user.login.clone(),
        }]
    }

    fn relayout(&mut self) {
        let rows = self.body_rows.saturating_sub(CHROME_ROWS);
        self.list
            .resize(page_size_for(rows, ITEM_HEIGHT), self.repos.len());
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Key(key) => self.key(key),
            Msg::Resize { height, .. } => {
                self.body_rows = height;
                self.relayout();
                Vec::new()
            }
            Msg::Tick => {
                if self.loading {
                    self.ticks = self.ticks.wrapping_add(1);
                }
                Vec::new()
            }
            Msg::Task(TaskOutcome::UserReposLoaded { login, result }) if login == self.user.login => {
                self.loading = false;
                match result {
                    Ok(repos) => {
                        self.repos = repos;
                        self.list.reset();
                        self.relayout();
                    }
                    Err(e) => {
                        self.status = Some(Status::danger(format!(
                            "Could not list repositories for {}: {}",
                            login, e
                        )));
                    }
                }
                Vec::new()
            }
            Msg::Task(other) => {
                tracing::debug!(?other, "user page ignoring result");
                Vec::new()
            }
        }
    }

    fn key(&mut self, key: KeyEvent) -> Vec<Command> {
        let len = self.repos.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.list.move_cursor(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.list.move_cursor(-1, len),
            KeyCode::Enter => {
                if let Some(repo) = self.repos.get(self.list.cursor) {
                    return vec![Command::Navigate(NavRequest::repo(
                        repo,
                        PageTag::UserDetail,
                    ))];
                }
            }
            KeyCode::Backspace | KeyCode::Esc | KeyCode::Char('q') => {
                return vec![Command::Navigate(NavRequest::back(
                    self.origin,
                    PageTag::UserDetail,
                ))];
            }
            _ => {}
        }
        Vec::new()
    }
}
