use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};

use crate::action::{Msg, SearchResults, TaskOutcome};
use crate::command::Command;
use crate::config::Config;
use crate::error::RemGitError;
use crate::list_window::{page_size_for, ListWindow};
use crate::page::text_field::TextField;
use crate::page::{self, NavRequest, PageTag, Status};
use crate::progress::CloneState;
use crate::types::{Repository, SearchMode, UserSummary};

/// Rows above the result list: mode tabs, input box, result count.
pub const CHROME_ROWS: u16 = 5;
pub const REPO_ITEM_HEIGHT: u16 = 3;
pub const USER_ITEM_HEIGHT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submode {
    Navigation,
    Edit,
}

#[derive(Debug)]
pub struct Search {
    pub mode: SearchMode,
    pub submode: Submode,
    pub input: TextField,
    pub repos: Vec<Repository>,
    pub users: Vec<UserSummary>,
    pub total_count: u64,
    pub list: ListWindow,
    pub loading: bool,
    pub ticks: usize,
    pub clone: CloneState,
    pub status: Option<Status>,
    pub config: Arc<Config>,
    /// Bumped per dispatched query; only the latest query's results apply
    pub query_seq: u64,
    repos_searched: bool,
    users_searched: bool,
    origin: PageTag,
    body_rows: u16,
}

impl Search {
    pub fn new(origin: PageTag, config: Arc<Config>) -> Self {
        Self {
            mode: SearchMode::Repo,
            submode: Submode::Edit,
            input: TextField::default(),
            repos: Vec::new(),
            users: Vec::new(),
            total_count: 0,
            list: ListWindow::default(),
            loading: false,
            ticks: 0,
            clone: CloneState::default(),
            status: None,
            config,
            query_seq: 0,
            repos_searched: false,
            users_searched: false,
            origin,
            body_rows: 0,
        }
    }

    pub fn len(&self) -> usize {
        match self.mode {
            SearchMode::Repo => self.repos.len(),
            SearchMode::User => self.users.len(),
        }
    }

    /// Whether a search in the current mode has completed.
    pub fn searched(&self) -> bool {
        match self.mode {
            SearchMode::Repo => self.repos_searched,
            SearchMode::User => self.users_searched,
        }
    }

    pub fn item_height(&self) -> u16 {
        match self.mode {
            SearchMode::Repo => REPO_ITEM_HEIGHT,
            SearchMode::User => USER_ITEM_HEIGHT,
        }
    }

    pub fn selected_repo(&self) -> Option<&Repository> {
        match self.mode {
            SearchMode::Repo => self.repos.get(self.list.cursor),
            SearchMode::User => None,
        }
    }

    pub fn selected_user(&self) -> Option<&UserSummary> {
        match self.mode {
            SearchMode::User => self.users.get(self.list.cursor),
            SearchMode::Repo => None,
        }
    }

    pub fn help(&self) -> &'static str {
        match self.submode {
            Submode::Edit => "enter: search  tab: users/repos  esc: results",
            Submode::Navigation => {
                "j/k: move  enter: open  /: edit  tab: mode  c: clone  o: open  y: copy url  n: new  q: home"
            }
        }
    }

    fn relayout(&mut self) {
        let rows = self.body_rows.saturating_sub(CHROME_ROWS);
        let len = self.len();
        self.list.resize(page_size_for(rows, self.item_height()), len);
    }

    fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        self.list.reset();
        self.relayout();
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Key(key) => match self.submode {
                Submode::Edit => self.edit_key(key),
                Submode::Navigation => self.navigation_key(key),
            },
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
            Msg::Task(TaskOutcome::SearchLoaded { seq, mode, result }) => {
                if seq == self.query_seq {
                    self.loaded(mode, result);
                } else {
                    tracing::debug!(seq, latest = self.query_seq, "ignoring superseded search");
                }
                Vec::new()
            }
            Msg::Task(TaskOutcome::CloneProgress { event, stream }) => {
                page::clone_progress(&mut self.clone, event, stream, &mut self.status)
            }
            Msg::Task(other) => {
                tracing::debug!(?other, "search page ignoring result");
                Vec::new()
            }
        }
    }

    fn loaded(&mut self, mode: SearchMode, result: Result<SearchResults, RemGitError>) {
        self.loading = false;
        match result {
            Ok(SearchResults::Repos(found)) => {
                self.repos = found.items;
                self.total_count = found.total_count;
                self.repos_searched = true;
            }
            Ok(SearchResults::Users(found)) => {
                self.users = found.items;
                self.total_count = found.total_count;
                self.users_searched = true;
            }
            Err(e) => {
                self.status = Some(Status::danger(format!("Search failed: {}", e)));
                return;
            }
        }
        if mode == self.mode {
            self.list.reset();
        }
        self.relayout();
    }

    fn edit_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Enter => {
                let query = self.input.value().trim().to_string();
                if query.is_empty() {
                    self.status = Some(Status::warning("Type something to search for"));
                    return Vec::new();
                }
                self.submode = Submode::Navigation;
                self.loading = true;
                self.status = None;
                self.query_seq += 1;
                tracing::debug!(%query, mode = %self.mode, seq = self.query_seq, "dispatching search");
                vec![Command::Search {
                    seq: self.query_seq,
                    mode: self.mode,
                    query,
                }]
            }
            KeyCode::Esc => {
                self.submode = Submode::Navigation;
                Vec::new()
            }
            KeyCode::Tab => {
                self.toggle_mode();
                Vec::new()
            }
            _ => {
                self.input.handle_key(key);
                Vec::new()
            }
        }
    }

    fn navigation_key(&mut self, key: KeyEvent) -> Vec<Command> {
        let len = self.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list.move_cursor(1, len);
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list.move_cursor(-1, len);
                Vec::new()
            }
            KeyCode::Char('i') | KeyCode::Char('/') => {
                self.submode = Submode::Edit;
                Vec::new()
            }
            KeyCode::Tab => {
                self.toggle_mode();
                Vec::new()
            }
            KeyCode::Enter => {
                if let Some(repo) = self.selected_repo() {
                    vec![Command::Navigate(NavRequest::repo(repo, PageTag::Search))]
                } else if let Some(user) = self.selected_user() {
                    vec![Command::Navigate(NavRequest::user(user, PageTag::Search))]
                } else {
                    Vec::new()
                }
            }
            KeyCode::Char('c') => match self.selected_repo().cloned() {
                Some(repo) => {
                    page::start_clone(&mut self.clone, &repo, &self.config, &mut self.status)
                }
                None => Vec::new(),
            },
            KeyCode::Char('o') => {
                if let Some(repo) = self.selected_repo() {
                    vec![page::open_in_browser(repo)]
                } else if let Some(user) = self.selected_user() {
                    vec![Command::OpenUrl(user.html_url.clone())]
                } else {
                    Vec::new()
                }
            }
            KeyCode::Char('y') => self
                .selected_repo()
                .map(page::copy_clone_url)
                .into_iter()
                .collect(),
            KeyCode::Char('n') => vec![Command::Navigate(NavRequest::to(
                PageTag::CreateRepo,
                PageTag::Search,
            ))],
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.origin == PageTag::Home {
                    vec![Command::Navigate(NavRequest::back(
                        PageTag::Home,
                        PageTag::Search,
                    ))]
                } else {
                    vec![Command::Quit]
                }
            }
            _ => Vec::new(),
        }
    }
}
