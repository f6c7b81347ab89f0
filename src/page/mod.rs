//! Screens of the application. Exactly one `Page` is active at a time; the
//! `App` owns it, feeds it messages and executes the commands it returns.

pub mod create_repo;
pub mod home;
pub mod repo_detail;
pub mod search;
pub mod text_field;
pub mod user_detail;

use std::path::PathBuf;
use std::sync::Arc;

use crate::action::{Msg, TaskOutcome};
use crate::command::Command;
use crate::config::Config;
use crate::error::{RemGitError, Result};
use crate::progress::{CloneEvent, CloneState, CloneStep, ProgressStream};
use crate::types::{Repository, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageTag {
    Home,
    Search,
    RepoDetail,
    UserDetail,
    CreateRepo,
}

impl PageTag {
    pub fn title(self) -> &'static str {
        match self {
            PageTag::Home => "Home",
            PageTag::Search => "Search",
            PageTag::RepoDetail => "Repository",
            PageTag::UserDetail => "User",
            PageTag::CreateRepo => "New repository",
        }
    }

    /// List pages are parked instead of dropped when navigated away from.
    pub fn is_retained(self) -> bool {
        matches!(self, PageTag::Search | PageTag::UserDetail)
    }
}

/// Data a page is seeded from.
#[derive(Debug, Clone)]
pub enum Payload {
    None,
    Repo(Box<Repository>),
    User(UserSummary),
    /// Restore the retained instance of the target, if any
    Return,
}

#[derive(Debug, Clone)]
pub struct NavRequest {
    pub target: PageTag,
    pub origin: PageTag,
    pub payload: Payload,
}

impl NavRequest {
    pub fn to(target: PageTag, origin: PageTag) -> Self {
        Self {
            target,
            origin,
            payload: Payload::None,
        }
    }

    pub fn back(target: PageTag, origin: PageTag) -> Self {
        Self {
            target,
            origin,
            payload: Payload::Return,
        }
    }

    pub fn repo(repo: &Repository, origin: PageTag) -> Self {
        Self {
            target: PageTag::RepoDetail,
            origin,
            payload: Payload::Repo(Box::new(repo.clone())),
        }
    }

    pub fn user(user: &UserSummary, origin: PageTag) -> Self {
        Self {
            target: PageTag::UserDetail,
            origin,
            payload: Payload::User(user.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Danger,
}

/// One line of feedback shown under the page body.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub text: String,
    pub tone: Tone,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Success,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Warning,
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Danger,
        }
    }
}

#[derive(Debug)]
pub enum Page {
    Home(home::Home),
    Search(search::Search),
    RepoDetail(repo_detail::RepoDetail),
    UserDetail(user_detail::UserDetail),
    CreateRepo(create_repo::CreateRepo),
}

impl Page {
    /// Construct a fresh page for `request`. A payload that cannot seed the
    /// target is a programming error.
    pub fn build(request: NavRequest, config: &Arc<Config>) -> Result<Page> {
        let NavRequest {
            target,
            origin,
            payload,
        } = request;
        let config = Arc::clone(config);

        match (target, payload) {
            (PageTag::Home, _) => Ok(Page::Home(home::Home::default())),
            (PageTag::Search, Payload::None | Payload::Return) => {
                Ok(Page::Search(search::Search::new(origin, config)))
            }
            (PageTag::CreateRepo, Payload::None | Payload::Return) => {
                Ok(Page::CreateRepo(create_repo::CreateRepo::new(origin, config)))
            }
            (PageTag::RepoDetail, Payload::Repo(repo)) => Ok(Page::RepoDetail(
                repo_detail::RepoDetail::new(*repo, origin, config),
            )),
            (PageTag::UserDetail, Payload::User(user)) => Ok(Page::UserDetail(
                user_detail::UserDetail::new(user, origin, config),
            )),
            (target, payload) => Err(RemGitError::Navigation(format!(
                "{:?} cannot be built from {:?}",
                target, payload
            ))),
        }
    }

    pub fn tag(&self) -> PageTag {
        match self {
            Page::Home(_) => PageTag::Home,
            Page::Search(_) => PageTag::Search,
            Page::RepoDetail(_) => PageTag::RepoDetail,
            Page::UserDetail(_) => PageTag::UserDetail,
            Page::CreateRepo(_) => PageTag::CreateRepo,
        }
    }

    /// Commands to run right after construction.
    pub fn init(&mut self) -> Vec<Command> {
        match self {
            Page::Home(_) | Page::Search(_) | Page::CreateRepo(_) => Vec::new(),
            Page::RepoDetail(page) => page.init(),
            Page::UserDetail(page) => page.init(),
        }
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        if let Msg::Task(TaskOutcome::Notice { message, failed }) = msg {
            *self.status_mut() = Some(if failed {
                Status::warning(message)
            } else {
                Status::info(message)
            });
            return Vec::new();
        }

        match self {
            Page::Home(page) => page.update(msg),
            Page::Search(page) => page.update(msg),
            Page::RepoDetail(page) => page.update(msg),
            Page::UserDetail(page) => page.update(msg),
            Page::CreateRepo(page) => page.update(msg),
        }
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            Page::Home(page) => page.status.as_ref(),
            Page::Search(page) => page.status.as_ref(),
            Page::RepoDetail(page) => page.status.as_ref(),
            Page::UserDetail(page) => page.status.as_ref(),
            Page::CreateRepo(page) => page.status.as_ref(),
        }
    }

    pub fn status_mut(&mut self) -> &mut Option<Status> {
        match self {
            Page::Home(page) => &mut page.status,
            Page::Search(page) => &mut page.status,
            Page::RepoDetail(page) => &mut page.status,
            Page::UserDetail(page) => &mut page.status,
            Page::CreateRepo(page) => &mut page.status,
        }
    }

    /// Key hints for the status bar.
    pub fn help(&self) -> &'static str {
        match self {
            Page::Home(_) => "s: search  n: new repository  q: quit",
            Page::Search(page) => page.help(),
            Page::RepoDetail(_) => {
                "j/k: scroll  d/u: half page  r: reload  c: clone  o: open  y: copy url  esc: back"
            }
            Page::UserDetail(_) => "j/k: move  enter: open  esc: back",
            Page::CreateRepo(page) => page.help(),
        }
    }
}

fn clone_destination(config: &Config, repo: &Repository) -> PathBuf {
    config.clone_dir.join(&repo.name)
}

/// Begin cloning `repo` unless a clone is already running for this page.
pub(crate) fn start_clone(
    clone: &mut CloneState,
    repo: &Repository,
    config: &Config,
    status: &mut Option<Status>,
) -> Vec<Command> {
    let dest = clone_destination(config, repo);
    if !clone.begin(dest.clone()) {
        tracing::debug!(repo = %repo.full_name, "clone already running, ignoring");
        return Vec::new();
    }

    tracing::info!(repo = %repo.full_name, dest = %dest.display(), "starting clone");
    *status = Some(Status::info(format!("Cloning {}...", repo.full_name)));
    vec![Command::StartClone {
        url: repo.clone_url.clone(),
        dest,
    }]
}

/// Fold one progress item into `clone` and re-subscribe while it runs.
pub(crate) fn clone_progress(
    clone: &mut CloneState,
    event: Option<CloneEvent>,
    stream: ProgressStream,
    status: &mut Option<Status>,
) -> Vec<Command> {
    match clone.apply(event) {
        CloneStep::Continue => vec![Command::NextCloneProgress { stream }],
        CloneStep::Completed(dest) => {
            *status = Some(Status::success(format!("Cloned into {}", dest.display())));
            Vec::new()
        }
        CloneStep::Failed(reason) => {
            tracing::error!(%reason, "clone failed");
            *status = Some(Status::danger(format!("Clone failed: {}", reason)));
            Vec::new()
        }
        CloneStep::Ignored => Vec::new(),
    }
}

pub(crate) fn open_in_browser(repo: &Repository) -> Command {
    Command::OpenUrl(repo.html_url.clone())
}

pub(crate) fn copy_clone_url(repo: &Repository) -> Command {
    Command::CopyText(repo.clone_url.clone())
}
