use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::action::{Action, Msg, PageId, TaskOutcome};
use crate::command::{Command, Executor};
use crate::config::Config;
use crate::error::Result;
use crate::event::Event;
use crate::forge::Forge;
use crate::page::{NavRequest, Page, PageTag, Payload, Status};

/// Rows of chrome around every page body: header and status bar.
pub const FRAME_ROWS: u16 = 2;

/// Which page is showing and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub active: PageTag,
    pub origin: PageTag,
}

/// Navigation controller. Owns the active page, routes every message to it
/// and turns the commands it returns into navigation or background work.
pub struct App {
    pub page: Page,
    pub page_id: PageId,
    pub nav: NavigationState,
    pub config: Arc<Config>,
    pub should_quit: bool,
    retained: HashMap<PageTag, (PageId, Page)>,
    next_id: PageId,
    body: (u16, u16),
    executor: Executor,
}

impl App {
    pub fn new(
        forge: Arc<dyn Forge>,
        config: Arc<Config>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Result<Self> {
        let start = if config.show_home {
            PageTag::Home
        } else {
            PageTag::Search
        };
        let mut page = Page::build(NavRequest::to(start, start), &config)?;

        if let Some(issue) = config.issues.first() {
            *page.status_mut() = Some(Status::warning(issue.to_string()));
        }

        let mut app = Self {
            page,
            page_id: 1,
            nav: NavigationState {
                active: start,
                origin: start,
            },
            executor: Executor::new(forge, Arc::clone(&config), action_tx),
            config,
            should_quit: false,
            retained: HashMap::new(),
            next_id: 2,
            body: (0, 0),
        };
        let commands = app.page.init();
        app.run_commands(app.page_id, commands)?;
        Ok(app)
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Key(key) => Action::Key(key),
            Event::Resize(width, height) => Action::Resize { width, height },
            Event::Tick => Action::Tick,
            Event::Init | Event::Render => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Key(key) => self.forward(Msg::Key(key))?,
            Action::Resize { width, height } => {
                self.body = (width, height.saturating_sub(FRAME_ROWS));
                let resize = self.resize_msg();
                self.forward(resize)?;
            }
            Action::Tick => self.forward(Msg::Tick)?,
            Action::Task { page, outcome } => {
                if page == self.page_id {
                    self.forward(Msg::Task(outcome))?;
                } else if let Some(tag) = self.retained_tag(page) {
                    self.deliver_retained(tag, Msg::Task(outcome));
                } else if let TaskOutcome::CloneProgress { event, stream } = outcome {
                    // The clone outlives its page
                    tracing::debug!(page, "clone page gone, detaching its stream");
                    self.executor.detach_clone(event, stream);
                } else {
                    tracing::debug!(page, active = self.page_id, "dropping stale result");
                }
            }
            Action::Notice { message, failed } => {
                self.forward(Msg::Task(TaskOutcome::Notice { message, failed }))?
            }
            Action::None => {}
        }
        Ok(())
    }

    /// Cancel background work that outlives the UI.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }

    pub fn retained_pages(&self) -> impl Iterator<Item = PageTag> + '_ {
        self.retained.keys().copied()
    }

    fn resize_msg(&self) -> Msg {
        Msg::Resize {
            width: self.body.0,
            height: self.body.1,
        }
    }

    fn forward(&mut self, msg: Msg) -> Result<()> {
        let commands = self.page.update(msg);
        self.run_commands(self.page_id, commands)
    }

    fn retained_tag(&self, id: PageId) -> Option<PageTag> {
        self.retained
            .iter()
            .find(|(_, (page_id, _))| *page_id == id)
            .map(|(tag, _)| *tag)
    }

    /// Results for a parked page still update it; it just cannot navigate.
    fn deliver_retained(&mut self, tag: PageTag, msg: Msg) {
        let Some((id, page)) = self.retained.get_mut(&tag) else {
            return;
        };
        let id = *id;
        for command in page.update(msg) {
            match command {
                Command::Navigate(_) | Command::Quit => {
                    tracing::debug!(?tag, "parked page tried to navigate");
                }
                other => self.executor.dispatch(id, other),
            }
        }
    }

    fn run_commands(&mut self, issuer: PageId, commands: Vec<Command>) -> Result<()> {
        for command in commands {
            match command {
                Command::Quit => self.should_quit = true,
                Command::Navigate(request) => self.navigate(request)?,
                other => self.executor.dispatch(issuer, other),
            }
        }
        Ok(())
    }

    fn navigate(&mut self, request: NavRequest) -> Result<()> {
        let target = request.target;
        let origin = request.origin;
        let restore = matches!(request.payload, Payload::Return);

        let (id, page, fresh) = match self.retained.remove(&target) {
            Some((id, page)) if restore => (id, page, false),
            _ => {
                let page = Page::build(request, &self.config)?;
                let id = self.next_id;
                self.next_id += 1;
                (id, page, true)
            }
        };

        let leaving = self.page.tag();
        let old_id = self.page_id;
        let old = std::mem::replace(&mut self.page, page);
        self.page_id = id;

        if target == PageTag::Home {
            self.retained.clear();
        } else if leaving.is_retained() && leaving != target {
            self.retained.insert(leaving, (old_id, old));
        }

        self.nav = NavigationState {
            active: target,
            origin,
        };
        tracing::info!(from = ?leaving, to = ?target, id, restored = !fresh, "navigate");

        let mut commands = Vec::new();
        if fresh {
            commands.extend(self.page.init());
        }
        let resize = self.resize_msg();
        commands.extend(self.page.update(resize));
        self.run_commands(id, commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SearchResults;
    use crate::error::RemGitError;
    use crate::forge::fake::FakeForge;
    use crate::page::search::Submode;
    use crate::page::Tone;
    use crate::progress::{CloneEvent, ProgressStream};
    use crate::types::{sample_repo, SearchMode, SearchPage};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn app_with(config: Config) -> (App, mpsc::UnboundedReceiver<Action>) {
        let forge = FakeForge {
            repos: (0..6).map(|i| sample_repo("o", &format!("repo{}", i))).collect(),
            ..Default::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(forge), Arc::new(config), tx).unwrap();
        app.update(Action::Resize {
            width: 100,
            height: 40,
        })
        .unwrap();
        (app, rx)
    }

    fn key(app: &mut App, code: KeyCode) {
        app.update(Action::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn typed(app: &mut App, text: &str) {
        for c in text.chars() {
            key(app, KeyCode::Char(c));
        }
    }

    /// Pump task results until one for the active page has been applied.
    async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Action>) {
        while let Some(action) = rx.recv().await {
            let mine = matches!(&action, Action::Task { page, .. } if *page == app.page_id);
            app.update(action).unwrap();
            if mine {
                break;
            }
        }
    }

    #[tokio::test]
    async fn starts_on_home_or_search() {
        let (app, _rx) = app_with(Config::default());
        assert_eq!(app.page.tag(), PageTag::Home);

        let (app, _rx) = app_with(Config {
            show_home: false,
            ..Config::default()
        });
        assert_eq!(app.page.tag(), PageTag::Search);
    }

    #[tokio::test]
    async fn first_config_issue_shows_on_start_page() {
        let config = Config::parse("Bogus=1\nImgwidth=wide\n");
        let (app, _rx) = app_with(config);
        let status = app.page.status().unwrap();
        assert_eq!(status.tone, Tone::Warning);
        assert!(status.text.contains("line 1"));
    }

    #[tokio::test]
    async fn quit_from_home() {
        let (mut app, _rx) = app_with(Config::default());
        key(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn home_search_detail_and_back_restores_search() {
        let (mut app, mut rx) = app_with(Config::default());

        key(&mut app, KeyCode::Char('s'));
        assert_eq!(app.page.tag(), PageTag::Search);
        let search_id = app.page_id;

        typed(&mut app, "repo");
        key(&mut app, KeyCode::Enter);
        settle(&mut app, &mut rx).await;

        key(&mut app, KeyCode::Char('j'));
        key(&mut app, KeyCode::Char('j'));
        let (count, cursor) = match &app.page {
            Page::Search(search) => (search.repos.len(), search.list.cursor),
            other => panic!("expected search, got {:?}", other.tag()),
        };
        assert_eq!(count, 6);
        assert_eq!(cursor, 2);

        key(&mut app, KeyCode::Enter);
        assert_eq!(app.page.tag(), PageTag::RepoDetail);
        assert_eq!(app.nav.origin, PageTag::Search);
        assert!(app.retained_pages().any(|t| t == PageTag::Search));

        key(&mut app, KeyCode::Backspace);
        assert_eq!(app.page.tag(), PageTag::Search);
        assert_eq!(app.page_id, search_id);
        match &app.page {
            Page::Search(search) => {
                assert_eq!(search.repos.len(), 6);
                assert_eq!(search.list.cursor, 2);
                assert_eq!(search.submode, Submode::Navigation);
                assert_eq!(search.input.value(), "repo");
            }
            other => panic!("expected search, got {:?}", other.tag()),
        }
    }

    #[tokio::test]
    async fn results_for_dropped_pages_are_discarded() {
        let (mut app, _rx) = app_with(Config::default());
        let repo = sample_repo("o", "repo1");
        app.navigate(NavRequest::repo(&repo, PageTag::Home)).unwrap();
        let detail_id = app.page_id;
        key(&mut app, KeyCode::Esc);
        assert_eq!(app.page.tag(), PageTag::Home);

        app.update(Action::Task {
            page: detail_id,
            outcome: TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Ok("# late".into()),
            },
        })
        .unwrap();
        assert_eq!(app.page.tag(), PageTag::Home);
        assert!(app.page.status().is_none());
    }

    #[tokio::test]
    async fn parked_search_still_receives_its_results() {
        let (mut app, _rx) = app_with(Config::default());
        key(&mut app, KeyCode::Char('s'));
        let search_id = app.page_id;
        typed(&mut app, "repo");
        key(&mut app, KeyCode::Enter);

        key(&mut app, KeyCode::Char('n'));
        assert_eq!(app.page.tag(), PageTag::CreateRepo);

        app.update(Action::Task {
            page: search_id,
            outcome: TaskOutcome::SearchLoaded {
                seq: 1,
                mode: SearchMode::Repo,
                result: Ok(SearchResults::Repos(SearchPage {
                    items: vec![sample_repo("o", "late")],
                    total_count: 1,
                })),
            },
        })
        .unwrap();
        assert_eq!(app.page.tag(), PageTag::CreateRepo);

        key(&mut app, KeyCode::Esc);
        assert_eq!(app.page.tag(), PageTag::Search);
        match &app.page {
            Page::Search(search) => {
                assert_eq!(search.repos[0].name, "late");
                assert!(!search.loading);
            }
            other => panic!("expected search, got {:?}", other.tag()),
        }
    }

    #[tokio::test]
    async fn payload_mismatch_is_an_error() {
        let (mut app, _rx) = app_with(Config::default());
        let err = app
            .navigate(NavRequest::to(PageTag::UserDetail, PageTag::Home))
            .unwrap_err();
        assert!(matches!(err, RemGitError::Navigation(_)));
    }

    #[tokio::test]
    async fn repo_detail_loads_readme_end_to_end() {
        let mut forge = FakeForge::default();
        forge
            .readmes
            .insert("o/demo".into(), "# Hello\n\nNo images here.".into());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(forge), Arc::new(Config::default()), tx).unwrap();

        let repo = sample_repo("o", "demo");
        app.navigate(NavRequest::repo(&repo, PageTag::Home)).unwrap();
        settle(&mut app, &mut rx).await;
        settle(&mut app, &mut rx).await;

        match &app.page {
            Page::RepoDetail(detail) => {
                assert_eq!(detail.stage, crate::page::repo_detail::Stage::Ready);
                assert_eq!(detail.merge_passes, 0);
            }
            other => panic!("expected repo detail, got {:?}", other.tag()),
        }
    }

    async fn notice(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Action>) {
        while let Some(action) = rx.recv().await {
            let done = matches!(action, Action::Notice { .. });
            app.update(action).unwrap();
            if done {
                return;
            }
        }
        panic!("action channel closed without a notice");
    }

    #[tokio::test]
    async fn clone_keeps_running_after_its_page_is_left() {
        let (mut app, mut rx) = app_with(Config::default());
        let repo = sample_repo("o", "repo1");
        app.navigate(NavRequest::repo(&repo, PageTag::Home)).unwrap();
        let detail_id = app.page_id;
        key(&mut app, KeyCode::Esc);
        assert_eq!(app.page.tag(), PageTag::Home);

        let (sink, stream) = ProgressStream::channel();
        app.update(Action::Task {
            page: detail_id,
            outcome: TaskOutcome::CloneProgress {
                event: Some(CloneEvent::Advanced(0.1)),
                stream,
            },
        })
        .unwrap();

        assert!(sink.advance(0.2), "clone lost its consumer");
        sink.finish();
        drop(sink);

        notice(&mut app, &mut rx).await;
        let status = app.page.status().unwrap();
        assert_eq!(status.tone, Tone::Info);
        assert!(status.text.contains("clone finished"));
    }

    #[tokio::test]
    async fn clone_from_discarded_search_reports_failure() {
        let (mut app, mut rx) = app_with(Config::default());
        key(&mut app, KeyCode::Char('s'));
        let search_id = app.page_id;
        key(&mut app, KeyCode::Esc);
        key(&mut app, KeyCode::Char('q'));
        assert_eq!(app.page.tag(), PageTag::Home);
        assert_eq!(app.retained_pages().count(), 0);

        let (sink, stream) = ProgressStream::channel();
        app.update(Action::Task {
            page: search_id,
            outcome: TaskOutcome::CloneProgress {
                event: Some(CloneEvent::Advanced(0.3)),
                stream,
            },
        })
        .unwrap();
        sink.fail("remote hung up");
        drop(sink);

        notice(&mut app, &mut rx).await;
        let status = app.page.status().unwrap();
        assert_eq!(status.tone, Tone::Warning);
        assert!(status.text.contains("remote hung up"));
    }

    #[tokio::test]
    async fn going_home_drops_parked_pages() {
        let (mut app, _rx) = app_with(Config::default());
        key(&mut app, KeyCode::Char('s'));
        key(&mut app, KeyCode::Esc);
        key(&mut app, KeyCode::Char('n'));
        key(&mut app, KeyCode::Esc);
        assert_eq!(app.page.tag(), PageTag::Search);
        key(&mut app, KeyCode::Char('q'));
        assert_eq!(app.page.tag(), PageTag::Home);
        assert_eq!(app.retained_pages().count(), 0);
    }
}
