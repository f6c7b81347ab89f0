use crossterm::event::KeyEvent;
use ratatui::text::Line;

use crate::error::Result;
use crate::image_art::RenderedArt;
use crate::progress::{CloneEvent, ProgressStream};
use crate::types::{Repository, SearchMode, SearchPage, UserSummary};

/// Identity of one constructed page instance. Results carry the id of the
/// page that asked for them so late arrivals can be recognised.
pub type PageId = u64;

/// Everything the main loop feeds into `App::update`.
#[derive(Debug)]
pub enum Action {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Tick,
    Task { page: PageId, outcome: TaskOutcome },
    /// Feedback for whichever page is showing
    Notice { message: String, failed: bool },
    None,
}

/// What a page's `update` receives.
#[derive(Debug)]
pub enum Msg {
    Key(KeyEvent),
    /// Size of the page body, excluding header and status rows
    Resize { width: u16, height: u16 },
    Tick,
    Task(TaskOutcome),
}

#[derive(Debug)]
pub enum SearchResults {
    Users(SearchPage<UserSummary>),
    Repos(SearchPage<Repository>),
}

/// Result of one unit of background work.
#[derive(Debug)]
pub enum TaskOutcome {
    SearchLoaded {
        /// Which query of the issuing page this answers
        seq: u64,
        mode: SearchMode,
        result: Result<SearchResults>,
    },
    UserReposLoaded {
        login: String,
        result: Result<Vec<Repository>>,
    },
    ReadmeLoaded {
        generation: u64,
        result: Result<String>,
    },
    ImageReferences {
        generation: u64,
        references: Vec<String>,
    },
    ImageRendered {
        generation: u64,
        reference: String,
        art: Option<RenderedArt>,
    },
    ContentMerged {
        generation: u64,
        lines: Vec<Line<'static>>,
    },
    CloneProgress {
        event: Option<CloneEvent>,
        stream: ProgressStream,
    },
    RepoCreated {
        name: String,
        result: Result<()>,
    },
    Notice {
        message: String,
        failed: bool,
    },
}
