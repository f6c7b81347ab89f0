use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::action::{Action, PageId, SearchResults, TaskOutcome};
use crate::config::Config;
use crate::error::{RemGitError, Result};
use crate::forge::{resolve_image_url, Forge};
use crate::image_art::{self, RenderedArt};
use crate::markdown::{self, StyledDocument};
use crate::page::NavRequest;
use crate::progress::{CloneEvent, ProgressStream};
use crate::types::{CreateRepoRequest, Repository, SearchMode};

pub const API_TIMEOUT: Duration = Duration::from_secs(20);
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(15);
pub const IMAGE_CONCURRENCY: usize = 4;

/// Work a page asks for. Navigation and quit are handled by the `App`;
/// everything else runs on the `Executor`.
#[derive(Debug)]
pub enum Command {
    Navigate(NavRequest),
    Quit,
    Search {
        seq: u64,
        mode: SearchMode,
        query: String,
    },
    FetchUserRepos {
        login: String,
    },
    FetchReadme {
        generation: u64,
        repo: Arc<Repository>,
    },
    ExtractImageReferences {
        generation: u64,
        markdown: String,
    },
    FetchAndRenderImage {
        generation: u64,
        reference: String,
        repo: Arc<Repository>,
    },
    MergeContent {
        generation: u64,
        document: StyledDocument,
        images: HashMap<String, Option<RenderedArt>>,
    },
    StartClone {
        url: String,
        dest: PathBuf,
    },
    NextCloneProgress {
        stream: ProgressStream,
    },
    CreateRepository {
        token: String,
        request: CreateRepoRequest,
    },
    OpenUrl(String),
    CopyText(String),
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RemGitError::Timeout(limit.as_secs())),
    }
}

fn deliver(tx: &mpsc::UnboundedSender<Action>, page: PageId, outcome: TaskOutcome) {
    if tx.send(Action::Task { page, outcome }).is_err() {
        tracing::debug!(page, "action channel closed, dropping result");
    }
}

/// Runs commands as independent tasks and reports each result back through
/// the action channel, tagged with the id of the page that asked.
pub struct Executor {
    forge: Arc<dyn Forge>,
    config: Arc<Config>,
    action_tx: mpsc::UnboundedSender<Action>,
    image_permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(
        forge: Arc<dyn Forge>,
        config: Arc<Config>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        Self {
            forge,
            config,
            action_tx,
            image_permits: Arc::new(Semaphore::new(IMAGE_CONCURRENCY)),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop background work that honours cancellation (clones).
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn dispatch(&self, page: PageId, command: Command) {
        match command {
            Command::Navigate(_) | Command::Quit => {
                tracing::warn!(page, "navigation command reached the executor");
            }
            Command::Search { seq, mode, query } => self.spawn_search(page, seq, mode, query),
            Command::FetchUserRepos { login } => self.spawn_user_repos(page, login),
            Command::FetchReadme { generation, repo } => {
                self.spawn_readme(page, generation, repo)
            }
            Command::ExtractImageReferences {
                generation,
                markdown,
            } => self.spawn_extract(page, generation, markdown),
            Command::FetchAndRenderImage {
                generation,
                reference,
                repo,
            } => self.spawn_image(page, generation, reference, repo),
            Command::MergeContent {
                generation,
                document,
                images,
            } => self.spawn_merge(page, generation, document, images),
            Command::StartClone { url, dest } => self.spawn_clone(page, url, dest),
            Command::NextCloneProgress { stream } => self.spawn_next_progress(page, stream),
            Command::CreateRepository { token, request } => {
                self.spawn_create(page, token, request)
            }
            Command::OpenUrl(url) => self.spawn_open(page, url),
            Command::CopyText(text) => self.spawn_copy(page, text),
        }
    }

    fn spawn_search(&self, page: PageId, seq: u64, mode: SearchMode, query: String) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            let result = match mode {
                SearchMode::User => bounded(API_TIMEOUT, forge.search_users(&query))
                    .await
                    .map(SearchResults::Users),
                SearchMode::Repo => bounded(API_TIMEOUT, forge.search_repos(&query))
                    .await
                    .map(SearchResults::Repos),
            };
            if let Err(e) = &result {
                tracing::error!(%query, %mode, error = %e, "search failed");
            }
            deliver(&tx, page, TaskOutcome::SearchLoaded { seq, mode, result });
        });
    }

    fn spawn_user_repos(&self, page: PageId, login: String) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            let result = bounded(API_TIMEOUT, forge.list_user_repos(&login)).await;
            if let Err(e) = &result {
                tracing::error!(%login, error = %e, "listing user repositories failed");
            }
            deliver(&tx, page, TaskOutcome::UserReposLoaded { login, result });
        });
    }

    fn spawn_readme(&self, page: PageId, generation: u64, repo: Arc<Repository>) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            let result = bounded(API_TIMEOUT, forge.get_readme(&repo.owner, &repo.name)).await;
            if let Err(e) = &result {
                tracing::error!(repo = %repo.full_name, error = %e, "readme fetch failed");
            }
            deliver(&tx, page, TaskOutcome::ReadmeLoaded { generation, result });
        });
    }

    fn spawn_extract(&self, page: PageId, generation: u64, markdown: String) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let references = markdown::extract_image_refs(&markdown);
            tracing::debug!(count = references.len(), "image references extracted");
            deliver(
                &tx,
                page,
                TaskOutcome::ImageReferences {
                    generation,
                    references,
                },
            );
        });
    }

    fn spawn_image(&self, page: PageId, generation: u64, reference: String, repo: Arc<Repository>) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        let permits = Arc::clone(&self.image_permits);
        let settings = self.config.image;
        let url = resolve_image_url(self.forge.as_ref(), &repo, &reference);

        tokio::spawn(async move {
            let rendered = async {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| RemGitError::Network(e.to_string()))?;
                let bytes = bounded(IMAGE_TIMEOUT, forge.fetch_bytes(&url)).await?;
                tokio::task::spawn_blocking(move || image_art::decode_and_render(&bytes, &settings))
                    .await
                    .map_err(|e| RemGitError::Render(e.to_string()))?
            }
            .await;

            let art = match rendered {
                Ok(art) => Some(art),
                Err(e) => {
                    tracing::warn!(%reference, %url, error = %e, "image dropped");
                    None
                }
            };
            deliver(
                &tx,
                page,
                TaskOutcome::ImageRendered {
                    generation,
                    reference,
                    art,
                },
            );
        });
    }

    fn spawn_merge(
        &self,
        page: PageId,
        generation: u64,
        document: StyledDocument,
        images: HashMap<String, Option<RenderedArt>>,
    ) {
        let tx = self.action_tx.clone();
        let theme = self.config.theme;
        tokio::spawn(async move {
            let merged =
                tokio::task::spawn_blocking(move || markdown::merge(&document, &images, &theme))
                    .await;
            match merged {
                Ok(lines) => deliver(&tx, page, TaskOutcome::ContentMerged { generation, lines }),
                Err(e) => tracing::error!(error = %e, "merge task failed"),
            }
        });
    }

    fn spawn_clone(&self, page: PageId, url: String, dest: PathBuf) {
        let (sink, stream) = ProgressStream::channel();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            crate::git::clone_repo(url, &dest, sink, cancel).await;
        });
        self.spawn_next_progress(page, stream);
    }

    fn spawn_next_progress(&self, page: PageId, stream: ProgressStream) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let event = stream.next().await;
            deliver(&tx, page, TaskOutcome::CloneProgress { event, stream });
        });
    }

    /// Run a clone whose page is gone to the end of its stream, then report
    /// the outcome to whatever page is showing.
    pub fn detach_clone(&self, event: Option<CloneEvent>, stream: ProgressStream) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let mut event = event;
            let (message, failed) = loop {
                match event {
                    Some(CloneEvent::Advanced(_)) => event = stream.next().await,
                    Some(CloneEvent::Finished) => {
                        break ("Background clone finished".to_string(), false)
                    }
                    Some(CloneEvent::Failed(reason)) => {
                        break (format!("Background clone failed: {}", reason), true)
                    }
                    None => break ("Background clone stopped before completion".to_string(), true),
                }
            };
            tracing::info!(%message, "detached clone ended");
            if tx.send(Action::Notice { message, failed }).is_err() {
                tracing::debug!("action channel closed, dropping clone notice");
            }
        });
    }

    fn spawn_create(&self, page: PageId, token: String, request: CreateRepoRequest) {
        let tx = self.action_tx.clone();
        let forge = Arc::clone(&self.forge);
        tokio::spawn(async move {
            let result = bounded(API_TIMEOUT, forge.create_repo(&token, &request)).await;
            match &result {
                Ok(()) => tracing::info!(name = %request.name, "repository created"),
                Err(e) => tracing::error!(name = %request.name, error = %e, "create failed"),
            }
            deliver(
                &tx,
                page,
                TaskOutcome::RepoCreated {
                    name: request.name,
                    result,
                },
            );
        });
    }

    fn spawn_open(&self, page: PageId, url: String) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let target = url.clone();
            let opened = tokio::task::spawn_blocking(move || open::that(&target)).await;
            let (message, failed) = match opened {
                Ok(Ok(())) => (format!("Opened {}", url), false),
                Ok(Err(e)) => (format!("Could not open browser: {}", e), true),
                Err(e) => (format!("Could not open browser: {}", e), true),
            };
            deliver(&tx, page, TaskOutcome::Notice { message, failed });
        });
    }

    fn spawn_copy(&self, page: PageId, text: String) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let shown = text.clone();
            let copied = tokio::task::spawn_blocking(move || {
                arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text))
            })
            .await;
            let (message, failed) = match copied {
                Ok(Ok(())) => (format!("Copied {}", shown), false),
                Ok(Err(e)) => (format!("Clipboard unavailable: {}", e), true),
                Err(e) => (format!("Clipboard unavailable: {}", e), true),
            };
            deliver(&tx, page, TaskOutcome::Notice { message, failed });
        });
    }
}
