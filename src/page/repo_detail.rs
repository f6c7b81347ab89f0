//! Repository detail page and its README pipeline.
//!
//! A README load walks `LoadingReadme -> Rendering -> ExtractingImages ->
//! FetchingImages(n) -> Merging -> Ready`. Image fetches fan out as
//! independent commands and fan back in through `ImageJoin`; the merge runs
//! once, after the last image reports. Every result carries the load
//! generation so a reload can never be corrupted by a slow earlier load.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::Line;

use crate::action::{Msg, TaskOutcome};
use crate::command::Command;
use crate::config::Config;
use crate::error::RemGitError;
use crate::image_art::RenderedArt;
use crate::markdown::{self, StyledDocument};
use crate::page::{self, NavRequest, PageTag, Status};
use crate::progress::CloneState;
use crate::types::Repository;

/// Rows taken by the repository card above the README.
pub const HEADER_ROWS: u16 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    LoadingReadme,
    Rendering,
    ExtractingImages,
    /// Images still outstanding
    FetchingImages(usize),
    Merging,
    Ready,
    Failed(String),
}

/// Wait group for one fan-out of image fetches.
#[derive(Debug, Default)]
pub struct ImageJoin {
    expected: HashSet<String>,
    results: HashMap<String, Option<RenderedArt>>,
}

impl ImageJoin {
    pub fn new(references: &[String]) -> Self {
        Self {
            expected: references.iter().cloned().collect(),
            results: HashMap::with_capacity(references.len()),
        }
    }

    pub fn pending(&self) -> usize {
        self.expected.len() - self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Record a completion. Unknown and repeated references are rejected.
    pub fn record(&mut self, reference: String, art: Option<RenderedArt>) -> bool {
        if !self.expected.contains(&reference) || self.results.contains_key(&reference) {
            return false;
        }
        self.results.insert(reference, art);
        true
    }

    pub fn results(&self) -> &HashMap<String, Option<RenderedArt>> {
        &self.results
    }
}

#[derive(Debug)]
pub struct RepoDetail {
    pub repo: Arc<Repository>,
    pub stage: Stage,
    pub document: StyledDocument,
    pub references: Vec<String>,
    pub join: ImageJoin,
    /// What the README area shows right now
    pub content: Vec<Line<'static>>,
    pub generation: u64,
    pub merge_passes: u32,
    pub scroll: usize,
    pub clone: CloneState,
    pub status: Option<Status>,
    pub config: Arc<Config>,
    origin: PageTag,
    body_rows: u16,
    body_width: u16,
    /// Width the outstanding merge was laid out for
    merge_width: u16,
}

impl RepoDetail {
    pub fn new(repo: Repository, origin: PageTag, config: Arc<Config>) -> Self {
        Self {
            repo: Arc::new(repo),
            stage: Stage::LoadingReadme,
            document: StyledDocument::default(),
            references: Vec::new(),
            join: ImageJoin::default(),
            content: Vec::new(),
            generation: 0,
            merge_passes: 0,
            scroll: 0,
            clone: CloneState::default(),
            status: None,
            config,
            origin,
            body_rows: 0,
            body_width: 0,
            merge_width: 0,
        }
    }

    /// Start (or restart) a README load under a fresh generation.
    pub fn init(&mut self) -> Vec<Command> {
        self.generation += 1;
        self.stage = Stage::LoadingReadme;
        self.document = StyledDocument::default();
        self.references.clear();
        self.join = ImageJoin::default();
        self.content.clear();
        self.scroll = 0;
        tracing::info!(repo = %self.repo.full_name, generation = self.generation, "loading readme");
        vec![Command::FetchReadme {
            generation: self.generation,
            repo: Arc::clone(&self.repo),
        }]
    }

    fn viewport_rows(&self) -> usize {
        usize::from(self.body_rows.saturating_sub(HEADER_ROWS)).max(1)
    }

    fn max_scroll(&self) -> usize {
        self.content.len().saturating_sub(self.viewport_rows())
    }

    /// Rebuild the README lines for the current width. Placed images are
    /// re-inserted here too; this is layout, not another merge pass.
    fn relayout(&mut self) {
        let theme = &self.config.theme;
        let document = self.document.reflow(self.body_width);
        self.content = match self.stage {
            Stage::Ready if !self.join.results().is_empty() => {
                markdown::merge(&document, self.join.results(), theme)
            }
            _ => document.placeholder_lines(theme),
        };
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll as isize + delta;
        self.scroll = target.clamp(0, self.max_scroll() as isize) as usize;
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Command> {
        match msg {
            Msg::Key(key) => self.key(key),
            Msg::Resize { width, height } => {
                let reflow = width != self.body_width;
                self.body_width = width;
                self.body_rows = height;
                if reflow {
                    self.relayout();
                }
                self.scroll = self.scroll.min(self.max_scroll());
                Vec::new()
            }
            Msg::Tick => Vec::new(),
            Msg::Task(outcome) => self.task(outcome),
        }
    }

    fn key(&mut self, key: KeyEvent) -> Vec<Command> {
        let half = (self.viewport_rows() / 2).max(1) as isize;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::Char('d') | KeyCode::PageDown => self.scroll_by(half),
            KeyCode::Char('u') | KeyCode::PageUp => self.scroll_by(-half),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            KeyCode::Char('r') => return self.init(),
            KeyCode::Char('c') => {
                let repo = Arc::clone(&self.repo);
                return page::start_clone(&mut self.clone, &repo, &self.config, &mut self.status);
            }
            KeyCode::Char('o') => return vec![page::open_in_browser(&self.repo)],
            KeyCode::Char('y') => return vec![page::copy_clone_url(&self.repo)],
            KeyCode::Backspace | KeyCode::Esc | KeyCode::Char('q') => {
                return vec![Command::Navigate(NavRequest::back(
                    self.origin,
                    PageTag::RepoDetail,
                ))];
            }
            _ => {}
        }
        Vec::new()
    }

    fn task(&mut self, outcome: TaskOutcome) -> Vec<Command> {
        match outcome {
            TaskOutcome::ReadmeLoaded { generation, result } if self.current(generation) => {
                self.readme_loaded(result)
            }
            TaskOutcome::ImageReferences {
                generation,
                references,
            } if self.current(generation) => self.references_found(references),
            TaskOutcome::ImageRendered {
                generation,
                reference,
                art,
            } if self.current(generation) => self.image_rendered(reference, art),
            TaskOutcome::ContentMerged { generation, lines } if self.current(generation) => {
                self.merged(lines);
                Vec::new()
            }
            TaskOutcome::CloneProgress { event, stream } => {
                page::clone_progress(&mut self.clone, event, stream, &mut self.status)
            }
            other => {
                tracing::debug!(?other, generation = self.generation, "stale or unrelated result");
                Vec::new()
            }
        }
    }

    fn current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    fn readme_loaded(&mut self, result: Result<String, RemGitError>) -> Vec<Command> {
        if self.stage != Stage::LoadingReadme {
            return Vec::new();
        }

        let text = match result {
            Ok(text) => text,
            Err(RemGitError::NotFound(_)) => {
                self.stage = Stage::Failed("This repository has no README".to_string());
                return Vec::new();
            }
            Err(e) => {
                self.stage = Stage::Failed(format!("Could not load README: {}", e));
                return Vec::new();
            }
        };

        self.stage = Stage::Rendering;
        self.document = markdown::render(&text, &self.config.theme);
        self.stage = Stage::ExtractingImages;
        self.relayout();
        vec![Command::ExtractImageReferences {
            generation: self.generation,
            markdown: text,
        }]
    }

    fn references_found(&mut self, references: Vec<String>) -> Vec<Command> {
        if self.stage != Stage::ExtractingImages {
            return Vec::new();
        }

        if references.is_empty() {
            self.stage = Stage::Ready;
            return Vec::new();
        }

        tracing::debug!(count = references.len(), "fetching readme images");
        self.join = ImageJoin::new(&references);
        self.stage = Stage::FetchingImages(self.join.pending());
        self.references = references;
        self.references
            .iter()
            .map(|reference| Command::FetchAndRenderImage {
                generation: self.generation,
                reference: reference.clone(),
                repo: Arc::clone(&self.repo),
            })
            .collect()
    }

    fn image_rendered(&mut self, reference: String, art: Option<RenderedArt>) -> Vec<Command> {
        if !matches!(self.stage, Stage::FetchingImages(_)) {
            return Vec::new();
        }
        if !self.join.record(reference, art) {
            tracing::debug!("ignoring unknown or repeated image result");
            return Vec::new();
        }

        self.stage = Stage::FetchingImages(self.join.pending());
        if !self.join.is_complete() {
            return Vec::new();
        }

        self.stage = Stage::Merging;
        self.merge_width = self.body_width;
        vec![Command::MergeContent {
            generation: self.generation,
            document: self.document.reflow(self.body_width),
            images: self.join.results().clone(),
        }]
    }

    fn merged(&mut self, lines: Vec<Line<'static>>) {
        if self.stage != Stage::Merging {
            return;
        }
        self.content = lines;
        self.merge_passes += 1;
        self.stage = Stage::Ready;
        if self.merge_width != self.body_width {
            self.relayout();
        }
        self.scroll = self.scroll.min(self.max_scroll());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_repo;
    use crossterm::event::KeyModifiers;

    const README: &str = "# Demo\n\n![a](a.png)\n\ntext\n\n![b](b.png)\n\n![c](https://x.io/c.png)\n";

    fn refs() -> Vec<String> {
        vec!["a.png".into(), "b.png".into(), "https://x.io/c.png".into()]
    }

    fn art(label: &str) -> RenderedArt {
        RenderedArt {
            lines: vec![Line::from(format!("ART {}", label))],
        }
    }

    fn page() -> RepoDetail {
        RepoDetail::new(
            sample_repo("o", "demo"),
            PageTag::Search,
            Arc::new(Config::default()),
        )
    }

    fn task(detail: &mut RepoDetail, outcome: TaskOutcome) -> Vec<Command> {
        detail.update(Msg::Task(outcome))
    }

    /// Bring a page to FetchingImages for `README`.
    fn fetching() -> RepoDetail {
        let mut detail = page();
        detail.init();
        let g = detail.generation;
        task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: g,
                result: Ok(README.into()),
            },
        );
        let cmds = task(
            &mut detail,
            TaskOutcome::ImageReferences {
                generation: g,
                references: refs(),
            },
        );
        assert_eq!(cmds.len(), 3);
        assert!(cmds
            .iter()
            .all(|c| matches!(c, Command::FetchAndRenderImage { .. })));
        assert_eq!(detail.stage, Stage::FetchingImages(3));
        detail
    }

    fn rendered(detail: &mut RepoDetail, reference: &str, ok: bool) -> Vec<Command> {
        let g = detail.generation;
        task(
            detail,
            TaskOutcome::ImageRendered {
                generation: g,
                reference: reference.into(),
                art: ok.then(|| art(reference)),
            },
        )
    }

    fn text_of(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn init_requests_readme_under_new_generation() {
        let mut detail = page();
        let cmds = detail.init();
        assert!(matches!(
            cmds.as_slice(),
            [Command::FetchReadme { generation: 1, .. }]
        ));
        assert_eq!(detail.stage, Stage::LoadingReadme);
    }

    #[test]
    fn readme_moves_to_extracting() {
        let mut detail = page();
        detail.init();
        let cmds = task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Ok(README.into()),
            },
        );
        assert!(matches!(
            cmds.as_slice(),
            [Command::ExtractImageReferences { generation: 1, .. }]
        ));
        assert_eq!(detail.stage, Stage::ExtractingImages);
        assert_eq!(detail.document.image_count(), 3);
        assert!(!detail.content.is_empty());
    }

    #[test]
    fn no_images_goes_straight_to_ready() {
        let mut detail = page();
        detail.init();
        task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Ok("# Plain\n\nNo pictures.".into()),
            },
        );
        let cmds = task(
            &mut detail,
            TaskOutcome::ImageReferences {
                generation: 1,
                references: Vec::new(),
            },
        );
        assert!(cmds.is_empty());
        assert_eq!(detail.stage, Stage::Ready);
        assert_eq!(detail.merge_passes, 0);
        assert!(text_of(&detail.content).iter().any(|l| l.contains("Plain")));
    }

    #[test]
    fn merge_dispatched_once_in_any_order() {
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let mut detail = fetching();
            let references = refs();
            let mut merges = 0;
            for (step, idx) in order.iter().enumerate() {
                let cmds = rendered(&mut detail, &references[*idx], true);
                let count = cmds
                    .iter()
                    .filter(|c| matches!(c, Command::MergeContent { .. }))
                    .count();
                if step < 2 {
                    assert_eq!(count, 0, "merged early for {:?}", order);
                }
                merges += count;
            }
            assert_eq!(merges, 1, "order {:?}", order);
            assert_eq!(detail.stage, Stage::Merging);
        }
    }

    #[test]
    fn duplicate_and_unknown_results_do_not_count() {
        let mut detail = fetching();
        rendered(&mut detail, "a.png", true);
        assert!(rendered(&mut detail, "a.png", true).is_empty());
        assert!(rendered(&mut detail, "zzz.png", true).is_empty());
        assert_eq!(detail.stage, Stage::FetchingImages(2));
        assert_eq!(detail.join.pending(), 2);
    }

    #[test]
    fn two_images_succeed_one_fails() {
        let mut detail = fetching();
        rendered(&mut detail, "b.png", true);
        rendered(&mut detail, "https://x.io/c.png", false);
        let cmds = rendered(&mut detail, "a.png", true);

        let (document, images) = match cmds.into_iter().next() {
            Some(Command::MergeContent {
                document, images, ..
            }) => (document, images),
            other => panic!("expected merge, got {:?}", other),
        };
        assert_eq!(images.len(), 3);
        assert_eq!(images.values().filter(|a| a.is_some()).count(), 2);

        let lines = markdown::merge(&document, &images, &Config::default().theme);
        let generation = detail.generation;
        task(
            &mut detail,
            TaskOutcome::ContentMerged { generation, lines },
        );

        assert_eq!(detail.stage, Stage::Ready);
        assert_eq!(detail.merge_passes, 1);
        let text = text_of(&detail.content);
        assert!(text.contains(&"ART a.png".to_string()));
        assert!(text.contains(&"ART b.png".to_string()));
        assert!(!text.iter().any(|l| l.contains("c.png")));
    }

    #[test]
    fn readme_wraps_to_body_width() {
        let mut detail = page();
        detail.init();
        detail.update(Msg::Resize {
            width: 40,
            height: 30,
        });
        task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Ok(format!("{}ENDWORD", "lorem ipsum ".repeat(15))),
            },
        );
        let wide = detail.content.len();
        assert!(wide > 1);
        assert!(detail.content.iter().all(|l| l.width() <= 41));
        assert!(text_of(&detail.content)
            .last()
            .is_some_and(|l| l.ends_with("ENDWORD")));

        detail.update(Msg::Resize {
            width: 20,
            height: 30,
        });
        assert!(detail.content.len() > wide);
        assert!(detail.content.iter().all(|l| l.width() <= 21));
    }

    #[test]
    fn resize_after_merge_keeps_art_and_merge_count() {
        let mut detail = fetching();
        let mut cmds = Vec::new();
        for reference in refs() {
            cmds.extend(rendered(&mut detail, &reference, true));
        }
        let (document, images) = match cmds.into_iter().next() {
            Some(Command::MergeContent {
                document, images, ..
            }) => (document, images),
            other => panic!("expected merge, got {:?}", other),
        };
        let lines = markdown::merge(&document, &images, &Config::default().theme);
        let generation = detail.generation;
        task(
            &mut detail,
            TaskOutcome::ContentMerged { generation, lines },
        );

        detail.update(Msg::Resize {
            width: 4,
            height: 30,
        });
        assert_eq!(detail.merge_passes, 1);
        assert_eq!(detail.stage, Stage::Ready);
        let text = text_of(&detail.content);
        assert!(text.contains(&"ART a.png".to_string()));
        assert!(text.contains(&"Demo".to_string()));
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut detail = fetching();
        let old = detail.generation;
        detail.init();
        assert_eq!(detail.generation, old + 1);

        let cmds = task(
            &mut detail,
            TaskOutcome::ImageRendered {
                generation: old,
                reference: "a.png".into(),
                art: Some(art("a")),
            },
        );
        assert!(cmds.is_empty());
        let cmds = task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: old,
                result: Ok(README.into()),
            },
        );
        assert!(cmds.is_empty());
        assert_eq!(detail.stage, Stage::LoadingReadme);
    }

    #[test]
    fn merged_content_for_old_generation_is_dropped() {
        let mut detail = fetching();
        for r in refs() {
            rendered(&mut detail, &r, true);
        }
        let g = detail.generation;
        task(
            &mut detail,
            TaskOutcome::ContentMerged {
                generation: g + 5,
                lines: vec![Line::from("bogus")],
            },
        );
        assert_eq!(detail.stage, Stage::Merging);
        assert_eq!(detail.merge_passes, 0);
    }

    #[test]
    fn readme_errors_become_failed_stage() {
        let mut detail = page();
        detail.init();
        task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Err(RemGitError::NotFound("o/demo".into())),
            },
        );
        assert_eq!(
            detail.stage,
            Stage::Failed("This repository has no README".into())
        );

        let mut detail = page();
        detail.init();
        task(
            &mut detail,
            TaskOutcome::ReadmeLoaded {
                generation: 1,
                result: Err(RemGitError::RateLimited),
            },
        );
        assert!(matches!(detail.stage, Stage::Failed(ref m) if m.contains("rate")));
    }

    #[test]
    fn back_keys_return_to_origin() {
        let mut detail = page();
        for code in [KeyCode::Backspace, KeyCode::Esc, KeyCode::Char('q')] {
            let cmds = detail.update(Msg::Key(KeyEvent::new(code, KeyModifiers::NONE)));
            match cmds.as_slice() {
                [Command::Navigate(req)] => {
                    assert_eq!(req.target, PageTag::Search);
                    assert!(matches!(req.payload, page::Payload::Return));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn scrolling_is_clamped_to_content() {
        let mut detail = page();
        detail.update(Msg::Resize {
            width: 80,
            height: HEADER_ROWS + 4,
        });
        detail.content = (0..10).map(|i| Line::from(i.to_string())).collect();
        let press = |d: &mut RepoDetail, c| d.update(Msg::Key(KeyEvent::new(c, KeyModifiers::NONE)));

        press(&mut detail, KeyCode::Char('k'));
        assert_eq!(detail.scroll, 0);
        press(&mut detail, KeyCode::Char('d'));
        assert_eq!(detail.scroll, 2);
        for _ in 0..20 {
            press(&mut detail, KeyCode::Char('j'));
        }
        assert_eq!(detail.scroll, 6);
        press(&mut detail, KeyCode::Char('u'));
        assert_eq!(detail.scroll, 4);
    }
}
