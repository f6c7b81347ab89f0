//! README rendering: markdown to styled lines, image reference extraction and
//! the final merge of rendered image art back into the document.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::config::Theme;
use crate::image_art::RenderedArt;

/// One block of a rendered document. Images stay symbolic until merge.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Line(Line<'static>),
    Image { reference: String, alt: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledDocument {
    pub blocks: Vec<Block>,
}

impl StyledDocument {
    /// Lines with every image shown as a placeholder.
    pub fn placeholder_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Line(line) => line.clone(),
                Block::Image { reference, alt } => placeholder(reference, alt, theme),
            })
            .collect()
    }

    /// Copy with every text line wrapped to `width` columns. Image blocks
    /// are untouched; a width of 0 leaves lines as they are.
    pub fn reflow(&self, width: u16) -> StyledDocument {
        let width = usize::from(width);
        let blocks = self
            .blocks
            .iter()
            .flat_map(|block| match block {
                Block::Line(line) => wrap_line(line, width)
                    .into_iter()
                    .map(Block::Line)
                    .collect::<Vec<_>>(),
                image => vec![image.clone()],
            })
            .collect();
        StyledDocument { blocks }
    }

    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Image { .. }))
            .count()
    }
}

fn placeholder(reference: &str, alt: &str, theme: &Theme) -> Line<'static> {
    let label = if alt.is_empty() { reference } else { alt };
    Line::from(Span::styled(
        format!("[image: {}]", label),
        Style::default()
            .fg(theme.subtle)
            .add_modifier(Modifier::ITALIC),
    ))
}

/// Split `text` after at most `width` columns, keeping at least one char.
fn take_columns(text: &str, width: usize) -> (String, String) {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        let w = Span::raw(c.to_string()).width();
        if i > 0 && used + w > width {
            return (text[..i].to_string(), text[i..].to_string());
        }
        used += w;
    }
    (text.to_string(), String::new())
}

/// Break `line` at spaces so no row is wider than `width`. Words longer than
/// a row are split mid-word. Span styles carry over to every row.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line.clone()];
    }

    let mut rows = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in &line.spans {
        for word in span.content.split_inclusive(' ') {
            let fit = Span::raw(word.trim_end()).width();
            if used > 0 && used + fit > width {
                rows.push(Line::from(std::mem::take(&mut row)).style(line.style));
                used = 0;
                if fit == 0 {
                    continue;
                }
            }

            let mut rest = word.to_string();
            while Span::raw(rest.trim_end()).width() > width {
                let (head, tail) = take_columns(&rest, width);
                rows.push(Line::from(Span::styled(head, span.style)).style(line.style));
                rest = tail;
            }
            if !rest.is_empty() {
                used += Span::raw(rest.as_str()).width();
                row.push(Span::styled(rest, span.style));
            }
        }
    }

    if !row.is_empty() {
        rows.push(Line::from(row).style(line.style));
    }
    rows
}

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

fn is_animated(reference: &str) -> bool {
    reference.to_ascii_lowercase().contains(".gif")
}

/// `src` attributes of `<img>` tags inside raw HTML.
fn html_img_sources(html: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut sources = Vec::new();
    let mut offset = 0;

    while let Some(pos) = lower[offset..].find("<img") {
        let tag_start = offset + pos;
        let tag_end = lower[tag_start..]
            .find('>')
            .map(|e| tag_start + e)
            .unwrap_or(lower.len());
        let tag = &html[tag_start..tag_end];
        let tag_lower = &lower[tag_start..tag_end];

        if let Some(src_pos) = tag_lower.find("src=") {
            let rest = &tag[src_pos + 4..];
            let value = match rest.chars().next() {
                Some(q @ ('"' | '\'')) => rest[1..].split(q).next(),
                _ => rest.split(|c: char| c.is_whitespace() || c == '/').next(),
            };
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                sources.push(value.to_string());
            }
        }
        offset = tag_end;
    }

    sources
}

/// Image references in document order, without duplicates or animated formats.
pub fn extract_image_refs(markdown: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    let mut push = |reference: String| {
        if !reference.is_empty() && !is_animated(&reference) && seen.insert(reference.clone()) {
            refs.push(reference);
        }
    };

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Image { dest_url, .. }) => push(dest_url.to_string()),
            Event::Html(html) | Event::InlineHtml(html) => {
                for src in html_img_sources(&html) {
                    push(src);
                }
            }
            _ => {}
        }
    }

    refs
}

struct PendingImage {
    reference: String,
    alt: String,
}

struct Renderer<'t> {
    theme: &'t Theme,
    blocks: Vec<Block>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code_block: bool,
    image: Option<PendingImage>,
}

impl<'t> Renderer<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            blocks: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default().fg(theme.text)],
            lists: Vec::new(),
            quote_depth: 0,
            code_block: false,
            image: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let next = self.style().patch(patch);
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn prefix(&self) -> Vec<Span<'static>> {
        if self.quote_depth == 0 {
            return Vec::new();
        }
        vec![Span::styled(
            "│ ".repeat(self.quote_depth),
            Style::default().fg(self.theme.subtle),
        )]
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = self.prefix();
        spans.append(&mut self.spans);
        self.blocks.push(Block::Line(Line::from(spans)));
    }

    fn blank(&mut self) {
        let last_is_blank = matches!(
            self.blocks.last(),
            Some(Block::Line(line)) if line.spans.is_empty()
        );
        if !self.blocks.is_empty() && !last_is_blank {
            self.blocks.push(Block::Line(Line::default()));
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }

        if self.code_block {
            let style = Style::default().fg(self.theme.special);
            for line in text.lines() {
                let mut spans = self.prefix();
                spans.push(Span::styled(format!("    {}", line), style));
                self.blocks.push(Block::Line(Line::from(spans)));
            }
            return;
        }

        self.spans.push(Span::styled(text.to_string(), self.style()));
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.blank();
                let marker = match level {
                    HeadingLevel::H1 => "# ",
                    HeadingLevel::H2 => "## ",
                    _ => "### ",
                };
                self.push_style(
                    Style::default()
                        .fg(self.theme.highlight)
                        .add_modifier(Modifier::BOLD),
                );
                self.spans.push(Span::styled(marker, self.style()));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let mut spans = self.prefix();
                        spans.push(Span::styled(
                            format!("  {}", lang),
                            Style::default().fg(self.theme.subtle),
                        ));
                        self.blocks.push(Block::Line(Line::from(spans)));
                    }
                }
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::styled(
                    format!("{}{}", "  ".repeat(depth), marker),
                    Style::default().fg(self.theme.highlight),
                ));
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { .. } => self.push_style(
                Style::default()
                    .fg(self.theme.highlight)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            Tag::Image { dest_url, .. } => {
                self.flush();
                self.image = Some(PendingImage {
                    reference: dest_url.to_string(),
                    alt: String::new(),
                });
            }
            Tag::TableCell => {
                if !self.spans.is_empty() {
                    self.spans.push(Span::styled(
                        " │ ",
                        Style::default().fg(self.theme.subtle),
                    ));
                }
            }
            Tag::TableHead => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.pop_style();
                self.blank();
            }
            TagEnd::BlockQuote(..) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style();
            }
            TagEnd::TableHead => {
                self.flush();
                self.pop_style();
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.blocks.push(Block::Image {
                        reference: image.reference,
                        alt: image.alt,
                    });
                }
            }
            TagEnd::TableRow => self.flush(),
            TagEnd::Table => self.blank(),
            _ => {}
        }
    }

    fn html(&mut self, html: &str) {
        for reference in html_img_sources(html) {
            self.flush();
            self.blocks.push(Block::Image {
                reference,
                alt: String::new(),
            });
        }
    }

    fn finish(mut self) -> StyledDocument {
        self.flush();
        while matches!(self.blocks.last(), Some(Block::Line(l)) if l.spans.is_empty()) {
            self.blocks.pop();
        }
        StyledDocument {
            blocks: self.blocks,
        }
    }
}

/// Render markdown into styled lines with symbolic image blocks.
pub fn render(markdown: &str, theme: &Theme) -> StyledDocument {
    let mut renderer = Renderer::new(theme);

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(tag) => renderer.start(tag),
            Event::End(tag) => renderer.end(tag),
            Event::Text(text) => renderer.text(&text),
            Event::Code(code) => {
                let style = Style::default().fg(theme.special);
                renderer.spans.push(Span::styled(format!("`{}`", code), style));
            }
            Event::Html(html) | Event::InlineHtml(html) => renderer.html(&html),
            Event::SoftBreak => renderer.text(" "),
            Event::HardBreak => renderer.flush(),
            Event::Rule => {
                renderer.flush();
                renderer.blocks.push(Block::Line(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(theme.subtle),
                ))));
                renderer.blank();
            }
            Event::TaskListMarker(done) => {
                renderer.text(if done { "[x] " } else { "[ ] " });
            }
            _ => {}
        }
    }

    renderer.finish()
}

/// Replace every fetched image reference with its art padded by blank lines.
/// References that failed are elided; references that were never fetched
/// (animated formats) keep their placeholder.
pub fn merge(
    document: &StyledDocument,
    images: &HashMap<String, Option<RenderedArt>>,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(document.blocks.len());

    for block in &document.blocks {
        match block {
            Block::Line(line) => lines.push(line.clone()),
            Block::Image { reference, alt } => match images.get(reference) {
                Some(Some(art)) => {
                    lines.push(Line::default());
                    lines.extend(art.lines.iter().cloned());
                    lines.push(Line::default());
                }
                Some(None) => {}
                None => lines.push(placeholder(reference, alt, theme)),
            },
        }
    }

    lines
}
