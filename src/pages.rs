//! Print pages from the book's page list, or synthetic pages of a fixed size.
//!
//! Page targets resolve exactly like chapter targets. Each page runs from its
//! start to the next page start in reading order, or to the end of the book.
//! Books without a page list can be cut into synthetic pages that break
//! between sentences and never span two chapters.

use std::sync::LazyLock;

use regex::Regex;

use crate::book::Container;
use crate::clean::{CleaningConfig, clean};
use crate::extract::{PARAGRAPH_BREAK, span_text};
use crate::nav::PageTarget;
use crate::render::{RenderOptions, chapter_marker, page_marker, remove_duplicate_title_line};
use crate::resolve::{ChapterTree, ResolvedPosition, Span, resolve_target};

/// A resolved print page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpan {
    pub label: String,
    pub span: Span,
    /// Title of the chapter whose own span holds the page start.
    pub chapter_title: Option<String>,
}

/// A print page with its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub label: String,
    pub chapter_title: Option<String>,
    pub text: String,
}

/// Resolve page targets into spans sorted by reading order.
///
/// Targets outside the spine are dropped. Pages at the same position keep
/// their list order; all but the last of them are empty.
pub fn resolve_pages(container: &Container, targets: &[PageTarget], tree: &ChapterTree) -> Vec<PageSpan> {
    let mut starts: Vec<(ResolvedPosition, &PageTarget)> = targets
        .iter()
        .filter_map(|page| match resolve_target(container, &page.target).position() {
            Some(position) => Some((position, page)),
            None => {
                tracing::debug!(label = %page.label, href = %page.target.href, "page target not in spine");
                None
            }
        })
        .collect();
    starts.sort_by_key(|(position, _)| *position);

    let end_of_book = ResolvedPosition::end_of_book(container.spine_len());
    starts
        .iter()
        .enumerate()
        .map(|(i, (start, page))| {
            let end = starts.get(i + 1).map_or(end_of_book, |(next, _)| *next);
            PageSpan {
                label: page.label.clone(),
                span: Span::new(*start, end),
                chapter_title: tree.chapter_at(*start).map(|chapter| chapter.title.clone()),
            }
        })
        .collect()
}

/// Resolve, extract and clean every page.
pub fn extract_pages(
    container: &Container,
    targets: &[PageTarget],
    tree: &ChapterTree,
    config: CleaningConfig,
) -> Vec<Page> {
    resolve_pages(container, targets, tree)
        .into_iter()
        .map(|page| Page {
            text: clean(&span_text(container, page.span), config),
            label: page.label,
            chapter_title: page.chapter_title,
        })
        .collect()
}

/// Join pages as `<<PAGE: label>>` blocks, with a chapter marker whenever the
/// enclosing chapter changes. Empty pages are skipped.
pub fn render_pages(pages: &[Page], options: RenderOptions) -> String {
    let mut parts = Vec::new();
    let mut current_chapter: Option<&str> = None;

    for page in pages.iter().filter(|page| !page.text.trim().is_empty()) {
        let chapter = page.chapter_title.as_deref();
        if options.chapter_markers
            && let Some(title) = chapter
            && current_chapter != Some(title)
        {
            parts.push(chapter_marker(title));
        }
        if chapter.is_some() {
            current_chapter = chapter;
        }

        let text = match chapter {
            Some(title) if options.remove_duplicate_titles => remove_duplicate_title_line(&page.text, title),
            _ => page.text.clone(),
        };
        let text = options.paragraph_style.apply(&text);
        if text.is_empty() {
            parts.push(page_marker(&page.label));
        } else {
            parts.push(format!("{}{PARAGRAPH_BREAK}{text}", page_marker(&page.label)));
        }
    }

    parts.join(PARAGRAPH_BREAK)
}

/// Target size of a synthetic page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Chars(usize),
    Words(usize),
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Chars(2000)
    }
}

impl PageSize {
    fn limit(self) -> usize {
        match self {
            PageSize::Chars(n) | PageSize::Words(n) => n,
        }
    }

    fn measure(self, text: &str) -> usize {
        match self {
            PageSize::Chars(_) => text.chars().count(),
            PageSize::Words(_) => text.split_whitespace().count(),
        }
    }
}

/// Cut chapter texts into pages of about `size`, numbered from 1.
///
/// Pages break between sentences and at every chapter change. A sentence
/// longer than a page gets a page of its own.
pub fn synthetic_pages<'a, I>(chapters: I, size: PageSize) -> Vec<Page>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    static PARAGRAPHS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[^\S\n]*\n\s*").expect("valid regex"));

    let mut cutter = PageCutter {
        pages: Vec::new(),
        current: String::new(),
        current_size: 0,
        paragraph_pending: false,
        chapter_title: None,
    };

    for (title, text) in chapters {
        if text.trim().is_empty() {
            continue;
        }
        cutter.finish_page();
        cutter.chapter_title = Some(title.to_string());

        for paragraph in PARAGRAPHS_RE.split(&text) {
            for sentence in sentences(paragraph) {
                let sentence_size = size.measure(sentence);
                if cutter.current.is_empty() && sentence_size > size.limit() {
                    cutter.push(sentence);
                    cutter.finish_page();
                    continue;
                }
                if !cutter.current.is_empty() && cutter.current_size + sentence_size > size.limit() {
                    cutter.finish_page();
                }
                cutter.push(sentence);
                cutter.current_size += sentence_size;
            }
            cutter.paragraph_pending = true;
        }
    }
    cutter.finish_page();
    cutter.pages
}

struct PageCutter {
    pages: Vec<Page>,
    current: String,
    current_size: usize,
    paragraph_pending: bool,
    chapter_title: Option<String>,
}

impl PageCutter {
    fn push(&mut self, sentence: &str) {
        if !self.current.is_empty() {
            self.current.push_str(if self.paragraph_pending { PARAGRAPH_BREAK } else { " " });
        }
        self.current.push_str(sentence);
        self.paragraph_pending = false;
    }

    fn finish_page(&mut self) {
        if !self.current.is_empty() {
            self.pages.push(Page {
                label: (self.pages.len() + 1).to_string(),
                chapter_title: self.chapter_title.clone(),
                text: std::mem::take(&mut self.current),
            });
        }
        self.current_size = 0;
        self.paragraph_pending = false;
    }
}

/// Split a paragraph after sentence-ending punctuation and any closing
/// quotes or brackets that follow it.
fn sentences(paragraph: &str) -> Vec<&str> {
    static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"([.!?\u{2026}]+["'\u{201d}\u{2019})\]]*)\s+"#).expect("valid regex")
    });

    let mut out = Vec::new();
    let mut start = 0;
    for caps in SENTENCE_END_RE.captures_iter(paragraph) {
        let (Some(end), Some(whole)) = (caps.get(1), caps.get(0)) else {
            continue;
        };
        out.push(paragraph[start..end.end()].trim());
        start = whole.end();
    }
    out.push(paragraph[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}
