//! # spinecut
//!
//! Chapter-segmented plain text from EPUB files.
//!
//! Chapter boundaries come from the book's own navigation (the EPUB 3 `nav`
//! document, or the EPUB 2 NCX), never from guessing at headings. Each
//! navigation entry is resolved to a position inside the spine, content is
//! sliced between consecutive positions, and the slices are turned into
//! cleaned plain text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use spinecut::{Book, CleaningConfig, RenderOptions};
//!
//! let book = Book::open("input.epub").unwrap();
//!
//! for (_, chapter) in book.chapters().iter() {
//!     println!("{}{}", "  ".repeat(chapter.depth), chapter.title);
//! }
//!
//! let text = book.extract_all(CleaningConfig::default(), RenderOptions::default());
//! println!("{text}");
//! ```
//!
//! ## Pipeline
//!
//! 1. [`epub`] unpacks the archive into a [`Container`].
//! 2. [`nav`] reads the table of contents into a [`NavTree`].
//! 3. [`resolve`] locates every entry and builds a [`ChapterTree`] with spans.
//! 4. [`slice`] and [`extract`] turn spans into text.
//! 5. [`clean`] removes print artifacts; [`render`] adds chapter markers.
//! 6. [`pages`] cuts the text by print page instead, and [`front_matter`]
//!    optionally drops tables of contents and prefaces.

pub mod book;
pub mod clean;
pub mod dom;
pub mod epub;
pub mod error;
pub mod extract;
pub mod front_matter;
pub mod nav;
pub mod pages;
pub mod render;
pub mod resolve;
pub mod slice;
pub(crate) mod util;

use std::io::{Read, Seek};
use std::path::Path;

pub use book::{Container, ManifestItem, Metadata, SpineEntry};
pub use clean::{CleaningConfig, clean};
pub use epub::{read_epub, read_epub_from_reader};
pub use error::{Error, Result, Warning};
pub use nav::{NavNode, NavNodeId, NavSource, NavTarget, NavTree, PageTarget, parse_navigation};
pub use front_matter::FrontMatter;
pub use pages::{Page, PageSize};
pub use render::{ParagraphStyle, RenderOptions, parse_chapter_range};
pub use resolve::{Chapter, ChapterId, ChapterTree, Resolved, ResolvedPosition, Span, resolve_chapters};

/// An opened book with its navigation resolved.
///
/// Everything is read and resolved up front; the book is immutable afterwards.
#[derive(Debug)]
pub struct Book {
    container: Container,
    nav: NavTree,
    resolved: Resolved,
    page_targets: Vec<PageTarget>,
}

impl Book {
    /// Open an EPUB file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_container(read_epub(path)?)
    }

    /// Open an EPUB from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_container(read_epub_from_reader(reader)?)
    }

    /// Parse navigation and resolve chapters for an already unpacked container.
    ///
    /// Fails with [`Error::NoNavigationFound`] when the book has no usable
    /// table of contents.
    pub fn from_container(container: Container) -> Result<Self> {
        let nav = parse_navigation(&container)?;
        let resolved = resolve_chapters(&container, &nav);
        let page_targets = nav::parse_page_list(&container);
        tracing::debug!(
            chapters = resolved.tree.len(),
            warnings = resolved.warnings.len(),
            pages = page_targets.len(),
            "book opened"
        );

        Ok(Self {
            container,
            nav,
            resolved,
            page_targets,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn metadata(&self) -> &Metadata {
        self.container.metadata()
    }

    /// The table of contents as read from the navigation document.
    pub fn nav(&self) -> &NavTree {
        &self.nav
    }

    /// Resolved chapters, in navigation pre-order.
    pub fn chapters(&self) -> &ChapterTree {
        &self.resolved.tree
    }

    /// Problems met while resolving [`Book::chapters`].
    pub fn warnings(&self) -> &[Warning] {
        &self.resolved.warnings
    }

    /// Resolve another navigation tree against this book's spine.
    pub fn resolve_chapters(&self, nav: &NavTree) -> Resolved {
        resolve_chapters(&self.container, nav)
    }

    /// Cleaned text of a chapter's own span, excluding its sub-chapters.
    ///
    /// Unresolved chapters give an empty string.
    pub fn extract(&self, chapter: &Chapter, config: CleaningConfig) -> String {
        self.span_text(chapter.span, config)
    }

    /// Cleaned text of a chapter together with all of its sub-chapters.
    pub fn extract_subtree(&self, chapter: &Chapter, config: CleaningConfig) -> String {
        self.span_text(chapter.subtree_span, config)
    }

    fn span_text(&self, span: Option<Span>, config: CleaningConfig) -> String {
        span.map(|span| clean(&extract::span_text(&self.container, span), config))
            .unwrap_or_default()
    }

    /// Render the chapters with the given ids, in the order given.
    ///
    /// Ids that name no chapter are ignored.
    pub fn extract_chapters(&self, ids: &[&str], config: CleaningConfig, options: RenderOptions) -> String {
        let chapters = ids.iter().filter_map(|id| {
            let chapter = self.chapters().find(id);
            if chapter.is_none() {
                tracing::debug!(id, "no chapter with this id");
            }
            chapter
        });
        self.render(chapters, config, options)
    }

    /// Render every chapter in navigation order.
    pub fn extract_all(&self, config: CleaningConfig, options: RenderOptions) -> String {
        self.render(self.chapters().iter().map(|(_, c)| c), config, options)
    }

    fn render<'a>(
        &self,
        chapters: impl Iterator<Item = &'a Chapter>,
        config: CleaningConfig,
        options: RenderOptions,
    ) -> String {
        let front_matter = options.skip_front_matter.then(|| self.front_matter());
        let texts = chapters
            .map(|chapter| (chapter.title.as_str(), self.extract(chapter, config)))
            .filter(|(title, text)| {
                let skip = front_matter
                    .as_ref()
                    .is_some_and(|fm| fm.is_front_matter(Some(*title), text));
                if skip {
                    tracing::debug!(title, "skipping front-matter chapter");
                }
                !skip
            });
        render::render_chapters(texts, options)
    }

    /// Front-matter detector knowing this book's title and chapter titles.
    pub fn front_matter(&self) -> FrontMatter {
        FrontMatter::new(
            std::iter::once(self.metadata().title.as_str())
                .chain(self.chapters().iter().map(|(_, c)| c.title.as_str())),
        )
    }

    /// True when the book carries a print page list.
    pub fn has_page_list(&self) -> bool {
        !self.page_targets.is_empty()
    }

    pub fn page_targets(&self) -> &[PageTarget] {
        &self.page_targets
    }

    /// Text of every print page, in reading order.
    pub fn pages(&self, config: CleaningConfig) -> Vec<Page> {
        pages::extract_pages(&self.container, &self.page_targets, self.chapters(), config)
    }

    /// Print pages when the book has a page list, otherwise synthetic pages
    /// of about `size`.
    pub fn pages_or_synthetic(&self, config: CleaningConfig, size: PageSize) -> Vec<Page> {
        if self.has_page_list() {
            return self.pages(config);
        }
        tracing::debug!(?size, "no page list, cutting synthetic pages");
        self.synthetic_pages(config, size)
    }

    /// Every chapter's text cut into pages of about `size`.
    pub fn synthetic_pages(&self, config: CleaningConfig, size: PageSize) -> Vec<Page> {
        pages::synthetic_pages(
            self.chapters()
                .iter()
                .map(|(_, chapter)| (chapter.title.as_str(), self.extract(chapter, config))),
            size,
        )
    }

    /// Render all print pages with page and chapter markers.
    pub fn render_pages(&self, config: CleaningConfig, options: RenderOptions) -> String {
        self.render_page_set(self.pages(config), options)
    }

    /// Render print pages, or synthetic pages when there is no page list.
    pub fn render_pages_or_synthetic(&self, config: CleaningConfig, size: PageSize, options: RenderOptions) -> String {
        self.render_page_set(self.pages_or_synthetic(config, size), options)
    }

    fn render_page_set(&self, pages: Vec<Page>, options: RenderOptions) -> String {
        let pages = if options.skip_front_matter {
            self.front_matter().filter_pages(pages)
        } else {
            pages
        };
        pages::render_pages(&pages, options)
    }
}
