//! Container model: manifest, spine, metadata and parsed documents.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::Document;
use crate::util::percent_decode;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

pub const MEDIA_TYPE_XHTML: &str = "application/xhtml+xml";
pub const MEDIA_TYPE_HTML: &str = "text/html";
pub const MEDIA_TYPE_NCX: &str = "application/x-dtbncx+xml";

/// Book metadata (Dublin Core), passed through as plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub contributors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub date: Option<String>,
    pub rights: Option<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// First four-digit year (19xx or 20xx) in the date, else the raw date.
    pub fn publication_year(&self) -> Option<String> {
        let date = self.date.as_deref()?;
        Some(
            YEAR.find(date)
                .map_or_else(|| date.to_string(), |m| m.as_str().to_string()),
        )
    }
}

/// A manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Normalized archive path.
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: &str) -> Self {
        self.properties = properties.split_ascii_whitespace().map(String::from).collect();
        self
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// True for HTML and XHTML content documents.
    pub fn is_html(&self) -> bool {
        self.media_type == MEDIA_TYPE_XHTML
            || self.media_type == MEDIA_TYPE_HTML
            || (self.media_type.is_empty()
                && [".xhtml", ".html", ".htm"]
                    .iter()
                    .any(|ext| self.href.to_ascii_lowercase().ends_with(ext)))
    }

    pub fn is_ncx(&self) -> bool {
        self.media_type == MEDIA_TYPE_NCX
    }
}

/// A position in the reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    pub idref: String,
    pub index: usize,
    pub linear: bool,
}

/// A spine reference as written in the package document, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineRef {
    pub idref: String,
    pub linear: bool,
}

impl SpineRef {
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
        }
    }
}

/// The unpacked book: every structure the navigation and text stages read.
///
/// Built once and read-only afterwards.
#[derive(Debug, Default)]
pub struct Container {
    metadata: Metadata,
    manifest: Vec<ManifestItem>,
    spine: Vec<SpineEntry>,
    toc_id: Option<String>,
    /// Parsed HTML documents by archive path.
    documents: HashMap<String, Document>,
    /// Other text resources (NCX) by archive path.
    texts: HashMap<String, String>,
    /// Archive path -> first spine index.
    spine_paths: HashMap<String, usize>,
}

impl Container {
    /// Assemble a container from package data and decoded file contents.
    ///
    /// HTML manifest items are parsed; everything else in `files` is kept as
    /// text. Spine references naming no manifest item, or an item whose file
    /// is missing, are skipped before indices are assigned.
    pub fn from_parts(
        metadata: Metadata,
        manifest: Vec<ManifestItem>,
        spine_refs: Vec<SpineRef>,
        toc_id: Option<String>,
        mut files: HashMap<String, String>,
    ) -> Self {
        let mut documents = HashMap::new();
        for item in manifest.iter().filter(|item| item.is_html()) {
            if let Some(source) = files.remove(&item.href) {
                let document = Document::parse(item.href.clone(), source);
                documents.insert(item.href.clone(), document);
            }
        }

        let mut spine = Vec::new();
        let mut spine_paths = HashMap::new();
        for spine_ref in spine_refs {
            let Some(item) = manifest.iter().find(|item| item.id == spine_ref.idref) else {
                tracing::warn!(idref = %spine_ref.idref, "spine item not in manifest, skipping");
                continue;
            };
            if !documents.contains_key(&item.href) {
                tracing::warn!(href = %item.href, "spine document missing or not HTML, skipping");
                continue;
            }
            let index = spine.len();
            spine_paths.entry(item.href.clone()).or_insert(index);
            spine.push(SpineEntry {
                idref: spine_ref.idref,
                index,
                linear: spine_ref.linear,
            });
        }

        Self {
            metadata,
            manifest,
            spine,
            toc_id,
            documents,
            texts: files,
            spine_paths,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn manifest(&self) -> &[ManifestItem] {
        &self.manifest
    }

    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn spine(&self) -> &[SpineEntry] {
        &self.spine
    }

    pub fn spine_len(&self) -> usize {
        self.spine.len()
    }

    /// Archive path of the document at a spine index.
    pub fn spine_path(&self, index: usize) -> Option<&str> {
        let entry = self.spine.get(index)?;
        self.manifest_item(&entry.idref).map(|item| item.href.as_str())
    }

    /// Parsed document at a spine index.
    pub fn spine_document(&self, index: usize) -> Option<&Document> {
        self.spine_path(index).and_then(|path| self.documents.get(path))
    }

    /// Spine index of a document path: exact match first, then percent-decoded.
    pub fn spine_index_of(&self, path: &str) -> Option<usize> {
        if let Some(&index) = self.spine_paths.get(path) {
            return Some(index);
        }
        let decoded = percent_decode(path);
        self.spine_paths.get(decoded.as_ref()).copied()
    }

    /// Parsed HTML document by archive path.
    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents
            .get(path)
            .or_else(|| self.documents.get(percent_decode(path).as_ref()))
    }

    /// Non-HTML text resource by archive path.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.texts.get(path).map(String::as_str)
    }

    /// The EPUB 3 navigation document item (`properties="nav"`).
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.has_property("nav"))
    }

    /// The NCX item: the one named by the spine `toc` attribute, else any NCX.
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.toc_id
            .as_deref()
            .and_then(|id| self.manifest_item(id))
            .filter(|item| self.texts.contains_key(&item.href))
            .or_else(|| self.manifest.iter().find(|item| item.is_ncx()))
    }

    /// HTML documents in spine order, then the rest of the manifest.
    pub fn html_items(&self) -> impl Iterator<Item = &ManifestItem> {
        let spine_items = self
            .spine
            .iter()
            .filter_map(|entry| self.manifest_item(&entry.idref));
        let others = self
            .manifest
            .iter()
            .filter(|item| item.is_html() && !self.spine_paths.contains_key(&item.href));
        spine_items.chain(others)
    }
}
