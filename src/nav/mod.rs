//! Navigation parsing: the book's table of contents as a [`NavTree`].
//!
//! Three sources are tried in order, and the first that yields entries wins:
//!
//! 1. the EPUB 3 navigation document (manifest item with `properties="nav"`),
//! 2. the EPUB 2 NCX (named by the spine `toc` attribute, else any NCX item),
//! 3. any other HTML document carrying a `<nav epub:type="toc">`.
//!
//! Both formats are first read into [`RawEntry`] trees, which
//! [`NavTree::from_entries`] turns into an arena with stable ids and resolved
//! target paths.

mod html;
mod ncx;

use std::collections::HashMap;

use crate::book::{Container, ManifestItem};
use crate::error::{Error, Result};
use crate::resolve::PREFIX_ID;
use crate::util::{collapse_whitespace, parent_dir, percent_decode, resolve_path, split_href};

pub use html::{find_nav, parse_nav_entries, parse_nav_pages};
pub use ncx::{NcxDocument, parse_ncx};

/// Title given to entries whose label is empty.
pub const UNTITLED: &str = "Untitled";

/// Index of a node in a [`NavTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavNodeId(pub u32);

impl NavNodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a navigation entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTarget {
    /// The href exactly as written in the navigation document.
    pub href: String,
    /// Archive path of the target document, resolved and percent-decoded.
    pub document: String,
    pub fragment: Option<String>,
}

impl NavTarget {
    /// Resolve `href` relative to the directory of the navigation document at `base`.
    pub fn resolve(href: &str, base: &str) -> Self {
        let (path, fragment) = split_href(href);
        let document = if path.is_empty() {
            base.to_string()
        } else {
            percent_decode(&resolve_path(parent_dir(base), path)).into_owned()
        };
        Self {
            href: href.to_string(),
            document,
            fragment: fragment.map(|f| percent_decode(f).into_owned()),
        }
    }
}

/// One table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    /// Source id when present and unique, else `nav-{preorder index}`.
    pub id: String,
    pub title: String,
    /// `None` for entries without a link.
    pub target: Option<NavTarget>,
    pub parent: Option<NavNodeId>,
    pub children: Vec<NavNodeId>,
    /// 0 for top-level entries.
    pub depth: usize,
    /// NCX `playOrder`, informational only.
    pub play_order: Option<u32>,
}

/// A navigation entry as read from the source document, before id assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: String,
    pub href: Option<String>,
    pub play_order: Option<u32>,
    pub children: Vec<RawEntry>,
}

impl RawEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: Some(href.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_child(mut self, child: RawEntry) -> Self {
        self.children.push(child);
        self
    }
}

/// Which kind of document a [`NavTree`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSource {
    Nav,
    Ncx,
    /// A `<nav epub:type="toc">` found in an ordinary content document.
    Embedded,
}

/// The table of contents as an arena, nodes allocated in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTree {
    nodes: Vec<NavNode>,
    roots: Vec<NavNodeId>,
    source: NavSource,
    /// Archive path of the navigation document.
    path: String,
}

impl NavTree {
    /// Build a tree from parsed entries of the navigation document at `path`.
    pub fn from_entries(entries: &[RawEntry], path: &str, source: NavSource) -> Self {
        let mut id_counts: HashMap<&str, usize> = HashMap::new();
        count_ids(entries, &mut id_counts);

        let mut tree = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            source,
            path: path.to_string(),
        };
        for entry in entries {
            let root = tree.push(entry, None, 0, &id_counts);
            tree.roots.push(root);
        }
        tree
    }

    fn push(
        &mut self,
        entry: &RawEntry,
        parent: Option<NavNodeId>,
        depth: usize,
        id_counts: &HashMap<&str, usize>,
    ) -> NavNodeId {
        let index = self.nodes.len();
        let node_id = NavNodeId(index as u32);

        let id = match entry.id.as_deref() {
            Some(id) if !id.is_empty() && id != PREFIX_ID && id_counts.get(id) == Some(&1) => id.to_string(),
            _ => synthesized_id(index, id_counts),
        };
        let title = match collapse_whitespace(&entry.title) {
            t if t.is_empty() => UNTITLED.to_string(),
            t => t,
        };
        let target = entry
            .href
            .as_deref()
            .filter(|href| !href.trim().is_empty())
            .map(|href| NavTarget::resolve(href.trim(), &self.path));

        self.nodes.push(NavNode {
            id,
            title,
            target,
            parent,
            children: Vec::new(),
            depth,
            play_order: entry.play_order,
        });

        for child in &entry.children {
            let child_id = self.push(child, Some(node_id), depth + 1, id_counts);
            self.nodes[index].children.push(child_id);
        }
        node_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NavNodeId) -> Option<&NavNode> {
        self.nodes.get(id.index())
    }

    pub fn roots(&self) -> &[NavNodeId] {
        &self.roots
    }

    pub fn source(&self) -> NavSource {
        self.source
    }

    /// Archive path of the navigation document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NavNodeId, &NavNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NavNodeId(i as u32), node))
    }

    /// Look a node up by its id string.
    pub fn find(&self, id: &str) -> Option<NavNodeId> {
        self.iter().find(|(_, node)| node.id == id).map(|(nid, _)| nid)
    }
}

fn count_ids<'a>(entries: &'a [RawEntry], counts: &mut HashMap<&'a str, usize>) {
    for entry in entries {
        if let Some(id) = entry.id.as_deref() {
            *counts.entry(id).or_default() += 1;
        }
        count_ids(&entry.children, counts);
    }
}

fn synthesized_id(index: usize, source_ids: &HashMap<&str, usize>) -> String {
    let base = format!("nav-{index}");
    if !source_ids.contains_key(base.as_str()) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !source_ids.contains_key(candidate.as_str()))
        .unwrap_or(base)
}

/// A print page from the book's page list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub label: String,
    pub target: NavTarget,
}

/// Read the table of contents using the selection policy described in the module docs.
pub fn parse_navigation(container: &Container) -> Result<NavTree> {
    if let Some(item) = container.nav_item() {
        match nav_from_html(container, item, NavSource::Nav) {
            Some(tree) => return Ok(tree),
            None => tracing::info!(href = %item.href, "navigation document has no entries"),
        }
    }

    if let Some(item) = container.ncx_item() {
        match nav_from_ncx(container, item)? {
            Some(tree) => return Ok(tree),
            None => tracing::info!(href = %item.href, "NCX has no entries"),
        }
    }

    let nav_href = container.nav_item().map(|item| item.href.as_str());
    for item in container
        .html_items()
        .filter(|item| Some(item.href.as_str()) != nav_href)
    {
        if let Some(tree) = nav_from_html(container, item, NavSource::Embedded) {
            return Ok(tree);
        }
    }

    Err(Error::NoNavigationFound)
}

fn nav_from_html(container: &Container, item: &ManifestItem, source: NavSource) -> Option<NavTree> {
    let document = container.document(&item.href)?;
    let entries = parse_nav_entries(document);
    if entries.is_empty() {
        return None;
    }
    let tree = NavTree::from_entries(&entries, &item.href, source);
    tracing::info!(href = %item.href, entries = tree.len(), ?source, "using navigation document");
    Some(tree)
}

fn nav_from_ncx(container: &Container, item: &ManifestItem) -> Result<Option<NavTree>> {
    let Some(text) = container.text(&item.href) else {
        return Ok(None);
    };
    let ncx = parse_ncx(text)?;
    if ncx.nav_map.is_empty() {
        return Ok(None);
    }
    let tree = NavTree::from_entries(&ncx.nav_map, &item.href, NavSource::Ncx);
    tracing::info!(href = %item.href, entries = tree.len(), "using NCX");
    Ok(Some(tree))
}

/// Read the print page list: NAV `page-list` first, then NCX `pageList`,
/// then any content document with an embedded page list.
///
/// A missing or unreadable page list yields an empty vector.
pub fn parse_page_list(container: &Container) -> Vec<PageTarget> {
    let resolve = |raw: Vec<(String, String)>, base: &str| -> Vec<PageTarget> {
        raw.into_iter()
            .map(|(label, href)| PageTarget {
                label,
                target: NavTarget::resolve(&href, base),
            })
            .collect()
    };

    if let Some(item) = container.nav_item()
        && let Some(document) = container.document(&item.href)
    {
        let pages = parse_nav_pages(document);
        if !pages.is_empty() {
            return resolve(pages, &item.href);
        }
    }

    if let Some(item) = container.ncx_item()
        && let Some(text) = container.text(&item.href)
    {
        match parse_ncx(text) {
            Ok(ncx) if !ncx.page_list.is_empty() => return resolve(ncx.page_list, &item.href),
            Ok(_) => {}
            Err(e) => tracing::warn!(href = %item.href, error = %e, "unreadable NCX page list"),
        }
    }

    for item in container.html_items() {
        if let Some(document) = container.document(&item.href) {
            let pages = parse_nav_pages(document);
            if !pages.is_empty() {
                return resolve(pages, &item.href);
            }
        }
    }

    Vec::new()
}
