//! Position resolution: navigation targets to locations in the spine.
//!
//! A [`ResolvedPosition`] names a spine document and a node inside it by its
//! pre-order index. Positions order the way a reader meets them, so chapter
//! boundaries can be compared and sorted directly.

mod strategy;
mod tree;

use crate::book::Container;
use crate::error::Warning;
use crate::extract;
use crate::nav::{NavNodeId, NavTarget, NavTree};
use crate::slice;

pub use strategy::{STRATEGIES, Strategy, by_anchor_name, by_id, by_raw_token, by_source_pattern};
pub use tree::{Chapter, ChapterId, ChapterTree, Span};

/// Id of the synthesized chapter holding content before the first entry.
pub const PREFIX_ID: &str = "prefix";
pub const PREFIX_TITLE: &str = "Introduction";

/// A location in the book: spine index, then pre-order node index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedPosition {
    pub spine: usize,
    pub offset: usize,
}

impl ResolvedPosition {
    pub const fn new(spine: usize, offset: usize) -> Self {
        Self { spine, offset }
    }

    /// The first position of the book.
    pub const fn begin() -> Self {
        Self::new(0, 0)
    }

    /// The position just past the last spine document.
    pub const fn end_of_book(spine_len: usize) -> Self {
        Self::new(spine_len, 0)
    }
}

/// Outcome of resolving one navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedPosition),
    /// The document exists but the anchor does not; degraded to its top.
    FragmentNotFound(ResolvedPosition),
    /// The target document is not in the spine.
    UnknownDocument,
}

impl Resolution {
    pub fn position(self) -> Option<ResolvedPosition> {
        match self {
            Resolution::Found(p) | Resolution::FragmentNotFound(p) => Some(p),
            Resolution::UnknownDocument => None,
        }
    }
}

/// Locate a fragment id in a document by trying each strategy in order.
pub fn locate(document: &crate::dom::Document, fragment: &str) -> Option<usize> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let position = strategy(document, fragment)?;
        tracing::debug!(document = document.path(), fragment, strategy = name, position, "anchor located");
        Some(position)
    })
}

/// Resolve one navigation target against the spine.
pub fn resolve_target(container: &Container, target: &NavTarget) -> Resolution {
    let Some(spine) = container.spine_index_of(&target.document) else {
        return Resolution::UnknownDocument;
    };
    let top = ResolvedPosition::new(spine, 0);
    let (Some(fragment), Some(document)) =
        (target.fragment.as_deref(), container.spine_document(spine))
    else {
        return Resolution::Found(top);
    };

    match locate(document, fragment) {
        Some(offset) => Resolution::Found(ResolvedPosition::new(spine, offset)),
        None => Resolution::FragmentNotFound(top),
    }
}

/// A resolved chapter tree and the problems met while building it.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub tree: ChapterTree,
    pub warnings: Vec<Warning>,
}

/// Resolve every navigation entry and compute chapter spans.
///
/// Entries pointing outside the spine are dropped unless they still group
/// resolvable children. Content before the first entry becomes a
/// synthesized [`PREFIX_TITLE`] chapter.
pub fn resolve_chapters(container: &Container, nav: &NavTree) -> Resolved {
    let mut warnings = Vec::new();
    let mut starts = Vec::with_capacity(nav.len());
    let mut unknown = Vec::with_capacity(nav.len());

    for (_, node) in nav.iter() {
        let Some(target) = &node.target else {
            starts.push(None);
            unknown.push(false);
            continue;
        };
        let resolution = resolve_target(container, target);
        match resolution {
            Resolution::Found(_) => {}
            Resolution::FragmentNotFound(_) => warnings.push(Warning::FragmentNotFound {
                title: node.title.clone(),
                document: target.document.clone(),
                fragment: target.fragment.clone().unwrap_or_default(),
            }),
            Resolution::UnknownDocument => warnings.push(Warning::UnknownDocument {
                title: node.title.clone(),
                href: target.href.clone(),
            }),
        }
        starts.push(resolution.position());
        unknown.push(resolution == Resolution::UnknownDocument);
    }

    let mut tree = ChapterTree::default();
    if let Some(first) = starts.iter().flatten().min().copied()
        && first > ResolvedPosition::begin()
        && extract::has_text(container, Span::new(ResolvedPosition::begin(), first))
    {
        tree.push(Chapter {
            id: PREFIX_ID.to_string(),
            title: PREFIX_TITLE.to_string(),
            depth: 0,
            parent: None,
            children: Vec::new(),
            href: None,
            start: Some(ResolvedPosition::begin()),
            span: None,
            subtree_span: None,
            synthesized: true,
        });
    }

    let mut builder = TreeBuilder {
        nav,
        starts: &starts,
        unknown: &unknown,
        tree,
    };
    for &root in nav.roots() {
        builder.add(root, None);
    }
    let mut tree = builder.tree;

    check_ordering(&tree, &mut warnings);
    slice::assign_spans(&mut tree, container.spine_len());

    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    Resolved { tree, warnings }
}

struct TreeBuilder<'a> {
    nav: &'a NavTree,
    starts: &'a [Option<ResolvedPosition>],
    unknown: &'a [bool],
    tree: ChapterTree,
}

impl TreeBuilder<'_> {
    /// An entry survives unless it points outside the spine and has no surviving children.
    fn survives(&self, id: NavNodeId) -> bool {
        !self.unknown[id.index()]
            || self.nav.get(id).is_some_and(|node| {
                node.children.iter().any(|&child| self.survives(child))
            })
    }

    fn add(&mut self, id: NavNodeId, parent: Option<ChapterId>) {
        if !self.survives(id) {
            return;
        }
        let Some(node) = self.nav.get(id) else {
            return;
        };
        let depth = parent
            .and_then(|p| self.tree.get(p))
            .map_or(0, |p| p.depth + 1);

        let chapter_id = self.tree.push(Chapter {
            id: node.id.clone(),
            title: node.title.clone(),
            depth,
            parent,
            children: Vec::new(),
            href: node.target.as_ref().map(|t| t.href.clone()),
            start: self.starts[id.index()],
            span: None,
            subtree_span: None,
            synthesized: false,
        });
        for &child in &node.children {
            self.add(child, Some(chapter_id));
        }
    }
}

/// Warn about entries that resolve before any earlier entry in navigation order.
fn check_ordering(tree: &ChapterTree, warnings: &mut Vec<Warning>) {
    let mut furthest: Option<ResolvedPosition> = None;
    for (_, chapter) in tree.iter().filter(|(_, c)| !c.synthesized) {
        let Some(start) = chapter.start else {
            continue;
        };
        if furthest.is_some_and(|max| start < max) {
            warnings.push(Warning::MalformedOrdering {
                id: chapter.id.clone(),
                title: chapter.title.clone(),
            });
        }
        furthest = furthest.max(Some(start));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::book::{MEDIA_TYPE_XHTML, ManifestItem, Metadata, SpineRef};
    use crate::nav::{NavSource, RawEntry};

    fn container(docs: &[(&str, &str)]) -> Container {
        let manifest = docs
            .iter()
            .enumerate()
            .map(|(i, (path, _))| ManifestItem::new(format!("d{i}"), *path, MEDIA_TYPE_XHTML))
            .collect();
        let spine = (0..docs.len()).map(|i| SpineRef::new(format!("d{i}"))).collect();
        let files: HashMap<_, _> = docs
            .iter()
            .map(|(path, body)| (path.to_string(), format!("<html><body>{body}</body></html>")))
            .collect();
        Container::from_parts(Metadata::default(), manifest, spine, None, files)
    }

    fn nav(entries: Vec<RawEntry>) -> NavTree {
        NavTree::from_entries(&entries, "toc.ncx", NavSource::Ncx)
    }

    #[test]
    fn test_positions_order_by_spine_then_offset() {
        assert!(ResolvedPosition::new(0, 900) < ResolvedPosition::new(1, 0));
        assert!(ResolvedPosition::new(1, 2) < ResolvedPosition::new(1, 3));
        assert!(ResolvedPosition::new(1, 0) < ResolvedPosition::end_of_book(2));
    }

    #[test]
    fn test_resolve_target_outcomes() {
        let c = container(&[("a.xhtml", r#"<p>x</p><h2 id="s">S</h2>"#)]);

        let found = resolve_target(&c, &NavTarget::resolve("a.xhtml#s", "toc.ncx"));
        assert!(matches!(found, Resolution::Found(p) if p.spine == 0 && p.offset > 0));

        let top = resolve_target(&c, &NavTarget::resolve("a.xhtml", "toc.ncx"));
        assert_eq!(top, Resolution::Found(ResolvedPosition::new(0, 0)));

        let missing = resolve_target(&c, &NavTarget::resolve("a.xhtml#nope", "toc.ncx"));
        assert_eq!(missing, Resolution::FragmentNotFound(ResolvedPosition::new(0, 0)));

        let unknown = resolve_target(&c, &NavTarget::resolve("b.xhtml", "toc.ncx"));
        assert_eq!(unknown, Resolution::UnknownDocument);
    }

    #[test]
    fn test_unknown_document_dropped_but_groups_kept() {
        let c = container(&[("a.xhtml", "<p>A</p>")]);
        let resolved = resolve_chapters(
            &c,
            &nav(vec![
                RawEntry::new("Gone", "missing.xhtml"),
                RawEntry::new("Group", "missing.xhtml").with_child(RawEntry::new("A", "a.xhtml")),
            ]),
        );

        let titles: Vec<_> = resolved.tree.iter().map(|(_, c)| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Group", "A"]);
        assert_eq!(resolved.tree.get(ChapterId(0)).unwrap().start, None);
        assert_eq!(
            resolved
                .warnings
                .iter()
                .filter(|w| matches!(w, Warning::UnknownDocument { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_malformed_ordering_warning() {
        let c = container(&[("a.xhtml", "<p>A</p>"), ("b.xhtml", "<p>B</p>")]);
        let resolved = resolve_chapters(
            &c,
            &nav(vec![
                RawEntry::new("B", "b.xhtml").with_id("b"),
                RawEntry::new("A", "a.xhtml").with_id("a"),
            ]),
        );
        assert_eq!(
            resolved.warnings,
            vec![Warning::MalformedOrdering {
                id: "a".into(),
                title: "A".into()
            }]
        );
        // Spans still follow reading order
        let a = resolved.tree.find("a").unwrap();
        assert_eq!(
            a.span,
            Some(Span::new(ResolvedPosition::new(0, 0), ResolvedPosition::new(1, 0)))
        );
    }

    #[test]
    fn test_ordering_checked_against_every_earlier_entry() {
        let c = container(&[
            ("a.xhtml", r#"<p id="x1">One</p><p id="x2">Two</p>"#),
            ("b.xhtml", "<p>B</p>"),
        ]);
        let resolved = resolve_chapters(
            &c,
            &nav(vec![
                RawEntry::new("A", "b.xhtml").with_id("a"),
                RawEntry::new("B", "a.xhtml#x1").with_id("b"),
                RawEntry::new("C", "a.xhtml#x2").with_id("c"),
            ]),
        );
        let flagged: Vec<_> = resolved
            .warnings
            .iter()
            .map(|w| match w {
                Warning::MalformedOrdering { id, .. } => id.as_str(),
                other => panic!("unexpected warning {other:?}"),
            })
            .collect();
        assert_eq!(flagged, vec!["b", "c"]);
    }

    #[test]
    fn test_reserved_prefix_id_not_shadowed() {
        let c = container(&[("front.xhtml", "<p>Front matter</p>"), ("a.xhtml", "<p>A</p>")]);
        let resolved = resolve_chapters(&c, &nav(vec![RawEntry::new("A", "a.xhtml").with_id(PREFIX_ID)]));

        let ids: Vec<_> = resolved.tree.iter().map(|(_, c)| c.id.as_str()).collect();
        assert_eq!(ids, vec![PREFIX_ID, "nav-0"]);
        assert!(resolved.tree.find(PREFIX_ID).unwrap().synthesized);
    }

    #[test]
    fn test_prefix_chapter_for_leading_content() {
        let c = container(&[("front.xhtml", "<p>Front matter</p>"), ("a.xhtml", "<p>A</p>")]);
        let resolved = resolve_chapters(&c, &nav(vec![RawEntry::new("A", "a.xhtml")]));

        let first = resolved.tree.get(ChapterId(0)).unwrap();
        assert_eq!(first.id, PREFIX_ID);
        assert_eq!(first.title, PREFIX_TITLE);
        assert!(first.synthesized);
        assert_eq!(
            first.span,
            Some(Span::new(ResolvedPosition::begin(), ResolvedPosition::new(1, 0)))
        );
    }

    #[test]
    fn test_no_prefix_without_leading_text() {
        let c = container(&[("blank.xhtml", "<div>  </div>"), ("a.xhtml", "<p>A</p>")]);
        let resolved = resolve_chapters(&c, &nav(vec![RawEntry::new("A", "a.xhtml")]));
        assert_eq!(resolved.tree.len(), 1);
        assert!(resolved.tree.find(PREFIX_ID).is_none());
    }
}
