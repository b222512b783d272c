//! Chapter spans and the document fragments that make them up.

use std::ops::Range;

use crate::book::Container;
use crate::resolve::{ChapterId, ChapterTree, ResolvedPosition, Span};

/// A contiguous piece of one spine document: a half-open range of pre-order positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub spine: usize,
    /// Archive path of the document.
    pub document: String,
    pub range: Range<usize>,
}

/// Fill in `span` and `subtree_span` for every chapter.
///
/// Own spans run from each start to the next start in reading order. Subtree
/// spans run to the next sibling's start, else to the end of the parent's
/// subtree, else to the end of the book.
pub fn assign_spans(tree: &mut ChapterTree, spine_len: usize) {
    let end_of_book = ResolvedPosition::end_of_book(spine_len);

    let order = tree.reading_order();
    for (i, id) in order.iter().enumerate() {
        let next = order
            .get(i + 1)
            .and_then(|next| tree.chapters[next.index()].start)
            .unwrap_or(end_of_book);
        let chapter = &mut tree.chapters[id.index()];
        if let Some(start) = chapter.start {
            chapter.span = Some(Span::new(start, next.max(start)));
        }
    }

    // Grouping chapters start where their earliest descendant does; children
    // always sit after their parent in the arena.
    let mut subtree_starts: Vec<Option<ResolvedPosition>> =
        tree.chapters.iter().map(|c| c.start).collect();
    for i in (0..tree.chapters.len()).rev() {
        if tree.chapters[i].start.is_none() {
            subtree_starts[i] = tree.chapters[i]
                .children
                .iter()
                .filter_map(|child| subtree_starts[child.index()])
                .min();
        }
    }

    let roots = tree.roots.clone();
    assign_subtree_spans(tree, &roots, end_of_book, &subtree_starts);
}

fn assign_subtree_spans(
    tree: &mut ChapterTree,
    siblings: &[ChapterId],
    parent_end: ResolvedPosition,
    starts: &[Option<ResolvedPosition>],
) {
    for (k, id) in siblings.iter().enumerate() {
        let Some(start) = starts[id.index()] else {
            continue;
        };
        let end = siblings[k + 1..]
            .iter()
            .find_map(|sibling| starts[sibling.index()])
            .unwrap_or(parent_end)
            .max(start);
        tree.chapters[id.index()].subtree_span = Some(Span::new(start, end));

        let children = tree.chapters[id.index()].children.clone();
        assign_subtree_spans(tree, &children, end, starts);
    }
}

/// Split a span into per-document fragments, skipping empty ones.
///
/// A span inside one document gives one fragment. Otherwise it takes the
/// tail of the start document, every document in between, and the head of
/// the end document.
pub fn fragments(container: &Container, span: Span) -> Vec<Fragment> {
    let spine_len = container.spine_len();
    if span.is_empty() || spine_len == 0 {
        return Vec::new();
    }

    let last = span.end.spine.min(spine_len - 1);
    (span.start.spine..=last)
        .filter_map(|spine| {
            let document = container.spine_document(spine)?;
            let from = if spine == span.start.spine {
                span.start.offset
            } else {
                0
            };
            let to = if spine == span.end.spine {
                span.end.offset.min(document.len())
            } else {
                document.len()
            };
            (from < to).then(|| Fragment {
                spine,
                document: document.path().to_string(),
                range: from..to,
            })
        })
        .collect()
}
