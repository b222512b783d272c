//! Parsed content documents.
//!
//! Every content document is parsed once with html5ever into an [`ArenaDom`]
//! and indexed in document order. A node's *position* is its index in the
//! pre-order traversal (the document node is position 0); positions are what
//! chapter boundaries are expressed in.

mod arena;
mod tree_sink;

use std::collections::HashMap;
use std::sync::LazyLock;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use regex::{Captures, Regex};

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, ChildrenIter};
pub use tree_sink::{ArenaSink, NodeHandle};

/// Elements that never have content, so `<br/>` means the same in HTML and XHTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// `<tag .../>` in XHTML syntax.
static SELF_CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9:_.-]*)(\s[^<>]*?)?/>").expect("valid regex")
});

/// Parse HTML or XHTML into an arena DOM.
///
/// The HTML tree builder treats `<div/>` as an open tag, so XHTML
/// self-closing syntax on non-void elements is expanded first. Otherwise a
/// `<script src="x"/>` in the head would swallow the whole body.
pub fn parse_html(source: &str) -> ArenaDom {
    let expanded = expand_self_closing(source);
    parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(expanded.as_bytes())
        .into_dom()
}

fn expand_self_closing(source: &str) -> std::borrow::Cow<'_, str> {
    SELF_CLOSING.replace_all(source, |caps: &Captures| {
        let tag = &caps[1];
        let attrs = caps.get(2).map_or("", |m| m.as_str());
        if VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str()) {
            format!("<{tag}{attrs}/>")
        } else {
            format!("<{tag}{attrs}></{tag}>")
        }
    })
}

/// A content document: its DOM, its document-order index and its source text.
#[derive(Debug)]
pub struct Document {
    path: String,
    source: String,
    dom: ArenaDom,
    /// Pre-order traversal of attached nodes.
    order: Vec<ArenaNodeId>,
    /// Arena index -> position; `usize::MAX` for detached nodes.
    positions: Vec<usize>,
    /// Position -> exclusive end of its subtree.
    subtree_ends: Vec<usize>,
    /// Element `id` -> position of the first element carrying it.
    ids: HashMap<String, usize>,
}

impl Document {
    pub fn parse(path: impl Into<String>, source: String) -> Self {
        let dom = parse_html(&source);
        Self::from_dom(path.into(), source, dom)
    }

    fn from_dom(path: String, source: String, dom: ArenaDom) -> Self {
        let mut order = Vec::with_capacity(dom.len());
        let mut positions = vec![usize::MAX; dom.len()];
        let mut subtree_ends = Vec::with_capacity(dom.len());
        let mut ids = HashMap::new();

        let mut stack = vec![(dom.document(), false)];
        while let Some((node, exiting)) = stack.pop() {
            if exiting {
                let pos = positions[node.index()];
                subtree_ends[pos] = order.len();
                continue;
            }

            let pos = order.len();
            positions[node.index()] = pos;
            order.push(node);
            subtree_ends.push(pos + 1);
            if let Some(id) = dom.element_id(node) {
                ids.entry(id.to_string()).or_insert(pos);
            }

            stack.push((node, true));
            let children: Vec<_> = dom.children(node).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, false)));
        }

        Self {
            path,
            source,
            dom,
            order,
            positions,
            subtree_ends,
            ids,
        }
    }

    /// Normalized archive path of the document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded source text as stored in the archive.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    /// Number of positions (attached nodes, including the document node).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.len() <= 1
    }

    /// Node at a position.
    pub fn node_at(&self, position: usize) -> Option<ArenaNodeId> {
        self.order.get(position).copied()
    }

    /// Position of an attached node.
    pub fn position_of(&self, node: ArenaNodeId) -> Option<usize> {
        self.positions
            .get(node.index())
            .copied()
            .filter(|&p| p != usize::MAX)
    }

    /// Exclusive end of the subtree rooted at `position`.
    pub fn subtree_end(&self, position: usize) -> usize {
        self.subtree_ends
            .get(position)
            .copied()
            .unwrap_or(self.order.len())
    }

    /// Position of the first element whose `id` attribute equals `id`.
    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.ids.get(id).copied()
    }

    /// Positions of all elements with the given local name, in document order.
    pub fn elements_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.order
            .iter()
            .enumerate()
            .filter(move |(_, node)| {
                self.dom
                    .element_name(**node)
                    .is_some_and(|name| name.as_ref().eq_ignore_ascii_case(tag))
            })
            .map(|(pos, _)| pos)
    }

    /// Positions of all elements, in document order.
    pub fn elements(&self) -> impl Iterator<Item = (usize, ArenaNodeId)> + '_ {
        self.order
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, node)| self.dom.element_name(*node).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        Document::parse("OEBPS/ch.xhtml", html.to_string())
    }

    #[test]
    fn test_document_node_is_position_zero() {
        let d = doc("<html><body><p>x</p></body></html>");
        assert_eq!(d.node_at(0), Some(d.dom().document()));
        assert_eq!(d.subtree_end(0), d.len());
    }

    #[test]
    fn test_positions_follow_document_order() {
        let d = doc(r#"<html><body><p id="a">one</p><p id="b">two</p></body></html>"#);
        let a = d.position_by_id("a").expect("a");
        let b = d.position_by_id("b").expect("b");
        assert!(a < b);
        // p#a holds a single text node
        assert_eq!(d.subtree_end(a), a + 2);
        assert_eq!(d.subtree_end(a), b);
    }

    #[test]
    fn test_first_id_wins() {
        let d = doc(r#"<body><p id="dup">one</p><p id="dup">two</p></body>"#);
        let pos = d.position_by_id("dup").expect("dup");
        let node = d.node_at(pos).expect("node");
        assert_eq!(d.dom().collect_text(node), "one");
    }

    #[test]
    fn test_self_closing_anchor_does_not_swallow_content() {
        let d = doc(r#"<body><p>before<a id="x"/>after</p></body>"#);
        let pos = d.position_by_id("x").expect("x");
        // The anchor is empty, so its subtree is just itself
        assert_eq!(d.subtree_end(pos), pos + 1);
    }

    #[test]
    fn test_self_closing_script_in_head() {
        let d = doc(
            r#"<html><head><script src="a.js"/></head><body><p id="p">Body</p></body></html>"#,
        );
        assert!(d.position_by_id("p").is_some());
    }

    #[test]
    fn test_void_elements_kept() {
        assert_eq!(expand_self_closing("a<br/>b"), "a<br/>b");
        assert_eq!(
            expand_self_closing(r#"<div class="x"/>"#),
            r#"<div class="x"></div>"#
        );
    }

    #[test]
    fn test_elements_named() {
        let d = doc("<body><p>a</p><div><p>b</p></div></body>");
        assert_eq!(d.elements_named("p").count(), 2);
        assert_eq!(d.elements_named("P").count(), 2);
    }
}
