//! Plain text from document fragments.
//!
//! The extractor walks the DOM in document order and emits only text nodes
//! whose position lies inside the fragment's range. Block elements end
//! paragraphs; the result is the non-empty paragraphs joined by a blank line.
//! Lists are numbered (`1. `) or bulleted (`• `) and indented two spaces per
//! nesting level.

use std::ops::Range;

use crate::book::Container;
use crate::dom::{ArenaNodeData, ArenaNodeId, Document};
use crate::resolve::Span;
use crate::slice::{Fragment, fragments};

/// Separator between paragraphs in extracted text.
pub const PARAGRAPH_BREAK: &str = "\n\n";

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "blockquote", "section",
    "article", "header", "footer", "aside", "figure", "figcaption", "pre", "dt", "dd", "table",
    "ol", "ul", "dl", "hr", "body", "main", "nav", "address",
];

const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "title", "script", "style", "noscript", "template", "img", "svg", "math", "object",
    "embed", "video", "audio", "iframe", "canvas",
];

const BULLET: &str = "• ";
const INDENT: &str = "  ";

/// Text of a pre-order position range of one document.
pub fn extract_range(document: &Document, range: Range<usize>) -> String {
    let mut extractor = Extractor::new(document, range);
    extractor.walk(document.dom().document());
    extractor.finish()
}

/// Text of one fragment; empty when its document is gone.
pub fn fragment_text(container: &Container, fragment: &Fragment) -> String {
    container
        .spine_document(fragment.spine)
        .map(|document| extract_range(document, fragment.range.clone()))
        .unwrap_or_default()
}

/// Text of a span across however many documents it covers.
pub fn span_text(container: &Container, span: Span) -> String {
    fragments(container, span)
        .iter()
        .map(|fragment| fragment_text(container, fragment))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

/// True when the span holds any non-whitespace text.
pub fn has_text(container: &Container, span: Span) -> bool {
    fragments(container, span)
        .iter()
        .any(|fragment| !fragment_text(container, fragment).is_empty())
}

struct ListState {
    ordered: bool,
    count: usize,
}

struct Extractor<'a> {
    document: &'a Document,
    range: Range<usize>,
    blocks: Vec<String>,
    line: String,
    pending_space: bool,
    /// List marker waiting for the first paragraph of its item.
    marker: Option<String>,
    lists: Vec<ListState>,
}

impl<'a> Extractor<'a> {
    fn new(document: &'a Document, range: Range<usize>) -> Self {
        Self {
            document,
            range,
            blocks: Vec::new(),
            line: String::new(),
            pending_space: false,
            marker: None,
            lists: Vec::new(),
        }
    }

    fn finish(mut self) -> String {
        self.end_block();
        self.blocks.join(PARAGRAPH_BREAK)
    }

    fn walk(&mut self, node: ArenaNodeId) {
        let document = self.document;
        let Some(pos) = document.position_of(node) else {
            return;
        };
        if pos >= self.range.end || document.subtree_end(pos) <= self.range.start {
            return;
        }

        let dom = document.dom();
        let Some(data) = dom.get(node).map(|n| &n.data) else {
            return;
        };
        let name = match data {
            ArenaNodeData::Text(text) => {
                if self.range.contains(&pos) {
                    self.push_text(text);
                }
                return;
            }
            ArenaNodeData::Element { name, .. } => name.local.as_ref().to_ascii_lowercase(),
            ArenaNodeData::Document | ArenaNodeData::Other => {
                self.walk_children(node);
                return;
            }
        };

        if SKIPPED_ELEMENTS.contains(&name.as_str()) || is_note_reference(document, node) {
            return;
        }

        match name.as_str() {
            "br" => self.end_block(),
            "ol" | "ul" => {
                self.end_block();
                self.lists.push(ListState {
                    ordered: name == "ol",
                    count: 0,
                });
                self.walk_children(node);
                self.lists.pop();
                self.end_block();
            }
            "li" => {
                self.end_block();
                if self.range.contains(&pos) {
                    self.marker = Some(self.next_marker());
                }
                self.walk_children(node);
                self.end_block();
                self.marker = None;
            }
            "td" | "th" => {
                self.separate_inline();
                self.walk_children(node);
                self.separate_inline();
            }
            _ if BLOCK_ELEMENTS.contains(&name.as_str()) => {
                self.end_block();
                self.walk_children(node);
                self.end_block();
            }
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: ArenaNodeId) {
        let children: Vec<_> = self.document.dom().children(node).collect();
        for child in children {
            self.walk(child);
        }
    }

    fn next_marker(&mut self) -> String {
        let indent = INDENT.repeat(self.lists.len().saturating_sub(1));
        match self.lists.last_mut() {
            Some(list) if list.ordered => {
                list.count += 1;
                format!("{indent}{}. ", list.count)
            }
            _ => format!("{indent}{BULLET}"),
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = !self.line.is_empty();
            } else {
                if self.pending_space {
                    self.line.push(' ');
                    self.pending_space = false;
                }
                self.line.push(c);
            }
        }
    }

    fn separate_inline(&mut self) {
        if !self.line.is_empty() {
            self.pending_space = true;
        }
    }

    fn end_block(&mut self) {
        if !self.line.is_empty() {
            let marker = self.marker.take().unwrap_or_default();
            self.blocks.push(format!("{marker}{}", self.line));
            self.line.clear();
        }
        self.pending_space = false;
    }
}

/// Footnote reference markers: `noteref` in `epub:type` or `data-type`,
/// `role="doc-noteref"`, or a `sup`/`sub` holding nothing but a link.
fn is_note_reference(document: &Document, node: ArenaNodeId) -> bool {
    let dom = document.dom();
    let has_token = |attr: &str, token: &str| {
        dom.get_attr(node, attr)
            .is_some_and(|value| value.split_ascii_whitespace().any(|t| t == token))
    };
    if has_token("epub:type", "noteref")
        || has_token("data-type", "noteref")
        || has_token("role", "doc-noteref")
    {
        return true;
    }
    if !(dom.is_element_named(node, "sup") || dom.is_element_named(node, "sub")) {
        return false;
    }

    let mut links = 0;
    for child in dom.children(node) {
        match dom.get(child).map(|n| &n.data) {
            Some(ArenaNodeData::Text(text)) if text.trim().is_empty() => {}
            Some(ArenaNodeData::Element { name, .. }) if name.local.as_ref() == "a" => links += 1,
            _ => return false,
        }
    }
    links == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document::parse(
            "c.xhtml",
            format!("<html><head><title>Title</title><style>p {{}}</style></head><body>{body}</body></html>"),
        )
    }

    fn all(body: &str) -> String {
        let d = doc(body);
        let len = d.len();
        extract_range(&d, 0..len)
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(
            all("<h1>Chapter  One</h1><p>First\n  paragraph.</p><p>Second <em>one</em>.</p>"),
            "Chapter One\n\nFirst paragraph.\n\nSecond one."
        );
    }

    #[test]
    fn test_head_and_scripts_dropped() {
        assert_eq!(all("<script>var x;</script><p>Body</p><img src='a.png'/>"), "Body");
    }

    #[test]
    fn test_uppercase_markup() {
        assert_eq!(all("<OL><LI>first</LI></OL><P>Body</P>"), "1. first\n\nBody");
    }

    #[test]
    fn test_br_is_paragraph_break() {
        assert_eq!(all("<p>line one<br/>line two</p>"), "line one\n\nline two");
    }

    #[test]
    fn test_ordered_list_ignores_type() {
        assert_eq!(
            all(r#"<ol type="a"><li>first</li><li>second</li><li>third</li></ol>"#),
            "1. first\n\n2. second\n\n3. third"
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            all("<ul><li>outer<ol><li>inner a</li><li>inner b</li></ol></li><li>next</li></ul>"),
            "• outer\n\n  1. inner a\n\n  2. inner b\n\n• next"
        );
    }

    #[test]
    fn test_numbering_restarts_per_list() {
        assert_eq!(
            all("<ol><li>a</li></ol><p>x</p><ol start=\"5\"><li>b</li></ol>"),
            "1. a\n\nx\n\n1. b"
        );
    }

    #[test]
    fn test_list_item_with_paragraphs() {
        assert_eq!(all("<ol><li><p>para</p></li></ol>"), "1. para");
    }

    #[test]
    fn test_table_cells() {
        assert_eq!(
            all("<table><tr><td>a</td><td>b</td></tr><tr><th>c</th><td>d</td></tr></table>"),
            "a b\n\nc d"
        );
    }

    #[test]
    fn test_note_references_dropped() {
        assert_eq!(
            all(r##"<p>Text<sup><a href="#n1">1</a></sup> and<a epub:type="noteref" href="#n2">2</a> more<a data-type="noteref" href="#n3">3</a>.</p><p>H<sub>2</sub>O</p>"##),
            "Text and more.\n\nH2O"
        );
    }

    #[test]
    fn test_range_limits_output() {
        let d = doc(r#"<p id="a">Alpha</p><p id="b">Beta</p><p id="c">Gamma</p>"#);
        let b = d.position_by_id("b").unwrap();
        let c = d.position_by_id("c").unwrap();
        assert_eq!(extract_range(&d, b..c), "Beta");
        assert_eq!(extract_range(&d, c..d.len()), "Gamma");
    }

    #[test]
    fn test_numbering_counts_items_in_range() {
        let d = doc(r#"<ol><li>one</li><li id="two">two</li><li>three</li></ol>"#);
        let two = d.position_by_id("two").unwrap();
        assert_eq!(extract_range(&d, two..d.len()), "1. two\n\n2. three");
    }

    #[test]
    fn test_empty_range() {
        let d = doc("<p>x</p>");
        assert_eq!(extract_range(&d, 3..3), "");
    }
}
