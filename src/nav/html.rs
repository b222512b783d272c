//! EPUB 3 navigation documents (`<nav epub:type="toc">` and `page-list`).

use crate::dom::{ArenaDom, ArenaNodeId, Document};
use crate::util::collapse_whitespace;

use super::RawEntry;

fn has_epub_type(dom: &ArenaDom, node: ArenaNodeId, kind: &str) -> bool {
    dom.get_attr(node, "epub:type")
        .is_some_and(|types| types.split_ascii_whitespace().any(|t| t == kind))
}

fn is_list(dom: &ArenaDom, node: ArenaNodeId) -> bool {
    dom.is_element_named(node, "ol") || dom.is_element_named(node, "ul")
}

/// Find the `nav` element of the given `epub:type`.
///
/// For `toc`, a document without typed navs falls back to its first `nav`
/// that contains an `ol`.
pub fn find_nav(document: &Document, kind: &str) -> Option<ArenaNodeId> {
    let dom = document.dom();
    let navs: Vec<_> = document
        .elements_named("nav")
        .filter_map(|pos| document.node_at(pos))
        .collect();

    if let Some(&nav) = navs.iter().find(|&&nav| has_epub_type(dom, nav, kind)) {
        return Some(nav);
    }
    if kind != "toc" || navs.iter().any(|&nav| dom.get_attr(nav, "epub:type").is_some()) {
        return None;
    }
    navs.into_iter()
        .find(|&nav| dom.find(nav, |d, n| d.is_element_named(n, "ol")).is_some())
}

/// First `ol`/`ul` inside a nav element.
fn first_list(dom: &ArenaDom, nav: ArenaNodeId) -> Option<ArenaNodeId> {
    dom.find(nav, |d, n| n != nav && is_list(d, n))
}

fn list_items(dom: &ArenaDom, list: ArenaNodeId) -> impl Iterator<Item = ArenaNodeId> + '_ {
    dom.children(list).filter(|&c| dom.is_element_named(c, "li"))
}

/// Parse the table of contents of a navigation document.
pub fn parse_nav_entries(document: &Document) -> Vec<RawEntry> {
    let dom = document.dom();
    let Some(list) = find_nav(document, "toc").and_then(|nav| first_list(dom, nav)) else {
        return Vec::new();
    };
    list_items(dom, list).map(|li| parse_li(dom, li)).collect()
}

fn parse_li(dom: &ArenaDom, li: ArenaNodeId) -> RawEntry {
    let link = dom.children(li).find(|&c| dom.is_element_named(c, "a"));
    let span = dom.children(li).find(|&c| dom.is_element_named(c, "span"));

    let mut title = link.map(|a| dom.collect_text(a)).unwrap_or_default();
    if title.trim().is_empty()
        && let Some(span) = span
    {
        title = dom.collect_text(span);
    }
    if title.trim().is_empty() {
        title = dom
            .children(li)
            .filter_map(|c| dom.text_content(c))
            .collect::<String>();
    }

    let href = link.and_then(|a| dom.get_attr(a, "href")).map(String::from);
    let id = dom
        .element_id(li)
        .or_else(|| link.and_then(|a| dom.element_id(a)))
        .map(String::from);

    let children = dom
        .children(li)
        .filter(|&c| is_list(dom, c))
        .flat_map(|list| list_items(dom, list))
        .map(|child| parse_li(dom, child))
        .collect();

    RawEntry {
        id,
        title: collapse_whitespace(&title),
        href,
        play_order: None,
        children,
    }
}

/// Parse a `page-list` nav into `(label, href)` pairs.
pub fn parse_nav_pages(document: &Document) -> Vec<(String, String)> {
    let dom = document.dom();
    let Some(nav) = find_nav(document, "page-list") else {
        return Vec::new();
    };

    let mut pages = Vec::new();
    let mut stack = vec![nav];
    while let Some(node) = stack.pop() {
        if dom.is_element_named(node, "a")
            && let Some(href) = dom.get_attr(node, "href")
        {
            let label = collapse_whitespace(&dom.collect_text(node));
            if !label.is_empty() && !href.is_empty() {
                pages.push((label, href.to_string()));
            }
            continue;
        }
        let children: Vec<_> = dom.children(node).collect();
        stack.extend(children.into_iter().rev());
    }
    pages
}
