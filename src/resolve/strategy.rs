//! Anchor lookup strategies, tried in order until one succeeds.
//!
//! Each strategy maps a fragment id to a position (pre-order index) in a
//! parsed document. The structural lookups come first; the source searches
//! catch anchors the HTML parser dropped or rewrote, such as duplicate
//! attributes, and map the hit back to a node through the tag's ordinal.

use regex::Regex;

use crate::dom::Document;

pub type Strategy = fn(&Document, &str) -> Option<usize>;

/// Strategies in the order they are tried, with names for logging.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("id", by_id),
    ("anchor-name", by_anchor_name),
    ("source-pattern", by_source_pattern),
    ("raw-token", by_raw_token),
];

/// Element whose `id` equals the fragment; the first one in document order.
pub fn by_id(document: &Document, fragment: &str) -> Option<usize> {
    document.position_by_id(fragment)
}

/// Element carrying the fragment in `name`, `xml:id` or any other `*:id`.
pub fn by_anchor_name(document: &Document, fragment: &str) -> Option<usize> {
    let dom = document.dom();
    document
        .elements()
        .find(|&(_, node)| {
            dom.attrs(node).iter().any(|attr| {
                if attr.value != fragment {
                    return false;
                }
                let name = attr.qualified_name();
                name == "name" || name.ends_with(":id")
            })
        })
        .map(|(pos, _)| pos)
}

/// Search the source for a start tag declaring the fragment as `id` or `name`.
pub fn by_source_pattern(document: &Document, fragment: &str) -> Option<usize> {
    let pattern = format!(
        r#"<([A-Za-z][A-Za-z0-9:_.-]*)\b[^<>]*?\s(?i:id|name)\s*=\s*["']{}["']"#,
        regex::escape(fragment)
    );
    let re = Regex::new(&pattern).ok()?;
    let hit = re.find(document.source())?;
    element_for_tag_at(document, hit.start())
}

/// Find the fragment as the whole quoted value of any attribute, and take
/// that tag (or the next start tag, when the hit is inside an end tag or comment).
pub fn by_raw_token(document: &Document, fragment: &str) -> Option<usize> {
    if fragment.is_empty() {
        return None;
    }
    let escaped = regex::escape(fragment);
    let re = Regex::new(&format!(r#"=\s*(?:"{escaped}"|'{escaped}')"#)).ok()?;
    let source = document.source();
    let bytes = source.as_bytes();

    for hit in re.find_iter(source) {
        let Some(open) = memchr::memrchr(b'<', &bytes[..hit.start()]) else {
            continue;
        };
        // Text content, not markup
        if memchr::memchr(b'>', &bytes[open..hit.start()]).is_some() {
            continue;
        }
        let tag_start = if tag_name_at(source, open).is_some() {
            Some(open)
        } else {
            next_start_tag(source, hit.end())
        };
        if let Some(pos) = tag_start.and_then(|start| element_for_tag_at(document, start)) {
            return Some(pos);
        }
    }
    None
}

/// Name of the start tag beginning at byte `offset` (which holds `<`).
fn tag_name_at(source: &str, offset: usize) -> Option<&str> {
    let rest = source.get(offset + 1..)?;
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '-')))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn next_start_tag(source: &str, from: usize) -> Option<usize> {
    memchr::memchr_iter(b'<', &source.as_bytes()[from..])
        .map(|i| from + i)
        .find(|&offset| tag_name_at(source, offset).is_some())
}

/// Map the start tag at `offset` in the source to its element: the n-th
/// element of that name in the tree, where n counts earlier same-name start tags.
fn element_for_tag_at(document: &Document, offset: usize) -> Option<usize> {
    let source = document.source();
    let name = tag_name_at(source, offset)?;
    let ordinal = memchr::memchr_iter(b'<', &source.as_bytes()[..offset])
        .filter(|&o| tag_name_at(source, o).is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .count();
    // The tree holds local names only
    let local = name.rsplit(':').next().unwrap_or(name);
    document.elements_named(local).nth(ordinal)
}
