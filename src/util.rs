//! Text decoding and archive path helpers.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 first (a BOM is handled by encoding_rs)
/// 2. The hint encoding, usually from `<?xml encoding="..."?>`
/// 3. Windows-1252, common in old ebooks
///
/// Borrows when the input is already valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a document from the archive, honouring its XML declaration.
pub fn decode_document(bytes: &[u8]) -> String {
    decode_text(bytes, extract_xml_encoding(bytes)).into_owned()
}

/// Extract the encoding name from an XML declaration.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memchr::memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Split an href into its document part and optional fragment.
///
/// An empty fragment (`"ch1.xhtml#"`) counts as no fragment.
pub fn split_href(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((path, fragment)) if !fragment.is_empty() => (path, Some(fragment)),
        Some((path, _)) => (path, None),
        None => (href, None),
    }
}

/// Directory part of an archive path, without trailing slash.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Resolve `relative` against the directory `base_dir` and normalize the result.
///
/// Archive paths always use `/`. A leading `/` anchors at the archive root.
pub fn resolve_path(base_dir: &str, relative: &str) -> String {
    if let Some(absolute) = relative.strip_prefix('/') {
        return normalize_path(absolute);
    }
    if base_dir.is_empty() {
        return normalize_path(relative);
    }
    normalize_path(&format!("{base_dir}/{relative}"))
}

/// Remove `.` and `..` segments and duplicate slashes.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Percent-decode a path (`Chapter%201.xhtml` -> `Chapter 1.xhtml`).
pub fn percent_decode(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(&[0xEF, 0xBB, 0xBF, b'h', b'i']), b"hi");
        assert_eq!(strip_bom(b"hello"), b"hello");
        assert_eq!(strip_bom(&[]), &[]);
        // Partial BOM is left alone
        assert_eq!(strip_bom(&[0xEF, 0xBB, b'x']), &[0xEF, 0xBB, b'x']);
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(br#"<?xml version="1.0" encoding="windows-1252"?>"#),
            Some("windows-1252")
        );
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='UTF-8'?><html/>"),
            Some("UTF-8")
        );
        assert_eq!(extract_xml_encoding(b"<html></html>"), None);
    }

    #[test]
    fn test_decode_falls_back_to_cp1252() {
        // 0x92 is a right single quote in Windows-1252 and invalid UTF-8
        let bytes = b"It\x92s";
        assert_eq!(decode_text(bytes, None), "It\u{2019}s");
    }

    #[test]
    fn test_split_href() {
        assert_eq!(split_href("ch1.xhtml"), ("ch1.xhtml", None));
        assert_eq!(split_href("ch1.xhtml#sec"), ("ch1.xhtml", Some("sec")));
        assert_eq!(split_href("ch1.xhtml#"), ("ch1.xhtml", None));
        assert_eq!(split_href("#only"), ("", Some("only")));
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/nav", "../text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("", "./ch1.xhtml"), "ch1.xhtml");
        assert_eq!(resolve_path("OEBPS", "/root.xhtml"), "root.xhtml");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/content.opf"), "OEBPS");
        assert_eq!(parent_dir("content.opf"), "");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Chapter%201.xhtml"), "Chapter 1.xhtml");
        assert_eq!(percent_decode("plain.xhtml"), "plain.xhtml");
    }
}
