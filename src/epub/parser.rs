//! EPUB package parsing (container.xml, OPF).

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};

use crate::book::{ManifestItem, Metadata, SpineRef};
use crate::error::{Error, Result};
use crate::util::strip_bom;

/// Parsed OPF package data. Hrefs are still relative to the OPF directory.
#[derive(Debug, Default)]
pub struct OpfData {
    pub metadata: Metadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineRef>,
    /// Manifest id named by `<spine toc="...">`.
    pub toc_id: Option<String>,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr_value(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub("no rootfile found in container.xml".into()))
}

/// Parse the OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut data = OpfData::default();
    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"contributor" | b"language" | b"identifier"
                    | b"publisher" | b"description" | b"subject" | b"date" | b"rights"
                        if in_metadata =>
                    {
                        current_element =
                            Some(String::from_utf8_lossy(local_name(name.as_ref())).into_owned());
                        buf_text.clear();
                    }
                    b"spine" => data.toc_id = attr_value(&e, b"toc"),
                    b"item" => data.manifest.extend(manifest_item(&e)),
                    b"itemref" => data.spine.extend(spine_ref(&e)),
                    _ => {}
                }
            }
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"item" => data.manifest.extend(manifest_item(&e)),
                b"itemref" => data.spine.extend(spine_ref(&e)),
                b"spine" => data.toc_id = attr_value(&e, b"toc"),
                _ => {}
            },
            Event::Text(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if current_element.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(elem) = current_element.take() {
                    let text = buf_text.trim().to_string();
                    let meta = &mut data.metadata;
                    match elem.as_str() {
                        "title" if meta.title.is_empty() => meta.title = text,
                        "creator" => meta.authors.push(text),
                        "contributor" => meta.contributors.push(text),
                        "language" if meta.language.is_empty() => meta.language = text,
                        "identifier" if meta.identifier.is_empty() => meta.identifier = text,
                        "publisher" => meta.publisher = Some(text),
                        "description" => meta.description = Some(text),
                        "subject" => meta.subjects.push(text),
                        "date" if meta.date.is_none() => meta.date = Some(text),
                        "rights" => meta.rights = Some(text),
                        _ => {}
                    }
                    buf_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(data)
}

fn manifest_item(e: &BytesStart<'_>) -> Option<ManifestItem> {
    let id = attr_value(e, b"id").filter(|id| !id.is_empty())?;
    let href = attr_value(e, b"href").unwrap_or_default();
    let media_type = attr_value(e, b"media-type").unwrap_or_default();
    let item = ManifestItem::new(id, href, media_type);
    Some(match attr_value(e, b"properties") {
        Some(properties) => item.with_properties(&properties),
        None => item,
    })
}

fn spine_ref(e: &BytesStart<'_>) -> Option<SpineRef> {
    let idref = attr_value(e, b"idref")?;
    let linear = attr_value(e, b"linear").is_none_or(|v| v != "no");
    Some(SpineRef { idref, linear })
}

/// Unescaped value of an attribute, matched by local name.
///
/// Values with malformed escapes (a bare `&`, an unknown entity) are kept raw.
pub(crate) fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key || attr.key.as_ref() == key)
        .map(|attr| match attr.unescape_value_with(named_entity) {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Extract the local name from a possibly prefixed XML name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// HTML entities that show up in hand-written OPF and NCX files. The five XML
/// entities and character references are handled by quick-xml itself.
fn named_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "hellip" => Some("\u{2026}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    }
}

/// Resolve an entity reference (without `&` and `;`) to its text.
pub(crate) fn resolve_entity(entity: &str) -> Option<String> {
    unescape_with(&format!("&{entity};"), named_entity)
        .ok()
        .map(Cow::into_owned)
}
