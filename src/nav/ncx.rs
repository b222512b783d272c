//! EPUB 2 NCX (`navMap` and `pageList`).

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::epub::{attr_value, local_name, resolve_entity};
use crate::error::Result;
use crate::util::collapse_whitespace;

use super::RawEntry;

/// Entries of an NCX document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NcxDocument {
    pub nav_map: Vec<RawEntry>,
    /// `(label, src)` of every `pageTarget`, in document order.
    pub page_list: Vec<(String, String)>,
}

enum Frame {
    Point(RawEntry),
    Page { label: String, src: Option<String> },
}

impl Frame {
    fn push_text(&mut self, text: &str) {
        match self {
            Frame::Point(entry) => entry.title.push_str(text),
            Frame::Page { label, .. } => label.push_str(text),
        }
    }

    fn set_src(&mut self, value: String) {
        match self {
            Frame::Point(entry) if entry.href.is_none() => entry.href = Some(value),
            Frame::Page { src, .. } if src.is_none() => *src = Some(value),
            _ => {}
        }
    }
}

/// Parse an NCX document.
pub fn parse_ncx(content: &str) -> Result<NcxDocument> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut doc = NcxDocument::default();
    // Open navPoint/pageTarget elements, innermost last
    let mut stack: Vec<Frame> = Vec::new();
    // Depth inside navLabel/text of the innermost frame
    let mut label_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    let play_order = attr_value(&e, b"playOrder").and_then(|v| v.trim().parse().ok());
                    stack.push(Frame::Point(RawEntry {
                        id: attr_value(&e, b"id"),
                        play_order,
                        ..Default::default()
                    }));
                    label_depth = 0;
                }
                b"pageTarget" => {
                    stack.push(Frame::Page {
                        label: String::new(),
                        src: None,
                    });
                    label_depth = 0;
                }
                b"navLabel" if !stack.is_empty() => label_depth += 1,
                b"text" if label_depth > 0 => in_text = true,
                b"content" => {
                    if let Some(src) = attr_value(&e, b"src")
                        && let Some(frame) = stack.last_mut()
                    {
                        frame.set_src(src);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"content"
                    && let Some(src) = attr_value(&e, b"src")
                    && let Some(frame) = stack.last_mut()
                {
                    frame.set_src(src);
                }
            }
            Event::Text(e) => {
                if in_text && let Some(frame) = stack.last_mut() {
                    frame.push_text(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if in_text && let Some(frame) = stack.last_mut() {
                    frame.push_text(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if in_text
                    && let Some(frame) = stack.last_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    frame.push_text(&resolved);
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navLabel" => label_depth = label_depth.saturating_sub(1),
                b"navPoint" | b"pageTarget" => {
                    label_depth = 0;
                    match stack.pop() {
                        Some(Frame::Point(mut entry)) => {
                            entry.title = collapse_whitespace(&entry.title);
                            match stack.last_mut() {
                                Some(Frame::Point(parent)) => parent.children.push(entry),
                                _ => doc.nav_map.push(entry),
                            }
                        }
                        Some(Frame::Page { label, src }) => {
                            let label = collapse_whitespace(&label);
                            if let Some(src) = src
                                && !label.is_empty()
                                && !src.is_empty()
                            {
                                doc.page_list.push((label, src));
                            }
                        }
                        None => {}
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ncx_flat() {
        let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>Book Title</text></docTitle>
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Chapter 1</text></navLabel>
      <content src="ch1.xhtml"/>
    </navPoint>
    <navPoint id="np2" playOrder="2">
      <navLabel><text>Rock &amp; Roll</text></navLabel>
      <content src="ch2.xhtml#start"/>
    </navPoint>
  </navMap>
</ncx>"#;

        let doc = parse_ncx(ncx).unwrap();
        assert_eq!(doc.nav_map.len(), 2);
        assert_eq!(doc.nav_map[0].title, "Chapter 1");
        assert_eq!(doc.nav_map[0].id.as_deref(), Some("np1"));
        assert_eq!(doc.nav_map[0].play_order, Some(1));
        assert_eq!(doc.nav_map[1].title, "Rock & Roll");
        assert_eq!(doc.nav_map[1].href.as_deref(), Some("ch2.xhtml#start"));
        assert!(doc.page_list.is_empty());
    }

    #[test]
    fn test_parse_ncx_nested() {
        let ncx = r#"<ncx><navMap>
    <navPoint id="part1" playOrder="1">
      <navLabel><text>Part I</text></navLabel>
      <content src="part1.xhtml"/>
      <navPoint id="ch1" playOrder="2">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="ch1.xhtml"/>
      </navPoint>
      <navPoint id="ch2" playOrder="3">
        <navLabel><text>Chapter 2</text></navLabel>
        <content src="ch2.xhtml"/>
      </navPoint>
    </navPoint>
  </navMap></ncx>"#;

        let doc = parse_ncx(ncx).unwrap();
        assert_eq!(doc.nav_map.len(), 1);
        assert_eq!(doc.nav_map[0].title, "Part I");
        assert_eq!(doc.nav_map[0].href.as_deref(), Some("part1.xhtml"));
        let children: Vec<_> = doc.nav_map[0].children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(children, vec!["Chapter 1", "Chapter 2"]);
    }

    #[test]
    fn test_parse_page_list() {
        let ncx = r#"<ncx><navMap>
    <navPoint id="c"><navLabel><text>C</text></navLabel><content src="c.xhtml"/></navPoint>
  </navMap>
  <pageList>
    <navLabel><text>Pages</text></navLabel>
    <pageTarget id="p1" type="normal" value="1">
      <navLabel><text>1</text></navLabel><content src="c.xhtml#page1"/>
    </pageTarget>
    <pageTarget id="p2" type="normal" value="2">
      <navLabel><text> 2 </text></navLabel><content src="c.xhtml#page2"/>
    </pageTarget>
    <pageTarget id="p3"><navLabel><text>3</text></navLabel></pageTarget>
  </pageList></ncx>"#;

        let doc = parse_ncx(ncx).unwrap();
        assert_eq!(doc.nav_map.len(), 1);
        assert_eq!(
            doc.page_list,
            vec![
                ("1".to_string(), "c.xhtml#page1".to_string()),
                ("2".to_string(), "c.xhtml#page2".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_label_gives_empty_title() {
        let doc = parse_ncx(r#"<ncx><navMap><navPoint><content src="a.xhtml"/></navPoint></navMap></ncx>"#)
            .unwrap();
        assert_eq!(doc.nav_map[0].title, "");
    }

    #[test]
    fn test_malformed_ncx_is_an_error() {
        assert!(parse_ncx("<ncx><navMap><navPoint></navMap></ncx>").is_err());
    }
}
