//! In-memory EPUB fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use spinecut::Book;
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// A table of contents entry for [`nav_document`] and [`ncx_document`].
#[derive(Debug, Clone)]
pub struct Entry {
    pub title: String,
    pub href: String,
    pub children: Vec<Entry>,
}

pub fn entry(title: &str, href: &str) -> Entry {
    Entry {
        title: title.into(),
        href: href.into(),
        children: Vec::new(),
    }
}

impl Entry {
    pub fn with_children(mut self, children: Vec<Entry>) -> Self {
        self.children = children;
        self
    }
}

/// Builds a minimal EPUB with content under `OEBPS/`.
#[derive(Debug, Clone)]
pub struct EpubFixture {
    title: String,
    author: String,
    /// (href relative to OEBPS, body markup)
    documents: Vec<(String, String)>,
    nav_body: Option<String>,
    ncx: Option<String>,
}

impl EpubFixture {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            author: "Test Author".into(),
            documents: Vec::new(),
            nav_body: None,
            ncx: None,
        }
    }

    /// Add a spine document; `body` is the markup inside `<body>`.
    pub fn document(mut self, href: &str, body: &str) -> Self {
        self.documents.push((href.into(), body.into()));
        self
    }

    /// EPUB 3 navigation document from a list of entries.
    pub fn nav(self, entries: &[Entry]) -> Self {
        let body = format!(r#"<nav epub:type="toc"><h1>Contents</h1>{}</nav>"#, nav_list(entries));
        self.nav_markup(&body)
    }

    /// EPUB 3 navigation document with arbitrary body markup.
    pub fn nav_markup(mut self, body: &str) -> Self {
        self.nav_body = Some(body.into());
        self
    }

    /// EPUB 2 NCX from a list of entries, with an optional page list.
    pub fn ncx(mut self, entries: &[Entry], pages: &[(&str, &str)]) -> Self {
        self.ncx = Some(ncx_document(entries, pages));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        let mut add = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        add("mimetype", "application/epub+zip");
        add("META-INF/container.xml", CONTAINER_XML);
        add("OEBPS/content.opf", &self.opf());
        for (href, body) in &self.documents {
            add(&format!("OEBPS/{href}"), &xhtml(href, body));
        }
        if let Some(body) = &self.nav_body {
            add("OEBPS/nav.xhtml", &xhtml("Contents", body));
        }
        if let Some(ncx) = &self.ncx {
            add("OEBPS/toc.ncx", ncx);
        }

        zip.finish().unwrap().into_inner()
    }

    pub fn open(&self) -> spinecut::Result<Book> {
        Book::from_reader(Cursor::new(self.build()))
    }

    pub fn write_temp(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.build()).unwrap();
        file.flush().unwrap();
        file
    }

    fn opf(&self) -> String {
        let mut manifest = String::new();
        let mut spine = String::new();
        for (i, (href, _)) in self.documents.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"doc{i}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n"
            ));
            spine.push_str(&format!("    <itemref idref=\"doc{i}\"/>\n"));
        }
        if self.nav_body.is_some() {
            manifest.push_str(
                "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
            );
        }
        let toc_attr = if self.ncx.is_some() {
            manifest.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            );
            r#" toc="ncx""#
        } else {
            ""
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
    <dc:title>{}</dc:title>
    <dc:creator>{}</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{toc_attr}>
{spine}  </spine>
</package>"#,
            self.title, self.author
        )
    }
}

fn xhtml(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    )
}

fn nav_list(entries: &[Entry]) -> String {
    let items: String = entries
        .iter()
        .map(|e| {
            let children = if e.children.is_empty() {
                String::new()
            } else {
                nav_list(&e.children)
            };
            format!(r#"<li><a href="{}">{}</a>{children}</li>"#, e.href, e.title)
        })
        .collect();
    format!("<ol>{items}</ol>")
}

fn ncx_document(entries: &[Entry], pages: &[(&str, &str)]) -> String {
    fn points(entries: &[Entry], order: &mut usize) -> String {
        entries
            .iter()
            .map(|e| {
                *order += 1;
                let id = *order;
                let children = points(&e.children, order);
                format!(
                    r#"<navPoint id="np{id}" playOrder="{id}"><navLabel><text>{}</text></navLabel><content src="{}"/>{children}</navPoint>"#,
                    e.title, e.href
                )
            })
            .collect()
    }

    let mut order = 0;
    let nav_map = points(entries, &mut order);
    let page_list = if pages.is_empty() {
        String::new()
    } else {
        let targets: String = pages
            .iter()
            .map(|(label, href)| {
                format!(
                    r#"<pageTarget type="normal" value="{label}"><navLabel><text>{label}</text></navLabel><content src="{href}"/></pageTarget>"#
                )
            })
            .collect();
        format!("<pageList>{targets}</pageList>")
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:fixture"/></head>
  <docTitle><text>Fixture</text></docTitle>
  <navMap>{nav_map}</navMap>
  {page_list}
</ncx>"#
    )
}
