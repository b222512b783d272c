use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use super::parser::{OpfData, parse_container_xml, parse_opf};
use crate::book::{Container, ManifestItem};
use crate::error::{Error, Result};
use crate::util::{decode_document, parent_dir, percent_decode, resolve_path};

/// Read an EPUB file from disk into a [`Container`].
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Container> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// Every document the text pipeline needs (HTML content and NCX) is
/// decoded into memory; the archive is closed before this returns.
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Container> {
    let mut archive = ZipArchive::new(reader)?;

    let container_xml = read_required(&mut archive, "META-INF/container.xml")?;
    let opf_path = parse_container_xml(&container_xml)?;
    let opf_dir = parent_dir(&opf_path).to_string();

    let opf_bytes = read_required(&mut archive, &opf_path)?;
    let OpfData {
        metadata,
        manifest,
        spine,
        toc_id,
    } = parse_opf(&decode_document(&opf_bytes))?;

    if manifest.is_empty() {
        return Err(Error::InvalidEpub("package document has no manifest items".into()));
    }

    // Hrefs are stored percent-decoded; the encoded form is kept for archive lookups.
    let mut archive_paths = HashMap::new();
    let manifest: Vec<ManifestItem> = manifest
        .into_iter()
        .map(|mut item| {
            let archive_path = resolve_path(&opf_dir, &item.href);
            item.href = percent_decode(&archive_path).into_owned();
            archive_paths.insert(item.id.clone(), archive_path);
            item
        })
        .collect();

    let mut files = HashMap::new();
    for item in manifest.iter().filter(|item| item.is_html() || item.is_ncx()) {
        let encoded = archive_paths.get(&item.id).map_or(item.href.as_str(), String::as_str);
        match read_archive_file_bytes(&mut archive, &item.href, encoded) {
            Ok(bytes) => {
                files.insert(item.href.clone(), decode_document(&bytes));
            }
            Err(Error::Zip(ZipError::FileNotFound)) => {
                tracing::warn!(href = %item.href, "manifest item missing from archive");
            }
            Err(e) => return Err(e),
        }
    }
    drop(archive);

    tracing::debug!(
        opf = %opf_path,
        manifest = manifest.len(),
        spine = spine.len(),
        files = files.len(),
        "read package"
    );

    Ok(Container::from_parts(metadata, manifest, spine, toc_id, files))
}

/// Read a file the package cannot do without.
fn read_required<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    read_archive_file_bytes(archive, path, path).map_err(|e| match e {
        Error::Zip(ZipError::FileNotFound) => Error::InvalidEpub(format!("{path} not found")),
        other => other,
    })
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    fallback: &str,
) -> Result<Vec<u8>> {
    let name = if archive.index_for_name(path).is_some() || path == fallback {
        path
    } else {
        fallback
    };
    let mut file = archive.by_name(name)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}
