//! Error and warning types for spinecut operations.

use thiserror::Error;

/// Fatal errors: processing of the book stops and the error reaches the caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("No navigation document (NAV or NCX) with usable entries found")]
    NoNavigationFound,

    #[error("Invalid chapter range: {0}")]
    InvalidRange(String),
}

impl Error {
    /// True for errors caused by an unreadable container or package document.
    pub fn is_archive_error(&self) -> bool {
        !matches!(self, Error::NoNavigationFound | Error::InvalidRange(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal problems found while resolving chapters.
///
/// Warnings accumulate next to the result instead of aborting the book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The navigation entry points at a document that is not in the spine.
    /// The chapter is dropped.
    #[error("\"{title}\" points to \"{href}\" which is not in the spine")]
    UnknownDocument { title: String, href: String },

    /// The anchor could not be located; the chapter starts at the top of its document.
    #[error("anchor #{fragment} of \"{title}\" not found in {document}")]
    FragmentNotFound {
        title: String,
        document: String,
        fragment: String,
    },

    /// A chapter resolves before an entry that precedes it in the navigation document.
    #[error("\"{title}\" ({id}) resolves before the preceding navigation entry")]
    MalformedOrdering { id: String, title: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w = Warning::FragmentNotFound {
            title: "Chapter 3".into(),
            document: "OEBPS/ch3.xhtml".into(),
            fragment: "missing".into(),
        };
        assert_eq!(
            w.to_string(),
            "anchor #missing of \"Chapter 3\" not found in OEBPS/ch3.xhtml"
        );
    }

    #[test]
    fn test_archive_classification() {
        assert!(Error::InvalidEpub("no OPF".into()).is_archive_error());
        assert!(!Error::NoNavigationFound.is_archive_error());
        assert!(!Error::InvalidRange("0".into()).is_archive_error());
    }
}
