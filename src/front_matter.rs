//! Table-of-contents and front-matter detection.
//!
//! Many books repeat their table of contents as ordinary text, and it ends up
//! in the synthesized introduction or on the first print pages. A listing is
//! recognized by lines that are nothing but known titles: the book title and
//! every chapter title, compared case-insensitively.

use crate::pages::Page;

/// Chapter titles that always mark front matter.
const FRONT_MATTER_TITLES: &[&str] = &[
    "INTRODUCTION",
    "TABLE OF CONTENTS",
    "CONTENTS",
    "TOC",
    "ACKNOWLEDGEMENTS",
    "ACKNOWLEDGMENTS",
    "FOREWORD",
    "PREFACE",
];

/// Only the start of a text is scanned for a listing.
const SCAN_CHARS: usize = 2000;

/// More title lines than this in the scanned text mark a table of contents.
const LISTING_THRESHOLD: usize = 3;

/// Fewest entries a listing needs before it is stripped.
const MIN_STRIPPED_ENTRIES: usize = 5;

/// Listing entries are on average fewer than this many lines apart.
const MAX_LINES_PER_ENTRY: usize = 3;

/// Longer titles are not treated as listing entries.
const MAX_ENTRY_CHARS: usize = 30;

/// True when `title` names a front-matter section such as a preface.
pub fn is_front_matter_title(title: &str) -> bool {
    let upper = title.trim().to_uppercase();
    FRONT_MATTER_TITLES.contains(&upper.as_str())
}

/// The titles a table of contents would list.
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    /// Uppercased, longest first.
    titles: Vec<String>,
}

struct ListingLine<'a> {
    index: usize,
    line: &'a str,
    /// Title length in chars when the line continues past the title.
    partial: Option<usize>,
}

impl FrontMatter {
    pub fn new<'a>(titles: impl IntoIterator<Item = &'a str>) -> Self {
        let mut titles: Vec<String> = titles
            .into_iter()
            .map(|title| title.trim().to_uppercase())
            .filter(|title| !title.is_empty())
            .collect();
        titles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        titles.dedup();
        Self { titles }
    }

    fn is_title(&self, upper: &str) -> bool {
        self.titles.iter().any(|title| title == upper)
    }

    /// True when a chapter or page is front matter: its title is a
    /// front-matter title, or its text opens with a listing of titles.
    pub fn is_front_matter(&self, title: Option<&str>, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if title.is_some_and(is_front_matter_title) {
            return true;
        }
        let head: String = text.chars().take(SCAN_CHARS).collect();
        let listed = head
            .to_uppercase()
            .lines()
            .filter(|line| self.is_title(line.trim()))
            .count();
        listed > LISTING_THRESHOLD
    }

    /// Remove a dense listing of titles from `text`, keeping what comes
    /// before and after it. Text without such a listing is returned as is.
    ///
    /// When the last entry runs on into body text (`"ONE It was dawn."`),
    /// only the title part of that line is removed.
    pub fn strip_listing(&self, text: &str) -> String {
        if self.titles.is_empty() {
            return text.to_string();
        }
        let lines: Vec<&str> = text.split('\n').collect();
        let entries: Vec<ListingLine<'_>> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| self.listing_line(index, line.trim()))
            .collect();

        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return text.to_string();
        };
        if entries.len() < MIN_STRIPPED_ENTRIES || last.index - first.index >= MAX_LINES_PER_ENTRY * entries.len() {
            return text.to_string();
        }

        let mut kept: Vec<&str> = lines[..first.index].to_vec();
        let remainder = last.partial.map(|title_chars| {
            let cut = last.line.char_indices().nth(title_chars).map_or(last.line.len(), |(i, _)| i);
            last.line[cut..].trim_start()
        });
        let after = remainder.into_iter().chain(lines[last.index + 1..].iter().copied());
        kept.extend(after.skip_while(|line| line.trim().is_empty()));

        kept.join("\n").trim_matches('\n').to_string()
    }

    fn listing_line<'a>(&self, index: usize, line: &'a str) -> Option<ListingLine<'a>> {
        let upper = line.to_uppercase();
        if self.is_title(&upper) && upper.chars().count() < MAX_ENTRY_CHARS {
            return Some(ListingLine {
                index,
                line,
                partial: None,
            });
        }
        self.titles
            .iter()
            .find(|title| {
                title.chars().count() < MAX_ENTRY_CHARS
                    && upper.strip_prefix(title.as_str()).is_some_and(|rest| rest.starts_with(' '))
            })
            .map(|title| ListingLine {
                index,
                line,
                partial: Some(title.chars().count()),
            })
    }

    /// Drop front-matter pages and strip listings from the rest. Pages left
    /// empty are dropped.
    pub fn filter_pages(&self, pages: Vec<Page>) -> Vec<Page> {
        pages
            .into_iter()
            .filter_map(|mut page| {
                if page.chapter_title.as_deref().is_some_and(is_front_matter_title) {
                    tracing::debug!(label = %page.label, "skipping front-matter page");
                    return None;
                }
                page.text = self.strip_listing(&page.text);
                (!page.text.trim().is_empty()).then_some(page)
            })
            .collect()
    }
}
