//! Plain-text output: chapter markers, duplicate-title removal, range parsing.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::extract::PARAGRAPH_BREAK;

/// Lines longer than this are treated as prose, never as a heading.
const MAX_HEADING_LEN: usize = 120;

const HEADING_PREFIXES: &[&str] = &["chapter", "part", "book", "section", "act"];

const TITLE_SEPARATORS: &[char] = &[':', '-', '.', ',', '\u{2013}', '\u{2014}'];

/// Separator between paragraphs inside a chapter or page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParagraphStyle {
    /// One line break between paragraphs.
    Compact,
    /// A blank line between paragraphs.
    #[default]
    Readable,
}

impl ParagraphStyle {
    /// Rewrite the paragraph breaks of `text` for this style.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        static BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

        match self {
            ParagraphStyle::Compact => BREAKS_RE.replace_all(text, "\n"),
            ParagraphStyle::Readable => Cow::Borrowed(text),
        }
    }
}

/// How extracted chapters are assembled into one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Drop a chapter's first line when it repeats the chapter title.
    pub remove_duplicate_titles: bool,
    /// Precede each chapter with a `<<CHAPTER: title>>` line.
    pub chapter_markers: bool,
    pub paragraph_style: ParagraphStyle,
    /// Leave out tables of contents and front matter such as prefaces.
    pub skip_front_matter: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            remove_duplicate_titles: true,
            chapter_markers: true,
            paragraph_style: ParagraphStyle::Readable,
            skip_front_matter: false,
        }
    }
}

impl RenderOptions {
    pub const fn with_duplicate_titles_removed(mut self, on: bool) -> Self {
        self.remove_duplicate_titles = on;
        self
    }

    pub const fn with_chapter_markers(mut self, on: bool) -> Self {
        self.chapter_markers = on;
        self
    }

    pub const fn with_paragraph_style(mut self, style: ParagraphStyle) -> Self {
        self.paragraph_style = style;
        self
    }

    pub const fn with_front_matter_skipped(mut self, on: bool) -> Self {
        self.skip_front_matter = on;
        self
    }
}

/// `<<CHAPTER: title>>`
pub fn chapter_marker(title: &str) -> String {
    format!("<<CHAPTER: {title}>>")
}

/// `<<PAGE: label>>`
pub fn page_marker(label: &str) -> String {
    format!("<<PAGE: {label}>>")
}

/// Render one chapter, or `None` when it has no text.
pub fn render_chapter(title: &str, text: &str, options: RenderOptions) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let body = if options.remove_duplicate_titles {
        remove_duplicate_title_line(text, title)
    } else {
        text.to_string()
    };
    let body = options.paragraph_style.apply(&body);

    Some(match (options.chapter_markers, body.is_empty()) {
        (true, true) => chapter_marker(title),
        (true, false) => format!("{}{PARAGRAPH_BREAK}{body}", chapter_marker(title)),
        (false, _) => body.into_owned(),
    })
}

/// Render `(title, text)` pairs in the given order, skipping empty chapters.
pub fn render_chapters<'a, I>(chapters: I, options: RenderOptions) -> String
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    chapters
        .into_iter()
        .filter_map(|(title, text)| render_chapter(title, &text, options))
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

/// Remove the first line of `text` if it repeats `title`.
///
/// Matches, in order: the whole line equal to the title (ignoring case);
/// the title followed by separators and more text on the same line, in
/// which case only the title is removed; and for heading-like lines, the
/// title's letters and digits appearing in the line's.
pub fn remove_duplicate_title_line(text: &str, title: &str) -> String {
    let title = title.trim();
    if text.is_empty() || title.is_empty() {
        return text.to_string();
    }

    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first.trim(), Some(rest)),
        None => (text.trim(), None),
    };
    let drop_line = || rest.map(|r| r.trim_start_matches('\n').to_string()).unwrap_or_default();

    if first == title || first.to_lowercase() == title.to_lowercase() {
        return drop_line();
    }

    if let Some(remainder) = strip_title_prefix(first, title) {
        return match rest {
            Some(rest) => format!("{remainder}\n{rest}"),
            None => remainder.to_string(),
        };
    }

    let normalized_title = alphanumeric(title);
    let normalized_first = alphanumeric(first);
    if normalized_title.is_empty() || normalized_first.is_empty() {
        return text.to_string();
    }
    if normalized_first == normalized_title {
        return drop_line();
    }

    let heading_like = first.chars().count() <= MAX_HEADING_LEN
        && !first.trim_end().ends_with(['.', '!', '?']);
    if heading_like && normalized_first.contains(&normalized_title) {
        let lower = first.to_lowercase();
        if normalized_title.len() >= 3 || HEADING_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return drop_line();
        }
    }

    text.to_string()
}

/// `"ONE: The morning"` with title `"one"` gives `"The morning"`.
fn strip_title_prefix<'a>(line: &'a str, title: &str) -> Option<&'a str> {
    let head = line.get(..title.len())?;
    if head.to_lowercase() != title.to_lowercase() {
        return None;
    }
    let after = &line[title.len()..];
    if !after.starts_with(|c: char| c.is_whitespace() || TITLE_SEPARATORS.contains(&c)) {
        return None;
    }
    let remainder = after.trim_start_matches(|c: char| c.is_whitespace() || TITLE_SEPARATORS.contains(&c));
    (!remainder.is_empty()).then_some(remainder)
}

fn alphanumeric(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parse a 1-based chapter selection such as `"1-5,7,9-12"` into 0-based
/// indices, in the order given and without repeats.
pub fn parse_chapter_range(range: &str) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in range.split(',').map(str::trim) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_index(start, part)?, parse_index(end, part)?),
            None => {
                let n = parse_index(part, part)?;
                (n, n)
            }
        };
        if end < start {
            return Err(Error::InvalidRange(format!("{part} runs backwards")));
        }
        for index in start..=end {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    Ok(indices)
}

fn parse_index(number: &str, part: &str) -> Result<usize> {
    match number.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(Error::InvalidRange(format!("\"{part}\" is not a chapter number or range"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_title_line() {
        assert_eq!(
            remove_duplicate_title_line("ONE\nThe morning was joyless for him.", "ONE"),
            "The morning was joyless for him."
        );
        assert_eq!(
            remove_duplicate_title_line("Chapter One\n\nIt began.", "chapter one"),
            "It began."
        );
        assert_eq!(remove_duplicate_title_line("ONE", "ONE"), "");
    }

    #[test]
    fn test_title_on_same_line() {
        assert_eq!(
            remove_duplicate_title_line("ONE The morning was joyless.", "ONE"),
            "The morning was joyless."
        );
        assert_eq!(
            remove_duplicate_title_line("One: The morning\n\nMore.", "ONE"),
            "The morning\n\nMore."
        );
        assert_eq!(
            remove_duplicate_title_line("ONE \u{2014} Dawn", "ONE"),
            "Dawn"
        );
    }

    #[test]
    fn test_title_prefix_needs_separator() {
        // "ONEROUS" starts with "ONE" but is a different word
        let text = "ONEROUS duties awaited.";
        assert_eq!(remove_duplicate_title_line(text, "ONE"), text);
    }

    #[test]
    fn test_normalized_heading_match() {
        assert_eq!(
            remove_duplicate_title_line("CHAPTER 1 - THE BEGINNING\n\nText.", "Chapter 1: The Beginning"),
            "Text."
        );
        assert_eq!(
            remove_duplicate_title_line("Chapter I\n\nText.", "I"),
            "Text."
        );
    }

    #[test]
    fn test_prose_first_line_kept() {
        let text = "The storm ended before the chapter did.\n\nMore.";
        assert_eq!(remove_duplicate_title_line(text, "Storm"), text);
        assert_eq!(remove_duplicate_title_line(text, ""), text);
    }

    #[test]
    fn test_render_chapters_skips_empty() {
        let out = render_chapters(
            [
                ("One", "One\n\nFirst.".to_string()),
                ("Blank", "   ".to_string()),
                ("Two", "Second.".to_string()),
            ],
            RenderOptions::default(),
        );
        assert_eq!(out, "<<CHAPTER: One>>\n\nFirst.\n\n<<CHAPTER: Two>>\n\nSecond.");
    }

    #[test]
    fn test_heading_only_chapter_keeps_marker() {
        assert_eq!(
            render_chapter("Part One", "Part One", RenderOptions::default()).as_deref(),
            Some("<<CHAPTER: Part One>>")
        );
    }

    #[test]
    fn test_render_options() {
        let options = RenderOptions::default()
            .with_duplicate_titles_removed(false)
            .with_chapter_markers(false);
        assert_eq!(
            render_chapter("One", "One\n\nFirst.", options).as_deref(),
            Some("One\n\nFirst.")
        );
    }

    #[test]
    fn test_compact_paragraphs() {
        let options = RenderOptions::default().with_paragraph_style(ParagraphStyle::Compact);
        assert_eq!(
            render_chapters(
                [
                    ("One", "One\n\nFirst.\n\nSecond.".to_string()),
                    ("Two", "Third.".to_string()),
                ],
                options,
            ),
            "<<CHAPTER: One>>\n\nFirst.\nSecond.\n\n<<CHAPTER: Two>>\n\nThird."
        );
        assert_eq!(ParagraphStyle::Readable.apply("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_parse_chapter_range() {
        assert_eq!(parse_chapter_range("3,1-2,2").unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_chapter_range(" 1 - 3 , 5").unwrap(), vec![0, 1, 2, 4]);
        assert_eq!(parse_chapter_range("4").unwrap(), vec![3]);
    }

    #[test]
    fn test_parse_chapter_range_errors() {
        for bad in ["0", "a", "3-1", "", "1,,2", "-2"] {
            assert!(
                matches!(parse_chapter_range(bad), Err(Error::InvalidRange(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
