//! Text cleaning pipeline.
//!
//! Each pass is a function `&str -> String` applied in a fixed order:
//! bracketed footnote numbers, page numbers, whitespace, then (opt-in)
//! single-newline folding. Removal runs before normalization so removed
//! tokens do not leave stray blank lines behind.
//!
//! The pipeline is re-run until its output stops changing, so
//! `clean(clean(t)) == clean(t)` for every configuration.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Which cleaning passes run. All on except folding by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningConfig {
    /// Delete footnote markers like `[12]`.
    pub remove_bracketed_numbers: bool,
    /// Delete digit-only lines and `- 42 -` page markers.
    pub remove_page_numbers: bool,
    /// Collapse spaces, trim line ends and limit blank lines to one.
    pub normalize_whitespace: bool,
    /// Join lines separated by a single line break.
    pub fold_single_newlines: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_bracketed_numbers: true,
            remove_page_numbers: true,
            normalize_whitespace: true,
            fold_single_newlines: false,
        }
    }
}

impl CleaningConfig {
    /// Every pass disabled; text passes through unchanged.
    pub const fn none() -> Self {
        Self {
            remove_bracketed_numbers: false,
            remove_page_numbers: false,
            normalize_whitespace: false,
            fold_single_newlines: false,
        }
    }

    pub const fn with_bracketed_numbers_removed(mut self, on: bool) -> Self {
        self.remove_bracketed_numbers = on;
        self
    }

    pub const fn with_page_numbers_removed(mut self, on: bool) -> Self {
        self.remove_page_numbers = on;
        self
    }

    pub const fn with_whitespace_normalized(mut self, on: bool) -> Self {
        self.normalize_whitespace = on;
        self
    }

    pub const fn with_single_newlines_folded(mut self, on: bool) -> Self {
        self.fold_single_newlines = on;
        self
    }

    fn is_noop(&self) -> bool {
        *self == Self::none()
    }
}

/// Run the enabled passes until the text no longer changes.
pub fn clean(text: &str, config: CleaningConfig) -> String {
    if config.is_noop() {
        return text.to_string();
    }

    // Every pass either deletes text or turns whitespace into plain spaces,
    // so the loop reaches a fixpoint.
    let mut current = run_pipeline(text, config);
    loop {
        let next = run_pipeline(&current, config);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn run_pipeline(text: &str, config: CleaningConfig) -> String {
    let mut result = text.to_string();

    if config.remove_bracketed_numbers {
        result = remove_bracketed_numbers(&result);
    }
    if config.remove_page_numbers {
        result = remove_page_numbers(&result);
    }
    if config.normalize_whitespace {
        result = normalize_whitespace(&result);
    }
    if config.fold_single_newlines {
        result = fold_single_newlines(&result);
    }

    result
}

/// Apply `pass` until it stops changing the text.
fn to_fixpoint(text: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = pass(text);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Bracketed numbers
// ---------------------------------------------------------------------------

/// Remove `[12]`-style footnote markers. `[note]` and `[1a]` are left alone.
fn remove_bracketed_numbers(text: &str) -> String {
    static BRACKET_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid regex"));

    to_fixpoint(text, |t| BRACKET_RE.replace_all(t, "").into_owned())
}

// ---------------------------------------------------------------------------
// Pass 2: Page numbers
// ---------------------------------------------------------------------------

/// Remove page numbers left over from print layouts.
///
/// Three independent rules: a line holding only digits (removed with its
/// line break), a digits-only segment at the very end of the text, and
/// digits flanked by dashes (`- 42 -`).
fn remove_page_numbers(text: &str) -> String {
    static DIGIT_LINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*\d+[^\S\n]*\n").expect("valid regex"));
    static TRAILING_DIGITS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:\A|\n)[^\S\n]*\d+\s*\z").expect("valid regex"));
    static DASHED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[-\u{2013}\u{2014}][^\S\n]+\d+[^\S\n]+[-\u{2013}\u{2014}]").expect("valid regex")
    });

    to_fixpoint(text, |t| {
        let t = DIGIT_LINE_RE.replace_all(t, "");
        let t = TRAILING_DIGITS_RE.replace(&t, "");
        DASHED_RE.replace_all(&t, "").into_owned()
    })
}

// ---------------------------------------------------------------------------
// Pass 3: Whitespace
// ---------------------------------------------------------------------------

/// Normalize line endings and spacing.
///
/// Runs of horizontal whitespace after text collapse to one space. Leading
/// indentation (nested list items) is kept as plain spaces, a tab counting
/// as two. Trailing whitespace is trimmed per line, and three or more line
/// breaks become two.
fn normalize_whitespace(text: &str) -> String {
    static CRLF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").expect("valid regex"));
    static INDENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]+").expect("valid regex"));
    static INNER_SPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\S)[^\S\n]+").expect("valid regex"));
    static TRAILING_SPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)[^\S\n]+$").expect("valid regex"));
    static MULTI_BREAK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let result = CRLF_RE.replace_all(text, "\n");
    let result = INDENT_RE.replace_all(&result, |caps: &Captures| {
        caps[0]
            .chars()
            .map(|c| if c == '\t' { "  " } else { " " })
            .collect::<String>()
    });
    let result = INNER_SPACE_RE.replace_all(&result, "$1 ");
    let result = TRAILING_SPACE_RE.replace_all(&result, "");
    let result = MULTI_BREAK_RE.replace_all(&result, "\n\n");
    result.trim_start_matches('\n').trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Single-newline folding
// ---------------------------------------------------------------------------

/// Join wrapped lines: a whitespace run holding exactly one line break
/// becomes a space. Paragraph breaks and the text edges are untouched.
fn fold_single_newlines(text: &str) -> String {
    static BREAK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\S\n]*(?:\n[^\S\n]*)+").expect("valid regex"));

    BREAK_RUN_RE
        .replace_all(text, |caps: &Captures| {
            let run = caps.get(0).map_or("", |m| m.as_str());
            let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
            let single = run.bytes().filter(|&b| b == b'\n').count() == 1;
            if single && start > 0 && end < text.len() {
                " ".to_string()
            } else {
                run.to_string()
            }
        })
        .into_owned()
}
