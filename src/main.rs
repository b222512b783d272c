//! spinecut - chapter-segmented plain text from EPUB files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use spinecut::{Book, CleaningConfig, PageSize, ParagraphStyle, RenderOptions, parse_chapter_range};

#[derive(Parser)]
#[command(name = "spinecut")]
#[command(version, about = "Chapter-segmented plain text from EPUB files", long_about = None)]
#[command(after_help = "EXAMPLES:
    spinecut list book.epub                List chapters with their numbers
    spinecut extract book.epub -c 1-3,5    Extract chapters 1 to 3 and 5
    spinecut extract book.epub --pages     Extract text by print page
    spinecut extract book.epub --skip-toc -s compact")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log resolver decisions to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the chapters found in the table of contents
    List {
        #[arg(value_name = "BOOK")]
        input: PathBuf,

        /// Print JSON instead of an indented list
        #[arg(long)]
        json: bool,
    },
    /// Show book metadata
    Info {
        #[arg(value_name = "BOOK")]
        input: PathBuf,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract chapter text
    Extract(ExtractArgs),
}

#[derive(Args)]
struct ExtractArgs {
    #[arg(value_name = "BOOK")]
    input: PathBuf,

    /// Chapter numbers as shown by `list` (e.g. 1-5,7,9-12)
    #[arg(short, long, value_name = "RANGE")]
    chapters: Option<String>,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Split by print page; books without a page list get synthetic pages
    #[arg(long, conflicts_with = "chapters")]
    pages: bool,

    /// Synthetic page size in characters
    #[arg(long, value_name = "N", default_value = "2000")]
    page_size: usize,

    /// Count the synthetic page size in words instead of characters
    #[arg(long)]
    page_words: bool,

    /// Paragraph separator: compact (line break) or readable (blank line)
    #[arg(short = 's', long, default_value = "readable")]
    format_style: FormatStyle,

    /// Leave out tables of contents and front matter such as prefaces
    #[arg(long)]
    skip_toc: bool,

    /// Skip all text cleaning
    #[arg(long)]
    no_clean: bool,

    /// Keep bracketed footnote numbers like [12]
    #[arg(long)]
    keep_footnotes: bool,

    /// Keep standalone page numbers
    #[arg(long)]
    keep_page_numbers: bool,

    /// Join lines separated by a single line break
    #[arg(long)]
    fold_newlines: bool,

    /// Keep a chapter's first line even when it repeats the title
    #[arg(long)]
    keep_duplicate_titles: bool,

    /// Omit <<CHAPTER: ...>> markers
    #[arg(long)]
    no_markers: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum FormatStyle {
    Compact,
    Readable,
}

impl From<FormatStyle> for ParagraphStyle {
    fn from(style: FormatStyle) -> Self {
        match style {
            FormatStyle::Compact => ParagraphStyle::Compact,
            FormatStyle::Readable => ParagraphStyle::Readable,
        }
    }
}

impl ExtractArgs {
    fn cleaning(&self) -> CleaningConfig {
        if self.no_clean {
            return CleaningConfig::none();
        }
        CleaningConfig::default()
            .with_bracketed_numbers_removed(!self.keep_footnotes)
            .with_page_numbers_removed(!self.keep_page_numbers)
            .with_single_newlines_folded(self.fold_newlines)
    }

    fn render(&self) -> RenderOptions {
        RenderOptions::default()
            .with_duplicate_titles_removed(!self.keep_duplicate_titles)
            .with_chapter_markers(!self.no_markers)
            .with_paragraph_style(self.format_style.into())
            .with_front_matter_skipped(self.skip_toc)
    }

    fn page_size(&self) -> PageSize {
        if self.page_words {
            PageSize::Words(self.page_size)
        } else {
            PageSize::Chars(self.page_size)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Command::List { input, json } => list(input, *json),
        Command::Info { input, json } => info(input, *json),
        Command::Extract(args) => extract(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = match (verbose, quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Serialize)]
struct ChapterEntry<'a> {
    number: usize,
    id: &'a str,
    title: &'a str,
    depth: usize,
    resolved: bool,
    chars: usize,
}

fn list(path: &Path, json: bool) -> Result<(), String> {
    let book = Book::open(path).map_err(|e| e.to_string())?;
    let config = CleaningConfig::default();

    let entries: Vec<_> = book
        .chapters()
        .iter()
        .enumerate()
        .map(|(i, (_, chapter))| ChapterEntry {
            number: i + 1,
            id: &chapter.id,
            title: &chapter.title,
            depth: chapter.depth,
            resolved: chapter.is_resolved(),
            chars: book.extract(chapter, config).chars().count(),
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    let width = entries.len().to_string().len();
    for entry in &entries {
        let indent = "  ".repeat(entry.depth);
        let status = if entry.resolved { "" } else { " (unresolved)" };
        println!(
            "{:>width$}. {indent}{} ({} chars){status}",
            entry.number, entry.title, entry.chars
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct BookInfo<'a> {
    title: &'a str,
    authors: &'a [String],
    language: &'a str,
    identifier: &'a str,
    publisher: Option<&'a str>,
    date: Option<&'a str>,
    description: Option<&'a str>,
    subjects: &'a [String],
    navigation: &'a str,
    spine_documents: usize,
    chapters: usize,
    pages: usize,
    warnings: Vec<String>,
}

fn info(path: &Path, json: bool) -> Result<(), String> {
    let book = Book::open(path).map_err(|e| e.to_string())?;
    let meta = book.metadata();

    let info = BookInfo {
        title: &meta.title,
        authors: &meta.authors,
        language: &meta.language,
        identifier: &meta.identifier,
        publisher: meta.publisher.as_deref(),
        date: meta.date.as_deref(),
        description: meta.description.as_deref(),
        subjects: &meta.subjects,
        navigation: book.nav().path(),
        spine_documents: book.container().spine_len(),
        chapters: book.chapters().len(),
        pages: book.page_targets().len(),
        warnings: book.warnings().iter().map(ToString::to_string).collect(),
    };

    if json {
        let out = serde_json::to_string_pretty(&info).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    println!("File: {}", path.display());
    println!("Title: {}", info.title);
    if !info.authors.is_empty() {
        println!("Authors: {}", info.authors.join(", "));
    }
    if !info.language.is_empty() {
        println!("Language: {}", info.language);
    }
    if let Some(publisher) = info.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(date) = info.date {
        println!("Date: {date}");
    }
    if let Some(desc) = info.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &desc[..cut]),
            None => println!("Description: {desc}"),
        }
    }
    println!("Navigation: {}", info.navigation);
    println!("Spine documents: {}", info.spine_documents);
    println!("Chapters: {}", info.chapters);
    if info.pages > 0 {
        println!("Print pages: {}", info.pages);
    }
    for warning in &info.warnings {
        println!("Warning: {warning}");
    }

    Ok(())
}

fn extract(args: &ExtractArgs) -> Result<(), String> {
    let book = Book::open(&args.input).map_err(|e| e.to_string())?;
    let config = args.cleaning();
    let options = args.render();

    let text = if args.pages {
        if args.page_size == 0 {
            return Err("page size must be at least 1".to_string());
        }
        book.render_pages_or_synthetic(config, args.page_size(), options)
    } else if let Some(range) = &args.chapters {
        let all: Vec<_> = book.chapters().iter().map(|(_, c)| c.id.as_str()).collect();
        let ids: Vec<&str> = parse_chapter_range(range)
            .map_err(|e| e.to_string())?
            .into_iter()
            .filter_map(|i| all.get(i).copied())
            .collect();
        if ids.is_empty() {
            return Err(format!("no chapters in range {range} (book has {})", all.len()));
        }
        book.extract_chapters(&ids, config, options)
    } else {
        book.extract_all(config, options)
    };

    match &args.output {
        Some(output) => std::fs::write(output, format!("{text}\n")).map_err(|e| e.to_string()),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
