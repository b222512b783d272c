mod common;

use common::{Entry, EpubFixture, entry};
use proptest::prelude::*;
use spinecut::{CleaningConfig, ResolvedPosition, clean};

/// Paragraph layout per document; `true` marks a paragraph that starts a chapter.
fn layout() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), 1..5), 1..4)
}

fn fixture(layout: &[Vec<bool>], nested: bool) -> (EpubFixture, Vec<String>, Vec<String>) {
    let mut fixture = EpubFixture::new("Generated");
    let mut words = Vec::new();
    let mut flat = Vec::new();

    for (i, paragraphs) in layout.iter().enumerate() {
        let mut body = String::new();
        for (j, &starts) in paragraphs.iter().enumerate() {
            let word = format!("w{i}x{j}");
            body.push_str(&format!(r#"<p id="p{i}x{j}">{word}</p>"#));
            words.push(word);
            if starts || (i == 0 && j == 0 && !layout.iter().flatten().any(|&s| s)) {
                flat.push(entry(&format!("C{}", flat.len()), &format!("d{i}.xhtml#p{i}x{j}")));
            }
        }
        fixture = fixture.document(&format!("d{i}.xhtml"), &body);
    }

    let titles = flat.iter().map(|e| e.title.clone()).collect();
    let entries: Vec<Entry> = if nested {
        // Pair entries up: every even entry becomes the parent of the next one
        flat.chunks(2)
            .map(|pair| match pair {
                [parent, child] => parent.clone().with_children(vec![child.clone()]),
                [single] => single.clone(),
                _ => unreachable!(),
            })
            .collect()
    } else {
        flat
    };

    (fixture.nav(&entries), words, titles)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_spans_partition_the_book(layout in layout(), nested in any::<bool>()) {
        let (fixture, words, titles) = fixture(&layout, nested);
        let book = fixture.open().unwrap();
        let tree = book.chapters();
        let order = tree.reading_order();

        // Own spans tile the book from the first start to the end
        let spans: Vec<_> = order.iter().map(|&id| tree.get(id).unwrap().span.unwrap()).collect();
        for pair in spans.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        prop_assert_eq!(spans.last().unwrap().end, ResolvedPosition::end_of_book(layout.len()));

        // Every paragraph lands in exactly one chapter, in order
        let extracted: Vec<String> = order
            .iter()
            .flat_map(|&id| {
                let text = book.extract(tree.get(id).unwrap(), CleaningConfig::none());
                text.split_whitespace().map(str::to_string).collect::<Vec<_>>()
            })
            .collect();
        prop_assert_eq!(extracted, words);

        // Navigation pre-order survives resolution
        let resolved: Vec<_> = tree
            .iter()
            .filter(|(_, c)| !c.synthesized)
            .map(|(_, c)| c.title.clone())
            .collect();
        prop_assert_eq!(resolved, titles);
    }

    #[test]
    fn prop_clean_is_idempotent(
        text in r"(\[[0-9]{1,3}\]|[0-9]{1,3}|[a-z]{1,6}|[ \t]{1,3}|\r?\n|- [0-9]+ -)*",
        remove_brackets in any::<bool>(),
        remove_pages in any::<bool>(),
        normalize in any::<bool>(),
        fold in any::<bool>(),
    ) {
        let config = CleaningConfig::none()
            .with_bracketed_numbers_removed(remove_brackets)
            .with_page_numbers_removed(remove_pages)
            .with_whitespace_normalized(normalize)
            .with_single_newlines_folded(fold);
        let once = clean(&text, config);
        prop_assert_eq!(clean(&once, config), once);
    }
}
