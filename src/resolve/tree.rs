use super::ResolvedPosition;

/// Index of a chapter in a [`ChapterTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterId(pub u32);

impl ChapterId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Half-open range `[start, end)` of resolved positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: ResolvedPosition,
    pub end: ResolvedPosition,
}

impl Span {
    pub fn new(start: ResolvedPosition, end: ResolvedPosition) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, position: ResolvedPosition) -> bool {
        self.start <= position && position < self.end
    }
}

/// A navigation entry with its resolved location in the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub depth: usize,
    pub parent: Option<ChapterId>,
    pub children: Vec<ChapterId>,
    /// Href as written in the navigation document.
    pub href: Option<String>,
    /// Where this entry's own target resolved; `None` for grouping entries.
    pub start: Option<ResolvedPosition>,
    /// Direct content: up to the next chapter start in reading order.
    pub span: Option<Span>,
    /// Content including all descendants.
    pub subtree_span: Option<Span>,
    /// True for chapters that do not come from the navigation document.
    pub synthesized: bool,
}

impl Chapter {
    pub fn is_resolved(&self) -> bool {
        self.start.is_some()
    }
}

/// Chapters in navigation pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterTree {
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) roots: Vec<ChapterId>,
}

impl ChapterTree {
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.get(id.index())
    }

    pub fn roots(&self) -> &[ChapterId] {
        &self.roots
    }

    /// All chapters in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (ChapterId, &Chapter)> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(i, chapter)| (ChapterId(i as u32), chapter))
    }

    /// Look a chapter up by its id string.
    pub fn find(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }

    /// Chapters with their own start, sorted by start; ties keep pre-order.
    pub fn reading_order(&self) -> Vec<ChapterId> {
        let mut ids: Vec<_> = self
            .iter()
            .filter(|(_, chapter)| chapter.start.is_some())
            .map(|(id, _)| id)
            .collect();
        ids.sort_by_key(|id| self.chapters[id.index()].start);
        ids
    }

    /// The chapter whose own span contains `position`.
    pub fn chapter_at(&self, position: ResolvedPosition) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|chapter| chapter.span.is_some_and(|span| span.contains(position)))
    }

    pub(crate) fn push(&mut self, chapter: Chapter) -> ChapterId {
        let id = ChapterId(self.chapters.len() as u32);
        match chapter.parent {
            Some(parent) => self.chapters[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        self.chapters.push(chapter);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(spine: usize, offset: usize) -> ResolvedPosition {
        ResolvedPosition::new(spine, offset)
    }

    fn chapter(id: &str, parent: Option<ChapterId>, start: Option<ResolvedPosition>) -> Chapter {
        Chapter {
            id: id.into(),
            title: id.to_uppercase(),
            depth: parent.map_or(0, |_| 1),
            parent,
            children: Vec::new(),
            href: None,
            start,
            span: None,
            subtree_span: None,
            synthesized: false,
        }
    }

    #[test]
    fn test_push_links_parents() {
        let mut tree = ChapterTree::default();
        let a = tree.push(chapter("a", None, Some(pos(0, 0))));
        let b = tree.push(chapter("b", Some(a), Some(pos(0, 5))));
        let c = tree.push(chapter("c", None, Some(pos(1, 0))));

        assert_eq!(tree.roots(), &[a, c]);
        assert_eq!(tree.get(a).unwrap().children, vec![b]);
        assert_eq!(tree.find("b").map(|ch| ch.title.as_str()), Some("B"));
    }

    #[test]
    fn test_reading_order_is_stable() {
        let mut tree = ChapterTree::default();
        let late = tree.push(chapter("late", None, Some(pos(2, 0))));
        let group = tree.push(chapter("group", None, None));
        let first = tree.push(chapter("first", None, Some(pos(0, 3))));
        let tie = tree.push(chapter("tie", None, Some(pos(0, 3))));

        assert_eq!(tree.reading_order(), vec![first, tie, late]);
        assert!(!tree.get(group).unwrap().is_resolved());
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(pos(0, 4), pos(1, 0));
        assert!(span.contains(pos(0, 4)));
        assert!(span.contains(pos(0, 900)));
        assert!(!span.contains(pos(1, 0)));
        assert!(Span::new(pos(1, 0), pos(1, 0)).is_empty());
    }
}
