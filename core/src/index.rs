use crate::document::{BookId, Document};
use crate::error::{ConcordError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

/// Address of one indexed token. Field order gives document order under `Ord`
/// because book ids are handed out in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Posting {
    pub book: BookId,
    pub chapter: u32,
    pub verse: u32,
    pub position: u32,
}

/// Word → every occurrence, kept in document order.
#[derive(Default, Debug)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    // terms each book contributed, so removal never scans the whole dictionary
    book_terms: HashMap<BookId, Vec<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_document(&mut self, book: BookId, doc: &Document) -> Result<()> {
        if self.book_terms.contains_key(&book) {
            return Err(ConcordError::AlreadyIndexed(doc.name.clone()));
        }
        let mut terms: BTreeSet<String> = BTreeSet::new();
        for (chapter, verse, word) in doc.occurrences() {
            let posting = Posting { book, chapter, verse, position: word.position };
            let list = self.postings.entry(word.normalized.clone()).or_default();
            terms.insert(word.normalized.clone());
            // appends in the common case; an older book id re-indexed after removal lands in the middle
            let at = list.partition_point(|p| *p < posting);
            list.insert(at, posting);
        }
        tracing::debug!(book = %doc.name, terms = terms.len(), "indexed document");
        self.book_terms.insert(book, terms.into_iter().collect());
        Ok(())
    }

    /// Drop every posting of `book`. Words left without postings disappear. Returns whether the book was indexed.
    pub fn remove_document(&mut self, book: BookId) -> bool {
        let Some(terms) = self.book_terms.remove(&book) else {
            return false;
        };
        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                list.retain(|p| p.book != book);
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }

    pub fn is_indexed(&self, book: BookId) -> bool {
        self.book_terms.contains_key(&book)
    }

    pub fn postings(&self, word: &str) -> &[Posting] {
        self.postings.get(word).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, word: &str) -> bool {
        self.postings.contains_key(word)
    }

    /// All words in alphabetical order.
    pub fn terms(&self) -> impl Iterator<Item = (&String, &Vec<Posting>)> {
        self.postings.iter()
    }

    /// Words starting with `prefix`, alphabetical.
    pub fn terms_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a Vec<Posting>)> + 'a {
        self.postings
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}
