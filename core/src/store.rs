use crate::document::{BookId, Document};
use crate::error::{ConcordError, Result};
use crate::index::InvertedIndex;
use crate::parser::{normalize_book_name, parse};
use crate::query::{
    Appearance, AppearanceFilters, BookStats, BookSummary, GeneralStats, Page, PhraseReference, QueryEngine, WordFilters,
};
use crate::registry::{parse_phrase, phrase_key, Registry};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_CONTEXT_RADIUS: u32 = 2;

/// All mutable state: documents, the derived index, and the registry.
/// The index is a projection of `documents`, maintained by the add/remove hooks only.
#[derive(Default, Debug)]
pub struct Corpus {
    documents: BTreeMap<BookId, Document>,
    names: HashMap<String, BookId>,
    next_book_id: BookId,
    index: InvertedIndex,
    registry: Registry,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a corpus from stored parts; the index is recomputed.
    pub fn from_parts(documents: Vec<(BookId, Document)>, next_book_id: BookId, registry: Registry) -> Result<Self> {
        let mut corpus = Corpus { registry, ..Corpus::default() };
        for (id, doc) in documents {
            corpus.insert(id, doc)?;
        }
        corpus.next_book_id = corpus
            .documents
            .keys()
            .next_back()
            .map_or(next_book_id, |last| next_book_id.max(last + 1));
        Ok(corpus)
    }

    pub fn add_document(&mut self, doc: Document) -> Result<BookId> {
        let id = self.next_book_id;
        self.insert(id, doc)?;
        self.next_book_id += 1;
        Ok(id)
    }

    pub fn remove_document(&mut self, name: &str) -> Result<Document> {
        let id = self.book_id(name)?;
        self.on_document_removed(id);
        self.names.retain(|_, v| *v != id);
        self.documents
            .remove(&id)
            .ok_or_else(|| ConcordError::not_found(format!("book '{name}'")))
    }

    fn insert(&mut self, id: BookId, doc: Document) -> Result<()> {
        if self.names.contains_key(&doc.name) {
            return Err(ConcordError::DuplicateBook(doc.name));
        }
        // indexing fails before touching anything, so nothing partial is left behind
        self.on_document_added(id, &doc)?;
        self.names.insert(doc.name.clone(), id);
        self.documents.insert(id, doc);
        Ok(())
    }

    fn on_document_added(&mut self, id: BookId, doc: &Document) -> Result<()> {
        self.index.index_document(id, doc)
    }

    fn on_document_removed(&mut self, id: BookId) {
        self.index.remove_document(id);
    }

    pub fn book_id(&self, name: &str) -> Result<BookId> {
        let key = normalize_book_name(name)?;
        self.names.get(&key).copied().ok_or_else(|| ConcordError::not_found(format!("book '{key}'")))
    }

    pub fn contains_book(&self, name: &str) -> bool {
        self.book_id(name).is_ok()
    }

    pub fn document(&self, name: &str) -> Result<&Document> {
        let id = self.book_id(name)?;
        self.documents.get(&id).ok_or_else(|| ConcordError::not_found(format!("book '{name}'")))
    }

    pub fn document_by_id(&self, id: BookId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = (BookId, &Document)> {
        self.documents.iter().map(|(id, d)| (*id, d))
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn next_book_id(&self) -> BookId {
        self.next_book_id
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

/// Thread-safe entry point. Writers (book add/remove, registry edits) take the exclusive lock;
/// queries share it, so no reader ever sees a partially indexed book.
#[derive(Default)]
pub struct Library {
    corpus: RwLock<Corpus>,
    phrase_cache: Mutex<HashMap<String, Arc<Vec<PhraseReference>>>>,
    save_lock: Mutex<()>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_corpus(corpus: Corpus) -> Self {
        Self { corpus: RwLock::new(corpus), phrase_cache: Mutex::new(HashMap::new()), save_lock: Mutex::new(()) }
    }

    /// Held across a whole snapshot write so saves land on disk one at a time, newest last.
    pub fn lock_saves(&self) -> MutexGuard<'_, ()> {
        self.save_lock.lock()
    }

    /// Shared view of the corpus for callers that need several reads under one lock.
    pub fn read(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read()
    }

    fn query<R>(&self, f: impl FnOnce(&QueryEngine<'_>) -> R) -> R {
        let corpus = self.corpus.read();
        f(&QueryEngine::new(&corpus))
    }

    // --- books ---

    /// Parse and index a book. Parsing runs outside the lock; the store is untouched on failure.
    pub fn add_book(&self, raw_text: &str, name: &str, division: &str) -> Result<Document> {
        let key = normalize_book_name(name)?;
        if self.corpus.read().contains_book(&key) {
            return Err(ConcordError::DuplicateBook(key));
        }
        let doc = parse(raw_text, &key, division)?;
        let mut corpus = self.corpus.write();
        corpus.add_document(doc.clone())?;
        self.phrase_cache.lock().clear();
        tracing::info!(book = %doc.name, chapters = doc.chapters.len(), words = doc.num_words(), "added book");
        Ok(doc)
    }

    pub fn remove_book(&self, name: &str) -> Result<()> {
        let mut corpus = self.corpus.write();
        let doc = corpus.remove_document(name)?;
        self.phrase_cache.lock().clear();
        tracing::info!(book = %doc.name, "removed book");
        Ok(())
    }

    pub fn list_book_names(&self) -> Vec<String> {
        self.query(|q| q.list_book_names())
    }

    pub fn list_books(&self) -> Vec<BookSummary> {
        self.query(|q| q.list_books())
    }

    pub fn get_book_content(&self, name: &str) -> Result<String> {
        self.query(|q| q.book_content(name))
    }

    pub fn count_chapters(&self, book: &str) -> Result<usize> {
        self.query(|q| q.count_chapters(book))
    }

    pub fn count_verses(&self, book: &str, chapter: u32) -> Result<usize> {
        self.query(|q| q.count_verses(book, chapter))
    }

    pub fn count_words(&self, book: &str, chapter: u32, verse: u32) -> Result<usize> {
        self.query(|q| q.count_words(book, chapter, verse))
    }

    // --- words ---

    pub fn filter_words(&self, filters: &WordFilters, page_index: usize, page_size: usize) -> Result<Page<String>> {
        self.query(|q| q.filter_words(filters, page_index, page_size))
    }

    pub fn get_word_appearances(
        &self,
        word: &str,
        filters: &AppearanceFilters,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<Appearance>> {
        self.query(|q| q.word_appearances(word, filters, page_index, page_size))
    }

    pub fn get_text_context(&self, book: &str, chapter: u32, verse: u32) -> Result<String> {
        self.query(|q| q.text_context(book, chapter, verse))
    }

    pub fn get_verse_window(&self, book: &str, chapter: u32, verse: u32, radius: u32) -> Result<String> {
        self.query(|q| q.verse_window(book, chapter, verse, radius))
    }

    // --- groups ---

    pub fn add_group(&self, name: &str) -> Result<()> {
        let mut corpus = self.corpus.write();
        let group = corpus.registry_mut().add_group(name)?;
        tracing::info!(group = %group.name, "added group");
        Ok(())
    }

    /// Returns false when the word was already in the group.
    pub fn add_word_to_group(&self, group: &str, word: &str) -> Result<bool> {
        self.corpus.write().registry_mut().add_word_to_group(group, word)
    }

    pub fn remove_group(&self, name: &str) -> Result<()> {
        let group = self.corpus.write().registry_mut().remove_group(name)?;
        tracing::info!(group = %group.name, "removed group");
        Ok(())
    }

    pub fn list_groups(&self) -> Vec<String> {
        self.query(|q| q.list_groups())
    }

    pub fn get_group_words(&self, group: &str) -> Result<Vec<String>> {
        self.query(|q| q.group_words(group))
    }

    pub fn get_group_appearances(&self, group: &str) -> Result<BTreeMap<String, Vec<Appearance>>> {
        self.query(|q| q.group_appearances(group))
    }

    // --- phrases ---

    pub fn add_phrase(&self, text: &str) -> Result<String> {
        let mut corpus = self.corpus.write();
        let phrase = corpus.registry_mut().add_phrase(text)?;
        tracing::info!(phrase = %phrase.text, "added phrase");
        Ok(phrase.text.clone())
    }

    pub fn remove_phrase(&self, text: &str) -> Result<()> {
        let mut corpus = self.corpus.write();
        let phrase = corpus.registry_mut().remove_phrase(text)?;
        self.phrase_cache.lock().remove(&phrase.text);
        Ok(())
    }

    pub fn list_phrases(&self) -> Vec<String> {
        self.query(|q| q.list_phrases())
    }

    /// Resolve a phrase to its references. Registered phrases are cached until the corpus changes;
    /// any other valid phrase text is resolved on the fly.
    pub fn get_phrase_references(&self, text: &str) -> Result<Arc<Vec<PhraseReference>>> {
        let corpus = self.corpus.read();
        let key = phrase_key(text);
        if let Some(hit) = self.phrase_cache.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }
        let engine = QueryEngine::new(&corpus);
        match corpus.registry().phrase(&key) {
            Some(phrase) => {
                let refs = Arc::new(engine.phrase_references(phrase));
                // still under the read lock, so no writer can have invalidated this in between
                self.phrase_cache.lock().insert(key, Arc::clone(&refs));
                Ok(refs)
            }
            None => Ok(Arc::new(engine.phrase_references(&parse_phrase(text)?))),
        }
    }

    // --- stats ---

    pub fn get_general_stats(&self) -> GeneralStats {
        self.query(|q| q.general_stats())
    }

    pub fn get_book_stats(&self, book: Option<&str>) -> Result<BookStats> {
        self.query(|q| q.book_stats(book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_rejects_duplicate_names() {
        let mut corpus = Corpus::new();
        let doc = parse("Genesis.1\n[1] light", "genesis", "torah").unwrap();
        corpus.add_document(doc.clone()).unwrap();
        assert!(matches!(corpus.add_document(doc), Err(ConcordError::DuplicateBook(_))));
        assert_eq!(corpus.num_documents(), 1);
        assert_eq!(corpus.next_book_id(), 1);
    }

    #[test]
    fn from_parts_rebuilds_index_and_ids() {
        let a = parse("Genesis.1\n[1] light", "genesis", "torah").unwrap();
        let b = parse("Ruth.1\n[1] light again", "ruth", "ketuvim").unwrap();
        let corpus = Corpus::from_parts(vec![(3, a), (9, b)], 4, Registry::new()).unwrap();
        assert_eq!(corpus.next_book_id(), 10);
        assert_eq!(corpus.index().postings("light").len(), 2);
        assert_eq!(corpus.book_id("Ruth").unwrap(), 9);
    }

    #[test]
    fn phrase_cache_invalidated_on_book_change() {
        let lib = Library::new();
        lib.add_phrase("let there be").unwrap();
        assert!(lib.get_phrase_references("let there be").unwrap().is_empty());
        lib.add_book("Genesis.1\n[1] And God said, Let there be light", "Genesis", "Torah").unwrap();
        let refs = lib.get_phrase_references("let there be").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].start_position_in_verse, 4);
        lib.remove_book("genesis").unwrap();
        assert!(lib.get_phrase_references("let there be").unwrap().is_empty());
    }
}
