//! Read-side operations over a [`Corpus`]: word listings, appearances, phrase lookup, context and
//! statistics. Every listing is deterministic: words alphabetically, appearances in document order
//! (book insertion order, then chapter, verse, position).

use crate::document::{BookId, Division, Document, Verse};
use crate::error::{ConcordError, Result};
use crate::index::Posting;
use crate::registry::Phrase;
use crate::store::Corpus;
use crate::tokenizer::{fold, normalize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Optional constraints for [`QueryEngine::filter_words`].
///
/// Address fields are independent: `verse` without `chapter` matches that verse number in any
/// chapter, `chapter` without `book` matches that chapter in any book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordFilters {
    pub book: Option<String>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    pub index_in_verse: Option<u32>,
    pub word_starts_with: Option<String>,
    pub group_name: Option<String>,
}

/// Optional address constraints for [`QueryEngine::word_appearances`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearanceFilters {
    pub book: Option<String>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    pub index_in_verse: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Occurrence address with the book resolved to its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub position_in_verse: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseReference {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub start_position_in_verse: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub name: String,
    pub division: Division,
    pub insert_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub total_books: usize,
    pub total_groups: usize,
    pub total_phrases: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub num_chapters: usize,
    pub num_verses: usize,
    pub num_words: usize,
    pub num_unique_words: usize,
    pub num_letters: usize,
    pub avg_verses_per_chapter: f64,
    pub avg_words_per_verse: f64,
    pub avg_letters_per_verse: f64,
}

/// Slice `[page_index * page_size, page_index * page_size + page_size)` out of the full result.
pub fn paginate<T>(items: Vec<T>, page_index: usize, page_size: usize) -> Result<Page<T>> {
    if page_size == 0 {
        return Err(ConcordError::Validation("pageSize must be greater than zero".into()));
    }
    let total = items.len();
    let start = page_index.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    let items = items.into_iter().skip(start).take(end - start).collect();
    Ok(Page { items, total })
}

#[derive(Debug, Clone, Copy, Default)]
struct AddressFilter {
    book: Option<BookId>,
    chapter: Option<u32>,
    verse: Option<u32>,
    position: Option<u32>,
}

impl AddressFilter {
    fn is_empty(&self) -> bool {
        self.book.is_none() && self.chapter.is_none() && self.verse.is_none() && self.position.is_none()
    }

    fn matches(&self, p: &Posting) -> bool {
        self.book.map_or(true, |b| b == p.book)
            && self.chapter.map_or(true, |c| c == p.chapter)
            && self.verse.map_or(true, |v| v == p.verse)
            && self.position.map_or(true, |i| i == p.position)
    }
}

pub struct QueryEngine<'a> {
    corpus: &'a Corpus,
}

impl<'a> QueryEngine<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    pub fn list_book_names(&self) -> Vec<String> {
        self.corpus.documents().map(|(_, d)| d.name.clone()).collect()
    }

    pub fn list_books(&self) -> Vec<BookSummary> {
        self.corpus
            .documents()
            .map(|(_, d)| BookSummary { name: d.name.clone(), division: d.division, insert_time: d.insert_time.clone() })
            .collect()
    }

    pub fn book_content(&self, name: &str) -> Result<String> {
        Ok(self.corpus.document(name)?.to_text())
    }

    pub fn count_chapters(&self, book: &str) -> Result<usize> {
        Ok(self.corpus.document(book)?.chapters.len())
    }

    pub fn count_verses(&self, book: &str, chapter: u32) -> Result<usize> {
        let doc = self.corpus.document(book)?;
        let chapter = doc
            .chapter(chapter)
            .ok_or_else(|| ConcordError::not_found(format!("chapter {chapter} of book '{}'", doc.name)))?;
        Ok(chapter.verses.len())
    }

    pub fn count_words(&self, book: &str, chapter: u32, verse: u32) -> Result<usize> {
        Ok(self.verse(book, chapter, verse)?.words.len())
    }

    pub fn filter_words(&self, filters: &WordFilters, page_index: usize, page_size: usize) -> Result<Page<String>> {
        let address = self.address_filter(filters.book.as_deref(), filters.chapter, filters.verse, filters.index_in_verse)?;
        let prefix = filters
            .word_starts_with
            .as_deref()
            .map(|p| fold(p.trim()))
            .filter(|p| !p.is_empty());
        let index = self.corpus.index();

        let qualifies = |postings: &[Posting]| address.is_empty() || postings.iter().any(|p| address.matches(p));

        let words: Vec<String> = match filters.group_name.as_deref() {
            Some(group) => {
                let group = self.corpus.registry().group(group)?;
                group
                    .words
                    .iter()
                    .filter(|w| prefix.as_deref().map_or(true, |p| w.starts_with(p)))
                    .filter(|w| {
                        let postings = index.postings(w);
                        !postings.is_empty() && qualifies(postings)
                    })
                    .cloned()
                    .collect()
            }
            None => match prefix.as_deref() {
                Some(p) => index
                    .terms_with_prefix(p)
                    .filter(|(_, postings)| qualifies(postings.as_slice()))
                    .map(|(t, _)| t.clone())
                    .collect(),
                None => index.terms().filter(|(_, postings)| qualifies(postings.as_slice())).map(|(t, _)| t.clone()).collect(),
            },
        };
        paginate(words, page_index, page_size)
    }

    pub fn word_appearances(
        &self,
        word: &str,
        filters: &AppearanceFilters,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<Appearance>> {
        let address = self.address_filter(filters.book.as_deref(), filters.chapter, filters.verse, filters.index_in_verse)?;
        let word = normalize(word);
        let appearances: Vec<Appearance> = self
            .corpus
            .index()
            .postings(&word)
            .iter()
            .filter(|p| address.matches(p))
            .filter_map(|p| self.appearance(p))
            .collect();
        paginate(appearances, page_index, page_size)
    }

    pub fn text_context(&self, book: &str, chapter: u32, verse: u32) -> Result<String> {
        Ok(self.verse(book, chapter, verse)?.text.clone())
    }

    /// Verses `verse - radius ..= verse + radius` clamped to the chapter, one `[n] text` line each.
    pub fn verse_window(&self, book: &str, chapter: u32, verse: u32, radius: u32) -> Result<String> {
        self.verse(book, chapter, verse)?;
        let doc = self.corpus.document(book)?;
        let lines: Vec<String> = doc
            .chapter(chapter)
            .map(|c| c.verses.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|v| v.number.saturating_add(radius) >= verse && v.number <= verse.saturating_add(radius))
            .map(|v| format!("[{}] {}", v.number, v.text))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Every place the phrase's words appear contiguously within a single verse.
    pub fn phrase_references(&self, phrase: &Phrase) -> Vec<PhraseReference> {
        let Some((first, rest)) = phrase.words.split_first() else {
            return Vec::new();
        };
        let refs: Vec<PhraseReference> = self
            .corpus
            .index()
            .postings(first)
            .iter()
            .filter(|p| {
                let Some(verse) = self.corpus.document_by_id(p.book).and_then(|d| d.verse(p.chapter, p.verse)) else {
                    return false;
                };
                rest.iter()
                    .zip(p.position + 1..)
                    .all(|(word, pos)| verse.word_at(pos).is_some_and(|w| w.normalized == *word))
            })
            .filter_map(|p| {
                let doc = self.corpus.document_by_id(p.book)?;
                Some(PhraseReference {
                    book: doc.name.clone(),
                    chapter: p.chapter,
                    verse: p.verse,
                    start_position_in_verse: p.position,
                })
            })
            .collect();
        tracing::debug!(phrase = %phrase.text, references = refs.len(), "resolved phrase");
        refs
    }

    /// Appearances of every group word still present in the corpus.
    pub fn group_appearances(&self, group: &str) -> Result<BTreeMap<String, Vec<Appearance>>> {
        let group = self.corpus.registry().group(group)?;
        let index = self.corpus.index();
        Ok(group
            .words
            .iter()
            .filter(|w| index.contains(w))
            .map(|w| (w.clone(), index.postings(w).iter().filter_map(|p| self.appearance(p)).collect()))
            .collect())
    }

    pub fn group_words(&self, group: &str) -> Result<Vec<String>> {
        Ok(self.corpus.registry().group(group)?.words.iter().cloned().collect())
    }

    pub fn list_groups(&self) -> Vec<String> {
        self.corpus.registry().group_names().cloned().collect()
    }

    pub fn list_phrases(&self) -> Vec<String> {
        self.corpus.registry().phrase_texts().cloned().collect()
    }

    pub fn general_stats(&self) -> GeneralStats {
        let registry = self.corpus.registry();
        GeneralStats {
            total_books: self.corpus.num_documents(),
            total_groups: registry.num_groups(),
            total_phrases: registry.num_phrases(),
        }
    }

    /// Statistics for one book, or for the whole corpus when `book` is `None`.
    /// Corpus-wide averages are computed over the summed counts.
    pub fn book_stats(&self, book: Option<&str>) -> Result<BookStats> {
        let docs: Vec<&Document> = match book {
            Some(name) => vec![self.corpus.document(name)?],
            None => self.corpus.documents().map(|(_, d)| d).collect(),
        };
        let mut unique: HashSet<&str> = HashSet::new();
        let (mut chapters, mut verses, mut words, mut letters) = (0usize, 0usize, 0usize, 0usize);
        for doc in &docs {
            chapters += doc.chapters.len();
            verses += doc.num_verses();
            for (_, _, w) in doc.occurrences() {
                words += 1;
                letters += w.normalized.chars().filter(|c| c.is_alphabetic()).count();
                unique.insert(w.normalized.as_str());
            }
        }
        Ok(BookStats {
            num_chapters: chapters,
            num_verses: verses,
            num_words: words,
            num_unique_words: unique.len(),
            num_letters: letters,
            avg_verses_per_chapter: ratio(verses, chapters),
            avg_words_per_verse: ratio(words, verses),
            avg_letters_per_verse: ratio(letters, verses),
        })
    }

    fn verse(&self, book: &str, chapter: u32, verse: u32) -> Result<&'a Verse> {
        let doc = self.corpus.document(book)?;
        doc.verse(chapter, verse).ok_or_else(|| {
            ConcordError::not_found(format!("verse {chapter}:{verse} of book '{}'", doc.name))
        })
    }

    fn appearance(&self, p: &Posting) -> Option<Appearance> {
        let doc = self.corpus.document_by_id(p.book)?;
        Some(Appearance { book: doc.name.clone(), chapter: p.chapter, verse: p.verse, position_in_verse: p.position })
    }

    fn address_filter(
        &self,
        book: Option<&str>,
        chapter: Option<u32>,
        verse: Option<u32>,
        position: Option<u32>,
    ) -> Result<AddressFilter> {
        let book = match book.map(str::trim).filter(|b| !b.is_empty()) {
            Some(name) => Some(self.corpus.book_id(name)?),
            None => None,
        };
        Ok(AddressFilter { book, chapter, verse, position })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_slices_and_counts() {
        let page = paginate((1..=7).collect::<Vec<i32>>(), 1, 3).unwrap();
        assert_eq!(page, Page { items: vec![4, 5, 6], total: 7 });
        let last = paginate((1..=7).collect::<Vec<i32>>(), 2, 3).unwrap();
        assert_eq!(last.items, vec![7]);
        let past = paginate((1..=7).collect::<Vec<i32>>(), 9, 3).unwrap();
        assert!(past.items.is_empty());
        assert_eq!(past.total, 7);
        assert!(matches!(paginate(vec![1], 0, 0), Err(ConcordError::Validation(_))));
    }

    #[test]
    fn pages_concatenate_to_full_result() {
        let full: Vec<u32> = (0..23).collect();
        let size = 5;
        let pages = (full.len() + size - 1) / size;
        let joined: Vec<u32> =
            (0..pages).flat_map(|i| paginate(full.clone(), i, size).unwrap().items).collect();
        assert_eq!(joined, full);
    }

    #[test]
    fn filters_deserialize_from_camel_case() {
        let f: WordFilters =
            serde_json::from_str(r#"{"book":"genesis","indexInVerse":4,"wordStartsWith":"Go","groupName":null}"#).unwrap();
        assert_eq!(f.book.as_deref(), Some("genesis"));
        assert_eq!(f.index_in_verse, Some(4));
        assert_eq!(f.word_starts_with.as_deref(), Some("Go"));
        assert!(f.group_name.is_none() && f.chapter.is_none());
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(3, 2), 1.5);
    }
}
