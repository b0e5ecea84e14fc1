pub mod document;
pub mod error;
pub mod index;
pub mod parser;
pub mod persist;
pub mod query;
pub mod registry;
pub mod store;
pub mod tokenizer;

pub use document::{BookId, Chapter, Division, Document, Verse, WordOccurrence};
pub use error::{ConcordError, ErrorKind, Result};
pub use index::{InvertedIndex, Posting};
pub use query::{
    Appearance, AppearanceFilters, BookStats, BookSummary, GeneralStats, Page, PhraseReference, QueryEngine, WordFilters,
};
pub use registry::{Group, Phrase, Registry};
pub use store::{Corpus, Library, DEFAULT_CONTEXT_RADIUS};
