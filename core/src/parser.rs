//! Book text parser.
//!
//! Source files follow the numbered-verse-per-line convention:
//!
//! ```text
//! Genesis.1
//! [1] In the beginning God created the heaven and the earth.
//! [2] And the earth was without form, and void;
//!
//! Genesis.2
//! [1] Thus the heavens and the earth were finished,
//! ```
//!
//! Chapter markers are `<label>.<number>`, verses are `[<number>] <text>`. Numbering must be
//! sequential from 1 so every (chapter, verse, position) address is unambiguous.

use crate::document::{Chapter, Division, Document, Verse, WordOccurrence};
use crate::error::{ConcordError, Result};
use crate::tokenizer::tokenize;
use lazy_static::lazy_static;
use regex::Regex;
use time::format_description::well_known::Rfc3339;

lazy_static! {
    static ref VERSE: Regex = Regex::new(r"^\[(?P<num>[^\]]*)\]\s*(?P<text>.*)$").expect("valid regex");
    static ref CHAPTER: Regex = Regex::new(r"^(?P<label>[^\[].*?)\.(?P<num>[^.\s]*)$").expect("valid regex");
}

/// Parse a whole book. The division is validated, the name trimmed and lowercased.
pub fn parse(raw_text: &str, book_name: &str, division: &str) -> Result<Document> {
    let name = normalize_book_name(book_name)?;
    let division: Division = division.parse()?;
    let chapters = parse_chapters(raw_text)?;
    let insert_time = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Ok(Document { name, division, insert_time, chapters })
}

pub fn normalize_book_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(ConcordError::Validation("book name must not be empty".into()));
    }
    Ok(name)
}

/// Parse only the chapter/verse structure. Pure: identical input yields identical output.
pub fn parse_chapters(raw_text: &str) -> Result<Vec<Chapter>> {
    if raw_text.trim().is_empty() {
        return Err(ConcordError::Validation("book text must not be empty".into()));
    }

    let mut chapters: Vec<Chapter> = Vec::new();
    // line number and text of the most recent chapter marker
    let mut marker: Option<(usize, String)> = None;
    for (idx, raw_line) in raw_text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            continue;
        }
        let fail = |reason: String| ConcordError::Parse { line: line_no, content: line.to_string(), reason };

        if let Some(caps) = VERSE.captures(line) {
            let num = parse_marker(&caps["num"]).ok_or_else(|| fail("verse number is not a positive integer".into()))?;
            let chapter = chapters
                .last_mut()
                .ok_or_else(|| fail("verse appears before the first chapter marker".into()))?;
            let expected = chapter.verses.len() as u32 + 1;
            if num != expected {
                return Err(fail(format!("expected verse {expected} of chapter {}, found {num}", chapter.number)));
            }
            let text = caps["text"].trim().to_string();
            let words: Vec<WordOccurrence> = tokenize(&text)
                .into_iter()
                .map(|(surface, normalized, position)| WordOccurrence { surface, normalized, position })
                .collect();
            if words.is_empty() {
                return Err(fail("verse has no words".into()));
            }
            chapter.verses.push(Verse { number: num, text, words });
        } else if let Some(caps) = CHAPTER.captures(line) {
            let num = parse_marker(&caps["num"]).ok_or_else(|| fail("chapter number is not a positive integer".into()))?;
            if let (Some(prev), Some(at)) = (chapters.last(), marker.take()) {
                ensure_has_verses(prev, at)?;
            }
            let expected = chapters.len() as u32 + 1;
            if num != expected {
                return Err(fail(format!("expected chapter {expected}, found {num}")));
            }
            chapters.push(Chapter { number: num, verses: Vec::new() });
            marker = Some((line_no, line.to_string()));
        } else {
            return Err(fail("line is neither a chapter marker nor a verse".into()));
        }
    }

    match (chapters.last(), marker) {
        (Some(last), Some(at)) => ensure_has_verses(last, at)?,
        _ => return Err(ConcordError::Validation("book text contains no chapters".into())),
    }
    Ok(chapters)
}

/// An empty chapter is reported at its own marker line.
fn ensure_has_verses(chapter: &Chapter, (line, content): (usize, String)) -> Result<()> {
    if chapter.verses.is_empty() {
        return Err(ConcordError::Parse { line, content, reason: format!("chapter {} has no verses", chapter.number) });
    }
    Ok(())
}

fn parse_marker(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CHAPTERS: &str = "Genesis.1\n[1] In the beginning God created the heaven and the earth.\n[2] And the earth was without form, and void;\n\nGenesis.2\n[1] Thus the heavens and the earth were finished.\n";

    #[test]
    fn parses_structure_and_positions() {
        let doc = parse(TWO_CHAPTERS, "Genesis", "Torah").unwrap();
        assert_eq!(doc.name, "genesis");
        assert_eq!(doc.division, Division::Torah);
        assert_eq!(doc.chapters.len(), 2);
        assert_eq!(doc.chapters[0].verses.len(), 2);
        let v = doc.verse(1, 1).unwrap();
        assert_eq!(v.words[3].normalized, "god");
        assert_eq!(v.words[3].position, 4);
        assert_eq!(v.words.last().unwrap().surface, "earth.");
        assert!(!doc.insert_time.is_empty());
    }

    #[test]
    fn reparsing_is_idempotent() {
        assert_eq!(parse_chapters(TWO_CHAPTERS).unwrap(), parse_chapters(TWO_CHAPTERS).unwrap());
    }

    #[test]
    fn reconstructed_text_parses_to_same_structure() {
        let doc = parse(TWO_CHAPTERS, "genesis", "torah").unwrap();
        assert_eq!(parse_chapters(&doc.to_text()).unwrap(), doc.chapters);
    }

    #[test]
    fn rejects_non_numeric_markers() {
        let err = parse_chapters("Genesis.one\n[1] In the beginning").unwrap_err();
        assert!(matches!(err, ConcordError::Parse { line: 1, .. }));

        let err = parse_chapters("Genesis.1\n[x] In the beginning").unwrap_err();
        match err {
            ConcordError::Parse { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "[x] In the beginning");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_order_numbering() {
        assert!(matches!(parse_chapters("Genesis.2\n[1] a b"), Err(ConcordError::Parse { .. })));
        assert!(matches!(parse_chapters("Genesis.1\n[1] a\n[3] b"), Err(ConcordError::Parse { line: 3, .. })));
    }

    #[test]
    fn empty_chapter_is_reported_at_its_marker() {
        assert!(matches!(parse_chapters("Genesis.1\nGenesis.2\n[1] a"), Err(ConcordError::Parse { line: 1, .. })));

        let err = parse_chapters("Genesis.1\n[1] a\nGenesis.2\n\n\n").unwrap_err();
        match err {
            ConcordError::Parse { line, content, .. } => {
                assert_eq!(line, 3);
                assert_eq!(content, "Genesis.2");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_stray_lines_and_empty_input() {
        assert!(matches!(parse_chapters("[1] orphan verse"), Err(ConcordError::Parse { line: 1, .. })));
        assert!(matches!(parse_chapters("Genesis.1\nno marker here"), Err(ConcordError::Parse { line: 2, .. })));
        assert!(matches!(parse_chapters("Genesis.1\n[1] ;;"), Err(ConcordError::Parse { line: 2, .. })));
        assert!(matches!(parse_chapters("  \n "), Err(ConcordError::Validation(_))));
    }

    #[test]
    fn rejects_bad_division_and_name() {
        assert!(matches!(parse(TWO_CHAPTERS, "genesis", "apocrypha"), Err(ConcordError::InvalidDivision(_))));
        assert!(matches!(parse(TWO_CHAPTERS, "  ", "torah"), Err(ConcordError::Validation(_))));
    }

    #[test]
    fn labels_may_contain_spaces_and_dots() {
        let chapters = parse_chapters("1 Samuel.1\n[1] Now there was a certain man\nSt. John.2\n[1] And the third day").unwrap();
        assert_eq!(chapters.len(), 2);
    }
}
