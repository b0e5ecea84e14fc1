use crate::error::ConcordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type BookId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Division {
    Torah,
    Neviim,
    Ketuvim,
}

impl Division {
    pub fn as_str(self) -> &'static str {
        match self {
            Division::Torah => "torah",
            Division::Neviim => "neviim",
            Division::Ketuvim => "ketuvim",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "torah" => Ok(Division::Torah),
            "neviim" => Ok(Division::Neviim),
            "ketuvim" => Ok(Division::Ketuvim),
            _ => Err(ConcordError::InvalidDivision(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordOccurrence {
    /// Token as written in the verse.
    pub surface: String,
    /// Lowercased, edge-punctuation-stripped form used for indexing.
    pub normalized: String,
    /// 1-based position among the verse's kept tokens.
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub number: u32,
    pub text: String,
    pub words: Vec<WordOccurrence>,
}

impl Verse {
    pub fn word_at(&self, position: u32) -> Option<&WordOccurrence> {
        // positions are dense and 1-based
        position.checked_sub(1).and_then(|i| self.words.get(i as usize))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    pub verses: Vec<Verse>,
}

impl Chapter {
    pub fn verse(&self, number: u32) -> Option<&Verse> {
        number.checked_sub(1).and_then(|i| self.verses.get(i as usize))
    }
}

/// One parsed book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub division: Division,
    /// RFC 3339 timestamp, stamped when the book enters a library.
    pub insert_time: String,
    pub chapters: Vec<Chapter>,
}

impl Document {
    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        number.checked_sub(1).and_then(|i| self.chapters.get(i as usize))
    }

    pub fn verse(&self, chapter: u32, verse: u32) -> Option<&Verse> {
        self.chapter(chapter).and_then(|c| c.verse(verse))
    }

    /// Every word in document order, paired with its (chapter, verse).
    pub fn occurrences(&self) -> impl Iterator<Item = (u32, u32, &WordOccurrence)> + '_ {
        self.chapters.iter().flat_map(|c| {
            c.verses
                .iter()
                .flat_map(move |v| v.words.iter().map(move |w| (c.number, v.number, w)))
        })
    }

    pub fn num_verses(&self) -> usize {
        self.chapters.iter().map(|c| c.verses.len()).sum()
    }

    pub fn num_words(&self) -> usize {
        self.chapters.iter().flat_map(|c| c.verses.iter()).map(|v| v.words.len()).sum()
    }

    /// Rebuild the book in its source format: a `name.N` marker per chapter, `[n] text` per verse.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for chapter in &self.chapters {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("{}.{}\n", self.name, chapter.number));
            for verse in &chapter.verses {
                out.push_str(&format!("[{}] {}\n", verse.number, verse.text));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_parses_case_insensitively() {
        assert_eq!("Torah".parse::<Division>().unwrap(), Division::Torah);
        assert_eq!(" KETUVIM ".parse::<Division>().unwrap(), Division::Ketuvim);
        assert!(matches!("gospels".parse::<Division>(), Err(ConcordError::InvalidDivision(_))));
    }
}
