use crate::error::{ConcordError, Result};
use crate::tokenizer::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_PHRASE_WORDS: usize = 3;

lazy_static! {
    static ref PHRASE_CHARS: Regex = Regex::new(r"(?u)^[\p{L}' ]+$").expect("valid regex");
}

/// Named set of normalized words. Words may outlive their last occurrence in the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub words: BTreeSet<String>,
}

/// A registered phrase, stored in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub text: String,
    pub words: Vec<String>,
}

/// User-curated groups and phrases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    groups: BTreeMap<String, Group>,
    phrases: BTreeMap<String, Phrase>,
}

pub fn normalize_group_name(name: &str) -> Result<String> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(ConcordError::Validation("group name must not be empty".into()));
    }
    Ok(name)
}

/// Whitespace-collapsed, lowercased phrase text.
pub fn phrase_key(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Validate and normalize phrase text: at least three words of letters and apostrophes.
pub fn parse_phrase(text: &str) -> Result<Phrase> {
    let invalid = |reason: &str| ConcordError::InvalidPhrase { phrase: text.to_string(), reason: reason.to_string() };
    let collapsed = phrase_key(text);
    if !PHRASE_CHARS.is_match(&collapsed) {
        return Err(invalid("only letters, apostrophes and spaces are allowed"));
    }
    let words: Vec<String> = collapsed.split(' ').map(str::to_string).collect();
    if words.len() < MIN_PHRASE_WORDS {
        return Err(invalid("a phrase needs at least three words"));
    }
    if words.iter().any(|w| normalize(w) != *w) {
        return Err(invalid("apostrophes must sit inside a word"));
    }
    Ok(Phrase { text: collapsed, words })
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&mut self, name: &str) -> Result<&Group> {
        let name = normalize_group_name(name)?;
        if self.groups.contains_key(&name) {
            return Err(ConcordError::DuplicateGroup(name));
        }
        let group = self.groups.entry(name.clone()).or_insert(Group { name, words: BTreeSet::new() });
        Ok(group)
    }

    /// Adds the normalized word; returns false when it was already present.
    pub fn add_word_to_group(&mut self, group: &str, word: &str) -> Result<bool> {
        let name = normalize_group_name(group)?;
        let word = normalize(word);
        if word.is_empty() {
            return Err(ConcordError::Validation("word must contain a letter or digit".into()));
        }
        let group = self
            .groups
            .get_mut(&name)
            .ok_or_else(|| ConcordError::not_found(format!("group '{name}'")))?;
        Ok(group.words.insert(word))
    }

    pub fn remove_group(&mut self, name: &str) -> Result<Group> {
        let name = normalize_group_name(name)?;
        self.groups.remove(&name).ok_or_else(|| ConcordError::not_found(format!("group '{name}'")))
    }

    pub fn group(&self, name: &str) -> Result<&Group> {
        let name = normalize_group_name(name)?;
        self.groups.get(&name).ok_or_else(|| ConcordError::not_found(format!("group '{name}'")))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn add_phrase(&mut self, text: &str) -> Result<&Phrase> {
        let phrase = parse_phrase(text)?;
        if self.phrases.contains_key(&phrase.text) {
            return Err(ConcordError::DuplicatePhrase(phrase.text));
        }
        let key = phrase.text.clone();
        Ok(self.phrases.entry(key).or_insert(phrase))
    }

    pub fn remove_phrase(&mut self, text: &str) -> Result<Phrase> {
        let key = phrase_key(text);
        self.phrases.remove(&key).ok_or_else(|| ConcordError::not_found(format!("phrase '{key}'")))
    }

    pub fn phrase(&self, text: &str) -> Option<&Phrase> {
        self.phrases.get(&phrase_key(text))
    }

    pub fn phrase_texts(&self) -> impl Iterator<Item = &String> {
        self.phrases.keys()
    }

    pub fn num_phrases(&self) -> usize {
        self.phrases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_validation() {
        assert!(matches!(parse_phrase("the"), Err(ConcordError::InvalidPhrase { .. })));
        assert!(matches!(parse_phrase("in the"), Err(ConcordError::InvalidPhrase { .. })));
        assert!(matches!(parse_phrase("in the 1st"), Err(ConcordError::InvalidPhrase { .. })));
        assert!(matches!(parse_phrase("in the beginning,"), Err(ConcordError::InvalidPhrase { .. })));
        assert!(matches!(parse_phrase("'in the beginning"), Err(ConcordError::InvalidPhrase { .. })));
        let p = parse_phrase("  In   the Lord's  house ").unwrap();
        assert_eq!(p.text, "in the lord's house");
        assert_eq!(p.words, vec!["in", "the", "lord's", "house"]);
    }

    #[test]
    fn duplicate_phrase_rejected() {
        let mut r = Registry::new();
        r.add_phrase("In the beginning").unwrap();
        assert!(matches!(r.add_phrase("in the  beginning"), Err(ConcordError::DuplicatePhrase(_))));
        assert_eq!(r.num_phrases(), 1);
        r.remove_phrase("IN THE BEGINNING").unwrap();
        assert!(matches!(r.remove_phrase("in the beginning"), Err(ConcordError::NotFound(_))));
    }

    #[test]
    fn group_words_have_set_semantics() {
        let mut r = Registry::new();
        r.add_group("Divine-Names").unwrap();
        assert!(matches!(r.add_group("divine-names"), Err(ConcordError::DuplicateGroup(_))));
        assert!(r.add_word_to_group("divine-names", "God,").unwrap());
        assert!(!r.add_word_to_group("divine-names", "god").unwrap());
        assert!(matches!(r.add_word_to_group("missing", "god"), Err(ConcordError::NotFound(_))));
        let words: Vec<&String> = r.group("divine-names").unwrap().words.iter().collect();
        assert_eq!(words, vec!["god"]);
    }
}
