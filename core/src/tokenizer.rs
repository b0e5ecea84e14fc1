use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref EDGES: Regex = Regex::new(r"(?u)^[^\p{L}\p{N}]+|[^\p{L}\p{N}]+$").expect("valid regex");
}

/// Canonical form of a single token: NFKC, lowercase, punctuation trimmed from both ends.
/// Internal apostrophes survive so contractions stay one word.
pub fn normalize(token: &str) -> String {
    EDGES.replace_all(&fold(token), "").into_owned()
}

/// NFKC, typographic apostrophe folded to ASCII, lowercase. Unlike `normalize` nothing is trimmed,
/// so the result can be compared against index terms as a prefix.
pub fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().replace('\u{2019}', "'").to_lowercase()
}

/// Tokenize a verse into (surface, normalized, position) with 1-based positions.
/// Tokens that normalize to nothing (stray punctuation) are dropped and do not consume a position.
pub fn tokenize(text: &str) -> Vec<(String, String, u32)> {
    let mut tokens = Vec::new();
    let mut pos = 0u32;
    for surface in text.split_whitespace() {
        let normalized = normalize(surface);
        if normalized.is_empty() {
            continue;
        }
        pos += 1;
        tokens.push((surface.to_string(), normalized, pos));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_keeps_edges() {
        assert_eq!(fold("Pharaoh\u{2019}"), "pharaoh'");
        assert_eq!(fold("\u{FF27}od"), "god");
    }

    #[test]
    fn basic_tokenize() {
        let t = tokenize("In the beginning, God created");
        let words: Vec<&str> = t.iter().map(|(_, n, _)| n.as_str()).collect();
        assert_eq!(words, vec!["in", "the", "beginning", "god", "created"]);
        assert_eq!(t[2].0, "beginning,");
        assert_eq!(t[4].2, 5);
    }

    #[test]
    fn keeps_internal_apostrophes() {
        assert_eq!(normalize("Lord's,"), "lord's");
        assert_eq!(normalize("'tis"), "tis");
        assert_eq!(normalize("\"Behold!\""), "behold");
        assert_eq!(normalize("Pharaoh\u{2019}s"), "pharaoh's");
    }

    #[test]
    fn punctuation_only_tokens_are_dropped() {
        let t = tokenize("light \u{2014} and ; darkness");
        let positions: Vec<(String, u32)> = t.into_iter().map(|(_, n, p)| (n, p)).collect();
        assert_eq!(positions, vec![("light".into(), 1), ("and".into(), 2), ("darkness".into(), 3)]);
    }
}
