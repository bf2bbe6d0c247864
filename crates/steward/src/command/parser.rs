/// Filler words dropped when computing the residual arguments handed to a
/// capability. Matching itself runs over the full token list; only the
/// residual is filtered.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "in", "on", "at", "of", "to", "for", "from", "by", "with", "is", "are",
    "was", "were", "be", "been", "am", "do", "does", "did", "can", "could", "would", "should",
    "will", "shall", "may", "might", "must", "it", "its", "it's", "this", "that", "these",
    "those", "i", "you", "he", "she", "we", "they", "me", "my", "your", "our", "please", "hey",
    "ok", "okay", "what", "whats", "what's", "when", "where", "which", "who", "how", "why",
    "tell", "give", "about", "some", "any", "and", "also",
];

/// A normalized phrase: original-cased tokens with surrounding punctuation
/// stripped, plus their lowercase forms for matching.
#[derive(Debug, Clone)]
pub struct ParsedPhrase {
    pub raw_text: String,
    pub tokens: Vec<String>,
    pub lowercase: Vec<String>,
}

impl ParsedPhrase {
    /// Lowercased text with collapsed whitespace, used for phrase-keyword
    /// substring matching.
    pub fn normalized_text(&self) -> String {
        self.lowercase.join(" ")
    }
}

/// Tokenize a raw phrase. Keeps the original casing (so residual arguments
/// like place names survive intact) and trims punctuation from token edges,
/// preserving interior apostrophes and hyphens.
pub fn parse(input: &str) -> ParsedPhrase {
    let tokens: Vec<String> = input
        .split_whitespace()
        .map(trim_token)
        .filter(|t| !t.is_empty())
        .collect();
    let lowercase = tokens.iter().map(|t| t.to_lowercase()).collect();
    ParsedPhrase {
        raw_text: input.to_string(),
        tokens,
        lowercase,
    }
}

pub fn is_stopword(token_lower: &str) -> bool {
    STOPWORDS.contains(&token_lower)
}

/// Split a compound phrase into sequential commands at " and "/" also ",
/// returning `None` when there is nothing to split.
pub fn split_compound(text: &str) -> Option<Vec<String>> {
    if !text.contains(" and ") && !text.contains(" also ") {
        return None;
    }
    let parts: Vec<String> = text
        .replace(" also ", " and ")
        .split(" and ")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() > 1 {
        Some(parts)
    } else {
        None
    }
}

fn trim_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_original_casing() {
        let parsed = parse("what's the weather in Paris");
        assert_eq!(parsed.tokens, vec!["what's", "the", "weather", "in", "Paris"]);
        assert_eq!(
            parsed.lowercase,
            vec!["what's", "the", "weather", "in", "paris"]
        );
    }

    #[test]
    fn trims_edge_punctuation() {
        let parsed = parse("weather, please!");
        assert_eq!(parsed.tokens, vec!["weather", "please"]);
    }

    #[test]
    fn preserves_interior_apostrophes() {
        let parsed = parse("what's up");
        assert_eq!(parsed.tokens[0], "what's");
    }

    #[test]
    fn empty_input() {
        let parsed = parse("   ");
        assert!(parsed.tokens.is_empty());
        assert_eq!(parsed.normalized_text(), "");
    }

    #[test]
    fn stopwords_are_lowercase_lookups() {
        assert!(is_stopword("the"));
        assert!(is_stopword("what's"));
        assert!(!is_stopword("weather"));
    }

    #[test]
    fn splits_on_and() {
        let parts = split_compound("turn on the lights and what's the weather").expect("split");
        assert_eq!(parts, vec!["turn on the lights", "what's the weather"]);
    }

    #[test]
    fn splits_on_also() {
        let parts = split_compound("weather also time").expect("split");
        assert_eq!(parts, vec!["weather", "time"]);
    }

    #[test]
    fn no_split_without_connector() {
        assert!(split_compound("weather in Paris").is_none());
        // "android" contains "and" but not as a standalone connector
        assert!(split_compound("open android studio").is_none());
    }
}
