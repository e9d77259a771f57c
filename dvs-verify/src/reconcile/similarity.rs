//! Similarity primitives for names, addresses and phone numbers

use std::collections::HashSet;

/// Honorifics ignored at the start of a name
const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "miss", "prof"];

/// Credentials and suffixes ignored after a comma or at the end of a name
const CREDENTIALS: &[&str] = &[
    "md", "do", "phd", "dds", "dmd", "np", "pa", "rn", "dpm", "od", "facc", "facp", "facs", "jr",
    "sr", "ii", "iii",
];

/// Street suffix abbreviations expanded before comparing addresses
const ADDRESS_SUFFIXES: &[(&str, &str)] = &[
    ("st", "street"),
    ("ave", "avenue"),
    ("av", "avenue"),
    ("rd", "road"),
    ("blvd", "boulevard"),
    ("dr", "drive"),
    ("ln", "lane"),
    ("ct", "court"),
    ("pl", "place"),
    ("pkwy", "parkway"),
    ("hwy", "highway"),
    ("sq", "square"),
    ("ste", "suite"),
    ("fl", "floor"),
    ("n", "north"),
    ("s", "south"),
    ("e", "east"),
    ("w", "west"),
];

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Case-folded whitespace-token Jaccard similarity in `[0.0, 1.0]`
///
/// Returns 0.0 when either side has no tokens.
pub fn token_similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

fn clean_name_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '\'')
        .collect::<String>()
        .to_lowercase()
}

fn is_credential(token: &str) -> bool {
    CREDENTIALS.contains(&token)
}

/// Name tokens with honorifics, credentials and initials removed
///
/// Credentials only go when they follow a comma or trail a name that keeps
/// two other tokens, so surnames such as "Do" survive.
fn name_tokens(name: &str) -> HashSet<String> {
    let mut tokens: Vec<String> = Vec::new();
    for (i, segment) in name.split(',').enumerate() {
        let segment: Vec<String> = segment
            .split_whitespace()
            .map(clean_name_token)
            .filter(|t| !t.is_empty())
            .collect();
        if i > 0 && segment.iter().all(|t| is_credential(t)) {
            continue;
        }
        tokens.extend(segment);
    }

    let leading = tokens
        .iter()
        .take_while(|t| HONORIFICS.contains(&t.as_str()))
        .count();
    tokens.drain(..leading);

    while tokens.len() > 2 && tokens.last().is_some_and(|t| is_credential(t)) {
        tokens.pop();
    }

    tokens
        .into_iter()
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// Name similarity ignoring punctuation, honorifics, credentials and initials
///
/// `"Dr. John A. Smith, MD"` and `"JOHN SMITH"` compare as 1.0. Falls back
/// to [`token_similarity`] when normalization leaves either side empty.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let (left, right) = (name_tokens(a), name_tokens(b));
    if left.is_empty() || right.is_empty() {
        return token_similarity(a, b);
    }
    jaccard(&left, &right)
}

fn address_tokens(address: &str) -> HashSet<String> {
    address
        .replace([',', '.'], " ")
        .split_whitespace()
        .map(|t| {
            let lower = t.to_lowercase();
            ADDRESS_SUFFIXES
                .iter()
                .find(|(abbr, _)| *abbr == lower)
                .map(|(_, full)| full.to_string())
                .unwrap_or(lower)
        })
        .collect()
}

/// Address similarity with commas stripped and street suffixes expanded
pub fn address_similarity(a: &str, b: &str) -> f64 {
    let (left, right) = (address_tokens(a), address_tokens(b));
    if left.is_empty() || right.is_empty() {
        return token_similarity(&a.replace(',', " "), &b.replace(',', " "));
    }
    jaccard(&left, &right)
}

/// Keep only the ASCII digits of a phone number
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digit-string equality after normalization
pub fn phones_equal(a: &str, b: &str) -> bool {
    normalize_phone(a) == normalize_phone(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_similarity_identity_and_empty() {
        for text in ["John Smith", "a", "100 Main Street Springfield"] {
            assert_eq!(token_similarity(text, text), 1.0);
            assert_eq!(token_similarity(text, ""), 0.0);
            assert_eq!(token_similarity("", text), 0.0);
        }
        assert_eq!(token_similarity("   ", "   "), 0.0);
    }

    #[test]
    fn test_token_similarity_is_case_insensitive_jaccard() {
        assert_eq!(token_similarity("JOHN smith", "john SMITH"), 1.0);
        // {john, smith} vs {john, doe}: 1 / 3
        let score = token_similarity("John Smith", "John Doe");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_name_similarity_ignores_initials_and_titles() {
        assert_eq!(name_similarity("John A. Smith", "John Smith"), 1.0);
        assert_eq!(name_similarity("Dr. Jane Doe, MD", "JANE DOE"), 1.0);
        assert!(name_similarity("Jane Doe", "John Smith") < 0.8);
    }

    #[test]
    fn test_name_similarity_keeps_credential_like_surnames() {
        assert_eq!(name_similarity("Anh Do", "ANH DO"), 1.0);
        // {anh, do} vs {anh, le}: 1 / 3
        let score = name_similarity("Anh Do", "Anh Le");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);

        assert_eq!(name_similarity("Anh Do MD", "Anh Do"), 1.0);
        assert_eq!(name_similarity("Ms. Kim Pa, DO, FACP", "KIM PA"), 1.0);
        assert_eq!(name_similarity("Smith, John", "John Smith"), 1.0);
    }

    #[test]
    fn test_name_similarity_falls_back_to_raw_tokens() {
        // Only initials on one side
        assert_eq!(name_similarity("J. S.", "J. S."), 1.0);
    }

    #[test]
    fn test_address_similarity_examples() {
        let observed = "100 Main Street, Springfield, IL 62701";

        let close = address_similarity("100 Main St, Springfield, IL", observed);
        assert!((close - 5.0 / 6.0).abs() < 1e-9);
        assert!(close >= 0.6);

        let far = address_similarity("1 Elm St, Boston, MA", observed);
        assert!(far < 0.6);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(212) 555-0199"), "2125550199");
        assert_eq!(normalize_phone("212.555.0199"), "2125550199");
        assert_eq!(normalize_phone(""), "");
        assert!(phones_equal("+1 (212) 555-0199", "1-212-555-0199"));
        assert!(!phones_equal("212-555-0199", "1-212-555-0199"));
    }
}
