use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Identifier-like tokens of a query, in order of first appearance.
/// Single characters are dropped; they match everything fuzzily.
pub fn identifier_tokens(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if token.len() < 2 {
            continue;
        }
        if !seen.iter().any(|t| t == token) {
            seen.push(token.to_string());
        }
    }
    seen
}

/// Fuzzy-match the query against entity names with nucleo-matcher.
/// Scores are normalized to [0, 1] (raw nucleo scores run roughly 0-1000);
/// names below `threshold` are dropped.
pub fn fuzzy_name_scores(query: &str, names: &[String], threshold: f32) -> Vec<(String, f32)> {
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut query_buf = Vec::new();
    let mut matches = Vec::new();

    for name in names {
        let mut name_buf = Vec::new();
        let haystack = Utf32Str::new(name, &mut name_buf);
        let needle = Utf32Str::new(query, &mut query_buf);

        if let Some(score) = matcher.fuzzy_match(haystack, needle) {
            let normalized = (f32::from(score) / 1000.0).min(1.0);
            if normalized >= threshold {
                matches.push((name.clone(), normalized));
            }
        }
    }
    matches
}
