//! Query-to-regex compilation for `search_files`.
//!
//! Empty query matches everything; a single token is bounded by a word or
//! separator boundary on each side; multiple tokens are joined permitting
//! any run of whitespace/separators between them.

use regex::Regex;

const SEPARATOR_CLASS: &str = r"[\s._+-]";
const BOUNDARY_CLASS: &str = r"(\b|[._+-])";

pub fn normalize_query(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if "_-.+".contains(c) { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the search regex per the query-normalization rules. Returns a
/// case-insensitive `Regex`; callers apply it to `file_name` and,
/// optionally, `caption`.
pub fn build_search_regex(query: &str) -> Result<Regex, regex::Error> {
    let normalized = normalize_query(query);
    let pattern = if normalized.is_empty() {
        ".".to_string()
    } else {
        let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.len() == 1 {
            format!(
                "{}{}{}",
                BOUNDARY_CLASS,
                regex::escape(tokens[0]),
                BOUNDARY_CLASS
            )
        } else {
            tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join(&format!(".*{SEPARATOR_CLASS}"))
        }
    };
    regex::RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_matches_everything() {
        let re = build_search_regex("").unwrap();
        assert!(re.is_match("anything at all.mp4"));
    }

    #[test]
    fn single_token_requires_a_boundary() {
        let re = build_search_regex("avatar").unwrap();
        assert!(re.is_match("Avatar.2009.mkv"));
        assert!(re.is_match("the avatar movie"));
        assert!(!re.is_match("avatarsaurus"));
    }

    #[test]
    fn multi_token_allows_any_separator_run_between_tokens() {
        let re = build_search_regex("avatar 2009").unwrap();
        assert!(re.is_match("Avatar.2009.1080p.mkv"));
        assert!(re.is_match("avatar_2009"));
        assert!(!re.is_match("2009 avatar"));
    }

    #[test]
    fn every_match_satisfies_the_compiled_regex() {
        let re = build_search_regex("matrix reloaded").unwrap();
        let candidates = [
            "The.Matrix.Reloaded.2003.mkv",
            "matrix-reloaded",
            "Matrix Revolutions",
        ];
        let matched: Vec<&&str> = candidates.iter().filter(|c| re.is_match(c)).collect();
        for m in &matched {
            assert!(re.is_match(m));
        }
        assert_eq!(matched.len(), 2);
    }
}
