//! Text normalization helpers shared by the tabular deriver and the scorer.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Spelling variants folded into one canonical form, applied in order.
const SPELLING_GROUPS: &[(&[&str], &str)] = &[
    (&["handpainted", "hand painted", "hnadpainted"], "hand-painted"),
    (&["signs", "sign"], "sign(s)"),
    (&["graffiti"], "grafitti"),
];

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("static word pattern"))
}

/// Trim, drop trailing commas, lower-case. Blank input is absent.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim().trim_end_matches(',');
    if s.is_empty() {
        return None;
    }
    Some(s.to_lowercase())
}

/// Unicode-aware `\w+` word extraction.
pub fn split_into_words(text: &str) -> Vec<String> {
    word_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Clean and tokenize a free-text field. Absent or blank text yields `None`.
pub fn tokenize(raw: Option<&str>) -> Option<Vec<String>> {
    clean_text(raw).map(|s| split_into_words(&s))
}

/// First entry of a `", "`-separated list.
pub fn first_of_cst(text: &str) -> &str {
    match text.split_once(", ") {
        Some((first, _)) => first,
        None => text,
    }
}

/// Number of entries in a comma-separated list.
pub fn count_cst(text: &str) -> i64 {
    text.matches(',').count() as i64 + 1
}

/// Fold known misspellings into their canonical form.
pub fn fix_grammar(text: &str) -> String {
    let mut s = text.to_string();
    for (variants, canonical) in SPELLING_GROUPS {
        for variant in *variants {
            if s.contains(canonical) {
                continue;
            }
            s = s.replace(variant, canonical);
        }
    }
    s
}

/// Blank out values seen fewer than `less_frequent_than` times.
pub fn ignore_infrequent(values: &mut [Option<String>], less_frequent_than: usize) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.clone()).or_insert(0) += 1;
    }
    for cell in values.iter_mut() {
        if let Some(v) = cell {
            if counts.get(v.as_str()).copied().unwrap_or(0) < less_frequent_than {
                *cell = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_trims_and_lowercases() {
        assert_eq!(clean_text(Some("  Liquor Store,")), Some("liquor store".into()));
        assert_eq!(clean_text(Some("a, b,,")), Some("a, b".into()));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(Some(",")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn words_ignore_punctuation() {
        assert_eq!(
            split_into_words("liquor, food-mart & café!"),
            vec!["liquor", "food", "mart", "café"]
        );
        assert!(split_into_words("?!").is_empty());
    }

    #[test]
    fn tokenize_missing_is_none() {
        assert_eq!(tokenize(None), None);
        assert_eq!(tokenize(Some(" ,")), None);
        assert_eq!(tokenize(Some("Food Mart")), Some(vec!["food".into(), "mart".into()]));
    }

    #[test]
    fn comma_lists() {
        assert_eq!(first_of_cst("park, plaza"), "park");
        assert_eq!(first_of_cst("park"), "park");
        assert_eq!(count_cst("a, b, c"), 3);
        assert_eq!(count_cst("a"), 1);
    }

    #[test]
    fn grammar_groups() {
        assert_eq!(fix_grammar("handpainted"), "hand-painted");
        assert_eq!(fix_grammar("hand painted mural"), "hand-painted mural");
        assert_eq!(fix_grammar("signs"), "sign(s)");
        assert_eq!(fix_grammar("sign"), "sign(s)");
        assert_eq!(fix_grammar("graffiti"), "grafitti");
        assert_eq!(fix_grammar("mural"), "mural");
    }

    #[test]
    fn infrequent_values_blanked() {
        let mut values = vec![
            Some("park".to_string()),
            Some("park".to_string()),
            Some("plaza".to_string()),
            None,
            Some("park".to_string()),
        ];
        ignore_infrequent(&mut values, 3);
        assert_eq!(values[0].as_deref(), Some("park"));
        assert_eq!(values[2], None);
        assert_eq!(values[3], None);
    }
}
