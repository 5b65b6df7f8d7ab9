//! Bag-of-words text embeddings and concept similarity.
//!
//! A text field is embedded as the sum of its in-vocabulary word vectors.
//! Out-of-vocabulary tokens are skipped. A field with no usable token has no
//! embedding, and every score for it is absent rather than zero, so
//! "unrelated" and "nothing to compare" stay distinguishable.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::table::Column;
use crate::text::tokenize;

/// Suffix of per-concept similarity columns.
pub const SIMILARITY_SUFFIX: &str = "_SES";

pub const DEFAULT_CONCEPTS: [&str; 5] = ["liquor", "food", "money", "health", "car"];

pub fn similarity_column_name(concept: &str) -> String {
    format!("{concept}{SIMILARITY_SUFFIX}")
}

// ---------------------------------------------------------------------------
// Word vectors
// ---------------------------------------------------------------------------

/// Read-only word → vector table.
///
/// Loaded once per run by the caller and borrowed by every consumer.
#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    dim: usize,
    words: Vec<String>,
    index: HashMap<String, usize>,
    data: Vec<f32>,
}

impl WordVectors {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ..Self::default()
        }
    }

    /// Build from `(word, vector)` pairs; the first pair fixes the dimension.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut iter = entries.into_iter().peekable();
        let dim = iter.peek().map(|(_, v)| v.len()).ok_or(EngineError::EmptyVocabulary)?;
        let mut table = Self::new(dim);
        for (word, vector) in iter {
            table.insert(word, vector)?;
        }
        Ok(table)
    }

    /// Add a word. A repeated word keeps its first vector.
    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) -> Result<(), EngineError> {
        let word = word.into();
        if vector.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                word,
                expected: self.dim,
                got: vector.len(),
            });
        }
        if self.index.contains_key(&word) {
            return Ok(());
        }
        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.data.extend_from_slice(&vector);
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        let i = *self.index.get(word)?;
        Some(&self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// Words in load order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Sum of the vectors of known tokens, in token order. `None` if no token is known.
    pub fn sum<'t>(&self, tokens: impl IntoIterator<Item = &'t str>) -> Option<Vec<f64>> {
        let mut acc: Option<Vec<f64>> = None;
        for token in tokens {
            let Some(v) = self.get(token) else {
                continue;
            };
            let sum = acc.get_or_insert_with(|| vec![0.0; self.dim]);
            for (s, x) in sum.iter_mut().zip(v) {
                *s += f64::from(*x);
            }
        }
        acc
    }
}

/// `1 - cosine_distance`. Absent when either vector has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f32]) -> Option<f64> {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Scores text against a fixed list of concept words.
pub struct SimilarityScorer<'a> {
    vectors: &'a WordVectors,
    concepts: Vec<(String, &'a [f32])>,
}

impl<'a> SimilarityScorer<'a> {
    /// Every concept must have a vector.
    pub fn new(vectors: &'a WordVectors, concepts: &[String]) -> Result<Self, EngineError> {
        let concepts = concepts
            .iter()
            .map(|c| {
                vectors
                    .get(c)
                    .map(|v| (c.clone(), v))
                    .ok_or_else(|| EngineError::ConceptNotInVocabulary(c.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { vectors, concepts })
    }

    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.concepts.iter().map(|(c, _)| c.as_str())
    }

    /// Summed embedding of a raw text field.
    pub fn embed(&self, text: Option<&str>) -> Option<Vec<f64>> {
        let tokens = tokenize(text)?;
        self.vectors.sum(tokens.iter().map(String::as_str))
    }

    /// One score per concept, in concept order.
    pub fn score(&self, text: Option<&str>) -> Vec<Option<f64>> {
        match self.embed(text) {
            Some(v) => self
                .concepts
                .iter()
                .map(|(_, c)| cosine_similarity(&v, c))
                .collect(),
            None => vec![None; self.concepts.len()],
        }
    }

    /// `<concept>_SES` columns aligned with `texts`.
    pub fn score_columns<'t>(&self, texts: impl IntoIterator<Item = Option<&'t str>>) -> Vec<Column> {
        let mut per_concept: Vec<Vec<Option<f64>>> = vec![Vec::new(); self.concepts.len()];
        let mut rows = 0usize;
        let mut without_signal = 0usize;

        for text in texts {
            let scores = self.score(text);
            if scores.iter().all(Option::is_none) {
                without_signal += 1;
            }
            for (col, s) in per_concept.iter_mut().zip(scores) {
                col.push(s);
            }
            rows += 1;
        }
        log::info!(
            "scored {rows} text(s) against {} concept(s); {without_signal} without usable words",
            self.concepts.len()
        );

        self.concepts
            .iter()
            .zip(per_concept)
            .map(|((concept, _), values)| Column::float(similarity_column_name(concept), values))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnData;

    fn vocab() -> WordVectors {
        WordVectors::from_entries([
            ("liquor", vec![1.0, 0.1, 0.0]),
            ("store", vec![0.5, 0.5, 0.0]),
            ("food", vec![0.2, 0.9, 0.0]),
            ("mart", vec![0.6, 0.4, 0.0]),
            ("health", vec![0.0, 0.1, 1.0]),
            ("zero", vec![0.0, 0.0, 0.0]),
        ])
        .unwrap()
    }

    fn concepts(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn related_concept_scores_higher() {
        let wv = vocab();
        let scorer = SimilarityScorer::new(&wv, &concepts(&["liquor", "health"])).unwrap();
        let scores = scorer.score(Some("liquor store food mart"));
        let liquor = scores[0].unwrap();
        let health = scores[1].unwrap();
        assert!(liquor > health, "{liquor} <= {health}");
        assert!(liquor <= 1.0 + 1e-12);
    }

    #[test]
    fn scoring_is_deterministic() {
        let wv = vocab();
        let scorer = SimilarityScorer::new(&wv, &concepts(&["liquor"])).unwrap();
        let a = scorer.score(Some("liquor store food mart"))[0].unwrap();
        let b = scorer.score(Some("liquor store food mart"))[0].unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn missing_or_unknown_text_has_no_scores() {
        let wv = vocab();
        let scorer = SimilarityScorer::new(&wv, &concepts(&["liquor", "food"])).unwrap();
        assert_eq!(scorer.score(None), vec![None, None]);
        assert_eq!(scorer.score(Some("  ,")), vec![None, None]);
        assert_eq!(scorer.score(Some("qwerty zxcv")), vec![None, None]);
        assert_eq!(scorer.score(Some("zero")), vec![None, None]);
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let wv = vocab();
        let scorer = SimilarityScorer::new(&wv, &concepts(&["liquor"])).unwrap();
        let plain = scorer.score(Some("liquor"))[0];
        let noisy = scorer.score(Some("Liquor, qwerty!"))[0];
        assert_eq!(plain, noisy);
        assert!((plain.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_concept_is_rejected() {
        let wv = vocab();
        let err = SimilarityScorer::new(&wv, &concepts(&["liquor", "bicycle"]))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::ConceptNotInVocabulary(ref w) if w == "bicycle"));
    }

    #[test]
    fn columns_named_per_concept() {
        let wv = vocab();
        let scorer = SimilarityScorer::new(&wv, &concepts(&["liquor", "health"])).unwrap();
        let cols = scorer.score_columns([Some("food"), None]);
        assert_eq!(cols[0].name, "liquor_SES");
        assert_eq!(cols[1].name, "health_SES");
        let ColumnData::Float(values) = &cols[0].data else {
            panic!("expected float column");
        };
        assert!(values[0].is_some());
        assert!(values[1].is_none());
    }

    #[test]
    fn vector_table_rules() {
        let mut wv = WordVectors::new(2);
        wv.insert("a", vec![1.0, 2.0]).unwrap();
        wv.insert("a", vec![9.0, 9.0]).unwrap();
        assert_eq!(wv.get("a"), Some(&[1.0f32, 2.0][..]));
        assert_eq!(wv.len(), 1);
        assert!(matches!(
            wv.insert("b", vec![1.0]),
            Err(EngineError::DimensionMismatch { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            WordVectors::from_entries(Vec::<(String, Vec<f32>)>::new()),
            Err(EngineError::EmptyVocabulary)
        ));
    }
}
