//! 2D map of the survey vocabulary for exploratory use.
//!
//! Frequent in-vocabulary words are spherized, projected onto their two
//! principal components and grouped by Ward agglomerative clustering.
//! Everything is deterministic: fixed start vectors, fixed iteration count,
//! sorted word lists.

use std::collections::BTreeMap;

use crate::similarity::WordVectors;
use crate::table::{Column, Table};
use crate::text::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// Words seen fewer times than this are left off the map.
    pub min_word_count: usize,
    /// Upper bound on cluster count (capped at the number of words).
    pub clusters: usize,
    /// Power-iteration steps per principal component.
    pub iterations: usize,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            min_word_count: 5,
            clusters: 8,
            iterations: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedWord {
    pub word: String,
    pub dim1: f64,
    pub dim2: f64,
    pub cluster: char,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocabularyReport {
    /// Distinct in-vocabulary words, sorted.
    pub known_words: Vec<String>,
    /// Known words meeting `min_word_count`, sorted.
    pub frequent_words: Vec<String>,
    pub projections: Vec<ProjectedWord>,
}

/// Token counts over all texts; absent texts contribute nothing.
pub fn word_counts<'t>(texts: impl IntoIterator<Item = Option<&'t str>>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for tokens in texts.into_iter().filter_map(tokenize) {
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
    }
    counts
}

pub fn project_vocabulary<'t>(
    texts: impl IntoIterator<Item = Option<&'t str>>,
    vectors: &WordVectors,
    options: &ProjectionOptions,
) -> VocabularyReport {
    let counts = word_counts(texts);
    let known_words: Vec<String> = counts.keys().filter(|w| vectors.contains(w)).cloned().collect();
    let frequent_words: Vec<String> = known_words
        .iter()
        .filter(|w| counts.get(*w).copied().unwrap_or(0) >= options.min_word_count)
        .cloned()
        .collect();

    let rows: Vec<Vec<f64>> = frequent_words
        .iter()
        .filter_map(|w| vectors.get(w))
        .map(|v| v.iter().map(|x| f64::from(*x)).collect())
        .collect();
    let rows = spherize(rows);
    let points = principal_components(&rows, options.iterations);
    let labels = ward_clusters(&points, options.clusters);

    let projections = frequent_words
        .iter()
        .zip(points.iter().zip(labels))
        .map(|(word, (p, label))| ProjectedWord {
            word: word.clone(),
            dim1: p[0],
            dim2: p[1],
            cluster: cluster_letter(label),
        })
        .collect();

    log::info!(
        "projected {} of {} known word(s) ({} distinct token(s))",
        frequent_words.len(),
        known_words.len(),
        counts.len()
    );
    VocabularyReport {
        known_words,
        frequent_words,
        projections,
    }
}

pub fn projections_table(projections: &[ProjectedWord]) -> Table {
    let mut table = Table::with_rows(projections.len());
    let columns = [
        Column::text("word", projections.iter().map(|p| Some(p.word.clone())).collect()),
        Column::float("dim1", projections.iter().map(|p| Some(p.dim1)).collect()),
        Column::float("dim2", projections.iter().map(|p| Some(p.dim2)).collect()),
        Column::text("cluster", projections.iter().map(|p| Some(p.cluster.to_string())).collect()),
    ];
    for column in columns {
        // fixed distinct names, lengths all equal the row count
        let _ = table.push(column);
    }
    table
}

fn cluster_letter(label: usize) -> char {
    char::from_u32(u32::from('A') + label as u32).unwrap_or('?')
}

// ---------------------------------------------------------------------------
// Spherize + PCA
// ---------------------------------------------------------------------------

/// Subtract the global scalar mean, divide by the global scalar (population) std.
fn spherize(mut rows: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let n: usize = rows.iter().map(Vec::len).sum();
    if n == 0 {
        return rows;
    }
    let mean = rows.iter().flatten().sum::<f64>() / n as f64;
    let var = rows.iter().flatten().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let std = var.sqrt();
    for x in rows.iter_mut().flatten() {
        *x -= mean;
        if std > 0.0 {
            *x /= std;
        }
    }
    rows
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    norm
}

/// Top eigenvector of a symmetric matrix by power iteration, with its eigenvalue.
fn power_iteration(matrix: &[Vec<f64>], iterations: usize) -> (Vec<f64>, f64) {
    let dim = matrix.len();
    let mut v: Vec<f64> = (0..dim).map(|i| 1.0 + (i % 7) as f64 / 7.0).collect();
    normalize(&mut v);
    let mut eigenvalue = 0.0;
    for _ in 0..iterations {
        let mut next: Vec<f64> = matrix
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum())
            .collect();
        eigenvalue = normalize(&mut next);
        if eigenvalue == 0.0 {
            return (vec![0.0; dim], 0.0);
        }
        v = next;
    }
    // sign convention: largest component positive
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    (v, eigenvalue)
}

/// Coordinates of each row on the first two principal components.
fn principal_components(rows: &[Vec<f64>], iterations: usize) -> Vec<[f64; 2]> {
    let n = rows.len();
    let Some(dim) = rows.first().map(Vec::len) else {
        return Vec::new();
    };

    let mut means = vec![0.0; dim];
    for row in rows {
        for (m, x) in means.iter_mut().zip(row) {
            *m += x / n as f64;
        }
    }
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| row.iter().zip(&means).map(|(x, m)| x - m).collect())
        .collect();

    let mut cov = vec![vec![0.0; dim]; dim];
    for row in &centered {
        for i in 0..dim {
            for j in i..dim {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..dim {
        for j in 0..i {
            cov[i][j] = cov[j][i];
        }
    }

    // eigenvalues this far below the total variance are deflation residue
    let floor = 1e-9 * (0..dim).map(|i| cov[i][i]).sum::<f64>();
    let mut components = Vec::with_capacity(2);
    for _ in 0..2 {
        let (v, lambda) = power_iteration(&cov, iterations);
        if lambda <= floor {
            components.push(vec![0.0; dim]);
            continue;
        }
        for i in 0..dim {
            for j in 0..dim {
                cov[i][j] -= lambda * v[i] * v[j];
            }
        }
        components.push(v);
    }

    centered
        .iter()
        .map(|row| {
            let project = |c: &Vec<f64>| row.iter().zip(c).map(|(a, b)| a * b).sum::<f64>();
            [project(&components[0]), project(&components[1])]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ward clustering
// ---------------------------------------------------------------------------

/// Ward agglomerative clustering into at most `k` clusters.
///
/// Labels are renumbered by first appearance, so point 0 is always cluster 0.
fn ward_clusters(points: &[[f64; 2]], k: usize) -> Vec<usize> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);

    // squared euclidean distances, updated by Lance-Williams
    let mut dist = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            let dx = points[i][0] - points[j][0];
            let dy = points[i][1] - points[j][1];
            dist[i * n + j] = dx * dx + dy * dy;
        }
    }
    let mut size = vec![1.0f64; n];
    let mut active = vec![true; n];
    let mut merges: Vec<(f64, usize, usize)> = Vec::with_capacity(n - 1);
    let mut chain: Vec<usize> = Vec::new();
    let mut remaining = n;

    // nearest-neighbour chain; valid because Ward linkage is reducible
    while remaining > 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|a| *a) {
                chain.push(first);
            }
        }
        let (a, b) = loop {
            let Some(&a) = chain.last() else {
                break (0, 0);
            };
            let prev = chain.len().checked_sub(2).map(|i| chain[i]);
            let mut best = prev;
            let mut best_d = prev.map_or(f64::INFINITY, |p| dist[a * n + p]);
            for c in (0..n).filter(|&c| active[c] && c != a) {
                if dist[a * n + c] < best_d {
                    best = Some(c);
                    best_d = dist[a * n + c];
                }
            }
            match best {
                Some(c) if Some(c) == prev => break (a, c),
                Some(c) => chain.push(c),
                None => break (a, a),
            }
        };
        if a == b {
            break;
        }
        chain.truncate(chain.len() - 2);

        let d_ab = dist[a * n + b];
        merges.push((d_ab, a, b));
        for c in (0..n).filter(|&c| active[c] && c != a && c != b) {
            let (sa, sb, sc) = (size[a], size[b], size[c]);
            let merged = ((sa + sc) * dist[a * n + c] + (sb + sc) * dist[b * n + c] - sc * d_ab)
                / (sa + sb + sc);
            dist[a * n + c] = merged;
            dist[c * n + a] = merged;
        }
        size[a] += size[b];
        active[b] = false;
        remaining -= 1;
    }

    merges.sort_by(|x, y| x.0.total_cmp(&y.0));
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for &(_, a, b) in merges.iter().take(n - k) {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent[rb] = ra;
        }
    }

    let mut letters: BTreeMap<usize, usize> = BTreeMap::new();
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            let next = letters.len();
            *letters.entry(root).or_insert(next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_tokens_of_present_texts() {
        let counts = word_counts([Some("Food, food mart"), None, Some("  ")]);
        assert_eq!(counts.get("food"), Some(&2));
        assert_eq!(counts.get("mart"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn ward_separates_obvious_groups() {
        let points = [
            [0.0, 0.0],
            [10.0, 10.0],
            [0.1, 0.0],
            [10.1, 10.0],
            [0.0, 0.2],
        ];
        let labels = ward_clusters(&points, 2);
        assert_eq!(labels, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn cluster_count_capped_by_points() {
        let labels = ward_clusters(&[[0.0, 0.0], [1.0, 1.0]], 8);
        assert_eq!(labels, vec![0, 1]);
        assert!(ward_clusters(&[], 8).is_empty());
        assert_eq!(ward_clusters(&[[3.0, 3.0]], 8), vec![0]);
    }

    #[test]
    fn pca_recovers_dominant_axis() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.5 * i as f64, 0.0]).collect();
        let points = principal_components(&rows, 100);
        // all variance lies on one axis
        for p in &points {
            assert!(p[1].abs() < 1e-6, "{p:?}");
        }
        assert!(points[9][0] > points[0][0]);
    }

    #[test]
    fn projection_end_to_end() {
        let wv = WordVectors::from_entries([
            ("park", vec![1.0, 0.0, 0.2]),
            ("tree", vec![0.9, 0.1, 0.1]),
            ("store", vec![0.0, 1.0, 0.3]),
            ("food", vec![0.1, 0.9, 0.5]),
        ])
        .unwrap();
        let texts = ["park tree store food", "park tree store", "park zebra"];
        let options = ProjectionOptions {
            min_word_count: 2,
            clusters: 2,
            ..ProjectionOptions::default()
        };
        let report = project_vocabulary(texts.iter().map(|t| Some(*t)), &wv, &options);

        assert_eq!(report.known_words, vec!["food", "park", "store", "tree"]);
        assert_eq!(report.frequent_words, vec!["park", "store", "tree"]);
        assert_eq!(report.projections.len(), 3);
        assert_eq!(report.projections[0].cluster, 'A');
        assert!(report.projections.iter().all(|p| p.dim1.is_finite() && p.dim2.is_finite()));

        let again = project_vocabulary(texts.iter().map(|t| Some(*t)), &wv, &options);
        assert_eq!(report, again);

        let table = projections_table(&report.projections);
        assert_eq!(table.headers(), vec!["word", "dim1", "dim2", "cluster"]);
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn empty_vocabulary_does_not_crash() {
        let wv = WordVectors::from_entries([("park", vec![1.0, 0.0])]).unwrap();
        let report = project_vocabulary([None, Some("zebra")], &wv, &ProjectionOptions::default());
        assert!(report.known_words.is_empty());
        assert!(report.projections.is_empty());
    }
}
