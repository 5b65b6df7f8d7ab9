//! End-to-end batch run: load, derive, reconcile, enrich, fuse, bin, label, write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use streetscape_config::{resolve_path, ConfigError, PipelineConfig, SegmentationConfig};
use streetscape_engine::greenery::{compute_greenery, GreeneryReport};
use streetscape_engine::labels::humanize;
use streetscape_engine::projection::{project_vocabulary, projections_table};
use streetscape_engine::tabular::derive_features;
use streetscape_engine::{add_bins, EngineError, Segmenter, SimilarityScorer};
use streetscape_io::csv::{load_images, load_observations, load_parcels, read_file_as_utf8, write_table};
use streetscape_io::projector::write_projector;
use streetscape_io::segment::HttpSegmenter;
use streetscape_io::vectors::load_word_vectors;
use streetscape_io::IoError;
use streetscape_recon::{fuse, reconcile, ReconError, ReconInput, ReconSummary};

pub const FEATURES_FILE: &str = "features.csv";
pub const GROUP_ORDERS_FILE: &str = "group_orders.csv";
pub const PROJECTIONS_FILE: &str = "word-embedding-projections.csv";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] IoError),

    /// The one-time word-vector load failed.
    #[error("word vectors: {0}")]
    WordVectors(#[source] IoError),

    #[error(transparent)]
    Recon(#[from] ReconError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct VocabularySummary {
    pub words: usize,
    pub dim: usize,
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionSummary {
    pub known_words: usize,
    pub projected_words: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub reconciliation: ReconSummary,
    /// `None` when segmentation was disabled or skipped.
    pub greenery: Option<GreeneryReport>,
    pub vocabulary: VocabularySummary,
    pub rows: usize,
    pub columns: usize,
    pub binned_columns: Vec<String>,
    pub projection: Option<ProjectionSummary>,
    pub outputs: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Build the HTTP segmenter when `[segmentation]` is enabled.
pub fn http_segmenter(
    config: &SegmentationConfig,
    base_dir: &Path,
) -> Result<Option<HttpSegmenter>, PipelineError> {
    if !config.enabled {
        return Ok(None);
    }
    let images_dir = resolve_path(base_dir, config.images_dir.as_deref().unwrap_or_default())?;
    let segmenter = HttpSegmenter::new(
        config.endpoint.clone(),
        images_dir,
        config.extension.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Some(segmenter))
}

fn load_source(base_dir: &Path, file: &str) -> Result<String, PipelineError> {
    let path = resolve_path(base_dir, file)?;
    Ok(read_file_as_utf8(&path)?)
}

/// Run the whole pipeline. Relative paths in `config` resolve against
/// `base_dir`. Without a `segmenter`, `greenery_per` keeps whatever the
/// image CSV carried.
pub fn run_pipeline(
    config: &PipelineConfig,
    base_dir: &Path,
    segmenter: Option<&dyn Segmenter>,
) -> Result<RunSummary, PipelineError> {
    let sources = &config.sources;
    let parcels = load_parcels(
        &load_source(base_dir, &sources.parcels.file)?,
        &sources.parcels.columns,
    )?;
    let mut observations = load_observations(&load_source(base_dir, &sources.observations.file)?)?;
    let images = load_images(&load_source(base_dir, &sources.images.file)?)?;
    log::info!(
        "loaded {} parcel(s), {} observation(s), {} image(s)",
        parcels.len(),
        observations.len(),
        images.len()
    );

    derive_features(&mut observations, &config.frequency_thresholds());

    let mut recon = reconcile(ReconInput {
        parcels,
        observations,
        images,
    });

    let greenery = segmenter.map(|s| {
        compute_greenery(&mut recon.images, s, &config.segmentation.greenery_categories)
    });

    let vectors_path = resolve_path(base_dir, &config.embedding.path)?;
    let vectors = load_word_vectors(&vectors_path, config.embedding.format, config.embedding.limit)
        .map_err(PipelineError::WordVectors)?;
    let scorer = SimilarityScorer::new(&vectors, &config.embedding.concepts)?;
    let scores = scorer.score_columns(recon.observations.iter().map(|o| o.text_en.as_deref()));

    let mut table = fuse(&recon, scores)?;
    let ordering = add_bins(&mut table, &config.binning_options())?;
    humanize(&mut table, &config.embedding.concepts)?;

    let out_dir = resolve_path(base_dir, &config.output.dir)?;
    std::fs::create_dir_all(&out_dir).map_err(|e| IoError::Write {
        path: out_dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut outputs = Vec::new();
    let features_path = out_dir.join(FEATURES_FILE);
    write_table(&table, &features_path)?;
    outputs.push(features_path);
    let orders_path = out_dir.join(GROUP_ORDERS_FILE);
    write_table(&ordering.to_table(), &orders_path)?;
    outputs.push(orders_path);

    let projection = if config.projection.enabled {
        let report = project_vocabulary(
            recon.observations.iter().map(|o| o.text_en.as_deref()),
            &vectors,
            &config.projection_options(),
        );
        let projections_path = out_dir.join(PROJECTIONS_FILE);
        write_table(&projections_table(&report.projections), &projections_path)?;
        outputs.push(projections_path);

        let projector_dir = resolve_path(base_dir, &config.output.projector_dir)?;
        outputs.extend(write_projector(&projector_dir, &report.known_words, &vectors)?);
        Some(ProjectionSummary {
            known_words: report.known_words.len(),
            projected_words: report.projections.len(),
        })
    } else {
        log::debug!("projection disabled");
        None
    };

    Ok(RunSummary {
        name: config.name.clone(),
        reconciliation: recon.summary,
        greenery,
        vocabulary: VocabularySummary {
            words: vectors.len(),
            dim: vectors.dim(),
            concepts: config.embedding.concepts.clone(),
        },
        rows: table.n_rows(),
        columns: table.n_cols(),
        binned_columns: ordering.columns,
        projection,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use streetscape_engine::{Segmentation, SegmentationError};

    struct FixedSegmenter;

    impl Segmenter for FixedSegmenter {
        fn segment(&self, image_name: &str) -> Result<Segmentation, SegmentationError> {
            match image_name {
                "a" => Ok(BTreeMap::from([("tree".to_string(), 0.25), ("sky".to_string(), 0.5)])),
                _ => Err(SegmentationError::Status(503)),
            }
        }
    }

    const VECTORS: &str = "\
liquor 1 0 0
food 0 1 0
money 0.5 0.5 0
health 0 0 1
car 0.2 0 0.8
store 0.9 0.1 0
mart 0.6 0.4 0
";

    fn write_fixture(dir: &Path, projection: bool) -> PipelineConfig {
        fs::write(
            dir.join("parcels.csv"),
            "parcel_id,area,zone_summary,lat,lon\n1,100,Commercial,30.1,-97.7\n2,250,Residential,30.2,-97.8\n3,80,Industrial,30.3,-97.9\n",
        )
        .unwrap();
        fs::write(
            dir.join("survey.csv"),
            "parcel,image_name,date,text_en,text_es,block\n\
             1,a,2019-05-02,liquor store,,7\n\
             2,b,2019-03-14,food mart,tienda,8\n",
        )
        .unwrap();
        fs::write(dir.join("images.csv"), "image_name,colorfulness\na,12.5\nb,40\nc,3\n").unwrap();
        fs::write(dir.join("vectors.txt"), VECTORS).unwrap();

        let toml = format!(
            r#"
name = "fixture"

[sources.parcels]
file = "parcels.csv"

[sources.observations]
file = "survey.csv"

[sources.images]
file = "images.csv"

[embedding]
path = "vectors.txt"

[projection]
enabled = {projection}
min_word_count = 1
clusters = 2
"#
        );
        PipelineConfig::from_toml(&toml).unwrap()
    }

    #[test]
    fn run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), true);

        let summary = run_pipeline(&config, dir.path(), Some(&FixedSegmenter)).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.reconciliation.parcels.kept, 2);
        assert_eq!(summary.reconciliation.images.kept, 2);

        let greenery = summary.greenery.unwrap();
        assert_eq!(greenery.segmented, 1);
        assert_eq!(greenery.failed.len(), 1);
        assert!(summary.binned_columns.contains(&"liquor_SES_bin".to_string()));

        let out = dir.path().join("outputs");
        let features = fs::read_to_string(out.join(FEATURES_FILE)).unwrap();
        let header = features.lines().next().unwrap();
        assert!(header.starts_with("parcel,image_name,date"));
        assert!(header.contains("greenery_per_bin"));
        assert!(header.contains("Text closeness to \"\"liquor\"\""));
        assert!(features.contains("Mar 2019"));
        assert!(features.contains("commercial"));

        let orders = fs::read_to_string(out.join(GROUP_ORDERS_FILE)).unwrap();
        assert_eq!(orders.lines().count(), 8);

        assert!(out.join(PROJECTIONS_FILE).exists());
        let metadata = fs::read_to_string(dir.path().join("tf-logs/en-embeddings/metadata.tsv")).unwrap();
        assert_eq!(metadata, "food\nliquor\nmart\nstore");
        assert_eq!(summary.projection.unwrap().known_words, 4);
    }

    #[test]
    fn rows_sorted_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), false);
        run_pipeline(&config, dir.path(), None).unwrap();

        let features = fs::read_to_string(dir.path().join("outputs").join(FEATURES_FILE)).unwrap();
        let first = features.lines().nth(1).unwrap();
        assert!(first.starts_with("2,b,2019-03-14"));
        assert!(!dir.path().join("outputs").join(PROJECTIONS_FILE).exists());
    }

    #[test]
    fn missing_concept_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixture(dir.path(), false);
        config.embedding.concepts.push("bicycle".into());

        let err = run_pipeline(&config, dir.path(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Engine(EngineError::ConceptNotInVocabulary(_))));
    }

    #[test]
    fn text_parcel_keys_fail_the_join() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), false);
        fs::write(
            dir.path().join("survey.csv"),
            "parcel,image_name,date,text_en\nP-1,a,2019-05-02,liquor store\nP-2,b,2019-03-14,food mart\n",
        )
        .unwrap();

        let err = run_pipeline(&config, dir.path(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Recon(ReconError::EmptyJoin { observations: 2 })));
        assert!(!dir.path().join("outputs").join(FEATURES_FILE).exists());
    }

    #[test]
    fn unreadable_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixture(dir.path(), false);
        config.embedding.path = "nope.txt".into();

        let err = run_pipeline(&config, dir.path(), None).unwrap_err();
        assert!(matches!(err, PipelineError::WordVectors(IoError::Read { .. })));
    }
}
