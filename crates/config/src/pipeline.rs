use std::path::{Path, PathBuf};

use serde::Deserialize;
use streetscape_engine::binning::{BinningOptions, DEFAULT_EXCLUDED};
use streetscape_engine::greenery::DEFAULT_GREENERY_CATEGORIES;
use streetscape_engine::projection::ProjectionOptions;
use streetscape_engine::similarity::DEFAULT_CONCEPTS;
use streetscape_engine::tabular::FrequencyThresholds;

use crate::error::ConfigError;

pub const DEFAULT_SEGMENTATION_ENDPOINT: &str =
    "http://scenesegmentation.csail.mit.edu/cgi-bin/image_segnet.py";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub sources: SourcesConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub binning: BinningConfig,
    #[serde(default)]
    pub tabular: TabularConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub parcels: ParcelSourceConfig,
    pub observations: SourceConfig,
    pub images: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParcelSourceConfig {
    pub file: String,
    #[serde(default)]
    pub columns: ParcelColumns,
}

/// Header names of the parcel export, e.g. `OBJECTID` / `ZONE_SMRY`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParcelColumns {
    pub parcel_id: String,
    pub area: String,
    pub zone_summary: String,
    pub lat: String,
    pub lon: String,
}

impl Default for ParcelColumns {
    fn default() -> Self {
        Self {
            parcel_id: "parcel_id".into(),
            area: "area".into(),
            zone_summary: "zone_summary".into(),
            lat: "lat".into(),
            lon: "lon".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Embedding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingFormat {
    /// word2vec text: optional `<count> <dim>` header, then `word v1 .. vdim`.
    #[default]
    Text,
    /// word2vec binary.
    Binary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub path: String,
    #[serde(default)]
    pub format: EmbeddingFormat,
    #[serde(default = "default_concepts")]
    pub concepts: Vec<String>,
    /// Load only the first `limit` vectors.
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_concepts() -> Vec<String> {
    strings(&DEFAULT_CONCEPTS)
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Directory holding `<image_name>.<extension>` files.
    pub images_dir: Option<String>,
    pub extension: String,
    pub timeout_secs: u64,
    pub greenery_categories: Vec<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_SEGMENTATION_ENDPOINT.into(),
            images_dir: None,
            extension: "jpg".into(),
            timeout_secs: 60,
            greenery_categories: strings(&DEFAULT_GREENERY_CATEGORIES),
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Numeric identifier columns that are never binned.
    pub exclude: Vec<String>,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            exclude: strings(&DEFAULT_EXCLUDED),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TabularConfig {
    pub open_space_min_count: usize,
    pub street_art_min_count: usize,
    pub establishment_min_count: usize,
}

impl Default for TabularConfig {
    fn default() -> Self {
        let t = FrequencyThresholds::default();
        Self {
            open_space_min_count: t.open_space,
            street_art_min_count: t.street_art,
            establishment_min_count: t.establishment,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub enabled: bool,
    pub min_word_count: usize,
    pub clusters: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        let p = ProjectionOptions::default();
        Self {
            enabled: true,
            min_word_count: p.min_word_count,
            clusters: p.clusters,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    /// Embedding projector artifacts, relative to the config file.
    pub projector_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "outputs".into(),
            projector_dir: "tf-logs/en-embeddings".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        for (source, file) in [
            ("parcels", &self.sources.parcels.file),
            ("observations", &self.sources.observations.file),
            ("images", &self.sources.images.file),
        ] {
            if file.trim().is_empty() {
                return invalid(format!("sources.{source}.file is empty"));
            }
        }

        if self.embedding.path.trim().is_empty() {
            return invalid("embedding.path is empty".into());
        }
        if self.embedding.concepts.is_empty() {
            return invalid("embedding.concepts must name at least one word".into());
        }
        for (i, concept) in self.embedding.concepts.iter().enumerate() {
            if concept.trim().is_empty() {
                return invalid(format!("embedding.concepts[{i}] is empty"));
            }
            if self.embedding.concepts[..i].contains(concept) {
                return invalid(format!("embedding.concepts: '{concept}' listed twice"));
            }
        }
        if self.embedding.limit == Some(0) {
            return invalid("embedding.limit must be positive".into());
        }

        let seg = &self.segmentation;
        if seg.enabled {
            if seg.images_dir.as_deref().map_or(true, |d| d.trim().is_empty()) {
                return invalid("segmentation.images_dir is required when segmentation is enabled".into());
            }
            if !(seg.endpoint.starts_with("http://") || seg.endpoint.starts_with("https://")) {
                return invalid(format!(
                    "segmentation.endpoint must be an http(s) URL, got '{}'",
                    seg.endpoint
                ));
            }
            if seg.timeout_secs == 0 {
                return invalid("segmentation.timeout_secs must be positive".into());
            }
        }
        if seg.greenery_categories.is_empty() {
            return invalid("segmentation.greenery_categories must not be empty".into());
        }

        if !(1..=26).contains(&self.projection.clusters) {
            return invalid(format!(
                "projection.clusters must be between 1 and 26, got {}",
                self.projection.clusters
            ));
        }
        if self.projection.min_word_count == 0 {
            return invalid("projection.min_word_count must be positive".into());
        }

        if self.output.dir.trim().is_empty() {
            return invalid("output.dir is empty".into());
        }

        Ok(())
    }

    pub fn binning_options(&self) -> BinningOptions {
        BinningOptions {
            exclude: self.binning.exclude.clone(),
        }
    }

    pub fn frequency_thresholds(&self) -> FrequencyThresholds {
        FrequencyThresholds {
            open_space: self.tabular.open_space_min_count,
            street_art: self.tabular.street_art_min_count,
            establishment: self.tabular.establishment_min_count,
        }
    }

    pub fn projection_options(&self) -> ProjectionOptions {
        ProjectionOptions {
            min_word_count: self.projection.min_word_count,
            clusters: self.projection.clusters,
            ..ProjectionOptions::default()
        }
    }
}

/// Expand `~` and `$VAR`, then resolve relative paths against `base`
/// (the config file's directory).
pub fn resolve_path(base: &Path, raw: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(raw).map_err(|e| ConfigError::PathExpansion {
        path: raw.to_string(),
        message: e.to_string(),
    })?;
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base.join(path))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "East Austin walk"

[sources.parcels]
file = "parcels.csv"

[sources.observations]
file = "survey.csv"

[sources.images]
file = "images.csv"

[embedding]
path = "vectors.txt"
"#;

    #[test]
    fn parse_minimal_with_defaults() {
        let c = PipelineConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(c.name, "East Austin walk");
        assert_eq!(c.sources.parcels.columns, ParcelColumns::default());
        assert_eq!(c.embedding.format, EmbeddingFormat::Text);
        assert_eq!(c.embedding.concepts, vec!["liquor", "food", "money", "health", "car"]);
        assert!(!c.segmentation.enabled);
        assert_eq!(c.segmentation.endpoint, DEFAULT_SEGMENTATION_ENDPOINT);
        assert_eq!(c.binning.exclude, vec!["parcel", "block", "year"]);
        assert_eq!(c.output.dir, "outputs");
        assert_eq!(c.frequency_thresholds(), FrequencyThresholds::default());
        assert_eq!(c.projection_options(), ProjectionOptions::default());
    }

    #[test]
    fn parse_column_mapping_and_sections() {
        let toml = format!(
            "{MINIMAL}{}",
            r#"
[sources.parcels.columns]
parcel_id = "OBJECTID"
zone_summary = "ZONE_SMRY"
area = "Shape__Are"

[segmentation]
enabled = true
images_dir = "~/walk/images"
greenery_categories = ["tree", "grass"]

[projection]
clusters = 4
"#
        );
        let c = PipelineConfig::from_toml(&toml).unwrap();
        assert_eq!(c.sources.parcels.columns.parcel_id, "OBJECTID");
        assert_eq!(c.sources.parcels.columns.lat, "lat");
        assert!(c.segmentation.enabled);
        assert_eq!(c.segmentation.extension, "jpg");
        assert_eq!(c.segmentation.greenery_categories, vec!["tree", "grass"]);
        assert_eq!(c.projection.clusters, 4);
        assert!(c.projection.enabled);
    }

    #[test]
    fn binary_format_parses() {
        let toml = MINIMAL.replace("path = \"vectors.txt\"", "path = \"v.bin\"\nformat = \"binary\"\nlimit = 1000");
        let c = PipelineConfig::from_toml(&toml).unwrap();
        assert_eq!(c.embedding.format, EmbeddingFormat::Binary);
        assert_eq!(c.embedding.limit, Some(1000));
    }

    #[test]
    fn rejects_missing_embedding_section() {
        let toml = MINIMAL.replace("[embedding]\npath = \"vectors.txt\"\n", "");
        assert!(matches!(PipelineConfig::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            MINIMAL.replace("file = \"survey.csv\"", "file = \"\""),
            format!("{MINIMAL}concepts = []\n"),
            format!("{MINIMAL}concepts = [\"food\", \"food\"]\n"),
            format!("{MINIMAL}\n[segmentation]\nenabled = true\n"),
            format!("{MINIMAL}\n[segmentation]\nenabled = true\nimages_dir = \"img\"\nendpoint = \"ftp://x\"\n"),
            format!("{MINIMAL}\n[projection]\nclusters = 0\n"),
            format!("{MINIMAL}\n[projection]\nclusters = 27\n"),
        ];
        for toml in &cases {
            let err = PipelineConfig::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{toml}: {err}");
        }
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        assert!(PipelineConfig::from_file(&path).is_ok());

        let missing = PipelineConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn paths_resolve_against_base() {
        let base = Path::new("/data/walk");
        assert_eq!(resolve_path(base, "survey.csv").unwrap(), PathBuf::from("/data/walk/survey.csv"));
        assert_eq!(resolve_path(base, "/abs/x.csv").unwrap(), PathBuf::from("/abs/x.csv"));

        std::env::set_var("STREETSCAPE_TEST_DATA", "/mnt/data");
        assert_eq!(
            resolve_path(base, "$STREETSCAPE_TEST_DATA/p.csv").unwrap(),
            PathBuf::from("/mnt/data/p.csv")
        );
        assert!(matches!(
            resolve_path(base, "$STREETSCAPE_UNSET_VARIABLE_XYZ/p.csv"),
            Err(ConfigError::PathExpansion { .. })
        ));
    }
}
