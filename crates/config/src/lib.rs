// Pipeline configuration loading

pub mod error;
pub mod pipeline;

pub use error::ConfigError;
pub use pipeline::{
    resolve_path, BinningConfig, EmbeddingConfig, EmbeddingFormat, OutputConfig, ParcelColumns,
    ParcelSourceConfig, PipelineConfig, ProjectionConfig, SegmentationConfig, SourceConfig,
    SourcesConfig, TabularConfig,
};
