use streetscape_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// A fused row references a key absent from the joined source.
    #[error("{source_name} has no record for key '{key}'")]
    MissingJoinKey { source_name: &'static str, key: String },
    /// Survey parcel text that does not coerce to an integer parcel id.
    #[error("observation for image '{image_name}': parcel key '{raw}' is not an integer")]
    UncoercibleParcelKey { image_name: String, raw: String },
    /// Non-empty input produced an empty table.
    #[error("join of {observations} observation(s) produced no rows")]
    EmptyJoin { observations: usize },
    /// Enrichment column not aligned with the observations.
    #[error("enrichment column '{column}' has {got} value(s), expected {expected}")]
    EnrichmentLength {
        column: String,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}
