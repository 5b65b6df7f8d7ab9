use serde::Serialize;
use streetscape_engine::{ImageRecord, Observation, ParcelRecord};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded records of the three sources.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub parcels: Vec<ParcelRecord>,
    pub observations: Vec<Observation>,
    pub images: Vec<ImageRecord>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Records surviving reconciliation, each source in its input order.
///
/// Every observation's parcel and image exist here, and every parcel and
/// image is referenced by at least one observation.
#[derive(Debug, Clone, Default)]
pub struct ReconOutput {
    pub parcels: Vec<ParcelRecord>,
    pub observations: Vec<Observation>,
    pub images: Vec<ImageRecord>,
    pub summary: ReconSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub input: usize,
    pub kept: usize,
}

impl SourceCounts {
    pub fn dropped(&self) -> usize {
        self.input - self.kept
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub parcels: SourceCounts,
    pub observations: SourceCounts,
    pub images: SourceCounts,
    /// Observations whose parcel text is not an integer key.
    pub unparseable_parcel_keys: usize,
}

impl ReconSummary {
    pub fn is_empty(&self) -> bool {
        self.observations.kept == 0
    }
}
