//! `streetscape-engine` - feature computation for the parcel/streetscape pipeline.
//!
//! Pure engine crate: receives pre-loaded records and tables, returns derived
//! columns. No file, network, or CLI dependencies.

pub mod binning;
pub mod error;
pub mod greenery;
pub mod labels;
pub mod projection;
pub mod record;
pub mod similarity;
pub mod table;
pub mod tabular;
pub mod text;

pub use binning::{add_bins, Bin, BinOrdering, BinningOptions};
pub use error::EngineError;
pub use greenery::{Segmentation, SegmentationError, Segmenter};
pub use record::{ImageRecord, Observation, ParcelId, ParcelRecord};
pub use similarity::{SimilarityScorer, WordVectors};
pub use table::{Column, ColumnData, Table, MISSING};
