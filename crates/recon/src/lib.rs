//! `streetscape-recon` - multi-source key reconciliation and table fusion.
//!
//! Pure engine crate: receives pre-loaded parcel, survey and image records,
//! returns the consistent subset and the fused feature table.
//! No CLI or IO dependencies.

pub mod error;
pub mod fuse;
pub mod model;
pub mod reconcile;

pub use error::ReconError;
pub use fuse::fuse;
pub use model::{ReconInput, ReconOutput, ReconSummary, SourceCounts};
pub use reconcile::reconcile;
