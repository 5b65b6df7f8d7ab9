//! Greenery share of street-level images.
//!
//! Segmentation itself is behind [`Segmenter`]; the HTTP client lives in the
//! io crate. This module only sums class fractions and applies the
//! per-image failure policy: a failed image counts as zero greenery and the
//! batch carries on.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::record::ImageRecord;

pub const DEFAULT_GREENERY_CATEGORIES: [&str; 4] = ["tree", "grass", "plant", "palm"];

/// Class name → fraction of the image in `[0, 1]`.
pub type Segmentation = BTreeMap<String, f64>;

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("cannot read image {path}: {message}")]
    Io { path: String, message: String },
    #[error("segmentation request failed: {0}")]
    Transport(String),
    #[error("segmentation service returned HTTP {0}")]
    Status(u16),
    #[error("unreadable segmentation response: {0}")]
    Parse(String),
}

pub trait Segmenter {
    fn segment(&self, image_name: &str) -> Result<Segmentation, SegmentationError>;
}

/// Sum of the fractions of `categories`; absent classes count as zero.
pub fn greenery_fraction(segmentation: &Segmentation, categories: &[String]) -> f64 {
    categories
        .iter()
        .filter_map(|c| segmentation.get(c))
        .sum()
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GreeneryReport {
    pub segmented: usize,
    /// `(image_name, error)` per failed image, in input order.
    pub failed: Vec<(String, String)>,
}

/// Set `greenery_per` on every image, sequentially.
pub fn compute_greenery(
    images: &mut [ImageRecord],
    segmenter: &dyn Segmenter,
    categories: &[String],
) -> GreeneryReport {
    let mut report = GreeneryReport::default();
    for image in images.iter_mut() {
        match segmenter.segment(&image.image_name) {
            Ok(seg) => {
                image.greenery_per = Some(greenery_fraction(&seg, categories));
                report.segmented += 1;
            }
            Err(e) => {
                log::warn!("segmentation failed for '{}': {e}", image.image_name);
                image.greenery_per = Some(0.0);
                report.failed.push((image.image_name.clone(), e.to_string()));
            }
        }
    }
    log::info!(
        "segmented {} image(s), {} failure(s)",
        report.segmented,
        report.failed.len()
    );
    report
}
