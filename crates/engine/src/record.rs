use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::tabular::TabularFeatures;

// ---------------------------------------------------------------------------
// Parcel key
// ---------------------------------------------------------------------------

/// Integer parcel identifier shared by the parcel table and the survey table.
///
/// The survey stores it as text, the parcel table as a number; both sides
/// coerce through [`ParcelId::parse`] before any comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ParcelId(pub i64);

impl ParcelId {
    /// Coerce a textual key. Accepts `"12"`, `" 12 "`, `"12.0"`; rejects
    /// fractional, non-numeric, and empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Some(Self(i));
        }
        let f: f64 = s.parse().ok()?;
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Some(Self(f as i64))
        } else {
            None
        }
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// One row of the parcel (geospatial) table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub parcel_id: ParcelId,
    pub area: Option<f64>,
    pub zone_summary: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl ParcelRecord {
    pub fn new(parcel_id: i64) -> Self {
        Self {
            parcel_id: ParcelId(parcel_id),
            area: None,
            zone_summary: None,
            lat: None,
            lon: None,
        }
    }
}

/// One field-survey observation: a parcel seen in one street-level image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// Parcel key exactly as written in the survey.
    pub parcel: String,
    pub image_name: String,
    pub date: Option<String>,
    pub text_en: Option<String>,
    pub text_es: Option<String>,
    pub open_space_kind: Option<String>,
    pub street_art: Option<String>,
    pub establishment_kind: Option<String>,
    pub business_name: Option<String>,
    pub ad_product: Option<String>,
    /// Pass-through survey columns (e.g. `block`), carried as text.
    pub extra: BTreeMap<String, Option<String>>,
    pub derived: TabularFeatures,
}

impl Observation {
    pub fn new(parcel: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            parcel: parcel.into(),
            image_name: image_name.into(),
            ..Self::default()
        }
    }

    pub fn parcel_id(&self) -> Option<ParcelId> {
        ParcelId::parse(&self.parcel)
    }
}

/// Visual features of one street-level image, keyed by file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_name: String,
    pub colorfulness: Option<f64>,
    pub greenery_per: Option<f64>,
}

impl ImageRecord {
    pub fn new(image_name: impl Into<String>, colorfulness: Option<f64>) -> Self {
        Self {
            image_name: image_name.into(),
            colorfulness,
            greenery_per: None,
        }
    }
}
