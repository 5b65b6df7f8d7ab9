//! Survey-derived features: text amounts, main categories, list sizes.
//!
//! Computed over the full survey before reconciliation, so category
//! frequencies reflect every observation that was collected.

use crate::record::Observation;
use crate::table::Column;
use crate::text::{clean_text, count_cst, first_of_cst, fix_grammar, ignore_infrequent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularFeatures {
    pub text_en_len: i64,
    pub text_es_len: i64,
    /// Spanish share of all text; absent when there is no text at all.
    pub text_es_per: Option<f64>,
    pub main_open_space: Option<String>,
    pub main_street_art: Option<String>,
    pub main_establishment: Option<String>,
    pub n_establishments: i64,
    pub n_businesses: i64,
    pub n_ads: i64,
}

/// Minimum occurrences for a "main" category to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyThresholds {
    pub open_space: usize,
    pub street_art: usize,
    pub establishment: usize,
}

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self {
            open_space: 3,
            street_art: 3,
            establishment: 5,
        }
    }
}

fn char_len(text: &Option<String>) -> i64 {
    text.as_deref().map_or(0, |s| s.chars().count() as i64)
}

fn main_value(raw: &Option<String>) -> Option<String> {
    clean_text(raw.as_deref()).map(|s| first_of_cst(&s).to_string())
}

fn list_size(raw: &Option<String>) -> i64 {
    clean_text(raw.as_deref()).map_or(0, |s| count_cst(&s))
}

/// Fill `derived` on every observation.
pub fn derive_features(observations: &mut [Observation], thresholds: &FrequencyThresholds) {
    let mut open_space: Vec<Option<String>> =
        observations.iter().map(|o| main_value(&o.open_space_kind)).collect();
    let mut street_art: Vec<Option<String>> = observations
        .iter()
        .map(|o| main_value(&o.street_art).map(|s| fix_grammar(&s)))
        .collect();
    let mut establishment: Vec<Option<String>> =
        observations.iter().map(|o| main_value(&o.establishment_kind)).collect();

    ignore_infrequent(&mut open_space, thresholds.open_space);
    ignore_infrequent(&mut street_art, thresholds.street_art);
    ignore_infrequent(&mut establishment, thresholds.establishment);

    for (i, obs) in observations.iter_mut().enumerate() {
        let en = char_len(&obs.text_en);
        let es = char_len(&obs.text_es);
        let total = en + es;

        obs.derived = TabularFeatures {
            text_en_len: en,
            text_es_len: es,
            text_es_per: (total > 0).then(|| es as f64 / total as f64),
            main_open_space: open_space[i].take(),
            main_street_art: street_art[i].take(),
            main_establishment: establishment[i].take(),
            n_establishments: list_size(&obs.establishment_kind),
            n_businesses: list_size(&obs.business_name),
            n_ads: list_size(&obs.ad_product),
        };
    }

    log::debug!("derived survey features for {} observation(s)", observations.len());
}

/// Derived features as table columns, in observation order.
pub fn feature_columns<'a>(observations: impl Iterator<Item = &'a Observation> + Clone) -> Vec<Column> {
    let ints = |f: fn(&TabularFeatures) -> i64| -> Vec<Option<i64>> {
        observations.clone().map(|o| Some(f(&o.derived))).collect()
    };
    let texts = |f: fn(&TabularFeatures) -> Option<String>| -> Vec<Option<String>> {
        observations.clone().map(|o| f(&o.derived)).collect()
    };

    vec![
        Column::integer("text_en_len", ints(|d| d.text_en_len)),
        Column::integer("text_es_len", ints(|d| d.text_es_len)),
        Column::float(
            "text_es_per",
            observations.clone().map(|o| o.derived.text_es_per).collect(),
        ),
        Column::text("main_open_space", texts(|d| d.main_open_space.clone())),
        Column::text("main_street_art", texts(|d| d.main_street_art.clone())),
        Column::text("main_establishment", texts(|d| d.main_establishment.clone())),
        Column::integer("n_establishments", ints(|d| d.n_establishments)),
        Column::integer("n_businesses", ints(|d| d.n_businesses)),
        Column::integer("n_ads", ints(|d| d.n_ads)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(open_space: Option<&str>, establishments: Option<&str>) -> Observation {
        let mut o = Observation::new("1", "img");
        o.open_space_kind = open_space.map(String::from);
        o.establishment_kind = establishments.map(String::from);
        o
    }

    #[test]
    fn text_lengths_and_share() {
        let mut o = Observation::new("1", "a");
        o.text_en = Some("open".into());
        o.text_es = Some("abierto!".into());
        let mut empty = Observation::new("2", "b");
        empty.text_en = None;

        let mut all = vec![o, empty];
        derive_features(&mut all, &FrequencyThresholds::default());

        assert_eq!(all[0].derived.text_en_len, 4);
        assert_eq!(all[0].derived.text_es_len, 8);
        let per = all[0].derived.text_es_per.unwrap();
        assert!((per - 8.0 / 12.0).abs() < 1e-12);

        assert_eq!(all[1].derived.text_en_len, 0);
        assert_eq!(all[1].derived.text_es_per, None);
    }

    #[test]
    fn list_counts_default_to_zero() {
        let mut all = vec![obs(None, Some("Liquor Store, Market, Salon")), obs(None, None)];
        derive_features(&mut all, &FrequencyThresholds::default());
        assert_eq!(all[0].derived.n_establishments, 3);
        assert_eq!(all[1].derived.n_establishments, 0);
        assert_eq!(all[1].derived.n_ads, 0);
    }

    #[test]
    fn main_category_respects_frequency() {
        let mut all = vec![
            obs(Some("Park, Plaza"), None),
            obs(Some("park"), None),
            obs(Some(" PARK,"), None),
            obs(Some("Plaza"), None),
        ];
        derive_features(&mut all, &FrequencyThresholds::default());
        assert_eq!(all[0].derived.main_open_space.as_deref(), Some("park"));
        assert_eq!(all[2].derived.main_open_space.as_deref(), Some("park"));
        assert_eq!(all[3].derived.main_open_space, None);
    }

    #[test]
    fn street_art_spelling_is_unified() {
        let mut all: Vec<Observation> = ["Handpainted", "hand painted", "hnadpainted, mural"]
            .iter()
            .map(|s| {
                let mut o = Observation::new("1", "x");
                o.street_art = Some(s.to_string());
                o
            })
            .collect();
        derive_features(&mut all, &FrequencyThresholds::default());
        for o in &all {
            assert_eq!(o.derived.main_street_art.as_deref(), Some("hand-painted"));
        }
    }

    #[test]
    fn columns_follow_observation_order() {
        let mut all = vec![obs(None, Some("a, b")), obs(None, Some("c"))];
        derive_features(&mut all, &FrequencyThresholds::default());
        let cols = feature_columns(all.iter());
        assert_eq!(cols.len(), 9);
        let n = cols.iter().find(|c| c.name == "n_establishments").unwrap();
        assert_eq!(n.data, crate::table::ColumnData::Integer(vec![Some(2), Some(1)]));
    }
}
