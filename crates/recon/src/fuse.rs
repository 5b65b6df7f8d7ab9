//! One wide feature row per reconciled observation.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use streetscape_engine::tabular::feature_columns;
use streetscape_engine::{Column, ImageRecord, Observation, ParcelId, ParcelRecord, Table};

use crate::error::ReconError;
use crate::model::ReconOutput;

const RAW_TEXT_FIELDS: [&str; 7] = [
    "text_en",
    "text_es",
    "open_space_kind",
    "street_art",
    "establishment_kind",
    "business_name",
    "ad_product",
];

/// Columns the fuser produces itself; pass-through columns may not shadow them.
const FUSED_COLUMNS: [&str; 7] = [
    "parcel",
    "image_name",
    "date",
    "colorfulness",
    "greenery_per",
    "parcel_designation",
    "year",
];

fn raw_text(o: &Observation, field: &str) -> Option<String> {
    match field {
        "text_en" => o.text_en.clone(),
        "text_es" => o.text_es.clone(),
        "open_space_kind" => o.open_space_kind.clone(),
        "street_art" => o.street_art.clone(),
        "establishment_kind" => o.establishment_kind.clone(),
        "business_name" => o.business_name.clone(),
        "ad_product" => o.ad_product.clone(),
        _ => None,
    }
}

/// Dates compare as text; missing dates sort last.
fn by_date(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

struct Joined<'a> {
    parcel_id: ParcelId,
    parcel: &'a ParcelRecord,
    image: &'a ImageRecord,
}

fn join<'a>(recon: &'a ReconOutput) -> Result<Vec<Joined<'a>>, ReconError> {
    let mut images: HashMap<&str, &ImageRecord> = HashMap::new();
    for image in &recon.images {
        images.entry(image.image_name.as_str()).or_insert(image);
    }
    let mut parcels: HashMap<ParcelId, &ParcelRecord> = HashMap::new();
    for parcel in &recon.parcels {
        parcels.entry(parcel.parcel_id).or_insert(parcel);
    }

    recon
        .observations
        .iter()
        .map(|o| {
            let image = images
                .get(o.image_name.as_str())
                .copied()
                .ok_or_else(|| ReconError::MissingJoinKey {
                    source_name: "image features",
                    key: o.image_name.clone(),
                })?;
            let parcel_id = o.parcel_id().ok_or_else(|| ReconError::UncoercibleParcelKey {
                image_name: o.image_name.clone(),
                raw: o.parcel.clone(),
            })?;
            let parcel = parcels
                .get(&parcel_id)
                .copied()
                .ok_or_else(|| ReconError::MissingJoinKey {
                    source_name: "parcels",
                    key: parcel_id.to_string(),
                })?;
            Ok(Joined {
                parcel_id,
                parcel,
                image,
            })
        })
        .collect()
}

/// Join the reconciled sources into the feature table, sorted by date.
///
/// `enrichments` are extra per-observation columns (e.g. similarity
/// scores) aligned with `recon.observations`; they go through the same
/// sort as every other column.
///
/// Observations that went into reconciliation but left nothing to join
/// fail with `EmptyJoin`; an empty reconciliation of empty sources yields
/// an empty table.
pub fn fuse(recon: &ReconOutput, enrichments: Vec<Column>) -> Result<Table, ReconError> {
    let obs = &recon.observations;
    let n = obs.len();
    for column in &enrichments {
        if column.len() != n {
            return Err(ReconError::EnrichmentLength {
                column: column.name.clone(),
                expected: n,
                got: column.len(),
            });
        }
    }

    let joined = join(recon)?;
    let seen = recon.summary.observations.input;
    if seen > 0 && joined.is_empty() {
        return Err(ReconError::EmptyJoin { observations: seen });
    }

    let mut table = Table::with_rows(n);
    table.push(Column::integer("parcel", joined.iter().map(|j| Some(j.parcel_id.0)).collect()))?;
    table.push(Column::text("image_name", obs.iter().map(|o| Some(o.image_name.clone())).collect()))?;
    table.push(Column::text("date", obs.iter().map(|o| o.date.clone()).collect()))?;
    for field in RAW_TEXT_FIELDS {
        table.push(Column::text(field, obs.iter().map(|o| raw_text(o, field)).collect()))?;
    }

    let features = feature_columns(obs.iter());
    let shadowed = |name: &str| {
        FUSED_COLUMNS.contains(&name)
            || RAW_TEXT_FIELDS.contains(&name)
            || features.iter().chain(&enrichments).any(|c| c.name == name)
    };
    let extras: BTreeSet<&str> = obs.iter().flat_map(|o| o.extra.keys().map(String::as_str)).collect();
    for name in extras {
        if shadowed(name) {
            log::warn!("pass-through column '{name}' shadows a fused column, dropped");
            continue;
        }
        let values = obs.iter().map(|o| o.extra.get(name).cloned().flatten()).collect();
        table.push(Column::text(name, values))?;
    }

    for column in features {
        table.push(column)?;
    }
    for column in enrichments {
        table.push(column)?;
    }

    table.push(Column::float("colorfulness", joined.iter().map(|j| j.image.colorfulness).collect()))?;
    table.push(Column::float("greenery_per", joined.iter().map(|j| j.image.greenery_per).collect()))?;
    table.push(Column::text(
        "parcel_designation",
        joined
            .iter()
            .map(|j| j.parcel.zone_summary.as_deref().map(str::to_lowercase))
            .collect(),
    ))?;
    table.push(Column::text(
        "year",
        obs.iter()
            .map(|o| o.date.as_deref().map(|d| d.chars().take(4).collect()))
            .collect(),
    ))?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| by_date(&obs[a].date, &obs[b].date));
    table.reorder_rows(&order);

    log::info!("fused {} row(s) x {} column(s)", table.n_rows(), table.n_cols());
    Ok(table)
}
