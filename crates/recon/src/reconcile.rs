//! Maximal consistent subset of the three sources.
//!
//! Two passes: observations are filtered against the keys the other sources
//! share with them, then the key sets are recomputed from the surviving
//! observations and the parcel and image sources are filtered once, last.
//! After that no observation points at a missing parcel or image, and no
//! parcel or image is left without an observation.

use std::collections::HashSet;

use streetscape_engine::ParcelId;

use crate::model::{ReconInput, ReconOutput, ReconSummary, SourceCounts};

pub fn reconcile(input: ReconInput) -> ReconOutput {
    let ReconInput {
        parcels,
        observations,
        images,
    } = input;

    let mut unparseable = 0usize;
    let obs_keys: Vec<Option<ParcelId>> = observations
        .iter()
        .map(|o| {
            let id = o.parcel_id();
            if id.is_none() {
                unparseable += 1;
                log::debug!(
                    "observation '{}': parcel key '{}' is not an integer, skipped",
                    o.image_name,
                    o.parcel
                );
            }
            id
        })
        .collect();
    if unparseable > 0 {
        log::warn!("{unparseable} observation(s) with a non-integer parcel key");
    }

    // Pass 1: keys shared between the survey and each other source.
    let geo_parcels: HashSet<ParcelId> = parcels.iter().map(|p| p.parcel_id).collect();
    let img_names: HashSet<&str> = images.iter().map(|i| i.image_name.as_str()).collect();
    let common_parcels: HashSet<ParcelId> = obs_keys
        .iter()
        .flatten()
        .filter(|id| geo_parcels.contains(id))
        .copied()
        .collect();
    let common_images: HashSet<&str> = observations
        .iter()
        .map(|o| o.image_name.as_str())
        .filter(|name| img_names.contains(name))
        .collect();

    let keep: Vec<bool> = observations
        .iter()
        .zip(&obs_keys)
        .map(|(o, id)| {
            id.is_some_and(|id| common_parcels.contains(&id))
                && common_images.contains(o.image_name.as_str())
        })
        .collect();

    // Pass 2: recompute from survivors, then filter the other sources.
    let kept_parcels: HashSet<ParcelId> = obs_keys
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .filter_map(|(id, _)| *id)
        .collect();
    let kept_images: HashSet<String> = observations
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(o, _)| o.image_name.clone())
        .collect();

    let summary_counts = (parcels.len(), observations.len(), images.len());

    let observations: Vec<_> = observations
        .into_iter()
        .zip(keep)
        .filter_map(|(o, k)| k.then_some(o))
        .collect();
    let parcels: Vec<_> = parcels
        .into_iter()
        .filter(|p| kept_parcels.contains(&p.parcel_id))
        .collect();
    let images: Vec<_> = images
        .into_iter()
        .filter(|i| kept_images.contains(&i.image_name))
        .collect();

    let summary = ReconSummary {
        parcels: SourceCounts {
            input: summary_counts.0,
            kept: parcels.len(),
        },
        observations: SourceCounts {
            input: summary_counts.1,
            kept: observations.len(),
        },
        images: SourceCounts {
            input: summary_counts.2,
            kept: images.len(),
        },
        unparseable_parcel_keys: unparseable,
    };

    if summary.is_empty() {
        log::warn!("reconciliation matched no observations");
    } else {
        log::info!(
            "reconciled {} of {} observation(s), {} of {} parcel record(s), {} of {} image(s)",
            summary.observations.kept,
            summary.observations.input,
            summary.parcels.kept,
            summary.parcels.input,
            summary.images.kept,
            summary.images.input,
        );
    }

    ReconOutput {
        parcels,
        observations,
        images,
        summary,
    }
}
