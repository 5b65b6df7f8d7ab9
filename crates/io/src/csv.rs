// Source CSV loading and table export

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use streetscape_config::ParcelColumns;
use streetscape_engine::{ImageRecord, Observation, ParcelId, ParcelRecord, Table};

use crate::error::IoError;

/// Survey columns with a dedicated [`Observation`] field. Everything else is pass-through.
const OBSERVATION_FIELDS: [&str; 10] = [
    "parcel",
    "image_name",
    "date",
    "text_en",
    "text_es",
    "open_space_kind",
    "street_art",
    "establishment_kind",
    "business_name",
    "ad_product",
];

/// Read file and convert to UTF-8 if needed (survey exports are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Header-indexed reader
// ---------------------------------------------------------------------------

struct Rows {
    source_name: &'static str,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl Rows {
    fn parse(source_name: &'static str, csv_data: &str) -> Result<Self, IoError> {
        let csv_err = |e: csv::Error| IoError::Csv {
            source_name: source_name.into(),
            message: e.to_string(),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.trim_start_matches('\u{feff}').as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        Ok(Self {
            source_name,
            headers,
            records,
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn idx(&self, name: &str) -> Result<usize, IoError> {
        self.position(name).ok_or_else(|| IoError::MissingColumn {
            source_name: self.source_name.into(),
            column: name.into(),
        })
    }
}

/// Empty cells are missing.
fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Numeric cell; empty, `nan` and `n/a` are missing.
fn number(
    rows: &Rows,
    record: &csv::StringRecord,
    row: usize,
    column: &str,
    idx: Option<usize>,
) -> Result<Option<f64>, IoError> {
    let Some(raw) = cell(record, idx) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("n/a") {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(IoError::InvalidNumber {
            source_name: rows.source_name.into(),
            row,
            column: column.into(),
            value: trimmed.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Parcel table. Rows whose id is not an integer are skipped with a warning.
pub fn load_parcels(csv_data: &str, columns: &ParcelColumns) -> Result<Vec<ParcelRecord>, IoError> {
    let rows = Rows::parse("parcels", csv_data)?;
    let id_idx = rows.idx(&columns.parcel_id)?;
    let area_idx = rows.position(&columns.area);
    let zone_idx = rows.position(&columns.zone_summary);
    let lat_idx = rows.position(&columns.lat);
    let lon_idx = rows.position(&columns.lon);

    let mut parcels = Vec::with_capacity(rows.records.len());
    let mut skipped = 0usize;
    for (i, record) in rows.records.iter().enumerate() {
        let row = i + 2;
        let Some(parcel_id) = cell(record, Some(id_idx)).and_then(|raw| ParcelId::parse(&raw)) else {
            skipped += 1;
            continue;
        };
        parcels.push(ParcelRecord {
            parcel_id,
            area: number(&rows, record, row, &columns.area, area_idx)?,
            zone_summary: cell(record, zone_idx),
            lat: number(&rows, record, row, &columns.lat, lat_idx)?,
            lon: number(&rows, record, row, &columns.lon, lon_idx)?,
        });
    }
    if skipped > 0 {
        log::warn!("parcels: skipped {skipped} row(s) without an integer '{}'", columns.parcel_id);
    }
    log::debug!("loaded {} parcel record(s)", parcels.len());
    Ok(parcels)
}

/// Survey table. `parcel` and `image_name` are required; the other known
/// fields may be absent, and unknown columns are carried as pass-through text.
pub fn load_observations(csv_data: &str) -> Result<Vec<Observation>, IoError> {
    let rows = Rows::parse("observations", csv_data)?;
    let parcel_idx = rows.idx("parcel")?;
    let image_idx = rows.idx("image_name")?;
    let at = |name: &str| rows.position(name);
    let (date, text_en, text_es) = (at("date"), at("text_en"), at("text_es"));
    let (open_space, street_art, establishment) =
        (at("open_space_kind"), at("street_art"), at("establishment_kind"));
    let (business, ads) = (at("business_name"), at("ad_product"));

    let extra_columns: Vec<(usize, &String)> = rows
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty() && !OBSERVATION_FIELDS.contains(&h.as_str()))
        .collect();

    let observations: Vec<Observation> = rows
        .records
        .iter()
        .map(|record| Observation {
            parcel: cell(record, Some(parcel_idx)).unwrap_or_default(),
            image_name: cell(record, Some(image_idx)).unwrap_or_default(),
            date: cell(record, date),
            text_en: cell(record, text_en),
            text_es: cell(record, text_es),
            open_space_kind: cell(record, open_space),
            street_art: cell(record, street_art),
            establishment_kind: cell(record, establishment),
            business_name: cell(record, business),
            ad_product: cell(record, ads),
            extra: extra_columns
                .iter()
                .map(|(i, name)| ((*name).clone(), cell(record, Some(*i))))
                .collect::<BTreeMap<_, _>>(),
            derived: Default::default(),
        })
        .collect();

    log::debug!(
        "loaded {} observation(s), {} pass-through column(s)",
        observations.len(),
        extra_columns.len()
    );
    Ok(observations)
}

/// Image feature table: `image_name`, `colorfulness`, optional `greenery_per`.
pub fn load_images(csv_data: &str) -> Result<Vec<ImageRecord>, IoError> {
    let rows = Rows::parse("images", csv_data)?;
    let name_idx = rows.idx("image_name")?;
    let color_idx = rows.idx("colorfulness")?;
    let green_idx = rows.position("greenery_per");

    let mut images = Vec::with_capacity(rows.records.len());
    for (i, record) in rows.records.iter().enumerate() {
        let row = i + 2;
        let Some(image_name) = cell(record, Some(name_idx)) else {
            continue;
        };
        images.push(ImageRecord {
            image_name,
            colorfulness: number(&rows, record, row, "colorfulness", Some(color_idx))?,
            greenery_per: number(&rows, record, row, "greenery_per", green_idx)?,
        });
    }
    log::debug!("loaded {} image record(s)", images.len());
    Ok(images)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write a table with a header row; missing cells as `n/a`.
pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.display().to_string(),
        message,
    };
    let mut writer = csv::Writer::from_path(path).map_err(|e| write_err(e.to_string()))?;
    writer.write_record(table.headers()).map_err(|e| write_err(e.to_string()))?;
    for row in table.rendered_rows() {
        writer.write_record(&row).map_err(|e| write_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| write_err(e.to_string()))?;
    log::debug!("wrote {} row(s) to {}", table.n_rows(), path.display());
    Ok(())
}
