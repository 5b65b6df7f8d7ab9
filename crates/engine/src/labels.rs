//! Human-readable phrases for ordinal bins, for dashboard use.
//!
//! Every phrase column is derived from a `<feature>_bin` column through a
//! fixed lookup table. Labels a table does not mention pass through
//! unchanged, so `n/a` stays `n/a` except where a table says otherwise.

use chrono::{NaiveDate, NaiveDateTime};

use crate::binning::{bin_column_name, Bin};
use crate::error::EngineError;
use crate::similarity::similarity_column_name;
use crate::table::{Column, Table};

/// Bin → phrase. Only the listed bins are rewritten.
pub type PhraseTable = [(Bin, &'static str)];

pub struct LabelRule {
    pub feature: &'static str,
    pub output: &'static str,
    pub phrases: &'static PhraseTable,
}

const EN_TEXT: &PhraseTable = &[
    (Bin::None, "no en. text"),
    (Bin::VeryLow, "very little en. text"),
    (Bin::Low, "little en. text"),
    (Bin::Med, "some en. text"),
    (Bin::High, "much en. text"),
    (Bin::VeryHigh, "very much en. text"),
];

const ES_TEXT: &PhraseTable = &[
    (Bin::None, "no es. text"),
    (Bin::VeryLow, "very little es. text"),
    (Bin::Low, "little es. text"),
    (Bin::Med, "some es. text"),
    (Bin::High, "much es. text"),
    (Bin::VeryHigh, "very much es. text"),
];

const ESTABLISHMENTS: &PhraseTable = &[
    (Bin::None, "no establishments"),
    (Bin::VeryLow, "very few establishments"),
    (Bin::Low, "few establishments"),
    (Bin::Med, "some establishments"),
    (Bin::High, "many establishments"),
    (Bin::VeryHigh, "very many establishments"),
];

const BUSINESSES: &PhraseTable = &[
    (Bin::None, "no businesses"),
    (Bin::VeryLow, "very few businesses"),
    (Bin::Low, "few businesses"),
    (Bin::Med, "some businesses"),
    (Bin::High, "many businesses"),
    (Bin::VeryHigh, "very many businesses"),
];

const ADS: &PhraseTable = &[
    (Bin::None, "no ads"),
    (Bin::VeryLow, "very few ads"),
    (Bin::Low, "few ads"),
    (Bin::Med, "some ads"),
    (Bin::High, "many ads"),
    (Bin::VeryHigh, "very many ads"),
];

const COLORFULNESS: &PhraseTable = &[
    (Bin::None, "not colorful at all"),
    (Bin::VeryLow, "not colorful"),
    (Bin::Low, "not too colorful"),
    (Bin::Med, "somewhat colorful"),
    (Bin::High, "colorful"),
    (Bin::VeryHigh, "very colorful"),
];

const GREENNESS: &PhraseTable = &[
    (Bin::None, "no greenery"),
    (Bin::VeryLow, "very little greenery"),
    (Bin::Low, "little greenery"),
    (Bin::Med, "some greenery"),
    (Bin::High, "much greenery"),
    (Bin::VeryHigh, "very much greenery"),
];

pub const LABEL_RULES: [LabelRule; 7] = [
    LabelRule { feature: "text_en_len", output: "Amount of en. text", phrases: EN_TEXT },
    LabelRule { feature: "text_es_len", output: "Amount of es. text", phrases: ES_TEXT },
    LabelRule { feature: "n_establishments", output: "Amount of establishments", phrases: ESTABLISHMENTS },
    LabelRule { feature: "n_businesses", output: "Amount of businesses", phrases: BUSINESSES },
    LabelRule { feature: "n_ads", output: "Amount of ads", phrases: ADS },
    LabelRule { feature: "colorfulness", output: "Colorfulness", phrases: COLORFULNESS },
    LabelRule { feature: "greenery_per", output: "Greenness", phrases: GREENNESS },
];

/// Fallback phrases for categorical columns left empty after fusing.
pub const FALLBACKS: [(&str, &str); 4] = [
    ("main_open_space", "not an open space"),
    ("main_street_art", "none"),
    ("main_establishment", "none"),
    ("parcel_designation", "not specified"),
];

pub const NO_TEXT: &str = "no text";
pub const DATE_FORMATTED: &str = "date_formatted";

// ---------------------------------------------------------------------------
// Phrase mapping
// ---------------------------------------------------------------------------

fn rephrase(label: Option<&str>, phrases: &PhraseTable) -> Option<String> {
    let label = label?;
    let phrase = Bin::from_label(label)
        .and_then(|bin| phrases.iter().find(|(b, _)| *b == bin))
        .map_or(label, |(_, p)| *p);
    Some(phrase.to_string())
}

fn closeness_phrases(concept: &str) -> Vec<(Bin, String)> {
    let w = format!("\"{concept}\"");
    vec![
        (Bin::VeryLow, format!("very far from {w}")),
        (Bin::Low, format!("far from {w}")),
        (Bin::Med, format!("somewhat close to {w}")),
        (Bin::High, format!("close to {w}")),
        (Bin::VeryHigh, format!("very close to {w}")),
    ]
}

pub fn closeness_column_name(concept: &str) -> String {
    format!("Text closeness to \"{concept}\"")
}

/// Closeness phrase for one similarity bin label; `n/a` means the row had no text.
pub fn closeness_phrase(label: Option<&str>, concept: &str) -> String {
    match label.and_then(Bin::from_label) {
        None | Some(Bin::Missing) => NO_TEXT.to_string(),
        Some(bin) => closeness_phrases(concept)
            .into_iter()
            .find(|(b, _)| *b == bin)
            .map_or_else(|| bin.label().to_string(), |(_, p)| p),
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
}

/// `"2019-03-14"` → `"Mar 2019"`; unparseable dates are absent.
pub fn format_date(raw: Option<&str>) -> Option<String> {
    parse_date(raw?).map(|d| d.format("%b %Y").to_string())
}

// ---------------------------------------------------------------------------
// Table pass
// ---------------------------------------------------------------------------

/// Add `date_formatted`, the phrase columns and the closeness columns, then
/// fill the categorical fallbacks. Requires every referenced bin column.
pub fn humanize(table: &mut Table, concepts: &[String]) -> Result<(), EngineError> {
    let dates: Vec<Option<String>> = table.text("date")?.iter().map(|d| format_date(d.as_deref())).collect();
    table.push(Column::text(DATE_FORMATTED, dates))?;

    for rule in &LABEL_RULES {
        let phrases: Vec<Option<String>> = table
            .text(&bin_column_name(rule.feature))?
            .iter()
            .map(|l| rephrase(l.as_deref(), rule.phrases))
            .collect();
        table.push(Column::text(rule.output, phrases))?;
    }

    for concept in concepts {
        let source = bin_column_name(&similarity_column_name(concept));
        let phrases: Vec<Option<String>> = table
            .text(&source)?
            .iter()
            .map(|l| Some(closeness_phrase(l.as_deref(), concept)))
            .collect();
        table.push(Column::text(closeness_column_name(concept), phrases))?;
    }

    for (column, fallback) in FALLBACKS {
        let filled = table.fill_missing(column, fallback)?;
        log::debug!("filled {filled} empty '{column}' cell(s) with '{fallback}'");
    }

    log::info!(
        "added {} label column(s)",
        1 + LABEL_RULES.len() + concepts.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_col(name: &str, labels: &[&str]) -> Column {
        Column::text(name, labels.iter().map(|l| Some(l.to_string())).collect())
    }

    fn binned_table() -> Table {
        let mut t = Table::with_rows(2);
        t.push(Column::text("date", vec![Some("2019-03-14".into()), Some("garbage".into())]))
            .unwrap();
        for rule in &LABEL_RULES {
            t.push(label_col(&bin_column_name(rule.feature), &["very low", "n/a"]))
                .unwrap();
        }
        t.push(label_col("liquor_SES_bin", &["high", "n/a"])).unwrap();
        t.push(Column::text("main_open_space", vec![None, Some("park".into())]))
            .unwrap();
        t.push(Column::text("main_street_art", vec![None, None])).unwrap();
        t.push(Column::text("main_establishment", vec![Some("salon".into()), None]))
            .unwrap();
        t.push(Column::text("parcel_designation", vec![None, Some("commercial".into())]))
            .unwrap();
        t
    }

    #[test]
    fn phrase_lookup_passes_unknown_labels() {
        assert_eq!(rephrase(Some("med"), ADS).as_deref(), Some("some ads"));
        assert_eq!(rephrase(Some("n/a"), ADS).as_deref(), Some("n/a"));
        assert_eq!(rephrase(Some("weird"), ADS).as_deref(), Some("weird"));
        assert_eq!(rephrase(None, ADS), None);
        assert_eq!(rephrase(Some("low"), GREENNESS).as_deref(), Some("little greenery"));
    }

    #[test]
    fn closeness_phrases_and_no_text() {
        assert_eq!(closeness_phrase(Some("very high"), "food"), "very close to \"food\"");
        assert_eq!(closeness_phrase(Some("low"), "car"), "far from \"car\"");
        assert_eq!(closeness_phrase(Some("n/a"), "car"), "no text");
        assert_eq!(closeness_phrase(None, "car"), "no text");
        assert_eq!(closeness_phrase(Some("none"), "car"), "none");
    }

    #[test]
    fn dates_render_month_year() {
        assert_eq!(format_date(Some("2019-03-14")).as_deref(), Some("Mar 2019"));
        assert_eq!(format_date(Some("2020-11-02 08:15:00")).as_deref(), Some("Nov 2020"));
        assert_eq!(format_date(Some("2018-07")).as_deref(), Some("Jul 2018"));
        assert_eq!(format_date(Some("n/a")), None);
        assert_eq!(format_date(None), None);
    }

    #[test]
    fn humanize_adds_columns_and_fallbacks() {
        let mut t = binned_table();
        humanize(&mut t, &["liquor".to_string()]).unwrap();

        let dates = t.text(DATE_FORMATTED).unwrap();
        assert_eq!(dates[0].as_deref(), Some("Mar 2019"));
        assert_eq!(dates[1], None);

        let ads = t.text("Amount of ads").unwrap();
        assert_eq!(ads[0].as_deref(), Some("very few ads"));
        assert_eq!(ads[1].as_deref(), Some("n/a"));

        let color = t.text("Colorfulness").unwrap();
        assert_eq!(color[0].as_deref(), Some("not colorful"));

        let close = t.text("Text closeness to \"liquor\"").unwrap();
        assert_eq!(close[0].as_deref(), Some("close to \"liquor\""));
        assert_eq!(close[1].as_deref(), Some("no text"));

        let open = t.text("main_open_space").unwrap();
        assert_eq!(open[0].as_deref(), Some("not an open space"));
        assert_eq!(open[1].as_deref(), Some("park"));
        assert_eq!(t.text("main_establishment").unwrap()[0].as_deref(), Some("salon"));
        assert_eq!(t.text("parcel_designation").unwrap()[0].as_deref(), Some("not specified"));
        assert_eq!(t.text("main_street_art").unwrap()[1].as_deref(), Some("none"));
    }

    #[test]
    fn missing_bin_column_is_an_error() {
        let mut t = binned_table();
        let err = humanize(&mut t, &["food".to_string()]).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn(ref c) if c == "food_SES_bin"));
    }
}
