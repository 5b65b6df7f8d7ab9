//! Log-normal z-score binning of numeric feature columns.
//!
//! Each numeric column `x` gets a companion `x_bin` text column:
//!
//! 1. `ln(x)`; zero maps to `-inf`, negative and absent values to absent.
//! 2. mean and sample standard deviation over the *finite* logs only.
//! 3. `z = (ln(x) - mean) / std`.
//! 4. `z` is cut at fixed points into six ordinal bins; absent `z` is `n/a`.
//!
//! The cut points are shared by every column, so the labels mean the same
//! thing whatever the column's scale. The wide `med` bin `(-1, 1]` takes the
//! bulk of near-average observations.
//!
//! A column with fewer than two finite logs or zero spread has no usable
//! statistics; raw zeros in it still bin to `none` and everything else to
//! `n/a`.

use std::fmt;

use crate::error::EngineError;
use crate::table::{Column, ColumnData, Table};

/// Suffix of the companion column.
pub const BIN_SUFFIX: &str = "_bin";

/// Identifier-like columns that are numeric but never binned.
pub const DEFAULT_EXCLUDED: [&str; 3] = ["parcel", "block", "year"];

/// Ordinal bin. Variant order is the canonical sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bin {
    Missing,
    None,
    VeryLow,
    Low,
    Med,
    High,
    VeryHigh,
}

impl Bin {
    /// Every bin, in canonical order.
    pub const ORDER: [Bin; 7] = [
        Bin::Missing,
        Bin::None,
        Bin::VeryLow,
        Bin::Low,
        Bin::Med,
        Bin::High,
        Bin::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "n/a",
            Self::None => "none",
            Self::VeryLow => "very low",
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|b| b.label() == label)
    }

    /// Cut a z-score: `(-inf, -100) none`, `[-100, -3] very low`,
    /// `(-3, -1] low`, `(-1, 1] med`, `(1, 3] high`, `(3, inf) very high`.
    pub fn from_zscore(z: Option<f64>) -> Self {
        match z {
            None => Self::Missing,
            Some(z) if z.is_nan() => Self::Missing,
            Some(z) if z < -100.0 => Self::None,
            Some(z) if z <= -3.0 => Self::VeryLow,
            Some(z) if z <= -1.0 => Self::Low,
            Some(z) if z <= 1.0 => Self::Med,
            Some(z) if z <= 3.0 => Self::High,
            Some(_) => Self::VeryHigh,
        }
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogStats {
    pub mean: f64,
    pub std: f64,
}

fn ln_value(value: Option<f64>) -> Option<f64> {
    match value {
        Some(x) if x == 0.0 => Some(f64::NEG_INFINITY),
        Some(x) if x > 0.0 => Some(x.ln()),
        _ => None,
    }
}

/// Mean and sample standard deviation of the finite logs.
///
/// `None` when there are fewer than two finite logs or the spread is zero.
pub fn log_stats(logs: &[Option<f64>]) -> Option<LogStats> {
    let finite: Vec<f64> = logs.iter().flatten().copied().filter(|l| l.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std > 0.0 && std.is_finite() {
        Some(LogStats { mean, std })
    } else {
        None
    }
}

/// Log-space z-scores; `ln(0)` stays `-inf`.
///
/// Without usable statistics every value is `None` except raw zeros,
/// which keep `-inf` so they still bin to `none`.
pub fn log_zscores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let logs: Vec<Option<f64>> = values.iter().map(|v| ln_value(*v)).collect();
    let Some(stats) = log_stats(&logs) else {
        return logs
            .into_iter()
            .map(|l| l.filter(|l| *l == f64::NEG_INFINITY))
            .collect();
    };
    logs.iter()
        .map(|l| l.map(|l| (l - stats.mean) / stats.std))
        .collect()
}

/// Bin a numeric column.
pub fn bin_values(values: &[Option<f64>]) -> Vec<Bin> {
    log_zscores(values).into_iter().map(Bin::from_zscore).collect()
}

// ---------------------------------------------------------------------------
// Table integration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BinningOptions {
    pub exclude: Vec<String>,
}

impl Default for BinningOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Names of the binned columns, in table order.
///
/// Renders as the side table listing the canonical label order per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinOrdering {
    pub columns: Vec<String>,
}

impl BinOrdering {
    pub fn to_table(&self) -> Table {
        let mut table = Table::with_rows(Bin::ORDER.len());
        for name in &self.columns {
            let labels = Bin::ORDER.iter().map(|b| Some(b.label().to_string())).collect();
            // Names come from distinct table columns, so push cannot collide.
            let _ = table.push(Column::text(name.clone(), labels));
        }
        table
    }
}

pub fn bin_column_name(column: &str) -> String {
    format!("{column}{BIN_SUFFIX}")
}

/// Append `<col>_bin` for every numeric, non-excluded column.
pub fn add_bins(table: &mut Table, options: &BinningOptions) -> Result<BinOrdering, EngineError> {
    let targets: Vec<(String, Vec<Option<f64>>)> = table
        .columns()
        .iter()
        .filter(|c| c.data.is_numeric() && !options.exclude.iter().any(|e| e == &c.name))
        .filter_map(|c| c.data.to_f64().map(|v| (c.name.clone(), v)))
        .collect();

    let mut ordering = BinOrdering::default();
    for (name, values) in targets {
        let bins = bin_values(&values);
        let missing = bins.iter().filter(|b| **b == Bin::Missing).count();
        log::debug!("binned '{name}': {missing}/{} n/a", bins.len());

        let bin_name = bin_column_name(&name);
        let labels = bins.iter().map(|b| Some(b.label().to_string())).collect();
        table.push(Column::text(bin_name.clone(), labels))?;
        ordering.columns.push(bin_name);
    }

    log::info!("binned {} numeric column(s)", ordering.columns.len());
    Ok(ordering)
}

/// Text view of a bin column back as [`Bin`] values.
pub fn parse_bins(column: &Column) -> Option<Vec<Bin>> {
    match &column.data {
        ColumnData::Text(values) => values
            .iter()
            .map(|v| match v {
                Some(label) => Bin::from_label(label),
                None => Some(Bin::Missing),
            })
            .collect(),
        _ => None,
    }
}
