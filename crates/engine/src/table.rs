//! Column-oriented feature table.
//!
//! Every cell is optional; absence is a first-class state and renders as
//! [`MISSING`]. Once built, a table only grows by whole columns. The single
//! in-place edit is [`Table::fill_missing`], which touches absent cells only.

use crate::error::EngineError;

/// Literal written for any absent cell.
pub const MISSING: &str = "n/a";

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Integer(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Numeric view of the column. `None` for text columns.
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Self::Integer(v) => Some(v.iter().map(|x| x.map(|i| i as f64)).collect()),
            Self::Float(v) => Some(v.clone()),
            Self::Text(_) => None,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Integer(v) => v.get(row).map_or(true, Option::is_none),
            Self::Float(v) => v.get(row).map_or(true, Option::is_none),
            Self::Text(v) => v.get(row).map_or(true, Option::is_none),
        }
    }

    /// Render one cell for flat output.
    pub fn render(&self, row: usize) -> String {
        let rendered = match self {
            Self::Integer(v) => v.get(row).copied().flatten().map(|i| i.to_string()),
            Self::Float(v) => v.get(row).copied().flatten().map(|f| f.to_string()),
            Self::Text(v) => v.get(row).cloned().flatten(),
        };
        rendered.unwrap_or_else(|| MISSING.to_string())
    }

    fn reordered(&self, order: &[usize]) -> Self {
        fn pick<T: Clone>(values: &[T], order: &[usize]) -> Vec<T> {
            order.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Self::Integer(v) => Self::Integer(pick(v, order)),
            Self::Float(v) => Self::Float(pick(v, order)),
            Self::Text(v) => Self::Text(pick(v, order)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn integer(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Integer(values),
        }
    }

    /// Float column. NaN is stored as absent.
    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|f| !f.is_nan()))
            .collect();
        Self {
            name: name.into(),
            data: ColumnData::Float(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Empty table with a fixed row count; columns are pushed afterwards.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append a column. Names are unique and lengths must match the row count.
    pub fn push(&mut self, column: Column) -> Result<(), EngineError> {
        if self.contains(&column.name) {
            return Err(EngineError::DuplicateColumn(column.name));
        }
        let got = column.len();
        if got != self.rows {
            return Err(EngineError::ColumnLength {
                column: column.name,
                expected: self.rows,
                got,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Text values of a column.
    pub fn text(&self, name: &str) -> Result<&[Option<String>], EngineError> {
        let column = self
            .column(name)
            .ok_or_else(|| EngineError::MissingColumn(name.to_string()))?;
        match &column.data {
            ColumnData::Text(values) => Ok(values),
            _ => Err(EngineError::NotText(name.to_string())),
        }
    }

    /// Replace absent cells of a text column with `value`. Returns the number of cells filled.
    pub fn fill_missing(&mut self, name: &str, value: &str) -> Result<usize, EngineError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EngineError::MissingColumn(name.to_string()))?;
        let ColumnData::Text(values) = &mut column.data else {
            return Err(EngineError::NotText(name.to_string()));
        };

        let mut filled = 0;
        for cell in values.iter_mut().filter(|c| c.is_none()) {
            *cell = Some(value.to_string());
            filled += 1;
        }
        Ok(filled)
    }

    /// Permute rows: new row `i` is old row `order[i]`.
    ///
    /// `order` must be a permutation of `0..n_rows`.
    pub fn reorder_rows(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.rows);
        for column in &mut self.columns {
            column.data = column.data.reordered(order);
        }
    }

    /// Rendered rows, missing cells as [`MISSING`].
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        (0..self.rows).map(move |row| self.columns.iter().map(|c| c.data.render(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::with_rows(3);
        t.push(Column::integer("n", vec![Some(1), None, Some(3)])).unwrap();
        t.push(Column::text("label", vec![Some("a".into()), None, Some("c".into())]))
            .unwrap();
        t
    }

    #[test]
    fn push_rejects_duplicate_name() {
        let mut t = sample();
        let err = t.push(Column::integer("n", vec![None, None, None])).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateColumn(ref n) if n == "n"));
    }

    #[test]
    fn push_rejects_wrong_length() {
        let mut t = sample();
        let err = t.push(Column::float("x", vec![Some(1.0)])).unwrap_err();
        assert!(matches!(err, EngineError::ColumnLength { expected: 3, got: 1, .. }));
    }

    #[test]
    fn missing_renders_sentinel() {
        let t = sample();
        let rows: Vec<Vec<String>> = t.rendered_rows().collect();
        assert_eq!(rows[1], vec!["n/a".to_string(), "n/a".to_string()]);
        assert_eq!(rows[2], vec!["3".to_string(), "c".to_string()]);
    }

    #[test]
    fn float_nan_is_missing() {
        let c = Column::float("f", vec![Some(f64::NAN), Some(0.5)]);
        assert!(c.data.is_missing(0));
        assert_eq!(c.data.render(1), "0.5");
    }

    #[test]
    fn fill_missing_only_touches_absent_cells() {
        let mut t = sample();
        let filled = t.fill_missing("label", "none").unwrap();
        assert_eq!(filled, 1);
        assert_eq!(
            t.text("label").unwrap(),
            &[Some("a".to_string()), Some("none".to_string()), Some("c".to_string())]
        );
    }

    #[test]
    fn fill_missing_rejects_numeric() {
        let mut t = sample();
        assert!(matches!(t.fill_missing("n", "x"), Err(EngineError::NotText(_))));
    }

    #[test]
    fn reorder_moves_every_column() {
        let mut t = sample();
        t.reorder_rows(&[2, 0, 1]);
        let rows: Vec<Vec<String>> = t.rendered_rows().collect();
        assert_eq!(rows[0], vec!["3", "c"]);
        assert_eq!(rows[1], vec!["1", "a"]);
        assert_eq!(rows[2], vec!["n/a", "n/a"]);
    }
}
