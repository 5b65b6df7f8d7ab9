use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A column with this name is already present in the table.
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
    /// Column length does not match the table's row count.
    #[error("column '{column}' has {got} row(s), table has {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        got: usize,
    },
    /// A required column is absent.
    #[error("missing column '{0}'")]
    MissingColumn(String),
    /// Column exists but holds numbers where text was required.
    #[error("column '{0}' is not a text column")]
    NotText(String),
    /// A reference concept has no vector.
    #[error("concept word '{0}' is not in the word-vector vocabulary")]
    ConceptNotInVocabulary(String),
    /// A vector's length differs from the table's dimensionality.
    #[error("vector for '{word}' has {got} dimension(s), expected {expected}")]
    DimensionMismatch {
        word: String,
        expected: usize,
        got: usize,
    },
    /// Word-vector table has no entries.
    #[error("word-vector table is empty")]
    EmptyVocabulary,
}
