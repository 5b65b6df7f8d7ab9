use streetscape_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },
    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
    /// Malformed CSV (bad quoting, ragged rows, etc.).
    #[error("{source_name}: CSV error: {message}")]
    Csv { source_name: String, message: String },
    /// Required column absent from a source's header.
    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },
    /// Non-numeric text in a numeric column.
    #[error("{source_name}, row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        source_name: String,
        row: usize,
        column: String,
        value: String,
    },
    /// Word-vector file not in the expected word2vec layout.
    #[error("word vectors {path}, entry {entry}: {message}")]
    VectorFormat {
        path: String,
        entry: usize,
        message: String,
    },
    /// HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
