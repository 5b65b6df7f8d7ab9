//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: batch scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Invalid pipeline config                              |
//! | 4    | Input error (unreadable or malformed source CSV)     |
//! | 5    | Word vectors failed to load, or a concept is unknown |
//! | 6    | Pipeline contract violation (join / table invariant) |
//! | 7    | Output could not be written                          |

use streetscape_cli::pipeline::PipelineError;
use streetscape_engine::EngineError;
use streetscape_io::IoError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, or an `--output`
/// that would clobber the config. clap exits with this code on its own.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse, validate, or expand a path.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A source CSV is missing, unreadable, lacks a required column, or holds
/// a non-numeric value in a numeric column.
pub const EXIT_INPUT: u8 = 4;

/// Word-vector file unreadable or malformed, or a reference concept has no
/// vector.
pub const EXIT_WORD_VECTORS: u8 = 5;

/// Reconciliation left a dangling key, or a table invariant broke.
pub const EXIT_CONTRACT: u8 = 6;

/// An output file or directory could not be written.
pub const EXIT_OUTPUT: u8 = 7;

/// Map a pipeline error to its exit code.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Config(_) => EXIT_INVALID_CONFIG,
        PipelineError::WordVectors(_) => EXIT_WORD_VECTORS,
        PipelineError::Io(e) => io_exit_code(e),
        PipelineError::Recon(_) => EXIT_CONTRACT,
        PipelineError::Engine(e) => engine_exit_code(e),
    }
}

fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. }
        | IoError::Csv { .. }
        | IoError::MissingColumn { .. }
        | IoError::InvalidNumber { .. } => EXIT_INPUT,
        IoError::VectorFormat { .. } => EXIT_WORD_VECTORS,
        IoError::Write { .. } => EXIT_OUTPUT,
        IoError::HttpClient(_) => EXIT_INVALID_CONFIG,
        IoError::Engine(e) => engine_exit_code(e),
    }
}

fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::ConceptNotInVocabulary(_)
        | EngineError::DimensionMismatch { .. }
        | EngineError::EmptyVocabulary => EXIT_WORD_VECTORS,
        _ => EXIT_CONTRACT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streetscape_config::ConfigError;
    use streetscape_recon::ReconError;

    #[test]
    fn codes_by_error_kind() {
        let config = PipelineError::Config(ConfigError::Validation("x".into()));
        assert_eq!(pipeline_exit_code(&config), EXIT_INVALID_CONFIG);

        let missing = PipelineError::Io(IoError::MissingColumn {
            source_name: "parcels".into(),
            column: "parcel_id".into(),
        });
        assert_eq!(pipeline_exit_code(&missing), EXIT_INPUT);

        let write = PipelineError::Io(IoError::Write {
            path: "out".into(),
            message: "denied".into(),
        });
        assert_eq!(pipeline_exit_code(&write), EXIT_OUTPUT);

        let concept = PipelineError::Engine(EngineError::ConceptNotInVocabulary("bicycle".into()));
        assert_eq!(pipeline_exit_code(&concept), EXIT_WORD_VECTORS);

        let join = PipelineError::Recon(ReconError::EmptyJoin { observations: 3 });
        assert_eq!(pipeline_exit_code(&join), EXIT_CONTRACT);
    }
}
