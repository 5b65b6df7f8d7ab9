// Embedding-projector artifacts: metadata.tsv, vectors.tsv, projector_config.pbtxt

use std::fs;
use std::path::{Path, PathBuf};

use streetscape_engine::WordVectors;

use crate::error::IoError;

pub const METADATA_FILE: &str = "metadata.tsv";
pub const VECTORS_FILE: &str = "vectors.tsv";
pub const CONFIG_FILE: &str = "projector_config.pbtxt";

/// Write the projector files for `words` (in the given order) into `dir`.
///
/// Words without a vector are skipped in both TSVs so the rows stay aligned.
pub fn write_projector(dir: &Path, words: &[String], vectors: &WordVectors) -> Result<Vec<PathBuf>, IoError> {
    let write = |name: &str, content: String| -> Result<PathBuf, IoError> {
        let path = dir.join(name);
        fs::write(&path, content).map_err(|e| IoError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(path)
    };

    fs::create_dir_all(dir).map_err(|e| IoError::Write {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut metadata = Vec::with_capacity(words.len());
    let mut rows = Vec::with_capacity(words.len());
    for word in words {
        let Some(v) = vectors.get(word) else {
            continue;
        };
        metadata.push(word.as_str());
        rows.push(v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join("\t"));
    }

    let config = format!(
        "embeddings {{\n  tensor_name: \"word_embedding\"\n  tensor_path: \"{VECTORS_FILE}\"\n  metadata_path: \"{METADATA_FILE}\"\n}}\n"
    );

    let files = vec![
        write(METADATA_FILE, metadata.join("\n"))?,
        write(VECTORS_FILE, rows.join("\n"))?,
        write(CONFIG_FILE, config)?,
    ];
    log::info!("wrote projector files for {} word(s) to {}", metadata.len(), dir.display());
    Ok(files)
}
