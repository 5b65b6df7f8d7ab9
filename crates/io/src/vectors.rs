// word2vec text and binary readers

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use streetscape_config::EmbeddingFormat;
use streetscape_engine::{EngineError, WordVectors};

use crate::error::IoError;

/// Load a word-vector file. `limit` keeps only the first N entries.
pub fn load_word_vectors(
    path: &Path,
    format: EmbeddingFormat,
    limit: Option<usize>,
) -> Result<WordVectors, IoError> {
    let file = File::open(path).map_err(|e| IoError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let source = path.display().to_string();
    let vectors = match format {
        EmbeddingFormat::Text => read_text(reader, &source, limit)?,
        EmbeddingFormat::Binary => read_binary(reader, &source, limit)?,
    };
    log::info!(
        "loaded {} word vector(s) of dimension {} from {source}",
        vectors.len(),
        vectors.dim()
    );
    Ok(vectors)
}

fn format_err(source: &str, entry: usize, message: impl Into<String>) -> IoError {
    IoError::VectorFormat {
        path: source.to_string(),
        entry,
        message: message.into(),
    }
}

fn insert(table: &mut WordVectors, source: &str, entry: usize, word: String, values: Vec<f32>) -> Result<(), IoError> {
    table.insert(word, values).map_err(|e| match e {
        EngineError::DimensionMismatch { .. } => format_err(source, entry, e.to_string()),
        other => IoError::Engine(other),
    })
}

/// Text layout: optional `<count> <dim>` header, then `word v1 .. vdim` per line.
pub fn read_text(reader: impl BufRead, source: &str, limit: Option<usize>) -> Result<WordVectors, IoError> {
    let mut table: Option<WordVectors> = None;
    let mut entries = 0usize;

    for (i, line) in reader.lines().enumerate() {
        if limit.is_some_and(|l| entries >= l) {
            break;
        }
        let line = line.map_err(|e| IoError::Read {
            path: source.to_string(),
            message: e.to_string(),
        })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if i == 0 && tokens.len() == 2 {
            if let (Ok(_count), Ok(dim)) = (tokens[0].parse::<usize>(), tokens[1].parse::<usize>()) {
                table = Some(WordVectors::new(dim));
                continue;
            }
        }

        let entry = entries + 1;
        let values = tokens[1..]
            .iter()
            .map(|t| t.parse::<f32>())
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|e| format_err(source, entry, format!("bad component for '{}': {e}", tokens[0])))?;
        let table = table.get_or_insert_with(|| WordVectors::new(values.len()));
        insert(table, source, entry, tokens[0].to_string(), values)?;
        entries += 1;
    }

    match table {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(IoError::Engine(EngineError::EmptyVocabulary)),
    }
}

/// Binary layout: `<count> <dim>\n`, then per entry `word<space>` and `dim`
/// little-endian `f32`s, optionally followed by a newline.
pub fn read_binary(mut reader: impl BufRead, source: &str, limit: Option<usize>) -> Result<WordVectors, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: source.to_string(),
        message: e.to_string(),
    };

    let mut header = String::new();
    reader.read_line(&mut header).map_err(read_err)?;
    let mut parts = header.split_whitespace().map(str::parse::<usize>);
    let (count, dim) = match (parts.next(), parts.next()) {
        (Some(Ok(count)), Some(Ok(dim))) if dim > 0 => (count, dim),
        _ => return Err(format_err(source, 0, format!("bad header '{}'", header.trim()))),
    };

    let wanted = limit.map_or(count, |l| l.min(count));
    let mut table = WordVectors::new(dim);
    let mut word_buf = Vec::new();
    let mut vec_buf = vec![0u8; dim * 4];

    for entry in 1..=wanted {
        word_buf.clear();
        let n = reader.read_until(b' ', &mut word_buf).map_err(read_err)?;
        if n == 0 {
            return Err(format_err(source, entry, format!("file ends after {} of {count} entries", entry - 1)));
        }
        let word_bytes: &[u8] = {
            let start = word_buf.iter().position(|b| *b != b'\n').unwrap_or(word_buf.len());
            let end = word_buf.len() - usize::from(word_buf.last() == Some(&b' '));
            &word_buf[start.min(end)..end]
        };
        let word = String::from_utf8_lossy(word_bytes).into_owned();

        reader
            .read_exact(&mut vec_buf)
            .map_err(|e| format_err(source, entry, format!("truncated vector for '{word}': {e}")))?;
        let values: Vec<f32> = vec_buf
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        insert(&mut table, source, entry, word, values)?;
    }

    if table.is_empty() {
        return Err(IoError::Engine(EngineError::EmptyVocabulary));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn text_with_header() {
        let data = "3 2\nliquor 1.0 0.5\nfood -0.25 2\n\nstore 0 1e-3\n";
        let wv = read_text(Cursor::new(data), "mem", None).unwrap();
        assert_eq!(wv.dim(), 2);
        assert_eq!(wv.len(), 3);
        assert_eq!(wv.get("food"), Some(&[-0.25f32, 2.0][..]));
        assert_eq!(wv.words()[0], "liquor");
    }

    #[test]
    fn text_without_header_and_limit() {
        let data = "a 1 2 3\nb 4 5 6\nc 7 8 9\n";
        let wv = read_text(Cursor::new(data), "mem", Some(2)).unwrap();
        assert_eq!(wv.dim(), 3);
        assert_eq!(wv.len(), 2);
        assert!(!wv.contains("c"));
    }

    #[test]
    fn text_rejects_bad_rows() {
        let err = read_text(Cursor::new("a 1 2\nb 1 x\n"), "mem", None).unwrap_err();
        assert!(matches!(err, IoError::VectorFormat { entry: 2, .. }));

        let err = read_text(Cursor::new("2 2\na 1 2\nb 1 2 3\n"), "mem", None).unwrap_err();
        assert!(matches!(err, IoError::VectorFormat { entry: 2, .. }));

        let err = read_text(Cursor::new("\n\n"), "mem", None).unwrap_err();
        assert!(matches!(err, IoError::Engine(EngineError::EmptyVocabulary)));
    }

    fn binary_fixture(entries: &[(&str, [f32; 2])]) -> Vec<u8> {
        let mut data = format!("{} 2\n", entries.len()).into_bytes();
        for (word, v) in entries {
            data.extend_from_slice(word.as_bytes());
            data.push(b' ');
            for x in v {
                data.extend_from_slice(&x.to_le_bytes());
            }
            data.push(b'\n');
        }
        data
    }

    #[test]
    fn binary_layout() {
        let data = binary_fixture(&[("park", [1.0, -2.0]), ("tree", [0.5, 0.25])]);
        let wv = read_binary(Cursor::new(data), "mem", None).unwrap();
        assert_eq!(wv.len(), 2);
        assert_eq!(wv.get("tree"), Some(&[0.5f32, 0.25][..]));
        assert_eq!(wv.get("park"), Some(&[1.0f32, -2.0][..]));
    }

    #[test]
    fn binary_truncated() {
        let mut data = binary_fixture(&[("park", [1.0, -2.0]), ("tree", [0.5, 0.25])]);
        data.truncate(data.len() - 6);
        let err = read_binary(Cursor::new(data), "mem", None).unwrap_err();
        assert!(matches!(err, IoError::VectorFormat { entry: 2, .. }));

        let err = read_binary(Cursor::new(b"garbage\n".to_vec()), "mem", None).unwrap_err();
        assert!(matches!(err, IoError::VectorFormat { entry: 0, .. }));
    }

    #[test]
    fn missing_file() {
        let err = load_word_vectors(Path::new("/no/such/vectors.txt"), EmbeddingFormat::Text, None).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }
}
