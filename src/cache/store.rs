//! Compressed on-disk storage for the raw matrix.
//!
//! The artifact is a gzip stream around a bincode record. Writes go to a
//! temporary file in the cache directory which is renamed over the target
//! once complete, so a concurrent reader sees either the old artifact or
//! the new one, never a partial file.

use bincode::Options;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::defaults::MAX_COMPRESSION_LEVEL;
use crate::errors::{FetchError, FetchResult};
use crate::format::RawMatrix;

const ARTIFACT_VERSION: u32 = 1;

/// Upper bound for a decoded record; guards against corrupt length prefixes.
const MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct CachedMatrix {
    version: u32,
    rows: u64,
    cols: u64,
    values: Vec<f64>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_ARTIFACT_BYTES)
}

/// Persist `matrix` at `path` using gzip `level` (0 = none ... 9 = max).
///
/// The temporary file is removed on every failure path; the target is only
/// replaced after the stream has been fully written and synced.
///
/// # Errors
/// - [`FetchError::Configuration`] for a level above 9
/// - [`FetchError::Filesystem`] if the file cannot be created, written or renamed
pub fn save(matrix: &RawMatrix, path: &Path, level: u32) -> FetchResult<()> {
    if level > MAX_COMPRESSION_LEVEL {
        return Err(FetchError::configuration(format!(
            "compression level {level} is out of range 0..={MAX_COMPRESSION_LEVEL}"
        )));
    }

    let (rows, cols) = matrix.shape();
    let record = CachedMatrix {
        version: ARTIFACT_VERSION,
        rows: rows as u64,
        cols: cols as u64,
        values: matrix.values().iter().copied().collect(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(|e| FetchError::filesystem(dir, e))?;

    {
        let writer = BufWriter::new(temp.as_file());
        let mut encoder = GzEncoder::new(writer, Compression::new(level));
        codec()
            .serialize_into(&mut encoder, &record)
            .map_err(|e| FetchError::filesystem(temp.path(), bincode_to_io(e)))?;
        let writer = encoder
            .finish()
            .map_err(|e| FetchError::filesystem(temp.path(), e))?;
        writer
            .into_inner()
            .map_err(|e| FetchError::filesystem(temp.path(), e.into_error()))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| FetchError::filesystem(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| FetchError::filesystem(path, e.error))?;

    info!(
        "Cached {}x{} matrix at {} (compression level {})",
        rows,
        cols,
        path.display(),
        level
    );
    Ok(())
}

/// Load a matrix previously written by [`save`].
///
/// # Errors
/// - [`FetchError::Filesystem`] if the file cannot be opened
/// - [`FetchError::CorruptCache`] if the gzip stream or record cannot be decoded
pub fn load(path: &Path) -> FetchResult<RawMatrix> {
    let file = File::open(path).map_err(|e| FetchError::filesystem(path, e))?;
    let decoder = GzDecoder::new(BufReader::new(file));

    let record: CachedMatrix = codec()
        .deserialize_from(decoder)
        .map_err(|e| FetchError::corrupt_cache(path, e.to_string()))?;

    if record.version != ARTIFACT_VERSION {
        return Err(FetchError::corrupt_cache(
            path,
            format!("unsupported artifact version {}", record.version),
        ));
    }

    let shape = (record.rows as usize, record.cols as usize);
    let values = Array2::from_shape_vec(shape, record.values)
        .map_err(|e| FetchError::corrupt_cache(path, format!("shape {shape:?}: {e}")))?;

    debug!("Loaded {:?} matrix from {}", shape, path.display());
    Ok(RawMatrix::new(values))
}

fn bincode_to_io(err: bincode::Error) -> std::io::Error {
    match *err {
        bincode::ErrorKind::Io(io) => io,
        other => std::io::Error::other(other.to_string()),
    }
}
