//! Persisted scenario and result files
//!
//! Scenarios are stored as pretty-printed JSON. Results are stored as
//! gzip-compressed pretty JSON. Both are maps sorted by key.

use crate::result::ResultMap;
use crate::scenario::ScenarioMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info};

/// Errors reading or writing persisted state
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Scenario file absent or empty
    #[error("scenarios file {} does not exist or is empty", .path.display())]
    MissingScenarios { path: PathBuf },

    /// File exists but cannot be written back
    #[error("file {} is not readable or writable", .path.display())]
    NotWritable { path: PathBuf },

    /// Filesystem failure
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Gzip stream could not be decoded
    #[error("error decompressing {}: {source}", .path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encode or decode failure
    #[error("error parsing JSON data from file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File is absent or has zero length
#[must_use]
pub fn is_empty_file(path: &Path) -> bool {
    fs::metadata(path).map_or(true, |m| m.len() == 0)
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
        }
        _ => Ok(()),
    }
}

fn ensure_writable(path: &Path) -> Result<(), StoreError> {
    let meta = fs::metadata(path).map_err(|e| StoreError::io(path, e))?;
    if meta.permissions().readonly() {
        error!(path = %path.display(), "file is read-only");
        return Err(StoreError::NotWritable {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Write scenarios as pretty JSON, creating parent directories
///
/// # Errors
/// Returns [`StoreError`] on encode or write failure
pub fn write_scenarios(path: &Path, scenarios: &ScenarioMap) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(scenarios).map_err(|e| StoreError::json(path, e))?;
    write_atomic(path, |file| file.write_all(&json))?;
    info!(path = %path.display(), scenarios = scenarios.len(), "wrote scenarios");
    Ok(())
}

/// Read scenarios; an absent or empty file is an error
///
/// # Errors
/// Returns [`StoreError::MissingScenarios`] for an absent or empty file and
/// other [`StoreError`] variants on read or decode failure
pub fn read_scenarios(path: &Path) -> Result<ScenarioMap, StoreError> {
    if is_empty_file(path) {
        return Err(StoreError::MissingScenarios {
            path: path.to_path_buf(),
        });
    }
    let data = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&data).map_err(|e| StoreError::json(path, e))
}

/// Read results; an absent or empty file yields an empty map
///
/// # Errors
/// Returns [`StoreError`] if the file is read-only, unreadable, not gzip or
/// not a valid results map
pub fn read_results(path: &Path) -> Result<ResultMap, StoreError> {
    if is_empty_file(path) {
        info!(path = %path.display(), "results file does not exist or is empty, starting from scratch");
        return Ok(ResultMap::new());
    }
    ensure_writable(path)?;

    let compressed = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let mut data = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut data)
        .map_err(|source| StoreError::Decompress {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&data).map_err(|e| StoreError::json(path, e))
}

/// Write results as gzip-compressed pretty JSON
///
/// # Errors
/// Returns [`StoreError`] on encode, compress or write failure
pub fn write_results(path: &Path, results: &ResultMap) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(results).map_err(|e| StoreError::json(path, e))?;
    write_atomic(path, |file| {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?;
        Ok(())
    })
}

/// Write through a sibling temp file renamed over `path`
///
/// Readers see either the previous contents or the complete new ones. On
/// failure the temp file is removed and `path` is untouched.
fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut fs::File) -> std::io::Result<()>,
{
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    write(staged.as_file_mut()).map_err(|e| StoreError::io(path, e))?;
    staged.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    staged.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Results file bound to a path
#[derive(Debug, Clone)]
pub struct ResultsFile {
    path: PathBuf,
}

impl ResultsFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// See [`read_results`]
    ///
    /// # Errors
    /// Propagates [`StoreError`] from [`read_results`]
    pub fn load(&self) -> Result<ResultMap, StoreError> {
        read_results(&self.path)
    }

    /// See [`write_results`]
    ///
    /// # Errors
    /// Propagates [`StoreError`] from [`write_results`]
    pub fn save(&self, results: &ResultMap) -> Result<(), StoreError> {
        write_results(&self.path, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(is_empty_file(&path));

        fs::write(&path, b"").unwrap();
        assert!(is_empty_file(&path));

        fs::write(&path, b"{}").unwrap();
        assert!(!is_empty_file(&path));
    }

    #[test]
    fn missing_scenarios_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_scenarios(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::MissingScenarios { .. }));
    }

    #[test]
    fn missing_results_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let results = read_results(&dir.path().join("nope.json.gz")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn plain_json_results_fail_to_decompress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json.gz");
        fs::write(&path, b"{}").unwrap();
        let err = read_results(&path).unwrap_err();
        assert!(matches!(err, StoreError::Decompress { .. }));
    }

    #[test]
    fn gzip_of_garbage_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"not json").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let err = read_results(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("results.json.gz"));
    }

    #[test]
    fn read_only_results_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json.gz");
        write_results(&path, &ResultMap::new()).unwrap();

        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let err = read_results(&path).unwrap_err();
        assert!(matches!(err, StoreError::NotWritable { .. }));
    }

    #[test]
    fn failed_write_leaves_previous_results_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json.gz");
        write_results(&path, &ResultMap::new()).unwrap();
        let before = fs::read(&path).unwrap();

        let err = write_atomic(&path, |file| {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(br#"{"half": "#)?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(read_results(&path).unwrap().is_empty());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("results.json.gz")]);
    }

    #[test]
    fn rewrite_replaces_results_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json.gz");
        fs::write(&path, b"stale, not gzip").unwrap();

        write_results(&path, &ResultMap::new()).unwrap();
        assert!(read_results(&path).unwrap().is_empty());
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("scenarios.json");
        write_scenarios(&path, &ScenarioMap::new()).unwrap();
        assert!(path.exists());
    }
}
