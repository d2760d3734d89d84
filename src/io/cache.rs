//! Persistent per-file result cache.
//!
//! One JSON file per (analyzer, source path) pair under the configured cache
//! directory. An entry is served only while the source file has not been
//! modified after the entry was written. Cache failures are never fatal: a
//! failed read behaves as a miss and a failed write is dropped, both at
//! warning level.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::core::config::AnalyzerKind;
use crate::core::results::FileAnalysis;

/// Filesystem-backed cache of [`FileAnalysis`] records.
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    /// Create a cache rooted at the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cache entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a cached result for a source file.
    ///
    /// The staleness predicate is non-strict: an entry is valid iff the
    /// source's mtime is less than or equal to the entry's mtime. A source
    /// update landing within the filesystem's mtime resolution window can
    /// therefore be missed; callers that need certainty disable the cache.
    pub fn get(&self, analyzer: AnalyzerKind, source: &Path) -> Option<FileAnalysis> {
        let entry = self.entry_path(analyzer, source);
        if !entry.exists() {
            return None;
        }

        let source_mtime = mtime(source)?;
        let entry_mtime = mtime(&entry)?;
        if source_mtime > entry_mtime {
            debug!("Cache entry for {} is stale", source.display());
            return None;
        }

        let bytes = match fs::read(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Error reading cache for {}: {err}", source.display());
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!("Error decoding cache for {}: {err}", source.display());
                None
            }
        }
    }

    /// Store a result for a source file, replacing any previous entry.
    pub fn put(&self, analyzer: AnalyzerKind, source: &Path, result: &FileAnalysis) {
        let entry = self.entry_path(analyzer, source);
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!("Error creating cache directory {}: {err}", self.dir.display());
            return;
        }
        let payload = match serde_json::to_vec(result) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Error encoding cache for {}: {err}", source.display());
                return;
            }
        };
        if let Err(err) = fs::write(&entry, payload) {
            warn!("Error caching result for {}: {err}", source.display());
        }
    }

    /// Cache file path for a (analyzer, source) pair.
    ///
    /// The key is derived from the absolute source path so distinct sources
    /// always map to distinct entries, even across working directories.
    fn entry_path(&self, analyzer: AnalyzerKind, source: &Path) -> PathBuf {
        let absolute = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        let mut key = String::with_capacity(absolute.as_os_str().len());
        for ch in absolute.to_string_lossy().chars() {
            key.push(match ch {
                '/' | '\\' | ':' => '_',
                other => other,
            });
        }
        self.dir.join(format!("{}_{key}.json", analyzer.key()))
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(time) => Some(time),
        Err(err) => {
            warn!("Error reading mtime for {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn sample(path: &Path) -> FileAnalysis {
        FileAnalysis::analyzed(path, vec![])
    }

    #[test]
    fn test_round_trip_returns_equal_result() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("m.py");
        fs::write(&source, "x = 1\n").unwrap();

        let cache = ResultCache::new(dir.path().join("cache"));
        let result = sample(&source);
        cache.put(AnalyzerKind::Kiss, &source, &result);

        let hit = cache.get(AnalyzerKind::Kiss, &source).expect("cache hit");
        assert_eq!(hit, result);
    }

    #[test]
    fn test_entries_are_scoped_per_analyzer() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("m.py");
        fs::write(&source, "x = 1\n").unwrap();

        let cache = ResultCache::new(dir.path().join("cache"));
        cache.put(AnalyzerKind::Kiss, &source, &sample(&source));
        assert!(cache.get(AnalyzerKind::Srp, &source).is_none());
    }

    #[test]
    fn test_modified_source_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("m.py");
        fs::write(&source, "x = 1\n").unwrap();

        let cache = ResultCache::new(dir.path().join("cache"));
        cache.put(AnalyzerKind::Kiss, &source, &sample(&source));

        // Ensure the rewrite lands strictly after the cache entry's mtime.
        thread::sleep(Duration::from_millis(50));
        fs::write(&source, "x = 2\n").unwrap();
        assert!(cache.get(AnalyzerKind::Kiss, &source).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("m.py");
        fs::write(&source, "x = 1\n").unwrap();

        let cache = ResultCache::new(dir.path().join("cache"));
        cache.put(AnalyzerKind::Kiss, &source, &sample(&source));

        // Clobber the entry with garbage; the read must degrade to a miss.
        for entry in fs::read_dir(cache.dir()).unwrap() {
            fs::write(entry.unwrap().path(), b"not json").unwrap();
        }
        assert!(cache.get(AnalyzerKind::Kiss, &source).is_none());
    }
}
