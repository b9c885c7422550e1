//! One-file-per-trace cache.
//!
//! File names are the SHA-256 of the trace id so arbitrary ids map to safe
//! paths. Entries are staged in `.tmp/` under the cache directory (same
//! filesystem) and renamed into place, so a reader never sees a partial
//! entry.

use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{decode_entry, CacheEntry, CacheError, TraceCache};
use crate::types::Trace;

const STAGING_DIR: &str = ".tmp";

pub struct FileTraceCache {
    dir: PathBuf,
}

impl FileTraceCache {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join(STAGING_DIR))?;
        debug!("File trace cache at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, trace_id: &str) -> PathBuf {
        let digest = Sha256::digest(trace_id.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn staging_dir(&self) -> PathBuf {
        self.dir.join(STAGING_DIR)
    }
}

impl TraceCache for FileTraceCache {
    fn read(&self, trace_id: &str) -> Result<Option<CacheEntry>, CacheError> {
        match std::fs::read_to_string(self.entry_path(trace_id)) {
            Ok(raw) => Ok(decode_entry(trace_id, &raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, trace_id: &str, trace: &Trace) -> Result<(), CacheError> {
        let entry = CacheEntry::new(trace_id, trace);
        let mut tmp = NamedTempFile::new_in(self.staging_dir())?;
        serde_json::to_writer(&mut tmp, &entry)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(trace_id))
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::trace_with;

    fn file_names(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_roundtrip_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();

        assert!(cache.read("t1").unwrap().is_none());

        let first = trace_with("t1", &["parse", "exec"]);
        cache.write("t1", &first).unwrap();
        let entry = cache.read("t1").unwrap().unwrap();
        assert_eq!(entry.trace_id, "t1");
        assert_eq!(entry.trace, first);

        let second = trace_with("t1", &["only"]);
        cache.write("t1", &second).unwrap();
        let replaced = cache.read("t1").unwrap().unwrap();
        assert_eq!(replaced.trace, second);
        assert!(replaced.cached_at >= entry.cached_at);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();
        cache.write("a", &trace_with("a", &["x"])).unwrap();
        cache.write("b", &trace_with("b", &["y"])).unwrap();

        let mut entries: Vec<_> = file_names(dir.path())
            .into_iter()
            .filter(|f| f != STAGING_DIR)
            .collect();
        entries.sort();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|f| f.ends_with(".json")));
        assert!(file_names(&cache.staging_dir()).is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();
        let first = trace_with("t1", &["a"]);
        cache.write("t1", &first).unwrap();

        // staging path is now a plain file, so no temp file can be created
        std::fs::remove_dir(cache.staging_dir()).unwrap();
        std::fs::write(cache.staging_dir(), "").unwrap();

        let err = cache.write("t1", &trace_with("t1", &["b", "c"])).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
        assert_eq!(cache.read("t1").unwrap().unwrap().trace, first);
    }

    #[test]
    fn test_ids_with_path_characters() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();
        let id = "../../etc/passwd";
        cache.write(id, &trace_with(id, &["x"])).unwrap();
        assert!(cache.read(id).unwrap().is_some());
        assert!(cache.entry_path(id).starts_with(dir.path()));
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();
        std::fs::write(cache.entry_path("t1"), "{\"trace_id\": \"t1\", ").unwrap();
        assert!(cache.read("t1").unwrap().is_none());
    }

    #[test]
    fn test_entry_for_other_trace_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTraceCache::open(dir.path()).unwrap();
        cache.write("t2", &trace_with("t2", &["x"])).unwrap();
        std::fs::copy(cache.entry_path("t2"), cache.entry_path("t1")).unwrap();
        assert!(cache.read("t1").unwrap().is_none());
    }
}
