//! File-backed `FreshnessCache`: one `<key>.yaml` file per entry.
//!
//! Writes go through a temp file and rename so concurrent readers see either
//! the old or the new content, never a torn file.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::application::ports::FreshnessCache;
use crate::domain::error::CacheReadError;

/// Cache rooted at `<puppetdir>/yaml/foreman`.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File backing `key`.
    #[must_use]
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.yaml"))
    }
}

impl FreshnessCache for FileCache {
    fn write(&self, key: &str, content: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        // Unique per thread so parallel writers of one key never share a temp file.
        let temp_path = self.dir.join(format!(
            ".{key}.yaml.{}.{:?}.tmp",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &path).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp_path);
        })
    }

    fn read(&self, key: &str) -> Result<String, CacheReadError> {
        std::fs::read_to_string(self.entry_path(key)).map_err(|source| CacheReadError {
            key: key.to_string(),
            source,
        })
    }

    fn is_fresh(&self, key: &str, reference: SystemTime) -> bool {
        std::fs::metadata(self.entry_path(key))
            .and_then(|meta| meta.modified())
            .is_ok_and(|written| written >= reference)
    }
}
