//! `FactSource` over the Puppet server's fact directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::application::ports::{FactSource, FileStat};
use crate::domain::config::FactExtension;
use crate::domain::error::FactFileError;
use crate::domain::facts::parse_document;

/// Fact files under `<puppetdir>/<yaml|server_data>/facts`.
#[derive(Debug, Clone)]
pub struct FactDirectory {
    dir: PathBuf,
    extension: FactExtension,
}

impl FactDirectory {
    #[must_use]
    pub fn new(dir: PathBuf, extension: FactExtension) -> Self {
        Self { dir, extension }
    }
}

impl FactSource for FactDirectory {
    fn fact_path(&self, certname: &str) -> PathBuf {
        self.dir
            .join(format!("{certname}.{}", self.extension.as_str()))
    }

    fn fact_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("cannot list fact directory {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("cannot list fact directory {}", self.dir.display()))?
                .path();
            if FactExtension::of_path(&path) == Some(self.extension) && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn stat(&self, path: &Path) -> Option<FileStat> {
        let meta = std::fs::metadata(path).ok()?;
        Some(FileStat {
            len: meta.len(),
            modified: meta.modified().ok()?,
        })
    }

    fn load(&self, path: &Path) -> Result<Value, FactFileError> {
        let format = FactExtension::of_path(path)
            .ok_or_else(|| FactFileError::UnsupportedFormat(path.to_path_buf()))?;
        let text = std::fs::read_to_string(path).map_err(|source| FactFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        parse_document(&text, format).map_err(|message| FactFileError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }
}
