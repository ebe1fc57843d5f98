//! Application service — upload one host's facts to Foreman.
//!
//! The upload is skipped when the `<certname>-push-facts` marker is at least
//! as new as the fact file, so re-running it for an unchanged file is a no-op.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use foreman_common::FactUploadBody;

use crate::application::ports::{FactSource, ForemanApi, FreshnessCache, LocalIdentity};
use crate::domain::error::{FactFileError, UploadError};
use crate::domain::facts;

/// What an upload call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// The marker is newer than the fact file.
    Fresh,
    /// Missing, empty, or value-less fact file.
    NoFacts,
}

/// Cache key of the upload marker for `certname`.
#[must_use]
pub fn marker_key(certname: &str) -> String {
    format!("{certname}-push-facts")
}

/// Uploads fact files. Cheap to clone; clones share the HTTP agent.
#[derive(Clone)]
pub struct FactUploader {
    api: Arc<dyn ForemanApi>,
    cache: Arc<dyn FreshnessCache>,
    facts: Arc<dyn FactSource>,
    identity: Arc<dyn LocalIdentity>,
}

impl FactUploader {
    #[must_use]
    pub fn new(
        api: Arc<dyn ForemanApi>,
        cache: Arc<dyn FreshnessCache>,
        facts: Arc<dyn FactSource>,
        identity: Arc<dyn LocalIdentity>,
    ) -> Self {
        Self {
            api,
            cache,
            facts,
            identity,
        }
    }

    /// Upload the facts of `certname`, read from `path` or its default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, Foreman rejects the
    /// upload, or the marker cannot be written.
    pub fn upload(&self, certname: &str, path: Option<&Path>) -> Result<UploadOutcome, UploadError> {
        let path: PathBuf = path.map_or_else(|| self.facts.fact_path(certname), Path::to_path_buf);

        let Some(stat) = self.facts.stat(&path) else {
            tracing::warn!("Fact file {} does not exist", path.display());
            return Ok(UploadOutcome::NoFacts);
        };
        if stat.len == 0 {
            tracing::warn!("Fact file {} does not contain any facts", path.display());
            return Ok(UploadOutcome::NoFacts);
        }

        let key = marker_key(certname);
        if self.cache.is_fresh(&key, stat.modified) {
            tracing::debug!(certname, "facts unchanged since last upload, skipping");
            return Ok(UploadOutcome::Fresh);
        }

        let Some(body) = self.build_body(certname, &path)? else {
            tracing::warn!(
                "Empty values hash in fact file {}, not uploading",
                path.display()
            );
            return Ok(UploadOutcome::NoFacts);
        };

        self.api.upload_facts(&body)?;

        let note = format!(
            "Facts from this host were last pushed to {} at {}\n",
            self.api.facts_url(),
            Local::now().format("%Y-%m-%d %H:%M:%S %z")
        );
        self.cache
            .write(&key, &note)
            .map_err(|source| UploadError::Marker {
                certname: certname.to_string(),
                source,
            })?;
        tracing::info!(certname, "facts uploaded");
        Ok(UploadOutcome::Uploaded)
    }

    /// Read and enrich the fact file; `None` when it holds no values.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact file cannot be read or parsed.
    pub fn build_body(
        &self,
        certname: &str,
        path: &Path,
    ) -> Result<Option<FactUploadBody>, FactFileError> {
        let mut values = facts::fact_values(self.facts.load(path)?);
        if values.is_empty() {
            return Ok(None);
        }

        if facts::needs_environment(&values) {
            let node_path = facts::node_path(path);
            if self.facts.stat(&node_path).is_some() {
                match self.facts.load(&node_path) {
                    Ok(node) => facts::backfill_environment(&mut values, &node),
                    Err(e) => tracing::debug!(certname, "ignoring node file: {e}"),
                }
            }
        }

        Ok(facts::build_upload_body(
            certname,
            values,
            &self.identity.fqdn(),
        ))
    }
}
