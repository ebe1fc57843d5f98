//! Application service — the single-host ENC flow.
//!
//! Optionally uploads facts, fetches the node classification, and caches it.
//! Any transient failure (timeout, transport error, rejected upload, non-200
//! node response) is answered with the last cached classification.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{ForemanApi, FreshnessCache};
use crate::application::services::fact_upload::FactUploader;
use crate::domain::enc::{ENVIRONMENT_KEY, strip_top_level_key};
use crate::domain::error::{NodeRetrievalError, UploadError};

/// Failure of one fetch attempt.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Node(#[from] NodeRetrievalError),
    /// Not covered by the cache fallback.
    #[error(transparent)]
    Fatal(anyhow::Error),
}

/// Options for one classification request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    /// Remove the top-level `environment` key before caching and returning.
    pub strip_environment: bool,
}

/// Runs the ENC flow. Cheap to clone.
#[derive(Clone)]
pub struct Classifier {
    api: Arc<dyn ForemanApi>,
    cache: Arc<dyn FreshnessCache>,
    uploader: Option<FactUploader>,
    timeout: Duration,
}

impl Classifier {
    /// `uploader` is `Some` when facts are uploaded before each fetch.
    #[must_use]
    pub fn new(
        api: Arc<dyn ForemanApi>,
        cache: Arc<dyn FreshnessCache>,
        uploader: Option<FactUploader>,
        timeout: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            uploader,
            timeout,
        }
    }

    /// Classification for `certname`, fresh or from cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the fresh fetch failed and no cached copy exists,
    /// or if the fetched document could not be processed or cached.
    pub async fn classify(&self, certname: &str, options: ClassifyOptions) -> Result<String> {
        let this = self.clone();
        let name = certname.to_string();
        let attempt = tokio::task::spawn_blocking(move || this.fetch_fresh(&name, options));

        let reason = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(Ok(document))) => return Ok(document),
            Ok(Ok(Err(AttemptError::Fatal(e)))) => return Err(e),
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(join)) => {
                return Err(anyhow::Error::new(join).context("classification task failed"));
            }
            Err(_) => format!("execution expired after {}s", self.timeout.as_secs_f64()),
        };

        tracing::warn!(certname, "Serving cached ENC: {reason}");
        Ok(self.cache.read(certname)?)
    }

    fn fetch_fresh(&self, certname: &str, options: ClassifyOptions) -> Result<String, AttemptError> {
        if let Some(uploader) = &self.uploader {
            uploader.upload(certname, None)?;
        }

        let mut document = self.api.fetch_node(certname)?;
        if options.strip_environment {
            document = strip_top_level_key(&document, ENVIRONMENT_KEY)
                .context("cannot parse ENC output")
                .map_err(AttemptError::Fatal)?;
        }

        self.cache
            .write(certname, &document)
            .with_context(|| format!("cannot cache ENC output for {certname}"))
            .map_err(AttemptError::Fatal)?;
        Ok(document)
    }
}
