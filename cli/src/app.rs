//! Application context — unified state passed to every command handler.
//!
//! `AppContext` wires the loaded `Settings` to the production port
//! implementations once, so command handlers never construct infrastructure
//! themselves.

use std::sync::Arc;

use crate::application::ports::{FactSource, ForemanApi, FreshnessCache, LocalIdentity};
use crate::application::services::classify::Classifier;
use crate::application::services::fact_upload::FactUploader;
use crate::domain::config::Settings;
use crate::infra::cache::FileCache;
use crate::infra::facts::FactDirectory;
use crate::infra::http::{DEFAULT_REPORT_TIMEOUT, ForemanHttp};
use crate::infra::identity;

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Immutable settings, loaded once at startup.
    pub settings: Settings,
    /// Foreman client for fact uploads and ENC fetches.
    pub api: Arc<dyn ForemanApi>,
    /// ENC cache and upload markers.
    pub cache: Arc<dyn FreshnessCache>,
    /// Fact files written by the Puppet server.
    pub facts: Arc<dyn FactSource>,
    /// FQDN injected into every fact upload.
    pub identity: Arc<dyn LocalIdentity>,
}

impl AppContext {
    /// Construct an `AppContext` backed by the real filesystem and network.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let api = Arc::new(ForemanHttp::new(
            settings.url.clone(),
            settings.enc_timeout(),
            settings.tls.clone(),
        ));
        let cache = Arc::new(FileCache::new(settings.cache_dir()));
        let facts = Arc::new(FactDirectory::new(
            settings.fact_dir(),
            settings.fact_extension,
        ));
        Self {
            api,
            cache,
            facts,
            identity: identity::detect(),
            settings,
        }
    }

    /// Uploader sharing this context's client and cache.
    #[must_use]
    pub fn uploader(&self) -> FactUploader {
        FactUploader::new(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            Arc::clone(&self.facts),
            Arc::clone(&self.identity),
        )
    }

    /// ENC orchestrator; uploads facts first when `facts` is enabled.
    #[must_use]
    pub fn classifier(&self) -> Classifier {
        let uploader = self.settings.upload_facts.then(|| self.uploader());
        Classifier::new(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            uploader,
            self.settings.enc_timeout(),
        )
    }

    /// Client used for report delivery, bounded by `report_timeout`.
    #[must_use]
    pub fn report_client(&self) -> ForemanHttp {
        ForemanHttp::new(
            self.settings.url.clone(),
            self.settings.report_timeout.unwrap_or(DEFAULT_REPORT_TIMEOUT),
            self.settings.tls.clone(),
        )
    }
}
