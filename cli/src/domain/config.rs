//! Domain types and validators for the agent settings file.
//!
//! Pure functions only; the loader in `infra::config` does the reading.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_PUPPET_USER: &str = "puppet";
pub const DEFAULT_ENC_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REPORT_RETRY_LIMIT: u32 = 1;

// ── Fact extension ───────────────────────────────────────────────────────────

/// On-disk format of fact and node files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactExtension {
    #[default]
    Yaml,
    Json,
}

impl FactExtension {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FactExtension::Yaml => "yaml",
            FactExtension::Json => "json",
        }
    }

    /// Directory below `puppetdir` that holds this format's data.
    #[must_use]
    pub fn data_dir(self) -> &'static str {
        match self {
            FactExtension::Yaml => "yaml",
            FactExtension::Json => "server_data",
        }
    }

    /// Format of `path`, judged by its extension.
    #[must_use]
    pub fn of_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for FactExtension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yaml" => Ok(FactExtension::Yaml),
            "json" => Ok(FactExtension::Json),
            other => Err(ConfigError::InvalidFactExtension(other.to_string())),
        }
    }
}

// ── Settings file schema ─────────────────────────────────────────────────────

/// Raw settings as written on disk.
///
/// Keys are historically written as Ruby symbols (`:url:`), so every field
/// also accepts the `:`-prefixed spelling. Empty strings count as unset.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    #[serde(alias = ":url", deserialize_with = "non_empty")]
    url: Option<String>,
    #[serde(alias = ":puppetdir", deserialize_with = "non_empty")]
    puppetdir: Option<String>,
    #[serde(alias = ":puppetuser", deserialize_with = "non_empty")]
    puppetuser: Option<String>,
    #[serde(alias = ":fact_extension", deserialize_with = "non_empty")]
    fact_extension: Option<String>,
    #[serde(alias = ":facts")]
    facts: Option<bool>,
    #[serde(alias = ":ssl_ca", deserialize_with = "non_empty")]
    ssl_ca: Option<String>,
    #[serde(alias = ":ssl_cert", deserialize_with = "non_empty")]
    ssl_cert: Option<String>,
    #[serde(alias = ":ssl_key", deserialize_with = "non_empty")]
    ssl_key: Option<String>,
    #[serde(alias = ":timeout")]
    timeout: Option<u64>,
    #[serde(alias = ":threads")]
    threads: Option<i64>,
    #[serde(alias = ":report_retry_limit")]
    report_retry_limit: Option<u32>,
    #[serde(alias = ":report_timeout")]
    report_timeout: Option<u64>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// A zero timeout counts as unset.
fn positive_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}

/// TLS material used for HTTPS endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// CA bundle; enables peer verification against it.
    pub ca: Option<PathBuf>,
    /// Client certificate, only used together with `key`.
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// Validated, immutable agent settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Foreman base URL, without trailing slash.
    pub url: String,
    pub puppet_dir: PathBuf,
    pub puppet_user: String,
    pub fact_extension: FactExtension,
    /// Upload facts before every classification fetch.
    pub upload_facts: bool,
    pub tls: TlsSettings,
    /// Request timeout; also bounds a whole classification fetch.
    pub timeout: Option<Duration>,
    /// Worker count for parallel fact pushes.
    pub threads: usize,
    pub report_retry_limit: u32,
    pub report_timeout: Option<Duration>,
    /// File the settings were read from.
    pub source: PathBuf,
}

impl Settings {
    /// Parse and validate the settings file content.
    ///
    /// `available_threads` is used when `threads` is unset or not positive.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a required key is missing.
    pub fn from_yaml(
        content: &str,
        source: &Path,
        available_threads: usize,
    ) -> Result<Self, ConfigError> {
        let raw: RawSettings = if content.trim().is_empty() {
            RawSettings::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Invalid {
                path: source.to_path_buf(),
                source: e,
            })?
        };

        let url = raw.url.ok_or_else(|| ConfigError::Missing {
            key: "URL",
            path: source.to_path_buf(),
        })?;
        let puppet_dir = raw.puppetdir.ok_or_else(|| ConfigError::Missing {
            key: "puppet base directory",
            path: source.to_path_buf(),
        })?;
        let fact_extension = raw
            .fact_extension
            .as_deref()
            .map(FactExtension::from_str)
            .transpose()?
            .unwrap_or_default();
        let threads = match raw.threads {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => available_threads.max(1),
        };

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            puppet_dir: PathBuf::from(puppet_dir),
            puppet_user: raw
                .puppetuser
                .unwrap_or_else(|| DEFAULT_PUPPET_USER.to_string()),
            fact_extension,
            upload_facts: raw.facts.unwrap_or(false),
            tls: TlsSettings {
                ca: raw.ssl_ca.map(PathBuf::from),
                cert: raw.ssl_cert.map(PathBuf::from),
                key: raw.ssl_key.map(PathBuf::from),
            },
            timeout: positive_secs(raw.timeout),
            threads,
            report_retry_limit: raw
                .report_retry_limit
                .unwrap_or(DEFAULT_REPORT_RETRY_LIMIT),
            report_timeout: positive_secs(raw.report_timeout),
            source: source.to_path_buf(),
        })
    }

    /// Directory holding cached ENC output and upload markers.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.puppet_dir.join("yaml").join("foreman")
    }

    /// Directory holding one fact file per host.
    #[must_use]
    pub fn fact_dir(&self) -> PathBuf {
        self.puppet_dir
            .join(self.fact_extension.data_dir())
            .join("facts")
    }

    /// Overall deadline for one classification fetch.
    #[must_use]
    pub fn enc_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_ENC_TIMEOUT)
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
