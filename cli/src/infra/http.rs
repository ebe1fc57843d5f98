//! Blocking Foreman HTTP client built on `ureq`.
//!
//! The agent is created on first use and shared by every call (and every
//! worker thread) afterwards.

use std::sync::OnceLock;
use std::time::Duration;

use foreman_common::{ConfigReport, FactUploadBody};

use crate::application::ports::{ForemanApi, ReportSink};
use crate::domain::config::TlsSettings;
use crate::domain::error::{NodeRetrievalError, UploadError};
use crate::infra::tls;

const ACCEPT_V2: &str = "application/json,version=2";

/// Timeout for report delivery when `report_timeout` is unset.
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Production implementation of `ForemanApi` and `ReportSink`.
pub struct ForemanHttp {
    base_url: String,
    timeout: Duration,
    tls: TlsSettings,
    agent: OnceLock<Result<ureq::Agent, String>>,
}

impl ForemanHttp {
    /// `base_url` must not end with a slash; `timeout` bounds connect and read.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration, tls: TlsSettings) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            tls,
            agent: OnceLock::new(),
        }
    }

    fn agent(&self) -> Result<&ureq::Agent, String> {
        self.agent
            .get_or_init(|| {
                let mut builder = ureq::AgentBuilder::new()
                    .timeout_connect(self.timeout)
                    .timeout_read(self.timeout)
                    .timeout_write(self.timeout);
                if let Some(config) = tls::client_config(&self.tls).map_err(|e| format!("{e:#}"))? {
                    builder = builder.tls_config(config);
                }
                Ok(builder.build())
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn post_json(&self, url: &str, body: &impl serde::Serialize) -> Result<(), Failure> {
        let agent = self.agent().map_err(Failure::Transport)?;
        match agent.post(url).set("Accept", ACCEPT_V2).send_json(body) {
            Ok(resp) if (200..300).contains(&resp.status()) => Ok(()),
            Ok(resp) => Err(Failure::Status(resp.status(), resp.status_text().to_string())),
            Err(ureq::Error::Status(code, resp)) => {
                Err(Failure::Status(code, resp.status_text().to_string()))
            }
            Err(ureq::Error::Transport(t)) => Err(Failure::Transport(t.to_string())),
        }
    }
}

enum Failure {
    Status(u16, String),
    Transport(String),
}

impl ForemanApi for ForemanHttp {
    fn upload_facts(&self, body: &FactUploadBody) -> Result<(), UploadError> {
        tracing::debug!(certname = %body.certname, "uploading facts");
        self.post_json(&self.facts_url(), body)
            .map_err(|failure| match failure {
                Failure::Status(status, reason) => UploadError::Rejected {
                    certname: body.certname.clone(),
                    status,
                    reason,
                },
                Failure::Transport(message) => UploadError::Transport(message),
            })
    }

    fn fetch_node(&self, certname: &str) -> Result<String, NodeRetrievalError> {
        let transport = |message: String| NodeRetrievalError::Transport {
            certname: certname.to_string(),
            message,
        };
        let agent = self.agent().map_err(transport)?;
        let url = format!("{}/node/{certname}?format=yml", self.base_url);
        match agent.get(&url).call() {
            Ok(resp) if resp.status() == 200 => resp.into_string().map_err(|e| transport(e.to_string())),
            Ok(resp) => Err(NodeRetrievalError::Status {
                certname: certname.to_string(),
                status: resp.status(),
                reason: resp.status_text().to_string(),
            }),
            Err(ureq::Error::Status(status, resp)) => Err(NodeRetrievalError::Status {
                certname: certname.to_string(),
                status,
                reason: resp.status_text().to_string(),
            }),
            Err(ureq::Error::Transport(t)) => Err(transport(t.to_string())),
        }
    }

    fn facts_url(&self) -> String {
        format!("{}/api/hosts/facts", self.base_url)
    }
}

impl ReportSink for ForemanHttp {
    fn send_report(&self, report: &ConfigReport) -> Result<(), String> {
        self.post_json(&self.reports_url(), &report.body())
            .map_err(|failure| match failure {
                Failure::Status(status, reason) => format!("{status} {reason}"),
                Failure::Transport(message) => message,
            })
    }

    fn reports_url(&self) -> String {
        format!("{}/api/config_reports", self.base_url)
    }
}
