//! Application service — convert a Puppet run report and deliver it.

use anyhow::{Context, Result};
use foreman_common::{ConfigReport, PuppetReport};

use crate::application::ports::ReportSink;
use crate::domain::error::ReportDeliveryError;
use crate::domain::facts::strip_ruby_tags;

/// Parse a transaction report as written by the Puppet server.
///
/// # Errors
///
/// Returns an error if the document is not a valid report or has no metrics.
pub fn convert_report(document: &str) -> Result<ConfigReport> {
    let plain = strip_ruby_tags(document).replace("!ruby/sym ", "");
    let report: PuppetReport =
        serde_yaml::from_str(&plain).context("cannot parse Puppet report")?;
    Ok(ConfigReport::from_puppet(&report)?)
}

/// Send `report`, making up to `retry_limit` attempts (at least one).
///
/// # Errors
///
/// Returns [`ReportDeliveryError`] carrying the last failure once every
/// attempt has failed.
pub fn deliver_report(
    sink: &dyn ReportSink,
    report: &ConfigReport,
    retry_limit: u32,
) -> Result<(), ReportDeliveryError> {
    let attempts = retry_limit.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match sink.send_report(report) {
            Ok(()) => {
                tracing::info!(host = %report.host, attempt, "report sent");
                return Ok(());
            }
            Err(message) if attempt < attempts => {
                tracing::error!(
                    "Could not send report to Foreman at {} (attempt {attempt}/{attempts}). Retrying... {message}",
                    sink.reports_url()
                );
            }
            Err(message) => {
                return Err(ReportDeliveryError {
                    url: sink.reports_url(),
                    message,
                });
            }
        }
    }
}
