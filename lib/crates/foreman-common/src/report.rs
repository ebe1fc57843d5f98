//! Conversion of Puppet transaction reports into Foreman config reports.
//!
//! The input side mirrors the YAML a Puppet server writes for each agent run
//! (after Ruby object tags are stripped). The output side is the body Foreman
//! expects under `config_report` on `POST /api/config_reports`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while converting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report: can't find metrics information for {0}")]
    MissingMetrics(String),

    #[error("Invalid report time '{0}'")]
    InvalidTime(String),
}

// ── Input ────────────────────────────────────────────────────────────────────

/// A Puppet transaction report as read from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct PuppetReport {
    pub host: String,
    pub time: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, Metric>>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

/// One metric category (`resources`, `changes`, `events`, `time`, ...).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub values: Vec<MetricValue>,
}

/// `[name, label, value]` triple.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricValue(pub String, pub String, pub Value);

impl MetricValue {
    fn name(&self) -> &str {
        self.0.trim_start_matches(':')
    }
}

impl Metric {
    fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name() == name).map(|v| &v.2)
    }
}

/// A single log line of a report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub source: String,
}

impl LogEntry {
    /// Log level without the leading `:` of a serialized Ruby symbol.
    #[must_use]
    pub fn level(&self) -> &str {
        self.level.trim_start_matches(':')
    }
}

// ── Status metric table ──────────────────────────────────────────────────────

/// Entries of the `status` summary, in the order Foreman lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMetric {
    Applied,
    Restarted,
    Failed,
    FailedRestarts,
    Skipped,
    Pending,
}

impl StatusMetric {
    pub const ALL: [StatusMetric; 6] = [
        StatusMetric::Applied,
        StatusMetric::Restarted,
        StatusMetric::Failed,
        StatusMetric::FailedRestarts,
        StatusMetric::Skipped,
        StatusMetric::Pending,
    ];

    /// Key in the output `status` object.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            StatusMetric::Applied => "applied",
            StatusMetric::Restarted => "restarted",
            StatusMetric::Failed => "failed",
            StatusMetric::FailedRestarts => "failed_restarts",
            StatusMetric::Skipped => "skipped",
            StatusMetric::Pending => "pending",
        }
    }

    /// `(category, metric name)` the value is read from.
    #[must_use]
    pub const fn source(self) -> (&'static str, &'static str) {
        match self {
            StatusMetric::Applied => ("changes", "total"),
            StatusMetric::Restarted => ("resources", "restarted"),
            StatusMetric::Failed => ("resources", "failed"),
            StatusMetric::FailedRestarts => ("resources", "failed_to_restart"),
            StatusMetric::Skipped => ("resources", "skipped"),
            StatusMetric::Pending => ("events", "noop"),
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportStatus {
    pub applied: i64,
    pub restarted: i64,
    pub failed: i64,
    pub failed_restarts: i64,
    pub skipped: i64,
    pub pending: i64,
}

impl ReportStatus {
    #[must_use]
    pub fn get(&self, metric: StatusMetric) -> i64 {
        match metric {
            StatusMetric::Applied => self.applied,
            StatusMetric::Restarted => self.restarted,
            StatusMetric::Failed => self.failed,
            StatusMetric::FailedRestarts => self.failed_restarts,
            StatusMetric::Skipped => self.skipped,
            StatusMetric::Pending => self.pending,
        }
    }

    fn get_mut(&mut self, metric: StatusMetric) -> &mut i64 {
        match metric {
            StatusMetric::Applied => &mut self.applied,
            StatusMetric::Restarted => &mut self.restarted,
            StatusMetric::Failed => &mut self.failed,
            StatusMetric::FailedRestarts => &mut self.failed_restarts,
            StatusMetric::Skipped => &mut self.skipped,
            StatusMetric::Pending => &mut self.pending,
        }
    }

    fn total(&self) -> i64 {
        StatusMetric::ALL.iter().map(|m| self.get(*m)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub log: LogBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogBody {
    pub level: String,
    pub sources: LogSources,
    pub messages: LogMessages,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSources {
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogMessages {
    pub message: String,
}

/// The `config_report` object Foreman accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigReport {
    pub host: String,
    pub reported_at: String,
    pub status: ReportStatus,
    pub metrics: BTreeMap<String, BTreeMap<String, Value>>,
    pub logs: Vec<LogRecord>,
}

/// Request body wrapper: `{"config_report": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReportBody<'a> {
    pub config_report: &'a ConfigReport,
}

impl ConfigReport {
    /// Convert a Puppet report.
    ///
    /// # Errors
    ///
    /// Fails when the report carries no metrics or its time cannot be parsed.
    pub fn from_puppet(report: &PuppetReport) -> Result<Self, ReportError> {
        let metrics = report
            .metrics
            .as_ref()
            .ok_or_else(|| ReportError::MissingMetrics(report.host.clone()))?;
        let reported_at = parse_report_time(&report.time)?
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string();

        Ok(Self {
            host: report.host.clone(),
            reported_at,
            status: status_from(report, metrics),
            metrics: metrics_to_map(metrics),
            logs: report.logs.iter().filter_map(log_record).collect(),
        })
    }

    #[must_use]
    pub fn body(&self) -> ConfigReportBody<'_> {
        ConfigReportBody {
            config_report: self,
        }
    }
}

fn status_from(report: &PuppetReport, metrics: &BTreeMap<String, Metric>) -> ReportStatus {
    let mut status = ReportStatus::default();
    for metric in StatusMetric::ALL {
        let (category, name) = metric.source();
        *status.get_mut(metric) = metrics
            .get(category)
            .and_then(|m| m.value(name))
            .map_or(0, count);
    }

    // Skips without any matching log lines are noise, not real skips.
    let log_count = i64::try_from(report.logs.len()).unwrap_or(i64::MAX);
    if status.skipped > 0 && status.total() - status.skipped == log_count {
        status.skipped = 0;
    }
    // Reports without resource metrics (failed catalog) still count as failed.
    if report.status.as_deref() == Some("failed") {
        status.failed += 1;
    }
    let puppet_errors = report
        .logs
        .iter()
        .filter(|l| l.source.ends_with("Puppet") && l.level() == "err")
        .count();
    status.failed += i64::try_from(puppet_errors).unwrap_or(i64::MAX);

    status
}

#[allow(clippy::cast_possible_truncation)]
fn count(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0)
}

fn metrics_to_map(metrics: &BTreeMap<String, Metric>) -> BTreeMap<String, BTreeMap<String, Value>> {
    metrics
        .iter()
        .map(|(category, metric)| {
            let values = metric
                .values
                .iter()
                .map(|v| (v.name().to_string(), v.2.clone()))
                .collect();
            (category.clone(), values)
        })
        .collect()
}

fn log_record(entry: &LogEntry) -> Option<LogRecord> {
    if entry.level() == "debug" || is_catalog_summary(&entry.message) {
        return None;
    }
    Some(LogRecord {
        log: LogBody {
            level: entry.level().to_string(),
            sources: LogSources {
                source: entry.source.clone(),
            },
            messages: LogMessages {
                message: entry.message.clone(),
            },
        },
    })
}

/// Matches `Finished catalog run in <digits><any char><digits> seconds`.
fn is_catalog_summary(message: &str) -> bool {
    let Some(duration) = message
        .strip_prefix("Finished catalog run in ")
        .and_then(|m| m.strip_suffix(" seconds"))
    else {
        return false;
    };
    let chars: Vec<char> = duration.chars().collect();
    if chars.len() < 3 {
        return false;
    }
    let separators: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .collect();
    match separators.as_slice() {
        [] => true,
        [i] => *i > 0 && *i < chars.len() - 1,
        _ => false,
    }
}

fn parse_report_time(raw: &str) -> Result<DateTime<Utc>, ReportError> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f %:z", "%Y-%m-%d %H:%M:%S%.f %z"] {
        if let Ok(t) = DateTime::parse_from_str(raw, format) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f UTC", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(t.and_utc());
        }
    }
    Err(ReportError::InvalidTime(raw.to_string()))
}
