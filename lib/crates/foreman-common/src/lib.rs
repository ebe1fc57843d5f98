pub mod facts;
pub mod report;

pub use facts::FactUploadBody;
pub use report::{ConfigReport, PuppetReport, ReportError, ReportStatus, StatusMetric};
