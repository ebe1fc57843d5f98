//! Report command — convert a Puppet run report and send it to Foreman.

use std::path::Path;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::services::report::{convert_report, deliver_report};

/// Run the report command on the YAML report at `path`.
///
/// # Errors
///
/// Returns an error if the report cannot be read or converted, or if every
/// delivery attempt fails.
pub async fn run(app: &AppContext, path: &Path) -> Result<()> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read report {}", path.display()))?;
    let report = convert_report(&document)
        .with_context(|| format!("invalid report {}", path.display()))?;

    let client = app.report_client();
    let retry_limit = app.settings.report_retry_limit;
    tokio::task::spawn_blocking(move || deliver_report(&client, &report, retry_limit))
        .await
        .context("report delivery task failed")??;
    Ok(())
}
