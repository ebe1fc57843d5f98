//! ENC command — print the classification of one node.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::classify::ClassifyOptions;

/// Write the ENC document for `certname` to stdout.
///
/// # Errors
///
/// Returns an error if neither Foreman nor the cache can provide one.
pub async fn run(app: &AppContext, certname: &str, no_environment: bool) -> Result<()> {
    let options = ClassifyOptions {
        strip_environment: no_environment,
    };
    let document = app.classifier().classify(certname, options).await?;
    if document.ends_with('\n') {
        print!("{document}");
    } else {
        println!("{document}");
    }
    Ok(())
}
