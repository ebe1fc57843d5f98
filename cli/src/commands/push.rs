//! Push command — upload fact files, once or continuously.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::FactSource;
use crate::application::services::dispatch::{self, WorkerPool};
use crate::application::services::watch_loop::WatchPlan;
use crate::domain::error::WatchError;
use crate::infra::inotify;

/// How facts should be pushed.
#[derive(Debug, Clone)]
pub struct PushArgs {
    /// Only this host; every fact file when `None`.
    pub certname: Option<String>,
    /// Use the configured worker count instead of a single worker.
    pub parallel: bool,
    /// Keep watching the fact directory after the initial push.
    pub watch: bool,
}

/// Run the push command.
///
/// # Errors
///
/// Returns an error if the fact directory cannot be read or watched. Failed
/// uploads are logged and do not fail the command.
pub async fn run(app: &AppContext, args: PushArgs) -> Result<()> {
    if args.watch && !inotify::supported() {
        return Err(WatchError::Unsupported.into());
    }

    let threads = if args.parallel { app.settings.threads } else { 1 };
    let jobs = dispatch::batch_jobs(
        app.facts.as_ref(),
        app.settings.fact_extension,
        args.certname.as_deref(),
    )?;
    let plan = args.watch.then(|| WatchPlan {
        fact_dir: app.settings.fact_dir(),
        extension: app.settings.fact_extension,
        existing: Vec::new(),
        limit: inotify::watch_limit(),
    });
    let facts: Arc<dyn FactSource> = Arc::clone(&app.facts);
    let uploader = app.uploader();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let (pool, sender) = WorkerPool::start(threads, &uploader)?;
        tracing::info!(jobs = jobs.len(), workers = threads, "pushing facts");
        for job in jobs {
            sender.send(job);
        }

        let watched = match plan {
            Some(mut plan) => {
                plan.existing = facts.fact_files()?;
                watch(&plan, &sender)
            }
            None => Ok(()),
        };

        drop(sender);
        let processed = pool.join();
        tracing::debug!(processed, "fact upload workers finished");
        watched
    })
    .await
    .context("fact push task failed")?
}

#[cfg(target_os = "linux")]
fn watch(plan: &WatchPlan, sender: &dispatch::JobSender) -> Result<()> {
    let mut backend = inotify::InotifyBackend::new(&plan.fact_dir)?;
    crate::application::services::watch_loop::run_watch_loop(&mut backend, plan, sender)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn watch(_plan: &WatchPlan, _sender: &dispatch::JobSender) -> Result<()> {
    Err(WatchError::Unsupported.into())
}
