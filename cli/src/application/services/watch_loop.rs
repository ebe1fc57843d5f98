//! Application service — turn fact directory notifications into upload jobs.

use std::path::{Path, PathBuf};

use crate::application::ports::WatchBackend;
use crate::application::services::dispatch::{JobSender, UploadJob};
use crate::domain::config::FactExtension;
use crate::domain::error::WatchError;
use crate::domain::watch::{WatchTable, route};

/// Where and what to watch.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    pub fact_dir: PathBuf,
    pub extension: FactExtension,
    /// Fact files present when watching starts.
    pub existing: Vec<PathBuf>,
    /// Per-user watch limit; `None` when unknown.
    pub limit: Option<usize>,
}

/// Subscribe to every existing fact file, then enqueue a job for each
/// qualifying event until the backend closes or the workers are gone.
///
/// # Errors
///
/// Returns [`WatchError::LimitExceeded`] before subscribing anything when the
/// existing files outnumber the watch limit, or a failure reading events.
/// A file that cannot be watched is logged and skipped.
pub fn run_watch_loop<B: WatchBackend>(
    backend: &mut B,
    plan: &WatchPlan,
    jobs: &JobSender,
) -> Result<(), WatchError> {
    match plan.limit {
        Some(limit) if plan.existing.len() > limit => {
            return Err(WatchError::LimitExceeded {
                limit,
                files: plan.existing.len(),
            });
        }
        _ => {}
    }

    let mut table = WatchTable::new();
    for path in &plan.existing {
        subscribe(backend, &mut table, path);
    }
    tracing::info!(
        dir = %plan.fact_dir.display(),
        files = table.len(),
        "watching for fact updates"
    );

    while let Some(events) = backend.next_events()? {
        for event in events {
            if event.removed {
                table.remove(&event.handle);
                continue;
            }
            let Some(routed) = route(&table, &plan.fact_dir, plan.extension, &event) else {
                continue;
            };
            if routed.subscribe && !subscribe(backend, &mut table, &routed.path) {
                if event.oneshot {
                    table.remove(&event.handle);
                }
                continue;
            }
            tracing::debug!(certname = %routed.certname, "fact file changed");
            let job = UploadJob {
                certname: routed.certname,
                path: Some(routed.path),
            };
            if !jobs.send(job) {
                tracing::warn!("fact upload workers are gone, no longer watching");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Watch `path`; `false` when it vanished or cannot be watched.
fn subscribe<B: WatchBackend>(
    backend: &mut B,
    table: &mut WatchTable<B::Handle>,
    path: &Path,
) -> bool {
    match backend.watch_file(path) {
        Ok(handle) => {
            table.insert(handle, path.to_path_buf());
            true
        }
        Err(e) => {
            tracing::warn!("Not watching {}: {e}", path.display());
            false
        }
    }
}
