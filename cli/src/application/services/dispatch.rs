//! Application service — worker pool draining fact upload jobs.
//!
//! Jobs travel over an unbounded channel. Dropping every `JobSender` closes
//! the queue; workers exit once it is closed and drained.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::application::ports::FactSource;
use crate::application::services::fact_upload::FactUploader;
use crate::domain::config::FactExtension;
use crate::domain::facts::certname_from_path;

/// One host whose facts should be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub certname: String,
    /// Explicit fact file; the uploader derives it from the certname if `None`.
    pub path: Option<PathBuf>,
}

/// Producer side of the job queue.
#[derive(Clone)]
pub struct JobSender(Sender<UploadJob>);

impl JobSender {
    /// Enqueue a job; `false` once every worker is gone.
    pub fn send(&self, job: UploadJob) -> bool {
        self.0.send(job).is_ok()
    }
}

type SharedReceiver = Arc<Mutex<Receiver<UploadJob>>>;

/// Running worker threads.
pub struct WorkerPool {
    workers: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Start `count` workers (at least one) and return the queue's producer.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn start(count: usize, uploader: &FactUploader) -> Result<(Self, JobSender)> {
        let (tx, rx) = mpsc::channel();
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        let workers = (0..count.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let uploader = uploader.clone();
                std::thread::Builder::new()
                    .name(format!("fact-worker-{id}"))
                    .spawn(move || work(&rx, &uploader))
                    .context("cannot spawn fact upload worker")
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(workers = workers.len(), "fact upload workers started");
        Ok((Self { workers }, JobSender(tx)))
    }

    /// Wait for every worker; returns the number of jobs processed.
    ///
    /// Only returns once all `JobSender`s are dropped.
    #[must_use]
    pub fn join(self) -> usize {
        self.workers
            .into_iter()
            .map(|worker| worker.join().unwrap_or(0))
            .sum()
    }
}

fn work(rx: &SharedReceiver, uploader: &FactUploader) -> usize {
    let mut processed = 0;
    loop {
        let next = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(job) = next else {
            return processed;
        };
        processed += 1;
        if let Err(e) = uploader.upload(&job.certname, job.path.as_deref()) {
            tracing::error!(certname = %job.certname, "{e}");
        }
    }
}

/// Jobs for a batch push: one host, or every fact file on disk.
///
/// # Errors
///
/// Returns an error if the fact directory cannot be listed.
pub fn batch_jobs(
    facts: &dyn FactSource,
    extension: FactExtension,
    certname: Option<&str>,
) -> Result<Vec<UploadJob>> {
    if let Some(certname) = certname {
        return Ok(vec![UploadJob {
            certname: certname.to_string(),
            path: None,
        }]);
    }
    Ok(facts
        .fact_files()?
        .into_iter()
        .filter_map(|path| {
            let certname = certname_from_path(&path, extension)?;
            Some(UploadJob {
                certname,
                path: Some(path),
            })
        })
        .collect())
}
